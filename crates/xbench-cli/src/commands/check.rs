use std::path::Path;

use clap::Args;
use xbench_core::BenchError;
use xbench_harness::prepare;

use super::InputArgs;

#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub inputs: InputArgs,
}

/// Exits `1` when some command matches no engine or some output cannot be
/// read by this build.
pub fn run(args: &CheckArgs, launch_dir: &Path) -> Result<u8, BenchError> {
    let prepared = prepare(&args.inputs.commands, &args.inputs.engines, launch_dir)?;
    println!(
        "{} engines, {} cases, {} commands",
        prepared.registry.config().engines.len(),
        prepared.cases.len(),
        prepared.command_count()
    );
    for unresolved in &prepared.unresolved {
        println!(
            "{} line {}: {}",
            unresolved.case_id, unresolved.line, unresolved.error
        );
    }
    for output in &prepared.unreadable {
        println!("{output}: dataset output needs HDF5 support, rebuild with `--features hdf5`");
    }
    let clean = prepared.unresolved.is_empty() && prepared.unreadable.is_empty();
    Ok(if clean { 0 } else { 1 })
}
