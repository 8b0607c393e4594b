use std::path::{Path, PathBuf};

use clap::Args;
use xbench_core::BenchError;
use xbench_harness::run_benchmark;
use xbench_run::{CleanupMode, RunOptions};

use super::InputArgs;

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub inputs: InputArgs,
    /// Root directory for run directories and reports.
    #[arg(long, default_value = "outputs")]
    pub output: PathBuf,
    /// Thread ceiling exported to each solver.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    pub threads: u16,
    /// Remove each engine's declared scratch files after extraction.
    #[arg(long, conflicts_with = "purge")]
    pub clean: bool,
    /// Remove whole run directories after extraction.
    #[arg(long)]
    pub purge: bool,
}

impl RunArgs {
    fn cleanup(&self) -> CleanupMode {
        match (self.clean, self.purge) {
            (_, true) => CleanupMode::Purge,
            (true, false) => CleanupMode::Rules,
            (false, false) => CleanupMode::Off,
        }
    }
}

pub fn run(args: &RunArgs, launch_dir: &Path) -> Result<u8, BenchError> {
    let options = RunOptions {
        output_root: launch_dir.join(&args.output),
        threads: usize::from(args.threads),
        cleanup: args.cleanup(),
    };
    let summary = run_benchmark(&args.inputs.commands, &args.inputs.engines, launch_dir, options)?;
    println!(
        "cases: {}, runs: {} ({} failed), failing verdicts: {}",
        summary.cases, summary.runs, summary.failed_runs, summary.failing_verdicts
    );
    if !summary.failed_cases.is_empty() {
        println!("failed cases: {}", summary.failed_cases.join(", "));
    }
    Ok(summary.exit_code())
}
