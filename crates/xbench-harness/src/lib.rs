#![deny(missing_docs)]
//! The xbench pipeline.
//!
//! Loads the engine configuration and the command file, preflights every
//! command, then runs each case sequentially: execute, extract, merge per
//! engine, compare and write the case report.

mod pipeline;
mod preflight;

use std::path::Path;

use xbench_core::BenchError;
use xbench_report::ReportSink;
use xbench_run::RunOptions;

pub use pipeline::{Harness, Summary};
pub use preflight::{preflight, prepare, unreadable_outputs, Prepared, Unresolved};

/// Exit status for fatal errors (configuration, report output).
pub const EXIT_FATAL: u8 = 2;

/// Prepares, runs and reports a whole benchmark.
pub fn run_benchmark(
    commands: &Path,
    engines: &Path,
    launch_dir: &Path,
    options: RunOptions,
) -> Result<Summary, BenchError> {
    let prepared = prepare(commands, engines, launch_dir)?;
    tracing::info!(
        cases = prepared.cases.len(),
        commands = prepared.command_count(),
        unresolved = prepared.unresolved.len(),
        output = %options.output_root.display(),
        "benchmark prepared"
    );
    let mut sink = ReportSink::create(&options.output_root)?;
    let harness = Harness::new(&prepared.registry, options);
    harness.run_all(&prepared.cases, &mut sink)
}
