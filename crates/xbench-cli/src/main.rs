use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use xbench_core::{BenchError, ErrorInfo};
use xbench_harness::EXIT_FATAL;

use commands::{
    check::{self, CheckArgs},
    run::{self, RunArgs},
};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "xbench", about = "Cross-validate numerical solvers against each other")]
struct Cli {
    /// Only log warnings and failing pairs.
    #[arg(long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every case and write reports.
    Run(RunArgs),
    /// Validate the command file and engine configuration without launching anything.
    Check(CheckArgs),
}

fn init_logging(quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn launch_dir() -> Result<PathBuf, BenchError> {
    std::env::current_dir().map_err(|err| {
        BenchError::Io(ErrorInfo::new("cli.current_dir", err.to_string()))
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.quiet);
    let result = launch_dir().and_then(|launch| match &cli.command {
        Command::Run(args) => run::run(args, &launch),
        Command::Check(args) => check::run(args, &launch),
    });
    match result {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            tracing::error!(code = err.code(), "{err}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}
