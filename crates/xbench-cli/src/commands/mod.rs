use std::path::PathBuf;

use clap::Args;

pub mod check;
pub mod run;

/// Input files shared by every subcommand.
#[derive(Args, Debug)]
pub struct InputArgs {
    /// Command file with `# @case` blocks and solver command lines.
    #[arg(long)]
    pub commands: PathBuf,
    /// Engine configuration (`.json`, `.yaml` or `.yml`).
    #[arg(long)]
    pub engines: PathBuf,
}
