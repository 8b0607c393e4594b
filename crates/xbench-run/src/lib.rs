#![deny(missing_docs)]
//! Run executor: one isolated directory and one child process per command line.

mod artifacts;
mod executor;
mod prepare;
mod record;
mod usage;

pub use artifacts::{collect_artifacts, ARTIFACT_DIR, STDERR_FILE, STDOUT_FILE};
pub use executor::{argument_vector, path_component, CleanupMode, Executor, RunOptions};
pub use record::{Artifact, RunRecord};
