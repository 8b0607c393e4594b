use std::path::Path;

use serde::{Deserialize, Serialize};
use xbench_case::{read_command_file, Case};
use xbench_core::{BenchError, ErrorInfo};
use xbench_engine::Registry;
use xbench_extract::{dataset_outputs, DATASETS_SUPPORTED};
use xbench_run::argument_vector;

/// A command that will be reported as failed instead of launched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unresolved {
    /// Case holding the command.
    pub case_id: String,
    /// Command file line.
    pub line: usize,
    /// Detection error.
    pub error: BenchError,
}

/// Loaded and checked inputs, ready to run.
#[derive(Debug)]
pub struct Prepared {
    /// Validated engine table.
    pub registry: Registry,
    /// Parsed cases, in file order.
    pub cases: Vec<Case>,
    /// Commands matching no engine. They fail individually at run time.
    pub unresolved: Vec<Unresolved>,
    /// `engine.quantity` outputs this build cannot read.
    pub unreadable: Vec<String>,
}

impl Prepared {
    /// Commands across all cases.
    pub fn command_count(&self) -> usize {
        self.cases.iter().map(|case| case.commands.len()).sum()
    }
}

/// Loads the engine configuration and the command file and checks every
/// command without launching anything.
///
/// Configuration errors, including commands whose arguments cannot be
/// split, abort here. Unknown engines are only collected.
pub fn prepare(commands: &Path, engines: &Path, launch_dir: &Path) -> Result<Prepared, BenchError> {
    let registry = Registry::load(engines, launch_dir)?;
    let cases = read_command_file(commands, &registry.known_names())?;
    let unresolved = preflight(&registry, &cases)?;
    let unreadable = unreadable_outputs(&registry);
    Ok(Prepared {
        registry,
        cases,
        unresolved,
        unreadable,
    })
}

/// Dataset outputs when the binary dataset reader is compiled out.
pub fn unreadable_outputs(registry: &Registry) -> Vec<String> {
    if DATASETS_SUPPORTED {
        return Vec::new();
    }
    let mut unreadable = Vec::new();
    for (name, spec) in &registry.config().engines {
        for quantity in dataset_outputs(spec) {
            tracing::warn!(
                engine = %name,
                quantity,
                "dataset output needs a build with the `hdf5` feature"
            );
            unreadable.push(format!("{name}.{quantity}"));
        }
    }
    unreadable
}

/// Detects and splits every command of every case.
pub fn preflight(registry: &Registry, cases: &[Case]) -> Result<Vec<Unresolved>, BenchError> {
    if cases.is_empty() {
        return Err(BenchError::Config(
            ErrorInfo::new("case.none", "command file declares no cases")
                .with_hint("start a case with `# @case: <id>`"),
        ));
    }
    let mut unresolved = Vec::new();
    for case in cases {
        for command in &case.commands {
            match registry.detect(&command.text) {
                Ok(detection) => {
                    argument_vector(&detection).map_err(|err| match err {
                        BenchError::Config(info) => BenchError::Config(
                            info.with_context("case", case.id.as_str())
                                .with_context("line", command.line.to_string()),
                        ),
                        other => other,
                    })?;
                }
                Err(error @ BenchError::UnknownEngine(_)) => {
                    tracing::warn!(
                        case = %case.id,
                        line = command.line,
                        error = %error,
                        "command matches no engine"
                    );
                    unresolved.push(Unresolved {
                        case_id: case.id.clone(),
                        line: command.line,
                        error,
                    });
                }
                Err(other) => return Err(other),
            }
        }
    }
    Ok(unresolved)
}
