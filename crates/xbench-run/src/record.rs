use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use xbench_core::{BenchError, RunTiming};
use xbench_engine::EngineId;

/// A file collected for extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// Engine pattern that selected the file.
    pub pattern: String,
    /// Location inside the run directory.
    pub path: PathBuf,
    /// Path relative to the run directory, `/` separated.
    pub relative: String,
    /// Modification time of the original file in milliseconds since the epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_ms: Option<u64>,
}

/// Everything observed about one command line invocation.
///
/// The record is immutable once returned by the executor; extraction only
/// reads `stdout` and `artifacts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Case the command belongs to.
    pub case_id: String,
    /// 1-based position of the command inside its case.
    pub index: usize,
    /// Detected engine and instance.
    pub engine: EngineId,
    /// Command text as written in the command file.
    pub command: String,
    /// Resolved program path.
    pub executable: PathBuf,
    /// Arguments after the executable.
    pub args: Vec<String>,
    /// Directory the solver ran in.
    pub run_dir: PathBuf,
    /// RFC 3339 launch time.
    pub started_at: String,
    /// Exit status; absent when the solver never started or died by a signal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Set when the executable could not be started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launch_error: Option<String>,
    /// Captured standard output, persisted as `stdout.txt`.
    #[serde(skip)]
    pub stdout: String,
    /// Files collected after the solver exited.
    pub artifacts: Vec<Artifact>,
    /// Set when artifact collection stopped early; `artifacts` holds what
    /// was gathered before the failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_error: Option<BenchError>,
    /// Wall time, CPU time and peak memory.
    pub timing: RunTiming,
}

impl RunRecord {
    /// Whether the solver started and exited with status zero.
    pub fn succeeded(&self) -> bool {
        self.launch_error.is_none() && self.exit_code == Some(0)
    }

    /// Whether the solver ran to completion, whatever its status.
    pub fn completed(&self) -> bool {
        self.launch_error.is_none() && self.exit_code.is_some()
    }

    /// Artifacts selected by `pattern`, most recently modified first.
    pub fn artifacts_for(&self, pattern: &str) -> Vec<&Artifact> {
        let mut matches: Vec<&Artifact> = self
            .artifacts
            .iter()
            .filter(|artifact| artifact.pattern == pattern)
            .collect();
        matches.sort_by(|a, b| {
            b.modified_ms
                .cmp(&a.modified_ms)
                .then_with(|| a.relative.cmp(&b.relative))
        });
        matches
    }
}
