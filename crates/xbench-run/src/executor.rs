use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use xbench_core::{BenchError, ErrorInfo, RunTiming};
use xbench_engine::{Detection, Registry};

use crate::artifacts::{apply_cleanup_rules, collect_artifacts, STDERR_FILE, STDOUT_FILE};
use crate::prepare::{apply_steps, PrepContext};
use crate::record::RunRecord;
use crate::usage::{children_usage, cpu_delta};

/// What happens to a run directory once its quantities are extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupMode {
    /// Keep everything.
    #[default]
    Off,
    /// Remove the engine's cleanup names and globs.
    Rules,
    /// Remove the whole run directory.
    Purge,
}

/// Executor settings supplied by the caller.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Root under which `<case>/<engine>/run-NNN` directories are created.
    pub output_root: PathBuf,
    /// Value given to each engine's thread-count variable.
    pub threads: usize,
    /// Cleanup applied after extraction.
    pub cleanup: CleanupMode,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("outputs"),
            threads: 1,
            cleanup: CleanupMode::Off,
        }
    }
}

fn run_error(code: &str, err: impl ToString, path: &Path) -> BenchError {
    BenchError::RunDir(
        ErrorInfo::new(code, err.to_string()).with_context("run_dir", path.display().to_string()),
    )
}

/// Splits the text after the detected prefix with POSIX shell rules.
pub fn argument_vector(detection: &Detection<'_>) -> Result<Vec<String>, BenchError> {
    shlex::split(&detection.remaining).ok_or_else(|| {
        BenchError::Config(
            ErrorInfo::new("run.shell_split", "command has unbalanced quotes or escapes")
                .with_context("engine", detection.engine.id.label())
                .with_context("arguments", detection.remaining.as_str()),
        )
    })
}

/// Makes a case id or engine label safe as a single path component.
pub fn path_component(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '@' | '+') {
                c
            } else {
                '_'
            }
        })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => format!("_{cleaned}"),
        _ => cleaned,
    }
}

/// Launches command lines one at a time inside isolated run directories.
pub struct Executor<'r> {
    registry: &'r Registry,
    options: RunOptions,
}

impl<'r> Executor<'r> {
    /// Executor over `registry`.
    pub fn new(registry: &'r Registry, options: RunOptions) -> Self {
        Self { registry, options }
    }

    /// Registry used for detection.
    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    /// Settings in effect.
    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// `<output>/<case>/<engine[@instance]>/run-<NNN>`.
    pub fn run_dir_for(&self, case_id: &str, label: &str, index: usize) -> PathBuf {
        self.options
            .output_root
            .join(path_component(case_id))
            .join(path_component(label))
            .join(format!("run-{index:03}"))
    }

    fn create_run_dir(&self, run_dir: &Path) -> Result<(), BenchError> {
        if let Some(parent) = run_dir.parent() {
            fs::create_dir_all(parent).map_err(|err| run_error("run_dir.create", err, parent))?;
        }
        match fs::create_dir(run_dir) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => Err(BenchError::RunDir(
                ErrorInfo::new("run_dir.collision", "run directory already exists")
                    .with_context("run_dir", run_dir.display().to_string())
                    .with_hint("choose a fresh --output directory or remove the old results"),
            )),
            Err(err) => Err(run_error("run_dir.create", err, run_dir)),
        }
    }

    /// Runs one command line of a case.
    ///
    /// Unknown engines and malformed arguments fail before any directory is
    /// created. A non-zero exit, a spawn failure or a failed artifact copy is
    /// recorded, not raised.
    pub fn execute(&self, case_id: &str, index: usize, command: &str) -> Result<RunRecord, BenchError> {
        let detection = self.registry.detect(command)?;
        let args = argument_vector(&detection)?;
        let entry = detection.engine;
        let spec = self.registry.spec(&entry.id.engine).ok_or_else(|| {
            BenchError::UnknownEngine(
                ErrorInfo::new("engine.unknown", "engine vanished from registry")
                    .with_context("engine", entry.id.engine.as_str()),
            )
        })?;
        let label = entry.id.label();
        let run_dir = self.run_dir_for(case_id, &label, index);
        self.create_run_dir(&run_dir)?;

        let ctx = PrepContext {
            run_dir: &run_dir,
            launch_dir: self.registry.launch_dir(),
            command,
            run_env: &entry.env,
        };
        let rewrites = apply_steps(&spec.prepare, &ctx)?;

        let mut process = Command::new(&entry.executable);
        process
            .args(&args)
            .current_dir(&run_dir)
            .stdin(Stdio::null())
            .envs(entry.env.iter().map(|(key, value)| (key.as_str(), value.as_str())));
        if let Some(var) = &spec.threads_env {
            process.env(var, self.options.threads.to_string());
        }
        process.envs(rewrites.iter().map(|(key, value)| (key.as_str(), value.as_str())));

        tracing::info!(case = case_id, engine = %label, run_dir = %run_dir.display(), "run started");
        let started_at = Utc::now().to_rfc3339();
        let before = children_usage();
        let clock = Instant::now();
        let output = process.output();
        let wall_seconds = clock.elapsed().as_secs_f64();
        let after = children_usage();

        let (exit_code, launch_error, stdout, stderr) = match output {
            Ok(output) => (
                output.status.code(),
                None,
                String::from_utf8_lossy(&output.stdout).into_owned(),
                output.stderr,
            ),
            Err(err) => {
                tracing::warn!(
                    case = case_id,
                    engine = %label,
                    executable = %entry.executable.display(),
                    error = %err,
                    "failed to launch solver"
                );
                (None, Some(err.to_string()), String::new(), Vec::new())
            }
        };
        fs::write(run_dir.join(STDOUT_FILE), stdout.as_bytes())
            .map_err(|err| run_error("run_dir.capture", err, &run_dir))?;
        fs::write(run_dir.join(STDERR_FILE), &stderr)
            .map_err(|err| run_error("run_dir.capture", err, &run_dir))?;

        match exit_code {
            Some(0) => tracing::info!(case = case_id, engine = %label, wall_seconds, "run finished"),
            Some(code) => tracing::warn!(case = case_id, engine = %label, code, "solver exited with non-zero status"),
            None if launch_error.is_none() => {
                tracing::warn!(case = case_id, engine = %label, "solver terminated by a signal")
            }
            None => {}
        }

        let timing = RunTiming {
            wall_seconds,
            cpu_seconds: launch_error.is_none().then(|| cpu_delta(before, after)).flatten(),
            max_rss_kb: launch_error.is_none().then_some(after.max_rss_kb).flatten(),
        };
        let (artifacts, artifact_error) = collect_artifacts(&run_dir, &spec.artifact_patterns());
        if let Some(err) = &artifact_error {
            tracing::warn!(case = case_id, engine = %label, error = %err, "artifact collection incomplete");
        }

        Ok(RunRecord {
            case_id: case_id.to_string(),
            index,
            engine: entry.id.clone(),
            command: command.trim().to_string(),
            executable: entry.executable.clone(),
            args,
            run_dir,
            started_at,
            exit_code,
            launch_error,
            stdout,
            artifacts,
            artifact_error,
            timing,
        })
    }

    /// Applies the configured cleanup to a finished run.
    pub fn cleanup(&self, record: &RunRecord) -> Result<(), BenchError> {
        match self.options.cleanup {
            CleanupMode::Off => Ok(()),
            CleanupMode::Rules => {
                let Some(spec) = self.registry.spec(&record.engine.engine) else {
                    return Ok(());
                };
                let removed = apply_cleanup_rules(&record.run_dir, &spec.cleanup)?;
                tracing::debug!(run_dir = %record.run_dir.display(), removed, "cleanup rules applied");
                Ok(())
            }
            CleanupMode::Purge => {
                if !record.completed() {
                    return Ok(());
                }
                fs::remove_dir_all(&record.run_dir)
                    .map_err(|err| run_error("run_dir.purge", err, &record.run_dir))?;
                tracing::debug!(run_dir = %record.run_dir.display(), "run directory purged");
                Ok(())
            }
        }
    }
}
