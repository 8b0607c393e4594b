use std::fs;
use std::path::{Path, PathBuf};

use xbench_core::{BenchError, ErrorInfo};
use xbench_engine::{PrepAction, PrepStep};

fn prep_error(code: &str, message: impl Into<String>, run_dir: &Path) -> BenchError {
    BenchError::RunDir(
        ErrorInfo::new(code, message).with_context("run_dir", run_dir.display().to_string()),
    )
}

fn resolve_source(launch_dir: &Path, source: &str) -> PathBuf {
    let path = Path::new(source);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        launch_dir.join(path)
    }
}

fn target_path(run_dir: &Path, source: &Path, target: Option<&str>) -> Result<PathBuf, BenchError> {
    let name = match target {
        Some(target) => PathBuf::from(target),
        None => source
            .file_name()
            .map(PathBuf::from)
            .ok_or_else(|| {
                prep_error(
                    "run_dir.prep_target",
                    format!("cannot derive a file name from `{}`", source.display()),
                    run_dir,
                )
            })?,
    };
    if name.is_absolute() || name.components().any(|c| matches!(c, std::path::Component::ParentDir)) {
        return Err(prep_error(
            "run_dir.prep_target",
            format!("target `{}` escapes the run directory", name.display()),
            run_dir,
        ));
    }
    let dest = run_dir.join(name);
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| prep_error("run_dir.prep_target", err.to_string(), run_dir))?;
    }
    Ok(dest)
}

#[cfg(unix)]
fn make_symlink(source: &Path, dest: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(source, dest)
}

#[cfg(not(unix))]
fn make_symlink(source: &Path, dest: &Path) -> std::io::Result<()> {
    fs::copy(source, dest).map(|_| ())
}

/// Context shared by every preparation step of one run.
pub struct PrepContext<'a> {
    /// Fresh run directory.
    pub run_dir: &'a Path,
    /// Directory relative sources resolve against.
    pub launch_dir: &'a Path,
    /// Command line gating `when_contains`.
    pub command: &'a str,
    /// Engine and instance environment, used before the process environment.
    pub run_env: &'a [(String, String)],
}

impl PrepContext<'_> {
    fn lookup_env(&self, var: &str) -> Option<String> {
        self.run_env
            .iter()
            .rev()
            .find(|(key, _)| key == var)
            .map(|(_, value)| value.clone())
            .or_else(|| std::env::var(var).ok())
    }
}

/// Applies the enabled steps in order. Returns run-scoped environment rewrites.
pub fn apply_steps(
    steps: &[PrepStep],
    ctx: &PrepContext<'_>,
) -> Result<Vec<(String, String)>, BenchError> {
    let mut rewrites = Vec::new();
    for step in steps.iter().filter(|step| step.applies_to(ctx.command)) {
        match &step.action {
            PrepAction::Symlink { source, target } => {
                let source = resolve_source(ctx.launch_dir, source);
                let dest = target_path(ctx.run_dir, &source, target.as_deref())?;
                make_symlink(&source, &dest).map_err(|err| {
                    prep_error(
                        "run_dir.prep_symlink",
                        format!("{}: {err}", source.display()),
                        ctx.run_dir,
                    )
                })?;
            }
            PrepAction::Copy { source, target } => {
                let source = resolve_source(ctx.launch_dir, source);
                let dest = target_path(ctx.run_dir, &source, target.as_deref())?;
                fs::copy(&source, &dest).map_err(|err| {
                    prep_error(
                        "run_dir.prep_copy",
                        format!("{}: {err}", source.display()),
                        ctx.run_dir,
                    )
                })?;
            }
            PrepAction::CopyEnv {
                var,
                target,
                rewrite,
            } => {
                let value = ctx.lookup_env(var).ok_or_else(|| {
                    prep_error(
                        "run_dir.prep_env_missing",
                        format!("environment variable `{var}` is not set"),
                        ctx.run_dir,
                    )
                })?;
                let source = resolve_source(ctx.launch_dir, &value);
                let dest = target_path(ctx.run_dir, &source, target.as_deref())?;
                fs::copy(&source, &dest).map_err(|err| {
                    prep_error(
                        "run_dir.prep_copy_env",
                        format!("{var}={}: {err}", source.display()),
                        ctx.run_dir,
                    )
                })?;
                if *rewrite {
                    rewrites.push((var.clone(), dest.display().to_string()));
                }
            }
        }
    }
    Ok(rewrites)
}
