use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use globset::{GlobBuilder, GlobMatcher};
use walkdir::WalkDir;
use xbench_core::{BenchError, ErrorInfo};
use xbench_engine::CleanupSpec;

use crate::record::Artifact;

/// Directory inside a run receiving copies of files that live outside it.
pub const ARTIFACT_DIR: &str = "artifacts";
/// Captured standard output.
pub const STDOUT_FILE: &str = "stdout.txt";
/// Captured standard error.
pub const STDERR_FILE: &str = "stderr.txt";

fn artifact_error(code: &str, err: impl ToString, path: &Path) -> BenchError {
    BenchError::RunDir(
        ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()),
    )
}

fn matcher(pattern: &str) -> Result<GlobMatcher, BenchError> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|err| {
            BenchError::Config(
                ErrorInfo::new("engine.bad_glob", err.to_string()).with_context("pattern", pattern),
            )
        })
}

fn normalise(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn modified_ms(path: &Path) -> Option<u64> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    let elapsed = modified.duration_since(UNIX_EPOCH).ok()?;
    u64::try_from(elapsed.as_millis()).ok()
}

fn is_capture_file(relative: &str) -> bool {
    relative == STDOUT_FILE || relative == STDERR_FILE
}

/// Collects every file the engine's patterns reference.
///
/// Relative patterns are matched against files under `run_dir`; absolute
/// patterns are expanded and the matches copied into `run_dir/artifacts`.
///
/// A failing pattern does not discard the others: the files gathered so far
/// are returned together with the first error.
pub fn collect_artifacts(run_dir: &Path, patterns: &[&str]) -> (Vec<Artifact>, Option<BenchError>) {
    let mut artifacts = Vec::new();
    let mut first_error = None;
    for pattern in patterns {
        let collected = if Path::new(pattern).is_absolute() {
            collect_external(run_dir, pattern, &mut artifacts)
        } else {
            collect_local(run_dir, pattern, &mut artifacts)
        };
        if let Err(err) = collected {
            first_error.get_or_insert(err);
        }
    }
    (artifacts, first_error)
}

fn collect_local(
    run_dir: &Path,
    pattern: &str,
    artifacts: &mut Vec<Artifact>,
) -> Result<(), BenchError> {
    let matcher = matcher(pattern)?;
    for entry in WalkDir::new(run_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = match entry.path().strip_prefix(run_dir) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        let relative = normalise(rel);
        if is_capture_file(&relative) || !matcher.is_match(rel) {
            continue;
        }
        artifacts.push(Artifact {
            pattern: pattern.to_string(),
            path: entry.path().to_path_buf(),
            relative,
            modified_ms: modified_ms(entry.path()),
        });
    }
    Ok(())
}

fn collect_external(
    run_dir: &Path,
    pattern: &str,
    artifacts: &mut Vec<Artifact>,
) -> Result<(), BenchError> {
    let paths = glob::glob(pattern).map_err(|err| {
        BenchError::Config(
            ErrorInfo::new("engine.bad_glob", err.to_string()).with_context("pattern", pattern),
        )
    })?;
    let dest_dir = run_dir.join(ARTIFACT_DIR);
    for source in paths.filter_map(Result::ok) {
        if !source.is_file() {
            continue;
        }
        fs::create_dir_all(&dest_dir)
            .map_err(|err| artifact_error("run_dir.artifact_dir", err, &dest_dir))?;
        let dest = unique_destination(&dest_dir, &source);
        fs::copy(&source, &dest).map_err(|err| artifact_error("run_dir.artifact_copy", err, &source))?;
        let relative = match dest.strip_prefix(run_dir) {
            Ok(rel) => normalise(rel),
            Err(_) => normalise(&dest),
        };
        artifacts.push(Artifact {
            pattern: pattern.to_string(),
            path: dest,
            relative,
            modified_ms: modified_ms(&source),
        });
    }
    Ok(())
}

fn unique_destination(dest_dir: &Path, source: &Path) -> PathBuf {
    let name = source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact".to_string());
    let mut candidate = dest_dir.join(&name);
    let mut counter = 1;
    while candidate.exists() {
        candidate = dest_dir.join(format!("{counter}-{name}"));
        counter += 1;
    }
    candidate
}

/// Removes files named by the engine's cleanup rules. Returns the number removed.
pub fn apply_cleanup_rules(run_dir: &Path, spec: &CleanupSpec) -> Result<usize, BenchError> {
    let globs = spec
        .remove_globs
        .iter()
        .map(|pattern| matcher(pattern))
        .collect::<Result<Vec<_>, _>>()?;
    let mut doomed = Vec::new();
    for entry in WalkDir::new(run_dir).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() && !entry.file_type().is_symlink() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(run_dir) else {
            continue;
        };
        let name = entry.file_name().to_string_lossy();
        let by_name = spec.remove_names.iter().any(|candidate| candidate == name.as_ref());
        if by_name || globs.iter().any(|glob| glob.is_match(rel)) {
            doomed.push(entry.path().to_path_buf());
        }
    }
    for path in &doomed {
        fs::remove_file(path).map_err(|err| artifact_error("run_dir.cleanup", err, path))?;
    }
    Ok(doomed.len())
}
