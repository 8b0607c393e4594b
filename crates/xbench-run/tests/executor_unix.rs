#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use xbench_core::BenchError;
use xbench_engine::{EngineConfig, Registry};
use xbench_run::{CleanupMode, Executor, RunOptions, ARTIFACT_DIR, STDOUT_FILE};

const SOLVER: &str = r#"#!/bin/sh
echo "args: $*"
echo "threads: ${OMP_NUM_THREADS:-unset}"
echo "mode: ${SOLVER_MODE:-unset}"
if [ -n "$TABLE_FILE" ]; then echo "table: $TABLE_FILE"; fi
echo "Cext = 1.5" > result.dat
echo "scratch" > scratch.tmp
if [ "$1" = "--block-artifacts" ]; then echo "not a directory" > artifacts; fi
if [ "$1" = "--fail" ]; then echo "boom" >&2; exit 3; fi
exit 0
"#;

struct Fixture {
    _dir: tempfile::TempDir,
    output: PathBuf,
    registry: Registry,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let launch = dir.path().join("launch");
    fs::create_dir_all(launch.join("bin")).expect("bin dir");
    let solver = launch.join("bin/solver.sh");
    fs::write(&solver, SOLVER).expect("write solver");
    fs::set_permissions(&solver, fs::Permissions::from_mode(0o755)).expect("chmod");
    fs::write(launch.join("table.dat"), "eps 2.25\n").expect("table");
    let external = dir.path().join("external");
    fs::create_dir_all(&external).expect("external dir");
    fs::write(external.join("shared.out"), "Qext = 2.0\n").expect("external file");

    let yaml = format!(
        r#"
engines:
  alpha:
    detect: ["alpha"]
    executable: bin/solver.sh
    env: {{ SOLVER_MODE: quick }}
    prepare:
      - action: copy
        source: table.dat
      - action: symlink
        source: table.dat
        target: linked/eps.dat
      - action: copy_env
        var: TABLE_FILE
        target: tables/eps.dat
        rewrite: true
        when_contains: [-table]
    extra_files: ["*.dat", "{external}/*.out"]
    cleanup:
      remove_names: [scratch.tmp]
  ghost:
    detect: ["ghost"]
    executable: bin/does-not-exist
"#,
        external = external.display()
    );
    let mut config: EngineConfig = serde_yaml::from_str(&yaml).expect("engine yaml");
    config
        .engines
        .get_mut("alpha")
        .expect("alpha")
        .env
        .insert("TABLE_FILE".into(), "./table.dat".into());
    let registry = Registry::from_config(config, &launch).expect("registry");
    let output = dir.path().join("outputs");
    Fixture {
        _dir: dir,
        output,
        registry,
    }
}

fn options(output: &Path, cleanup: CleanupMode) -> RunOptions {
    RunOptions {
        output_root: output.to_path_buf(),
        threads: 4,
        cleanup,
    }
}

#[test]
fn run_captures_output_env_and_artifacts() -> Result<(), BenchError> {
    let fx = fixture();
    let executor = Executor::new(&fx.registry, options(&fx.output, CleanupMode::Off));
    let record = executor.execute("sphere x", 1, "alpha -table 'two words'")?;

    assert_eq!(record.run_dir, fx.output.join("sphere_x/alpha/run-001"));
    assert_eq!(record.args, vec!["-table", "two words"]);
    assert!(record.succeeded());
    assert!(record.stdout.contains("args: -table two words"));
    assert!(record.stdout.contains("threads: 4"));
    assert!(record.stdout.contains("mode: quick"));
    let copied = record.run_dir.join("tables/eps.dat");
    assert!(record.stdout.contains(&format!("table: {}", copied.display())));
    assert!(copied.is_file());
    assert!(record.run_dir.join("table.dat").is_file());
    assert_eq!(
        fs::read_to_string(record.run_dir.join(STDOUT_FILE)).expect("stdout file"),
        record.stdout
    );
    assert!(record.timing.wall_seconds >= 0.0);

    let local: Vec<&str> = record
        .artifacts_for("*.dat")
        .iter()
        .map(|a| a.relative.as_str())
        .collect();
    assert!(local.contains(&"result.dat"));
    assert!(local.contains(&"table.dat"));
    let external = record
        .artifacts
        .iter()
        .find(|a| a.relative == format!("{ARTIFACT_DIR}/shared.out"))
        .expect("external artifact copied");
    assert!(external.path.starts_with(&record.run_dir));

    assert!(std::env::var("TABLE_FILE").is_err(), "process env untouched");
    Ok(())
}

#[test]
fn failures_are_recorded_not_raised() -> Result<(), BenchError> {
    let fx = fixture();
    let executor = Executor::new(&fx.registry, options(&fx.output, CleanupMode::Off));

    let failed = executor.execute("c", 1, "alpha --fail")?;
    assert_eq!(failed.exit_code, Some(3));
    assert!(!failed.succeeded());
    assert!(failed.completed());

    let ghost = executor.execute("c", 2, "ghost -x")?;
    assert!(ghost.launch_error.is_some());
    assert_eq!(ghost.exit_code, None);
    assert!(ghost.run_dir.is_dir());
    Ok(())
}

#[test]
fn symlink_step_points_back_to_the_launch_dir() -> Result<(), BenchError> {
    let fx = fixture();
    let executor = Executor::new(&fx.registry, options(&fx.output, CleanupMode::Off));
    let record = executor.execute("c", 1, "alpha")?;

    let link = record.run_dir.join("linked/eps.dat");
    let meta = fs::symlink_metadata(&link).expect("link metadata");
    assert!(meta.file_type().is_symlink());
    assert_eq!(
        fs::read_link(&link).expect("link target"),
        fx.registry.launch_dir().join("table.dat")
    );
    assert_eq!(fs::read_to_string(&link).expect("link body"), "eps 2.25\n");
    Ok(())
}

#[test]
fn artifact_failure_keeps_the_finished_run() -> Result<(), BenchError> {
    let fx = fixture();
    let executor = Executor::new(&fx.registry, options(&fx.output, CleanupMode::Off));
    let record = executor.execute("c", 1, "alpha --block-artifacts")?;

    assert!(record.succeeded());
    assert!(record.stdout.contains("args: --block-artifacts"));
    let err = record.artifact_error.as_ref().expect("artifact error recorded");
    assert_eq!(err.code(), "run_dir.artifact_dir");
    let local: Vec<&str> = record
        .artifacts_for("*.dat")
        .iter()
        .map(|a| a.relative.as_str())
        .collect();
    assert!(local.contains(&"result.dat"));
    Ok(())
}

#[test]
fn unknown_engine_creates_no_directory() {
    let fx = fixture();
    let executor = Executor::new(&fx.registry, options(&fx.output, CleanupMode::Off));
    let err = executor.execute("c", 1, "omega -x").expect_err("unknown");
    assert!(matches!(err, BenchError::UnknownEngine(_)));
    assert!(!fx.output.exists());

    let err = executor.execute("c", 1, "alpha 'unterminated").expect_err("bad quotes");
    assert_eq!(err.code(), "run.shell_split");
    assert!(!fx.output.exists());
}

#[test]
fn run_directories_are_exclusive() -> Result<(), BenchError> {
    let fx = fixture();
    let executor = Executor::new(&fx.registry, options(&fx.output, CleanupMode::Off));
    executor.execute("c", 1, "alpha")?;
    let err = executor.execute("c", 1, "alpha").expect_err("collision");
    assert!(matches!(err, BenchError::RunDir(_)));
    assert_eq!(err.code(), "run_dir.collision");
    Ok(())
}

#[test]
fn cleanup_modes() -> Result<(), BenchError> {
    let fx = fixture();
    let rules = Executor::new(&fx.registry, options(&fx.output, CleanupMode::Rules));
    let record = rules.execute("c", 1, "alpha")?;
    assert!(record.run_dir.join("scratch.tmp").exists());
    rules.cleanup(&record)?;
    assert!(!record.run_dir.join("scratch.tmp").exists());
    assert!(record.run_dir.join("result.dat").exists());

    let purge = Executor::new(&fx.registry, options(&fx.output, CleanupMode::Purge));
    let record = purge.execute("c", 2, "alpha")?;
    purge.cleanup(&record)?;
    assert!(!record.run_dir.exists());
    Ok(())
}
