use std::fs;
use std::path::Path;
use std::process::Command;

const ENGINES: &str = r#"{
  "engines": {
    "alpha": {
      "detect": ["alpha"],
      "executable": "bin/solver.sh",
      "outputs": {
        "Cext": { "kind": "scalar", "pattern": "Cext = (?P<value>\\S+)" }
      }
    },
    "beta": {
      "detect": ["beta"],
      "executable": "bin/solver.sh",
      "outputs": {
        "Cext": { "kind": "scalar", "pattern": "Cext = (?P<value>\\S+)" }
      }
    }
  }
}"#;

fn xbench(dir: &Path, args: &[&str]) -> (i32, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_xbench"))
        .args(args)
        .current_dir(dir)
        .env("RUST_LOG", "warn")
        .output()
        .expect("spawn xbench");
    (
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stdout).into_owned(),
    )
}

fn setup(commands: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("engines.json"), ENGINES).expect("engines");
    fs::write(dir.path().join("commands.txt"), commands).expect("commands");
    dir
}

#[test]
fn check_reports_counts_and_unknown_engines() {
    let dir = setup("# @case: a\n# @tol: 11 16\n# @tol_res: 11 16\nalpha 1\nbeta 1\ngamma 1\n");
    let (code, stdout) = xbench(
        dir.path(),
        &["check", "--commands", "commands.txt", "--engines", "engines.json"],
    );
    assert_eq!(code, 1);
    assert!(stdout.contains("2 engines, 1 cases, 3 commands"), "{stdout}");
    assert!(stdout.contains("a line 6:"), "{stdout}");
}

#[cfg(not(feature = "hdf5"))]
#[test]
fn check_flags_dataset_outputs_without_hdf5() {
    let dir = setup("# @case: a\n# @tol: 11 16\n# @tol_res: 11 16\nalpha 1\n");
    fs::write(
        dir.path().join("datasets.json"),
        r#"{
  "engines": {
    "alpha": {
      "detect": ["alpha"],
      "executable": "bin/solver.sh",
      "outputs": {
        "mueller": { "kind": "array", "format": "dataset", "dataset": "s11", "source": { "glob": "*.h5" } }
      }
    }
  }
}"#,
    )
    .expect("engines");
    let (code, stdout) = xbench(
        dir.path(),
        &["check", "--commands", "commands.txt", "--engines", "datasets.json"],
    );
    assert_eq!(code, 1);
    assert!(stdout.contains("alpha.mueller: dataset output needs HDF5 support"), "{stdout}");
}

#[test]
fn configuration_errors_exit_with_two() {
    let dir = setup("# @case: a\n# @tol: 11 16\n# @tol_res: 11 16\n# @need_force\nalpha 1\n");
    let (code, _) = xbench(
        dir.path(),
        &["check", "--commands", "commands.txt", "--engines", "engines.json"],
    );
    assert_eq!(code, 2);

    let (code, _) = xbench(
        dir.path(),
        &["run", "--commands", "missing.txt", "--engines", "engines.json"],
    );
    assert_eq!(code, 2);
    assert!(!dir.path().join("outputs").exists());
}

#[cfg(unix)]
#[test]
fn run_exits_one_on_disagreement() {
    use std::os::unix::fs::PermissionsExt;

    let dir = setup("# @case: sphere_x\n# @tol: 11 16\n# @tol_res: 11 16\nalpha 1.2345\nbeta 1.2346\n");
    let solver = dir.path().join("bin/solver.sh");
    fs::create_dir_all(dir.path().join("bin")).expect("bin");
    fs::write(&solver, "#!/bin/sh\necho \"Cext = $1\"\n").expect("solver");
    fs::set_permissions(&solver, fs::Permissions::from_mode(0o755)).expect("chmod");

    let (code, stdout) = xbench(
        dir.path(),
        &[
            "run",
            "--commands",
            "commands.txt",
            "--engines",
            "engines.json",
            "--output",
            "out",
            "--purge",
            "--quiet",
        ],
    );
    assert_eq!(code, 1, "{stdout}");
    assert!(stdout.contains("failing verdicts: 1"), "{stdout}");
    assert!(stdout.contains("failed cases: sphere_x"), "{stdout}");
    assert!(dir.path().join("out/summary.csv").is_file());
    assert!(dir.path().join("out/sphere_x/results.json").is_file());
    assert!(!dir.path().join("out/sphere_x/alpha/run-001").exists());
}
