use std::fs;
use std::path::{Path, PathBuf};

use xbench_core::RunTiming;
use xbench_engine::{EngineId, EngineSpec};
use xbench_run::{Artifact, RunRecord};

pub fn engine_spec(yaml: &str) -> EngineSpec {
    serde_yaml::from_str(yaml).expect("engine spec yaml")
}

pub fn record(engine: &str, stdout: &str, run_dir: &Path) -> RunRecord {
    RunRecord {
        case_id: "sphere_x".into(),
        index: 1,
        engine: EngineId::new(engine, None),
        command: format!("{engine} -size 1"),
        executable: PathBuf::from(engine),
        args: vec!["-size".into(), "1".into()],
        run_dir: run_dir.to_path_buf(),
        started_at: "2026-01-01T00:00:00+00:00".into(),
        exit_code: Some(0),
        launch_error: None,
        stdout: stdout.into(),
        artifacts: Vec::new(),
        artifact_error: None,
        timing: RunTiming {
            wall_seconds: 0.5,
            cpu_seconds: Some(0.25),
            max_rss_kb: Some(2048),
        },
    }
}

pub fn add_artifact(record: &mut RunRecord, pattern: &str, relative: &str, body: &str, modified_ms: u64) {
    let path = record.run_dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("artifact dir");
    }
    fs::write(&path, body).expect("artifact body");
    record.artifacts.push(Artifact {
        pattern: pattern.into(),
        path,
        relative: relative.into(),
        modified_ms: Some(modified_ms),
    });
}
