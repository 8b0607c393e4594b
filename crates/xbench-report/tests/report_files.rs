use std::fs;

use xbench_compare::{CaseComparison, PairComparison, Status, Verdict};
use xbench_core::{BenchError, DigitRange, ErrorInfo, Family, ValueProvenance};
use xbench_engine::EngineId;
use xbench_extract::{ExtractedValue, Origin, RunQuantities, Value};
use xbench_report::{CaseReport, ReportSink, RunEntry, RESULTS_FILE, SUMMARY_FILE, VALUES_FILE};

fn quantities(engine: &str, cext: f64) -> RunQuantities {
    let mut quantities = RunQuantities::new(EngineId::new(engine, None));
    let provenance = ValueProvenance {
        engine: engine.to_string(),
        command: format!("{engine} -shape sphere"),
        source: Some("stdout".into()),
        cpu_seconds: Some(0.5),
        max_rss_kb: Some(1024),
    };
    quantities.values.insert(
        "Cext".into(),
        ExtractedValue {
            value: Value::Scalar(cext),
            origin: Origin::Raw,
            provenance: provenance.clone(),
        },
    );
    quantities.values.insert(
        "mueller".into(),
        ExtractedValue {
            value: Value::Series(vec![1.0, 0.5]),
            origin: Origin::Raw,
            provenance,
        },
    );
    quantities
}

fn sample_report() -> CaseReport {
    let mut report = CaseReport::new("sphere x", Some("abc123".into()));
    report.runs.push(RunEntry {
        index: 3,
        line: 9,
        command: "nosuch -x".into(),
        record: None,
        error: Some(BenchError::UnknownEngine(ErrorInfo::new(
            "engine.unknown",
            "no engine matches `nosuch -x`",
        ))),
    });
    report.values = vec![quantities("adda", 1.2345), quantities("ifdda", 1.2346)];
    report.comparison = CaseComparison {
        case_id: "sphere x".into(),
        pairs: vec![PairComparison {
            a: "adda".into(),
            b: "ifdda".into(),
            verdicts: vec![Verdict {
                family: Family::Ext,
                quantity: Some("Cext".into()),
                derived: false,
                rel_err: Some(8.1e-5),
                digits: Some(4.0915),
                range: DigitRange { min: 11, max: 16 },
                status: Status::BelowTolerance,
                exact_match: false,
                above_maximum: false,
            }],
            missing: Vec::new(),
        }],
        skipped: Vec::new(),
    };
    report
}

#[test]
fn sink_writes_json_and_csv_tables() -> Result<(), BenchError> {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path().join("outputs");
    let report = sample_report();
    assert!(report.failed());
    assert!(report.runs[0].failed());

    let mut sink = ReportSink::create(&root)?;
    let path = sink.write_case(&report)?;
    assert_eq!(sink.cases(), 1);
    assert_eq!(path, root.join("sphere_x").join(RESULTS_FILE));

    let json: serde_json::Value =
        serde_json::from_slice(&fs::read(&path).expect("results.json")).expect("valid json");
    assert_eq!(json["case_id"], "sphere x");
    assert_eq!(json["config_hash"], "abc123");
    assert_eq!(json["runs"][0]["error"]["family"], "UnknownEngine");
    assert_eq!(json["comparison"]["pairs"][0]["verdicts"][0]["status"], "below_tolerance");
    assert_eq!(json["values"][1]["values"]["Cext"]["origin"], "raw");

    let summary = fs::read_to_string(root.join(SUMMARY_FILE)).expect("summary.csv");
    let lines: Vec<&str> = summary.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("case,engine_a,engine_b,family"));
    assert_eq!(
        lines[1],
        "sphere x,adda,ifdda,ext,Cext,false,0.000081,4.09,11,16,below_tolerance,"
    );

    let values = fs::read_to_string(root.join(VALUES_FILE)).expect("values.csv");
    let rows: Vec<&str> = values.lines().skip(1).collect();
    assert_eq!(
        rows,
        vec![
            "sphere x,adda,Cext,1.2345,raw,stdout,0.5,1024",
            "sphere x,ifdda,Cext,1.2346,raw,stdout,0.5,1024",
        ]
    );
    Ok(())
}

#[test]
fn case_lines_cover_compared_and_skipped_pairs() {
    let mut report = sample_report();
    report.comparison.skipped.push(xbench_compare::SkippedPair {
        a: "adda".into(),
        b: "ddscat".into(),
    });
    let lines = xbench_report::case_lines(&report.comparison);
    assert_eq!(
        lines,
        vec![
            ("sphere x | adda | ifdda | ext:4.09Cext❌".to_string(), true),
            ("sphere x | adda | ddscat | skipped".to_string(), false),
        ]
    );
}
