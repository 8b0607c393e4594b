use std::fs::{self, File};
use std::path::{Path, PathBuf};

use xbench_core::serde::to_canonical_json_pretty;
use xbench_core::{BenchError, ErrorInfo};
use xbench_extract::Value;
use xbench_run::path_component;

use crate::model::CaseReport;

/// Per-case report file name.
pub const RESULTS_FILE: &str = "results.json";
/// One row per verdict across all cases.
pub const SUMMARY_FILE: &str = "summary.csv";
/// One row per scalar quantity per engine across all cases.
pub const VALUES_FILE: &str = "values.csv";

const SUMMARY_HEADER: [&str; 12] = [
    "case", "engine_a", "engine_b", "family", "quantity", "derived", "rel_err", "digits", "min",
    "max", "status", "flags",
];
const VALUES_HEADER: [&str; 8] = [
    "case", "engine", "quantity", "value", "origin", "source", "cpu_seconds", "max_rss_kb",
];

fn io_error(code: &str, path: &Path, err: impl ToString) -> BenchError {
    BenchError::Io(
        ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()),
    )
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|value| value.to_string()).unwrap_or_default()
}

/// Writes `<root>/<case>/results.json` and returns its path.
pub fn write_case_report(root: &Path, report: &CaseReport) -> Result<PathBuf, BenchError> {
    let dir = root.join(path_component(&report.case_id));
    fs::create_dir_all(&dir).map_err(|err| io_error("report.create_dir", &dir, err))?;
    let path = dir.join(RESULTS_FILE);
    let bytes = to_canonical_json_pretty(report)?;
    fs::write(&path, bytes).map_err(|err| io_error("report.write", &path, err))?;
    Ok(path)
}

/// Streams case reports into the per-case JSON files and the two CSV tables.
///
/// Rows are flushed after each case so an interrupted benchmark keeps every
/// finished case.
pub struct ReportSink {
    root: PathBuf,
    summary: csv::Writer<File>,
    summary_path: PathBuf,
    values: csv::Writer<File>,
    values_path: PathBuf,
    cases: usize,
}

impl ReportSink {
    /// Creates the output root and both CSV files with their headers.
    pub fn create(root: &Path) -> Result<Self, BenchError> {
        fs::create_dir_all(root).map_err(|err| io_error("report.create_dir", root, err))?;
        let open = |name: &str, header: &[&str]| -> Result<(csv::Writer<File>, PathBuf), BenchError> {
            let path = root.join(name);
            let mut writer =
                csv::Writer::from_path(&path).map_err(|err| io_error("report.open", &path, err))?;
            writer
                .write_record(header)
                .map_err(|err| io_error("report.write", &path, err))?;
            Ok((writer, path))
        };
        let (summary, summary_path) = open(SUMMARY_FILE, &SUMMARY_HEADER)?;
        let (values, values_path) = open(VALUES_FILE, &VALUES_HEADER)?;
        Ok(Self {
            root: root.to_path_buf(),
            summary,
            summary_path,
            values,
            values_path,
            cases: 0,
        })
    }

    /// Output root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of cases written so far.
    pub fn cases(&self) -> usize {
        self.cases
    }

    /// Writes the case's JSON report and appends its CSV rows.
    pub fn write_case(&mut self, report: &CaseReport) -> Result<PathBuf, BenchError> {
        let path = write_case_report(&self.root, report)?;
        self.append_summary(report)?;
        self.append_values(report)?;
        self.cases += 1;
        tracing::debug!(case = %report.case_id, path = %path.display(), "case report written");
        Ok(path)
    }

    fn append_summary(&mut self, report: &CaseReport) -> Result<(), BenchError> {
        for pair in &report.comparison.pairs {
            for verdict in &pair.verdicts {
                let mut flags = Vec::new();
                if verdict.exact_match {
                    flags.push("exact_match");
                }
                if verdict.above_maximum {
                    flags.push("above_maximum");
                }
                let row = [
                    report.case_id.clone(),
                    pair.a.clone(),
                    pair.b.clone(),
                    verdict.family.to_string(),
                    verdict.quantity.clone().unwrap_or_default(),
                    verdict.derived.to_string(),
                    optional(verdict.rel_err),
                    optional(verdict.digits.map(|digits| format!("{digits:.2}"))),
                    verdict.range.min.to_string(),
                    verdict.range.max.to_string(),
                    verdict.status.to_string(),
                    flags.join(";"),
                ];
                self.summary
                    .write_record(&row)
                    .map_err(|err| io_error("report.write", &self.summary_path, err))?;
            }
        }
        self.summary
            .flush()
            .map_err(|err| io_error("report.flush", &self.summary_path, err))
    }

    fn append_values(&mut self, report: &CaseReport) -> Result<(), BenchError> {
        for engine in &report.values {
            for (quantity, extracted) in &engine.values {
                let Value::Scalar(value) = extracted.value else {
                    continue;
                };
                let origin = match &extracted.origin {
                    xbench_extract::Origin::Raw => "raw".to_string(),
                    xbench_extract::Origin::Derived { op } => format!("derived:{op}"),
                };
                let row = [
                    report.case_id.clone(),
                    engine.engine.label(),
                    quantity.clone(),
                    value.to_string(),
                    origin,
                    extracted.provenance.source.clone().unwrap_or_default(),
                    optional(extracted.provenance.cpu_seconds),
                    optional(extracted.provenance.max_rss_kb),
                ];
                self.values
                    .write_record(&row)
                    .map_err(|err| io_error("report.write", &self.values_path, err))?;
            }
        }
        self.values
            .flush()
            .map_err(|err| io_error("report.flush", &self.values_path, err))
    }
}
