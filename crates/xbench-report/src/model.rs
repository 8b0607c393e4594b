use serde::{Deserialize, Serialize};
use xbench_compare::CaseComparison;
use xbench_core::{BenchError, SchemaVersion};
use xbench_extract::RunQuantities;
use xbench_run::RunRecord;

/// One command line of a case and what became of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunEntry {
    /// 1-based position inside the case.
    pub index: usize,
    /// Command file line.
    pub line: usize,
    /// Command text as written.
    pub command: String,
    /// Present when the command was launched (even if the solver failed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<RunRecord>,
    /// Why the command produced no run, or why the run failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<BenchError>,
}

impl RunEntry {
    /// Not launched, or the solver did not exit with status zero.
    pub fn failed(&self) -> bool {
        self.error.is_some() || self.record.as_ref().map_or(true, |record| !record.succeeded())
    }
}

/// Everything known about one case after its runs were compared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseReport {
    /// Report layout version.
    pub schema_version: SchemaVersion,
    /// Case identifier.
    pub case_id: String,
    /// SHA256 of the engine configuration document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_hash: Option<String>,
    /// RFC 3339 creation time.
    pub generated_at: String,
    /// Every command of the case, in order.
    pub runs: Vec<RunEntry>,
    /// Merged quantities per engine label, in first-appearance order.
    pub values: Vec<RunQuantities>,
    /// Pairwise verdicts.
    pub comparison: CaseComparison,
}

impl CaseReport {
    /// Empty report stamped with the current time.
    pub fn new(case_id: impl Into<String>, config_hash: Option<String>) -> Self {
        let case_id = case_id.into();
        Self {
            schema_version: SchemaVersion::default(),
            comparison: CaseComparison {
                case_id: case_id.clone(),
                pairs: Vec::new(),
                skipped: Vec::new(),
            },
            case_id,
            config_hash,
            generated_at: chrono::Utc::now().to_rfc3339(),
            runs: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Whether any verdict of the case failed.
    pub fn failed(&self) -> bool {
        self.comparison.failed()
    }
}
