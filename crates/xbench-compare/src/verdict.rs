use std::fmt;

use serde::{Deserialize, Serialize};
use xbench_core::{DigitRange, Family};

/// Outcome of one family comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Agreement within the declared digit range.
    Pass,
    /// Fewer digits of agreement than the declared minimum.
    BelowTolerance,
    /// A `need_*` family was absent on at least one side.
    MissingRequired,
    /// Values could not be compared (non-finite, shape mismatch).
    Incomparable,
}

impl Status {
    /// Every status except `pass` fails the case.
    pub fn is_failure(&self) -> bool {
        !matches!(self, Status::Pass)
    }

    /// Snake-case label used in CSV rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pass => "pass",
            Status::BelowTolerance => "below_tolerance",
            Status::MissingRequired => "missing_required",
            Status::Incomparable => "incomparable",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of comparing one family for one engine pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// Family compared.
    pub family: Family,
    /// Quantity compared, absent for `missing_required`.
    pub quantity: Option<String>,
    /// Whether either side's value came from a derivation.
    pub derived: bool,
    /// Relative error, or the aggregated element error for series.
    pub rel_err: Option<f64>,
    /// Digits of agreement clamped to `range`.
    pub digits: Option<f64>,
    /// Tolerance the case declared for the family.
    pub range: DigitRange,
    /// Outcome.
    pub status: Status,
    /// Both values were bit-for-bit equal.
    #[serde(default)]
    pub exact_match: bool,
    /// Raw digits exceeded the declared maximum. Informational only.
    #[serde(default)]
    pub above_maximum: bool,
}

impl Verdict {
    /// Whether this verdict fails the case.
    pub fn failed(&self) -> bool {
        self.status.is_failure()
    }
}

/// A family that one or both engines did not produce and the case did not require.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingData {
    /// Family left out of the comparison.
    pub family: Family,
    /// Engine labels lacking a comparable quantity.
    pub missing_on: Vec<String>,
}

/// Every verdict for one unordered engine pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairComparison {
    /// Label of the engine that appeared first in the case.
    pub a: String,
    /// Label of the other engine.
    pub b: String,
    /// One verdict per compared or required family, in report order.
    pub verdicts: Vec<Verdict>,
    /// Optional families without a comparable quantity.
    pub missing: Vec<MissingData>,
}

impl PairComparison {
    /// Whether any verdict failed.
    pub fn failed(&self) -> bool {
        self.verdicts.iter().any(Verdict::failed)
    }

    /// Verdict for `family`, if it was compared.
    pub fn verdict(&self, family: Family) -> Option<&Verdict> {
        self.verdicts.iter().find(|verdict| verdict.family == family)
    }
}

/// A pair excluded by the case's skip list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedPair {
    /// First engine label in case order.
    pub a: String,
    /// Second engine label.
    pub b: String,
}

/// All pair comparisons of one case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseComparison {
    /// Case identifier.
    pub case_id: String,
    /// Compared pairs in first-appearance order.
    pub pairs: Vec<PairComparison>,
    /// Pairs excluded by the skip list.
    pub skipped: Vec<SkippedPair>,
}

impl CaseComparison {
    /// Whether any pair failed.
    pub fn failed(&self) -> bool {
        self.pairs.iter().any(PairComparison::failed)
    }

    /// Count of failing verdicts across pairs.
    pub fn failures(&self) -> usize {
        self.pairs
            .iter()
            .flat_map(|pair| &pair.verdicts)
            .filter(|verdict| verdict.failed())
            .count()
    }

    /// Comparison of `a` and `b` in either order.
    pub fn pair(&self, a: &str, b: &str) -> Option<&PairComparison> {
        self.pairs
            .iter()
            .find(|pair| (pair.a == a && pair.b == b) || (pair.a == b && pair.b == a))
    }
}
