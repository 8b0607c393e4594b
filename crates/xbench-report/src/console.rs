use xbench_compare::{CaseComparison, PairComparison, SkippedPair, Verdict};
use xbench_core::Family;

const FAIL_MARK: &str = "❌";

fn verdict_cell(verdict: &Verdict) -> String {
    let mark = if verdict.failed() { FAIL_MARK } else { "" };
    match (verdict.digits, &verdict.quantity) {
        (Some(digits), Some(quantity)) => {
            let derived = if verdict.derived { "*" } else { "" };
            format!("{}:{digits:.2}{quantity}{derived}{mark}", verdict.family)
        }
        _ => format!("{}:NA{mark}", verdict.family),
    }
}

/// Console line for one compared pair: `case | a | b | ext:4.09Cext❌ | ...`.
///
/// Families appear in report order; missing optional data shows as `NA`.
pub fn pair_line(case_id: &str, pair: &PairComparison) -> String {
    let mut line = format!("{case_id} | {} | {}", pair.a, pair.b);
    for family in Family::ALL {
        let cell = if let Some(verdict) = pair.verdict(family) {
            verdict_cell(verdict)
        } else if pair.missing.iter().any(|entry| entry.family == family) {
            format!("{family}:NA")
        } else {
            continue;
        };
        line.push_str(" | ");
        line.push_str(&cell);
    }
    line
}

/// Console line for a pair excluded by the skip list.
pub fn skipped_line(case_id: &str, skipped: &SkippedPair) -> String {
    format!("{case_id} | {} | {} | skipped", skipped.a, skipped.b)
}

/// Every console line of a case, compared pairs first.
pub fn case_lines(comparison: &CaseComparison) -> Vec<(String, bool)> {
    let compared = comparison
        .pairs
        .iter()
        .map(|pair| (pair_line(&comparison.case_id, pair), pair.failed()));
    let skipped = comparison
        .skipped
        .iter()
        .map(|pair| (skipped_line(&comparison.case_id, pair), false));
    compared.chain(skipped).collect()
}
