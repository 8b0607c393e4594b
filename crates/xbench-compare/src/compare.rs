use xbench_case::Case;
use xbench_core::{DigitRange, Family};
use xbench_engine::{Aggregate, FamilyRule};
use xbench_extract::{ExtractedValue, RunQuantities, Value};

use crate::metrics::{digits_of_agreement, relative_error, series_relative_error};
use crate::verdict::{CaseComparison, MissingData, PairComparison, SkippedPair, Status, Verdict};

fn names(quantities: &RunQuantities) -> [String; 2] {
    [quantities.engine.engine.clone(), quantities.engine.label()]
}

fn pair_skipped(case: &Case, a: &RunQuantities, b: &RunQuantities) -> bool {
    let (a_names, b_names) = (names(a), names(b));
    a_names
        .iter()
        .any(|a| b_names.iter().any(|b| case.skips(a, b)))
}

fn warn_absent_skip_engines(case: &Case, engines: &[RunQuantities]) {
    let present: Vec<String> = engines.iter().flat_map(names).collect();
    for pair in &case.skip_pairs {
        for name in [pair.first(), pair.second()] {
            if !present.iter().any(|candidate| candidate == name) {
                tracing::warn!(
                    case = %case.id,
                    pair = %pair,
                    engine = name,
                    "skip pair names an engine with no runs in this case"
                );
            }
        }
    }
}

/// First candidate both sides have as raw values, else the first both have at all.
fn choose<'r, 'q>(
    rule: &'r FamilyRule,
    a: &'q RunQuantities,
    b: &'q RunQuantities,
) -> Option<(&'r str, &'q ExtractedValue, &'q ExtractedValue)> {
    let both = |name: &'r String| Some((name.as_str(), a.get(name)?, b.get(name)?));
    rule.quantities
        .iter()
        .filter_map(both)
        .find(|(_, va, vb)| !va.origin.is_derived() && !vb.origin.is_derived())
        .or_else(|| rule.quantities.iter().find_map(both))
}

fn lacking(rule: &FamilyRule, a: &RunQuantities, b: &RunQuantities) -> Vec<String> {
    let lacks_all =
        |side: &RunQuantities| rule.quantities.iter().all(|name| side.get(name).is_none());
    let mut missing: Vec<String> = [a, b]
        .into_iter()
        .filter(|side| lacks_all(side))
        .map(|side| side.engine.label())
        .collect();
    if missing.is_empty() {
        missing = vec![a.engine.label(), b.engine.label()];
    }
    missing
}

fn finite(values: &[f64]) -> bool {
    values.iter().all(|value| value.is_finite())
}

fn relative(a: &Value, b: &Value, aggregate: Aggregate) -> Option<f64> {
    let rel = match (a, b) {
        (Value::Scalar(x), Value::Scalar(y)) if x.is_finite() && y.is_finite() => {
            Some(relative_error(*x, *y))
        }
        (Value::Series(x), Value::Series(y)) if finite(x) && finite(y) => {
            series_relative_error(x, y, aggregate)
        }
        _ => None,
    };
    rel.filter(|rel| rel.is_finite())
}

/// Compares one family's values under `range`.
pub fn evaluate(
    family: Family,
    quantity: &str,
    a: &ExtractedValue,
    b: &ExtractedValue,
    range: DigitRange,
    aggregate: Aggregate,
) -> Verdict {
    let mut verdict = Verdict {
        family,
        quantity: Some(quantity.to_string()),
        derived: a.origin.is_derived() || b.origin.is_derived(),
        rel_err: None,
        digits: None,
        range,
        status: Status::Incomparable,
        exact_match: false,
        above_maximum: false,
    };
    let Some(rel) = relative(&a.value, &b.value, aggregate) else {
        return verdict;
    };
    let agreement = digits_of_agreement(rel, range.max);
    verdict.rel_err = Some(rel);
    verdict.digits = Some(agreement.digits);
    verdict.exact_match = agreement.exact_match;
    verdict.above_maximum = agreement.above_maximum;
    verdict.status = if range.contains(agreement.digits) {
        Status::Pass
    } else {
        Status::BelowTolerance
    };
    verdict
}

fn compare_pair<F>(case: &Case, a: &RunQuantities, b: &RunQuantities, rule_for: &F) -> PairComparison
where
    F: Fn(Family) -> FamilyRule,
{
    let mut pair = PairComparison {
        a: a.engine.label(),
        b: b.engine.label(),
        verdicts: Vec::new(),
        missing: Vec::new(),
    };
    for (family, range) in case.compared_families() {
        let rule = rule_for(family);
        match choose(&rule, a, b) {
            Some((quantity, va, vb)) => {
                let verdict = evaluate(family, quantity, va, vb, range, rule.aggregate);
                tracing::debug!(
                    case = %case.id,
                    a = %pair.a,
                    b = %pair.b,
                    family = %family,
                    quantity,
                    digits = ?verdict.digits,
                    status = %verdict.status,
                    "family compared"
                );
                pair.verdicts.push(verdict);
            }
            None if case.requires(family) => pair.verdicts.push(Verdict {
                family,
                quantity: None,
                derived: false,
                rel_err: None,
                digits: None,
                range,
                status: Status::MissingRequired,
                exact_match: false,
                above_maximum: false,
            }),
            None => pair.missing.push(MissingData {
                family,
                missing_on: lacking(&rule, a, b),
            }),
        }
    }
    pair
}

/// Compares every unordered pair of engines that ran for `case`.
///
/// `engines` holds one merged [`RunQuantities`] per engine label in order of
/// first appearance; `rule_for` supplies each family's candidate quantities.
pub fn compare_case<F>(case: &Case, engines: &[RunQuantities], rule_for: F) -> CaseComparison
where
    F: Fn(Family) -> FamilyRule,
{
    warn_absent_skip_engines(case, engines);
    let mut comparison = CaseComparison {
        case_id: case.id.clone(),
        pairs: Vec::new(),
        skipped: Vec::new(),
    };
    for (i, a) in engines.iter().enumerate() {
        for b in &engines[i + 1..] {
            if pair_skipped(case, a, b) {
                tracing::info!(case = %case.id, a = %a.engine, b = %b.engine, "pair skipped");
                comparison.skipped.push(SkippedPair {
                    a: a.engine.label(),
                    b: b.engine.label(),
                });
                continue;
            }
            comparison.pairs.push(compare_pair(case, a, b, &rule_for));
        }
    }
    comparison
}
