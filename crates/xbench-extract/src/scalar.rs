use xbench_core::{BenchError, ErrorInfo};
use xbench_engine::{Occurrence, ScalarSpec};
use xbench_run::RunRecord;

use crate::sources::{lookup_order, selected, Source};
use crate::value::Value;

pub(crate) fn extraction_error(code: &str, quantity: &str, message: impl Into<String>) -> BenchError {
    BenchError::Extraction(ErrorInfo::new(code, message).with_context("quantity", quantity))
}

/// Parses a decimal number, accepting Fortran `D` exponents.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    trimmed
        .parse::<f64>()
        .ok()
        .or_else(|| trimmed.replace(&['D', 'd'][..], "E").parse::<f64>().ok())
}

/// Every match of the pattern in `text`, unit factor applied.
pub fn scan(quantity: &str, spec: &ScalarSpec, text: &str) -> Result<Vec<f64>, BenchError> {
    let regex = spec.pattern.regex();
    let vector = spec.is_vector();
    let mut values = Vec::new();
    for captures in regex.captures_iter(text) {
        let group = |name: &str| -> Result<f64, BenchError> {
            let raw = captures.name(name).ok_or_else(|| {
                extraction_error(
                    "extract.vector_component",
                    quantity,
                    format!("match lacks component `{name}`"),
                )
            })?;
            parse_number(raw.as_str()).ok_or_else(|| {
                extraction_error(
                    "extract.parse",
                    quantity,
                    format!("cannot parse `{}` as a number", raw.as_str()),
                )
            })
        };
        let value = if vector {
            let (x, y, z) = (group("x")?, group("y")?, group("z")?);
            (x * x + y * y + z * z).sqrt()
        } else {
            group("value")?
        };
        values.push(value * spec.unit_factor);
    }
    Ok(values)
}

/// Applies the multiple-occurrence policy to a non-empty match list.
pub fn apply_occurrence(quantity: &str, spec: &ScalarSpec, values: Vec<f64>) -> Result<Value, BenchError> {
    let empty = || extraction_error("extract.not_found", quantity, "pattern never matched");
    match spec.occurrence {
        Occurrence::First => values.first().copied().map(Value::Scalar).ok_or_else(empty),
        Occurrence::Last => values.last().copied().map(Value::Scalar).ok_or_else(empty),
        Occurrence::All if values.is_empty() => Err(empty()),
        Occurrence::All => Ok(Value::Series(values)),
        Occurrence::Reduce => {
            let reduction = spec.reduce.ok_or_else(|| {
                extraction_error("extract.missing_reduce", quantity, "no reduction declared")
            })?;
            reduction.apply(&values).map(Value::Scalar).ok_or_else(empty)
        }
    }
}

/// Extracts a scalar from the first source with at least one match.
///
/// Returns the value and the label of the source it came from.
pub fn extract_scalar(
    quantity: &str,
    spec: &ScalarSpec,
    record: &RunRecord,
    extra_files: &[String],
) -> Result<(Value, String), BenchError> {
    let sources: Vec<Source<'_>> = match &spec.source {
        Some(selector) => selected(record, selector),
        None => lookup_order(record, extra_files),
    };
    let mut tried = Vec::new();
    for source in &sources {
        tried.push(source.label());
        let text = match source.text() {
            Ok(text) => text,
            Err(err) => {
                tracing::debug!(quantity, source = %source.label(), error = %err, "source unreadable");
                continue;
            }
        };
        let values = scan(quantity, spec, &text)?;
        if !values.is_empty() {
            return Ok((apply_occurrence(quantity, spec, values)?, source.label()));
        }
    }
    Err(BenchError::Extraction(
        ErrorInfo::new("extract.not_found", "no lookup source matched the pattern")
            .with_context("quantity", quantity)
            .with_context("pattern", spec.pattern.as_str())
            .with_context("sources", tried.join(", ")),
    ))
}
