use std::path::Path;

use indexmap::IndexMap;
use xbench_core::{BenchError, ErrorInfo};
use xbench_engine::{ArrayFormat, ArraySpec, ColumnRef, Pattern, Transform};
use xbench_run::RunRecord;

use crate::scalar::{extraction_error, parse_number};
use crate::sources::{selected, Source};
use crate::value::{ExtractedValue, Value};

fn split_row<'t>(line: &'t str, delimiter: Option<char>) -> Vec<&'t str> {
    match delimiter {
        Some(delimiter) => line.split(delimiter).map(str::trim).collect(),
        None => line.split_whitespace().collect(),
    }
}

fn is_comment(line: &str, comment: Option<&str>) -> bool {
    line.starts_with(comment.unwrap_or("#"))
}

/// Reads delimited columns, flattened row-major.
///
/// A header row is required when any column is addressed by name; otherwise a
/// leading row that does not parse is treated as a header and skipped.
pub fn read_columns(
    quantity: &str,
    text: &str,
    columns: &[ColumnRef],
    delimiter: Option<char>,
    comment: Option<&str>,
) -> Result<Vec<f64>, BenchError> {
    let mut lines = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !is_comment(line, comment));
    let needs_header = columns.iter().any(|column| matches!(column, ColumnRef::Name(_)));

    let indices: Vec<usize> = if needs_header {
        let header = lines.next().ok_or_else(|| {
            extraction_error("extract.missing_header", quantity, "table is empty")
        })?;
        let names = split_row(header, delimiter);
        columns
            .iter()
            .map(|column| match column {
                ColumnRef::Index(index) => Ok(*index),
                ColumnRef::Name(name) => names.iter().position(|candidate| candidate == name).ok_or_else(|| {
                    extraction_error(
                        "extract.missing_column",
                        quantity,
                        format!("header has no column `{name}`"),
                    )
                }),
            })
            .collect::<Result<Vec<usize>, BenchError>>()?
    } else {
        columns
            .iter()
            .filter_map(|column| match column {
                ColumnRef::Index(index) => Some(*index),
                ColumnRef::Name(_) => None,
            })
            .collect()
    };

    let mut values = Vec::new();
    let mut rows = 0usize;
    for (position, line) in lines.enumerate() {
        let cells = split_row(line, delimiter);
        let parsed: Option<Vec<f64>> = indices
            .iter()
            .map(|index| cells.get(*index).and_then(|cell| parse_number(cell)))
            .collect();
        match parsed {
            Some(row) => {
                values.extend(row);
                rows += 1;
            }
            None if position == 0 && !needs_header => continue,
            None => {
                let widest = indices.iter().copied().max().unwrap_or(0);
                let code = if cells.len() <= widest {
                    "extract.ragged_row"
                } else {
                    "extract.malformed_row"
                };
                return Err(extraction_error(
                    code,
                    quantity,
                    format!("row `{line}` lacks numeric columns {indices:?}"),
                ));
            }
        }
    }
    if rows == 0 {
        return Err(extraction_error("extract.empty_table", quantity, "table has no data rows"));
    }
    Ok(values)
}

/// Reads the numeric block following the first line matching `header`.
pub fn read_fixed_table(
    quantity: &str,
    text: &str,
    header: &Pattern,
    columns: &[usize],
    skip: usize,
) -> Result<Vec<f64>, BenchError> {
    let mut lines = text.lines();
    if !lines.by_ref().any(|line| header.regex().is_match(line)) {
        return Err(extraction_error(
            "extract.missing_header",
            quantity,
            format!("no line matches header `{}`", header.as_str()),
        ));
    }
    let mut values = Vec::new();
    let mut rows = 0usize;
    for line in lines.skip(skip) {
        let cells: Option<Vec<f64>> = line.split_whitespace().map(parse_number).collect();
        let cells = match cells {
            Some(cells) if !cells.is_empty() => cells,
            _ => break,
        };
        if columns.is_empty() {
            values.extend(cells);
        } else {
            for index in columns {
                let cell = cells.get(*index).ok_or_else(|| {
                    extraction_error(
                        "extract.ragged_row",
                        quantity,
                        format!("row `{}` has no column {index}", line.trim()),
                    )
                })?;
                values.push(*cell);
            }
        }
        rows += 1;
    }
    if rows == 0 {
        return Err(extraction_error("extract.empty_table", quantity, "table has no data rows"));
    }
    Ok(values)
}

/// Reads a dataset of an HDF5 file as a flat `f64` series.
#[cfg(feature = "hdf5")]
pub fn read_dataset(quantity: &str, path: &Path, dataset: &str) -> Result<Vec<f64>, BenchError> {
    let hdf5_error = |code: &str, err: hdf5::Error| {
        BenchError::Extraction(
            ErrorInfo::new(code, err.to_string())
                .with_context("quantity", quantity)
                .with_context("path", path.display().to_string())
                .with_context("dataset", dataset),
        )
    };
    let file = hdf5::File::open(path).map_err(|err| hdf5_error("extract.hdf5_open", err))?;
    let data = file
        .dataset(dataset)
        .map_err(|err| hdf5_error("extract.missing_dataset", err))?;
    data.read_raw::<f64>()
        .map_err(|err| hdf5_error("extract.hdf5_read", err))
}

/// Always fails: this build has no HDF5 reader.
#[cfg(not(feature = "hdf5"))]
pub fn read_dataset(quantity: &str, path: &Path, dataset: &str) -> Result<Vec<f64>, BenchError> {
    Err(BenchError::Extraction(
        ErrorInfo::new("extract.hdf5_disabled", "built without HDF5 support")
            .with_context("quantity", quantity)
            .with_context("path", path.display().to_string())
            .with_context("dataset", dataset)
            .with_hint("rebuild with `--features hdf5`"),
    ))
}

/// Applies transforms in order. `divide_by` reads scalars already extracted.
pub fn apply_transforms(
    quantity: &str,
    mut values: Vec<f64>,
    transforms: &[Transform],
    extracted: &IndexMap<String, ExtractedValue>,
) -> Result<Vec<f64>, BenchError> {
    for transform in transforms {
        match transform {
            Transform::Nonzero => values.retain(|value| *value != 0.0),
            Transform::Square => values.iter_mut().for_each(|value| *value = value.powi(2)),
            Transform::DivideBy(divisor) => {
                let scale = extracted
                    .get(divisor)
                    .and_then(|value| value.value.as_scalar())
                    .ok_or_else(|| {
                        extraction_error(
                            "extract.divide_by_missing",
                            quantity,
                            format!("divisor `{divisor}` was not extracted as a scalar"),
                        )
                    })?;
                if scale == 0.0 || !scale.is_finite() {
                    return Err(extraction_error(
                        "extract.divide_by_zero",
                        quantity,
                        format!("divisor `{divisor}` is {scale}"),
                    ));
                }
                values.iter_mut().for_each(|value| *value /= scale);
            }
        }
    }
    Ok(values)
}

fn read_source(quantity: &str, spec: &ArraySpec, source: &Source<'_>) -> Result<Vec<f64>, BenchError> {
    match &spec.format {
        ArrayFormat::Dataset { dataset } => {
            let path = source.path().ok_or_else(|| {
                extraction_error("extract.dataset_source", quantity, "datasets need a file source")
            })?;
            read_dataset(quantity, &path, dataset)
        }
        ArrayFormat::Column {
            column,
            delimiter,
            comment,
        } => read_columns(
            quantity,
            &source.text()?,
            std::slice::from_ref(column),
            *delimiter,
            comment.as_deref(),
        ),
        ArrayFormat::Columns {
            columns,
            delimiter,
            comment,
        } => read_columns(quantity, &source.text()?, columns, *delimiter, comment.as_deref()),
        ArrayFormat::FixedTable {
            header,
            columns,
            skip,
        } => read_fixed_table(quantity, &source.text()?, header, columns, *skip),
    }
}

/// Extracts an array quantity from its selected source.
pub fn extract_array(
    quantity: &str,
    spec: &ArraySpec,
    record: &RunRecord,
    extracted: &IndexMap<String, ExtractedValue>,
) -> Result<(Value, String), BenchError> {
    let sources = selected(record, &spec.source);
    let source = sources.first().ok_or_else(|| {
        BenchError::Extraction(
            ErrorInfo::new("extract.not_found", "no artifact matches the array source")
                .with_context("quantity", quantity)
                .with_context("source", spec.source.artifact_pattern().unwrap_or("stdout")),
        )
    })?;
    let raw = read_source(quantity, spec, source)?;
    let values = apply_transforms(quantity, raw, &spec.transforms, extracted)?;
    Ok((Value::Series(values), source.label()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MUELLER: &str = "\
theta s11 s12 s21
0 1.5 0.0 2.0
90 0.5 0.25 1.0
180 2.0 0.0 3.0
";

    #[test]
    fn columns_by_name_and_index() {
        let by_name = read_columns(
            "m",
            MUELLER,
            &[ColumnRef::Name("s11".into()), ColumnRef::Index(3)],
            None,
            None,
        )
        .expect("columns");
        assert_eq!(by_name, vec![1.5, 2.0, 0.5, 1.0, 2.0, 3.0]);

        let implicit_header =
            read_columns("m", MUELLER, &[ColumnRef::Index(1)], None, None).expect("column");
        assert_eq!(implicit_header, vec![1.5, 0.5, 2.0]);
    }

    #[test]
    fn structural_failures() {
        let missing = read_columns("m", MUELLER, &[ColumnRef::Name("s44".into())], None, None)
            .expect_err("missing column");
        assert_eq!(missing.code(), "extract.missing_column");

        let ragged = read_columns("m", "1 2 3\n4 5\n", &[ColumnRef::Index(2)], None, None)
            .expect_err("ragged");
        assert_eq!(ragged.code(), "extract.ragged_row");
    }

    #[test]
    fn csv_columns_with_delimiter() {
        let text = "# generated\nx,|E|^2\n0.0, 1.25\n1.0, 2.5\n";
        let values = read_columns("int", text, &[ColumnRef::Name("|E|^2".into())], Some(','), None)
            .expect("csv");
        assert_eq!(values, vec![1.25, 2.5]);
    }

    #[test]
    fn fixed_table_stops_at_first_non_numeric_line() {
        let text = "\
preamble
 theta   S11     S12
 -----
 0.0     1.0     0.5
 10.0    0.8     0.4
Total time 3.2 s
";
        let header = Pattern::new(r"theta\s+S11").expect("pattern");
        let values = read_fixed_table("m", text, &header, &[1], 1).expect("table");
        assert_eq!(values, vec![1.0, 0.8]);
        let all = read_fixed_table("m", text, &header, &[], 1).expect("table");
        assert_eq!(all.len(), 6);
        let missing = Pattern::new("phi").expect("pattern");
        assert_eq!(
            read_fixed_table("m", text, &missing, &[], 0).unwrap_err().code(),
            "extract.missing_header"
        );
    }

    #[test]
    fn transforms_apply_in_order() {
        let extracted = IndexMap::new();
        let values = apply_transforms(
            "m",
            vec![0.0, 2.0, -3.0],
            &[Transform::Nonzero, Transform::Square],
            &extracted,
        )
        .expect("transforms");
        assert_eq!(values, vec![4.0, 9.0]);
        let err = apply_transforms("m", vec![1.0], &[Transform::DivideBy("E0".into())], &extracted)
            .unwrap_err();
        assert_eq!(err.code(), "extract.divide_by_missing");
    }
}
