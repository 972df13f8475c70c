//! Shared column helpers used by the cleaners and the synthesizer.

use crate::error::{ProcessingError, Result};
use polars::prelude::*;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType is an integer type.
#[inline]
pub fn is_integer_dtype(dtype: &DataType) -> bool {
    is_numeric_dtype(dtype) && !matches!(dtype, DataType::Float32 | DataType::Float64)
}

/// Fetch a configured column, failing with a configuration error when absent.
pub fn require_column(df: &DataFrame, column: &str, role: &str) -> Result<Series> {
    df.column(column)
        .map(|c| c.as_materialized_series().clone())
        .map_err(|_| ProcessingError::missing_column(column, role))
}

/// Render a float the way it would appear in a vocabulary (`7.0` -> `"7"`).
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Canonical string form of every cell, used for vocabulary lookups.
///
/// Strings are kept verbatim, integers and integral floats print without a
/// decimal point, booleans print as `true`/`false`. Nulls stay `None`.
pub fn cell_keys(series: &Series) -> Result<Vec<Option<String>>> {
    let dtype = series.dtype();
    let keys = if dtype == &DataType::String {
        series
            .str()?
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect()
    } else if is_integer_dtype(dtype) {
        series
            .cast(&DataType::Int64)?
            .i64()?
            .into_iter()
            .map(|v| v.map(|n| n.to_string()))
            .collect()
    } else if is_numeric_dtype(dtype) {
        series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| v.filter(|x| !x.is_nan()).map(format_number))
            .collect()
    } else if dtype == &DataType::Boolean {
        series
            .bool()?
            .into_iter()
            .map(|v| v.map(|b| b.to_string()))
            .collect()
    } else {
        return Err(type_mismatch(series, "string, numeric or boolean"));
    };
    Ok(keys)
}

/// Build a `TypeMismatch` error for `series`.
pub fn type_mismatch(series: &Series, expected: &str) -> ProcessingError {
    ProcessingError::TypeMismatch {
        column: series.name().to_string(),
        expected: expected.to_string(),
        actual: series.dtype().to_string(),
    }
}

/// Convert a column to `Float64`, parsing strings.
///
/// Blank strings become null; any other unparseable string is a type mismatch.
pub fn to_float_series(series: &Series) -> Result<Series> {
    let dtype = series.dtype();
    if is_numeric_dtype(dtype) {
        return Ok(series.cast(&DataType::Float64)?);
    }
    if dtype != &DataType::String {
        return Err(type_mismatch(series, "numeric or numeric string"));
    }

    let mut values = Vec::with_capacity(series.len());
    for (row, value) in series.str()?.into_iter().enumerate() {
        match value.map(str::trim) {
            None | Some("") => values.push(None),
            Some(text) => match text.parse::<f64>() {
                Ok(number) => values.push(Some(number)),
                Err(_) => {
                    return Err(ProcessingError::TypeMismatch {
                        column: series.name().to_string(),
                        expected: "numeric".to_string(),
                        actual: format!("string '{}' at row {}", text, row),
                    });
                }
            },
        }
    }
    Ok(Series::new(series.name().clone(), values))
}

// =============================================================================
// List Column Utilities
// =============================================================================

/// Read a column of string lists.
///
/// A plain string column is read as one-token lists. Null cells read as
/// empty lists.
pub fn string_lists(series: &Series) -> Result<Vec<Vec<String>>> {
    match series.dtype() {
        DataType::List(inner) if inner.as_ref() == &DataType::String => {
            let mut rows = Vec::with_capacity(series.len());
            for cell in series.list()?.into_iter() {
                let tokens = match cell {
                    Some(items) => items
                        .str()?
                        .into_iter()
                        .flatten()
                        .map(str::to_string)
                        .collect(),
                    None => Vec::new(),
                };
                rows.push(tokens);
            }
            Ok(rows)
        }
        DataType::String => Ok(series
            .str()?
            .into_iter()
            .map(|v| v.map(|s| vec![s.to_string()]).unwrap_or_default())
            .collect()),
        _ => Err(type_mismatch(series, "list of strings")),
    }
}

/// Build a `List(String)` series from per-row token lists.
pub fn list_series(name: PlSmallStr, rows: Vec<Vec<String>>) -> Series {
    let cells: Vec<Series> = rows
        .into_iter()
        .map(|tokens| Series::new(PlSmallStr::EMPTY, tokens))
        .collect();
    if cells.is_empty() {
        return Series::new_empty(name, &DataType::List(Box::new(DataType::String)));
    }
    Series::new(name, cells)
}

/// Format tokens back into a list literal: `['a', 'b']`.
pub fn format_list_literal(tokens: &[String]) -> String {
    let quoted: Vec<String> = tokens
        .iter()
        .map(|t| format!("'{}'", t.replace('\\', "\\\\").replace('\'', "\\'")))
        .collect();
    format!("[{}]", quoted.join(", "))
}

/// Replace every list column with its literal string form so the table can be
/// written to CSV.
pub fn lists_to_literals(df: DataFrame) -> Result<DataFrame> {
    let mut df = df;
    let list_columns: Vec<String> = df
        .get_columns()
        .iter()
        .filter(|c| matches!(c.dtype(), DataType::List(_)))
        .map(|c| c.name().to_string())
        .collect();

    for name in &list_columns {
        let series = df.column(name)?.as_materialized_series().clone();
        let literals: Vec<String> = string_lists(&series)?
            .iter()
            .map(|tokens| format_list_literal(tokens))
            .collect();
        df.replace(name, Series::new(name.as_str().into(), literals))?;
    }
    Ok(df)
}
