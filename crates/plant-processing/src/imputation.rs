//! External imputation sources.
//!
//! An [`ImputationSource`] is a table prepared outside the pipeline (for
//! example a hand-curated file of plant types) that supplies a replacement
//! value for cells the cleaners leave missing. By default it is matched to the
//! dataset row by row; see [`ImputationAlignment`].

use crate::config::ImputationAlignment;
use crate::error::{ProcessingError, Result};
use crate::utils::{cell_keys, is_numeric_dtype, to_float_series, type_mismatch};
use polars::prelude::*;
use std::collections::HashMap;
use tracing::debug;

/// A table of replacement values aligned with a target dataset.
#[derive(Debug, Clone)]
pub struct ImputationSource {
    data: DataFrame,
    alignment: ImputationAlignment,
}

impl ImputationSource {
    /// Source matched by row position.
    pub fn new(data: DataFrame) -> Self {
        Self {
            data,
            alignment: ImputationAlignment::RowPosition,
        }
    }

    /// Source matched using an explicit alignment policy.
    pub fn with_alignment(data: DataFrame, alignment: ImputationAlignment) -> Self {
        Self { data, alignment }
    }

    pub fn alignment(&self) -> &ImputationAlignment {
        &self.alignment
    }

    pub fn data(&self) -> &DataFrame {
        &self.data
    }

    /// Values of `column` for each row of `target`, in target row order.
    ///
    /// The returned series has the same length as `target`. Under id
    /// alignment, rows whose id is absent from the source come back null.
    fn aligned_values(&self, target: &DataFrame, column: &str) -> Result<Series> {
        let source = self
            .data
            .column(column)
            .map_err(|_| {
                ProcessingError::SchemaMismatch(format!(
                    "imputation source has no column '{}'",
                    column
                ))
            })?
            .as_materialized_series()
            .clone();

        match &self.alignment {
            ImputationAlignment::RowPosition => {
                if source.len() != target.height() {
                    return Err(ProcessingError::Alignment {
                        column: column.to_string(),
                        expected: target.height(),
                        actual: source.len(),
                    });
                }
                Ok(source)
            }
            ImputationAlignment::ById(id_column) => {
                let source_ids = self.id_keys(&self.data, id_column, "Imputation source id")?;
                let target_ids = self.id_keys(target, id_column, "Dataset id")?;

                let mut position_by_id = HashMap::with_capacity(source_ids.len());
                for (row, id) in source_ids.into_iter().enumerate() {
                    if let Some(id) = id {
                        position_by_id.insert(id, row as IdxSize);
                    }
                }

                let positions: Vec<Option<IdxSize>> = target_ids
                    .iter()
                    .map(|id| id.as_ref().and_then(|id| position_by_id.get(id).copied()))
                    .collect();
                let idx = IdxCa::new("idx".into(), positions);
                Ok(source.take(&idx)?)
            }
        }
    }

    fn id_keys(&self, df: &DataFrame, id_column: &str, role: &str) -> Result<Vec<Option<String>>> {
        let ids = df
            .column(id_column)
            .map_err(|_| ProcessingError::missing_column(id_column, role))?;
        cell_keys(ids.as_materialized_series())
    }
}

/// Null out replacement cells where `target` already holds a value.
fn needed_only(replacement: &Series, target: &Series) -> Result<Series> {
    if replacement.dtype() != &DataType::String {
        return Ok(replacement.clone());
    }
    let values: Vec<Option<&str>> = target
        .is_null()
        .into_iter()
        .zip(replacement.str()?.into_iter())
        .map(|(missing, fill)| if missing == Some(true) { fill } else { None })
        .collect();
    Ok(Series::new(replacement.name().clone(), values))
}

/// Fill the missing cells of `column` from `source`.
///
/// The source is checked against the dataset even when nothing is missing.
/// Non-missing cells are never touched, and source cells are only parsed
/// where they are used. The filled column takes the target
/// column's type family: string columns stay strings, numeric columns become
/// `Float64`, boolean columns stay boolean.
pub fn impute_from_source(
    df: DataFrame,
    column: &str,
    source: &ImputationSource,
) -> Result<DataFrame> {
    let mut df = df;
    let target = df
        .column(column)
        .map_err(|_| ProcessingError::missing_column(column, "Imputed"))?
        .as_materialized_series()
        .clone();

    let replacement = source.aligned_values(&df, column)?;
    if target.null_count() == 0 {
        debug!("No missing values in '{}', imputation skipped", column);
        return Ok(df);
    }

    let name = target.name().clone();
    let mut filled_count = 0usize;

    let filled = match target.dtype() {
        DataType::String => {
            let replacement = replacement.cast(&DataType::String)?;
            let values: Vec<Option<String>> = target
                .str()?
                .into_iter()
                .zip(replacement.str()?.into_iter())
                .map(|(current, fill)| match current {
                    Some(v) => Some(v.to_string()),
                    None => {
                        if fill.is_some() {
                            filled_count += 1;
                        }
                        fill.map(str::to_string)
                    }
                })
                .collect();
            Series::new(name, values)
        }
        dtype if is_numeric_dtype(dtype) => {
            let target = target.cast(&DataType::Float64)?;
            let replacement = to_float_series(&needed_only(&replacement, &target)?)?;
            let values: Vec<Option<f64>> = target
                .f64()?
                .into_iter()
                .zip(replacement.f64()?.into_iter())
                .map(|(current, fill)| match current {
                    Some(v) => Some(v),
                    None => {
                        if fill.is_some() {
                            filled_count += 1;
                        }
                        fill
                    }
                })
                .collect();
            Series::new(name, values)
        }
        DataType::Boolean => {
            let replacement = replacement.cast(&DataType::Boolean)?;
            let values: Vec<Option<bool>> = target
                .bool()?
                .into_iter()
                .zip(replacement.bool()?.into_iter())
                .map(|(current, fill)| {
                    if current.is_none() && fill.is_some() {
                        filled_count += 1;
                    }
                    current.or(fill)
                })
                .collect();
            Series::new(name, values)
        }
        _ => return Err(type_mismatch(&target, "string, numeric or boolean")),
    };

    debug!("Imputed {} values in '{}' from source", filled_count, column);
    df.replace(column, filled)?;
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fills_only_missing_positions() {
        let df = df!["type" => [Some("tree"), None, Some("shrub")]].unwrap();
        let source = ImputationSource::new(df!["type" => ["x", "vine", "y"]].unwrap());

        let out = impute_from_source(df, "type", &source).unwrap();
        let values: Vec<Option<&str>> = out
            .column("type")
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(values, vec![Some("tree"), Some("vine"), Some("shrub")]);
    }

    #[test]
    fn test_row_count_mismatch_is_alignment_error() {
        let df = df!["type" => [Some("tree"), None, Some("shrub")]].unwrap();
        let source = ImputationSource::new(df!["type" => ["x", "vine"]].unwrap());

        let err = impute_from_source(df, "type", &source).unwrap_err();
        assert!(matches!(
            err,
            ProcessingError::Alignment {
                expected: 3,
                actual: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_short_source_rejected_without_missing_values() {
        let df = df!["type" => ["tree", "shrub", "vine"]].unwrap();
        let source = ImputationSource::new(df!["type" => ["x"]].unwrap());

        let err = impute_from_source(df, "type", &source).unwrap_err();
        assert!(matches!(
            err,
            ProcessingError::Alignment {
                expected: 3,
                actual: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_unused_source_text_is_not_parsed() {
        let df = df!["hardiness_max" => [Some(9.0), None]].unwrap();
        let source = ImputationSource::new(df!["hardiness_max" => ["unknown", "7"]].unwrap());

        let out = impute_from_source(df, "hardiness_max", &source).unwrap();
        let values: Vec<Option<f64>> = out
            .column("hardiness_max")
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(values, vec![Some(9.0), Some(7.0)]);
    }

    #[test]
    fn test_numeric_target_parses_string_source() {
        let df = df!["hardiness_min" => [Some(3.0), None]].unwrap();
        let source = ImputationSource::new(df!["hardiness_min" => ["1", "6"]].unwrap());

        let out = impute_from_source(df, "hardiness_min", &source).unwrap();
        let values: Vec<Option<f64>> = out
            .column("hardiness_min")
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(values, vec![Some(3.0), Some(6.0)]);
    }

    #[test]
    fn test_alignment_by_id_ignores_row_order() {
        let df = df![
            "id" => [1i64, 2, 3],
            "type" => [None, Some("tree"), None],
        ]
        .unwrap();
        let source = ImputationSource::with_alignment(
            df![
                "id" => [3i64, 1],
                "type" => ["vine", "shrub"],
            ]
            .unwrap(),
            ImputationAlignment::ById("id".to_string()),
        );

        let out = impute_from_source(df, "type", &source).unwrap();
        let values: Vec<Option<&str>> = out
            .column("type")
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(values, vec![Some("shrub"), Some("tree"), Some("vine")]);
    }

    #[test]
    fn test_missing_source_column_is_schema_mismatch() {
        let df = df!["type" => [Option::<&str>::None]].unwrap();
        let source = ImputationSource::new(df!["other" => ["x"]].unwrap());
        let err = impute_from_source(df, "type", &source).unwrap_err();
        assert_eq!(err.error_code(), "SCHEMA_MISMATCH");
    }
}
