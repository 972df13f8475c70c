//! Feature cleaning for raw plant catalogs.
//!
//! This module provides:
//! - Generic normalization ([`FeatureCleaner`]): lowercasing, list-literal
//!   parsing, boolean coercion
//! - Shared primitives used by every specialized cleaner: [`mask_outliers`]
//!   and [`impute_from_source`](crate::imputation::impute_from_source)
//! - One cleaner per raw attribute group: hardiness, maintenance, sunlight
//!   and plant type
//!
//! Each cleaner is a [`FeatureTransform`]: it takes the table by value and
//! returns the transformed table, or an error and no partial result.

mod hardiness;
mod list_literal;
mod maintenance;
mod plant_type;
mod sunlight;

pub use hardiness::HardinessCleaner;
pub use list_literal::parse_list_literal;
pub use maintenance::{MaintenanceCleaner, care_to_maintenance, watering_to_maintenance};
pub use plant_type::TypeCleaner;
pub use sunlight::{SunlightCategory, SunlightCleaner};

use crate::config::NormalizationConfig;
use crate::error::{ProcessingError, Result};
use crate::utils::{cell_keys, is_numeric_dtype, list_series, require_column, type_mismatch};
use polars::prelude::*;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// A single table-to-table cleaning step.
pub trait FeatureTransform: Send + Sync {
    /// Short stage name used in logs and error context.
    fn name(&self) -> &'static str;

    /// Apply the step to the whole table.
    fn apply(&self, df: DataFrame) -> Result<DataFrame>;
}

/// Generic normalization applied before the feature-specific cleaners.
pub struct FeatureCleaner {
    config: NormalizationConfig,
}

impl FeatureCleaner {
    pub fn new(config: NormalizationConfig) -> Self {
        Self { config }
    }
}

impl FeatureTransform for FeatureCleaner {
    fn name(&self) -> &'static str {
        "normalize"
    }

    fn apply(&self, df: DataFrame) -> Result<DataFrame> {
        let df = lowercase(df, &self.config.lowercase)?;
        let df = parse_list_columns(df, &self.config.list_columns)?;
        coerce_booleans(df, &self.config.boolean_defaults)
    }
}

/// Lowercase every value of the named string columns.
pub fn lowercase<S: AsRef<str>>(df: DataFrame, columns: &[S]) -> Result<DataFrame> {
    let mut df = df;
    for column in columns {
        let column = column.as_ref();
        let series = require_column(&df, column, "Lowercase")?;
        if series.dtype() != &DataType::String {
            return Err(type_mismatch(&series, "string"));
        }
        let lowered: Vec<Option<String>> = series
            .str()?
            .into_iter()
            .map(|v| v.map(str::to_lowercase))
            .collect();
        df.replace(column, Series::new(series.name().clone(), lowered))?;
    }
    Ok(df)
}

/// Lowercase a token and collapse runs of whitespace to one space.
pub fn normalize_token(token: &str) -> String {
    token
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse list-literal columns into `List(String)` columns of normalized tokens.
///
/// Columns that are already lists only get their tokens normalized. A null
/// cell becomes an empty list.
pub fn parse_list_columns<S: AsRef<str>>(df: DataFrame, columns: &[S]) -> Result<DataFrame> {
    let mut df = df;
    for column in columns {
        let column = column.as_ref();
        let series = require_column(&df, column, "List")?;

        let rows: Vec<Vec<String>> = match series.dtype() {
            DataType::String => {
                let mut rows = Vec::with_capacity(series.len());
                for (row, cell) in series.str()?.into_iter().enumerate() {
                    let tokens = match cell {
                        Some(text) => parse_list_literal(text).map_err(|reason| {
                            ProcessingError::Parse {
                                column: column.to_string(),
                                row,
                                reason,
                            }
                        })?,
                        None => Vec::new(),
                    };
                    rows.push(tokens.iter().map(|t| normalize_token(t)).collect());
                }
                rows
            }
            DataType::List(_) => crate::utils::string_lists(&series)?
                .into_iter()
                .map(|tokens| tokens.iter().map(|t| normalize_token(t)).collect())
                .collect(),
            _ => return Err(type_mismatch(&series, "list literal string")),
        };

        df.replace(column, list_series(series.name().clone(), rows))?;
    }
    Ok(df)
}

/// Map `"TRUE"`/`"FALSE"` to booleans; every other token, null included,
/// takes the column's default.
pub fn coerce_booleans(df: DataFrame, defaults: &BTreeMap<String, bool>) -> Result<DataFrame> {
    let mut df = df;
    for (column, &default) in defaults {
        let series = require_column(&df, column, "Boolean")?;
        let values: Vec<bool> = match series.dtype() {
            DataType::String => series
                .str()?
                .into_iter()
                .map(|v| match v {
                    Some("TRUE") => true,
                    Some("FALSE") => false,
                    _ => default,
                })
                .collect(),
            DataType::Boolean => series
                .bool()?
                .into_iter()
                .map(|v| v.unwrap_or(default))
                .collect(),
            other => {
                debug!(
                    "Column '{}' has type {}, all {} values set to default {}",
                    column,
                    other,
                    series.len(),
                    default
                );
                vec![default; series.len()]
            }
        };
        df.replace(column, Series::new(series.name().clone(), values))?;
    }
    Ok(df)
}

/// Replace every value of `column` not in `allowed` with null. Rows are kept.
pub fn mask_outliers<S: AsRef<str>>(
    df: DataFrame,
    column: &str,
    allowed: &[S],
) -> Result<DataFrame> {
    let mut df = df;
    let series = require_column(&df, column, "Masked")?;
    let allowed: HashSet<&str> = allowed.iter().map(|a| a.as_ref()).collect();

    let keys = cell_keys(&series)?;
    let keep: Vec<bool> = keys
        .iter()
        .map(|key| key.as_deref().is_some_and(|k| allowed.contains(k)))
        .collect();
    let masked_count = keys
        .iter()
        .zip(&keep)
        .filter(|(key, kept)| key.is_some() && !**kept)
        .count();

    if keep.iter().any(|kept| !kept) {
        debug!("Masked {} out-of-vocabulary values in '{}'", masked_count, column);
        df.replace(column, null_where_not(&series, &keep)?)?;
    }
    Ok(df)
}

/// Copy of `series` with every position where `keep` is false set to null.
fn null_where_not(series: &Series, keep: &[bool]) -> Result<Series> {
    let name = series.name().clone();
    let dtype = series.dtype();
    let out = if dtype == &DataType::String {
        let values: Vec<Option<&str>> = series
            .str()?
            .into_iter()
            .zip(keep)
            .map(|(v, &k)| if k { v } else { None })
            .collect();
        Series::new(name, values)
    } else if is_numeric_dtype(dtype) {
        let values: Vec<Option<f64>> = series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .zip(keep)
            .map(|(v, &k)| if k { v } else { None })
            .collect();
        Series::new(name, values)
    } else if dtype == &DataType::Boolean {
        let values: Vec<Option<bool>> = series
            .bool()?
            .into_iter()
            .zip(keep)
            .map(|(v, &k)| if k { v } else { None })
            .collect();
        Series::new(name, values)
    } else {
        return Err(type_mismatch(series, "string, numeric or boolean"));
    };
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imputation::{ImputationSource, impute_from_source};

    fn str_values(df: &DataFrame, column: &str) -> Vec<Option<String>> {
        df.column(column)
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect()
    }

    #[test]
    fn test_lowercase() {
        let df = df!["type" => [Some("Deciduous Tree"), None]].unwrap();
        let out = lowercase(df, &["type"]).unwrap();
        assert_eq!(
            str_values(&out, "type"),
            vec![Some("deciduous tree".to_string()), None]
        );
    }

    #[test]
    fn test_lowercase_non_string_is_type_mismatch() {
        let df = df!["hardiness" => [1i64, 2]].unwrap();
        let err = lowercase(df, &["hardiness"]).unwrap_err();
        assert_eq!(err.error_code(), "TYPE_MISMATCH");
    }

    #[test]
    fn test_lowercase_missing_column_is_configuration_error() {
        let df = df!["type" => ["tree"]].unwrap();
        let err = lowercase(df, &["cycle"]).unwrap_err();
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
    }

    #[test]
    fn test_parse_list_columns_normalizes_tokens() {
        let df = df!["sunlight" => [Some("['Full  Sun', 'part shade']"), None]].unwrap();
        let out = parse_list_columns(df, &["sunlight"]).unwrap();
        let lists =
            crate::utils::string_lists(out.column("sunlight").unwrap().as_materialized_series())
                .unwrap();
        assert_eq!(
            lists,
            vec![
                vec!["full sun".to_string(), "part shade".to_string()],
                Vec::new()
            ]
        );
    }

    #[test]
    fn test_parse_list_columns_reports_row() {
        let df = df!["attracts" => ["['bees']", "['birds'"]].unwrap();
        let err = parse_list_columns(df, &["attracts"]).unwrap_err();
        assert!(matches!(err, ProcessingError::Parse { row: 1, .. }));
    }

    #[test]
    fn test_coerce_booleans_silent_default() {
        let df = df![
            "poisonous_to_pets" => [Some("TRUE"), Some("FALSE"), Some("true"), None, Some("maybe")],
        ]
        .unwrap();
        let defaults = BTreeMap::from([("poisonous_to_pets".to_string(), true)]);
        let out = coerce_booleans(df, &defaults).unwrap();
        let values: Vec<Option<bool>> = out
            .column("poisonous_to_pets")
            .unwrap()
            .as_materialized_series()
            .bool()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(
            values,
            vec![Some(true), Some(false), Some(true), Some(true), Some(true)]
        );
    }

    #[test]
    fn test_coerce_booleans_default_false() {
        let df = df!["indoor" => ["TRUE", "yes"]].unwrap();
        let defaults = BTreeMap::from([("indoor".to_string(), false)]);
        let out = coerce_booleans(df, &defaults).unwrap();
        let values: Vec<Option<bool>> = out
            .column("indoor")
            .unwrap()
            .as_materialized_series()
            .bool()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(values, vec![Some(true), Some(false)]);
    }

    #[test]
    fn test_coerce_booleans_other_dtype_takes_default() {
        let df = df!["edible" => [1i64, 0, 1]].unwrap();
        let defaults = BTreeMap::from([("edible".to_string(), false)]);
        let out = coerce_booleans(df, &defaults).unwrap();
        let values: Vec<Option<bool>> = out
            .column("edible")
            .unwrap()
            .as_materialized_series()
            .bool()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(values, vec![Some(false); 3]);
    }

    #[test]
    fn test_mask_outliers_keeps_rows() {
        let df = df!["maintenance" => [Some("low"), Some("very low"), None, Some("high")]].unwrap();
        let out = mask_outliers(df, "maintenance", &["low", "moderate", "high"]).unwrap();
        assert_eq!(out.height(), 4);
        assert_eq!(
            str_values(&out, "maintenance"),
            vec![Some("low".to_string()), None, None, Some("high".to_string())]
        );
    }

    #[test]
    fn test_mask_outliers_numeric_against_string_levels() {
        let df = df!["hardiness_max" => [Some(7i64), Some(42), None]].unwrap();
        let levels: Vec<String> = (1..=13).map(|z| z.to_string()).collect();
        let out = mask_outliers(df, "hardiness_max", &levels).unwrap();
        let values: Vec<Option<f64>> = out
            .column("hardiness_max")
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(values, vec![Some(7.0), None, None]);
    }

    #[test]
    fn test_mask_then_impute_is_noop_on_clean_column() {
        let df = df!["maintenance" => ["low", "moderate", "high"]].unwrap();
        let source = ImputationSource::new(df!["maintenance" => ["high", "high", "low"]].unwrap());

        let masked = mask_outliers(df.clone(), "maintenance", &["low", "moderate", "high"]).unwrap();
        let out = impute_from_source(masked, "maintenance", &source).unwrap();
        assert!(out.equals_missing(&df));
    }
}
