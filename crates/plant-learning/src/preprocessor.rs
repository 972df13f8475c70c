//! Feature encoding for the recommender.
//!
//! [`RecommendationPreprocessor::fit`] learns one [`ColumnEncoding`] per
//! feature column and returns an immutable [`FittedPreprocessor`]:
//!
//! | Role        | Encoding                                           |
//! |-------------|----------------------------------------------------|
//! | nominal     | one-hot over the sorted categories seen at fit     |
//! | numeric     | `(x - median) / IQR`, IQR of 0 treated as 1        |
//! | maintenance | position in the configured order                   |
//! | sunlight    | position in the configured order                   |
//! | other       | passed through, booleans as 0/1                    |
//!
//! Output columns follow the table order above; passthrough columns keep
//! their input order.
//!
//! # Example
//!
//! ```rust,ignore
//! use plant_learning::{ColumnRoles, RecommendationPreprocessor};
//!
//! let fitted = RecommendationPreprocessor::new(ColumnRoles::default()).fit(&x)?;
//! let encoded = fitted.transform(&x)?;
//! fitted.save("preprocessor.json")?;
//! ```

use crate::artifact::{FORMAT_VERSION, Versioned, load_json, save_json};
use crate::config::ColumnRoles;
use crate::error::LearningError;
use crate::matrix::FeatureMatrix;
use chrono::{DateTime, Utc};
use plant_processing::utils::{cell_keys, is_numeric_dtype, to_float_series};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tracing::{debug, info};

/// How one input column is turned into output features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnEncoding {
    /// One indicator per category. Unseen values encode as all zeros.
    OneHot {
        column: String,
        categories: Vec<String>,
    },
    /// Centered on `center` and divided by `scale`.
    Robust {
        column: String,
        center: f64,
        scale: f64,
    },
    /// Index of the value in `categories`. Unseen values are an error.
    Ordinal {
        column: String,
        categories: Vec<String>,
    },
    /// Numeric value as is, booleans as 0/1.
    Passthrough { column: String },
}

impl ColumnEncoding {
    /// The input column this encoding reads.
    pub fn column(&self) -> &str {
        match self {
            ColumnEncoding::OneHot { column, .. }
            | ColumnEncoding::Robust { column, .. }
            | ColumnEncoding::Ordinal { column, .. }
            | ColumnEncoding::Passthrough { column } => column,
        }
    }

    /// Names of the output features, `<column>_<category>` for one-hot.
    pub fn output_columns(&self) -> Vec<String> {
        match self {
            ColumnEncoding::OneHot { column, categories } => categories
                .iter()
                .map(|category| format!("{}_{}", column, category))
                .collect(),
            other => vec![other.column().to_string()],
        }
    }

    /// Encode one column into output columns, column-major.
    fn encode(&self, series: &Series) -> Result<Vec<Vec<f64>>, LearningError> {
        let n = series.len();
        match self {
            ColumnEncoding::OneHot { categories, .. } => {
                let position: HashMap<&str, usize> = categories
                    .iter()
                    .enumerate()
                    .map(|(i, c)| (c.as_str(), i))
                    .collect();
                let mut out = vec![vec![0.0; n]; categories.len()];
                for (row, key) in cell_keys(series)?.iter().enumerate() {
                    if let Some(&i) = key.as_deref().and_then(|k| position.get(k)) {
                        out[i][row] = 1.0;
                    }
                }
                Ok(out)
            }
            ColumnEncoding::Robust {
                column,
                center,
                scale,
            } => {
                let floats = to_float_series(series)?;
                let mut out = Vec::with_capacity(n);
                for (row, value) in floats.f64()?.into_iter().enumerate() {
                    match value.filter(|v| !v.is_nan()) {
                        Some(v) => out.push((v - center) / scale),
                        None => return Err(missing_value(column, row)),
                    }
                }
                Ok(vec![out])
            }
            ColumnEncoding::Ordinal { column, categories } => {
                let mut out = Vec::with_capacity(n);
                for (row, key) in cell_keys(series)?.into_iter().enumerate() {
                    let key = key.ok_or_else(|| missing_value(column, row))?;
                    let index = categories.iter().position(|c| *c == key).ok_or_else(|| {
                        LearningError::SchemaMismatch(format!(
                            "value '{}' in column '{}' is not one of {:?}",
                            key, column, categories
                        ))
                    })?;
                    out.push(index as f64);
                }
                Ok(vec![out])
            }
            ColumnEncoding::Passthrough { column } => {
                Ok(vec![passthrough_values(series, column)?])
            }
        }
    }
}

fn missing_value(column: &str, row: usize) -> LearningError {
    LearningError::InvalidData(format!(
        "column '{}' has a missing value at row {}",
        column, row
    ))
}

fn type_mismatch(series: &Series, expected: &str) -> LearningError {
    LearningError::TypeMismatch {
        column: series.name().to_string(),
        expected: expected.to_string(),
        actual: series.dtype().to_string(),
    }
}

/// Booleans become 0/1 and numbers are cast. String cells are accepted when
/// they spell a boolean or a number, which covers hand-written query records.
fn passthrough_values(series: &Series, column: &str) -> Result<Vec<f64>, LearningError> {
    let dtype = series.dtype();
    let values: Vec<Option<f64>> = if dtype == &DataType::Boolean {
        series
            .bool()?
            .into_iter()
            .map(|v| v.map(|b| if b { 1.0 } else { 0.0 }))
            .collect()
    } else if is_numeric_dtype(dtype) {
        series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| v.filter(|x| !x.is_nan()))
            .collect()
    } else if dtype == &DataType::String {
        let mut values = Vec::with_capacity(series.len());
        for cell in series.str()?.into_iter() {
            let value = match cell.map(str::trim) {
                None => None,
                Some(text) if text.eq_ignore_ascii_case("true") => Some(1.0),
                Some(text) if text.eq_ignore_ascii_case("false") => Some(0.0),
                Some(text) => Some(
                    text.parse::<f64>()
                        .map_err(|_| type_mismatch(series, "boolean or numeric"))?,
                ),
            };
            values.push(value);
        }
        values
    } else {
        return Err(type_mismatch(series, "boolean or numeric"));
    };

    values
        .into_iter()
        .enumerate()
        .map(|(row, v)| v.ok_or_else(|| missing_value(column, row)))
        .collect()
}

/// Linear-interpolated percentile of sorted values, `p` in `[0, 100]`.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let position = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (position - lower as f64)
}

/// Median and interquartile range of the non-missing values.
fn robust_parameters(series: &Series) -> Result<(f64, f64), LearningError> {
    let floats = to_float_series(series)?;
    let mut values: Vec<f64> = floats
        .f64()?
        .into_iter()
        .flatten()
        .filter(|v| !v.is_nan())
        .collect();
    if values.is_empty() {
        return Err(LearningError::InvalidData(format!(
            "column '{}' has no values to fit a scale on",
            series.name()
        )));
    }
    values.sort_by(f64::total_cmp);

    let center = percentile(&values, 50.0);
    let iqr = percentile(&values, 75.0) - percentile(&values, 25.0);
    let scale = if iqr.abs() < 10.0 * f64::EPSILON {
        1.0
    } else {
        iqr
    };
    Ok((center, scale))
}

/// Learns the encoding of a feature table.
#[derive(Debug, Clone)]
pub struct RecommendationPreprocessor {
    roles: ColumnRoles,
}

impl RecommendationPreprocessor {
    pub fn new(roles: ColumnRoles) -> Self {
        Self { roles }
    }

    /// Fit every column of `x`.
    ///
    /// Every role column must be present. Columns without a role must be
    /// boolean or numeric. Fitting the same table twice yields the same
    /// encodings.
    pub fn fit(&self, x: &DataFrame) -> Result<FittedPreprocessor, LearningError> {
        let roles = &self.roles;
        let series = |column: &str, role: &str| -> Result<Series, LearningError> {
            x.column(column)
                .map(|c| c.as_materialized_series().clone())
                .map_err(|_| LearningError::missing_column(column, role))
        };

        let mut encodings = Vec::with_capacity(x.width());

        let nominal = series(&roles.nominal, "Nominal")?;
        let categories: BTreeSet<String> = cell_keys(&nominal)?.into_iter().flatten().collect();
        debug!(
            "One-hot '{}': {} categories",
            roles.nominal,
            categories.len()
        );
        encodings.push(ColumnEncoding::OneHot {
            column: roles.nominal.clone(),
            categories: categories.into_iter().collect(),
        });

        for column in &roles.numeric {
            let (center, scale) = robust_parameters(&series(column, "Numeric")?)?;
            debug!("Robust '{}': center={}, scale={}", column, center, scale);
            encodings.push(ColumnEncoding::Robust {
                column: column.clone(),
                center,
                scale,
            });
        }

        for (column, order, role) in [
            (&roles.maintenance, &roles.maintenance_order, "Maintenance"),
            (&roles.sunlight, &roles.sunlight_order, "Sunlight"),
        ] {
            let values = series(column, role)?;
            let unknown = cell_keys(&values)?
                .into_iter()
                .flatten()
                .find(|v| !order.contains(v));
            if let Some(value) = unknown {
                return Err(LearningError::SchemaMismatch(format!(
                    "value '{}' in column '{}' is not one of {:?}",
                    value, column, order
                )));
            }
            encodings.push(ColumnEncoding::Ordinal {
                column: column.clone(),
                categories: order.clone(),
            });
        }

        let with_role = roles.encoded_columns();
        for column in x.get_columns() {
            let name = column.name().as_str();
            if with_role.contains(&name) {
                continue;
            }
            let dtype = column.dtype();
            if dtype != &DataType::Boolean && !is_numeric_dtype(dtype) {
                return Err(type_mismatch(
                    column.as_materialized_series(),
                    "boolean or numeric",
                ));
            }
            encodings.push(ColumnEncoding::Passthrough {
                column: name.to_string(),
            });
        }

        let output_columns: Vec<String> = encodings
            .iter()
            .flat_map(ColumnEncoding::output_columns)
            .collect();
        info!(
            "Preprocessor fitted: {} input columns -> {} features",
            encodings.len(),
            output_columns.len()
        );

        Ok(FittedPreprocessor {
            format_version: FORMAT_VERSION,
            fitted_at: Utc::now(),
            input_columns: encodings.iter().map(|e| e.column().to_string()).collect(),
            encodings,
            output_columns,
        })
    }
}

/// A fitted, immutable feature encoding.
///
/// Persist it with [`save`](Self::save) and reuse it unchanged for every
/// query; it is never refit implicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedPreprocessor {
    format_version: u32,
    fitted_at: DateTime<Utc>,
    input_columns: Vec<String>,
    encodings: Vec<ColumnEncoding>,
    output_columns: Vec<String>,
}

impl Versioned for FittedPreprocessor {
    fn format_version(&self) -> u32 {
        self.format_version
    }
}

impl FittedPreprocessor {
    pub fn fitted_at(&self) -> DateTime<Utc> {
        self.fitted_at
    }

    /// Columns a table must carry to be transformed, in encoding order.
    pub fn input_columns(&self) -> &[String] {
        &self.input_columns
    }

    pub fn output_columns(&self) -> &[String] {
        &self.output_columns
    }

    pub fn encodings(&self) -> &[ColumnEncoding] {
        &self.encodings
    }

    /// Encode `df` with the fitted parameters.
    ///
    /// Columns of `df` that were not seen at fit time are ignored.
    pub fn transform(&self, df: &DataFrame) -> Result<FeatureMatrix, LearningError> {
        let mut data = Vec::with_capacity(self.output_columns.len());
        for encoding in &self.encodings {
            let column = df
                .column(encoding.column())
                .map_err(|_| LearningError::missing_column(encoding.column(), "Feature"))?;
            data.extend(encoding.encode(column.as_materialized_series())?);
        }
        debug!(
            "Transformed {} rows into {} features",
            df.height(),
            self.output_columns.len()
        );
        FeatureMatrix::from_columns(self.output_columns.clone(), data)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), LearningError> {
        save_json(self, path.as_ref())
    }

    /// Load a preprocessor written by [`save`](Self::save).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LearningError> {
        load_json(path.as_ref())
    }
}
