//! Dense encoded feature matrix.

use crate::error::LearningError;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Row-major matrix of encoded features with named columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    columns: Vec<String>,
    n_rows: usize,
    values: Vec<f64>,
}

impl FeatureMatrix {
    /// Build a matrix from column-major data, one `Vec` per named column.
    pub fn from_columns(columns: Vec<String>, data: Vec<Vec<f64>>) -> Result<Self, LearningError> {
        if columns.len() != data.len() {
            return Err(LearningError::InvalidData(format!(
                "{} column names for {} columns",
                columns.len(),
                data.len()
            )));
        }
        let n_rows = data.first().map_or(0, Vec::len);
        if let Some((name, column)) = columns.iter().zip(&data).find(|(_, c)| c.len() != n_rows) {
            return Err(LearningError::InvalidData(format!(
                "column '{}' has {} rows, expected {}",
                name,
                column.len(),
                n_rows
            )));
        }

        let n_cols = columns.len();
        let mut values = vec![0.0; n_rows * n_cols];
        for (col, column) in data.iter().enumerate() {
            for (row, value) in column.iter().enumerate() {
                values[row * n_cols + col] = *value;
            }
        }
        Ok(Self {
            columns,
            n_rows,
            values,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    /// Encoded values of one row. Panics if `row` is out of bounds.
    pub fn row(&self, row: usize) -> &[f64] {
        let n_cols = self.n_cols();
        &self.values[row * n_cols..(row + 1) * n_cols]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        (0..self.n_rows).map(move |row| self.row(row))
    }

    /// The matrix as a `Float64` table, for inspection and export.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let n_cols = self.n_cols();
        let columns: Vec<Column> = self
            .columns
            .iter()
            .enumerate()
            .map(|(col, name)| {
                let values: Vec<f64> = (0..self.n_rows)
                    .map(|row| self.values[row * n_cols + col])
                    .collect();
                Series::new(name.as_str().into(), values).into()
            })
            .collect();
        DataFrame::new(columns)
    }
}
