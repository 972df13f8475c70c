//! Toxicity filtering and training-data preparation.

use crate::config::TrainingConfig;
use crate::error::LearningError;
use polars::prelude::*;
use tracing::{debug, info, warn};

/// Keeps only plants whose toxicity flags are all false.
///
/// A missing flag counts as possibly toxic and excludes the row. The flag
/// columns are removed from the result.
#[derive(Debug, Clone)]
pub struct ToxicityFilter {
    columns: Vec<String>,
}

impl ToxicityFilter {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Filter `df` and drop the toxicity columns.
    pub fn apply(&self, df: &DataFrame) -> Result<DataFrame, LearningError> {
        let mut keep = vec![true; df.height()];

        for column in &self.columns {
            let series = df
                .column(column)
                .map_err(|_| LearningError::missing_column(column, "Toxicity"))?
                .as_materialized_series();
            if series.dtype() != &DataType::Boolean {
                return Err(LearningError::TypeMismatch {
                    column: column.clone(),
                    expected: "boolean".to_string(),
                    actual: series.dtype().to_string(),
                });
            }
            for (kept, flag) in keep.iter_mut().zip(series.bool()?.into_iter()) {
                *kept &= flag == Some(false);
            }
        }

        let mask = BooleanChunked::from_slice("safe".into(), &keep);
        let filtered = df.filter(&mask)?;
        debug!(
            "Toxicity filter kept {} of {} rows",
            filtered.height(),
            df.height()
        );
        Ok(filtered.drop_many(self.columns.iter().map(String::as_str)))
    }
}

/// Split a cleaned catalog into the feature matrix and the catalog it indexes.
///
/// Toxic plants are removed first. Rows with a missing value in any feature
/// column are then dropped, since no encoder accepts a missing value. The
/// returned catalog keeps every remaining column and lines up row for row
/// with the returned feature table, which lacks `training_only_columns`.
pub fn prepare_training_data(
    clean: &DataFrame,
    config: &TrainingConfig,
) -> Result<(DataFrame, DataFrame), LearningError> {
    let catalog = ToxicityFilter::new(config.toxicity_columns.iter().cloned()).apply(clean)?;

    for column in &config.training_only_columns {
        if catalog.column(column).is_err() {
            return Err(LearningError::missing_column(column, "Training-only"));
        }
    }
    let features = catalog.drop_many(config.training_only_columns.iter().map(String::as_str));

    let mut complete = vec![true; features.height()];
    for column in features.get_columns() {
        if column.null_count() == 0 {
            continue;
        }
        for (row, is_null) in column.is_null().into_iter().enumerate() {
            if is_null == Some(true) {
                complete[row] = false;
            }
        }
    }

    let dropped = complete.iter().filter(|c| !**c).count();
    let (features, catalog) = if dropped > 0 {
        warn!("Dropping {} rows with missing feature values", dropped);
        let mask = BooleanChunked::from_slice("complete".into(), &complete);
        (features.filter(&mask)?, catalog.filter(&mask)?)
    } else {
        (features, catalog)
    };

    info!(
        "Training data ready: {} rows x {} features",
        features.height(),
        features.width()
    );
    Ok((features, catalog))
}
