//! Train-once, query-many recommendation facade.
//!
//! A [`Recommender`] bundles the fitted preprocessor, the neighbor index and
//! the non-toxic catalog rows the index points into. Query results are
//! catalog rows joined by index position, with a `_distance` column.
//!
//! # Example
//!
//! ```rust,ignore
//! use plant_learning::{Recommender, TrainingConfig};
//!
//! let recommender = Recommender::train(&clean, &TrainingConfig::default())?;
//! recommender.save("model/")?;
//!
//! let recommender = Recommender::load("model/")?;
//! let matches = recommender.recommend(&user_record)?;
//! ```

use crate::catalog::{read_catalog, write_catalog};
use crate::config::TrainingConfig;
use crate::engine::{Neighbor, NeighborIndex, RecommendationEngine};
use crate::error::LearningError;
use crate::preprocessor::{FittedPreprocessor, RecommendationPreprocessor};
use crate::toxicity::prepare_training_data;
use polars::prelude::*;
use std::fs;
use std::path::Path;
use tracing::info;

/// Name of the distance column appended to recommendation results.
pub const DISTANCE_COLUMN: &str = "_distance";

const PREPROCESSOR_FILE: &str = "preprocessor.json";
const INDEX_FILE: &str = "index.json";
const CATALOG_FILE: &str = "catalog.csv";
const CATALOG_SCHEMA_FILE: &str = "catalog_schema.json";

/// A fitted preprocessor, its neighbor index and the catalog behind it.
#[derive(Debug, Clone)]
pub struct Recommender {
    preprocessor: FittedPreprocessor,
    index: NeighborIndex,
    catalog: DataFrame,
}

impl Recommender {
    /// Filter `clean`, fit the preprocessor on the remaining rows and index them.
    pub fn train(clean: &DataFrame, config: &TrainingConfig) -> Result<Self, LearningError> {
        config.validate()?;
        let (features, catalog) = prepare_training_data(clean, config)?;
        if features.height() == 0 {
            return Err(LearningError::EmptyIndex);
        }

        let preprocessor = RecommendationPreprocessor::new(config.roles.clone()).fit(&features)?;
        let matrix = preprocessor.transform(&features)?;
        let index = RecommendationEngine::new(config.n_neighbors).fit(matrix)?;

        info!(
            "Recommender trained on {} of {} plants",
            catalog.height(),
            clean.height()
        );
        Ok(Self {
            preprocessor,
            index,
            catalog,
        })
    }

    pub fn preprocessor(&self) -> &FittedPreprocessor {
        &self.preprocessor
    }

    pub fn index(&self) -> &NeighborIndex {
        &self.index
    }

    /// Catalog rows in index order.
    pub fn catalog(&self) -> &DataFrame {
        &self.catalog
    }

    /// Recommend plants for a single user record.
    ///
    /// `record` must hold exactly one row carrying every feature column.
    pub fn recommend(&self, record: &DataFrame) -> Result<DataFrame, LearningError> {
        if record.height() != 1 {
            return Err(LearningError::InvalidData(format!(
                "expected one query record, got {}",
                record.height()
            )));
        }
        let encoded = self.preprocessor.transform(record)?;
        let neighbors = self.index.query(encoded.row(0))?;
        self.catalog_rows(&neighbors)
    }

    /// One result table per row of `records`, in row order.
    pub fn recommend_each(&self, records: &DataFrame) -> Result<Vec<DataFrame>, LearningError> {
        let encoded = self.preprocessor.transform(records)?;
        encoded
            .rows()
            .map(|row| {
                let neighbors = self.index.query(row)?;
                self.catalog_rows(&neighbors)
            })
            .collect()
    }

    fn catalog_rows(&self, neighbors: &[Neighbor]) -> Result<DataFrame, LearningError> {
        let rows: Vec<IdxSize> = neighbors.iter().map(|n| n.row as IdxSize).collect();
        let distances: Vec<f64> = neighbors.iter().map(|n| n.distance).collect();

        let mut out = self.catalog.take(&IdxCa::from_vec("idx".into(), rows))?;
        out.with_column(Series::new(DISTANCE_COLUMN.into(), distances))?;
        Ok(out)
    }

    /// Write the fitted artifacts and the catalog with its schema into `dir`.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<(), LearningError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        self.preprocessor.save(dir.join(PREPROCESSOR_FILE))?;
        self.index.save(dir.join(INDEX_FILE))?;
        write_catalog(
            &self.catalog,
            &dir.join(CATALOG_FILE),
            &dir.join(CATALOG_SCHEMA_FILE),
        )?;

        info!("Recommender saved to {}", dir.display());
        Ok(())
    }

    /// Load a recommender written by [`save`](Self::save).
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, LearningError> {
        let dir = dir.as_ref();
        let preprocessor = FittedPreprocessor::load(dir.join(PREPROCESSOR_FILE))?;
        let index = NeighborIndex::load(dir.join(INDEX_FILE))?;
        let catalog = read_catalog(&dir.join(CATALOG_FILE), &dir.join(CATALOG_SCHEMA_FILE))?;

        if catalog.height() != index.len() {
            return Err(LearningError::InvalidData(format!(
                "catalog has {} rows but the index holds {}",
                catalog.height(),
                index.len()
            )));
        }
        if preprocessor.output_columns() != index.feature_names() {
            return Err(LearningError::SchemaMismatch(
                "preprocessor output does not match the index features".to_string(),
            ));
        }

        info!(
            "Recommender loaded from {}: {} plants",
            dir.display(),
            catalog.height()
        );
        Ok(Self {
            preprocessor,
            index,
            catalog,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn clean() -> DataFrame {
        df![
            "id" => [1i64, 2, 3, 4, 5, 6],
            "common_name" => ["maple", "lavender", "sunflower", "fern", "tomato", "ivy"],
            "type" => ["tree", "herb", "flower", "shrub", "vegetable", "vine"],
            "sunlight" => ["full_sun", "full_sun", "full_sun", "full_shade", "full_sun", "part_shade"],
            "maintenance" => ["low", "low", "high", "moderate", "moderate", "low"],
            "hardiness_min" => [3.0, 5.0, 4.0, 10.0, 2.0, 6.0],
            "hardiness_max" => [9.0, 8.0, 4.0, 12.0, 2.0, 11.0],
            "poisonous_to_humans" => [false, false, false, true, false, false],
            "poisonous_to_pets" => [false, false, false, false, true, false],
            "indoor" => [false, false, false, true, false, true],
        ]
        .unwrap()
    }

    fn config(k: usize) -> TrainingConfig {
        TrainingConfig::builder().n_neighbors(k).build().unwrap()
    }

    fn ids(df: &DataFrame) -> Vec<i64> {
        df.column("id")
            .unwrap()
            .as_materialized_series()
            .i64()
            .unwrap()
            .into_iter()
            .flatten()
            .collect()
    }

    #[test]
    fn test_train_excludes_toxic_plants() {
        let recommender = Recommender::train(&clean(), &config(3)).unwrap();
        assert_eq!(ids(recommender.catalog()), vec![1, 2, 3, 6]);
        assert_eq!(recommender.index().len(), 4);
    }

    #[test]
    fn test_recommend_exact_match_first() {
        let recommender = Recommender::train(&clean(), &config(3)).unwrap();
        let record = df![
            "type" => ["herb"],
            "sunlight" => ["full_sun"],
            "maintenance" => ["low"],
            "hardiness_min" => [5.0],
            "hardiness_max" => [8.0],
            "indoor" => [false],
        ]
        .unwrap();

        let out = recommender.recommend(&record).unwrap();
        assert_eq!(out.height(), 3);
        assert_eq!(ids(&out)[0], 2);

        let distances: Vec<f64> = out
            .column(DISTANCE_COLUMN)
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(distances[0], 0.0);
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_recommend_rejects_several_records() {
        let recommender = Recommender::train(&clean(), &config(3)).unwrap();
        let records = clean().drop_many(["id", "common_name"]);
        let err = recommender.recommend(&records).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_DATA");
    }

    #[test]
    fn test_recommend_each_returns_one_table_per_record() {
        let recommender = Recommender::train(&clean(), &config(2)).unwrap();
        let records = recommender.catalog().clone();

        let results = recommender.recommend_each(&records).unwrap();
        assert_eq!(results.len(), 4);
        for (result, id) in results.iter().zip(ids(&records)) {
            assert_eq!(result.height(), 2);
            assert_eq!(ids(result)[0], id);
        }
    }

    #[test]
    fn test_load_keeps_string_ids() {
        let mut df = clean();
        df.replace(
            "id",
            Series::new("id".into(), ["007", "008", "009", "010", "011", "012"]),
        )
        .unwrap();
        let recommender = Recommender::train(&df, &config(3)).unwrap();

        let dir =
            std::env::temp_dir().join(format!("plant-recommender-ids-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        recommender.save(&dir).unwrap();
        let loaded = Recommender::load(&dir).unwrap();

        assert_eq!(loaded.catalog().dtypes(), recommender.catalog().dtypes());
        assert!(loaded.catalog().equals_missing(recommender.catalog()));
        let first = loaded
            .catalog()
            .column("id")
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap()
            .get(0)
            .map(str::to_string);
        assert_eq!(first, Some("007".to_string()));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_all_toxic_is_empty_index() {
        let df = clean()
            .lazy()
            .with_column(lit(true).alias("poisonous_to_pets"))
            .collect()
            .unwrap();
        let err = Recommender::train(&df, &config(3)).unwrap_err();
        assert!(matches!(err, LearningError::EmptyIndex));
    }
}
