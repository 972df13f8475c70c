//! Integration tests for training and querying the recommender.
//!
//! Each test cleans `tests/fixtures/raw_plants.csv` with the default feature
//! configuration, then trains on the result.

use plant_learning::{
    DISTANCE_COLUMN, FittedPreprocessor, LearningError, Recommender, TrainingConfig,
};
use plant_processing::{CleaningPipeline, FeatureConfig};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use pretty_assertions::assert_eq;
use std::path::PathBuf;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_csv(filename: &str, infer_schema_length: Option<usize>) -> DataFrame {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(infer_schema_length)
        .try_into_reader_with_file_path(Some(fixtures_path().join(filename)))
        .expect("Failed to create CSV reader")
        .finish()
        .expect("Failed to read CSV file")
}

fn clean_catalog() -> DataFrame {
    CleaningPipeline::builder()
        .config(FeatureConfig::default())
        .build()
        .unwrap()
        .run(load_csv("raw_plants.csv", Some(0)))
        .unwrap()
        .data
}

fn train(k: usize) -> Recommender {
    let config = TrainingConfig::builder().n_neighbors(k).build().unwrap();
    Recommender::train(&clean_catalog(), &config).unwrap()
}

fn queries() -> DataFrame {
    load_csv("query.csv", None)
}

fn names(df: &DataFrame) -> Vec<String> {
    df.column("common_name")
        .unwrap()
        .as_materialized_series()
        .str()
        .unwrap()
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect()
}

fn distances(df: &DataFrame) -> Vec<f64> {
    df.column(DISTANCE_COLUMN)
        .unwrap()
        .as_materialized_series()
        .f64()
        .unwrap()
        .into_iter()
        .flatten()
        .collect()
}

/// A fresh directory under the system temp dir.
fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "plant-learning-{}-{}",
        name,
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

// ============================================================================
// Training
// ============================================================================

#[test]
fn test_catalog_excludes_toxic_and_incomplete_plants() {
    let recommender = train(3);

    // Fern and tomato are toxic; ivy has no maintenance level.
    assert_eq!(
        names(recommender.catalog()),
        vec!["Red Maple", "Lavender", "Sunflower", "Hosta", "Boxwood"]
    );
    assert_eq!(recommender.index().len(), 5);
    assert!(recommender.catalog().column("poisonous_to_pets").is_err());
}

#[test]
fn test_training_is_deterministic() {
    let first = train(3);
    let second = train(3);
    assert_eq!(
        first.preprocessor().encodings(),
        second.preprocessor().encodings()
    );
}

#[test]
fn test_missing_toxicity_column() {
    let clean = clean_catalog().drop("poisonous_to_humans").unwrap();
    let err = Recommender::train(&clean, &TrainingConfig::default()).unwrap_err();
    assert!(matches!(err, LearningError::SchemaMismatch(_)));
}

// ============================================================================
// Querying
// ============================================================================

#[test]
fn test_recommend_returns_k_rows_sorted() {
    let recommender = train(3);
    let query = queries().head(Some(1));

    let out = recommender.recommend(&query).unwrap();
    assert_eq!(out.height(), 3);
    assert_eq!(names(&out)[0], "Lavender");

    let d = distances(&out);
    assert_eq!(d[0], 0.0);
    assert!(d.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_k_larger_than_catalog_returns_every_plant() {
    let recommender = train(10);
    let out = recommender.recommend(&queries().head(Some(1))).unwrap();
    assert_eq!(out.height(), 5);
}

#[test]
fn test_recommend_each() {
    let recommender = train(2);
    let results = recommender.recommend_each(&queries()).unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(names(&results[0])[0], "Lavender");
    assert_eq!(names(&results[1])[0], "Boxwood");
}

#[test]
fn test_query_missing_feature_is_schema_mismatch() {
    let recommender = train(3);
    let query = queries().head(Some(1)).drop("perennial").unwrap();
    let err = recommender.recommend(&query).unwrap_err();
    assert_eq!(err.error_code(), "SCHEMA_MISMATCH");
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_save_and_load_give_same_recommendations() {
    let dir = scratch_dir("roundtrip");
    let recommender = train(3);
    recommender.save(&dir).unwrap();

    let loaded = Recommender::load(&dir).unwrap();
    let query = queries().head(Some(1));
    let before = recommender.recommend(&query).unwrap();
    let after = loaded.recommend(&query).unwrap();

    assert_eq!(loaded.catalog().dtypes(), recommender.catalog().dtypes());
    assert!(loaded.catalog().equals_missing(recommender.catalog()));
    assert!(
        before
            .drop(DISTANCE_COLUMN)
            .unwrap()
            .equals_missing(&after.drop(DISTANCE_COLUMN).unwrap())
    );
    for (a, b) in distances(&before).iter().zip(distances(&after)) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }
    assert_eq!(
        loaded.preprocessor().fitted_at(),
        recommender.preprocessor().fitted_at()
    );

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_load_rejects_other_format_version() {
    let dir = scratch_dir("version");
    train(3).save(&dir).unwrap();

    let path = dir.join("preprocessor.json");
    let mut json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    json["format_version"] = serde_json::json!(99);
    std::fs::write(&path, serde_json::to_string(&json).unwrap()).unwrap();

    let err = FittedPreprocessor::load(&path).unwrap_err();
    assert!(matches!(
        err,
        LearningError::ArtifactVersion {
            found: 99,
            expected: 1
        }
    ));

    std::fs::remove_dir_all(&dir).unwrap();
}
