//! CLI entry point for cleaning plant catalogs and serving recommendations.

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use plant_learning::{DISTANCE_COLUMN, Recommender, TrainingConfig};
use plant_processing::{CleaningPipeline, FeatureConfig, lists_to_literals};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Plant catalog cleaning and nearest-neighbor recommendations",
    long_about = "Cleans a raw plant catalog, trains a nearest-neighbor recommender on the \
                  non-toxic plants and answers similarity queries.\n\n\
                  EXAMPLES:\n  \
                  plant-recommend clean -i plants.csv --type-source types.csv -o clean.csv\n  \
                  plant-recommend train -i clean.csv -m model/\n  \
                  plant-recommend recommend -m model/ -q query.csv"
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Only show warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clean a raw catalog into a feature table
    Clean {
        /// Raw catalog CSV
        #[arg(short, long)]
        input: PathBuf,

        /// Cleaned output CSV
        #[arg(short, long)]
        output: PathBuf,

        /// Feature configuration JSON (built-in defaults if omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// CSV supplying plant types the cleaner leaves missing
        #[arg(long)]
        type_source: Option<PathBuf>,

        /// CSV supplying hardiness bounds the cleaner leaves missing
        #[arg(long)]
        hardiness_source: Option<PathBuf>,
    },

    /// Fit the preprocessor and neighbor index on a cleaned catalog
    Train {
        /// Cleaned catalog CSV
        #[arg(short, long)]
        input: PathBuf,

        /// Directory the fitted artifacts are written to
        #[arg(short, long)]
        model_dir: PathBuf,

        /// Training configuration JSON (built-in defaults if omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the configured number of neighbors
        #[arg(short = 'k', long)]
        neighbors: Option<usize>,
    },

    /// Recommend plants similar to each query record
    Recommend {
        /// Directory written by `train`
        #[arg(short, long)]
        model_dir: PathBuf,

        /// CSV of query records in cleaned-feature form
        #[arg(short, long)]
        query: PathBuf,

        /// Write results to this CSV instead of printing them
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Initialize the tracing subscriber for logging.
fn init_logging(level: &str, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, args.quiet);

    match args.command {
        Command::Clean {
            input,
            output,
            config,
            type_source,
            hardiness_source,
        } => run_clean(
            &input,
            &output,
            config.as_deref(),
            type_source.as_deref(),
            hardiness_source.as_deref(),
        ),
        Command::Train {
            input,
            model_dir,
            config,
            neighbors,
        } => run_train(&input, &model_dir, config.as_deref(), neighbors),
        Command::Recommend {
            model_dir,
            query,
            output,
        } => run_recommend(&model_dir, &query, output.as_deref()),
    }
}

fn run_clean(
    input: &Path,
    output: &Path,
    config: Option<&Path>,
    type_source: Option<&Path>,
    hardiness_source: Option<&Path>,
) -> Result<()> {
    let config = match config {
        Some(path) => FeatureConfig::load(path)?,
        None => FeatureConfig::default(),
    };

    let mut builder = CleaningPipeline::builder().config(config);
    if let Some(path) = type_source {
        builder = builder.type_source(read_raw_csv(path)?);
    }
    if let Some(path) = hardiness_source {
        builder = builder.hardiness_source(read_raw_csv(path)?);
    }

    let raw = read_raw_csv(input)?;
    let outcome = builder.build()?.run(raw)?;
    for step in &outcome.steps {
        info!("  {}", step);
    }

    write_csv(lists_to_literals(outcome.data)?, output)?;
    info!(
        "Cleaned catalog written to {} in {} ms",
        output.display(),
        outcome.duration_ms
    );
    Ok(())
}

fn run_train(
    input: &Path,
    model_dir: &Path,
    config: Option<&Path>,
    neighbors: Option<usize>,
) -> Result<()> {
    let mut config = match config {
        Some(path) => TrainingConfig::load(path)?,
        None => TrainingConfig::default(),
    };
    if let Some(k) = neighbors {
        config.n_neighbors = k;
    }

    let clean = read_typed_csv(input)?;
    let recommender = Recommender::train(&clean, &config)?;
    recommender.save(model_dir)?;
    Ok(())
}

fn run_recommend(model_dir: &Path, query: &Path, output: Option<&Path>) -> Result<()> {
    let recommender = Recommender::load(model_dir)?;
    let records = read_typed_csv(query)?;
    if records.height() == 0 {
        return Err(anyhow!("Query file has no records: {}", query.display()));
    }

    let mut combined: Option<DataFrame> = None;
    for (n, result) in recommender.recommend_each(&records)?.into_iter().enumerate() {
        let result = result
            .lazy()
            .with_column(lit(n as u32).alias("query"))
            .collect()?;
        combined = Some(match combined {
            Some(acc) => acc.vstack(&result)?,
            None => result,
        });
    }
    let combined = combined.ok_or_else(|| anyhow!("No recommendations produced"))?;

    match output {
        Some(path) => {
            write_csv(combined, path)?;
            info!("Recommendations written to {}", path.display());
        }
        None => {
            // The table is the command's result, so it goes to stdout.
            println!("{}", combined);
            info!("Each query's rows are sorted by ascending '{}'", DISTANCE_COLUMN);
        }
    }
    Ok(())
}

/// Read every column as a string, as raw catalog exports require.
fn read_raw_csv(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(anyhow!("Input file not found: {}", path.display()));
    }
    info!("Loading {}", path.display());
    Ok(CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?)
}

/// Read with full schema inference, for cleaned tables and queries.
fn read_typed_csv(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(anyhow!("Input file not found: {}", path.display()));
    }
    info!("Loading {}", path.display());
    Ok(CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?)
}

fn write_csv(mut df: DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)?;
    Ok(())
}
