//! Command-line interface
//!
//! `stackcast train` runs the full batch job against the two input tables
//! and the feature-name list; `stackcast predict` replays a persisted bundle
//! against a new table.

use clap::{Parser, Subcommand};
use polars::prelude::*;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

use crate::bundle::ModelBundle;
use crate::config::TrainerConfig;
use crate::data::{extract_features, load_table, read_feature_names};
use crate::pipeline;

#[derive(Parser)]
#[command(name = "stackcast")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Specialist-ensemble forecasting trainer")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train specialists and the stacked meta-learner, then persist the bundle
    Train {
        /// Training table (CSV or Parquet)
        #[arg(long)]
        train: PathBuf,

        /// Held-out table, row-aligned with the same columns
        #[arg(long)]
        test: PathBuf,

        /// Newline-delimited feature-name list, in table column order
        #[arg(long)]
        features: PathBuf,

        /// Optional JSON config overriding the built-in defaults
        #[arg(long)]
        config: Option<PathBuf>,

        /// Label column name (overrides the config)
        #[arg(long)]
        target: Option<String>,

        /// Random seed (overrides the config)
        #[arg(long)]
        seed: Option<u64>,

        /// Output directory for the bundle and CSV side outputs
        #[arg(short, long, default_value = "artifacts")]
        output: PathBuf,
    },

    /// Replay a persisted bundle against a new feature table
    Predict {
        /// Bundle written by a training run
        #[arg(long)]
        bundle: PathBuf,

        /// Feature table (CSV or Parquet)
        #[arg(long)]
        data: PathBuf,

        /// Output predictions file
        #[arg(short, long, default_value = "predictions.csv")]
        output: PathBuf,
    },
}

pub fn cmd_train(
    train_path: &PathBuf,
    test_path: &PathBuf,
    features_path: &PathBuf,
    config_path: Option<&PathBuf>,
    target: Option<&str>,
    seed: Option<u64>,
    output_dir: &PathBuf,
) -> anyhow::Result<()> {
    let mut config = match config_path {
        Some(path) => TrainerConfig::from_path(path)?,
        None => TrainerConfig::default(),
    };
    if let Some(target) = target {
        config = config.with_label_column(target);
    }
    if let Some(seed) = seed {
        config = config.with_seed(seed);
    }

    let start = Instant::now();
    let train_df = load_table(train_path)?;
    let test_df = load_table(test_path)?;
    let feature_names = read_feature_names(features_path)?;

    let outcome = pipeline::run(&config, &train_df, &test_df, &feature_names)?;

    let test = crate::data::load_dataset(&test_df, &feature_names, &config.label_column)?;
    pipeline::write_outputs(&outcome, &test, output_dir)?;

    info!(
        n_specialists = outcome.specialists.len(),
        elapsed = ?start.elapsed(),
        "training run complete"
    );
    Ok(())
}

pub fn cmd_predict(
    bundle_path: &PathBuf,
    data_path: &PathBuf,
    output_path: &PathBuf,
) -> anyhow::Result<()> {
    let bundle = ModelBundle::load(bundle_path)?;
    let df = load_table(data_path)?;

    // The bundle carries the feature-name order it was trained with; replay
    // extraction against exactly that order.
    let feature_names: Vec<String> =
        bundle.groups.feature_names().iter().cloned().collect();
    let x = extract_features(&df, &feature_names)?;

    let predictions = bundle.predict(&x)?;

    let mut out = DataFrame::new(vec![
        Column::new("index".into(), (0..predictions.len() as u64).collect::<Vec<u64>>()),
        Column::new("ensemble_prediction".into(), predictions.to_vec()),
    ])?;
    let mut file = std::fs::File::create(output_path)?;
    CsvWriter::new(&mut file).finish(&mut out)?;

    info!(
        n_rows = predictions.len(),
        output = %output_path.display(),
        "predictions written"
    );
    Ok(())
}
