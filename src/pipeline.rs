//! End-to-end training run
//!
//! Wires the stages together in their only valid order: group assignment →
//! specialist training → per-specialist evaluation → stacking → benchmark →
//! bundle assembly. The run either completes and writes every artifact, or
//! aborts on the first hard failure and writes nothing.

use polars::prelude::DataFrame;
use std::path::Path;
use tracing::{info, warn};

use crate::bundle::{write_metrics_csv, write_predictions_csv, ModelBundle};
use crate::config::TrainerConfig;
use crate::data::{load_dataset, Dataset};
use crate::error::Result;
use crate::evaluation::{evaluate, r_squared, SpecialistMetrics};
use crate::features::{Domain, FeatureGroups};
use crate::report::{benchmark, BenchmarkReport};
use crate::stacking::{EnsembleStacker, StackedEnsemble};
use crate::training::{Specialist, SpecialistTrainer};

/// Everything a completed run produced.
pub struct TrainingOutcome {
    pub groups: FeatureGroups,
    pub specialists: Vec<Specialist>,
    pub specialist_metrics: Vec<(Domain, SpecialistMetrics)>,
    pub ensemble: StackedEnsemble,
    pub benchmark: BenchmarkReport,
    pub bundle: ModelBundle,
}

/// Train on two row-aligned frames plus the ordered feature-name list.
pub fn run(
    config: &TrainerConfig,
    train_df: &DataFrame,
    test_df: &DataFrame,
    feature_names: &[String],
) -> Result<TrainingOutcome> {
    let train = load_dataset(train_df, feature_names, &config.label_column)?;
    let test = load_dataset(test_df, feature_names, &config.label_column)?;

    info!(
        n_features = feature_names.len(),
        n_train = train.n_rows(),
        n_test = test.n_rows(),
        "loaded input tables"
    );

    let groups = FeatureGroups::assign(feature_names, &config.keywords);
    for domain in Domain::ALL {
        info!(domain = domain.name(), n_features = groups.group(domain).len(), "feature group");
    }

    let trainer = SpecialistTrainer::new(config);
    let specialists = trainer.train_all(&groups, &train, &test)?;

    let specialist_metrics = evaluate_specialists(config, &specialists, &train, &test);

    let stacker = EnsembleStacker::new(config);
    let ensemble = stacker.fit(&specialists, &train, &test)?;

    info!(
        test_mae = ensemble.metrics.test_mae,
        test_directional_accuracy = ensemble.metrics.test_directional_accuracy,
        test_r2 = r_squared(&ensemble.test_predictions, &test.y),
        "ensemble fitted"
    );

    let specialist_accuracies: Vec<(Domain, f64)> = specialist_metrics
        .iter()
        .map(|(d, m)| (*d, m.test_directional_accuracy))
        .collect();
    let benchmark = benchmark(
        ensemble.metrics.test_directional_accuracy,
        &specialist_accuracies,
        &config.benchmark,
    );
    benchmark.log();

    let bundle = ModelBundle::from_run(
        &specialists,
        &groups,
        &ensemble,
        config.random_seed,
        &config.label_column,
        train.n_rows(),
        test.n_rows(),
    );

    Ok(TrainingOutcome {
        groups,
        specialists,
        specialist_metrics,
        ensemble,
        benchmark,
        bundle,
    })
}

fn evaluate_specialists(
    config: &TrainerConfig,
    specialists: &[Specialist],
    train: &Dataset,
    test: &Dataset,
) -> Vec<(Domain, SpecialistMetrics)> {
    specialists
        .iter()
        .map(|specialist| {
            let metrics = evaluate(
                &specialist.train_predictions,
                &train.y,
                &specialist.test_predictions,
                &test.y,
                &config.evaluation,
            );

            info!(
                domain = specialist.domain.name(),
                family = specialist.model.family_name(),
                train_mae = metrics.train_mae,
                test_mae = metrics.test_mae,
                test_directional_accuracy = metrics.test_directional_accuracy,
                "specialist evaluated"
            );
            if metrics.overfit {
                warn!(
                    domain = specialist.domain.name(),
                    ratio = metrics.train_mae / metrics.test_mae,
                    "training error far below held-out error"
                );
            }
            if metrics.beats_random {
                info!(domain = specialist.domain.name(), "specialist beats random on direction");
            }

            (specialist.domain, metrics)
        })
        .collect()
}

/// Write the bundle, its JSON sidecar and both CSV side outputs.
pub fn write_outputs(outcome: &TrainingOutcome, test: &Dataset, out_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(out_dir)?;

    let bundle_path = out_dir.join("model_bundle.bin");
    outcome.bundle.save(&bundle_path)?;
    outcome.bundle.write_metadata_json(&out_dir.join("model_bundle.json"))?;

    write_predictions_csv(
        &out_dir.join("predictions.csv"),
        &test.y,
        &outcome.ensemble.test_predictions,
        &outcome.specialists,
    )?;
    write_metrics_csv(&out_dir.join("metrics.csv"), &outcome.specialist_metrics)?;

    info!(dir = %out_dir.display(), "artifacts written");
    Ok(())
}
