//! Bundle persistence
//!
//! Serializes everything a later inference run needs into one bincode
//! artifact: the fitted specialists (with a `None` placeholder for domains
//! that never trained), the feature-group map, the ridge meta-learner and
//! the specialist order. Two CSV side outputs carry per-row predictions and
//! per-specialist metrics; a JSON sidecar carries a human-readable summary.

use chrono::Utc;
use ndarray::{Array1, Array2, Axis};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::error::{Result, StackcastError};
use crate::evaluation::SpecialistMetrics;
use crate::features::{Domain, FeatureGroups};
use crate::stacking::StackedEnsemble;
use crate::training::{RidgeRegression, Specialist, SpecialistModel};

/// A specialist stripped to what inference replay needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedSpecialist {
    pub domain: Domain,
    pub feature_indices: Vec<usize>,
    pub model: SpecialistModel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleMetadata {
    pub trained_at: String,
    pub random_seed: u64,
    pub label_column: String,
    pub n_train_rows: usize,
    pub n_test_rows: usize,
    /// Ensemble held-out metrics, echoed for the sidecar.
    pub ensemble_metrics: Option<SpecialistMetrics>,
}

/// The single artifact required to reproduce inference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelBundle {
    /// One slot per [`Domain::ALL`] entry, `None` where no specialist trained.
    pub specialists: Vec<Option<PersistedSpecialist>>,
    pub groups: FeatureGroups,
    pub meta_learner: RidgeRegression,
    /// Names of the trained specialists, in meta-matrix column order.
    pub specialist_names: Vec<String>,
    pub metadata: BundleMetadata,
}

impl ModelBundle {
    pub fn from_run(
        specialists: &[Specialist],
        groups: &FeatureGroups,
        ensemble: &StackedEnsemble,
        random_seed: u64,
        label_column: &str,
        n_train_rows: usize,
        n_test_rows: usize,
    ) -> Self {
        let mut slots: Vec<Option<PersistedSpecialist>> = vec![None; Domain::ALL.len()];
        for specialist in specialists {
            slots[specialist.domain.index()] = Some(PersistedSpecialist {
                domain: specialist.domain,
                feature_indices: specialist.feature_indices.clone(),
                model: specialist.model.clone(),
            });
        }

        let specialist_names =
            ensemble.specialist_order.iter().map(|d| d.name().to_string()).collect();

        Self {
            specialists: slots,
            groups: groups.clone(),
            meta_learner: ensemble.meta_learner.clone(),
            specialist_names,
            metadata: BundleMetadata {
                trained_at: Utc::now().to_rfc3339(),
                random_seed,
                label_column: label_column.to_string(),
                n_train_rows,
                n_test_rows,
                ensemble_metrics: Some(ensemble.metrics.clone()),
            },
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        bincode::serialize_into(writer, self)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let bundle = bincode::deserialize_from(reader)?;
        Ok(bundle)
    }

    /// Human-readable summary next to the binary artifact.
    pub fn write_metadata_json(&self, path: &Path) -> Result<()> {
        #[derive(Serialize)]
        struct Sidecar<'a> {
            metadata: &'a BundleMetadata,
            specialist_names: &'a [String],
            feature_groups: Vec<(String, Vec<&'a str>)>,
        }

        let feature_groups = Domain::ALL
            .iter()
            .map(|d| (d.name().to_string(), self.groups.group_names(*d)))
            .collect();

        let sidecar = Sidecar {
            metadata: &self.metadata,
            specialist_names: &self.specialist_names,
            feature_groups,
        };

        let json = serde_json::to_string_pretty(&sidecar)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Replay inference on a new feature matrix whose columns follow the
    /// persisted feature-name order: each present specialist predicts from
    /// its feature slice, the columns are stacked in the persisted order and
    /// the meta-learner combines them.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let present: Vec<&PersistedSpecialist> =
            self.specialists.iter().flatten().collect();

        if present.is_empty() {
            return Err(StackcastError::ValidationError(
                "bundle holds no trained specialists".to_string(),
            ));
        }

        let n_rows = x.nrows();
        let mut meta = Array2::<f64>::zeros((n_rows, present.len()));

        for (col, specialist) in present.iter().enumerate() {
            let x_domain = x.select(Axis(1), &specialist.feature_indices);
            let predictions = specialist.model.predict(&x_domain)?;
            for row in 0..n_rows {
                meta[[row, col]] = predictions[row];
            }
        }

        self.meta_learner.predict(&meta)
    }
}

/// Per-row prediction table: index, actual, ensemble, one column per
/// trained specialist.
pub fn write_predictions_csv(
    path: &Path,
    actuals: &Array1<f64>,
    ensemble_predictions: &Array1<f64>,
    specialists: &[Specialist],
) -> Result<()> {
    let n = actuals.len();
    let mut columns: Vec<Column> = Vec::with_capacity(3 + specialists.len());

    columns.push(Column::new("index".into(), (0..n as u64).collect::<Vec<u64>>()));
    columns.push(Column::new("actual".into(), actuals.to_vec()));
    columns.push(Column::new(
        "ensemble_prediction".into(),
        ensemble_predictions.to_vec(),
    ));

    for specialist in specialists {
        let name = format!("{}_prediction", specialist.domain.name());
        columns.push(Column::new(name.into(), specialist.test_predictions.to_vec()));
    }

    let mut df = DataFrame::new(columns)?;
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).finish(&mut df)?;
    Ok(())
}

/// Per-specialist metric table, one row per trained specialist.
pub fn write_metrics_csv(
    path: &Path,
    metrics: &[(Domain, SpecialistMetrics)],
) -> Result<()> {
    let names: Vec<String> = metrics.iter().map(|(d, _)| d.name().to_string()).collect();
    let train_mae: Vec<f64> = metrics.iter().map(|(_, m)| m.train_mae).collect();
    let test_mae: Vec<f64> = metrics.iter().map(|(_, m)| m.test_mae).collect();
    let train_da: Vec<f64> = metrics.iter().map(|(_, m)| m.train_directional_accuracy).collect();
    let test_da: Vec<f64> = metrics.iter().map(|(_, m)| m.test_directional_accuracy).collect();

    let mut df = DataFrame::new(vec![
        Column::new("specialist".into(), names),
        Column::new("train_mae".into(), train_mae),
        Column::new("test_mae".into(), test_mae),
        Column::new("train_directional_accuracy".into(), train_da),
        Column::new("test_directional_accuracy".into(), test_da),
    ])?;

    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).finish(&mut df)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DomainKeywords, TrainerConfig};
    use crate::data::Dataset;
    use crate::stacking::EnsembleStacker;
    use crate::training::SpecialistTrainer;

    fn trained_run() -> (Vec<Specialist>, FeatureGroups, StackedEnsemble, Dataset, Dataset) {
        let names: Vec<String> =
            ["tariff_a", "brazil_b", "corr_c"].iter().map(|s| s.to_string()).collect();
        let train = Dataset {
            x: Array2::from_shape_fn((30, 3), |(r, c)| ((r * 5 + c) % 13) as f64 * 0.1),
            y: Array1::from_shape_fn(30, |r| if r % 3 == 0 { -0.1 } else { 0.2 }),
        };
        let test = Dataset {
            x: Array2::from_shape_fn((10, 3), |(r, c)| ((r * 3 + c) % 13) as f64 * 0.1),
            y: Array1::from_shape_fn(10, |r| if r % 4 == 0 { -0.2 } else { 0.1 }),
        };

        let mut config = TrainerConfig::default();
        config.boosting.n_estimators = 5;
        config.bagging.n_estimators = 5;

        let groups = FeatureGroups::assign(&names, &DomainKeywords::default());
        let trainer = SpecialistTrainer::new(&config);
        let specialists = trainer.train_all(&groups, &train, &test).unwrap();
        let ensemble = EnsembleStacker::new(&config).fit(&specialists, &train, &test).unwrap();
        (specialists, groups, ensemble, train, test)
    }

    #[test]
    fn test_bundle_round_trip_and_replay() {
        let (specialists, groups, ensemble, train, test) = trained_run();
        let bundle = ModelBundle::from_run(
            &specialists,
            &groups,
            &ensemble,
            42,
            "target_1w",
            train.n_rows(),
            test.n_rows(),
        );

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.bin");
        bundle.save(&path).unwrap();
        let loaded = ModelBundle::load(&path).unwrap();

        assert_eq!(loaded.specialist_names, bundle.specialist_names);

        // Replay on the held-out matrix must reproduce the training run's
        // ensemble predictions exactly.
        let replayed = loaded.predict(&test.x).unwrap();
        for (r, e) in replayed.iter().zip(ensemble.test_predictions.iter()) {
            assert!((r - e).abs() < 1e-9, "replay {} vs run {}", r, e);
        }
    }

    #[test]
    fn test_partial_specialist_set_round_trips() {
        let (specialists, groups, ensemble, train, test) = trained_run();
        let bundle = ModelBundle::from_run(
            &specialists,
            &groups,
            &ensemble,
            42,
            "target_1w",
            train.n_rows(),
            test.n_rows(),
        );

        // momentum and volatility never trained here: their slots are None.
        assert!(bundle.specialists[Domain::Momentum.index()].is_none());
        assert!(bundle.specialists[Domain::Volatility.index()].is_none());
        assert_eq!(bundle.specialists.iter().flatten().count(), 3);
    }

    #[test]
    fn test_side_outputs_written() {
        let (specialists, _, ensemble, train, test) = trained_run();
        let dir = tempfile::tempdir().unwrap();

        let predictions_path = dir.path().join("predictions.csv");
        write_predictions_csv(&predictions_path, &test.y, &ensemble.test_predictions, &specialists)
            .unwrap();
        let written = std::fs::read_to_string(&predictions_path).unwrap();
        assert!(written.starts_with("index,actual,ensemble_prediction,policy_prediction"));

        let metrics_path = dir.path().join("metrics.csv");
        let rows: Vec<(Domain, SpecialistMetrics)> = specialists
            .iter()
            .map(|s| {
                (
                    s.domain,
                    crate::evaluation::evaluate(
                        &s.train_predictions,
                        &train.y,
                        &s.test_predictions,
                        &test.y,
                        &crate::config::EvaluationThresholds::default(),
                    ),
                )
            })
            .collect();
        write_metrics_csv(&metrics_path, &rows).unwrap();
        let written = std::fs::read_to_string(&metrics_path).unwrap();
        assert!(written.contains("policy"));
        assert!(written.contains("train_mae"));
    }
}
