//! Ensemble stacking
//!
//! Collects every trained specialist's predictions into two row-aligned
//! matrices (one column per specialist, in stable domain order), fits the
//! ridge meta-learner on the training side, and scores the combined output.
//!
//! Which predictions fill the training-side matrix is configurable: the
//! default uses each specialist's in-sample predictions, which risks
//! optimistic meta weights; the out-of-fold mode refits each family per
//! fold and uses held-out-fold predictions instead.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{StackingInputs, TrainerConfig};
use crate::data::Dataset;
use crate::error::{Result, StackcastError};
use crate::evaluation::{evaluate, SpecialistMetrics};
use crate::features::Domain;
use crate::training::{KFold, RidgeRegression, Specialist, SpecialistTrainer};

/// One specialist's marginal contribution in the meta-learner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecialistWeight {
    pub domain: Domain,
    pub weight: f64,
    /// `|weight|` below the configured cutoff
    pub low_contribution: bool,
    /// Negative weight: the meta-learner bets against this specialist
    pub inverse_contribution: bool,
}

/// The fitted second stage plus its diagnostics.
#[derive(Debug, Clone)]
pub struct StackedEnsemble {
    pub meta_learner: RidgeRegression,
    /// Column order of the meta matrices; must be replayed at inference.
    pub specialist_order: Vec<Domain>,
    pub train_predictions: Array1<f64>,
    pub test_predictions: Array1<f64>,
    pub metrics: SpecialistMetrics,
    pub weights: Vec<SpecialistWeight>,
}

pub struct EnsembleStacker<'a> {
    config: &'a TrainerConfig,
}

impl<'a> EnsembleStacker<'a> {
    pub fn new(config: &'a TrainerConfig) -> Self {
        Self { config }
    }

    pub fn fit(
        &self,
        specialists: &[Specialist],
        train: &Dataset,
        test: &Dataset,
    ) -> Result<StackedEnsemble> {
        if specialists.is_empty() {
            return Err(StackcastError::ValidationError(
                "no specialists were trained; nothing to stack".to_string(),
            ));
        }

        let specialist_order: Vec<Domain> = specialists.iter().map(|s| s.domain).collect();

        let x_meta_test = stack_columns(
            &specialists.iter().map(|s| &s.test_predictions).collect::<Vec<_>>(),
        )?;

        let x_meta_train = match &self.config.stacking {
            StackingInputs::InSample => stack_columns(
                &specialists.iter().map(|s| &s.train_predictions).collect::<Vec<_>>(),
            )?,
            StackingInputs::OutOfFold { n_folds } => {
                info!(n_folds, "building out-of-fold meta matrix");
                self.out_of_fold_matrix(specialists, train, *n_folds)?
            }
        };

        let mut meta_learner = RidgeRegression::new(self.config.ridge_alpha);
        meta_learner.fit(&x_meta_train, &train.y)?;

        let train_predictions = meta_learner.predict(&x_meta_train)?;
        let test_predictions = meta_learner.predict(&x_meta_test)?;

        let metrics = evaluate(
            &train_predictions,
            &train.y,
            &test_predictions,
            &test.y,
            &self.config.evaluation,
        );

        let weights = self.weight_report(&meta_learner, &specialist_order)?;

        Ok(StackedEnsemble {
            meta_learner,
            specialist_order,
            train_predictions,
            test_predictions,
            metrics,
            weights,
        })
    }

    fn weight_report(
        &self,
        meta_learner: &RidgeRegression,
        order: &[Domain],
    ) -> Result<Vec<SpecialistWeight>> {
        let coefficients = meta_learner.weights()?;
        let mut report = Vec::with_capacity(order.len());

        for (domain, &weight) in order.iter().zip(coefficients.iter()) {
            let low_contribution = weight.abs() < self.config.low_contribution;
            let inverse_contribution = weight < 0.0;

            info!(domain = domain.name(), weight, "meta-learner weight");
            if low_contribution {
                warn!(domain = domain.name(), weight, "low contribution to the ensemble");
            }
            if inverse_contribution {
                warn!(domain = domain.name(), weight, "inverse contribution: weighted against");
            }

            report.push(SpecialistWeight {
                domain: *domain,
                weight,
                low_contribution,
                inverse_contribution,
            });
        }

        Ok(report)
    }

    /// Out-of-fold training-side matrix: each specialist family is refit on
    /// every fold's training rows and predicts its held-out rows, so no cell
    /// comes from a model that saw that row. Final specialists (fit on the
    /// full training set) are untouched.
    fn out_of_fold_matrix(
        &self,
        specialists: &[Specialist],
        train: &Dataset,
        n_folds: usize,
    ) -> Result<Array2<f64>> {
        let n_rows = train.x.nrows();
        let splits = KFold::new(n_folds, self.config.random_seed).split(n_rows)?;
        let trainer = SpecialistTrainer::new(self.config);

        let mut matrix = Array2::<f64>::zeros((n_rows, specialists.len()));

        for (col, specialist) in specialists.iter().enumerate() {
            let x_domain = train.x.select(Axis(1), &specialist.feature_indices);

            for split in &splits {
                let x_fold = x_domain.select(Axis(0), &split.train_indices);
                let y_fold: Array1<f64> =
                    Array1::from_vec(split.train_indices.iter().map(|&i| train.y[i]).collect());

                let model = trainer.fit_domain_model(specialist.domain, &x_fold, &y_fold, None)?;

                let x_held_out = x_domain.select(Axis(0), &split.test_indices);
                let fold_predictions = model.predict(&x_held_out)?;

                for (local, &row) in split.test_indices.iter().enumerate() {
                    matrix[[row, col]] = fold_predictions[local];
                }
            }
        }

        Ok(matrix)
    }
}

/// Column-stack equal-length prediction vectors, preserving row order.
fn stack_columns(columns: &[&Array1<f64>]) -> Result<Array2<f64>> {
    let n_rows = columns.first().map_or(0, |c| c.len());
    for column in columns {
        if column.len() != n_rows {
            return Err(StackcastError::ShapeError {
                expected: format!("{} rows", n_rows),
                actual: format!("{} rows", column.len()),
            });
        }
    }
    Ok(Array2::from_shape_fn((n_rows, columns.len()), |(r, c)| columns[c][r]))
}
