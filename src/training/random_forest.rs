//! Bagged regression forest
//!
//! Bootstrap-sampled [`RegressionTree`]s averaged at prediction time. Every
//! tree sees all feature columns; the variance reduction comes entirely from
//! the bootstrap resampling. Trees are built in parallel, each from a seed
//! derived from the base seed, so results do not depend on thread timing.

use ndarray::{Array1, Array2, Axis};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::decision_tree::RegressionTree;
use crate::error::{Result, StackcastError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BaggedForestConfig {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub random_state: Option<u64>,
}

impl Default for BaggedForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 500,
            max_depth: 8,
            min_samples_split: 2,
            min_samples_leaf: 1,
            random_state: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaggedForestRegressor {
    config: BaggedForestConfig,
    trees: Vec<RegressionTree>,
}

impl BaggedForestRegressor {
    pub fn new(config: BaggedForestConfig) -> Self {
        Self { config, trees: Vec::new() }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();

        if n_samples != y.len() {
            return Err(StackcastError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }

        let base_seed = self.config.random_state.unwrap_or(42);

        let trees: Vec<RegressionTree> = (0..self.config.n_estimators)
            .into_par_iter()
            .map(|tree_idx| -> Result<RegressionTree> {
                let mut rng = ChaCha8Rng::seed_from_u64(base_seed.wrapping_add(tree_idx as u64));

                let sample_indices: Vec<usize> = (0..n_samples)
                    .map(|_| (rng.next_u64() as usize) % n_samples)
                    .collect();

                let x_boot = x.select(Axis(0), &sample_indices);
                let y_boot: Array1<f64> =
                    Array1::from_vec(sample_indices.iter().map(|&i| y[i]).collect());

                let mut tree = RegressionTree::new()
                    .with_max_depth(self.config.max_depth)
                    .with_min_samples_split(self.config.min_samples_split)
                    .with_min_samples_leaf(self.config.min_samples_leaf);
                tree.fit(&x_boot, &y_boot)?;
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        self.trees = trees;
        Ok(())
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(StackcastError::ModelNotFitted);
        }

        let all_predictions: Vec<Array1<f64>> = self
            .trees
            .par_iter()
            .map(|tree| tree.predict(x))
            .collect::<Result<Vec<_>>>()?;

        let n_samples = x.nrows();
        let predictions: Vec<f64> = (0..n_samples)
            .map(|i| {
                let sum: f64 = all_predictions.iter().map(|p| p[i]).sum();
                sum / all_predictions.len() as f64
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_forest_fits_monotone_data() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0], [7.0], [8.0]];
        let y = array![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];

        let config = BaggedForestConfig {
            n_estimators: 20,
            max_depth: 4,
            random_state: Some(42),
            ..Default::default()
        };
        let mut forest = BaggedForestRegressor::new(config);
        forest.fit(&x, &y).unwrap();

        let predictions = forest.predict(&x).unwrap();
        let mse: f64 = predictions
            .iter()
            .zip(y.iter())
            .map(|(p, a)| (p - a).powi(2))
            .sum::<f64>()
            / y.len() as f64;
        assert!(mse < 2.0, "MSE too high: {}", mse);
    }

    #[test]
    fn test_derived_seeds_are_deterministic() {
        let x = array![[1.0, 0.5], [2.0, 1.5], [3.0, 2.5], [4.0, 3.5], [5.0, 4.5], [6.0, 5.5]];
        let y = array![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];

        let config = BaggedForestConfig {
            n_estimators: 10,
            max_depth: 3,
            random_state: Some(9),
            ..Default::default()
        };

        let mut a = BaggedForestRegressor::new(config.clone());
        let mut b = BaggedForestRegressor::new(config);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();

        let pa = a.predict(&x).unwrap();
        let pb = b.predict(&x).unwrap();
        for (va, vb) in pa.iter().zip(pb.iter()) {
            assert_eq!(va, vb);
        }
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let forest = BaggedForestRegressor::new(BaggedForestConfig::default());
        let x = array![[1.0]];
        assert!(matches!(forest.predict(&x), Err(StackcastError::ModelNotFitted)));
    }
}
