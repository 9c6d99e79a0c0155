//! Extremely randomized regression forest
//!
//! Unlike the bagged forest, no bootstrap is drawn: every tree sees all rows
//! and both the split feature and the split threshold are chosen at random.

use ndarray::{Array1, Array2};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StackcastError};

#[derive(Debug, Clone, Serialize, Deserialize)]
enum ExtraTreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<ExtraTreeNode>,
        right: Box<ExtraTreeNode>,
    },
}

impl ExtraTreeNode {
    fn predict_row(&self, row: &[f64]) -> f64 {
        match self {
            ExtraTreeNode::Leaf { value } => *value,
            ExtraTreeNode::Split { feature, threshold, left, right } => {
                if row[*feature] <= *threshold {
                    left.predict_row(row)
                } else {
                    right.predict_row(row)
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtraTreesConfig {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub random_state: Option<u64>,
}

impl Default for ExtraTreesConfig {
    fn default() -> Self {
        Self {
            n_estimators: 300,
            max_depth: 6,
            min_samples_split: 2,
            min_samples_leaf: 1,
            random_state: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtraTreesRegressor {
    config: ExtraTreesConfig,
    trees: Vec<ExtraTreeNode>,
}

impl ExtraTreesRegressor {
    pub fn new(config: ExtraTreesConfig) -> Self {
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
        if n_samples == 0 {
            return Err(StackcastError::ValidationError(
                "cannot fit a forest on zero rows".to_string(),
            ));
        }

        let base_seed = self.config.random_state.unwrap_or(42);
        let indices: Vec<usize> = (0..n_samples).collect();

        self.trees = (0..self.config.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let mut rng = ChaCha8Rng::seed_from_u64(base_seed.wrapping_add(tree_idx as u64));
                self.build_node(x, y, &indices, 0, &mut rng)
            })
            .collect();

        Ok(())
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(StackcastError::ModelNotFitted);
        }

        let n_trees = self.trees.len() as f64;
        let predictions: Vec<f64> = (0..x.nrows())
            .map(|i| {
                let row: Vec<f64> = x.row(i).iter().copied().collect();
                let sum: f64 = self.trees.iter().map(|t| t.predict_row(&row)).sum();
                sum / n_trees
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn build_node(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        depth: usize,
        rng: &mut ChaCha8Rng,
    ) -> ExtraTreeNode {
        let n = indices.len();

        if n < self.config.min_samples_split || n <= 1 || depth >= self.config.max_depth {
            return ExtraTreeNode::Leaf { value: mean(y, indices) };
        }

        let first_y = y[indices[0]];
        if indices.iter().all(|&i| (y[i] - first_y).abs() < 1e-15) {
            return ExtraTreeNode::Leaf { value: first_y };
        }

        // One random threshold per feature; keep the candidate with the
        // lowest weighted child variance.
        let mut best: Option<(usize, f64, f64)> = None;
        for feature in 0..x.ncols() {
            let mut fmin = f64::MAX;
            let mut fmax = f64::MIN;
            for &i in indices {
                let v = x[[i, feature]];
                if v < fmin {
                    fmin = v;
                }
                if v > fmax {
                    fmax = v;
                }
            }
            if (fmax - fmin).abs() < 1e-15 {
                continue; // constant feature
            }

            let r = (rng.next_u64() as f64) / (u64::MAX as f64);
            let threshold = fmin + r * (fmax - fmin);

            let (left_idx, right_idx): (Vec<usize>, Vec<usize>) =
                indices.iter().partition(|&&i| x[[i, feature]] <= threshold);

            if left_idx.len() < self.config.min_samples_leaf
                || right_idx.len() < self.config.min_samples_leaf
            {
                continue;
            }

            let score = weighted_variance(y, &left_idx, &right_idx);
            if best.map_or(true, |(_, _, s)| score < s) {
                best = Some((feature, threshold, score));
            }
        }

        match best {
            Some((feature, threshold, _)) => {
                let (left_idx, right_idx): (Vec<usize>, Vec<usize>) =
                    indices.iter().partition(|&&i| x[[i, feature]] <= threshold);

                let left = Box::new(self.build_node(x, y, &left_idx, depth + 1, rng));
                let right = Box::new(self.build_node(x, y, &right_idx, depth + 1, rng));
                ExtraTreeNode::Split { feature, threshold, left, right }
            }
            None => ExtraTreeNode::Leaf { value: mean(y, indices) },
        }
    }
}

fn mean(y: &Array1<f64>, indices: &[usize]) -> f64 {
    let sum: f64 = indices.iter().map(|&i| y[i]).sum();
    sum / indices.len().max(1) as f64
}

fn weighted_variance(y: &Array1<f64>, left: &[usize], right: &[usize]) -> f64 {
    let n = (left.len() + right.len()) as f64;
    (left.len() as f64 * variance(y, left) + right.len() as f64 * variance(y, right)) / n
}

fn variance(y: &Array1<f64>, indices: &[usize]) -> f64 {
    let n = indices.len() as f64;
    if n == 0.0 {
        return 0.0;
    }
    let mean: f64 = indices.iter().map(|&i| y[i]).sum::<f64>() / n;
    indices.iter().map(|&i| (y[i] - mean).powi(2)).sum::<f64>() / n
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_extra_trees_fit_and_predict() {
        let x = array![
            [1.0, 10.0],
            [2.0, 9.0],
            [3.0, 8.0],
            [4.0, 7.0],
            [5.0, 6.0],
            [6.0, 5.0],
            [7.0, 4.0],
            [8.0, 3.0]
        ];
        let y = array![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];

        let config = ExtraTreesConfig {
            n_estimators: 30,
            max_depth: 5,
            random_state: Some(42),
            ..Default::default()
        };
        let mut model = ExtraTreesRegressor::new(config);
        model.fit(&x, &y).unwrap();

        let predictions = model.predict(&x).unwrap();
        assert_eq!(predictions.len(), 8);
        let mse: f64 = predictions
            .iter()
            .zip(y.iter())
            .map(|(p, a)| (p - a).powi(2))
            .sum::<f64>()
            / y.len() as f64;
        assert!(mse < 3.0, "MSE too high: {}", mse);
    }

    #[test]
    fn test_no_bootstrap_same_seed_reproduces() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0]];
        let y = array![2.0, 4.0, 6.0, 8.0, 10.0];

        let config = ExtraTreesConfig {
            n_estimators: 10,
            max_depth: 4,
            random_state: Some(3),
            ..Default::default()
        };

        let mut a = ExtraTreesRegressor::new(config.clone());
        let mut b = ExtraTreesRegressor::new(config);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();

        let pa = a.predict(&x).unwrap();
        let pb = b.predict(&x).unwrap();
        for (va, vb) in pa.iter().zip(pb.iter()) {
            assert_eq!(va, vb);
        }
    }

    #[test]
    fn test_tree_count() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![1.0, 2.0, 3.0, 4.0];
        let config = ExtraTreesConfig {
            n_estimators: 12,
            random_state: Some(1),
            ..Default::default()
        };
        let mut model = ExtraTreesRegressor::new(config);
        model.fit(&x, &y).unwrap();
        assert_eq!(model.n_trees(), 12);
    }
}
