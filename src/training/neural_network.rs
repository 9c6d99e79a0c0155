//! Feed-forward network for the momentum specialist
//!
//! A small fully-connected regressor (`input → 64 → 32 → 1`, ReLU, inverted
//! dropout after each hidden layer) trained full-batch with Adam for a fixed
//! number of epochs. Despite the domain's name there is nothing temporal
//! here: the network sees a flat snapshot of features per row.

use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, StackcastError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MlpConfig {
    pub hidden_layers: Vec<usize>,
    /// Dropout probability applied after each hidden activation
    pub dropout: f64,
    pub learning_rate: f64,
    /// Fixed full-batch epoch count; no early stopping
    pub epochs: usize,
    /// Train/test loss is logged every this many epochs
    pub log_every: usize,
    pub random_state: Option<u64>,
}

impl Default for MlpConfig {
    fn default() -> Self {
        Self {
            hidden_layers: vec![64, 32],
            dropout: 0.2,
            learning_rate: 1e-3,
            epochs: 100,
            log_every: 25,
            random_state: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlpRegressor {
    config: MlpConfig,
    weights: Vec<Array2<f64>>,
    biases: Vec<Array1<f64>>,
    n_features: usize,
    is_fitted: bool,
}

impl MlpRegressor {
    pub fn new(config: MlpConfig) -> Self {
        Self {
            config,
            weights: Vec::new(),
            biases: Vec::new(),
            n_features: 0,
            is_fitted: false,
        }
    }

    /// Fit with Adam over fixed full-batch epochs. When `monitor` holds a
    /// held-out set, its loss is logged alongside the training loss at each
    /// logging interval; it never influences the fit.
    pub fn fit(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        monitor: Option<(&Array2<f64>, &Array1<f64>)>,
    ) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(StackcastError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }

        self.n_features = x.ncols();
        self.initialize_weights();

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        let mut adam = AdamState::new(&self.weights, &self.biases);

        for epoch in 1..=self.config.epochs {
            let (activations, z_values, masks) = self.forward_train(x, &mut rng);
            let gradients = self.backward(y, &activations, &z_values, &masks);
            adam.step(&mut self.weights, &mut self.biases, gradients, self.config.learning_rate);

            if self.config.log_every > 0 && epoch % self.config.log_every == 0 {
                let train_loss = mse(y, &self.predict_inner(x));
                match monitor {
                    Some((x_test, y_test)) => {
                        let test_loss = mse(y_test, &self.predict_inner(x_test));
                        debug!(epoch, train_loss, test_loss, "mlp epoch");
                    }
                    None => debug!(epoch, train_loss, "mlp epoch"),
                }
            }
        }

        self.is_fitted = true;
        Ok(())
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted {
            return Err(StackcastError::ModelNotFitted);
        }
        Ok(self.predict_inner(x))
    }

    fn predict_inner(&self, x: &Array2<f64>) -> Array1<f64> {
        let mut a = x.clone();
        let last = self.weights.len() - 1;
        for (i, (w, b)) in self.weights.iter().zip(self.biases.iter()).enumerate() {
            let z = a.dot(w) + b;
            a = if i < last { relu(&z) } else { z };
        }
        a.column(0).to_owned()
    }

    fn initialize_weights(&mut self) {
        self.weights.clear();
        self.biases.clear();

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        let mut layer_sizes = vec![self.n_features];
        layer_sizes.extend(&self.config.hidden_layers);
        layer_sizes.push(1);

        for pair in layer_sizes.windows(2) {
            let (n_in, n_out) = (pair[0], pair[1]);
            // Xavier/Glorot initialization
            let scale = (2.0 / (n_in + n_out) as f64).sqrt();
            let weights: Vec<f64> = (0..n_in * n_out)
                .map(|_| rng.gen::<f64>() * 2.0 * scale - scale)
                .collect();
            self.weights.push(Array2::from_shape_vec((n_in, n_out), weights).unwrap());
            self.biases.push(Array1::zeros(n_out));
        }
    }

    /// Forward pass with inverted dropout on hidden activations. Masks are
    /// returned so the backward pass silences the same units.
    fn forward_train(
        &self,
        x: &Array2<f64>,
        rng: &mut Xoshiro256PlusPlus,
    ) -> (Vec<Array2<f64>>, Vec<Array2<f64>>, Vec<Option<Array2<f64>>>) {
        let mut activations = vec![x.clone()];
        let mut z_values = Vec::new();
        let mut masks = Vec::new();
        let last = self.weights.len() - 1;
        let keep = 1.0 - self.config.dropout;

        for (i, (w, b)) in self.weights.iter().zip(self.biases.iter()).enumerate() {
            let z = activations.last().unwrap().dot(w) + b;
            z_values.push(z.clone());

            if i < last {
                let mut a = relu(&z);
                if self.config.dropout > 0.0 {
                    let mask = Array2::from_shape_fn(a.raw_dim(), |_| {
                        if rng.gen::<f64>() < keep {
                            1.0 / keep
                        } else {
                            0.0
                        }
                    });
                    a = &a * &mask;
                    masks.push(Some(mask));
                } else {
                    masks.push(None);
                }
                activations.push(a);
            } else {
                masks.push(None);
                activations.push(z);
            }
        }

        (activations, z_values, masks)
    }

    fn backward(
        &self,
        y: &Array1<f64>,
        activations: &[Array2<f64>],
        z_values: &[Array2<f64>],
        masks: &[Option<Array2<f64>>],
    ) -> Vec<(Array2<f64>, Array1<f64>)> {
        let n = y.len() as f64;
        let mut gradients = Vec::new();

        let y_2d = y.clone().insert_axis(Axis(1));
        let output = activations.last().unwrap();
        let mut delta = (output - &y_2d) * (2.0 / n);

        for i in (0..self.weights.len()).rev() {
            let a_prev = &activations[i];
            let grad_w = a_prev.t().dot(&delta);
            let grad_b = delta.sum_axis(Axis(0));
            gradients.push((grad_w, grad_b));

            if i > 0 {
                let z = &z_values[i - 1];
                delta = delta.dot(&self.weights[i].t()) * relu_derivative(z);
                if let Some(mask) = &masks[i - 1] {
                    delta = &delta * mask;
                }
            }
        }

        gradients.reverse();
        gradients
    }
}

/// Adam moment buffers, one pair per layer.
#[derive(Debug)]
struct AdamState {
    m_w: Vec<Array2<f64>>,
    v_w: Vec<Array2<f64>>,
    m_b: Vec<Array1<f64>>,
    v_b: Vec<Array1<f64>>,
    t: i32,
}

impl AdamState {
    const BETA1: f64 = 0.9;
    const BETA2: f64 = 0.999;
    const EPS: f64 = 1e-8;

    fn new(weights: &[Array2<f64>], biases: &[Array1<f64>]) -> Self {
        Self {
            m_w: weights.iter().map(|w| Array2::zeros(w.raw_dim())).collect(),
            v_w: weights.iter().map(|w| Array2::zeros(w.raw_dim())).collect(),
            m_b: biases.iter().map(|b| Array1::zeros(b.len())).collect(),
            v_b: biases.iter().map(|b| Array1::zeros(b.len())).collect(),
            t: 0,
        }
    }

    fn step(
        &mut self,
        weights: &mut [Array2<f64>],
        biases: &mut [Array1<f64>],
        gradients: Vec<(Array2<f64>, Array1<f64>)>,
        lr: f64,
    ) {
        self.t += 1;
        let bc1 = 1.0 - Self::BETA1.powi(self.t);
        let bc2 = 1.0 - Self::BETA2.powi(self.t);

        for (i, (grad_w, grad_b)) in gradients.into_iter().enumerate() {
            self.m_w[i] = &self.m_w[i] * Self::BETA1 + &grad_w * (1.0 - Self::BETA1);
            self.v_w[i] = &self.v_w[i] * Self::BETA2 + &grad_w.mapv(|g| g * g) * (1.0 - Self::BETA2);
            let m_hat = &self.m_w[i] / bc1;
            let v_hat = &self.v_w[i] / bc2;
            weights[i] = &weights[i] - &(m_hat / (v_hat.mapv(f64::sqrt) + Self::EPS) * lr);

            self.m_b[i] = &self.m_b[i] * Self::BETA1 + &grad_b * (1.0 - Self::BETA1);
            self.v_b[i] = &self.v_b[i] * Self::BETA2 + &grad_b.mapv(|g| g * g) * (1.0 - Self::BETA2);
            let m_hat = &self.m_b[i] / bc1;
            let v_hat = &self.v_b[i] / bc2;
            biases[i] = &biases[i] - &(m_hat / (v_hat.mapv(f64::sqrt) + Self::EPS) * lr);
        }
    }
}

fn relu(z: &Array2<f64>) -> Array2<f64> {
    z.mapv(|v| v.max(0.0))
}

fn relu_derivative(z: &Array2<f64>) -> Array2<f64> {
    z.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 })
}

fn mse(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum::<f64>()
        / y_true.len().max(1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_data() -> (Array2<f64>, Array1<f64>) {
        // Zero-centered features and target, like the return series the
        // momentum specialist actually sees.
        let x = Array2::from_shape_vec(
            (120, 6),
            (0..720).map(|i| ((i * 37) % 100) as f64 * 0.02 - 1.0).collect(),
        )
        .unwrap();
        let y: Array1<f64> = x
            .rows()
            .into_iter()
            .map(|row| row[0] * 0.8 - row[3] * 0.5)
            .collect();
        (x, y)
    }

    #[test]
    fn test_mlp_learns_linear_signal() {
        let (x, y) = linear_data();
        let config = MlpConfig {
            epochs: 400,
            learning_rate: 0.01,
            random_state: Some(42),
            dropout: 0.1,
            ..Default::default()
        };

        let mut mlp = MlpRegressor::new(config);
        mlp.fit(&x, &y, None).unwrap();

        let predictions = mlp.predict(&x).unwrap();
        let loss = mse(&y, &predictions);
        assert!(loss < y.var(0.0), "loss {} not below variance {}", loss, y.var(0.0));
    }

    #[test]
    fn test_fixed_seed_is_reproducible() {
        let (x, y) = linear_data();
        let config = MlpConfig { epochs: 30, random_state: Some(11), ..Default::default() };

        let mut a = MlpRegressor::new(config.clone());
        let mut b = MlpRegressor::new(config);
        a.fit(&x, &y, None).unwrap();
        b.fit(&x, &y, None).unwrap();

        let pa = a.predict(&x).unwrap();
        let pb = b.predict(&x).unwrap();
        for (va, vb) in pa.iter().zip(pb.iter()) {
            assert_eq!(va, vb);
        }
    }

    #[test]
    fn test_prediction_length_matches_rows() {
        let (x, y) = linear_data();
        let config = MlpConfig { epochs: 10, random_state: Some(5), ..Default::default() };
        let mut mlp = MlpRegressor::new(config);
        mlp.fit(&x, &y, Some((&x, &y))).unwrap();
        assert_eq!(mlp.predict(&x).unwrap().len(), x.nrows());
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let mlp = MlpRegressor::new(MlpConfig::default());
        let x = Array2::zeros((2, 6));
        assert!(matches!(mlp.predict(&x), Err(StackcastError::ModelNotFitted)));
    }
}
