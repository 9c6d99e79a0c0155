//! Ridge regression
//!
//! The meta-learner that combines specialist predictions. Solved through the
//! normal equations with Cholesky decomposition and a Gauss-Jordan fallback
//! for near-singular systems.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StackcastError};

/// Solve symmetric positive-definite `Ax = b` via Cholesky. Retries once
/// with a small diagonal ridge when the matrix is not positive definite.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    match cholesky_solve_inner(a, b) {
        Some(x) => Some(x),
        None => {
            let n = a.nrows();
            let ridge = 1e-8 * a.diag().iter().map(|v| v.abs()).sum::<f64>() / n.max(1) as f64;
            let mut a_reg = a.clone();
            for k in 0..n {
                a_reg[[k, k]] += ridge;
            }
            cholesky_solve_inner(&a_reg, b)
        }
    }
}

fn cholesky_solve_inner(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    // A = L L^T
    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // L y = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // L^T x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Some(x)
}

/// Gauss-Jordan inverse for small matrices; fallback when Cholesky fails.
fn matrix_inverse(m: &Array2<f64>) -> Option<Array2<f64>> {
    let n = m.nrows();
    if n != m.ncols() {
        return None;
    }

    let mut aug = Array2::<f64>::zeros((n, 2 * n));
    for i in 0..n {
        for j in 0..n {
            aug[[i, j]] = m[[i, j]];
        }
        aug[[i, n + i]] = 1.0;
    }

    for col in 0..n {
        let mut max_row = col;
        for row in col + 1..n {
            if aug[[row, col]].abs() > aug[[max_row, col]].abs() {
                max_row = row;
            }
        }
        if max_row != col {
            for j in 0..2 * n {
                aug.swap([col, j], [max_row, j]);
            }
        }
        if aug[[col, col]].abs() < 1e-10 {
            return None;
        }

        let pivot = aug[[col, col]];
        for j in 0..2 * n {
            aug[[col, j]] /= pivot;
        }
        for row in 0..n {
            if row != col {
                let factor = aug[[row, col]];
                for j in 0..2 * n {
                    aug[[row, j]] -= factor * aug[[col, j]];
                }
            }
        }
    }

    let mut inv = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..n {
            inv[[i, j]] = aug[[i, n + j]];
        }
    }
    Some(inv)
}

/// L2-regularized linear regression with intercept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RidgeRegression {
    pub coefficients: Option<Array1<f64>>,
    pub intercept: Option<f64>,
    /// L2 regularization strength
    pub alpha: f64,
    pub is_fitted: bool,
}

impl Default for RidgeRegression {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl RidgeRegression {
    pub fn new(alpha: f64) -> Self {
        Self { coefficients: None, intercept: None, alpha, is_fitted: false }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(StackcastError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_features == 0 {
            return Err(StackcastError::ValidationError(
                "ridge fit needs at least one input column".to_string(),
            ));
        }

        // Center so the intercept is not penalized.
        let x_mean = x.mean_axis(Axis(0)).unwrap();
        let y_mean = y.mean().unwrap_or(0.0);
        let x_c = x - &x_mean.clone().insert_axis(Axis(0));
        let y_c = y - y_mean;

        let mut xtx = x_c.t().dot(&x_c);
        for i in 0..n_features {
            xtx[[i, i]] += self.alpha;
        }
        let xty = x_c.t().dot(&y_c);

        let coefficients = match cholesky_solve(&xtx, &xty) {
            Some(result) => result,
            None => match matrix_inverse(&xtx) {
                Some(inv) => inv.dot(&xty),
                None => {
                    return Err(StackcastError::ComputationError(
                        "singular meta matrix".to_string(),
                    ))
                }
            },
        };

        self.intercept = Some(y_mean - coefficients.dot(&x_mean));
        self.coefficients = Some(coefficients);
        self.is_fitted = true;
        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted {
            return Err(StackcastError::ModelNotFitted);
        }
        Ok(x.dot(self.coefficients.as_ref().unwrap()) + self.intercept.unwrap_or(0.0))
    }

    /// Fitted weights, one per input column.
    pub fn weights(&self) -> Result<&Array1<f64>> {
        self.coefficients.as_ref().ok_or(StackcastError::ModelNotFitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_ridge_recovers_linear_relation() {
        let x = array![[1.0, 0.0], [2.0, 1.0], [3.0, 2.0], [4.0, 1.0], [5.0, 3.0], [6.0, 2.0]];
        let y: Array1<f64> = x.rows().into_iter().map(|r| 2.0 * r[0] + 0.5 * r[1] + 1.0).collect();

        let mut ridge = RidgeRegression::new(1e-6);
        ridge.fit(&x, &y).unwrap();

        let w = ridge.weights().unwrap();
        assert!((w[0] - 2.0).abs() < 0.05, "w0 = {}", w[0]);
        assert!((w[1] - 0.5).abs() < 0.05, "w1 = {}", w[1]);
        assert!((ridge.intercept.unwrap() - 1.0).abs() < 0.2);
    }

    #[test]
    fn test_alpha_shrinks_weights() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![2.0, 4.0, 6.0, 8.0];

        let mut loose = RidgeRegression::new(1e-6);
        let mut tight = RidgeRegression::new(100.0);
        loose.fit(&x, &y).unwrap();
        tight.fit(&x, &y).unwrap();

        let wl = loose.weights().unwrap()[0].abs();
        let wt = tight.weights().unwrap()[0].abs();
        assert!(wt < wl, "regularized weight {} not below {}", wt, wl);
    }

    #[test]
    fn test_collinear_columns_still_solve() {
        // Second column duplicates the first; the penalty keeps it solvable.
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0]];
        let y = array![1.0, 2.0, 3.0, 4.0];

        let mut ridge = RidgeRegression::new(1.0);
        assert!(ridge.fit(&x, &y).is_ok());
        let predictions = ridge.predict(&x).unwrap();
        assert_eq!(predictions.len(), 4);
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let ridge = RidgeRegression::new(1.0);
        let x = array![[1.0]];
        assert!(matches!(ridge.predict(&x), Err(StackcastError::ModelNotFitted)));
    }
}
