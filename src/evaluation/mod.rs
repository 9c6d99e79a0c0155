//! Specialist and ensemble evaluation
//!
//! Purely computational: MAE and directional accuracy over train and test,
//! plus the overfitting and beats-random flags. Degenerate inputs (empty
//! vectors) produce NaN metrics rather than errors; evaluation must never
//! abort a training run.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::config::EvaluationThresholds;

/// Evaluation outcome for one specialist (or the stacked ensemble).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecialistMetrics {
    pub train_mae: f64,
    pub test_mae: f64,
    pub train_directional_accuracy: f64,
    pub test_directional_accuracy: f64,
    /// Training error far below held-out error
    pub overfit: bool,
    /// Held-out directional accuracy above the coin-flip threshold
    pub beats_random: bool,
}

/// Mean absolute error; NaN when the vectors are empty.
pub fn mean_absolute_error(predictions: &Array1<f64>, actuals: &Array1<f64>) -> f64 {
    let n = predictions.len().min(actuals.len());
    if n == 0 {
        return f64::NAN;
    }
    predictions
        .iter()
        .zip(actuals.iter())
        .map(|(p, a)| (p - a).abs())
        .sum::<f64>()
        / n as f64
}

/// Fraction of rows whose predicted sign matches the actual sign, where
/// `sign(x) = 1 if x > 0 else 0`. Exactly-zero values count as non-positive;
/// NaN when the vectors are empty.
pub fn directional_accuracy(predictions: &Array1<f64>, actuals: &Array1<f64>) -> f64 {
    let n = predictions.len().min(actuals.len());
    if n == 0 {
        return f64::NAN;
    }
    let agree = predictions
        .iter()
        .zip(actuals.iter())
        .filter(|(p, a)| (**p > 0.0) == (**a > 0.0))
        .count();
    agree as f64 / n as f64
}

/// Full metric set for one prediction pair, with flags from the configured
/// thresholds.
pub fn evaluate(
    train_predictions: &Array1<f64>,
    y_train: &Array1<f64>,
    test_predictions: &Array1<f64>,
    y_test: &Array1<f64>,
    thresholds: &EvaluationThresholds,
) -> SpecialistMetrics {
    let train_mae = mean_absolute_error(train_predictions, y_train);
    let test_mae = mean_absolute_error(test_predictions, y_test);
    let train_directional_accuracy = directional_accuracy(train_predictions, y_train);
    let test_directional_accuracy = directional_accuracy(test_predictions, y_test);

    // NaN ratios compare false on both flags, so degenerate inputs
    // simply report unflagged NaN metrics.
    let overfit = train_mae / test_mae < thresholds.overfit_ratio;
    let beats_random = test_directional_accuracy > thresholds.beats_random;

    SpecialistMetrics {
        train_mae,
        test_mae,
        train_directional_accuracy,
        test_directional_accuracy,
        overfit,
        beats_random,
    }
}

/// R² against the mean predictor; 0.0 for a zero-variance target.
pub fn r_squared(predictions: &Array1<f64>, actuals: &Array1<f64>) -> f64 {
    let n = predictions.len().min(actuals.len());
    if n == 0 {
        return f64::NAN;
    }
    let mean = actuals.iter().sum::<f64>() / n as f64;
    let ss_res: f64 = predictions
        .iter()
        .zip(actuals.iter())
        .map(|(p, a)| (a - p).powi(2))
        .sum();
    let ss_tot: f64 = actuals.iter().map(|a| (a - mean).powi(2)).sum();
    if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_mae_basic() {
        let predictions = array![1.0, 2.0, 3.0];
        let actuals = array![1.5, 2.0, 2.0];
        assert!((mean_absolute_error(&predictions, &actuals) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_mae_non_negative_and_empty_is_nan() {
        let empty = Array1::<f64>::zeros(0);
        assert!(mean_absolute_error(&empty, &empty).is_nan());

        let predictions = array![-5.0, 5.0];
        let actuals = array![5.0, -5.0];
        assert!(mean_absolute_error(&predictions, &actuals) >= 0.0);
    }

    #[test]
    fn test_directional_accuracy_zero_counts_as_non_positive() {
        // pred 0.0 vs actual -0.1: both non-positive, counted as agreement.
        let predictions = array![0.0, 0.3, -0.2];
        let actuals = array![-0.1, 0.4, 0.2];
        let acc = directional_accuracy(&predictions, &actuals);
        assert!((acc - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_directional_accuracy_bounds() {
        let predictions = array![1.0, -1.0, 1.0, -1.0];
        let actuals = array![1.0, 1.0, -1.0, -1.0];
        let acc = directional_accuracy(&predictions, &actuals);
        assert!((0.0..=1.0).contains(&acc));
        assert!((acc - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_scenario_b_overfit_flag() {
        // train_mae 0.01 vs test_mae 0.5 → ratio 0.02 < 0.5 → flagged
        let y_train = array![0.0, 0.0];
        let train_predictions = array![0.01, -0.01];
        let y_test = array![0.0, 0.0];
        let test_predictions = array![0.5, -0.5];

        let metrics = evaluate(
            &train_predictions,
            &y_train,
            &test_predictions,
            &y_test,
            &EvaluationThresholds::default(),
        );
        assert!((metrics.train_mae - 0.01).abs() < 1e-12);
        assert!((metrics.test_mae - 0.5).abs() < 1e-12);
        assert!(metrics.overfit);
    }

    #[test]
    fn test_beats_random_flag() {
        // 3 of 4 directions correct = 0.75 > 0.52
        let y = array![0.1, -0.1, 0.2, -0.2];
        let predictions = array![0.2, -0.3, 0.1, 0.4];
        let metrics = evaluate(&predictions, &y, &predictions, &y, &EvaluationThresholds::default());
        assert!(metrics.beats_random);
    }

    #[test]
    fn test_empty_inputs_do_not_flag() {
        let empty = Array1::<f64>::zeros(0);
        let metrics = evaluate(&empty, &empty, &empty, &empty, &EvaluationThresholds::default());
        assert!(metrics.train_mae.is_nan());
        assert!(metrics.test_directional_accuracy.is_nan());
        assert!(!metrics.overfit);
        assert!(!metrics.beats_random);
    }

    #[test]
    fn test_r_squared_perfect_and_degenerate() {
        let y = array![1.0, 2.0, 3.0];
        assert!((r_squared(&y, &y) - 1.0).abs() < 1e-12);

        let flat = array![2.0, 2.0, 2.0];
        assert_eq!(r_squared(&flat, &flat), 0.0);
    }
}
