//! Benchmark reporting
//!
//! Compares the ensemble's held-out directional accuracy against the fixed
//! qualitative ladder and against the best single specialist. The top rung
//! of the ladder is a red flag: directional accuracy that high on a return
//! series is treated as probable label leakage, not success.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::BenchmarkLadder;
use crate::features::Domain;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkRung {
    pub threshold: f64,
    pub label: String,
    pub satisfied: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub ensemble_accuracy: f64,
    pub rungs: Vec<BenchmarkRung>,
    /// Best single specialist by held-out directional accuracy.
    pub best_specialist: Option<(Domain, f64)>,
    /// Ensemble accuracy minus the best specialist's, signed.
    pub improvement_over_best: Option<f64>,
    pub leakage_suspect: bool,
}

/// Build the report from the ensemble's held-out directional accuracy and
/// each specialist's.
pub fn benchmark(
    ensemble_accuracy: f64,
    specialist_accuracies: &[(Domain, f64)],
    ladder: &BenchmarkLadder,
) -> BenchmarkReport {
    let rungs = vec![
        rung(ladder.signal, "has signal", ensemble_accuracy),
        rung(ladder.production_ready, "production ready", ensemble_accuracy),
        rung(ladder.excellent, "excellent", ensemble_accuracy),
        rung(ladder.leakage_suspect, "implausibly high; investigate for leakage", ensemble_accuracy),
    ];

    let best_specialist = specialist_accuracies
        .iter()
        .filter(|(_, acc)| acc.is_finite())
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .copied();

    let improvement_over_best = best_specialist.map(|(_, acc)| ensemble_accuracy - acc);
    let leakage_suspect = ensemble_accuracy > ladder.leakage_suspect;

    BenchmarkReport {
        ensemble_accuracy,
        rungs,
        best_specialist,
        improvement_over_best,
        leakage_suspect,
    }
}

fn rung(threshold: f64, label: &str, accuracy: f64) -> BenchmarkRung {
    BenchmarkRung {
        threshold,
        label: label.to_string(),
        satisfied: accuracy > threshold,
    }
}

impl BenchmarkReport {
    /// Emit the ladder and comparison through the log surface. Advisory
    /// only; nothing downstream parses this.
    pub fn log(&self) {
        info!(accuracy = self.ensemble_accuracy, "ensemble held-out directional accuracy");

        for rung in &self.rungs {
            let status = if rung.satisfied { "reached" } else { "not reached" };
            info!(threshold = rung.threshold, label = %rung.label, status, "benchmark rung");
        }

        if let (Some((domain, accuracy)), Some(improvement)) =
            (self.best_specialist, self.improvement_over_best)
        {
            info!(
                best = domain.name(),
                best_accuracy = accuracy,
                improvement,
                "ensemble vs best single specialist"
            );
        }

        if self.leakage_suspect {
            warn!(
                accuracy = self.ensemble_accuracy,
                "accuracy beyond the plausibility ceiling; audit features for label leakage"
            );
        }
    }
}
