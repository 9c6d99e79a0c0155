//! Trainer configuration
//!
//! Every fixed constant of the pipeline lives here: the domain keyword
//! lists, per-family hyperparameters, minimum-feature gates, evaluation
//! thresholds and the benchmark ladder. `Default` yields the production
//! values; a JSON file can override any of them.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::features::Domain;
use crate::training::extra_trees::ExtraTreesConfig;
use crate::training::gradient_boosting::GradientBoostingConfig;
use crate::training::neural_network::MlpConfig;
use crate::training::random_forest::BaggedForestConfig;

/// Keyword lists used to assign feature columns to specialist domains.
///
/// A feature joins every domain whose list contains a substring of its
/// lower-cased name; overlap between domains is allowed and intentional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainKeywords {
    pub policy: Vec<String>,
    pub geographic: Vec<String>,
    pub arbitrage: Vec<String>,
    pub momentum: Vec<String>,
    pub volatility: Vec<String>,
}

impl DomainKeywords {
    pub fn for_domain(&self, domain: Domain) -> &[String] {
        match domain {
            Domain::Policy => &self.policy,
            Domain::Geographic => &self.geographic,
            Domain::Arbitrage => &self.arbitrage,
            Domain::Momentum => &self.momentum,
            Domain::Volatility => &self.volatility,
        }
    }
}

impl Default for DomainKeywords {
    fn default() -> Self {
        let list = |terms: &[&str]| terms.iter().map(|s| s.to_string()).collect();
        Self {
            policy: list(&["tariff", "quota", "export_ban", "sanction", "subsidy", "policy"]),
            geographic: list(&[
                "brazil", "vietnam", "colombia", "indonesia", "temp", "rain", "frost", "drought",
            ]),
            arbitrage: list(&["corr_", "spread", "palm", "soy", "basis", "arb_"]),
            momentum: list(&["price", "lag", "return", "momentum", "rsi", "ma_"]),
            volatility: list(&["vix", "vol", "std", "atr", "skew"]),
        }
    }
}

/// Which predictions feed the meta-learner's training matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StackingInputs {
    /// Specialists' in-sample predictions on the rows they were trained on.
    /// Can yield optimistic meta-learner weights; default behavior.
    InSample,
    /// K-fold out-of-fold predictions: each specialist family is refit per
    /// fold and only held-out-fold predictions enter the meta matrix.
    OutOfFold { n_folds: usize },
}

/// Thresholds applied when evaluating a single specialist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationThresholds {
    /// Overfitting is flagged when `train_mae / test_mae` falls below this.
    pub overfit_ratio: f64,
    /// Held-out directional accuracy above this beats a coin flip.
    pub beats_random: f64,
}

impl Default for EvaluationThresholds {
    fn default() -> Self {
        Self { overfit_ratio: 0.5, beats_random: 0.52 }
    }
}

/// Qualitative ladder for the ensemble's held-out directional accuracy.
///
/// The top rung is a sanity check, not a goal: accuracy that high on a
/// financial return series usually means the features leak the label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkLadder {
    pub signal: f64,
    pub production_ready: f64,
    pub excellent: f64,
    pub leakage_suspect: f64,
}

impl Default for BenchmarkLadder {
    fn default() -> Self {
        Self { signal: 0.55, production_ready: 0.60, excellent: 0.65, leakage_suspect: 0.70 }
    }
}

/// Top-level trainer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Name of the label column in both input tables.
    pub label_column: String,
    /// Base seed; each specialist derives its own seed from this.
    pub random_seed: u64,
    pub keywords: DomainKeywords,
    /// Policy and geographic specialists (independent fits, same family).
    pub boosting: GradientBoostingConfig,
    /// Arbitrage specialist.
    pub bagging: BaggedForestConfig,
    /// Volatility specialist.
    pub extra_trees: ExtraTreesConfig,
    /// Momentum specialist.
    pub mlp: MlpConfig,
    /// The momentum specialist trains only with strictly more features than this.
    pub momentum_min_features: usize,
    /// The volatility specialist trains only with strictly more features than this.
    pub volatility_min_features: usize,
    /// L2 strength of the ridge meta-learner.
    pub ridge_alpha: f64,
    pub stacking: StackingInputs,
    pub evaluation: EvaluationThresholds,
    pub benchmark: BenchmarkLadder,
    /// Meta-learner weights below this magnitude are flagged "low contribution".
    pub low_contribution: f64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            label_column: "target_1w".to_string(),
            random_seed: 42,
            keywords: DomainKeywords::default(),
            boosting: GradientBoostingConfig::default(),
            bagging: BaggedForestConfig::default(),
            extra_trees: ExtraTreesConfig::default(),
            mlp: MlpConfig::default(),
            momentum_min_features: 5,
            volatility_min_features: 3,
            ridge_alpha: 1.0,
            stacking: StackingInputs::InSample,
            evaluation: EvaluationThresholds::default(),
            benchmark: BenchmarkLadder::default(),
            low_contribution: 0.05,
        }
    }
}

impl TrainerConfig {
    /// Load a configuration from a JSON file; missing fields keep defaults.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        Ok(config)
    }

    pub fn with_label_column(mut self, name: impl Into<String>) -> Self {
        self.label_column = name.into();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }
}
