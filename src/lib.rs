//! stackcast - Specialist-ensemble forecasting trainer
//!
//! Partitions a wide feature space into domain-themed groups, trains one
//! regressor per group ("specialist"), and combines the specialists'
//! predictions through an L2-regularized linear meta-learner ("stacking")
//! to forecast a financial time-series target.
//!
//! # Modules
//!
//! - [`config`] - All fixed constants as an explicit, overridable struct
//! - [`data`] - Tabular input boundary (polars) and numeric sanitization
//! - [`features`] - Domain keyword matching and feature-group assignment
//! - [`training`] - The five model families and the specialist trainer
//! - [`evaluation`] - MAE, directional accuracy and diagnostic flags
//! - [`stacking`] - Meta-matrix assembly and the ridge meta-learner
//! - [`report`] - Benchmark ladder and ensemble-vs-specialist comparison
//! - [`bundle`] - Bundle persistence and inference replay
//! - [`pipeline`] - The end-to-end batch run
//! - [`cli`] - `train` and `predict` subcommands

pub mod error;

pub mod config;
pub mod data;
pub mod features;
pub mod training;

pub mod evaluation;
pub mod stacking;

pub mod report;
pub mod bundle;
pub mod pipeline;

pub mod cli;

pub use error::{Result, StackcastError};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{Result, StackcastError};

    pub use crate::config::{StackingInputs, TrainerConfig};

    pub use crate::data::{load_dataset, load_table, read_feature_names, Dataset};
    pub use crate::features::{Domain, FeatureGroups};

    pub use crate::training::{Specialist, SpecialistModel, SpecialistTrainer};

    pub use crate::evaluation::{evaluate, SpecialistMetrics};
    pub use crate::stacking::{EnsembleStacker, StackedEnsemble};

    pub use crate::report::{benchmark, BenchmarkReport};
    pub use crate::bundle::ModelBundle;
    pub use crate::pipeline::{run, TrainingOutcome};
}
