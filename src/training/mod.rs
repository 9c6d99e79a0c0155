//! Model families and specialist training
//!
//! Five regressor families back the five feature domains:
//! - gradient-boosted trees (policy, geographic)
//! - a bagged bootstrap forest (arbitrage)
//! - an extremely randomized forest (volatility)
//! - a small feed-forward network (momentum)
//! - ridge regression (the stacking meta-learner)

pub mod cross_validation;
pub mod decision_tree;
pub mod extra_trees;
pub mod gradient_boosting;
pub mod linear_models;
pub mod neural_network;
pub mod random_forest;
mod specialist;

pub use cross_validation::{CvSplit, KFold};
pub use decision_tree::{RegressionTree, TreeNode};
pub use extra_trees::{ExtraTreesConfig, ExtraTreesRegressor};
pub use gradient_boosting::{GradientBoostingConfig, GradientBoostingRegressor};
pub use linear_models::RidgeRegression;
pub use neural_network::{MlpConfig, MlpRegressor};
pub use random_forest::{BaggedForestConfig, BaggedForestRegressor};
pub use specialist::{Specialist, SpecialistModel, SpecialistTrainer};
