//! Specialist training
//!
//! One regressor per non-empty feature domain, with a fixed family per
//! domain. The resulting specialist set is data-dependent: a domain whose
//! group is empty, or below its family's minimum feature count, is skipped
//! without error and downstream code discovers the set at evaluation time.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::extra_trees::ExtraTreesRegressor;
use super::gradient_boosting::GradientBoostingRegressor;
use super::neural_network::MlpRegressor;
use super::random_forest::BaggedForestRegressor;
use crate::config::TrainerConfig;
use crate::data::Dataset;
use crate::error::Result;
use crate::features::{Domain, FeatureGroups};

/// A fitted model of whichever family the domain prescribes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SpecialistModel {
    GradientBoosting(GradientBoostingRegressor),
    BaggedForest(BaggedForestRegressor),
    ExtraTrees(ExtraTreesRegressor),
    NeuralNet(MlpRegressor),
}

impl SpecialistModel {
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            SpecialistModel::GradientBoosting(m) => m.predict(x),
            SpecialistModel::BaggedForest(m) => m.predict(x),
            SpecialistModel::ExtraTrees(m) => m.predict(x),
            SpecialistModel::NeuralNet(m) => m.predict(x),
        }
    }

    pub fn family_name(&self) -> &'static str {
        match self {
            SpecialistModel::GradientBoosting(_) => "gradient_boosting",
            SpecialistModel::BaggedForest(_) => "bagged_forest",
            SpecialistModel::ExtraTrees(_) => "extra_trees",
            SpecialistModel::NeuralNet(_) => "neural_net",
        }
    }
}

/// One trained specialist bound to its domain's feature slice.
///
/// Both prediction vectors are aligned index-for-index with the rows of the
/// matrices they were computed from; the stacker depends on that alignment.
#[derive(Debug, Clone)]
pub struct Specialist {
    pub domain: Domain,
    pub feature_indices: Vec<usize>,
    pub model: SpecialistModel,
    pub train_predictions: Array1<f64>,
    pub test_predictions: Array1<f64>,
}

pub struct SpecialistTrainer<'a> {
    config: &'a TrainerConfig,
}

impl<'a> SpecialistTrainer<'a> {
    pub fn new(config: &'a TrainerConfig) -> Self {
        Self { config }
    }

    /// Train every eligible domain in stable order.
    pub fn train_all(
        &self,
        groups: &FeatureGroups,
        train: &Dataset,
        test: &Dataset,
    ) -> Result<Vec<Specialist>> {
        let mut specialists = Vec::new();

        for domain in Domain::ALL {
            let members = groups.group(domain);
            if !self.eligible(domain, members.len()) {
                debug!(
                    domain = domain.name(),
                    n_features = members.len(),
                    "skipping domain below its feature minimum"
                );
                continue;
            }

            let x_train = train.x.select(Axis(1), members);
            let x_test = test.x.select(Axis(1), members);

            info!(
                domain = domain.name(),
                n_features = members.len(),
                n_rows = x_train.nrows(),
                "training specialist"
            );

            let model = self.fit_domain_model(
                domain,
                &x_train,
                &train.y,
                Some((&x_test, &test.y)),
            )?;

            let train_predictions = model.predict(&x_train)?;
            let test_predictions = model.predict(&x_test)?;

            specialists.push(Specialist {
                domain,
                feature_indices: members.to_vec(),
                model,
                train_predictions,
                test_predictions,
            });
        }

        Ok(specialists)
    }

    /// Whether a domain trains at all. The momentum and volatility families
    /// need strictly more features than their configured minimum; the tree
    /// ensembles only need a non-empty group.
    pub fn eligible(&self, domain: Domain, n_members: usize) -> bool {
        match domain {
            Domain::Momentum => n_members > self.config.momentum_min_features,
            Domain::Volatility => n_members > self.config.volatility_min_features,
            _ => n_members > 0,
        }
    }

    /// Fit the family assigned to `domain` on an already-sliced matrix.
    /// Also used by the out-of-fold stacker to refit per fold. `monitor` is
    /// only consulted by the neural net, for its periodic loss logging.
    pub fn fit_domain_model(
        &self,
        domain: Domain,
        x: &Array2<f64>,
        y: &Array1<f64>,
        monitor: Option<(&Array2<f64>, &Array1<f64>)>,
    ) -> Result<SpecialistModel> {
        let seed = self.config.random_seed.wrapping_add(domain.index() as u64);

        match domain {
            Domain::Policy | Domain::Geographic => {
                let mut config = self.config.boosting.clone();
                config.random_state = Some(seed);
                let mut model = GradientBoostingRegressor::new(config);
                model.fit(x, y)?;
                Ok(SpecialistModel::GradientBoosting(model))
            }
            Domain::Arbitrage => {
                let mut config = self.config.bagging.clone();
                config.random_state = Some(seed);
                let mut model = BaggedForestRegressor::new(config);
                model.fit(x, y)?;
                Ok(SpecialistModel::BaggedForest(model))
            }
            Domain::Momentum => {
                let mut config = self.config.mlp.clone();
                config.random_state = Some(seed);
                let mut model = MlpRegressor::new(config);
                model.fit(x, y, monitor)?;
                Ok(SpecialistModel::NeuralNet(model))
            }
            Domain::Volatility => {
                let mut config = self.config.extra_trees.clone();
                config.random_state = Some(seed);
                let mut model = ExtraTreesRegressor::new(config);
                model.fit(x, y)?;
                Ok(SpecialistModel::ExtraTrees(model))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DomainKeywords;
    use ndarray::Array2;

    fn small_config() -> TrainerConfig {
        let mut config = TrainerConfig::default();
        config.boosting.n_estimators = 5;
        config.bagging.n_estimators = 5;
        config.extra_trees.n_estimators = 5;
        config.mlp.epochs = 5;
        config
    }

    fn dataset(names: &[&str], n_rows: usize) -> (Vec<String>, Dataset) {
        let names: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        let n_cols = names.len();
        let x = Array2::from_shape_fn((n_rows, n_cols), |(r, c)| {
            ((r * 7 + c * 3) % 11) as f64 * 0.1
        });
        let y = Array1::from_shape_fn(n_rows, |r| if r % 2 == 0 { 0.05 } else { -0.03 });
        (names, Dataset { x, y })
    }

    #[test]
    fn test_scenario_a_specialist_set() {
        // One feature per domain: trees train, momentum (>5) and
        // volatility (>3) do not.
        let (names, train) =
            dataset(&["tariff_index", "brazil_temp_c", "corr_palm_7d", "price_lag_1", "vix_close"], 30);
        let (_, test) =
            dataset(&["tariff_index", "brazil_temp_c", "corr_palm_7d", "price_lag_1", "vix_close"], 10);

        let config = small_config();
        let groups = FeatureGroups::assign(&names, &DomainKeywords::default());
        let trainer = SpecialistTrainer::new(&config);
        let specialists = trainer.train_all(&groups, &train, &test).unwrap();

        let domains: Vec<Domain> = specialists.iter().map(|s| s.domain).collect();
        assert_eq!(domains, vec![Domain::Policy, Domain::Geographic, Domain::Arbitrage]);
    }

    #[test]
    fn test_predictions_are_row_aligned() {
        let (names, train) = dataset(&["tariff_a", "tariff_b"], 24);
        let (_, test) = dataset(&["tariff_a", "tariff_b"], 9);

        let config = small_config();
        let groups = FeatureGroups::assign(&names, &DomainKeywords::default());
        let trainer = SpecialistTrainer::new(&config);
        let specialists = trainer.train_all(&groups, &train, &test).unwrap();

        assert_eq!(specialists.len(), 1);
        assert_eq!(specialists[0].train_predictions.len(), 24);
        assert_eq!(specialists[0].test_predictions.len(), 9);
    }

    #[test]
    fn test_momentum_gate_is_strict() {
        let config = small_config();
        let trainer = SpecialistTrainer::new(&config);
        assert!(!trainer.eligible(Domain::Momentum, 5));
        assert!(trainer.eligible(Domain::Momentum, 6));
        assert!(!trainer.eligible(Domain::Volatility, 3));
        assert!(trainer.eligible(Domain::Volatility, 4));
        assert!(trainer.eligible(Domain::Policy, 1));
        assert!(!trainer.eligible(Domain::Policy, 0));
    }

    #[test]
    fn test_empty_groups_produce_no_specialists() {
        let (names, train) = dataset(&["row_id", "misc"], 20);
        let (_, test) = dataset(&["row_id", "misc"], 5);

        let config = small_config();
        let groups = FeatureGroups::assign(&names, &DomainKeywords::default());
        let trainer = SpecialistTrainer::new(&config);
        let specialists = trainer.train_all(&groups, &train, &test).unwrap();
        assert!(specialists.is_empty());
    }
}
