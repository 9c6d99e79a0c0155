//! Feature-domain assignment
//!
//! Classifies each feature column into zero or more specialist domains by
//! substring matching over the lower-cased column name. The `Domain`
//! declaration order is the single stable ordering used for meta-matrix
//! columns, weight reporting and bundle persistence.

use serde::{Deserialize, Serialize};

use crate::config::DomainKeywords;

/// A specialist domain. Declaration order is load-bearing: it fixes the
/// column order of the stacked meta matrices and must match between the
/// training run and any later inference replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Domain {
    Policy,
    Geographic,
    Arbitrage,
    Momentum,
    Volatility,
}

impl Domain {
    pub const ALL: [Domain; 5] = [
        Domain::Policy,
        Domain::Geographic,
        Domain::Arbitrage,
        Domain::Momentum,
        Domain::Volatility,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Domain::Policy => "policy",
            Domain::Geographic => "geographic",
            Domain::Arbitrage => "arbitrage",
            Domain::Momentum => "momentum",
            Domain::Volatility => "volatility",
        }
    }

    /// Position in [`Domain::ALL`].
    pub fn index(&self) -> usize {
        Domain::ALL.iter().position(|d| d == self).unwrap_or(0)
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Domain membership over a fixed feature-name list.
///
/// Member indices refer to column positions in the feature matrix. Groups
/// may overlap and may be empty; downstream training skips empty groups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureGroups {
    members: Vec<Vec<usize>>,
    feature_names: Vec<String>,
}

impl FeatureGroups {
    /// Assign every feature to the domains whose keyword lists it matches.
    ///
    /// Pure function of the name list and keyword config; idempotent and
    /// order-independent per feature.
    pub fn assign(feature_names: &[String], keywords: &DomainKeywords) -> Self {
        let mut members: Vec<Vec<usize>> = vec![Vec::new(); Domain::ALL.len()];

        for (idx, name) in feature_names.iter().enumerate() {
            let lower = name.to_lowercase();
            for domain in Domain::ALL {
                let matched = keywords
                    .for_domain(domain)
                    .iter()
                    .any(|term| lower.contains(term.as_str()));
                if matched {
                    members[domain.index()].push(idx);
                }
            }
        }

        Self { members, feature_names: feature_names.to_vec() }
    }

    pub fn group(&self, domain: Domain) -> &[usize] {
        &self.members[domain.index()]
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Names of the members of one domain, for logging and the bundle sidecar.
    pub fn group_names(&self, domain: Domain) -> Vec<&str> {
        self.group(domain).iter().map(|&i| self.feature_names[i].as_str()).collect()
    }

    /// Domains with at least one member, in stable order.
    pub fn non_empty(&self) -> impl Iterator<Item = Domain> + '_ {
        Domain::ALL.into_iter().filter(|d| !self.group(*d).is_empty())
    }
}
