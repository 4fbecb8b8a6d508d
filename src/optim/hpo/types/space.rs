//! Hyperparameter search space

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::optim::hpo::error::{HPOError, Result};

use super::parameter::{ParameterDomain, ParameterValue, Sample};

/// Hyperparameter search space
///
/// Parameters are kept in name order so that seeded sampling and grid
/// enumeration are reproducible.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct HyperparameterSpace {
    /// Parameter name -> domain mapping
    params: BTreeMap<String, ParameterDomain>,
}

/// A domain as written in configuration: either a tagged domain or a bare
/// list of choices (`combiner.num_fc_layers: [1, 2, 3]`).
#[derive(Deserialize)]
#[serde(untagged)]
enum DomainEntry {
    Choices(Vec<ParameterValue>),
    Domain(ParameterDomain),
}

impl<'de> Deserialize<'de> for HyperparameterSpace {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let entries = BTreeMap::<String, DomainEntry>::deserialize(deserializer)?;
        let params = entries
            .into_iter()
            .map(|(name, entry)| {
                let domain = match entry {
                    DomainEntry::Domain(domain) => domain,
                    DomainEntry::Choices(choices) => ParameterDomain::Categorical { choices },
                };
                (name, domain)
            })
            .collect();
        Ok(Self { params })
    }
}

impl HyperparameterSpace {
    /// Create an empty search space
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter to the search space
    pub fn add(&mut self, name: &str, domain: ParameterDomain) {
        self.params.insert(name.to_string(), domain);
    }

    /// Builder-style variant of [`add`](Self::add)
    pub fn with(mut self, name: &str, domain: ParameterDomain) -> Self {
        self.add(name, domain);
        self
    }

    /// Get a parameter domain
    pub fn get(&self, name: &str) -> Option<&ParameterDomain> {
        self.params.get(name)
    }

    /// Check if space is empty
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Get number of parameters
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Iterate over parameters
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParameterDomain)> {
        self.params.iter()
    }

    /// Parameter names in search order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    /// Sample a random configuration
    pub fn sample_random<R: Rng>(&self, rng: &mut R) -> Sample {
        self.params.iter().map(|(name, domain)| (name.clone(), domain.sample(rng))).collect()
    }

    /// Per-dimension bounds in warped coordinates, in name order
    pub fn bounds(&self) -> Vec<(f64, f64)> {
        self.params.values().map(ParameterDomain::bounds).collect()
    }

    /// Map a warped point (one coordinate per parameter, in name order) back to a sample
    pub fn unwarp(&self, point: &[f64]) -> Result<Sample> {
        if point.len() != self.params.len() {
            return Err(HPOError::DimensionMismatch {
                expected: self.params.len(),
                got: point.len(),
            });
        }
        Ok(self
            .params
            .iter()
            .zip(point)
            .map(|((name, domain), &x)| (name.clone(), domain.unwarp(x)))
            .collect())
    }

    /// Map a sample to a point in warped coordinates, in name order
    pub fn warp(&self, sample: &Sample) -> Result<Vec<f64>> {
        self.params
            .iter()
            .map(|(name, domain)| {
                let value = sample
                    .get(name)
                    .ok_or_else(|| HPOError::ParameterNotFound(name.clone()))?;
                domain
                    .warp(value)
                    .ok_or_else(|| HPOError::InvalidValue(name.clone(), value.to_string()))
            })
            .collect()
    }

    /// Check that every domain is well formed
    pub fn validate_domains(&self) -> Result<()> {
        if self.is_empty() {
            return Err(HPOError::EmptySpace);
        }
        self.params.iter().try_for_each(|(name, domain)| domain.validate(name))
    }

    /// Validate a configuration
    pub fn validate(&self, config: &Sample) -> Result<()> {
        for (name, domain) in &self.params {
            match config.get(name) {
                Some(value) if domain.is_valid(value) => {}
                Some(value) => {
                    return Err(HPOError::InvalidValue(name.clone(), format!("{value:?}")))
                }
                None => return Err(HPOError::ParameterNotFound(name.clone())),
            }
        }
        Ok(())
    }
}
