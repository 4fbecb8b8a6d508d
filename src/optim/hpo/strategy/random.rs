//! Fixed-budget random search

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::optim::hpo::error::{HPOError, Result};
use crate::optim::hpo::types::{Goal, HyperparameterSpace, Sample};

use super::Strategy;

/// How the random budget is spread over the space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sampling {
    /// Independent uniform draws within each dimension's bounds
    #[default]
    Uniform,
    /// One draw per equal stratum of each dimension, strata shuffled
    LatinHypercube,
}

/// Random search over a fixed budget of samples drawn at construction.
///
/// Draws are made in search coordinates and mapped back to native values
/// through [`HyperparameterSpace::unwarp`].
#[derive(Debug, Clone)]
pub struct RandomStrategy {
    goal: Goal,
    samples: Vec<Sample>,
    sampled_so_far: usize,
}

impl RandomStrategy {
    /// Pre-generate `num_samples` uniform samples from `space` using `seed`
    pub fn new(
        goal: Goal,
        space: &HyperparameterSpace,
        num_samples: usize,
        seed: u64,
    ) -> Result<Self> {
        Self::with_sampling(goal, space, num_samples, seed, Sampling::Uniform)
    }

    /// Pre-generate `num_samples` samples using the given scheme
    pub fn with_sampling(
        goal: Goal,
        space: &HyperparameterSpace,
        num_samples: usize,
        seed: u64,
        sampling: Sampling,
    ) -> Result<Self> {
        space.validate_domains()?;
        let mut rng = StdRng::seed_from_u64(seed);
        let samples = match sampling {
            Sampling::Uniform => (0..num_samples).map(|_| space.sample_random(&mut rng)).collect(),
            Sampling::LatinHypercube => Self::latin_hypercube(space, num_samples, &mut rng)?,
        };
        Ok(Self {
            goal,
            samples,
            sampled_so_far: 0,
        })
    }

    fn latin_hypercube<R: Rng>(
        space: &HyperparameterSpace,
        num_samples: usize,
        rng: &mut R,
    ) -> Result<Vec<Sample>> {
        let bounds = space.bounds();
        let mut points = vec![vec![0.0; bounds.len()]; num_samples];

        for (dim, (low, high)) in bounds.iter().enumerate() {
            let mut strata: Vec<usize> = (0..num_samples).collect();
            strata.shuffle(rng);
            for (point, stratum) in points.iter_mut().zip(strata) {
                let u = (stratum as f64 + rng.random::<f64>()) / num_samples as f64;
                point[dim] = low + (high - low) * u;
            }
        }

        points.iter().map(|point| space.unwarp(point)).collect()
    }

    /// Total budget
    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }

    /// Samples handed out so far
    pub fn sampled_so_far(&self) -> usize {
        self.sampled_so_far
    }
}

impl Strategy for RandomStrategy {
    fn goal(&self) -> Goal {
        self.goal
    }

    fn sample(&mut self) -> Result<Sample> {
        let sample = self.samples.get(self.sampled_so_far).cloned().ok_or(HPOError::Exhausted)?;
        self.sampled_so_far += 1;
        Ok(sample)
    }

    fn update(&mut self, _sample: &Sample, _metric_score: f64) {}

    fn finished(&self) -> bool {
        self.sampled_so_far >= self.samples.len()
    }
}
