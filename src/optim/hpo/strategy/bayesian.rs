//! Bayesian strategy over a surrogate optimizer

use std::slice;

use crate::optim::hpo::error::{HPOError, Result};
use crate::optim::hpo::tpe::TPEOptimizer;
use crate::optim::hpo::types::{Goal, Sample};

use super::Strategy;

/// Surrogate model capability: propose points, learn from their scores.
///
/// Implementations minimize the observed scores.
pub trait SurrogateOptimizer: Send {
    /// Propose `n` points to evaluate next
    fn suggest(&mut self, n: usize) -> Result<Vec<Sample>>;

    /// Record the scores of previously suggested points
    fn observe(&mut self, samples: &[Sample], scores: &[f64]);
}

/// Delegates sampling to a surrogate optimizer under a fixed trial budget.
#[derive(Debug, Clone)]
pub struct BayesianStrategy<O = TPEOptimizer> {
    goal: Goal,
    optimizer: O,
    num_samples: usize,
    sampled_so_far: usize,
}

impl<O: SurrogateOptimizer> BayesianStrategy<O> {
    /// Wrap `optimizer`, allowing `num_samples` suggestions
    pub fn new(goal: Goal, optimizer: O, num_samples: usize) -> Self {
        Self {
            goal,
            optimizer,
            num_samples,
            sampled_so_far: 0,
        }
    }

    /// Access the surrogate
    pub fn optimizer(&self) -> &O {
        &self.optimizer
    }
}

impl<O: SurrogateOptimizer> Strategy for BayesianStrategy<O> {
    fn goal(&self) -> Goal {
        self.goal
    }

    fn sample(&mut self) -> Result<Sample> {
        if self.finished() {
            return Err(HPOError::Exhausted);
        }
        let sample = self
            .optimizer
            .suggest(1)?
            .pop()
            .ok_or_else(|| HPOError::Internal("surrogate returned no suggestion".to_string()))?;
        self.sampled_so_far += 1;
        Ok(sample)
    }

    fn update(&mut self, sample: &Sample, metric_score: f64) {
        let score = match self.goal {
            Goal::Minimize => metric_score,
            Goal::Maximize => -metric_score,
        };
        self.optimizer.observe(slice::from_ref(sample), &[score]);
    }

    fn finished(&self) -> bool {
        self.sampled_so_far >= self.num_samples
    }
}
