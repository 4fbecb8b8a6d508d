//! Search strategies: which parameter combinations to try next
//!
//! - **RandomStrategy**: fixed budget of pre-drawn samples
//! - **GridStrategy**: exhaustive cartesian product of the space
//! - **BayesianStrategy**: suggest/observe loop over a surrogate optimizer

mod bayesian;
mod grid;
mod random;

pub use bayesian::{BayesianStrategy, SurrogateOptimizer};
pub use grid::GridStrategy;
pub use random::{RandomStrategy, Sampling};

use super::error::{HPOError, Result};
use super::types::{Goal, Sample};

/// Search strategy driven by an executor.
///
/// Running out of samples is reported through [`HPOError::Exhausted`], which
/// callers treat as normal termination rather than failure. Once
/// [`finished`](Strategy::finished) returns true it stays true.
pub trait Strategy: Send {
    /// Optimization goal fixed at construction
    fn goal(&self) -> Goal;

    /// Produce one parameter assignment, or `Exhausted`
    fn sample(&mut self) -> Result<Sample>;

    /// Feed back the score of one sampled assignment
    fn update(&mut self, sample: &Sample, metric_score: f64);

    /// True once no further samples will be produced
    fn finished(&self) -> bool;

    /// Draw up to `batch_size` samples.
    ///
    /// Exhaustion mid-batch returns the partial batch. Exhaustion before the
    /// first sample propagates `Exhausted` so the caller's loop stops.
    fn sample_batch(&mut self, batch_size: usize) -> Result<Vec<Sample>> {
        let mut samples = Vec::with_capacity(batch_size);
        for _ in 0..batch_size {
            match self.sample() {
                Ok(sample) => samples.push(sample),
                Err(HPOError::Exhausted) if !samples.is_empty() => break,
                Err(e) => return Err(e),
            }
        }
        Ok(samples)
    }

    /// Apply [`update`](Strategy::update) to each pair in order
    fn update_batch(&mut self, results: &[(Sample, f64)]) {
        for (sample, metric_score) in results {
            self.update(sample, *metric_score);
        }
    }
}
