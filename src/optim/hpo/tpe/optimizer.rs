//! TPE optimizer core implementation

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::optim::hpo::error::Result;
use crate::optim::hpo::strategy::SurrogateOptimizer;
use crate::optim::hpo::types::{HyperparameterSpace, ParameterDomain, Sample};

use super::parzen::{propose_cell, propose_continuous};

/// Integer ranges wider than this are modelled as continuous
const MAX_CELLS: usize = 256;

/// A scored point in warped search coordinates
#[derive(Debug, Clone)]
struct Observation {
    point: Vec<f64>,
    score: f64,
}

/// Tree-structured Parzen Estimator optimizer
///
/// Observations are split at the `gamma` quantile into "good" and "bad"
/// sets. Each dimension is then proposed independently, maximizing the ratio
/// l(x) / g(x) of the two sets' estimators. Scores are minimized.
#[derive(Debug, Clone)]
pub struct TPEOptimizer {
    space: HyperparameterSpace,
    /// Quantile for splitting good/bad (default: 0.25)
    pub(crate) gamma: f64,
    /// Observations before the model is used
    n_startup: usize,
    n_candidates: usize,
    history: Vec<Observation>,
    rng: StdRng,
}

impl TPEOptimizer {
    /// Create a new TPE optimizer
    pub fn new(space: HyperparameterSpace) -> Self {
        Self {
            space,
            gamma: 0.25,
            n_startup: 10,
            n_candidates: 24,
            history: Vec::new(),
            rng: StdRng::from_os_rng(),
        }
    }

    /// Set gamma (quantile for splitting)
    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma.clamp(0.01, 0.99);
        self
    }

    /// Set the number of random suggestions before the model is used
    pub fn with_startup(mut self, n: usize) -> Self {
        self.n_startup = n;
        self
    }

    /// Candidates drawn per continuous dimension
    pub fn with_candidates(mut self, n: usize) -> Self {
        self.n_candidates = n.max(1);
        self
    }

    /// Seed the sampler for reproducible suggestions
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Number of usable observations
    pub fn n_observed(&self) -> usize {
        self.history.len()
    }

    /// Lowest score observed so far
    pub fn best_score(&self) -> Option<f64> {
        self.history.iter().map(|o| o.score).min_by(f64::total_cmp)
    }

    fn propose(&mut self) -> Result<Sample> {
        // The model needs at least one good and one bad observation
        if self.history.len() < self.n_startup.max(2) {
            return Ok(self.space.sample_random(&mut self.rng));
        }

        let mut ranked: Vec<&Observation> = self.history.iter().collect();
        ranked.sort_by(|a, b| a.score.total_cmp(&b.score));
        let n_good = ((ranked.len() as f64 * self.gamma).ceil() as usize).clamp(1, ranked.len() - 1);
        let (good, bad) = ranked.split_at(n_good);

        let mut point = Vec::with_capacity(self.space.len());
        for (dim, (_, domain)) in self.space.iter().enumerate() {
            let good_x: Vec<f64> = good.iter().map(|o| o.point[dim]).collect();
            let bad_x: Vec<f64> = bad.iter().map(|o| o.point[dim]).collect();
            let (low, high) = domain.bounds();
            let x = match cell_count(domain) {
                Some(n_cells) => propose_cell(&good_x, &bad_x, low, n_cells, &mut self.rng),
                None => propose_continuous(&good_x, &bad_x, (low, high), self.n_candidates, &mut self.rng),
            };
            point.push(x);
        }
        self.space.unwarp(&point)
    }
}

fn cell_count(domain: &ParameterDomain) -> Option<usize> {
    match domain {
        ParameterDomain::Continuous { .. } => None,
        ParameterDomain::Discrete { low, high } => high
            .checked_sub(*low)
            .and_then(|span| usize::try_from(span).ok())
            .map(|span| span + 1)
            .filter(|&n| n <= MAX_CELLS),
        ParameterDomain::Categorical { choices } => Some(choices.len()),
    }
}

impl SurrogateOptimizer for TPEOptimizer {
    fn suggest(&mut self, n: usize) -> Result<Vec<Sample>> {
        self.space.validate_domains()?;
        (0..n).map(|_| self.propose()).collect()
    }

    /// Non-finite scores and samples outside the space are skipped.
    fn observe(&mut self, samples: &[Sample], scores: &[f64]) {
        for (sample, &score) in samples.iter().zip(scores) {
            if !score.is_finite() {
                log::debug!("TPE: skipping observation with score {score}");
                continue;
            }
            match self.space.warp(sample) {
                Ok(point) => self.history.push(Observation { point, score }),
                Err(e) => log::warn!("TPE: skipping observation: {e}"),
            }
        }
    }
}
