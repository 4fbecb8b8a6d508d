//! Exhaustive grid strategy

use crate::optim::hpo::error::{HPOError, Result};
use crate::optim::hpo::types::{Goal, HyperparameterSpace, ParameterDomain, Sample};

use super::Strategy;

/// One grid dimension: its domain and how many values it contributes
#[derive(Debug, Clone)]
struct Axis {
    name: String,
    domain: ParameterDomain,
    len: usize,
}

/// Walks the cartesian product of the space in a fixed order.
///
/// Points are decoded from a running index, so neither the grid nor any
/// single axis is materialized. The first parameter in name order varies
/// slowest.
#[derive(Debug, Clone)]
pub struct GridStrategy {
    goal: Goal,
    axes: Vec<Axis>,
    n_points: usize,
    len: usize,
    next_idx: usize,
}

impl GridStrategy {
    /// Enumerate the grid, using `n_points` values per continuous parameter
    pub fn new(goal: Goal, space: HyperparameterSpace, n_points: usize) -> Result<Self> {
        space.validate_domains()?;
        let too_large = || HPOError::InvalidConfig("grid has too many points".to_string());

        let mut axes = Vec::with_capacity(space.len());
        let mut len = 1usize;
        for (name, domain) in space.iter() {
            let axis_len = domain.grid_len(n_points).ok_or_else(too_large)?;
            len = len.checked_mul(axis_len).ok_or_else(too_large)?;
            axes.push(Axis {
                name: name.clone(),
                domain: domain.clone(),
                len: axis_len,
            });
        }
        Ok(Self { goal, axes, n_points, len, next_idx: 0 })
    }

    /// Number of grid points
    pub fn len(&self) -> usize {
        self.len
    }

    /// True for a grid with no points
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn point(&self, mut idx: usize) -> Sample {
        let mut sample = Sample::new();
        for axis in self.axes.iter().rev() {
            sample.insert(axis.name.clone(), axis.domain.grid_value(idx % axis.len, self.n_points));
            idx /= axis.len;
        }
        sample
    }
}

impl Strategy for GridStrategy {
    fn goal(&self) -> Goal {
        self.goal
    }

    fn sample(&mut self) -> Result<Sample> {
        if self.finished() {
            return Err(HPOError::Exhausted);
        }
        let sample = self.point(self.next_idx);
        self.next_idx += 1;
        Ok(sample)
    }

    fn update(&mut self, _sample: &Sample, _metric_score: f64) {}

    fn finished(&self) -> bool {
        self.next_idx >= self.len
    }
}
