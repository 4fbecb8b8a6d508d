//! Executors: run strategy batches through a trial runner and rank the results
//!
//! - **SerialExecutor**: one trial at a time on the calling thread
//! - **ParallelExecutor**: persistent worker pool with device-token scheduling
//! - **DistributedExecutor**: batches mapped over a [`WorkerPool`] backend
//!
//! Every variant drives the same loop: sample a batch, substitute each sample
//! into a fresh copy of the definition, run the batch, score each trial, feed
//! the scores back in submission order, repeat until the strategy is finished.

mod devices;
mod distributed;
mod parallel;
mod serial;

pub use devices::{DevicePlan, DeviceToken, TokenPool};
pub use distributed::{
    init_backend, DistributedExecutor, LocalPool, ResourceRequest, TrialTask, WorkerPool, BACKENDS,
};
pub use parallel::ParallelExecutor;
pub use serial::SerialExecutor;

use std::sync::Arc;

use crate::config::{DataReferences, ModelDefinition, RunOptions, Split};

use super::error::{HPOError, Result};
use super::runner::{MetricSelector, TrialRequest, TrialRunner, TrialStats};
use super::strategy::Strategy;
use super::substitute::substitute_parameters;
use super::types::{Sample, TrialResult};

/// Execution backend for a hyperparameter search
pub trait Executor {
    /// Run the search to completion and return the results best-first.
    ///
    /// `definition` is never modified; each trial receives its own copy.
    fn execute(
        &mut self,
        runner: Arc<dyn TrialRunner>,
        definition: &ModelDefinition,
        data: &DataReferences,
        options: &RunOptions,
    ) -> Result<Vec<TrialResult>>;
}

/// Logical CPUs visible to this process
pub(crate) fn available_cpus() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZero::get)
        .unwrap_or(1)
}

/// Shared inputs of every trial in one `execute()` call
pub(crate) struct TrialTemplate<'a> {
    pub definition: &'a ModelDefinition,
    pub data: &'a DataReferences,
    pub options: &'a RunOptions,
    pub split: Split,
}

impl TrialTemplate<'_> {
    fn request(&self, trial_id: usize, parameters: Sample) -> TrialRequest {
        TrialRequest {
            trial_id,
            model_definition: substitute_parameters(self.definition, &parameters),
            parameters,
            eval_split: self.split,
            data: self.data.clone(),
            options: self.options.clone(),
        }
    }
}

/// The batch-then-update loop shared by all executors.
///
/// `dispatch` runs one batch and returns one outcome per request, in
/// submission order. Any failed trial aborts the search.
pub(crate) fn run_batches<F>(
    strategy: &mut dyn Strategy,
    batch_size: usize,
    template: &TrialTemplate<'_>,
    selector: &MetricSelector,
    mut dispatch: F,
) -> Result<Vec<TrialResult>>
where
    F: FnMut(&[TrialRequest]) -> Vec<Result<TrialStats>>,
{
    let mut results: Vec<TrialResult> = Vec::new();
    let mut next_id = 0;

    while !strategy.finished() {
        let samples = match strategy.sample_batch(batch_size) {
            Ok(samples) if samples.is_empty() => break,
            Ok(samples) => samples,
            Err(HPOError::Exhausted) => break,
            Err(e) => return Err(e),
        };

        let first_id = next_id;
        let requests: Vec<TrialRequest> = samples
            .into_iter()
            .enumerate()
            .map(|(offset, sample)| template.request(first_id + offset, sample))
            .collect();
        next_id += requests.len();

        log::info!(
            "Running trials {first_id}..{next_id} ({} completed so far)",
            results.len()
        );

        let outcomes = dispatch(&requests);
        if outcomes.len() != requests.len() {
            return Err(HPOError::Internal(format!(
                "dispatched {} trials but received {} outcomes",
                requests.len(),
                outcomes.len()
            )));
        }

        let mut scored = Vec::with_capacity(requests.len());
        for (request, outcome) in requests.into_iter().zip(outcomes) {
            let trial_id = request.trial_id;
            let stats = outcome.map_err(|e| HPOError::trial_failed(trial_id, e))?;
            let metric_score = selector
                .score(&stats.evaluation)
                .map_err(|e| HPOError::trial_failed(trial_id, e))?;
            log::info!(
                "Trial {trial_id}: {}.{} = {metric_score}",
                selector.output_feature,
                selector.metric
            );

            scored.push((request.parameters.clone(), metric_score));
            results.push(TrialResult {
                parameters: request.parameters,
                metric_score,
                training_stats: stats.training,
                eval_stats: stats.evaluation,
            });
        }

        strategy.update_batch(&scored);
    }

    strategy.goal().rank(&mut results);
    Ok(results)
}
