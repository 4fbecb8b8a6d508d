//! Worker-pool executor with device-token scheduling

use rayon::prelude::*;
use std::sync::Arc;

use crate::config::{DataReferences, ModelDefinition, RunOptions, Split};
use crate::optim::hpo::error::{HPOError, Result};
use crate::optim::hpo::runner::{MetricSelector, TrialRequest, TrialRunner, TrialStats};
use crate::optim::hpo::strategy::Strategy;
use crate::optim::hpo::types::TrialResult;

use super::devices::{DevicePlan, TokenPool};
use super::{available_cpus, run_batches, Executor, TrialTemplate};

/// Runs each batch on a fixed pool of `num_workers` threads.
///
/// When `gpus` is set in the run options, every trial first reserves a device
/// token (see [`DevicePlan`]) and runs with `gpus` narrowed to that device.
/// The token is returned when the trial ends, whether it succeeded, failed or
/// panicked.
pub struct ParallelExecutor {
    strategy: Box<dyn Strategy>,
    selector: MetricSelector,
    split: Split,
    num_workers: usize,
    epsilon: f64,
    batch_size: usize,
    tokens: Option<Arc<TokenPool>>,
}

impl ParallelExecutor {
    /// Pool of `num_workers` threads; batches default to one trial per worker
    pub fn new(
        strategy: Box<dyn Strategy>,
        selector: MetricSelector,
        split: Split,
        num_workers: usize,
    ) -> Self {
        let num_workers = num_workers.max(1);
        Self {
            strategy,
            selector,
            split,
            num_workers,
            epsilon: 0.01,
            batch_size: num_workers,
            tokens: None,
        }
    }

    /// Margin subtracted from the per-worker device share
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Device tokens of the last run that had `gpus` set
    pub fn device_tokens(&self) -> Option<&TokenPool> {
        self.tokens.as_deref()
    }
}

/// Run one trial, holding a device token for its whole duration
fn run_on_device(
    runner: &dyn TrialRunner,
    tokens: Option<&TokenPool>,
    request: &TrialRequest,
) -> Result<TrialStats> {
    match tokens {
        None => runner.train_and_eval(request),
        Some(pool) => {
            let token = pool.acquire();
            log::debug!("Trial {} reserved device {}", request.trial_id, token.device());
            let mut request = request.clone();
            request.options.gpus = Some(token.device().to_string());
            runner.train_and_eval(&request)
        }
    }
}

impl Executor for ParallelExecutor {
    fn execute(
        &mut self,
        runner: Arc<dyn TrialRunner>,
        definition: &ModelDefinition,
        data: &DataReferences,
        options: &RunOptions,
    ) -> Result<Vec<TrialResult>> {
        let cpus = available_cpus();
        if self.num_workers > cpus {
            log::warn!(
                "num_workers ({}) exceeds the {cpus} available CPUs; setting it to at most {cpus} is suggested",
                self.num_workers
            );
        }

        let mut options = options.clone();
        self.tokens = match options.gpus.as_deref() {
            Some(gpus) => {
                let plan = DevicePlan::new(gpus, self.num_workers, self.epsilon, options.gpu_fraction)?;
                log::info!(
                    "Scheduling {} workers on {} devices, {} trials per device",
                    self.num_workers,
                    plan.device_ids.len(),
                    plan.processes_per_device
                );
                options.gpu_fraction = plan.gpu_fraction;
                Some(Arc::new(plan.token_pool()))
            }
            None => None,
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.num_workers)
            .thread_name(|i| format!("hyperopt-worker-{i}"))
            .build()
            .map_err(|e| HPOError::Internal(format!("failed to start worker pool: {e}")))?;

        let template = TrialTemplate {
            definition,
            data,
            options: &options,
            split: self.split,
        };
        let tokens = self.tokens.clone();
        run_batches(
            self.strategy.as_mut(),
            self.batch_size,
            &template,
            &self.selector,
            |requests| {
                pool.install(|| {
                    requests
                        .par_iter()
                        .map(|request| run_on_device(runner.as_ref(), tokens.as_deref(), request))
                        .collect()
                })
            },
        )
    }
}
