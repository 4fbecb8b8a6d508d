//! Distributed executor over a pluggable worker-pool backend

use rayon::prelude::*;
use std::fmt;
use std::sync::Arc;

use crate::config::{DataReferences, ModelDefinition, RunOptions, Split};
use crate::optim::hpo::error::{HPOError, Result};
use crate::optim::hpo::runner::{MetricSelector, TrialRequest, TrialRunner, TrialStats};
use crate::optim::hpo::strategy::Strategy;
use crate::optim::hpo::types::TrialResult;

use super::devices::TokenPool;
use super::{available_cpus, run_batches, Executor, TrialTemplate};

/// Backends accepted by [`init_backend`]
pub const BACKENDS: &[&str] = &["local"];

/// Resources one trial asks its worker for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceRequest {
    pub cpu: Option<usize>,
    pub gpu: Option<usize>,
}

impl ResourceRequest {
    pub fn is_empty(&self) -> bool {
        self.cpu.is_none() && self.gpu.is_none()
    }
}

/// The function a worker pool maps over trial requests
#[derive(Clone)]
pub struct TrialTask {
    runner: Arc<dyn TrialRunner>,
    resources: Option<ResourceRequest>,
}

impl TrialTask {
    pub fn new(runner: Arc<dyn TrialRunner>) -> Self {
        Self {
            runner,
            resources: None,
        }
    }

    /// Annotate the task with per-trial resource needs
    pub fn with_resources(mut self, resources: ResourceRequest) -> Self {
        self.resources = Some(resources);
        self
    }

    pub fn resources(&self) -> Option<ResourceRequest> {
        self.resources
    }

    pub fn run(&self, request: &TrialRequest) -> Result<TrialStats> {
        self.runner.train_and_eval(request)
    }
}

impl fmt::Debug for TrialTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrialTask")
            .field("resources", &self.resources)
            .finish_non_exhaustive()
    }
}

/// A pool of workers that can run trial tasks.
///
/// `map` returns one outcome per request, in request order.
pub trait WorkerPool: Send {
    fn num_workers(&self) -> usize;

    fn map(&self, task: &TrialTask, requests: &[TrialRequest]) -> Vec<Result<TrialStats>>;
}

/// In-process backend running tasks on a thread pool
pub struct LocalPool {
    pool: rayon::ThreadPool,
    num_workers: usize,
}

impl LocalPool {
    pub fn new(num_workers: usize) -> Result<Self> {
        let num_workers = num_workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_workers)
            .thread_name(|i| format!("hyperopt-local-{i}"))
            .build()
            .map_err(|e| HPOError::Internal(format!("failed to start local pool: {e}")))?;
        Ok(Self { pool, num_workers })
    }

    /// Concurrent trials allowed for `task`: bounded by the CPUs it declares
    pub fn concurrency(&self, task: &TrialTask) -> usize {
        match task.resources().and_then(|r| r.cpu) {
            Some(cpu) if cpu > 0 => (available_cpus() / cpu).clamp(1, self.num_workers),
            _ => self.num_workers,
        }
    }
}

impl WorkerPool for LocalPool {
    fn num_workers(&self) -> usize {
        self.num_workers
    }

    fn map(&self, task: &TrialTask, requests: &[TrialRequest]) -> Vec<Result<TrialStats>> {
        let slots = TokenPool::new((0..self.concurrency(task)).map(|slot| slot.to_string()));
        self.pool.install(|| {
            requests
                .par_iter()
                .map(|request| {
                    let _slot = slots.acquire();
                    task.run(request)
                })
                .collect()
        })
    }
}

/// Start a worker pool for `backend`
pub fn init_backend(backend: &str, num_workers: usize) -> Result<Box<dyn WorkerPool>> {
    match backend {
        "local" => Ok(Box::new(LocalPool::new(num_workers)?)),
        other => Err(HPOError::NotRegistered {
            kind: "backend",
            name: other.to_string(),
            choices: BACKENDS.join(", "),
        }),
    }
}

/// Delegates every batch to a [`WorkerPool`] and joins it before updating.
pub struct DistributedExecutor {
    strategy: Box<dyn Strategy>,
    selector: MetricSelector,
    split: Split,
    resources: ResourceRequest,
    batch_size: usize,
    pool: Box<dyn WorkerPool>,
}

impl DistributedExecutor {
    /// Start `backend` with `num_workers` workers
    pub fn new(
        strategy: Box<dyn Strategy>,
        selector: MetricSelector,
        split: Split,
        backend: &str,
        num_workers: usize,
    ) -> Result<Self> {
        let pool = init_backend(backend, num_workers)?;
        Ok(Self::with_pool(strategy, selector, split, pool))
    }

    /// Use an already running pool
    pub fn with_pool(
        strategy: Box<dyn Strategy>,
        selector: MetricSelector,
        split: Split,
        pool: Box<dyn WorkerPool>,
    ) -> Self {
        let batch_size = pool.num_workers().max(1);
        Self {
            strategy,
            selector,
            split,
            resources: ResourceRequest::default(),
            batch_size,
            pool,
        }
    }

    /// Per-trial resource needs forwarded to the pool
    pub fn with_resources(mut self, resources: ResourceRequest) -> Self {
        self.resources = resources;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}

impl Executor for DistributedExecutor {
    fn execute(
        &mut self,
        runner: Arc<dyn TrialRunner>,
        definition: &ModelDefinition,
        data: &DataReferences,
        options: &RunOptions,
    ) -> Result<Vec<TrialResult>> {
        let mut task = TrialTask::new(runner);
        if !self.resources.is_empty() {
            log::debug!("Annotating trials with {:?}", self.resources);
            task = task.with_resources(self.resources);
        }

        let template = TrialTemplate {
            definition,
            data,
            options,
            split: self.split,
        };
        let pool = self.pool.as_ref();
        run_batches(
            self.strategy.as_mut(),
            self.batch_size,
            &template,
            &self.selector,
            |requests| pool.map(&task, requests),
        )
    }
}
