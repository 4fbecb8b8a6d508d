//! Sequential executor

use std::sync::Arc;

use crate::config::{DataReferences, ModelDefinition, RunOptions, Split};
use crate::optim::hpo::error::Result;
use crate::optim::hpo::runner::{MetricSelector, TrialRunner};
use crate::optim::hpo::strategy::Strategy;
use crate::optim::hpo::types::TrialResult;

use super::{run_batches, Executor, TrialTemplate};

/// Runs trials one after another on the calling thread.
pub struct SerialExecutor {
    strategy: Box<dyn Strategy>,
    selector: MetricSelector,
    split: Split,
    batch_size: usize,
}

impl SerialExecutor {
    pub fn new(strategy: Box<dyn Strategy>, selector: MetricSelector, split: Split) -> Self {
        Self {
            strategy,
            selector,
            split,
            batch_size: 1,
        }
    }

    /// Samples drawn per strategy round (default 1)
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}

impl Executor for SerialExecutor {
    fn execute(
        &mut self,
        runner: Arc<dyn TrialRunner>,
        definition: &ModelDefinition,
        data: &DataReferences,
        options: &RunOptions,
    ) -> Result<Vec<TrialResult>> {
        let template = TrialTemplate {
            definition,
            data,
            options,
            split: self.split,
        };
        run_batches(
            self.strategy.as_mut(),
            self.batch_size,
            &template,
            &self.selector,
            |requests| {
                requests
                    .iter()
                    .map(|request| runner.train_and_eval(request))
                    .collect()
            },
        )
    }
}
