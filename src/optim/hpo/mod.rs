//! Hyperparameter optimization over model definitions
//!
//! A search is a [`Strategy`] (which parameters to try next) driven by an
//! [`Executor`] (where trials run). For every sampled assignment the executor
//! substitutes the values into a copy of the model definition, hands it to a
//! [`TrialRunner`], reads one metric from the evaluation statistics and feeds
//! it back to the strategy. Results come back ranked by the [`Goal`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ajustar::config::{DataReferences, ModelDefinition, RunOptions, Split};
//! use ajustar::optim::hpo::{
//!     Executor, Goal, HyperparameterSpace, MetricSelector, ParameterDomain, RandomStrategy,
//!     Result, SerialExecutor, TrialRequest, TrialRunner, TrialStats,
//! };
//!
//! let space = HyperparameterSpace::new()
//!     .with("training.learning_rate", ParameterDomain::Continuous {
//!         low: 1e-5, high: 1e-1, log_scale: true,
//!     })
//!     .with("combiner.num_fc_layers", ParameterDomain::Discrete { low: 1, high: 4 });
//!
//! let strategy = RandomStrategy::new(Goal::Minimize, &space, 20, 42)?;
//! let mut executor = SerialExecutor::new(
//!     Box::new(strategy),
//!     MetricSelector::new("combined", "loss"),
//!     Split::Validation,
//! );
//!
//! let runner: Arc<dyn TrialRunner> = Arc::new(|_req: &TrialRequest| -> Result<TrialStats> {
//!     Ok(TrialStats::new(serde_json::Value::Null, serde_json::json!({"combined": {"loss": 0.1}})))
//! });
//! let results = executor.execute(
//!     runner,
//!     &ModelDefinition::default(),
//!     &DataReferences::default(),
//!     &RunOptions::default(),
//! )?;
//! println!("best: {:?}", results.first());
//! # Ok::<(), ajustar::optim::hpo::HPOError>(())
//! ```
//!
//! # References
//!
//! \[1\] Bergstra et al. (2011) - Algorithms for Hyper-Parameter Optimization (TPE)
//! \[2\] McKay et al. (1979) - Latin hypercube sampling

mod error;
pub mod executor;
pub mod registry;
mod runner;
pub mod strategy;
mod substitute;
mod tpe;
mod types;

pub use error::{HPOError, Result};
pub use executor::{
    init_backend, DevicePlan, DistributedExecutor, Executor, LocalPool, ParallelExecutor,
    ResourceRequest, SerialExecutor, TokenPool, TrialTask, WorkerPool,
};
pub use registry::{build_executor, build_strategy, resolve_defaults};
pub use runner::{CommandRunner, MetricSelector, TrialRequest, TrialRunner, TrialStats};
pub use strategy::{
    BayesianStrategy, GridStrategy, RandomStrategy, Sampling, Strategy, SurrogateOptimizer,
};
pub use substitute::{apply_parameters, parse_parameters, substitute_parameters};
pub use tpe::TPEOptimizer;
pub use types::{
    Goal, HyperparameterSpace, ParameterDomain, ParameterValue, Sample, TrialResult,
};
