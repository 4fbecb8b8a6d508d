//! Ajustar: hyperparameter optimization for declarative model definitions
//!
//! A model definition (input and output features, combiner, training and
//! preprocessing sections) carries a `hyperopt` section naming the parameters
//! to search, the metric to optimize and how to search. Ajustar samples
//! assignments with a search strategy, substitutes them into copies of the
//! definition, runs each copy through a caller-supplied trial runner and
//! returns the trials ranked by score.
//!
//! # Modules
//!
//! - [`config`]: model definitions, run options, YAML loading and validation
//! - [`optim::hpo`]: search spaces, strategies, executors and the registry
//! - [`hyperopt()`]: the end-to-end driver used by the CLI
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ajustar::config::{load_config, DataReferences, RunOptions};
//! use ajustar::optim::hpo::{CommandRunner, TrialRunner};
//!
//! let definition = load_config("intent.yaml")?;
//! let runner: Arc<dyn TrialRunner> = Arc::new(CommandRunner::new("./train.sh"));
//! let outcome = ajustar::hyperopt(
//!     runner,
//!     &definition,
//!     &DataReferences::default(),
//!     &RunOptions::default(),
//! )?;
//! println!("{}", ajustar::format_hyperopt_results(&outcome));
//! # Ok::<(), ajustar::Error>(())
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod hyperopt;
pub mod optim;

pub use error::{Error, Result};
pub use hyperopt::{format_hyperopt_results, hyperopt, hyperopt_from_yaml, HyperoptOutcome};
