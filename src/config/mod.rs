//! Declarative configuration: YAML model definitions and the CLI
//!
//! A model definition declares its features, combiner, training and
//! preprocessing sections plus an optional `hyperopt` section:
//!
//! ```yaml
//! hyperopt:
//!   goal: maximize
//!   metric: accuracy
//!   output_feature: intent
//!   parameters:
//!     combiner.num_fc_layers: [1, 2, 3]
//!     training.learning_rate: {type: float, low: 0.0001, high: 0.1, log_scale: true}
//!   strategy: {type: random, num_samples: 12}
//!   executor: {type: parallel, num_workers: 4}
//! ```

mod cli;
mod loader;
mod schema;
mod validate;

pub use cli::{apply_overrides, parse_args, Cli, Command, HyperoptArgs, ValidateArgs};
pub use loader::{load_config, parse_config};
pub use schema::{
    feature_name, ComponentSpec, DataReferences, HyperoptSpec, ModelDefinition, RunOptions,
    Section, Split,
};
pub use validate::{validate_definition, validate_hyperopt, COMBINED};
