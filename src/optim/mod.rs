//! Optimization of model definitions

pub mod hpo;

pub use hpo::{
    Executor, Goal, HPOError, HyperparameterSpace, ParameterDomain, ParameterValue, Sample,
    Strategy, TrialResult, TrialRunner,
};
