//! Hyperopt configuration validation
//!
//! Runs before any trial so that a bad configuration fails fast.

use super::schema::{feature_name, HyperoptSpec, ModelDefinition};
use crate::optim::hpo::registry::{executor_entry, strategy_entry, DEFAULT_EXECUTOR, DEFAULT_STRATEGY};
use crate::optim::hpo::{HPOError, Result};

/// Output feature name meaning "all output features together"
pub const COMBINED: &str = "combined";

/// Validate a hyperopt section
///
/// Checks:
/// - The search space is non-empty and every domain is well formed
/// - Strategy and executor names are registered
/// - Variant parameters are known and in range
/// - `metric` and `output_feature` are set
pub fn validate_hyperopt(spec: &HyperoptSpec) -> Result<()> {
    spec.parameters.validate_domains()?;

    let strategy = strategy_entry(spec.strategy.kind.as_deref().unwrap_or(DEFAULT_STRATEGY))?;
    (strategy.validate)(&spec.strategy.params)?;

    let executor = executor_entry(spec.executor.kind.as_deref().unwrap_or(DEFAULT_EXECUTOR))?;
    (executor.validate)(&spec.executor.params)?;

    if spec.metric.trim().is_empty() {
        return Err(HPOError::InvalidConfig("metric must not be empty".to_string()));
    }
    if spec.output_feature.trim().is_empty() {
        return Err(HPOError::InvalidConfig("output_feature must not be empty".to_string()));
    }
    Ok(())
}

/// Validate a model definition's hyperopt section against the definition itself.
///
/// Besides [`validate_hyperopt`], the scored output feature must be
/// `combined` or one of the declared output features.
pub fn validate_definition(definition: &ModelDefinition) -> Result<&HyperoptSpec> {
    let spec = definition
        .hyperopt
        .as_ref()
        .ok_or_else(|| HPOError::InvalidConfig("model definition has no hyperopt section".to_string()))?;
    validate_hyperopt(spec)?;

    let declared = definition.output_features.iter().filter_map(feature_name);
    if spec.output_feature != COMBINED && !declared.clone().any(|name| name == spec.output_feature) {
        return Err(HPOError::InvalidConfig(format!(
            "output_feature '{}' is not an output feature (declared: {})",
            spec.output_feature,
            declared.collect::<Vec<_>>().join(", ")
        )));
    }
    Ok(spec)
}
