//! HPO error types

use thiserror::Error;

/// HPO errors
#[derive(Debug, Error)]
pub enum HPOError {
    #[error("Empty search space")]
    EmptySpace,

    #[error("Parameter not found: {0}")]
    ParameterNotFound(String),

    #[error("Invalid parameter value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Sample vector has {got} dimensions, search space has {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    /// The strategy has no samples left. Expected at the end of every run.
    #[error("Strategy exhausted its sampling budget")]
    Exhausted,

    #[error("{kind} '{name}' is not registered, valid choices are: {choices}")]
    NotRegistered {
        kind: &'static str,
        name: String,
        choices: String,
    },

    #[error("Invalid hyperopt configuration: {0}")]
    InvalidConfig(String),

    #[error("Metric '{metric}' not found for output feature '{output_feature}'")]
    MetricNotFound {
        output_feature: String,
        metric: String,
    },

    #[error("Trial {trial_id} failed: {source}")]
    TrialFailed {
        trial_id: usize,
        #[source]
        source: Box<HPOError>,
    },

    #[error("Trial runner error: {0}")]
    Runner(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HPO error: {0}")]
    Internal(String),
}

impl HPOError {
    /// Whether this is the expected end-of-budget signal rather than a failure
    pub fn is_exhausted(&self) -> bool {
        matches!(self, HPOError::Exhausted)
    }

    /// Wrap an error raised while running a trial
    pub fn trial_failed(trial_id: usize, source: HPOError) -> Self {
        HPOError::TrialFailed {
            trial_id,
            source: Box::new(source),
        }
    }
}

/// Result type for HPO operations
pub type Result<T> = std::result::Result<T, HPOError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hpo_error_display() {
        let err = HPOError::EmptySpace;
        assert!(format!("{}", err).contains("Empty search space"));

        let err = HPOError::ParameterNotFound("lr".to_string());
        assert!(format!("{}", err).contains("Parameter not found"));
        assert!(format!("{}", err).contains("lr"));

        let err = HPOError::InvalidValue("lr".to_string(), "invalid".to_string());
        assert!(format!("{}", err).contains("Invalid parameter value"));

        let err = HPOError::Internal("test error".to_string());
        assert!(format!("{}", err).contains("HPO error"));
    }

    #[test]
    fn test_not_registered_lists_choices() {
        let err = HPOError::NotRegistered {
            kind: "strategy",
            name: "annealing".to_string(),
            choices: "random, grid, bayesian".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("annealing"));
        assert!(msg.contains("random, grid, bayesian"));
    }

    #[test]
    fn test_exhausted_is_distinguished() {
        assert!(HPOError::Exhausted.is_exhausted());
        assert!(!HPOError::EmptySpace.is_exhausted());
        assert!(!HPOError::trial_failed(0, HPOError::Exhausted).is_exhausted());
    }

    #[test]
    fn test_trial_failed_keeps_source() {
        let err = HPOError::trial_failed(3, HPOError::Runner("exit status 1".to_string()));
        let msg = err.to_string();
        assert!(msg.contains("Trial 3"));
        assert!(msg.contains("exit status 1"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
