//! Crate-level error type

use thiserror::Error;

use crate::optim::hpo::HPOError;

/// Result type for configuration loading and the hyperopt driver
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised outside the optimizer core
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Hpo(#[from] HPOError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hpo_error_is_transparent() {
        let err: Error = HPOError::EmptySpace.into();
        assert_eq!(err.to_string(), "Empty search space");
        assert!(matches!(err, Error::Hpo(HPOError::EmptySpace)));
    }

    #[test]
    fn test_config_error_display() {
        let err = Error::ConfigError("missing hyperopt section".to_string());
        assert!(err.to_string().contains("missing hyperopt section"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
