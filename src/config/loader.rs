//! Load model definitions from YAML

use std::fs;
use std::path::Path;

use super::schema::ModelDefinition;
use crate::error::{Error, Result};

/// Read and parse a model definition file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ModelDefinition> {
    let path = path.as_ref();
    let yaml = fs::read_to_string(path).map_err(|e| {
        Error::ConfigError(format!("Failed to read config file {}: {e}", path.display()))
    })?;
    parse_config(&yaml)
        .map_err(|e| Error::ConfigError(format!("Failed to parse {}: {e}", path.display())))
}

/// Parse a model definition from YAML text
pub fn parse_config(yaml: &str) -> Result<ModelDefinition> {
    Ok(serde_yaml::from_str(yaml)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CONFIG: &str = r#"
input_features:
  - name: utterance
    type: text
output_features:
  - name: intent
    type: category
combiner:
  num_fc_layers: 1
hyperopt:
  goal: maximize
  metric: accuracy
  output_feature: intent
  parameters:
    combiner.num_fc_layers: [1, 2, 3]
"#;

    #[test]
    fn test_load_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();
        let def = load_config(file.path()).unwrap();
        assert_eq!(def.output_features.len(), 1);
        let hyperopt = def.hyperopt.unwrap();
        assert_eq!(hyperopt.metric, "accuracy");
        assert_eq!(hyperopt.parameters.len(), 1);
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config("/nonexistent/ajustar.yaml").unwrap_err();
        assert!(matches!(err, Error::ConfigError(ref msg) if msg.contains("/nonexistent/ajustar.yaml")));
    }

    #[test]
    fn test_load_config_bad_yaml() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"combiner: [unclosed").unwrap();
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, Error::ConfigError(ref msg) if msg.contains("Failed to parse")));
    }

    #[test]
    fn test_parse_config_rejects_bad_domain() {
        let yaml = "hyperopt:\n  parameters:\n    training.dropout:\n      type: gaussian\n";
        assert!(matches!(parse_config(yaml), Err(Error::Yaml(_))));
    }
}
