//! YAML schema definitions for model definitions and their hyperopt section

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;

use crate::optim::hpo::{Goal, HyperparameterSpace};

/// One section of a model definition (`combiner`, `training`, a feature, ...).
///
/// Sections are opaque to the optimizer apart from the keys it substitutes.
pub type Section = Map<String, Value>;

/// Deserialize a bool from either a YAML boolean (`true`) or a quoted string (`"true"`).
fn deserialize_bool_lenient<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        Str(String),
    }

    match BoolOrString::deserialize(deserializer)? {
        BoolOrString::Bool(b) => Ok(b),
        BoolOrString::Str(s) => match s.to_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "expected 'true' or 'false', got '{other}'"
            ))),
        },
    }
}

/// Complete model definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelDefinition {
    /// Input features, each carrying a `name`
    #[serde(default)]
    pub input_features: Vec<Section>,

    /// Output features, each carrying a `name`
    #[serde(default)]
    pub output_features: Vec<Section>,

    #[serde(default)]
    pub combiner: Section,

    #[serde(default)]
    pub training: Section,

    #[serde(default)]
    pub preprocessing: Section,

    /// Hyperparameter optimization settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hyperopt: Option<HyperoptSpec>,
}

impl ModelDefinition {
    /// Names of the input and output features, in declaration order
    pub fn feature_names(&self) -> impl Iterator<Item = &str> {
        self.input_features
            .iter()
            .chain(&self.output_features)
            .filter_map(feature_name)
    }

    /// The same definition with its hyperopt section removed
    pub fn without_hyperopt(&self) -> Self {
        Self {
            hyperopt: None,
            ..self.clone()
        }
    }
}

/// The `name` of a feature section, if it has one
pub fn feature_name(feature: &Section) -> Option<&str> {
    feature.get("name").and_then(Value::as_str)
}

/// Dataset split a trial is scored on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Training,
    #[default]
    Validation,
    Test,
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Split::Training => "training",
            Split::Validation => "validation",
            Split::Test => "test",
        };
        f.write_str(name)
    }
}

/// `hyperopt` section of a model definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyperoptSpec {
    /// Dotted parameter name -> domain
    #[serde(default)]
    pub parameters: HyperparameterSpace,

    #[serde(default)]
    pub goal: Goal,

    /// Metric read from the evaluation statistics
    #[serde(default = "default_metric")]
    pub metric: String,

    /// Output feature the metric is read from
    #[serde(default = "default_output_feature")]
    pub output_feature: String,

    #[serde(default)]
    pub split: Split,

    #[serde(default)]
    pub strategy: ComponentSpec,

    #[serde(default)]
    pub executor: ComponentSpec,
}

impl Default for HyperoptSpec {
    fn default() -> Self {
        Self {
            parameters: HyperparameterSpace::new(),
            goal: Goal::default(),
            metric: default_metric(),
            output_feature: default_output_feature(),
            split: Split::default(),
            strategy: ComponentSpec::default(),
            executor: ComponentSpec::default(),
        }
    }
}

fn default_metric() -> String {
    "loss".to_string()
}

fn default_output_feature() -> String {
    "combined".to_string()
}

/// A registry selection: `type` plus the variant's own parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentSpec {
    /// Registered name; filled with the default when resolving
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Variant parameters
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl ComponentSpec {
    /// Select `kind` with no explicit parameters
    pub fn named(kind: &str) -> Self {
        Self {
            kind: Some(kind.to_string()),
            params: Map::new(),
        }
    }

    /// Builder-style parameter setter
    pub fn with_param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }
}

/// Where the training data lives
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataReferences {
    /// Single dataset, split by the trainer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training_set: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_set: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_set: Option<PathBuf>,

    /// Metadata computed on the training set by an earlier run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training_set_metadata: Option<PathBuf>,
}

/// Options forwarded to every trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    pub experiment_name: String,
    pub model_name: String,
    pub output_directory: PathBuf,

    #[serde(deserialize_with = "deserialize_bool_lenient")]
    pub skip_save_training_description: bool,
    #[serde(deserialize_with = "deserialize_bool_lenient")]
    pub skip_save_training_statistics: bool,
    #[serde(deserialize_with = "deserialize_bool_lenient")]
    pub skip_save_model: bool,
    #[serde(deserialize_with = "deserialize_bool_lenient")]
    pub skip_save_progress: bool,
    #[serde(deserialize_with = "deserialize_bool_lenient")]
    pub skip_save_log: bool,
    #[serde(deserialize_with = "deserialize_bool_lenient")]
    pub skip_save_processed_input: bool,
    #[serde(deserialize_with = "deserialize_bool_lenient")]
    pub skip_save_unprocessed_output: bool,
    #[serde(deserialize_with = "deserialize_bool_lenient")]
    pub skip_save_test_predictions: bool,
    #[serde(deserialize_with = "deserialize_bool_lenient")]
    pub skip_save_test_statistics: bool,
    #[serde(deserialize_with = "deserialize_bool_lenient")]
    pub skip_save_hyperopt_statistics: bool,

    /// Comma-separated device ids, e.g. `"0,1"`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpus: Option<String>,

    /// Share of one device each trial may use, in (0, 1]
    pub gpu_fraction: f64,

    #[serde(deserialize_with = "deserialize_bool_lenient")]
    pub use_horovod: bool,

    pub random_seed: u64,

    #[serde(deserialize_with = "deserialize_bool_lenient")]
    pub debug: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            experiment_name: "hyperopt".to_string(),
            model_name: "run".to_string(),
            output_directory: PathBuf::from("results"),
            skip_save_training_description: false,
            skip_save_training_statistics: false,
            skip_save_model: false,
            skip_save_progress: false,
            skip_save_log: false,
            skip_save_processed_input: false,
            skip_save_unprocessed_output: false,
            skip_save_test_predictions: false,
            skip_save_test_statistics: false,
            skip_save_hyperopt_statistics: false,
            gpus: None,
            gpu_fraction: 1.0,
            use_horovod: false,
            random_seed: 42,
            debug: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optim::hpo::ParameterDomain;

    const MINIMAL: &str = r#"
input_features:
  - name: utterance
    type: text
    encoder: rnn
output_features:
  - name: intent
    type: category
combiner:
  type: concat
  num_fc_layers: 1
training:
  epochs: 5
"#;

    #[test]
    fn test_model_definition_defaults() {
        let def: ModelDefinition = serde_yaml::from_str(MINIMAL).unwrap();
        assert_eq!(def.input_features.len(), 1);
        assert_eq!(def.combiner.get("num_fc_layers"), Some(&Value::from(1)));
        assert!(def.preprocessing.is_empty());
        assert!(def.hyperopt.is_none());
        assert_eq!(def.feature_names().collect::<Vec<_>>(), vec!["utterance", "intent"]);
    }

    #[test]
    fn test_hyperopt_spec_defaults() {
        let spec: HyperoptSpec = serde_yaml::from_str("{}").unwrap();
        assert_eq!(spec, HyperoptSpec::default());
        assert_eq!(spec.goal, Goal::Minimize);
        assert_eq!(spec.metric, "loss");
        assert_eq!(spec.output_feature, "combined");
        assert_eq!(spec.split, Split::Validation);
        assert!(spec.strategy.kind.is_none());
    }

    #[test]
    fn test_hyperopt_section_parses() {
        let yaml = format!(
            "{MINIMAL}hyperopt:
  goal: maximize
  metric: accuracy
  output_feature: intent
  split: test
  parameters:
    combiner.num_fc_layers: [1, 2, 3]
    training.learning_rate:
      type: float
      low: 0.0001
      high: 0.1
      log_scale: true
  strategy:
    type: random
    num_samples: 12
  executor:
    type: parallel
    num_workers: 4
"
        );
        let def: ModelDefinition = serde_yaml::from_str(&yaml).unwrap();
        let spec = def.hyperopt.clone().unwrap();
        assert_eq!(spec.goal, Goal::Maximize);
        assert_eq!(spec.split, Split::Test);
        assert_eq!(spec.parameters.len(), 2);
        assert!(matches!(
            spec.parameters.get("training.learning_rate"),
            Some(ParameterDomain::Continuous { log_scale: true, .. })
        ));
        assert_eq!(spec.strategy.kind.as_deref(), Some("random"));
        assert_eq!(spec.strategy.params.get("num_samples"), Some(&Value::from(12)));
        assert_eq!(spec.executor.params.get("num_workers"), Some(&Value::from(4)));
        assert!(def.without_hyperopt().hyperopt.is_none());
    }

    #[test]
    fn test_component_spec_builder() {
        let spec = ComponentSpec::named("bayesian").with_param("num_samples", 4);
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json, serde_json::json!({"type": "bayesian", "num_samples": 4}));
    }

    #[test]
    fn test_run_options_defaults() {
        let opts = RunOptions::default();
        assert_eq!(opts.experiment_name, "hyperopt");
        assert_eq!(opts.model_name, "run");
        assert_eq!(opts.output_directory, PathBuf::from("results"));
        assert_eq!(opts.gpu_fraction, 1.0);
        assert_eq!(opts.random_seed, 42);
    }

    #[test]
    fn test_run_options_lenient_bools() {
        let opts: RunOptions =
            serde_yaml::from_str("skip_save_model: \"true\"\ndebug: false\n").unwrap();
        assert!(opts.skip_save_model);
        assert!(!opts.debug);
        assert!(serde_yaml::from_str::<RunOptions>("debug: \"maybe\"").is_err());
    }

    #[test]
    fn test_split_display() {
        assert_eq!(Split::Training.to_string(), "training");
        assert_eq!(Split::default().to_string(), "validation");
    }
}
