//! Parameter value and domain types

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::optim::hpo::error::{HPOError, Result};

/// One concrete parameter assignment: dotted parameter name -> value
pub type Sample = BTreeMap<String, ParameterValue>;

/// Parameter value (sampled from domain)
///
/// Serialized untagged so that samples read and write as plain YAML/JSON scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Categorical(String),
}

impl ParameterValue {
    /// Get as float (converts int to float if needed)
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParameterValue::Float(v) => Some(*v),
            ParameterValue::Int(v) => Some(*v as f64),
            ParameterValue::Bool(_) | ParameterValue::Categorical(_) => None,
        }
    }

    /// Get as int
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParameterValue::Int(v) => Some(*v),
            ParameterValue::Float(v) => Some(*v as i64),
            ParameterValue::Bool(_) | ParameterValue::Categorical(_) => None,
        }
    }

    /// Get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParameterValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParameterValue::Categorical(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Bool(b) => write!(f, "{b}"),
            ParameterValue::Int(v) => write!(f, "{v}"),
            ParameterValue::Float(v) => write!(f, "{v}"),
            ParameterValue::Categorical(s) => write!(f, "{s}"),
        }
    }
}

impl From<ParameterValue> for serde_json::Value {
    fn from(value: ParameterValue) -> Self {
        match value {
            ParameterValue::Bool(b) => serde_json::Value::Bool(b),
            ParameterValue::Int(v) => serde_json::Value::from(v),
            ParameterValue::Float(v) => serde_json::Value::from(v),
            ParameterValue::Categorical(s) => serde_json::Value::String(s),
        }
    }
}

/// `log_scale: true` or `space: log`
fn deserialize_scale<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scale {
        Flag(bool),
        Name(String),
    }

    match Scale::deserialize(deserializer)? {
        Scale::Flag(b) => Ok(b),
        Scale::Name(s) => match s.to_lowercase().as_str() {
            "log" => Ok(true),
            "linear" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "expected 'log' or 'linear', got '{other}'"
            ))),
        },
    }
}

/// Parameter domain (search space)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ParameterDomain {
    /// Continuous range [low, high], optionally log-scaled
    #[serde(rename = "float")]
    Continuous {
        low: f64,
        high: f64,
        /// Also read from `space: log | linear`
        #[serde(default, alias = "space", deserialize_with = "deserialize_scale")]
        log_scale: bool,
    },
    /// Discrete integer range [low, high]
    #[serde(rename = "int")]
    Discrete { low: i64, high: i64 },
    /// Categorical choices
    #[serde(rename = "category")]
    Categorical {
        #[serde(alias = "values")]
        choices: Vec<ParameterValue>,
    },
}

impl ParameterDomain {
    /// Shorthand for a categorical domain over string labels
    pub fn categorical<S: Into<String>>(labels: impl IntoIterator<Item = S>) -> Self {
        ParameterDomain::Categorical {
            choices: labels
                .into_iter()
                .map(|s| ParameterValue::Categorical(s.into()))
                .collect(),
        }
    }

    /// Sample a random value from this domain
    pub fn sample<R: Rng>(&self, rng: &mut R) -> ParameterValue {
        let (low, high) = self.bounds();
        self.unwarp(low + rng.random::<f64>() * (high - low))
    }

    /// Bounds of this domain in its warped (search) coordinates.
    ///
    /// Log-scaled ranges are searched in log space. Integer and categorical
    /// domains span `[low, high + 1)` and `[0, len)` so that flooring a uniform
    /// draw gives every value the same mass.
    pub fn bounds(&self) -> (f64, f64) {
        match self {
            ParameterDomain::Continuous { low, high, log_scale } => {
                if *log_scale {
                    (low.max(f64::MIN_POSITIVE).ln(), high.max(f64::MIN_POSITIVE).ln())
                } else {
                    (*low, *high)
                }
            }
            ParameterDomain::Discrete { low, high } => (*low as f64, *high as f64 + 1.0),
            ParameterDomain::Categorical { choices } => (0.0, choices.len() as f64),
        }
    }

    /// Map a point in warped coordinates back to a native value
    pub fn unwarp(&self, x: f64) -> ParameterValue {
        match self {
            ParameterDomain::Continuous { low, high, log_scale } => {
                let value = if *log_scale { x.exp() } else { x };
                ParameterValue::Float(value.clamp(*low, *high))
            }
            ParameterDomain::Discrete { low, high } => {
                ParameterValue::Int((x.floor() as i64).clamp(*low, *high))
            }
            ParameterDomain::Categorical { choices } => {
                let idx = (x.floor().max(0.0) as usize).min(choices.len().saturating_sub(1));
                choices[idx].clone()
            }
        }
    }

    /// Inverse of [`unwarp`](Self::unwarp): the value's position in search
    /// coordinates, at the centre of its cell for integer and categorical
    /// domains. `None` when the value does not belong to this kind of domain.
    pub fn warp(&self, value: &ParameterValue) -> Option<f64> {
        match self {
            ParameterDomain::Continuous { log_scale, .. } => {
                let v = value.as_float()?;
                Some(if *log_scale { v.max(f64::MIN_POSITIVE).ln() } else { v })
            }
            ParameterDomain::Discrete { .. } => value.as_int().map(|v| v as f64 + 0.5),
            ParameterDomain::Categorical { choices } => {
                choices.iter().position(|c| c == value).map(|i| i as f64 + 0.5)
            }
        }
    }

    /// Number of values a grid search visits, `None` if it does not fit in `usize`.
    ///
    /// Continuous domains get `n_points` (at least 2) evenly spaced points in
    /// search coordinates, endpoints included.
    pub fn grid_len(&self, n_points: usize) -> Option<usize> {
        match self {
            ParameterDomain::Continuous { .. } => Some(n_points.max(2)),
            ParameterDomain::Discrete { low, high } => {
                let span = i128::from(*high) - i128::from(*low) + 1;
                usize::try_from(span.max(0)).ok()
            }
            ParameterDomain::Categorical { choices } => Some(choices.len()),
        }
    }

    /// The `idx`-th grid value, for `idx < grid_len(n_points)`
    pub fn grid_value(&self, idx: usize, n_points: usize) -> ParameterValue {
        match self {
            ParameterDomain::Continuous { .. } => {
                let (low, high) = self.bounds();
                let steps = (n_points.max(2) - 1) as f64;
                self.unwarp(low + (high - low) * idx as f64 / steps)
            }
            ParameterDomain::Discrete { low, high } => {
                let offset = i64::try_from(idx).unwrap_or(i64::MAX);
                ParameterValue::Int(low.saturating_add(offset).min(*high))
            }
            ParameterDomain::Categorical { choices } => {
                choices[idx.min(choices.len().saturating_sub(1))].clone()
            }
        }
    }

    /// Check if a value is valid for this domain
    pub fn is_valid(&self, value: &ParameterValue) -> bool {
        match (self, value) {
            (ParameterDomain::Continuous { low, high, .. }, ParameterValue::Float(v)) => {
                *v >= *low && *v <= *high
            }
            (ParameterDomain::Discrete { low, high }, ParameterValue::Int(v)) => {
                *v >= *low && *v <= *high
            }
            (ParameterDomain::Categorical { choices }, v) => choices.contains(v),
            _ => false,
        }
    }

    /// Check that the domain itself is well formed
    pub fn validate(&self, name: &str) -> Result<()> {
        let problem = match self {
            ParameterDomain::Continuous { low, high, log_scale } => {
                if !low.is_finite() || !high.is_finite() || low > high {
                    Some(format!("range [{low}, {high}] is empty or not finite"))
                } else if *log_scale && *low <= 0.0 {
                    Some(format!("log-scaled range must be positive, got low={low}"))
                } else {
                    None
                }
            }
            ParameterDomain::Discrete { low, high } => {
                (low > high).then(|| format!("range [{low}, {high}] is empty"))
            }
            ParameterDomain::Categorical { choices } => {
                choices.is_empty().then(|| "no choices given".to_string())
            }
        };
        match problem {
            Some(msg) => Err(HPOError::InvalidValue(name.to_string(), msg)),
            None => Ok(()),
        }
    }
}
