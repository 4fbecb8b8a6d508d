//! Optimization goal and result ranking

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use super::trial::TrialResult;

/// Whether the tracked metric should be minimized or maximized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Goal {
    #[default]
    Minimize,
    Maximize,
}

impl Goal {
    /// Ordering that puts the better score first
    pub fn compare(self, a: f64, b: f64) -> Ordering {
        let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
        match self {
            Goal::Minimize => ord,
            Goal::Maximize => ord.reverse(),
        }
    }

    /// Sort results best-first. Stable: ties keep submission order.
    pub fn rank(self, results: &mut [TrialResult]) {
        results.sort_by(|a, b| self.compare(a.metric_score, b.metric_score));
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Goal::Minimize => write!(f, "minimize"),
            Goal::Maximize => write!(f, "maximize"),
        }
    }
}

impl std::str::FromStr for Goal {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "minimize" | "min" => Ok(Self::Minimize),
            "maximize" | "max" => Ok(Self::Maximize),
            _ => Err(format!("Unknown goal: {s}. Use: minimize, maximize")),
        }
    }
}
