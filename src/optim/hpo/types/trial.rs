//! Trial outcome type

use serde::{Deserialize, Serialize};

use super::parameter::Sample;

/// Outcome of one train + evaluate cycle, as returned by the executors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    /// Sampled parameters substituted into the model definition
    pub parameters: Sample,
    /// Score extracted from `eval_stats[output_feature][metric]`
    pub metric_score: f64,
    /// Opaque training statistics reported by the trial runner
    pub training_stats: serde_json::Value,
    /// Opaque evaluation statistics reported by the trial runner
    pub eval_stats: serde_json::Value,
}
