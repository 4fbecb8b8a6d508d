//! Hyperopt driver: configuration in, ranked and persisted results out

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{
    load_config, validate_definition, validate_hyperopt, DataReferences, HyperoptSpec,
    ModelDefinition, RunOptions,
};
use crate::error::Result;
use crate::optim::hpo::{build_executor, build_strategy, resolve_defaults, TrialResult, TrialRunner};

/// File written into the output directory after a search
pub const STATISTICS_FILE: &str = "hyperopt_statistics.json";

/// A finished search: the resolved hyperopt section and the ranked results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyperoptOutcome {
    #[serde(rename = "hyperopt_config")]
    pub spec: HyperoptSpec,
    #[serde(rename = "hyperopt_results")]
    pub results: Vec<TrialResult>,
}

impl HyperoptOutcome {
    /// Best trial, if any ran
    pub fn best(&self) -> Option<&TrialResult> {
        self.results.first()
    }
}

/// Run the search described by `definition.hyperopt`.
///
/// The section is validated, completed with registry defaults and turned into
/// a strategy and an executor. Trials receive the definition without its
/// hyperopt section. Unless `skip_save_hyperopt_statistics` is set, the
/// outcome is written to `<output_directory>/hyperopt_statistics.json`.
pub fn hyperopt(
    runner: Arc<dyn TrialRunner>,
    definition: &ModelDefinition,
    data: &DataReferences,
    options: &RunOptions,
) -> Result<HyperoptOutcome> {
    let spec = resolve_defaults(validate_definition(definition)?)?;
    validate_hyperopt(&spec)?;

    log::info!(
        "Starting hyperopt: {} {}.{} on the {} split, {} parameters, strategy {}, executor {}",
        spec.goal,
        spec.output_feature,
        spec.metric,
        spec.split,
        spec.parameters.len(),
        spec.strategy.kind.as_deref().unwrap_or_default(),
        spec.executor.kind.as_deref().unwrap_or_default()
    );

    let strategy = build_strategy(&spec)?;
    let mut executor = build_executor(&spec, strategy)?;
    let results = executor.execute(runner, &definition.without_hyperopt(), data, options)?;

    let outcome = HyperoptOutcome { spec, results };
    if !options.skip_save_hyperopt_statistics {
        let path = save_hyperopt_statistics(&options.output_directory, &outcome)?;
        log::info!("Hyperopt statistics saved to {}", path.display());
    }
    Ok(outcome)
}

/// Load a model definition from YAML and run [`hyperopt`] on it
pub fn hyperopt_from_yaml<P: AsRef<Path>>(
    config_path: P,
    runner: Arc<dyn TrialRunner>,
    data: &DataReferences,
    options: &RunOptions,
) -> Result<HyperoptOutcome> {
    let definition = load_config(config_path)?;
    hyperopt(runner, &definition, data, options)
}

/// Write `outcome` as pretty JSON into `output_directory`
pub fn save_hyperopt_statistics(output_directory: &Path, outcome: &HyperoptOutcome) -> Result<PathBuf> {
    fs::create_dir_all(output_directory)?;
    let path = output_directory.join(STATISTICS_FILE);
    fs::write(&path, serde_json::to_string_pretty(outcome)?)?;
    Ok(path)
}

/// Read back a file written by [`save_hyperopt_statistics`]
pub fn load_hyperopt_statistics(path: &Path) -> Result<HyperoptOutcome> {
    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

/// Ranked summary, one line per trial
pub fn format_hyperopt_results(outcome: &HyperoptOutcome) -> String {
    let spec = &outcome.spec;
    let mut lines = vec![format!(
        "Hyperopt results ({} {}.{}, {} trials):",
        spec.goal,
        spec.output_feature,
        spec.metric,
        outcome.results.len()
    )];
    for (rank, result) in outcome.results.iter().enumerate() {
        let params = result
            .parameters
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!("  {:>3}. {:<12.6} {params}", rank + 1, result.metric_score));
    }
    lines.join("\n")
}
