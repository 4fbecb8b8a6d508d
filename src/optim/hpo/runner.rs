//! Trial runner: train one model definition and evaluate it on one split

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::config::{DataReferences, ModelDefinition, RunOptions, Split};

use super::error::{HPOError, Result};
use super::types::Sample;

/// Everything a runner needs for one trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRequest {
    /// Submission index within the run
    pub trial_id: usize,
    /// Sample that produced `model_definition`
    pub parameters: Sample,
    /// Definition with the sample already applied
    pub model_definition: ModelDefinition,
    pub eval_split: Split,
    pub data: DataReferences,
    /// Per-trial options; `gpus` holds the assigned device when one was reserved
    pub options: RunOptions,
}

/// Statistics returned by one trial
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrialStats {
    /// Per-epoch training statistics, opaque to the optimizer
    #[serde(default)]
    pub training: Value,
    /// Evaluation statistics: `output_feature -> metric -> value`
    #[serde(default, alias = "eval")]
    pub evaluation: Value,
}

impl TrialStats {
    pub fn new(training: Value, evaluation: Value) -> Self {
        Self { training, evaluation }
    }
}

/// Black-box "train and evaluate" capability
pub trait TrialRunner: Send + Sync {
    fn train_and_eval(&self, request: &TrialRequest) -> Result<TrialStats>;
}

impl<F> TrialRunner for F
where
    F: Fn(&TrialRequest) -> Result<TrialStats> + Send + Sync,
{
    fn train_and_eval(&self, request: &TrialRequest) -> Result<TrialStats> {
        self(request)
    }
}

/// Which scalar of the evaluation statistics a trial is scored by
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSelector {
    pub output_feature: String,
    pub metric: String,
}

impl MetricSelector {
    pub fn new(output_feature: impl Into<String>, metric: impl Into<String>) -> Self {
        Self {
            output_feature: output_feature.into(),
            metric: metric.into(),
        }
    }

    /// Read `eval_stats[output_feature][metric]` as a number
    pub fn score(&self, eval_stats: &Value) -> Result<f64> {
        eval_stats
            .get(&self.output_feature)
            .and_then(|feature| feature.get(&self.metric))
            .and_then(Value::as_f64)
            .ok_or_else(|| HPOError::MetricNotFound {
                output_feature: self.output_feature.clone(),
                metric: self.metric.clone(),
            })
    }
}

/// Runs an external training program once per trial.
///
/// The request is written to `trial_request.json` in the trial directory and
/// its path appended to the command line. The program must print
/// `{"training": ..., "evaluation": ...}` on stdout and exit with status 0.
/// On unix the child gets its own process group, so an interrupt from the
/// terminal reaches only the controlling process.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    program: OsString,
    args: Vec<OsString>,
}

impl CommandRunner {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append a fixed argument placed before the request path
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// `<output_directory>/<experiment>_<model>_<trial_id>`
    pub fn trial_dir(request: &TrialRequest) -> PathBuf {
        let opts = &request.options;
        opts.output_directory.join(format!(
            "{}_{}_{}",
            opts.experiment_name, opts.model_name, request.trial_id
        ))
    }
}

impl TrialRunner for CommandRunner {
    fn train_and_eval(&self, request: &TrialRequest) -> Result<TrialStats> {
        let dir = Self::trial_dir(request);
        fs::create_dir_all(&dir)?;
        let request_path = dir.join("trial_request.json");
        fs::write(&request_path, serde_json::to_vec_pretty(request)?)?;

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(&request_path)
            .stdin(Stdio::null())
            .stderr(Stdio::inherit());
        if let Some(gpus) = &request.options.gpus {
            command.env("CUDA_VISIBLE_DEVICES", gpus);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let program = self.program.to_string_lossy();
        log::debug!("Trial {}: running {program} {}", request.trial_id, request_path.display());
        let output = command
            .output()
            .map_err(|e| HPOError::Runner(format!("failed to launch {program}: {e}")))?;

        if !output.status.success() {
            return Err(HPOError::Runner(format!("{program} exited with {}", output.status)));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| HPOError::Runner(format!("could not parse output of {program}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(dir: &std::path::Path) -> TrialRequest {
        TrialRequest {
            trial_id: 3,
            parameters: Sample::new(),
            model_definition: ModelDefinition::default(),
            eval_split: Split::Validation,
            data: DataReferences::default(),
            options: RunOptions {
                output_directory: dir.to_path_buf(),
                ..RunOptions::default()
            },
        }
    }

    #[test]
    fn test_metric_selector_reads_nested_value() {
        let selector = MetricSelector::new("combined", "loss");
        let stats = json!({"combined": {"loss": 0.25, "accuracy": 0.9}});
        assert_eq!(selector.score(&stats).unwrap(), 0.25);
    }

    #[test]
    fn test_metric_selector_integer_metric() {
        let selector = MetricSelector::new("intent", "hits_at_k");
        assert_eq!(selector.score(&json!({"intent": {"hits_at_k": 4}})).unwrap(), 4.0);
    }

    #[test]
    fn test_metric_selector_missing() {
        let selector = MetricSelector::new("combined", "accuracy");
        let err = selector.score(&json!({"combined": {"loss": 0.1}})).unwrap_err();
        assert!(matches!(err, HPOError::MetricNotFound { ref metric, .. } if metric == "accuracy"));
        assert!(selector.score(&json!({"combined": {"accuracy": "high"}})).is_err());
        assert!(selector.score(&Value::Null).is_err());
    }

    #[test]
    fn test_closure_runner() {
        let runner = |req: &TrialRequest| -> Result<TrialStats> {
            Ok(TrialStats::new(Value::Null, json!({"combined": {"loss": req.trial_id as f64}})))
        };
        let tmp = tempfile::tempdir().unwrap();
        let stats = runner.train_and_eval(&request(tmp.path())).unwrap();
        assert_eq!(stats.evaluation, json!({"combined": {"loss": 3.0}}));
    }

    #[test]
    fn test_trial_stats_accepts_eval_alias() {
        let stats: TrialStats = serde_json::from_str(r#"{"eval": {"a": {"b": 1}}}"#).unwrap();
        assert_eq!(stats.training, Value::Null);
        assert_eq!(stats.evaluation, json!({"a": {"b": 1}}));
    }

    #[test]
    fn test_trial_dir_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = CommandRunner::trial_dir(&request(tmp.path()));
        assert_eq!(dir, tmp.path().join("hyperopt_run_3"));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_runner_parses_stdout() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = CommandRunner::new("sh").arg("-c").arg(
            r#"test -f "$0" && printf '{"training": {"epochs": 1}, "evaluation": {"combined": {"loss": 0.5}}}'"#,
        );
        let req = request(tmp.path());
        let stats = runner.train_and_eval(&req).unwrap();
        assert_eq!(stats.training, json!({"epochs": 1}));
        assert_eq!(MetricSelector::new("combined", "loss").score(&stats.evaluation).unwrap(), 0.5);

        let written = fs::read_to_string(CommandRunner::trial_dir(&req).join("trial_request.json")).unwrap();
        let parsed: TrialRequest = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed, req);
    }

    #[cfg(unix)]
    #[test]
    fn test_command_runner_sets_visible_devices() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = CommandRunner::new("sh").arg("-c").arg(
            r#"printf '{"evaluation": {"combined": {"device": %s}}}' "$CUDA_VISIBLE_DEVICES""#,
        );
        let mut req = request(tmp.path());
        req.options.gpus = Some("1".to_string());
        let stats = runner.train_and_eval(&req).unwrap();
        assert_eq!(stats.evaluation, json!({"combined": {"device": 1}}));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_runner_nonzero_exit() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = CommandRunner::new("sh").args(["-c", "exit 3"]);
        let err = runner.train_and_eval(&request(tmp.path())).unwrap_err();
        assert!(matches!(err, HPOError::Runner(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_runner_bad_output() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = CommandRunner::new("sh").args(["-c", "echo not json"]);
        assert!(matches!(
            runner.train_and_eval(&request(tmp.path())),
            Err(HPOError::Runner(_))
        ));
    }

    #[test]
    fn test_command_runner_missing_program() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = CommandRunner::new("ajustar-no-such-program-xyz");
        assert!(matches!(
            runner.train_and_eval(&request(tmp.path())),
            Err(HPOError::Runner(_))
        ));
    }
}
