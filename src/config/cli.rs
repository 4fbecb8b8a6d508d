//! Command-line interface definitions
//!
//! ```bash
//! ajustar hyperopt config.yaml --runner ./train.sh --dataset data.csv
//! ajustar hyperopt config.yaml --runner python --runner-arg train.py --gpus 0,1
//! ajustar validate config.yaml --detailed
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::schema::{DataReferences, RunOptions};

/// Ajustar: declarative hyperparameter optimization
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "ajustar")]
#[command(version)]
#[command(about = "Hyperparameter optimization for declarative model definitions")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Search hyperparameters as described by the config's hyperopt section
    Hyperopt(HyperoptArgs),

    /// Validate a configuration file without running any trial
    Validate(ValidateArgs),
}

/// Arguments for the hyperopt command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct HyperoptArgs {
    /// Path to YAML model definition
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Training program invoked once per trial with the request file as last argument
    #[arg(long, value_name = "PROGRAM")]
    pub runner: PathBuf,

    /// Extra argument passed to the training program (repeatable)
    #[arg(long = "runner-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub runner_args: Vec<String>,

    /// Full dataset, split by the training program
    #[arg(long)]
    pub dataset: Option<PathBuf>,

    #[arg(long)]
    pub training_set: Option<PathBuf>,

    #[arg(long)]
    pub validation_set: Option<PathBuf>,

    #[arg(long)]
    pub test_set: Option<PathBuf>,

    /// Training set metadata from an earlier run
    #[arg(long)]
    pub training_set_metadata: Option<PathBuf>,

    /// Directory for trial outputs and statistics
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    #[arg(long)]
    pub experiment_name: Option<String>,

    #[arg(long)]
    pub model_name: Option<String>,

    /// Comma-separated device ids, e.g. 0,1
    #[arg(long)]
    pub gpus: Option<String>,

    /// Share of one device each trial may use
    #[arg(long)]
    pub gpu_fraction: Option<f64>,

    /// Random seed forwarded to every trial
    #[arg(long)]
    pub seed: Option<u64>,

    /// Do not write hyperopt_statistics.json
    #[arg(long)]
    pub skip_save_statistics: bool,
}

impl HyperoptArgs {
    /// Data locations given on the command line
    pub fn data_references(&self) -> DataReferences {
        DataReferences {
            dataset: self.dataset.clone(),
            training_set: self.training_set.clone(),
            validation_set: self.validation_set.clone(),
            test_set: self.test_set.clone(),
            training_set_metadata: self.training_set_metadata.clone(),
        }
    }
}

/// Arguments for the validate command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ValidateArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Print the resolved hyperopt section
    #[arg(short, long)]
    pub detailed: bool,
}

/// Parse command line arguments
pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}

/// Apply command-line overrides to the run options
pub fn apply_overrides(options: &mut RunOptions, args: &HyperoptArgs) {
    if let Some(output_dir) = &args.output_dir {
        options.output_directory = output_dir.clone();
    }
    if let Some(name) = &args.experiment_name {
        options.experiment_name = name.clone();
    }
    if let Some(name) = &args.model_name {
        options.model_name = name.clone();
    }
    if let Some(gpus) = &args.gpus {
        options.gpus = Some(gpus.clone());
    }
    if let Some(fraction) = args.gpu_fraction {
        options.gpu_fraction = fraction;
    }
    if let Some(seed) = args.seed {
        options.random_seed = seed;
    }
    if args.skip_save_statistics {
        options.skip_save_hyperopt_statistics = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hyperopt_command() {
        let cli = parse_args(["ajustar", "hyperopt", "config.yaml", "--runner", "./train.sh"]).unwrap();
        match cli.command {
            Command::Hyperopt(args) => {
                assert_eq!(args.config, PathBuf::from("config.yaml"));
                assert_eq!(args.runner, PathBuf::from("./train.sh"));
                assert!(args.runner_args.is_empty());
                assert!(!args.skip_save_statistics);
            }
            _ => panic!("Expected Hyperopt command"),
        }
    }

    #[test]
    fn test_parse_hyperopt_requires_runner() {
        assert!(parse_args(["ajustar", "hyperopt", "config.yaml"]).is_err());
    }

    #[test]
    fn test_parse_hyperopt_with_overrides() {
        let cli = parse_args([
            "ajustar",
            "hyperopt",
            "config.yaml",
            "--runner",
            "python",
            "--runner-arg",
            "train.py",
            "--runner-arg",
            "--fast",
            "--dataset",
            "data.csv",
            "--output-dir",
            "./out",
            "--experiment-name",
            "intent",
            "--gpus",
            "0,1",
            "--gpu-fraction",
            "0.5",
            "--seed",
            "7",
            "--skip-save-statistics",
        ])
        .unwrap();

        let Command::Hyperopt(args) = cli.command else {
            panic!("Expected Hyperopt command");
        };
        assert_eq!(args.runner_args, vec!["train.py", "--fast"]);
        assert_eq!(args.data_references().dataset, Some(PathBuf::from("data.csv")));

        let mut options = RunOptions::default();
        apply_overrides(&mut options, &args);
        assert_eq!(options.output_directory, PathBuf::from("./out"));
        assert_eq!(options.experiment_name, "intent");
        assert_eq!(options.model_name, "run");
        assert_eq!(options.gpus.as_deref(), Some("0,1"));
        assert_eq!(options.gpu_fraction, 0.5);
        assert_eq!(options.random_seed, 7);
        assert!(options.skip_save_hyperopt_statistics);
    }

    #[test]
    fn test_parse_validate_detailed() {
        let cli = parse_args(["ajustar", "validate", "config.yaml", "--detailed"]).unwrap();
        match cli.command {
            Command::Validate(args) => {
                assert_eq!(args.config, PathBuf::from("config.yaml"));
                assert!(args.detailed);
            }
            _ => panic!("Expected Validate command"),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = parse_args(["ajustar", "validate", "config.yaml", "--quiet"]).unwrap();
        assert!(cli.quiet);
        assert!(!cli.verbose);
        let cli = parse_args(["ajustar", "-v", "validate", "config.yaml"]).unwrap();
        assert!(cli.verbose);
    }
}
