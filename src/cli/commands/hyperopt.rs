//! Hyperopt command implementation

use std::sync::Arc;

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{apply_overrides, load_config, HyperoptArgs, RunOptions};
use crate::hyperopt::{format_hyperopt_results, hyperopt};
use crate::optim::hpo::{CommandRunner, TrialRunner};

/// Trial runner described by `--runner` and `--runner-arg`
pub fn command_runner(args: &HyperoptArgs) -> CommandRunner {
    CommandRunner::new(&args.runner).args(&args.runner_args)
}

pub fn run_hyperopt(args: HyperoptArgs, level: LogLevel) -> Result<(), String> {
    log(
        level,
        LogLevel::Normal,
        &format!("Ajustar: hyperopt from {}", args.config.display()),
    );

    let definition = load_config(&args.config).map_err(|e| format!("Config error: {e}"))?;

    let mut options = RunOptions::default();
    apply_overrides(&mut options, &args);
    log(
        level,
        LogLevel::Verbose,
        &format!("  Runner: {}", args.runner.display()),
    );
    log(
        level,
        LogLevel::Verbose,
        &format!("  Output dir: {}", options.output_directory.display()),
    );

    let runner: Arc<dyn TrialRunner> = Arc::new(command_runner(&args));
    let outcome = hyperopt(runner, &definition, &args.data_references(), &options)
        .map_err(|e| format!("Hyperopt error: {e}"))?;

    log(level, LogLevel::Normal, &format_hyperopt_results(&outcome));
    if !options.skip_save_hyperopt_statistics {
        log(
            level,
            LogLevel::Verbose,
            &format!(
                "  Statistics: {}",
                options
                    .output_directory
                    .join(crate::hyperopt::STATISTICS_FILE)
                    .display()
            ),
        );
    }
    Ok(())
}
