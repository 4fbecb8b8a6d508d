//! Ajustar CLI
//!
//! Hyperparameter search over a YAML model definition.
//!
//! # Usage
//!
//! ```bash
//! # Search with an external training program
//! ajustar hyperopt intent.yaml --runner ./train.sh --dataset data.csv
//!
//! # Pass fixed arguments to the training program and spread trials over two GPUs
//! ajustar hyperopt intent.yaml --runner python --runner-arg train.py --gpus 0,1
//!
//! # Validate config and show the resolved hyperopt section
//! ajustar validate intent.yaml --detailed
//! ```
//!
//! `RUST_LOG` overrides the log filter chosen by `--verbose` / `--quiet`.

use ajustar::cli::{run_command, Cli, LogLevel};
use clap::Parser;
use env_logger::Env;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = LogLevel::from_flags(cli.verbose, cli.quiet);
    env_logger::Builder::from_env(Env::default().default_filter_or(level.filter().as_str()))
        .format_timestamp(None)
        .init();

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
