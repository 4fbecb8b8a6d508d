//! Validate command implementation

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{load_config, validate_definition, validate_hyperopt, HyperoptSpec, ValidateArgs};
use crate::optim::hpo::resolve_defaults;

/// Format the search section as a string
pub fn format_search_info(spec: &HyperoptSpec) -> String {
    let mut lines = vec![
        format!("  Goal: {}", spec.goal),
        format!("  Metric: {}.{}", spec.output_feature, spec.metric),
        format!("  Split: {}", spec.split),
        format!("  Parameters: {}", spec.parameters.len()),
    ];
    for name in spec.parameters.names() {
        lines.push(format!("    {name}"));
    }
    lines.join("\n")
}

/// Format strategy and executor with their resolved parameters
pub fn format_components_info(spec: &HyperoptSpec) -> String {
    let describe = |label: &str, kind: Option<&str>, params: &serde_json::Map<String, serde_json::Value>| {
        let mut lines = vec![format!("  {label}: {}", kind.unwrap_or("default"))];
        for (key, value) in params {
            lines.push(format!("    {key}: {value}"));
        }
        lines.join("\n")
    };
    [
        describe("Strategy", spec.strategy.kind.as_deref(), &spec.strategy.params),
        describe("Executor", spec.executor.kind.as_deref(), &spec.executor.params),
    ]
    .join("\n")
}

/// Print detailed configuration summary
pub fn print_detailed_summary(spec: &HyperoptSpec) {
    println!();
    println!("Hyperopt Summary:");
    println!("{}", format_search_info(spec));
    println!();
    println!("{}", format_components_info(spec));
}

pub fn run_validate(args: ValidateArgs, level: LogLevel) -> Result<(), String> {
    log(
        level,
        LogLevel::Normal,
        &format!("Validating config: {}", args.config.display()),
    );

    let definition = load_config(&args.config).map_err(|e| format!("Config error: {e}"))?;

    let spec = validate_definition(&definition)
        .and_then(resolve_defaults)
        .map_err(|e| format!("Validation failed: {e}"))?;
    validate_hyperopt(&spec).map_err(|e| format!("Validation failed: {e}"))?;

    log(level, LogLevel::Normal, "Configuration is valid");

    if args.detailed {
        print_detailed_summary(&spec);
    }

    Ok(())
}
