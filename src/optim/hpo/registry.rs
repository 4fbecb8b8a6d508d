//! Name -> constructor tables for strategies and executors
//!
//! Each variant has a plain config struct whose `Default` is the variant's
//! default schema. Configs are read from the flattened parameters of a
//! [`ComponentSpec`] and reject unknown keys.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::{ComponentSpec, HyperoptSpec, Split};

use super::error::{HPOError, Result};
use super::executor::{
    DistributedExecutor, Executor, ParallelExecutor, ResourceRequest, SerialExecutor,
};
use super::runner::MetricSelector;
use super::strategy::{BayesianStrategy, GridStrategy, RandomStrategy, Sampling, Strategy};
use super::tpe::TPEOptimizer;
use super::types::{Goal, HyperparameterSpace};

/// Strategy used when the `type` key is absent
pub const DEFAULT_STRATEGY: &str = "random";
/// Executor used when the `type` key is absent
pub const DEFAULT_EXECUTOR: &str = "serial";

type Params = Map<String, Value>;

/// A registered strategy
pub struct StrategyEntry {
    pub name: &'static str,
    pub defaults: fn() -> Params,
    pub validate: fn(&Params) -> Result<()>,
    pub build: fn(Goal, &HyperparameterSpace, &Params) -> Result<Box<dyn Strategy>>,
}

/// A registered executor
pub struct ExecutorEntry {
    pub name: &'static str,
    pub defaults: fn() -> Params,
    pub validate: fn(&Params) -> Result<()>,
    pub build: fn(Box<dyn Strategy>, MetricSelector, Split, &Params) -> Result<Box<dyn Executor>>,
}

pub static STRATEGY_REGISTRY: &[StrategyEntry] = &[
    StrategyEntry {
        name: "random",
        defaults: defaults_of::<RandomConfig>,
        validate: validate_as::<RandomConfig>,
        build: build_random,
    },
    StrategyEntry {
        name: "grid",
        defaults: defaults_of::<GridConfig>,
        validate: validate_as::<GridConfig>,
        build: build_grid,
    },
    StrategyEntry {
        name: "bayesian",
        defaults: defaults_of::<BayesianConfig>,
        validate: validate_as::<BayesianConfig>,
        build: build_bayesian,
    },
];

pub static EXECUTOR_REGISTRY: &[ExecutorEntry] = &[
    ExecutorEntry {
        name: "serial",
        defaults: defaults_of::<SerialConfig>,
        validate: validate_as::<SerialConfig>,
        build: build_serial,
    },
    ExecutorEntry {
        name: "parallel",
        defaults: defaults_of::<ParallelConfig>,
        validate: validate_as::<ParallelConfig>,
        build: build_parallel,
    },
    ExecutorEntry {
        name: "distributed",
        defaults: defaults_of::<DistributedConfig>,
        validate: validate_as::<DistributedConfig>,
        build: build_distributed,
    },
];

fn not_registered(kind: &'static str, name: &str, names: impl Iterator<Item = &'static str>) -> HPOError {
    HPOError::NotRegistered {
        kind,
        name: name.to_string(),
        choices: names.collect::<Vec<_>>().join(", "),
    }
}

/// Look up a strategy by name
pub fn strategy_entry(name: &str) -> Result<&'static StrategyEntry> {
    STRATEGY_REGISTRY
        .iter()
        .find(|entry| entry.name == name)
        .ok_or_else(|| not_registered("strategy", name, STRATEGY_REGISTRY.iter().map(|e| e.name)))
}

/// Look up an executor by name
pub fn executor_entry(name: &str) -> Result<&'static ExecutorEntry> {
    EXECUTOR_REGISTRY
        .iter()
        .find(|entry| entry.name == name)
        .ok_or_else(|| not_registered("executor", name, EXECUTOR_REGISTRY.iter().map(|e| e.name)))
}

/// Legacy parameter names and the key they stand for
const KEY_ALIASES: &[(&str, &str)] = &[("fiber_backend", "backend")];

fn fill_component(component: &mut ComponentSpec, default_kind: &str, defaults: fn() -> Params) {
    component.kind.get_or_insert_with(|| default_kind.to_string());
    for (alias, key) in KEY_ALIASES {
        if let Some(value) = component.params.remove(*alias) {
            component.params.entry(*key).or_insert(value);
        }
    }
    for (key, value) in defaults() {
        component.params.entry(key).or_insert(value);
    }
}

/// Copy of `spec` with `type` and every variant default spelled out.
///
/// Fails when a named strategy or executor is not registered.
pub fn resolve_defaults(spec: &HyperoptSpec) -> Result<HyperoptSpec> {
    let mut resolved = spec.clone();

    let strategy_name = resolved.strategy.kind.as_deref().unwrap_or(DEFAULT_STRATEGY);
    let strategy = strategy_entry(strategy_name)?;
    fill_component(&mut resolved.strategy, DEFAULT_STRATEGY, strategy.defaults);

    let executor_name = resolved.executor.kind.as_deref().unwrap_or(DEFAULT_EXECUTOR);
    let executor = executor_entry(executor_name)?;
    fill_component(&mut resolved.executor, DEFAULT_EXECUTOR, executor.defaults);

    Ok(resolved)
}

/// Build the strategy selected by `spec`
pub fn build_strategy(spec: &HyperoptSpec) -> Result<Box<dyn Strategy>> {
    let name = spec.strategy.kind.as_deref().unwrap_or(DEFAULT_STRATEGY);
    let entry = strategy_entry(name)?;
    (entry.build)(spec.goal, &spec.parameters, &spec.strategy.params)
}

/// Build the executor selected by `spec`, driving `strategy`
pub fn build_executor(spec: &HyperoptSpec, strategy: Box<dyn Strategy>) -> Result<Box<dyn Executor>> {
    let name = spec.executor.kind.as_deref().unwrap_or(DEFAULT_EXECUTOR);
    let entry = executor_entry(name)?;
    let selector = MetricSelector::new(&spec.output_feature, &spec.metric);
    (entry.build)(strategy, selector, spec.split, &spec.executor.params)
}

/// Parameters of one registered variant
trait VariantConfig: Default + Serialize + DeserializeOwned {
    const NAME: &'static str;

    fn check(&self) -> Result<()> {
        Ok(())
    }
}

fn defaults_of<T: VariantConfig>() -> Params {
    match serde_json::to_value(T::default()) {
        Ok(Value::Object(map)) => map,
        _ => Params::new(),
    }
}

fn parse<T: VariantConfig>(params: &Params) -> Result<T> {
    let config: T = serde_json::from_value(Value::Object(params.clone()))
        .map_err(|e| HPOError::InvalidConfig(format!("{}: {e}", T::NAME)))?;
    config.check()?;
    Ok(config)
}

fn validate_as<T: VariantConfig>(params: &Params) -> Result<()> {
    parse::<T>(params).map(|_| ())
}

fn require(ok: bool, name: &str, msg: &str) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(HPOError::InvalidConfig(format!("{name}: {msg}")))
    }
}

/// `random` strategy parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RandomConfig {
    pub num_samples: usize,
    pub seed: u64,
    pub sampling: Sampling,
}

impl Default for RandomConfig {
    fn default() -> Self {
        Self {
            num_samples: 10,
            seed: 42,
            sampling: Sampling::Uniform,
        }
    }
}

impl VariantConfig for RandomConfig {
    const NAME: &'static str = "random";

    fn check(&self) -> Result<()> {
        require(self.num_samples >= 1, Self::NAME, "num_samples must be at least 1")
    }
}

/// `grid` strategy parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridConfig {
    /// Points per continuous parameter
    pub n_points: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { n_points: 5 }
    }
}

impl VariantConfig for GridConfig {
    const NAME: &'static str = "grid";

    fn check(&self) -> Result<()> {
        require(self.n_points >= 2, Self::NAME, "n_points must be at least 2")
    }
}

/// `bayesian` strategy parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BayesianConfig {
    pub num_samples: usize,
    /// Random trials before the surrogate takes over
    pub n_startup: usize,
    /// Quantile separating good from bad trials
    pub gamma: f64,
    pub seed: u64,
}

impl Default for BayesianConfig {
    fn default() -> Self {
        Self {
            num_samples: 10,
            n_startup: 5,
            gamma: 0.25,
            seed: 42,
        }
    }
}

impl VariantConfig for BayesianConfig {
    const NAME: &'static str = "bayesian";

    fn check(&self) -> Result<()> {
        require(self.num_samples >= 1, Self::NAME, "num_samples must be at least 1")?;
        require(self.n_startup >= 1, Self::NAME, "n_startup must be at least 1")?;
        require(self.gamma > 0.0 && self.gamma < 1.0, Self::NAME, "gamma must be in (0, 1)")
    }
}

/// `serial` executor parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SerialConfig {
    pub batch_size: usize,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self { batch_size: 1 }
    }
}

impl VariantConfig for SerialConfig {
    const NAME: &'static str = "serial";

    fn check(&self) -> Result<()> {
        require(self.batch_size >= 1, Self::NAME, "batch_size must be at least 1")
    }
}

/// `parallel` executor parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParallelConfig {
    pub num_workers: usize,
    pub epsilon: f64,
    /// Defaults to `num_workers`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            num_workers: 2,
            epsilon: 0.01,
            batch_size: None,
        }
    }
}

impl VariantConfig for ParallelConfig {
    const NAME: &'static str = "parallel";

    fn check(&self) -> Result<()> {
        require(self.num_workers >= 1, Self::NAME, "num_workers must be at least 1")?;
        require(self.batch_size != Some(0), Self::NAME, "batch_size must be at least 1")?;
        require((0.0..1.0).contains(&self.epsilon), Self::NAME, "epsilon must be in [0, 1)")
    }
}

/// `distributed` executor parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DistributedConfig {
    pub num_workers: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_cpus_per_worker: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_gpus_per_worker: Option<usize>,
    #[serde(alias = "fiber_backend")]
    pub backend: String,
    /// Defaults to `num_workers`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,
}

impl Default for DistributedConfig {
    fn default() -> Self {
        Self {
            num_workers: 2,
            num_cpus_per_worker: None,
            num_gpus_per_worker: None,
            backend: "local".to_string(),
            batch_size: None,
        }
    }
}

impl VariantConfig for DistributedConfig {
    const NAME: &'static str = "distributed";

    fn check(&self) -> Result<()> {
        require(self.num_workers >= 1, Self::NAME, "num_workers must be at least 1")?;
        require(self.batch_size != Some(0), Self::NAME, "batch_size must be at least 1")?;
        require(self.num_cpus_per_worker != Some(0), Self::NAME, "num_cpus_per_worker must be at least 1")?;
        if !super::executor::BACKENDS.contains(&self.backend.as_str()) {
            return Err(not_registered("backend", &self.backend, super::executor::BACKENDS.iter().copied()));
        }
        Ok(())
    }
}

fn build_random(goal: Goal, space: &HyperparameterSpace, params: &Params) -> Result<Box<dyn Strategy>> {
    let config: RandomConfig = parse(params)?;
    Ok(Box::new(RandomStrategy::with_sampling(
        goal,
        space,
        config.num_samples,
        config.seed,
        config.sampling,
    )?))
}

fn build_grid(goal: Goal, space: &HyperparameterSpace, params: &Params) -> Result<Box<dyn Strategy>> {
    let config: GridConfig = parse(params)?;
    Ok(Box::new(GridStrategy::new(goal, space.clone(), config.n_points)?))
}

fn build_bayesian(goal: Goal, space: &HyperparameterSpace, params: &Params) -> Result<Box<dyn Strategy>> {
    let config: BayesianConfig = parse(params)?;
    space.validate_domains()?;
    let optimizer = TPEOptimizer::new(space.clone())
        .with_startup(config.n_startup)
        .with_gamma(config.gamma)
        .with_seed(config.seed);
    Ok(Box::new(BayesianStrategy::new(goal, optimizer, config.num_samples)))
}

fn build_serial(
    strategy: Box<dyn Strategy>,
    selector: MetricSelector,
    split: Split,
    params: &Params,
) -> Result<Box<dyn Executor>> {
    let config: SerialConfig = parse(params)?;
    Ok(Box::new(
        SerialExecutor::new(strategy, selector, split).with_batch_size(config.batch_size),
    ))
}

fn build_parallel(
    strategy: Box<dyn Strategy>,
    selector: MetricSelector,
    split: Split,
    params: &Params,
) -> Result<Box<dyn Executor>> {
    let config: ParallelConfig = parse(params)?;
    let mut executor = ParallelExecutor::new(strategy, selector, split, config.num_workers)
        .with_epsilon(config.epsilon);
    if let Some(batch_size) = config.batch_size {
        executor = executor.with_batch_size(batch_size);
    }
    Ok(Box::new(executor))
}

fn build_distributed(
    strategy: Box<dyn Strategy>,
    selector: MetricSelector,
    split: Split,
    params: &Params,
) -> Result<Box<dyn Executor>> {
    let config: DistributedConfig = parse(params)?;
    let resources = ResourceRequest {
        cpu: config.num_cpus_per_worker,
        gpu: config.num_gpus_per_worker,
    };
    let mut executor =
        DistributedExecutor::new(strategy, selector, split, &config.backend, config.num_workers)?
            .with_resources(resources);
    if let Some(batch_size) = config.batch_size {
        executor = executor.with_batch_size(batch_size);
    }
    Ok(Box::new(executor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optim::hpo::types::ParameterDomain;
    use serde_json::json;

    fn spec_with(strategy: ComponentSpec, executor: ComponentSpec) -> HyperoptSpec {
        HyperoptSpec {
            parameters: HyperparameterSpace::new()
                .with("combiner.num_fc_layers", ParameterDomain::Discrete { low: 1, high: 4 }),
            strategy,
            executor,
            ..HyperoptSpec::default()
        }
    }

    #[test]
    fn test_resolve_defaults_fills_everything() {
        let resolved = resolve_defaults(&HyperoptSpec::default()).unwrap();
        assert_eq!(resolved.strategy.kind.as_deref(), Some("random"));
        assert_eq!(resolved.strategy.params.get("num_samples"), Some(&json!(10)));
        assert_eq!(resolved.strategy.params.get("seed"), Some(&json!(42)));
        assert_eq!(resolved.strategy.params.get("sampling"), Some(&json!("uniform")));
        assert_eq!(resolved.executor.kind.as_deref(), Some("serial"));
        assert_eq!(resolved.executor.params.get("batch_size"), Some(&json!(1)));
    }

    #[test]
    fn test_resolve_defaults_keeps_explicit_values() {
        let spec = spec_with(
            ComponentSpec::named("bayesian").with_param("num_samples", 3),
            ComponentSpec::named("parallel").with_param("num_workers", 4),
        );
        let resolved = resolve_defaults(&spec).unwrap();
        assert_eq!(resolved.strategy.params.get("num_samples"), Some(&json!(3)));
        assert_eq!(resolved.strategy.params.get("gamma"), Some(&json!(0.25)));
        assert_eq!(resolved.executor.params.get("num_workers"), Some(&json!(4)));
        assert_eq!(resolved.executor.params.get("epsilon"), Some(&json!(0.01)));
        assert!(!resolved.executor.params.contains_key("batch_size"));
    }

    #[test]
    fn test_unknown_strategy_lists_choices() {
        let spec = spec_with(ComponentSpec::named("pysot"), ComponentSpec::default());
        match resolve_defaults(&spec) {
            Err(HPOError::NotRegistered { kind, name, choices }) => {
                assert_eq!(kind, "strategy");
                assert_eq!(name, "pysot");
                assert_eq!(choices, "random, grid, bayesian");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unknown_executor_lists_choices() {
        let spec = spec_with(ComponentSpec::default(), ComponentSpec::named("fiber"));
        let err = resolve_defaults(&spec).unwrap_err();
        assert!(err.to_string().contains("serial, parallel, distributed"));
    }

    #[test]
    fn test_every_entry_validates_its_defaults() {
        for entry in STRATEGY_REGISTRY {
            assert!((entry.validate)(&(entry.defaults)()).is_ok(), "{}", entry.name);
        }
        for entry in EXECUTOR_REGISTRY {
            assert!((entry.validate)(&(entry.defaults)()).is_ok(), "{}", entry.name);
        }
    }

    #[test]
    fn test_random_sampling_scheme_parsed() {
        let entry = strategy_entry("random").unwrap();
        let params = ComponentSpec::default().with_param("sampling", "latin_hypercube").params;
        assert!((entry.validate)(&params).is_ok());
        let params = ComponentSpec::default().with_param("sampling", "sobol").params;
        assert!(matches!((entry.validate)(&params), Err(HPOError::InvalidConfig(_))));
    }

    #[test]
    fn test_builders_reject_malformed_space() {
        let space = HyperparameterSpace::new()
            .with("combiner.activation", ParameterDomain::Categorical { choices: vec![] });
        for entry in STRATEGY_REGISTRY {
            let result = (entry.build)(Goal::Minimize, &space, &(entry.defaults)());
            assert!(matches!(result, Err(HPOError::InvalidValue(..))), "{}", entry.name);
        }
    }

    #[test]
    fn test_unknown_parameter_rejected() {
        let entry = strategy_entry("random").unwrap();
        let params = ComponentSpec::default().with_param("num_sample", 3).params;
        assert!(matches!((entry.validate)(&params), Err(HPOError::InvalidConfig(_))));
    }

    #[test]
    fn test_out_of_range_parameters_rejected() {
        let bayes = strategy_entry("bayesian").unwrap();
        let params = ComponentSpec::default().with_param("gamma", 1.5).params;
        assert!((bayes.validate)(&params).is_err());

        let parallel = executor_entry("parallel").unwrap();
        let params = ComponentSpec::default().with_param("num_workers", 0).params;
        assert!((parallel.validate)(&params).is_err());

        let distributed = executor_entry("distributed").unwrap();
        let params = ComponentSpec::default().with_param("backend", "yarn").params;
        assert!(matches!(
            (distributed.validate)(&params),
            Err(HPOError::NotRegistered { kind: "backend", .. })
        ));
    }

    #[test]
    fn test_distributed_accepts_fiber_backend_key() {
        let params = ComponentSpec::default().with_param("fiber_backend", "local").params;
        let config: DistributedConfig = parse(&params).unwrap();
        assert_eq!(config.backend, "local");
    }

    #[test]
    fn test_resolve_defaults_renames_fiber_backend() {
        let spec = spec_with(
            ComponentSpec::default(),
            ComponentSpec::named("distributed").with_param("fiber_backend", "local"),
        );
        let resolved = resolve_defaults(&spec).unwrap();
        assert_eq!(resolved.executor.params.get("backend"), Some(&Value::from("local")));
        assert!(!resolved.executor.params.contains_key("fiber_backend"));
        assert!(validate_as::<DistributedConfig>(&resolved.executor.params).is_ok());
    }

    #[test]
    fn test_build_every_strategy() {
        for entry in STRATEGY_REGISTRY {
            let spec = spec_with(ComponentSpec::named(entry.name), ComponentSpec::default());
            let resolved = resolve_defaults(&spec).unwrap();
            let mut strategy = build_strategy(&resolved).unwrap();
            assert_eq!(strategy.goal(), Goal::Minimize);
            assert!(!strategy.finished(), "{}", entry.name);
            let sample = strategy.sample().unwrap();
            assert!(spec.parameters.validate(&sample).is_ok());
        }
    }

    #[test]
    fn test_build_every_executor() {
        for entry in EXECUTOR_REGISTRY {
            let spec = spec_with(ComponentSpec::default(), ComponentSpec::named(entry.name));
            let resolved = resolve_defaults(&spec).unwrap();
            let strategy = build_strategy(&resolved).unwrap();
            assert!(build_executor(&resolved, strategy).is_ok(), "{}", entry.name);
        }
    }

    #[test]
    fn test_build_strategy_empty_space() {
        let spec = HyperoptSpec {
            strategy: ComponentSpec::named("bayesian"),
            ..HyperoptSpec::default()
        };
        assert!(matches!(build_strategy(&spec), Err(HPOError::EmptySpace)));
    }
}
