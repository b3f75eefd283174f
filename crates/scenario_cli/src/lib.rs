//! Scenario Simulator CLI library
//!
//! Config/weights file loading → validation → run → CSV/JSON outputs.
//! The binary in `main.rs` is a thin clap front end over these functions.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use scenario_core::config::read_weights_file;
use scenario_core::export::{summary_table, to_table};
use scenario_core::{
    run_parallel, run_seeded, validate_all, AggregateResult, RuleTable, ScenarioModel, SimConfig,
    WeightScale,
};
use tracing::{info, warn};

/// Env var holding the log filter (`info` when unset).
pub const LOG_ENV: &str = "SCENARIO_LOG";

/// Command-line values that override the config file.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub weights: Option<PathBuf>,
    pub trials: Option<usize>,
    pub seed: Option<u64>,
    pub workers: Option<usize>,
    pub scale: Option<WeightScale>,
    pub rules: Option<PathBuf>,
}

/// Finished run plus the seed that produced it.
#[derive(Debug)]
pub struct RunReport {
    pub seed: u64,
    pub result: AggregateResult,
}

/// Config file (explicit path, else `SCENARIO_CONFIG_PATH`, else defaults)
/// with command-line overrides applied.
pub fn load_config(path: Option<&Path>, overrides: &RunOverrides) -> Result<SimConfig> {
    let mut config = match path {
        Some(path) => SimConfig::from_path(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => SimConfig::from_env()?.unwrap_or_default(),
    };

    if let Some(weights) = &overrides.weights {
        config.distributions = read_weights_file(weights)
            .with_context(|| format!("Failed to read weights: {}", weights.display()))?;
    }
    if let Some(trials) = overrides.trials {
        config.trials = trials;
    }
    if let Some(seed) = overrides.seed {
        config.seed = Some(seed);
    }
    if let Some(workers) = overrides.workers {
        config.workers = workers;
    }
    if let Some(scale) = overrides.scale {
        config.scale = scale;
    }
    if let Some(rules) = &overrides.rules {
        config.rules_path = Some(rules.clone());
    }

    config.validate()?;
    Ok(config)
}

/// Validation messages for every actor, formatted for the terminal.
pub fn check_distributions(model: &ScenarioModel, config: &SimConfig) -> Vec<String> {
    validate_all(model, &config.distributions, config.scale)
        .issues
        .iter()
        .map(|issue| format!("[{:?}] {}", issue.severity(), issue))
        .collect()
}

pub fn execute(model: &ScenarioModel, config: &SimConfig) -> Result<RunReport> {
    let rules = config.load_rules(model).context("Failed to load rule table")?;

    let report = validate_all(model, &config.distributions, config.scale);
    if !report.is_valid() {
        for issue in &report.issues {
            warn!(actor = issue.actor().unwrap_or("-"), "{}", issue);
        }
        bail!(
            "{} distribution issue(s); simulation not started",
            report.issues.len()
        );
    }
    let distributions = report.into_result(model)?;

    let seed = config.seed.unwrap_or_else(rand::random);
    info!(seed, trials = config.trials, workers = config.workers, "running simulation");

    let result = if config.workers > 1 {
        run_parallel(&distributions, &rules, config.trials, seed, config.workers)?
    } else {
        run_seeded(&distributions, &rules, config.trials, seed)?
    };

    Ok(RunReport { seed, result })
}

pub fn write_table_file(model: &ScenarioModel, result: &AggregateResult, path: &Path) -> Result<()> {
    let bytes = to_table(model, result)?;
    fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}

/// `.json` → JSON aggregate, anything else → summary CSV.
pub fn write_summary_file(report: &RunReport, path: &Path) -> Result<()> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let bytes = if is_json {
        let value = serde_json::json!({
            "seed": report.seed,
            "result": &report.result,
        });
        serde_json::to_vec_pretty(&value)?
    } else {
        summary_table(&report.result)?
    };
    fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}

/// Percentage bars, one line per label.
pub fn render_percentages(entries: &[(&str, f64)]) -> String {
    let width = entries.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    entries
        .iter()
        .map(|(label, pct)| {
            let bar = "█".repeat((pct / 2.0).round() as usize);
            format!("   {:<width$}  {:>6.2}%  {}", label, pct, bar, width = width)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Rule table listing with how many of the possible trials each rule wins.
pub fn describe_rules(model: &ScenarioModel, rules: &RuleTable) -> String {
    let coverage = rules.coverage(model);
    let space = model.trial_space();
    let mut lines = Vec::new();

    for (i, (rule, wins)) in rules.rules().iter().zip(coverage).enumerate() {
        let conditions = if rule.is_catch_all() {
            "default".to_string()
        } else {
            rule.conditions
                .iter()
                .map(|c| {
                    format!(
                        "{}={}",
                        model.actor_name(c.actor),
                        model.posture_name(c.actor, c.posture)
                    )
                })
                .collect::<Vec<_>>()
                .join(" ∧ ")
        };
        lines.push(format!(
            "{}. [{}] {} → ({}, {})  [{}/{} trials]",
            i + 1,
            rule.name,
            conditions,
            rule.classification.outcome,
            rule.classification.impact,
            wins,
            space
        ));
    }

    lines.join("\n")
}

#[cfg(feature = "cli")]
pub fn init_tracing(json: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
