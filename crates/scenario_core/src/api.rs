//! JSON API
//!
//! String-in, string-out entry point for hosts that only speak JSON (a web
//! front end, a scripting bridge). The request carries the same fields as
//! the slider sidebar: per-actor weights, trial count and an optional seed.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::aggregate::{run_parallel, run_seeded, RuleHit};
use crate::config::DEFAULT_TRIALS;
use crate::error::{Result, ScenarioError, Severity};
use crate::export::to_table;
use crate::model::ScenarioModel;
use crate::rules::builtin_rules;
use crate::validation::{validate_all, WeightInputs, WeightScale};

/// API version for schema compatibility
pub const API_SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    API_SCHEMA_VERSION
}

fn default_trials() -> usize {
    DEFAULT_TRIALS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationRequest {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub distributions: WeightInputs,
    #[serde(default = "default_trials")]
    pub trials: usize,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub scale: WeightScale,
    #[serde(default)]
    pub workers: Option<usize>,
    /// Attach the raw per-trial CSV to the response.
    #[serde(default)]
    pub include_table: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResponse {
    pub schema_version: u32,
    pub trials: usize,
    /// Seed actually used; generated when the request had none.
    pub seed: u64,
    pub outcome_percentages: BTreeMap<String, f64>,
    pub impact_percentages: BTreeMap<String, f64>,
    pub rule_hits: Vec<RuleHit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_csv: Option<String>,
}

/// Input problem reported back to the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiIssue {
    pub actor: Option<String>,
    pub severity: Severity,
    pub message: String,
}

impl From<&ScenarioError> for ApiIssue {
    fn from(err: &ScenarioError) -> Self {
        Self {
            actor: err.actor().map(str::to_string),
            severity: err.severity(),
            message: err.to_string(),
        }
    }
}

/// Run the built-in scenario model for a request.
pub fn simulate(request: &SimulationRequest) -> Result<SimulationResponse> {
    if request.schema_version != API_SCHEMA_VERSION {
        return Err(ScenarioError::InvalidConfig(format!(
            "Unsupported schema version: {}",
            request.schema_version
        )));
    }
    if request.trials == 0 {
        return Err(ScenarioError::InvalidTrialCount { n: 0 });
    }

    let model = ScenarioModel::myanmar();
    let distributions = validate_all(&model, &request.distributions, request.scale)
        .into_result(&model)?;

    let seed = request.seed.unwrap_or_else(|| rand::thread_rng().gen());
    let rules = builtin_rules();
    let result = match request.workers {
        Some(workers) if workers > 1 => {
            run_parallel(&distributions, rules, request.trials, seed, workers)?
        }
        _ => run_seeded(&distributions, rules, request.trials, seed)?,
    };

    let table_csv = if request.include_table {
        let bytes = to_table(&model, &result)?;
        Some(String::from_utf8_lossy(&bytes).into_owned())
    } else {
        None
    };

    Ok(SimulationResponse {
        schema_version: API_SCHEMA_VERSION,
        trials: result.trial_count,
        seed,
        outcome_percentages: result.outcome_percentages,
        impact_percentages: result.impact_percentages,
        rule_hits: result.rule_hits,
        table_csv,
    })
}

/// Every validation issue in a request, without running it.
pub fn check_request(request: &SimulationRequest) -> Vec<ApiIssue> {
    let model = ScenarioModel::myanmar();
    let mut issues: Vec<ApiIssue> = validate_all(&model, &request.distributions, request.scale)
        .issues
        .iter()
        .map(ApiIssue::from)
        .collect();
    if request.trials == 0 {
        issues.push(ApiIssue::from(&ScenarioError::InvalidTrialCount { n: 0 }));
    }
    issues
}

/// JSON wrapper around [`simulate`].
///
/// On invalid input the error string is a JSON array of [`ApiIssue`]s so the
/// host can render one message per actor.
pub fn simulate_json(request_json: &str) -> std::result::Result<String, String> {
    let request: SimulationRequest =
        serde_json::from_str(request_json).map_err(|e| format!("Invalid JSON request: {}", e))?;

    let issues = check_request(&request);
    if !issues.is_empty() {
        warn!(count = issues.len(), "simulation request rejected");
        return Err(serde_json::to_string(&issues).map_err(|e| e.to_string())?);
    }

    let response = simulate(&request).map_err(|e| e.to_string())?;
    serde_json::to_string(&response).map_err(|e| format!("Failed to serialize response: {}", e))
}
