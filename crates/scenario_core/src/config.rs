//! Simulation configuration
//!
//! A single JSON or YAML file describing one run: trial count, seed, worker
//! count, weight scale, per-actor weights and an optional rule table path.
//! `SCENARIO_CONFIG_PATH` names a file to load when the caller gives none.
//!
//! ```yaml
//! trials: 10000
//! seed: 42
//! distributions:
//!   China: { Supports SAC: 40, Neutral: 40, Pressures for Reform: 20 }
//!   EAOs: { Fragmented: 60, Unified: 40 }
//! ```

use std::path::{Path, PathBuf};
use std::{env, fs};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, ScenarioError};
use crate::model::ScenarioModel;
use crate::rules::{builtin_rules, RuleTable};
use crate::validation::{WeightInputs, WeightScale};

pub const CONFIG_PATH_ENV: &str = "SCENARIO_CONFIG_PATH";

/// Trial count used by the original slider tool.
pub const DEFAULT_TRIALS: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub trials: usize,
    pub seed: Option<u64>,
    /// 1 runs on the calling thread.
    pub workers: usize,
    pub scale: WeightScale,
    pub distributions: WeightInputs,
    /// YAML rule table; the built-in table when absent.
    pub rules_path: Option<PathBuf>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            trials: DEFAULT_TRIALS,
            seed: None,
            workers: 1,
            scale: WeightScale::Percent,
            distributions: WeightInputs::new(),
            rules_path: None,
        }
    }
}

impl SimConfig {
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Parse by extension: `.json` as JSON, anything else as YAML.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut config = if is_json(path) {
            Self::from_json(&content)?
        } else {
            Self::from_yaml(&content)?
        };

        // Relative rule paths resolve against the config file's directory
        if let (Some(rules), Some(dir)) = (config.rules_path.as_mut(), path.parent()) {
            if rules.is_relative() {
                *rules = dir.join(&*rules);
            }
        }

        debug!(path = %path.display(), trials = config.trials, "config loaded");
        Ok(config)
    }

    /// Load from `SCENARIO_CONFIG_PATH` if it is set and non-empty.
    pub fn from_env() -> Result<Option<Self>> {
        let Ok(path) = env::var(CONFIG_PATH_ENV) else {
            return Ok(None);
        };

        let path = path.trim();
        if path.is_empty() {
            return Ok(None);
        }

        Self::from_path(Path::new(path)).map(Some).map_err(|e| {
            ScenarioError::InvalidConfig(format!("{CONFIG_PATH_ENV}='{path}': {e}"))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.trials == 0 {
            return Err(ScenarioError::InvalidTrialCount { n: self.trials });
        }
        if self.workers == 0 {
            return Err(ScenarioError::InvalidConfig("workers must be at least 1".to_string()));
        }
        Ok(())
    }

    /// The configured rule table, or the built-in one.
    pub fn load_rules(&self, model: &ScenarioModel) -> Result<RuleTable> {
        match &self.rules_path {
            Some(path) => RuleTable::from_yaml(model, &fs::read_to_string(path)?),
            None => Ok(builtin_rules().clone()),
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Read an `actor → posture → weight` file (JSON or YAML).
pub fn read_weights_file(path: &Path) -> Result<WeightInputs> {
    let content = fs::read_to_string(path)?;
    if is_json(path) {
        Ok(serde_json::from_str(&content)?)
    } else {
        Ok(serde_yaml::from_str(&content)?)
    }
}
