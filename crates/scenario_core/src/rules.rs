//! Rule Classifier
//!
//! A rule table is an ordered list of conjunctive posture conditions, each
//! mapped to an (outcome, impact) pair. Classification walks the table and
//! returns the first rule whose conditions all hold; actors a rule does not
//! mention are wildcards. The last rule has no conditions and catches every
//! trial, so classification is total.
//!
//! ## Usage
//!
//! ```rust
//! use scenario_core::model::ScenarioModel;
//! use scenario_core::rules::builtin_rules;
//!
//! let model = ScenarioModel::myanmar();
//! let rules = builtin_rules();
//! let trial = model.all_trials().next().unwrap();
//! let label = rules.classify(&trial);
//! println!("{} / {}", label.outcome, label.impact);
//! ```

use std::collections::BTreeMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, ScenarioError};
use crate::model::{ActorId, PostureId, ScenarioModel, Trial};

/// Built-in rule table (embedded at compile time).
pub const MYANMAR_RULES_YAML: &str = include_str!("../data/myanmar_rules.yaml");

static MYANMAR_RULES: OnceLock<RuleTable> = OnceLock::new();

/// Outcome and humanitarian-impact labels assigned to a trial.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Classification {
    pub outcome: String,
    pub impact: String,
}

impl Classification {
    pub fn new(outcome: impl Into<String>, impact: impl Into<String>) -> Self {
        Self { outcome: outcome.into(), impact: impact.into() }
    }
}

/// `actor == posture`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Condition {
    pub actor: ActorId,
    pub posture: PostureId,
}

impl Condition {
    pub fn holds(&self, trial: &Trial) -> bool {
        trial.posture(self.actor) == Some(self.posture)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub name: String,
    pub conditions: Vec<Condition>,
    pub classification: Classification,
}

impl Rule {
    pub fn matches(&self, trial: &Trial) -> bool {
        self.conditions.iter().all(|c| c.holds(trial))
    }

    /// No conditions: matches every trial.
    pub fn is_catch_all(&self) -> bool {
        self.conditions.is_empty()
    }
}

/// Serialized form of a rule, with actors and postures by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub when: BTreeMap<String, String>,
    pub outcome: String,
    pub impact: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleTable {
    rules: Vec<Rule>,
    actor_count: usize,
}

impl RuleTable {
    /// Build a table from compiled rules.
    ///
    /// Rejects an empty table, a table whose last rule is not a catch-all, a
    /// catch-all anywhere but last, duplicate rule names, empty labels,
    /// conditions outside the model, and rules naming one actor twice.
    pub fn new(model: &ScenarioModel, rules: Vec<Rule>) -> Result<Self> {
        let Some(last) = rules.last() else {
            return Err(ScenarioError::InvalidRuleTable("table has no rules".to_string()));
        };
        if !last.is_catch_all() {
            return Err(ScenarioError::InvalidRuleTable(format!(
                "last rule '{}' must have no conditions",
                last.name
            )));
        }

        for (i, rule) in rules.iter().enumerate() {
            if i + 1 < rules.len() && rule.is_catch_all() {
                return Err(ScenarioError::InvalidRuleTable(format!(
                    "rule '{}' at position {} matches every trial; only the last rule may",
                    rule.name,
                    i + 1
                )));
            }
            if rules[..i].iter().any(|r| r.name == rule.name) {
                return Err(ScenarioError::InvalidRuleTable(format!(
                    "duplicate rule name '{}'",
                    rule.name
                )));
            }
            if rule.classification.outcome.trim().is_empty()
                || rule.classification.impact.trim().is_empty()
            {
                return Err(ScenarioError::InvalidRuleTable(format!(
                    "rule '{}' has an empty label",
                    rule.name
                )));
            }
            for (j, cond) in rule.conditions.iter().enumerate() {
                let known = model
                    .actor(cond.actor)
                    .map(|a| cond.posture.0 < a.postures.len())
                    .unwrap_or(false);
                if !known {
                    return Err(ScenarioError::InvalidRuleTable(format!(
                        "rule '{}' refers to actor #{} posture #{} outside the model",
                        rule.name, cond.actor.0, cond.posture.0
                    )));
                }
                if rule.conditions[..j].iter().any(|c| c.actor == cond.actor) {
                    return Err(ScenarioError::InvalidRuleTable(format!(
                        "rule '{}' constrains {} more than once",
                        rule.name,
                        model.actor_name(cond.actor)
                    )));
                }
            }
        }

        debug!(rules = rules.len(), actors = model.len(), "rule table built");
        Ok(Self { rules, actor_count: model.len() })
    }

    /// Resolve named specs against the model.
    pub fn compile(model: &ScenarioModel, specs: &[RuleSpec]) -> Result<Self> {
        let rules = specs
            .iter()
            .map(|spec| {
                let mut conditions = spec
                    .when
                    .iter()
                    .map(|(actor, posture)| {
                        let actor = model.actor_id(actor)?;
                        let posture = model.posture_id(actor, posture)?;
                        Ok(Condition { actor, posture })
                    })
                    .collect::<Result<Vec<_>>>()?;
                conditions.sort_by_key(|c| c.actor);

                Ok(Rule {
                    name: spec.name.clone(),
                    conditions,
                    classification: Classification::new(&spec.outcome, &spec.impact),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(model, rules)
    }

    pub fn from_yaml(model: &ScenarioModel, yaml: &str) -> Result<Self> {
        let specs: Vec<RuleSpec> = serde_yaml::from_str(yaml)?;
        Self::compile(model, &specs)
    }

    /// Named form, suitable for writing back to YAML.
    pub fn to_specs(&self, model: &ScenarioModel) -> Vec<RuleSpec> {
        self.rules
            .iter()
            .map(|rule| RuleSpec {
                name: rule.name.clone(),
                when: rule
                    .conditions
                    .iter()
                    .map(|c| {
                        (
                            model.actor_name(c.actor).to_string(),
                            model.posture_name(c.actor, c.posture).to_string(),
                        )
                    })
                    .collect(),
                outcome: rule.classification.outcome.clone(),
                impact: rule.classification.impact.clone(),
            })
            .collect()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Number of actors in the model this table was built for.
    pub fn actor_count(&self) -> usize {
        self.actor_count
    }

    /// The catch-all rule.
    pub fn default_rule(&self) -> &Rule {
        &self.rules[self.rules.len() - 1]
    }

    /// Index of the first matching rule and its labels.
    pub fn classify_indexed(&self, trial: &Trial) -> (usize, &Classification) {
        let index = self
            .rules
            .iter()
            .position(|r| r.matches(trial))
            .unwrap_or(self.rules.len() - 1);
        (index, &self.rules[index].classification)
    }

    pub fn classify(&self, trial: &Trial) -> &Classification {
        self.classify_indexed(trial).1
    }

    /// How many of the model's possible trials each rule wins.
    pub fn coverage(&self, model: &ScenarioModel) -> Vec<usize> {
        let mut counts = vec![0; self.rules.len()];
        for trial in model.all_trials() {
            counts[self.classify_indexed(&trial).0] += 1;
        }
        counts
    }
}

/// Classify one trial against a table.
pub fn classify<'t>(trial: &Trial, rules: &'t RuleTable) -> &'t Classification {
    rules.classify(trial)
}

/// The built-in table, compiled against [`ScenarioModel::myanmar`].
///
/// # Panics
///
/// Panics if the embedded YAML fails to compile, which a normal build
/// cannot produce.
pub fn builtin_rules() -> &'static RuleTable {
    MYANMAR_RULES.get_or_init(|| {
        RuleTable::from_yaml(&ScenarioModel::myanmar(), MYANMAR_RULES_YAML)
            .expect("Failed to compile myanmar_rules.yaml")
    })
}
