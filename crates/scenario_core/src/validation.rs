//! Distribution Validator
//!
//! Turns caller-supplied posture weights (slider percentages or raw
//! probabilities) into a [`Distribution`] the sampler can draw from.
//!
//! - Sum 0 → [`ScenarioError::ZeroTotal`]
//! - Sum off target by more than the tolerance → [`ScenarioError::NonNormalized`]
//!
//! Both block the run; `NonNormalized` carries warning severity so a UI can
//! render it differently.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, ScenarioError};
use crate::model::{ActorId, PostureId, ScenarioModel};

/// Allowed deviation from 100 on the percentage scale.
pub const PERCENT_TOLERANCE: f64 = 0.01;
/// Allowed deviation from 1 on the probability scale.
pub const PROBABILITY_TOLERANCE: f64 = PERCENT_TOLERANCE / 100.0;

/// Posture name → weight, as entered by the caller.
pub type Weights = BTreeMap<String, f64>;

/// Actor name → posture weights.
pub type WeightInputs = BTreeMap<String, Weights>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightScale {
    /// Whichever of 1 or 100 the total is nearer; weights above 1 force percentages.
    Auto,
    /// Weights in [0, 100], expected to sum to 100.
    #[default]
    Percent,
    /// Weights in [0, 1], expected to sum to 1.
    Probability,
}

impl WeightScale {
    fn target(self) -> f64 {
        match self {
            WeightScale::Probability => 1.0,
            _ => 100.0,
        }
    }

    fn tolerance(self) -> f64 {
        match self {
            WeightScale::Probability => PROBABILITY_TOLERANCE,
            _ => PERCENT_TOLERANCE,
        }
    }

    fn unit(self) -> &'static str {
        match self {
            WeightScale::Probability => "",
            _ => "%",
        }
    }

    fn resolve(self, total: f64, max_weight: f64) -> WeightScale {
        match self {
            WeightScale::Auto
                if max_weight <= 1.0 && (total - 1.0).abs() < (total - 100.0).abs() =>
            {
                WeightScale::Probability
            }
            WeightScale::Auto => WeightScale::Percent,
            other => other,
        }
    }
}

/// Probability mass per posture of one actor.
///
/// Always has at least one posture with positive mass, and masses sum to 1
/// within [`PROBABILITY_TOLERANCE`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Distribution {
    actor: ActorId,
    masses: Vec<f64>,
}

impl Distribution {
    /// All mass on a single posture.
    pub fn degenerate(model: &ScenarioModel, actor: ActorId, posture: PostureId) -> Result<Self> {
        let def = model.actor(actor).ok_or_else(|| ScenarioError::UnknownActor {
            actor: format!("#{}", actor.0),
        })?;
        if posture.0 >= def.postures.len() {
            return Err(ScenarioError::UnknownPosture {
                actor: def.name.clone(),
                posture: format!("#{}", posture.0),
            });
        }

        let mut masses = vec![0.0; def.postures.len()];
        masses[posture.0] = 1.0;
        Ok(Self { actor, masses })
    }

    /// Equal mass on every posture.
    pub fn uniform(model: &ScenarioModel, actor: ActorId) -> Result<Self> {
        let def = model.actor(actor).ok_or_else(|| ScenarioError::UnknownActor {
            actor: format!("#{}", actor.0),
        })?;
        let count = def.postures.len();
        Ok(Self {
            actor,
            masses: vec![1.0 / count as f64; count],
        })
    }

    pub fn actor(&self) -> ActorId {
        self.actor
    }

    pub fn masses(&self) -> &[f64] {
        &self.masses
    }

    pub fn mass(&self, posture: PostureId) -> f64 {
        self.masses.get(posture.0).copied().unwrap_or(0.0)
    }

    pub fn total_mass(&self) -> f64 {
        self.masses.iter().sum()
    }

    /// Posture name → probability, for display.
    pub fn named<'m>(&self, model: &'m ScenarioModel) -> BTreeMap<&'m str, f64> {
        self.masses
            .iter()
            .enumerate()
            .map(|(i, m)| (model.posture_name(self.actor, PostureId(i)), *m))
            .collect()
    }
}

/// One distribution per actor of a model, in actor order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionSet {
    distributions: Vec<Distribution>,
}

impl DistributionSet {
    /// Accepts distributions in any order; every model actor needs exactly one.
    pub fn new(model: &ScenarioModel, distributions: Vec<Distribution>) -> Result<Self> {
        let mut slots: Vec<Option<Distribution>> = vec![None; model.len()];

        for dist in distributions {
            let def = model.actor(dist.actor).ok_or_else(|| ScenarioError::UnknownActor {
                actor: format!("#{}", dist.actor.0),
            })?;
            if dist.masses.len() != def.postures.len() {
                return Err(ScenarioError::InvalidModel(format!(
                    "distribution for {} has {} postures, model has {}",
                    def.name,
                    dist.masses.len(),
                    def.postures.len()
                )));
            }
            let slot = &mut slots[dist.actor.0];
            if slot.is_some() {
                return Err(ScenarioError::InvalidModel(format!(
                    "duplicate distribution for {}",
                    def.name
                )));
            }
            *slot = Some(dist);
        }

        let distributions = slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| {
                slot.ok_or_else(|| ScenarioError::MissingDistribution {
                    actor: model.actor_name(ActorId(i)).to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { distributions })
    }

    pub fn get(&self, actor: ActorId) -> Option<&Distribution> {
        self.distributions.get(actor.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Distribution> {
        self.distributions.iter()
    }

    pub fn actor_count(&self) -> usize {
        self.distributions.len()
    }
}

/// Validate one actor's weights.
pub fn validate(
    model: &ScenarioModel,
    actor: &str,
    weights: &Weights,
    scale: WeightScale,
) -> Result<Distribution> {
    let actor_id = model.actor_id(actor)?;
    let posture_count = model.actor(actor_id).map(|a| a.postures.len()).unwrap_or(0);
    let max_weight = scale.target();

    let mut raw = vec![0.0; posture_count];
    for (posture, &value) in weights {
        let posture_id = model.posture_id(actor_id, posture)?;
        if !value.is_finite() || value < 0.0 || value > max_weight {
            return Err(ScenarioError::InvalidWeight {
                actor: actor.to_string(),
                posture: posture.clone(),
                value,
            });
        }
        raw[posture_id.0] = value;
    }

    let total: f64 = raw.iter().sum();
    if total == 0.0 {
        return Err(ScenarioError::ZeroTotal { actor: actor.to_string() });
    }

    let largest = raw.iter().copied().fold(0.0, f64::max);
    let scale = scale.resolve(total, largest);
    let target = scale.target();
    if (total - target).abs() > scale.tolerance() {
        return Err(ScenarioError::NonNormalized {
            actor: actor.to_string(),
            total,
            expected: target,
            unit: scale.unit(),
        });
    }

    debug!(actor, total, ?scale, "distribution accepted");
    Ok(Distribution {
        actor: actor_id,
        masses: raw.into_iter().map(|w| w / target).collect(),
    })
}

/// Every actor's validation outcome, collected instead of stopping at the first failure.
#[derive(Debug)]
pub struct ValidationReport {
    pub distributions: Vec<Distribution>,
    pub issues: Vec<ScenarioError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    /// First issue, or the assembled set.
    pub fn into_result(self, model: &ScenarioModel) -> Result<DistributionSet> {
        match self.issues.into_iter().next() {
            Some(issue) => Err(issue),
            None => DistributionSet::new(model, self.distributions),
        }
    }
}

/// Validate weights for every actor of the model.
///
/// Actors absent from `inputs` are reported as missing; actors the model does
/// not know are reported as unknown.
pub fn validate_all(
    model: &ScenarioModel,
    inputs: &WeightInputs,
    scale: WeightScale,
) -> ValidationReport {
    let mut report = ValidationReport {
        distributions: Vec::with_capacity(model.len()),
        issues: Vec::new(),
    };

    for def in model.actors() {
        match inputs.get(&def.name) {
            Some(weights) => match validate(model, &def.name, weights, scale) {
                Ok(dist) => report.distributions.push(dist),
                Err(e) => report.issues.push(e),
            },
            None => report.issues.push(ScenarioError::MissingDistribution {
                actor: def.name.clone(),
            }),
        }
    }

    for name in inputs.keys() {
        if model.actor_id(name).is_err() {
            report.issues.push(ScenarioError::UnknownActor { actor: name.clone() });
        }
    }

    report
}
