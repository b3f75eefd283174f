//! Actor definitions
//!
//! An actor is a named categorical variable with a fixed, ordered list of
//! mutually exclusive postures. The model is built once and never mutated;
//! everything downstream (distributions, trials, rules) refers to actors and
//! postures by index into it.

use serde::{Deserialize, Serialize};

use super::trial::Trial;
use crate::error::{Result, ScenarioError};

pub const CHINA: &str = "China";
pub const EAOS: &str = "EAOs";
pub const INDIA: &str = "India";
pub const BANGLADESH: &str = "Bangladesh";
pub const RUSSIA: &str = "Russia";
pub const USA: &str = "USA";

/// Built-in actors in column order.
const MYANMAR_ACTORS: [(&str, &[&str]); 6] = [
    (CHINA, &["Supports SAC", "Neutral", "Pressures for Reform"]),
    (EAOS, &["Fragmented", "Unified"]),
    (INDIA, &["Engaged", "Passive"]),
    (BANGLADESH, &["Seeks Repatriation", "Neutral"]),
    (RUSSIA, &["Arms Support", "Neutral"]),
    (USA, &["Active Diplomacy", "Gradual Disengagement"]),
];

/// Index of an actor inside a [`ScenarioModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub usize);

/// Index of a posture inside its actor's posture list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PostureId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorDef {
    pub name: String,
    pub postures: Vec<String>,
}

impl ActorDef {
    pub fn new(name: impl Into<String>, postures: &[&str]) -> Self {
        Self {
            name: name.into(),
            postures: postures.iter().map(|p| p.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ActorDef>", into = "Vec<ActorDef>")]
pub struct ScenarioModel {
    actors: Vec<ActorDef>,
}

impl TryFrom<Vec<ActorDef>> for ScenarioModel {
    type Error = ScenarioError;

    fn try_from(actors: Vec<ActorDef>) -> Result<Self> {
        Self::new(actors)
    }
}

impl From<ScenarioModel> for Vec<ActorDef> {
    fn from(model: ScenarioModel) -> Self {
        model.actors
    }
}

impl Default for ScenarioModel {
    fn default() -> Self {
        Self::myanmar()
    }
}

impl ScenarioModel {
    /// Build a model, rejecting empty or duplicated actor and posture names.
    pub fn new(actors: Vec<ActorDef>) -> Result<Self> {
        if actors.is_empty() {
            return Err(ScenarioError::InvalidModel("model has no actors".to_string()));
        }

        for (i, actor) in actors.iter().enumerate() {
            if actor.name.trim().is_empty() {
                return Err(ScenarioError::InvalidModel(format!("actor #{} has an empty name", i)));
            }
            if actors[..i].iter().any(|a| a.name == actor.name) {
                return Err(ScenarioError::InvalidModel(format!(
                    "duplicate actor: {}",
                    actor.name
                )));
            }
            if actor.postures.is_empty() {
                return Err(ScenarioError::InvalidModel(format!(
                    "{} has no postures",
                    actor.name
                )));
            }
            for (j, posture) in actor.postures.iter().enumerate() {
                if posture.trim().is_empty() || actor.postures[..j].contains(posture) {
                    return Err(ScenarioError::InvalidModel(format!(
                        "{} has an empty or duplicate posture: '{}'",
                        actor.name, posture
                    )));
                }
            }
        }

        Ok(Self { actors })
    }

    /// The six-actor Myanmar model.
    pub fn myanmar() -> Self {
        Self {
            actors: MYANMAR_ACTORS
                .iter()
                .map(|(name, postures)| ActorDef::new(*name, postures))
                .collect(),
        }
    }

    pub fn actors(&self) -> &[ActorDef] {
        &self.actors
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    pub fn actor(&self, id: ActorId) -> Option<&ActorDef> {
        self.actors.get(id.0)
    }

    pub fn actor_ids(&self) -> impl DoubleEndedIterator<Item = ActorId> + ExactSizeIterator {
        (0..self.actors.len()).map(ActorId)
    }

    pub fn actor_id(&self, name: &str) -> Result<ActorId> {
        self.actors
            .iter()
            .position(|a| a.name == name)
            .map(ActorId)
            .ok_or_else(|| ScenarioError::UnknownActor { actor: name.to_string() })
    }

    pub fn posture_id(&self, actor: ActorId, posture: &str) -> Result<PostureId> {
        let def = self.actor(actor).ok_or_else(|| ScenarioError::UnknownActor {
            actor: format!("#{}", actor.0),
        })?;
        def.postures
            .iter()
            .position(|p| p == posture)
            .map(PostureId)
            .ok_or_else(|| ScenarioError::UnknownPosture {
                actor: def.name.clone(),
                posture: posture.to_string(),
            })
    }

    pub fn actor_name(&self, actor: ActorId) -> &str {
        self.actor(actor).map(|a| a.name.as_str()).unwrap_or("?")
    }

    pub fn posture_name(&self, actor: ActorId, posture: PostureId) -> &str {
        self.actor(actor)
            .and_then(|a| a.postures.get(posture.0))
            .map(|p| p.as_str())
            .unwrap_or("?")
    }

    /// Number of distinct trials (product of posture counts).
    pub fn trial_space(&self) -> usize {
        self.actors.iter().map(|a| a.postures.len()).product()
    }

    /// Every possible trial, last actor varying fastest.
    pub fn all_trials(&self) -> impl Iterator<Item = Trial> + '_ {
        let space = self.trial_space();
        (0..space).map(move |mut index| {
            let mut postures = vec![PostureId(0); self.actors.len()];
            for (slot, actor) in postures.iter_mut().zip(&self.actors).rev() {
                let count = actor.postures.len();
                *slot = PostureId(index % count);
                index /= count;
            }
            Trial::new(postures)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_myanmar_model_shape() {
        let model = ScenarioModel::myanmar();
        assert_eq!(model.len(), 6);
        assert_eq!(model.trial_space(), 96);

        let names: Vec<_> = model.actors().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["China", "EAOs", "India", "Bangladesh", "Russia", "USA"]);
    }

    #[test]
    fn test_lookup_by_name() {
        let model = ScenarioModel::myanmar();
        let china = model.actor_id(CHINA).unwrap();
        assert_eq!(china, ActorId(0));
        assert_eq!(model.posture_id(china, "Pressures for Reform").unwrap(), PostureId(2));
        assert_eq!(model.posture_name(china, PostureId(1)), "Neutral");

        assert!(matches!(
            model.actor_id("Japan"),
            Err(ScenarioError::UnknownActor { .. })
        ));
        assert!(matches!(
            model.posture_id(china, "Invades"),
            Err(ScenarioError::UnknownPosture { .. })
        ));
    }

    #[test]
    fn test_all_trials_are_distinct_and_complete() {
        let model = ScenarioModel::myanmar();
        let trials: Vec<_> = model.all_trials().collect();
        assert_eq!(trials.len(), 96);

        let mut unique = trials.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 96);

        // First and last combinations
        assert!(trials[0].postures().iter().all(|p| p.0 == 0));
        assert_eq!(trials[95].posture(ActorId(0)), Some(PostureId(2)));
        assert_eq!(trials[95].posture(ActorId(5)), Some(PostureId(1)));
    }

    #[test]
    fn test_actor_ids_run_both_ways() {
        let model = ScenarioModel::myanmar();
        let ids = model.actor_ids();
        assert_eq!(ids.len(), 6);
        let reversed: Vec<_> = model.actor_ids().rev().collect();
        assert_eq!(reversed.first(), Some(&ActorId(5)));
        assert_eq!(reversed.last(), Some(&ActorId(0)));
    }

    #[test]
    fn test_new_rejects_bad_definitions() {
        assert!(ScenarioModel::new(vec![]).is_err());
        assert!(ScenarioModel::new(vec![ActorDef::new("A", &[])]).is_err());
        assert!(ScenarioModel::new(vec![ActorDef::new("A", &["x", "x"])]).is_err());
        assert!(ScenarioModel::new(vec![
            ActorDef::new("A", &["x"]),
            ActorDef::new("A", &["y"]),
        ])
        .is_err());

        let model = ScenarioModel::new(vec![ActorDef::new("A", &["x", "y"])]).unwrap();
        assert_eq!(model.trial_space(), 2);
    }

    #[test]
    fn test_model_deserializes_through_validation() {
        let json = r#"[{"name": "A", "postures": ["x", "y"]}]"#;
        let model: ScenarioModel = serde_json::from_str(json).unwrap();
        assert_eq!(model.len(), 1);

        let bad = r#"[{"name": "A", "postures": []}]"#;
        assert!(serde_json::from_str::<ScenarioModel>(bad).is_err());
    }
}
