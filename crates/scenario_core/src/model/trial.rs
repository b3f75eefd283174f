use serde::{Deserialize, Serialize};

use super::actor::{ActorId, PostureId, ScenarioModel};

/// One sampled posture per actor, indexed by [`ActorId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Trial {
    postures: Vec<PostureId>,
}

impl Trial {
    pub fn new(postures: Vec<PostureId>) -> Self {
        Self { postures }
    }

    pub fn posture(&self, actor: ActorId) -> Option<PostureId> {
        self.postures.get(actor.0).copied()
    }

    pub fn postures(&self) -> &[PostureId] {
        &self.postures
    }

    pub fn len(&self) -> usize {
        self.postures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postures.is_empty()
    }

    /// Posture names in actor order.
    pub fn labels<'m>(&self, model: &'m ScenarioModel) -> Vec<&'m str> {
        self.postures
            .iter()
            .enumerate()
            .map(|(i, p)| model.posture_name(ActorId(i), *p))
            .collect()
    }
}

/// A trial with the labels its first matching rule assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedTrial {
    pub trial: Trial,
    pub outcome: String,
    pub impact: String,
}
