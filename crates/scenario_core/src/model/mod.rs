//! Scenario model: actors, their postures, and sampled trials.

pub mod actor;
pub mod trial;

pub use actor::{ActorDef, ActorId, PostureId, ScenarioModel};
pub use trial::{ClassifiedTrial, Trial};
