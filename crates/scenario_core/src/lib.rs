//! # scenario_core - Monte Carlo Scenario Simulator
//!
//! Samples independent actor postures, classifies each sampled combination
//! against an ordered rule table and aggregates the outcome and humanitarian
//! impact distribution over many trials.
//!
//! ## Pipeline
//! - [`validation`]: weights → [`Distribution`] (zero / non-normalized totals rejected)
//! - [`sampler`]: one posture per actor per trial from an injected RNG
//! - [`rules`]: first matching rule wins, catch-all last
//! - [`aggregate`]: n trials → counts and percentages (same seed = same result)
//! - [`export`]: CSV per-trial table and summary
//!
//! ```rust
//! use scenario_core::{builtin_rules, run_seeded, Distribution, DistributionSet, ScenarioModel};
//!
//! let model = ScenarioModel::myanmar();
//! let set = DistributionSet::new(
//!     &model,
//!     model.actor_ids().map(|id| Distribution::uniform(&model, id).unwrap()).collect(),
//! )
//! .unwrap();
//! let result = run_seeded(&set, builtin_rules(), 1_000, 42).unwrap();
//! assert_eq!(result.trial_count, 1_000);
//! ```

pub mod aggregate;
pub mod api;
pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod rules;
pub mod sampler;
pub mod validation;

pub use aggregate::{run, run_parallel, run_seeded, AggregateResult, RuleHit, Tally};
pub use api::{simulate, simulate_json, SimulationRequest, SimulationResponse};
pub use config::SimConfig;
pub use error::{Result, ScenarioError, Severity};
pub use export::{parse_table, summary_table, to_table, write_table};
pub use model::{ActorDef, ActorId, ClassifiedTrial, PostureId, ScenarioModel, Trial};
pub use rules::{builtin_rules, classify, Classification, Rule, RuleSpec, RuleTable};
pub use sampler::{sample, sample_trial};
pub use validation::{
    validate, validate_all, Distribution, DistributionSet, ValidationReport, WeightInputs,
    WeightScale, Weights,
};
