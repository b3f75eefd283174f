//! Aggregator - Monte Carlo runner
//!
//! Runs n trials (sample → classify), tallies outcome, impact and rule
//! counts, and turns counts into percentages once every trial is in.
//!
//! Labels that never occur are left out of the percentage maps. Rule hits
//! are reported for every rule, including zero counts.
//!
//! [`run_parallel`] splits the trials into contiguous chunks. Each chunk
//! seeks its own `ChaCha8Rng` to the stream position of its first trial, so
//! the result equals [`run_seeded`] with the same seed for any worker count.

use std::collections::BTreeMap;
use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, ScenarioError};
use crate::model::ClassifiedTrial;
use crate::rules::{Classification, RuleTable};
use crate::sampler::{sample_trial, words_per_trial};
use crate::validation::DistributionSet;

/// Mergeable counters for a batch of trials.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    pub trials: usize,
    pub outcomes: BTreeMap<String, u64>,
    pub impacts: BTreeMap<String, u64>,
    pub rule_hits: Vec<u64>,
}

impl Tally {
    pub fn new(rule_count: usize) -> Self {
        Self {
            rule_hits: vec![0; rule_count],
            ..Default::default()
        }
    }

    pub fn record(&mut self, rule_index: usize, label: &Classification) {
        self.trials += 1;
        *self.outcomes.entry(label.outcome.clone()).or_insert(0) += 1;
        *self.impacts.entry(label.impact.clone()).or_insert(0) += 1;
        if let Some(hits) = self.rule_hits.get_mut(rule_index) {
            *hits += 1;
        }
    }

    /// Element-wise sum; associative and commutative.
    pub fn merge(mut self, other: Tally) -> Tally {
        self.trials += other.trials;
        for (label, count) in other.outcomes {
            *self.outcomes.entry(label).or_insert(0) += count;
        }
        for (label, count) in other.impacts {
            *self.impacts.entry(label).or_insert(0) += count;
        }
        if self.rule_hits.len() < other.rule_hits.len() {
            self.rule_hits.resize(other.rule_hits.len(), 0);
        }
        for (mine, theirs) in self.rule_hits.iter_mut().zip(other.rule_hits) {
            *mine += theirs;
        }
        self
    }
}

/// Per-rule share of trials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleHit {
    pub rule: String,
    pub outcome: String,
    pub impact: String,
    pub count: u64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub trial_count: usize,
    pub outcome_counts: BTreeMap<String, u64>,
    pub impact_counts: BTreeMap<String, u64>,
    pub outcome_percentages: BTreeMap<String, f64>,
    pub impact_percentages: BTreeMap<String, f64>,
    pub rule_hits: Vec<RuleHit>,
    /// Raw per-trial records, in run order.
    #[serde(skip)]
    pub trials: Vec<ClassifiedTrial>,
}

fn percentages(counts: &BTreeMap<String, u64>, n: usize) -> BTreeMap<String, f64> {
    counts
        .iter()
        .map(|(label, count)| (label.clone(), *count as f64 / n as f64 * 100.0))
        .collect()
}

/// Highest share first, ties by label.
fn ranked(map: &BTreeMap<String, f64>) -> Vec<(&str, f64)> {
    let mut entries: Vec<_> = map.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    entries.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    entries
}

impl AggregateResult {
    /// Compute percentages from a complete tally.
    pub fn finalize(tally: Tally, rules: &RuleTable, trials: Vec<ClassifiedTrial>) -> Self {
        let n = tally.trials;
        let rule_hits = rules
            .rules()
            .iter()
            .zip(&tally.rule_hits)
            .map(|(rule, &count)| RuleHit {
                rule: rule.name.clone(),
                outcome: rule.classification.outcome.clone(),
                impact: rule.classification.impact.clone(),
                count,
                percent: count as f64 / n as f64 * 100.0,
            })
            .collect();

        Self {
            trial_count: n,
            outcome_percentages: percentages(&tally.outcomes, n),
            impact_percentages: percentages(&tally.impacts, n),
            outcome_counts: tally.outcomes,
            impact_counts: tally.impacts,
            rule_hits,
            trials,
        }
    }

    /// Outcomes ordered for charting.
    pub fn outcomes_ranked(&self) -> Vec<(&str, f64)> {
        ranked(&self.outcome_percentages)
    }

    /// Impacts ordered for charting.
    pub fn impacts_ranked(&self) -> Vec<(&str, f64)> {
        ranked(&self.impact_percentages)
    }
}

fn check_inputs(distributions: &DistributionSet, rules: &RuleTable, n: usize) -> Result<()> {
    if n == 0 {
        return Err(ScenarioError::InvalidTrialCount { n });
    }
    if distributions.actor_count() != rules.actor_count() {
        return Err(ScenarioError::InvalidRuleTable(format!(
            "rule table expects {} actors, distributions cover {}",
            rules.actor_count(),
            distributions.actor_count()
        )));
    }
    Ok(())
}

fn run_batch<R: Rng + ?Sized>(
    distributions: &DistributionSet,
    rules: &RuleTable,
    n: usize,
    rng: &mut R,
) -> (Tally, Vec<ClassifiedTrial>) {
    let mut tally = Tally::new(rules.len());
    let mut trials = Vec::with_capacity(n);

    for _ in 0..n {
        let trial = sample_trial(distributions, rng);
        let (index, label) = rules.classify_indexed(&trial);
        tally.record(index, label);
        trials.push(ClassifiedTrial {
            trial,
            outcome: label.outcome.clone(),
            impact: label.impact.clone(),
        });
    }

    (tally, trials)
}

/// Run `n` trials sequentially from the given random source.
pub fn run<R: Rng + ?Sized>(
    distributions: &DistributionSet,
    rules: &RuleTable,
    n: usize,
    rng: &mut R,
) -> Result<AggregateResult> {
    check_inputs(distributions, rules, n)?;

    let started = Instant::now();
    debug!(trials = n, rules = rules.len(), "simulation started");

    let (tally, trials) = run_batch(distributions, rules, n, rng);
    let result = AggregateResult::finalize(tally, rules, trials);

    info!(
        trials = n,
        outcomes = result.outcome_counts.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "simulation completed"
    );
    Ok(result)
}

/// [`run`] with a `ChaCha8Rng` seeded from `seed`.
pub fn run_seeded(
    distributions: &DistributionSet,
    rules: &RuleTable,
    n: usize,
    seed: u64,
) -> Result<AggregateResult> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    run(distributions, rules, n, &mut rng)
}

/// Run `n` trials across `workers` chunks on the rayon pool.
///
/// Bit-identical to [`run_seeded`] with the same seed.
pub fn run_parallel(
    distributions: &DistributionSet,
    rules: &RuleTable,
    n: usize,
    seed: u64,
    workers: usize,
) -> Result<AggregateResult> {
    check_inputs(distributions, rules, n)?;

    let workers = workers.clamp(1, n);
    let chunk = n.div_ceil(workers);
    let stride = words_per_trial(distributions.actor_count());

    let started = Instant::now();
    debug!(trials = n, workers, chunk, "parallel simulation started");

    let batches: Vec<(Tally, Vec<ClassifiedTrial>)> = (0..workers)
        .into_par_iter()
        .map(|w| {
            let start = (w * chunk).min(n);
            let len = chunk.min(n - start);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            rng.set_word_pos(start as u128 * stride);
            run_batch(distributions, rules, len, &mut rng)
        })
        .collect();

    let mut tally = Tally::new(rules.len());
    let mut trials = Vec::with_capacity(n);
    for (batch_tally, batch_trials) in batches {
        tally = tally.merge(batch_tally);
        trials.extend(batch_trials);
    }

    let result = AggregateResult::finalize(tally, rules, trials);
    info!(
        trials = n,
        workers,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "parallel simulation completed"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActorId, PostureId, ScenarioModel};
    use crate::rules::builtin_rules;
    use crate::validation::Distribution;

    fn uniform_set(model: &ScenarioModel) -> DistributionSet {
        DistributionSet::new(
            model,
            model.actor_ids().map(|id| Distribution::uniform(model, id).unwrap()).collect(),
        )
        .unwrap()
    }

    fn degenerate_set(model: &ScenarioModel, picks: &[(&str, &str)]) -> DistributionSet {
        let dists = model
            .actor_ids()
            .map(|id| {
                let name = model.actor_name(id);
                match picks.iter().find(|(a, _)| *a == name) {
                    Some((_, posture)) => {
                        let p = model.posture_id(id, posture).unwrap();
                        Distribution::degenerate(model, id, p).unwrap()
                    }
                    None => Distribution::uniform(model, id).unwrap(),
                }
            })
            .collect();
        DistributionSet::new(model, dists).unwrap()
    }

    #[test]
    fn test_zero_trials_rejected() {
        let model = ScenarioModel::myanmar();
        let err = run_seeded(&uniform_set(&model), builtin_rules(), 0, 1).unwrap_err();
        assert!(matches!(err, ScenarioError::InvalidTrialCount { n: 0 }));
        assert!(run_parallel(&uniform_set(&model), builtin_rules(), 0, 1, 4).is_err());
    }

    #[test]
    fn test_same_seed_is_bit_identical() {
        let model = ScenarioModel::myanmar();
        let set = uniform_set(&model);
        let a = run_seeded(&set, builtin_rules(), 5_000, 2024).unwrap();
        let b = run_seeded(&set, builtin_rules(), 5_000, 2024).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.trials, b.trials);

        let c = run_seeded(&set, builtin_rules(), 5_000, 2025).unwrap();
        assert_ne!(a.trials, c.trials);
    }

    #[test]
    fn test_percentages_sum_to_hundred() {
        let model = ScenarioModel::myanmar();
        let result = run_seeded(&uniform_set(&model), builtin_rules(), 10_000, 7).unwrap();

        let outcome_sum: f64 = result.outcome_percentages.values().sum();
        let impact_sum: f64 = result.impact_percentages.values().sum();
        assert!((outcome_sum - 100.0).abs() < 1e-9);
        assert!((impact_sum - 100.0).abs() < 1e-9);

        let rule_sum: u64 = result.rule_hits.iter().map(|h| h.count).sum();
        assert_eq!(rule_sum, 10_000);
        assert_eq!(result.trials.len(), 10_000);
    }

    #[test]
    fn test_forced_rule_one_is_certain() {
        let model = ScenarioModel::myanmar();
        let set = degenerate_set(
            &model,
            &[
                ("China", "Supports SAC"),
                ("EAOs", "Fragmented"),
                ("USA", "Gradual Disengagement"),
                ("Russia", "Arms Support"),
            ],
        );
        let result = run_seeded(&set, builtin_rules(), 2_000, 11).unwrap();

        assert_eq!(result.outcome_percentages.len(), 1);
        assert_eq!(result.outcome_percentages["Prolonged Conflict"], 100.0);
        assert_eq!(result.impact_percentages["High Humanitarian Needs"], 100.0);
        assert_eq!(result.rule_hits[0].count, 2_000);
        assert_eq!(result.rule_hits[4].count, 0);

        // India and Bangladesh still varied
        let india = model.actor_id("India").unwrap();
        assert!(result.trials.iter().any(|t| t.trial.posture(india) == Some(PostureId(0))));
        assert!(result.trials.iter().any(|t| t.trial.posture(india) == Some(PostureId(1))));
    }

    #[test]
    fn test_default_only_distributions() {
        let model = ScenarioModel::myanmar();
        let set = degenerate_set(
            &model,
            &[
                ("China", "Neutral"),
                ("EAOs", "Fragmented"),
                ("India", "Passive"),
                ("Bangladesh", "Neutral"),
                ("Russia", "Neutral"),
                ("USA", "Active Diplomacy"),
            ],
        );
        let result = run_seeded(&set, builtin_rules(), 500, 3).unwrap();
        assert_eq!(
            result.outcome_percentages,
            BTreeMap::from([("Status Quo / Frozen Conflict".to_string(), 100.0)])
        );
        assert_eq!(
            result.impact_percentages,
            BTreeMap::from([("Ongoing Humanitarian Needs".to_string(), 100.0)])
        );
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let model = ScenarioModel::myanmar();
        let set = uniform_set(&model);
        let sequential = run_seeded(&set, builtin_rules(), 1_003, 77).unwrap();

        for workers in [1, 2, 3, 8, 2_000] {
            let parallel = run_parallel(&set, builtin_rules(), 1_003, 77, workers).unwrap();
            assert_eq!(parallel, sequential, "workers = {workers}");
            assert_eq!(parallel.trials, sequential.trials, "workers = {workers}");
        }
    }

    #[test]
    fn test_tally_merge_is_order_independent() {
        let rules = builtin_rules();
        let a_label = &rules.rules()[0].classification;
        let b_label = &rules.rules()[4].classification;

        let mut a = Tally::new(rules.len());
        a.record(0, a_label);
        a.record(4, b_label);
        let mut b = Tally::new(rules.len());
        b.record(4, b_label);

        assert_eq!(a.clone().merge(b.clone()), b.merge(a));
    }

    #[test]
    fn test_ranked_order() {
        let model = ScenarioModel::myanmar();
        let result = run_seeded(&uniform_set(&model), builtin_rules(), 4_000, 5).unwrap();
        let ranked = result.outcomes_ranked();
        assert_eq!(ranked.len(), result.outcome_percentages.len());
        assert!(ranked.windows(2).all(|w| w[0].1 >= w[1].1));
        // Default covers most of the trial space under uniform draws
        assert_eq!(ranked[0].0, "Status Quo / Frozen Conflict");
    }

    #[test]
    fn test_mismatched_model_rejected() {
        let model = ScenarioModel::new(vec![crate::model::ActorDef::new("X", &["a"])]).unwrap();
        let set = DistributionSet::new(
            &model,
            vec![Distribution::degenerate(&model, ActorId(0), PostureId(0)).unwrap()],
        )
        .unwrap();
        assert!(matches!(
            run_seeded(&set, builtin_rules(), 10, 1),
            Err(ScenarioError::InvalidRuleTable(_))
        ));
    }
}
