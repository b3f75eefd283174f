//! Result Exporter (CSV)
//!
//! Raw table: one row per trial, actor columns in model order followed by
//! `Outcome` and `Humanitarian Impact`. [`parse_table`] reads the same
//! layout back.
//!
//! Summary table: `Category,Label,Count,Percent` rows for outcomes, impacts
//! and rules.

use std::io::{Read, Write};

use crate::aggregate::AggregateResult;
use crate::error::{Result, ScenarioError};
use crate::model::{ActorId, ClassifiedTrial, ScenarioModel, Trial};

pub const OUTCOME_COLUMN: &str = "Outcome";
pub const IMPACT_COLUMN: &str = "Humanitarian Impact";

/// File name offered for the raw table download.
pub const DEFAULT_EXPORT_FILE: &str = "myanmar_simulation.csv";

/// `Actor1,...,ActorK,Outcome,Humanitarian Impact`
pub fn header(model: &ScenarioModel) -> Vec<&str> {
    model
        .actors()
        .iter()
        .map(|a| a.name.as_str())
        .chain([OUTCOME_COLUMN, IMPACT_COLUMN])
        .collect()
}

pub fn write_table<W: Write>(
    model: &ScenarioModel,
    trials: &[ClassifiedTrial],
    writer: W,
) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(header(model))?;

    for record in trials {
        let mut row = record.trial.labels(model);
        row.push(record.outcome.as_str());
        row.push(record.impact.as_str());
        csv.write_record(&row)?;
    }

    csv.flush()?;
    Ok(())
}

/// Raw per-trial table as CSV bytes.
pub fn to_table(model: &ScenarioModel, result: &AggregateResult) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_table(model, &result.trials, &mut buf)?;
    Ok(buf)
}

/// Read a raw table written by [`write_table`].
pub fn parse_table<R: Read>(model: &ScenarioModel, reader: R) -> Result<Vec<ClassifiedTrial>> {
    let mut csv = csv::Reader::from_reader(reader);

    let expected = header(model);
    let found = csv.headers()?.clone();
    if found.iter().ne(expected.iter().copied()) {
        return Err(ScenarioError::TableFormat(format!(
            "expected header '{}', found '{}'",
            expected.join(","),
            found.iter().collect::<Vec<_>>().join(",")
        )));
    }

    let actor_count = model.len();
    let mut trials = Vec::new();
    for (row, record) in csv.records().enumerate() {
        let record = record?;
        if record.len() != actor_count + 2 {
            return Err(ScenarioError::TableFormat(format!(
                "row {} has {} fields, expected {}",
                row + 1,
                record.len(),
                actor_count + 2
            )));
        }

        let postures = (0..actor_count)
            .map(|i| model.posture_id(ActorId(i), &record[i]))
            .collect::<Result<Vec<_>>>()?;

        trials.push(ClassifiedTrial {
            trial: Trial::new(postures),
            outcome: record[actor_count].to_string(),
            impact: record[actor_count + 1].to_string(),
        });
    }

    Ok(trials)
}

/// Aggregate summary as CSV bytes.
pub fn summary_table(result: &AggregateResult) -> Result<Vec<u8>> {
    let mut csv = csv::Writer::from_writer(Vec::new());
    csv.write_record(["Category", "Label", "Count", "Percent"])?;

    for (label, pct) in result.outcomes_ranked() {
        let count = result.outcome_counts.get(label).copied().unwrap_or(0);
        csv.write_record([
            OUTCOME_COLUMN,
            label,
            count.to_string().as_str(),
            format!("{pct:.2}").as_str(),
        ])?;
    }
    for (label, pct) in result.impacts_ranked() {
        let count = result.impact_counts.get(label).copied().unwrap_or(0);
        csv.write_record([
            IMPACT_COLUMN,
            label,
            count.to_string().as_str(),
            format!("{pct:.2}").as_str(),
        ])?;
    }
    for hit in &result.rule_hits {
        csv.write_record([
            "Rule",
            hit.rule.as_str(),
            hit.count.to_string().as_str(),
            format!("{:.2}", hit.percent).as_str(),
        ])?;
    }

    csv.into_inner().map_err(|e| ScenarioError::Io(e.into_error()))
}
