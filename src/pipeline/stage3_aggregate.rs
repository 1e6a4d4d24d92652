use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::error::{EvalError, Result};
use crate::model::metrics::MetricResult;
use crate::pipeline::stage2_evaluate::RunResults;

/// One aggregated row: flattened metric key to mean value, in the column
/// order of the competitor's first run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedRow {
    pub competitor: String,
    pub values: Vec<(String, f64)>,
}

impl AggregatedRow {
    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.iter().find(|(k, _)| k == key).map(|(_, v)| *v)
    }
}

#[derive(Debug, Clone)]
pub struct Stage3Output {
    pub rows: Vec<AggregatedRow>,
}

/// Per-competitor means; with `group_folds` the rows are then averaged again
/// per base configuration.
pub fn run_stage3(results: &RunResults, group_folds: bool) -> Result<Stage3Output> {
    let mut rows = aggregate_results(results)?;
    if group_folds {
        let n_before = rows.len();
        rows = aggregate_folds(rows)?;
        tracing::info!(
            competitors = n_before,
            configurations = rows.len(),
            "averaged folds per configuration"
        );
    }
    Ok(Stage3Output { rows })
}

pub fn aggregate_results(results: &RunResults) -> Result<Vec<AggregatedRow>> {
    let mut rows = Vec::with_capacity(results.len());
    for (competitor, runs) in results {
        let metrics: Vec<&MetricResult> = runs.iter().map(|r| &r.metrics).collect();
        if metrics.is_empty() {
            continue;
        }
        rows.push(AggregatedRow {
            competitor: competitor.clone(),
            values: aggregate_runs(competitor, &metrics)?,
        });
    }
    Ok(rows)
}

/// Mean of every flattened metric across `runs`. All runs must match the
/// first run's names, shape classes and vector lengths.
pub fn aggregate_runs(competitor: &str, runs: &[&MetricResult]) -> Result<Vec<(String, f64)>> {
    let Some(first) = runs.first() else {
        return Ok(Vec::new());
    };
    for (i, run) in runs.iter().enumerate().skip(1) {
        check_structure(competitor, first, run, i)?;
    }

    let columns = first.flatten();
    let flattened: Vec<BTreeMap<String, f64>> =
        runs.iter().map(|r| r.flatten().into_iter().collect()).collect();

    let mut out = Vec::with_capacity(columns.len());
    for (key, _) in columns {
        let values: Vec<f64> = flattened
            .iter()
            .filter_map(|m| m.get(&key).copied())
            .collect();
        out.push((key, order_free_mean(values)));
    }
    Ok(out)
}

fn check_structure(
    competitor: &str,
    first: &MetricResult,
    other: &MetricResult,
    index: usize,
) -> Result<()> {
    let mismatch = |detail: String| EvalError::StructureMismatch {
        competitor: competitor.to_string(),
        detail,
    };

    let expected: BTreeSet<&str> = first.names().collect();
    let found: BTreeSet<&str> = other.names().collect();
    if expected != found {
        return Err(mismatch(format!(
            "run {index} reports {found:?}, first run reports {expected:?}"
        )));
    }
    for (name, value) in first.iter() {
        let Some(other_value) = other.get(name) else {
            continue;
        };
        if !value.same_shape(other_value) {
            return Err(mismatch(format!(
                "metric {name} is {} in run {index} but {} in the first run",
                other_value.shape_name(),
                value.shape_name()
            )));
        }
    }
    Ok(())
}

/// Configuration a competitor belongs to: its name without the trailing
/// `_<suffix>` segment. Names without `_` are their own configuration.
pub fn base_configuration(name: &str) -> &str {
    match name.rfind('_') {
        Some(idx) => &name[..idx],
        None => name,
    }
}

/// Second-level mean across the rows sharing a base configuration.
pub fn aggregate_folds(rows: Vec<AggregatedRow>) -> Result<Vec<AggregatedRow>> {
    let mut groups: BTreeMap<String, Vec<AggregatedRow>> = BTreeMap::new();
    for row in rows {
        groups
            .entry(base_configuration(&row.competitor).to_string())
            .or_default()
            .push(row);
    }

    let mut out = Vec::with_capacity(groups.len());
    for (base, members) in groups {
        let Some(first) = members.first() else {
            continue;
        };
        let expected: BTreeSet<&str> = first.values.iter().map(|(k, _)| k.as_str()).collect();
        for member in &members[1..] {
            let found: BTreeSet<&str> = member.values.iter().map(|(k, _)| k.as_str()).collect();
            if found != expected {
                return Err(EvalError::StructureMismatch {
                    competitor: base.clone(),
                    detail: format!(
                        "{} reports {found:?}, {} reports {expected:?}",
                        member.competitor, first.competitor
                    ),
                });
            }
        }

        let values = first
            .values
            .iter()
            .map(|(key, _)| {
                let column: Vec<f64> = members.iter().filter_map(|m| m.get(key)).collect();
                (key.clone(), order_free_mean(column))
            })
            .collect();
        out.push(AggregatedRow {
            competitor: base,
            values,
        });
    }
    Ok(out)
}

/// Sums in sorted order so the result does not depend on run order.
fn order_free_mean(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.sort_by(f64::total_cmp);
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage3_aggregate.rs"]
mod tests;
