use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::Result;
use crate::evaluators::Evaluator;
use crate::input::{Competitor, Run};
use crate::model::metrics::MetricResult;
use crate::network::ModelLoader;

/// Metrics of one successfully scored run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunMetrics {
    pub run: String,
    pub metrics: MetricResult,
}

/// Per-competitor, pre-aggregation results. Competitors without a single
/// scored run are absent.
pub type RunResults = BTreeMap<String, Vec<RunMetrics>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRun {
    pub competitor: String,
    pub run: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct Stage2Output {
    pub results: RunResults,
    pub skipped: Vec<SkippedRun>,
}

/// Loads and scores every run of every competitor in order. Artifact
/// failures skip the run; any other error ends the session.
pub fn validate_all(
    competitors: &[Competitor],
    loader: &dyn ModelLoader,
    evaluator: &dyn Evaluator,
) -> Result<Stage2Output> {
    let mut out = Stage2Output::default();

    for competitor in competitors {
        tracing::info!(
            competitor = %competitor.name,
            runs = competitor.runs.len(),
            evaluator = evaluator.name(),
            "evaluating"
        );
        let mut scored = Vec::with_capacity(competitor.runs.len());
        for run in &competitor.runs {
            match score_run(run, loader, evaluator) {
                Ok(metrics) => {
                    tracing::debug!(run = %run.name, ?metrics, "scored run");
                    scored.push(RunMetrics {
                        run: run.name.clone(),
                        metrics,
                    });
                }
                Err(err) if err.is_recoverable() => {
                    tracing::warn!("skipping {}/{}: {err}", competitor.name, run.name);
                    out.skipped.push(SkippedRun {
                        competitor: competitor.name.clone(),
                        run: run.name.clone(),
                        reason: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }

        if scored.is_empty() {
            tracing::warn!("no usable runs for {}, dropping it", competitor.name);
            continue;
        }
        out.results.insert(competitor.name.clone(), scored);
    }

    Ok(out)
}

fn score_run(run: &Run, loader: &dyn ModelLoader, evaluator: &dyn Evaluator) -> Result<MetricResult> {
    let mut model = loader.load(run)?;
    evaluator.evaluate(run, model.as_mut())
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage2_evaluate.rs"]
mod tests;
