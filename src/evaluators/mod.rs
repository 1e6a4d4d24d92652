//! Per-run scoring. Each variant turns one loaded model into a
//! `MetricResult`; the session loop in `pipeline::stage2_evaluate` is shared.

use crate::error::Result;
use crate::input::Run;
use crate::input::dataset::Batch;
use crate::model::metrics::MetricResult;
use crate::network::accumulator::{OutputAccumulator, OutputSnapshot};
use crate::network::{Mode, MultiViewModel};

pub mod clustering;
pub mod signal;
pub mod synthetic;

pub use clustering::ClusteringEvaluator;
pub use signal::SignalEvaluator;
pub use synthetic::SyntheticEvaluator;

pub trait Evaluator {
    fn name(&self) -> &'static str;

    fn evaluate(&self, run: &Run, model: &mut dyn MultiViewModel) -> Result<MetricResult>;
}

pub enum EvaluatorKind<'a> {
    Synthetic(SyntheticEvaluator<'a>),
    Clustering(ClusteringEvaluator<'a>),
    Signal(SignalEvaluator<'a>),
}

impl Evaluator for EvaluatorKind<'_> {
    fn name(&self) -> &'static str {
        match self {
            EvaluatorKind::Synthetic(e) => e.name(),
            EvaluatorKind::Clustering(e) => e.name(),
            EvaluatorKind::Signal(e) => e.name(),
        }
    }

    fn evaluate(&self, run: &Run, model: &mut dyn MultiViewModel) -> Result<MetricResult> {
        match self {
            EvaluatorKind::Synthetic(e) => e.evaluate(run, model),
            EvaluatorKind::Clustering(e) => e.evaluate(run, model),
            EvaluatorKind::Signal(e) => e.evaluate(run, model),
        }
    }
}

/// Feeds every batch through `model` and returns the accumulated outputs
/// together with the concatenated labels.
pub fn run_batches(
    model: &mut dyn MultiViewModel,
    batches: &[Batch],
    mode: Mode,
) -> Result<(OutputSnapshot, Vec<usize>)> {
    let mut acc = OutputAccumulator::new();
    let mut labels = Vec::new();
    for batch in batches {
        let output = model.forward(batch, mode)?;
        acc.update(output, batch.len())?;
        labels.extend_from_slice(&batch.labels);
    }
    Ok((acc.finalize(), labels))
}
