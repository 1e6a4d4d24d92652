use crate::correlation::subspace_similarity;
use crate::error::{EvalError, Result};
use crate::evaluators::{Evaluator, run_batches};
use crate::input::Run;
use crate::input::dataset::{DataProvider, SyntheticData};
use crate::model::checkpoint::Checkpoint;
use crate::model::metrics::MetricResult;
use crate::network::accumulator::OutputSnapshot;
use crate::network::{CCA_VIEW_0, CCA_VIEW_1, CCOR, Mode, MultiViewModel, RRCCA_VIEW_0, RRCCA_VIEW_1};

/// Scores canonical variates against the known latent factors.
pub struct SyntheticEvaluator<'a> {
    data: &'a SyntheticData,
    checkpoint: Checkpoint,
}

impl<'a> SyntheticEvaluator<'a> {
    pub fn new(data: &'a SyntheticData, checkpoint: Checkpoint) -> Self {
        Self { data, checkpoint }
    }

    /// Fails on anything but `view0`, `view1`, `avg`, `latest`.
    pub fn from_selector(data: &'a SyntheticData, weights_to_load: &str) -> Result<Self> {
        Ok(Self::new(data, weights_to_load.parse()?))
    }

    pub fn checkpoint(&self) -> Checkpoint {
        self.checkpoint
    }

    fn compute_metrics(&self, output: &OutputSnapshot) -> Result<MetricResult> {
        let true_dim = self.data.true_dim;
        let ccor = output.vector(CCOR)?;
        let view_0 = output.matrix_any(&[CCA_VIEW_0, RRCCA_VIEW_0])?;
        let view_1 = output.matrix_any(&[CCA_VIEW_1, RRCCA_VIEW_1])?;
        if view_0.nrows() != self.data.ground_truth_v0.nrows() {
            return Err(EvalError::precondition(format!(
                "model produced {} samples but ground truth has {}",
                view_0.nrows(),
                self.data.ground_truth_v0.nrows()
            )));
        }

        let sim_v0 = subspace_similarity(&self.data.ground_truth_v0, view_0, true_dim)?;
        let sim_v1 = subspace_similarity(&self.data.ground_truth_v1, view_1, true_dim)?;
        let sim_avg = (&sim_v0 + &sim_v1) / 2.0;

        let mut metrics = MetricResult::new();
        metrics.vector("ccor", ccor.iter().copied());
        metrics.vector("sim_v0", sim_v0.iter().copied());
        metrics.vector("sim_v1", sim_v1.iter().copied());
        metrics.vector("sim_avg", sim_avg.iter().copied());
        Ok(metrics)
    }
}

impl Evaluator for SyntheticEvaluator<'_> {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn evaluate(&self, _run: &Run, model: &mut dyn MultiViewModel) -> Result<MetricResult> {
        model.restore(self.checkpoint)?;
        let (output, _) = run_batches(model, self.data.training_data(), Mode::Inference)?;
        self.compute_metrics(&output)
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/evaluators/synthetic.rs"]
mod tests;
