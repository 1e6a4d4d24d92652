use crate::error::{EvalError, Result};
use crate::evaluators::{Evaluator, run_batches};
use crate::input::Run;
use crate::input::dataset::{DataProvider, FoldedData};
use crate::learn::accuracy;
use crate::learn::svm::{LinearSvm, SvmParams};
use crate::model::metrics::MetricResult;
use crate::network::{LATENT_VIEW_1, Mode, MultiViewModel};

/// Cross-validated linear read-out of the second view's latent codes. The
/// fold comes from the run name.
pub struct SignalEvaluator<'a> {
    data: &'a FoldedData,
    params: SvmParams,
}

impl<'a> SignalEvaluator<'a> {
    pub fn new(data: &'a FoldedData, params: SvmParams) -> Self {
        Self { data, params }
    }
}

impl Evaluator for SignalEvaluator<'_> {
    fn name(&self) -> &'static str {
        "signal"
    }

    fn evaluate(&self, run: &Run, model: &mut dyn MultiViewModel) -> Result<MetricResult> {
        let fold = run.fold().ok_or_else(|| {
            EvalError::precondition(format!(
                "run {} has no trailing fold index",
                run.path.display()
            ))
        })?;
        let split = self.data.split(fold)?;

        let (train_out, train_labels) =
            run_batches(model, split.training_data(), Mode::Inference)?;
        let train_latent = train_out.matrix(LATENT_VIEW_1)?;
        let svm = LinearSvm::fit(train_latent, &train_labels, &self.params)?;

        let (test_out, test_labels) = run_batches(model, split.test_data(), Mode::Inference)?;
        let test_latent = test_out.matrix(LATENT_VIEW_1)?;
        if test_labels.len() != test_latent.nrows() {
            return Err(EvalError::precondition(format!(
                "fold {fold} test split has {} labels for {} samples",
                test_labels.len(),
                test_latent.nrows()
            )));
        }
        let predictions = svm.predict(test_latent)?;
        tracing::debug!(fold, n_test = test_labels.len(), "scored held-out split");

        let mut metrics = MetricResult::new();
        metrics.scalar("accuracy", accuracy(&predictions, &test_labels));
        Ok(metrics)
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/evaluators/signal.rs"]
mod tests;
