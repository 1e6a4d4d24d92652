use crate::error::{EvalError, Result};
use crate::evaluators::{Evaluator, run_batches};
use crate::input::Run;
use crate::input::dataset::DataProvider;
use crate::learn::accuracy;
use crate::learn::spectral::{SpectralParams, spectral_clustering};
use crate::model::metrics::MetricResult;
use crate::network::{LATENT_VIEW_0, Mode, MultiViewModel};

/// Clusters the first view's latent codes of the test data and scores the
/// majority-label assignment against the true labels.
pub struct ClusteringEvaluator<'a> {
    data: &'a dyn DataProvider,
    params: SpectralParams,
}

impl<'a> ClusteringEvaluator<'a> {
    pub fn new(data: &'a dyn DataProvider, params: SpectralParams) -> Self {
        Self { data, params }
    }
}

impl Evaluator for ClusteringEvaluator<'_> {
    fn name(&self) -> &'static str {
        "clustering"
    }

    fn evaluate(&self, _run: &Run, model: &mut dyn MultiViewModel) -> Result<MetricResult> {
        let (output, labels) = run_batches(model, self.data.test_data(), Mode::Inference)?;
        let latent = output.matrix(LATENT_VIEW_0)?;
        if labels.len() != latent.nrows() {
            return Err(EvalError::precondition(format!(
                "test data has {} labels for {} samples",
                labels.len(),
                latent.nrows()
            )));
        }

        let clusters = spectral_clustering(latent, &self.params)?;
        let prediction = majority_label_prediction(&clusters, &labels, self.params.n_clusters);

        let mut metrics = MetricResult::new();
        metrics.scalar("accuracy", accuracy(&prediction, &labels));
        Ok(metrics)
    }
}

/// Relabels every sample with the most frequent true label of its cluster.
/// Ties go to the label seen first within the cluster.
pub fn majority_label_prediction(clusters: &[usize], labels: &[usize], n_clusters: usize) -> Vec<usize> {
    let mut counts: Vec<Vec<(usize, usize)>> = vec![Vec::new(); n_clusters];
    for (&c, &l) in clusters.iter().zip(labels.iter()) {
        let seen = &mut counts[c];
        match seen.iter_mut().find(|(label, _)| *label == l) {
            Some(entry) => entry.1 += 1,
            None => seen.push((l, 1)),
        }
    }

    let majority: Vec<Option<usize>> = counts
        .iter()
        .map(|seen| {
            let mut best: Option<(usize, usize)> = None;
            for &(label, count) in seen {
                if best.is_none_or(|(_, c)| count > c) {
                    best = Some((label, count));
                }
            }
            best.map(|(label, _)| label)
        })
        .collect();

    clusters
        .iter()
        .zip(labels.iter())
        .map(|(&c, &l)| majority[c].unwrap_or(l))
        .collect()
}

#[cfg(test)]
#[path = "../../tests/src_inline/evaluators/clustering.rs"]
mod tests;
