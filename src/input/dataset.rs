use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use nalgebra::DMatrix;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};

/// One labelled batch of paired samples; row `i` of both views is sample `i`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    #[serde(with = "crate::input::rows")]
    pub view_0: DMatrix<f64>,
    #[serde(with = "crate::input::rows")]
    pub view_1: DMatrix<f64>,
    #[serde(default)]
    pub labels: Vec<usize>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.view_0.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn validate(&self) -> Result<()> {
        if self.view_0.nrows() != self.view_1.nrows() {
            return Err(EvalError::precondition(format!(
                "batch views disagree on sample count ({} vs {})",
                self.view_0.nrows(),
                self.view_1.nrows()
            )));
        }
        if !self.labels.is_empty() && self.labels.len() != self.len() {
            return Err(EvalError::precondition(format!(
                "batch has {} samples but {} labels",
                self.len(),
                self.labels.len()
            )));
        }
        Ok(())
    }
}

/// Held-out data collaborator. Slices are re-iterable, so every evaluation
/// sees the full sequence from the start.
pub trait DataProvider {
    fn training_data(&self) -> &[Batch];
    fn test_data(&self) -> &[Batch];
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub training: Vec<Batch>,
    #[serde(default)]
    pub test: Vec<Batch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_classes: Option<usize>,
}

impl Dataset {
    /// Declared class count, or one past the largest label seen.
    pub fn num_classes(&self) -> usize {
        if let Some(n) = self.num_classes {
            return n;
        }
        self.training
            .iter()
            .chain(self.test.iter())
            .flat_map(|b| b.labels.iter().copied())
            .max()
            .map(|m| m + 1)
            .unwrap_or(0)
    }

    pub fn validate(&self) -> Result<()> {
        for batch in self.training.iter().chain(self.test.iter()) {
            batch.validate()?;
        }
        Ok(())
    }
}

impl DataProvider for Dataset {
    fn training_data(&self) -> &[Batch] {
        &self.training
    }

    fn test_data(&self) -> &[Batch] {
        &self.test
    }
}

/// Synthetic data with the known latent factors behind each view.
///
/// `ground_truth_v*` rows line up with the concatenated training batches; the
/// first `true_dim` columns are the factors shared by both views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticData {
    #[serde(flatten)]
    pub data: Dataset,
    #[serde(with = "crate::input::rows")]
    pub ground_truth_v0: DMatrix<f64>,
    #[serde(with = "crate::input::rows")]
    pub ground_truth_v1: DMatrix<f64>,
    pub true_dim: usize,
}

impl SyntheticData {
    pub fn validate(&self) -> Result<()> {
        self.data.validate()?;
        let n_train: usize = self.data.training.iter().map(Batch::len).sum();
        for (name, gt) in [
            ("ground_truth_v0", &self.ground_truth_v0),
            ("ground_truth_v1", &self.ground_truth_v1),
        ] {
            if gt.nrows() != n_train {
                return Err(EvalError::precondition(format!(
                    "{name} has {} rows but training data has {n_train} samples",
                    gt.nrows()
                )));
            }
            if self.true_dim == 0 || self.true_dim > gt.ncols() {
                return Err(EvalError::precondition(format!(
                    "true_dim {} out of range for {name} with {} columns",
                    self.true_dim,
                    gt.ncols()
                )));
            }
        }
        Ok(())
    }
}

impl DataProvider for SyntheticData {
    fn training_data(&self) -> &[Batch] {
        &self.data.training
    }

    fn test_data(&self) -> &[Batch] {
        &self.data.test
    }
}

/// Cross-validation splits keyed by fold index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FoldedData {
    pub folds: BTreeMap<usize, Dataset>,
}

impl FoldedData {
    pub fn split(&self, fold: usize) -> Result<&Dataset> {
        self.folds.get(&fold).ok_or_else(|| {
            EvalError::precondition(format!(
                "fold {fold} not present in data (available: {:?})",
                self.folds.keys().collect::<Vec<_>>()
            ))
        })
    }

    pub fn validate(&self) -> Result<()> {
        for dataset in self.folds.values() {
            dataset.validate()?;
        }
        Ok(())
    }
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/dataset.rs"]
mod tests;
