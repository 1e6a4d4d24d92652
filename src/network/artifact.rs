use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::correlation::{canonical_correlation, cca_fit, center_columns, orthonormal_projection};
use crate::error::{EvalError, Result};
use crate::input::Run;
use crate::input::dataset::Batch;
use crate::model::checkpoint::Checkpoint;
use crate::network::encoder::DenseEncoder;
use crate::network::{
    CCA_VIEW_0, CCA_VIEW_1, CCOR, LATENT_VIEW_0, LATENT_VIEW_1, Mode, ModelLoader,
    MultiViewModel, NetworkOutput, RRCCA_VIEW_0, RRCCA_VIEW_1, Tensor,
};

pub const MODEL_FILE: &str = "model.json";

/// Projection state of a CCA head, refreshed on every training-mode pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CcaState {
    pub mean_v0: Vec<f64>,
    pub mean_v1: Vec<f64>,
    #[serde(with = "crate::input::rows")]
    pub b1: DMatrix<f64>,
    #[serde(with = "crate::input::rows")]
    pub b2: DMatrix<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Head {
    Cca {
        cca_reg: f64,
        num_shared_dim: usize,
        state: CcaState,
    },
    ResidualSlack {
        corr_reg: f64,
        num_shared_dim: usize,
        #[serde(with = "crate::input::rows")]
        ax: DMatrix<f64>,
        #[serde(with = "crate::input::rows")]
        ay: DMatrix<f64>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelWeights {
    pub encoder_v0: DenseEncoder,
    pub encoder_v1: DenseEncoder,
    pub head: Head,
}

impl ModelWeights {
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.encoder_v0
            .validate()
            .map_err(|e| format!("encoder_v0: {e}"))?;
        self.encoder_v1
            .validate()
            .map_err(|e| format!("encoder_v1: {e}"))?;
        let out0 = self.encoder_v0.output_dim().unwrap_or(0);
        let out1 = self.encoder_v1.output_dim().unwrap_or(0);

        let (k, p0, p1) = match &self.head {
            Head::Cca {
                num_shared_dim,
                state,
                ..
            } => {
                if state.mean_v0.len() != out0 || state.mean_v1.len() != out1 {
                    return Err("cca state means do not match encoder widths".to_string());
                }
                (*num_shared_dim, &state.b1, &state.b2)
            }
            Head::ResidualSlack {
                num_shared_dim,
                ax,
                ay,
                ..
            } => (*num_shared_dim, ax, ay),
        };
        if k == 0 {
            return Err("num_shared_dim must be >= 1".to_string());
        }
        if p0.shape() != (k, out0) || p1.shape() != (k, out1) {
            return Err(format!(
                "head projections are {:?} and {:?}, expected ({k}, {out0}) and ({k}, {out1})",
                p0.shape(),
                p1.shape()
            ));
        }
        Ok(())
    }
}

pub fn read_weights(path: &Path) -> Result<ModelWeights> {
    let file = File::open(path).map_err(|e| EvalError::artifact(path, e))?;
    let weights: ModelWeights =
        serde_json::from_reader(BufReader::new(file)).map_err(|e| EvalError::artifact(path, e))?;
    weights.validate().map_err(|e| EvalError::artifact(path, e))?;
    Ok(weights)
}

/// Dense two-view encoder with a CCA or residual-slack head.
#[derive(Debug, Clone)]
pub struct TwoViewEncoder {
    dir: PathBuf,
    weights: ModelWeights,
}

impl TwoViewEncoder {
    pub fn new(dir: PathBuf, weights: ModelWeights) -> Self {
        Self { dir, weights }
    }

    pub fn weights(&self) -> &ModelWeights {
        &self.weights
    }

    fn encode(&self, batch: &Batch) -> Result<(DMatrix<f64>, DMatrix<f64>)> {
        batch.validate()?;
        for (view, enc, x) in [
            (0, &self.weights.encoder_v0, &batch.view_0),
            (1, &self.weights.encoder_v1, &batch.view_1),
        ] {
            if enc.input_dim() != Some(x.ncols()) {
                return Err(EvalError::precondition(format!(
                    "view {view} has {} features but encoder expects {:?}",
                    x.ncols(),
                    enc.input_dim()
                )));
            }
        }
        Ok((
            self.weights.encoder_v0.forward(&batch.view_0),
            self.weights.encoder_v1.forward(&batch.view_1),
        ))
    }
}

impl MultiViewModel for TwoViewEncoder {
    fn forward(&mut self, batch: &Batch, mode: Mode) -> Result<NetworkOutput> {
        let (latent_0, latent_1) = self.encode(batch)?;
        let mut out = NetworkOutput::new();

        match &mut self.weights.head {
            Head::Cca {
                cca_reg,
                num_shared_dim,
                state,
            } => {
                let fitted = if mode == Mode::Training {
                    let fit = cca_fit(&latent_0, &latent_1, *num_shared_dim, *cca_reg)?;
                    state.mean_v0 = fit.mean_x.iter().copied().collect();
                    state.mean_v1 = fit.mean_y.iter().copied().collect();
                    state.b1 = fit.proj_x;
                    state.b2 = fit.proj_y;
                    Some(fit.correlations)
                } else {
                    None
                };
                let epsilon = project(&latent_0, &state.mean_v0, &state.b1);
                let omega = project(&latent_1, &state.mean_v1, &state.b2);
                let ccor = fitted.unwrap_or_else(|| paired_mean_products(&epsilon, &omega));
                out.insert(CCA_VIEW_0.to_string(), Tensor::Matrix(epsilon));
                out.insert(CCA_VIEW_1.to_string(), Tensor::Matrix(omega));
                out.insert(CCOR.to_string(), Tensor::Vector(ccor));
            }
            Head::ResidualSlack {
                corr_reg,
                num_shared_dim,
                ax,
                ay,
            } => {
                let data_0 = orthonormal_projection(&(&latent_0 * ax.transpose()))?;
                let data_1 = orthonormal_projection(&(&latent_1 * ay.transpose()))?;
                let ccor = canonical_correlation(&data_0, &data_1, *num_shared_dim, *corr_reg)?;
                out.insert(RRCCA_VIEW_0.to_string(), Tensor::Matrix(data_0));
                out.insert(RRCCA_VIEW_1.to_string(), Tensor::Matrix(data_1));
                out.insert(CCOR.to_string(), Tensor::Vector(ccor));
            }
        }

        out.insert(LATENT_VIEW_0.to_string(), Tensor::Matrix(latent_0));
        out.insert(LATENT_VIEW_1.to_string(), Tensor::Matrix(latent_1));
        Ok(out)
    }

    fn restore(&mut self, checkpoint: Checkpoint) -> Result<()> {
        let path = self.dir.join(checkpoint.file_name());
        if checkpoint == Checkpoint::Latest && !path.exists() {
            // model.json already holds the final weights.
            tracing::debug!(
                "no {} in {}, keeping saved weights",
                checkpoint.file_name(),
                self.dir.display()
            );
            return Ok(());
        }
        self.weights = read_weights(&path)?;
        Ok(())
    }
}

/// Canonical variates `(x - mean) Bᵀ`, `n x k`.
fn project(x: &DMatrix<f64>, mean: &[f64], b: &DMatrix<f64>) -> DMatrix<f64> {
    center_columns(x, &DVector::from_column_slice(mean)) * b.transpose()
}

fn paired_mean_products(a: &DMatrix<f64>, b: &DMatrix<f64>) -> DVector<f64> {
    let m = a.nrows().max(1) as f64;
    DVector::from_iterator(
        a.ncols(),
        (0..a.ncols()).map(|i| a.column(i).dot(&b.column(i)) / m),
    )
}

/// Loads `<run>/model.json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsModelLoader;

impl ModelLoader for FsModelLoader {
    fn load(&self, run: &Run) -> Result<Box<dyn MultiViewModel>> {
        if !run.path.is_dir() {
            return Err(EvalError::artifact(&run.path, "run directory is missing"));
        }
        let weights = read_weights(&run.path.join(MODEL_FILE))?;
        Ok(Box::new(TwoViewEncoder::new(run.path.clone(), weights)))
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/network/artifact.rs"]
mod tests;
