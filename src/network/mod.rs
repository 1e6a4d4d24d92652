//! Trained two-view encoder collaborator: the model interface, its output
//! tensors, and the per-evaluation output accumulator.

use std::collections::BTreeMap;

use nalgebra::{DMatrix, DVector};

use crate::error::Result;
use crate::input::Run;
use crate::input::dataset::Batch;
use crate::model::checkpoint::Checkpoint;

pub mod accumulator;
pub mod artifact;
pub mod encoder;

pub const LATENT_VIEW_0: &str = "latent_view_0";
pub const LATENT_VIEW_1: &str = "latent_view_1";
pub const CCA_VIEW_0: &str = "cca_view_0";
pub const CCA_VIEW_1: &str = "cca_view_1";
pub const RRCCA_VIEW_0: &str = "rrcca_view_0";
pub const RRCCA_VIEW_1: &str = "rrcca_view_1";
pub const CCOR: &str = "ccor";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Training,
    Inference,
}

/// Per-sample outputs are `Matrix` (`n_samples x k`); per-batch statistics
/// such as `ccor` are `Vector`.
#[derive(Debug, Clone, PartialEq)]
pub enum Tensor {
    Matrix(DMatrix<f64>),
    Vector(DVector<f64>),
}

pub type NetworkOutput = BTreeMap<String, Tensor>;

pub trait MultiViewModel {
    fn forward(&mut self, batch: &Batch, mode: Mode) -> Result<NetworkOutput>;

    fn restore(&mut self, checkpoint: Checkpoint) -> Result<()>;
}

/// Turns a run directory into a model. Failures are `ArtifactLoad` errors.
pub trait ModelLoader {
    fn load(&self, run: &Run) -> Result<Box<dyn MultiViewModel>>;
}
