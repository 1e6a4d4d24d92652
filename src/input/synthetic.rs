use nalgebra::DMatrix;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::{EvalError, Result};
use crate::input::dataset::{Batch, Dataset, SyntheticData};

#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub n_train: usize,
    pub n_test: usize,
    pub batch_size: usize,
    pub true_dim: usize,
    pub private_dim: usize,
    pub view_dims: [usize; 2],
    pub noise: f64,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            n_train: 1000,
            n_test: 200,
            batch_size: 250,
            true_dim: 2,
            private_dim: 2,
            view_dims: [8, 8],
            noise: 0.05,
            seed: 42,
        }
    }
}

/// Two views mixed linearly from latent factors `z_v = [shared | private_v]`.
/// The label of a sample is the sign of its first shared factor.
pub fn generate_synthetic(cfg: &SyntheticConfig) -> Result<SyntheticData> {
    if cfg.true_dim == 0 {
        return Err(EvalError::precondition("true_dim must be >= 1".to_string()));
    }
    if cfg.batch_size == 0 || cfg.n_train == 0 {
        return Err(EvalError::precondition(
            "n_train and batch_size must be >= 1".to_string(),
        ));
    }
    if cfg.view_dims.contains(&0) {
        return Err(EvalError::precondition(
            "view dimensions must be >= 1".to_string(),
        ));
    }
    if !(cfg.noise.is_finite() && cfg.noise >= 0.0) {
        return Err(EvalError::precondition(format!(
            "noise must be a finite value >= 0, got {}",
            cfg.noise
        )));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed);
    let latent_dim = cfg.true_dim + cfg.private_dim;
    let mixing = [
        uniform_matrix(&mut rng, latent_dim, cfg.view_dims[0], 1.0),
        uniform_matrix(&mut rng, latent_dim, cfg.view_dims[1], 1.0),
    ];

    let train = sample_split(&mut rng, cfg, latent_dim, &mixing, cfg.n_train);
    let test = sample_split(&mut rng, cfg, latent_dim, &mixing, cfg.n_test);

    Ok(SyntheticData {
        data: Dataset {
            training: train.batches,
            test: test.batches,
            num_classes: Some(2),
        },
        ground_truth_v0: train.latents[0].clone(),
        ground_truth_v1: train.latents[1].clone(),
        true_dim: cfg.true_dim,
    })
}

struct Split {
    batches: Vec<Batch>,
    latents: [DMatrix<f64>; 2],
}

fn sample_split(
    rng: &mut ChaCha8Rng,
    cfg: &SyntheticConfig,
    latent_dim: usize,
    mixing: &[DMatrix<f64>; 2],
    n: usize,
) -> Split {
    // Uniform on [-sqrt(3), sqrt(3)] has unit variance.
    let unit = 3f64.sqrt();
    let shared = uniform_matrix(rng, n, cfg.true_dim, unit);
    let mut latents = [
        DMatrix::zeros(n, latent_dim),
        DMatrix::zeros(n, latent_dim),
    ];
    for z in latents.iter_mut() {
        let private = uniform_matrix(rng, n, cfg.private_dim, unit);
        z.columns_mut(0, cfg.true_dim).copy_from(&shared);
        z.columns_mut(cfg.true_dim, cfg.private_dim).copy_from(&private);
    }

    let views: Vec<DMatrix<f64>> = (0..2)
        .map(|v| {
            let noise = uniform_matrix(rng, n, cfg.view_dims[v], unit * cfg.noise);
            &latents[v] * &mixing[v] + noise
        })
        .collect();
    let labels: Vec<usize> = (0..n).map(|i| usize::from(shared[(i, 0)] > 0.0)).collect();

    let mut batches = Vec::new();
    let mut start = 0;
    while start < n {
        let len = cfg.batch_size.min(n - start);
        batches.push(Batch {
            view_0: views[0].rows(start, len).into_owned(),
            view_1: views[1].rows(start, len).into_owned(),
            labels: labels[start..start + len].to_vec(),
        });
        start += len;
    }

    Split { batches, latents }
}

fn uniform_matrix(rng: &mut ChaCha8Rng, rows: usize, cols: usize, half_width: f64) -> DMatrix<f64> {
    if half_width == 0.0 {
        return DMatrix::zeros(rows, cols);
    }
    DMatrix::from_fn(rows, cols, |_, _| rng.gen_range(-half_width..half_width))
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/synthetic.rs"]
mod tests;
