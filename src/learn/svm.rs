use nalgebra::{DMatrix, DVector};
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::error::{EvalError, Result};

#[derive(Debug, Clone, Copy)]
pub struct SvmParams {
    pub c: f64,
    pub max_iter: usize,
    pub tol: f64,
    pub seed: u64,
}

impl Default for SvmParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 1000,
            tol: 1e-4,
            seed: 333,
        }
    }
}

/// One-vs-rest linear SVM (squared hinge loss, L2 penalty) trained by dual
/// coordinate descent. Each weight vector carries the bias as its last entry.
#[derive(Debug, Clone)]
pub struct LinearSvm {
    classes: Vec<usize>,
    weights: Vec<DVector<f64>>,
}

impl LinearSvm {
    pub fn fit(x: &DMatrix<f64>, y: &[usize], params: &SvmParams) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(EvalError::precondition(format!(
                "SVM got {} samples but {} labels",
                x.nrows(),
                y.len()
            )));
        }
        if y.is_empty() {
            return Err(EvalError::precondition(
                "SVM needs at least one training sample".to_string(),
            ));
        }
        if !(params.c.is_finite() && params.c > 0.0) {
            return Err(EvalError::precondition(format!(
                "SVM C must be > 0, got {}",
                params.c
            )));
        }

        let mut classes = y.to_vec();
        classes.sort_unstable();
        classes.dedup();

        let xa = augment(x);
        let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
        let weights = match classes.len() {
            1 => Vec::new(),
            2 => {
                let signs: Vec<f64> = y
                    .iter()
                    .map(|l| if *l == classes[1] { 1.0 } else { -1.0 })
                    .collect();
                vec![dual_cd(&xa, &signs, params, &mut rng)]
            }
            _ => classes
                .iter()
                .map(|class| {
                    let signs: Vec<f64> = y
                        .iter()
                        .map(|l| if l == class { 1.0 } else { -1.0 })
                        .collect();
                    dual_cd(&xa, &signs, params, &mut rng)
                })
                .collect(),
        };
        Ok(Self { classes, weights })
    }

    pub fn classes(&self) -> &[usize] {
        &self.classes
    }

    pub fn predict(&self, x: &DMatrix<f64>) -> Result<Vec<usize>> {
        let expected = self.weights.first().map(|w| w.len() - 1);
        if let Some(d) = expected.filter(|d| *d != x.ncols()) {
            return Err(EvalError::precondition(format!(
                "SVM trained on {d} features, got {}",
                x.ncols()
            )));
        }
        let xa = augment(x);
        let scores: Vec<DVector<f64>> = self.weights.iter().map(|w| &xa * w).collect();
        let out = (0..x.nrows())
            .map(|i| match self.classes.len() {
                1 => self.classes[0],
                2 => {
                    if scores[0][i] > 0.0 {
                        self.classes[1]
                    } else {
                        self.classes[0]
                    }
                }
                _ => {
                    let mut best = 0;
                    for c in 1..scores.len() {
                        if scores[c][i] > scores[best][i] {
                            best = c;
                        }
                    }
                    self.classes[best]
                }
            })
            .collect();
        Ok(out)
    }
}

fn augment(x: &DMatrix<f64>) -> DMatrix<f64> {
    let mut xa = DMatrix::from_element(x.nrows(), x.ncols() + 1, 1.0);
    xa.columns_mut(0, x.ncols()).copy_from(x);
    xa
}

/// Dual coordinate descent for the L2-loss SVM: box `[0, inf)`, diagonal
/// shift `1 / (2C)`.
fn dual_cd(x: &DMatrix<f64>, y: &[f64], params: &SvmParams, rng: &mut ChaCha8Rng) -> DVector<f64> {
    let n = x.nrows();
    let diag = 0.5 / params.c;
    let q_ii: Vec<f64> = (0..n).map(|i| x.row(i).norm_squared() + diag).collect();
    let mut alpha = vec![0.0; n];
    let mut w = DVector::zeros(x.ncols());
    let mut order: Vec<usize> = (0..n).collect();

    for _ in 0..params.max_iter {
        order.shuffle(rng);
        let mut pg_max = f64::NEG_INFINITY;
        let mut pg_min = f64::INFINITY;
        for &i in &order {
            let xi = x.row(i);
            let g = y[i] * xi.dot(&w.transpose()) - 1.0 + diag * alpha[i];
            let pg = if alpha[i] == 0.0 { g.min(0.0) } else { g };
            pg_max = pg_max.max(pg);
            pg_min = pg_min.min(pg);
            if pg.abs() > 1e-12 {
                let old = alpha[i];
                alpha[i] = (old - g / q_ii[i]).max(0.0);
                let step = (alpha[i] - old) * y[i];
                w += xi.transpose() * step;
            }
        }
        if pg_max - pg_min <= params.tol {
            break;
        }
    }
    w
}

#[cfg(test)]
#[path = "../../tests/src_inline/learn/svm.rs"]
mod tests;
