use nalgebra::DMatrix;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::{EvalError, Result};

#[derive(Debug, Clone, Copy)]
pub struct KMeansParams {
    pub n_clusters: usize,
    pub n_init: usize,
    pub max_iter: usize,
    pub tol: f64,
    pub seed: u64,
}

impl KMeansParams {
    pub fn new(n_clusters: usize, seed: u64) -> Self {
        Self {
            n_clusters,
            n_init: 10,
            max_iter: 300,
            tol: 1e-4,
            seed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct KMeansFit {
    pub labels: Vec<usize>,
    pub centroids: DMatrix<f64>,
    pub inertia: f64,
}

/// Lloyd's k-means with k-means++ seeding. Restarts draw from one seeded
/// stream; the lowest-inertia restart wins (first on ties).
pub fn kmeans(data: &DMatrix<f64>, params: &KMeansParams) -> Result<KMeansFit> {
    let n = data.nrows();
    let k = params.n_clusters;
    if k == 0 || n < k {
        return Err(EvalError::precondition(format!(
            "k-means needs 1 <= n_clusters <= n_samples, got {k} clusters for {n} samples"
        )));
    }
    let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
    let mut best: Option<KMeansFit> = None;
    for _ in 0..params.n_init.max(1) {
        let init = plus_plus_init(data, k, &mut rng);
        let fit = lloyd(data, init, params);
        if best.as_ref().is_none_or(|b| fit.inertia < b.inertia) {
            best = Some(fit);
        }
    }
    best.ok_or_else(|| EvalError::precondition("k-means produced no fit".to_string()))
}

fn sq_dist(data: &DMatrix<f64>, i: usize, centroids: &DMatrix<f64>, c: usize) -> f64 {
    data.row(i)
        .iter()
        .zip(centroids.row(c).iter())
        .map(|(a, b)| (a - b) * (a - b))
        .sum()
}

fn plus_plus_init(data: &DMatrix<f64>, k: usize, rng: &mut ChaCha8Rng) -> DMatrix<f64> {
    let n = data.nrows();
    let mut centroids = DMatrix::zeros(k, data.ncols());
    let first = rng.gen_range(0..n);
    centroids.row_mut(0).copy_from(&data.row(first));

    let mut closest: Vec<f64> = (0..n).map(|i| sq_dist(data, i, &centroids, 0)).collect();
    for c in 1..k {
        let total: f64 = closest.iter().sum();
        let pick = if total > 0.0 {
            let mut target = rng.gen_range(0.0..total);
            let mut chosen = n - 1;
            for (i, d) in closest.iter().enumerate() {
                if target < *d {
                    chosen = i;
                    break;
                }
                target -= d;
            }
            chosen
        } else {
            rng.gen_range(0..n)
        };
        centroids.row_mut(c).copy_from(&data.row(pick));
        for (i, d) in closest.iter_mut().enumerate() {
            *d = d.min(sq_dist(data, i, &centroids, c));
        }
    }
    centroids
}

fn assign(data: &DMatrix<f64>, centroids: &DMatrix<f64>, labels: &mut [usize]) -> f64 {
    let mut inertia = 0.0;
    for (i, label) in labels.iter_mut().enumerate() {
        let mut best_c = 0;
        let mut best_d = f64::INFINITY;
        for c in 0..centroids.nrows() {
            let d = sq_dist(data, i, centroids, c);
            if d < best_d {
                best_d = d;
                best_c = c;
            }
        }
        *label = best_c;
        inertia += best_d;
    }
    inertia
}

fn lloyd(data: &DMatrix<f64>, mut centroids: DMatrix<f64>, params: &KMeansParams) -> KMeansFit {
    let n = data.nrows();
    let k = centroids.nrows();
    let mut labels = vec![0usize; n];
    let mut inertia = assign(data, &centroids, &mut labels);

    for _ in 0..params.max_iter {
        let mut sums = DMatrix::zeros(k, data.ncols());
        let mut counts = vec![0usize; k];
        for (i, &l) in labels.iter().enumerate() {
            let mut row = sums.row_mut(l);
            row += data.row(i);
            counts[l] += 1;
        }

        let mut next = centroids.clone();
        for c in 0..k {
            if counts[c] > 0 {
                next.row_mut(c).copy_from(&(sums.row(c) / counts[c] as f64));
            } else {
                // Empty cluster: restart it on the worst-served sample.
                let far = (0..n)
                    .max_by(|&a, &b| {
                        sq_dist(data, a, &centroids, labels[a])
                            .total_cmp(&sq_dist(data, b, &centroids, labels[b]))
                    })
                    .unwrap_or(0);
                next.row_mut(c).copy_from(&data.row(far));
            }
        }

        let shift: f64 = (0..k)
            .map(|c| {
                next.row(c)
                    .iter()
                    .zip(centroids.row(c).iter())
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum::<f64>()
            })
            .sum();
        centroids = next;
        inertia = assign(data, &centroids, &mut labels);
        if shift <= params.tol * params.tol {
            break;
        }
    }

    KMeansFit {
        labels,
        centroids,
        inertia,
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/learn/kmeans.rs"]
mod tests;
