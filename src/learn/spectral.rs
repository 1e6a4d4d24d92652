use nalgebra::DMatrix;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::correlation::descending_order;
use crate::error::{EvalError, Result};
use crate::learn::kmeans::{KMeansParams, kmeans};

const OVERSAMPLE: usize = 10;
const MAX_ITERATIONS: usize = 2000;
const RESIDUAL_TOL: f64 = 1e-9;

#[derive(Debug, Clone, Copy)]
pub struct SpectralParams {
    pub n_clusters: usize,
    pub n_neighbors: usize,
    pub n_init: usize,
    pub seed: u64,
}

impl SpectralParams {
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            n_neighbors: 10,
            n_init: 10,
            seed: 33,
        }
    }
}

/// Spectral clustering on a symmetrised k-nearest-neighbour connectivity
/// graph, with k-means on the normalised-Laplacian embedding.
pub fn spectral_clustering(data: &DMatrix<f64>, params: &SpectralParams) -> Result<Vec<usize>> {
    let embedding = spectral_embedding(data, params)?;
    let fit = kmeans(
        &embedding,
        &KMeansParams {
            n_init: params.n_init,
            ..KMeansParams::new(params.n_clusters, params.seed)
        },
    )?;
    Ok(fit.labels)
}

/// Leading `n_clusters` eigenvectors of `D^-1/2 A D^-1/2`, rescaled by
/// `D^-1/2`. One row per sample.
pub fn spectral_embedding(data: &DMatrix<f64>, params: &SpectralParams) -> Result<DMatrix<f64>> {
    let n = data.nrows();
    let k = params.n_clusters;
    if k == 0 || n < k {
        return Err(EvalError::precondition(format!(
            "spectral clustering needs 1 <= n_clusters <= n_samples, got {k} clusters for {n} samples"
        )));
    }
    if params.n_neighbors == 0 {
        return Err(EvalError::precondition(
            "n_neighbors must be >= 1".to_string(),
        ));
    }

    let op = NormalizedAffinity::new(knn_affinity(data, params.n_neighbors.min(n)));
    let (_, vectors) = leading_eigenpairs(&op, k, params.seed);

    let mut embedding = vectors;
    for (i, mut row) in embedding.row_iter_mut().enumerate() {
        row *= op.inv_sqrt[i];
    }
    Ok(embedding)
}

/// Symmetric sparse matrix as per-row `(column, weight)` lists sorted by column.
#[derive(Debug, Clone)]
struct SparseGraph {
    rows: Vec<Vec<(usize, f64)>>,
}

impl SparseGraph {
    fn degrees(&self) -> Vec<f64> {
        self.rows
            .iter()
            .map(|row| row.iter().map(|&(_, w)| w).sum())
            .collect()
    }
}

/// `D^-1/2 A D^-1/2` applied as `(I + .) / 2`, which keeps the eigenvectors
/// and maps the spectrum from [-1, 1] onto [0, 1].
struct NormalizedAffinity {
    graph: SparseGraph,
    inv_sqrt: Vec<f64>,
}

impl NormalizedAffinity {
    fn new(graph: SparseGraph) -> Self {
        let inv_sqrt = graph
            .degrees()
            .iter()
            .map(|d| if *d > 0.0 { 1.0 / d.sqrt() } else { 0.0 })
            .collect();
        Self { graph, inv_sqrt }
    }

    fn dim(&self) -> usize {
        self.graph.rows.len()
    }

    fn apply(&self, x: &DMatrix<f64>) -> DMatrix<f64> {
        let mut y = x * 0.5;
        for (i, row) in self.graph.rows.iter().enumerate() {
            for &(j, w) in row {
                let scale = 0.5 * w * self.inv_sqrt[i] * self.inv_sqrt[j];
                for c in 0..x.ncols() {
                    y[(i, c)] += scale * x[(j, c)];
                }
            }
        }
        y
    }
}

/// Top-`k` eigenpairs of the normalised affinity by seeded block subspace
/// iteration with Rayleigh-Ritz extraction. Values are in descending order.
fn leading_eigenpairs(op: &NormalizedAffinity, k: usize, seed: u64) -> (Vec<f64>, DMatrix<f64>) {
    let n = op.dim();
    let block = (k + OVERSAMPLE).max(2 * k).min(n);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut q = DMatrix::from_fn(n, block, |_, _| rng.gen_range(-1.0..1.0))
        .qr()
        .q();

    let mut iterations = 0;
    loop {
        iterations += 1;
        let z = op.apply(&q);
        let t = q.transpose() * &z;
        let eig = ((&t + t.transpose()) * 0.5).symmetric_eigen();
        let values: Vec<f64> = eig.eigenvalues.iter().copied().collect();
        let order = descending_order(&values);

        let mut ritz: DMatrix<f64> = DMatrix::zeros(block, k);
        let mut theta = Vec::with_capacity(k);
        for (dst, &src) in order.iter().take(k).enumerate() {
            ritz.set_column(dst, &eig.eigenvectors.column(src));
            theta.push(values[src]);
        }
        let vectors = &q * &ritz;
        let mut residual = &z * &ritz;
        for (c, th) in theta.iter().enumerate() {
            residual.column_mut(c).axpy(-th, &vectors.column(c), 1.0);
        }
        let worst = residual
            .column_iter()
            .map(|c| c.norm())
            .fold(0.0, f64::max);

        if worst <= RESIDUAL_TOL || iterations >= MAX_ITERATIONS {
            if worst > RESIDUAL_TOL {
                tracing::warn!(
                    iterations,
                    residual = worst,
                    "spectral embedding did not fully converge"
                );
            } else {
                tracing::debug!(iterations, "spectral embedding converged");
            }
            let eigenvalues = theta.iter().map(|t| 2.0 * t - 1.0).collect();
            return (eigenvalues, vectors);
        }
        q = z.qr().q();
    }
}

/// Indices of the `k` nearest samples to each sample (self included), by
/// squared Euclidean distance with ties broken by index.
fn knn_neighbours(data: &DMatrix<f64>, k: usize) -> Vec<Vec<usize>> {
    let n = data.nrows();
    let samples = data.transpose();
    let by_distance = |a: &(f64, usize), b: &(f64, usize)| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1));

    let mut neighbours = Vec::with_capacity(n);
    let mut dists: Vec<(f64, usize)> = Vec::with_capacity(n);
    for i in 0..n {
        dists.clear();
        let xi = samples.column(i);
        for j in 0..n {
            let d: f64 = xi
                .iter()
                .zip(samples.column(j).iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum();
            dists.push((d, j));
        }
        if k < n {
            dists.select_nth_unstable_by(k - 1, by_distance);
            dists.truncate(k);
        }
        dists.sort_by(by_distance);
        neighbours.push(dists.iter().map(|&(_, j)| j).collect());
    }
    neighbours
}

/// 0/1 connectivity to the `k` nearest samples, averaged with its transpose.
fn knn_affinity(data: &DMatrix<f64>, k: usize) -> SparseGraph {
    let n = data.nrows();
    let mut rows: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
    for (i, nbrs) in knn_neighbours(data, k).iter().enumerate() {
        for &j in nbrs {
            rows[i].push((j, 0.5));
            rows[j].push((i, 0.5));
        }
    }
    for row in rows.iter_mut() {
        row.sort_by_key(|&(j, _)| j);
        row.dedup_by(|next, kept| {
            if next.0 == kept.0 {
                kept.1 += next.1;
                true
            } else {
                false
            }
        });
    }
    SparseGraph { rows }
}

#[cfg(test)]
#[path = "../../tests/src_inline/learn/spectral.rs"]
mod tests;
