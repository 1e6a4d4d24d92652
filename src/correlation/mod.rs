//! Canonical-correlation and subspace metrics over sample-major matrices
//! (`n_samples x n_features`).

pub mod cca;
pub mod subspace;

use nalgebra::{DMatrix, DVector};

pub use cca::{CcaFit, canonical_correlation, cca_fit};
pub use subspace::{orthonormal_projection, subspace_similarity};

/// Relative cutoff below which singular values are treated as zero.
pub(crate) const RANK_TOL: f64 = 1e-10;

pub(crate) fn column_means(m: &DMatrix<f64>) -> DVector<f64> {
    DVector::from_iterator(m.ncols(), m.column_iter().map(|c| c.mean()))
}

pub(crate) fn center_columns(m: &DMatrix<f64>, means: &DVector<f64>) -> DMatrix<f64> {
    let mut out = m.clone();
    for (j, mut col) in out.column_iter_mut().enumerate() {
        col.add_scalar_mut(-means[j]);
    }
    out
}

pub(crate) fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }
    let mean_a = a[..n].iter().sum::<f64>() / n as f64;
    let mean_b = b[..n].iter().sum::<f64>() / n as f64;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for i in 0..n {
        let da = a[i] - mean_a;
        let db = b[i] - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    let denom = (var_a * var_b).sqrt();
    if denom <= f64::EPSILON {
        return 0.0;
    }
    cov / denom
}

/// Indices of `values` ordered by descending value; NaN sorts last.
pub(crate) fn descending_order(values: &[f64]) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..values.len()).collect();
    idx.sort_by(|&a, &b| {
        values[b]
            .partial_cmp(&values[a])
            .unwrap_or_else(|| values[a].is_nan().cmp(&values[b].is_nan()))
    });
    idx
}

#[cfg(test)]
#[path = "../../tests/src_inline/correlation/mod.rs"]
mod tests;
