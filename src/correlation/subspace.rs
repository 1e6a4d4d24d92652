use nalgebra::{DMatrix, DVector};

use crate::correlation::{RANK_TOL, descending_order};
use crate::error::{EvalError, Result};

/// Alignment between the leading `num_true_dims` ground-truth columns and the
/// column space of `estimated`, as cosines of the principal angles
/// (1 = identical direction). Always returns `num_true_dims` values in
/// [0, 1], strongest first; missing directions score 0.
pub fn subspace_similarity(
    ground_truth: &DMatrix<f64>,
    estimated: &DMatrix<f64>,
    num_true_dims: usize,
) -> Result<DVector<f64>> {
    if num_true_dims == 0 || num_true_dims > ground_truth.ncols() {
        return Err(EvalError::precondition(format!(
            "num_true_dims must be in 1..={}, got {num_true_dims}",
            ground_truth.ncols()
        )));
    }
    if ground_truth.nrows() != estimated.nrows() {
        return Err(EvalError::precondition(format!(
            "ground truth has {} samples but estimate has {}",
            ground_truth.nrows(),
            estimated.nrows()
        )));
    }

    let truth = ground_truth.columns(0, num_true_dims).into_owned();
    let q_truth = column_basis(&truth);
    let q_est = column_basis(estimated);

    let mut out = DVector::zeros(num_true_dims);
    if q_truth.ncols() == 0 || q_est.ncols() == 0 {
        return Ok(out);
    }

    let cosines = (q_truth.transpose() * q_est).singular_values();
    let cosines: Vec<f64> = cosines.iter().copied().collect();
    for (slot, idx) in descending_order(&cosines)
        .into_iter()
        .take(num_true_dims)
        .enumerate()
    {
        out[slot] = cosines[idx].clamp(0.0, 1.0);
    }
    Ok(out)
}

/// Nearest matrix with orthonormal columns (rows, for wide input): `U Vᵀ`
/// from the thin SVD, singular values dropped.
pub fn orthonormal_projection(basis: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    if basis.nrows() == 0 || basis.ncols() == 0 {
        return Err(EvalError::precondition(
            "cannot orthonormalise an empty basis".to_string(),
        ));
    }
    let svd = basis.clone().svd(true, true);
    match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => Ok(u * v_t),
        _ => Err(EvalError::precondition(
            "SVD did not produce singular vectors".to_string(),
        )),
    }
}

/// Orthonormal basis of the column space, rank-truncated.
fn column_basis(m: &DMatrix<f64>) -> DMatrix<f64> {
    if m.nrows() == 0 || m.ncols() == 0 {
        return DMatrix::zeros(m.nrows(), 0);
    }
    let svd = m.clone().svd(true, false);
    let Some(u) = svd.u else {
        return DMatrix::zeros(m.nrows(), 0);
    };
    let max_sv = svd.singular_values.max();
    let keep: Vec<usize> = svd
        .singular_values
        .iter()
        .enumerate()
        .filter(|(_, s)| **s > RANK_TOL * max_sv.max(1.0))
        .map(|(i, _)| i)
        .collect();
    let mut out = DMatrix::zeros(m.nrows(), keep.len());
    for (dst, &src) in keep.iter().enumerate() {
        out.column_mut(dst).copy_from(&u.column(src));
    }
    out
}

#[cfg(test)]
#[path = "../../tests/src_inline/correlation/subspace.rs"]
mod tests;
