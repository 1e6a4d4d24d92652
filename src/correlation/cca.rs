use nalgebra::{DMatrix, DVector};

use crate::correlation::{center_columns, column_means, descending_order, pearson};
use crate::error::{EvalError, Result};

/// Fitted regularised CCA between two views.
///
/// `proj_x` / `proj_y` are `k x d` matrices: row `i` maps a centred sample of
/// the corresponding view onto canonical variate `i`. Rows are ordered by
/// descending `correlations`.
#[derive(Debug, Clone)]
pub struct CcaFit {
    pub mean_x: DVector<f64>,
    pub mean_y: DVector<f64>,
    pub proj_x: DMatrix<f64>,
    pub proj_y: DMatrix<f64>,
    pub correlations: DVector<f64>,
}

impl CcaFit {
    /// Canonical variates of `x` (`n x k`).
    pub fn transform_x(&self, x: &DMatrix<f64>) -> DMatrix<f64> {
        center_columns(x, &self.mean_x) * self.proj_x.transpose()
    }

    pub fn transform_y(&self, y: &DMatrix<f64>) -> DMatrix<f64> {
        center_columns(y, &self.mean_y) * self.proj_y.transpose()
    }
}

/// Canonical correlations between two sample-major views, strongest first.
///
/// Covariances are ridge-regularised by `regularization` before whitening,
/// the reported value per dimension is the absolute sample correlation of
/// the paired canonical variates.
pub fn canonical_correlation(
    reference: &DMatrix<f64>,
    estimated: &DMatrix<f64>,
    num_components: usize,
    regularization: f64,
) -> Result<DVector<f64>> {
    Ok(cca_fit(reference, estimated, num_components, regularization)?.correlations)
}

pub fn cca_fit(
    x: &DMatrix<f64>,
    y: &DMatrix<f64>,
    num_components: usize,
    regularization: f64,
) -> Result<CcaFit> {
    if !(regularization.is_finite() && regularization > 0.0) {
        return Err(EvalError::precondition(format!(
            "CCA regularization must be > 0, got {regularization}"
        )));
    }
    let n = x.nrows();
    if y.nrows() != n {
        return Err(EvalError::precondition(format!(
            "CCA views have different sample counts ({n} vs {})",
            y.nrows()
        )));
    }
    if n < 2 {
        return Err(EvalError::precondition(
            "CCA needs at least two samples".to_string(),
        ));
    }
    let max_components = x.ncols().min(y.ncols());
    if num_components == 0 || num_components > max_components {
        return Err(EvalError::precondition(format!(
            "CCA num_components must be in 1..={max_components}, got {num_components}"
        )));
    }

    let mean_x = column_means(x);
    let mean_y = column_means(y);
    let xc = center_columns(x, &mean_x);
    let yc = center_columns(y, &mean_y);

    let denom = (n - 1) as f64;
    let s11 = regularized_cov(&xc, regularization, denom);
    let s22 = regularized_cov(&yc, regularization, denom);
    let s12 = (xc.transpose() * &yc) / denom;

    let w1 = inv_sqrt_psd(&s11);
    let w2 = inv_sqrt_psd(&s22);
    let t = &w1 * &s12 * &w2;

    let svd = t.svd(true, true);
    let (u, v_t) = match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => (u, v_t),
        _ => {
            return Err(EvalError::precondition(
                "CCA decomposition did not produce singular vectors".to_string(),
            ));
        }
    };
    let sv: Vec<f64> = svd.singular_values.iter().copied().collect();
    let by_strength = descending_order(&sv);

    let mut proj_x = DMatrix::zeros(num_components, x.ncols());
    let mut proj_y = DMatrix::zeros(num_components, y.ncols());
    for (row, &idx) in by_strength.iter().take(num_components).enumerate() {
        let a = &w1 * u.column(idx);
        let b = &w2 * v_t.row(idx).transpose();
        proj_x.row_mut(row).copy_from(&a.transpose());
        proj_y.row_mut(row).copy_from(&b.transpose());
    }

    let ex = &xc * proj_x.transpose();
    let ey = &yc * proj_y.transpose();
    let raw: Vec<f64> = (0..num_components)
        .map(|i| {
            let a: Vec<f64> = ex.column(i).iter().copied().collect();
            let b: Vec<f64> = ey.column(i).iter().copied().collect();
            pearson(&a, &b).abs().min(1.0)
        })
        .collect();

    // Regularisation can swap near-equal directions; keep the output sorted.
    let order = descending_order(&raw);
    let correlations = DVector::from_iterator(num_components, order.iter().map(|&i| raw[i]));
    let proj_x = reorder_rows(&proj_x, &order);
    let proj_y = reorder_rows(&proj_y, &order);

    Ok(CcaFit {
        mean_x,
        mean_y,
        proj_x,
        proj_y,
        correlations,
    })
}

fn regularized_cov(centered: &DMatrix<f64>, reg: f64, denom: f64) -> DMatrix<f64> {
    let d = centered.ncols();
    (centered.transpose() * centered) / denom + DMatrix::identity(d, d) * reg
}

fn inv_sqrt_psd(m: &DMatrix<f64>) -> DMatrix<f64> {
    let eig = m.clone().symmetric_eigen();
    let inv = eig
        .eigenvalues
        .map(|l| 1.0 / l.max(f64::EPSILON).sqrt());
    &eig.eigenvectors * DMatrix::from_diagonal(&inv) * eig.eigenvectors.transpose()
}

fn reorder_rows(m: &DMatrix<f64>, order: &[usize]) -> DMatrix<f64> {
    let mut out = DMatrix::zeros(order.len(), m.ncols());
    for (dst, &src) in order.iter().enumerate() {
        out.row_mut(dst).copy_from(&m.row(src));
    }
    out
}

#[cfg(test)]
#[path = "../../tests/src_inline/correlation/cca.rs"]
mod tests;
