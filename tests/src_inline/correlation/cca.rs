use super::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn random_matrix(rows: usize, cols: usize, seed: u64) -> DMatrix<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    DMatrix::from_fn(rows, cols, |_, _| rng.gen_range(-1.0..1.0))
}

#[test]
fn test_identical_views_correlate_perfectly() {
    let x = random_matrix(200, 4, 7);
    for reg in [1e-6, 1e-3, 0.1, 1.0, 10.0] {
        let ccor = canonical_correlation(&x, &x, 3, reg).unwrap();
        assert_eq!(ccor.len(), 3);
        for v in ccor.iter() {
            assert!((v - 1.0).abs() < 1e-6, "reg={reg} ccor={v}");
        }
    }
}

#[test]
fn test_non_positive_regularization_rejected() {
    let x = random_matrix(50, 3, 1);
    for reg in [0.0, -1e-4, -3.0, f64::NAN] {
        let err = canonical_correlation(&x, &x, 2, reg).unwrap_err();
        assert!(matches!(err, EvalError::Precondition(_)), "reg={reg}");
    }
}

#[test]
fn test_sorted_descending_with_planted_signal() {
    let n = 500;
    let shared = random_matrix(n, 2, 11);
    let noise_x = random_matrix(n, 3, 12);
    let noise_y = random_matrix(n, 3, 13);

    let mut x = DMatrix::zeros(n, 3);
    let mut y = DMatrix::zeros(n, 3);
    for i in 0..n {
        // dim 0 almost noise-free, dim 1 half noise, dim 2 independent.
        x[(i, 0)] = shared[(i, 0)] + 0.01 * noise_x[(i, 0)];
        y[(i, 0)] = -shared[(i, 0)] + 0.01 * noise_y[(i, 0)];
        x[(i, 1)] = shared[(i, 1)] + noise_x[(i, 1)];
        y[(i, 1)] = shared[(i, 1)] + noise_y[(i, 1)];
        x[(i, 2)] = noise_x[(i, 2)];
        y[(i, 2)] = noise_y[(i, 2)];
    }

    let ccor = canonical_correlation(&x, &y, 3, 1e-4).unwrap();
    assert!(ccor[0] > 0.99);
    assert!(ccor[1] > 0.3 && ccor[1] < 0.9);
    assert!(ccor[2] < 0.25);
    for w in ccor.as_slice().windows(2) {
        assert!(w[0] >= w[1]);
    }
}

#[test]
fn test_fit_variates_reproduce_correlations() {
    let x = random_matrix(120, 3, 21);
    let mut y = random_matrix(120, 2, 22);
    for i in 0..120 {
        y[(i, 0)] += x[(i, 1)];
    }
    let fit = cca_fit(&x, &y, 2, 1e-3).unwrap();
    assert_eq!(fit.proj_x.shape(), (2, 3));
    assert_eq!(fit.proj_y.shape(), (2, 2));

    let ex = fit.transform_x(&x);
    let ey = fit.transform_y(&y);
    for i in 0..2 {
        let a: Vec<f64> = ex.column(i).iter().copied().collect();
        let b: Vec<f64> = ey.column(i).iter().copied().collect();
        approx::assert_abs_diff_eq!(pearson(&a, &b).abs(), fit.correlations[i], epsilon = 1e-9);
    }
}

#[test]
fn test_sample_count_mismatch_rejected() {
    let x = random_matrix(10, 2, 1);
    let y = random_matrix(11, 2, 2);
    assert!(matches!(
        canonical_correlation(&x, &y, 1, 0.1),
        Err(EvalError::Precondition(_))
    ));
}

#[test]
fn test_component_count_bounds() {
    let x = random_matrix(30, 2, 1);
    let y = random_matrix(30, 4, 2);
    assert!(canonical_correlation(&x, &y, 0, 0.1).is_err());
    assert!(canonical_correlation(&x, &y, 3, 0.1).is_err());
    assert_eq!(canonical_correlation(&x, &y, 2, 0.1).unwrap().len(), 2);
}

#[test]
fn test_deterministic() {
    let x = random_matrix(80, 3, 5);
    let y = random_matrix(80, 3, 6);
    let a = canonical_correlation(&x, &y, 3, 0.01).unwrap();
    let b = canonical_correlation(&x, &y, 3, 0.01).unwrap();
    assert_eq!(a, b);
}
