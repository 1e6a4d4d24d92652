use super::*;
use crate::correlation::canonical_correlation;
use crate::input::dataset::DataProvider;

#[test]
fn test_generated_shapes_line_up() {
    let cfg = SyntheticConfig {
        n_train: 130,
        n_test: 40,
        batch_size: 50,
        ..SyntheticConfig::default()
    };
    let data = generate_synthetic(&cfg).unwrap();
    data.validate().unwrap();

    let sizes: Vec<usize> = data.training_data().iter().map(Batch::len).collect();
    assert_eq!(sizes, vec![50, 50, 30]);
    assert_eq!(data.test_data().iter().map(Batch::len).sum::<usize>(), 40);
    assert_eq!(data.ground_truth_v0.shape(), (130, 4));
    assert_eq!(data.data.training[0].view_0.ncols(), 8);
    assert_eq!(data.data.num_classes(), 2);
}

#[test]
fn test_same_seed_same_data() {
    let cfg = SyntheticConfig::default();
    let a = generate_synthetic(&cfg).unwrap();
    let b = generate_synthetic(&cfg).unwrap();
    assert_eq!(a.ground_truth_v1, b.ground_truth_v1);
    assert_eq!(a.data.training[1].view_0, b.data.training[1].view_0);
}

#[test]
fn test_shared_factors_are_shared() {
    let data = generate_synthetic(&SyntheticConfig::default()).unwrap();
    let shared_0 = data.ground_truth_v0.columns(0, 2).into_owned();
    let shared_1 = data.ground_truth_v1.columns(0, 2).into_owned();
    assert_eq!(shared_0, shared_1);

    let ccor = canonical_correlation(&data.ground_truth_v0, &data.ground_truth_v1, 3, 1e-6).unwrap();
    assert!(ccor[0] > 0.999);
    assert!(ccor[1] > 0.999);
    assert!(ccor[2] < 0.2);
}

#[test]
fn test_rejects_zero_true_dim() {
    let cfg = SyntheticConfig {
        true_dim: 0,
        ..SyntheticConfig::default()
    };
    assert!(generate_synthetic(&cfg).is_err());
}

#[test]
fn test_rejects_negative_or_nan_noise() {
    for noise in [-0.1, f64::NAN, f64::INFINITY] {
        let cfg = SyntheticConfig {
            noise,
            n_train: 10,
            n_test: 0,
            batch_size: 5,
            ..SyntheticConfig::default()
        };
        let err = generate_synthetic(&cfg).unwrap_err();
        assert!(matches!(err, EvalError::Precondition(_)), "noise {noise}: {err}");
    }
}

#[test]
fn test_zero_noise_is_allowed() {
    let cfg = SyntheticConfig {
        noise: 0.0,
        n_train: 10,
        n_test: 0,
        batch_size: 5,
        ..SyntheticConfig::default()
    };
    assert!(generate_synthetic(&cfg).is_ok());
}
