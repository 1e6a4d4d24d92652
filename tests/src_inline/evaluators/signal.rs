use std::collections::BTreeMap;
use std::path::PathBuf;

use super::*;
use crate::fixtures::{blob_batches, plain_cca_weights};
use crate::input::dataset::Dataset;
use crate::model::metrics::MetricValue;
use crate::network::artifact::TwoViewEncoder;

fn folded() -> FoldedData {
    let mut folds = BTreeMap::new();
    folds.insert(
        2,
        Dataset {
            training: blob_batches(20, 4, 21),
            test: blob_batches(10, 4, 22),
            num_classes: Some(4),
        },
    );
    FoldedData { folds }
}

fn model() -> TwoViewEncoder {
    TwoViewEncoder::new(PathBuf::from("/unused"), plain_cca_weights(2, 3, 2))
}

#[test]
fn test_fold_from_run_name_selects_split() {
    let data = folded();
    let evaluator = SignalEvaluator::new(&data, SvmParams::default());
    let metrics = evaluator
        .evaluate(&Run::new(PathBuf::from("/exp/modelA/run_2")), &mut model())
        .unwrap();
    let Some(MetricValue::Scalar(acc)) = metrics.get("accuracy") else {
        panic!("accuracy missing");
    };
    assert!(*acc >= 0.95, "accuracy {acc}");
}

#[test]
fn test_missing_fold_is_precondition() {
    let data = folded();
    let evaluator = SignalEvaluator::new(&data, SvmParams::default());
    for name in ["run_3", "run"] {
        let run = Run::new(PathBuf::from("/exp/modelA").join(name));
        assert!(matches!(
            evaluator.evaluate(&run, &mut model()),
            Err(EvalError::Precondition(_))
        ));
    }
}

#[test]
fn test_multi_digit_fold() {
    let mut data = folded();
    let split = data.folds.remove(&2).unwrap();
    data.folds.insert(12, split);
    let evaluator = SignalEvaluator::new(&data, SvmParams::default());
    assert!(evaluator
        .evaluate(&Run::new(PathBuf::from("/exp/m/run_12")), &mut model())
        .is_ok());
}
