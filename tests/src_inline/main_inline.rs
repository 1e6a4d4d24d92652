use std::collections::BTreeMap;
use std::fs;

use clap::CommandFactory;

use super::*;
use crate::fixtures::{
    blob_batches, fitted_cca_weights, plain_cca_weights, write_corrupt_model, write_model,
};
use crate::pipeline::stage4_report::{JSON_FILE, PLOT_FILE, TABLE_FILE};

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("mvcca-eval").chain(args.iter().copied())).unwrap()
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) {
    fs::write(path, serde_json::to_string(value).unwrap()).unwrap();
}

fn path_str(p: &Path) -> &str {
    p.to_str().unwrap()
}

#[test]
fn test_cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn test_parse_variant_options() {
    let cli = parse(&[
        "clustering",
        "--experiment-dir",
        "exp",
        "--data",
        "data.json",
        "--n-init",
        "3",
        "--filter",
        "cca",
        "-v",
    ]);
    assert!(cli.verbose);
    let Command::Clustering {
        session,
        clusters,
        neighbors,
        n_init,
        seed,
    } = cli.command
    else {
        panic!("wrong subcommand");
    };
    assert_eq!(session.filter.as_deref(), Some("cca"));
    assert_eq!(session.out, PathBuf::from("mvcca_eval_out"));
    assert!(!session.plot);
    assert_eq!(clusters, None);
    assert_eq!((neighbors, n_init, seed), (10, 3, 33));

    let cli = parse(&["signal", "--experiment-dir", "e", "--data", "d", "--svm-c", "0.5"]);
    let Command::Signal { svm_c, seed, .. } = cli.command else {
        panic!("wrong subcommand");
    };
    assert_eq!((svm_c, seed), (0.5, 333));
}

#[test]
fn test_bad_checkpoint_rejected_before_data_is_read() {
    let tmp = tempfile::tempdir().unwrap();
    let missing = tmp.path().join("missing.json");
    let cli = parse(&[
        "synthetic",
        "--experiment-dir",
        path_str(tmp.path()),
        "--data",
        path_str(&missing),
        "--weights",
        "bogus",
    ]);
    assert!(matches!(run(cli), Err(EvalError::Precondition(_))));
}

#[test]
fn test_missing_data_file_is_io_error() {
    let tmp = tempfile::tempdir().unwrap();
    let cli = parse(&[
        "synthetic",
        "--experiment-dir",
        path_str(tmp.path()),
        "--data",
        path_str(&tmp.path().join("missing.json")),
    ]);
    assert!(matches!(run(cli), Err(EvalError::Io(_))));
}

#[test]
fn test_generate_then_synthetic_session() {
    let tmp = tempfile::tempdir().unwrap();
    let data_path = tmp.path().join("data/synthetic.json");
    let cli = parse(&[
        "generate",
        "--out",
        path_str(&data_path),
        "--n-train",
        "300",
        "--n-test",
        "30",
        "--batch-size",
        "100",
        "--dim-v0",
        "5",
        "--dim-v1",
        "6",
    ]);
    run(cli).unwrap();

    let data: SyntheticData = load_json(&data_path).unwrap();
    assert_eq!(data.true_dim, 2);
    let weights = fitted_cca_weights(&data.data.training, data.true_dim);
    let exp = tmp.path().join("exp");
    write_model(&exp.join("cca_linear_a/run_0"), &weights);
    write_model(&exp.join("cca_linear_a/run_1"), &weights);
    write_model(&exp.join("cca_linear_b/run_0"), &weights);

    let out = tmp.path().join("out");
    let cli = parse(&[
        "synthetic",
        "--experiment-dir",
        path_str(&exp),
        "--data",
        path_str(&data_path),
        "--out",
        path_str(&out),
        "--plot",
    ]);
    run(cli).unwrap();

    let tsv = fs::read_to_string(out.join(TABLE_FILE)).unwrap();
    let mut lines = tsv.lines();
    assert_eq!(
        lines.next().unwrap(),
        "competitor\tccor_0\tccor_1\tsim_v0_0\tsim_v0_1\tsim_v1_0\tsim_v1_1\tsim_avg_0\tsim_avg_1"
    );
    assert!(lines.next().unwrap().starts_with("cca_linear_a\t"));
    assert!(lines.next().unwrap().starts_with("cca_linear_b\t"));
    assert!(out.join(JSON_FILE).exists());
    assert!(out.join(PLOT_FILE).exists());
}

#[test]
fn test_clustering_session_skips_corrupt_run() {
    let tmp = tempfile::tempdir().unwrap();
    let data = Dataset {
        training: Vec::new(),
        test: blob_batches(15, 2, 9),
        num_classes: None,
    };
    let data_path = tmp.path().join("data.json");
    write_json(&data_path, &data);

    let exp = tmp.path().join("exp");
    let weights = plain_cca_weights(2, 3, 2);
    write_model(&exp.join("modelA_run/run_0"), &weights);
    write_corrupt_model(&exp.join("modelA_run/run_1"));
    write_model(&exp.join("modelB_run/run_0"), &weights);
    write_model(&exp.join("modelB_run/run_1"), &weights);

    let out = tmp.path().join("out");
    let cli = parse(&[
        "clustering",
        "--experiment-dir",
        path_str(&exp),
        "--data",
        path_str(&data_path),
        "--out",
        path_str(&out),
    ]);
    run(cli).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join(JSON_FILE)).unwrap()).unwrap();
    assert_eq!(json["runs"]["modelA_run"].as_array().unwrap().len(), 1);
    assert_eq!(json["runs"]["modelB_run"].as_array().unwrap().len(), 2);
    assert_eq!(json["table"]["rows"].as_array().unwrap().len(), 2);
    assert_eq!(json["skipped"].as_array().unwrap().len(), 1);
    assert!(!out.join(PLOT_FILE).exists());
}

#[test]
fn test_signal_session_groups_folds() {
    let tmp = tempfile::tempdir().unwrap();
    let mut folds = BTreeMap::new();
    for fold in 0..2 {
        folds.insert(
            fold,
            Dataset {
                training: blob_batches(15, 4, 30 + fold as u64),
                test: blob_batches(5, 4, 40 + fold as u64),
                num_classes: Some(4),
            },
        );
    }
    let data_path = tmp.path().join("folds.json");
    write_json(&data_path, &FoldedData { folds });

    let exp = tmp.path().join("exp");
    let weights = plain_cca_weights(2, 3, 2);
    for competitor in ["linear_f0", "linear_f1"] {
        for run in ["run_0", "run_1"] {
            write_model(&exp.join(competitor).join(run), &weights);
        }
    }

    let out = tmp.path().join("out");
    let cli = parse(&[
        "signal",
        "--experiment-dir",
        path_str(&exp),
        "--data",
        path_str(&data_path),
        "--out",
        path_str(&out),
    ]);
    run(cli).unwrap();

    let tsv = fs::read_to_string(out.join(TABLE_FILE)).unwrap();
    let lines: Vec<&str> = tsv.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "competitor\taccuracy");
    assert!(lines[1].starts_with("linear\t"));
}

#[test]
fn test_run_without_fold_aborts_signal_session() {
    let tmp = tempfile::tempdir().unwrap();
    let mut folds = BTreeMap::new();
    folds.insert(
        0,
        Dataset {
            training: blob_batches(10, 2, 1),
            test: blob_batches(5, 2, 2),
            num_classes: Some(2),
        },
    );
    let data_path = tmp.path().join("folds.json");
    write_json(&data_path, &FoldedData { folds });
    let exp = tmp.path().join("exp");
    write_model(&exp.join("linear_x/final"), &plain_cca_weights(2, 3, 2));

    let cli = parse(&[
        "signal",
        "--experiment-dir",
        path_str(&exp),
        "--data",
        path_str(&data_path),
        "--out",
        path_str(&tmp.path().join("out")),
    ]);
    assert!(matches!(run(cli), Err(EvalError::Precondition(_))));
}
