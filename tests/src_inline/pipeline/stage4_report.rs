use super::*;
use crate::model::metrics::MetricResult;
use crate::pipeline::stage2_evaluate::RunMetrics;
use crate::pipeline::stage3_aggregate::aggregate_results;
use crate::report::to_table;

fn run_results() -> RunResults {
    let mut results = RunResults::new();
    for (name, accs) in [("modelA_run", vec![0.5]), ("modelB_run", vec![0.75, 0.25])] {
        let runs = accs
            .into_iter()
            .enumerate()
            .map(|(i, acc)| {
                let mut metrics = MetricResult::new();
                metrics.scalar("accuracy", acc);
                RunMetrics {
                    run: format!("run_{i}"),
                    metrics,
                }
            })
            .collect();
        results.insert(name.to_string(), runs);
    }
    results
}

#[test]
fn test_writes_table_json_and_plot() {
    let tmp = tempfile::tempdir().unwrap();
    let results = run_results();
    let table = to_table(&aggregate_results(&results).unwrap());
    let skipped = vec![SkippedRun {
        competitor: "modelA_run".to_string(),
        run: "run_1".to_string(),
        reason: "failed to load artifact".to_string(),
    }];
    let input = Stage4Input {
        evaluator: "clustering",
        experiment_dir: Path::new("/exp"),
        table: &table,
        run_results: &results,
        skipped: &skipped,
        plot: true,
    };

    let out_dir = tmp.path().join("out");
    let out = write_reports(&input, &out_dir).unwrap();
    assert_eq!(out.written.len(), 3);

    let tsv = fs::read_to_string(out_dir.join(TABLE_FILE)).unwrap();
    assert_eq!(
        tsv,
        "competitor\taccuracy\nmodelA_run\t0.500000\nmodelB_run\t0.500000\n"
    );

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out_dir.join(JSON_FILE)).unwrap()).unwrap();
    assert_eq!(json["evaluator"], "clustering");
    assert_eq!(json["tool_name"], env!("CARGO_PKG_NAME"));
    assert_eq!(json["table"]["columns"][0], "accuracy");
    assert_eq!(json["runs"]["modelB_run"][1]["metrics"]["accuracy"], 0.25);
    assert_eq!(json["skipped"][0]["run"], "run_1");

    assert!(out_dir.join(PLOT_FILE).exists());
}

#[test]
fn test_plot_is_optional_and_skipped_without_data() {
    let tmp = tempfile::tempdir().unwrap();
    let results = RunResults::new();
    let table = ResultTable::default();
    let input = Stage4Input {
        evaluator: "signal",
        experiment_dir: Path::new("/exp"),
        table: &table,
        run_results: &results,
        skipped: &[],
        plot: true,
    };
    let out = write_reports(&input, tmp.path()).unwrap();
    assert_eq!(out.written.len(), 2);
    assert!(!tmp.path().join(PLOT_FILE).exists());
    assert_eq!(
        fs::read_to_string(tmp.path().join(TABLE_FILE)).unwrap(),
        "competitor\n"
    );
}

#[test]
fn test_git_hash_comes_from_experiment_checkout() {
    let tmp = tempfile::tempdir().unwrap();
    let git = tmp.path().join(".git");
    fs::create_dir_all(git.join("refs/heads")).unwrap();
    fs::write(git.join("HEAD"), "ref: refs/heads/main\n").unwrap();
    fs::write(git.join("refs/heads/main"), "0123abcd\n").unwrap();
    let experiment = tmp.path().join("experiments").join("sweep");
    fs::create_dir_all(&experiment).unwrap();

    assert_eq!(read_git_hash(&experiment).as_deref(), Some("0123abcd"));

    fs::write(git.join("HEAD"), "feedbeef\n").unwrap();
    assert_eq!(read_git_hash(tmp.path()).as_deref(), Some("feedbeef"));
}

#[test]
fn test_git_hash_written_to_json() {
    let tmp = tempfile::tempdir().unwrap();
    let git = tmp.path().join(".git");
    fs::create_dir_all(&git).unwrap();
    fs::write(git.join("HEAD"), "c0ffee\n").unwrap();

    let results = RunResults::new();
    let table = ResultTable::default();
    let input = Stage4Input {
        evaluator: "synthetic",
        experiment_dir: tmp.path(),
        table: &table,
        run_results: &results,
        skipped: &[],
        plot: false,
    };
    let out_dir = tmp.path().join("out");
    write_reports(&input, &out_dir).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out_dir.join(JSON_FILE)).unwrap()).unwrap();
    assert_eq!(json["experiment_git_hash"], "c0ffee");
}
