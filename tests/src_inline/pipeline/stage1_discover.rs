use std::fs;

use super::*;

#[test]
fn test_discovers_and_filters() {
    let tmp = tempfile::tempdir().unwrap();
    for dir in ["modelA_run/run_0", "modelA_run/run_1", "modelB_run/run_0"] {
        fs::create_dir_all(tmp.path().join(dir)).unwrap();
    }
    fs::write(tmp.path().join("notes.txt"), "not a competitor").unwrap();

    let all = run_stage1(tmp.path(), None).unwrap();
    assert_eq!(all.n_discovered, 2);
    assert_eq!(all.competitors.len(), 2);

    let only_a = run_stage1(tmp.path(), Some("modelA")).unwrap();
    assert_eq!(only_a.n_discovered, 2);
    assert_eq!(only_a.competitors.len(), 1);
    assert_eq!(only_a.competitors[0].runs.len(), 2);

    let none = run_stage1(tmp.path(), Some("zzz")).unwrap();
    assert!(none.competitors.is_empty());
}

#[test]
fn test_missing_root_is_io_error() {
    let tmp = tempfile::tempdir().unwrap();
    let err = run_stage1(&tmp.path().join("absent"), None).unwrap_err();
    assert!(matches!(err, crate::error::EvalError::Io(_)));
}

#[cfg(unix)]
#[test]
fn test_filtered_out_competitor_is_never_listed() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = tempfile::tempdir().unwrap();
    fs::create_dir_all(tmp.path().join("kept_cfg/run_0")).unwrap();
    let locked = tmp.path().join("locked_cfg");
    fs::create_dir_all(locked.join("run_0")).unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    let kept = run_stage1(tmp.path(), Some("kept"));
    let unfiltered = run_stage1(tmp.path(), None);
    // Privileged users can still read the locked directory.
    let readable = fs::read_dir(&locked).is_ok();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    let kept = kept.unwrap();
    assert_eq!(kept.n_discovered, 2);
    assert_eq!(kept.competitors.len(), 1);
    assert_eq!(kept.competitors[0].name, "kept_cfg");
    assert_eq!(kept.competitors[0].runs.len(), 1);

    if !readable {
        assert!(unfiltered.is_err());
    }
}
