use std::fs;
use std::path::Path;

use super::*;

fn make_tree(root: &Path, layout: &[(&str, &[&str])]) {
    for (competitor, runs) in layout {
        let dir = root.join(competitor);
        fs::create_dir_all(&dir).unwrap();
        for run in *runs {
            fs::create_dir_all(dir.join(run)).unwrap();
        }
    }
}

#[test]
fn test_discovery_sorts_competitors_and_skips_files() {
    let tmp = tempfile::tempdir().unwrap();
    make_tree(
        tmp.path(),
        &[
            ("zeta_cfg", &["r0"]),
            ("alpha_cfg", &["r0", "r1"]),
            ("mid_cfg", &[]),
        ],
    );
    fs::write(tmp.path().join("notes.txt"), "not a competitor").unwrap();
    fs::write(tmp.path().join("alpha_cfg").join("log.txt"), "not a run").unwrap();

    let comps = discover_competitors(tmp.path()).unwrap();
    let names: Vec<&str> = comps.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["alpha_cfg", "mid_cfg", "zeta_cfg"]);
    assert_eq!(comps[0].runs.len(), 2);
    assert!(comps[1].runs.is_empty());
    assert_eq!(comps[2].runs[0].name, "r0");
    assert_eq!(comps[2].runs[0].path, tmp.path().join("zeta_cfg").join("r0"));
}

#[test]
fn test_discovery_is_deterministic() {
    let tmp = tempfile::tempdir().unwrap();
    make_tree(
        tmp.path(),
        &[("b", &["x", "y", "z"]), ("a", &["q"]), ("c", &["w", "v"])],
    );
    let first = discover_competitors(tmp.path()).unwrap();
    let second = discover_competitors(tmp.path()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_discovery_missing_root_is_error() {
    let tmp = tempfile::tempdir().unwrap();
    assert!(discover_competitors(&tmp.path().join("absent")).is_err());
}

fn competitors(names: &[&str]) -> Vec<Competitor> {
    names
        .iter()
        .map(|n| Competitor {
            name: n.to_string(),
            runs: vec![],
        })
        .collect()
}

#[test]
fn test_filter_by_substring() {
    let input = competitors(&["dcca_foo_1", "foo", "bar", "barfoo", "fo"]);
    let kept = filter_by_pattern(input, Some("foo"));
    let names: Vec<&str> = kept.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["dcca_foo_1", "foo", "barfoo"]);
}

#[test]
fn test_filter_none_is_identity() {
    let input = competitors(&["b", "a"]);
    assert_eq!(filter_by_pattern(input.clone(), None), input);
}

#[test]
fn test_filter_without_match_is_empty() {
    let kept = filter_by_pattern(competitors(&["a", "b"]), Some("zzz"));
    assert!(kept.is_empty());
}

#[test]
fn test_fold_from_trailing_digits() {
    assert_eq!(Run::new("/x/run_2".into()).fold(), Some(2));
    assert_eq!(Run::new("/x/run_12".into()).fold(), Some(12));
    assert_eq!(Run::new("/x/split3".into()).fold(), Some(3));
    assert_eq!(Run::new("/x/latest".into()).fold(), None);
    assert_eq!(Run::new("/x/7".into()).fold(), Some(7));
}

#[test]
fn test_pattern_matching_by_name() {
    assert!(matches_pattern("dcca_foo_1", Some("foo")));
    assert!(!matches_pattern("bar", Some("foo")));
    assert!(matches_pattern("bar", None));
}

#[test]
fn test_load_competitors_lists_only_named() {
    let tmp = tempfile::tempdir().unwrap();
    make_tree(tmp.path(), &[("a", &["r0"]), ("b", &["r0", "r1"])]);
    let names = competitor_names(tmp.path()).unwrap();
    assert_eq!(names, vec!["a", "b"]);

    let comps = load_competitors(tmp.path(), vec!["b".to_string()]).unwrap();
    assert_eq!(comps.len(), 1);
    assert_eq!(comps[0].runs.len(), 2);
    assert!(load_competitors(tmp.path(), vec!["absent".to_string()]).is_err());
}
