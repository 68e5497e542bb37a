#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::fs;

use pretty_assertions::assert_eq;

use super::*;

fn layout(dirs: &[&str]) -> tempfile::TempDir {
    let root = tempfile::tempdir().unwrap();
    for dir in dirs {
        fs::create_dir_all(root.path().join(dir)).unwrap();
    }
    root
}

fn ids(cases: &[TestCase]) -> Vec<String> {
    cases.iter().map(TestCase::id).collect()
}

#[test]
fn finds_category_and_case_directories_sorted() {
    let root = layout(&["scope/b", "scope/a", "cjs/require", "esm/cycle"]);
    let cases = discover(root.path(), None).unwrap();
    assert_eq!(ids(&cases), vec!["cjs/require", "esm/cycle", "scope/a", "scope/b"]);
    assert_eq!(cases[0].dir, root.path().join("cjs/require"));
    assert_eq!(cases[0].category, "cjs");
    assert_eq!(cases[0].name, "require");
}

#[test]
fn skips_hidden_and_underscored_entries() {
    let root = layout(&["_shared/helper", ".git/objects", "esm/_wip", "esm/.tmp", "esm/live"]);
    fs::write(root.path().join("esm/README.md"), "not a case").unwrap();
    fs::write(root.path().join("notes.txt"), "").unwrap();
    let cases = discover(root.path(), None).unwrap();
    assert_eq!(ids(&cases), vec!["esm/live"]);
}

#[test]
fn filter_matches_anywhere_in_the_id() {
    let root = layout(&["esm/cycle", "esm/reexport", "cjs/cycle", "json/data"]);
    let cases = discover(root.path(), Some("cycle")).unwrap();
    assert_eq!(ids(&cases), vec!["cjs/cycle", "esm/cycle"]);
    let cases = discover(root.path(), Some("esm/")).unwrap();
    assert_eq!(ids(&cases), vec!["esm/cycle", "esm/reexport"]);
    assert!(discover(root.path(), Some("nothing")).unwrap().is_empty());
}

#[test]
fn empty_category_yields_no_cases() {
    let root = layout(&["empty"]);
    assert!(discover(root.path(), None).unwrap().is_empty());
}

#[test]
fn missing_root_is_an_io_error() {
    let root = tempfile::tempdir().unwrap();
    let missing = root.path().join("absent");
    let err = discover(&missing, None).unwrap_err();
    assert!(matches!(err, CaseError::Io { ref path, .. } if *path == missing));
}

#[test]
fn display_matches_id() {
    let case = TestCase {
        category: "esm".to_string(),
        name: "cycle".to_string(),
        dir: PathBuf::from("cases/esm/cycle"),
    };
    assert_eq!(case.to_string(), case.id());
    assert_eq!(case.id(), "esm/cycle");
}
