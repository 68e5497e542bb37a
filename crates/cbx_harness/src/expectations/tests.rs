#![allow(clippy::unwrap_used, clippy::expect_used)]

use pretty_assertions::assert_eq;

use super::*;

fn messages(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

#[test]
fn parse_skips_comments_and_blanks() {
    let fixture = Fixture::parse("# header\n\n  Module not found  \n# trailing\nUnexpected token\n");
    assert_eq!(fixture.fragments, messages(&["Module not found", "Unexpected token"]));
}

#[test]
fn fragments_match_in_order() {
    let fixture = Fixture::parse("first\nsecond");
    fixture
        .check("error", &messages(&["the first one", "then the second"]))
        .unwrap();

    let err = fixture
        .check("error", &messages(&["then the second", "the first one"]))
        .unwrap_err();
    assert!(err.to_string().contains("error 0 should contain 'first'"), "{err}");
}

#[test]
fn counts_must_match() {
    let fixture = Fixture::parse("only");
    let err = fixture
        .check("warning", &messages(&["only", "extra"]))
        .unwrap_err();
    assert!(err.to_string().contains("expected 1 warnings, got 2"), "{err}");
}

#[test]
fn missing_fixtures() {
    let expectations = Expectations::default();
    expectations.check_errors(&[]).unwrap();
    expectations.check_warnings(&[]).unwrap();

    let err = expectations.check_errors(&messages(&["boom"])).unwrap_err();
    assert!(matches!(err, CaseError::Build(_)), "{err}");

    let err = expectations.check_warnings(&messages(&["hm"])).unwrap_err();
    assert!(matches!(err, CaseError::Expectation { kind: "warning", .. }), "{err}");

    let err = expectations
        .check_infrastructure_log(&messages(&["corrupt manifest"]))
        .unwrap_err();
    assert!(
        err.to_string().starts_with("Errors/Warnings during build:"),
        "{err}"
    );
}

#[test]
fn load_reads_case_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(WARNINGS_FILE), "strategy\n").unwrap();
    let expectations = Expectations::load(dir.path()).unwrap();
    assert!(expectations.errors.is_none());
    assert_eq!(
        expectations.warnings,
        Some(Fixture {
            fragments: messages(&["strategy"])
        })
    );
}
