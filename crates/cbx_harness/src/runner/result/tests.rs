#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::PathBuf;

use pretty_assertions::assert_eq;

use super::*;
use crate::bridge::AssertionOutcome;

fn case(name: &str) -> TestCase {
    TestCase {
        category: "unit".to_string(),
        name: name.to_string(),
        dir: PathBuf::from("cases/unit").join(name),
    }
}

fn result(name: &str, outcome: CaseOutcome) -> CaseResult {
    CaseResult {
        case: case(name),
        outcome,
        assertions: Vec::new(),
        duration: Duration::ZERO,
    }
}

#[test]
fn counts_each_outcome() {
    let summary = RunSummary::new(
        vec![
            result("a", CaseOutcome::Passed),
            result("b", CaseOutcome::Skipped("later".to_string())),
            result("c", CaseOutcome::Failed(CaseError::Timeout(5))),
            result("d", CaseOutcome::Passed),
        ],
        Duration::ZERO,
    );
    assert_eq!((summary.passed, summary.failed, summary.skipped), (2, 1, 1));
    assert_eq!(summary.total(), 4);
    assert!(summary.has_failures());
}

#[test]
fn exit_codes() {
    let empty = RunSummary::new(Vec::new(), Duration::ZERO);
    assert_eq!(empty.exit_code(), 2);

    let ok = RunSummary::new(vec![result("a", CaseOutcome::Passed)], Duration::ZERO);
    assert_eq!(ok.exit_code(), 0);

    let skipped = RunSummary::new(
        vec![result("a", CaseOutcome::Skipped("flaky".to_string()))],
        Duration::ZERO,
    );
    assert_eq!(skipped.exit_code(), 0);

    let failed = RunSummary::new(
        vec![
            result("a", CaseOutcome::Passed),
            result("b", CaseOutcome::Failed(CaseError::Timeout(10))),
        ],
        Duration::ZERO,
    );
    assert_eq!(failed.exit_code(), 1);
}

#[test]
fn summary_display() {
    let summary = RunSummary::new(vec![result("a", CaseOutcome::Passed)], Duration::ZERO);
    let text = summary.to_string();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "Test Summary:");
    assert_eq!(lines[1], "  1 passed, 0 failed, 0 skipped (1 total)");
    assert!(lines[2].starts_with("  Completed in "));
    assert_eq!(lines[3], "OK");
    let empty = RunSummary::new(Vec::new(), Duration::ZERO);
    assert!(empty.to_string().ends_with("NO TESTS FOUND"));
    let failed = RunSummary::new(
        vec![result("a", CaseOutcome::Failed(CaseError::Timeout(1)))],
        Duration::ZERO,
    );
    assert!(failed.to_string().ends_with("FAILED"));
}

#[test]
fn report_always_lists_failures() {
    let summary = RunSummary::new(
        vec![
            result("a", CaseOutcome::Passed),
            result("b", CaseOutcome::Failed(CaseError::Timeout(250))),
            result("c", CaseOutcome::Skipped("later".to_string())),
        ],
        Duration::ZERO,
    );
    let report = summary.report(false);
    assert!(report.starts_with("  FAIL: unit/b - test case timed out after 250ms\nTest Summary:"));
    assert!(!report.contains("PASS"));
    assert!(!report.contains("SKIP"));
}

#[test]
fn verbose_report_lists_passes_assertions_and_skips() {
    let mut passed = result("a", CaseOutcome::Passed);
    passed.assertions = vec![AssertionResult {
        name: "adds".to_string(),
        outcome: AssertionOutcome::Passed,
        duration: Duration::ZERO,
    }];
    let summary = RunSummary::new(
        vec![passed, result("c", CaseOutcome::Skipped("needs workers".to_string()))],
        Duration::ZERO,
    );
    let report = summary.report(true);
    let lines: Vec<&str> = report.lines().take(4).collect();
    assert!(lines[0].starts_with("  PASS: unit/a ("));
    assert_eq!(lines[1..], ["    ok: adds", "  SKIP: unit/c - needs workers", "Test Summary:"]);
}

#[test]
fn failed_constructor_has_no_assertions() {
    let failed = CaseResult::failed(case("x"), CaseError::Timeout(3), Duration::from_millis(4));
    assert!(failed.outcome.is_failed());
    assert!(failed.assertions.is_empty());
    assert_eq!(failed.duration, Duration::from_millis(4));
}
