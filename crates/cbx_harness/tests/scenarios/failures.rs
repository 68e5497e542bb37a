use cbx_harness::CaseError;

use super::common::{failure, Suite};

#[test]
fn broken_cases_are_reported_not_fatal() {
    let suite = Suite::new();
    suite
        .case("broken/quiet", &[("index.js", "module.exports = 'no tests here';")])
        .case(
            "broken/assertion",
            &[("index.js", "it('compares', () => { expect([1, 2]).toEqual([1, 3]); });")],
        )
        .case(
            "broken/missing",
            &[("index.js", "require('./gone'); it('x', () => {});")],
        )
        .case("fine/ok", &[("index.js", "it('ok', () => {});")]);
    let summary = suite.run();
    assert_eq!((summary.passed, summary.failed), (1, 3));
    assert_eq!(summary.exit_code(), 1);

    assert_eq!(
        failure(&summary, "broken/quiet").to_string(),
        "no assertions produced: 0 of 1 executed entry points registered test cases"
    );
    assert!(matches!(
        failure(&summary, "broken/assertion"),
        CaseError::Assertions { failed: 1, total: 1, .. }
    ));
    match failure(&summary, "broken/missing") {
        CaseError::Evaluation { entry, message } => {
            assert_eq!(entry, "bundle0.js");
            assert!(message.contains("Cannot find module './gone'"), "{message}");
        }
        other => panic!("unexpected error: {other}"),
    }

    let report = summary.report(false);
    assert!(report.contains("  FAIL: broken/quiet - no assertions produced"));
    assert!(report.ends_with("FAILED"));
}

#[test]
fn runaway_case_times_out_alone() {
    let suite = Suite::new();
    suite.case(
        "broken/slow",
        &[
            (
                "index.js",
                r#"
                it("spins", () => { while (true) {} });
                it("still runs", () => {});
                "#,
            ),
            ("test.config.toml", "timeout_ms = 100"),
        ],
    );
    let summary = suite.run();
    match failure(&summary, "broken/slow") {
        CaseError::Assertions { failed, total, first } => {
            assert_eq!((*failed, *total), (1, 2));
            assert_eq!(first, "spins: timed out");
        }
        other => panic!("unexpected error: {other}"),
    }
}
