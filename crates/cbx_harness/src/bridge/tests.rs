#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::rc::Rc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;

use super::*;
use crate::test_support::{graph, Graph};

const TIMEOUT: Duration = Duration::from_secs(5);

/// Run `code` as entry point number `entry`.
fn entry(g: &mut Graph, code: &str) -> usize {
    let index = g.bridge.begin_entry();
    let resolver = Rc::clone(&g.resolver);
    let result = resolver.sandbox().run(&mut g.interp, code, "entry.js");
    g.bridge.end_entry();
    result.unwrap();
    index
}

fn outcomes(results: &[AssertionResult]) -> Vec<(String, AssertionOutcome)> {
    results
        .iter()
        .map(|result| (result.name.clone(), result.outcome.clone()))
        .collect()
}

#[test]
fn counts_track_entries_with_cases() {
    let mut g = graph(&[]);
    entry(&mut g, "it('first', () => {}); it('second', () => {});");
    entry(&mut g, "const nothing = 1;");
    assert_eq!(g.bridge.expected_count(), 2);
    assert_eq!(g.bridge.actual_count(), 1);
    assert_eq!(g.bridge.case_count(), 2);
    let err = g.bridge.check_counts().unwrap_err();
    assert!(matches!(
        err,
        CaseError::AssertionCount {
            with_assertions: 1,
            executed: 2
        }
    ));
}

#[test]
fn late_registrations_count_for_the_settling_entry() {
    let mut g = graph(&[]);
    entry(&mut g, "const nothing = 1;");
    let second = entry(&mut g, "setTimeout(() => it('late', () => {}), 0);");
    assert_eq!(g.bridge.actual_count(), 0);
    g.bridge.with_entry(second, || g.interp.run_until_idle()).unwrap();
    assert_eq!(g.bridge.actual_count(), 1);
    assert!(g.bridge.check_counts().is_err());
}

#[test]
fn cases_run_in_order_with_hooks() {
    let mut g = graph(&[]);
    entry(
        &mut g,
        r"
        globalThis.log = [];
        beforeEach(() => globalThis.log.push('before'));
        afterEach(() => globalThis.log.push('after'));
        it('one', () => { globalThis.log.push('one'); });
        it('two', () => { globalThis.log.push('two'); });
        ",
    );
    let results = g.bridge.run_cases(&mut g.interp, TIMEOUT);
    assert!(results.iter().all(|result| result.outcome.is_passed()));
    let log = g.interp.run_source("globalThis.log", "probe.js").unwrap();
    assert_eq!(
        g.json(&log),
        json!(["before", "one", "after", "before", "two", "after"])
    );
}

#[test]
fn failures_are_reported_per_case() {
    let mut g = graph(&[]);
    entry(
        &mut g,
        r"
        it('passes', () => {});
        it('throws', () => { throw new Error('nope'); });
        it('rejects', () => Promise.reject(new Error('async nope')));
        it('resolves later', () => new Promise((resolve) => setTimeout(resolve, 10)));
        ",
    );
    let results = g.bridge.run_cases(&mut g.interp, TIMEOUT);
    assert_eq!(
        outcomes(&results),
        vec![
            ("passes".to_string(), AssertionOutcome::Passed),
            ("throws".to_string(), AssertionOutcome::Failed("Error: nope".to_string())),
            (
                "rejects".to_string(),
                AssertionOutcome::Failed("Error: async nope".to_string())
            ),
            ("resolves later".to_string(), AssertionOutcome::Passed),
        ]
    );
    assert_eq!(results[1].to_string(), "throws: Error: nope");
}

#[test]
fn callback_style_cases() {
    let mut g = graph(&[]);
    entry(
        &mut g,
        r"
        it('done later', (done) => { setTimeout(() => done(), 5); });
        it('done with error', (done) => { done(new Error('bad')); });
        it('never done', (done) => {});
        ",
    );
    let results = g.bridge.run_cases(&mut g.interp, TIMEOUT);
    assert_eq!(
        outcomes(&results),
        vec![
            ("done later".to_string(), AssertionOutcome::Passed),
            (
                "done with error".to_string(),
                AssertionOutcome::Failed("Error: bad".to_string())
            ),
            (
                "never done".to_string(),
                AssertionOutcome::Failed("Error: done() was never called".to_string())
            ),
        ]
    );
}

#[test]
fn each_case_gets_its_own_timeout() {
    let mut g = graph(&[]);
    entry(
        &mut g,
        "it('spins', () => { while (true) {} }); it('after', () => {});",
    );
    let results = g.bridge.run_cases(&mut g.interp, Duration::from_millis(50));
    assert_eq!(
        outcomes(&results),
        vec![
            ("spins".to_string(), AssertionOutcome::TimedOut),
            ("after".to_string(), AssertionOutcome::Passed),
        ]
    );
}

#[test]
fn registration_requires_a_function() {
    let mut g = graph(&[]);
    let resolver = Rc::clone(&g.resolver);
    let thrown = resolver
        .sandbox()
        .run(
            &mut g.interp,
            "let ok; try { it('x', 1); } catch (e) { ok = e instanceof TypeError; } ok",
            "entry.js",
        )
        .unwrap();
    assert_eq!(thrown, Value::Bool(true));
}

#[test]
fn clear_forgets_everything() {
    let mut g = graph(&[]);
    entry(&mut g, "it('a', () => {});");
    g.bridge.clear();
    assert_eq!(g.bridge.case_count(), 0);
    assert_eq!(g.bridge.expected_count(), 0);
}

#[test]
fn describe_drops_stack_lines() {
    assert_eq!(
        describe(&Value::str("Error: x\n    at foo (a.js:1:1)")),
        "Error: x"
    );
    assert_eq!(describe(&Value::str("plain")), "plain");
}
