#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::fs;

use pretty_assertions::assert_eq;

use super::*;
use crate::compiler::StagingCompiler;

struct Workspace {
    root: tempfile::TempDir,
}

impl Workspace {
    fn new() -> Self {
        Workspace {
            root: tempfile::tempdir().unwrap(),
        }
    }

    /// Write a case under `cases/unit/<name>` and return it.
    fn case(&self, name: &str, files: &[(&str, &str)]) -> TestCase {
        let dir = self.root.path().join("cases/unit").join(name);
        for (file, content) in files {
            let path = dir.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        TestCase {
            category: "unit".to_string(),
            name: name.to_string(),
            dir,
        }
    }

    fn out(&self) -> PathBuf {
        self.root.path().join("out")
    }

    fn run(&self, case: &TestCase) -> CaseResult {
        self.run_with(case, false)
    }

    fn run_with(&self, case: &TestCase, cache: bool) -> CaseResult {
        let config = RunnerConfig {
            out_dir: self.out(),
            cache,
            ..RunnerConfig::default()
        };
        CaseDriver::new(StagingCompiler::new(), &config).run(case)
    }
}

fn failure(result: CaseResult) -> CaseError {
    match result.outcome {
        CaseOutcome::Failed(err) => err,
        other => panic!("expected a failure, got {other:?}"),
    }
}

fn names(result: &CaseResult) -> Vec<&str> {
    result.assertions.iter().map(|a| a.name.as_str()).collect()
}

#[test]
fn passing_case_reports_its_assertions() {
    let ws = Workspace::new();
    let case = ws.case(
        "pass",
        &[
            (
                "index.js",
                r#"
                const double = require("./lib");
                it("doubles", () => { expect(double(21)).toBe(42); });
                it("is a function", () => { expect(typeof double).toBe("function"); });
                "#,
            ),
            ("lib.js", "module.exports = (n) => n * 2;"),
        ],
    );
    let result = ws.run(&case);
    assert!(result.outcome.is_passed(), "{:?}", result.outcome);
    assert_eq!(names(&result), vec!["doubles", "is a function"]);
    assert!(ws.out().join("unit/pass/bundle0.js").is_file());
}

#[test]
fn entry_without_assertions_fails() {
    let ws = Workspace::new();
    let case = ws.case("silent", &[("index.js", "module.exports = 1;")]);
    let err = failure(ws.run(&case));
    assert!(matches!(
        err,
        CaseError::AssertionCount {
            with_assertions: 0,
            executed: 1
        }
    ));
}

#[test]
fn failed_assertion_fails_the_case() {
    let ws = Workspace::new();
    let case = ws.case(
        "wrong",
        &[(
            "index.js",
            r#"
            it("a", () => { expect(1).toBe(2); });
            it("b", () => { expect(2).toBe(2); });
            "#,
        )],
    );
    match failure(ws.run(&case)) {
        CaseError::Assertions {
            failed,
            total,
            first,
        } => {
            assert_eq!((failed, total), (1, 2));
            assert!(first.starts_with("a: "), "{first}");
            assert!(first.contains("Expected: 2"), "{first}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn skipped_case_does_not_build() {
    let ws = Workspace::new();
    let case = ws.case(
        "skipped",
        &[
            ("index.js", "const = ;"),
            ("test.config.toml", "skip = \"waiting on workers\""),
        ],
    );
    let result = ws.run(&case);
    assert!(matches!(&result.outcome, CaseOutcome::Skipped(reason) if reason == "waiting on workers"));
    assert!(!ws.out().join("unit/skipped").exists());
}

#[test]
fn no_tests_builds_without_executing() {
    let ws = Workspace::new();
    let case = ws.case(
        "build-only",
        &[
            ("index.js", "throw new Error('never runs');"),
            ("test.config.toml", "no_tests = true"),
        ],
    );
    let result = ws.run(&case);
    assert!(result.outcome.is_passed(), "{:?}", result.outcome);
    assert!(result.assertions.is_empty());
    assert!(ws.out().join("unit/build-only/bundle0.js").is_file());
}

#[test]
fn expected_build_errors_pass_without_executing() {
    let ws = Workspace::new();
    let case = ws.case(
        "syntax",
        &[("index.js", "const = ;"), ("errors.txt", "# parse failure\nSyntaxError\n")],
    );
    let result = ws.run(&case);
    assert!(result.outcome.is_passed(), "{:?}", result.outcome);
}

#[test]
fn unexpected_build_errors_fail() {
    let ws = Workspace::new();
    let case = ws.case("syntax", &[("index.js", "const = ;")]);
    let err = failure(ws.run(&case));
    assert!(matches!(&err, CaseError::Build(message) if message.contains("SyntaxError")), "{err}");
}

#[test]
fn missing_entry_matches_errors_fixture() {
    let ws = Workspace::new();
    let case = ws.case(
        "no-entry",
        &[("main.js", "it('x', () => {});"), ("errors.txt", "Module not found")],
    );
    let result = ws.run(&case);
    assert!(result.outcome.is_passed(), "{:?}", result.outcome);

    let case = ws.case("no-entry-unexpected", &[("main.js", "")]);
    let err = failure(ws.run(&case));
    assert!(matches!(&err, CaseError::Build(message) if message.contains("Module not found")), "{err}");
}

#[test]
fn throwing_entry_is_an_evaluation_error() {
    let ws = Workspace::new();
    let case = ws.case("throws", &[("index.js", "throw new Error('broken');")]);
    match failure(ws.run(&case)) {
        CaseError::Evaluation { entry, message } => {
            assert_eq!(entry, "bundle0.js");
            assert_eq!(message, "Error: broken");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn configured_bundle_that_does_not_exist() {
    let ws = Workspace::new();
    let case = ws.case(
        "bundles",
        &[
            ("index.js", "it('x', () => {});"),
            ("test.config.toml", "bundles = [\"runtime[index].js\"]"),
        ],
    );
    let err = failure(ws.run(&case));
    assert!(matches!(err, CaseError::MissingBundle { found: 0, expected: 1 }));
}

#[test]
fn configured_bundles_run_in_order() {
    let ws = Workspace::new();
    let case = ws.case(
        "bundles",
        &[
            ("index.js", "it('main', () => { expect(globalThis.order).toEqual(['runtime']); });"),
            ("runtime0.js", "globalThis.order = ['runtime']; it('runtime', () => {});"),
            ("test.config.toml", "bundles = [\"runtime[index].js\", \"bundle[index].js\"]"),
        ],
    );
    let result = ws.run(&case);
    assert!(result.outcome.is_passed(), "{:?}", result.outcome);
    assert_eq!(names(&result), vec!["runtime", "main"]);
}

#[test]
fn leftover_rejection_fails_the_case() {
    let ws = Workspace::new();
    let case = ws.case(
        "lost",
        &[(
            "index.js",
            "it('fine', () => {}); Promise.reject(new Error('lost'));",
        )],
    );
    match failure(ws.run(&case)) {
        CaseError::UnhandledRejection(message) => assert_eq!(message, "Error: lost"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn runaway_entry_times_out() {
    let ws = Workspace::new();
    let case = ws.case(
        "spin",
        &[("index.js", "while (true) {}"), ("test.config.toml", "timeout_ms = 50")],
    );
    assert!(matches!(failure(ws.run(&case)), CaseError::Timeout(50)));
}

#[test]
fn invalid_config_fails_before_building() {
    let ws = Workspace::new();
    let case = ws.case(
        "bad-config",
        &[("index.js", ""), ("test.config.toml", "timeout_ms = 0")],
    );
    assert!(matches!(failure(ws.run(&case)), CaseError::Config(_)));
}

#[test]
fn cache_generations_execute_restored_modules() {
    let ws = Workspace::new();
    let case = ws.case(
        "cached",
        &[
            (
                "index.js",
                r#"
                const value = require("./value");
                it("restored", () => {
                    expect(value).toBe(7);
                    expect(__STATS__.modules.length).toBe(2);
                    expect(__STATS__.modules.every((m) => m.cached)).toBe(true);
                });
                "#,
            ),
            ("value.js", "module.exports = 7;"),
            ("test.config.toml", "cache = true"),
        ],
    );
    let result = ws.run(&case);
    assert!(result.outcome.is_passed(), "{:?}", result.outcome);
    assert!(ws.out().join(".cache/unit/cached").is_dir());
}

#[test]
fn runner_flag_forces_cache_generations() {
    let ws = Workspace::new();
    let case = ws.case(
        "forced",
        &[(
            "index.js",
            "it('restored', () => { expect(__STATS__.modules[0].cached).toBe(true); });",
        )],
    );
    let result = ws.run(&case);
    assert!(result.outcome.is_failed());
    let result = ws.run_with(&case, true);
    assert!(result.outcome.is_passed(), "{:?}", result.outcome);
}

#[test]
fn every_variant_runs_in_one_case() {
    let ws = Workspace::new();
    let case = ws.case(
        "variants",
        &[
            (
                "index.js",
                "globalThis.runs = (globalThis.runs || 0) + 1; it('run ' + globalThis.runs, () => {});",
            ),
            (
                "test.config.toml",
                "[[variant]]\n\n[[variant]]\nfilename = \"second.js\"\n",
            ),
        ],
    );
    let result = ws.run(&case);
    assert!(result.outcome.is_passed(), "{:?}", result.outcome);
    assert_eq!(names(&result), vec!["run 1", "run 2"]);
    assert!(ws.out().join("unit/variants/second.js").is_file());
}

#[test]
fn run_file_describes_the_result() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("lib.js"), "module.exports = { answer: 42 };").unwrap();
    fs::write(dir.path().join("main.js"), "module.exports = require('./lib').answer;").unwrap();
    let out = run_file(&dir.path().join("main.js"), Duration::from_secs(5)).unwrap();
    assert_eq!(out, "42");
}

#[test]
fn run_file_reports_throws_and_missing_files() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("bad.js"), "throw new TypeError('nope');").unwrap();
    match run_file(&dir.path().join("bad.js"), Duration::from_secs(5)) {
        Err(CaseError::Evaluation { entry, message }) => {
            assert_eq!(entry, "bad.js");
            assert_eq!(message, "TypeError: nope");
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(matches!(
        run_file(&dir.path().join("absent.js"), Duration::from_secs(5)),
        Err(CaseError::Io { .. })
    ));
}
