use std::fs;

use cbx_harness::{
    BuildFailure, BuildRequest, CaseError, CaseRunner, Compiler, InfrastructureLog, RunResult,
    StagingCompiler,
};

use super::common::{assert_passed, failure, Suite};

#[test]
fn unchanged_modules_are_restored() {
    let suite = Suite::new();
    suite.case(
        "cache/unchanged",
        &[
            (
                "index.js",
                r#"
                const dep = require("./dep");
                it("every module came from the cache", () => {
                    expect(dep).toBe(1);
                    expect(__STATS__.modules.map((m) => m.cached)).toEqual([true, true]);
                });
                "#,
            ),
            ("dep.js", "module.exports = 1;"),
            ("test.config.toml", "cache = true"),
        ],
    );
    assert_passed(&suite.run());
}

/// Rewrites one case source right before generation `at` builds.
struct Editing {
    inner: StagingCompiler,
    at: u32,
    file: &'static str,
    content: &'static str,
}

impl Compiler for Editing {
    fn build(
        &mut self,
        request: &BuildRequest,
        log: &mut InfrastructureLog,
    ) -> Result<RunResult, BuildFailure> {
        if request.generation == self.at {
            let path = request.case_dir.join(self.file);
            fs::write(&path, self.content).map_err(|err| BuildFailure::io(&path, err))?;
        }
        self.inner.build(request, log)
    }
}

fn changed_dependency(propagate: bool) {
    let suite = Suite::new();
    let entry = format!(
        r#"
        const dep = require("./dep");
        const cached = {{}};
        __STATS__.modules.forEach((m) => {{ cached[m.identifier] = m.cached; }});
        it("sees the rebuilt dependency", () => {{
            expect(dep).toBe(2);
            expect(cached["./dep.js"]).toBe(false);
            expect(cached["./bundle0.js"]).toBe({});
        }});
        "#,
        !propagate
    );
    let config = format!("cache = true\ngenerations = 2\npropagate_cache = {propagate}\n");
    suite.case(
        "cache/changed",
        &[
            ("index.js", entry.as_str()),
            ("dep.js", "module.exports = 1;"),
            ("test.config.toml", config.as_str()),
        ],
    );
    let runner = CaseRunner::with_compiler(suite.config(), || Editing {
        inner: StagingCompiler::new(),
        at: 2,
        file: "dep.js",
        content: "module.exports = 2;",
    });
    assert_passed(&runner.run(&suite.cases()).unwrap());
}

#[test]
fn changed_dependency_only_rebuilds_itself() {
    changed_dependency(false);
}

#[test]
fn changed_dependency_propagates_to_dependents() {
    changed_dependency(true);
}

/// Throws the persistent cache away before every build.
struct Forgetful(StagingCompiler);

impl Compiler for Forgetful {
    fn build(
        &mut self,
        request: &BuildRequest,
        log: &mut InfrastructureLog,
    ) -> Result<RunResult, BuildFailure> {
        if let Some(dir) = &request.cache_dir {
            if dir.exists() {
                fs::remove_dir_all(dir).map_err(|err| BuildFailure::io(dir, err))?;
            }
        }
        self.0.build(request, log)
    }
}

#[test]
fn lost_cache_fails_the_second_generation() {
    let suite = Suite::new();
    suite.case(
        "cache/lost",
        &[
            ("index.js", "it('never runs', () => {});"),
            ("test.config.toml", "cache = true"),
        ],
    );
    let runner = CaseRunner::with_compiler(suite.config(), || Forgetful(StagingCompiler::new()));
    let summary = runner.run(&suite.cases()).unwrap();
    match failure(&summary, "cache/lost") {
        CaseError::CacheConsistency { generation, dump } => {
            assert_eq!(*generation, 2);
            assert!(dump.contains("\"./bundle0.js\""), "{dump}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

/// Reports an infrastructure warning on every build.
struct Noisy(StagingCompiler);

impl Compiler for Noisy {
    fn build(
        &mut self,
        request: &BuildRequest,
        log: &mut InfrastructureLog,
    ) -> Result<RunResult, BuildFailure> {
        log.warn("cache format is deprecated");
        self.0.build(request, log)
    }
}

#[test]
fn infrastructure_warnings_need_a_fixture() {
    let suite = Suite::new();
    let entry = "it('runs', () => {});";
    suite
        .case(
            "cache/noisy-expected",
            &[
                ("index.js", entry),
                ("test.config.toml", "cache = true"),
                ("infrastructure-log.txt", "cache format is deprecated"),
            ],
        )
        .case(
            "cache/noisy-unexpected",
            &[("index.js", entry), ("test.config.toml", "cache = true")],
        );
    let runner = CaseRunner::with_compiler(suite.config(), || Noisy(StagingCompiler::new()));
    let summary = runner.run(&suite.cases()).unwrap();
    assert_eq!((summary.passed, summary.failed), (1, 1));
    assert!(matches!(
        failure(&summary, "cache/noisy-unexpected"),
        CaseError::BuildLog(lines) if lines.contains("cache format is deprecated")
    ));
}
