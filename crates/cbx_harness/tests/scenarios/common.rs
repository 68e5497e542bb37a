//! A scratch case tree and helpers to run it.

use std::fs;
use std::path::PathBuf;

use cbx_harness::{CaseError, CaseOutcome, CaseRunner, RunSummary, RunnerConfig};
use tempfile::TempDir;

/// Cases under `<tmp>/cases`, build output under `<tmp>/out`.
pub struct Suite {
    dir: TempDir,
}

impl Suite {
    pub fn new() -> Self {
        Suite {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn cases(&self) -> PathBuf {
        self.dir.path().join("cases")
    }

    /// Write `files` into the case `category/name`.
    pub fn case(&self, id: &str, files: &[(&str, &str)]) -> &Self {
        let dir = self.cases().join(id);
        for (name, content) in files {
            let path = dir.join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        self
    }

    pub fn config(&self) -> RunnerConfig {
        RunnerConfig {
            out_dir: self.dir.path().join("out"),
            ..RunnerConfig::default()
        }
    }

    pub fn run(&self) -> RunSummary {
        CaseRunner::new(self.config()).run(&self.cases()).unwrap()
    }
}

/// Panic with every failure when anything did not pass.
pub fn assert_passed(summary: &RunSummary) {
    let failures: Vec<String> = summary
        .results
        .iter()
        .filter_map(|result| match &result.outcome {
            CaseOutcome::Failed(err) => Some(format!("{}: {err}", result.case)),
            _ => None,
        })
        .collect();
    assert!(failures.is_empty(), "failed cases:\n{}", failures.join("\n"));
    assert!(summary.passed > 0, "no case passed");
}

/// The error a case failed with.
pub fn failure<'a>(summary: &'a RunSummary, id: &str) -> &'a CaseError {
    let result = summary
        .results
        .iter()
        .find(|result| result.case.id() == id)
        .unwrap_or_else(|| panic!("no case {id}"));
    match &result.outcome {
        CaseOutcome::Failed(err) => err,
        other => panic!("{id} did not fail: {other:?}"),
    }
}

/// `test.config.toml` for one linked-output variant.
pub const MODULE_OUTPUT: &str = "[[variant]]\noutput_module = true\n";
