//! Test case runner: discovery, per-case drivers and the parallel pool.
//!
//! Cases share nothing; each runs single-threaded on its own interpreter.
//! The pool only spreads whole cases over threads.

mod discovery;
mod driver;
mod result;

use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;

use crate::compiler::{Compiler, StagingCompiler};
use crate::error::CaseError;

pub use discovery::{discover, TestCase};
pub use driver::{run_file, CaseDriver};
pub use result::{CaseOutcome, CaseResult, RunSummary};

/// Output root used when none is given.
pub const DEFAULT_OUT_DIR: &str = "target/cbx-out";

#[derive(Clone, Debug)]
#[expect(
    clippy::struct_excessive_bools,
    reason = "Config struct: each bool controls an independent flag"
)]
pub struct RunnerConfig {
    /// Only run cases whose `category/name` contains this.
    pub filter: Option<String>,
    /// Run cache generations for every case.
    pub cache: bool,
    /// Build output root; case outputs and caches live below it.
    pub out_dir: PathBuf,
    pub parallel: bool,
    pub verbose: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            filter: None,
            cache: false,
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            parallel: true,
            verbose: false,
        }
    }
}

/// Runs every case under a root directory.
pub struct CaseRunner<F> {
    config: RunnerConfig,
    /// Makes one compiler per case.
    compiler: F,
}

impl CaseRunner<fn() -> StagingCompiler> {
    /// A runner building with the reference compiler.
    pub fn new(config: RunnerConfig) -> Self {
        CaseRunner {
            config,
            compiler: StagingCompiler::new,
        }
    }
}

impl<F, C> CaseRunner<F>
where
    F: Fn() -> C + Sync,
    C: Compiler,
{
    pub fn with_compiler(config: RunnerConfig, compiler: F) -> Self {
        CaseRunner { config, compiler }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    #[tracing::instrument(level = "info", skip(self), fields(root = %root.display()))]
    pub fn run(&self, root: &Path) -> Result<RunSummary, CaseError> {
        let started = Instant::now();
        let cases = discover(root, self.config.filter.as_deref())?;
        let results = if self.config.parallel && cases.len() > 1 {
            self.run_parallel(&cases)
        } else {
            self.run_sequential(&cases)
        };
        let summary = RunSummary::new(results, started.elapsed());
        tracing::info!(
            passed = summary.passed,
            failed = summary.failed,
            skipped = summary.skipped,
            "run finished"
        );
        Ok(summary)
    }

    pub fn run_case(&self, case: &TestCase) -> CaseResult {
        CaseDriver::new((self.compiler)(), &self.config).run(case)
    }

    fn run_sequential(&self, cases: &[TestCase]) -> Vec<CaseResult> {
        cases.iter().map(|case| self.run_case(case)).collect()
    }

    /// Interpreters recurse deeply, so worker threads get large stacks.
    fn run_parallel(&self, cases: &[TestCase]) -> Vec<CaseResult> {
        rayon::ThreadPoolBuilder::new()
            .stack_size(32 * 1024 * 1024)
            .build_scoped(rayon::ThreadBuilder::run, |pool| {
                pool.install(|| {
                    cases
                        .par_iter()
                        .map(|case| self.run_case(case))
                        .collect::<Vec<_>>()
                })
            })
            .unwrap_or_else(|e| {
                tracing::warn!("failed to create thread pool ({e}), running sequentially");
                self.run_sequential(cases)
            })
    }
}
