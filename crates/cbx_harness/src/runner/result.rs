//! Case outcomes and the run summary.

use std::fmt;
use std::time::Duration;

use super::discovery::TestCase;
use crate::bridge::AssertionResult;
use crate::error::CaseError;

#[derive(Debug)]
pub enum CaseOutcome {
    Passed,
    Failed(CaseError),
    Skipped(String),
}

impl CaseOutcome {
    #[inline]
    pub fn is_passed(&self) -> bool {
        matches!(self, CaseOutcome::Passed)
    }

    #[inline]
    pub fn is_failed(&self) -> bool {
        matches!(self, CaseOutcome::Failed(_))
    }

    #[inline]
    pub fn is_skipped(&self) -> bool {
        matches!(self, CaseOutcome::Skipped(_))
    }
}

#[derive(Debug)]
pub struct CaseResult {
    pub case: TestCase,
    pub outcome: CaseOutcome,
    /// Per-assertion results, in registration order.
    pub assertions: Vec<AssertionResult>,
    pub duration: Duration,
}

impl CaseResult {
    #[cold]
    pub fn failed(case: TestCase, error: CaseError, duration: Duration) -> Self {
        CaseResult {
            case,
            outcome: CaseOutcome::Failed(error),
            assertions: Vec::new(),
            duration,
        }
    }
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub results: Vec<CaseResult>,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration: Duration,
}

impl RunSummary {
    pub fn new(results: Vec<CaseResult>, duration: Duration) -> Self {
        let count = |f: fn(&CaseOutcome) -> bool| results.iter().filter(|r| f(&r.outcome)).count();
        RunSummary {
            passed: count(CaseOutcome::is_passed),
            failed: count(CaseOutcome::is_failed),
            skipped: count(CaseOutcome::is_skipped),
            results,
            duration,
        }
    }

    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// 0 when everything passed, 1 on failures, 2 when nothing ran.
    pub fn exit_code(&self) -> i32 {
        if self.total() == 0 {
            2
        } else if self.has_failures() {
            1
        } else {
            0
        }
    }

    /// Per-case lines (failures always, the rest when `verbose`).
    pub fn report(&self, verbose: bool) -> String {
        let mut out = String::new();
        for result in &self.results {
            match &result.outcome {
                CaseOutcome::Failed(error) => {
                    out.push_str(&format!("  FAIL: {} - {error}\n", result.case));
                }
                CaseOutcome::Passed if verbose => {
                    out.push_str(&format!("  PASS: {} ({:.2?})\n", result.case, result.duration));
                    for assertion in &result.assertions {
                        out.push_str(&format!("    ok: {assertion}\n"));
                    }
                }
                CaseOutcome::Skipped(reason) if verbose => {
                    out.push_str(&format!("  SKIP: {} - {reason}\n", result.case));
                }
                _ => {}
            }
        }
        out.push_str(&self.to_string());
        out
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Test Summary:")?;
        writeln!(
            f,
            "  {} passed, {} failed, {} skipped ({} total)",
            self.passed,
            self.failed,
            self.skipped,
            self.total()
        )?;
        writeln!(f, "  Completed in {:.2?}", self.duration)?;
        if self.has_failures() {
            write!(f, "FAILED")
        } else if self.total() == 0 {
            write!(f, "NO TESTS FOUND")
        } else {
            write!(f, "OK")
        }
    }
}

#[cfg(test)]
mod tests;
