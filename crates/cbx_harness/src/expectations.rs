//! Expectation fixtures next to a case's sources.
//!
//! Each fixture is line based: one expected message fragment per line,
//! blank lines and `#` comments ignored. A fixture matches when it lists
//! exactly as many fragments as there are messages and each fragment
//! occurs in the message at the same position.

use std::path::Path;

use crate::config::ConfigError;
use crate::error::CaseError;

pub const ERRORS_FILE: &str = "errors.txt";
pub const WARNINGS_FILE: &str = "warnings.txt";
pub const DEPRECATIONS_FILE: &str = "deprecations.txt";
pub const INFRASTRUCTURE_LOG_FILE: &str = "infrastructure-log.txt";

/// File names the harness owns; compilers must not stage them.
pub const FIXTURE_FILES: [&str; 4] = [
    ERRORS_FILE,
    WARNINGS_FILE,
    DEPRECATIONS_FILE,
    INFRASTRUCTURE_LOG_FILE,
];

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Fixture {
    pub fragments: Vec<String>,
}

impl Fixture {
    pub fn parse(text: &str) -> Fixture {
        Fixture {
            fragments: text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string)
                .collect(),
        }
    }

    /// Read `name` from `dir`, `None` when it does not exist.
    pub fn load(dir: &Path, name: &str) -> Result<Option<Fixture>, ConfigError> {
        let path = dir.join(name);
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(Some(Fixture::parse(&text))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ConfigError::Io { path, source }),
        }
    }

    /// Compare `actual` messages against the fragments.
    pub fn check(&self, kind: &'static str, actual: &[String]) -> Result<(), CaseError> {
        if actual.len() != self.fragments.len() {
            return Err(CaseError::Expectation {
                kind,
                message: format!(
                    "expected {} {kind}s, got {}:\n{}",
                    self.fragments.len(),
                    actual.len(),
                    listing(actual)
                ),
            });
        }
        for (index, (fragment, message)) in self.fragments.iter().zip(actual).enumerate() {
            if !message.contains(fragment.as_str()) {
                return Err(CaseError::Expectation {
                    kind,
                    message: format!(
                        "{kind} {index} should contain '{fragment}', got:\n{message}"
                    ),
                });
            }
        }
        Ok(())
    }
}

/// The fixtures of one case.
#[derive(Clone, Debug, Default)]
pub struct Expectations {
    pub errors: Option<Fixture>,
    pub warnings: Option<Fixture>,
    pub deprecations: Option<Fixture>,
    pub infrastructure_log: Option<Fixture>,
}

impl Expectations {
    pub fn load(case_dir: &Path) -> Result<Expectations, ConfigError> {
        Ok(Expectations {
            errors: Fixture::load(case_dir, ERRORS_FILE)?,
            warnings: Fixture::load(case_dir, WARNINGS_FILE)?,
            deprecations: Fixture::load(case_dir, DEPRECATIONS_FILE)?,
            infrastructure_log: Fixture::load(case_dir, INFRASTRUCTURE_LOG_FILE)?,
        })
    }

    /// Errors must match `errors.txt`; without it any error fails the case.
    pub fn check_errors(&self, errors: &[String]) -> Result<(), CaseError> {
        match &self.errors {
            Some(fixture) => fixture.check("error", errors),
            None if errors.is_empty() => Ok(()),
            None => Err(CaseError::Build(listing(errors))),
        }
    }

    pub fn check_warnings(&self, warnings: &[String]) -> Result<(), CaseError> {
        check_optional(self.warnings.as_ref(), "warning", warnings)
    }

    pub fn check_deprecations(&self, deprecations: &[String]) -> Result<(), CaseError> {
        check_optional(self.deprecations.as_ref(), "deprecation", deprecations)
    }

    /// Warn/error log lines of one build; without a fixture any line fails.
    pub fn check_infrastructure_log(&self, lines: &[String]) -> Result<(), CaseError> {
        match &self.infrastructure_log {
            Some(fixture) => fixture.check("infrastructure log", lines),
            None if lines.is_empty() => Ok(()),
            None => Err(CaseError::BuildLog(lines.join("\n"))),
        }
    }
}

fn check_optional(
    fixture: Option<&Fixture>,
    kind: &'static str,
    actual: &[String],
) -> Result<(), CaseError> {
    fixture
        .cloned()
        .unwrap_or_default()
        .check(kind, actual)
}

fn listing(messages: &[String]) -> String {
    messages
        .iter()
        .map(|m| format!("  - {m}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests;
