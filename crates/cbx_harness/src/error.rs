//! Failure taxonomy of a test case run.
//!
//! Script-visible failures (resolution errors, thrown values) travel as
//! [`cbx_eval::Interrupt`]s while code runs; once they reach the case
//! driver they are rendered into a [`CaseError`].

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

/// A specifier that could not be turned into a loadable artifact.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Cannot find module '{specifier}' from '{}'", from.display())]
    NotFound { specifier: String, from: PathBuf },
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid URL '{0}'")]
    InvalidUrl(String),
}

/// Why a test case failed.
#[derive(Debug, Error)]
pub enum CaseError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("build failed: {0}")]
    Build(String),

    #[error("{kind} expectations not met: {message}")]
    Expectation { kind: &'static str, message: String },

    #[error("Errors/Warnings during build:\n{0}")]
    BuildLog(String),

    #[error("Some modules were not cached in generation {generation}:\n{dump}")]
    CacheConsistency { generation: u32, dump: String },

    #[error("{entry}: {message}")]
    Evaluation { entry: String, message: String },

    #[error("Should have found at least one bundle file per build variant ({found} of {expected})")]
    MissingBundle { found: usize, expected: usize },

    #[error("no assertions produced: {with_assertions} of {executed} executed entry points registered test cases")]
    AssertionCount {
        with_assertions: usize,
        executed: usize,
    },

    #[error("{failed} of {total} assertions failed; first: {first}")]
    Assertions {
        failed: usize,
        total: usize,
        first: String,
    },

    #[error("unhandled rejection: {0}")]
    UnhandledRejection(String),

    #[error("test case timed out after {0}ms")]
    Timeout(u64),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CaseError {
    #[cold]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CaseError::Io {
            path: path.into(),
            source,
        }
    }
}
