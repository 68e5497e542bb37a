//! The build boundary.
//!
//! The harness never compiles anything itself: it hands a [`BuildRequest`]
//! to a [`Compiler`] and consumes the [`RunResult`] it returns. Returning
//! from [`Compiler::build`] is the "build finished" callback, so a caller
//! sequencing builds cannot start the next one early.
//!
//! [`StagingCompiler`] is the reference implementation used by the `cbx`
//! binary.

mod diagnostic;
mod hash;
mod staging;

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

pub use diagnostic::render_parse_error;
pub use hash::{combine, fingerprint};
pub use staging::StagingCompiler;

/// One build configuration of a case.
#[derive(Clone, Debug)]
pub struct VariantRequest {
    pub index: usize,
    /// Entry source relative to the case directory.
    pub entry: String,
    pub output_module: bool,
    /// Output file name of the entry.
    pub filename: String,
}

#[derive(Clone, Debug)]
pub struct BuildRequest {
    pub case_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Persistent cache root of the case; `None` disables caching.
    pub cache_dir: Option<PathBuf>,
    pub variants: Vec<VariantRequest>,
    pub propagate_cache: bool,
    /// 1-based build ordinal within a cache sequence.
    pub generation: u32,
}

impl BuildRequest {
    /// Cache directory of variant `index`.
    pub fn variant_cache_dir(&self, index: usize) -> Option<PathBuf> {
        self.cache_dir
            .as_ref()
            .map(|dir| dir.join(format!("config-{index}")))
    }
}

/// Per-module build statistics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ModuleStat {
    /// Output-relative path, e.g. `./dir-cjs/one.js`.
    pub identifier: String,
    pub variant: usize,
    #[serde(rename = "type")]
    pub module_type: String,
    /// Restored from the persistent cache instead of rebuilt.
    pub cached: bool,
    pub fingerprint: u64,
}

/// Outcome of one build invocation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub deprecations: Vec<String>,
    pub modules: Vec<ModuleStat>,
}

impl RunResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn module(&self, variant: usize, identifier: &str) -> Option<&ModuleStat> {
        self.modules
            .iter()
            .find(|m| m.variant == variant && m.identifier == identifier)
    }
}

/// A build that could not run at all.
#[derive(Debug, Error)]
pub enum BuildFailure {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    Fatal(String),
}

impl BuildFailure {
    #[cold]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BuildFailure::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        })
    }
}

/// Log lines a compiler emits about its own infrastructure (cache reads
/// and writes, manifests), separate from build diagnostics.
#[derive(Clone, Debug, Default)]
pub struct InfrastructureLog {
    lines: Vec<(LogLevel, String)>,
}

impl InfrastructureLog {
    pub fn new() -> Self {
        InfrastructureLog::default()
    }

    pub fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Error => tracing::error!(target: "cbx::build", "{message}"),
            LogLevel::Warn => tracing::warn!(target: "cbx::build", "{message}"),
            LogLevel::Info => tracing::info!(target: "cbx::build", "{message}"),
            LogLevel::Debug => tracing::debug!(target: "cbx::build", "{message}"),
        }
        self.lines.push((level, message));
    }

    pub fn debug(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    pub fn lines(&self) -> &[(LogLevel, String)] {
        &self.lines
    }

    /// Warn and error lines: the output that must match
    /// `infrastructure-log.txt`.
    pub fn diagnostics(&self) -> Vec<String> {
        self.lines
            .iter()
            .filter(|(level, _)| *level >= LogLevel::Warn)
            .map(|(_, message)| message.clone())
            .collect()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

/// Something that turns a case directory into executable artifacts.
pub trait Compiler {
    fn build(
        &mut self,
        request: &BuildRequest,
        log: &mut InfrastructureLog,
    ) -> Result<RunResult, BuildFailure>;
}

impl<C: Compiler + ?Sized> Compiler for &mut C {
    fn build(
        &mut self,
        request: &BuildRequest,
        log: &mut InfrastructureLog,
    ) -> Result<RunResult, BuildFailure> {
        (**self).build(request, log)
    }
}
