//! Destination for script `console.*` output.
//!
//! Every line is emitted as a `tracing` event under the `cbx::console`
//! target. A sink may additionally capture lines so the host can inspect
//! them (the `cbx run` command and tests do).

use std::cell::RefCell;
use std::rc::Rc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsoleLevel {
    Log,
    Info,
    Warn,
    Error,
    Debug,
}

impl ConsoleLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            ConsoleLevel::Log => "log",
            ConsoleLevel::Info => "info",
            ConsoleLevel::Warn => "warn",
            ConsoleLevel::Error => "error",
            ConsoleLevel::Debug => "debug",
        }
    }
}

/// Shared console destination; clones write to the same buffer.
#[derive(Clone, Debug, Default)]
pub struct ConsoleSink {
    capture: Option<Rc<RefCell<Vec<(ConsoleLevel, String)>>>>,
}

impl ConsoleSink {
    /// A sink that keeps every line in addition to tracing it.
    pub fn capturing() -> Self {
        ConsoleSink {
            capture: Some(Rc::default()),
        }
    }

    pub fn write(&self, level: ConsoleLevel, line: &str) {
        match level {
            ConsoleLevel::Error => tracing::error!(target: "cbx::console", "{line}"),
            ConsoleLevel::Warn => tracing::warn!(target: "cbx::console", "{line}"),
            ConsoleLevel::Debug => tracing::debug!(target: "cbx::console", "{line}"),
            ConsoleLevel::Log | ConsoleLevel::Info => {
                tracing::info!(target: "cbx::console", "{line}");
            }
        }
        if let Some(capture) = &self.capture {
            capture.borrow_mut().push((level, line.to_string()));
        }
    }

    /// Captured lines, oldest first. Empty for non-capturing sinks.
    pub fn lines(&self) -> Vec<(ConsoleLevel, String)> {
        self.capture
            .as_ref()
            .map(|c| c.borrow().clone())
            .unwrap_or_default()
    }

    /// Captured text, one line per entry.
    pub fn output(&self) -> String {
        let mut out = String::new();
        for (_, line) in self.lines() {
            out.push_str(&line);
            out.push('\n');
        }
        out
    }

    pub fn clear(&self) {
        if let Some(capture) = &self.capture {
            capture.borrow_mut().clear();
        }
    }
}
