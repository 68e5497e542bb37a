//! Compiled artifacts as the harness sees them on disk.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use cbx_ir::Name;

use crate::error::LoadError;

/// How an artifact is loaded, decided once from its file name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    /// Evaluated eagerly at the point of first `require`.
    Sync,
    /// Linked, then evaluated; exports a namespace.
    Linked,
    /// JSON, parsed and returned as-is.
    Data,
}

impl ModuleKind {
    /// Classify by extension: `.json` is data, `.mjs` linked, `.cjs`
    /// synchronous, and `.js` follows the variant's output format.
    pub fn classify(path: &Path, output_module: bool) -> ModuleKind {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => ModuleKind::Data,
            Some("mjs") => ModuleKind::Linked,
            Some("cjs") => ModuleKind::Sync,
            _ if output_module => ModuleKind::Linked,
            _ => ModuleKind::Sync,
        }
    }

    /// Module type as reported in build statistics.
    pub fn stat_type(self) -> &'static str {
        match self {
            ModuleKind::Sync => "javascript/auto",
            ModuleKind::Linked => "javascript/esm",
            ModuleKind::Data => "json",
        }
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModuleKind::Sync => "sync",
            ModuleKind::Linked => "linked",
            ModuleKind::Data => "data",
        })
    }
}

/// One loadable unit read from the output directory.
#[derive(Clone, Debug)]
pub struct CompiledArtifact {
    pub path: PathBuf,
    /// Absolute path plus disambiguating suffix.
    pub identity: Name,
    pub content: String,
    pub kind: ModuleKind,
}

impl CompiledArtifact {
    pub fn read(path: PathBuf, suffix: &str, output_module: bool) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(&path).map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(CompiledArtifact {
            identity: identity(&path, suffix),
            kind: ModuleKind::classify(&path, output_module),
            path,
            content,
        })
    }

    /// Directory relative requests from this artifact resolve against.
    pub fn dir(&self) -> PathBuf {
        self.path.parent().map(Path::to_path_buf).unwrap_or_default()
    }
}

/// Identity key of `path` loaded under `suffix`.
pub fn identity(path: &Path, suffix: &str) -> Name {
    Name::from(format!("{}{suffix}", path.display()))
}

/// Resolve `.` and `..` components without touching the file system.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests;
