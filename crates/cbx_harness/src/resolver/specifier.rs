//! Turning specifiers into file system candidates.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use url::Url;

use crate::error::LoadError;

/// Origin under which the output directory is served to web targets.
pub const TEST_CASES_URL: &str = "https://test.cases/path/";

/// Public path bundles use for their chunks; maps to the requesting directory.
pub const PUBLIC_PATH_URL: &str = "https://example.com/public/path/";

/// Extensions tried, in order, when a path does not name a file.
pub const PROBE_EXTENSIONS: [&str; 4] = [".js", ".mjs", ".cjs", ".json"];

/// A specifier after URL rewriting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    /// A path, resolved against `base`.
    Path { base: PathBuf, path: String },
    /// An opaque module name.
    Bare(String),
}

pub fn classify(specifier: &str, base: &Path, output_dir: &Path) -> Result<Request, LoadError> {
    if specifier.starts_with("file:") {
        let url = Url::parse(specifier).map_err(|_| LoadError::InvalidUrl(specifier.to_string()))?;
        let file = url
            .to_file_path()
            .map_err(|()| LoadError::InvalidUrl(specifier.to_string()))?;
        let mut path = file.to_string_lossy().into_owned();
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }
        return Ok(Request::Path {
            base: base.to_path_buf(),
            path,
        });
    }
    if let Some(rest) = specifier.strip_prefix(TEST_CASES_URL) {
        return Ok(Request::Path {
            base: output_dir.to_path_buf(),
            path: format!("./{rest}"),
        });
    }
    if let Some(rest) = specifier.strip_prefix(PUBLIC_PATH_URL) {
        return Ok(Request::Path {
            base: base.to_path_buf(),
            path: format!("./{rest}"),
        });
    }
    if is_path(specifier) {
        return Ok(Request::Path {
            base: base.to_path_buf(),
            path: specifier.to_string(),
        });
    }
    Ok(Request::Bare(specifier.to_string()))
}

fn is_path(specifier: &str) -> bool {
    specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier.starts_with('/')
        || specifier == "."
        || specifier == ".."
}

/// Split `?query` parts off every path segment: the physical path plus the
/// concatenated queries.
pub fn split_queries(path: &str) -> (String, String) {
    let mut physical = Vec::new();
    let mut suffix = String::new();
    for segment in path.split('/') {
        match segment.split_once('?') {
            Some((name, query)) => {
                physical.push(name);
                suffix.push('?');
                suffix.push_str(query);
            }
            None => physical.push(segment),
        }
    }
    (physical.join("/"), suffix)
}

/// The file `candidate` refers to: itself, with an extension appended, or
/// an `index` file inside it.
pub fn probe(candidate: &Path) -> Option<PathBuf> {
    if candidate.is_file() {
        return Some(candidate.to_path_buf());
    }
    for ext in PROBE_EXTENSIONS {
        let mut name = OsString::from(candidate.as_os_str());
        name.push(ext);
        let path = PathBuf::from(name);
        if path.is_file() {
            return Some(path);
        }
    }
    if candidate.is_dir() {
        return PROBE_EXTENSIONS
            .iter()
            .map(|ext| candidate.join(format!("index{ext}")))
            .find(|path| path.is_file());
    }
    None
}

/// `path` relative to `root` with `/` separators, prefixed with `./`.
pub fn relative_identifier(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(format!("./{}", parts.join("/")))
}

/// Directory of `path` below `root` with a trailing `/`, or empty when
/// `path` sits directly in `root`.
pub fn sub_path(root: &Path, path: &Path) -> String {
    let Some(dir) = path.parent() else {
        return String::new();
    };
    match relative_identifier(root, dir) {
        Some(relative) if relative != "./" => format!("{}/", &relative[2..]),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests;
