//! Test case discovery: `<root>/<category>/<case>/`.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::CaseError;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct TestCase {
    pub category: String,
    pub name: String,
    pub dir: PathBuf,
}

impl TestCase {
    /// `category/name`, the string filters match against.
    pub fn id(&self) -> String {
        format!("{}/{}", self.category, self.name)
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.name)
    }
}

/// Every case under `root`, sorted; `filter` keeps ids containing it.
pub fn discover(root: &Path, filter: Option<&str>) -> Result<Vec<TestCase>, CaseError> {
    let mut cases = Vec::new();
    for category in subdirectories(root)? {
        let Some(category_name) = visible_name(&category) else {
            continue;
        };
        for dir in subdirectories(&category)? {
            let Some(name) = visible_name(&dir) else {
                continue;
            };
            let case = TestCase {
                category: category_name.clone(),
                name,
                dir,
            };
            if filter.map_or(true, |filter| case.id().contains(filter)) {
                cases.push(case);
            }
        }
    }
    cases.sort();
    tracing::debug!(root = %root.display(), count = cases.len(), "discovered test cases");
    Ok(cases)
}

fn subdirectories(dir: &Path) -> Result<Vec<PathBuf>, CaseError> {
    let entries = fs::read_dir(dir).map_err(|err| CaseError::io(dir, err))?;
    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| CaseError::io(dir, err))?;
        let path = entry.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    Ok(dirs)
}

/// Directory name unless it starts with `_` or `.`.
fn visible_name(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    if name.starts_with('_') || name.starts_with('.') {
        None
    } else {
        Some(name.to_string())
    }
}

#[cfg(test)]
mod tests;
