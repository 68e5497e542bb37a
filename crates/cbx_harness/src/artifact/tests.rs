#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;

use super::*;

#[test]
fn classification_by_extension() {
    let cases = [
        ("a.json", false, ModuleKind::Data),
        ("a.json", true, ModuleKind::Data),
        ("a.mjs", false, ModuleKind::Linked),
        ("a.cjs", true, ModuleKind::Sync),
        ("a.js", false, ModuleKind::Sync),
        ("a.js", true, ModuleKind::Linked),
    ];
    for (name, output_module, expected) in cases {
        assert_eq!(
            ModuleKind::classify(Path::new(name), output_module),
            expected,
            "{name} output_module={output_module}"
        );
    }
}

#[test]
fn normalize_collapses_dots() {
    assert_eq!(
        normalize(Path::new("/out/case/./dir/../one.js")),
        PathBuf::from("/out/case/one.js")
    );
    assert_eq!(normalize(Path::new("/a/b/../../c")), PathBuf::from("/c"));
}

#[test]
fn identity_keeps_suffix() {
    assert_eq!(
        &*identity(Path::new("/out/dir-cjs/one.js"), "?1"),
        "/out/dir-cjs/one.js?1"
    );
}

#[test]
fn read_reports_missing_files() {
    let dir = tempfile::tempdir().unwrap();
    let err = CompiledArtifact::read(dir.path().join("nope.js"), "", false).unwrap_err();
    assert!(matches!(err, LoadError::Io { .. }));

    let path = dir.path().join("data.json");
    std::fs::write(&path, "{}").unwrap();
    let artifact = CompiledArtifact::read(path, "", false).unwrap();
    assert_eq!(artifact.kind, ModuleKind::Data);
    assert_eq!(artifact.dir(), dir.path());
}
