#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::Path;

use pretty_assertions::assert_eq;

use super::*;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn request(case: &Path, out: &Path, cache: Option<&Path>, propagate: bool) -> BuildRequest {
    BuildRequest {
        case_dir: case.to_path_buf(),
        output_dir: out.to_path_buf(),
        cache_dir: cache.map(Path::to_path_buf),
        variants: vec![VariantRequest {
            index: 0,
            entry: "./index.js".to_string(),
            output_module: false,
            filename: "bundle0.js".to_string(),
        }],
        propagate_cache: propagate,
        generation: 1,
    }
}

fn cached(result: &RunResult) -> Vec<(String, bool)> {
    result
        .modules
        .iter()
        .map(|m| (m.identifier.clone(), m.cached))
        .collect()
}

#[test]
fn stages_entry_and_sources() {
    let case = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write(case.path(), "index.js", "require('./lib/a');");
    write(case.path(), "lib/a.js", "module.exports = 1;");
    write(case.path(), "data.json", "{\"x\": 1}");
    write(case.path(), "errors.txt", "ignored fixture");

    let mut log = InfrastructureLog::new();
    let result = StagingCompiler::new()
        .build(&request(case.path(), out.path(), None, false), &mut log)
        .unwrap();

    assert!(result.errors.is_empty(), "{:?}", result.errors);
    assert!(out.path().join("bundle0.js").is_file());
    assert!(out.path().join("lib/a.js").is_file());
    assert!(!out.path().join("errors.txt").exists());
    assert_eq!(
        cached(&result),
        vec![
            ("./bundle0.js".to_string(), false),
            ("./data.json".to_string(), false),
            ("./lib/a.js".to_string(), false),
        ]
    );
    assert_eq!(result.modules[1].module_type, "json");
}

#[test]
fn syntax_errors_become_build_errors() {
    let case = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write(case.path(), "index.js", "let = ;");

    let result = StagingCompiler::new()
        .build(
            &request(case.path(), out.path(), None, false),
            &mut InfrastructureLog::new(),
        )
        .unwrap();
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("SyntaxError"), "{}", result.errors[0]);
}

#[test]
fn missing_entry_is_fatal() {
    let case = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let err = StagingCompiler::new()
        .build(
            &request(case.path(), out.path(), None, false),
            &mut InfrastructureLog::new(),
        )
        .unwrap_err();
    assert!(err.to_string().contains("Module not found"), "{err}");
}

#[test]
fn second_build_restores_unchanged_modules() {
    let case = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    write(case.path(), "index.js", "require('./a');");
    write(case.path(), "a.js", "module.exports = 'a';");
    write(case.path(), "b.js", "module.exports = 'b';");

    let req = request(case.path(), out.path(), Some(cache.path()), false);
    let mut compiler = StagingCompiler::new();
    let first = compiler.build(&req, &mut InfrastructureLog::new()).unwrap();
    assert!(first.modules.iter().all(|m| !m.cached));

    let second = compiler.build(&req, &mut InfrastructureLog::new()).unwrap();
    assert!(second.modules.iter().all(|m| m.cached));

    write(case.path(), "a.js", "module.exports = 'changed';");
    let third = compiler.build(&req, &mut InfrastructureLog::new()).unwrap();
    assert_eq!(
        cached(&third),
        vec![
            ("./bundle0.js".to_string(), true),
            ("./a.js".to_string(), false),
            ("./b.js".to_string(), true),
        ]
    );
}

#[test]
fn propagation_invalidates_dependents() {
    let case = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    write(case.path(), "index.js", "require('./a');");
    write(case.path(), "a.js", "module.exports = 'a';");
    write(case.path(), "b.js", "module.exports = 'b';");

    let req = request(case.path(), out.path(), Some(cache.path()), true);
    let mut compiler = StagingCompiler::new();
    compiler.build(&req, &mut InfrastructureLog::new()).unwrap();
    write(case.path(), "a.js", "module.exports = 'changed';");
    let second = compiler.build(&req, &mut InfrastructureLog::new()).unwrap();
    assert_eq!(
        cached(&second),
        vec![
            ("./bundle0.js".to_string(), false),
            ("./a.js".to_string(), false),
            ("./b.js".to_string(), true),
        ]
    );
}

#[test]
fn corrupt_manifest_is_logged_and_rebuilt() {
    let case = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    write(case.path(), "index.js", "1;");
    write(cache.path(), "config-0/manifest.bin", "not bincode");

    let mut log = InfrastructureLog::new();
    let result = StagingCompiler::new()
        .build(&request(case.path(), out.path(), Some(cache.path()), false), &mut log)
        .unwrap();
    assert!(result.modules.iter().all(|m| !m.cached));
    let diagnostics = log.diagnostics();
    assert_eq!(diagnostics.len(), 1, "{diagnostics:?}");
    assert!(diagnostics[0].contains("manifest"), "{diagnostics:?}");

    let mut log = InfrastructureLog::new();
    let again = StagingCompiler::new()
        .build(&request(case.path(), out.path(), Some(cache.path()), false), &mut log)
        .unwrap();
    assert!(again.modules.iter().all(|m| m.cached));
    assert!(log.diagnostics().is_empty());
}
