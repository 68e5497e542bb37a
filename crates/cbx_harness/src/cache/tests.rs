#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::Path;

use pretty_assertions::assert_eq;

use super::*;
use crate::compiler::{ModuleStat, VariantRequest};
use crate::expectations::Fixture;

/// Replays canned results and records what it saw.
struct Scripted {
    results: Vec<RunResult>,
    log_lines: Vec<Vec<&'static str>>,
    generations: Vec<u32>,
}

impl Compiler for Scripted {
    fn build(
        &mut self,
        request: &BuildRequest,
        log: &mut InfrastructureLog,
    ) -> Result<RunResult, BuildFailure> {
        let index = self.generations.len();
        self.generations.push(request.generation);
        assert!(request.output_dir.is_dir());
        assert_eq!(std::fs::read_dir(&request.output_dir).unwrap().count(), 0);
        std::fs::write(request.output_dir.join("bundle0.js"), "").unwrap();
        for line in self.log_lines.get(index).into_iter().flatten() {
            log.warn(*line);
        }
        Ok(self.results[index].clone())
    }
}

fn stat(identifier: &str, cached: bool, fingerprint: u64) -> ModuleStat {
    ModuleStat {
        identifier: identifier.to_string(),
        variant: 0,
        module_type: "javascript/auto".to_string(),
        cached,
        fingerprint,
    }
}

fn result(modules: Vec<ModuleStat>) -> RunResult {
    RunResult {
        modules,
        ..RunResult::default()
    }
}

fn request(out: &Path, cache: &Path) -> BuildRequest {
    BuildRequest {
        case_dir: out.to_path_buf(),
        output_dir: out.join("out"),
        cache_dir: Some(cache.to_path_buf()),
        variants: vec![VariantRequest {
            index: 0,
            entry: "./index.js".to_string(),
            output_module: false,
            filename: "bundle0.js".to_string(),
        }],
        propagate_cache: false,
        generation: 0,
    }
}

#[test]
fn generations_run_in_order_and_clear_output() {
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("cache");
    std::fs::create_dir_all(&cache).unwrap();
    std::fs::write(cache.join("stale"), "x").unwrap();

    let mut compiler = Scripted {
        results: vec![
            result(vec![stat("./a.js", false, 1)]),
            result(vec![stat("./a.js", true, 1)]),
            result(vec![stat("./a.js", true, 1)]),
        ],
        log_lines: Vec::new(),
        generations: Vec::new(),
    };
    let expectations = Expectations::default();
    let results = CacheController::new(&mut compiler, &expectations)
        .run_generations(&request(dir.path(), &cache), 3)
        .unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(compiler.generations, vec![1, 2, 3]);
    assert!(!cache.join("stale").exists());
}

#[test]
fn unchanged_but_rebuilt_module_fails_with_dump() {
    let dir = tempfile::tempdir().unwrap();
    let mut compiler = Scripted {
        results: vec![
            result(vec![stat("./a.js", false, 1), stat("./b.js", false, 2)]),
            result(vec![stat("./a.js", true, 1), stat("./b.js", false, 2)]),
        ],
        log_lines: Vec::new(),
        generations: Vec::new(),
    };
    let expectations = Expectations::default();
    let err = CacheController::new(&mut compiler, &expectations)
        .run_generations(&request(dir.path(), &dir.path().join("cache")), 2)
        .unwrap_err();
    let GenerationError::Case(CaseError::CacheConsistency { generation, dump }) = err else {
        panic!("unexpected {err:?}");
    };
    assert_eq!(generation, 2);
    assert!(dump.contains("\"identifier\": \"./b.js\""), "{dump}");
    assert!(dump.contains("\"cached\": false"), "{dump}");
}

#[test]
fn changed_module_may_be_rebuilt() {
    let first = result(vec![stat("./a.js", false, 1)]);
    let second = result(vec![stat("./a.js", false, 9)]);
    verify_cached(&first, &second, 2).unwrap();
}

#[test]
fn log_lines_need_a_fixture() {
    let dir = tempfile::tempdir().unwrap();
    let scripted = || Scripted {
        results: vec![result(Vec::new())],
        log_lines: vec![vec!["corrupt cache manifest"]],
        generations: Vec::new(),
    };

    let expectations = Expectations::default();
    let err = CacheController::new(scripted(), &expectations)
        .run_generations(&request(dir.path(), &dir.path().join("cache")), 1)
        .unwrap_err();
    assert!(matches!(err, GenerationError::Case(CaseError::BuildLog(_))), "{err:?}");

    let expectations = Expectations {
        infrastructure_log: Some(Fixture::parse("corrupt")),
        ..Expectations::default()
    };
    CacheController::new(scripted(), &expectations)
        .run_generations(&request(dir.path(), &dir.path().join("cache")), 1)
        .unwrap();
}
