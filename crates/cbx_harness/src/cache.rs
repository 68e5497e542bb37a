//! Cache-validation controller: sequential builds against one cache.
//!
//! Generation 1 fills the persistent cache, later generations must report
//! every unchanged module as restored from it. Builds run strictly one
//! after another; the output directory is wiped before each, the cache
//! directory only before the first.

use std::fs;
use std::path::Path;

use crate::compiler::{BuildFailure, BuildRequest, Compiler, InfrastructureLog, RunResult};
use crate::error::CaseError;
use crate::expectations::Expectations;

/// Why a generation sequence stopped.
#[derive(Debug)]
pub enum GenerationError {
    /// The compiler could not build at all.
    Fatal(BuildFailure),
    Case(CaseError),
}

impl From<CaseError> for GenerationError {
    fn from(err: CaseError) -> Self {
        GenerationError::Case(err)
    }
}

pub struct CacheController<'a, C: Compiler> {
    compiler: C,
    expectations: &'a Expectations,
}

impl<'a, C: Compiler> CacheController<'a, C> {
    pub fn new(compiler: C, expectations: &'a Expectations) -> Self {
        CacheController {
            compiler,
            expectations,
        }
    }

    /// Run `count` builds of `request` and return their results in order.
    ///
    /// With `count == 1` this is a plain single build.
    #[tracing::instrument(level = "debug", skip_all, fields(output = %request.output_dir.display(), count = count))]
    pub fn run_generations(
        &mut self,
        request: &BuildRequest,
        count: u32,
    ) -> Result<Vec<RunResult>, GenerationError> {
        if let Some(cache_dir) = &request.cache_dir {
            remove_dir(cache_dir)?;
        }
        let mut log = InfrastructureLog::new();
        let mut results: Vec<RunResult> = Vec::with_capacity(count as usize);
        for generation in 1..=count.max(1) {
            let _span = tracing::debug_span!("generation", generation).entered();
            remove_dir(&request.output_dir)?;
            fs::create_dir_all(&request.output_dir)
                .map_err(|err| CaseError::io(&request.output_dir, err))?;
            log.clear();

            let request = BuildRequest {
                generation,
                ..request.clone()
            };
            let result = self
                .compiler
                .build(&request, &mut log)
                .map_err(GenerationError::Fatal)?;

            self.expectations
                .check_infrastructure_log(&log.diagnostics())?;
            if let Some(first) = results.first() {
                if !result.has_errors() {
                    verify_cached(first, &result, generation)?;
                }
            }
            tracing::debug!(
                generation,
                modules = result.modules.len(),
                cached = result.modules.iter().filter(|m| m.cached).count(),
                "generation finished"
            );
            results.push(result);
        }
        Ok(results)
    }
}

/// Every module unchanged since generation 1 must be reported as cached.
pub fn verify_cached(first: &RunResult, current: &RunResult, generation: u32) -> Result<(), CaseError> {
    let rebuilt = current.modules.iter().any(|module| {
        !module.cached
            && first
                .module(module.variant, &module.identifier)
                .is_some_and(|original| original.fingerprint == module.fingerprint)
    });
    if !rebuilt {
        return Ok(());
    }
    let dump = serde_json::to_string_pretty(&current.modules)
        .unwrap_or_else(|err| format!("<cannot render module statistics: {err}>"));
    Err(CaseError::CacheConsistency { generation, dump })
}

fn remove_dir(dir: &Path) -> Result<(), CaseError> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(CaseError::io(dir, err)),
    }
}

#[cfg(test)]
mod tests;
