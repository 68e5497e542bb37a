//! One test case, start to finish.
//!
//! config, build (one or several cache generations), fixtures, then the
//! entries of every variant in a shared interpreter, then the registered
//! assertion cases. The interpreter and every module graph are dropped
//! with the case.

use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};

use cbx_eval::{EvalResult, Interpreter, Interrupt, Realm, Value};

use super::discovery::TestCase;
use super::result::{CaseOutcome, CaseResult};
use super::RunnerConfig;
use crate::bridge::{describe, settled, AssertionBridge, AssertionResult};
use crate::cache::{CacheController, GenerationError};
use crate::compiler::{BuildRequest, Compiler, RunResult, VariantRequest};
use crate::config::CaseConfig;
use crate::error::CaseError;
use crate::expectations::Expectations;
use crate::resolver::{Resolver, ResolverOptions};
use crate::sandbox::Target;

/// Drives single cases against one compiler.
pub struct CaseDriver<C: Compiler> {
    compiler: C,
    out_root: PathBuf,
    force_cache: bool,
}

/// What survived the build phase.
enum Built {
    /// Nothing left to run; the case passed.
    Done,
    Execute(RunResult),
}

impl<C: Compiler> CaseDriver<C> {
    pub fn new(compiler: C, config: &RunnerConfig) -> Self {
        CaseDriver {
            compiler,
            out_root: config.out_dir.clone(),
            force_cache: config.cache,
        }
    }

    #[tracing::instrument(level = "info", skip(self), fields(case = %case))]
    pub fn run(&mut self, case: &TestCase) -> CaseResult {
        let started = Instant::now();
        let config = match CaseConfig::load(&case.dir) {
            Ok(config) => config,
            Err(err) => return CaseResult::failed(case.clone(), err.into(), started.elapsed()),
        };
        if let Some(reason) = &config.skip {
            tracing::debug!(%reason, "case skipped");
            return CaseResult {
                case: case.clone(),
                outcome: CaseOutcome::Skipped(reason.clone()),
                assertions: Vec::new(),
                duration: started.elapsed(),
            };
        }

        let (outcome, assertions) = match self.run_case(case, &config) {
            Ok(assertions) => (CaseOutcome::Passed, assertions),
            Err(err) => {
                tracing::debug!(error = %err, "case failed");
                (CaseOutcome::Failed(err), Vec::new())
            }
        };
        CaseResult {
            case: case.clone(),
            outcome,
            assertions,
            duration: started.elapsed(),
        }
    }

    fn run_case(
        &mut self,
        case: &TestCase,
        config: &CaseConfig,
    ) -> Result<Vec<AssertionResult>, CaseError> {
        let expectations = Expectations::load(&case.dir)?;
        let request = self.build_request(case, config);
        let result = match self.build(&request, config, &expectations)? {
            Built::Done => return Ok(Vec::new()),
            Built::Execute(result) => result,
        };
        if config.no_tests {
            return Ok(Vec::new());
        }
        execute(&request, config, result)
    }

    fn build_request(&self, case: &TestCase, config: &CaseConfig) -> BuildRequest {
        let output_dir = self.out_root.join(&case.category).join(&case.name);
        let caching = config.generations(self.force_cache) > 1;
        BuildRequest {
            case_dir: case.dir.clone(),
            output_dir,
            cache_dir: caching.then(|| {
                self.out_root
                    .join(".cache")
                    .join(&case.category)
                    .join(&case.name)
            }),
            variants: config
                .variant
                .iter()
                .enumerate()
                .map(|(index, variant)| VariantRequest {
                    index,
                    entry: variant.entry().to_string(),
                    output_module: variant.output_module,
                    filename: variant.filename(index),
                })
                .collect(),
            propagate_cache: config.propagate_cache,
            generation: 1,
        }
    }

    /// Run the build generations and check the fixtures of the last one.
    fn build(
        &mut self,
        request: &BuildRequest,
        config: &CaseConfig,
        expectations: &Expectations,
    ) -> Result<Built, CaseError> {
        let count = config.generations(self.force_cache);
        let mut controller = CacheController::new(&mut self.compiler, expectations);
        let results = match controller.run_generations(request, count) {
            Ok(results) => results,
            Err(GenerationError::Fatal(failure)) => {
                expectations
                    .check_errors(&[failure.to_string()])
                    .map_err(|_| CaseError::Build(failure.to_string()))?;
                return Ok(Built::Done);
            }
            Err(GenerationError::Case(err)) => return Err(err),
        };
        let Some(last) = results.into_iter().last() else {
            return Err(CaseError::Build("no build generation ran".to_string()));
        };
        expectations.check_errors(&last.errors)?;
        expectations.check_warnings(&last.warnings)?;
        expectations.check_deprecations(&last.deprecations)?;
        if last.has_errors() {
            tracing::debug!(errors = last.errors.len(), "expected build errors, not executing");
            return Ok(Built::Done);
        }
        Ok(Built::Execute(last))
    }
}

/// Execute every variant's bundles and then the registered cases.
fn execute(
    request: &BuildRequest,
    config: &CaseConfig,
    stats: RunResult,
) -> Result<Vec<AssertionResult>, CaseError> {
    let output_dir = request
        .output_dir
        .canonicalize()
        .map_err(|err| CaseError::io(&request.output_dir, err))?;
    let stats = Rc::new(stats);
    let host_realm = Realm::new();
    let bridge = AssertionBridge::new();
    let resolvers: Vec<_> = config
        .variant
        .iter()
        .enumerate()
        .map(|(index, variant)| {
            Resolver::new(
                &host_realm,
                Target::classify(&variant.target),
                &bridge,
                ResolverOptions {
                    variant: index,
                    output_module: variant.output_module,
                    output_dir: output_dir.clone(),
                    modules: config.module_values(),
                    remap: config.resolve.clone(),
                    stats: Some(Rc::clone(&stats)),
                },
            )
        })
        .collect();

    let mut interp = Interpreter::new(host_realm);
    let result = run_variants(&mut interp, &bridge, &resolvers, config);
    for resolver in &resolvers {
        resolver.teardown();
    }
    bridge.clear();
    result
}

fn run_variants(
    interp: &mut Interpreter,
    bridge: &AssertionBridge,
    resolvers: &[Rc<Resolver>],
    config: &CaseConfig,
) -> Result<Vec<AssertionResult>, CaseError> {
    let timeout = Duration::from_millis(config.timeout_ms);
    interp.set_deadline(Some(Instant::now() + timeout));

    let mut entries = Vec::new();
    let mut found = 0;
    for (index, resolver) in resolvers.iter().enumerate() {
        let bundles = bundle_files(config, index, &resolver.options().output_dir);
        found += usize::from(!bundles.is_empty());
        for file in bundles {
            let entry = bridge.begin_entry();
            let value = resolver.require_entry(interp, &file);
            bridge.end_entry();
            let value = value.map_err(|err| evaluation_error(&file, err, config))?;
            entries.push((entry, file, value));
        }
    }
    let expected = resolvers.len();
    if found < expected {
        return Err(CaseError::MissingBundle { found, expected });
    }

    for (entry, file, value) in &entries {
        bridge
            .with_entry(*entry, || settle_entry(interp, value))
            .map_err(|err| evaluation_error(file, err, config))?;
    }
    bridge.check_counts()?;

    let assertions = bridge.run_cases(interp, timeout);
    let failures: Vec<_> = assertions
        .iter()
        .filter(|assertion| !assertion.outcome.is_passed())
        .collect();
    if let Some(first) = failures.first() {
        return Err(CaseError::Assertions {
            failed: failures.len(),
            total: assertions.len(),
            first: first.to_string(),
        });
    }

    interp.set_deadline(Some(Instant::now() + timeout));
    interp
        .run_until_idle()
        .map_err(|err| evaluation_error("event loop", err, config))?;
    let mut leftovers = interp.take_unhandled_rejections();
    leftovers.extend(interp.take_uncaught());
    if let Some(reason) = leftovers.first() {
        return Err(CaseError::UnhandledRejection(describe(reason)));
    }
    Ok(assertions)
}

/// Run one script file in a fresh node-like sandbox and describe what it
/// settles to. Backs `cbx run`.
pub fn run_file(path: &Path, timeout: Duration) -> Result<String, CaseError> {
    let path = path.canonicalize().map_err(|err| CaseError::io(path, err))?;
    let (Some(dir), Some(file)) = (path.parent(), path.file_name()) else {
        return Err(CaseError::Build(format!("not a file: {}", path.display())));
    };
    let file = file.to_string_lossy().into_owned();
    let realm = Realm::new();
    let bridge = AssertionBridge::new();
    let resolver = Resolver::new(
        &realm,
        Target::Node,
        &bridge,
        ResolverOptions {
            output_module: file.ends_with(".mjs"),
            output_dir: dir.to_path_buf(),
            ..ResolverOptions::default()
        },
    );
    let mut interp = Interpreter::new(realm);
    interp.set_deadline(Some(Instant::now() + timeout));
    let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
    let outcome = resolver
        .require_entry(&mut interp, &file)
        .and_then(|value| {
            let settled = match value.as_object().filter(|obj| obj.is_promise()) {
                Some(promise) => match settled(&mut interp, promise)? {
                    Some(Ok(value)) => value,
                    Some(Err(reason)) => return Err(Interrupt::Throw(reason)),
                    None => value,
                },
                None => value,
            };
            interp.run_until_idle()?;
            Ok(settled)
        })
        .map(|value| interp.inspect(&value))
        .map_err(|err| match err {
            Interrupt::Throw(value) => CaseError::Evaluation {
                entry: file.clone(),
                message: describe(&value),
            },
            Interrupt::Terminate(_) => CaseError::Timeout(timeout_ms),
            _ => CaseError::Evaluation {
                entry: file.clone(),
                message: "illegal completion".to_string(),
            },
        });
    resolver.teardown();
    outcome
}

/// Files executed for variant `index`: the configured bundle patterns, or
/// the variant's output file, whichever exist.
fn bundle_files(config: &CaseConfig, index: usize, output_dir: &Path) -> Vec<String> {
    let candidates: Vec<String> = if config.bundles.is_empty() {
        config
            .variant
            .get(index)
            .map(|variant| vec![variant.filename(index)])
            .unwrap_or_default()
    } else {
        config
            .bundles
            .iter()
            .map(|pattern| pattern.replace("[index]", &index.to_string()))
            .collect()
    };
    candidates
        .into_iter()
        .filter(|file| output_dir.join(file).is_file())
        .collect()
}

/// Wait for an entry's returned promise; a rejection fails the case.
fn settle_entry(interp: &mut Interpreter, value: &Value) -> EvalResult<()> {
    let Some(promise) = value.as_object().filter(|obj| obj.is_promise()) else {
        return Ok(());
    };
    match settled(interp, promise)? {
        Some(Ok(_)) | None => Ok(()),
        Some(Err(reason)) => Err(Interrupt::Throw(reason)),
    }
}

fn evaluation_error(entry: &str, err: Interrupt, config: &CaseConfig) -> CaseError {
    match err {
        Interrupt::Throw(value) => CaseError::Evaluation {
            entry: entry.to_string(),
            message: describe(&value),
        },
        Interrupt::Terminate(_) => CaseError::Timeout(config.timeout_ms),
        _ => CaseError::Evaluation {
            entry: entry.to_string(),
            message: "illegal completion".to_string(),
        },
    }
}

#[cfg(test)]
mod tests;
