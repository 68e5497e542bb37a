//! casebox harness: runs compiled test case output the way its consumers
//! would, and checks what the build and the tests report.
//!
//! # Architecture
//!
//! - [`resolver`]: specifier to module record, one record per identity
//! - [`sandbox`]: the scope a variant's modules run in, per target
//! - `linker`: static import linking and post-order evaluation
//! - [`cache`]: sequential build generations against one cache directory
//! - [`bridge`]: `it`/`expect` inside the sandbox, results outside
//! - [`compiler`]: the build boundary plus the reference staging compiler
//! - [`runner`]: case discovery, per-case driver and the parallel pool
//!
//! A test case owns one interpreter and one resolver per build variant;
//! nothing outlives the case.

pub mod artifact;
pub mod bridge;
pub mod cache;
pub mod compiler;
pub mod config;
pub mod error;
mod expect;
pub mod expectations;
mod linker;
mod native;
pub mod record;
pub mod resolver;
pub mod runner;
pub mod sandbox;
#[cfg(test)]
mod test_support;

pub use bridge::{AssertionBridge, AssertionOutcome, AssertionResult};
pub use cache::{CacheController, GenerationError};
pub use compiler::{
    BuildFailure, BuildRequest, Compiler, InfrastructureLog, ModuleStat, RunResult,
    StagingCompiler, VariantRequest,
};
pub use config::{CaseConfig, ConfigError, VariantConfig};
pub use error::{CaseError, LoadError};
pub use expectations::Expectations;
pub use record::{ModuleRecord, ModuleState};
pub use resolver::{ResolveMode, Resolved, Resolver, ResolverOptions};
pub use runner::{
    run_file, CaseOutcome, CaseResult, CaseRunner, RunSummary, RunnerConfig, TestCase,
};
pub use sandbox::{Sandbox, Target};
