// Test code uses unwrap/expect for clarity - panics provide good test failure messages
#![allow(clippy::unwrap_used, clippy::expect_used)]

//! End-to-end scenarios: cases written to disk, built by a compiler and run
//! through the public runner API.
//!
//! # Organization
//!
//! - `identity` - one instance per module across import sites
//! - `strategies` - dynamic import loading strategies
//! - `cycles` - circular graphs in both module systems
//! - `interop` - sync modules seen from linked modules and back
//! - `caching` - cache generations and custom compilers
//! - `targets` - web-like targets: script elements and workers
//! - `failures` - how broken cases are reported
//!
//! ```bash
//! cargo test -p cbx_harness --test scenarios
//! ```

#[path = "scenarios/common.rs"]
mod common;

#[path = "scenarios/caching.rs"]
mod caching;
#[path = "scenarios/cycles.rs"]
mod cycles;
#[path = "scenarios/failures.rs"]
mod failures;
#[path = "scenarios/identity.rs"]
mod identity;
#[path = "scenarios/interop.rs"]
mod interop;
#[path = "scenarios/strategies.rs"]
mod strategies;
#[path = "scenarios/targets.rs"]
mod targets;
