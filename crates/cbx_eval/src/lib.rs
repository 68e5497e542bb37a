//! casebox eval: the script execution primitive behind the harness.
//!
//! # Architecture
//!
//! - [`value`]: runtime values and heap objects
//! - [`environment`]: scopes, bindings, temporal dead zones, live imports
//! - [`interpreter`]: the tree walker, promises and `await`
//! - [`realm`]: global object plus intrinsic prototypes
//! - [`event_loop`]: microtask queue and virtual-clock timers
//! - [`host`]: seams for module loading (`import()`, `import.meta`,
//!   namespace objects)
//!
//! The built-in library (`Object`, `Array`, `Promise`, `JSON`, …) is
//! installed into every realm on creation. Console output goes to
//! `tracing` under the `cbx::console` target and optionally into a
//! capture buffer.
//!
//! Everything here is single-threaded: one interpreter per test case.

mod builtins;
mod console;
pub mod environment;
mod equality;
pub mod errors;
pub mod event_loop;
pub mod host;
mod inspect;
pub mod interpreter;
mod json;
pub mod ops;
mod promise;
pub mod realm;
pub mod value;

pub use console::{ConsoleLevel, ConsoleSink};
pub use environment::{LocalScope, Mutability, Scope};
pub use equality::{deep_equal, Strictness};
pub use errors::{ErrorKind, EvalResult, Interrupt, Termination};
pub use host::{ModuleHost, NamespaceSource, ScriptInfo};
pub use inspect::{display, inspect};
pub use interpreter::Interpreter;
pub use json::{from_json, to_json};
pub use promise::{Continuation, PromiseHandle};
pub use realm::Realm;
pub use value::{
    native_fn, JsObject, NativeFn, ObjRef, ObjectClass, PromiseState, Value, TO_STRING_TAG,
};
