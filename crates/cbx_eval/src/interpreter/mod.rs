//! Tree-walking interpreter.
//!
//! # Architecture
//!
//! - `stmt`: statements, blocks, loops, `try`
//! - `expr`: expressions, operators, optional chains
//! - `pattern`: destructuring for declarations, parameters and assignment
//! - `hoist`: declaration instantiation for function, block and module bodies
//! - `call`: closures, `new`, native dispatch
//! - `property`: property lookup, assignment and enumeration
//! - `convert`: `ToPrimitive`, `ToString`, `ToNumber`
//! - `jobs`: the event loop driver
//! - `coroutine`: suspension and resumption of async function and module bodies
//!
//! One interpreter runs one test case. Code from several realms may run on
//! it; the current realm follows the function being executed.

mod call;
mod convert;
mod coroutine;
mod expr;
mod hoist;
mod jobs;
mod pattern;
mod property;
mod stmt;

use std::rc::Rc;
use std::time::Instant;

use cbx_ir::ast::{ParseGoal, Program};

use self::coroutine::{Body, BodyOutcome, Coroutine};
use cbx_ir::Name;

use crate::console::ConsoleSink;
use crate::environment::{LocalScope, Scope};
use crate::errors::{ErrorKind, EvalResult, Interrupt, Termination};
use crate::event_loop::EventLoop;
use crate::host::ScriptInfo;
use crate::realm::Realm;
use crate::value::{JsObject, NativeFn, ObjRef, ObjectClass, Value};

pub(crate) use convert::Hint;
pub(crate) use property::{has_own_property, has_property};

/// Default maximum nesting of script calls.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 4096;

/// How often (in steps) the deadline is checked.
const DEADLINE_CHECK_INTERVAL: u32 = 1024;

/// Execution context saved and restored around calls.
pub(crate) struct Frame {
    pub scope: LocalScope<Scope>,
    pub this: Value,
    pub script: Option<Rc<ScriptInfo>>,
    pub realm: Rc<Realm>,
}

pub struct Interpreter {
    pub(crate) realm: Rc<Realm>,
    pub(crate) scope: LocalScope<Scope>,
    pub(crate) this: Value,
    pub(crate) script: Option<Rc<ScriptInfo>>,
    pub(crate) event_loop: EventLoop,
    pub(crate) deadline: Option<Instant>,
    pub(crate) max_call_depth: usize,
    pub(crate) depth: usize,
    pub(crate) steps: u32,
    /// Promises rejected while no handler was attached.
    pub(crate) pending_rejections: Vec<ObjRef>,
    /// Exceptions thrown by jobs with nobody to catch them.
    pub(crate) uncaught: Vec<Value>,
    pub(crate) console: ConsoleSink,
    /// Value of the last expression statement run at the top level.
    pub(crate) completion: Value,
    pub(crate) symbol_counter: u32,
    pub(crate) random_state: u64,
    /// The async function or module body running right now, if any.
    pub(crate) coroutine: Option<Box<Coroutine>>,
}

impl Interpreter {
    pub fn new(realm: Rc<Realm>) -> Self {
        let scope = realm.global_scope.clone();
        Interpreter {
            realm,
            scope,
            this: Value::Undefined,
            script: None,
            event_loop: EventLoop::new(),
            deadline: None,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            depth: 0,
            steps: 0,
            pending_rejections: Vec::new(),
            uncaught: Vec::new(),
            console: ConsoleSink::default(),
            completion: Value::Undefined,
            symbol_counter: 0,
            random_state: 0x2545_f491_4f6c_dd1d,
            coroutine: None,
        }
    }

    /// The realm of the code currently running.
    #[inline]
    pub fn realm(&self) -> &Rc<Realm> {
        &self.realm
    }

    /// Abort execution with [`Termination::Timeout`] once `deadline` passes.
    pub fn set_deadline(&mut self, deadline: Option<Instant>) {
        self.deadline = deadline;
    }

    pub fn set_max_call_depth(&mut self, depth: usize) {
        self.max_call_depth = depth;
    }

    pub fn set_console(&mut self, console: ConsoleSink) {
        self.console = console;
    }

    pub fn console(&self) -> &ConsoleSink {
        &self.console
    }

    /// Script whose code is executing, if any.
    pub fn current_script(&self) -> Option<&Rc<ScriptInfo>> {
        self.script.as_ref()
    }

    pub fn event_loop(&mut self) -> &mut EventLoop {
        &mut self.event_loop
    }

    /// Count one evaluation step and enforce the deadline.
    #[inline]
    pub(crate) fn tick(&mut self) -> EvalResult<()> {
        self.steps = self.steps.wrapping_add(1);
        if self.steps % DEADLINE_CHECK_INTERVAL == 0 {
            self.check_deadline()?;
        }
        Ok(())
    }

    pub fn check_deadline(&self) -> EvalResult<()> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                Err(Interrupt::Terminate(Termination::Timeout))
            }
            _ => Ok(()),
        }
    }

    /// Install `frame`, returning the one it replaces.
    pub(crate) fn enter(&mut self, frame: Frame) -> Frame {
        Frame {
            scope: std::mem::replace(&mut self.scope, frame.scope),
            this: std::mem::replace(&mut self.this, frame.this),
            script: std::mem::replace(&mut self.script, frame.script),
            realm: std::mem::replace(&mut self.realm, frame.realm),
        }
    }

    /// Restore `saved`, returning the frame that was running.
    pub(crate) fn leave(&mut self, saved: Frame) -> Frame {
        self.enter(saved)
    }

    /// Run `f` with `scope` as the current scope.
    pub(crate) fn in_scope<T>(
        &mut self,
        scope: LocalScope<Scope>,
        f: impl FnOnce(&mut Self) -> EvalResult<T>,
    ) -> EvalResult<T> {
        let saved = std::mem::replace(&mut self.scope, scope);
        let result = f(self);
        self.scope = saved;
        result
    }

    pub(crate) fn current_scope(&self) -> &LocalScope<Scope> {
        &self.scope
    }

    // Object construction

    pub fn new_object(&self) -> ObjRef {
        self.realm.object()
    }

    pub fn new_array(&self, items: Vec<Value>) -> ObjRef {
        self.realm.array(items)
    }

    pub fn new_function(&self, name: &str, length: usize, func: NativeFn) -> ObjRef {
        self.realm.function(name, length, func)
    }

    /// Build an error object of `kind` in the current realm.
    pub fn create_error(&self, kind: ErrorKind, message: &str) -> ObjRef {
        let proto = self.realm.intrinsics.error_proto(kind).clone();
        let mut object = JsObject::new(ObjectClass::Error, Some(proto));
        object.set_hidden("message", Value::str(message));
        object.set_hidden(
            "stack",
            Value::Str(Name::from(format!("{}: {message}\n    at <anonymous>", kind.name()))),
        );
        ObjRef::new(object)
    }

    /// An exception carrying a fresh error object.
    #[cold]
    pub fn throw(&self, (kind, message): (ErrorKind, String)) -> Interrupt {
        Interrupt::Throw(Value::Object(self.create_error(kind, &message)))
    }

    #[cold]
    pub fn type_error(&self, message: impl Into<String>) -> Interrupt {
        self.throw((ErrorKind::Type, message.into()))
    }

    /// A fresh unique symbol-like key.
    pub(crate) fn new_symbol_key(&mut self, description: &str) -> Name {
        self.symbol_counter += 1;
        Name::from(format!("@@symbol:{}:{description}", self.symbol_counter))
    }

    /// Deterministic pseudo-random number in `[0, 1)` (xorshift64*).
    pub(crate) fn next_random(&mut self) -> f64 {
        let mut x = self.random_state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.random_state = x;
        let bits = x.wrapping_mul(0x2545_f491_4f6c_dd1d) >> 11;
        bits as f64 / (1u64 << 53) as f64
    }

    // Entry points

    /// Run a script-goal program as the body of a function.
    ///
    /// `scope` receives the program's `var` and function declarations. The
    /// result is the value of a top-level `return`, else the value of the
    /// last expression statement.
    #[tracing::instrument(level = "trace", skip_all, fields(script = %script.id))]
    pub fn run_script(
        &mut self,
        program: &Program,
        scope: LocalScope<Scope>,
        this: Value,
        script: Rc<ScriptInfo>,
    ) -> EvalResult {
        let realm = Rc::clone(&script.realm);
        let saved = self.enter(Frame {
            scope,
            this,
            script: Some(script),
            realm,
        });
        self.completion = Value::Undefined;
        let result = self
            .hoist_function_body(&program.body)
            .and_then(|()| self.exec_statements(&program.body));
        let completion = std::mem::take(&mut self.completion);
        self.leave(saved);
        match result {
            Ok(()) => Ok(completion),
            Err(Interrupt::Return(value)) => Ok(value),
            Err(other) => Err(other),
        }
    }

    /// Create the module environment's declarations without running code.
    ///
    /// Functions are initialized, `var`s are `undefined`, lexical bindings
    /// and the default export stay in their temporal dead zone.
    pub fn instantiate_module(
        &mut self,
        program: &Program,
        scope: LocalScope<Scope>,
        script: Rc<ScriptInfo>,
    ) -> EvalResult<()> {
        let realm = Rc::clone(&script.realm);
        let saved = self.enter(Frame {
            scope,
            this: Value::Undefined,
            script: Some(script),
            realm,
        });
        let result = self.hoist_module_body(&program.body);
        self.leave(saved);
        result
    }

    /// Run the body of a module instantiated with
    /// [`Interpreter::instantiate_module`].
    ///
    /// Returns `None` when the body ran to completion. A body that reached
    /// a top-level `await` returns the promise of its completion instead and
    /// carries on from jobs.
    #[tracing::instrument(level = "trace", skip_all, fields(module = %script.id))]
    pub fn evaluate_module(
        &mut self,
        program: &Rc<Program>,
        scope: LocalScope<Scope>,
        script: Rc<ScriptInfo>,
    ) -> EvalResult<Option<ObjRef>> {
        debug_assert_eq!(program.goal, ParseGoal::Module);
        let realm = Rc::clone(&script.realm);
        let frame = Frame {
            scope,
            this: Value::Undefined,
            script: Some(script),
            realm,
        };
        match self.start_coroutine(Body::Module(Rc::clone(program)), frame, &[])? {
            BodyOutcome::Completed(_) => Ok(None),
            BodyOutcome::Suspended(promise) => Ok(Some(promise)),
        }
    }

    /// Read a binding of `scope` the way an identifier reference would.
    pub fn read_binding(&mut self, scope: &LocalScope<Scope>, name: &str) -> EvalResult {
        let resolution = scope.borrow().resolve(name);
        self.resolve_identifier(name, resolution)
    }

    /// Parse and run `source` as a script in a fresh child of the global
    /// scope. Syntax errors surface as thrown `SyntaxError`s.
    pub fn run_source(&mut self, source: &str, id: &str) -> EvalResult {
        let program = cbx_parse::parse(source, ParseGoal::Script)
            .map_err(|err| self.throw((ErrorKind::Syntax, err.to_string())))?;
        let scope = LocalScope::new(Scope::with_parent(self.realm.global_scope.clone()));
        let script = Rc::new(ScriptInfo::new(
            Name::from(id),
            std::path::PathBuf::new(),
            Rc::clone(&self.realm),
        ));
        self.run_script(&program, scope, Value::Undefined, script)
    }
}

impl std::fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("depth", &self.depth)
            .field("event_loop", &self.event_loop)
            .finish_non_exhaustive()
    }
}
