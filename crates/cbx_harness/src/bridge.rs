//! Assertion bridge: `it`/`beforeEach`/`afterEach` inside the sandbox,
//! and the bookkeeping that ties registered cases to entry points.
//!
//! Cases are only registered while bundles run; they execute later, one
//! at a time, once every entry has been executed and settled.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};

use cbx_eval::{
    display, native_fn, ErrorKind, EvalResult, Interpreter, Interrupt, ObjRef, PromiseState, Realm,
    Value,
};
use rustc_hash::FxHashSet;

use crate::error::CaseError;
use crate::native::{arg, function, string_arg};

/// Outcome of one registered case.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssertionOutcome {
    Passed,
    Failed(String),
    TimedOut,
}

impl AssertionOutcome {
    #[inline]
    pub fn is_passed(&self) -> bool {
        matches!(self, AssertionOutcome::Passed)
    }
}

#[derive(Clone, Debug)]
pub struct AssertionResult {
    pub name: String,
    pub outcome: AssertionOutcome,
    pub duration: Duration,
}

impl fmt::Display for AssertionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            AssertionOutcome::Passed => write!(f, "{}", self.name),
            AssertionOutcome::Failed(message) => write!(f, "{}: {message}", self.name),
            AssertionOutcome::TimedOut => write!(f, "{}: timed out", self.name),
        }
    }
}

struct RegisteredCase {
    name: String,
    func: Value,
}

#[derive(Default)]
struct BridgeState {
    cases: Vec<RegisteredCase>,
    before_each: Vec<Value>,
    after_each: Vec<Value>,
    current_entry: Option<usize>,
    entries_executed: usize,
    entries_with_assertions: FxHashSet<usize>,
}

impl BridgeState {
    /// Entry a registration happening now belongs to: the running one, or
    /// the last one started when a case is registered asynchronously.
    fn attributed_entry(&self) -> Option<usize> {
        self.current_entry
            .or_else(|| self.entries_executed.checked_sub(1))
    }
}

/// Registered cases of one test case, shared by all its variants.
#[derive(Default)]
pub struct AssertionBridge {
    state: RefCell<BridgeState>,
}

impl AssertionBridge {
    pub fn new() -> Rc<AssertionBridge> {
        Rc::new(AssertionBridge::default())
    }

    /// `it`, `beforeEach` and `afterEach` as functions of `realm`.
    pub fn globals(self: &Rc<Self>, realm: &Realm) -> Vec<(&'static str, Value)> {
        let bridge = Rc::downgrade(self);
        let it = function(realm, "it", 2, move |interp, _, args| {
            let name = string_arg(interp, args, 0)?;
            let func = callable_arg(interp, args, 1, "it")?;
            with_bridge(interp, &bridge, |state| {
                let entry = state.attributed_entry();
                if let Some(entry) = entry {
                    state.entries_with_assertions.insert(entry);
                }
                tracing::trace!(case = %name, ?entry, "case registered");
                state.cases.push(RegisteredCase {
                    name: name.to_string(),
                    func,
                });
            })
        });
        let bridge = Rc::downgrade(self);
        let before_each = function(realm, "beforeEach", 1, move |interp, _, args| {
            let func = callable_arg(interp, args, 0, "beforeEach")?;
            with_bridge(interp, &bridge, |state| state.before_each.push(func))
        });
        let bridge = Rc::downgrade(self);
        let after_each = function(realm, "afterEach", 1, move |interp, _, args| {
            let func = callable_arg(interp, args, 0, "afterEach")?;
            with_bridge(interp, &bridge, |state| state.after_each.push(func))
        });
        vec![
            ("it", it),
            ("beforeEach", before_each),
            ("afterEach", after_each),
        ]
    }

    /// Mark the start of a new entry point; returns its index.
    pub fn begin_entry(&self) -> usize {
        let mut state = self.state.borrow_mut();
        let index = state.entries_executed;
        state.entries_executed += 1;
        state.current_entry = Some(index);
        index
    }

    pub fn end_entry(&self) {
        self.state.borrow_mut().current_entry = None;
    }

    /// Run `f` with registrations attributed to `entry`.
    pub fn with_entry<T>(&self, entry: usize, f: impl FnOnce() -> T) -> T {
        let previous = self.state.borrow_mut().current_entry.replace(entry);
        let result = f();
        self.state.borrow_mut().current_entry = previous;
        result
    }

    /// Entry points executed so far.
    pub fn expected_count(&self) -> usize {
        self.state.borrow().entries_executed
    }

    /// Entry points that registered at least one case.
    pub fn actual_count(&self) -> usize {
        self.state.borrow().entries_with_assertions.len()
    }

    pub fn case_count(&self) -> usize {
        self.state.borrow().cases.len()
    }

    pub fn check_counts(&self) -> Result<(), CaseError> {
        let (executed, with_assertions) = (self.expected_count(), self.actual_count());
        if with_assertions < executed {
            return Err(CaseError::AssertionCount {
                with_assertions,
                executed,
            });
        }
        Ok(())
    }

    /// Run every registered case, each with its own `timeout`.
    pub fn run_cases(&self, interp: &mut Interpreter, timeout: Duration) -> Vec<AssertionResult> {
        let mut results = Vec::new();
        let mut index = 0;
        loop {
            let next = self
                .state
                .borrow()
                .cases
                .get(index)
                .map(|case| (case.name.clone(), case.func.clone()));
            let Some((name, func)) = next else {
                break;
            };
            index += 1;

            let started = Instant::now();
            interp.set_deadline(Some(started + timeout));
            let outcome = match self.run_case(interp, &func) {
                Ok(()) => AssertionOutcome::Passed,
                Err(Interrupt::Throw(error)) => AssertionOutcome::Failed(describe(&error)),
                Err(Interrupt::Terminate(_)) => AssertionOutcome::TimedOut,
                Err(_) => AssertionOutcome::Failed("illegal completion".to_string()),
            };
            let duration = started.elapsed();
            tracing::debug!(case = %name, ?outcome, ?duration, "case finished");
            results.push(AssertionResult {
                name,
                outcome,
                duration,
            });
        }
        interp.set_deadline(None);
        results
    }

    fn run_case(&self, interp: &mut Interpreter, func: &Value) -> EvalResult<()> {
        let before = self.state.borrow().before_each.clone();
        for hook in &before {
            let value = interp.call(hook, Value::Undefined, &[])?;
            settle(interp, &value)?;
        }
        let result = call_case(interp, func);
        let after = self.state.borrow().after_each.clone();
        let after_result = after.iter().try_for_each(|hook| {
            let value = interp.call(hook, Value::Undefined, &[])?;
            settle(interp, &value)
        });
        result.and(after_result)
    }

    /// Forget every registration and count.
    pub fn clear(&self) {
        *self.state.borrow_mut() = BridgeState::default();
    }
}

impl fmt::Debug for AssertionBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("AssertionBridge")
            .field("cases", &state.cases.len())
            .field("entries_executed", &state.entries_executed)
            .field("entries_with_assertions", &state.entries_with_assertions.len())
            .finish()
    }
}

fn with_bridge(
    interp: &Interpreter,
    bridge: &Weak<AssertionBridge>,
    f: impl FnOnce(&mut BridgeState),
) -> EvalResult {
    let bridge = bridge
        .upgrade()
        .ok_or_else(|| interp.throw((ErrorKind::Error, "test case already finished".to_string())))?;
    f(&mut bridge.state.borrow_mut());
    Ok(Value::Undefined)
}

fn callable_arg(interp: &Interpreter, args: &[Value], index: usize, what: &str) -> EvalResult<Value> {
    let value = arg(args, index);
    if value.is_callable() {
        Ok(value)
    } else {
        Err(interp.type_error(format!("{what} expects a function")))
    }
}

/// Call a case; callback-style cases (declared with a parameter) finish
/// when `done` is called, others when their returned promise settles.
fn call_case(interp: &mut Interpreter, func: &Value) -> EvalResult<()> {
    let length = func
        .as_object()
        .and_then(ObjRef::callable)
        .map_or(0, |callable| callable.length());
    if length == 0 {
        let value = interp.call(func, Value::Undefined, &[])?;
        return settle(interp, &value);
    }

    let finished = interp.new_promise();
    let signal = finished.clone();
    let done = interp.new_function(
        "done",
        1,
        native_fn(move |interp, _, args| {
            if matches!(interp.promise_state(&signal), Some(PromiseState::Pending)) {
                match arg(args, 0) {
                    Value::Undefined | Value::Null => {
                        interp.resolve_promise(&signal, Value::Undefined)?;
                    }
                    error => interp.reject_promise(&signal, error),
                }
            }
            Ok(Value::Undefined)
        }),
    );
    let returned = interp.call(func, Value::Undefined, &[Value::Object(done)])?;
    if returned.as_object().is_some_and(ObjRef::is_promise) {
        observe(interp, &returned)?;
    }
    match wait(interp, &finished)? {
        Some(result) => result,
        None => Err(interp.throw((ErrorKind::Error, "done() was never called".to_string()))),
    }
}

/// Wait for `value` when it is a promise; a rejection becomes a throw.
pub(crate) fn settle(interp: &mut Interpreter, value: &Value) -> EvalResult<()> {
    let Some(promise) = value.as_object().filter(|obj| obj.is_promise()) else {
        return Ok(());
    };
    match wait(interp, promise)? {
        Some(result) => result,
        None => Err(interp.throw((
            ErrorKind::Error,
            "promise never settled: no pending jobs or timers".to_string(),
        ))),
    }
}

/// Drive the event loop until `promise` settles; `None` if it cannot.
fn wait(interp: &mut Interpreter, promise: &ObjRef) -> EvalResult<Option<EvalResult<()>>> {
    Ok(settled(interp, promise)?.map(|result| result.map(drop).map_err(Interrupt::Throw)))
}

/// Fulfillment value or rejection reason of `promise` once settled.
pub(crate) fn settled(
    interp: &mut Interpreter,
    promise: &ObjRef,
) -> EvalResult<Option<Result<Value, Value>>> {
    observe(interp, &Value::Object(promise.clone()))?;
    interp.run_until_settled(promise)?;
    Ok(match interp.promise_state(promise) {
        Some(PromiseState::Fulfilled(value)) => Some(Ok(value)),
        Some(PromiseState::Rejected(reason)) => Some(Err(reason)),
        _ => None,
    })
}

/// Attach a no-op handler so the harness's own waiting does not count as
/// an unhandled rejection.
fn observe(interp: &mut Interpreter, promise: &Value) -> EvalResult<()> {
    let noop = Value::Object(interp.new_function("", 1, native_fn(|_, _, _| Ok(Value::Undefined))));
    let then = interp.get(promise, "then")?;
    interp.call(&then, promise.clone(), &[noop.clone(), noop])?;
    Ok(())
}

/// A thrown value as a one-line failure message.
pub(crate) fn describe(error: &Value) -> String {
    let text = display(error);
    match text.split_once("\n    at ") {
        Some((message, _)) => message.to_string(),
        None => text,
    }
}

#[cfg(test)]
mod tests;
