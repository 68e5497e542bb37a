//! Promise internals: settlement, reactions and thenable adoption.
//!
//! Settling a promise never runs handlers directly; every reaction becomes a
//! microtask. A rejection with no handler attached is remembered until a
//! handler shows up, so the host can report unhandled rejections.

use std::cell::Cell;
use std::rc::Rc;

use crate::errors::{EvalResult, Interrupt};
use crate::value::{native_fn, JsObject, ObjRef, ObjectClass, PromiseSlot, PromiseState, Value};
use crate::Interpreter;

/// Host code run with the outcome of a promise.
pub type Continuation = Box<dyn FnOnce(&mut Interpreter, Result<Value, Value>) -> EvalResult<()>>;

/// A pending registration on a promise.
pub(crate) enum Reaction {
    /// `then` handlers.
    Script {
        on_fulfilled: Value,
        on_rejected: Value,
        /// Promise derived from `then`, settled with the handler's outcome.
        target: Option<ObjRef>,
    },
    /// A resumed `await` or a host waiting on module evaluation.
    Native(Continuation),
}

/// Read-only view of a promise object for hosts.
#[derive(Clone, Debug)]
pub struct PromiseHandle(ObjRef);

impl PromiseHandle {
    pub fn from_value(value: &Value) -> Option<Self> {
        value
            .as_object()
            .filter(|obj| obj.is_promise())
            .map(|obj| PromiseHandle(obj.clone()))
    }

    pub fn object(&self) -> &ObjRef {
        &self.0
    }

    pub fn state(&self) -> PromiseState {
        match &self.0.borrow().class {
            ObjectClass::Promise(slot) => slot.state.clone(),
            _ => PromiseState::Pending,
        }
    }

    pub fn is_settled(&self) -> bool {
        !matches!(self.state(), PromiseState::Pending)
    }
}

impl Interpreter {
    /// A fresh pending promise of the current realm.
    pub fn new_promise(&self) -> ObjRef {
        ObjRef::new(JsObject::new(
            ObjectClass::Promise(PromiseSlot::pending()),
            Some(self.realm.intrinsics.promise_proto.clone()),
        ))
    }

    pub fn promise_state(&self, promise: &ObjRef) -> Option<PromiseState> {
        match &promise.borrow().class {
            ObjectClass::Promise(slot) => Some(slot.state.clone()),
            _ => None,
        }
    }

    /// Resolve `promise` with `value`, adopting the state of thenables.
    pub fn resolve_promise(&mut self, promise: &ObjRef, value: Value) -> EvalResult<()> {
        let Value::Object(object) = &value else {
            self.settle(promise, PromiseState::Fulfilled(value));
            return Ok(());
        };
        if object.ptr_eq(promise) {
            let error = self.type_error("Chaining cycle detected for promise");
            if let Interrupt::Throw(reason) = error {
                self.reject_promise(promise, reason);
            }
            return Ok(());
        }
        let then = match self.get(&value, "then") {
            Ok(then) => then,
            Err(Interrupt::Throw(reason)) => {
                self.reject_promise(promise, reason);
                return Ok(());
            }
            Err(other) => return Err(other),
        };
        if !then.is_callable() {
            self.settle(promise, PromiseState::Fulfilled(value));
            return Ok(());
        }
        let promise = promise.clone();
        self.event_loop.enqueue_microtask(Box::new(move |interp| {
            let (resolve, reject) = interp.resolving_functions(&promise);
            match interp.call(&then, value, &[resolve, reject.clone()]) {
                Ok(_) => Ok(()),
                Err(Interrupt::Throw(reason)) => interp.call(&reject, Value::Undefined, &[reason]).map(drop),
                Err(other) => Err(other),
            }
        }));
        Ok(())
    }

    pub fn reject_promise(&mut self, promise: &ObjRef, reason: Value) {
        self.settle(promise, PromiseState::Rejected(reason));
    }

    fn settle(&mut self, promise: &ObjRef, state: PromiseState) {
        let (reactions, unhandled) = {
            let mut object = promise.borrow_mut();
            let ObjectClass::Promise(slot) = &mut object.class else {
                return;
            };
            if !matches!(slot.state, PromiseState::Pending) {
                return;
            }
            let unhandled = matches!(state, PromiseState::Rejected(_)) && !slot.handled;
            slot.state = state.clone();
            (std::mem::take(&mut slot.reactions), unhandled)
        };
        if unhandled {
            self.pending_rejections.push(promise.clone());
        }
        let outcome = match state {
            PromiseState::Fulfilled(value) => Ok(value),
            PromiseState::Rejected(reason) => Err(reason),
            PromiseState::Pending => return,
        };
        for reaction in reactions {
            self.enqueue_reaction(reaction, outcome.clone());
        }
    }

    fn enqueue_reaction(&mut self, reaction: Reaction, outcome: Result<Value, Value>) {
        self.event_loop
            .enqueue_microtask(Box::new(move |interp| interp.run_reaction(reaction, outcome)));
    }

    fn run_reaction(&mut self, reaction: Reaction, outcome: Result<Value, Value>) -> EvalResult<()> {
        let (on_fulfilled, on_rejected, target) = match reaction {
            Reaction::Script {
                on_fulfilled,
                on_rejected,
                target,
            } => (on_fulfilled, on_rejected, target),
            Reaction::Native(continuation) => return continuation(self, outcome),
        };
        let (handler, argument) = match &outcome {
            Ok(value) => (on_fulfilled, value.clone()),
            Err(reason) => (on_rejected, reason.clone()),
        };
        if !handler.is_callable() {
            if let Some(target) = &target {
                match outcome {
                    Ok(value) => self.resolve_promise(target, value)?,
                    Err(reason) => self.reject_promise(target, reason),
                }
            }
            return Ok(());
        }
        match (self.call(&handler, Value::Undefined, &[argument]), &target) {
            (Ok(value), Some(target)) => self.resolve_promise(target, value),
            (Err(Interrupt::Throw(reason)), Some(target)) => {
                self.reject_promise(target, reason);
                Ok(())
            }
            (Ok(_), None) => Ok(()),
            (Err(other), _) => Err(other),
        }
    }

    /// The `resolve`/`reject` pair handed to executors and thenables; only
    /// the first call of either has an effect.
    pub(crate) fn resolving_functions(&self, promise: &ObjRef) -> (Value, Value) {
        let done = Rc::new(Cell::new(false));
        let resolve = {
            let promise = promise.clone();
            let done = Rc::clone(&done);
            self.new_function(
                "",
                1,
                native_fn(move |interp, _, args| {
                    if !done.replace(true) {
                        let value = args.first().cloned().unwrap_or_default();
                        interp.resolve_promise(&promise, value)?;
                    }
                    Ok(Value::Undefined)
                }),
            )
        };
        let reject = {
            let promise = promise.clone();
            self.new_function(
                "",
                1,
                native_fn(move |interp, _, args| {
                    if !done.replace(true) {
                        let reason = args.first().cloned().unwrap_or_default();
                        interp.reject_promise(&promise, reason);
                    }
                    Ok(Value::Undefined)
                }),
            )
        };
        (Value::Object(resolve), Value::Object(reject))
    }

    /// Register handlers on `promise`; `target` receives their outcome.
    pub(crate) fn perform_then(
        &mut self,
        promise: &ObjRef,
        on_fulfilled: Value,
        on_rejected: Value,
        target: Option<ObjRef>,
    ) {
        let reaction = Reaction::Script {
            on_fulfilled,
            on_rejected,
            target,
        };
        self.add_reaction(promise, reaction);
    }

    /// Run `continuation` in a job once `promise` settles. Counts as handling
    /// a rejection.
    pub fn on_settled(&mut self, promise: &ObjRef, continuation: Continuation) {
        self.add_reaction(promise, Reaction::Native(continuation));
    }

    fn add_reaction(&mut self, promise: &ObjRef, reaction: Reaction) {
        let settled = {
            let mut object = promise.borrow_mut();
            let ObjectClass::Promise(slot) = &mut object.class else {
                return;
            };
            slot.handled = true;
            match &slot.state {
                PromiseState::Pending => {
                    slot.reactions.push(reaction);
                    return;
                }
                PromiseState::Fulfilled(value) => Ok(value.clone()),
                PromiseState::Rejected(reason) => Err(reason.clone()),
            }
        };
        self.pending_rejections.retain(|p| !p.ptr_eq(promise));
        self.enqueue_reaction(reaction, settled);
    }

    /// Mark a promise as observed without adding a reaction.
    pub(crate) fn mark_handled(&mut self, promise: &ObjRef) {
        if let ObjectClass::Promise(slot) = &mut promise.borrow_mut().class {
            slot.handled = true;
        }
        self.pending_rejections.retain(|p| !p.ptr_eq(promise));
    }

    /// `Promise.resolve(value)`: promises pass through unchanged.
    pub fn promise_resolve(&mut self, value: Value) -> EvalResult<ObjRef> {
        if let Value::Object(object) = &value {
            if object.is_promise() {
                return Ok(object.clone());
            }
        }
        let promise = self.new_promise();
        self.resolve_promise(&promise, value)?;
        Ok(promise)
    }

    /// A promise already rejected with `reason`.
    pub fn rejected_promise(&mut self, reason: Value) -> ObjRef {
        let promise = self.new_promise();
        self.reject_promise(&promise, reason);
        promise
    }

    /// Reasons of rejected promises that never got a handler, oldest first.
    pub fn take_unhandled_rejections(&mut self) -> Vec<Value> {
        std::mem::take(&mut self.pending_rejections)
            .into_iter()
            .filter_map(|promise| {
                let object = promise.borrow();
                match &object.class {
                    ObjectClass::Promise(PromiseSlot {
                        state: PromiseState::Rejected(reason),
                        handled: false,
                        ..
                    }) => Some(reason.clone()),
                    _ => None,
                }
            })
            .collect()
    }
}
