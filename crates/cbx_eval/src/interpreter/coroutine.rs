//! Suspendable bodies: async functions and module bodies.
//!
//! A body suspends by unwinding. `await` stores the promise it waits on and
//! returns [`Interrupt::Suspend`]; every statement the signal passes through
//! pushes a [`ResumePoint`] saying where it stopped. Expressions leave their
//! values on a tape keyed by syntax node.
//!
//! Resuming walks the body again from the top while the outcome of the
//! `await` is pending delivery (*rewinding*): statements pop their resume
//! points and jump straight back to the statement or loop phase that
//! suspended, and expressions already on the tape yield their recorded value
//! without running again. The `await` takes the outcome, which ends the
//! rewind, and execution carries on from there.
//!
//! Points are pushed innermost first while unwinding, so rewinding pops the
//! outermost first. A statement kind that pushes a point when suspended pops
//! one when entered during a rewind; leaf statements push nothing and simply
//! re-evaluate their expression against the tape.

use std::rc::Rc;

use cbx_ir::ast::{Expr, Function, Program};
use rustc_hash::FxHashMap;

use super::{Frame, Interpreter};
use crate::environment::{LocalScope, Scope};
use crate::errors::{self, EvalResult, Interrupt};
use crate::value::{ObjRef, Value};

/// Where a statement was when its body suspended.
pub(crate) enum ResumePoint {
    /// Index of the statement that suspended within a statement list.
    Statements(usize),
    /// Scope of the block being executed.
    Scope(LocalScope<Scope>),
    /// Index of the declarator that suspended.
    Declarator(usize),
    /// `if`: `None` while evaluating the test, else the branch taken.
    Branch(Option<bool>),
    /// `while` and `do … while`.
    Loop(LoopPhase),
    /// `for (…;…;…)` with the scope of the current iteration.
    For(LocalScope<Scope>, LoopPhase),
    /// `for … of` / `for … in` evaluating what it iterates.
    Head,
    /// `for … of` / `for … in` inside iteration `index`.
    Each {
        items: Rc<[Value]>,
        index: usize,
        scope: LocalScope<Scope>,
        bound: bool,
    },
    Try(TryPhase),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LoopPhase {
    Init,
    Test,
    Body,
    Update,
}

pub(crate) enum TryPhase {
    Block,
    Handler(Value),
    /// Running `finally`; holds the completion of the block or handler.
    Finalizer(EvalResult<()>),
}

/// Execution state of one running async function or module body.
#[derive(Default)]
pub(crate) struct Coroutine {
    tape: FxHashMap<usize, Option<Value>>,
    points: Vec<ResumePoint>,
    /// Promise the body is suspended on.
    awaiting: Option<ObjRef>,
    /// Outcome of that promise while rewinding.
    resumption: Option<Result<Value, Value>>,
}

/// Code that runs as a coroutine.
pub(crate) enum Body {
    Function(Rc<Function>),
    Module(Rc<Program>),
}

/// How far a coroutine got on its first run.
pub(crate) enum BodyOutcome {
    Completed(Value),
    /// Suspended; the promise settles with the body's completion.
    Suspended(ObjRef),
}

struct Suspended {
    body: Body,
    frame: Frame,
    coroutine: Box<Coroutine>,
    promise: ObjRef,
}

fn node_key(expr: &Expr) -> usize {
    std::ptr::from_ref(expr) as usize
}

impl Interpreter {
    /// Run `body` in `frame` until it completes or first suspends.
    pub(crate) fn start_coroutine(
        &mut self,
        body: Body,
        frame: Frame,
        args: &[Value],
    ) -> EvalResult<BodyOutcome> {
        let (result, frame, coroutine) = self.run_body(&body, frame, Box::default(), args);
        match result {
            Ok(value) => Ok(BodyOutcome::Completed(value)),
            Err(Interrupt::Suspend) => {
                let promise = self.new_promise();
                self.wait(Suspended {
                    body,
                    frame,
                    coroutine,
                    promise: promise.clone(),
                });
                Ok(BodyOutcome::Suspended(promise))
            }
            Err(other) => Err(other),
        }
    }

    fn run_body(
        &mut self,
        body: &Body,
        frame: Frame,
        coroutine: Box<Coroutine>,
        args: &[Value],
    ) -> (EvalResult, Frame, Box<Coroutine>) {
        let saved = self.enter(frame);
        let outer = self.coroutine.replace(coroutine);
        let result = match body {
            Body::Function(function) => self.run_function_body(function, args),
            Body::Module(program) => self
                .exec_statements(&program.body)
                .map(|()| Value::Undefined),
        };
        let coroutine = std::mem::replace(&mut self.coroutine, outer).unwrap_or_default();
        let frame = self.leave(saved);
        (result, frame, coroutine)
    }

    /// Park `suspended` until the promise it awaits settles.
    fn wait(&mut self, mut suspended: Suspended) {
        let Some(awaited) = suspended.coroutine.awaiting.take() else {
            let error = self.create_error(
                errors::ErrorKind::Error,
                "suspended without an awaited promise",
            );
            self.reject_promise(&suspended.promise, Value::Object(error));
            return;
        };
        self.on_settled(
            &awaited,
            Box::new(move |interp, outcome| interp.resume(suspended, outcome)),
        );
    }

    #[tracing::instrument(level = "trace", skip_all)]
    fn resume(&mut self, suspended: Suspended, outcome: Result<Value, Value>) -> EvalResult<()> {
        let Suspended {
            body,
            frame,
            mut coroutine,
            promise,
        } = suspended;
        coroutine.resumption = Some(outcome);
        self.depth += 1;
        let (result, frame, coroutine) = self.run_body(&body, frame, coroutine, &[]);
        self.depth -= 1;
        match result {
            Ok(value) => self.resolve_promise(&promise, value),
            Err(Interrupt::Throw(reason)) => {
                self.reject_promise(&promise, reason);
                Ok(())
            }
            Err(Interrupt::Suspend) => {
                self.wait(Suspended {
                    body,
                    frame,
                    coroutine,
                    promise,
                });
                Ok(())
            }
            Err(other) => Err(other),
        }
    }

    /// `await value`.
    pub(crate) fn await_value(&mut self, value: Value) -> EvalResult {
        if self.coroutine.is_none() {
            return Err(self.throw(errors::await_outside_async()));
        }
        let resumption = self
            .coroutine
            .as_mut()
            .and_then(|coroutine| coroutine.resumption.take());
        if let Some(outcome) = resumption {
            return outcome.map_err(Interrupt::Throw);
        }
        let promise = self.promise_resolve(value)?;
        if let Some(coroutine) = self.coroutine.as_mut() {
            coroutine.awaiting = Some(promise);
        }
        Err(Interrupt::Suspend)
    }

    /// Whether a resumed body is still on its way back to its `await`.
    pub(crate) fn rewinding(&self) -> bool {
        self.coroutine
            .as_ref()
            .is_some_and(|coroutine| coroutine.resumption.is_some())
    }

    /// The resume point of the statement being re-entered, when rewinding.
    pub(crate) fn resume_point(&mut self) -> Option<ResumePoint> {
        let coroutine = self.coroutine.as_mut()?;
        if coroutine.resumption.is_none() {
            return None;
        }
        coroutine.points.pop()
    }

    /// Record `point` if `result` is a suspension.
    pub(crate) fn suspended<T>(
        &mut self,
        result: EvalResult<T>,
        point: impl FnOnce(&Self) -> ResumePoint,
    ) -> EvalResult<T> {
        if let Err(Interrupt::Suspend) = &result {
            let point = point(self);
            if let Some(coroutine) = self.coroutine.as_mut() {
                coroutine.points.push(point);
            }
        }
        result
    }

    /// Evaluate `expr` through the tape: replay its recorded value while
    /// rewinding, record it otherwise.
    ///
    /// A node that did not complete is dropped from the tape, so the nodes a
    /// suspension unwound through always run again.
    pub(crate) fn taped(
        &mut self,
        expr: &Expr,
        eval: impl FnOnce(&mut Self) -> EvalResult<Option<Value>>,
    ) -> EvalResult<Option<Value>> {
        let Some(coroutine) = self.coroutine.as_ref() else {
            return eval(self);
        };
        let key = node_key(expr);
        if coroutine.resumption.is_some() {
            if let Some(value) = coroutine.tape.get(&key) {
                return Ok(value.clone());
            }
        }
        let result = eval(self);
        if let Some(coroutine) = self.coroutine.as_mut() {
            match &result {
                Ok(value) => {
                    coroutine.tape.insert(key, value.clone());
                }
                Err(_) => {
                    coroutine.tape.remove(&key);
                }
            }
        }
        result
    }
}
