//! Function calls and construction.

use std::rc::Rc;

use cbx_ir::ast::{Function, FunctionBody};
use cbx_ir::Name;
use cbx_stack::ensure_sufficient_stack;

use super::coroutine::{Body, BodyOutcome};
use super::{Frame, Interpreter};
use crate::environment::{LocalScope, Mutability, Scope};
use crate::errors::{self, EvalResult, Interrupt};
use crate::value::{Callable, Closure, JsObject, ObjRef, ObjectClass, Value};

use super::pattern::BindMode;

impl Interpreter {
    /// Create a function object for `function`, closing over the current
    /// scope, `this` and script.
    pub(crate) fn make_closure(&mut self, function: &Rc<Function>, name: Name) -> Value {
        let closure = Closure {
            function: Rc::clone(function),
            name,
            scope: self.scope.clone(),
            this: function.is_arrow.then(|| self.this.clone()),
            script: self.script.clone(),
        };
        let callable = Callable::Closure(Rc::new(closure));
        let is_constructor = callable.is_constructor();
        let func = ObjRef::new(JsObject::new(
            ObjectClass::Function(callable),
            Some(self.realm.intrinsics.function_proto.clone()),
        ));
        if is_constructor {
            let proto = self.new_object();
            proto
                .borrow_mut()
                .set_hidden("constructor", Value::Object(func.clone()));
            func.borrow_mut()
                .set_hidden("prototype", Value::Object(proto));
        }
        Value::Object(func)
    }

    /// Call `func` with `this` and `args`.
    pub fn call(&mut self, func: &Value, this: Value, args: &[Value]) -> EvalResult {
        let callable = match func {
            Value::Object(obj) => obj.callable(),
            _ => None,
        };
        let Some(callable) = callable else {
            let described = self.inspect(func);
            return Err(self.throw(errors::not_a_function(&described)));
        };
        self.call_callable(&callable, this, args)
    }

    pub(crate) fn call_callable(
        &mut self,
        callable: &Callable,
        this: Value,
        args: &[Value],
    ) -> EvalResult {
        if self.depth >= self.max_call_depth {
            return Err(self.throw(errors::call_stack_exceeded()));
        }
        self.depth += 1;
        // Callees never see the caller's coroutine.
        let outer = self.coroutine.take();
        let result = ensure_sufficient_stack(|| match callable {
            Callable::Closure(closure) => self.call_closure(closure, this, args),
            Callable::Native(native) => (native.func)(self, this, args),
            Callable::Bound(bound) => {
                let mut full = bound.args.clone();
                full.extend_from_slice(args);
                self.call(&bound.target, bound.this.clone(), &full)
            }
        });
        self.coroutine = outer;
        self.depth -= 1;
        result
    }

    fn call_closure(&mut self, closure: &Rc<Closure>, this: Value, args: &[Value]) -> EvalResult {
        let function = &closure.function;
        let scope = LocalScope::new(Scope::with_parent(closure.scope.clone()));
        let this = match &closure.this {
            Some(captured) => captured.clone(),
            None => this,
        };
        let realm = match &closure.script {
            Some(script) => Rc::clone(&script.realm),
            None => Rc::clone(&self.realm),
        };
        if !function.is_arrow {
            let arguments = self.realm.array(args.to_vec());
            scope.borrow_mut().define(
                Name::from("arguments"),
                Value::Object(arguments),
                Mutability::Mutable,
            );
        }
        let frame = Frame {
            scope,
            this,
            script: closure.script.clone(),
            realm,
        };
        if function.is_async {
            let body = Body::Function(Rc::clone(function));
            let promise = match self.start_coroutine(body, frame, args) {
                Ok(BodyOutcome::Completed(value)) => {
                    let promise = self.new_promise();
                    self.resolve_promise(&promise, value)?;
                    promise
                }
                Ok(BodyOutcome::Suspended(promise)) => promise,
                Err(Interrupt::Throw(reason)) => self.rejected_promise(reason),
                Err(other) => return Err(other),
            };
            return Ok(Value::Object(promise));
        }
        let saved = self.enter(frame);
        let result = self.run_function_body(function, args);
        self.leave(saved);
        result
    }

    /// Bind parameters and run the body. A resumed coroutine skips straight
    /// to the statements.
    pub(crate) fn run_function_body(&mut self, function: &Function, args: &[Value]) -> EvalResult {
        let resuming = self.rewinding();
        if !resuming {
            self.bind_parameters(function, args)?;
        }
        match &function.body {
            FunctionBody::Expr(expr) => self.eval_expr(expr),
            FunctionBody::Block(body) => {
                if !resuming {
                    self.hoist_function_body(body)?;
                }
                match self.exec_statements(body) {
                    Ok(()) => Ok(Value::Undefined),
                    Err(Interrupt::Return(value)) => Ok(value),
                    Err(other) => Err(other),
                }
            }
        }
    }

    fn bind_parameters(&mut self, function: &Function, args: &[Value]) -> EvalResult<()> {
        for (index, param) in function.params.iter().enumerate() {
            let value = if param.rest {
                let rest = args.get(index..).map(<[Value]>::to_vec).unwrap_or_default();
                Value::Object(self.new_array(rest))
            } else {
                let arg = args.get(index).cloned().unwrap_or_default();
                match (&arg, &param.default) {
                    (Value::Undefined, Some(default)) => {
                        self.eval_named(default, pattern_name(&param.pattern))?
                    }
                    _ => arg,
                }
            };
            self.bind_pattern(&param.pattern, value, BindMode::Declare(Mutability::Mutable))?;
        }
        Ok(())
    }

    /// `new callee(...args)`.
    pub fn construct(&mut self, callee: &Value, args: &[Value]) -> EvalResult {
        let callable = callee.as_object().and_then(ObjRef::callable);
        let Some(callable) = callable.filter(Callable::is_constructor) else {
            let described = self.inspect(callee);
            return Err(self.throw(errors::not_a_constructor(&described)));
        };
        if let Callable::Bound(bound) = &callable {
            let mut full = bound.args.clone();
            full.extend_from_slice(args);
            return self.construct(&bound.target, &full);
        }
        let proto = match self.get(callee, "prototype")? {
            Value::Object(proto) => proto,
            _ => self.realm.intrinsics.object_proto.clone(),
        };
        let instance = Value::Object(ObjRef::new(JsObject::new(
            ObjectClass::Ordinary,
            Some(proto),
        )));
        let result = self.call_callable(&callable, instance.clone(), args)?;
        Ok(match result {
            Value::Object(_) => result,
            _ => instance,
        })
    }
}

/// Name given to an anonymous function bound directly to `pattern`.
pub(crate) fn pattern_name(pattern: &cbx_ir::ast::Pattern) -> Option<&Name> {
    match pattern {
        cbx_ir::ast::Pattern::Ident(name) => Some(name),
        _ => None,
    }
}
