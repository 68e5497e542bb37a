//! `Promise` and `Promise.prototype`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::{arg, constructor, method};
use crate::errors::{EvalResult, Interrupt};
use crate::realm::Realm;
use crate::value::{native_fn, ObjRef, Value, TO_STRING_TAG};
use crate::Interpreter;

fn this_promise(interp: &Interpreter, this: &Value, name: &str) -> EvalResult<ObjRef> {
    match this {
        Value::Object(obj) if obj.is_promise() => Ok(obj.clone()),
        _ => Err(interp.type_error(format!(
            "Method Promise.prototype.{name} called on incompatible receiver {}",
            interp.inspect(this)
        ))),
    }
}

/// `then` registration that resolves a fresh derived promise.
fn then(interp: &mut Interpreter, promise: &ObjRef, on_fulfilled: Value, on_rejected: Value) -> Value {
    let derived = interp.new_promise();
    interp.perform_then(promise, on_fulfilled, on_rejected, Some(derived.clone()));
    Value::Object(derived)
}

/// Which combinator is collecting results.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Combinator {
    All,
    AllSettled,
}

/// `Promise.all` and `Promise.allSettled`.
fn combine(interp: &mut Interpreter, iterable: &Value, mode: Combinator) -> EvalResult {
    let result = interp.new_promise();
    let items = match interp.iterate(iterable) {
        Ok(items) => items,
        Err(Interrupt::Throw(reason)) => {
            interp.reject_promise(&result, reason);
            return Ok(Value::Object(result));
        }
        Err(other) => return Err(other),
    };
    if items.is_empty() {
        let empty = interp.new_array(Vec::new());
        interp.resolve_promise(&result, Value::Object(empty))?;
        return Ok(Value::Object(result));
    }

    let values = Rc::new(RefCell::new(vec![Value::Undefined; items.len()]));
    let remaining = Rc::new(Cell::new(items.len()));
    for (index, item) in items.into_iter().enumerate() {
        let promise = interp.promise_resolve(item)?;
        let record = |status: &'static str, key: &'static str| {
            let values = Rc::clone(&values);
            let remaining = Rc::clone(&remaining);
            let result = result.clone();
            native_fn(move |interp, _, args| {
                let value = arg(args, 0);
                let entry = if mode == Combinator::AllSettled {
                    let entry = interp.new_object();
                    {
                        let mut obj = entry.borrow_mut();
                        obj.set_data("status", Value::str(status));
                        obj.set_data(key, value);
                    }
                    Value::Object(entry)
                } else {
                    value
                };
                if let Some(slot) = values.borrow_mut().get_mut(index) {
                    *slot = entry;
                }
                remaining.set(remaining.get() - 1);
                if remaining.get() == 0 {
                    let collected = values.borrow().clone();
                    let array = interp.new_array(collected);
                    interp.resolve_promise(&result, Value::Object(array))?;
                }
                Ok(Value::Undefined)
            })
        };
        let on_fulfilled = interp.new_function("", 1, record("fulfilled", "value"));
        let on_rejected = match mode {
            Combinator::AllSettled => interp.new_function("", 1, record("rejected", "reason")),
            Combinator::All => {
                let result = result.clone();
                interp.new_function(
                    "",
                    1,
                    native_fn(move |interp, _, args| {
                        interp.reject_promise(&result, arg(args, 0));
                        Ok(Value::Undefined)
                    }),
                )
            }
        };
        interp.perform_then(&promise, Value::Object(on_fulfilled), Value::Object(on_rejected), None);
    }
    Ok(Value::Object(result))
}

pub(super) fn install(realm: &Realm) {
    let proto = realm.intrinsics.promise_proto.clone();
    proto
        .borrow_mut()
        .set_hidden(TO_STRING_TAG, Value::str("Promise"));

    let ctor = constructor(realm, "Promise", 1, &proto, |interp, _, args| {
        let executor = arg(args, 0);
        if !executor.is_callable() {
            return Err(interp.type_error(format!(
                "Promise resolver {} is not a function",
                interp.inspect(&executor)
            )));
        }
        let promise = interp.new_promise();
        let (resolve, reject) = interp.resolving_functions(&promise);
        match interp.call(&executor, Value::Undefined, &[resolve, reject.clone()]) {
            Ok(_) => {}
            Err(Interrupt::Throw(reason)) => {
                interp.call(&reject, Value::Undefined, &[reason])?;
            }
            Err(other) => return Err(other),
        }
        Ok(Value::Object(promise))
    });

    method(realm, &ctor, "resolve", 1, |interp, _, args| {
        Ok(Value::Object(interp.promise_resolve(arg(args, 0))?))
    });
    method(realm, &ctor, "reject", 1, |interp, _, args| {
        Ok(Value::Object(interp.rejected_promise(arg(args, 0))))
    });
    method(realm, &ctor, "all", 1, |interp, _, args| {
        combine(interp, &arg(args, 0), Combinator::All)
    });
    method(realm, &ctor, "allSettled", 1, |interp, _, args| {
        combine(interp, &arg(args, 0), Combinator::AllSettled)
    });
    method(realm, &ctor, "race", 1, |interp, _, args| {
        let result = interp.new_promise();
        let items = interp.iterate(&arg(args, 0))?;
        let (resolve, reject) = interp.resolving_functions(&result);
        for item in items {
            let promise = interp.promise_resolve(item)?;
            interp.perform_then(&promise, resolve.clone(), reject.clone(), None);
        }
        Ok(Value::Object(result))
    });

    method(realm, &proto, "then", 2, |interp, this, args| {
        let promise = this_promise(interp, &this, "then")?;
        Ok(then(interp, &promise, arg(args, 0), arg(args, 1)))
    });
    method(realm, &proto, "catch", 1, |interp, this, args| {
        let promise = this_promise(interp, &this, "catch")?;
        Ok(then(interp, &promise, Value::Undefined, arg(args, 0)))
    });
    method(realm, &proto, "finally", 1, |interp, this, args| {
        let promise = this_promise(interp, &this, "finally")?;
        let callback = arg(args, 0);
        if !callback.is_callable() {
            return Ok(then(interp, &promise, callback.clone(), callback));
        }
        // Run the callback, wait for its result, then pass the outcome on.
        let settle_with = |rethrow: bool| {
            let callback = callback.clone();
            native_fn(move |interp, _, args| {
                let outcome = arg(args, 0);
                let result = interp.call(&callback, Value::Undefined, &[])?;
                let waited = interp.promise_resolve(result)?;
                let pass_on = interp.new_function(
                    "",
                    0,
                    native_fn(move |_, _, _| {
                        if rethrow {
                            Err(Interrupt::Throw(outcome.clone()))
                        } else {
                            Ok(outcome.clone())
                        }
                    }),
                );
                Ok(then(interp, &waited, Value::Object(pass_on), Value::Undefined))
            })
        };
        let on_fulfilled = interp.new_function("", 1, settle_with(false));
        let on_rejected = interp.new_function("", 1, settle_with(true));
        Ok(then(interp, &promise, Value::Object(on_fulfilled), Value::Object(on_rejected)))
    });
}
