//! Simulated `Worker`.
//!
//! A worker is a nested resolver with its own web realm and identity
//! cache. Its entry runs on a macrotask; messages travel through the timer
//! queue as JSON clones in both directions until `terminate()`.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use cbx_eval::{from_json, native_fn, to_json, EvalResult, Interpreter, ObjRef, Realm, Value};

use super::Target;
use crate::native::{arg, function, method, string_arg};
use crate::resolver::{upgrade, ResolveMode, Resolver};

pub(super) fn constructor(realm: &Realm, loader: &Weak<Resolver>) -> Value {
    let loader = loader.clone();
    let constructor = realm.constructor(
        "Worker",
        2,
        native_fn(move |interp, this, args| {
            let parent = upgrade(interp, &loader)?;
            let specifier = string_arg(interp, args, 0)?;
            let handle = match this {
                Value::Object(object) => object,
                _ => interp.new_object(),
            };
            spawn(interp, &parent, &specifier, &handle);
            Ok(Value::Object(handle))
        }),
    );
    Value::Object(constructor)
}

#[tracing::instrument(level = "debug", skip(interp, parent, handle))]
fn spawn(interp: &mut Interpreter, parent: &Rc<Resolver>, specifier: &str, handle: &ObjRef) {
    let child = Resolver::new(
        parent.sandbox().realm(),
        Target::Web,
        parent.sandbox().bridge(),
        parent.options().clone(),
    );
    parent.sandbox().adopt_worker(Rc::clone(&child));
    let terminated = Rc::new(Cell::new(false));

    let child_realm = Rc::clone(child.sandbox().realm());
    let to_parent = Value::Object(handle.clone());
    let stopped = Rc::clone(&terminated);
    child_realm.define_global(
        "postMessage",
        function(&child_realm, "postMessage", 1, move |interp, _, args| {
            post_message(interp, &to_parent, &arg(args, 0), &stopped)
        }),
    );

    let parent_realm = Rc::clone(interp.realm());
    let to_worker = Value::Object(child_realm.global.clone());
    let stopped = Rc::clone(&terminated);
    method(&parent_realm, handle, "postMessage", 1, move |interp, _, args| {
        post_message(interp, &to_worker, &arg(args, 0), &stopped)
    });
    let stopped = Rc::clone(&terminated);
    method(&parent_realm, handle, "terminate", 0, move |_, _, _| {
        tracing::debug!("worker terminated");
        stopped.set(true);
        Ok(Value::Undefined)
    });

    let specifier = specifier.to_string();
    let base = parent.options().output_dir.clone();
    let worker = Rc::downgrade(&child);
    interp.event_loop().schedule(
        0,
        Box::new(move |interp| {
            let Some(worker) = worker.upgrade() else {
                return Ok(());
            };
            if terminated.get() {
                return Ok(());
            }
            worker
                .resolve(interp, &base, &specifier, ResolveMode::Sync)
                .map(drop)
        }),
    );
}

/// Queue a JSON clone of `message` for `target.onmessage`.
fn post_message(
    interp: &mut Interpreter,
    target: &Value,
    message: &Value,
    terminated: &Rc<Cell<bool>>,
) -> EvalResult {
    if terminated.get() {
        return Ok(Value::Undefined);
    }
    let data = match to_json(interp, message)? {
        Some(json) => from_json(interp, &json),
        None => Value::Undefined,
    };
    let target = target.clone();
    let terminated = Rc::clone(terminated);
    interp.event_loop().schedule(
        0,
        Box::new(move |interp| {
            if terminated.get() {
                return Ok(());
            }
            let handler = interp.get(&target, "onmessage")?;
            if !handler.is_callable() {
                return Ok(());
            }
            let event = interp.new_object();
            interp.define_data(&event, "data", data);
            interp.call(&handler, target, &[Value::Object(event)])?;
            Ok(())
        }),
    );
    Ok(Value::Undefined)
}
