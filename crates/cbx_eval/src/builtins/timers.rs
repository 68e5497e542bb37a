//! `setTimeout`, `setImmediate`, `queueMicrotask` and friends.
//!
//! Timers run on the interpreter's virtual clock.

use super::{arg, method};
use crate::errors::EvalResult;
use crate::realm::Realm;
use crate::value::Value;
use crate::Interpreter;

/// Schedule `args[0]` after `delay` ms with the remaining arguments.
fn schedule(interp: &mut Interpreter, args: &[Value], delay: u64, extra_from: usize) -> EvalResult {
    let callback = arg(args, 0);
    if !callback.is_callable() {
        return Err(interp.type_error(format!(
            "The \"callback\" argument must be of type function. Received {}",
            interp.inspect(&callback)
        )));
    }
    let extra: Vec<Value> = args.get(extra_from..).map(<[Value]>::to_vec).unwrap_or_default();
    let id = interp.event_loop().schedule(
        delay,
        Box::new(move |interp| interp.call(&callback, Value::Undefined, &extra).map(drop)),
    );
    Ok(Value::Number(id as f64))
}

fn delay(interp: &mut Interpreter, value: &Value) -> EvalResult<u64> {
    let ms = interp.to_number(value)?;
    Ok(if ms.is_finite() && ms > 0.0 { ms as u64 } else { 0 })
}

fn cancel(interp: &mut Interpreter, args: &[Value]) -> EvalResult {
    if let Value::Number(id) = arg(args, 0) {
        if id >= 0.0 {
            interp.event_loop().cancel(id as u64);
        }
    }
    Ok(Value::Undefined)
}

pub(super) fn install(realm: &Realm) {
    let global = realm.global.clone();
    method(realm, &global, "setTimeout", 2, |interp, _, args| {
        let ms = delay(interp, &arg(args, 1))?;
        schedule(interp, args, ms, 2)
    });
    method(realm, &global, "setInterval", 2, |interp, _, args| {
        // Fires once.
        let ms = delay(interp, &arg(args, 1))?;
        schedule(interp, args, ms, 2)
    });
    method(realm, &global, "setImmediate", 1, |interp, _, args| {
        schedule(interp, args, 0, 1)
    });
    method(realm, &global, "clearTimeout", 1, |interp, _, args| cancel(interp, args));
    method(realm, &global, "clearInterval", 1, |interp, _, args| cancel(interp, args));
    method(realm, &global, "clearImmediate", 1, |interp, _, args| cancel(interp, args));
    method(realm, &global, "queueMicrotask", 1, |interp, _, args| {
        let callback = arg(args, 0);
        if !callback.is_callable() {
            return Err(interp.type_error("queueMicrotask requires a function"));
        }
        interp.enqueue_job(Box::new(move |interp| {
            interp.call(&callback, Value::Undefined, &[]).map(drop)
        }));
        Ok(Value::Undefined)
    });
}
