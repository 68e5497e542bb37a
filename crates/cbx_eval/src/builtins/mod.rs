//! The built-in library installed into every realm.
//!
//! Each submodule installs one family of globals. Methods are
//! non-enumerable properties of the intrinsic prototypes; natives look up
//! the realm they run in through the interpreter, never by capture.

mod array;
mod console;
mod error;
mod function;
mod global;
mod json;
mod math;
mod object;
mod promise;
mod string;
mod timers;

use crate::errors::EvalResult;
use crate::realm::Realm;
use crate::value::{native_fn, ObjRef, Value};
use crate::Interpreter;

pub(crate) fn install(realm: &Realm) {
    object::install(realm);
    function::install(realm);
    array::install(realm);
    string::install(realm);
    global::install(realm);
    math::install(realm);
    promise::install(realm);
    json::install(realm);
    error::install(realm);
    console::install(realm);
    timers::install(realm);
}

/// Define a non-enumerable method on `target`.
fn method<F>(realm: &Realm, target: &ObjRef, name: &str, length: usize, f: F)
where
    F: Fn(&mut Interpreter, Value, &[Value]) -> EvalResult + 'static,
{
    let func = realm.function(name, length, native_fn(f));
    target.borrow_mut().set_hidden(name, Value::Object(func));
}

/// Create a global constructor wired to `proto`.
fn constructor<F>(realm: &Realm, name: &str, length: usize, proto: &ObjRef, f: F) -> ObjRef
where
    F: Fn(&mut Interpreter, Value, &[Value]) -> EvalResult + 'static,
{
    let ctor = realm.constructor(name, length, native_fn(f));
    ctor.borrow_mut()
        .set_hidden("prototype", Value::Object(proto.clone()));
    proto
        .borrow_mut()
        .set_hidden("constructor", Value::Object(ctor.clone()));
    realm.define_global(name, Value::Object(ctor.clone()));
    ctor
}

/// Argument `index`, or `undefined`.
#[inline]
fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}

/// `this` as an object, or a `TypeError` naming `method`.
fn this_object(interp: &Interpreter, this: &Value, method: &str) -> EvalResult<ObjRef> {
    match this {
        Value::Object(obj) => Ok(obj.clone()),
        _ => Err(interp.type_error(format!("{method} called on non-object"))),
    }
}
