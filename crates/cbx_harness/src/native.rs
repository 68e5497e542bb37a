//! Small helpers for defining host functions.

use cbx_eval::{native_fn, EvalResult, Interpreter, ObjRef, Realm, Value};
use cbx_ir::Name;

/// Define a non-enumerable method on `target`.
pub(crate) fn method<F>(realm: &Realm, target: &ObjRef, name: &str, length: usize, f: F)
where
    F: Fn(&mut Interpreter, Value, &[Value]) -> EvalResult + 'static,
{
    let func = realm.function(name, length, native_fn(f));
    target.borrow_mut().set_hidden(name, Value::Object(func));
}

/// A standalone host function value.
pub(crate) fn function<F>(realm: &Realm, name: &str, length: usize, f: F) -> Value
where
    F: Fn(&mut Interpreter, Value, &[Value]) -> EvalResult + 'static,
{
    Value::Object(realm.function(name, length, native_fn(f)))
}

/// Argument `index`, or `undefined`.
#[inline]
pub(crate) fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}

/// Argument `index` converted with `ToString`.
pub(crate) fn string_arg(interp: &mut Interpreter, args: &[Value], index: usize) -> EvalResult<Name> {
    interp.to_string(&arg(args, index))
}

/// A plain object of `realm` with the given data properties.
pub(crate) fn object(realm: &Realm, entries: &[(&str, Value)]) -> ObjRef {
    let object = realm.object();
    {
        let mut obj = object.borrow_mut();
        for (key, value) in entries {
            obj.set_data(key, value.clone());
        }
    }
    object
}
