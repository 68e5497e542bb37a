//! Structural equality for `toEqual` / `toStrictEqual`.
//!
//! Objects compare by their own enumerable properties, recursively. The
//! `Symbol.toStringTag` capability tag takes part in the comparison, so a
//! module namespace never equals a plain object with the same keys.

use rustc_hash::FxHashSet;

use crate::errors::EvalResult;
use crate::inspect::{error_message, error_name};
use crate::value::{ObjRef, ObjectClass, Value};
use crate::Interpreter;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strictness {
    /// Properties holding `undefined` count as absent; prototypes ignored.
    Loose,
    /// `undefined` properties count; prototypes must match.
    Strict,
}

/// Deep equality between two values.
pub fn deep_equal(
    interp: &mut Interpreter,
    a: &Value,
    b: &Value,
    strictness: Strictness,
) -> EvalResult<bool> {
    let mut visiting = FxHashSet::default();
    equal(interp, a, b, strictness, &mut visiting)
}

#[derive(PartialEq, Eq)]
enum Kind {
    Array,
    Function,
    Promise,
    Error,
    Namespace,
    Ordinary,
}

fn kind(obj: &ObjRef) -> Kind {
    match &obj.borrow().class {
        ObjectClass::Array(_) => Kind::Array,
        ObjectClass::Function(_) => Kind::Function,
        ObjectClass::Promise(_) => Kind::Promise,
        ObjectClass::Error => Kind::Error,
        ObjectClass::Namespace(_) => Kind::Namespace,
        // `nsObj` marks plain objects as namespace look-alikes.
        ObjectClass::Ordinary if obj.to_string_tag().as_deref() == Some("Module") => Kind::Namespace,
        ObjectClass::Ordinary => Kind::Ordinary,
    }
}

fn equal(
    interp: &mut Interpreter,
    a: &Value,
    b: &Value,
    strictness: Strictness,
    visiting: &mut FxHashSet<(usize, usize)>,
) -> EvalResult<bool> {
    let (x, y) = match (a, b) {
        (Value::Object(x), Value::Object(y)) => (x, y),
        (Value::Number(x), Value::Number(y)) => return Ok(x == y || (x.is_nan() && y.is_nan())),
        _ => return Ok(a.strict_equals(b)),
    };
    if x.ptr_eq(y) {
        return Ok(true);
    }
    let kind_x = kind(x);
    if kind_x != kind(y) || x.to_string_tag() != y.to_string_tag() {
        return Ok(false);
    }
    match kind_x {
        Kind::Function | Kind::Promise => return Ok(false),
        Kind::Error => {
            if error_name(x) != error_name(y) || error_message(x) != error_message(y) {
                return Ok(false);
            }
        }
        _ => {}
    }
    if strictness == Strictness::Strict && kind_x == Kind::Ordinary {
        let same_proto = match (&x.borrow().prototype, &y.borrow().prototype) {
            (Some(p), Some(q)) => p.ptr_eq(q),
            (None, None) => true,
            _ => false,
        };
        if !same_proto {
            return Ok(false);
        }
    }
    // Cycles compare equal once both sides loop back together.
    if !visiting.insert((x.id(), y.id())) {
        return Ok(true);
    }
    let result = equal_properties(interp, x, y, kind_x == Kind::Array, strictness, visiting);
    visiting.remove(&(x.id(), y.id()));
    result
}

fn equal_properties(
    interp: &mut Interpreter,
    x: &ObjRef,
    y: &ObjRef,
    is_array: bool,
    strictness: Strictness,
    visiting: &mut FxHashSet<(usize, usize)>,
) -> EvalResult<bool> {
    let mut left = interp.own_entries(x)?;
    let mut right = interp.own_entries(y)?;
    if is_array && left.iter().filter(|(k, _)| crate::ops::array_index(k).is_some()).count()
        != right.iter().filter(|(k, _)| crate::ops::array_index(k).is_some()).count()
    {
        return Ok(false);
    }
    if strictness == Strictness::Loose && !is_array {
        left.retain(|(_, v)| !matches!(v, Value::Undefined));
        right.retain(|(_, v)| !matches!(v, Value::Undefined));
    }
    if left.len() != right.len() {
        return Ok(false);
    }
    for (key, value) in &left {
        let Some((_, other)) = right.iter().find(|(k, _)| k == key) else {
            return Ok(false);
        };
        let other = other.clone();
        if !equal(interp, value, &other, strictness, visiting)? {
            return Ok(false);
        }
    }
    Ok(true)
}
