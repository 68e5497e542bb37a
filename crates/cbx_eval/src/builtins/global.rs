//! `Number`, `Boolean`, `Symbol` and the global functions and constants.

use cbx_ir::Name;

use super::{arg, constructor, method};
use crate::errors::{ErrorKind, EvalResult};
use crate::ops;
use crate::realm::Realm;
use crate::value::{Value, TO_STRING_TAG};
use crate::Interpreter;

/// Largest integer every `f64` represents exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Key standing in for `Symbol.iterator`.
const ITERATOR: &str = "@@iterator";

fn this_number(interp: &Interpreter, this: &Value, name: &str) -> EvalResult<f64> {
    match this {
        Value::Number(n) => Ok(*n),
        _ => Err(interp.type_error(format!(
            "Number.prototype.{name} requires that 'this' be a Number"
        ))),
    }
}

fn number_arg(interp: &mut Interpreter, args: &[Value]) -> EvalResult<f64> {
    interp.to_number(&arg(args, 0))
}

fn is_integer(value: &Value) -> bool {
    matches!(value, Value::Number(n) if n.is_finite() && n.fract() == 0.0)
}

pub(super) fn install(realm: &Realm) {
    install_number(realm);
    install_boolean(realm);
    install_symbol(realm);

    let global = Value::Object(realm.global.clone());
    realm.define_global("globalThis", global);
    realm.define_global("NaN", Value::Number(f64::NAN));
    realm.define_global("Infinity", Value::Number(f64::INFINITY));
    realm.define_global("undefined", Value::Undefined);

    let global = realm.global.clone();
    method(realm, &global, "parseInt", 2, |interp, _, args| {
        let text = interp.to_string(&arg(args, 0))?;
        let radix = match arg(args, 1) {
            Value::Undefined => None,
            other => match ops::to_int32(interp.to_number(&other)?) {
                0 => None,
                r => Some(u32::try_from(r).unwrap_or(0)),
            },
        };
        Ok(Value::Number(ops::parse_int_prefix(&text, radix)))
    });
    method(realm, &global, "parseFloat", 1, |interp, _, args| {
        let text = interp.to_string(&arg(args, 0))?;
        Ok(Value::Number(ops::parse_float_prefix(&text)))
    });
    method(realm, &global, "isNaN", 1, |interp, _, args| {
        Ok(Value::Bool(number_arg(interp, args)?.is_nan()))
    });
    method(realm, &global, "isFinite", 1, |interp, _, args| {
        Ok(Value::Bool(number_arg(interp, args)?.is_finite()))
    });
}

fn install_number(realm: &Realm) {
    let proto = realm.intrinsics.number_proto.clone();
    let ctor = constructor(realm, "Number", 1, &proto, |interp, _, args| {
        Ok(Value::Number(match args.first() {
            None => 0.0,
            Some(value) => interp.to_number(value)?,
        }))
    });
    {
        let mut number = ctor.borrow_mut();
        number.set_hidden("MAX_SAFE_INTEGER", Value::Number(MAX_SAFE_INTEGER));
        number.set_hidden("MIN_SAFE_INTEGER", Value::Number(-MAX_SAFE_INTEGER));
        number.set_hidden("EPSILON", Value::Number(f64::EPSILON));
        number.set_hidden("MAX_VALUE", Value::Number(f64::MAX));
        number.set_hidden("POSITIVE_INFINITY", Value::Number(f64::INFINITY));
        number.set_hidden("NEGATIVE_INFINITY", Value::Number(f64::NEG_INFINITY));
        number.set_hidden("NaN", Value::Number(f64::NAN));
    }

    method(realm, &ctor, "isInteger", 1, |_, _, args| {
        Ok(Value::Bool(is_integer(&arg(args, 0))))
    });
    method(realm, &ctor, "isSafeInteger", 1, |_, _, args| {
        let value = arg(args, 0);
        Ok(Value::Bool(
            is_integer(&value) && matches!(value, Value::Number(n) if n.abs() <= MAX_SAFE_INTEGER),
        ))
    });
    method(realm, &ctor, "isFinite", 1, |_, _, args| {
        Ok(Value::Bool(matches!(arg(args, 0), Value::Number(n) if n.is_finite())))
    });
    method(realm, &ctor, "isNaN", 1, |_, _, args| {
        Ok(Value::Bool(matches!(arg(args, 0), Value::Number(n) if n.is_nan())))
    });
    method(realm, &ctor, "parseFloat", 1, |interp, _, args| {
        let text = interp.to_string(&arg(args, 0))?;
        Ok(Value::Number(ops::parse_float_prefix(&text)))
    });

    method(realm, &proto, "toString", 1, |interp, this, args| {
        let n = this_number(interp, &this, "toString")?;
        let radix = match arg(args, 0) {
            Value::Undefined => 10,
            other => interp.to_number(&other)? as u32,
        };
        if !(2..=36).contains(&radix) {
            return Err(interp.throw((
                ErrorKind::Range,
                "toString() radix must be between 2 and 36".to_string(),
            )));
        }
        Ok(Value::Str(Name::from(ops::number_to_radix_string(n, radix))))
    });
    method(realm, &proto, "toFixed", 1, |interp, this, args| {
        let n = this_number(interp, &this, "toFixed")?;
        let digits = number_arg(interp, args)?;
        let digits = if digits.is_nan() { 0.0 } else { digits.trunc() };
        if !(0.0..=100.0).contains(&digits) {
            return Err(interp.throw((
                ErrorKind::Range,
                "toFixed() digits argument must be between 0 and 100".to_string(),
            )));
        }
        let text = if n.is_finite() {
            format!("{n:.*}", digits as usize)
        } else {
            ops::number_to_string(n)
        };
        Ok(Value::Str(Name::from(text)))
    });
    method(realm, &proto, "valueOf", 0, |interp, this, _| {
        Ok(Value::Number(this_number(interp, &this, "valueOf")?))
    });
}

fn install_boolean(realm: &Realm) {
    let proto = realm.intrinsics.boolean_proto.clone();
    constructor(realm, "Boolean", 1, &proto, |_, _, args| {
        Ok(Value::Bool(arg(args, 0).is_truthy()))
    });
    method(realm, &proto, "toString", 0, |interp, this, _| match this {
        Value::Bool(b) => Ok(Value::str(if b { "true" } else { "false" })),
        _ => Err(interp.type_error("Boolean.prototype.toString requires that 'this' be a Boolean")),
    });
    method(realm, &proto, "valueOf", 0, |interp, this, _| match this {
        Value::Bool(_) => Ok(this),
        _ => Err(interp.type_error("Boolean.prototype.valueOf requires that 'this' be a Boolean")),
    });
}

/// Symbols are represented as reserved `@@` property keys.
fn install_symbol(realm: &Realm) {
    let symbol = realm.function(
        "Symbol",
        0,
        crate::value::native_fn(|interp, _, args| {
            let description = match arg(args, 0) {
                Value::Undefined => Name::from(""),
                other => interp.to_string(&other)?,
            };
            Ok(Value::Str(interp.new_symbol_key(&description)))
        }),
    );
    {
        let mut ctor = symbol.borrow_mut();
        ctor.set_hidden("toStringTag", Value::str(TO_STRING_TAG));
        ctor.set_hidden("iterator", Value::str(ITERATOR));
    }
    realm.define_global("Symbol", Value::Object(symbol));
}
