//! `Math`.

use super::{arg, method};
use crate::errors::EvalResult;
use crate::realm::Realm;
use crate::value::{ObjRef, Value, TO_STRING_TAG};
use crate::Interpreter;

fn unary(realm: &Realm, math: &ObjRef, name: &str, f: fn(f64) -> f64) {
    method(realm, math, name, 1, move |interp, _, args| {
        Ok(Value::Number(f(interp.to_number(&arg(args, 0))?)))
    });
}

fn numbers(interp: &mut Interpreter, args: &[Value]) -> EvalResult<Vec<f64>> {
    args.iter().map(|value| interp.to_number(value)).collect()
}

/// `Math.round`: halves round towards positive infinity.
fn round(n: f64) -> f64 {
    if !n.is_finite() || n.fract() == 0.0 {
        return n;
    }
    (n + 0.5).floor()
}

pub(super) fn install(realm: &Realm) {
    let math = realm.object();
    {
        let mut object = math.borrow_mut();
        object.set_hidden(TO_STRING_TAG, Value::str("Math"));
        object.set_hidden("PI", Value::Number(std::f64::consts::PI));
        object.set_hidden("E", Value::Number(std::f64::consts::E));
        object.set_hidden("LN2", Value::Number(std::f64::consts::LN_2));
        object.set_hidden("LN10", Value::Number(std::f64::consts::LN_10));
        object.set_hidden("SQRT2", Value::Number(std::f64::consts::SQRT_2));
    }

    unary(realm, &math, "abs", f64::abs);
    unary(realm, &math, "floor", f64::floor);
    unary(realm, &math, "ceil", f64::ceil);
    unary(realm, &math, "trunc", f64::trunc);
    unary(realm, &math, "round", round);
    unary(realm, &math, "sqrt", f64::sqrt);
    unary(realm, &math, "cbrt", f64::cbrt);
    unary(realm, &math, "log", f64::ln);
    unary(realm, &math, "log2", f64::log2);
    unary(realm, &math, "log10", f64::log10);
    unary(realm, &math, "exp", f64::exp);
    unary(realm, &math, "sin", f64::sin);
    unary(realm, &math, "cos", f64::cos);
    unary(realm, &math, "tan", f64::tan);
    unary(realm, &math, "sign", |n| if n == 0.0 || n.is_nan() { n } else { n.signum() });

    method(realm, &math, "max", 2, |interp, _, args| {
        let values = numbers(interp, args)?;
        Ok(Value::Number(values.into_iter().fold(f64::NEG_INFINITY, |acc, n| {
            if acc.is_nan() || n.is_nan() { f64::NAN } else { acc.max(n) }
        })))
    });
    method(realm, &math, "min", 2, |interp, _, args| {
        let values = numbers(interp, args)?;
        Ok(Value::Number(values.into_iter().fold(f64::INFINITY, |acc, n| {
            if acc.is_nan() || n.is_nan() { f64::NAN } else { acc.min(n) }
        })))
    });
    method(realm, &math, "pow", 2, |interp, _, args| {
        let base = interp.to_number(&arg(args, 0))?;
        let exponent = interp.to_number(&arg(args, 1))?;
        Ok(Value::Number(base.powf(exponent)))
    });
    method(realm, &math, "hypot", 2, |interp, _, args| {
        let values = numbers(interp, args)?;
        Ok(Value::Number(values.iter().map(|n| n * n).sum::<f64>().sqrt()))
    });
    method(realm, &math, "random", 0, |interp, _, _| {
        Ok(Value::Number(interp.next_random()))
    });

    realm.define_global("Math", Value::Object(math));
}
