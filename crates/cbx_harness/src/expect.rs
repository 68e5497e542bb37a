//! `expect(value)` and its matchers.

use std::rc::Rc;

use cbx_eval::{
    deep_equal, inspect, ErrorKind, EvalResult, Interpreter, Interrupt, ObjRef, Realm, Strictness,
    Value,
};
use cbx_ir::ast::BinaryOp;

use crate::bridge::settled;
use crate::native::{arg, function, method};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Direct,
    Resolves,
    Rejects,
}

#[derive(Clone, Copy, Debug)]
struct Flags {
    negated: bool,
    mode: Mode,
}

/// Result of a matcher before negation is applied.
struct Verdict {
    pass: bool,
    /// Rendering of what was expected, for the failure message.
    expected: String,
}

impl Verdict {
    fn new(pass: bool, expected: impl Into<String>) -> Self {
        Verdict {
            pass,
            expected: expected.into(),
        }
    }
}

type Check = fn(&mut Interpreter, &Value, &[Value], Mode) -> EvalResult<Verdict>;

const MATCHERS: &[(&str, usize, Check)] = &[
    ("toBe", 1, to_be),
    ("toEqual", 1, to_equal),
    ("toStrictEqual", 1, to_strict_equal),
    ("toBeTruthy", 0, to_be_truthy),
    ("toBeFalsy", 0, to_be_falsy),
    ("toBeNull", 0, to_be_null),
    ("toBeUndefined", 0, to_be_undefined),
    ("toBeDefined", 0, to_be_defined),
    ("toBeNaN", 0, to_be_nan),
    ("toContain", 1, to_contain),
    ("toMatch", 1, to_match),
    ("toHaveLength", 1, to_have_length),
    ("toHaveProperty", 2, to_have_property),
    ("toBeGreaterThan", 1, to_be_greater_than),
    ("toBeGreaterThanOrEqual", 1, to_be_greater_than_or_equal),
    ("toBeLessThan", 1, to_be_less_than),
    ("toBeLessThanOrEqual", 1, to_be_less_than_or_equal),
    ("toBeInstanceOf", 1, to_be_instance_of),
    ("toThrow", 1, to_throw),
];

/// The `expect` function of `realm`.
pub fn expect_function(realm: &Realm) -> Value {
    function(realm, "expect", 1, |interp, _, args| {
        let flags = Flags {
            negated: false,
            mode: Mode::Direct,
        };
        Ok(Value::Object(matchers(interp, &arg(args, 0), flags)))
    })
}

fn matchers(interp: &Interpreter, received: &Value, flags: Flags) -> ObjRef {
    let realm = Rc::clone(interp.realm());
    let object = realm.object();
    for &(name, length, check) in MATCHERS {
        let received = received.clone();
        method(&realm, &object, name, length, move |interp, _, args| {
            run_matcher(interp, name, check, &received, args, flags)
        });
    }
    if !flags.negated {
        let not = matchers(
            interp,
            received,
            Flags {
                negated: true,
                ..flags
            },
        );
        object.borrow_mut().set_data("not", Value::Object(not));
    }
    if flags.mode == Mode::Direct && !flags.negated {
        for (key, mode) in [("resolves", Mode::Resolves), ("rejects", Mode::Rejects)] {
            let modified = matchers(
                interp,
                received,
                Flags {
                    negated: false,
                    mode,
                },
            );
            object.borrow_mut().set_data(key, Value::Object(modified));
        }
    }
    object
}

fn run_matcher(
    interp: &mut Interpreter,
    name: &str,
    check: Check,
    received: &Value,
    args: &[Value],
    flags: Flags,
) -> EvalResult {
    let actual = match flags.mode {
        Mode::Direct => received.clone(),
        Mode::Resolves | Mode::Rejects => {
            let Some(promise) = received.as_object().filter(|obj| obj.is_promise()) else {
                return Err(failure(interp, name, flags, "a promise", &inspect(received)));
            };
            let outcome = settled(interp, promise)?.ok_or_else(|| {
                interp.throw((ErrorKind::Error, "promise never settled".to_string()))
            })?;
            match (flags.mode, outcome) {
                (Mode::Resolves, Ok(value)) | (Mode::Rejects, Err(value)) => value,
                (_, Ok(value)) => {
                    let received = format!("resolved to {}", inspect(&value));
                    return Err(failure(interp, name, flags, "a rejected promise", &received));
                }
                (_, Err(reason)) => {
                    let received = format!("rejected with {}", inspect(&reason));
                    return Err(failure(interp, name, flags, "a resolved promise", &received));
                }
            }
        }
    };

    let verdict = check(interp, &actual, args, flags.mode)?;
    if verdict.pass == flags.negated {
        return Err(failure(interp, name, flags, &verdict.expected, &inspect(&actual)));
    }
    match flags.mode {
        Mode::Direct => Ok(Value::Undefined),
        Mode::Resolves | Mode::Rejects => Ok(Value::Object(interp.promise_resolve(Value::Undefined)?)),
    }
}

fn failure(interp: &Interpreter, name: &str, flags: Flags, expected: &str, received: &str) -> Interrupt {
    let modifier = match flags.mode {
        Mode::Direct => "",
        Mode::Resolves => "resolves.",
        Mode::Rejects => "rejects.",
    };
    let (not, expected_prefix) = if flags.negated { ("not.", "not ") } else { ("", "") };
    let message = format!(
        "expect(received).{modifier}{not}{name}(expected)\n\nExpected: {expected_prefix}{expected}\nReceived: {received}"
    );
    Interrupt::Throw(Value::Object(interp.create_error(ErrorKind::Error, &message)))
}

/// `Object.is`.
fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) if x.is_nan() && y.is_nan() => true,
        (Value::Number(x), Value::Number(y)) => x == y && x.is_sign_negative() == y.is_sign_negative(),
        _ => a.strict_equals(b),
    }
}

fn to_be(_: &mut Interpreter, actual: &Value, args: &[Value], _: Mode) -> EvalResult<Verdict> {
    let expected = arg(args, 0);
    Ok(Verdict::new(same_value(actual, &expected), inspect(&expected)))
}

fn to_equal(interp: &mut Interpreter, actual: &Value, args: &[Value], _: Mode) -> EvalResult<Verdict> {
    let expected = arg(args, 0);
    let pass = deep_equal(interp, actual, &expected, Strictness::Loose)?;
    Ok(Verdict::new(pass, inspect(&expected)))
}

fn to_strict_equal(
    interp: &mut Interpreter,
    actual: &Value,
    args: &[Value],
    _: Mode,
) -> EvalResult<Verdict> {
    let expected = arg(args, 0);
    let pass = deep_equal(interp, actual, &expected, Strictness::Strict)?;
    Ok(Verdict::new(pass, inspect(&expected)))
}

fn to_be_truthy(_: &mut Interpreter, actual: &Value, _: &[Value], _: Mode) -> EvalResult<Verdict> {
    Ok(Verdict::new(actual.is_truthy(), "truthy"))
}

fn to_be_falsy(_: &mut Interpreter, actual: &Value, _: &[Value], _: Mode) -> EvalResult<Verdict> {
    Ok(Verdict::new(!actual.is_truthy(), "falsy"))
}

fn to_be_null(_: &mut Interpreter, actual: &Value, _: &[Value], _: Mode) -> EvalResult<Verdict> {
    Ok(Verdict::new(matches!(actual, Value::Null), "null"))
}

fn to_be_undefined(_: &mut Interpreter, actual: &Value, _: &[Value], _: Mode) -> EvalResult<Verdict> {
    Ok(Verdict::new(matches!(actual, Value::Undefined), "undefined"))
}

fn to_be_defined(_: &mut Interpreter, actual: &Value, _: &[Value], _: Mode) -> EvalResult<Verdict> {
    Ok(Verdict::new(!matches!(actual, Value::Undefined), "defined"))
}

fn to_be_nan(_: &mut Interpreter, actual: &Value, _: &[Value], _: Mode) -> EvalResult<Verdict> {
    Ok(Verdict::new(
        matches!(actual, Value::Number(n) if n.is_nan()),
        "NaN",
    ))
}

fn to_contain(interp: &mut Interpreter, actual: &Value, args: &[Value], _: Mode) -> EvalResult<Verdict> {
    let expected = arg(args, 0);
    let rendered = format!("containing {}", inspect(&expected));
    let pass = match actual {
        Value::Str(haystack) => {
            let needle = interp.to_string(&expected)?;
            haystack.contains(&*needle)
        }
        Value::Object(object) => match object.array_elements() {
            Some(items) => items.iter().any(|item| item.same_value_zero(&expected)),
            None => interp
                .iterate(actual)?
                .iter()
                .any(|item| item.same_value_zero(&expected)),
        },
        _ => false,
    };
    Ok(Verdict::new(pass, rendered))
}

fn to_match(interp: &mut Interpreter, actual: &Value, args: &[Value], _: Mode) -> EvalResult<Verdict> {
    let pattern = interp.to_string(&arg(args, 0))?;
    let pass = actual.as_str().is_some_and(|text| text.contains(&*pattern));
    Ok(Verdict::new(pass, format!("matching {pattern:?}")))
}

fn to_have_length(
    interp: &mut Interpreter,
    actual: &Value,
    args: &[Value],
    _: Mode,
) -> EvalResult<Verdict> {
    let expected = interp.to_number(&arg(args, 0))?;
    let pass = match actual {
        Value::Undefined | Value::Null => false,
        _ => match interp.get(actual, "length")? {
            Value::Number(length) => length == expected,
            _ => false,
        },
    };
    Ok(Verdict::new(pass, format!("length {expected}")))
}

fn to_have_property(
    interp: &mut Interpreter,
    actual: &Value,
    args: &[Value],
    _: Mode,
) -> EvalResult<Verdict> {
    let path_arg = arg(args, 0);
    let path: Vec<String> = match &path_arg {
        Value::Object(object) if object.is_array() => object
            .array_elements()
            .unwrap_or_default()
            .iter()
            .map(|part| interp.to_string(part).map(|s| s.to_string()))
            .collect::<EvalResult<_>>()?,
        other => interp
            .to_string(other)?
            .split('.')
            .map(str::to_string)
            .collect(),
    };
    let rendered = format!("property {}", path.join("."));

    let mut current = actual.clone();
    for key in &path {
        if !matches!(current, Value::Object(_)) {
            return Ok(Verdict::new(false, rendered));
        }
        let present = interp.binary(BinaryOp::In, &Value::str(key), &current)?;
        if !present.is_truthy() {
            return Ok(Verdict::new(false, rendered));
        }
        current = interp.get(&current, key)?;
    }
    if args.len() < 2 {
        return Ok(Verdict::new(true, rendered));
    }
    let expected = arg(args, 1);
    let pass = deep_equal(interp, &current, &expected, Strictness::Loose)?;
    Ok(Verdict::new(pass, format!("{rendered} = {}", inspect(&expected))))
}

fn compare(
    interp: &mut Interpreter,
    actual: &Value,
    args: &[Value],
    symbol: &str,
    op: fn(f64, f64) -> bool,
) -> EvalResult<Verdict> {
    let expected = interp.to_number(&arg(args, 0))?;
    let pass = match actual {
        Value::Number(n) => op(*n, expected),
        _ => false,
    };
    Ok(Verdict::new(pass, format!("{symbol} {expected}")))
}

fn to_be_greater_than(
    interp: &mut Interpreter,
    actual: &Value,
    args: &[Value],
    _: Mode,
) -> EvalResult<Verdict> {
    compare(interp, actual, args, ">", |a, b| a > b)
}

fn to_be_greater_than_or_equal(
    interp: &mut Interpreter,
    actual: &Value,
    args: &[Value],
    _: Mode,
) -> EvalResult<Verdict> {
    compare(interp, actual, args, ">=", |a, b| a >= b)
}

fn to_be_less_than(
    interp: &mut Interpreter,
    actual: &Value,
    args: &[Value],
    _: Mode,
) -> EvalResult<Verdict> {
    compare(interp, actual, args, "<", |a, b| a < b)
}

fn to_be_less_than_or_equal(
    interp: &mut Interpreter,
    actual: &Value,
    args: &[Value],
    _: Mode,
) -> EvalResult<Verdict> {
    compare(interp, actual, args, "<=", |a, b| a <= b)
}

fn to_be_instance_of(
    interp: &mut Interpreter,
    actual: &Value,
    args: &[Value],
    _: Mode,
) -> EvalResult<Verdict> {
    let constructor = arg(args, 0);
    let name = match &constructor {
        Value::Object(object) => object
            .callable()
            .map_or_else(|| inspect(&constructor), |callable| callable.name().to_string()),
        other => inspect(other),
    };
    let pass = interp
        .binary(BinaryOp::InstanceOf, actual, &constructor)?
        .is_truthy();
    Ok(Verdict::new(pass, format!("instance of {name}")))
}

/// `toThrow()`: calls the received function, or under `.rejects` inspects
/// the rejection reason. The optional argument is a message fragment, an
/// error constructor or an error whose message must match exactly.
fn to_throw(interp: &mut Interpreter, actual: &Value, args: &[Value], mode: Mode) -> EvalResult<Verdict> {
    let thrown = match mode {
        Mode::Rejects => Some(actual.clone()),
        Mode::Direct | Mode::Resolves => {
            if !actual.is_callable() {
                return Err(interp.type_error("toThrow expects a function"));
            }
            match interp.call(actual, Value::Undefined, &[]) {
                Ok(_) => None,
                Err(Interrupt::Throw(error)) => Some(error),
                Err(other) => return Err(other),
            }
        }
    };
    let expected = arg(args, 0);
    let Some(thrown) = thrown else {
        return Ok(Verdict::new(false, "a thrown error"));
    };
    let message = match &thrown {
        Value::Object(_) => {
            let message = interp.get(&thrown, "message")?;
            interp.to_string(&message)?
        }
        other => interp.to_string(other)?,
    };
    Ok(match &expected {
        Value::Undefined => Verdict::new(true, "a thrown error"),
        Value::Str(fragment) => Verdict::new(
            message.contains(&**fragment),
            format!("an error containing {fragment:?}"),
        ),
        Value::Object(object) if object.is_callable() => {
            let pass = interp
                .binary(BinaryOp::InstanceOf, &thrown, &expected)?
                .is_truthy();
            Verdict::new(pass, format!("an instance of {}", inspect(&expected)))
        }
        other => {
            let wanted = match other {
                Value::Object(_) => {
                    let wanted = interp.get(other, "message")?;
                    interp.to_string(&wanted)?
                }
                _ => interp.to_string(other)?,
            };
            Verdict::new(*message == *wanted, format!("an error with message {wanted:?}"))
        }
    })
}

#[cfg(test)]
mod tests;
