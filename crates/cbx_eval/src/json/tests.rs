#![allow(clippy::unwrap_used, clippy::expect_used)]

use pretty_assertions::assert_eq;
use serde_json::json;

use super::*;
use crate::{Interrupt, Realm};

fn interpreter() -> Interpreter {
    Interpreter::new(Realm::new())
}

#[test]
fn from_json_builds_plain_values() {
    let interp = interpreter();
    let value = from_json(&interp, &json!({ "b": [1, "two", null], "a": true }));
    assert_eq!(interp.inspect(&value), "{ b: [ 1, 'two', null ], a: true }");
}

#[test]
fn to_json_keeps_integers_integral() {
    let mut interp = interpreter();
    let value = interp.run_source("({ n: 3, f: 1.5, big: 2 ** 60, inf: Infinity })", "t.js").unwrap();
    let json = to_json(&mut interp, &value).unwrap().unwrap();
    assert_eq!(json["n"], json!(3));
    assert_eq!(json["f"], json!(1.5));
    assert_eq!(json["inf"], serde_json::Value::Null);
    assert!(json["big"].is_f64());
}

#[test]
fn to_json_skips_undefined_and_functions() {
    let mut interp = interpreter();
    let value = interp
        .run_source("({ u: undefined, f() {}, list: [undefined, () => 1] })", "t.js")
        .unwrap();
    let json = to_json(&mut interp, &value).unwrap().unwrap();
    assert_eq!(json, json!({ "list": [null, null] }));
    assert_eq!(to_json(&mut interp, &Value::Undefined).unwrap(), None);
}

#[test]
fn to_json_honours_to_json_methods() {
    let mut interp = interpreter();
    let value = interp
        .run_source("({ when: { toJSON() { return 'later'; } } })", "t.js")
        .unwrap();
    let json = to_json(&mut interp, &value).unwrap().unwrap();
    assert_eq!(json, json!({ "when": "later" }));
}

#[test]
fn circular_structures_throw() {
    let mut interp = interpreter();
    let value = interp.run_source("const o = {}; o.o = o; o", "t.js").unwrap();
    let error = match to_json(&mut interp, &value) {
        Err(Interrupt::Throw(error)) => interp.inspect(&error),
        other => panic!("expected a throw, got {other:?}"),
    };
    assert_eq!(error, "TypeError: Converting circular structure to JSON");
}

#[test]
fn shared_references_are_not_cycles() {
    let mut interp = interpreter();
    let value = interp
        .run_source("const shared = { x: 1 }; ({ a: shared, b: shared })", "t.js")
        .unwrap();
    let json = to_json(&mut interp, &value).unwrap().unwrap();
    assert_eq!(json, json!({ "a": { "x": 1 }, "b": { "x": 1 } }));
}
