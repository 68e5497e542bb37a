#![allow(clippy::unwrap_used, clippy::expect_used)]

use pretty_assertions::assert_eq;

use super::*;
use crate::Realm;

#[test]
fn truthiness() {
    assert!(!Value::Undefined.is_truthy());
    assert!(!Value::Number(f64::NAN).is_truthy());
    assert!(!Value::str("").is_truthy());
    assert!(Value::str("0").is_truthy());
    assert!(Value::Object(Realm::new().object()).is_truthy());
}

#[test]
fn type_of_values() {
    let realm = Realm::new();
    assert_eq!(Value::Null.type_of(), "object");
    assert_eq!(Value::Number(1.0).type_of(), "number");
    assert_eq!(Value::Object(realm.object()).type_of(), "object");
    let func = realm.function("f", 0, native_fn(|_, _, _| Ok(Value::Undefined)));
    assert_eq!(Value::Object(func).type_of(), "function");
}

#[test]
fn strict_equality_uses_identity_for_objects() {
    let realm = Realm::new();
    let a = realm.object();
    let b = realm.object();
    assert!(Value::Object(a.clone()).strict_equals(&Value::Object(a.clone())));
    assert!(!Value::Object(a).strict_equals(&Value::Object(b)));
    assert!(!Value::Number(f64::NAN).strict_equals(&Value::Number(f64::NAN)));
    assert!(Value::Number(f64::NAN).same_value_zero(&Value::Number(f64::NAN)));
}

#[test]
fn define_keeps_insertion_position() {
    let mut object = JsObject::new(ObjectClass::Ordinary, None);
    object.set_data("a", Value::Number(1.0));
    object.set_data("b", Value::Number(2.0));
    object.set_data("a", Value::Number(3.0));
    let keys: Vec<&str> = object.properties().map(|(k, _)| &**k).collect();
    assert_eq!(keys, ["a", "b"]);
}

#[test]
fn symbol_keys_are_never_enumerable() {
    let mut object = JsObject::new(ObjectClass::Ordinary, None);
    object.set_data(TO_STRING_TAG, Value::str("Thing"));
    object.set_data("visible", Value::Bool(true));
    assert_eq!(object.enumerable_keys(), vec![Name::from("visible")]);
}

#[test]
fn to_string_tag_is_inherited() {
    let realm = Realm::new();
    let proto = realm.object();
    proto.borrow_mut().set_hidden(TO_STRING_TAG, Value::str("Tagged"));
    let child = ObjRef::new(JsObject::new(ObjectClass::Ordinary, Some(proto)));
    assert_eq!(child.to_string_tag().as_deref(), Some("Tagged"));
    assert_eq!(realm.object().to_string_tag(), None);
}

#[test]
fn freeze_makes_everything_read_only() {
    let mut object = JsObject::new(ObjectClass::Ordinary, None);
    object.set_data("a", Value::Number(1.0));
    assert!(!object.is_frozen());
    object.freeze();
    assert!(object.is_frozen());
    assert!(!object.own_property("a").unwrap().writable);
}

#[test]
fn bound_function_naming() {
    let realm = Realm::new();
    let target = realm.function("sum", 2, native_fn(|_, _, _| Ok(Value::Undefined)));
    let bound = Callable::Bound(Rc::new(BoundFunction {
        target: Value::Object(target),
        this: Value::Undefined,
        args: vec![Value::Number(1.0)],
        name: Name::from("sum"),
        length: 1,
    }));
    assert_eq!(&*bound.name(), "bound sum");
    assert_eq!(bound.length(), 1);
    assert!(bound.is_constructor());
}
