#![allow(clippy::unwrap_used, clippy::expect_used)]

use pretty_assertions::assert_eq;

use super::*;
use crate::Realm;

fn value_of(resolution: Resolution) -> Option<Value> {
    match resolution {
        Resolution::Value(value) => Some(value),
        _ => None,
    }
}

#[test]
fn lookups_walk_the_parent_chain() {
    let parent = LocalScope::new(Scope::new());
    parent
        .borrow_mut()
        .define(Name::from("outer"), Value::Number(1.0), Mutability::Mutable);
    let child = LocalScope::new(Scope::with_parent(parent.clone()));
    child
        .borrow_mut()
        .define(Name::from("inner"), Value::Number(2.0), Mutability::Mutable);

    assert_eq!(value_of(child.borrow().resolve("outer")), Some(Value::Number(1.0)));
    assert_eq!(value_of(child.borrow().resolve("inner")), Some(Value::Number(2.0)));
    assert!(matches!(parent.borrow().resolve("inner"), Resolution::NotFound));
}

#[test]
fn shadowing_does_not_touch_the_outer_binding() {
    let parent = LocalScope::new(Scope::new());
    parent
        .borrow_mut()
        .define(Name::from("x"), Value::Number(1.0), Mutability::Mutable);
    let child = LocalScope::new(Scope::with_parent(parent.clone()));
    child
        .borrow_mut()
        .define(Name::from("x"), Value::Number(2.0), Mutability::Mutable);
    child.borrow_mut().assign("x", Value::Number(3.0), false).unwrap();

    assert_eq!(value_of(parent.borrow().resolve("x")), Some(Value::Number(1.0)));
    assert_eq!(value_of(child.borrow().resolve("x")), Some(Value::Number(3.0)));
}

#[test]
fn assignment_errors() {
    let mut scope = Scope::new();
    scope.define(Name::from("c"), Value::Null, Mutability::Immutable);
    scope.declare_uninitialized(Name::from("tdz"), Mutability::Mutable);

    assert_eq!(scope.assign("c", Value::Null, false), Err(AssignError::Immutable));
    assert_eq!(scope.assign("tdz", Value::Null, false), Err(AssignError::Uninitialized));
    assert_eq!(scope.assign("nope", Value::Null, true), Err(AssignError::Undefined));
}

#[test]
fn initialize_ends_the_dead_zone() {
    let mut scope = Scope::new();
    let name = Name::from("late");
    scope.declare_uninitialized(name.clone(), Mutability::Immutable);
    assert!(matches!(scope.resolve("late"), Resolution::Uninitialized));
    scope.initialize(&name, Value::Bool(true));
    assert_eq!(value_of(scope.resolve("late")), Some(Value::Bool(true)));
}

#[test]
fn global_scope_falls_back_to_the_global_object() {
    let realm = Realm::new();
    let scope = Scope::global(realm.global.clone());
    assert!(matches!(scope.resolve("Array"), Resolution::Global(_)));

    let mut scope = scope;
    scope.assign("created", Value::Number(7.0), true).unwrap();
    assert!(realm.global.borrow().own_property("created").is_some());
}

#[test]
fn snapshots_copy_bindings_independently() {
    let mut scope = Scope::new();
    scope.define(Name::from("i"), Value::Number(0.0), Mutability::Mutable);
    let mut copy = scope.snapshot();
    copy.assign("i", Value::Number(1.0), false).unwrap();
    assert_eq!(value_of(scope.resolve("i")), Some(Value::Number(0.0)));
    assert_eq!(value_of(copy.resolve("i")), Some(Value::Number(1.0)));
}
