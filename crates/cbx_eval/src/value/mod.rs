//! Runtime values and heap objects.
//!
//! Primitives are stored inline; everything else lives behind an [`ObjRef`],
//! a shared single-threaded handle. Object identity is pointer identity.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use cbx_ir::ast::Function;
use cbx_ir::Name;

use crate::environment::{LocalScope, Scope};
use crate::errors::EvalResult;
use crate::host::{NamespaceSource, ScriptInfo};
use crate::Interpreter;

/// Property key under which the `Symbol.toStringTag` capability tag lives.
///
/// Keys starting with `@@` stand in for well-known symbols: they are never
/// enumerable and never reported by `Object.keys`.
pub const TO_STRING_TAG: &str = "@@toStringTag";

/// Whether a property key is a symbol stand-in.
#[inline]
pub fn is_symbol_key(key: &str) -> bool {
    key.starts_with("@@")
}

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(Name),
    Object(ObjRef),
}

impl Value {
    #[inline]
    pub fn str(s: &str) -> Self {
        Value::Str(Name::from(s))
    }

    #[inline]
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    #[inline]
    pub fn as_object(&self) -> Option<&ObjRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Whether this value can be called.
    pub fn is_callable(&self) -> bool {
        self.as_object().is_some_and(ObjRef::is_callable)
    }

    /// The truthiness used by conditions and logical operators.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::Object(_) => true,
        }
    }

    /// `typeof` result.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null | Value::Object(_) if !self.is_callable() => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            _ => "function",
        }
    }

    /// Strict equality (`===`).
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// `SameValueZero`: like `===` except `NaN` equals itself.
    pub fn same_value_zero(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) if a.is_nan() && b.is_nan() => true,
            _ => self.strict_equals(other),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{}", crate::ops::number_to_string(*n)),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Object(obj) => write!(f, "{obj:?}"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<Name> for Value {
    fn from(s: Name) -> Self {
        Value::Str(s)
    }
}

impl From<ObjRef> for Value {
    fn from(obj: ObjRef) -> Self {
        Value::Object(obj)
    }
}

/// Shared handle to a heap object.
#[derive(Clone)]
pub struct ObjRef(Rc<RefCell<JsObject>>);

impl ObjRef {
    pub fn new(object: JsObject) -> Self {
        ObjRef(Rc::new(RefCell::new(object)))
    }

    #[inline]
    pub fn borrow(&self) -> Ref<'_, JsObject> {
        self.0.borrow()
    }

    #[inline]
    pub fn borrow_mut(&self) -> RefMut<'_, JsObject> {
        self.0.borrow_mut()
    }

    #[inline]
    pub fn ptr_eq(&self, other: &ObjRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Stable identity for cycle detection while this handle is alive.
    #[inline]
    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    pub fn is_callable(&self) -> bool {
        matches!(self.borrow().class, ObjectClass::Function(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.borrow().class, ObjectClass::Array(_))
    }

    pub fn is_promise(&self) -> bool {
        matches!(self.borrow().class, ObjectClass::Promise(_))
    }

    /// The callable payload, cloned out of the borrow.
    pub fn callable(&self) -> Option<Callable> {
        match &self.borrow().class {
            ObjectClass::Function(callable) => Some(callable.clone()),
            _ => None,
        }
    }

    /// The namespace source, if this is a module namespace object.
    pub fn namespace(&self) -> Option<Rc<dyn NamespaceSource>> {
        match &self.borrow().class {
            ObjectClass::Namespace(source) => Some(Rc::clone(source)),
            _ => None,
        }
    }

    /// Array elements, cloned out of the borrow.
    pub fn array_elements(&self) -> Option<Vec<Value>> {
        match &self.borrow().class {
            ObjectClass::Array(items) => Some(items.clone()),
            _ => None,
        }
    }

    /// The `Symbol.toStringTag` capability tag, looked up through the
    /// prototype chain. Namespace objects always report `Module`.
    pub fn to_string_tag(&self) -> Option<Name> {
        let mut current = Some(self.clone());
        while let Some(obj) = current {
            let object = obj.borrow();
            if matches!(object.class, ObjectClass::Namespace(_)) {
                return Some(Name::from("Module"));
            }
            if let Some(Property {
                slot: Slot::Value(Value::Str(tag)),
                ..
            }) = object.own_property(TO_STRING_TAG)
            {
                return Some(tag.clone());
            }
            current = object.prototype.clone();
        }
        None
    }
}

impl PartialEq for ObjRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(object) => write!(f, "[{} #{:x}]", object.class.describe(), self.id()),
            Err(_) => write!(f, "[object #{:x}]", self.id()),
        }
    }
}

/// One property slot.
#[derive(Clone, Debug)]
pub struct Property {
    pub slot: Slot,
    pub enumerable: bool,
    pub writable: bool,
}

impl Property {
    /// Ordinary writable, enumerable data property.
    pub fn data(value: Value) -> Self {
        Property {
            slot: Slot::Value(value),
            enumerable: true,
            writable: true,
        }
    }

    /// Writable but non-enumerable; used for built-in methods.
    pub fn hidden(value: Value) -> Self {
        Property {
            slot: Slot::Value(value),
            enumerable: false,
            writable: true,
        }
    }
}

#[derive(Clone, Debug)]
pub enum Slot {
    Value(Value),
    Accessor {
        get: Option<Value>,
        set: Option<Value>,
    },
}

/// Heap object: class-specific payload plus ordered own properties.
pub struct JsObject {
    pub class: ObjectClass,
    properties: Vec<(Name, Property)>,
    pub prototype: Option<ObjRef>,
    pub extensible: bool,
}

impl JsObject {
    pub fn new(class: ObjectClass, prototype: Option<ObjRef>) -> Self {
        JsObject {
            class,
            properties: Vec::new(),
            prototype,
            extensible: true,
        }
    }

    pub fn own_property(&self, key: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|(name, _)| &**name == key)
            .map(|(_, prop)| prop)
    }

    pub fn own_property_mut(&mut self, key: &str) -> Option<&mut Property> {
        self.properties
            .iter_mut()
            .find(|(name, _)| &**name == key)
            .map(|(_, prop)| prop)
    }

    /// Insert or replace an own property, keeping the original position on
    /// replacement.
    pub fn define(&mut self, key: Name, property: Property) {
        let property = if is_symbol_key(&key) {
            Property {
                enumerable: false,
                ..property
            }
        } else {
            property
        };
        match self.own_property_mut(&key) {
            Some(existing) => *existing = property,
            None => self.properties.push((key, property)),
        }
    }

    /// Shorthand for `define(key, Property::data(value))`.
    pub fn set_data(&mut self, key: &str, value: Value) {
        self.define(Name::from(key), Property::data(value));
    }

    /// Shorthand for `define(key, Property::hidden(value))`.
    pub fn set_hidden(&mut self, key: &str, value: Value) {
        self.define(Name::from(key), Property::hidden(value));
    }

    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.properties.len();
        self.properties.retain(|(name, _)| &**name != key);
        before != self.properties.len()
    }

    pub fn properties(&self) -> impl Iterator<Item = (&Name, &Property)> {
        self.properties.iter().map(|(name, prop)| (name, prop))
    }

    /// Own enumerable string keys in insertion order.
    pub fn enumerable_keys(&self) -> Vec<Name> {
        self.properties
            .iter()
            .filter(|(_, prop)| prop.enumerable)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// `Object.freeze`: every property read-only, no additions.
    pub fn freeze(&mut self) {
        self.extensible = false;
        for (_, prop) in &mut self.properties {
            prop.writable = false;
        }
    }

    pub fn is_frozen(&self) -> bool {
        !self.extensible && self.properties.iter().all(|(_, p)| !p.writable)
    }
}

/// Class-specific payload of an object.
pub enum ObjectClass {
    Ordinary,
    Array(Vec<Value>),
    Function(Callable),
    Promise(PromiseSlot),
    /// Error instance; `name`/`message` live in ordinary properties.
    Error,
    /// Module namespace object; exports are read through the source.
    Namespace(Rc<dyn NamespaceSource>),
}

impl ObjectClass {
    pub fn describe(&self) -> &'static str {
        match self {
            ObjectClass::Ordinary => "object",
            ObjectClass::Array(_) => "array",
            ObjectClass::Function(_) => "function",
            ObjectClass::Promise(_) => "promise",
            ObjectClass::Error => "error",
            ObjectClass::Namespace(_) => "namespace",
        }
    }
}

/// Signature of built-in functions: interpreter, `this`, arguments.
pub type NativeFn = Rc<dyn Fn(&mut Interpreter, Value, &[Value]) -> EvalResult>;

/// Box a closure as a [`NativeFn`].
pub fn native_fn<F>(f: F) -> NativeFn
where
    F: Fn(&mut Interpreter, Value, &[Value]) -> EvalResult + 'static,
{
    Rc::new(f)
}

#[derive(Clone)]
pub enum Callable {
    Closure(Rc<Closure>),
    Native(NativeFunction),
    Bound(Rc<BoundFunction>),
}

impl Callable {
    pub fn name(&self) -> Name {
        match self {
            Callable::Closure(closure) => closure.name.clone(),
            Callable::Native(native) => native.name.clone(),
            Callable::Bound(bound) => Name::from(format!("bound {}", bound.name)),
        }
    }

    /// `fn.length`.
    pub fn length(&self) -> usize {
        match self {
            Callable::Closure(closure) => closure.function.arity(),
            Callable::Native(native) => native.length,
            Callable::Bound(bound) => bound.length,
        }
    }

    pub fn is_constructor(&self) -> bool {
        match self {
            Callable::Closure(closure) => !closure.function.is_arrow && !closure.function.is_async,
            Callable::Native(native) => native.constructor,
            Callable::Bound(_) => true,
        }
    }
}

/// Script function together with its captured environment.
pub struct Closure {
    pub function: Rc<Function>,
    pub name: Name,
    pub scope: LocalScope<Scope>,
    /// Lexically captured `this` of an arrow function.
    pub this: Option<Value>,
    pub script: Option<Rc<ScriptInfo>>,
}

#[derive(Clone)]
pub struct NativeFunction {
    pub name: Name,
    pub length: usize,
    pub constructor: bool,
    pub func: NativeFn,
}

pub struct BoundFunction {
    pub target: Value,
    pub this: Value,
    pub args: Vec<Value>,
    pub name: Name,
    pub length: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PromiseState {
    Pending,
    Fulfilled(Value),
    Rejected(Value),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.same_value_zero(other)
    }
}

/// Promise internals.
pub struct PromiseSlot {
    pub state: PromiseState,
    pub(crate) reactions: Vec<crate::promise::Reaction>,
    /// A rejection handler has been attached (or the rejection was awaited).
    pub handled: bool,
}

impl PromiseSlot {
    pub fn pending() -> Self {
        PromiseSlot {
            state: PromiseState::Pending,
            reactions: Vec::new(),
            handled: false,
        }
    }
}

#[cfg(test)]
mod tests;
