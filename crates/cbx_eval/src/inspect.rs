//! Human-readable rendering of values for console output and messages.
//!
//! Rendering never runs script code: accessors print as `[Getter]`, and
//! namespace objects list their export names only.

use rustc_hash::FxHashSet;

use crate::value::{Callable, ObjRef, ObjectClass, PromiseState, Property, Slot, Value};
use crate::Interpreter;

const MAX_DEPTH: usize = 4;

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

fn format_key(key: &str) -> String {
    if is_identifier(key) {
        key.to_string()
    } else {
        format!("'{key}'")
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'").replace('\n', "\\n"))
}

/// The `name` of an error object, read through its prototype chain.
pub(crate) fn error_name(object: &ObjRef) -> String {
    let mut current = Some(object.clone());
    while let Some(obj) = current {
        let next = {
            let borrowed = obj.borrow();
            if let Some(Property {
                slot: Slot::Value(Value::Str(name)),
                ..
            }) = borrowed.own_property("name")
            {
                return name.to_string();
            }
            borrowed.prototype.clone()
        };
        current = next;
    }
    "Error".to_string()
}

/// The own `message` string of an error object.
pub(crate) fn error_message(object: &ObjRef) -> String {
    match object.borrow().own_property("message") {
        Some(Property {
            slot: Slot::Value(value),
            ..
        }) => crate::ops::primitive_to_string(value),
        _ => String::new(),
    }
}

struct Inspector {
    seen: FxHashSet<usize>,
}

impl Inspector {
    fn value(&mut self, value: &Value, depth: usize) -> String {
        match value {
            Value::Str(s) => quote(s),
            Value::Number(n) if *n == 0.0 && n.is_sign_negative() => "-0".to_string(),
            Value::Object(obj) => self.object(obj, depth),
            other => crate::ops::primitive_to_string(other),
        }
    }

    fn object(&mut self, obj: &ObjRef, depth: usize) -> String {
        if let Some(callable) = obj.callable() {
            let name = callable.name();
            let kind = match &callable {
                Callable::Closure(closure) if closure.function.is_async => "AsyncFunction",
                _ => "Function",
            };
            return if name.is_empty() {
                format!("[{kind} (anonymous)]")
            } else {
                format!("[{kind}: {name}]")
            };
        }
        if !self.seen.insert(obj.id()) {
            return "[Circular *]".to_string();
        }
        let rendered = self.object_body(obj, depth);
        self.seen.remove(&obj.id());
        rendered
    }

    fn object_body(&mut self, obj: &ObjRef, depth: usize) -> String {
        enum Shape {
            Array(Vec<Value>),
            Promise(PromiseState),
            Error,
            Namespace(Vec<cbx_ir::Name>),
            Ordinary,
        }
        let shape = match &obj.borrow().class {
            ObjectClass::Array(items) => Shape::Array(items.clone()),
            ObjectClass::Promise(slot) => Shape::Promise(slot.state.clone()),
            ObjectClass::Error => Shape::Error,
            ObjectClass::Namespace(source) => {
                let mut names = source.export_names();
                names.sort();
                Shape::Namespace(names)
            }
            ObjectClass::Ordinary | ObjectClass::Function(_) => Shape::Ordinary,
        };
        match shape {
            Shape::Array(items) => {
                if items.is_empty() {
                    return "[]".to_string();
                }
                if depth >= MAX_DEPTH {
                    return "[Array]".to_string();
                }
                let parts: Vec<String> = items.iter().map(|v| self.value(v, depth + 1)).collect();
                format!("[ {} ]", parts.join(", "))
            }
            Shape::Promise(state) => match state {
                PromiseState::Pending => "Promise { <pending> }".to_string(),
                PromiseState::Fulfilled(value) => {
                    format!("Promise {{ {} }}", self.value(&value, depth + 1))
                }
                PromiseState::Rejected(reason) => {
                    format!("Promise {{ <rejected> {} }}", self.value(&reason, depth + 1))
                }
            },
            Shape::Error => {
                let name = error_name(obj);
                let message = error_message(obj);
                if message.is_empty() {
                    name
                } else {
                    format!("{name}: {message}")
                }
            }
            Shape::Namespace(names) => {
                let keys: Vec<String> = names.iter().map(|n| format_key(n)).collect();
                if keys.is_empty() {
                    "[Module: null prototype] {}".to_string()
                } else {
                    format!("[Module: null prototype] {{ {} }}", keys.join(", "))
                }
            }
            Shape::Ordinary => self.ordinary(obj, depth),
        }
    }

    fn ordinary(&mut self, obj: &ObjRef, depth: usize) -> String {
        let entries: Vec<(cbx_ir::Name, Slot)> = obj
            .borrow()
            .properties()
            .filter(|(_, prop)| prop.enumerable)
            .map(|(key, prop)| (key.clone(), prop.slot.clone()))
            .collect();
        let prefix = match obj.to_string_tag() {
            Some(tag) => format!("Object [{tag}] "),
            None => String::new(),
        };
        if entries.is_empty() {
            return format!("{prefix}{{}}");
        }
        if depth >= MAX_DEPTH {
            return "[Object]".to_string();
        }
        let parts: Vec<String> = entries
            .iter()
            .map(|(key, slot)| {
                let rendered = match slot {
                    Slot::Value(value) => self.value(value, depth + 1),
                    Slot::Accessor {
                        get: Some(_),
                        set: Some(_),
                    } => "[Getter/Setter]".to_string(),
                    Slot::Accessor { get: Some(_), .. } => "[Getter]".to_string(),
                    Slot::Accessor { .. } => "[Setter]".to_string(),
                };
                format!("{}: {rendered}", format_key(key))
            })
            .collect();
        format!("{prefix}{{ {} }}", parts.join(", "))
    }
}

/// Render `value` the way a debugging console would.
pub fn inspect(value: &Value) -> String {
    Inspector {
        seen: FxHashSet::default(),
    }
    .value(value, 0)
}

/// Like [`inspect`], but strings print without quotes.
pub fn display(value: &Value) -> String {
    match value {
        Value::Str(s) => s.to_string(),
        Value::Object(obj) if matches!(obj.borrow().class, ObjectClass::Error) => {
            let rendered = inspect(value);
            match obj.borrow().own_property("stack") {
                Some(Property {
                    slot: Slot::Value(Value::Str(stack)),
                    ..
                }) if stack.starts_with(&rendered) => stack.to_string(),
                _ => rendered,
            }
        }
        other => inspect(other),
    }
}

impl Interpreter {
    pub fn inspect(&self, value: &Value) -> String {
        inspect(value)
    }

    pub fn display(&self, value: &Value) -> String {
        display(value)
    }
}
