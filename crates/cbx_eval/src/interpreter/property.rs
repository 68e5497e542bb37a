//! Property access on values and objects.

use std::rc::Rc;

use cbx_ir::Name;

use super::Interpreter;
use crate::errors::{self, EvalResult};
use crate::host::NamespaceSource;
use crate::ops::array_index;
use crate::value::{
    is_symbol_key, JsObject, ObjRef, ObjectClass, Property, Slot, Value, TO_STRING_TAG,
};

/// Outcome of looking a key up on one object of a prototype chain.
enum Step {
    Found(Value),
    Getter(Option<Value>),
    Export(Rc<dyn NamespaceSource>),
    Next(Option<ObjRef>),
}

fn lookup_own(object: &JsObject, key: &str) -> Step {
    match &object.class {
        ObjectClass::Array(items) => {
            if key == "length" {
                return Step::Found(items.len().into());
            }
            if let Some(item) = array_index(key).and_then(|i| items.get(i)) {
                return Step::Found(item.clone());
            }
        }
        ObjectClass::Namespace(source) => {
            if key == TO_STRING_TAG {
                return Step::Found(Value::str("Module"));
            }
            return Step::Export(Rc::clone(source));
        }
        ObjectClass::Function(callable) if object.own_property(key).is_none() => match key {
            "name" => return Step::Found(callable.name().into()),
            "length" => return Step::Found(callable.length().into()),
            _ => {}
        },
        _ => {}
    }
    match object.own_property(key) {
        Some(Property {
            slot: Slot::Value(value),
            ..
        }) => Step::Found(value.clone()),
        Some(Property {
            slot: Slot::Accessor { get, .. },
            ..
        }) => Step::Getter(get.clone()),
        None => Step::Next(object.prototype.clone()),
    }
}

/// Whether `key` is an own property of `object`, including class-provided
/// ones (array indices, function `name`/`length`, namespace exports).
pub(crate) fn has_own_property(object: &ObjRef, key: &str) -> bool {
    let obj = object.borrow();
    let class_owned = match &obj.class {
        ObjectClass::Array(items) => {
            key == "length" || array_index(key).is_some_and(|i| i < items.len())
        }
        ObjectClass::Function(_) => key == "name" || key == "length",
        ObjectClass::Namespace(source) => source.export_names().iter().any(|n| &**n == key),
        _ => false,
    };
    class_owned || obj.own_property(key).is_some()
}

/// `key in object`, walking the prototype chain.
pub(crate) fn has_property(object: &ObjRef, key: &str) -> bool {
    let mut current = Some(object.clone());
    while let Some(obj) = current {
        if has_own_property(&obj, key) {
            return true;
        }
        current = obj.borrow().prototype.clone();
    }
    false
}

impl Interpreter {
    /// `base[key]` for any value.
    pub fn get(&mut self, base: &Value, key: &str) -> EvalResult {
        let proto = match base {
            Value::Object(obj) => return self.get_property(obj, key, base),
            Value::Undefined => return Err(self.throw(errors::cannot_read(key, "undefined"))),
            Value::Null => return Err(self.throw(errors::cannot_read(key, "null"))),
            Value::Str(s) => {
                if key == "length" {
                    return Ok(s.chars().count().into());
                }
                if let Some(c) = array_index(key).and_then(|i| s.chars().nth(i)) {
                    return Ok(Value::Str(Name::from(c.to_string())));
                }
                self.realm.intrinsics.string_proto.clone()
            }
            Value::Number(_) => self.realm.intrinsics.number_proto.clone(),
            Value::Bool(_) => self.realm.intrinsics.boolean_proto.clone(),
        };
        self.get_property(&proto, key, base)
    }

    /// Look `key` up on `object` and its prototype chain; getters run with
    /// `receiver` as `this`.
    pub fn get_property(&mut self, object: &ObjRef, key: &str, receiver: &Value) -> EvalResult {
        let mut current = object.clone();
        loop {
            let step = lookup_own(&current.borrow(), key);
            match step {
                Step::Found(value) => return Ok(value),
                Step::Getter(Some(getter)) => return self.call(&getter, receiver.clone(), &[]),
                Step::Getter(None) | Step::Next(None) => return Ok(Value::Undefined),
                Step::Export(source) => {
                    return Ok(source.get_export(self, key)?.unwrap_or_default());
                }
                Step::Next(Some(next)) => current = next,
            }
        }
    }

    /// `base[key] = value`.
    pub fn set(&mut self, base: &Value, key: &str, value: Value) -> EvalResult<()> {
        match base {
            Value::Object(obj) => self.set_property(obj, key, value, base),
            Value::Undefined => Err(self.throw(errors::cannot_set(key, "undefined"))),
            Value::Null => Err(self.throw(errors::cannot_set(key, "null"))),
            _ => Ok(()),
        }
    }

    pub fn set_property(
        &mut self,
        object: &ObjRef,
        key: &str,
        value: Value,
        receiver: &Value,
    ) -> EvalResult<()> {
        // Class-specific own slots.
        {
            let mut obj = object.borrow_mut();
            let frozen = !obj.extensible;
            match &mut obj.class {
                ObjectClass::Namespace(_) => {
                    drop(obj);
                    return Err(self.throw(errors::read_only_property(key)));
                }
                ObjectClass::Array(items) if !frozen => {
                    if key == "length" {
                        let len = crate::ops::primitive_to_number(&value);
                        if len >= 0.0 && len.fract() == 0.0 {
                            items.resize(len as usize, Value::Undefined);
                            return Ok(());
                        }
                        drop(obj);
                        return Err(self.throw((
                            errors::ErrorKind::Range,
                            "Invalid array length".to_string(),
                        )));
                    }
                    if let Some(index) = array_index(key) {
                        if index >= items.len() {
                            items.resize(index + 1, Value::Undefined);
                        }
                        items[index] = value;
                        return Ok(());
                    }
                }
                ObjectClass::Array(_) if array_index(key).is_some() || key == "length" => {
                    return Ok(());
                }
                _ => {}
            }
        }

        // Setters and read-only slots anywhere on the chain.
        let mut current = Some(object.clone());
        while let Some(obj) = current {
            let found = obj.borrow().own_property(key).map(|p| (p.slot.clone(), p.writable));
            match found {
                Some((Slot::Accessor { set, .. }, _)) => {
                    return match set {
                        Some(setter) => self.call(&setter, receiver.clone(), &[value]).map(drop),
                        None => Ok(()),
                    };
                }
                Some((Slot::Value(_), false)) => return Ok(()),
                Some((Slot::Value(_), true)) if obj.ptr_eq(object) => {
                    if let Some(prop) = object.borrow_mut().own_property_mut(key) {
                        prop.slot = Slot::Value(value);
                    }
                    return Ok(());
                }
                _ => {}
            }
            current = obj.borrow().prototype.clone();
        }

        let mut obj = object.borrow_mut();
        if obj.extensible {
            obj.define(Name::from(key), Property::data(value));
        }
        Ok(())
    }

    /// `delete base[key]`.
    pub fn delete_property(&mut self, base: &Value, key: &str) -> EvalResult<bool> {
        let Value::Object(object) = base else {
            return Ok(true);
        };
        let mut obj = object.borrow_mut();
        if !obj.extensible {
            return Ok(false);
        }
        match &mut obj.class {
            ObjectClass::Namespace(_) => {
                drop(obj);
                return Err(self.throw(errors::read_only_property(key)));
            }
            ObjectClass::Array(items) => {
                if let Some(slot) = array_index(key).and_then(|i| items.get_mut(i)) {
                    *slot = Value::Undefined;
                    return Ok(true);
                }
            }
            _ => {}
        }
        obj.remove(key);
        Ok(true)
    }

    /// Define a data property directly, bypassing setters.
    pub fn define_data(&self, object: &ObjRef, key: &str, value: Value) {
        let mut obj = object.borrow_mut();
        if let ObjectClass::Array(items) = &mut obj.class {
            if let Some(index) = array_index(key) {
                if index >= items.len() {
                    items.resize(index + 1, Value::Undefined);
                }
                items[index] = value;
                return;
            }
        }
        obj.define(Name::from(key), Property::data(value));
    }

    /// Own enumerable keys in enumeration order: array indices, then
    /// insertion order; namespace exports are sorted.
    pub fn own_keys(&self, object: &ObjRef) -> Vec<Name> {
        let obj = object.borrow();
        let mut keys: Vec<Name> = match &obj.class {
            ObjectClass::Array(items) => (0..items.len()).map(|i| Name::from(i.to_string())).collect(),
            ObjectClass::Namespace(source) => {
                let mut names = source.export_names();
                names.sort();
                return names;
            }
            _ => Vec::new(),
        };
        keys.extend(obj.enumerable_keys().into_iter().filter(|k| !is_symbol_key(k)));
        keys
    }

    /// Own enumerable `[key, value]` pairs, running getters.
    pub fn own_entries(&mut self, object: &ObjRef) -> EvalResult<Vec<(Name, Value)>> {
        let receiver = Value::Object(object.clone());
        let keys = self.own_keys(object);
        let mut entries = Vec::with_capacity(keys.len());
        for key in keys {
            let value = self.get_property(object, &key, &receiver)?;
            entries.push((key, value));
        }
        Ok(entries)
    }

    /// Values produced by iterating `value` (`for … of`, spread).
    pub fn iterate(&mut self, value: &Value) -> EvalResult<Vec<Value>> {
        match value {
            Value::Str(s) => Ok(s
                .chars()
                .map(|c| Value::Str(Name::from(c.to_string())))
                .collect()),
            Value::Object(obj) => match obj.array_elements() {
                Some(items) => Ok(items),
                None => {
                    let described = self.inspect(value);
                    Err(self.throw(errors::not_iterable(&described)))
                }
            },
            _ => {
                let described = self.inspect(value);
                Err(self.throw(errors::not_iterable(&described)))
            }
        }
    }
}
