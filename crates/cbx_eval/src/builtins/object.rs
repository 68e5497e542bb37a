//! `Object` and `Object.prototype`.

use cbx_ir::Name;

use super::{arg, constructor, method};
use crate::errors::{self, EvalResult};
use crate::interpreter::has_own_property;
use crate::realm::Realm;
use crate::value::{is_symbol_key, JsObject, ObjRef, ObjectClass, Property, Slot, Value};
use crate::Interpreter;

pub(super) fn install(realm: &Realm) {
    let proto = realm.intrinsics.object_proto.clone();
    let ctor = constructor(realm, "Object", 1, &proto, |interp, _, args| {
        Ok(match arg(args, 0) {
            value @ Value::Object(_) => value,
            _ => Value::Object(interp.new_object()),
        })
    });

    method(realm, &ctor, "keys", 1, |interp, _, args| {
        let keys = enumerable_entries(interp, &arg(args, 0))?
            .into_iter()
            .map(|(key, _)| Value::Str(key))
            .collect();
        Ok(Value::Object(interp.new_array(keys)))
    });
    method(realm, &ctor, "values", 1, |interp, _, args| {
        let values = enumerable_entries(interp, &arg(args, 0))?
            .into_iter()
            .map(|(_, value)| value)
            .collect();
        Ok(Value::Object(interp.new_array(values)))
    });
    method(realm, &ctor, "entries", 1, |interp, _, args| {
        let entries = enumerable_entries(interp, &arg(args, 0))?
            .into_iter()
            .map(|(key, value)| Value::Object(interp.new_array(vec![Value::Str(key), value])))
            .collect();
        Ok(Value::Object(interp.new_array(entries)))
    });
    method(realm, &ctor, "assign", 2, |interp, _, args| {
        let target = arg(args, 0);
        if target.is_nullish() {
            return Err(interp.type_error("Cannot convert undefined or null to object"));
        }
        for source in args.iter().skip(1) {
            for (key, value) in enumerable_entries(interp, source)? {
                interp.set(&target, &key, value)?;
            }
        }
        Ok(target)
    });
    method(realm, &ctor, "defineProperty", 3, |interp, _, args| {
        let target = arg(args, 0);
        let Value::Object(object) = &target else {
            return Err(interp.type_error("Object.defineProperty called on non-object"));
        };
        let key = interp.to_property_key(&arg(args, 1))?;
        define_from_descriptor(interp, object, &key, &arg(args, 2))?;
        Ok(target)
    });
    method(realm, &ctor, "defineProperties", 2, |interp, _, args| {
        let target = arg(args, 0);
        let Value::Object(object) = &target else {
            return Err(interp.type_error("Object.defineProperties called on non-object"));
        };
        for (key, descriptor) in enumerable_entries(interp, &arg(args, 1))? {
            define_from_descriptor(interp, object, &key, &descriptor)?;
        }
        Ok(target)
    });
    method(realm, &ctor, "getOwnPropertyDescriptor", 2, |interp, _, args| {
        let Value::Object(object) = arg(args, 0) else {
            return Ok(Value::Undefined);
        };
        let key = interp.to_property_key(&arg(args, 1))?;
        let own = object.borrow().own_property(&key).cloned();
        let property = match own {
            Some(property) => property,
            None if has_own_property(&object, &key) => {
                let value = interp.get_property(&object, &key, &Value::Object(object.clone()))?;
                Property::data(value)
            }
            None => return Ok(Value::Undefined),
        };
        let descriptor = interp.new_object();
        {
            let mut desc = descriptor.borrow_mut();
            match property.slot {
                Slot::Value(value) => {
                    desc.set_data("value", value);
                    desc.set_data("writable", Value::Bool(property.writable));
                }
                Slot::Accessor { get, set } => {
                    desc.set_data("get", get.unwrap_or_default());
                    desc.set_data("set", set.unwrap_or_default());
                }
            }
            desc.set_data("enumerable", Value::Bool(property.enumerable));
            desc.set_data("configurable", Value::Bool(true));
        }
        Ok(Value::Object(descriptor))
    });
    method(realm, &ctor, "getPrototypeOf", 1, |interp, _, args| {
        let value = arg(args, 0);
        let proto = match &value {
            Value::Object(obj) => obj.borrow().prototype.clone(),
            Value::Str(_) => Some(interp.realm().intrinsics.string_proto.clone()),
            Value::Number(_) => Some(interp.realm().intrinsics.number_proto.clone()),
            Value::Bool(_) => Some(interp.realm().intrinsics.boolean_proto.clone()),
            Value::Undefined | Value::Null => {
                return Err(interp.type_error("Cannot convert undefined or null to object"));
            }
        };
        Ok(proto.map_or(Value::Null, Value::Object))
    });
    method(realm, &ctor, "setPrototypeOf", 2, |interp, _, args| {
        let target = arg(args, 0);
        if let Value::Object(object) = &target {
            match arg(args, 1) {
                Value::Object(proto) => object.borrow_mut().prototype = Some(proto),
                Value::Null => object.borrow_mut().prototype = None,
                _ => return Err(interp.type_error("Object prototype may only be an Object or null")),
            }
        }
        Ok(target)
    });
    method(realm, &ctor, "create", 2, |interp, _, args| {
        let proto = match arg(args, 0) {
            Value::Object(proto) => Some(proto),
            Value::Null => None,
            _ => return Err(interp.type_error("Object prototype may only be an Object or null")),
        };
        let object = ObjRef::new(JsObject::new(ObjectClass::Ordinary, proto));
        let properties = arg(args, 1);
        if !properties.is_nullish() {
            for (key, descriptor) in enumerable_entries(interp, &properties)? {
                define_from_descriptor(interp, &object, &key, &descriptor)?;
            }
        }
        Ok(Value::Object(object))
    });
    method(realm, &ctor, "freeze", 1, |_, _, args| {
        let value = arg(args, 0);
        if let Value::Object(object) = &value {
            object.borrow_mut().freeze();
        }
        Ok(value)
    });
    method(realm, &ctor, "isFrozen", 1, |_, _, args| {
        Ok(Value::Bool(match arg(args, 0) {
            Value::Object(object) => object.borrow().is_frozen(),
            _ => true,
        }))
    });
    method(realm, &ctor, "getOwnPropertyNames", 1, |interp, _, args| {
        let Value::Object(object) = arg(args, 0) else {
            return Ok(Value::Object(interp.new_array(Vec::new())));
        };
        let mut names: Vec<Value> = Vec::new();
        {
            let obj = object.borrow();
            match &obj.class {
                ObjectClass::Array(items) => {
                    names.extend((0..items.len()).map(|i| Value::Str(Name::from(i.to_string()))));
                    names.push(Value::str("length"));
                }
                ObjectClass::Namespace(source) => {
                    let mut exports = source.export_names();
                    exports.sort();
                    names.extend(exports.into_iter().map(Value::Str));
                }
                _ => {}
            }
            names.extend(
                obj.properties()
                    .filter(|(key, _)| !is_symbol_key(key))
                    .map(|(key, _)| Value::Str(key.clone())),
            );
        }
        Ok(Value::Object(interp.new_array(names)))
    });
    method(realm, &ctor, "fromEntries", 1, |interp, _, args| {
        let object = interp.new_object();
        for entry in interp.iterate(&arg(args, 0))? {
            let key = interp.get(&entry, "0")?;
            let key = interp.to_property_key(&key)?;
            let value = interp.get(&entry, "1")?;
            object.borrow_mut().set_data(&key, value);
        }
        Ok(Value::Object(object))
    });
    method(realm, &ctor, "is", 2, |_, _, args| {
        let (a, b) = (arg(args, 0), arg(args, 1));
        Ok(Value::Bool(match (&a, &b) {
            (Value::Number(x), Value::Number(y)) => {
                (x.is_nan() && y.is_nan()) || (x == y && x.is_sign_negative() == y.is_sign_negative())
            }
            _ => a.strict_equals(&b),
        }))
    });

    method(realm, &proto, "hasOwnProperty", 1, |interp, this, args| {
        let key = interp.to_property_key(&arg(args, 0))?;
        Ok(Value::Bool(match &this {
            Value::Object(object) => has_own_property(object, &key),
            Value::Str(s) => {
                &*key == "length"
                    || crate::ops::array_index(&key).is_some_and(|i| i < s.chars().count())
            }
            _ => false,
        }))
    });
    method(realm, &proto, "isPrototypeOf", 1, |_, this, args| {
        let (Value::Object(proto), Value::Object(object)) = (&this, &arg(args, 0)) else {
            return Ok(Value::Bool(false));
        };
        let mut current = object.borrow().prototype.clone();
        while let Some(candidate) = current {
            if candidate.ptr_eq(proto) {
                return Ok(Value::Bool(true));
            }
            current = candidate.borrow().prototype.clone();
        }
        Ok(Value::Bool(false))
    });
    method(realm, &proto, "propertyIsEnumerable", 1, |interp, this, args| {
        let key = interp.to_property_key(&arg(args, 0))?;
        Ok(Value::Bool(match &this {
            Value::Object(object) => interp.own_keys(object).contains(&key),
            _ => false,
        }))
    });
    method(realm, &proto, "toString", 0, |_, this, _| {
        Ok(Value::Str(Name::from(format!("[object {}]", builtin_tag(&this)))))
    });
    method(realm, &proto, "toLocaleString", 0, |interp, this, _| {
        let to_string = interp.get(&this, "toString")?;
        interp.call(&to_string, this, &[])
    });
    method(realm, &proto, "valueOf", 0, |_, this, _| Ok(this));
}

/// Tag used by `Object.prototype.toString`.
fn builtin_tag(value: &Value) -> String {
    match value {
        Value::Undefined => "Undefined".to_string(),
        Value::Null => "Null".to_string(),
        Value::Bool(_) => "Boolean".to_string(),
        Value::Number(_) => "Number".to_string(),
        Value::Str(_) => "String".to_string(),
        Value::Object(obj) => {
            if let Some(tag) = obj.to_string_tag() {
                return tag.to_string();
            }
            match &obj.borrow().class {
                ObjectClass::Array(_) => "Array",
                ObjectClass::Function(_) => "Function",
                ObjectClass::Error => "Error",
                ObjectClass::Promise(_) => "Promise",
                ObjectClass::Namespace(_) => "Module",
                ObjectClass::Ordinary => "Object",
            }
            .to_string()
        }
    }
}

/// Own enumerable entries of any value; `null`/`undefined` throw.
pub(super) fn enumerable_entries(interp: &mut Interpreter, value: &Value) -> EvalResult<Vec<(Name, Value)>> {
    match value {
        Value::Object(object) => interp.own_entries(object),
        Value::Str(s) => Ok(s
            .chars()
            .enumerate()
            .map(|(i, c)| (Name::from(i.to_string()), Value::Str(Name::from(c.to_string()))))
            .collect()),
        Value::Undefined | Value::Null => {
            Err(interp.type_error("Cannot convert undefined or null to object"))
        }
        _ => Ok(Vec::new()),
    }
}

/// Apply a property descriptor object (`Object.defineProperty`).
fn define_from_descriptor(
    interp: &mut Interpreter,
    object: &ObjRef,
    key: &str,
    descriptor: &Value,
) -> EvalResult<()> {
    if !matches!(descriptor, Value::Object(_)) {
        return Err(interp.type_error("Property description must be an object"));
    }
    if object.namespace().is_some() {
        return Err(interp.throw(errors::read_only_property(key)));
    }
    let flag = |interp: &mut Interpreter, name: &str| -> EvalResult<bool> {
        Ok(interp.get(descriptor, name)?.is_truthy())
    };
    let enumerable = flag(interp, "enumerable")?;
    let writable = flag(interp, "writable")?;
    let get = interp.get(descriptor, "get")?;
    let set = interp.get(descriptor, "set")?;
    let slot = if get.is_callable() || set.is_callable() {
        Slot::Accessor {
            get: get.is_callable().then_some(get),
            set: set.is_callable().then_some(set),
        }
    } else {
        let value = interp.get(descriptor, "value")?;
        if object.is_array() && crate::ops::array_index(key).is_some() {
            interp.define_data(object, key, value);
            return Ok(());
        }
        Slot::Value(value)
    };
    object.borrow_mut().define(
        Name::from(key),
        Property {
            slot,
            enumerable,
            writable,
        },
    );
    Ok(())
}
