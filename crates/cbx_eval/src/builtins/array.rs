//! `Array` and `Array.prototype`.

use std::cmp::Ordering;

use cbx_ir::Name;

use super::{arg, constructor, method, this_object};
use crate::errors::{ErrorKind, EvalResult};
use crate::realm::Realm;
use crate::value::{ObjRef, ObjectClass, Value};
use crate::Interpreter;

/// Elements of `this`: a real array, or anything with a `length`.
fn elements(interp: &mut Interpreter, this: &Value) -> EvalResult<Vec<Value>> {
    if let Some(items) = this.as_object().and_then(ObjRef::array_elements) {
        return Ok(items);
    }
    if let Value::Str(s) = this {
        return interp.iterate(&Value::Str(s.clone()));
    }
    let length = interp.get(this, "length")?;
    let length = interp.to_number(&length)?;
    let length = if length.is_finite() && length > 0.0 { length as usize } else { 0 };
    let mut items = Vec::with_capacity(length);
    for index in 0..length {
        items.push(interp.get(this, &index.to_string())?);
    }
    Ok(items)
}

/// Mutate the elements of an array receiver in place.
fn with_items<R>(
    interp: &Interpreter,
    this: &Value,
    name: &str,
    f: impl FnOnce(&mut Vec<Value>) -> R,
) -> EvalResult<R> {
    let object = this_object(interp, this, name)?;
    let (is_array, frozen) = {
        let obj = object.borrow();
        (matches!(obj.class, ObjectClass::Array(_)), !obj.extensible)
    };
    if !is_array {
        return Err(interp.type_error(format!("Array.prototype.{name} called on non-array")));
    }
    if frozen {
        return Err(interp.type_error(format!("Cannot modify frozen array with {name}")));
    }
    let mut obj = object.borrow_mut();
    let ObjectClass::Array(items) = &mut obj.class else {
        return Ok(f(&mut Vec::new()));
    };
    Ok(f(items))
}

fn callback(interp: &Interpreter, args: &[Value], name: &str) -> EvalResult<Value> {
    let func = arg(args, 0);
    if func.is_callable() {
        Ok(func)
    } else {
        Err(interp.type_error(format!(
            "{} is not a function (in Array.prototype.{name})",
            interp.inspect(&func)
        )))
    }
}

/// Call `func(item, index, array)` for each element until `stop` says so.
fn each(
    interp: &mut Interpreter,
    this: &Value,
    args: &[Value],
    name: &str,
    mut visit: impl FnMut(usize, &Value, Value) -> bool,
) -> EvalResult<()> {
    let func = callback(interp, args, name)?;
    let receiver = arg(args, 1);
    let items = elements(interp, this)?;
    for (index, item) in items.into_iter().enumerate() {
        let result = interp.call(&func, receiver.clone(), &[item.clone(), index.into(), this.clone()])?;
        if !visit(index, &item, result) {
            break;
        }
    }
    Ok(())
}

fn default_compare(interp: &mut Interpreter, a: &Value, b: &Value) -> EvalResult<Ordering> {
    Ok(match (a, b) {
        (Value::Undefined, Value::Undefined) => Ordering::Equal,
        (Value::Undefined, _) => Ordering::Greater,
        (_, Value::Undefined) => Ordering::Less,
        _ => {
            let a = interp.to_string(a)?;
            let b = interp.to_string(b)?;
            a.cmp(&b)
        }
    })
}

/// Stable merge sort with a comparator that may throw.
fn sort_values(
    interp: &mut Interpreter,
    items: Vec<Value>,
    compare: &Value,
) -> EvalResult<Vec<Value>> {
    if items.len() <= 1 {
        return Ok(items);
    }
    let mut right = items;
    let left: Vec<Value> = right.drain(..right.len() / 2).collect();
    let left = sort_values(interp, left, compare)?;
    let right = sort_values(interp, right, compare)?;
    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    while let (Some(a), Some(b)) = (left.peek(), right.peek()) {
        let ordering = if compare.is_callable() {
            let result = interp.call(compare, Value::Undefined, &[a.clone(), b.clone()])?;
            let n = interp.to_number(&result)?;
            if n > 0.0 {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        } else {
            match default_compare(interp, a, b)? {
                Ordering::Greater => Ordering::Greater,
                _ => Ordering::Less,
            }
        };
        let next = if ordering == Ordering::Greater {
            right.next()
        } else {
            left.next()
        };
        merged.extend(next);
    }
    merged.extend(left);
    merged.extend(right);
    Ok(merged)
}

fn flatten(items: Vec<Value>, depth: f64, out: &mut Vec<Value>) {
    for item in items {
        match item.as_object().and_then(ObjRef::array_elements) {
            Some(inner) if depth >= 1.0 => flatten(inner, depth - 1.0, out),
            _ => out.push(item),
        }
    }
}

pub(super) fn install(realm: &Realm) {
    let proto = realm.intrinsics.array_proto.clone();
    let ctor = constructor(realm, "Array", 1, &proto, |interp, _, args| {
        let items = match args {
            [Value::Number(n)] => {
                if n.fract() != 0.0 || *n < 0.0 {
                    return Err(interp.throw((ErrorKind::Range, "Invalid array length".to_string())));
                }
                vec![Value::Undefined; *n as usize]
            }
            _ => args.to_vec(),
        };
        Ok(Value::Object(interp.new_array(items)))
    });

    method(realm, &ctor, "isArray", 1, |_, _, args| {
        Ok(Value::Bool(arg(args, 0).as_object().is_some_and(ObjRef::is_array)))
    });
    method(realm, &ctor, "of", 0, |interp, _, args| {
        Ok(Value::Object(interp.new_array(args.to_vec())))
    });
    method(realm, &ctor, "from", 1, |interp, _, args| {
        let source = arg(args, 0);
        if source.is_nullish() {
            return Err(interp.type_error("Cannot convert undefined or null to object"));
        }
        let items = elements(interp, &source)?;
        let map = arg(args, 1);
        let items = if map.is_callable() {
            let mut mapped = Vec::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                mapped.push(interp.call(&map, Value::Undefined, &[item, index.into()])?);
            }
            mapped
        } else {
            items
        };
        Ok(Value::Object(interp.new_array(items)))
    });

    method(realm, &proto, "push", 1, |interp, this, args| {
        let len = with_items(interp, &this, "push", |items| {
            items.extend_from_slice(args);
            items.len()
        })?;
        Ok(len.into())
    });
    method(realm, &proto, "pop", 0, |interp, this, _| {
        Ok(with_items(interp, &this, "pop", Vec::pop)?.unwrap_or_default())
    });
    method(realm, &proto, "shift", 0, |interp, this, _| {
        let shifted = with_items(interp, &this, "shift", |items| {
            (!items.is_empty()).then(|| items.remove(0))
        })?;
        Ok(shifted.unwrap_or_default())
    });
    method(realm, &proto, "unshift", 1, |interp, this, args| {
        let len = with_items(interp, &this, "unshift", |items| {
            items.splice(0..0, args.iter().cloned());
            items.len()
        })?;
        Ok(len.into())
    });
    method(realm, &proto, "splice", 2, |interp, this, args| {
        let len = elements(interp, &this)?.len();
        let start = interp.relative_index(args.first(), len, 0)?;
        let delete = match args.get(1) {
            None => len - start,
            Some(count) => {
                let n = interp.to_number(count)?;
                if n.is_nan() || n < 0.0 { 0 } else { (n as usize).min(len - start) }
            }
        };
        let inserted: Vec<Value> = args.get(2..).map(<[Value]>::to_vec).unwrap_or_default();
        let removed = with_items(interp, &this, "splice", |items| {
            items.splice(start..start + delete, inserted).collect::<Vec<_>>()
        })?;
        Ok(Value::Object(interp.new_array(removed)))
    });
    method(realm, &proto, "slice", 2, |interp, this, args| {
        let items = elements(interp, &this)?;
        let start = interp.relative_index(args.first(), items.len(), 0)?;
        let end = interp.relative_index(args.get(1), items.len(), items.len())?;
        let slice = items.get(start..end.max(start)).map(<[Value]>::to_vec).unwrap_or_default();
        Ok(Value::Object(interp.new_array(slice)))
    });
    method(realm, &proto, "concat", 1, |interp, this, args| {
        let mut items = elements(interp, &this)?;
        for value in args {
            match value.as_object().and_then(ObjRef::array_elements) {
                Some(inner) => items.extend(inner),
                None => items.push(value.clone()),
            }
        }
        Ok(Value::Object(interp.new_array(items)))
    });
    method(realm, &proto, "join", 1, |interp, this, args| {
        let separator = match arg(args, 0) {
            Value::Undefined => Name::from(","),
            other => interp.to_string(&other)?,
        };
        let items = elements(interp, &this)?;
        let mut parts = Vec::with_capacity(items.len());
        for item in &items {
            parts.push(if item.is_nullish() {
                String::new()
            } else {
                interp.to_string(item)?.to_string()
            });
        }
        Ok(Value::Str(Name::from(parts.join(&*separator))))
    });
    method(realm, &proto, "toString", 0, |interp, this, _| {
        let join = interp.get(&this, "join")?;
        interp.call(&join, this, &[])
    });
    method(realm, &proto, "indexOf", 1, |interp, this, args| {
        let needle = arg(args, 0);
        let items = elements(interp, &this)?;
        let start = interp.relative_index(args.get(1), items.len(), 0)?;
        let found = items.iter().skip(start).position(|item| item.strict_equals(&needle));
        Ok(found.map_or(Value::Number(-1.0), |i| (i + start).into()))
    });
    method(realm, &proto, "lastIndexOf", 1, |interp, this, args| {
        let needle = arg(args, 0);
        let items = elements(interp, &this)?;
        let found = items.iter().rposition(|item| item.strict_equals(&needle));
        Ok(found.map_or(Value::Number(-1.0), Value::from))
    });
    method(realm, &proto, "includes", 1, |interp, this, args| {
        let needle = arg(args, 0);
        let items = elements(interp, &this)?;
        Ok(Value::Bool(items.iter().any(|item| item.same_value_zero(&needle))))
    });
    method(realm, &proto, "find", 1, |interp, this, args| {
        let mut found = Value::Undefined;
        each(interp, &this, args, "find", |_, item, result| {
            if result.is_truthy() {
                found = item.clone();
                return false;
            }
            true
        })?;
        Ok(found)
    });
    method(realm, &proto, "findIndex", 1, |interp, this, args| {
        let mut found = -1.0;
        each(interp, &this, args, "findIndex", |index, _, result| {
            if result.is_truthy() {
                found = index as f64;
                return false;
            }
            true
        })?;
        Ok(Value::Number(found))
    });
    method(realm, &proto, "filter", 1, |interp, this, args| {
        let mut kept = Vec::new();
        each(interp, &this, args, "filter", |_, item, result| {
            if result.is_truthy() {
                kept.push(item.clone());
            }
            true
        })?;
        Ok(Value::Object(interp.new_array(kept)))
    });
    method(realm, &proto, "map", 1, |interp, this, args| {
        let mut mapped = Vec::new();
        each(interp, &this, args, "map", |_, _, result| {
            mapped.push(result);
            true
        })?;
        Ok(Value::Object(interp.new_array(mapped)))
    });
    method(realm, &proto, "flatMap", 1, |interp, this, args| {
        let mut mapped = Vec::new();
        each(interp, &this, args, "flatMap", |_, _, result| {
            mapped.push(result);
            true
        })?;
        let mut out = Vec::with_capacity(mapped.len());
        flatten(mapped, 1.0, &mut out);
        Ok(Value::Object(interp.new_array(out)))
    });
    method(realm, &proto, "forEach", 1, |interp, this, args| {
        each(interp, &this, args, "forEach", |_, _, _| true)?;
        Ok(Value::Undefined)
    });
    method(realm, &proto, "some", 1, |interp, this, args| {
        let mut any = false;
        each(interp, &this, args, "some", |_, _, result| {
            any = result.is_truthy();
            !any
        })?;
        Ok(Value::Bool(any))
    });
    method(realm, &proto, "every", 1, |interp, this, args| {
        let mut all = true;
        each(interp, &this, args, "every", |_, _, result| {
            all = result.is_truthy();
            all
        })?;
        Ok(Value::Bool(all))
    });
    method(realm, &proto, "reduce", 1, |interp, this, args| {
        let func = callback(interp, args, "reduce")?;
        let items = elements(interp, &this)?;
        let mut iter = items.into_iter().enumerate();
        let mut acc = match args.get(1) {
            Some(initial) => initial.clone(),
            None => match iter.next() {
                Some((_, first)) => first,
                None => return Err(interp.type_error("Reduce of empty array with no initial value")),
            },
        };
        for (index, item) in iter {
            acc = interp.call(&func, Value::Undefined, &[acc, item, index.into(), this.clone()])?;
        }
        Ok(acc)
    });
    method(realm, &proto, "sort", 1, |interp, this, args| {
        let items = elements(interp, &this)?;
        let sorted = sort_values(interp, items, &arg(args, 0))?;
        with_items(interp, &this, "sort", |items| *items = sorted)?;
        Ok(this)
    });
    method(realm, &proto, "reverse", 0, |interp, this, _| {
        with_items(interp, &this, "reverse", |items| items.reverse())?;
        Ok(this)
    });
    method(realm, &proto, "fill", 1, |interp, this, args| {
        let value = arg(args, 0);
        let len = elements(interp, &this)?.len();
        let start = interp.relative_index(args.get(1), len, 0)?;
        let end = interp.relative_index(args.get(2), len, len)?;
        with_items(interp, &this, "fill", |items| {
            for slot in items.iter_mut().take(end).skip(start) {
                *slot = value.clone();
            }
        })?;
        Ok(this)
    });
    method(realm, &proto, "flat", 0, |interp, this, args| {
        let depth = match arg(args, 0) {
            Value::Undefined => 1.0,
            other => interp.to_number(&other)?,
        };
        let items = elements(interp, &this)?;
        let mut out = Vec::with_capacity(items.len());
        flatten(items, depth, &mut out);
        Ok(Value::Object(interp.new_array(out)))
    });
    method(realm, &proto, "at", 1, |interp, this, args| {
        let items = elements(interp, &this)?;
        let n = interp.to_number(&arg(args, 0))?;
        let n = if n.is_nan() { 0.0 } else { n.trunc() };
        let index = if n < 0.0 { items.len() as f64 + n } else { n };
        Ok(if index < 0.0 {
            Value::Undefined
        } else {
            items.get(index as usize).cloned().unwrap_or_default()
        })
    });
    method(realm, &proto, "keys", 0, |interp, this, _| {
        let len = elements(interp, &this)?.len();
        let keys = (0..len).map(Value::from).collect();
        Ok(Value::Object(interp.new_array(keys)))
    });
    method(realm, &proto, "entries", 0, |interp, this, _| {
        let items = elements(interp, &this)?;
        let entries = items
            .into_iter()
            .enumerate()
            .map(|(i, item)| Value::Object(interp.new_array(vec![i.into(), item])))
            .collect();
        Ok(Value::Object(interp.new_array(entries)))
    });
}
