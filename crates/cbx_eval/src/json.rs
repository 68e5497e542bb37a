//! Conversion between script values and `serde_json` values.

use cbx_ir::Name;
use rustc_hash::FxHashSet;
use serde_json::{Map, Number};

use crate::errors::EvalResult;
use crate::value::Value;
use crate::Interpreter;

/// Largest integer every `f64` represents exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Build a script value from JSON.
pub fn from_json(interp: &Interpreter, json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::Str(Name::from(s.as_str())),
        serde_json::Value::Array(items) => {
            let items = items.iter().map(|item| from_json(interp, item)).collect();
            Value::Object(interp.new_array(items))
        }
        serde_json::Value::Object(map) => {
            let object = interp.new_object();
            {
                let mut obj = object.borrow_mut();
                for (key, value) in map {
                    obj.set_data(key, from_json(interp, value));
                }
            }
            Value::Object(object)
        }
    }
}

/// Serialize a script value the way `JSON.stringify` does. `None` means
/// the value has no JSON form (`undefined`, functions).
pub fn to_json(interp: &mut Interpreter, value: &Value) -> EvalResult<Option<serde_json::Value>> {
    let mut seen = FxHashSet::default();
    serialize(interp, value, &mut seen)
}

fn number(n: f64) -> serde_json::Value {
    if !n.is_finite() {
        return serde_json::Value::Null;
    }
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return serde_json::Value::Number(Number::from(n as i64));
    }
    Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
}

fn serialize(
    interp: &mut Interpreter,
    value: &Value,
    seen: &mut FxHashSet<usize>,
) -> EvalResult<Option<serde_json::Value>> {
    let value = match value {
        Value::Object(obj) if !obj.is_callable() => {
            let to_json = interp.get(value, "toJSON")?;
            if to_json.is_callable() {
                interp.call(&to_json, value.clone(), &[])?
            } else {
                value.clone()
            }
        }
        _ => value.clone(),
    };
    Ok(Some(match &value {
        Value::Undefined => return Ok(None),
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => number(*n),
        Value::Str(s) => serde_json::Value::String(s.to_string()),
        Value::Object(obj) if obj.is_callable() => return Ok(None),
        Value::Object(obj) => {
            if !seen.insert(obj.id()) {
                return Err(interp.type_error("Converting circular structure to JSON"));
            }
            let result = if let Some(items) = obj.array_elements() {
                let mut out = Vec::with_capacity(items.len());
                for item in &items {
                    out.push(serialize(interp, item, seen)?.unwrap_or(serde_json::Value::Null));
                }
                serde_json::Value::Array(out)
            } else {
                let mut map = Map::new();
                for (key, item) in interp.own_entries(obj)? {
                    if let Some(json) = serialize(interp, &item, seen)? {
                        map.insert(key.to_string(), json);
                    }
                }
                serde_json::Value::Object(map)
            };
            seen.remove(&obj.id());
            result
        }
    }))
}

#[cfg(test)]
mod tests;
