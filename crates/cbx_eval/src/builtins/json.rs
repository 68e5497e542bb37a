//! `JSON.parse` and `JSON.stringify` on top of `serde_json`.

use cbx_ir::Name;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

use super::{arg, method};
use crate::errors::{ErrorKind, EvalResult};
use crate::json::{from_json, to_json};
use crate::realm::Realm;
use crate::value::{Value, TO_STRING_TAG};
use crate::Interpreter;

/// Indentation requested by the third `stringify` argument.
fn indent(interp: &mut Interpreter, space: &Value) -> EvalResult<Option<String>> {
    Ok(match space {
        Value::Number(n) if *n >= 1.0 => Some(" ".repeat(n.min(10.0) as usize)),
        Value::Str(s) if !s.is_empty() => Some(s.chars().take(10).collect()),
        Value::Object(_) => {
            let primitive = interp.to_primitive(space, crate::interpreter::Hint::Default)?;
            return indent(interp, &primitive);
        }
        _ => None,
    })
}

fn render(json: &serde_json::Value, indent: Option<&str>) -> Result<String, serde_json::Error> {
    match indent {
        None => serde_json::to_string(json),
        Some(indent) => {
            let mut out = Vec::new();
            let formatter = PrettyFormatter::with_indent(indent.as_bytes());
            let mut serializer = Serializer::with_formatter(&mut out, formatter);
            json.serialize(&mut serializer)?;
            Ok(String::from_utf8_lossy(&out).into_owned())
        }
    }
}

pub(super) fn install(realm: &Realm) {
    let json = realm.object();
    json.borrow_mut()
        .set_hidden(TO_STRING_TAG, Value::str("JSON"));

    method(realm, &json, "parse", 2, |interp, _, args| {
        let text = interp.to_string(&arg(args, 0))?;
        let parsed: serde_json::Value = serde_json::from_str(&text).map_err(|err| {
            interp.throw((ErrorKind::Syntax, format!("Unexpected token in JSON: {err}")))
        })?;
        let value = from_json(interp, &parsed);
        let reviver = arg(args, 1);
        if !reviver.is_callable() {
            return Ok(value);
        }
        let holder = interp.new_object();
        holder.borrow_mut().set_data("", value);
        revive(interp, &Value::Object(holder), Name::from(""), &reviver)
    });
    method(realm, &json, "stringify", 3, |interp, _, args| {
        let Some(json) = to_json(interp, &arg(args, 0))? else {
            return Ok(Value::Undefined);
        };
        let indent = indent(interp, &arg(args, 2))?;
        let text = render(&json, indent.as_deref())
            .map_err(|err| interp.type_error(err.to_string()))?;
        Ok(Value::Str(Name::from(text)))
    });

    realm.define_global("JSON", Value::Object(json));
}

/// Post-order walk calling `reviver(key, value)` on every property.
fn revive(interp: &mut Interpreter, holder: &Value, key: Name, reviver: &Value) -> EvalResult {
    let value = interp.get(holder, &key)?;
    if let Value::Object(object) = &value {
        for child in interp.own_keys(object) {
            let revived = revive(interp, &value, child.clone(), reviver)?;
            if matches!(revived, Value::Undefined) {
                interp.delete_property(&value, &child)?;
            } else {
                interp.set(&value, &child, revived)?;
            }
        }
    }
    interp.call(reviver, holder.clone(), &[Value::Str(key), value])
}
