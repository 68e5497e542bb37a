//! `String` and `String.prototype`.
//!
//! Indices count Unicode scalar values.

use cbx_ir::Name;

use super::{arg, constructor, method};
use crate::errors::{ErrorKind, EvalResult};
use crate::realm::Realm;
use crate::value::Value;
use crate::Interpreter;

/// `this` coerced to a string; `null`/`undefined` throw.
fn this_string(interp: &mut Interpreter, this: &Value, name: &str) -> EvalResult<Name> {
    if this.is_nullish() {
        return Err(interp.type_error(format!(
            "String.prototype.{name} called on null or undefined"
        )));
    }
    interp.to_string(this)
}

fn string_arg(interp: &mut Interpreter, args: &[Value], index: usize) -> EvalResult<Name> {
    interp.to_string(&arg(args, index))
}

fn str_value(s: impl Into<Name>) -> Value {
    Value::Str(s.into())
}

/// Char index of the first occurrence of `needle` at or after `from`.
fn find_from(chars: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return Some(from.min(chars.len()));
    }
    (from..=chars.len().saturating_sub(needle.len()))
        .find(|&i| chars.get(i..i + needle.len()) == Some(needle))
}

fn collect(chars: &[char]) -> Name {
    Name::from(chars.iter().collect::<String>())
}

/// Replace occurrences of `pattern`; `all` replaces every one.
fn replace(
    interp: &mut Interpreter,
    this: &Value,
    args: &[Value],
    all: bool,
) -> EvalResult {
    let name = if all { "replaceAll" } else { "replace" };
    let subject = this_string(interp, this, name)?;
    let pattern = string_arg(interp, args, 0)?;
    let replacement = arg(args, 1);
    let chars: Vec<char> = subject.chars().collect();
    let needle: Vec<char> = pattern.chars().collect();

    let mut out = String::with_capacity(subject.len());
    let mut cursor = 0;
    while let Some(at) = find_from(&chars, &needle, cursor) {
        out.extend(&chars[cursor..at]);
        let substitute = if replacement.is_callable() {
            let result = interp.call(
                &replacement,
                Value::Undefined,
                &[str_value(pattern.clone()), at.into(), Value::Str(subject.clone())],
            )?;
            interp.to_string(&result)?
        } else {
            let text = interp.to_string(&replacement)?;
            Name::from(text.replace("$&", &pattern))
        };
        out.push_str(&substitute);
        cursor = at + needle.len();
        if needle.is_empty() {
            if let Some(&c) = chars.get(at) {
                out.push(c);
            }
            cursor += 1;
        }
        if !all || cursor > chars.len() {
            break;
        }
    }
    if let Some(rest) = chars.get(cursor..) {
        out.extend(rest);
    }
    Ok(str_value(out))
}

fn pad(interp: &mut Interpreter, this: &Value, args: &[Value], at_start: bool) -> EvalResult {
    let subject = this_string(interp, this, if at_start { "padStart" } else { "padEnd" })?;
    let target = interp.to_number(&arg(args, 0))?;
    let filler = match arg(args, 1) {
        Value::Undefined => Name::from(" "),
        other => interp.to_string(&other)?,
    };
    let len = subject.chars().count();
    let target = if target.is_nan() { 0 } else { target.max(0.0) as usize };
    if target <= len || filler.is_empty() {
        return Ok(Value::Str(subject));
    }
    let padding: String = filler.chars().cycle().take(target - len).collect();
    Ok(str_value(if at_start {
        format!("{padding}{subject}")
    } else {
        format!("{subject}{padding}")
    }))
}

pub(super) fn install(realm: &Realm) {
    let proto = realm.intrinsics.string_proto.clone();
    let ctor = constructor(realm, "String", 1, &proto, |interp, _, args| {
        Ok(match args.first() {
            None => str_value(""),
            Some(value) => Value::Str(interp.to_string(value)?),
        })
    });

    method(realm, &ctor, "fromCharCode", 1, |interp, _, args| {
        let mut out = String::with_capacity(args.len());
        for code in args {
            let code = interp.to_number(code)?;
            out.push(char::from_u32(code as u32).unwrap_or(char::REPLACEMENT_CHARACTER));
        }
        Ok(str_value(out))
    });

    method(realm, &proto, "toString", 0, |interp, this, _| {
        match this {
            Value::Str(_) => Ok(this),
            _ => Err(interp.type_error("String.prototype.toString requires that 'this' be a String")),
        }
    });
    method(realm, &proto, "valueOf", 0, |interp, this, _| {
        match this {
            Value::Str(_) => Ok(this),
            _ => Err(interp.type_error("String.prototype.valueOf requires that 'this' be a String")),
        }
    });
    method(realm, &proto, "charAt", 1, |interp, this, args| {
        let subject = this_string(interp, &this, "charAt")?;
        let index = interp.to_number(&arg(args, 0))?;
        let index = if index.is_nan() { 0.0 } else { index.trunc() };
        let found = (index >= 0.0)
            .then(|| subject.chars().nth(index as usize))
            .flatten();
        Ok(str_value(found.map(String::from).unwrap_or_default()))
    });
    method(realm, &proto, "charCodeAt", 1, |interp, this, args| {
        let subject = this_string(interp, &this, "charCodeAt")?;
        let index = interp.to_number(&arg(args, 0))?;
        let index = if index.is_nan() { 0.0 } else { index.trunc() };
        let found = (index >= 0.0)
            .then(|| subject.chars().nth(index as usize))
            .flatten();
        Ok(Value::Number(found.map_or(f64::NAN, |c| f64::from(u32::from(c)))))
    });
    method(realm, &proto, "at", 1, |interp, this, args| {
        let subject = this_string(interp, &this, "at")?;
        let chars: Vec<char> = subject.chars().collect();
        let n = interp.to_number(&arg(args, 0))?;
        let n = if n.is_nan() { 0.0 } else { n.trunc() };
        let index = if n < 0.0 { chars.len() as f64 + n } else { n };
        Ok(if index < 0.0 {
            Value::Undefined
        } else {
            chars
                .get(index as usize)
                .map_or(Value::Undefined, |c| str_value(c.to_string()))
        })
    });
    method(realm, &proto, "indexOf", 1, |interp, this, args| {
        let subject = this_string(interp, &this, "indexOf")?;
        let needle = string_arg(interp, args, 0)?;
        let chars: Vec<char> = subject.chars().collect();
        let from = interp.relative_index(args.get(1), chars.len(), 0)?;
        let needle: Vec<char> = needle.chars().collect();
        Ok(find_from(&chars, &needle, from).map_or(Value::Number(-1.0), Value::from))
    });
    method(realm, &proto, "lastIndexOf", 1, |interp, this, args| {
        let subject = this_string(interp, &this, "lastIndexOf")?;
        let needle = string_arg(interp, args, 0)?;
        let chars: Vec<char> = subject.chars().collect();
        let needle: Vec<char> = needle.chars().collect();
        let found = (0..=chars.len().saturating_sub(needle.len()))
            .rev()
            .find(|&i| chars.get(i..i + needle.len()) == Some(needle.as_slice()));
        Ok(found.map_or(Value::Number(-1.0), Value::from))
    });
    method(realm, &proto, "includes", 1, |interp, this, args| {
        let subject = this_string(interp, &this, "includes")?;
        let needle = string_arg(interp, args, 0)?;
        Ok(Value::Bool(subject.contains(&*needle)))
    });
    method(realm, &proto, "startsWith", 1, |interp, this, args| {
        let subject = this_string(interp, &this, "startsWith")?;
        let needle = string_arg(interp, args, 0)?;
        let chars: Vec<char> = subject.chars().collect();
        let from = interp.relative_index(args.get(1), chars.len(), 0)?;
        Ok(Value::Bool(collect(&chars[from..]).starts_with(&*needle)))
    });
    method(realm, &proto, "endsWith", 1, |interp, this, args| {
        let subject = this_string(interp, &this, "endsWith")?;
        let needle = string_arg(interp, args, 0)?;
        let chars: Vec<char> = subject.chars().collect();
        let end = interp.relative_index(args.get(1), chars.len(), chars.len())?;
        Ok(Value::Bool(collect(&chars[..end]).ends_with(&*needle)))
    });
    method(realm, &proto, "slice", 2, |interp, this, args| {
        let subject = this_string(interp, &this, "slice")?;
        let chars: Vec<char> = subject.chars().collect();
        let start = interp.relative_index(args.first(), chars.len(), 0)?;
        let end = interp.relative_index(args.get(1), chars.len(), chars.len())?;
        Ok(Value::Str(collect(chars.get(start..end.max(start)).unwrap_or_default())))
    });
    method(realm, &proto, "substring", 2, |interp, this, args| {
        let subject = this_string(interp, &this, "substring")?;
        let chars: Vec<char> = subject.chars().collect();
        let clamp = |n: f64| if n.is_nan() { 0 } else { n.clamp(0.0, chars.len() as f64) as usize };
        let start = clamp(interp.to_number(&arg(args, 0))?);
        let end = match arg(args, 1) {
            Value::Undefined => chars.len(),
            other => clamp(interp.to_number(&other)?),
        };
        let (start, end) = (start.min(end), start.max(end));
        Ok(Value::Str(collect(&chars[start..end])))
    });
    method(realm, &proto, "toUpperCase", 0, |interp, this, _| {
        Ok(str_value(this_string(interp, &this, "toUpperCase")?.to_uppercase()))
    });
    method(realm, &proto, "toLowerCase", 0, |interp, this, _| {
        Ok(str_value(this_string(interp, &this, "toLowerCase")?.to_lowercase()))
    });
    method(realm, &proto, "trim", 0, |interp, this, _| {
        Ok(str_value(this_string(interp, &this, "trim")?.trim()))
    });
    method(realm, &proto, "trimStart", 0, |interp, this, _| {
        Ok(str_value(this_string(interp, &this, "trimStart")?.trim_start()))
    });
    method(realm, &proto, "trimEnd", 0, |interp, this, _| {
        Ok(str_value(this_string(interp, &this, "trimEnd")?.trim_end()))
    });
    method(realm, &proto, "split", 2, |interp, this, args| {
        let subject = this_string(interp, &this, "split")?;
        let limit = match arg(args, 1) {
            Value::Undefined => usize::MAX,
            other => interp.to_number(&other)?.max(0.0) as usize,
        };
        let parts: Vec<Value> = match arg(args, 0) {
            Value::Undefined => vec![Value::Str(subject.clone())],
            separator => {
                let separator = interp.to_string(&separator)?;
                if separator.is_empty() {
                    subject.chars().map(|c| str_value(c.to_string())).collect()
                } else {
                    subject.split(&*separator).map(str_value).collect()
                }
            }
        };
        let parts = parts.into_iter().take(limit).collect();
        Ok(Value::Object(interp.new_array(parts)))
    });
    method(realm, &proto, "replace", 2, |interp, this, args| {
        replace(interp, &this, args, false)
    });
    method(realm, &proto, "replaceAll", 2, |interp, this, args| {
        replace(interp, &this, args, true)
    });
    method(realm, &proto, "repeat", 1, |interp, this, args| {
        let subject = this_string(interp, &this, "repeat")?;
        let count = interp.to_number(&arg(args, 0))?;
        let count = if count.is_nan() { 0.0 } else { count.trunc() };
        if count < 0.0 || count.is_infinite() {
            return Err(interp.throw((ErrorKind::Range, format!("Invalid count value: {count}"))));
        }
        Ok(str_value(subject.repeat(count as usize)))
    });
    method(realm, &proto, "padStart", 2, |interp, this, args| {
        pad(interp, &this, args, true)
    });
    method(realm, &proto, "padEnd", 2, |interp, this, args| {
        pad(interp, &this, args, false)
    });
    method(realm, &proto, "concat", 1, |interp, this, args| {
        let mut out = this_string(interp, &this, "concat")?.to_string();
        for value in args {
            out.push_str(&interp.to_string(value)?);
        }
        Ok(str_value(out))
    });
}
