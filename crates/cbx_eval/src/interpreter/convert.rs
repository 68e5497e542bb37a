//! Conversions that may run script code (`valueOf`, `toString`).

use cbx_ir::Name;

use super::Interpreter;
use crate::errors::EvalResult;
use crate::ops;
use crate::value::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hint {
    Default,
    Number,
    String,
}

impl Interpreter {
    /// `ToPrimitive`: objects try `valueOf`/`toString` in hint order.
    pub fn to_primitive(&mut self, value: &Value, hint: Hint) -> EvalResult {
        let Value::Object(obj) = value else {
            return Ok(value.clone());
        };
        let order: [&str; 2] = if hint == Hint::String {
            ["toString", "valueOf"]
        } else {
            ["valueOf", "toString"]
        };
        for method in order {
            let func = self.get_property(obj, method, value)?;
            if func.is_callable() {
                let result = self.call(&func, value.clone(), &[])?;
                if !matches!(result, Value::Object(_)) {
                    return Ok(result);
                }
            }
        }
        Err(self.type_error("Cannot convert object to primitive value"))
    }

    pub fn to_string(&mut self, value: &Value) -> EvalResult<Name> {
        match value {
            Value::Str(s) => Ok(s.clone()),
            Value::Object(_) => {
                let primitive = self.to_primitive(value, Hint::String)?;
                Ok(Name::from(ops::primitive_to_string(&primitive)))
            }
            _ => Ok(Name::from(ops::primitive_to_string(value))),
        }
    }

    pub fn to_number(&mut self, value: &Value) -> EvalResult<f64> {
        match value {
            Value::Object(_) => {
                let primitive = self.to_primitive(value, Hint::Number)?;
                Ok(ops::primitive_to_number(&primitive))
            }
            _ => Ok(ops::primitive_to_number(value)),
        }
    }

    /// Property key for computed member access.
    pub fn to_property_key(&mut self, value: &Value) -> EvalResult<Name> {
        match value {
            Value::Str(s) => Ok(s.clone()),
            Value::Number(n) => Ok(Name::from(ops::number_to_string(*n))),
            _ => self.to_string(value),
        }
    }

    /// Integer argument with a default, clamped the way `slice` and friends
    /// treat relative indices.
    pub(crate) fn relative_index(&mut self, arg: Option<&Value>, len: usize, default: usize) -> EvalResult<usize> {
        let Some(arg) = arg.filter(|v| !matches!(v, Value::Undefined)) else {
            return Ok(default);
        };
        let n = self.to_number(arg)?;
        let n = if n.is_nan() { 0.0 } else { n.trunc() };
        let len_f = len as f64;
        Ok(if n < 0.0 {
            (len_f + n).max(0.0) as usize
        } else {
            n.min(len_f) as usize
        })
    }
}
