//! `Error` and its subclasses.

use cbx_ir::Name;

use super::{arg, constructor, method};
use crate::errors::ErrorKind;
use crate::realm::Realm;
use crate::value::{JsObject, ObjRef, ObjectClass, Value};

pub(super) fn install(realm: &Realm) {
    for kind in ErrorKind::ALL {
        let proto = realm.intrinsics.error_proto(kind).clone();
        {
            let mut object = proto.borrow_mut();
            object.set_hidden("name", Value::str(kind.name()));
            object.set_hidden("message", Value::str(""));
        }
        let ctor = constructor(realm, kind.name(), 1, &proto, move |interp, this, args| {
            let proto = match &this {
                Value::Object(obj) => obj.borrow().prototype.clone(),
                _ => None,
            }
            .unwrap_or_else(|| interp.realm().intrinsics.error_proto(kind).clone());
            let message = match arg(args, 0) {
                Value::Undefined => None,
                other => Some(interp.to_string(&other)?),
            };
            let cause = match arg(args, 1) {
                options @ Value::Object(_) => Some(interp.get(&options, "cause")?),
                _ => None,
            };

            let mut error = JsObject::new(ObjectClass::Error, Some(proto));
            if let Some(message) = &message {
                error.set_hidden("message", Value::Str(message.clone()));
            }
            if let Some(cause) = cause.filter(|c| !matches!(c, Value::Undefined)) {
                error.set_hidden("cause", cause);
            }
            let header = match message.as_deref() {
                None | Some("") => kind.name().to_string(),
                Some(message) => format!("{}: {message}", kind.name()),
            };
            error.set_hidden(
                "stack",
                Value::Str(Name::from(format!("{header}\n    at <anonymous>"))),
            );
            Ok(Value::Object(ObjRef::new(error)))
        });
        if kind == ErrorKind::Error {
            method(realm, &ctor, "captureStackTrace", 1, |_, _, _| Ok(Value::Undefined));
        }
    }

    let base = realm.intrinsics.error_proto(ErrorKind::Error).clone();
    method(realm, &base, "toString", 0, |interp, this, _| {
        if !matches!(this, Value::Object(_)) {
            return Err(interp.type_error("Error.prototype.toString called on non-object"));
        }
        let name = match interp.get(&this, "name")? {
            Value::Undefined => Name::from("Error"),
            other => interp.to_string(&other)?,
        };
        let message = match interp.get(&this, "message")? {
            Value::Undefined => Name::from(""),
            other => interp.to_string(&other)?,
        };
        Ok(Value::Str(Name::from(match (name.is_empty(), message.is_empty()) {
            (_, true) => name.to_string(),
            (true, false) => message.to_string(),
            (false, false) => format!("{name}: {message}"),
        })))
    });
}
