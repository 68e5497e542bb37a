//! `Function.prototype`.

use std::rc::Rc;

use cbx_ir::Name;

use super::{arg, constructor, method};
use crate::realm::Realm;
use crate::value::{BoundFunction, Callable, JsObject, ObjRef, ObjectClass, Value};

pub(super) fn install(realm: &Realm) {
    let proto = realm.intrinsics.function_proto.clone();
    constructor(realm, "Function", 1, &proto, |interp, _, _| {
        Err(interp.type_error("Function constructor is not supported"))
    });

    method(realm, &proto, "call", 1, |interp, this, args| {
        let receiver = arg(args, 0);
        let rest = args.get(1..).unwrap_or_default();
        interp.call(&this, receiver, rest)
    });
    method(realm, &proto, "apply", 2, |interp, this, args| {
        let receiver = arg(args, 0);
        let list = arg(args, 1);
        let list = if list.is_nullish() {
            Vec::new()
        } else {
            interp.iterate(&list)?
        };
        interp.call(&this, receiver, &list)
    });
    method(realm, &proto, "bind", 1, |interp, this, args| {
        let Some(callable) = this.as_object().and_then(ObjRef::callable) else {
            return Err(interp.type_error("Bind must be called on a function"));
        };
        let bound_args: Vec<Value> = args.get(1..).map(<[Value]>::to_vec).unwrap_or_default();
        let length = callable.length().saturating_sub(bound_args.len());
        let bound = BoundFunction {
            target: this.clone(),
            this: arg(args, 0),
            args: bound_args,
            name: callable.name(),
            length,
        };
        Ok(Value::Object(ObjRef::new(JsObject::new(
            ObjectClass::Function(Callable::Bound(Rc::new(bound))),
            Some(interp.realm().intrinsics.function_proto.clone()),
        ))))
    });
    method(realm, &proto, "toString", 0, |interp, this, _| {
        let Some(callable) = this.as_object().and_then(ObjRef::callable) else {
            return Err(interp.type_error("Function.prototype.toString requires that 'this' be a Function"));
        };
        let body = match &callable {
            Callable::Closure(_) => "{ [code] }",
            Callable::Native(_) | Callable::Bound(_) => "{ [native code] }",
        };
        Ok(Value::Str(Name::from(format!("function {}() {body}", callable.name()))))
    });
}
