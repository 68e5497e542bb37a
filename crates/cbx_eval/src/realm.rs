//! Realms: a global object plus the intrinsic prototypes its code uses.

use std::rc::Rc;

use cbx_ir::Name;

use crate::environment::{LocalScope, Scope};
use crate::errors::ErrorKind;
use crate::value::{
    native_fn, Callable, JsObject, NativeFn, NativeFunction, ObjRef, ObjectClass, Value,
};

/// Prototype objects shared by every object a realm creates.
pub struct Intrinsics {
    pub object_proto: ObjRef,
    pub function_proto: ObjRef,
    pub array_proto: ObjRef,
    pub string_proto: ObjRef,
    pub number_proto: ObjRef,
    pub boolean_proto: ObjRef,
    pub promise_proto: ObjRef,
    /// Indexed by [`ErrorKind`].
    error_protos: Vec<ObjRef>,
}

impl Intrinsics {
    pub fn error_proto(&self, kind: ErrorKind) -> &ObjRef {
        &self.error_protos[kind.index()]
    }
}

/// An isolated set of globals.
///
/// Node-style variants of a test case share one realm; every web-style
/// variant and every simulated worker gets its own.
pub struct Realm {
    pub global: ObjRef,
    pub global_scope: LocalScope<Scope>,
    pub intrinsics: Intrinsics,
}

impl Realm {
    /// Build a realm with the full built-in library installed.
    pub fn new() -> Rc<Realm> {
        let object_proto = ObjRef::new(JsObject::new(ObjectClass::Ordinary, None));
        let ordinary = |proto: &ObjRef| ObjRef::new(JsObject::new(ObjectClass::Ordinary, Some(proto.clone())));

        let noop = native_fn(|_, _, _| Ok(Value::Undefined));
        let function_proto = ObjRef::new(JsObject::new(
            ObjectClass::Function(Callable::Native(NativeFunction {
                name: Name::from(""),
                length: 0,
                constructor: false,
                func: noop,
            })),
            Some(object_proto.clone()),
        ));
        let array_proto = ObjRef::new(JsObject::new(
            ObjectClass::Array(Vec::new()),
            Some(object_proto.clone()),
        ));

        let base_error = ordinary(&object_proto);
        let error_protos = ErrorKind::ALL
            .iter()
            .map(|kind| match kind {
                ErrorKind::Error => base_error.clone(),
                _ => ordinary(&base_error),
            })
            .collect();

        let intrinsics = Intrinsics {
            string_proto: ordinary(&object_proto),
            number_proto: ordinary(&object_proto),
            boolean_proto: ordinary(&object_proto),
            promise_proto: ordinary(&object_proto),
            array_proto,
            function_proto,
            error_protos,
            object_proto: object_proto.clone(),
        };

        let global = ordinary(&object_proto);
        let realm = Realm {
            global_scope: LocalScope::new(Scope::global(global.clone())),
            global,
            intrinsics,
        };
        crate::builtins::install(&realm);
        Rc::new(realm)
    }

    /// A plain object with `Object.prototype` as prototype.
    pub fn object(&self) -> ObjRef {
        ObjRef::new(JsObject::new(
            ObjectClass::Ordinary,
            Some(self.intrinsics.object_proto.clone()),
        ))
    }

    pub fn array(&self, items: Vec<Value>) -> ObjRef {
        ObjRef::new(JsObject::new(
            ObjectClass::Array(items),
            Some(self.intrinsics.array_proto.clone()),
        ))
    }

    /// A built-in function object.
    pub fn function(&self, name: &str, length: usize, func: NativeFn) -> ObjRef {
        self.native(name, length, false, func)
    }

    /// A built-in function that may be invoked with `new`.
    pub fn constructor(&self, name: &str, length: usize, func: NativeFn) -> ObjRef {
        self.native(name, length, true, func)
    }

    fn native(&self, name: &str, length: usize, constructor: bool, func: NativeFn) -> ObjRef {
        ObjRef::new(JsObject::new(
            ObjectClass::Function(Callable::Native(NativeFunction {
                name: Name::from(name),
                length,
                constructor,
                func,
            })),
            Some(self.intrinsics.function_proto.clone()),
        ))
    }

    /// Define a non-enumerable global.
    pub fn define_global(&self, name: &str, value: Value) {
        self.global.borrow_mut().set_hidden(name, value);
    }
}
