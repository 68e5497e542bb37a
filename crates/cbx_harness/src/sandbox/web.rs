//! Browser stand-ins for web-like targets.
//!
//! Only what bundles for the web actually touch: a `document` that can
//! create and append elements (appending a `<script src>` loads it the way
//! a chunk loader expects), `location`, `URL`, `getComputedStyle` and
//! `importScripts`.

use std::rc::{Rc, Weak};

use cbx_eval::{
    native_fn, ErrorKind, EvalResult, Interpreter, Interrupt, JsObject, ObjRef, ObjectClass, Realm,
    Value,
};
use url::{Position, Url};

use super::worker;
use crate::native::{arg, function, method, object, string_arg};
use crate::resolver::specifier::TEST_CASES_URL;
use crate::resolver::{upgrade, ResolveMode, Resolver};

/// The `document` object; every target gets one for `currentScript`.
pub(super) fn document(realm: &Realm, loader: &Weak<Resolver>) -> ObjRef {
    let proto = element_prototype(realm, loader);
    let head = element(realm, &proto, "head");
    let body = element(realm, &proto, "body");
    let document = object(
        realm,
        &[
            ("currentScript", Value::Null),
            ("head", Value::Object(head)),
            ("body", Value::Object(body)),
        ],
    );
    method(realm, &document, "createElement", 1, move |interp, _, args| {
        let tag = string_arg(interp, args, 0)?;
        let realm = Rc::clone(interp.realm());
        Ok(Value::Object(element(&realm, &proto, &tag)))
    });
    method(realm, &document, "getElementsByTagName", 1, |interp, this, args| {
        let tag = string_arg(interp, args, 0)?.to_ascii_uppercase();
        let mut found = Vec::new();
        for root in ["head", "body"] {
            let root = interp.get(&this, root)?;
            collect_elements(interp, &root, &tag, &mut found)?;
        }
        Ok(Value::Object(interp.new_array(found)))
    });
    document
}

/// Globals of a web realm.
pub(super) fn install(realm: &Rc<Realm>, document: &ObjRef, loader: &Weak<Resolver>) {
    let global = Value::Object(realm.global.clone());
    realm.define_global("window", global.clone());
    realm.define_global("self", global);
    realm.define_global("document", Value::Object(document.clone()));
    if let Ok(url) = Url::parse(TEST_CASES_URL) {
        let location = realm.object();
        fill_url(realm, &location, &url);
        realm.define_global("location", Value::Object(location));
    }
    realm.define_global("URL", url_constructor(realm));
    realm.define_global(
        "getComputedStyle",
        function(realm, "getComputedStyle", 1, get_computed_style),
    );
    realm.define_global("importScripts", import_scripts(realm, loader));
    realm.define_global("Worker", worker::constructor(realm, loader));
}

fn element(realm: &Realm, proto: &ObjRef, tag: &str) -> ObjRef {
    let mut element = JsObject::new(ObjectClass::Ordinary, Some(proto.clone()));
    element.set_data("tagName", Value::str(&tag.to_ascii_uppercase()));
    element.set_data("children", Value::Object(realm.array(Vec::new())));
    element.set_data("style", Value::Object(realm.object()));
    element.set_data("attributes", Value::Object(realm.object()));
    ObjRef::new(element)
}

fn element_prototype(realm: &Realm, loader: &Weak<Resolver>) -> ObjRef {
    let proto = realm.object();
    method(realm, &proto, "setAttribute", 2, |interp, this, args| {
        let name = string_arg(interp, args, 0)?;
        let value = Value::Str(string_arg(interp, args, 1)?);
        let attributes = interp.get(&this, "attributes")?;
        interp.set(&attributes, &name, value.clone())?;
        interp.set(&this, &name, value)?;
        Ok(Value::Undefined)
    });
    method(realm, &proto, "getAttribute", 1, |interp, this, args| {
        let name = string_arg(interp, args, 0)?;
        let attributes = interp.get(&this, "attributes")?;
        Ok(match interp.get(&attributes, &name)? {
            Value::Undefined => Value::Null,
            value => value,
        })
    });
    let scripts = loader.clone();
    method(realm, &proto, "appendChild", 1, move |interp, this, args| {
        let child = arg(args, 0);
        let children = interp.get(&this, "children")?;
        let push = interp.get(&children, "push")?;
        interp.call(&push, children, &[child.clone()])?;
        interp.set(&child, "parentNode", this)?;
        let tag = interp.get(&child, "tagName")?;
        match tag.as_str() {
            Some("SCRIPT") => load_script(interp, &scripts, child.clone())?,
            Some("LINK") => {
                let target = child.clone();
                interp
                    .event_loop()
                    .schedule(0, Box::new(move |interp| dispatch(interp, &target, "onload", None)));
            }
            _ => {}
        }
        Ok(child)
    });
    method(realm, &proto, "removeChild", 1, |interp, this, args| {
        let child = arg(args, 0);
        let children = interp.get(&this, "children")?;
        if let Value::Object(array) = &children {
            if let ObjectClass::Array(items) = &mut array.borrow_mut().class {
                items.retain(|item| !item.strict_equals(&child));
            }
        }
        Ok(child)
    });
    proto
}

fn collect_elements(
    interp: &mut Interpreter,
    root: &Value,
    tag: &str,
    found: &mut Vec<Value>,
) -> EvalResult<()> {
    let children = interp.get(root, "children")?;
    for child in interp.iterate(&children)? {
        let name = interp.get(&child, "tagName")?;
        if tag == "*" || name.as_str() == Some(tag) {
            found.push(child.clone());
        }
        collect_elements(interp, &child, tag, found)?;
    }
    Ok(())
}

/// Load `<script src>` on a macrotask, then fire `onload` or `onerror`.
fn load_script(interp: &mut Interpreter, loader: &Weak<Resolver>, element: Value) -> EvalResult<()> {
    let Value::Str(src) = interp.get(&element, "src")? else {
        return Ok(());
    };
    let loader = loader.clone();
    interp.event_loop().schedule(
        0,
        Box::new(move |interp| {
            let resolver = upgrade(interp, &loader)?;
            let base = resolver.options().output_dir.clone();
            tracing::debug!(%src, "loading script element");
            match resolver.resolve(interp, &base, &src, ResolveMode::Sync) {
                Ok(_) => dispatch(interp, &element, "onload", None),
                Err(Interrupt::Throw(error)) => {
                    if interp.get(&element, "onerror")?.is_callable() {
                        dispatch(interp, &element, "onerror", Some(error))
                    } else {
                        Err(Interrupt::Throw(error))
                    }
                }
                Err(other) => Err(other),
            }
        }),
    );
    Ok(())
}

/// Call `target[handler]` with a minimal event, if it is set.
fn dispatch(interp: &mut Interpreter, target: &Value, handler: &str, error: Option<Value>) -> EvalResult<()> {
    let callback = interp.get(target, handler)?;
    if !callback.is_callable() {
        return Ok(());
    }
    let event = interp.new_object();
    let kind = handler.trim_start_matches("on");
    interp.define_data(&event, "type", Value::str(kind));
    interp.define_data(&event, "target", target.clone());
    if let Some(error) = error {
        interp.define_data(&event, "error", error);
    }
    interp.call(&callback, target.clone(), &[Value::Object(event)])?;
    Ok(())
}

fn fill_url(realm: &Realm, target: &ObjRef, url: &Url) {
    let search = url.query().map(|q| format!("?{q}")).unwrap_or_default();
    let hash = url.fragment().map(|f| format!("#{f}")).unwrap_or_default();
    let port = url.port().map(|p| p.to_string()).unwrap_or_default();
    {
        let mut obj = target.borrow_mut();
        obj.set_data("href", Value::str(url.as_str()));
        obj.set_data("origin", Value::str(&url.origin().ascii_serialization()));
        obj.set_data("protocol", Value::str(&format!("{}:", url.scheme())));
        obj.set_data("host", Value::str(&url[Position::BeforeHost..Position::AfterPort]));
        obj.set_data("hostname", Value::str(url.host_str().unwrap_or_default()));
        obj.set_data("port", Value::str(&port));
        obj.set_data("pathname", Value::str(url.path()));
        obj.set_data("search", Value::str(&search));
        obj.set_data("hash", Value::str(&hash));
    }
    method(realm, target, "toString", 0, |interp, this, _| interp.get(&this, "href"));
    method(realm, target, "toJSON", 0, |interp, this, _| interp.get(&this, "href"));
}

fn url_constructor(realm: &Realm) -> Value {
    let constructor = realm.constructor(
        "URL",
        2,
        native_fn(|interp, this, args| {
            let input = string_arg(interp, args, 0)?;
            let parsed = match arg(args, 1) {
                Value::Undefined => Url::parse(&input),
                base => {
                    let base = interp.to_string(&base)?;
                    Url::parse(&base).and_then(|base| base.join(&input))
                }
            }
            .map_err(|_| interp.type_error(format!("Invalid URL: {input}")))?;
            let realm = Rc::clone(interp.realm());
            let target = match this {
                Value::Object(object) => object,
                _ => realm.object(),
            };
            fill_url(&realm, &target, &parsed);
            Ok(Value::Object(target))
        }),
    );
    Value::Object(constructor)
}

fn get_computed_style(interp: &mut Interpreter, _: Value, args: &[Value]) -> EvalResult {
    let style = match arg(args, 0) {
        element @ Value::Object(_) => interp.get(&element, "style")?,
        _ => return Err(interp.type_error("getComputedStyle expects an element")),
    };
    let realm = Rc::clone(interp.realm());
    let computed = realm.object();
    method(&realm, &computed, "getPropertyValue", 1, move |interp, _, args| {
        let name = string_arg(interp, args, 0)?;
        Ok(match interp.get(&style, &name)? {
            Value::Undefined => Value::str(""),
            value => value,
        })
    });
    Ok(Value::Object(computed))
}

/// `importScripts(...urls)`: synchronous loads from the output directory.
fn import_scripts(realm: &Realm, loader: &Weak<Resolver>) -> Value {
    let loader = loader.clone();
    function(realm, "importScripts", 1, move |interp, _, args| {
        let resolver = upgrade(interp, &loader)?;
        let base = resolver.options().output_dir.clone();
        for url in args {
            let url = interp.to_string(url)?;
            if !url.starts_with(TEST_CASES_URL) {
                return Err(interp.throw((
                    ErrorKind::Error,
                    format!("importScripts only supports {TEST_CASES_URL} URLs, got '{url}'"),
                )));
            }
            resolver.resolve(interp, &base, &url, ResolveMode::Sync)?;
        }
        Ok(Value::Undefined)
    })
}
