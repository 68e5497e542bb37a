#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::PathBuf;
use std::rc::Rc;

use cbx_eval::{Interpreter, Realm, Value};
use pretty_assertions::assert_eq;

use super::*;

fn interp() -> Interpreter {
    Interpreter::new(Realm::new())
}

/// A sync record that has "run" and left `exports` on its module object.
fn sync_with_exports(interp: &Interpreter, exports: &[(&str, Value)]) -> Rc<ModuleRecord> {
    let record = ModuleRecord::sync(
        Name::from("/out/cjs.js"),
        PathBuf::from("/out/cjs.js"),
        String::new(),
        None,
    );
    let object = interp.new_object();
    for (key, value) in exports {
        interp.define_data(&object, key, value.clone());
    }
    let module = interp.new_object();
    interp.define_data(&module, "exports", Value::Object(object));
    record.set_value(Value::Object(module));
    record.set_state(ModuleState::Evaluated);
    record
}

#[test]
fn data_record_is_evaluated_on_creation() {
    let mut interp = interp();
    let record = ModuleRecord::data(
        Name::from("/out/data.json"),
        PathBuf::from("/out/data.json"),
        Value::str("payload"),
    );
    assert_eq!(record.state(), ModuleState::Evaluated);
    assert_eq!(record.kind, ModuleKind::Data);
    let exports = record.exports(&mut interp).unwrap();
    assert_eq!(exports.as_str(), Some("payload"));
}

#[test]
fn namespace_is_created_once() {
    let record = ModuleRecord::data(
        Name::from("/out/data.json"),
        PathBuf::from("/out/data.json"),
        Value::Null,
    );
    let first = Value::Object(record.namespace());
    let second = Value::Object(record.namespace());
    assert!(first.strict_equals(&second));
    assert!(record.namespace().namespace().is_some());
}

#[test]
fn plain_commonjs_is_wrapped_in_a_namespace() {
    let mut interp = interp();
    let record = sync_with_exports(&interp, &[("named", Value::str("named"))]);
    assert!(!record.is_es_module(&mut interp).unwrap());

    let imported = record.import_value(&mut interp).unwrap();
    let namespace = imported.as_object().unwrap();
    assert!(namespace.namespace().is_some());

    let default = record.read_export(&mut interp, "default").unwrap().unwrap();
    let exports = record.exports(&mut interp).unwrap();
    assert!(default.strict_equals(&exports));
    let named = record.read_export(&mut interp, "named").unwrap().unwrap();
    assert_eq!(named.as_str(), Some("named"));
    assert!(record.read_export(&mut interp, "missing").unwrap().is_none());
}

#[test]
fn es_module_marker_passes_exports_through() {
    let mut interp = interp();
    let record = sync_with_exports(
        &interp,
        &[
            ("__esModule", Value::from(true)),
            ("named", Value::str("named")),
            ("default", Value::str("default")),
        ],
    );
    assert!(record.is_es_module(&mut interp).unwrap());

    let imported = record.import_value(&mut interp).unwrap();
    let exports = record.exports(&mut interp).unwrap();
    assert!(imported.strict_equals(&exports));

    let default = record.read_export(&mut interp, "default").unwrap().unwrap();
    assert_eq!(default.as_str(), Some("default"));
}

#[test]
fn synthetic_names_skip_the_marker() {
    let interp = interp();
    let record = sync_with_exports(
        &interp,
        &[
            ("__esModule", Value::from(true)),
            ("b", Value::from(1.0)),
            ("a", Value::from(2.0)),
        ],
    );
    let names: Vec<String> = record
        .export_names()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(names, vec!["a", "b", "default"]);
}

#[test]
fn failure_is_remembered() {
    let record = ModuleRecord::sync(
        Name::from("/out/bad.js"),
        PathBuf::from("/out/bad.js"),
        "throw 1".to_string(),
        Some(true),
    );
    assert_eq!(record.state(), ModuleState::Unlinked);
    assert!(record.error().is_none());
    record.fail(Value::str("boom"));
    assert_eq!(record.state(), ModuleState::Evaluated);
    assert_eq!(record.error().unwrap().as_str(), Some("boom"));
}

#[test]
fn source_is_taken_once() {
    let record = ModuleRecord::sync(
        Name::from("/out/a.js"),
        PathBuf::from("/out/a.js"),
        "module.exports = 1".to_string(),
        None,
    );
    assert_eq!(record.take_source().as_deref(), Some("module.exports = 1"));
    assert_eq!(record.take_source(), None);
}

#[test]
fn non_linked_records_provide_every_name() {
    let record = ModuleRecord::data(
        Name::from("/out/data.json"),
        PathBuf::from("/out/data.json"),
        Value::Null,
    );
    assert!(record.provides("anything"));
}
