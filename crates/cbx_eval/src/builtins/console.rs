//! `console`.

use super::method;
use crate::console::ConsoleLevel;
use crate::realm::Realm;
use crate::value::Value;
use crate::Interpreter;

fn line(interp: &Interpreter, args: &[Value]) -> String {
    args.iter()
        .map(|value| interp.display(value))
        .collect::<Vec<_>>()
        .join(" ")
}

pub(super) fn install(realm: &Realm) {
    let console = realm.object();
    for (name, level) in [
        ("log", ConsoleLevel::Log),
        ("info", ConsoleLevel::Info),
        ("warn", ConsoleLevel::Warn),
        ("error", ConsoleLevel::Error),
        ("debug", ConsoleLevel::Debug),
        ("trace", ConsoleLevel::Debug),
    ] {
        method(realm, &console, name, 0, move |interp, _, args| {
            let text = line(interp, args);
            interp.console().write(level, &text);
            Ok(Value::Undefined)
        });
    }
    realm.define_global("console", Value::Object(console));
}
