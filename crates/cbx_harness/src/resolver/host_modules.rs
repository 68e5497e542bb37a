//! Built-in modules for bare specifiers: `path` and a read-only `fs`.

use std::path::{Path, PathBuf};

use cbx_eval::{ErrorKind, EvalResult, Interpreter, Realm, Value};
use cbx_ir::Name;

use crate::artifact::normalize;
use crate::native::{arg, method, string_arg};

/// The host module called `name` (`node:` prefix already stripped).
pub fn load(realm: &Realm, name: &str) -> Option<Value> {
    match name {
        "path" => Some(path_module(realm)),
        "fs" => Some(fs_module(realm)),
        _ => None,
    }
}

fn string(s: impl AsRef<str>) -> Value {
    Value::Str(Name::from(s.as_ref()))
}

fn path_string(path: &Path) -> Value {
    string(path.to_string_lossy())
}

fn strings(interp: &mut Interpreter, args: &[Value]) -> EvalResult<Vec<Name>> {
    args.iter().map(|value| interp.to_string(value)).collect()
}

fn path_module(realm: &Realm) -> Value {
    let module = realm.object();
    module.borrow_mut().set_data("sep", string("/"));
    method(realm, &module, "join", 2, |interp, _, args| {
        let mut path = PathBuf::new();
        for part in strings(interp, args)? {
            path.push(part.trim_start_matches('/'));
        }
        let first_absolute = args.first().and_then(Value::as_str).is_some_and(|s| s.starts_with('/'));
        let joined = normalize(&path);
        Ok(if first_absolute {
            path_string(&Path::new("/").join(joined))
        } else {
            path_string(&joined)
        })
    });
    method(realm, &module, "resolve", 2, |interp, _, args| {
        let mut path = std::env::current_dir().unwrap_or_default();
        for part in strings(interp, args)? {
            path.push(&*part);
        }
        Ok(path_string(&normalize(&path)))
    });
    method(realm, &module, "dirname", 1, |interp, _, args| {
        let path = string_arg(interp, args, 0)?;
        Ok(match Path::new(&*path).parent() {
            Some(parent) if !parent.as_os_str().is_empty() => path_string(parent),
            _ => string("."),
        })
    });
    method(realm, &module, "basename", 2, |interp, _, args| {
        let path = string_arg(interp, args, 0)?;
        let base = Path::new(&*path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = match arg(args, 1) {
            Value::Undefined => None,
            value => Some(interp.to_string(&value)?),
        };
        Ok(match ext {
            Some(ext) if base.ends_with(&*ext) && base.len() > ext.len() => {
                string(&base[..base.len() - ext.len()])
            }
            _ => string(base),
        })
    });
    method(realm, &module, "extname", 1, |interp, _, args| {
        let path = string_arg(interp, args, 0)?;
        Ok(match Path::new(&*path).extension() {
            Some(ext) => string(format!(".{}", ext.to_string_lossy())),
            None => string(""),
        })
    });
    Value::Object(module)
}

fn no_such_file(interp: &Interpreter, syscall: &str, path: &str) -> cbx_eval::Interrupt {
    let error = interp.create_error(
        ErrorKind::Error,
        &format!("ENOENT: no such file or directory, {syscall} '{path}'"),
    );
    error.borrow_mut().set_data("code", string("ENOENT"));
    cbx_eval::Interrupt::Throw(Value::Object(error))
}

fn fs_module(realm: &Realm) -> Value {
    let module = realm.object();
    method(realm, &module, "readFileSync", 2, |interp, _, args| {
        let path = string_arg(interp, args, 0)?;
        std::fs::read_to_string(&*path)
            .map(string)
            .map_err(|_| no_such_file(interp, "open", &path))
    });
    method(realm, &module, "existsSync", 1, |interp, _, args| {
        let path = string_arg(interp, args, 0)?;
        Ok(Value::Bool(Path::new(&*path).exists()))
    });
    method(realm, &module, "readdirSync", 1, |interp, _, args| {
        let path = string_arg(interp, args, 0)?;
        let entries = std::fs::read_dir(&*path).map_err(|_| no_such_file(interp, "scandir", &path))?;
        let mut names: Vec<String> = entries
            .flatten()
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        let items = names.into_iter().map(string).collect();
        Ok(Value::Object(interp.new_array(items)))
    });
    Value::Object(module)
}
