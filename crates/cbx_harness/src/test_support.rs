#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use cbx_eval::{to_json, Interpreter, Realm, Value};
use tempfile::TempDir;

use crate::bridge::{settled, AssertionBridge};
use crate::resolver::{Resolver, ResolverOptions};
use crate::sandbox::Target;

/// A module graph over files written to a temporary output directory.
pub(crate) struct Graph {
    _dir: TempDir,
    pub root: PathBuf,
    pub interp: Interpreter,
    pub bridge: Rc<AssertionBridge>,
    pub resolver: Rc<Resolver>,
}

pub(crate) fn write_files(root: &std::path::Path, files: &[(&str, &str)]) {
    for (name, content) in files {
        let path = root.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
}

pub(crate) fn graph(files: &[(&str, &str)]) -> Graph {
    graph_with(files, Target::Node, |_| {})
}

pub(crate) fn graph_with(
    files: &[(&str, &str)],
    target: Target,
    configure: impl FnOnce(&mut ResolverOptions),
) -> Graph {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    write_files(&root, files);
    let mut options = ResolverOptions {
        output_dir: root.clone(),
        ..ResolverOptions::default()
    };
    configure(&mut options);
    let realm = Realm::new();
    let bridge = AssertionBridge::new();
    let resolver = Resolver::new(&realm, target, &bridge, options);
    Graph {
        _dir: dir,
        root,
        interp: Interpreter::new(realm),
        bridge,
        resolver,
    }
}

impl Graph {
    /// Run entry `file` and return its exports (or namespace promise).
    pub fn require(&mut self, file: &str) -> Value {
        self.resolver.require_entry(&mut self.interp, file).unwrap()
    }

    /// The fulfillment value of `promise`.
    pub fn fulfilled(&mut self, promise: &Value) -> Value {
        let promise = promise.as_object().expect("a promise");
        match settled(&mut self.interp, promise).unwrap() {
            Some(Ok(value)) => value,
            other => panic!("promise did not fulfill: {other:?}"),
        }
    }

    /// The rejection reason of `promise`.
    pub fn rejected(&mut self, promise: &Value) -> Value {
        let promise = promise.as_object().expect("a promise");
        match settled(&mut self.interp, promise).unwrap() {
            Some(Err(reason)) => reason,
            other => panic!("promise did not reject: {other:?}"),
        }
    }

    pub fn json(&mut self, value: &Value) -> serde_json::Value {
        to_json(&mut self.interp, value).unwrap().unwrap_or_default()
    }

    pub fn get(&mut self, value: &Value, key: &str) -> Value {
        self.interp.get(value, key).unwrap()
    }
}
