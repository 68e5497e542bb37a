//! Execution sandbox: the scope module code runs in.
//!
//! # Architecture
//!
//! - [`Target`]: node-like or web-like, decided once per build variant
//! - [`Sandbox`]: realm plus base module scope for one variant
//! - `web`: `window`/`document`/`URL` stand-ins for web targets
//! - `worker`: the simulated `Worker`
//!
//! Node variants run in the test case's host realm, so globals they create
//! are visible to the other node variants of the same case. Web variants
//! and workers each get a fresh realm. Nothing outlives the test case.

mod web;
mod worker;

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};

use cbx_eval::value::{Property, Slot};
use cbx_eval::{
    EvalResult, ErrorKind, Interpreter, LocalScope, Mutability, ObjRef, Realm, Scope, ScriptInfo,
    Value, TO_STRING_TAG,
};
use cbx_ir::ast::ParseGoal;
use cbx_ir::Name;

use crate::bridge::AssertionBridge;
use crate::config::TargetSpec;
use crate::native::{arg, function, object};
use crate::resolver::specifier::TEST_CASES_URL;
use crate::resolver::Resolver;

/// Which intrinsics a variant sees and where its code runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Target {
    /// Shares the host realm; standard intrinsics only.
    Node,
    /// Isolated realm with browser stand-ins.
    Web,
}

impl Target {
    /// `web` and `webworker` (alone or in a list) are web-like.
    pub fn classify(spec: &TargetSpec) -> Target {
        if spec.names().any(|name| matches!(name, "web" | "webworker")) {
            Target::Web
        } else {
            Target::Node
        }
    }

    #[inline]
    pub fn is_web(self) -> bool {
        matches!(self, Target::Web)
    }
}

/// Globals copied into every module base scope.
const FORWARDED_GLOBALS: [&str; 4] = ["console", "setTimeout", "clearTimeout", "setImmediate"];

pub struct Sandbox {
    target: Target,
    realm: Rc<Realm>,
    /// Parent of every module scope of this variant.
    scope: LocalScope<Scope>,
    document: ObjRef,
    output_dir: PathBuf,
    bridge: Rc<AssertionBridge>,
    workers: RefCell<Vec<Rc<Resolver>>>,
}

impl Sandbox {
    /// Build the scope for build variant `variant`.
    ///
    /// `loader` is the resolver that will own this sandbox; web stand-ins
    /// load scripts and workers through it.
    pub fn new(
        host_realm: &Rc<Realm>,
        target: Target,
        variant: usize,
        output_dir: PathBuf,
        bridge: &Rc<AssertionBridge>,
        loader: &Weak<Resolver>,
    ) -> Sandbox {
        let realm = match target {
            Target::Node => Rc::clone(host_realm),
            Target::Web => Realm::new(),
        };
        let document = web::document(&realm, loader);
        if target.is_web() {
            web::install(&realm, &document, loader);
        }

        let scope = LocalScope::new(Scope::with_parent(realm.global_scope.clone()));
        {
            let mut base = scope.borrow_mut();
            for name in FORWARDED_GLOBALS {
                if let Some(value) = global_value(&realm, name) {
                    base.define(Name::from(name), value, Mutability::Mutable);
                }
            }
            for (name, value) in bridge.globals(&realm) {
                base.define(Name::from(name), value, Mutability::Mutable);
            }
            base.define(
                Name::from("expect"),
                crate::expect::expect_function(&realm),
                Mutability::Mutable,
            );
            base.define(Name::from("nsObj"), ns_obj(&realm), Mutability::Mutable);
            base.define(
                Name::from("__STATS_I__"),
                Value::from(variant),
                Mutability::Mutable,
            );
        }
        tracing::debug!(?target, variant, "sandbox created");

        Sandbox {
            target,
            realm,
            scope,
            document,
            output_dir,
            bridge: Rc::clone(bridge),
            workers: RefCell::new(Vec::new()),
        }
    }

    #[inline]
    pub fn target(&self) -> Target {
        self.target
    }

    pub fn realm(&self) -> &Rc<Realm> {
        &self.realm
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn document(&self) -> &ObjRef {
        &self.document
    }

    pub(crate) fn bridge(&self) -> &Rc<AssertionBridge> {
        &self.bridge
    }

    /// A fresh scope for one module, below the base scope.
    pub fn module_scope(&self) -> LocalScope<Scope> {
        LocalScope::new(Scope::with_parent(self.scope.clone()))
    }

    /// Compile `code` as a script and run it in a fresh module scope.
    pub fn run(&self, interp: &mut Interpreter, code: &str, source_name: &str) -> EvalResult {
        let program = cbx_parse::parse(code, ParseGoal::Script)
            .map_err(|err| interp.throw((ErrorKind::Syntax, format!("{source_name}: {err}"))))?;
        let script = Rc::new(ScriptInfo::new(
            Name::from(source_name),
            self.output_dir.clone(),
            Rc::clone(&self.realm),
        ));
        interp.run_script(&program, self.module_scope(), Value::Undefined, script)
    }

    /// Run `f` with `document.currentScript` describing a script in
    /// `sub_path`, restoring the previous marker afterwards.
    pub fn with_current_script<T>(
        &self,
        interp: &mut Interpreter,
        sub_path: &str,
        f: impl FnOnce(&mut Interpreter) -> EvalResult<T>,
    ) -> EvalResult<T> {
        let marker = object(
            &self.realm,
            &[
                ("src", Value::str(&format!("{TEST_CASES_URL}{sub_path}index.js"))),
                ("type", Value::str("text/javascript")),
            ],
        );
        let previous = own_value(&self.document, "currentScript").unwrap_or(Value::Null);
        self.document
            .borrow_mut()
            .set_data("currentScript", Value::Object(marker));
        let result = f(interp);
        self.document.borrow_mut().set_data("currentScript", previous);
        result
    }

    pub(crate) fn adopt_worker(&self, worker: Rc<Resolver>) {
        self.workers.borrow_mut().push(worker);
    }

    /// Tear down every worker started from this sandbox.
    pub fn teardown(&self) {
        let workers = std::mem::take(&mut *self.workers.borrow_mut());
        if !workers.is_empty() {
            tracing::debug!(count = workers.len(), "tearing down workers");
        }
        for worker in workers {
            worker.teardown();
        }
    }
}

impl std::fmt::Debug for Sandbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sandbox")
            .field("target", &self.target)
            .field("output_dir", &self.output_dir)
            .finish_non_exhaustive()
    }
}

/// An own data property of `object`, without running getters.
fn own_value(object: &ObjRef, key: &str) -> Option<Value> {
    match object.borrow().own_property(key) {
        Some(Property {
            slot: Slot::Value(value),
            ..
        }) => Some(value.clone()),
        _ => None,
    }
}

fn global_value(realm: &Realm, name: &str) -> Option<Value> {
    own_value(&realm.global, name)
}

/// `nsObj(obj)`: tag a plain object as a module namespace.
fn ns_obj(realm: &Realm) -> Value {
    function(realm, "nsObj", 1, |interp, _, args| {
        let target = arg(args, 0);
        let Value::Object(object) = &target else {
            return Err(interp.type_error("nsObj expects an object"));
        };
        object
            .borrow_mut()
            .set_hidden(TO_STRING_TAG, Value::str("Module"));
        Ok(target)
    })
}
