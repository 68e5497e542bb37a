//! Module records: one per identity per module graph.
//!
//! A record is created the first time its identity is resolved and is
//! never replaced. Linked records additionally carry their parsed program,
//! module scope and export table.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::path::PathBuf;
use std::rc::{Rc, Weak};

use cbx_eval::value::{Property, Slot};
use cbx_eval::{
    EvalResult, Interpreter, JsObject, LocalScope, NamespaceSource, ObjRef, ObjectClass, Scope,
    ScriptInfo, Value,
};
use cbx_ir::ast::Program;
use cbx_ir::Name;
use rustc_hash::FxHashSet;

use crate::artifact::ModuleKind;

/// Life cycle of a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModuleState {
    Unlinked,
    Linking,
    Linked,
    Evaluating,
    Evaluated,
}

/// Where an exported name gets its value.
#[derive(Clone)]
pub enum ExportBinding {
    /// A binding of the module's own scope.
    Local(Name),
    /// `export { x as y } from './dep'`.
    Indirect(Rc<ModuleRecord>, Name),
    /// `export * as ns from './dep'`.
    Namespace(Rc<ModuleRecord>),
}

/// Exported names of a linked module.
#[derive(Clone, Default)]
pub struct ExportTable {
    pub named: Vec<(Name, ExportBinding)>,
    /// `export * from` targets, in source order.
    pub stars: Vec<Rc<ModuleRecord>>,
}

impl ExportTable {
    fn get(&self, name: &str) -> Option<&ExportBinding> {
        self.named
            .iter()
            .find(|(exported, _)| &**exported == name)
            .map(|(_, binding)| binding)
    }
}

/// Parsed state of a linked module.
pub struct LinkedModule {
    pub program: Rc<Program>,
    pub scope: LocalScope<Scope>,
    pub script: Rc<ScriptInfo>,
    /// Resolved static requests, in request order.
    pub requests: RefCell<Vec<(Name, Rc<ModuleRecord>)>>,
    pub exports: RefCell<ExportTable>,
}

impl LinkedModule {
    pub fn dependency(&self, specifier: &str) -> Option<Rc<ModuleRecord>> {
        self.requests
            .borrow()
            .iter()
            .find(|(request, _)| &**request == specifier)
            .map(|(_, record)| Rc::clone(record))
    }
}

pub struct ModuleRecord {
    pub identity: Name,
    pub path: PathBuf,
    pub kind: ModuleKind,
    /// Whether the build reported this module as restored from its cache.
    pub cached: Option<bool>,
    state: Cell<ModuleState>,
    /// Sync: the `module` object. Data: the value itself.
    value: RefCell<Value>,
    pub linked: Option<LinkedModule>,
    namespace: RefCell<Option<ObjRef>>,
    error: RefCell<Option<Value>>,
    /// Settles when an evaluation that had to wait finishes.
    evaluation: RefCell<Option<ObjRef>>,
    /// Source text, kept until a sync module runs.
    source: RefCell<Option<String>>,
}

impl ModuleRecord {
    pub fn data(identity: Name, path: PathBuf, value: Value) -> Rc<ModuleRecord> {
        Rc::new(ModuleRecord {
            identity,
            path,
            kind: ModuleKind::Data,
            cached: None,
            state: Cell::new(ModuleState::Evaluated),
            value: RefCell::new(value),
            linked: None,
            namespace: RefCell::new(None),
            error: RefCell::new(None),
            evaluation: RefCell::new(None),
            source: RefCell::new(None),
        })
    }

    pub fn sync(identity: Name, path: PathBuf, source: String, cached: Option<bool>) -> Rc<ModuleRecord> {
        Rc::new(ModuleRecord {
            identity,
            path,
            kind: ModuleKind::Sync,
            cached,
            state: Cell::new(ModuleState::Unlinked),
            value: RefCell::new(Value::Undefined),
            linked: None,
            namespace: RefCell::new(None),
            error: RefCell::new(None),
            evaluation: RefCell::new(None),
            source: RefCell::new(Some(source)),
        })
    }

    pub fn linked(
        identity: Name,
        path: PathBuf,
        module: LinkedModule,
        cached: Option<bool>,
    ) -> Rc<ModuleRecord> {
        Rc::new(ModuleRecord {
            identity,
            path,
            kind: ModuleKind::Linked,
            cached,
            state: Cell::new(ModuleState::Unlinked),
            value: RefCell::new(Value::Undefined),
            linked: Some(module),
            namespace: RefCell::new(None),
            error: RefCell::new(None),
            evaluation: RefCell::new(None),
            source: RefCell::new(None),
        })
    }

    #[inline]
    pub fn state(&self) -> ModuleState {
        self.state.get()
    }

    pub(crate) fn set_state(&self, state: ModuleState) {
        tracing::trace!(module = %self.identity, ?state, "module state");
        self.state.set(state);
    }

    pub fn error(&self) -> Option<Value> {
        self.error.borrow().clone()
    }

    /// Remember a failed link or evaluation; later requests rethrow it.
    pub(crate) fn fail(&self, error: Value) {
        *self.error.borrow_mut() = Some(error);
        self.set_state(ModuleState::Evaluated);
    }

    /// Promise of an evaluation still waiting on a dependency or on a
    /// top-level `await`.
    pub fn pending_evaluation(&self) -> Option<ObjRef> {
        self.evaluation.borrow().clone()
    }

    /// [`ModuleRecord::pending_evaluation`], created on first use.
    pub(crate) fn evaluation_promise(&self, interp: &Interpreter) -> ObjRef {
        self.evaluation
            .borrow_mut()
            .get_or_insert_with(|| interp.new_promise())
            .clone()
    }

    pub(crate) fn set_value(&self, value: Value) {
        *self.value.borrow_mut() = value;
    }

    pub(crate) fn take_source(&self) -> Option<String> {
        self.source.borrow_mut().take()
    }

    /// The `module` object of a sync record.
    pub fn module_object(&self) -> Option<ObjRef> {
        match self.kind {
            ModuleKind::Sync => self.value.borrow().as_object().cloned(),
            _ => None,
        }
    }

    /// What `require` hands out: `module.exports` for sync records, the
    /// value for data records. Linked records have no such value.
    pub fn exports(&self, interp: &mut Interpreter) -> EvalResult {
        match self.module_object() {
            Some(module) => interp.get(&Value::Object(module), "exports"),
            None => Ok(self.value.borrow().clone()),
        }
    }

    /// [`ModuleRecord::exports`] without running getters.
    fn exports_snapshot(&self) -> Value {
        match self.module_object() {
            Some(module) => match module.borrow().own_property("exports") {
                Some(Property {
                    slot: Slot::Value(value),
                    ..
                }) => value.clone(),
                _ => Value::Undefined,
            },
            None => self.value.borrow().clone(),
        }
    }

    /// Whether a non-linked record's exports carry the `__esModule` marker.
    pub fn is_es_module(&self, interp: &mut Interpreter) -> EvalResult<bool> {
        let exports = self.exports(interp)?;
        if !matches!(exports, Value::Object(_)) {
            return Ok(false);
        }
        Ok(interp.get(&exports, "__esModule")?.is_truthy())
    }

    /// Reader for this record's exports, used by import bindings.
    pub fn namespace_source(self: &Rc<Self>) -> Rc<dyn NamespaceSource> {
        match self.kind {
            ModuleKind::Linked => Rc::new(ModuleNamespace {
                record: Rc::downgrade(self),
            }),
            ModuleKind::Sync | ModuleKind::Data => Rc::new(SyntheticNamespace {
                record: Rc::downgrade(self),
            }),
        }
    }

    /// The namespace object, created on first use.
    pub fn namespace(self: &Rc<Self>) -> ObjRef {
        if let Some(namespace) = &*self.namespace.borrow() {
            return namespace.clone();
        }
        let mut object = JsObject::new(ObjectClass::Namespace(self.namespace_source()), None);
        object.extensible = false;
        let namespace = ObjRef::new(object);
        *self.namespace.borrow_mut() = Some(namespace.clone());
        namespace
    }

    /// Whether importing `name` from this record can succeed.
    pub fn provides(&self, name: &str) -> bool {
        match &self.linked {
            Some(_) => self.resolve_export(name, &mut FxHashSet::default()).is_some(),
            None => true,
        }
    }

    /// Find the binding behind `name`, following `export *`.
    fn resolve_export(&self, name: &str, visited: &mut FxHashSet<Name>) -> Option<ExportBinding> {
        let linked = self.linked.as_ref()?;
        if !visited.insert(self.identity.clone()) {
            return None;
        }
        let exports = linked.exports.borrow();
        if let Some(binding) = exports.get(name) {
            return Some(binding.clone());
        }
        if name == "default" {
            return None;
        }
        // A name found behind `export *` is read through the record that
        // owns it, never from this module's scope.
        exports.stars.iter().find_map(|star| match star.linked {
            Some(_) => star.resolve_export(name, visited).map(|binding| match binding {
                ExportBinding::Local(_) => {
                    ExportBinding::Indirect(Rc::clone(star), Name::from(name))
                }
                other => other,
            }),
            None => star
                .synthetic_names()
                .contains(&Name::from(name))
                .then(|| ExportBinding::Indirect(Rc::clone(star), Name::from(name))),
        })
    }

    /// Every exported name, sorted.
    pub fn export_names(&self) -> Vec<Name> {
        let mut names = Vec::new();
        self.collect_export_names(&mut names, &mut FxHashSet::default(), true);
        names.sort();
        names.dedup();
        names
    }

    fn collect_export_names(&self, out: &mut Vec<Name>, visited: &mut FxHashSet<Name>, root: bool) {
        let Some(linked) = &self.linked else {
            out.extend(self.synthetic_names().into_iter().filter(|n| root || &**n != "default"));
            return;
        };
        if !visited.insert(self.identity.clone()) {
            return;
        }
        let exports = linked.exports.borrow();
        out.extend(
            exports
                .named
                .iter()
                .map(|(name, _)| name.clone())
                .filter(|name| root || &**name != "default"),
        );
        for star in &exports.stars {
            star.collect_export_names(out, visited, false);
        }
    }

    /// Names a synthetic namespace over this record exposes.
    fn synthetic_names(&self) -> Vec<Name> {
        let mut names = vec![Name::from("default")];
        if let Value::Object(exports) = self.exports_snapshot() {
            names.extend(
                exports
                    .borrow()
                    .enumerable_keys()
                    .into_iter()
                    .filter(|key| &**key != "default" && &**key != "__esModule"),
            );
        }
        names
    }

    /// Current value of export `name`; `None` when not exported.
    pub fn read_export(self: &Rc<Self>, interp: &mut Interpreter, name: &str) -> EvalResult<Option<Value>> {
        let Some(linked) = &self.linked else {
            return self.read_synthetic(interp, name);
        };
        let binding = self.resolve_export(name, &mut FxHashSet::default());
        match binding {
            Some(ExportBinding::Local(local)) => {
                let scope = linked.scope.clone();
                interp.read_binding(&scope, &local).map(Some)
            }
            Some(ExportBinding::Indirect(target, imported)) => target.read_export(interp, &imported),
            Some(ExportBinding::Namespace(target)) => Ok(Some(target.import_value(interp)?)),
            None => Ok(None),
        }
    }

    fn read_synthetic(&self, interp: &mut Interpreter, name: &str) -> EvalResult<Option<Value>> {
        let exports = self.exports(interp)?;
        if name == "default" {
            return if self.is_es_module(interp)? {
                interp.get(&exports, "default").map(Some)
            } else {
                Ok(Some(exports))
            };
        }
        match &exports {
            Value::Object(object) if has_property(object, name) => {
                interp.get(&exports, name).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// What a dynamic `import()` of this record resolves to.
    pub fn import_value(self: &Rc<Self>, interp: &mut Interpreter) -> EvalResult {
        match self.kind {
            ModuleKind::Linked => Ok(Value::Object(self.namespace())),
            ModuleKind::Sync if self.is_es_module(interp)? => self.exports(interp),
            ModuleKind::Sync | ModuleKind::Data => Ok(Value::Object(self.namespace())),
        }
    }

    /// Drop links to other records and scripts so graphs can be freed.
    pub(crate) fn clear(&self) {
        *self.namespace.borrow_mut() = None;
        *self.evaluation.borrow_mut() = None;
        *self.value.borrow_mut() = Value::Undefined;
        if let Some(linked) = &self.linked {
            linked.requests.borrow_mut().clear();
            *linked.exports.borrow_mut() = ExportTable::default();
        }
    }
}

impl fmt::Debug for ModuleRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRecord")
            .field("identity", &self.identity)
            .field("kind", &self.kind)
            .field("state", &self.state.get())
            .field("cached", &self.cached)
            .finish_non_exhaustive()
    }
}

/// Own or inherited property check without running getters.
fn has_property(object: &ObjRef, key: &str) -> bool {
    let mut current = Some(object.clone());
    while let Some(obj) = current {
        if obj.borrow().own_property(key).is_some() {
            return true;
        }
        current = obj.borrow().prototype.clone();
    }
    false
}

/// Exports of a linked module, read live from its scope.
struct ModuleNamespace {
    record: Weak<ModuleRecord>,
}

impl NamespaceSource for ModuleNamespace {
    fn export_names(&self) -> Vec<Name> {
        self.record
            .upgrade()
            .map(|record| record.export_names())
            .unwrap_or_default()
    }

    fn get_export(&self, interp: &mut Interpreter, name: &str) -> EvalResult<Option<Value>> {
        match self.record.upgrade() {
            Some(record) => record.read_export(interp, name),
            None => Ok(None),
        }
    }
}

/// Namespace view over a sync or data module: `default` is the whole
/// value (or `exports.default` under the `__esModule` marker), every other
/// name reads the property of the same name.
struct SyntheticNamespace {
    record: Weak<ModuleRecord>,
}

impl NamespaceSource for SyntheticNamespace {
    fn export_names(&self) -> Vec<Name> {
        self.record
            .upgrade()
            .map(|record| {
                let mut names = record.synthetic_names();
                names.sort();
                names
            })
            .unwrap_or_default()
    }

    fn get_export(&self, interp: &mut Interpreter, name: &str) -> EvalResult<Option<Value>> {
        match self.record.upgrade() {
            Some(record) => record.read_synthetic(interp, name),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests;
