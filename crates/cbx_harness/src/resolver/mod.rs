//! Module resolution: specifier to record, once per identity.
//!
//! # Architecture
//!
//! A [`Resolver`] owns the module graph of one build variant: its
//! [`Sandbox`], the identity cache and the options the build produced.
//! Every specifier, whatever mode it is requested in, goes through
//! [`Resolver::load`], which returns the one [`ModuleRecord`] for its
//! identity. The mode only decides how far that record is driven:
//!
//! | mode        | result                                              |
//! |-------------|-----------------------------------------------------|
//! | `Sync`      | exports of a sync/data record, namespace promise of a linked one |
//! | `Unlinked`  | the record, untouched                               |
//! | `Evaluated` | the record, linked and evaluated                    |
//! | `Namespace` | a promise of what `import()` resolves to            |
//!
//! Linking and evaluation of linked records live in `linker`.

pub(crate) mod host_modules;
pub mod specifier;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};

use cbx_eval::{
    from_json, ErrorKind, EvalResult, Interpreter, Interrupt, ModuleHost, Mutability, ObjRef,
    Realm, ScriptInfo, Value,
};
use cbx_ir::ast::ParseGoal;
use cbx_ir::Name;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::artifact::{self, normalize, CompiledArtifact, ModuleKind};
use crate::bridge::AssertionBridge;
use crate::compiler::RunResult;
use crate::error::LoadError;
use crate::native::{function, object, string_arg};
use crate::record::{LinkedModule, ModuleRecord, ModuleState};
use crate::sandbox::{Sandbox, Target};

use self::specifier::Request;

/// What the build told the resolver about one variant.
#[derive(Clone, Debug, Default)]
pub struct ResolverOptions {
    pub variant: usize,
    /// `.js` artifacts are linked modules.
    pub output_module: bool,
    pub output_dir: PathBuf,
    /// Substitution table for opaque module names.
    pub modules: BTreeMap<String, serde_json::Value>,
    /// Specifier rewrites applied before resolution.
    pub remap: BTreeMap<String, String>,
    /// Statistics of the build whose output is executed.
    pub stats: Option<Rc<RunResult>>,
}

/// How far a resolved record is driven.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolveMode {
    Sync,
    Unlinked,
    Namespace,
}

#[derive(Debug)]
pub enum Resolved {
    Value(Value),
    Module(Rc<ModuleRecord>),
}

impl Resolved {
    /// The script-visible value: records become what importing them yields.
    pub fn into_value(self, interp: &mut Interpreter) -> EvalResult {
        match self {
            Resolved::Value(value) => Ok(value),
            Resolved::Module(record) => record.import_value(interp),
        }
    }
}

pub struct Resolver {
    this: Weak<Resolver>,
    sandbox: Sandbox,
    options: ResolverOptions,
    records: RefCell<FxHashMap<Name, Rc<ModuleRecord>>>,
    /// `__STATS__`, converted on first use.
    stats: RefCell<Option<Value>>,
}

impl Resolver {
    pub fn new(
        host_realm: &Rc<Realm>,
        target: Target,
        bridge: &Rc<AssertionBridge>,
        options: ResolverOptions,
    ) -> Rc<Resolver> {
        Rc::new_cyclic(|this| {
            let sandbox = Sandbox::new(
                host_realm,
                target,
                options.variant,
                options.output_dir.clone(),
                bridge,
                this,
            );
            Resolver {
                this: this.clone(),
                sandbox,
                options,
                records: RefCell::new(FxHashMap::default()),
                stats: RefCell::new(None),
            }
        })
    }

    pub(crate) fn this(&self) -> Weak<Resolver> {
        self.this.clone()
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Every record loaded so far, ordered by identity.
    pub fn records(&self) -> Vec<Rc<ModuleRecord>> {
        let mut records: Vec<_> = self.records.borrow().values().cloned().collect();
        records.sort_by(|a, b| a.identity.cmp(&b.identity));
        records
    }

    pub fn record(&self, identity: &str) -> Option<Rc<ModuleRecord>> {
        self.records.borrow().get(identity).cloned()
    }

    /// Resolve `specifier` from `base` and drive the record as far as
    /// `mode` asks.
    #[tracing::instrument(
        level = "debug",
        skip(self, interp, base),
        fields(variant = self.options.variant)
    )]
    pub fn resolve(
        &self,
        interp: &mut Interpreter,
        base: &Path,
        specifier: &str,
        mode: ResolveMode,
    ) -> EvalResult<Resolved> {
        let record = self.load(interp, base, specifier)?;
        match mode {
            ResolveMode::Unlinked => Ok(Resolved::Module(record)),
            ResolveMode::Sync if record.kind != ModuleKind::Linked => {
                self.evaluate(interp, &record)?;
                record.exports(interp).map(Resolved::Value)
            }
            ResolveMode::Sync | ResolveMode::Namespace => {
                self.namespace_promise(interp, &record).map(Resolved::Value)
            }
        }
    }

    /// Run bundle entry `file` (relative to the output directory) and
    /// return its exports, or a promise for a linked entry.
    pub fn require_entry(&self, interp: &mut Interpreter, file: &str) -> EvalResult {
        let mode = match ModuleKind::classify(Path::new(file), self.options.output_module) {
            ModuleKind::Linked => ResolveMode::Namespace,
            ModuleKind::Sync | ModuleKind::Data => ResolveMode::Sync,
        };
        let output_dir = self.options.output_dir.clone();
        self.resolve(interp, &output_dir, &format!("./{file}"), mode)?
            .into_value(interp)
    }

    /// The record for `specifier`, created on first request.
    pub(crate) fn load(
        &self,
        interp: &mut Interpreter,
        base: &Path,
        specifier: &str,
    ) -> EvalResult<Rc<ModuleRecord>> {
        let specifier = self
            .options
            .remap
            .get(specifier)
            .map_or(specifier, String::as_str);
        let request = specifier::classify(specifier, base, &self.options.output_dir)
            .map_err(|error| load_error(interp, &error))?;
        match request {
            Request::Bare(name) => self.load_bare(interp, &name, base),
            Request::Path { base, path } => self.load_path(interp, &base, &path),
        }
    }

    fn load_bare(
        &self,
        interp: &mut Interpreter,
        name: &str,
        base: &Path,
    ) -> EvalResult<Rc<ModuleRecord>> {
        let identity = Name::from(format!("builtin:{name}"));
        if let Some(record) = self.records.borrow().get(&identity) {
            return Ok(Rc::clone(record));
        }
        let value = match self.options.modules.get(name) {
            Some(json) => from_json(interp, json),
            None => {
                let bare = name.strip_prefix("node:").unwrap_or(name);
                host_modules::load(self.sandbox.realm(), bare).ok_or_else(|| {
                    let error = LoadError::NotFound {
                        specifier: name.to_string(),
                        from: base.to_path_buf(),
                    };
                    load_error(interp, &error)
                })?
            }
        };
        let record = ModuleRecord::data(identity.clone(), PathBuf::from(name), value);
        self.records.borrow_mut().insert(identity, Rc::clone(&record));
        Ok(record)
    }

    fn load_path(
        &self,
        interp: &mut Interpreter,
        base: &Path,
        path: &str,
    ) -> EvalResult<Rc<ModuleRecord>> {
        let (physical, suffix) = specifier::split_queries(path);
        let candidate = normalize(&base.join(&physical));
        let Some(found) = specifier::probe(&candidate) else {
            let error = LoadError::NotFound {
                specifier: path.to_string(),
                from: base.to_path_buf(),
            };
            return Err(load_error(interp, &error));
        };
        let identity = artifact::identity(&found, &suffix);
        if let Some(record) = self.records.borrow().get(&identity) {
            tracing::trace!(%identity, "identity cache hit");
            return Ok(Rc::clone(record));
        }
        let artifact = CompiledArtifact::read(found, &suffix, self.options.output_module)
            .map_err(|error| load_error(interp, &error))?;
        let record = self.create_record(interp, artifact)?;
        tracing::debug!(identity = %record.identity, kind = %record.kind, "module record created");
        self.records.borrow_mut().insert(identity, Rc::clone(&record));
        Ok(record)
    }

    fn create_record(
        &self,
        interp: &mut Interpreter,
        artifact: CompiledArtifact,
    ) -> EvalResult<Rc<ModuleRecord>> {
        let cached = self.cached_flag(&artifact.path);
        match artifact.kind {
            ModuleKind::Data => {
                let json: serde_json::Value = serde_json::from_str(&artifact.content)
                    .map_err(|err| syntax_error(interp, &artifact.path, &err))?;
                let value = from_json(interp, &json);
                Ok(ModuleRecord::data(artifact.identity, artifact.path, value))
            }
            ModuleKind::Sync => Ok(ModuleRecord::sync(
                artifact.identity,
                artifact.path,
                artifact.content,
                cached,
            )),
            ModuleKind::Linked => {
                let program = cbx_parse::parse(&artifact.content, ParseGoal::Module)
                    .map_err(|err| syntax_error(interp, &artifact.path, &err))?;
                let scope = self.sandbox.module_scope();
                if artifact.content.contains("__STATS__") {
                    let stats = self.stats_value(interp)?;
                    scope
                        .borrow_mut()
                        .define(Name::from("__STATS__"), stats, Mutability::Mutable);
                }
                let script = Rc::new(self.script_info(artifact.identity.clone(), artifact.dir()));
                let module = LinkedModule {
                    program: Rc::new(program),
                    scope,
                    script,
                    requests: RefCell::default(),
                    exports: RefCell::default(),
                };
                Ok(ModuleRecord::linked(
                    artifact.identity,
                    artifact.path,
                    module,
                    cached,
                ))
            }
        }
    }

    fn script_info(&self, id: Name, dir: PathBuf) -> ScriptInfo {
        let host: Weak<dyn ModuleHost> = self.this.clone();
        ScriptInfo::new(id, dir, Rc::clone(self.sandbox.realm())).with_host(host)
    }

    /// The build's `cached` flag for the artifact at `path`.
    fn cached_flag(&self, path: &Path) -> Option<bool> {
        let stats = self.options.stats.as_ref()?;
        let identifier = specifier::relative_identifier(&self.options.output_dir, path)?;
        stats
            .module(self.options.variant, &identifier)
            .map(|stat| stat.cached)
    }

    fn stats_value(&self, interp: &mut Interpreter) -> EvalResult {
        if let Some(value) = &*self.stats.borrow() {
            return Ok(value.clone());
        }
        let value = match &self.options.stats {
            Some(stats) => {
                let json = serde_json::to_value(&**stats)
                    .map_err(|err| interp.type_error(format!("cannot expose build stats: {err}")))?;
                from_json(interp, &json)
            }
            None => Value::Undefined,
        };
        *self.stats.borrow_mut() = Some(value.clone());
        Ok(value)
    }

    /// Bring `record` to its evaluated state, rethrowing a stored failure.
    ///
    /// Returns the promise to wait for when evaluation could not finish
    /// synchronously: a top-level `await` somewhere in the graph.
    pub(crate) fn evaluate(
        &self,
        interp: &mut Interpreter,
        record: &Rc<ModuleRecord>,
    ) -> EvalResult<Option<ObjRef>> {
        if let Some(error) = record.error() {
            return Err(Interrupt::Throw(error));
        }
        match record.kind {
            ModuleKind::Data => Ok(None),
            ModuleKind::Sync if record.state() == ModuleState::Unlinked => {
                self.execute_sync(interp, record).map(|()| None)
            }
            ModuleKind::Sync => Ok(None),
            ModuleKind::Linked => {
                self.link(interp, record, &mut FxHashSet::default())?;
                self.evaluate_linked(interp, record)
            }
        }
    }

    /// Promise of what `import()` of `record` yields. Failures reject it.
    fn namespace_promise(&self, interp: &mut Interpreter, record: &Rc<ModuleRecord>) -> EvalResult {
        let promise = interp.new_promise();
        self.evaluate_into(interp, record, &promise, namespace_value)?;
        Ok(Value::Object(promise))
    }

    /// Settle `target` with `produce(record)` once `record` is evaluated,
    /// or with the failure that stopped it.
    pub(crate) fn evaluate_into(
        &self,
        interp: &mut Interpreter,
        record: &Rc<ModuleRecord>,
        target: &ObjRef,
        produce: fn(&mut Interpreter, &Rc<ModuleRecord>) -> EvalResult,
    ) -> EvalResult<()> {
        match self.evaluate(interp, record) {
            Ok(None) => {
                let value = produce(interp, record);
                settle_with(interp, target, value)
            }
            Ok(Some(pending)) => {
                let record = Rc::clone(record);
                let target = target.clone();
                interp.on_settled(
                    &pending,
                    Box::new(move |interp, outcome| {
                        let value = match outcome {
                            Ok(_) => produce(interp, &record),
                            Err(reason) => Err(Interrupt::Throw(reason)),
                        };
                        settle_with(interp, &target, value)
                    }),
                );
                Ok(())
            }
            Err(error) => settle_with(interp, target, Err(error)),
        }
    }

    /// Run a sync record. The record counts as evaluated before its code
    /// starts, so circular `require`s see the partial `module.exports`.
    #[tracing::instrument(level = "debug", skip_all, fields(module = %record.identity))]
    fn execute_sync(&self, interp: &mut Interpreter, record: &Rc<ModuleRecord>) -> EvalResult<()> {
        let Some(source) = record.take_source() else {
            return Ok(());
        };
        let program = match cbx_parse::parse(&source, ParseGoal::Script) {
            Ok(program) => program,
            Err(err) => {
                let error = syntax_error(interp, &record.path, &err);
                if let Interrupt::Throw(value) = &error {
                    record.fail(value.clone());
                }
                return Err(error);
            }
        };
        record.set_state(ModuleState::Evaluated);

        let realm = Rc::clone(self.sandbox.realm());
        let exports = Value::Object(realm.object());
        let module = object(
            &realm,
            &[
                ("id", Value::Str(record.identity.clone())),
                ("exports", exports.clone()),
                ("loaded", Value::Bool(false)),
            ],
        );
        record.set_value(Value::Object(module.clone()));

        let dir = record.path.parent().map(Path::to_path_buf).unwrap_or_default();
        let scope = self.sandbox.module_scope();
        {
            let mut bindings = scope.borrow_mut();
            let mut define = |name: &str, value: Value| {
                bindings.define(Name::from(name), value, Mutability::Mutable);
            };
            define("require", self.require_function(&realm, dir.clone()));
            define("module", Value::Object(module.clone()));
            define("exports", exports.clone());
            define("__dirname", Value::str(&dir.to_string_lossy()));
            define("__filename", Value::str(&record.path.to_string_lossy()));
        }
        if source.contains("__STATS__") {
            let stats = self.stats_value(interp)?;
            scope
                .borrow_mut()
                .define(Name::from("__STATS__"), stats, Mutability::Mutable);
        }

        let script = Rc::new(self.script_info(record.identity.clone(), dir));
        let sub_path = specifier::sub_path(&self.options.output_dir, &record.path);
        let result = self.sandbox.with_current_script(interp, &sub_path, |interp| {
            interp.run_script(&program, scope, exports, script)
        });
        if let Err(Interrupt::Throw(error)) = &result {
            record.fail(error.clone());
        }
        result?;
        module.borrow_mut().set_data("loaded", Value::Bool(true));
        Ok(())
    }

    /// `require` for code living in `dir`.
    fn require_function(&self, realm: &Realm, dir: PathBuf) -> Value {
        let loader = self.this.clone();
        function(realm, "require", 1, move |interp, _, args| {
            let resolver = upgrade(interp, &loader)?;
            let specifier = string_arg(interp, args, 0)?;
            resolver
                .resolve(interp, &dir, &specifier, ResolveMode::Sync)?
                .into_value(interp)
        })
    }

    /// Drop every record and worker. Script objects that still reach this
    /// resolver see a torn-down graph.
    pub fn teardown(&self) {
        self.sandbox.teardown();
        let records = std::mem::take(&mut *self.records.borrow_mut());
        tracing::debug!(
            variant = self.options.variant,
            count = records.len(),
            "module graph torn down"
        );
        for record in records.values() {
            record.clear();
        }
        self.stats.borrow_mut().take();
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("variant", &self.options.variant)
            .field("sandbox", &self.sandbox)
            .field("records", &self.records.borrow().len())
            .finish_non_exhaustive()
    }
}

/// The resolver behind a weak handle held by script-visible functions.
pub(crate) fn upgrade(interp: &Interpreter, loader: &Weak<Resolver>) -> EvalResult<Rc<Resolver>> {
    loader
        .upgrade()
        .ok_or_else(|| interp.throw((ErrorKind::Error, "module graph already torn down".to_string())))
}

/// What `import()` of an evaluated record resolves to. A linked module
/// whose default export is a promise hands out that promise instead.
fn namespace_value(interp: &mut Interpreter, record: &Rc<ModuleRecord>) -> EvalResult {
    let value = record.import_value(interp)?;
    if record.kind == ModuleKind::Linked {
        let default = interp.get(&value, "default")?;
        if default.as_object().is_some_and(|obj| obj.is_promise()) {
            return Ok(default);
        }
    }
    Ok(value)
}

/// Fulfill `promise` with `result`, or reject it with what was thrown.
pub(crate) fn settle_with(
    interp: &mut Interpreter,
    promise: &ObjRef,
    result: EvalResult,
) -> EvalResult<()> {
    match result {
        Ok(value) => interp.resolve_promise(promise, value),
        Err(Interrupt::Throw(reason)) => {
            interp.reject_promise(promise, reason);
            Ok(())
        }
        Err(other) => Err(other),
    }
}

/// A resolution failure as a thrown `Error`.
fn load_error(interp: &Interpreter, error: &LoadError) -> Interrupt {
    tracing::debug!(%error, "resolution failed");
    let object = interp.create_error(ErrorKind::Error, &error.to_string());
    if matches!(error, LoadError::NotFound { .. }) {
        object
            .borrow_mut()
            .set_data("code", Value::str("MODULE_NOT_FOUND"));
    }
    Interrupt::Throw(Value::Object(object))
}

fn syntax_error(interp: &Interpreter, path: &Path, err: &dyn std::fmt::Display) -> Interrupt {
    interp.throw((ErrorKind::Syntax, format!("{}: {err}", path.display())))
}
