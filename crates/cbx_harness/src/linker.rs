//! Linking and evaluation of linked (ESM) records, and the module host
//! the interpreter calls for `import()` and `import.meta`.
//!
//! Linking is a depth-first walk over static requests with an explicit
//! visited set; a record already `Linking` counts as satisfied, so cycles
//! terminate and expose bindings that may still be uninitialized.
//! Evaluation is post-order, each record at most once. A record whose
//! dependencies or body suspend at a top-level `await` finishes from jobs;
//! its evaluation promise tells importers when.

use std::rc::Rc;

use cbx_eval::{
    ErrorKind, EvalResult, Interpreter, Interrupt, ModuleHost, Mutability, ObjRef, ScriptInfo,
    Value,
};
use cbx_ir::ast::{ExportDecl, LoadingStrategy, StmtKind, DEFAULT_EXPORT_BINDING};
use cbx_ir::Name;
use rustc_hash::FxHashSet;
use url::Url;

use crate::native::object;
use crate::record::{ExportBinding, ExportTable, LinkedModule, ModuleRecord, ModuleState};
use crate::resolver::{settle_with, upgrade, Resolver};

impl Resolver {
    /// Link `record` and everything it statically imports.
    #[tracing::instrument(level = "debug", skip_all, fields(module = %record.identity))]
    pub(crate) fn link(
        &self,
        interp: &mut Interpreter,
        record: &Rc<ModuleRecord>,
        visited: &mut FxHashSet<Name>,
    ) -> EvalResult<()> {
        let Some(linked) = &record.linked else {
            return Ok(());
        };
        if record.state() != ModuleState::Unlinked || !visited.insert(record.identity.clone()) {
            return Ok(());
        }
        record.set_state(ModuleState::Linking);
        match self.link_module(interp, linked, visited) {
            Ok(()) => {
                record.set_state(ModuleState::Linked);
                Ok(())
            }
            Err(Interrupt::Throw(error)) => {
                record.fail(error.clone());
                Err(Interrupt::Throw(error))
            }
            Err(other) => Err(other),
        }
    }

    fn link_module(
        &self,
        interp: &mut Interpreter,
        linked: &LinkedModule,
        visited: &mut FxHashSet<Name>,
    ) -> EvalResult<()> {
        let base = linked.script.dir.clone();
        let mut requests = Vec::with_capacity(linked.program.module_requests.len());
        for specifier in &linked.program.module_requests {
            let dependency = self.load(interp, &base, specifier)?;
            requests.push((specifier.clone(), dependency));
        }
        *linked.requests.borrow_mut() = requests.clone();
        *linked.exports.borrow_mut() = export_table(linked);

        for (_, dependency) in &requests {
            self.link(interp, dependency, visited)?;
            if let Some(error) = dependency.error() {
                return Err(Interrupt::Throw(error));
            }
        }

        interp.instantiate_module(&linked.program, linked.scope.clone(), Rc::clone(&linked.script))?;
        bind_imports(interp, linked)
    }

    /// Evaluate a linked record after its dependencies, once.
    ///
    /// Returns the record's evaluation promise when something on the way
    /// suspends at a top-level `await`; evaluation then carries on from
    /// jobs. A record already evaluating hands out that promise too, so
    /// every importer waits for the whole evaluation. The exception is a
    /// cycle back to a record still running synchronously, which counts as
    /// satisfied.
    #[tracing::instrument(level = "debug", skip_all, fields(module = %record.identity))]
    pub(crate) fn evaluate_linked(
        &self,
        interp: &mut Interpreter,
        record: &Rc<ModuleRecord>,
    ) -> EvalResult<Option<ObjRef>> {
        if let Some(error) = record.error() {
            return Err(Interrupt::Throw(error));
        }
        let Some(linked) = &record.linked else {
            return self.evaluate(interp, record);
        };
        match record.state() {
            ModuleState::Evaluated => return Ok(None),
            ModuleState::Evaluating => return Ok(record.pending_evaluation()),
            _ => {}
        }
        record.set_state(ModuleState::Evaluating);

        let dependencies: Rc<[Rc<ModuleRecord>]> = linked
            .requests
            .borrow()
            .iter()
            .map(|(_, dependency)| Rc::clone(dependency))
            .collect();
        let start = EvaluationStep::Dependency(dependencies, 0);
        match self.continue_evaluation(interp, record, start) {
            Ok(None) => {
                record.set_state(ModuleState::Evaluated);
                Ok(None)
            }
            Ok(Some(pending)) => Ok(Some(pending)),
            Err(Interrupt::Throw(error)) => {
                tracing::debug!(module = %record.identity, "module evaluation threw");
                record.fail(error.clone());
                Err(Interrupt::Throw(error))
            }
            Err(other) => Err(other),
        }
    }

    /// Run the rest of `record`'s evaluation from `step`. Returns the
    /// record's evaluation promise if it has to wait.
    fn continue_evaluation(
        &self,
        interp: &mut Interpreter,
        record: &Rc<ModuleRecord>,
        step: EvaluationStep,
    ) -> EvalResult<Option<ObjRef>> {
        let EvaluationStep::Dependency(dependencies, start) = step else {
            return Ok(None);
        };
        for (index, dependency) in dependencies.iter().enumerate().skip(start) {
            let cyclic =
                dependency.state() == ModuleState::Evaluating && depends_on(dependency, record);
            let waiting = if cyclic {
                None
            } else {
                self.evaluate(interp, dependency)?
            };
            if let Some(promise) = waiting {
                let next = EvaluationStep::Dependency(Rc::clone(&dependencies), index + 1);
                return Ok(Some(self.evaluate_after(interp, record, &promise, next)));
            }
        }
        let Some(linked) = &record.linked else {
            return Ok(None);
        };
        let body = interp.evaluate_module(
            &linked.program,
            linked.scope.clone(),
            Rc::clone(&linked.script),
        )?;
        Ok(body.map(|promise| {
            self.evaluate_after(interp, record, &promise, EvaluationStep::Done)
        }))
    }

    /// Resume `record`'s evaluation at `next` once `promise` settles.
    fn evaluate_after(
        &self,
        interp: &mut Interpreter,
        record: &Rc<ModuleRecord>,
        promise: &ObjRef,
        next: EvaluationStep,
    ) -> ObjRef {
        tracing::trace!(module = %record.identity, "module evaluation waits");
        let evaluation = record.evaluation_promise(interp);
        let loader = self.this();
        let record = Rc::clone(record);
        interp.on_settled(
            promise,
            Box::new(move |interp, outcome| {
                let resolver = upgrade(interp, &loader)?;
                let result = match outcome {
                    Ok(_) => resolver.continue_evaluation(interp, &record, next),
                    Err(reason) => Err(Interrupt::Throw(reason)),
                };
                finish_evaluation(interp, &record, result)
            }),
        );
        evaluation
    }
}

/// Where a waiting evaluation picks up again.
enum EvaluationStep {
    /// Evaluate dependencies from the index, then the body.
    Dependency(Rc<[Rc<ModuleRecord>]>, usize),
    /// The body finished.
    Done,
}

/// Settle the evaluation promise of `record` once resumed work ended.
fn finish_evaluation(
    interp: &mut Interpreter,
    record: &Rc<ModuleRecord>,
    result: EvalResult<Option<ObjRef>>,
) -> EvalResult<()> {
    let evaluation = record.evaluation_promise(interp);
    match result {
        Ok(Some(_)) => Ok(()),
        Ok(None) => {
            record.set_state(ModuleState::Evaluated);
            interp.resolve_promise(&evaluation, Value::Undefined)
        }
        Err(Interrupt::Throw(error)) => {
            tracing::debug!(module = %record.identity, "module evaluation threw");
            record.fail(error.clone());
            interp.reject_promise(&evaluation, error);
            Ok(())
        }
        Err(other) => Err(other),
    }
}

/// Whether `from` reaches `target` through static requests.
fn depends_on(from: &Rc<ModuleRecord>, target: &Rc<ModuleRecord>) -> bool {
    let mut visited = FxHashSet::default();
    let mut stack = vec![Rc::clone(from)];
    while let Some(record) = stack.pop() {
        if Rc::ptr_eq(&record, target) {
            return true;
        }
        if !visited.insert(record.identity.clone()) {
            continue;
        }
        if let Some(linked) = &record.linked {
            let requests = linked.requests.borrow();
            stack.extend(requests.iter().map(|(_, dependency)| Rc::clone(dependency)));
        }
    }
    false
}

/// Exported names of `linked`, read from its `export` statements.
fn export_table(linked: &LinkedModule) -> ExportTable {
    fn local(table: &mut ExportTable, exported: Name, binding: Name) {
        table.named.push((exported, ExportBinding::Local(binding)));
    }

    let mut table = ExportTable::default();
    for stmt in &linked.program.body {
        let StmtKind::Export(export) = &stmt.kind else {
            continue;
        };
        match export {
            ExportDecl::Var(decl) => {
                let mut names = Vec::new();
                for declarator in &decl.declarators {
                    declarator.target.bound_names(&mut names);
                }
                for name in names {
                    local(&mut table, name.clone(), name);
                }
            }
            ExportDecl::Function(function) => {
                if let Some(name) = &function.name {
                    local(&mut table, name.clone(), name.clone());
                }
            }
            ExportDecl::DefaultExpr(_) => {
                local(&mut table, Name::from("default"), Name::from(DEFAULT_EXPORT_BINDING));
            }
            ExportDecl::DefaultFunction(function) => {
                let binding = function
                    .name
                    .clone()
                    .unwrap_or_else(|| Name::from(DEFAULT_EXPORT_BINDING));
                local(&mut table, Name::from("default"), binding);
            }
            ExportDecl::Named {
                specifiers,
                from: None,
            } => {
                for spec in specifiers {
                    local(&mut table, spec.exported.clone(), spec.local.clone());
                }
            }
            ExportDecl::Named {
                specifiers,
                from: Some(from),
            } => {
                let Some(dependency) = linked.dependency(from) else {
                    continue;
                };
                for spec in specifiers {
                    table.named.push((
                        spec.exported.clone(),
                        ExportBinding::Indirect(Rc::clone(&dependency), spec.local.clone()),
                    ));
                }
            }
            ExportDecl::All { from, alias } => {
                let Some(dependency) = linked.dependency(from) else {
                    continue;
                };
                match alias {
                    Some(alias) => table
                        .named
                        .push((alias.clone(), ExportBinding::Namespace(dependency))),
                    None => table.stars.push(dependency),
                }
            }
        }
    }
    table
}

/// Create the live import bindings of an instantiated module.
fn bind_imports(interp: &Interpreter, linked: &LinkedModule) -> EvalResult<()> {
    for stmt in &linked.program.body {
        let StmtKind::Import(import) = &stmt.kind else {
            continue;
        };
        let Some(dependency) = linked.dependency(&import.specifier) else {
            continue;
        };
        if let Some(local) = &import.namespace {
            let namespace = Value::Object(dependency.namespace());
            linked
                .scope
                .borrow_mut()
                .define(local.clone(), namespace, Mutability::Immutable);
        }
        let source = dependency.namespace_source();
        let default = import
            .default
            .iter()
            .map(|local| (Name::from("default"), local));
        let named = import
            .named
            .iter()
            .map(|name| (name.imported.clone(), &name.local));
        for (imported, local) in default.chain(named) {
            if !dependency.provides(&imported) {
                return Err(interp.throw((
                    ErrorKind::Syntax,
                    format!(
                        "The requested module '{}' does not provide an export named '{imported}'",
                        import.specifier
                    ),
                )));
            }
            linked
                .scope
                .borrow_mut()
                .define_import(local.clone(), Rc::clone(&source), imported);
        }
    }
    Ok(())
}

impl ModuleHost for Resolver {
    /// Every strategy resolves the same way: one job that links, evaluates
    /// and settles the promise.
    fn import_dynamic(
        &self,
        interp: &mut Interpreter,
        specifier: &str,
        referrer: &ScriptInfo,
        strategy: LoadingStrategy,
    ) -> EvalResult {
        tracing::trace!(%specifier, %strategy, referrer = %referrer.id, "dynamic import");
        let promise = interp.new_promise();
        let settle = promise.clone();
        let loader = self.this();
        let base = referrer.dir.clone();
        let specifier = specifier.to_string();
        interp.enqueue_job(Box::new(move |interp| {
            let record = upgrade(interp, &loader).and_then(|resolver| {
                let record = resolver.load(interp, &base, &specifier)?;
                Ok((resolver, record))
            });
            match record {
                Ok((resolver, record)) => {
                    resolver.evaluate_into(interp, &record, &settle, |interp, record| {
                        record.import_value(interp)
                    })
                }
                Err(error) => settle_with(interp, &settle, Err(error)),
            }
        }));
        Ok(Value::Object(promise))
    }

    fn import_meta(&self, interp: &mut Interpreter, referrer: &ScriptInfo) -> EvalResult {
        let path = self
            .record(&referrer.id)
            .map_or_else(|| referrer.dir.clone(), |record| record.path.clone());
        let url = Url::from_file_path(&path)
            .map_err(|()| interp.type_error(format!("no file URL for {}", path.display())))?;
        let meta = object(interp.realm(), &[("url", Value::str(url.as_str()))]);
        Ok(Value::Object(meta))
    }
}

#[cfg(test)]
mod tests;
