//! Statement execution.
//!
//! Statements that contain other statements, or evaluate more than one
//! expression, record a resume point when an `await` inside them suspends
//! the body (see `coroutine`).

use std::rc::Rc;

use cbx_ir::ast::{
    CatchClause, Declarator, ExportDecl, Expr, ForBinding, ForInit, Stmt, StmtKind, VarDecl,
    VarKind, DEFAULT_EXPORT_BINDING,
};
use cbx_ir::Name;

use super::call::pattern_name;
use super::coroutine::{LoopPhase, ResumePoint, TryPhase};
use super::pattern::BindMode;
use super::Interpreter;
use crate::environment::{LocalScope, Mutability, Scope};
use crate::errors::{EvalResult, Interrupt};
use crate::value::Value;

/// What a loop does after its body ran once.
enum LoopControl {
    Next,
    Exit,
}

fn loop_control(result: EvalResult<()>) -> EvalResult<LoopControl> {
    match result {
        Ok(()) | Err(Interrupt::Continue) => Ok(LoopControl::Next),
        Err(Interrupt::Break) => Ok(LoopControl::Exit),
        Err(other) => Err(other),
    }
}

fn for_point(phase: LoopPhase) -> impl FnOnce(&Interpreter) -> ResumePoint {
    move |interp: &Interpreter| ResumePoint::For(interp.scope.clone(), phase)
}

fn each_point(
    items: &Rc<[Value]>,
    index: usize,
    bound: bool,
) -> impl FnOnce(&Interpreter) -> ResumePoint + '_ {
    move |interp: &Interpreter| ResumePoint::Each {
        items: Rc::clone(items),
        index,
        scope: interp.scope.clone(),
        bound,
    }
}

fn bind_mode(kind: VarKind) -> BindMode {
    match kind {
        VarKind::Var => BindMode::Var,
        VarKind::Let => BindMode::Declare(Mutability::Mutable),
        VarKind::Const => BindMode::Declare(Mutability::Immutable),
    }
}

impl Interpreter {
    pub(crate) fn exec_statements(&mut self, body: &[Stmt]) -> EvalResult<()> {
        let start = match self.resume_point() {
            Some(ResumePoint::Statements(index)) => index,
            _ => 0,
        };
        for (index, stmt) in body.iter().enumerate().skip(start) {
            let result = self.exec_stmt(stmt);
            self.suspended(result, |_| ResumePoint::Statements(index))?;
        }
        Ok(())
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> EvalResult<()> {
        self.tick()?;
        match &stmt.kind {
            StmtKind::Var(decl) => self.exec_var_decl(decl),
            StmtKind::Function(_) | StmtKind::Import(_) | StmtKind::Empty => Ok(()),
            StmtKind::Expr(expr) => {
                let value = self.eval_expr(expr)?;
                if self.depth == 0 {
                    self.completion = value;
                }
                Ok(())
            }
            StmtKind::Block(body) => self.exec_block(body),
            StmtKind::If {
                test,
                consequent,
                alternate,
            } => {
                let taken = match self.resume_point() {
                    Some(ResumePoint::Branch(Some(taken))) => taken,
                    _ => {
                        let test = self.eval_expr(test);
                        self.suspended(test, |_| ResumePoint::Branch(None))?
                            .is_truthy()
                    }
                };
                let result = match (taken, alternate) {
                    (true, _) => self.exec_stmt(consequent),
                    (false, Some(alternate)) => self.exec_stmt(alternate),
                    (false, None) => Ok(()),
                };
                self.suspended(result, |_| ResumePoint::Branch(Some(taken)))
            }
            StmtKind::While { test, body } => self.exec_while(test, body, LoopPhase::Test),
            StmtKind::DoWhile { body, test } => self.exec_while(test, body, LoopPhase::Body),
            StmtKind::For {
                init,
                test,
                update,
                body,
            } => self.exec_for(init.as_ref(), test.as_ref(), update.as_ref(), body),
            StmtKind::ForOf {
                binding,
                iterable,
                body,
            } => match self.resume_point() {
                Some(ResumePoint::Each {
                    items,
                    index,
                    scope,
                    bound,
                }) => self.exec_for_each(binding, &items, body, index, Some((scope, bound))),
                _ => {
                    let iterable = self.eval_expr(iterable);
                    let iterable = self.suspended(iterable, |_| ResumePoint::Head)?;
                    let items: Rc<[Value]> = self.iterate(&iterable)?.into();
                    self.exec_for_each(binding, &items, body, 0, None)
                }
            },
            StmtKind::ForIn {
                binding,
                object,
                body,
            } => match self.resume_point() {
                Some(ResumePoint::Each {
                    items,
                    index,
                    scope,
                    bound,
                }) => self.exec_for_each(binding, &items, body, index, Some((scope, bound))),
                _ => {
                    let object = self.eval_expr(object);
                    let object = self.suspended(object, |_| ResumePoint::Head)?;
                    let keys: Rc<[Value]> = self
                        .enumerate_keys(&object)
                        .into_iter()
                        .map(Value::Str)
                        .collect();
                    self.exec_for_each(binding, &keys, body, 0, None)
                }
            },
            StmtKind::Break => Err(Interrupt::Break),
            StmtKind::Continue => Err(Interrupt::Continue),
            StmtKind::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::Undefined,
                };
                Err(Interrupt::Return(value))
            }
            StmtKind::Throw(expr) => {
                let value = self.eval_expr(expr)?;
                Err(Interrupt::Throw(value))
            }
            StmtKind::Try {
                block,
                handler,
                finalizer,
            } => self.exec_try(block, handler.as_ref(), finalizer.as_deref()),
            StmtKind::Export(export) => self.exec_export(export),
        }
    }

    fn exec_var_decl(&mut self, decl: &VarDecl) -> EvalResult<()> {
        let start = match self.resume_point() {
            Some(ResumePoint::Declarator(index)) => index,
            _ => 0,
        };
        for (index, declarator) in decl.declarators.iter().enumerate().skip(start) {
            let result = self.exec_declarator(decl.kind, declarator);
            self.suspended(result, |_| ResumePoint::Declarator(index))?;
        }
        Ok(())
    }

    fn exec_declarator(&mut self, kind: VarKind, declarator: &Declarator) -> EvalResult<()> {
        let value = match &declarator.init {
            Some(init) => self.eval_named(init, pattern_name(&declarator.target))?,
            // `var x;` leaves an existing value alone.
            None if kind == VarKind::Var => return Ok(()),
            None => Value::Undefined,
        };
        self.bind_pattern(&declarator.target, value, bind_mode(kind))
    }

    /// Scope for a block: the saved one when resuming into it, else a fresh
    /// child of the current scope. The flag tells whether it was resumed.
    fn block_scope(&mut self) -> (LocalScope<Scope>, bool) {
        match self.resume_point() {
            Some(ResumePoint::Scope(scope)) => (scope, true),
            _ => (LocalScope::new(Scope::with_parent(self.scope.clone())), false),
        }
    }

    pub(crate) fn exec_block(&mut self, body: &[Stmt]) -> EvalResult<()> {
        let (scope, resumed) = self.block_scope();
        let result = self.in_scope(scope.clone(), |interp| {
            if !resumed {
                interp.hoist_block(body)?;
            }
            interp.exec_statements(body)
        });
        self.suspended(result, |_| ResumePoint::Scope(scope))
    }

    fn exec_catch(&mut self, handler: &CatchClause, error: Value) -> EvalResult<()> {
        let (scope, resumed) = self.block_scope();
        let result = self.in_scope(scope.clone(), |interp| {
            if !resumed {
                if let Some(param) = &handler.param {
                    interp.bind_pattern(param, error, BindMode::Declare(Mutability::Mutable))?;
                }
                interp.hoist_block(&handler.body)?;
            }
            interp.exec_statements(&handler.body)
        });
        self.suspended(result, |_| ResumePoint::Scope(scope))
    }

    fn exec_try(
        &mut self,
        block: &[Stmt],
        handler: Option<&CatchClause>,
        finalizer: Option<&[Stmt]>,
    ) -> EvalResult<()> {
        let mut phase = match self.resume_point() {
            Some(ResumePoint::Try(phase)) => phase,
            _ => TryPhase::Block,
        };
        let mut result = Ok(());
        if let TryPhase::Block = phase {
            result = self.exec_block(block);
            if let Err(Interrupt::Suspend) = result {
                return self.suspended(result, |_| ResumePoint::Try(TryPhase::Block));
            }
            if let (Err(Interrupt::Throw(error)), Some(_)) = (&result, handler) {
                phase = TryPhase::Handler(error.clone());
            }
        }
        let caught = match &phase {
            TryPhase::Handler(error) => Some(error.clone()),
            _ => None,
        };
        if let (Some(error), Some(handler)) = (caught, handler) {
            result = self.exec_catch(handler, error.clone());
            if let Err(Interrupt::Suspend) = result {
                return self.suspended(result, |_| ResumePoint::Try(TryPhase::Handler(error)));
            }
        }
        if let TryPhase::Finalizer(completion) = phase {
            result = completion;
        }
        if let Some(finalizer) = finalizer {
            let outcome = self.exec_block(finalizer);
            if let Err(Interrupt::Suspend) = outcome {
                return self.suspended(outcome, |_| ResumePoint::Try(TryPhase::Finalizer(result)));
            }
            outcome?;
        }
        result
    }

    /// `while` starts at the test, `do … while` at the body.
    fn exec_while(&mut self, test: &Expr, body: &Stmt, first: LoopPhase) -> EvalResult<()> {
        let mut phase = match self.resume_point() {
            Some(ResumePoint::Loop(phase)) => phase,
            _ => first,
        };
        loop {
            if phase == LoopPhase::Test {
                let test = self.eval_expr(test);
                if !self.suspended(test, |_| ResumePoint::Loop(LoopPhase::Test))?.is_truthy() {
                    break;
                }
            }
            phase = LoopPhase::Test;
            let result = self.exec_stmt(body);
            let result = self.suspended(result, |_| ResumePoint::Loop(LoopPhase::Body));
            if let LoopControl::Exit = loop_control(result)? {
                break;
            }
        }
        Ok(())
    }

    fn exec_for(
        &mut self,
        init: Option<&ForInit>,
        test: Option<&Expr>,
        update: Option<&Expr>,
        body: &Stmt,
    ) -> EvalResult<()> {
        let (scope, mut phase) = match self.resume_point() {
            Some(ResumePoint::For(scope, phase)) => (scope, phase),
            _ => (
                LocalScope::new(Scope::with_parent(self.scope.clone())),
                LoopPhase::Init,
            ),
        };
        // `let` bindings get a fresh copy per iteration so closures created
        // in the body see that iteration's values.
        let per_iteration = matches!(init, Some(ForInit::Var(decl)) if decl.kind.is_lexical());
        self.in_scope(scope, |interp| {
            if phase == LoopPhase::Init {
                let result = interp.exec_for_init(init);
                interp.suspended(result, for_point(LoopPhase::Init))?;
                if per_iteration {
                    interp.copy_iteration_scope();
                }
                phase = LoopPhase::Test;
            }
            loop {
                if phase == LoopPhase::Test {
                    if let Some(test) = test {
                        let test = interp.eval_expr(test);
                        let test = interp.suspended(test, for_point(LoopPhase::Test))?;
                        if !test.is_truthy() {
                            break;
                        }
                    }
                    phase = LoopPhase::Body;
                }
                if phase == LoopPhase::Body {
                    let result = interp.exec_stmt(body);
                    let result = interp.suspended(result, for_point(LoopPhase::Body));
                    if let LoopControl::Exit = loop_control(result)? {
                        break;
                    }
                    if per_iteration {
                        interp.copy_iteration_scope();
                    }
                }
                if let Some(update) = update {
                    interp.tick()?;
                    let result = interp.eval_expr(update);
                    interp.suspended(result, for_point(LoopPhase::Update))?;
                }
                phase = LoopPhase::Test;
            }
            Ok(())
        })
    }

    fn exec_for_init(&mut self, init: Option<&ForInit>) -> EvalResult<()> {
        match init {
            Some(ForInit::Var(decl)) => {
                if decl.kind.is_lexical() && !self.rewinding() {
                    let mut names = Vec::new();
                    for declarator in &decl.declarators {
                        declarator.target.bound_names(&mut names);
                    }
                    let mutability = if decl.kind == VarKind::Const {
                        Mutability::Immutable
                    } else {
                        Mutability::Mutable
                    };
                    let mut scope = self.scope.borrow_mut();
                    for name in names {
                        scope.declare_uninitialized(name, mutability);
                    }
                }
                self.exec_var_decl(decl)
            }
            Some(ForInit::Expr(expr)) => self.eval_expr(expr).map(drop),
            None => Ok(()),
        }
    }

    /// Continue in a copy of the current iteration's bindings.
    fn copy_iteration_scope(&mut self) {
        let copy = self.scope.borrow().snapshot();
        self.scope = LocalScope::new(copy);
    }

    /// Run `body` once per item from `start`. `resumed` carries the scope of
    /// the iteration being resumed and whether its binding was made.
    fn exec_for_each(
        &mut self,
        binding: &ForBinding,
        items: &Rc<[Value]>,
        body: &Stmt,
        start: usize,
        mut resumed: Option<(LocalScope<Scope>, bool)>,
    ) -> EvalResult<()> {
        for (index, item) in items.iter().enumerate().skip(start) {
            let (scope, bound) = resumed
                .take()
                .unwrap_or_else(|| (LocalScope::new(Scope::with_parent(self.scope.clone())), false));
            let control = self.in_scope(scope, |interp| {
                if !bound {
                    let result = match binding {
                        ForBinding::Decl(kind, pattern) => {
                            interp.bind_pattern(pattern, item.clone(), bind_mode(*kind))
                        }
                        ForBinding::Target(target) => interp.assign_to(target, item.clone()),
                    };
                    interp.suspended(result, each_point(items, index, false))?;
                }
                let result = interp.exec_stmt(body);
                loop_control(interp.suspended(result, each_point(items, index, true)))
            })?;
            if let LoopControl::Exit = control {
                break;
            }
        }
        Ok(())
    }

    /// Keys visited by `for … in`: enumerable own keys, then inherited ones.
    pub(crate) fn enumerate_keys(&self, value: &Value) -> Vec<Name> {
        match value {
            Value::Str(s) => (0..s.chars().count()).map(|i| Name::from(i.to_string())).collect(),
            Value::Object(obj) => {
                let mut keys: Vec<Name> = Vec::new();
                let mut current = Some(obj.clone());
                while let Some(object) = current {
                    for key in self.own_keys(&object) {
                        if !keys.contains(&key) {
                            keys.push(key);
                        }
                    }
                    current = object.borrow().prototype.clone();
                }
                keys
            }
            _ => Vec::new(),
        }
    }

    fn exec_export(&mut self, export: &ExportDecl) -> EvalResult<()> {
        match export {
            ExportDecl::Var(decl) => self.exec_var_decl(decl),
            ExportDecl::DefaultExpr(expr) => {
                let value = self.eval_named(expr, Some(&Name::from("default")))?;
                self.scope
                    .borrow_mut()
                    .initialize(&Name::from(DEFAULT_EXPORT_BINDING), value);
                Ok(())
            }
            ExportDecl::Function(_)
            | ExportDecl::DefaultFunction(_)
            | ExportDecl::Named { .. }
            | ExportDecl::All { .. } => Ok(()),
        }
    }
}
