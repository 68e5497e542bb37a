//! Declaration instantiation.
//!
//! Before a body runs, its `var` names exist as `undefined`, its function
//! declarations are already callable and its `let`/`const` names sit in
//! their temporal dead zone.

use std::rc::Rc;

use cbx_ir::ast::{
    ExportDecl, ForBinding, ForInit, Function, Stmt, StmtKind, VarDecl, VarKind,
    DEFAULT_EXPORT_BINDING,
};
use cbx_ir::Name;

use super::Interpreter;
use crate::environment::Mutability;
use crate::errors::EvalResult;
use crate::value::Value;

/// Every `var` name declared in `body`, not descending into functions.
fn collect_var_names(body: &[Stmt], out: &mut Vec<Name>) {
    for stmt in body {
        collect_var_names_stmt(stmt, out);
    }
}

fn collect_from_decl(decl: &VarDecl, out: &mut Vec<Name>) {
    if decl.kind == VarKind::Var {
        for declarator in &decl.declarators {
            declarator.target.bound_names(out);
        }
    }
}

fn collect_var_names_stmt(stmt: &Stmt, out: &mut Vec<Name>) {
    match &stmt.kind {
        StmtKind::Var(decl) | StmtKind::Export(ExportDecl::Var(decl)) => {
            collect_from_decl(decl, out);
        }
        StmtKind::Block(body) => collect_var_names(body, out),
        StmtKind::If {
            consequent,
            alternate,
            ..
        } => {
            collect_var_names_stmt(consequent, out);
            if let Some(alternate) = alternate {
                collect_var_names_stmt(alternate, out);
            }
        }
        StmtKind::While { body, .. } | StmtKind::DoWhile { body, .. } => {
            collect_var_names_stmt(body, out);
        }
        StmtKind::For { init, body, .. } => {
            if let Some(ForInit::Var(decl)) = init {
                collect_from_decl(decl, out);
            }
            collect_var_names_stmt(body, out);
        }
        StmtKind::ForOf { binding, body, .. } | StmtKind::ForIn { binding, body, .. } => {
            if let ForBinding::Decl(VarKind::Var, pattern) = binding {
                pattern.bound_names(out);
            }
            collect_var_names_stmt(body, out);
        }
        StmtKind::Try {
            block,
            handler,
            finalizer,
        } => {
            collect_var_names(block, out);
            if let Some(handler) = handler {
                collect_var_names(&handler.body, out);
            }
            if let Some(finalizer) = finalizer {
                collect_var_names(finalizer, out);
            }
        }
        _ => {}
    }
}

fn lexical_names(decl: &VarDecl, out: &mut Vec<(Name, Mutability)>) {
    let mutability = match decl.kind {
        VarKind::Var => return,
        VarKind::Let => Mutability::Mutable,
        VarKind::Const => Mutability::Immutable,
    };
    let mut names = Vec::new();
    for declarator in &decl.declarators {
        declarator.target.bound_names(&mut names);
    }
    out.extend(names.into_iter().map(|name| (name, mutability)));
}

impl Interpreter {
    /// Instantiate a function (or script) body in the current scope.
    pub(crate) fn hoist_function_body(&mut self, body: &[Stmt]) -> EvalResult<()> {
        let mut vars = Vec::new();
        collect_var_names(body, &mut vars);
        {
            let mut scope = self.scope.borrow_mut();
            for name in vars {
                if !scope.has_own(&name) {
                    scope.define(name, Value::Undefined, Mutability::Mutable);
                }
            }
        }
        self.hoist_block(body)
    }

    /// Instantiate the lexical declarations of a block in the current scope.
    pub(crate) fn hoist_block(&mut self, body: &[Stmt]) -> EvalResult<()> {
        let mut lexical = Vec::new();
        for stmt in body {
            match &stmt.kind {
                StmtKind::Var(decl) => lexical_names(decl, &mut lexical),
                StmtKind::Function(function) => self.hoist_function(function, None),
                _ => {}
            }
        }
        let mut scope = self.scope.borrow_mut();
        for (name, mutability) in lexical {
            scope.declare_uninitialized(name, mutability);
        }
        Ok(())
    }

    /// Instantiate a module body: everything a function body gets plus the
    /// declarations nested in `export`.
    pub(crate) fn hoist_module_body(&mut self, body: &[Stmt]) -> EvalResult<()> {
        self.hoist_function_body(body)?;
        let mut lexical = Vec::new();
        for stmt in body {
            let StmtKind::Export(export) = &stmt.kind else {
                continue;
            };
            match export {
                ExportDecl::Var(decl) => lexical_names(decl, &mut lexical),
                ExportDecl::Function(function) => self.hoist_function(function, None),
                ExportDecl::DefaultFunction(function) => {
                    let binding = function.name.is_none().then(|| Name::from(DEFAULT_EXPORT_BINDING));
                    self.hoist_function(function, binding);
                }
                ExportDecl::DefaultExpr(_) => lexical.push((
                    Name::from(DEFAULT_EXPORT_BINDING),
                    Mutability::Immutable,
                )),
                ExportDecl::Named { .. } | ExportDecl::All { .. } => {}
            }
        }
        let mut scope = self.scope.borrow_mut();
        for (name, mutability) in lexical {
            scope.declare_uninitialized(name, mutability);
        }
        Ok(())
    }

    /// Bind a function declaration under its own name, or under `binding`
    /// for an anonymous default export.
    fn hoist_function(&mut self, function: &Rc<Function>, binding: Option<Name>) {
        let (binding, name) = match (&function.name, binding) {
            (_, Some(binding)) => (binding, Name::from("default")),
            (Some(name), None) => (name.clone(), name.clone()),
            (None, None) => return,
        };
        let closure = self.make_closure(function, name);
        self.scope
            .borrow_mut()
            .define(binding, closure, Mutability::Mutable);
    }
}
