#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use cbx_ir::ast::{
    ExportDecl, ExprKind, FunctionBody, LoadingStrategy, Pattern, StmtKind, VarKind,
};
use pretty_assertions::assert_eq;

fn script(source: &str) -> Program {
    parse(source, ParseGoal::Script).unwrap_or_else(|e| panic!("parse failed: {e}"))
}

fn module(source: &str) -> Program {
    parse(source, ParseGoal::Module).unwrap_or_else(|e| panic!("parse failed: {e}"))
}

fn names(list: &[Name]) -> Vec<&str> {
    list.iter().map(|n| &**n).collect()
}

fn single_expr(program: &Program) -> &ExprKind {
    match &program.body[..] {
        [stmt] => match &stmt.kind {
            StmtKind::Expr(expr) => &expr.kind,
            other => panic!("expected expression statement, got {other:?}"),
        },
        other => panic!("expected one statement, got {}", other.len()),
    }
}

#[test]
fn collects_static_module_requests_in_order() {
    let program = module(
        r#"
        import a from "./a";
        import { b } from "./b";
        export * from "./c";
        import "./a";
        export { d as e } from "./d";
        "#,
    );
    assert_eq!(names(&program.module_requests), vec!["./a", "./b", "./c", "./d"]);
}

#[test]
fn collects_require_literals_including_template_holes() {
    let program = script(
        "const a = require('./a');\nconst b = `${require('./b').name}`;\nrequire(dynamic);",
    );
    assert_eq!(names(&program.require_literals), vec!["./a", "./b"]);
}

#[test]
fn reads_loading_strategy_annotation() {
    let program = module(r#"import(/* webpackMode: "eager" */ "./a");"#);
    match single_expr(&program) {
        ExprKind::DynamicImport { strategy, .. } => assert_eq!(*strategy, LoadingStrategy::Eager),
        other => panic!("unexpected {other:?}"),
    }
    assert!(program.warnings.is_empty());
}

#[test]
fn lazy_once_annotation_with_single_quotes() {
    let program = script("import(/* webpackMode: 'lazy-once' */ './a')");
    match single_expr(&program) {
        ExprKind::DynamicImport { strategy, .. } => {
            assert_eq!(*strategy, LoadingStrategy::LazyOnce);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn unknown_loading_strategy_warns_and_defaults_to_lazy() {
    let program = script(r#"import(/* webpackMode: "sometimes" */ "./a")"#);
    match single_expr(&program) {
        ExprKind::DynamicImport { strategy, .. } => assert_eq!(*strategy, LoadingStrategy::Lazy),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(program.warnings.len(), 1);
    assert!(program.warnings[0].message.contains("sometimes"));
}

#[test]
fn dynamic_import_is_not_a_static_request() {
    let program = module("import('./lazy');");
    assert!(program.module_requests.is_empty());
}

#[test]
fn automatic_semicolons_split_lines() {
    let program = script("let a = 1\nlet b = 2\na\n++b");
    assert_eq!(program.body.len(), 4);
    match &program.body[3].kind {
        StmtKind::Expr(expr) => assert!(matches!(
            expr.kind,
            ExprKind::Update { prefix: true, .. }
        )),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn return_without_value_before_newline() {
    let program = script("function f() {\n  return\n  1\n}");
    let StmtKind::Function(function) = &program.body[0].kind else {
        panic!("expected function");
    };
    let FunctionBody::Block(body) = &function.body else {
        panic!("expected block body");
    };
    assert_eq!(body[0].kind, StmtKind::Return(None));
    assert_eq!(body.len(), 2);
}

#[test]
fn arrow_functions() {
    let program = script("const f = (a, b = 2, ...rest) => a; const g = async x => { await x; };");
    let StmtKind::Var(decl) = &program.body[0].kind else {
        panic!("expected declaration");
    };
    let Some(init) = &decl.declarators[0].init else {
        panic!("expected initializer");
    };
    let ExprKind::Function(f) = &init.kind else {
        panic!("expected arrow");
    };
    assert!(f.is_arrow);
    assert_eq!(f.params.len(), 3);
    assert_eq!(f.arity(), 1);
    assert!(matches!(f.body, FunctionBody::Expr(_)));

    let StmtKind::Var(decl) = &program.body[1].kind else {
        panic!("expected declaration");
    };
    let Some(ExprKind::Function(g)) = decl.declarators[0].init.as_ref().map(|e| &e.kind) else {
        panic!("expected arrow");
    };
    assert!(g.is_async && g.is_arrow);
}

#[test]
fn parenthesized_expression_is_not_an_arrow() {
    let program = script("(a, b);");
    assert!(matches!(single_expr(&program), ExprKind::Sequence(items) if items.len() == 2));
}

#[test]
fn destructuring_declarations() {
    let program = script("const { a, b: [c, , d = 1], ...rest } = obj;");
    let StmtKind::Var(decl) = &program.body[0].kind else {
        panic!("expected declaration");
    };
    assert_eq!(decl.kind, VarKind::Const);
    let mut bound = Vec::new();
    decl.declarators[0].target.bound_names(&mut bound);
    assert_eq!(names(&bound), vec!["a", "c", "d", "rest"]);
}

#[test]
fn destructuring_assignment_converts_literal() {
    let program = script("[a, b] = [b, a];");
    match single_expr(&program) {
        ExprKind::AssignPattern { target, .. } => {
            let mut bound = Vec::new();
            target.bound_names(&mut bound);
            assert_eq!(names(&bound), vec!["a", "b"]);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn object_literal_accessors_and_methods() {
    let program = script("x = { get a() { return 1; }, set a(v) {}, b() {}, async c() {}, [k]: 1, 2: 3 };");
    let ExprKind::Assign { value, .. } = single_expr(&program) else {
        panic!("expected assignment");
    };
    let ExprKind::Object(props) = &value.kind else {
        panic!("expected object");
    };
    assert_eq!(props.len(), 6);
}

#[test]
fn precedence_and_associativity() {
    let program = script("a = 1 + 2 * 3 ** 2 ** 1;");
    let ExprKind::Assign { value, .. } = single_expr(&program) else {
        panic!("expected assignment");
    };
    let ExprKind::Binary(cbx_ir::ast::BinaryOp::Add, _, rhs) = &value.kind else {
        panic!("expected addition at the root");
    };
    assert!(matches!(
        rhs.kind,
        ExprKind::Binary(cbx_ir::ast::BinaryOp::Mul, _, _)
    ));
}

#[test]
fn for_in_and_for_of_heads() {
    let program = script("for (const k in o) {} for (let v of list) {} for (var i = 0; i < 3; i++) {}");
    assert!(matches!(program.body[0].kind, StmtKind::ForIn { .. }));
    assert!(matches!(program.body[1].kind, StmtKind::ForOf { .. }));
    assert!(matches!(program.body[2].kind, StmtKind::For { .. }));
}

#[test]
fn optional_chaining() {
    let program = script("a?.b?.[c]?.(d);");
    assert!(matches!(
        single_expr(&program),
        ExprKind::Call { optional: true, .. }
    ));
}

#[test]
fn export_forms() {
    let program = module(
        "export const a = 1;\nexport function b() {}\nexport default 42;\nexport { a as c };\nexport * as ns from './x';",
    );
    let exports: Vec<_> = program
        .body
        .iter()
        .map(|stmt| match &stmt.kind {
            StmtKind::Export(decl) => decl.clone(),
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert!(matches!(exports[0], ExportDecl::Var(_)));
    assert!(matches!(exports[1], ExportDecl::Function(_)));
    assert!(matches!(exports[2], ExportDecl::DefaultExpr(_)));
    assert!(matches!(exports[3], ExportDecl::Named { from: None, .. }));
    assert!(matches!(exports[4], ExportDecl::All { alias: Some(_), .. }));
}

#[test]
fn top_level_await_in_modules_only() {
    let program = module("const x = await p;");
    let StmtKind::Var(decl) = &program.body[0].kind else {
        panic!("expected declaration");
    };
    assert!(matches!(
        decl.declarators[0].init.as_ref().map(|e| &e.kind),
        Some(ExprKind::Await(_))
    ));

    // In a script `await` is a plain identifier, so `await p` is two expressions.
    assert!(parse("const x = await p;", ParseGoal::Script).is_err());
}

#[test]
fn import_declaration_rejected_in_scripts() {
    let err = parse("import a from './a';", ParseGoal::Script).unwrap_err();
    assert!(matches!(err.kind, ParseErrorKind::ModuleOnly(_)));
}

#[test]
fn break_outside_loop_is_an_error() {
    let err = parse("break;", ParseGoal::Script).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::OutsideLoop("break"));
}

#[test]
fn return_outside_function_in_module() {
    let err = parse("return 1;", ParseGoal::Module).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::OutsideFunction("return"));
}

#[test]
fn syntax_error_reports_span() {
    let err = parse("let a = ;", ParseGoal::Script).unwrap_err();
    assert_eq!(err.span, Span::new(8, 9));
    assert!(matches!(err.kind, ParseErrorKind::Unexpected { .. }));
}

#[test]
fn invalid_assignment_target() {
    let err = parse("1 = 2;", ParseGoal::Script).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::InvalidAssignmentTarget);
}

#[test]
fn catch_binding_is_optional() {
    let program = script("try { a(); } catch { b(); } finally { c(); }");
    let StmtKind::Try { handler, finalizer, .. } = &program.body[0].kind else {
        panic!("expected try");
    };
    assert!(handler.as_ref().is_some_and(|h| h.param.is_none()));
    assert!(finalizer.is_some());
}

#[test]
fn template_literal_with_nested_expressions() {
    let program = script("`a${b + 1}c${`d${e}`}`;");
    match single_expr(&program) {
        ExprKind::Template { quasis, exprs } => {
            assert_eq!(quasis.len(), 3);
            assert_eq!(exprs.len(), 2);
            assert!(matches!(exprs[1].kind, ExprKind::Template { .. }));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn simple_identifier_pattern() {
    let program = script("var x;");
    let StmtKind::Var(decl) = &program.body[0].kind else {
        panic!("expected declaration");
    };
    assert_eq!(decl.declarators[0].target, Pattern::Ident(Name::from("x")));
}
