//! Script syntax tree.
//!
//! Nodes own their children directly (`Box`/`Vec`); function bodies sit
//! behind `Rc` so closures created at runtime can share them without
//! cloning the tree.

use std::fmt;
use std::rc::Rc;

use crate::{Name, Span};

/// Which grammar a source text was parsed with.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ParseGoal {
    /// Eagerly evaluated script; `return` is allowed at top level because
    /// the body runs as a function.
    Script,
    /// Linked module; `import`/`export` and top-level `await` allowed.
    Module,
}

/// A parsed source text.
#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub goal: ParseGoal,
    pub body: Vec<Stmt>,
    /// Static module requests (`import … from`, `export … from`) in source
    /// order, without duplicates.
    pub module_requests: Vec<Name>,
    /// String-literal arguments of `require(...)` calls, in source order.
    pub require_literals: Vec<Name>,
    /// Non-fatal findings, e.g. an unknown loading-strategy annotation.
    pub warnings: Vec<ParseWarning>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParseWarning {
    pub message: String,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    Var(VarDecl),
    Function(Rc<Function>),
    Expr(Expr),
    Block(Vec<Stmt>),
    If {
        test: Expr,
        consequent: Box<Stmt>,
        alternate: Option<Box<Stmt>>,
    },
    While {
        test: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        test: Expr,
    },
    For {
        init: Option<ForInit>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },
    ForOf {
        binding: ForBinding,
        iterable: Expr,
        body: Box<Stmt>,
    },
    ForIn {
        binding: ForBinding,
        object: Expr,
        body: Box<Stmt>,
    },
    Break,
    Continue,
    Return(Option<Expr>),
    Throw(Expr),
    Try {
        block: Vec<Stmt>,
        handler: Option<CatchClause>,
        finalizer: Option<Vec<Stmt>>,
    },
    Import(ImportDecl),
    Export(ExportDecl),
    Empty,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VarKind {
    Var,
    Let,
    Const,
}

impl VarKind {
    #[inline]
    pub fn is_lexical(self) -> bool {
        !matches!(self, VarKind::Var)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct VarDecl {
    pub kind: VarKind,
    pub declarators: Vec<Declarator>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Declarator {
    pub target: Pattern,
    pub init: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ForInit {
    Var(VarDecl),
    Expr(Expr),
}

/// Left-hand side of `for … of` / `for … in`.
#[derive(Clone, Debug, PartialEq)]
pub enum ForBinding {
    Decl(VarKind, Pattern),
    Target(Expr),
}

#[derive(Clone, Debug, PartialEq)]
pub struct CatchClause {
    pub param: Option<Pattern>,
    pub body: Vec<Stmt>,
}

/// Binding pattern for declarations and parameters.
#[derive(Clone, Debug, PartialEq)]
pub enum Pattern {
    Ident(Name),
    Object {
        props: Vec<ObjectPatternProp>,
        rest: Option<Name>,
    },
    Array {
        elements: Vec<Option<PatternElement>>,
        rest: Option<Box<Pattern>>,
    },
}

impl Pattern {
    /// Every identifier this pattern binds, in source order.
    pub fn bound_names(&self, out: &mut Vec<Name>) {
        match self {
            Pattern::Ident(name) => out.push(name.clone()),
            Pattern::Object { props, rest } => {
                for prop in props {
                    prop.value.bound_names(out);
                }
                if let Some(rest) = rest {
                    out.push(rest.clone());
                }
            }
            Pattern::Array { elements, rest } => {
                for element in elements.iter().flatten() {
                    element.pattern.bound_names(out);
                }
                if let Some(rest) = rest {
                    rest.bound_names(out);
                }
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ObjectPatternProp {
    pub key: PropKey,
    pub value: Pattern,
    pub default: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PatternElement {
    pub pattern: Pattern,
    pub default: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Function {
    pub name: Option<Name>,
    pub params: Vec<Param>,
    pub body: FunctionBody,
    pub is_arrow: bool,
    pub is_async: bool,
    pub span: Span,
}

impl Function {
    /// Number of parameters before the first default or rest parameter;
    /// what script code observes as `fn.length`.
    pub fn arity(&self) -> usize {
        self.params
            .iter()
            .take_while(|p| p.default.is_none() && !p.rest)
            .count()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub pattern: Pattern,
    pub default: Option<Expr>,
    pub rest: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FunctionBody {
    Block(Vec<Stmt>),
    /// Concise arrow body.
    Expr(Box<Expr>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    #[inline]
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr { kind, span }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Number(f64),
    Str(Name),
    Template {
        quasis: Vec<Name>,
        exprs: Vec<Expr>,
    },
    Bool(bool),
    Null,
    Undefined,
    Ident(Name),
    This,
    Array(Vec<ArrayElement>),
    Object(Vec<PropertyDef>),
    Function(Rc<Function>),
    Unary(UnaryOp, Box<Expr>),
    Update {
        increment: bool,
        prefix: bool,
        target: Box<Expr>,
    },
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Logical(LogicalOp, Box<Expr>, Box<Expr>),
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    /// Destructuring assignment `[a, b] = …` / `({ a } = …)`.
    AssignPattern {
        target: Pattern,
        value: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<ArrayElement>,
        optional: bool,
    },
    New {
        callee: Box<Expr>,
        args: Vec<ArrayElement>,
    },
    Member {
        object: Box<Expr>,
        property: MemberProp,
        optional: bool,
    },
    DynamicImport {
        specifier: Box<Expr>,
        strategy: LoadingStrategy,
    },
    ImportMeta,
    Await(Box<Expr>),
    Sequence(Vec<Expr>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum MemberProp {
    Named(Name),
    Computed(Box<Expr>),
}

/// Element of an array literal or argument list.
#[derive(Clone, Debug, PartialEq)]
pub enum ArrayElement {
    Expr(Expr),
    Spread(Expr),
    Hole,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PropKey {
    Named(Name),
    Computed(Box<Expr>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum PropertyDef {
    KeyValue(PropKey, Expr),
    Shorthand(Name),
    Getter(PropKey, Rc<Function>),
    Setter(PropKey, Rc<Function>),
    Spread(Expr),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
    Typeof,
    Void,
    Delete,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Exp,
    LooseEq,
    LooseNotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
    In,
    InstanceOf,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Arith(BinaryOp),
    Logical(LogicalOp),
}

/// Hint attached to a dynamic import telling a bundler how to chunk the
/// target. The harness resolves every strategy identically.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum LoadingStrategy {
    #[default]
    Lazy,
    LazyOnce,
    Eager,
    Weak,
}

impl LoadingStrategy {
    /// Parse the value of a `webpackMode` annotation.
    pub fn from_annotation(value: &str) -> Option<Self> {
        match value {
            "lazy" => Some(LoadingStrategy::Lazy),
            "lazy-once" => Some(LoadingStrategy::LazyOnce),
            "eager" => Some(LoadingStrategy::Eager),
            "weak" => Some(LoadingStrategy::Weak),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LoadingStrategy::Lazy => "lazy",
            LoadingStrategy::LazyOnce => "lazy-once",
            LoadingStrategy::Eager => "eager",
            LoadingStrategy::Weak => "weak",
        }
    }
}

impl fmt::Display for LoadingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImportDecl {
    pub specifier: Name,
    pub default: Option<Name>,
    pub namespace: Option<Name>,
    pub named: Vec<ImportName>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImportName {
    pub imported: Name,
    pub local: Name,
}

/// Binding name used for an anonymous `export default`.
pub const DEFAULT_EXPORT_BINDING: &str = "*default*";

#[derive(Clone, Debug, PartialEq)]
pub enum ExportDecl {
    Var(VarDecl),
    Function(Rc<Function>),
    /// `export default <expr>`; the value lands in [`DEFAULT_EXPORT_BINDING`].
    DefaultExpr(Expr),
    /// `export default function …`; hoisted under its own name when it has
    /// one, else under [`DEFAULT_EXPORT_BINDING`].
    DefaultFunction(Rc<Function>),
    Named {
        specifiers: Vec<ExportName>,
        from: Option<Name>,
    },
    All {
        from: Name,
        alias: Option<Name>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExportName {
    pub local: Name,
    pub exported: Name,
}

#[cfg(test)]
mod tests;
