//! Recursive-descent parser for casebox scripts and modules.
//!
//! # Architecture
//!
//! - [`cursor`]: token navigation and lookahead
//! - [`grammar`]: statements, expressions, functions, patterns and module
//!   declarations, one file each
//!
//! Expressions use precedence climbing; every recursive entry point is
//! wrapped in [`cbx_stack::ensure_sufficient_stack`]. Automatic semicolon
//! insertion follows the newline flag the lexer records on each token.

mod cursor;
mod error;
mod grammar;

use cbx_ir::ast::{ParseGoal, ParseWarning, Program};
use cbx_ir::{Name, Span, TokenList};

pub use error::{ParseError, ParseErrorKind};

use cursor::Cursor;

/// Parse `source` under the given goal.
pub fn parse(source: &str, goal: ParseGoal) -> Result<Program, ParseError> {
    let tokens = cbx_lexer::lex(source)?;
    let mut parser = Parser::new(source, 0, &tokens, goal);
    let program = parser.parse_program()?;
    tracing::trace!(
        ?goal,
        statements = program.body.len(),
        requests = program.module_requests.len(),
        "parsed program"
    );
    Ok(program)
}

/// What the surrounding syntax allows at the current position.
#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct Context {
    /// `return` is allowed.
    in_function: bool,
    /// `await` is an operator rather than an identifier.
    in_async: bool,
    /// `break`/`continue` are allowed.
    in_loop: bool,
    /// The `in` operator is disabled (head of a `for` statement).
    no_in: bool,
}

pub(crate) struct Parser<'a> {
    source: &'a str,
    /// Absolute offset of `source` within the file; non-zero for template holes.
    offset: u32,
    cursor: Cursor<'a>,
    goal: ParseGoal,
    ctx: Context,
    module_requests: Vec<Name>,
    require_literals: Vec<Name>,
    warnings: Vec<ParseWarning>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, offset: u32, tokens: &'a TokenList, goal: ParseGoal) -> Self {
        Parser {
            source,
            offset,
            cursor: Cursor::new(tokens),
            goal,
            ctx: Context {
                // Scripts run as a function body, modules allow top-level await.
                in_function: goal == ParseGoal::Script,
                in_async: goal == ParseGoal::Module,
                in_loop: false,
                no_in: false,
            },
            module_requests: Vec::new(),
            require_literals: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn parse_program(&mut self) -> Result<Program, ParseError> {
        let start = self.cursor.peek().span;
        let mut body = Vec::new();
        while !self.cursor.at_eof() {
            body.push(self.parse_statement(true)?);
        }
        let span = start.to(self.cursor.peek().span);
        Ok(Program {
            goal: self.goal,
            body,
            module_requests: std::mem::take(&mut self.module_requests),
            require_literals: std::mem::take(&mut self.require_literals),
            warnings: std::mem::take(&mut self.warnings),
            span,
        })
    }

    /// Run `f` with a modified context, restoring the previous one after.
    fn with_context<T>(
        &mut self,
        ctx: Context,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        let saved = std::mem::replace(&mut self.ctx, ctx);
        let result = f(self);
        self.ctx = saved;
        result
    }

    fn record_request(&mut self, specifier: &Name) {
        if !self.module_requests.iter().any(|r| r == specifier) {
            self.module_requests.push(specifier.clone());
        }
    }

    fn warn(&mut self, message: String, span: Span) {
        self.warnings.push(ParseWarning { message, span });
    }

    /// Text of an absolute span, if it lies within this parser's source.
    fn slice(&self, span: Span) -> Option<&'a str> {
        let start = span.start.checked_sub(self.offset)? as usize;
        let end = span.end.checked_sub(self.offset)? as usize;
        self.source.get(start..end)
    }
}

#[cfg(test)]
mod tests;
