//! Statements.

use cbx_ir::ast::{
    CatchClause, Declarator, ForBinding, ForInit, ParseGoal, Stmt, StmtKind, VarDecl, VarKind,
};
use cbx_ir::{Punct, TokenKind};
use cbx_stack::ensure_sufficient_stack;

use crate::{Context, ParseError, ParseErrorKind, Parser};

impl Parser<'_> {
    /// Parse one statement. `top_level` permits module declarations.
    pub(crate) fn parse_statement(&mut self, top_level: bool) -> Result<Stmt, ParseError> {
        ensure_sufficient_stack(|| self.parse_statement_inner(top_level))
    }

    fn parse_statement_inner(&mut self, top_level: bool) -> Result<Stmt, ParseError> {
        let token = self.cursor.peek();
        let start = token.span;

        if let TokenKind::Punct(punct) = &token.kind {
            match punct {
                Punct::LBrace => {
                    let body = self.parse_block_body()?;
                    return Ok(self.finish(StmtKind::Block(body), start));
                }
                Punct::Semi => {
                    self.cursor.bump();
                    return Ok(self.finish(StmtKind::Empty, start));
                }
                _ => return self.parse_expression_statement(),
            }
        }

        let kind = match token.kind.ident() {
            Some("var") => {
                self.cursor.bump();
                StmtKind::Var(self.parse_var_decl_and_semi(VarKind::Var)?)
            }
            Some("let") if self.let_starts_declaration() => {
                self.cursor.bump();
                StmtKind::Var(self.parse_var_decl_and_semi(VarKind::Let)?)
            }
            Some("const") => {
                self.cursor.bump();
                StmtKind::Var(self.parse_var_decl_and_semi(VarKind::Const)?)
            }
            Some("function") => StmtKind::Function(self.parse_function_declaration(false)?),
            Some("async")
                if self.cursor.is_word_at(1, "function") && !self.cursor.nth(1).newline_before =>
            {
                self.cursor.bump();
                StmtKind::Function(self.parse_function_declaration(true)?)
            }
            Some("if") => self.parse_if()?,
            Some("for") => self.parse_for()?,
            Some("while") => self.parse_while()?,
            Some("do") => self.parse_do_while()?,
            Some("return") => self.parse_return()?,
            Some("break" | "continue") => self.parse_jump()?,
            Some("throw") => {
                self.cursor.bump();
                let value = self.parse_expression()?;
                self.consume_semicolon()?;
                StmtKind::Throw(value)
            }
            Some("try") => self.parse_try()?,
            Some("import")
                if !self.cursor.is_punct_at(1, Punct::LParen)
                    && !self.cursor.is_punct_at(1, Punct::Dot) =>
            {
                self.require_module_item("`import` declarations", top_level)?;
                StmtKind::Import(self.parse_import_decl()?)
            }
            Some("export") => {
                self.require_module_item("`export` declarations", top_level)?;
                StmtKind::Export(self.parse_export_decl()?)
            }
            Some("class") => {
                return Err(ParseError::new(ParseErrorKind::Unsupported("classes"), start))
            }
            Some("switch") => {
                return Err(ParseError::new(
                    ParseErrorKind::Unsupported("switch statements"),
                    start,
                ))
            }
            _ => return self.parse_expression_statement(),
        };
        Ok(self.finish(kind, start))
    }

    fn finish(&self, kind: StmtKind, start: cbx_ir::Span) -> Stmt {
        Stmt {
            kind,
            span: start.to(self.cursor.prev_span()),
        }
    }

    fn require_module_item(&self, what: &'static str, top_level: bool) -> Result<(), ParseError> {
        if self.goal == ParseGoal::Module && top_level {
            Ok(())
        } else {
            Err(ParseError::new(
                ParseErrorKind::ModuleOnly(what),
                self.cursor.peek().span,
            ))
        }
    }

    fn parse_expression_statement(&mut self) -> Result<Stmt, ParseError> {
        let start = self.cursor.peek().span;
        let expr = self.parse_expression()?;
        self.consume_semicolon()?;
        Ok(self.finish(StmtKind::Expr(expr), start))
    }

    /// `{ statements }`
    pub(crate) fn parse_block_body(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.cursor.expect_punct(Punct::LBrace)?;
        let mut body = Vec::new();
        while !self.cursor.is_punct(Punct::RBrace) {
            if self.cursor.at_eof() {
                return Err(self.cursor.unexpected("`}`"));
            }
            body.push(self.parse_statement(false)?);
        }
        self.cursor.bump();
        Ok(body)
    }

    fn let_starts_declaration(&self) -> bool {
        let next = &self.cursor.nth(1).kind;
        next.is_punct(Punct::LBracket)
            || next.is_punct(Punct::LBrace)
            || next.ident().is_some_and(|n| !crate::grammar::is_reserved(n))
    }

    fn parse_var_decl_and_semi(&mut self, kind: VarKind) -> Result<VarDecl, ParseError> {
        let decl = self.parse_var_declarators(kind)?;
        self.consume_semicolon()?;
        Ok(decl)
    }

    /// Declarators after the `var`/`let`/`const` keyword.
    pub(crate) fn parse_var_declarators(&mut self, kind: VarKind) -> Result<VarDecl, ParseError> {
        let mut declarators = Vec::new();
        loop {
            let target = self.parse_binding_pattern()?;
            let init = if self.cursor.eat_punct(Punct::Eq) {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            declarators.push(Declarator { target, init });
            if !self.cursor.eat_punct(Punct::Comma) {
                break;
            }
        }
        Ok(VarDecl { kind, declarators })
    }

    fn parse_if(&mut self) -> Result<StmtKind, ParseError> {
        self.cursor.bump();
        self.cursor.expect_punct(Punct::LParen)?;
        let test = self.parse_expression()?;
        self.cursor.expect_punct(Punct::RParen)?;
        let consequent = Box::new(self.parse_statement(false)?);
        let alternate = if self.cursor.eat_word("else") {
            Some(Box::new(self.parse_statement(false)?))
        } else {
            None
        };
        Ok(StmtKind::If {
            test,
            consequent,
            alternate,
        })
    }

    fn parse_loop_body(&mut self) -> Result<Box<cbx_ir::ast::Stmt>, ParseError> {
        let ctx = Context {
            in_loop: true,
            ..self.ctx
        };
        self.with_context(ctx, |p| p.parse_statement(false).map(Box::new))
    }

    fn parse_while(&mut self) -> Result<StmtKind, ParseError> {
        self.cursor.bump();
        self.cursor.expect_punct(Punct::LParen)?;
        let test = self.parse_expression()?;
        self.cursor.expect_punct(Punct::RParen)?;
        let body = self.parse_loop_body()?;
        Ok(StmtKind::While { test, body })
    }

    fn parse_do_while(&mut self) -> Result<StmtKind, ParseError> {
        self.cursor.bump();
        let body = self.parse_loop_body()?;
        self.cursor.expect_word("while")?;
        self.cursor.expect_punct(Punct::LParen)?;
        let test = self.parse_expression()?;
        self.cursor.expect_punct(Punct::RParen)?;
        self.cursor.eat_punct(Punct::Semi);
        Ok(StmtKind::DoWhile { body, test })
    }

    fn parse_for(&mut self) -> Result<StmtKind, ParseError> {
        self.cursor.bump();
        self.cursor.expect_punct(Punct::LParen)?;

        let head_ctx = Context {
            no_in: true,
            ..self.ctx
        };

        let decl_kind = match self.cursor.kind().ident() {
            Some("var") => Some(VarKind::Var),
            Some("let") if self.let_starts_declaration() => Some(VarKind::Let),
            Some("const") => Some(VarKind::Const),
            _ => None,
        };

        let init = if let Some(kind) = decl_kind {
            self.cursor.bump();
            let target = self.parse_binding_pattern()?;
            if let Some(stmt) = self.parse_for_in_of(ForBinding::Decl(kind, target.clone()))? {
                return Ok(stmt);
            }
            let first_init = if self.cursor.eat_punct(Punct::Eq) {
                Some(self.with_context(head_ctx, Parser::parse_assignment)?)
            } else {
                None
            };
            let mut decl = VarDecl {
                kind,
                declarators: vec![Declarator {
                    target,
                    init: first_init,
                }],
            };
            if self.cursor.eat_punct(Punct::Comma) {
                let rest = self.with_context(head_ctx, |p| p.parse_var_declarators(kind))?;
                decl.declarators.extend(rest.declarators);
            }
            Some(ForInit::Var(decl))
        } else if self.cursor.is_punct(Punct::Semi) {
            None
        } else {
            let expr = self.with_context(head_ctx, Parser::parse_expression)?;
            if let Some(stmt) = self.parse_for_in_of(ForBinding::Target(expr.clone()))? {
                return Ok(stmt);
            }
            Some(ForInit::Expr(expr))
        };

        self.cursor.expect_punct(Punct::Semi)?;
        let test = if self.cursor.is_punct(Punct::Semi) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.cursor.expect_punct(Punct::Semi)?;
        let update = if self.cursor.is_punct(Punct::RParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.cursor.expect_punct(Punct::RParen)?;
        let body = self.parse_loop_body()?;
        Ok(StmtKind::For {
            init,
            test,
            update,
            body,
        })
    }

    /// Finish a `for (<binding> of|in …)` head if one follows.
    fn parse_for_in_of(&mut self, binding: ForBinding) -> Result<Option<StmtKind>, ParseError> {
        let is_of = self.cursor.is_word("of");
        let is_in = self.cursor.is_word("in");
        if !is_of && !is_in {
            return Ok(None);
        }
        if let ForBinding::Target(target) = &binding {
            self.check_assignment_target(target)?;
        }
        self.cursor.bump();
        let source = if is_of {
            self.parse_assignment()?
        } else {
            self.parse_expression()?
        };
        self.cursor.expect_punct(Punct::RParen)?;
        let body = self.parse_loop_body()?;
        Ok(Some(if is_of {
            StmtKind::ForOf {
                binding,
                iterable: source,
                body,
            }
        } else {
            StmtKind::ForIn {
                binding,
                object: source,
                body,
            }
        }))
    }

    fn parse_return(&mut self) -> Result<StmtKind, ParseError> {
        let span = self.cursor.bump().span;
        if !self.ctx.in_function {
            return Err(ParseError::new(ParseErrorKind::OutsideFunction("return"), span));
        }
        let next = self.cursor.peek();
        let value = if next.newline_before
            || next.kind.is_punct(Punct::Semi)
            || next.kind.is_punct(Punct::RBrace)
            || matches!(next.kind, TokenKind::Eof)
        {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume_semicolon()?;
        Ok(StmtKind::Return(value))
    }

    fn parse_jump(&mut self) -> Result<StmtKind, ParseError> {
        let token = self.cursor.bump();
        let is_break = token.kind.ident() == Some("break");
        if !self.ctx.in_loop {
            let word = if is_break { "break" } else { "continue" };
            return Err(ParseError::new(ParseErrorKind::OutsideLoop(word), token.span));
        }
        self.consume_semicolon()?;
        Ok(if is_break {
            StmtKind::Break
        } else {
            StmtKind::Continue
        })
    }

    fn parse_try(&mut self) -> Result<StmtKind, ParseError> {
        self.cursor.bump();
        let block = self.parse_block_body()?;
        let handler = if self.cursor.eat_word("catch") {
            let param = if self.cursor.eat_punct(Punct::LParen) {
                let pattern = self.parse_binding_pattern()?;
                self.cursor.expect_punct(Punct::RParen)?;
                Some(pattern)
            } else {
                None
            };
            let body = self.parse_block_body()?;
            Some(CatchClause { param, body })
        } else {
            None
        };
        let finalizer = if self.cursor.eat_word("finally") {
            Some(self.parse_block_body()?)
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            return Err(self.cursor.unexpected("`catch` or `finally`"));
        }
        Ok(StmtKind::Try {
            block,
            handler,
            finalizer,
        })
    }
}
