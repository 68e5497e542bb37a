//! Function declarations, expressions, methods and arrows.

use std::rc::Rc;

use cbx_ir::ast::{Expr, ExprKind, Function, FunctionBody, Param, Pattern};
use cbx_ir::{Name, Punct, Span, TokenKind};

use crate::{Context, ParseError, Parser};

impl Parser<'_> {
    /// `function name(...) {...}` with the cursor on `function`.
    pub(crate) fn parse_function_declaration(
        &mut self,
        is_async: bool,
    ) -> Result<Rc<Function>, ParseError> {
        self.parse_function(is_async, true)
    }

    /// `function [name](...) {...}` with the cursor on `function`.
    pub(crate) fn parse_function_expression(
        &mut self,
        is_async: bool,
    ) -> Result<Rc<Function>, ParseError> {
        self.parse_function(is_async, false)
    }

    fn parse_function(
        &mut self,
        is_async: bool,
        name_required: bool,
    ) -> Result<Rc<Function>, ParseError> {
        let start = self.cursor.expect_word("function")?;
        if self.cursor.is_punct(Punct::Star) {
            return Err(ParseError::new(
                crate::ParseErrorKind::Unsupported("generators"),
                self.cursor.peek().span,
            ));
        }
        let name = if name_required || self.at_binding_ident() {
            Some(self.parse_binding_ident()?.0)
        } else {
            None
        };
        self.parse_function_rest(name, is_async, start)
    }

    /// Method shorthand or accessor with the cursor on `(`.
    pub(crate) fn parse_method(
        &mut self,
        name: Option<Name>,
        is_async: bool,
    ) -> Result<Rc<Function>, ParseError> {
        let start = self.cursor.peek().span;
        self.parse_function_rest(name, is_async, start)
    }

    /// Context of a fresh function body.
    fn function_context(is_async: bool) -> Context {
        Context {
            in_function: true,
            in_async: is_async,
            in_loop: false,
            no_in: false,
        }
    }

    fn parse_function_rest(
        &mut self,
        name: Option<Name>,
        is_async: bool,
        start: Span,
    ) -> Result<Rc<Function>, ParseError> {
        self.with_context(Self::function_context(is_async), |p| {
            p.cursor.expect_punct(Punct::LParen)?;
            let params = p.parse_params()?;
            let body = p.parse_block_body()?;
            Ok(Rc::new(Function {
                name,
                params,
                body: FunctionBody::Block(body),
                is_arrow: false,
                is_async,
                span: start.to(p.cursor.prev_span()),
            }))
        })
    }

    /// Parameters after the opening `(`, through the closing `)`.
    fn parse_params(&mut self) -> Result<Vec<Param>, ParseError> {
        let mut params = Vec::new();
        while !self.cursor.is_punct(Punct::RParen) {
            if self.cursor.eat_punct(Punct::Ellipsis) {
                let pattern = self.parse_binding_pattern()?;
                params.push(Param {
                    pattern,
                    default: None,
                    rest: true,
                });
                self.cursor.eat_punct(Punct::Comma);
                break;
            }
            let pattern = self.parse_binding_pattern()?;
            let default = if self.cursor.eat_punct(Punct::Eq) {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            params.push(Param {
                pattern,
                default,
                rest: false,
            });
            if !self.cursor.eat_punct(Punct::Comma) {
                break;
            }
        }
        self.cursor.expect_punct(Punct::RParen)?;
        Ok(params)
    }

    /// Parse an arrow function if one starts here.
    ///
    /// Recognized heads: `x =>`, `(…) =>`, `async x =>` and `async (…) =>`.
    /// The lookahead only matches brackets, so nothing is consumed unless an
    /// arrow is certain.
    pub(crate) fn try_parse_arrow(&mut self) -> Result<Option<Expr>, ParseError> {
        let start = self.cursor.peek().span;
        let is_async = self.cursor.is_word("async")
            && !self.cursor.nth(1).newline_before
            && (self.cursor.is_punct_at(1, Punct::LParen)
                || matches!(self.cursor.nth(1).kind, TokenKind::Ident(_)));
        let head = usize::from(is_async);

        let single_param = matches!(&self.cursor.nth(head).kind, TokenKind::Ident(_))
            && self.cursor.is_punct_at(head + 1, Punct::Arrow)
            && !self.cursor.nth(head + 1).newline_before;
        let paren_params = self.cursor.is_punct_at(head, Punct::LParen) && {
            let open = self.cursor.position() + head;
            self.cursor.matching_close(open).is_some_and(|close| {
                let arrow = self.cursor.at(close + 1);
                arrow.kind.is_punct(Punct::Arrow) && !arrow.newline_before
            })
        };
        if !single_param && !paren_params {
            return Ok(None);
        }

        if is_async {
            self.cursor.bump();
        }
        let ctx = Context {
            in_loop: false,
            ..Self::function_context(is_async)
        };
        let no_in = self.ctx.no_in;
        let arrow = self.with_context(ctx, |p| {
            let params = if single_param {
                let (name, _) = p.parse_binding_ident()?;
                vec![Param {
                    pattern: Pattern::Ident(name),
                    default: None,
                    rest: false,
                }]
            } else {
                p.cursor.expect_punct(Punct::LParen)?;
                p.parse_params()?
            };
            p.cursor.expect_punct(Punct::Arrow)?;
            let body = if p.cursor.is_punct(Punct::LBrace) {
                FunctionBody::Block(p.parse_block_body()?)
            } else {
                p.ctx.no_in = no_in;
                FunctionBody::Expr(Box::new(p.parse_assignment()?))
            };
            Ok(Function {
                name: None,
                params,
                body,
                is_arrow: true,
                is_async,
                span: start.to(p.cursor.prev_span()),
            })
        })?;
        let span = arrow.span;
        Ok(Some(Expr::new(ExprKind::Function(Rc::new(arrow)), span)))
    }
}
