//! Expressions.
//!
//! Binary operators use precedence climbing over the table in
//! [`infix_operator`]; everything above it is ordinary recursive descent.

use cbx_ir::ast::{
    ArrayElement, AssignOp, BinaryOp, Expr, ExprKind, LoadingStrategy, LogicalOp, MemberProp,
    PropKey, PropertyDef, UnaryOp,
};
use cbx_ir::{Name, Punct, TemplateLit, TokenKind};
use cbx_stack::ensure_sufficient_stack;

use crate::{Context, ParseError, ParseErrorKind, Parser};

#[derive(Copy, Clone)]
enum Infix {
    Binary(BinaryOp),
    Logical(LogicalOp),
}

/// Binding power of an infix operator; higher binds tighter.
fn infix_operator(kind: &TokenKind, no_in: bool) -> Option<(u8, Infix)> {
    use Infix::{Binary, Logical};
    let op = match kind {
        TokenKind::Punct(p) => match p {
            Punct::QuestionQuestion => (1, Logical(LogicalOp::Nullish)),
            Punct::PipePipe => (2, Logical(LogicalOp::Or)),
            Punct::AmpAmp => (3, Logical(LogicalOp::And)),
            Punct::Pipe => (4, Binary(BinaryOp::BitOr)),
            Punct::Caret => (5, Binary(BinaryOp::BitXor)),
            Punct::Amp => (6, Binary(BinaryOp::BitAnd)),
            Punct::EqEq => (7, Binary(BinaryOp::LooseEq)),
            Punct::NotEq => (7, Binary(BinaryOp::LooseNotEq)),
            Punct::EqEqEq => (7, Binary(BinaryOp::StrictEq)),
            Punct::NotEqEq => (7, Binary(BinaryOp::StrictNotEq)),
            Punct::Lt => (8, Binary(BinaryOp::Lt)),
            Punct::Gt => (8, Binary(BinaryOp::Gt)),
            Punct::LtEq => (8, Binary(BinaryOp::LtEq)),
            Punct::GtEq => (8, Binary(BinaryOp::GtEq)),
            Punct::Shl => (9, Binary(BinaryOp::Shl)),
            Punct::Shr => (9, Binary(BinaryOp::Shr)),
            Punct::UShr => (9, Binary(BinaryOp::UShr)),
            Punct::Plus => (10, Binary(BinaryOp::Add)),
            Punct::Minus => (10, Binary(BinaryOp::Sub)),
            Punct::Star => (11, Binary(BinaryOp::Mul)),
            Punct::Slash => (11, Binary(BinaryOp::Div)),
            Punct::Percent => (11, Binary(BinaryOp::Rem)),
            Punct::StarStar => (12, Binary(BinaryOp::Exp)),
            _ => return None,
        },
        TokenKind::Ident(word) => match &**word {
            "instanceof" => (8, Binary(BinaryOp::InstanceOf)),
            "in" if !no_in => (8, Binary(BinaryOp::In)),
            _ => return None,
        },
        _ => return None,
    };
    Some(op)
}

fn assignment_operator(kind: &TokenKind) -> Option<AssignOp> {
    let TokenKind::Punct(p) = kind else {
        return None;
    };
    let op = match p {
        Punct::Eq => AssignOp::Assign,
        Punct::PlusEq => AssignOp::Arith(BinaryOp::Add),
        Punct::MinusEq => AssignOp::Arith(BinaryOp::Sub),
        Punct::StarEq => AssignOp::Arith(BinaryOp::Mul),
        Punct::StarStarEq => AssignOp::Arith(BinaryOp::Exp),
        Punct::SlashEq => AssignOp::Arith(BinaryOp::Div),
        Punct::PercentEq => AssignOp::Arith(BinaryOp::Rem),
        Punct::AmpEq => AssignOp::Arith(BinaryOp::BitAnd),
        Punct::PipeEq => AssignOp::Arith(BinaryOp::BitOr),
        Punct::CaretEq => AssignOp::Arith(BinaryOp::BitXor),
        Punct::ShlEq => AssignOp::Arith(BinaryOp::Shl),
        Punct::ShrEq => AssignOp::Arith(BinaryOp::Shr),
        Punct::UShrEq => AssignOp::Arith(BinaryOp::UShr),
        Punct::AmpAmpEq => AssignOp::Logical(LogicalOp::And),
        Punct::PipePipeEq => AssignOp::Logical(LogicalOp::Or),
        Punct::QuestionQuestionEq => AssignOp::Logical(LogicalOp::Nullish),
        _ => return None,
    };
    Some(op)
}

/// Canonical property key for a numeric literal (`1.0` and `1` name the same slot).
pub(crate) fn number_key(n: f64) -> Name {
    if n.fract() == 0.0 && n.abs() < 1e21 {
        Name::from(format!("{}", n as i64))
    } else {
        Name::from(n.to_string())
    }
}

impl Parser<'_> {
    /// Comma-separated expression sequence.
    pub(crate) fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        let first = self.parse_assignment()?;
        if !self.cursor.is_punct(Punct::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.cursor.eat_punct(Punct::Comma) {
            items.push(self.parse_assignment()?);
        }
        let span = items[0].span.to(self.cursor.prev_span());
        Ok(Expr::new(ExprKind::Sequence(items), span))
    }

    /// Parse an expression with the `in` operator re-enabled.
    fn parse_expression_allow_in(&mut self) -> Result<Expr, ParseError> {
        let ctx = Context {
            no_in: false,
            ..self.ctx
        };
        self.with_context(ctx, Parser::parse_expression)
    }

    pub(crate) fn parse_assignment(&mut self) -> Result<Expr, ParseError> {
        ensure_sufficient_stack(|| self.parse_assignment_inner())
    }

    fn parse_assignment_inner(&mut self) -> Result<Expr, ParseError> {
        if let Some(arrow) = self.try_parse_arrow()? {
            return Ok(arrow);
        }

        let lhs = self.parse_conditional()?;
        let Some(op) = assignment_operator(self.cursor.kind()) else {
            return Ok(lhs);
        };
        self.cursor.bump();

        if op == AssignOp::Assign && matches!(lhs.kind, ExprKind::Array(_) | ExprKind::Object(_)) {
            let span = lhs.span;
            let target = self.expr_to_pattern(lhs)?;
            let value = self.parse_assignment()?;
            let span = span.to(value.span);
            return Ok(Expr::new(
                ExprKind::AssignPattern {
                    target,
                    value: Box::new(value),
                },
                span,
            ));
        }

        self.check_assignment_target(&lhs)?;
        let value = self.parse_assignment()?;
        let span = lhs.span.to(value.span);
        Ok(Expr::new(
            ExprKind::Assign {
                op,
                target: Box::new(lhs),
                value: Box::new(value),
            },
            span,
        ))
    }

    pub(crate) fn check_assignment_target(&self, expr: &Expr) -> Result<(), ParseError> {
        match &expr.kind {
            ExprKind::Ident(_) | ExprKind::Member { optional: false, .. } => Ok(()),
            _ => Err(ParseError::new(
                ParseErrorKind::InvalidAssignmentTarget,
                expr.span,
            )),
        }
    }

    fn parse_conditional(&mut self) -> Result<Expr, ParseError> {
        let test = self.parse_binary(1)?;
        if !self.cursor.eat_punct(Punct::Question) {
            return Ok(test);
        }
        let ctx = Context {
            no_in: false,
            ..self.ctx
        };
        let consequent = self.with_context(ctx, Parser::parse_assignment)?;
        self.cursor.expect_punct(Punct::Colon)?;
        let alternate = self.parse_assignment()?;
        let span = test.span.to(alternate.span);
        Ok(Expr::new(
            ExprKind::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            },
            span,
        ))
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        while let Some((prec, op)) = infix_operator(self.cursor.kind(), self.ctx.no_in) {
            if prec < min_prec {
                break;
            }
            self.cursor.bump();
            let right_assoc = matches!(op, Infix::Binary(BinaryOp::Exp));
            let right = self.parse_binary(if right_assoc { prec } else { prec + 1 })?;
            let span = left.span.to(right.span);
            let kind = match op {
                Infix::Binary(op) => ExprKind::Binary(op, Box::new(left), Box::new(right)),
                Infix::Logical(op) => ExprKind::Logical(op, Box::new(left), Box::new(right)),
            };
            left = Expr::new(kind, span);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let token = self.cursor.peek();
        let op = match &token.kind {
            TokenKind::Punct(Punct::Bang) => Some(UnaryOp::Not),
            TokenKind::Punct(Punct::Minus) => Some(UnaryOp::Neg),
            TokenKind::Punct(Punct::Plus) => Some(UnaryOp::Plus),
            TokenKind::Punct(Punct::Tilde) => Some(UnaryOp::BitNot),
            TokenKind::Ident(word) => match &**word {
                "typeof" => Some(UnaryOp::Typeof),
                "void" => Some(UnaryOp::Void),
                "delete" => Some(UnaryOp::Delete),
                _ => None,
            },
            _ => None,
        };
        if let Some(op) = op {
            self.cursor.bump();
            let operand = ensure_sufficient_stack(|| self.parse_unary())?;
            let span = token.span.to(operand.span);
            return Ok(Expr::new(ExprKind::Unary(op, Box::new(operand)), span));
        }

        if token.kind.is_punct(Punct::PlusPlus) || token.kind.is_punct(Punct::MinusMinus) {
            self.cursor.bump();
            let target = ensure_sufficient_stack(|| self.parse_unary())?;
            self.check_assignment_target(&target)?;
            let span = token.span.to(target.span);
            return Ok(Expr::new(
                ExprKind::Update {
                    increment: token.kind.is_punct(Punct::PlusPlus),
                    prefix: true,
                    target: Box::new(target),
                },
                span,
            ));
        }

        if token.kind.ident() == Some("await") && self.ctx.in_async {
            self.cursor.bump();
            let operand = ensure_sufficient_stack(|| self.parse_unary())?;
            let span = token.span.to(operand.span);
            return Ok(Expr::new(ExprKind::Await(Box::new(operand)), span));
        }

        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_lhs()?;
        let token = self.cursor.peek();
        let is_update =
            token.kind.is_punct(Punct::PlusPlus) || token.kind.is_punct(Punct::MinusMinus);
        if !is_update || token.newline_before {
            return Ok(expr);
        }
        self.check_assignment_target(&expr)?;
        self.cursor.bump();
        let span = expr.span.to(token.span);
        Ok(Expr::new(
            ExprKind::Update {
                increment: token.kind.is_punct(Punct::PlusPlus),
                prefix: false,
                target: Box::new(expr),
            },
            span,
        ))
    }

    /// Member accesses, calls and `new`.
    fn parse_lhs(&mut self) -> Result<Expr, ParseError> {
        let mut expr = if self.cursor.is_word("new") {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };

        loop {
            let token = self.cursor.peek();
            match &token.kind {
                TokenKind::Punct(Punct::Dot) => {
                    self.cursor.bump();
                    let name = self.parse_identifier_name()?;
                    expr = self.member(expr, MemberProp::Named(name), false);
                }
                TokenKind::Punct(Punct::QuestionDot) => {
                    self.cursor.bump();
                    if self.cursor.is_punct(Punct::LParen) {
                        expr = self.parse_call(expr, true)?;
                    } else if self.cursor.eat_punct(Punct::LBracket) {
                        let index = self.parse_expression_allow_in()?;
                        self.cursor.expect_punct(Punct::RBracket)?;
                        expr = self.member(expr, MemberProp::Computed(Box::new(index)), true);
                    } else {
                        let name = self.parse_identifier_name()?;
                        expr = self.member(expr, MemberProp::Named(name), true);
                    }
                }
                TokenKind::Punct(Punct::LBracket) => {
                    self.cursor.bump();
                    let index = self.parse_expression_allow_in()?;
                    self.cursor.expect_punct(Punct::RBracket)?;
                    expr = self.member(expr, MemberProp::Computed(Box::new(index)), false);
                }
                TokenKind::Punct(Punct::LParen) => {
                    expr = self.parse_call(expr, false)?;
                }
                TokenKind::Template(_) if !token.newline_before => {
                    return Err(ParseError::new(
                        ParseErrorKind::Unsupported("tagged templates"),
                        token.span,
                    ));
                }
                _ => return Ok(expr),
            }
        }
    }

    fn member(&self, object: Expr, property: MemberProp, optional: bool) -> Expr {
        let span = object.span.to(self.cursor.prev_span());
        Expr::new(
            ExprKind::Member {
                object: Box::new(object),
                property,
                optional,
            },
            span,
        )
    }

    fn parse_call(&mut self, callee: Expr, optional: bool) -> Result<Expr, ParseError> {
        let args = self.parse_arguments()?;
        if let (ExprKind::Ident(name), [ArrayElement::Expr(arg)]) = (&callee.kind, args.as_slice())
        {
            if &**name == "require" {
                if let ExprKind::Str(specifier) = &arg.kind {
                    self.require_literals.push(specifier.clone());
                }
            }
        }
        let span = callee.span.to(self.cursor.prev_span());
        Ok(Expr::new(
            ExprKind::Call {
                callee: Box::new(callee),
                args,
                optional,
            },
            span,
        ))
    }

    fn parse_new(&mut self) -> Result<Expr, ParseError> {
        let start = self.cursor.bump().span;
        let mut callee = if self.cursor.is_word("new") {
            ensure_sufficient_stack(|| self.parse_new())?
        } else {
            self.parse_primary()?
        };
        loop {
            if self.cursor.eat_punct(Punct::Dot) {
                let name = self.parse_identifier_name()?;
                callee = self.member(callee, MemberProp::Named(name), false);
            } else if self.cursor.eat_punct(Punct::LBracket) {
                let index = self.parse_expression_allow_in()?;
                self.cursor.expect_punct(Punct::RBracket)?;
                callee = self.member(callee, MemberProp::Computed(Box::new(index)), false);
            } else {
                break;
            }
        }
        let args = if self.cursor.is_punct(Punct::LParen) {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        let span = start.to(self.cursor.prev_span());
        Ok(Expr::new(
            ExprKind::New {
                callee: Box::new(callee),
                args,
            },
            span,
        ))
    }

    /// `( args )` with spread support.
    fn parse_arguments(&mut self) -> Result<Vec<ArrayElement>, ParseError> {
        self.cursor.expect_punct(Punct::LParen)?;
        let ctx = Context {
            no_in: false,
            ..self.ctx
        };
        self.with_context(ctx, |p| {
            let mut args = Vec::new();
            while !p.cursor.is_punct(Punct::RParen) {
                if p.cursor.eat_punct(Punct::Ellipsis) {
                    args.push(ArrayElement::Spread(p.parse_assignment()?));
                } else {
                    args.push(ArrayElement::Expr(p.parse_assignment()?));
                }
                if !p.cursor.eat_punct(Punct::Comma) {
                    break;
                }
            }
            p.cursor.expect_punct(Punct::RParen)?;
            Ok(args)
        })
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.cursor.peek();
        let span = token.span;
        let kind = match &token.kind {
            TokenKind::Number(n) => {
                self.cursor.bump();
                ExprKind::Number(*n)
            }
            TokenKind::Str(s) => {
                self.cursor.bump();
                ExprKind::Str(s.clone())
            }
            TokenKind::Template(lit) => {
                self.cursor.bump();
                self.parse_template(lit)?
            }
            TokenKind::Punct(Punct::LParen) => {
                self.cursor.bump();
                let inner = self.parse_expression_allow_in()?;
                self.cursor.expect_punct(Punct::RParen)?;
                return Ok(inner);
            }
            TokenKind::Punct(Punct::LBracket) => self.parse_array_literal()?,
            TokenKind::Punct(Punct::LBrace) => self.parse_object_literal()?,
            TokenKind::Ident(word) => match &**word {
                "true" | "false" => {
                    self.cursor.bump();
                    ExprKind::Bool(&**word == "true")
                }
                "null" => {
                    self.cursor.bump();
                    ExprKind::Null
                }
                "undefined" => {
                    self.cursor.bump();
                    ExprKind::Undefined
                }
                "this" => {
                    self.cursor.bump();
                    ExprKind::This
                }
                "function" => ExprKind::Function(self.parse_function_expression(false)?),
                "async"
                    if self.cursor.is_word_at(1, "function")
                        && !self.cursor.nth(1).newline_before =>
                {
                    self.cursor.bump();
                    ExprKind::Function(self.parse_function_expression(true)?)
                }
                "import" => return self.parse_import_expression(),
                "class" => {
                    return Err(ParseError::new(ParseErrorKind::Unsupported("classes"), span))
                }
                _ => {
                    let (name, _) = self.parse_binding_ident()?;
                    ExprKind::Ident(name)
                }
            },
            _ => return Err(self.cursor.unexpected("expression")),
        };
        Ok(Expr::new(kind, span.to(self.cursor.prev_span())))
    }

    fn parse_template(&mut self, lit: &TemplateLit) -> Result<ExprKind, ParseError> {
        let mut exprs = Vec::with_capacity(lit.exprs.len());
        for hole in &lit.exprs {
            let text = self
                .slice(*hole)
                .ok_or_else(|| self.cursor.unexpected("template expression"))?;
            let tokens = cbx_lexer::lex_with_offset(text, hole.start)?;
            let mut sub = Parser::new(text, hole.start, &tokens, self.goal);
            sub.ctx = Context {
                no_in: false,
                ..self.ctx
            };
            let expr = sub.parse_expression()?;
            if !sub.cursor.at_eof() {
                return Err(sub.cursor.unexpected("`}`"));
            }
            self.require_literals.append(&mut sub.require_literals);
            self.warnings.append(&mut sub.warnings);
            exprs.push(expr);
        }
        Ok(ExprKind::Template {
            quasis: lit.quasis.clone(),
            exprs,
        })
    }

    fn parse_array_literal(&mut self) -> Result<ExprKind, ParseError> {
        self.cursor.expect_punct(Punct::LBracket)?;
        let ctx = Context {
            no_in: false,
            ..self.ctx
        };
        self.with_context(ctx, |p| {
            let mut elements = Vec::new();
            loop {
                if p.cursor.is_punct(Punct::RBracket) {
                    break;
                }
                if p.cursor.eat_punct(Punct::Comma) {
                    elements.push(ArrayElement::Hole);
                    continue;
                }
                if p.cursor.eat_punct(Punct::Ellipsis) {
                    elements.push(ArrayElement::Spread(p.parse_assignment()?));
                } else {
                    elements.push(ArrayElement::Expr(p.parse_assignment()?));
                }
                if !p.cursor.eat_punct(Punct::Comma) {
                    break;
                }
            }
            p.cursor.expect_punct(Punct::RBracket)?;
            Ok(ExprKind::Array(elements))
        })
    }

    fn parse_object_literal(&mut self) -> Result<ExprKind, ParseError> {
        self.cursor.expect_punct(Punct::LBrace)?;
        let ctx = Context {
            no_in: false,
            ..self.ctx
        };
        self.with_context(ctx, |p| {
            let mut props = Vec::new();
            while !p.cursor.is_punct(Punct::RBrace) {
                props.push(p.parse_property_def()?);
                if !p.cursor.eat_punct(Punct::Comma) {
                    break;
                }
            }
            p.cursor.expect_punct(Punct::RBrace)?;
            Ok(ExprKind::Object(props))
        })
    }

    fn at_property_key(&self, n: usize) -> bool {
        let kind = &self.cursor.nth(n).kind;
        matches!(
            kind,
            TokenKind::Ident(_) | TokenKind::Str(_) | TokenKind::Number(_)
        ) || kind.is_punct(Punct::LBracket)
    }

    fn parse_property_def(&mut self) -> Result<PropertyDef, ParseError> {
        if self.cursor.eat_punct(Punct::Ellipsis) {
            return Ok(PropertyDef::Spread(self.parse_assignment()?));
        }

        let accessor = match self.cursor.kind().ident() {
            Some(word @ ("get" | "set")) if self.at_property_key(1) => Some(word == "get"),
            _ => None,
        };
        if let Some(is_getter) = accessor {
            self.cursor.bump();
            let (key, name) = self.parse_property_key()?;
            let function = self.parse_method(name, false)?;
            return Ok(if is_getter {
                PropertyDef::Getter(key, function)
            } else {
                PropertyDef::Setter(key, function)
            });
        }

        let is_async_method = self.cursor.is_word("async")
            && self.at_property_key(1)
            && !self.cursor.nth(1).newline_before;
        if is_async_method {
            self.cursor.bump();
            let (key, name) = self.parse_property_key()?;
            let function = self.parse_method(name, true)?;
            let span = function.span;
            return Ok(PropertyDef::KeyValue(
                key,
                Expr::new(ExprKind::Function(function), span),
            ));
        }

        let key_token = self.cursor.peek();
        let shorthand = match &key_token.kind {
            TokenKind::Ident(name) => Some(name.clone()),
            _ => None,
        };
        let (key, name) = self.parse_property_key()?;

        if self.cursor.is_punct(Punct::LParen) {
            let function = self.parse_method(name, false)?;
            let span = function.span;
            return Ok(PropertyDef::KeyValue(
                key,
                Expr::new(ExprKind::Function(function), span),
            ));
        }
        if self.cursor.eat_punct(Punct::Colon) {
            return Ok(PropertyDef::KeyValue(key, self.parse_assignment()?));
        }

        let Some(ident) = shorthand else {
            return Err(self.cursor.unexpected("`:`"));
        };
        if crate::grammar::is_reserved(&ident) {
            return Err(ParseError::new(
                ParseErrorKind::ReservedWord(ident.to_string()),
                key_token.span,
            ));
        }
        if self.cursor.eat_punct(Punct::Eq) {
            // `{ a = 1 }` is only meaningful once converted to a pattern.
            let default = self.parse_assignment()?;
            let span = key_token.span.to(default.span);
            let target = Expr::new(ExprKind::Ident(ident.clone()), key_token.span);
            return Ok(PropertyDef::KeyValue(
                key,
                Expr::new(
                    ExprKind::Assign {
                        op: AssignOp::Assign,
                        target: Box::new(target),
                        value: Box::new(default),
                    },
                    span,
                ),
            ));
        }
        Ok(PropertyDef::Shorthand(ident))
    }

    /// Property key plus the static name it gives a method, if any.
    pub(crate) fn parse_property_key(&mut self) -> Result<(PropKey, Option<Name>), ParseError> {
        let token = self.cursor.peek();
        match &token.kind {
            TokenKind::Ident(name) | TokenKind::Str(name) => {
                self.cursor.bump();
                Ok((PropKey::Named(name.clone()), Some(name.clone())))
            }
            TokenKind::Number(n) => {
                self.cursor.bump();
                let key = number_key(*n);
                Ok((PropKey::Named(key.clone()), Some(key)))
            }
            TokenKind::Punct(Punct::LBracket) => {
                self.cursor.bump();
                let expr = self.parse_assignment()?;
                self.cursor.expect_punct(Punct::RBracket)?;
                Ok((PropKey::Computed(Box::new(expr)), None))
            }
            _ => Err(self.cursor.unexpected("property name")),
        }
    }

    /// `import(...)` or `import.meta`.
    fn parse_import_expression(&mut self) -> Result<Expr, ParseError> {
        let start = self.cursor.bump().span;
        if self.cursor.eat_punct(Punct::Dot) {
            let meta = self.cursor.expect_word("meta")?;
            if self.goal != cbx_ir::ast::ParseGoal::Module {
                return Err(ParseError::new(
                    ParseErrorKind::ModuleOnly("`import.meta`"),
                    start.to(meta),
                ));
            }
            return Ok(Expr::new(ExprKind::ImportMeta, start.to(meta)));
        }

        let open = self.cursor.expect_punct(Punct::LParen)?;
        let arg_start = self.cursor.peek().span;
        let ctx = Context {
            no_in: false,
            ..self.ctx
        };
        let specifier = self.with_context(ctx, Parser::parse_assignment)?;
        if self.cursor.eat_punct(Punct::Comma) && !self.cursor.is_punct(Punct::RParen) {
            // Import attributes are accepted and ignored.
            self.with_context(ctx, Parser::parse_assignment)?;
            self.cursor.eat_punct(Punct::Comma);
        }
        let close = self.cursor.expect_punct(Punct::RParen)?;
        let strategy = self.loading_strategy(open.end, arg_start.start);
        Ok(Expr::new(
            ExprKind::DynamicImport {
                specifier: Box::new(specifier),
                strategy,
            },
            start.to(close),
        ))
    }

    /// Read a `webpackMode` annotation from the comments in `[from, to)`.
    fn loading_strategy(&mut self, from: u32, to: u32) -> LoadingStrategy {
        let tokens = self.cursor.tokens();
        for comment in tokens.comments_between(from, to).filter(|c| c.block) {
            let Some(value) = annotation_value(&comment.text, "webpackMode") else {
                continue;
            };
            if let Some(strategy) = LoadingStrategy::from_annotation(value) {
                return strategy;
            }
            self.warn(
                format!(
                    "`webpackMode` expected 'lazy', 'lazy-once', 'eager' or 'weak', but received: {value}"
                ),
                comment.span,
            );
        }
        LoadingStrategy::default()
    }
}

/// Extract the quoted value of `key: "value"` from comment text.
fn annotation_value<'t>(text: &'t str, key: &str) -> Option<&'t str> {
    let after_key = &text[text.find(key)? + key.len()..];
    let after_colon = after_key.trim_start().strip_prefix(':')?.trim_start();
    let quote = after_colon.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let body = &after_colon[1..];
    let end = body.find(quote)?;
    Some(&body[..end])
}
