//! Binding and assignment patterns.

use cbx_ir::ast::{
    ArrayElement, AssignOp, Expr, ExprKind, ObjectPatternProp, Pattern, PatternElement, PropKey,
    PropertyDef,
};
use cbx_ir::Punct;

use crate::{ParseError, ParseErrorKind, Parser};

impl Parser<'_> {
    /// Identifier, `{ … }` or `[ … ]` binding pattern.
    pub(crate) fn parse_binding_pattern(&mut self) -> Result<Pattern, ParseError> {
        if self.cursor.eat_punct(Punct::LBrace) {
            return self.parse_object_pattern();
        }
        if self.cursor.eat_punct(Punct::LBracket) {
            return self.parse_array_pattern();
        }
        let (name, _) = self.parse_binding_ident()?;
        Ok(Pattern::Ident(name))
    }

    fn parse_default(&mut self) -> Result<Option<Expr>, ParseError> {
        if self.cursor.eat_punct(Punct::Eq) {
            Ok(Some(self.parse_assignment()?))
        } else {
            Ok(None)
        }
    }

    fn parse_object_pattern(&mut self) -> Result<Pattern, ParseError> {
        let mut props = Vec::new();
        let mut rest = None;
        while !self.cursor.is_punct(Punct::RBrace) {
            if self.cursor.eat_punct(Punct::Ellipsis) {
                rest = Some(self.parse_binding_ident()?.0);
                break;
            }
            let key_is_ident = matches!(self.cursor.kind(), cbx_ir::TokenKind::Ident(_));
            let (key, name) = self.parse_property_key()?;
            let value = if self.cursor.eat_punct(Punct::Colon) {
                self.parse_binding_pattern()?
            } else {
                match name {
                    Some(name) if key_is_ident && !super::is_reserved(&name) => {
                        Pattern::Ident(name)
                    }
                    _ => return Err(self.cursor.unexpected("`:`")),
                }
            };
            let default = self.parse_default()?;
            props.push(ObjectPatternProp {
                key,
                value,
                default,
            });
            if !self.cursor.eat_punct(Punct::Comma) {
                break;
            }
        }
        self.cursor.expect_punct(Punct::RBrace)?;
        Ok(Pattern::Object { props, rest })
    }

    fn parse_array_pattern(&mut self) -> Result<Pattern, ParseError> {
        let mut elements = Vec::new();
        let mut rest = None;
        loop {
            if self.cursor.is_punct(Punct::RBracket) {
                break;
            }
            if self.cursor.eat_punct(Punct::Comma) {
                elements.push(None);
                continue;
            }
            if self.cursor.eat_punct(Punct::Ellipsis) {
                rest = Some(Box::new(self.parse_binding_pattern()?));
                break;
            }
            let pattern = self.parse_binding_pattern()?;
            let default = self.parse_default()?;
            elements.push(Some(PatternElement { pattern, default }));
            if !self.cursor.eat_punct(Punct::Comma) {
                break;
            }
        }
        self.cursor.expect_punct(Punct::RBracket)?;
        Ok(Pattern::Array { elements, rest })
    }

    /// Reinterpret an array or object literal as a destructuring target.
    ///
    /// Only identifier leaves are accepted; member-expression targets inside
    /// patterns are rejected.
    pub(crate) fn expr_to_pattern(&self, expr: Expr) -> Result<Pattern, ParseError> {
        let span = expr.span;
        let invalid = || ParseError::new(ParseErrorKind::InvalidAssignmentTarget, span);
        match expr.kind {
            ExprKind::Ident(name) => Ok(Pattern::Ident(name)),
            ExprKind::Array(items) => {
                let mut elements = Vec::new();
                let mut rest = None;
                let count = items.len();
                for (idx, item) in items.into_iter().enumerate() {
                    match item {
                        ArrayElement::Hole => elements.push(None),
                        ArrayElement::Expr(e) => {
                            let (pattern, default) = self.split_default(e)?;
                            elements.push(Some(PatternElement { pattern, default }));
                        }
                        ArrayElement::Spread(e) if idx + 1 == count => {
                            rest = Some(Box::new(self.expr_to_pattern(e)?));
                        }
                        ArrayElement::Spread(_) => return Err(invalid()),
                    }
                }
                Ok(Pattern::Array { elements, rest })
            }
            ExprKind::Object(defs) => {
                let mut props = Vec::new();
                let mut rest = None;
                let count = defs.len();
                for (idx, def) in defs.into_iter().enumerate() {
                    match def {
                        PropertyDef::Shorthand(name) => props.push(ObjectPatternProp {
                            key: PropKey::Named(name.clone()),
                            value: Pattern::Ident(name),
                            default: None,
                        }),
                        PropertyDef::KeyValue(key, value) => {
                            let (value, default) = self.split_default(value)?;
                            props.push(ObjectPatternProp {
                                key,
                                value,
                                default,
                            });
                        }
                        PropertyDef::Spread(Expr {
                            kind: ExprKind::Ident(name),
                            ..
                        }) if idx + 1 == count => rest = Some(name),
                        _ => return Err(invalid()),
                    }
                }
                Ok(Pattern::Object { props, rest })
            }
            _ => Err(invalid()),
        }
    }

    /// `target = default` inside a pattern literal.
    fn split_default(&self, expr: Expr) -> Result<(Pattern, Option<Expr>), ParseError> {
        match expr.kind {
            ExprKind::Assign {
                op: AssignOp::Assign,
                target,
                value,
            } => Ok((self.expr_to_pattern(*target)?, Some(*value))),
            ExprKind::AssignPattern { target, value } => Ok((target, Some(*value))),
            kind => self.expr_to_pattern(Expr::new(kind, expr.span)).map(|p| (p, None)),
        }
    }
}
