//! `import` and `export` declarations.

use cbx_ir::ast::{ExportDecl, ExportName, ImportDecl, ImportName, VarKind};
use cbx_ir::{Name, Punct, TokenKind};

use crate::{ParseError, Parser};

impl Parser<'_> {
    fn parse_module_specifier(&mut self) -> Result<Name, ParseError> {
        match self.cursor.kind() {
            TokenKind::Str(specifier) => {
                let specifier = specifier.clone();
                self.cursor.bump();
                self.record_request(&specifier);
                Ok(specifier)
            }
            _ => Err(self.cursor.unexpected("module specifier")),
        }
    }

    /// Name in an import/export list; string names are allowed.
    fn parse_module_export_name(&mut self) -> Result<Name, ParseError> {
        match self.cursor.kind() {
            TokenKind::Str(name) => {
                let name = name.clone();
                self.cursor.bump();
                Ok(name)
            }
            _ => self.parse_identifier_name(),
        }
    }

    pub(crate) fn parse_import_decl(&mut self) -> Result<ImportDecl, ParseError> {
        self.cursor.expect_word("import")?;
        let mut decl = ImportDecl {
            specifier: Name::from(""),
            default: None,
            namespace: None,
            named: Vec::new(),
        };

        // `import "./side-effect"`
        if matches!(self.cursor.kind(), TokenKind::Str(_)) {
            decl.specifier = self.parse_module_specifier()?;
            self.consume_semicolon()?;
            return Ok(decl);
        }

        if self.at_binding_ident() {
            decl.default = Some(self.parse_binding_ident()?.0);
            if !self.cursor.eat_punct(Punct::Comma) {
                return self.finish_import(decl);
            }
        }

        if self.cursor.eat_punct(Punct::Star) {
            self.cursor.expect_word("as")?;
            decl.namespace = Some(self.parse_binding_ident()?.0);
        } else if self.cursor.eat_punct(Punct::LBrace) {
            while !self.cursor.is_punct(Punct::RBrace) {
                let imported = self.parse_module_export_name()?;
                let local = if self.cursor.eat_word("as") {
                    self.parse_binding_ident()?.0
                } else {
                    if super::is_reserved(&imported) {
                        return Err(self.cursor.unexpected("`as`"));
                    }
                    imported.clone()
                };
                decl.named.push(ImportName { imported, local });
                if !self.cursor.eat_punct(Punct::Comma) {
                    break;
                }
            }
            self.cursor.expect_punct(Punct::RBrace)?;
        } else {
            return Err(self.cursor.unexpected("import clause"));
        }
        self.finish_import(decl)
    }

    fn finish_import(&mut self, mut decl: ImportDecl) -> Result<ImportDecl, ParseError> {
        self.cursor.expect_word("from")?;
        decl.specifier = self.parse_module_specifier()?;
        self.skip_import_attributes()?;
        self.consume_semicolon()?;
        Ok(decl)
    }

    /// `with { type: "json" }` is accepted and ignored.
    fn skip_import_attributes(&mut self) -> Result<(), ParseError> {
        if !self.cursor.is_word("with") && !self.cursor.is_word("assert") {
            return Ok(());
        }
        self.cursor.bump();
        let open = self.cursor.position();
        let close = self
            .cursor
            .matching_close(open)
            .ok_or_else(|| self.cursor.unexpected("`{`"))?;
        self.cursor.set_position(close + 1);
        Ok(())
    }

    pub(crate) fn parse_export_decl(&mut self) -> Result<ExportDecl, ParseError> {
        self.cursor.expect_word("export")?;

        if self.cursor.eat_word("default") {
            let is_async_fn = self.cursor.is_word("async")
                && self.cursor.is_word_at(1, "function")
                && !self.cursor.nth(1).newline_before;
            if self.cursor.is_word("function") || is_async_fn {
                if is_async_fn {
                    self.cursor.bump();
                }
                let function = self.parse_function_expression(is_async_fn)?;
                return Ok(ExportDecl::DefaultFunction(function));
            }
            let value = self.parse_assignment()?;
            self.consume_semicolon()?;
            return Ok(ExportDecl::DefaultExpr(value));
        }

        if self.cursor.eat_punct(Punct::Star) {
            let alias = if self.cursor.eat_word("as") {
                Some(self.parse_module_export_name()?)
            } else {
                None
            };
            self.cursor.expect_word("from")?;
            let from = self.parse_module_specifier()?;
            self.skip_import_attributes()?;
            self.consume_semicolon()?;
            return Ok(ExportDecl::All { from, alias });
        }

        if self.cursor.eat_punct(Punct::LBrace) {
            let mut specifiers = Vec::new();
            while !self.cursor.is_punct(Punct::RBrace) {
                let local = self.parse_module_export_name()?;
                let exported = if self.cursor.eat_word("as") {
                    self.parse_module_export_name()?
                } else {
                    local.clone()
                };
                specifiers.push(ExportName { local, exported });
                if !self.cursor.eat_punct(Punct::Comma) {
                    break;
                }
            }
            self.cursor.expect_punct(Punct::RBrace)?;
            let from = if self.cursor.eat_word("from") {
                let from = self.parse_module_specifier()?;
                self.skip_import_attributes()?;
                Some(from)
            } else {
                None
            };
            self.consume_semicolon()?;
            return Ok(ExportDecl::Named { specifiers, from });
        }

        let var_kind = match self.cursor.kind().ident() {
            Some("var") => Some(VarKind::Var),
            Some("let") => Some(VarKind::Let),
            Some("const") => Some(VarKind::Const),
            _ => None,
        };
        if let Some(kind) = var_kind {
            self.cursor.bump();
            let decl = self.parse_var_declarators(kind)?;
            self.consume_semicolon()?;
            return Ok(ExportDecl::Var(decl));
        }

        let is_async_fn = self.cursor.is_word("async") && self.cursor.is_word_at(1, "function");
        if is_async_fn {
            self.cursor.bump();
        }
        if self.cursor.is_word("function") {
            return Ok(ExportDecl::Function(
                self.parse_function_declaration(is_async_fn)?,
            ));
        }
        Err(self.cursor.unexpected("declaration or export list"))
    }
}
