//! Parser for the Ash language.
//!
//! A hand-written recursive-descent parser with Pratt-style operator
//! precedence for expressions. One [`Parser`] consumes one file's token
//! stream and produces a [`ParsedFile`]: the file's AST arena, its
//! declared module path, and its imports.
//!
//! # Grammar
//!
//! ```text
//! file        → module_decl? using_decl* top_item*
//! module_decl → "module" module_path ";"
//! using_decl  → "using" module_path ";"
//! module_path → IDENT ("::" IDENT)*
//! top_item    → fn_def | extern_decl | if_stmt | comment
//! fn_def      → "function" prototype block
//! extern_decl → "extern" prototype ";"
//! prototype   → TYPE IDENT "(" (TYPE IDENT ("," TYPE IDENT)*)? ")"
//! block       → "{" stmt* "}"
//! stmt        → expr ";" | if | for | while | switch | comment | fn_def | extern_decl
//! ```
//!
//! `if`, `for`, `while`, and `switch` are expressions; at statement
//! position they need no trailing `;` and an `if` produces no value.
//! Expressions are rejected at the top level of a file.
//!
//! # See Also
//!
//! * [`crate::lexer`] - Produces the token stream
//! * [`crate::ast`] - The arena the parser fills
//! * [`crate::semantic`] - Checks the result

mod error;
mod expr;

#[cfg(test)]
mod tests;

pub use error::ParseError;

use std::collections::BTreeSet;

use crate::ast::{
    Ast, BodyId, BodyKind, ExprKind, FunctionDefinition, FunctionPrototype,
};
use crate::interner::{Interner, NameId};
use crate::mangle;
use crate::token::{Span, Token, TokenKind};

/// The result of parsing one source file.
#[derive(Debug)]
pub struct ParsedFile {
    /// The file's AST arena.
    pub ast: Ast,
    /// The declared module path id, or `None` if the file has no
    /// `module` declaration.
    pub module: Option<NameId>,
    /// The imported module path ids, in declaration order.
    pub imports: BTreeSet<NameId>,
}

/// A recursive descent parser over one file's token stream.
pub struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    interner: &'a mut Interner,
    ast: Ast,
    /// Stack of open bodies; the innermost is last.
    bodies: Vec<BodyId>,
}

impl<'a> Parser<'a> {
    /// Creates a parser over a token list.
    ///
    /// # Panics
    ///
    /// Panics if the token list is empty; the lexer always appends `Eof`.
    pub fn new(tokens: Vec<Token>, interner: &'a mut Interner) -> Self {
        assert!(!tokens.is_empty(), "token list must not be empty");
        let ast = Ast::new();
        let root = ast.root();
        Parser {
            tokens,
            pos: 0,
            interner,
            ast,
            bodies: vec![root],
        }
    }

    /// Parses the whole file: an optional `module` declaration, `using`
    /// declarations, then top-level items.
    ///
    /// # Errors
    ///
    /// Returns the first syntax error encountered; there is no recovery.
    pub fn parse_file(mut self) -> Result<ParsedFile, ParseError> {
        let mut module = None;
        let mut imports = BTreeSet::new();

        if self.current_kind() == &TokenKind::Module {
            self.advance();
            let path = self.parse_module_path()?;
            self.expect_semicolon()?;
            module = Some(path);
        }

        while self.current_kind() == &TokenKind::Using {
            self.advance();
            let path = self.parse_module_path()?;
            self.expect_semicolon()?;
            imports.insert(path);
        }

        let root = self.ast.root();
        self.parse_body_into(root, true, false)?;

        Ok(ParsedFile {
            ast: self.ast,
            module,
            imports,
        })
    }

    // Token navigation

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn current_kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn current_span(&self) -> Span {
        self.current().span
    }

    fn prev_span(&self) -> Span {
        if self.pos == 0 {
            self.current_span()
        } else {
            self.tokens[self.pos - 1].span
        }
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    fn current_body(&self) -> BodyId {
        *self.bodies.last().expect("body stack is never empty")
    }

    fn error<T>(&self, message: impl Into<String>) -> Result<T, ParseError> {
        let mut message = message.into();
        message.push_str(&format!(" (found {})", self.current_kind().describe()));
        Err(ParseError::new(message, self.current_span()))
    }

    fn expect_semicolon(&mut self) -> Result<(), ParseError> {
        if self.current_kind() != &TokenKind::EndOfExpression {
            return self.error("Expected end of expression, missing ';'");
        }
        self.advance();
        Ok(())
    }

    // Declarations

    /// Parses `ident ("::" ident)*` into a module path id.
    fn parse_module_path(&mut self) -> Result<NameId, ParseError> {
        let mut module = None;
        loop {
            let segment = match self.current_kind() {
                TokenKind::Identifier(name) => name.clone(),
                _ => return self.error("Expected module name"),
            };
            let segment = self.interner.get_id(&segment);
            self.advance();
            module = Some(mangle::add_module(self.interner, module, segment));

            if self.current_kind() == &TokenKind::BinOp(crate::ops::BinaryOp::ModuleScope) {
                self.advance();
            } else {
                break;
            }
        }
        Ok(module.expect("module path has at least one segment"))
    }

    /// Parses statements into an existing body.
    ///
    /// With `braces`, the current token must be `{` and the body runs to
    /// the matching `}` (both consumed). Without, the body runs to end of
    /// file. With `top_level`, expressions are rejected.
    fn parse_body_into(
        &mut self,
        body: BodyId,
        top_level: bool,
        braces: bool,
    ) -> Result<(), ParseError> {
        if braces {
            if self.current_kind() != &TokenKind::BodyStart {
                return self.error("Body must start with a '{'");
            }
            self.advance();
        }

        self.bodies.push(body);
        let result = self.parse_body_items(body, top_level, braces);
        self.bodies.pop();
        result
    }

    fn parse_body_items(
        &mut self,
        body: BodyId,
        top_level: bool,
        braces: bool,
    ) -> Result<(), ParseError> {
        loop {
            match self.current_kind() {
                TokenKind::Eof => {
                    if braces {
                        return self.error("Body must end with a '}'");
                    }
                    return Ok(());
                }
                TokenKind::BodyEnd => {
                    if !braces {
                        return self.error("Unexpected '}' outside a body");
                    }
                    self.advance();
                    return Ok(());
                }
                TokenKind::EndOfExpression => {
                    self.advance();
                }
                TokenKind::Function => {
                    let func = self.parse_function_definition()?;
                    self.ast.body_mut(body).functions.push(func);
                }
                TokenKind::Extern => {
                    self.parse_extern(body)?;
                }
                TokenKind::If => {
                    let expr = self.parse_if_else(false)?;
                    self.ast.body_mut(body).expressions.push(expr);
                }
                TokenKind::For if !top_level => {
                    let expr = self.parse_for()?;
                    self.ast.body_mut(body).expressions.push(expr);
                }
                TokenKind::While if !top_level => {
                    let expr = self.parse_while()?;
                    self.ast.body_mut(body).expressions.push(expr);
                }
                TokenKind::Switch if !top_level => {
                    let expr = self.parse_switch()?;
                    self.ast.body_mut(body).expressions.push(expr);
                }
                TokenKind::Comment => {
                    let span = self.current_span();
                    self.advance();
                    let expr = self.ast.add_expr(body, ExprKind::Comment, span);
                    self.ast.body_mut(body).expressions.push(expr);
                }
                TokenKind::Module | TokenKind::Using => {
                    return self.error("Module declarations must appear at the top of the file");
                }
                _ => {
                    if top_level {
                        return self.error("Expressions are not allowed in top level code");
                    }
                    let expr = self.parse_expression(expr::ExprContext::Statement)?;
                    self.ast.body_mut(body).expressions.push(expr);
                    self.expect_semicolon()?;
                }
            }
        }
    }

    /// Parses a `{ ... }` block into a fresh body of the given kind.
    fn parse_block(&mut self, kind: BodyKind) -> Result<BodyId, ParseError> {
        let start = self.current_span();
        let parent = self.current_body();
        let body = self.ast.new_body(Some(parent), kind);
        self.parse_body_into(body, false, true)?;
        let span = start.to(self.prev_span());
        let self_expr = self.ast.body(body).self_expr;
        self.ast.expr_mut(self_expr).span = span;
        Ok(body)
    }

    /// Parses `type name "(" (type name ("," type name)*)? ")"`.
    fn parse_prototype(&mut self, is_extern: bool) -> Result<FunctionPrototype, ParseError> {
        let return_type = match self.current_kind() {
            TokenKind::TypeName(ty) => *ty,
            _ => return self.error("Return type for function prototype is invalid"),
        };
        self.advance();

        let name = match self.current_kind() {
            TokenKind::Identifier(name) => name.clone(),
            _ => return self.error("Expected function name in function prototype"),
        };
        let name = self.interner.get_id(&name);
        self.advance();

        if self.current_kind() != &TokenKind::ParenStart {
            return self.error("Expected '(' in function prototype");
        }
        self.advance();

        let mut params = Vec::new();
        let mut param_names = Vec::new();

        if self.current_kind() != &TokenKind::ParenEnd {
            loop {
                let ty = match self.current_kind() {
                    TokenKind::TypeName(ty) => *ty,
                    _ => return self.error("Expected parameter type in function prototype"),
                };
                self.advance();

                let param = match self.current_kind() {
                    TokenKind::Identifier(name) => name.clone(),
                    _ => return self.error("Expected parameter name in function prototype"),
                };
                let param = self.interner.get_id(&param);
                self.advance();

                params.push(ty);
                param_names.push(param);

                match self.current_kind() {
                    TokenKind::ParenEnd => break,
                    TokenKind::Comma => self.advance(),
                    _ => return self.error("Expected ')' or ',' in function prototype"),
                }
            }
        }
        self.advance(); // ')'

        Ok(FunctionPrototype {
            name,
            return_type,
            params,
            param_names,
            is_extern,
        })
    }

    /// Parses `"function" prototype block`.
    fn parse_function_definition(&mut self) -> Result<FunctionDefinition, ParseError> {
        self.advance(); // 'function'

        let proto = self.parse_prototype(false)?;
        let proto_id = self.ast.add_prototype(proto);

        let parent = self.current_body();
        let body = self.ast.new_body(Some(parent), BodyKind::Function);
        self.parse_body_into(body, false, true)?;

        // parameters are variables of the function body
        let proto = self.ast.proto(proto_id).clone();
        {
            let body_data = self.ast.body_mut(body);
            for (name, ty) in proto.param_names.iter().zip(&proto.params) {
                body_data.named_types.insert(*name, *ty);
            }
            body_data.parent_function = Some(proto_id);
        }
        self.ast
            .body_mut(parent)
            .prototypes
            .insert(proto.name, proto_id);

        Ok(FunctionDefinition {
            prototype: proto_id,
            body: self.ast.body(body).self_expr,
        })
    }

    /// Parses `"extern" prototype ";"` and registers the prototype with
    /// the enclosing body.
    fn parse_extern(&mut self, body: BodyId) -> Result<(), ParseError> {
        self.advance(); // 'extern'

        let proto = self.parse_prototype(true)?;
        self.expect_semicolon()?;

        let name = proto.name;
        let proto_id = self.ast.add_prototype(proto);
        let body_data = self.ast.body_mut(body);
        body_data.prototypes.insert(name, proto_id);
        body_data.externs.push(name);
        Ok(())
    }
}
