//! Expression parsing.
//!
//! `parse_expression` is the Pratt-style entry point: a primary followed
//! by `parse_binop_rhs`, which consumes operators of at least the minimum
//! precedence and recurses right when the next operator binds tighter.
//! Assignment is right-associative; everything else associates left.

use super::{ParseError, Parser};
use crate::ast::{BodyKind, ExprId, ExprKind};
use crate::ops::{BinaryOp, UnaryOp};
use crate::token::TokenKind;
use crate::types::{self, LiteralValue};

/// Where an expression appears, which decides the tokens allowed to
/// terminate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ExprContext {
    /// A statement; must end at `;`.
    Statement,
    /// A call argument; ends at `,` or `)`.
    Call,
    /// A condition or loop header; ends at whatever follows.
    Condition,
    /// Inside parentheses; must end at `)`.
    Paren,
    /// A `for` header clause; ends at `,` or `{`.
    ForHeader,
}

impl<'a> Parser<'a> {
    /// Parses one expression in the given context.
    pub(super) fn parse_expression(&mut self, ctx: ExprContext) -> Result<ExprId, ParseError> {
        let lhs = self.parse_primary()?;

        let expr = if matches!(self.current_kind(), TokenKind::BinOp(_)) {
            self.parse_binop_rhs(0, lhs)?
        } else {
            lhs
        };

        self.check_terminator(ctx)?;
        Ok(expr)
    }

    fn check_terminator(&self, ctx: ExprContext) -> Result<(), ParseError> {
        let ok = match ctx {
            ExprContext::Statement => self.current_kind() == &TokenKind::EndOfExpression,
            ExprContext::Call => matches!(
                self.current_kind(),
                TokenKind::Comma | TokenKind::ParenEnd
            ),
            ExprContext::Condition => true,
            ExprContext::Paren => self.current_kind() == &TokenKind::ParenEnd,
            ExprContext::ForHeader => matches!(
                self.current_kind(),
                TokenKind::Comma | TokenKind::BodyStart
            ),
        };
        if ok {
            Ok(())
        } else if ctx == ExprContext::Paren {
            self.error("Expected ')' after expression")
        } else {
            self.error("Expected end of expression, missing ';'")
        }
    }

    /// Consumes binary operators with precedence at least `min_prec`,
    /// building the tree left to right.
    fn parse_binop_rhs(&mut self, min_prec: i32, mut lhs: ExprId) -> Result<ExprId, ParseError> {
        loop {
            let op = match self.current_kind() {
                TokenKind::BinOp(op) => *op,
                _ => return Ok(lhs),
            };
            let prec = op.precedence();
            if prec < min_prec {
                return Ok(lhs);
            }
            self.advance();

            let mut rhs = self.parse_primary()?;

            let next_prec = match self.current_kind() {
                TokenKind::BinOp(next) => next.precedence(),
                _ => -1,
            };
            if prec < next_prec {
                rhs = self.parse_binop_rhs(prec + 1, rhs)?;
            } else if op.is_assignment() && prec == next_prec {
                // assignment is right-associative
                rhs = self.parse_binop_rhs(prec, rhs)?;
            }

            let span = self.ast.expr(lhs).span.to(self.ast.expr(rhs).span);
            lhs = self
                .ast
                .add_expr(self.current_body(), ExprKind::Binary { op, lhs, rhs }, span);
        }
    }

    /// Dispatches on the current token to one of the primary forms.
    fn parse_primary(&mut self) -> Result<ExprId, ParseError> {
        match self.current_kind() {
            TokenKind::TypeName(_) => self.parse_variable_declaration(),
            TokenKind::Identifier(_) => self.parse_reference_or_call(),
            TokenKind::Literal { .. } => self.parse_literal(),
            TokenKind::ParenStart => self.parse_paren_or_cast(),
            TokenKind::If => self.parse_if_else(true),
            TokenKind::For => self.parse_for(),
            TokenKind::While => self.parse_while(),
            TokenKind::Switch => self.parse_switch(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Continue => {
                let span = self.current_span();
                self.advance();
                Ok(self.ast.add_expr(self.current_body(), ExprKind::Continue, span))
            }
            TokenKind::Break => {
                let span = self.current_span();
                self.advance();
                Ok(self.ast.add_expr(self.current_body(), ExprKind::Break, span))
            }
            TokenKind::BinOp(BinaryOp::Addition) => self.parse_unary(UnaryOp::Plus),
            TokenKind::BinOp(BinaryOp::Subtraction) => self.parse_unary(UnaryOp::Minus),
            TokenKind::UnOp(op) => {
                let op = *op;
                self.parse_unary(op)
            }
            _ => self.error("Unknown token when expecting an expression"),
        }
    }

    fn parse_unary(&mut self, op: UnaryOp) -> Result<ExprId, ParseError> {
        let start = self.current_span();
        self.advance();
        let operand = self.parse_primary()?;
        let span = start.to(self.ast.expr(operand).span);
        Ok(self
            .ast
            .add_expr(self.current_body(), ExprKind::Unary { op, operand }, span))
    }

    /// `type name ("=" expression)?`
    fn parse_variable_declaration(&mut self) -> Result<ExprId, ParseError> {
        let start = self.current_span();
        let ty = match self.current_kind() {
            TokenKind::TypeName(ty) => *ty,
            _ => return self.error("Expected a type"),
        };
        self.advance();

        let name = match self.current_kind() {
            TokenKind::Identifier(name) => name.clone(),
            _ => return self.error("Expected identifier after type"),
        };
        let name = self.interner.get_id(&name);
        self.advance();

        let init = if self.current_kind() == &TokenKind::BinOp(BinaryOp::Assignment) {
            self.advance();
            Some(self.parse_expression(ExprContext::Condition)?)
        } else {
            None
        };

        let body = self.current_body();
        self.ast.body_mut(body).named_types.insert(name, ty);

        let span = start.to(self.prev_span());
        Ok(self
            .ast
            .add_expr(body, ExprKind::VariableDeclaration { ty, name, init }, span))
    }

    /// `identifier` or `identifier "(" (expression ("," expression)*)? ")"`
    fn parse_reference_or_call(&mut self) -> Result<ExprId, ParseError> {
        let start = self.current_span();
        let name = match self.current_kind() {
            TokenKind::Identifier(name) => name.clone(),
            _ => return self.error("Expected an identifier"),
        };
        let name = self.interner.get_id(&name);
        self.advance();

        if self.current_kind() != &TokenKind::ParenStart {
            return Ok(self.ast.add_expr(
                self.current_body(),
                ExprKind::VariableReference { name },
                start,
            ));
        }
        self.advance();

        let mut args = Vec::new();
        if self.current_kind() != &TokenKind::ParenEnd {
            loop {
                args.push(self.parse_expression(ExprContext::Call)?);
                match self.current_kind() {
                    TokenKind::ParenEnd => break,
                    TokenKind::Comma => self.advance(),
                    _ => return self.error("Expected ')' or ',' in function argument list"),
                }
            }
        }
        self.advance(); // ')'

        let span = start.to(self.prev_span());
        Ok(self.ast.add_expr(
            self.current_body(),
            ExprKind::Call {
                callee: name,
                is_extern: false,
                args,
            },
            span,
        ))
    }

    fn parse_literal(&mut self) -> Result<ExprId, ParseError> {
        let span = self.current_span();
        let (ty, text) = match self.current_kind() {
            TokenKind::Literal { ty, text } => (*ty, text.clone()),
            _ => return self.error("Expected a literal"),
        };

        let value = match LiteralValue::parse(ty, &text) {
            Some(value) => value,
            None => return self.error("Literal is not a valid type"),
        };
        if !types::check_range(&text, ty) {
            return self.error(format!("Literal '{}' is out of range for type {}", text, ty));
        }
        self.advance();

        Ok(self
            .ast
            .add_expr(self.current_body(), ExprKind::Literal { ty, value }, span))
    }

    /// `"(" expression ")"` or the cast form `"(" type ")" primary`.
    fn parse_paren_or_cast(&mut self) -> Result<ExprId, ParseError> {
        let start = self.current_span();
        self.advance(); // '('

        if let TokenKind::TypeName(target) = self.current_kind() {
            let target = *target;
            self.advance();
            if self.current_kind() != &TokenKind::ParenEnd {
                return self.error("Expected ')' after cast type");
            }
            self.advance();

            let operand = self.parse_primary()?;
            let span = start.to(self.ast.expr(operand).span);
            return Ok(self.ast.add_expr(
                self.current_body(),
                ExprKind::Cast { target, operand },
                span,
            ));
        }

        let expr = self.parse_expression(ExprContext::Paren)?;
        self.advance(); // ')'
        Ok(expr)
    }

    /// `"if" condition block ("else" block)?`
    pub(super) fn parse_if_else(&mut self, yields_value: bool) -> Result<ExprId, ParseError> {
        let start = self.current_span();
        let enclosing = self.current_body();
        self.advance(); // 'if'

        let cond = self.parse_expression(ExprContext::Condition)?;
        let then_block = self.parse_block(BodyKind::Conditional)?;
        let then_body = self.ast.body(then_block).self_expr;

        let else_body = if self.current_kind() == &TokenKind::Else {
            self.advance();
            let else_block = self.parse_block(BodyKind::Conditional)?;
            Some(self.ast.body(else_block).self_expr)
        } else {
            None
        };

        let span = start.to(self.prev_span());
        Ok(self.ast.add_expr(
            enclosing,
            ExprKind::If {
                cond,
                then_body,
                else_body,
                yields_value,
            },
            span,
        ))
    }

    /// `"for" type name "=" start "," condition ("," step)? block`
    pub(super) fn parse_for(&mut self) -> Result<ExprId, ParseError> {
        let start_span = self.current_span();
        let enclosing = self.current_body();
        self.advance(); // 'for'

        let var_type = match self.current_kind() {
            TokenKind::TypeName(ty) => *ty,
            _ => return self.error("Expected loop variable type after 'for'"),
        };
        self.advance();

        let var_name = match self.current_kind() {
            TokenKind::Identifier(name) => name.clone(),
            _ => return self.error("Expected loop variable name"),
        };
        let var_name = self.interner.get_id(&var_name);
        self.advance();

        if self.current_kind() != &TokenKind::BinOp(BinaryOp::Assignment) {
            return self.error("Expected '=' after loop variable");
        }
        self.advance();

        // the header expressions and the loop variable are scoped to the
        // loop body, so the condition and step can see the variable
        let block = self.ast.new_body(Some(enclosing), BodyKind::Loop);
        self.ast
            .body_mut(block)
            .named_types
            .insert(var_name, var_type);

        self.bodies.push(block);
        let header = (|| {
            let start = self.parse_expression(ExprContext::ForHeader)?;
            if self.current_kind() != &TokenKind::Comma {
                return self.error("Expected ',' after loop start expression");
            }
            self.advance();

            let end = self.parse_expression(ExprContext::ForHeader)?;

            let step = if self.current_kind() == &TokenKind::Comma {
                self.advance();
                Some(self.parse_expression(ExprContext::ForHeader)?)
            } else {
                None
            };
            Ok((start, end, step))
        })();
        self.bodies.pop();
        let (start, end, step) = header?;

        let block_start = self.current_span();
        self.parse_body_into(block, false, true)?;
        let self_expr = self.ast.body(block).self_expr;
        self.ast.expr_mut(self_expr).span = block_start.to(self.prev_span());
        let body = self_expr;

        let span = start_span.to(self.prev_span());
        Ok(self.ast.add_expr(
            enclosing,
            ExprKind::For {
                var_type,
                var_name,
                start,
                end,
                step,
                body,
            },
            span,
        ))
    }

    /// `"while" condition block`
    pub(super) fn parse_while(&mut self) -> Result<ExprId, ParseError> {
        let start = self.current_span();
        let enclosing = self.current_body();
        self.advance(); // 'while'

        let cond = self.parse_expression(ExprContext::Condition)?;
        let block = self.parse_block(BodyKind::Loop)?;
        let body = self.ast.body(block).self_expr;

        let span = start.to(self.prev_span());
        Ok(self
            .ast
            .add_expr(enclosing, ExprKind::While { cond, body }, span))
    }

    /// `"switch" value "{" ("case" literal block | "default" block)* "}"`
    pub(super) fn parse_switch(&mut self) -> Result<ExprId, ParseError> {
        let start = self.current_span();
        let enclosing = self.current_body();
        self.advance(); // 'switch'

        let value = self.parse_expression(ExprContext::Condition)?;

        if self.current_kind() != &TokenKind::BodyStart {
            return self.error("Expected '{' after switch value");
        }
        self.advance();

        let mut cases = Vec::new();
        loop {
            match self.current_kind() {
                TokenKind::Case => {
                    let case_start = self.current_span();
                    self.advance();
                    let case_value = self.parse_expression(ExprContext::Condition)?;
                    let block = self.parse_block(BodyKind::Conditional)?;
                    let body = self.ast.body(block).self_expr;
                    let span = case_start.to(self.prev_span());
                    cases.push(self.ast.add_expr(
                        enclosing,
                        ExprKind::Case {
                            value: Some(case_value),
                            body,
                            is_default: false,
                        },
                        span,
                    ));
                }
                TokenKind::Default => {
                    let case_start = self.current_span();
                    self.advance();
                    let block = self.parse_block(BodyKind::Conditional)?;
                    let body = self.ast.body(block).self_expr;
                    let span = case_start.to(self.prev_span());
                    cases.push(self.ast.add_expr(
                        enclosing,
                        ExprKind::Case {
                            value: None,
                            body,
                            is_default: true,
                        },
                        span,
                    ));
                }
                TokenKind::Comment => self.advance(),
                TokenKind::BodyEnd => {
                    self.advance();
                    break;
                }
                _ => return self.error("Expected 'case', 'default', or '}' in switch body"),
            }
        }

        let span = start.to(self.prev_span());
        Ok(self
            .ast
            .add_expr(enclosing, ExprKind::Switch { value, cases }, span))
    }

    /// `"return" expression?`
    fn parse_return(&mut self) -> Result<ExprId, ParseError> {
        let start = self.current_span();
        self.advance(); // 'return'

        let value = if self.current_kind() == &TokenKind::EndOfExpression {
            None
        } else {
            Some(self.parse_expression(ExprContext::Statement)?)
        };

        let span = start.to(self.prev_span());
        Ok(self
            .ast
            .add_expr(self.current_body(), ExprKind::Return { value }, span))
    }
}
