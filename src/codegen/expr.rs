//! Expression lowering.
//!
//! `generate_expr` produces at most one LLVM value per expression node:
//! statements (loops, returns, breaks, comments, empty bodies) produce
//! `None`. Opcode selection dispatches on (operator, operand type kind,
//! signedness); nodes the constant checker marked `Constant` are folded
//! through the compile-time evaluator first.

use inkwell::basic_block::BasicBlock;
use inkwell::values::{BasicMetadataValueEnum, BasicValueEnum, IntValue};
use inkwell::{FloatPredicate, IntPredicate};

use super::consts::{self, ConstValue};
use super::{Codegen, CodegenError, Slot};
use crate::ast::{Ast, ExprId, ExprKind};
use crate::interner::{Interner, NameId};
use crate::mangle;
use crate::ops::{BinaryOp, UnaryOp};
use crate::token::Span;
use crate::types::Type;

impl<'ctx> Codegen<'ctx> {
    /// Lowers one expression, returning its value if it produces one.
    pub(super) fn generate_expr(
        &mut self,
        ast: &Ast,
        interner: &Interner,
        id: ExprId,
    ) -> Result<Option<BasicValueEnum<'ctx>>, CodegenError> {
        let span = ast.expr(id).span;
        match &ast.expr(id).kind {
            ExprKind::Literal { .. } => {
                let value = consts::eval(ast, id).ok_or_else(|| {
                    CodegenError::internal("literal failed constant evaluation", span)
                })?;
                Ok(Some(self.const_to_llvm(value)))
            }
            ExprKind::Body(body_id) => {
                let mut value = None;
                for &expr in &ast.body(*body_id).expressions {
                    if self.block_terminated() {
                        break;
                    }
                    value = self.generate_expr(ast, interner, expr)?;
                }
                Ok(value)
            }
            ExprKind::VariableDeclaration { ty, name, init } => {
                self.generate_declaration(ast, interner, id, *ty, *name, *init, span)
            }
            ExprKind::VariableReference { name } => {
                let body = ast.enclosing_body(id).ok_or_else(|| {
                    CodegenError::internal("reference outside any body", span)
                })?;
                let slot = self.lookup_slot(ast, body, *name).ok_or_else(|| {
                    CodegenError::internal(
                        format!("unknown variable name: {}", interner.get_string(*name)),
                        span,
                    )
                })?;
                let loaded = self
                    .builder
                    .build_load(slot.ptr, interner.get_string(*name))
                    .map_err(|e| CodegenError::llvm("load", e, span))?;
                Ok(Some(loaded))
            }
            ExprKind::Binary { op, lhs, rhs } => {
                self.generate_binary(ast, interner, id, *op, *lhs, *rhs, span)
            }
            ExprKind::Unary { op, operand } => {
                self.generate_unary(ast, interner, id, *op, *operand, span)
            }
            ExprKind::Cast { target, operand } => {
                self.generate_cast(ast, interner, id, *target, *operand, span)
            }
            ExprKind::Call {
                callee,
                is_extern,
                args,
            } => self.generate_call(ast, interner, id, *callee, *is_extern, args, span),
            ExprKind::If {
                cond,
                then_body,
                else_body,
                yields_value,
            } => self.generate_if(
                ast,
                interner,
                id,
                *cond,
                *then_body,
                *else_body,
                *yields_value,
                span,
            ),
            ExprKind::For {
                var_type,
                var_name,
                start,
                end,
                step,
                body,
            } => {
                self.generate_for(
                    ast, interner, *var_type, *var_name, *start, *end, *step, *body, span,
                )?;
                Ok(None)
            }
            ExprKind::While { cond, body } => {
                self.generate_while(ast, interner, *cond, *body, span)?;
                Ok(None)
            }
            ExprKind::Comment => Ok(None),
            ExprKind::Return { value } => {
                match value {
                    Some(value) => {
                        let returned =
                            self.generate_expr(ast, interner, *value)?.ok_or_else(|| {
                                CodegenError::internal("return expression has no value", span)
                            })?;
                        self.builder
                            .build_return(Some(&returned))
                            .map_err(|e| CodegenError::llvm("ret", e, span))?;
                    }
                    None => {
                        self.builder
                            .build_return(None)
                            .map_err(|e| CodegenError::llvm("ret", e, span))?;
                    }
                }
                Ok(None)
            }
            ExprKind::Continue => {
                let target = *self.continue_blocks.last().ok_or_else(|| {
                    CodegenError::internal("'continue' outside of a loop", span)
                })?;
                self.builder
                    .build_unconditional_branch(target)
                    .map_err(|e| CodegenError::llvm("br", e, span))?;
                Ok(None)
            }
            ExprKind::Break => {
                let target = *self.break_blocks.last().ok_or_else(|| {
                    CodegenError::internal("'break' outside of a loop or switch", span)
                })?;
                self.builder
                    .build_unconditional_branch(target)
                    .map_err(|e| CodegenError::llvm("br", e, span))?;
                Ok(None)
            }
            ExprKind::Switch { value, cases } => {
                self.generate_switch(ast, interner, *value, cases, span)?;
                Ok(None)
            }
            ExprKind::Case { body, .. } => {
                // lowered through the enclosing switch; direct evaluation
                // only happens for the body
                self.generate_expr(ast, interner, *body)
            }
        }
    }

    fn cached_type(&self, ast: &Ast, id: ExprId, span: Span) -> Result<Type, CodegenError> {
        ast.cached_type(id)
            .ok_or_else(|| CodegenError::internal("expression has no cached type", span))
    }

    fn const_to_llvm(&self, value: ConstValue) -> BasicValueEnum<'ctx> {
        match value {
            ConstValue::Int { ty, .. } => self
                .llvm_type(ty)
                .into_int_type()
                .const_int(value.bits(), ty.is_signed())
                .into(),
            ConstValue::Float { value, ty } => self
                .llvm_type(ty)
                .into_float_type()
                .const_float(value)
                .into(),
            ConstValue::Bool(b) => self.context.bool_type().const_int(b as u64, false).into(),
            ConstValue::Char(c) => self.context.i8_type().const_int(c as u64, false).into(),
        }
    }

    fn expect_value(
        &mut self,
        ast: &Ast,
        interner: &Interner,
        id: ExprId,
        span: Span,
    ) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        self.generate_expr(ast, interner, id)?
            .ok_or_else(|| CodegenError::internal("expression produced no value", span))
    }

    #[allow(clippy::too_many_arguments)]
    fn generate_declaration(
        &mut self,
        ast: &Ast,
        interner: &Interner,
        id: ExprId,
        ty: Type,
        name: NameId,
        init: Option<ExprId>,
        span: Span,
    ) -> Result<Option<BasicValueEnum<'ctx>>, CodegenError> {
        let init_value = match init {
            Some(init) => self.expect_value(ast, interner, init, span)?,
            None => self.default_value(ty),
        };

        let function = self.current_function(span)?;
        let llvm_ty = self.llvm_type(ty);
        let slot =
            self.create_entry_alloca(function, llvm_ty, interner.get_string(name), span)?;
        self.builder
            .build_store(slot, init_value)
            .map_err(|e| CodegenError::llvm("store", e, span))?;

        let body = ast
            .enclosing_body(id)
            .ok_or_else(|| CodegenError::internal("declaration outside any body", span))?;
        self.slots.insert(
            (body, name),
            Slot {
                ptr: slot,
                ty: llvm_ty,
            },
        );
        Ok(Some(init_value))
    }

    #[allow(clippy::too_many_arguments)]
    fn generate_binary(
        &mut self,
        ast: &Ast,
        interner: &Interner,
        id: ExprId,
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
        span: Span,
    ) -> Result<Option<BasicValueEnum<'ctx>>, CodegenError> {
        if op == BinaryOp::ModuleScope {
            // the left side is a module path; only the call carries code
            return self.generate_expr(ast, interner, rhs);
        }

        if op.is_assignment() {
            return self.generate_assignment(ast, interner, op, lhs, rhs, span);
        }

        // folded form for constant subtrees
        if ast.expr(id).is_constant() {
            if let Some(folded) = consts::eval(ast, id) {
                return Ok(Some(self.const_to_llvm(folded)));
            }
        }

        if op.is_boolean() {
            return self
                .generate_short_circuit(ast, interner, op, lhs, rhs, span)
                .map(Some);
        }

        let operand_ty = self.cached_type(ast, lhs, span)?;
        let lhs_value = self.expect_value(ast, interner, lhs, span)?;
        let rhs_value = self.expect_value(ast, interner, rhs, span)?;
        self.emit_binary_op(op, operand_ty, lhs_value, rhs_value, span)
            .map(Some)
    }

    /// Assignments do not evaluate their left side; the target slot is
    /// looked up and the right side stored into it. Compound forms load
    /// the slot, apply the underlying operator, and store the result.
    fn generate_assignment(
        &mut self,
        ast: &Ast,
        interner: &Interner,
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
        span: Span,
    ) -> Result<Option<BasicValueEnum<'ctx>>, CodegenError> {
        let ExprKind::VariableReference { name } = ast.expr(lhs).kind else {
            return Err(CodegenError::internal(
                "destination of '=' must be an identifier",
                span,
            ));
        };
        let body = ast
            .enclosing_body(lhs)
            .ok_or_else(|| CodegenError::internal("assignment outside any body", span))?;
        let slot = self.lookup_slot(ast, body, name).ok_or_else(|| {
            CodegenError::internal(
                format!("unknown variable name: {}", interner.get_string(name)),
                span,
            )
        })?;

        let rhs_value = self.expect_value(ast, interner, rhs, span)?;
        let stored = match op.compound_base() {
            None => rhs_value,
            Some(base) => {
                let operand_ty = self.cached_type(ast, lhs, span)?;
                let current = self
                    .builder
                    .build_load(slot.ptr, interner.get_string(name))
                    .map_err(|e| CodegenError::llvm("load", e, span))?;
                self.emit_binary_op(base, operand_ty, current, rhs_value, span)?
            }
        };

        self.builder
            .build_store(slot.ptr, stored)
            .map_err(|e| CodegenError::llvm("store", e, span))?;
        Ok(Some(stored))
    }

    /// Selects the opcode for a non-short-circuit binary operator from
    /// (operator, operand type kind, signedness).
    fn emit_binary_op(
        &mut self,
        op: BinaryOp,
        operand_ty: Type,
        lhs: BasicValueEnum<'ctx>,
        rhs: BasicValueEnum<'ctx>,
        span: Span,
    ) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        if operand_ty.is_int_class() {
            self.emit_int_binary_op(op, operand_ty, lhs.into_int_value(), rhs.into_int_value(), span)
        } else {
            self.emit_float_binary_op(op, lhs, rhs, span)
        }
    }

    fn emit_int_binary_op(
        &mut self,
        op: BinaryOp,
        ty: Type,
        lhs: IntValue<'ctx>,
        rhs: IntValue<'ctx>,
        span: Span,
    ) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        let signed = ty.is_signed();
        let b = &self.builder;
        let err = |e| CodegenError::llvm("integer op", e, span);

        let value: IntValue<'ctx> = match op {
            BinaryOp::Addition => b.build_int_add(lhs, rhs, "add").map_err(err)?,
            BinaryOp::Subtraction => b.build_int_sub(lhs, rhs, "sub").map_err(err)?,
            BinaryOp::Multiplication => b.build_int_mul(lhs, rhs, "mul").map_err(err)?,
            BinaryOp::Division => {
                if signed {
                    b.build_int_signed_div(lhs, rhs, "sdiv").map_err(err)?
                } else {
                    b.build_int_unsigned_div(lhs, rhs, "udiv").map_err(err)?
                }
            }
            BinaryOp::Modulo => {
                if signed {
                    b.build_int_signed_rem(lhs, rhs, "srem").map_err(err)?
                } else {
                    b.build_int_unsigned_rem(lhs, rhs, "urem").map_err(err)?
                }
            }
            BinaryOp::LessThan => {
                let pred = if signed {
                    IntPredicate::SLT
                } else {
                    IntPredicate::ULT
                };
                b.build_int_compare(pred, lhs, rhs, "lt").map_err(err)?
            }
            BinaryOp::LessThanEqual => {
                let pred = if signed {
                    IntPredicate::SLE
                } else {
                    IntPredicate::ULE
                };
                b.build_int_compare(pred, lhs, rhs, "lte").map_err(err)?
            }
            BinaryOp::GreaterThan => {
                let pred = if signed {
                    IntPredicate::SGT
                } else {
                    IntPredicate::UGT
                };
                b.build_int_compare(pred, lhs, rhs, "gt").map_err(err)?
            }
            BinaryOp::GreaterThanEqual => {
                let pred = if signed {
                    IntPredicate::SGE
                } else {
                    IntPredicate::UGE
                };
                b.build_int_compare(pred, lhs, rhs, "gte").map_err(err)?
            }
            BinaryOp::EqualTo => b
                .build_int_compare(IntPredicate::EQ, lhs, rhs, "eq")
                .map_err(err)?,
            BinaryOp::NotEqualTo => b
                .build_int_compare(IntPredicate::NE, lhs, rhs, "ne")
                .map_err(err)?,
            BinaryOp::BitwiseAnd => b.build_and(lhs, rhs, "bitwise_and").map_err(err)?,
            BinaryOp::BitwiseOr => b.build_or(lhs, rhs, "bitwise_or").map_err(err)?,
            BinaryOp::BitwiseXor => b.build_xor(lhs, rhs, "bitwise_xor").map_err(err)?,
            BinaryOp::BitwiseShiftLeft => b.build_left_shift(lhs, rhs, "shift_left").map_err(err)?,
            BinaryOp::BitwiseShiftRight => b
                .build_right_shift(lhs, rhs, signed, "shift_right")
                .map_err(err)?,
            other => {
                return Err(CodegenError::internal(
                    format!("operator {} has no integer lowering", other),
                    span,
                ));
            }
        };
        Ok(value.into())
    }

    fn emit_float_binary_op(
        &mut self,
        op: BinaryOp,
        lhs: BasicValueEnum<'ctx>,
        rhs: BasicValueEnum<'ctx>,
        span: Span,
    ) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        let lhs = lhs.into_float_value();
        let rhs = rhs.into_float_value();
        let b = &self.builder;
        let err = |e| CodegenError::llvm("float op", e, span);

        let compare = |pred| {
            b.build_float_compare(pred, lhs, rhs, "fcmp")
                .map_err(err)
                .map(BasicValueEnum::from)
        };

        match op {
            BinaryOp::Addition => Ok(b.build_float_add(lhs, rhs, "fadd").map_err(err)?.into()),
            BinaryOp::Subtraction => Ok(b.build_float_sub(lhs, rhs, "fsub").map_err(err)?.into()),
            BinaryOp::Multiplication => {
                Ok(b.build_float_mul(lhs, rhs, "fmul").map_err(err)?.into())
            }
            BinaryOp::Division => Ok(b.build_float_div(lhs, rhs, "fdiv").map_err(err)?.into()),
            BinaryOp::Modulo => Ok(b.build_float_rem(lhs, rhs, "frem").map_err(err)?.into()),
            BinaryOp::LessThan => compare(FloatPredicate::OLT),
            BinaryOp::LessThanEqual => compare(FloatPredicate::OLE),
            BinaryOp::GreaterThan => compare(FloatPredicate::OGT),
            BinaryOp::GreaterThanEqual => compare(FloatPredicate::OGE),
            BinaryOp::EqualTo => compare(FloatPredicate::OEQ),
            BinaryOp::NotEqualTo => compare(FloatPredicate::ONE),
            other => Err(CodegenError::internal(
                format!("operator {} has no float lowering", other),
                span,
            )),
        }
    }

    /// Lowers `&&`/`||` into the five-block short-circuit pattern with a
    /// phi merging the short-circuit constant and the right-hand value.
    fn generate_short_circuit(
        &mut self,
        ast: &Ast,
        interner: &Interner,
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
        span: Span,
    ) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        let is_and = op == BinaryOp::BooleanAnd;
        let prefix = if is_and { "and" } else { "or" };
        let function = self.current_function(span)?;

        let block = |name: &str| {
            self.context
                .append_basic_block(function, &format!("{}.{}", prefix, name))
        };
        let lhs_block = block("lhs.start");
        let lhs_end = block("lhs.end");
        let rhs_block = block("rhs.start");
        let rhs_end = block("rhs.end");
        let end_block = block("end");

        self.builder
            .build_unconditional_branch(lhs_block)
            .map_err(|e| CodegenError::llvm("br", e, span))?;

        self.builder.position_at_end(lhs_block);
        let lhs_value = self.expect_value(ast, interner, lhs, span)?.into_int_value();
        self.builder
            .build_unconditional_branch(lhs_end)
            .map_err(|e| CodegenError::llvm("br", e, span))?;

        self.builder.position_at_end(lhs_end);
        if is_and {
            self.builder
                .build_conditional_branch(lhs_value, rhs_block, end_block)
        } else {
            self.builder
                .build_conditional_branch(lhs_value, end_block, rhs_block)
        }
        .map_err(|e| CodegenError::llvm("condbr", e, span))?;

        self.builder.position_at_end(rhs_block);
        let rhs_value = self.expect_value(ast, interner, rhs, span)?;
        self.builder
            .build_unconditional_branch(rhs_end)
            .map_err(|e| CodegenError::llvm("br", e, span))?;

        self.builder.position_at_end(rhs_end);
        self.builder
            .build_unconditional_branch(end_block)
            .map_err(|e| CodegenError::llvm("br", e, span))?;

        self.builder.position_at_end(end_block);
        let phi = self
            .builder
            .build_phi(self.context.bool_type(), &format!("{}.res", prefix))
            .map_err(|e| CodegenError::llvm("phi", e, span))?;
        let short_circuit = self.context.bool_type().const_int(!is_and as u64, false);
        phi.add_incoming(&[(&short_circuit, lhs_end), (&rhs_value, rhs_end)]);
        Ok(phi.as_basic_value())
    }

    #[allow(clippy::too_many_arguments)]
    fn generate_unary(
        &mut self,
        ast: &Ast,
        interner: &Interner,
        id: ExprId,
        op: UnaryOp,
        operand: ExprId,
        span: Span,
    ) -> Result<Option<BasicValueEnum<'ctx>>, CodegenError> {
        if ast.expr(id).is_constant() {
            if let Some(folded) = consts::eval(ast, id) {
                return Ok(Some(self.const_to_llvm(folded)));
            }
        }

        let value = self.expect_value(ast, interner, operand, span)?;
        let operand_ty = self.cached_type(ast, operand, span)?;

        let result: BasicValueEnum<'ctx> = match op {
            UnaryOp::Plus => value,
            UnaryOp::Minus => {
                if operand_ty.is_int_class() {
                    self.builder
                        .build_int_neg(value.into_int_value(), "neg")
                        .map_err(|e| CodegenError::llvm("neg", e, span))?
                        .into()
                } else {
                    self.builder
                        .build_float_neg(value.into_float_value(), "fneg")
                        .map_err(|e| CodegenError::llvm("fneg", e, span))?
                        .into()
                }
            }
            // logical and bitwise not share one instruction: bool is one bit
            UnaryOp::BooleanNot => self
                .builder
                .build_not(value.into_int_value(), "boolean_not")
                .map_err(|e| CodegenError::llvm("not", e, span))?
                .into(),
            UnaryOp::BitwiseNot => self
                .builder
                .build_not(value.into_int_value(), "bitwise_not")
                .map_err(|e| CodegenError::llvm("not", e, span))?
                .into(),
        };
        Ok(Some(result))
    }

    /// Lowers a cast by the pair table: truncate / sign- or zero-extend
    /// for integers, int↔float conversions by signedness, `icmp ne 0`
    /// for integer→bool, and fptrunc/fpext between float widths.
    #[allow(clippy::too_many_arguments)]
    fn generate_cast(
        &mut self,
        ast: &Ast,
        interner: &Interner,
        id: ExprId,
        target: Type,
        operand: ExprId,
        span: Span,
    ) -> Result<Option<BasicValueEnum<'ctx>>, CodegenError> {
        if ast.expr(id).is_constant() {
            if let Some(folded) = consts::eval(ast, id) {
                return Ok(Some(self.const_to_llvm(folded)));
            }
        }

        let from = self.cached_type(ast, operand, span)?;
        let value = self.expect_value(ast, interner, operand, span)?;
        if from == target {
            return Ok(Some(value));
        }

        let err = |e| CodegenError::llvm("cast", e, span);
        let result: BasicValueEnum<'ctx> = if from.is_int_class() {
            let int_value = value.into_int_value();
            match target {
                Type::Int { .. } | Type::Char => {
                    let to_bits = target.bits();
                    let to_ty = self.llvm_type(target).into_int_type();
                    if from.bits() == to_bits {
                        // a pure sign reinterpretation keeps the bits
                        value
                    } else if from.bits() > to_bits {
                        self.builder
                            .build_int_truncate(int_value, to_ty, "cast_int_trunc")
                            .map_err(err)?
                            .into()
                    } else if from.is_signed() {
                        self.builder
                            .build_int_s_extend(int_value, to_ty, "cast_si_ext")
                            .map_err(err)?
                            .into()
                    } else {
                        self.builder
                            .build_int_z_extend(int_value, to_ty, "cast_ui_ext")
                            .map_err(err)?
                            .into()
                    }
                }
                Type::Bool => {
                    let zero = self.llvm_type(from).into_int_type().const_zero();
                    self.builder
                        .build_int_compare(IntPredicate::NE, int_value, zero, "convert_to_bool")
                        .map_err(err)?
                        .into()
                }
                Type::Float { .. } => {
                    let to_ty = self.llvm_type(target).into_float_type();
                    if from.is_signed() {
                        self.builder
                            .build_signed_int_to_float(int_value, to_ty, "cast_si_fp")
                            .map_err(err)?
                            .into()
                    } else {
                        self.builder
                            .build_unsigned_int_to_float(int_value, to_ty, "cast_ui_fp")
                            .map_err(err)?
                            .into()
                    }
                }
                _ => {
                    return Err(CodegenError::internal("invalid target cast type", span));
                }
            }
        } else {
            let float_value = value.into_float_value();
            match target {
                Type::Int { .. } | Type::Char => {
                    let to_ty = self.llvm_type(target).into_int_type();
                    if target.is_signed() {
                        self.builder
                            .build_float_to_signed_int(float_value, to_ty, "cast_fp_si")
                            .map_err(err)?
                            .into()
                    } else {
                        self.builder
                            .build_float_to_unsigned_int(float_value, to_ty, "cast_fp_ui")
                            .map_err(err)?
                            .into()
                    }
                }
                Type::Float { .. } => {
                    let to_ty = self.llvm_type(target).into_float_type();
                    if from.bits() > target.bits() {
                        self.builder
                            .build_float_trunc(float_value, to_ty, "cast_fp_trunc")
                            .map_err(err)?
                            .into()
                    } else {
                        self.builder
                            .build_float_ext(float_value, to_ty, "cast_fp_ext")
                            .map_err(err)?
                            .into()
                    }
                }
                _ => {
                    return Err(CodegenError::internal("invalid target cast type", span));
                }
            }
        };
        Ok(Some(result))
    }

    #[allow(clippy::too_many_arguments)]
    fn generate_call(
        &mut self,
        ast: &Ast,
        interner: &Interner,
        id: ExprId,
        callee: NameId,
        is_extern: bool,
        args: &[ExprId],
        span: Span,
    ) -> Result<Option<BasicValueEnum<'ctx>>, CodegenError> {
        // extern call sites link against the bare function name
        let name = if is_extern {
            mangle::demangled_function_name(interner, callee)
        } else {
            interner.get_string(callee).to_string()
        };

        let function = self.module.get_function(&name).ok_or_else(|| {
            CodegenError::internal(format!("unknown function referenced: {}", name), span)
        })?;
        if function.count_params() as usize != args.len() {
            return Err(CodegenError::internal(
                format!("incorrect number of arguments passed to '{}'", name),
                span,
            ));
        }

        let mut arg_values: Vec<BasicMetadataValueEnum<'ctx>> = Vec::with_capacity(args.len());
        for &arg in args {
            arg_values.push(self.expect_value(ast, interner, arg, span)?.into());
        }

        // void call sites must not name their result
        let result_name = match self.cached_type(ast, id, span)? {
            Type::Void => "",
            _ => "call",
        };
        let call = self
            .builder
            .build_call(function, &arg_values, result_name)
            .map_err(|e| CodegenError::llvm("call", e, span))?;
        Ok(call.try_as_basic_value().basic())
    }

    #[allow(clippy::too_many_arguments)]
    fn generate_if(
        &mut self,
        ast: &Ast,
        interner: &Interner,
        id: ExprId,
        cond: ExprId,
        then_body: ExprId,
        else_body: Option<ExprId>,
        yields_value: bool,
        span: Span,
    ) -> Result<Option<BasicValueEnum<'ctx>>, CodegenError> {
        let cond_value = self.expect_value(ast, interner, cond, span)?.into_int_value();
        let function = self.current_function(span)?;

        let then_block = self.context.append_basic_block(function, "if.body");
        let else_block = else_body
            .map(|_| self.context.append_basic_block(function, "else.body"));
        let merge_block = self.context.append_basic_block(function, "if.end");

        self.builder
            .build_conditional_branch(cond_value, then_block, else_block.unwrap_or(merge_block))
            .map_err(|e| CodegenError::llvm("condbr", e, span))?;

        // each branch falls through to if.end unless it already left the
        // function; phi edges only exist for branches that arrived
        let mut incoming: Vec<(BasicValueEnum<'ctx>, BasicBlock<'ctx>)> = Vec::new();

        self.builder.position_at_end(then_block);
        let then_value = self.generate_expr(ast, interner, then_body)?;
        if let Some(block) = self.branch_unless_terminated(merge_block, span)? {
            if let Some(value) = then_value {
                incoming.push((value, block));
            }
        }

        if let (Some(else_block), Some(else_body)) = (else_block, else_body) {
            self.builder.position_at_end(else_block);
            let else_value = self.generate_expr(ast, interner, else_body)?;
            if let Some(block) = self.branch_unless_terminated(merge_block, span)? {
                if let Some(value) = else_value {
                    incoming.push((value, block));
                }
            }
        }

        self.builder.position_at_end(merge_block);

        if !yields_value {
            return Ok(None);
        }

        match incoming.len() {
            2 => {
                let ty = self.cached_type(ast, id, span)?;
                let phi = self
                    .builder
                    .build_phi(self.llvm_type(ty), "ifres")
                    .map_err(|e| CodegenError::llvm("phi", e, span))?;
                phi.add_incoming(&[
                    (&incoming[0].0, incoming[0].1),
                    (&incoming[1].0, incoming[1].1),
                ]);
                Ok(Some(phi.as_basic_value()))
            }
            1 => Ok(Some(incoming[0].0)),
            _ => Ok(None),
        }
    }

    /// Lowers a `for` loop: the variable slot is stored in the preheader,
    /// the body runs first, then the step, then the condition branches
    /// back to the body or out.
    #[allow(clippy::too_many_arguments)]
    fn generate_for(
        &mut self,
        ast: &Ast,
        interner: &Interner,
        var_type: Type,
        var_name: NameId,
        start: ExprId,
        end: ExprId,
        step: Option<ExprId>,
        body: ExprId,
        span: Span,
    ) -> Result<(), CodegenError> {
        let function = self.current_function(span)?;
        let body_id = ast.expr_body(body);

        let llvm_ty = self.llvm_type(var_type);
        let slot =
            self.create_entry_alloca(function, llvm_ty, interner.get_string(var_name), span)?;
        let start_value = self.expect_value(ast, interner, start, span)?;
        self.builder
            .build_store(slot, start_value)
            .map_err(|e| CodegenError::llvm("store", e, span))?;
        self.slots.insert(
            (body_id, var_name),
            Slot {
                ptr: slot,
                ty: llvm_ty,
            },
        );

        let cond_block = self.context.append_basic_block(function, "for.cond");
        let step_block = self.context.append_basic_block(function, "for.step");
        let body_block = self.context.append_basic_block(function, "for.body");
        let end_block = self.context.append_basic_block(function, "for.end");

        self.builder
            .build_unconditional_branch(body_block)
            .map_err(|e| CodegenError::llvm("br", e, span))?;

        self.builder.position_at_end(body_block);
        self.continue_blocks.push(step_block);
        self.break_blocks.push(end_block);
        let body_result = self.generate_expr(ast, interner, body);
        self.continue_blocks.pop();
        self.break_blocks.pop();
        body_result?;
        self.branch_unless_terminated(step_block, span)?;

        self.builder.position_at_end(step_block);
        if let Some(step) = step {
            self.generate_expr(ast, interner, step)?;
        }
        self.branch_unless_terminated(cond_block, span)?;

        self.builder.position_at_end(cond_block);
        let end_value = self.expect_value(ast, interner, end, span)?.into_int_value();
        self.builder
            .build_conditional_branch(end_value, body_block, end_block)
            .map_err(|e| CodegenError::llvm("condbr", e, span))?;

        self.builder.position_at_end(end_block);
        Ok(())
    }

    /// Lowers a `while` loop: fall through to the condition, branch into
    /// the body, back to the condition, out to the end.
    fn generate_while(
        &mut self,
        ast: &Ast,
        interner: &Interner,
        cond: ExprId,
        body: ExprId,
        span: Span,
    ) -> Result<(), CodegenError> {
        let function = self.current_function(span)?;

        let cond_block = self.context.append_basic_block(function, "while.cond");
        self.builder
            .build_unconditional_branch(cond_block)
            .map_err(|e| CodegenError::llvm("br", e, span))?;

        let body_block = self.context.append_basic_block(function, "while.body");
        let end_block = self.context.append_basic_block(function, "while.end");

        self.builder.position_at_end(body_block);
        self.continue_blocks.push(cond_block);
        self.break_blocks.push(end_block);
        let body_result = self.generate_expr(ast, interner, body);
        self.continue_blocks.pop();
        self.break_blocks.pop();
        body_result?;
        self.branch_unless_terminated(cond_block, span)?;

        self.builder.position_at_end(cond_block);
        let cond_value = self.expect_value(ast, interner, cond, span)?.into_int_value();
        self.builder
            .build_conditional_branch(cond_value, body_block, end_block)
            .map_err(|e| CodegenError::llvm("condbr", e, span))?;

        self.builder.position_at_end(end_block);
        Ok(())
    }

    /// Lowers a switch: one block per case, fall-through between cases
    /// unless a case ends in `break`, default routed through the switch
    /// instruction's default destination.
    fn generate_switch(
        &mut self,
        ast: &Ast,
        interner: &Interner,
        value: ExprId,
        cases: &[ExprId],
        span: Span,
    ) -> Result<(), CodegenError> {
        let function = self.current_function(span)?;
        let switch_value = self.expect_value(ast, interner, value, span)?.into_int_value();

        let mut case_blocks = Vec::with_capacity(cases.len());
        let mut case_values = Vec::new();
        let mut default_block = None;

        for &case in cases {
            let ExprKind::Case {
                value: case_value,
                is_default,
                ..
            } = &ast.expr(case).kind
            else {
                return Err(CodegenError::internal("switch arm is not a case", span));
            };

            let block_name = if *is_default { "case.default" } else { "switch.case" };
            let block = self.context.append_basic_block(function, block_name);
            case_blocks.push(block);

            if *is_default {
                default_block = Some(block);
            } else {
                let case_value = (*case_value)
                    .ok_or_else(|| CodegenError::internal("case has no value", span))?;
                let folded = consts::eval(ast, case_value).ok_or_else(|| {
                    CodegenError::internal("case value is not a constant", span)
                })?;
                let ty = self.cached_type(ast, case_value, span)?;
                let constant = self
                    .llvm_type(ty)
                    .into_int_type()
                    .const_int(folded.bits(), ty.is_signed());
                case_values.push((constant, block));
            }
        }

        let end_block = self.context.append_basic_block(function, "switch.end");

        self.builder
            .build_switch(
                switch_value,
                default_block.unwrap_or(end_block),
                &case_values,
            )
            .map_err(|e| CodegenError::llvm("switch", e, span))?;

        self.break_blocks.push(end_block);
        let result =
            self.generate_switch_cases(ast, interner, cases, &case_blocks, end_block, span);
        self.break_blocks.pop();
        result?;

        self.builder.position_at_end(end_block);
        Ok(())
    }

    fn generate_switch_cases(
        &mut self,
        ast: &Ast,
        interner: &Interner,
        cases: &[ExprId],
        case_blocks: &[BasicBlock<'ctx>],
        end_block: BasicBlock<'ctx>,
        span: Span,
    ) -> Result<(), CodegenError> {
        for (index, &case) in cases.iter().enumerate() {
            let ExprKind::Case { body, .. } = &ast.expr(case).kind else {
                continue;
            };
            let body = *body;
            self.builder.position_at_end(case_blocks[index]);
            self.generate_expr(ast, interner, body)?;
            // fall through to the next case; the last case exits
            let next = case_blocks.get(index + 1).copied().unwrap_or(end_block);
            self.branch_unless_terminated(next, span)?;
        }
        Ok(())
    }
}
