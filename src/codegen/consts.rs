//! Compile-time evaluation of constant expressions.
//!
//! When the constant checker marks a `Binary`, `Unary`, or `Cast` node
//! `Constant`, its leaves are literals and the whole subtree can be
//! folded here into one value, which the lowering pass emits as a single
//! LLVM constant. Evaluation is best-effort: anything it declines (for
//! example a constant division by zero) falls back to the runtime
//! instruction sequence.
//!
//! Integer arithmetic wraps at the operand width; signed operations work
//! on the sign-extended value.

use crate::ast::{Ast, ExprId, ExprKind};
use crate::ops::{BinaryOp, UnaryOp};
use crate::types::{LiteralValue, Type};

/// A folded constant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum ConstValue {
    Int { value: u64, ty: Type },
    Float { value: f64, ty: Type },
    Bool(bool),
    Char(u8),
}

impl ConstValue {
    /// The constant's raw bits as a u64, masked to its width.
    pub(super) fn bits(self) -> u64 {
        match self {
            ConstValue::Int { value, ty } => mask(value, ty.bits()),
            ConstValue::Float { value, .. } => value.to_bits(),
            ConstValue::Bool(b) => b as u64,
            ConstValue::Char(c) => c as u64,
        }
    }
}

/// Masks a value to `bits` bits.
fn mask(value: u64, bits: u8) -> u64 {
    if bits >= 64 {
        value
    } else {
        value & ((1u64 << bits) - 1)
    }
}

/// Sign-extends the low `bits` bits of `value`.
fn sign_extend(value: u64, bits: u8) -> i64 {
    if bits >= 64 {
        value as i64
    } else {
        let shift = 64 - bits as u32;
        ((value << shift) as i64) >> shift
    }
}

/// Evaluates a constant expression, or returns `None` when the node (or
/// an operation on it) is outside the evaluator's scope.
pub(super) fn eval(ast: &Ast, id: ExprId) -> Option<ConstValue> {
    match &ast.expr(id).kind {
        ExprKind::Literal { ty, value } => literal(*ty, *value),
        ExprKind::Unary { op, operand } => {
            let operand = eval(ast, *operand)?;
            unary(*op, operand)
        }
        ExprKind::Cast { target, operand } => {
            let operand = eval(ast, *operand)?;
            cast(operand, *target)
        }
        ExprKind::Binary { op, lhs, rhs } => {
            if *op == BinaryOp::ModuleScope {
                return eval(ast, *rhs);
            }
            let lhs = eval(ast, *lhs)?;
            let rhs = eval(ast, *rhs)?;
            binary(*op, lhs, rhs)
        }
        _ => None,
    }
}

fn literal(ty: Type, value: LiteralValue) -> Option<ConstValue> {
    Some(match (ty, value) {
        (Type::Int { .. }, LiteralValue::Int(v)) => ConstValue::Int { value: v, ty },
        (Type::Float { .. }, LiteralValue::Float(v)) => ConstValue::Float { value: v, ty },
        (Type::Bool, LiteralValue::Bool(b)) => ConstValue::Bool(b),
        (Type::Char, LiteralValue::Char(c)) => ConstValue::Char(c),
        _ => return None,
    })
}

fn unary(op: UnaryOp, operand: ConstValue) -> Option<ConstValue> {
    Some(match (op, operand) {
        (UnaryOp::Plus, v) => v,
        (UnaryOp::Minus, ConstValue::Int { value, ty }) => ConstValue::Int {
            value: mask(value.wrapping_neg(), ty.bits()),
            ty,
        },
        (UnaryOp::Minus, ConstValue::Float { value, ty }) => ConstValue::Float { value: -value, ty },
        (UnaryOp::BooleanNot, ConstValue::Bool(b)) => ConstValue::Bool(!b),
        (UnaryOp::BitwiseNot, ConstValue::Int { value, ty }) => ConstValue::Int {
            value: mask(!value, ty.bits()),
            ty,
        },
        _ => return None,
    })
}

/// Converts between the numeric classes following the cast instruction
/// table: integer truncate/extend by source signedness, int↔float by
/// signedness, integer→bool by comparison with zero.
fn cast(operand: ConstValue, target: Type) -> Option<ConstValue> {
    // normalize the integer-class sources to (bits-as-u64, signedness)
    let int_source = match operand {
        ConstValue::Int { value, ty } => Some((mask(value, ty.bits()), ty.bits(), ty.is_signed())),
        ConstValue::Char(c) => Some((c as u64, 8, true)),
        ConstValue::Bool(b) => Some((b as u64, 1, false)),
        ConstValue::Float { .. } => None,
    };

    if let Some((value, bits, signed)) = int_source {
        return Some(match target {
            Type::Int { bits: to_bits, .. } => {
                let extended = if signed {
                    sign_extend(value, bits) as u64
                } else {
                    value
                };
                ConstValue::Int {
                    value: mask(extended, to_bits),
                    ty: target,
                }
            }
            Type::Char => {
                let extended = if signed {
                    sign_extend(value, bits) as u64
                } else {
                    value
                };
                ConstValue::Char(mask(extended, 8) as u8)
            }
            Type::Bool => ConstValue::Bool(value != 0),
            Type::Float { bits: to_bits } => {
                let numeric = if signed {
                    sign_extend(value, bits) as f64
                } else {
                    value as f64
                };
                ConstValue::Float {
                    value: round_to_width(numeric, to_bits),
                    ty: target,
                }
            }
            Type::Void => return None,
        });
    }

    let ConstValue::Float { value, .. } = operand else {
        return None;
    };
    Some(match target {
        Type::Int { bits, signed } => {
            let truncated = if signed {
                (value as i64) as u64
            } else {
                value as u64
            };
            ConstValue::Int {
                value: mask(truncated, bits),
                ty: target,
            }
        }
        Type::Char => ConstValue::Char(value as i64 as u8),
        Type::Float { bits } => ConstValue::Float {
            value: round_to_width(value, bits),
            ty: target,
        },
        Type::Bool | Type::Void => return None,
    })
}

/// Rounds a float through f32 when the target is 32 bits wide.
fn round_to_width(value: f64, bits: u8) -> f64 {
    if bits == 32 { value as f32 as f64 } else { value }
}

fn binary(op: BinaryOp, lhs: ConstValue, rhs: ConstValue) -> Option<ConstValue> {
    if op.is_assignment() {
        return None;
    }

    match (lhs, rhs) {
        (ConstValue::Int { value: l, ty }, ConstValue::Int { value: r, .. }) => {
            int_binary(op, l, r, ty)
        }
        (ConstValue::Float { value: l, ty }, ConstValue::Float { value: r, .. }) => {
            float_binary(op, l, r, ty)
        }
        (ConstValue::Bool(l), ConstValue::Bool(r)) => bool_binary(op, l, r),
        (ConstValue::Char(l), ConstValue::Char(r)) => char_binary(op, l, r),
        _ => None,
    }
}

fn int_binary(op: BinaryOp, lhs: u64, rhs: u64, ty: Type) -> Option<ConstValue> {
    let bits = ty.bits();
    let signed = ty.is_signed();
    let l = mask(lhs, bits);
    let r = mask(rhs, bits);
    let ls = sign_extend(l, bits);
    let rs = sign_extend(r, bits);

    let wrap = |value: u64| {
        Some(ConstValue::Int {
            value: mask(value, bits),
            ty,
        })
    };
    let flag = |b: bool| Some(ConstValue::Bool(b));

    match op {
        BinaryOp::Addition => wrap(l.wrapping_add(r)),
        BinaryOp::Subtraction => wrap(l.wrapping_sub(r)),
        BinaryOp::Multiplication => wrap(l.wrapping_mul(r)),
        BinaryOp::Division => {
            if r == 0 {
                None
            } else if signed {
                wrap(ls.wrapping_div(rs) as u64)
            } else {
                wrap(l / r)
            }
        }
        BinaryOp::Modulo => {
            if r == 0 {
                None
            } else if signed {
                wrap(ls.wrapping_rem(rs) as u64)
            } else {
                wrap(l % r)
            }
        }
        BinaryOp::LessThan => flag(if signed { ls < rs } else { l < r }),
        BinaryOp::LessThanEqual => flag(if signed { ls <= rs } else { l <= r }),
        BinaryOp::GreaterThan => flag(if signed { ls > rs } else { l > r }),
        BinaryOp::GreaterThanEqual => flag(if signed { ls >= rs } else { l >= r }),
        BinaryOp::EqualTo => flag(l == r),
        BinaryOp::NotEqualTo => flag(l != r),
        BinaryOp::BitwiseAnd => wrap(l & r),
        BinaryOp::BitwiseOr => wrap(l | r),
        BinaryOp::BitwiseXor => wrap(l ^ r),
        BinaryOp::BitwiseShiftLeft => wrap(l.wrapping_shl(r as u32)),
        BinaryOp::BitwiseShiftRight => {
            if signed {
                wrap((ls.wrapping_shr(r as u32)) as u64)
            } else {
                wrap(l.wrapping_shr(r as u32))
            }
        }
        _ => None,
    }
}

fn float_binary(op: BinaryOp, lhs: f64, rhs: f64, ty: Type) -> Option<ConstValue> {
    let value = |v: f64| {
        Some(ConstValue::Float {
            value: round_to_width(v, ty.bits()),
            ty,
        })
    };
    let flag = |b: bool| Some(ConstValue::Bool(b));

    match op {
        BinaryOp::Addition => value(lhs + rhs),
        BinaryOp::Subtraction => value(lhs - rhs),
        BinaryOp::Multiplication => value(lhs * rhs),
        BinaryOp::Division => value(lhs / rhs),
        BinaryOp::LessThan => flag(lhs < rhs),
        BinaryOp::LessThanEqual => flag(lhs <= rhs),
        BinaryOp::GreaterThan => flag(lhs > rhs),
        BinaryOp::GreaterThanEqual => flag(lhs >= rhs),
        BinaryOp::EqualTo => flag(lhs == rhs),
        BinaryOp::NotEqualTo => flag(lhs != rhs),
        _ => None,
    }
}

fn bool_binary(op: BinaryOp, lhs: bool, rhs: bool) -> Option<ConstValue> {
    // one-bit values, so the boolean operators are plain bitwise ops
    Some(ConstValue::Bool(match op {
        BinaryOp::BooleanAnd => lhs && rhs,
        BinaryOp::BooleanOr => lhs || rhs,
        BinaryOp::EqualTo => lhs == rhs,
        BinaryOp::NotEqualTo => lhs != rhs,
        BinaryOp::LessThan => !lhs & rhs,
        BinaryOp::LessThanEqual => lhs <= rhs,
        BinaryOp::GreaterThan => lhs & !rhs,
        BinaryOp::GreaterThanEqual => lhs >= rhs,
        _ => return None,
    }))
}

fn char_binary(op: BinaryOp, lhs: u8, rhs: u8) -> Option<ConstValue> {
    let l = lhs as i8;
    let r = rhs as i8;
    Some(ConstValue::Bool(match op {
        BinaryOp::LessThan => l < r,
        BinaryOp::LessThanEqual => l <= r,
        BinaryOp::GreaterThan => l > r,
        BinaryOp::GreaterThanEqual => l >= r,
        BinaryOp::EqualTo => l == r,
        BinaryOp::NotEqualTo => l != r,
        _ => return None,
    }))
}
