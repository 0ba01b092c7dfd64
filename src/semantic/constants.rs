//! The constant checker.
//!
//! A post-order traversal that classifies every expression as `Constant`
//! or `Variable`, writing each node's status exactly once. The lowering
//! pass consults the flag to emit folded constants instead of runtime
//! instructions.
//!
//! Variable references and calls are always `Variable`; this is a
//! deliberately coarse approximation (a call to a pure function with
//! constant arguments still counts as `Variable`).

use crate::ast::{Ast, ConstantStatus, ExprId, ExprKind};
use crate::ops::BinaryOp;

/// Runs the constant checker over a file, starting at the root body.
///
/// Never fails and never touches `result_type`.
pub fn check(ast: &mut Ast) {
    let root_expr = ast.body(ast.root()).self_expr;
    check_expr(ast, root_expr);
}

fn status_of(ast: &Ast, id: ExprId) -> ConstantStatus {
    ast.expr(id).constant
}

fn all_constant(ast: &Ast, ids: impl IntoIterator<Item = ExprId>) -> bool {
    ids.into_iter()
        .all(|id| status_of(ast, id) == ConstantStatus::Constant)
}

fn check_expr(ast: &mut Ast, id: ExprId) {
    if status_of(ast, id) != ConstantStatus::Unknown {
        return;
    }

    let kind = ast.expr(id).kind.clone();
    let status = match kind {
        ExprKind::Literal { .. } | ExprKind::Comment | ExprKind::Continue | ExprKind::Break => {
            ConstantStatus::Constant
        }
        ExprKind::Body(body_id) => {
            let functions = ast.body(body_id).functions.clone();
            let expressions = ast.body(body_id).expressions.clone();
            for func in &functions {
                check_expr(ast, func.body);
            }
            for &expr in &expressions {
                check_expr(ast, expr);
            }
            let constant = all_constant(ast, functions.iter().map(|f| f.body))
                && all_constant(ast, expressions.iter().copied());
            if constant {
                ConstantStatus::Constant
            } else {
                ConstantStatus::Variable
            }
        }
        ExprKind::VariableDeclaration { init, .. } => match init {
            Some(init) => {
                check_expr(ast, init);
                status_of(ast, init)
            }
            None => ConstantStatus::Constant,
        },
        ExprKind::VariableReference { .. } => ConstantStatus::Variable,
        ExprKind::Binary { op, lhs, rhs } => {
            check_expr(ast, lhs);
            check_expr(ast, rhs);
            if op == BinaryOp::ModuleScope {
                // the left side is a module path, not a value
                status_of(ast, rhs)
            } else if all_constant(ast, [lhs, rhs]) {
                ConstantStatus::Constant
            } else {
                ConstantStatus::Variable
            }
        }
        ExprKind::Unary { operand, .. } | ExprKind::Cast { operand, .. } => {
            check_expr(ast, operand);
            status_of(ast, operand)
        }
        ExprKind::Call { args, .. } => {
            for &arg in &args {
                check_expr(ast, arg);
            }
            ConstantStatus::Variable
        }
        ExprKind::If {
            cond,
            then_body,
            else_body,
            ..
        } => {
            check_expr(ast, cond);
            check_expr(ast, then_body);
            if let Some(else_body) = else_body {
                check_expr(ast, else_body);
            }
            let constant = status_of(ast, cond) == ConstantStatus::Constant
                && status_of(ast, then_body) == ConstantStatus::Constant
                && else_body
                    .map(|e| status_of(ast, e) == ConstantStatus::Constant)
                    .unwrap_or(true);
            if constant {
                ConstantStatus::Constant
            } else {
                ConstantStatus::Variable
            }
        }
        ExprKind::For {
            start,
            end,
            step,
            body,
            ..
        } => {
            check_expr(ast, start);
            check_expr(ast, end);
            if let Some(step) = step {
                check_expr(ast, step);
            }
            check_expr(ast, body);
            ConstantStatus::Variable
        }
        ExprKind::While { cond, body } => {
            check_expr(ast, cond);
            check_expr(ast, body);
            ConstantStatus::Variable
        }
        ExprKind::Return { value } => match value {
            Some(value) => {
                check_expr(ast, value);
                status_of(ast, value)
            }
            None => ConstantStatus::Constant,
        },
        ExprKind::Switch { value, cases } => {
            check_expr(ast, value);
            for &case in &cases {
                check_expr(ast, case);
            }
            let constant = status_of(ast, value) == ConstantStatus::Constant
                && all_constant(ast, cases.iter().copied());
            if constant {
                ConstantStatus::Constant
            } else {
                ConstantStatus::Variable
            }
        }
        ExprKind::Case { value, body, .. } => {
            if let Some(value) = value {
                check_expr(ast, value);
            }
            check_expr(ast, body);
            let constant = value
                .map(|v| status_of(ast, v) == ConstantStatus::Constant)
                .unwrap_or(true)
                && status_of(ast, body) == ConstantStatus::Constant;
            if constant {
                ConstantStatus::Constant
            } else {
                ConstantStatus::Variable
            }
        }
    };

    ast.expr_mut(id).constant = status;
}
