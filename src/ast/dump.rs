//! Depth-indented AST rendering, used by tests and debugging.

use super::{Ast, ExprId, ExprKind, FunctionDefinition};
use crate::interner::Interner;

impl Ast {
    /// Renders the whole file as an indented tree.
    pub fn dump(&self, interner: &Interner) -> String {
        let mut out = String::new();
        let root_expr = self.body(self.root()).self_expr;
        self.dump_expr(root_expr, 0, interner, &mut out);
        out
    }

    fn dump_function(
        &self,
        func: &FunctionDefinition,
        depth: usize,
        interner: &Interner,
        out: &mut String,
    ) {
        let tabs = "\t".repeat(depth);
        let proto = self.proto(func.prototype);
        out.push_str(&format!(
            "{}function {} -> {} {{\n",
            tabs,
            interner.get_string(proto.name),
            proto.return_type
        ));
        for (name, ty) in proto.param_names.iter().zip(&proto.params) {
            out.push_str(&format!(
                "{}\tparam {}: {}\n",
                tabs,
                interner.get_string(*name),
                ty
            ));
        }
        self.dump_expr(func.body, depth + 1, interner, out);
        out.push_str(&format!("{}}}\n", tabs));
    }

    fn dump_expr(&self, id: ExprId, depth: usize, interner: &Interner, out: &mut String) {
        let tabs = "\t".repeat(depth);
        match &self.expr(id).kind {
            ExprKind::Literal { ty, value } => {
                out.push_str(&format!("{}literal {}: {}\n", tabs, value, ty));
            }
            ExprKind::Body(body_id) => {
                let body = self.body(*body_id);
                out.push_str(&format!("{}body {{\n", tabs));
                for (_, proto_id) in &body.prototypes {
                    let proto = self.proto(*proto_id);
                    out.push_str(&format!(
                        "{}\tprototype {} -> {}\n",
                        tabs,
                        interner.get_string(proto.name),
                        proto.return_type
                    ));
                }
                for func in &body.functions {
                    self.dump_function(func, depth + 1, interner, out);
                }
                for expr in &body.expressions {
                    self.dump_expr(*expr, depth + 1, interner, out);
                }
                out.push_str(&format!("{}}}\n", tabs));
            }
            ExprKind::VariableDeclaration { ty, name, init } => {
                out.push_str(&format!(
                    "{}declare {}: {}\n",
                    tabs,
                    interner.get_string(*name),
                    ty
                ));
                if let Some(init) = init {
                    self.dump_expr(*init, depth + 1, interner, out);
                }
            }
            ExprKind::VariableReference { name } => {
                out.push_str(&format!("{}ref {}\n", tabs, interner.get_string(*name)));
            }
            ExprKind::Binary { op, lhs, rhs } => {
                out.push_str(&format!("{}binary {}\n", tabs, op));
                self.dump_expr(*lhs, depth + 1, interner, out);
                self.dump_expr(*rhs, depth + 1, interner, out);
            }
            ExprKind::Unary { op, operand } => {
                out.push_str(&format!("{}unary {}\n", tabs, op));
                self.dump_expr(*operand, depth + 1, interner, out);
            }
            ExprKind::Cast { target, operand } => {
                out.push_str(&format!("{}cast -> {}\n", tabs, target));
                self.dump_expr(*operand, depth + 1, interner, out);
            }
            ExprKind::Call { callee, args, .. } => {
                out.push_str(&format!("{}call {}\n", tabs, interner.get_string(*callee)));
                for arg in args {
                    self.dump_expr(*arg, depth + 1, interner, out);
                }
            }
            ExprKind::If {
                cond,
                then_body,
                else_body,
                ..
            } => {
                out.push_str(&format!("{}if\n", tabs));
                self.dump_expr(*cond, depth + 1, interner, out);
                self.dump_expr(*then_body, depth + 1, interner, out);
                if let Some(else_body) = else_body {
                    out.push_str(&format!("{}else\n", tabs));
                    self.dump_expr(*else_body, depth + 1, interner, out);
                }
            }
            ExprKind::For {
                var_type,
                var_name,
                start,
                end,
                step,
                body,
            } => {
                out.push_str(&format!(
                    "{}for {}: {}\n",
                    tabs,
                    interner.get_string(*var_name),
                    var_type
                ));
                self.dump_expr(*start, depth + 1, interner, out);
                self.dump_expr(*end, depth + 1, interner, out);
                if let Some(step) = step {
                    self.dump_expr(*step, depth + 1, interner, out);
                }
                self.dump_expr(*body, depth + 1, interner, out);
            }
            ExprKind::While { cond, body } => {
                out.push_str(&format!("{}while\n", tabs));
                self.dump_expr(*cond, depth + 1, interner, out);
                self.dump_expr(*body, depth + 1, interner, out);
            }
            ExprKind::Comment => {
                out.push_str(&format!("{}comment\n", tabs));
            }
            ExprKind::Return { value } => {
                out.push_str(&format!("{}return\n", tabs));
                if let Some(value) = value {
                    self.dump_expr(*value, depth + 1, interner, out);
                }
            }
            ExprKind::Continue => {
                out.push_str(&format!("{}continue\n", tabs));
            }
            ExprKind::Break => {
                out.push_str(&format!("{}break\n", tabs));
            }
            ExprKind::Switch { value, cases } => {
                out.push_str(&format!("{}switch\n", tabs));
                self.dump_expr(*value, depth + 1, interner, out);
                for case in cases {
                    self.dump_expr(*case, depth + 1, interner, out);
                }
            }
            ExprKind::Case {
                value,
                body,
                is_default,
            } => {
                if *is_default {
                    out.push_str(&format!("{}default\n", tabs));
                } else {
                    out.push_str(&format!("{}case\n", tabs));
                    if let Some(value) = value {
                        self.dump_expr(*value, depth + 1, interner, out);
                    }
                }
                self.dump_expr(*body, depth + 1, interner, out);
            }
        }
    }
}
