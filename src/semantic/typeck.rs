//! The type checker.
//!
//! Two passes over the files in build order:
//!
//! 1. **Prototype pass** ([`check_prototypes`]): mangles every prototype
//!    against the file's module, re-keys the body prototype maps, records
//!    the global body's functions in the module's export set (detecting
//!    duplicate signatures within a module), and registers them in the
//!    root body's in-scope registry.
//! 2. **Body pass** ([`TypeChecker::check`]): a recursive check of every
//!    expression that validates declarations, references, operator
//!    applicability, call signatures, branch and loop typing, and return
//!    conformance. The pass caches each expression's result type exactly
//!    once; re-running it short-circuits on the caches and reproduces the
//!    same verdict.
//!
//! Call sites are resolved here: the callee id is rewritten to the
//! mangled id of the matched prototype and the node's mangled flag set,
//! so the lowering pass needs no further name resolution.

use super::scope;
use super::{SemanticError, SemanticErrorKind};
use crate::ast::{
    Ast, BodyId, BodyKind, ExprId, ExprKind, FunctionDefinition, FunctionPrototype, RefKind,
};
use crate::interner::{Interner, NameId};
use crate::mangle;
use crate::modules::ModuleManager;
use crate::ops::BinaryOp;
use crate::token::Span;
use crate::types::{self, Type};

/// Runs the prototype pass over one file.
pub fn check_prototypes(
    ast: &mut Ast,
    file: NameId,
    modules: &mut ModuleManager,
    interner: &mut Interner,
) -> Result<(), SemanticError> {
    let module = modules.module_of(file);

    for body_id in ast.body_ids().collect::<Vec<_>>() {
        mangle_body_prototypes(ast, body_id, module, interner)?;
    }

    // the global body's functions become the module's exports
    let root = ast.root();
    let protos: Vec<(NameId, crate::ast::ProtoId)> = ast
        .body(root)
        .prototypes
        .iter()
        .map(|(&name, &pid)| (name, pid))
        .collect();

    for (mangled, proto_id) in protos {
        if !ast.proto(proto_id).is_extern {
            let already_exported = modules
                .exports_of(module)
                .is_some_and(|exports| exports.contains(&mangled));
            if already_exported {
                let span = ast.expr(ast.body(root).self_expr).span;
                return Err(duplicate_function(interner, mangled, span));
            }
            modules.add_export(module, mangled);
        }
        ast.body_mut(root).in_scope.push((mangled, RefKind::Function));
    }

    Ok(())
}

/// Rewrites one body's prototypes to their mangled ids, erroring on two
/// identical signatures in the same body.
fn mangle_body_prototypes(
    ast: &mut Ast,
    body_id: BodyId,
    module: NameId,
    interner: &mut Interner,
) -> Result<(), SemanticError> {
    let old_protos = std::mem::take(&mut ast.body_mut(body_id).prototypes);
    let old_externs = std::mem::take(&mut ast.body_mut(body_id).externs);
    let functions = ast.body(body_id).functions.clone();

    let mut new_protos = std::collections::BTreeMap::new();
    let mut new_externs = Vec::new();

    for func in &functions {
        let proto = ast.proto(func.prototype).clone();
        let mangled = mangle::mangle_prototype(interner, Some(module), &proto);
        if new_protos.contains_key(&mangled) {
            let span = ast.expr(func.body).span;
            return Err(duplicate_function(interner, mangled, span));
        }
        ast.proto_mut(func.prototype).name = mangled;
        new_protos.insert(mangled, func.prototype);
    }

    for bare in old_externs {
        let proto_id = old_protos[&bare];
        let proto = ast.proto(proto_id).clone();
        let mangled = mangle::mangle_prototype(interner, Some(module), &proto);
        if new_protos.contains_key(&mangled) {
            let span = ast.expr(ast.body(body_id).self_expr).span;
            return Err(duplicate_function(interner, mangled, span));
        }
        ast.proto_mut(proto_id).name = mangled;
        new_protos.insert(mangled, proto_id);
        new_externs.push(mangled);
    }

    let body = ast.body_mut(body_id);
    body.prototypes = new_protos;
    body.externs = new_externs;
    Ok(())
}

fn duplicate_function(interner: &Interner, mangled: NameId, span: Span) -> SemanticError {
    SemanticError::new(
        SemanticErrorKind::DuplicateFunction,
        format!(
            "Function '{}' is already defined with this signature",
            mangle::demangled_function_name(interner, mangled)
        ),
        span,
    )
}

/// The body-pass checker for one file.
pub struct TypeChecker<'a> {
    interner: &'a mut Interner,
    modules: &'a ModuleManager,
    file: NameId,
    module: NameId,
}

impl<'a> TypeChecker<'a> {
    /// Creates a checker for `file`, whose AST has been taken out of the
    /// module manager.
    pub fn new(interner: &'a mut Interner, modules: &'a ModuleManager, file: NameId) -> Self {
        let module = modules.module_of(file);
        TypeChecker {
            interner,
            modules,
            file,
            module,
        }
    }

    /// Checks the whole file, halting on the first error.
    pub fn check(&mut self, ast: &mut Ast) -> Result<(), SemanticError> {
        let root_expr = ast.body(ast.root()).self_expr;
        self.check_expr(ast, root_expr)?;
        Ok(())
    }

    fn error<T>(
        &self,
        kind: SemanticErrorKind,
        message: impl Into<String>,
        span: Span,
    ) -> Result<T, SemanticError> {
        Err(SemanticError::new(kind, message, span))
    }

    /// Checks one expression and returns its result type, caching it on
    /// the node. Re-entry returns the cache.
    fn check_expr(&mut self, ast: &mut Ast, id: ExprId) -> Result<Type, SemanticError> {
        if let Some(cached) = ast.cached_type(id) {
            return Ok(cached);
        }

        let span = ast.expr(id).span;
        let kind = ast.expr(id).kind.clone();
        let ty = match kind {
            ExprKind::Literal { ty, .. } => ty,
            ExprKind::Body(body_id) => self.check_body(ast, body_id)?,
            ExprKind::VariableDeclaration { ty, name, init } => {
                self.check_declaration(ast, id, ty, name, init, span)?
            }
            ExprKind::VariableReference { name } => self.check_reference(ast, id, name, span)?,
            ExprKind::Binary { op, lhs, rhs } => self.check_binary(ast, id, op, lhs, rhs, span)?,
            ExprKind::Unary { op, operand } => {
                let operand_ty = self.check_expr(ast, operand)?;
                if !op.supports_type(operand_ty) {
                    return self.error(
                        SemanticErrorKind::UnsupportedOperator,
                        format!(
                            "Unary operator {} does not support the given type: {}",
                            op, operand_ty
                        ),
                        span,
                    );
                }
                operand_ty
            }
            ExprKind::Cast { target, operand } => {
                let from = self.check_expr(ast, operand)?;
                if !types::is_cast_valid(from, target) {
                    return self.error(
                        SemanticErrorKind::InvalidCast,
                        format!("invalid cast {} -> {}", from, target),
                        span,
                    );
                }
                target
            }
            ExprKind::Call { callee, args, .. } => self.check_call(ast, id, callee, &args, span)?,
            ExprKind::If {
                cond,
                then_body,
                else_body,
                yields_value,
            } => self.check_if(ast, cond, then_body, else_body, yields_value, span)?,
            ExprKind::For {
                var_type,
                var_name,
                start,
                end,
                step,
                body,
            } => self.check_for(ast, var_type, var_name, start, end, step, body, span)?,
            ExprKind::While { cond, body } => {
                let cond_ty = self.check_expr(ast, cond)?;
                if cond_ty != Type::Bool {
                    return self.error(
                        SemanticErrorKind::ConditionNotBool,
                        "While condition must have type bool",
                        span,
                    );
                }
                self.check_expr(ast, body)?;
                Type::Void
            }
            ExprKind::Comment | ExprKind::Continue | ExprKind::Break => Type::Void,
            ExprKind::Return { value } => match value {
                Some(value) => self.check_expr(ast, value)?,
                None => Type::Void,
            },
            ExprKind::Switch { value, cases } => self.check_switch(ast, value, &cases, span)?,
            ExprKind::Case { value, body, .. } => {
                // checked through check_switch; reached directly only on
                // re-entry, where the cache answers first
                if let Some(value) = value {
                    self.check_expr(ast, value)?;
                }
                self.check_expr(ast, body)?;
                Type::Void
            }
        };

        ast.expr_mut(id).result_type = Some(ty);
        Ok(ty)
    }

    fn check_body(&mut self, ast: &mut Ast, body_id: BodyId) -> Result<Type, SemanticError> {
        // the prototype pass already registered the global body's functions
        if ast.body(body_id).kind != BodyKind::Global {
            let protos: Vec<NameId> = ast.body(body_id).prototypes.keys().copied().collect();
            for mangled in protos {
                if scope::is_defined(ast, body_id, mangled, RefKind::Function) {
                    let span = ast.expr(ast.body(body_id).self_expr).span;
                    return Err(duplicate_function(self.interner, mangled, span));
                }
                ast.body_mut(body_id)
                    .in_scope
                    .push((mangled, RefKind::Function));
            }
        }

        let functions = ast.body(body_id).functions.clone();
        for func in &functions {
            self.check_function(ast, func)?;
        }

        let expressions = ast.body(body_id).expressions.clone();
        let mut last = None;
        for &expr in &expressions {
            last = Some(self.check_expr(ast, expr)?);
        }

        Ok(last.unwrap_or(Type::Void))
    }

    fn check_function(
        &mut self,
        ast: &mut Ast,
        func: &FunctionDefinition,
    ) -> Result<(), SemanticError> {
        let body_id = ast.expr_body(func.body);
        let proto = ast.proto(func.prototype).clone();

        // parameters come into scope before the body is checked
        for &param in &proto.param_names {
            ast.body_mut(body_id).in_scope.push((param, RefKind::Variable));
        }

        let body_ty = self.check_expr(ast, func.body)?;

        if proto.return_type != Type::Void && body_ty != proto.return_type {
            let span = ast.expr(func.body).span;
            return self.error(
                SemanticErrorKind::InvalidReturnType,
                format!(
                    "Function '{}' has invalid return type: expected {} but the body produces {}",
                    mangle::demangled_function_name(self.interner, proto.name),
                    proto.return_type,
                    body_ty
                ),
                span,
            );
        }
        Ok(())
    }

    fn check_declaration(
        &mut self,
        ast: &mut Ast,
        id: ExprId,
        ty: Type,
        name: NameId,
        init: Option<ExprId>,
        span: Span,
    ) -> Result<Type, SemanticError> {
        let body_id = ast.enclosing_body(id).expect("declarations live in a body");

        // redeclaration is checked in the current body only
        let already = ast
            .body(body_id)
            .in_scope
            .contains(&(name, RefKind::Variable));
        if already {
            return self.error(
                SemanticErrorKind::DuplicateVariable,
                format!(
                    "Variable '{}' has already been defined",
                    self.interner.get_string(name)
                ),
                span,
            );
        }
        ast.body_mut(body_id).in_scope.push((name, RefKind::Variable));

        if let Some(init) = init {
            let init_ty = self.check_expr(ast, init)?;
            if init_ty != ty {
                return self.error(
                    SemanticErrorKind::TypeMismatch,
                    format!(
                        "Variable declaration for '{}' expected type {} but got type {} instead",
                        self.interner.get_string(name),
                        ty,
                        init_ty
                    ),
                    span,
                );
            }
        }
        Ok(ty)
    }

    fn check_reference(
        &mut self,
        ast: &mut Ast,
        id: ExprId,
        name: NameId,
        span: Span,
    ) -> Result<Type, SemanticError> {
        let body_id = ast.enclosing_body(id).expect("references live in a body");

        if !scope::is_defined(ast, body_id, name, RefKind::Variable) {
            return self.error(
                SemanticErrorKind::UndefinedVariable,
                format!(
                    "Variable reference for '{}' is not in scope (not defined)",
                    self.interner.get_string(name)
                ),
                span,
            );
        }

        let Some(scope) = scope::get_variable_scope(ast, body_id, name) else {
            return self.error(
                SemanticErrorKind::UndefinedVariable,
                format!(
                    "Variable reference for '{}' is not in scope",
                    self.interner.get_string(name)
                ),
                span,
            );
        };

        Ok(ast.body(scope).named_types[&name])
    }

    fn check_binary(
        &mut self,
        ast: &mut Ast,
        id: ExprId,
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
        span: Span,
    ) -> Result<Type, SemanticError> {
        if op == BinaryOp::ModuleScope {
            return self.check_module_scope(ast, lhs, rhs, span);
        }

        if op.is_assignment()
            && !matches!(ast.expr(lhs).kind, ExprKind::VariableReference { .. })
        {
            return self.error(
                SemanticErrorKind::InvalidAssignmentTarget,
                "destination of '=' must be an identifier",
                span,
            );
        }

        let lhs_ty = self.check_expr(ast, lhs)?;
        let rhs_ty = self.check_expr(ast, rhs)?;
        if lhs_ty != rhs_ty {
            return self.error(
                SemanticErrorKind::TypeMismatch,
                format!(
                    "Binary operator {} has incompatible types: {} and {} given",
                    op, lhs_ty, rhs_ty
                ),
                span,
            );
        }
        if !op.supports_type(lhs_ty) {
            return self.error(
                SemanticErrorKind::UnsupportedOperator,
                format!(
                    "Binary operator {} does not support the given type: {}",
                    op, lhs_ty
                ),
                span,
            );
        }

        if op.is_comparison() || op.is_boolean() {
            Ok(Type::Bool)
        } else {
            Ok(lhs_ty)
        }
    }

    /// Resolves `path :: call(...)`: the left chain names a module, the
    /// right side must be a call into that module's exports.
    fn check_module_scope(
        &mut self,
        ast: &mut Ast,
        lhs: ExprId,
        rhs: ExprId,
        span: Span,
    ) -> Result<Type, SemanticError> {
        let ExprKind::Call { callee, args, .. } = ast.expr(rhs).kind.clone() else {
            return self.error(
                SemanticErrorKind::UndefinedFunction,
                "expected a function call after '::'",
                span,
            );
        };

        let mut arg_types = Vec::with_capacity(args.len());
        for &arg in &args {
            arg_types.push(self.check_expr(ast, arg)?);
        }

        let module = mangle::mangle_using(ast, self.interner, lhs);
        if !self.modules.is_module_available(self.file, module) {
            return self.error(
                SemanticErrorKind::UndefinedFunction,
                format!(
                    "Module '{}' is not imported here",
                    mangle::pretty_modules(self.interner, Some(module))
                ),
                span,
            );
        }

        let partial = mangle::mangle_call_bare(self.interner, callee, &arg_types);
        let full = mangle::add_mangled_name(self.interner, Some(module), partial);
        let exported = self
            .modules
            .exports_of(module)
            .is_some_and(|exports| exports.contains(&full));
        if !exported {
            return self.error(
                SemanticErrorKind::UndefinedFunction,
                format!(
                    "Function call for '{}' does not match anything exported by module '{}'",
                    self.interner.get_string(callee),
                    mangle::pretty_modules(self.interner, Some(module))
                ),
                span,
            );
        }

        let proto = self
            .resolve_prototype(ast, full)
            .expect("exported function has a prototype");
        let return_type = proto.return_type;
        self.rewrite_call(ast, rhs, full, proto.is_extern, args);
        ast.expr_mut(rhs).result_type = Some(return_type);
        Ok(return_type)
    }

    fn check_call(
        &mut self,
        ast: &mut Ast,
        id: ExprId,
        callee: NameId,
        args: &[ExprId],
        span: Span,
    ) -> Result<Type, SemanticError> {
        let mut arg_types = Vec::with_capacity(args.len());
        for &arg in args {
            arg_types.push(self.check_expr(ast, arg)?);
        }

        let enclosing = ast.enclosing_body(id).expect("calls live in a body");
        let partial = mangle::mangle_call_bare(self.interner, callee, &arg_types);
        let local = mangle::add_mangled_name(self.interner, Some(self.module), partial);

        // the scope chain covers nested functions, this file's functions,
        // and externs declared in any enclosing body
        if let Some(scope) = scope::get_function_scope(ast, enclosing, local) {
            let proto_id = ast.body(scope).prototypes[&local];
            let return_type = ast.proto(proto_id).return_type;
            let is_extern = scope::find_extern_function(ast, enclosing, local);
            if !is_extern && !scope::is_defined(ast, enclosing, local, RefKind::Function) {
                return self.error(
                    SemanticErrorKind::UndefinedFunction,
                    format!(
                        "Function call for '{}' is not in scope",
                        self.interner.get_string(callee)
                    ),
                    span,
                );
            }
            self.rewrite_call(ast, id, local, is_extern, args.to_vec());
            return Ok(return_type);
        }

        // other files: the current module's exports, then each import's
        if let Some(resolved) =
            self.modules
                .find_function(self.interner, self.file, partial, false)
        {
            let proto = self
                .resolve_prototype(ast, resolved)
                .expect("resolved function has a prototype");
            self.rewrite_call(ast, id, resolved, proto.is_extern, args.to_vec());
            return Ok(proto.return_type);
        }

        // unresolved: distinguish "wrong signature" from "unknown name"
        let bare = self.interner.get_string(callee).to_string();
        let locations = self
            .modules
            .get_matching_function_locations(self.interner, self.file, &bare);
        if locations.is_empty() {
            self.error(
                SemanticErrorKind::UndefinedFunction,
                format!("Function call for '{}' is not in scope (not defined)", bare),
                span,
            )
        } else {
            let modules: Vec<String> = locations
                .iter()
                .map(|&m| mangle::pretty_modules(self.interner, Some(m)))
                .collect();
            self.error(
                SemanticErrorKind::ArgumentMismatch,
                format!(
                    "Call to '{}' has arguments of invalid types; candidates exist in: {}",
                    bare,
                    modules.join(", ")
                ),
                span,
            )
        }
    }

    /// Looks a resolved id up in this file first, then in the other
    /// loaded files through the module manager.
    fn resolve_prototype(&mut self, ast: &Ast, mangled: NameId) -> Option<FunctionPrototype> {
        if let Some(&proto_id) = ast.body(ast.root()).prototypes.get(&mangled) {
            return Some(ast.proto(proto_id).clone());
        }
        self.modules.prototype(self.interner, mangled)
    }

    fn rewrite_call(
        &mut self,
        ast: &mut Ast,
        id: ExprId,
        resolved: NameId,
        is_extern: bool,
        args: Vec<ExprId>,
    ) {
        let node = ast.expr_mut(id);
        node.kind = ExprKind::Call {
            callee: resolved,
            is_extern,
            args,
        };
        node.mangled = true;
    }

    fn check_if(
        &mut self,
        ast: &mut Ast,
        cond: ExprId,
        then_body: ExprId,
        else_body: Option<ExprId>,
        yields_value: bool,
        span: Span,
    ) -> Result<Type, SemanticError> {
        let cond_ty = self.check_expr(ast, cond)?;
        if cond_ty != Type::Bool {
            return self.error(
                SemanticErrorKind::ConditionNotBool,
                "If condition must have type bool",
                span,
            );
        }

        let then_ty = self.check_expr(ast, then_body)?;
        let else_ty = match else_body {
            Some(else_body) => Some(self.check_expr(ast, else_body)?),
            None => None,
        };

        if !yields_value {
            return Ok(Type::Void);
        }

        let Some(else_ty) = else_ty else {
            return self.error(
                SemanticErrorKind::TypeMismatch,
                "If expression requires an else branch",
                span,
            );
        };
        if then_ty != else_ty {
            return self.error(
                SemanticErrorKind::TypeMismatch,
                format!(
                    "If statement has incompatible result types: {} and {} given",
                    then_ty, else_ty
                ),
                span,
            );
        }
        Ok(then_ty)
    }

    #[allow(clippy::too_many_arguments)]
    fn check_for(
        &mut self,
        ast: &mut Ast,
        var_type: Type,
        var_name: NameId,
        start: ExprId,
        end: ExprId,
        step: Option<ExprId>,
        body: ExprId,
        span: Span,
    ) -> Result<Type, SemanticError> {
        // the loop variable comes into the loop body's scope first
        let loop_body = ast.expr_body(body);
        ast.body_mut(loop_body)
            .in_scope
            .push((var_name, RefKind::Variable));

        let start_ty = self.check_expr(ast, start)?;
        if start_ty != var_type {
            return self.error(
                SemanticErrorKind::TypeMismatch,
                format!(
                    "For start expression has invalid type: expected {} but got {} instead",
                    var_type, start_ty
                ),
                span,
            );
        }

        let end_ty = self.check_expr(ast, end)?;
        if end_ty != Type::Bool {
            return self.error(
                SemanticErrorKind::ConditionNotBool,
                "For end condition must have type bool",
                span,
            );
        }

        if let Some(step) = step {
            self.check_expr(ast, step)?;
        }
        self.check_expr(ast, body)?;
        Ok(Type::Void)
    }

    fn check_switch(
        &mut self,
        ast: &mut Ast,
        value: ExprId,
        cases: &[ExprId],
        span: Span,
    ) -> Result<Type, SemanticError> {
        let value_ty = self.check_expr(ast, value)?;
        if !matches!(value_ty, Type::Int { .. } | Type::Char) {
            return self.error(
                SemanticErrorKind::InvalidSwitchCase,
                format!("Switch value must have an integer type, got {}", value_ty),
                span,
            );
        }

        for &case in cases {
            let ExprKind::Case {
                value: case_value,
                body,
                ..
            } = ast.expr(case).kind.clone()
            else {
                continue;
            };
            if let Some(case_value) = case_value {
                let case_span = ast.expr(case_value).span;
                let case_ty = self.check_expr(ast, case_value)?;
                if case_ty != value_ty {
                    return self.error(
                        SemanticErrorKind::InvalidSwitchCase,
                        format!(
                            "Case value type {} does not match switch value type {}",
                            case_ty, value_ty
                        ),
                        case_span,
                    );
                }
                if !ast.expr(case_value).is_constant() {
                    return self.error(
                        SemanticErrorKind::InvalidSwitchCase,
                        "Case value must be a constant expression",
                        case_span,
                    );
                }
            }
            self.check_expr(ast, body)?;
            ast.expr_mut(case).result_type = Some(Type::Void);
        }

        Ok(Type::Void)
    }
}
