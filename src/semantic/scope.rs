//! Scope queries over the body chain.
//!
//! All four queries walk upward from a starting body through its parents.
//! Variable lookups stop at the first function body (variables do not
//! leak across function boundaries); function lookups walk the whole
//! chain, so nested definitions can call enclosing ones.

use crate::ast::{Ast, BodyId, BodyKind, RefKind};
use crate::interner::NameId;

/// Finds the first body in the chain that declares variable `name`.
pub fn get_variable_scope(ast: &Ast, from: BodyId, name: NameId) -> Option<BodyId> {
    let mut body = Some(from);
    while let Some(current) = body {
        if ast.body(current).named_types.contains_key(&name) {
            return Some(current);
        }
        body = ast.body(current).parent;
    }
    None
}

/// Finds the first body in the chain whose prototype map contains
/// `callee` (a mangled id after the prototype pass).
pub fn get_function_scope(ast: &Ast, from: BodyId, callee: NameId) -> Option<BodyId> {
    let mut body = Some(from);
    while let Some(current) = body {
        if ast.body(current).prototypes.contains_key(&callee) {
            return Some(current);
        }
        body = ast.body(current).parent;
    }
    None
}

/// Answers "is `name` visible here as `kind`?" against the in-scope
/// registries, which record declaration order.
pub fn is_defined(ast: &Ast, from: BodyId, name: NameId, kind: RefKind) -> bool {
    let mut body = Some(from);
    while let Some(current) = body {
        let data = ast.body(current);
        if data.in_scope.contains(&(name, kind)) {
            return true;
        }
        if kind == RefKind::Variable && data.kind == BodyKind::Function {
            return false;
        }
        body = data.parent;
    }
    false
}

/// Scans each ancestor body's extern list for `name`.
pub fn find_extern_function(ast: &Ast, from: BodyId, name: NameId) -> bool {
    let mut body = Some(from);
    while let Some(current) = body {
        if ast.body(current).externs.contains(&name) {
            return true;
        }
        body = ast.body(current).parent;
    }
    false
}
