//! Deterministic name mangling.
//!
//! A mangled name encodes a module path and a function signature into one
//! interned string:
//!
//! ```text
//! _AS_ M<len><chars>... F<len><chars> P<count> V<len><chars>...
//! ```
//!
//! - the preamble is always `_AS_`
//! - one `M` segment per module path element
//! - one `F` segment for the function name, followed by `P` and the
//!   parameter count
//! - one `V` segment per parameter, carrying the canonical type name
//!
//! A module path id is itself the interned `_AS_M...` prefix, so module
//! ids compose with function segments by plain concatenation. `None`
//! stands for "no module" and contributes just the preamble.
//!
//! Extraction routines treat malformed input as a compiler bug and panic;
//! every id they receive was produced by this module.


use crate::ast::{Ast, ExprId, ExprKind, FunctionPrototype};
use crate::interner::{Interner, NameId};
use crate::ops::BinaryOp;
use crate::types::Type;

/// The mangled-name preamble.
pub const PREAMBLE: &str = "_AS_";

fn name_or_start(interner: &Interner, module: Option<NameId>) -> String {
    match module {
        Some(id) => interner.get_string(id).to_string(),
        None => PREAMBLE.to_string(),
    }
}

fn push_length_prefixed(out: &mut String, tag: char, chars: &str) {
    out.push(tag);
    out.push_str(&chars.len().to_string());
    out.push_str(chars);
}

/// Builds the `F<len><name>P<count><types>*` segment for a function name
/// and parameter type list.
fn mangle_function(interner: &Interner, function: NameId, types: &[Type]) -> String {
    let mut out = String::new();
    push_length_prefixed(&mut out, 'F', interner.get_string(function));
    out.push('P');
    out.push_str(&types.len().to_string());
    for ty in types {
        push_length_prefixed(&mut out, 'V', &ty.to_string());
    }
    out
}

/// Mangles a prototype against a module path.
pub fn mangle_prototype(
    interner: &mut Interner,
    module: Option<NameId>,
    proto: &FunctionPrototype,
) -> NameId {
    let name = name_or_start(interner, module) + &mangle_function(interner, proto.name, &proto.params);
    interner.get_id(&name)
}

/// Mangles a call site against a module path, using the argument types the
/// type checker inferred.
pub fn mangle_call(
    interner: &mut Interner,
    module: Option<NameId>,
    callee: NameId,
    arg_types: &[Type],
) -> NameId {
    let name = name_or_start(interner, module) + &mangle_function(interner, callee, arg_types);
    interner.get_id(&name)
}

/// Mangles a call site without a module prefix (no preamble). The result
/// composes with a module id through [`add_mangled_name`].
pub fn mangle_call_bare(interner: &mut Interner, callee: NameId, arg_types: &[Type]) -> NameId {
    let name = mangle_function(interner, callee, arg_types);
    interner.get_id(&name)
}

/// Appends a module segment to a module path id.
pub fn add_module(interner: &mut Interner, current: Option<NameId>, other: NameId) -> NameId {
    let mut name = name_or_start(interner, current);
    let segment = interner.get_string(other).to_string();
    push_length_prefixed(&mut name, 'M', &segment);
    interner.get_id(&name)
}

/// Concatenates a module path id and an already-mangled function segment.
pub fn add_mangled_name(
    interner: &mut Interner,
    module: Option<NameId>,
    mangled: NameId,
) -> NameId {
    let name = name_or_start(interner, module) + interner.get_string(mangled);
    interner.get_id(&name)
}

/// Walks a left-associative chain of `::` operators into a module path id.
///
/// The chain's leaves must be variable references; the rightmost operand
/// of the outermost `::` names a function, so callers pass the *left*
/// subtree of a qualified call here.
///
/// # Panics
///
/// Panics if the expression is not a `::` chain of references; the parser
/// only builds such chains under the module-scope operator.
pub fn mangle_using(ast: &Ast, interner: &mut Interner, scope_expr: ExprId) -> NameId {
    let mut segments = Vec::new();
    collect_path_segments(ast, scope_expr, &mut segments);
    let mut module = None;
    for segment in segments {
        module = Some(add_module(interner, module, segment));
    }
    module.expect("module path chain is never empty")
}

fn collect_path_segments(ast: &Ast, expr: ExprId, out: &mut Vec<NameId>) {
    match &ast.expr(expr).kind {
        ExprKind::Binary {
            op: BinaryOp::ModuleScope,
            lhs,
            rhs,
        } => {
            collect_path_segments(ast, *lhs, out);
            collect_path_segments(ast, *rhs, out);
        }
        ExprKind::VariableReference { name } => out.push(*name),
        other => panic!("module path contains a non-reference expression: {:?}", other),
    }
}

/// Reads the preamble and consecutive `M` segments off a mangled id and
/// returns the module-path id they form.
///
/// # Panics
///
/// Panics if the id does not start with the preamble or an `M` segment is
/// truncated.
pub fn extract_module(interner: &mut Interner, mangled: NameId) -> NameId {
    let name = interner.get_string(mangled).to_string();
    assert!(
        name.starts_with(PREAMBLE),
        "mangled name does not start with the preamble: {}",
        name
    );

    let bytes = name.as_bytes();
    let mut i = PREAMBLE.len();
    while i < bytes.len() && bytes[i] == b'M' {
        let (len, next) = read_length(&name, i + 1);
        i = next + len;
        assert!(i <= bytes.len(), "truncated module segment in {}", name);
    }

    interner.get_id(&name[..i])
}

/// Renders a module path id as source syntax: segments joined by `::`.
/// `None` renders as the empty string.
pub fn pretty_modules(interner: &Interner, module: Option<NameId>) -> String {
    let Some(module) = module else {
        return String::new();
    };

    let name = interner.get_string(module);
    let rest = name
        .strip_prefix(PREAMBLE)
        .unwrap_or_else(|| panic!("module id does not start with the preamble: {}", name));

    let mut pretty = String::new();
    let mut i = 0;
    let bytes = rest.as_bytes();
    while i < bytes.len() && bytes[i] == b'M' {
        let (len, next) = read_length(rest, i + 1);
        pretty.push_str(&rest[next..next + len]);
        i = next + len;
        if i < bytes.len() && bytes[i] == b'M' {
            pretty.push_str("::");
        }
    }
    pretty
}

/// Recovers the bare function name from a mangled id, skipping the
/// preamble and any module segments. Accepts module-less partial mangles
/// that begin directly with the `F` segment.
///
/// # Panics
///
/// Panics if no `F` segment is present.
pub fn demangled_function_name(interner: &Interner, mangled: NameId) -> String {
    let name = interner.get_string(mangled);
    let rest = name.strip_prefix(PREAMBLE).unwrap_or(name);

    let bytes = rest.as_bytes();
    let mut i = 0;
    while i < bytes.len() && bytes[i] == b'M' {
        let (len, next) = read_length(rest, i + 1);
        i = next + len;
    }

    assert!(
        i < bytes.len() && bytes[i] == b'F',
        "mangled name has no function segment: {}",
        name
    );
    let (len, next) = read_length(rest, i + 1);
    rest[next..next + len].to_string()
}

/// Reads a decimal length starting at `from`; returns the length and the
/// index just past it.
fn read_length(s: &str, from: usize) -> (usize, usize) {
    let bytes = s.as_bytes();
    let mut i = from;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    assert!(i > from, "missing length in mangled segment: {}", s);
    let len = s[from..i].parse().expect("digits parse as a length");
    (len, i)
}
