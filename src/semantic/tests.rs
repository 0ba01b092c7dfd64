use super::*;
use crate::ast::{Ast, ConstantStatus, ExprKind};
use crate::interner::{Interner, NameId};
use crate::lexer::Lexer;
use crate::mangle;
use crate::modules::ModuleManager;
use crate::parser::Parser;
use crate::types::Type;

struct Analyzed {
    manager: ModuleManager,
    interner: Interner,
    files: Vec<NameId>,
}

/// Runs the front-end pipeline (parse, module registration, prototype
/// pass, constant check, type check) over a set of named sources.
fn analyze(sources: &[(&str, &str)]) -> Result<Analyzed, SemanticError> {
    let mut interner = Interner::new();
    let mut manager = ModuleManager::new();
    let mut files = Vec::new();

    for (name, source) in sources {
        let tokens = Lexer::new(source).tokenize().expect("lexing should succeed");
        let parsed = Parser::new(tokens, &mut interner)
            .parse_file()
            .expect("parsing should succeed");
        let file = interner.get_id(name);
        let module = parsed
            .module
            .unwrap_or_else(|| interner.get_id(mangle::PREAMBLE));
        manager.add_ast(file, parsed.ast);
        manager.add_module(file, module, parsed.imports);
        files.push(file);
    }

    manager
        .check_modules(&interner)
        .expect("module check should succeed");
    let order = manager
        .get_build_files_order(&interner)
        .expect("module graph is acyclic");

    for &file in &order {
        let mut ast = manager.take_ast(file);
        let result = check_prototypes(&mut ast, file, &mut manager, &mut interner);
        manager.put_ast(file, ast);
        result?;
    }

    for &file in &order {
        let mut ast = manager.take_ast(file);
        constants::check(&mut ast);
        let result = TypeChecker::new(&mut interner, &manager, file).check(&mut ast);
        manager.put_ast(file, ast);
        result?;
    }

    Ok(Analyzed {
        manager,
        interner,
        files,
    })
}

fn analyze_one(source: &str) -> Result<Analyzed, SemanticError> {
    analyze(&[("main.ash", source)])
}

fn expect_error(source: &str) -> SemanticError {
    analyze_one(source).err().expect("analysis should fail")
}

/// Every resolved call node in the file, as (callee string, is_extern).
fn calls(analyzed: &Analyzed, file: NameId) -> Vec<(String, bool)> {
    let ast = analyzed.manager.ast(file).expect("file is loaded");
    let mut out = Vec::new();
    for id in ast.expr_ids() {
        if let ExprKind::Call {
            callee, is_extern, ..
        } = &ast.expr(id).kind
        {
            assert!(ast.expr(id).mangled, "calls are rewritten after checking");
            out.push((
                analyzed.interner.get_string(*callee).to_string(),
                *is_extern,
            ));
        }
    }
    out
}

#[test]
fn test_well_typed_program_passes() {
    analyze_one(
        "function int main() {\n\
           int x = 1 + 2 * 3;\n\
           return x;\n\
         }",
    )
    .expect("program is well typed");
}

#[test]
fn test_constant_fold_statuses() {
    let analyzed = analyze_one("function int main() { int x = 1 + 2 * 3; return x; }")
        .expect("program is well typed");
    let file = analyzed.files[0];
    let ast = analyzed.manager.ast(file).expect("file is loaded");

    let mut saw_addition = false;
    for id in ast.expr_ids() {
        match &ast.expr(id).kind {
            ExprKind::Binary {
                op: crate::ops::BinaryOp::Addition,
                ..
            } => {
                saw_addition = true;
                assert_eq!(ast.expr(id).constant, ConstantStatus::Constant);
            }
            ExprKind::VariableDeclaration { .. } => {
                assert_eq!(ast.expr(id).constant, ConstantStatus::Constant);
            }
            ExprKind::VariableReference { .. } => {
                assert_eq!(ast.expr(id).constant, ConstantStatus::Variable);
            }
            _ => {}
        }
    }
    assert!(saw_addition);
}

#[test]
fn test_constant_checking_never_sets_result_types() {
    let mut interner = Interner::new();
    let tokens = Lexer::new("function int main() { return 1 + 2; }")
        .tokenize()
        .expect("lexing should succeed");
    let parsed = Parser::new(tokens, &mut interner)
        .parse_file()
        .expect("parsing should succeed");
    let mut ast = parsed.ast;

    constants::check(&mut ast);
    for id in ast.expr_ids() {
        assert_eq!(ast.cached_type(id), None);
        assert_ne!(ast.expr(id).constant, ConstantStatus::Unknown);
    }
}

#[test]
fn test_type_checking_never_changes_constant_status() {
    let mut interner = Interner::new();
    let mut manager = ModuleManager::new();

    let tokens = Lexer::new("function int main() { int x = 4; return x + 1; }")
        .tokenize()
        .expect("lexing should succeed");
    let parsed = Parser::new(tokens, &mut interner)
        .parse_file()
        .expect("parsing should succeed");
    let mut ast = parsed.ast;

    let file = interner.get_id("main.ash");
    let module = interner.get_id(mangle::PREAMBLE);
    manager.add_ast(file, Ast::new());
    manager.add_module(file, module, parsed.imports);

    check_prototypes(&mut ast, file, &mut manager, &mut interner).expect("prototypes pass");
    constants::check(&mut ast);

    let before: Vec<ConstantStatus> = ast.expr_ids().map(|id| ast.expr(id).constant).collect();

    TypeChecker::new(&mut interner, &manager, file)
        .check(&mut ast)
        .expect("program is well typed");

    let after: Vec<ConstantStatus> = ast.expr_ids().map(|id| ast.expr(id).constant).collect();
    assert_eq!(before, after);
    assert!(before.iter().all(|s| *s != ConstantStatus::Unknown));
}

#[test]
fn test_type_checker_is_idempotent() {
    let mut analyzed =
        analyze_one("function int main() { return 41 + 1; }").expect("program is well typed");
    let file = analyzed.files[0];
    let mut ast = analyzed.manager.take_ast(file);
    let verdict =
        TypeChecker::new(&mut analyzed.interner, &analyzed.manager, file).check(&mut ast);
    assert!(verdict.is_ok(), "second run must agree with the first");
    analyzed.manager.put_ast(file, ast);
}

#[test]
fn test_undefined_variable() {
    let err = expect_error("function int main() { return y; }");
    assert_eq!(err.kind(), SemanticErrorKind::UndefinedVariable);
}

#[test]
fn test_use_before_declaration() {
    let err = expect_error("function void f() { x = 1; int x = 0; }");
    assert_eq!(err.kind(), SemanticErrorKind::UndefinedVariable);
}

#[test]
fn test_duplicate_variable_in_body() {
    let err = expect_error("function void f() { int x = 1; int x = 2; }");
    assert_eq!(err.kind(), SemanticErrorKind::DuplicateVariable);
}

#[test]
fn test_variable_shadowing_in_nested_body_allowed() {
    // redeclaration is rejected per body, so an inner body may shadow
    analyze_one(
        "function void f() {\n\
           int x = 1;\n\
           if true { int x = 2; }\n\
         }",
    )
    .expect("nested declarations are fine");
}

#[test]
fn test_declaration_type_mismatch() {
    let err = expect_error("function void f() { int x = 1.5; }");
    assert_eq!(err.kind(), SemanticErrorKind::TypeMismatch);
}

#[test]
fn test_binary_operand_types_must_match() {
    let err = expect_error("function int f() { return 1 + 1.5; }");
    assert_eq!(err.kind(), SemanticErrorKind::TypeMismatch);
}

#[test]
fn test_operator_not_supported_on_type() {
    let err = expect_error("function bool f(bool a, bool b) { return a + b; }");
    assert_eq!(err.kind(), SemanticErrorKind::UnsupportedOperator);
    let err = expect_error("function f32 f(f32 a, f32 b) { return a % b; }");
    assert_eq!(err.kind(), SemanticErrorKind::UnsupportedOperator);
    let err = expect_error("function f32 f(f32 a, f32 b) { return a & b; }");
    assert_eq!(err.kind(), SemanticErrorKind::UnsupportedOperator);
}

#[test]
fn test_assignment_needs_identifier_target() {
    let err = expect_error("function void f() { 1 = 2; }");
    assert_eq!(err.kind(), SemanticErrorKind::InvalidAssignmentTarget);
}

#[test]
fn test_compound_assignment_checks() {
    analyze_one("function void f() { int x = 1; x += 2; x %= 3; x ^= 1; }")
        .expect("compound assignments pass the checks");

    let err = expect_error("function void f() { f32 x = 1.0; x %= 2.0; }");
    assert_eq!(err.kind(), SemanticErrorKind::UnsupportedOperator);
}

#[test]
fn test_if_condition_must_be_bool() {
    let err = expect_error("function void f() { if 1 { } }");
    assert_eq!(err.kind(), SemanticErrorKind::ConditionNotBool);
}

#[test]
fn test_if_expression_branch_types_must_match() {
    let err = expect_error("function void f() { int x = if true { 1; } else { 1.5; }; }");
    assert_eq!(err.kind(), SemanticErrorKind::TypeMismatch);
}

#[test]
fn test_if_statement_branch_types_unconstrained() {
    analyze_one(
        "function void f() {\n\
           if true { 1; } else { 1.5; }\n\
         }",
    )
    .expect("statement branches need not agree");
}

#[test]
fn test_while_condition_must_be_bool() {
    let err = expect_error("function void f() { while 1 { } }");
    assert_eq!(err.kind(), SemanticErrorKind::ConditionNotBool);
}

#[test]
fn test_for_start_type_must_match_variable() {
    let err = expect_error("function void f() { for int i = 1.5, i < 3 { } }");
    assert_eq!(err.kind(), SemanticErrorKind::TypeMismatch);
}

#[test]
fn test_for_condition_must_be_bool() {
    let err = expect_error("function void f() { for int i = 0, i + 1 { } }");
    assert_eq!(err.kind(), SemanticErrorKind::ConditionNotBool);
}

#[test]
fn test_for_loop_variable_usable_in_body() {
    analyze_one(
        "function int f() {\n\
           int total = 0;\n\
           for int i = 0, i < 10, i = i + 1 { total = total + i; }\n\
           return total;\n\
         }",
    )
    .expect("loop variable resolves inside the body");
}

#[test]
fn test_for_loop_variable_not_visible_outside() {
    let err = expect_error(
        "function int f() {\n\
           for int i = 0, i < 10, i = i + 1 { }\n\
           return i;\n\
         }",
    );
    assert_eq!(err.kind(), SemanticErrorKind::UndefinedVariable);
}

#[test]
fn test_return_type_conformance() {
    let err = expect_error("function int f() { return true; }");
    assert_eq!(err.kind(), SemanticErrorKind::InvalidReturnType);
}

#[test]
fn test_void_function_body_unconstrained() {
    analyze_one("function void f() { 1 + 2; }").expect("void functions ignore the body type");
}

#[test]
fn test_cast_legality_scenario() {
    // the first three casts are legal, the fourth is not
    analyze_one(
        "function void f() {\n\
           int y = (int) 3.5;\n\
           bool b = (bool) 1;\n\
           u32 u = (u32) y;\n\
         }",
    )
    .expect("legal casts pass");

    let err = expect_error("function void f() { bool c = (bool) 1.0; }");
    assert_eq!(err.kind(), SemanticErrorKind::InvalidCast);
    assert!(err.message().contains("invalid cast f32 -> Bool"));
}

#[test]
fn test_cast_size_and_sign_at_once_rejected() {
    let err = expect_error("function void f() { int x = 1; u16 y = (u16) x; }");
    assert_eq!(err.kind(), SemanticErrorKind::InvalidCast);
}

#[test]
fn test_call_resolves_to_mangled_id() {
    let analyzed = analyze(&[(
        "main.ash",
        "module m;\n\
         function int id(int x) { return x; }\n\
         function int main() { return id(7); }",
    )])
    .expect("program is well typed");

    let call_names = calls(&analyzed, analyzed.files[0]);
    assert!(
        call_names
            .iter()
            .any(|(name, _)| name == "_AS_M1mF2idP1V3i32"),
        "call was rewritten to the mangled id: {:?}",
        call_names
    );
}

#[test]
fn test_overload_resolution_by_argument_types() {
    let source = "module m;\n\
                  function int f(int x) { return 1; }\n\
                  function int f(f32 x) { return 2; }\n\
                  function void main() { f(1); f(1.5); }";
    let analyzed = analyze(&[("main.ash", source)]).expect("overloads are distinct");

    let call_names = calls(&analyzed, analyzed.files[0]);
    assert!(call_names.iter().any(|(n, _)| n.ends_with("F1fP1V3i32")));
    assert!(call_names.iter().any(|(n, _)| n.ends_with("F1fP1V3f32")));
}

#[test]
fn test_overload_no_match_is_scope_error() {
    let err = expect_error(
        "module m;\n\
         function int f(int x) { return 1; }\n\
         function int f(f32 x) { return 2; }\n\
         function void main() { f(true); }",
    );
    assert_eq!(err.kind(), SemanticErrorKind::UndefinedFunction);
}

#[test]
fn test_undefined_function() {
    let err = expect_error("function void f() { g(); }");
    assert_eq!(err.kind(), SemanticErrorKind::UndefinedFunction);
}

#[test]
fn test_extern_call_keeps_extern_flag() {
    let analyzed = analyze_one(
        "extern void putchar(char c);\n\
         function void f() { putchar('a'); }",
    )
    .expect("extern call resolves");

    let call_names = calls(&analyzed, analyzed.files[0]);
    assert_eq!(call_names.len(), 1);
    assert!(call_names[0].1, "extern flag is set on the call");
}

#[test]
fn test_cross_module_call_through_import() {
    let lib = "module lib;\n\
               function int helper(int x) { return x + 1; }";
    let app = "module app;\n\
               using lib;\n\
               function int main() { return helper(1); }";
    let analyzed = analyze(&[("lib.ash", lib), ("app.ash", app)]).expect("import resolves");

    let call_names = calls(&analyzed, analyzed.files[1]);
    assert!(call_names.iter().any(|(n, _)| n.starts_with("_AS_M3lib")));
}

#[test]
fn test_qualified_call_through_module_scope_operator() {
    let lib = "module lib;\n\
               function int helper(int x) { return x + 1; }";
    let app = "module app;\n\
               using lib;\n\
               function int main() { return lib::helper(1); }";
    let analyzed = analyze(&[("lib.ash", lib), ("app.ash", app)]).expect("qualified call resolves");

    let call_names = calls(&analyzed, analyzed.files[1]);
    assert!(call_names.iter().any(|(n, _)| n == "_AS_M3libF6helperP1V3i32"));
}

#[test]
fn test_qualified_call_to_unimported_module_fails() {
    let lib = "module lib;\n\
               function int helper(int x) { return x + 1; }";
    let app = "module app;\n\
               function int main() { return lib::helper(1); }";
    let err = analyze(&[("lib.ash", lib), ("app.ash", app)])
        .err()
        .expect("unimported module should fail");
    assert_eq!(err.kind(), SemanticErrorKind::UndefinedFunction);
    assert!(err.message().contains("not imported"));
}

#[test]
fn test_call_to_unimported_function_fails() {
    let lib = "module lib;\n\
               function int helper(int x) { return x + 1; }";
    let app = "module app;\n\
               function int main() { return helper(1); }";
    let err = analyze(&[("lib.ash", lib), ("app.ash", app)])
        .err()
        .expect("missing import should fail");
    assert_eq!(err.kind(), SemanticErrorKind::UndefinedFunction);
}

#[test]
fn test_wrong_argument_types_with_candidates_reports_mismatch() {
    let lib = "module lib;\n\
               function int helper(int x) { return x; }";
    let app = "module app;\n\
               using lib;\n\
               function void main() { helper(true); }";
    let err = analyze(&[("lib.ash", lib), ("app.ash", app)])
        .err()
        .expect("argument mismatch should fail");
    assert_eq!(err.kind(), SemanticErrorKind::ArgumentMismatch);
    assert!(err.message().contains("lib"));
}

#[test]
fn test_duplicate_function_in_module() {
    let err = expect_error(
        "module m;\n\
         function int f(int x) { return 1; }\n\
         function int f(int y) { return 2; }",
    );
    assert_eq!(err.kind(), SemanticErrorKind::DuplicateFunction);
}

#[test]
fn test_duplicate_function_across_files_of_one_module() {
    let a = "module m;\nfunction int f(int x) { return 1; }";
    let b = "module m;\nfunction int f(int y) { return 2; }";
    let err = analyze(&[("a.ash", a), ("b.ash", b)])
        .err()
        .expect("duplicate export should fail");
    assert_eq!(err.kind(), SemanticErrorKind::DuplicateFunction);
}

#[test]
fn test_nested_function_resolution() {
    analyze_one(
        "function int outer() {\n\
           function int inner(int x) { return x * 2; }\n\
           return inner(21);\n\
         }",
    )
    .expect("nested function resolves");
}

#[test]
fn test_nested_function_cannot_use_outer_variables() {
    let err = expect_error(
        "function int outer() {\n\
           int secret = 1;\n\
           function int inner() { return secret; }\n\
           return inner();\n\
         }",
    );
    assert_eq!(err.kind(), SemanticErrorKind::UndefinedVariable);
}

#[test]
fn test_switch_case_type_must_match() {
    let err = expect_error(
        "function void f(int x) {\n\
           switch x { case 'a' { } default { } }\n\
         }",
    );
    assert_eq!(err.kind(), SemanticErrorKind::InvalidSwitchCase);
}

#[test]
fn test_switch_case_must_be_constant() {
    let err = expect_error(
        "function void f(int x, int y) {\n\
           switch x { case y { } default { } }\n\
         }",
    );
    assert_eq!(err.kind(), SemanticErrorKind::InvalidSwitchCase);
}

#[test]
fn test_switch_value_must_be_integer() {
    let err = expect_error(
        "function void f(f32 x) {\n\
           switch x { default { } }\n\
         }",
    );
    assert_eq!(err.kind(), SemanticErrorKind::InvalidSwitchCase);
}

#[test]
fn test_switch_well_formed() {
    analyze_one(
        "function int f(int x) {\n\
           int r = 0;\n\
           switch x {\n\
             case 1 { r = 10; break; }\n\
             case 2 { r = 20; }\n\
             default { r = 30; }\n\
           }\n\
           return r;\n\
         }",
    )
    .expect("switch is well typed");
}
