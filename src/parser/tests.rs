use super::*;
use crate::ast::{BodyKind, ExprId, ExprKind};
use crate::lexer::Lexer;
use crate::ops::{BinaryOp, UnaryOp};
use crate::types::{LiteralValue, Type};

fn parse(source: &str) -> (ParsedFile, Interner) {
    let mut interner = Interner::new();
    let tokens = Lexer::new(source).tokenize().expect("lexing should succeed");
    let file = Parser::new(tokens, &mut interner)
        .parse_file()
        .expect("parsing should succeed");
    (file, interner)
}

fn parse_err(source: &str) -> ParseError {
    let mut interner = Interner::new();
    let tokens = Lexer::new(source).tokenize().expect("lexing should succeed");
    Parser::new(tokens, &mut interner)
        .parse_file()
        .expect_err("parsing should fail")
}

/// The single expression of the single function in `file`.
fn only_expr(file: &ParsedFile) -> ExprId {
    let root = file.ast.body(file.ast.root());
    assert_eq!(root.functions.len(), 1);
    let body = file.ast.expr_body(root.functions[0].body);
    let exprs = &file.ast.body(body).expressions;
    assert_eq!(exprs.len(), 1);
    exprs[0]
}

#[test]
fn test_empty_file() {
    let (file, _) = parse("");
    let root = file.ast.body(file.ast.root());
    assert!(root.functions.is_empty());
    assert!(root.expressions.is_empty());
    assert_eq!(file.module, None);
    assert!(file.imports.is_empty());
}

#[test]
fn test_module_declaration() {
    let (file, interner) = parse("module a::core;");
    let module = file.module.expect("module is declared");
    assert_eq!(interner.get_string(module), "_AS_M1aM4core");
}

#[test]
fn test_using_declarations() {
    let (file, interner) = parse("module a;\nusing b;\nusing c::d;");
    assert_eq!(file.imports.len(), 2);
    let names: Vec<_> = file
        .imports
        .iter()
        .map(|id| interner.get_string(*id).to_string())
        .collect();
    assert!(names.contains(&"_AS_M1b".to_string()));
    assert!(names.contains(&"_AS_M1cM1d".to_string()));
}

#[test]
fn test_module_after_items_is_error() {
    let err = parse_err("function void f() {}\nmodule a;");
    assert!(err.message().contains("top of the file"));
}

#[test]
fn test_function_definition() {
    let (file, interner) = parse("function int add(int a, int b) { return a + b; }");
    let root = file.ast.body(file.ast.root());
    assert_eq!(root.functions.len(), 1);

    let func = &root.functions[0];
    let proto = file.ast.proto(func.prototype);
    assert_eq!(interner.get_string(proto.name), "add");
    assert_eq!(proto.return_type, Type::default_int());
    assert_eq!(proto.params, vec![Type::default_int(), Type::default_int()]);
    assert!(!proto.is_extern);

    let body = file.ast.expr_body(func.body);
    assert_eq!(file.ast.body(body).kind, BodyKind::Function);
    assert_eq!(file.ast.body(body).parent_function, Some(func.prototype));
    // parameters are visible as body variables
    let a = interner.lookup("a").expect("param interned");
    assert_eq!(
        file.ast.body(body).named_types.get(&a),
        Some(&Type::default_int())
    );
}

#[test]
fn test_extern_declaration() {
    let (file, interner) = parse("extern void putchar(char c);");
    let root = file.ast.body(file.ast.root());
    let putchar = interner.lookup("putchar").expect("name interned");
    assert!(root.prototypes.contains_key(&putchar));
    assert_eq!(root.externs, vec![putchar]);
    let proto = file.ast.proto(root.prototypes[&putchar]);
    assert!(proto.is_extern);
}

#[test]
fn test_extern_requires_semicolon() {
    let err = parse_err("extern void putchar(char c)");
    assert!(err.message().contains("missing ';'"));
}

#[test]
fn test_top_level_expression_rejected() {
    let err = parse_err("1 + 2;");
    assert!(err.message().contains("not allowed in top level code"));
}

#[test]
fn test_missing_semicolon_in_body() {
    let err = parse_err("function void f() { int x = 1 }");
    assert!(err.message().contains("missing ';'"));
}

#[test]
fn test_unclosed_body() {
    let err = parse_err("function void f() { int x = 1;");
    assert!(err.message().contains("Body must end with a '}'"));
}

#[test]
fn test_precedence_multiplication_binds_tighter() {
    let (file, _) = parse("function void f() { int x = 1 + 2 * 3; }");
    let decl = only_expr(&file);
    let init = match &file.ast.expr(decl).kind {
        ExprKind::VariableDeclaration { init, .. } => init.expect("has initializer"),
        other => panic!("expected declaration, got {:?}", other),
    };
    // 1 + (2 * 3)
    match &file.ast.expr(init).kind {
        ExprKind::Binary { op, rhs, .. } => {
            assert_eq!(*op, BinaryOp::Addition);
            match &file.ast.expr(*rhs).kind {
                ExprKind::Binary { op, .. } => assert_eq!(*op, BinaryOp::Multiplication),
                other => panic!("expected multiplication on the right, got {:?}", other),
            }
        }
        other => panic!("expected addition at the top, got {:?}", other),
    }
}

#[test]
fn test_same_precedence_associates_left() {
    let (file, _) = parse("function void f() { int x = 1 - 2 - 3; }");
    let decl = only_expr(&file);
    let init = match &file.ast.expr(decl).kind {
        ExprKind::VariableDeclaration { init, .. } => init.expect("has initializer"),
        other => panic!("expected declaration, got {:?}", other),
    };
    // (1 - 2) - 3
    match &file.ast.expr(init).kind {
        ExprKind::Binary { op, lhs, .. } => {
            assert_eq!(*op, BinaryOp::Subtraction);
            assert!(matches!(
                file.ast.expr(*lhs).kind,
                ExprKind::Binary {
                    op: BinaryOp::Subtraction,
                    ..
                }
            ));
        }
        other => panic!("expected subtraction at the top, got {:?}", other),
    }
}

#[test]
fn test_assignment_is_right_associative() {
    let (file, _) = parse("function void f() { int a = 0; int b = 0; a = b = 3; }");
    let root = file.ast.body(file.ast.root());
    let body = file.ast.expr_body(root.functions[0].body);
    let exprs = &file.ast.body(body).expressions;
    let assign = exprs[2];
    // a = (b = 3)
    match &file.ast.expr(assign).kind {
        ExprKind::Binary { op, rhs, .. } => {
            assert_eq!(*op, BinaryOp::Assignment);
            assert!(matches!(
                file.ast.expr(*rhs).kind,
                ExprKind::Binary {
                    op: BinaryOp::Assignment,
                    ..
                }
            ));
        }
        other => panic!("expected assignment at the top, got {:?}", other),
    }
}

#[test]
fn test_comparison_below_additive() {
    let (file, _) = parse("function void f() { bool b = 1 + 2 < 4; }");
    let decl = only_expr(&file);
    let init = match &file.ast.expr(decl).kind {
        ExprKind::VariableDeclaration { init, .. } => init.expect("has initializer"),
        other => panic!("expected declaration, got {:?}", other),
    };
    assert!(matches!(
        file.ast.expr(init).kind,
        ExprKind::Binary {
            op: BinaryOp::LessThan,
            ..
        }
    ));
}

#[test]
fn test_parenthesized_expression() {
    let (file, _) = parse("function void f() { int x = (1 + 2) * 3; }");
    let decl = only_expr(&file);
    let init = match &file.ast.expr(decl).kind {
        ExprKind::VariableDeclaration { init, .. } => init.expect("has initializer"),
        other => panic!("expected declaration, got {:?}", other),
    };
    assert!(matches!(
        file.ast.expr(init).kind,
        ExprKind::Binary {
            op: BinaryOp::Multiplication,
            ..
        }
    ));
}

#[test]
fn test_cast_expression() {
    let (file, _) = parse("function void f() { int y = (int) 3.5; }");
    let decl = only_expr(&file);
    let init = match &file.ast.expr(decl).kind {
        ExprKind::VariableDeclaration { init, .. } => init.expect("has initializer"),
        other => panic!("expected declaration, got {:?}", other),
    };
    match &file.ast.expr(init).kind {
        ExprKind::Cast { target, operand } => {
            assert_eq!(*target, Type::default_int());
            assert!(matches!(
                file.ast.expr(*operand).kind,
                ExprKind::Literal { .. }
            ));
        }
        other => panic!("expected cast, got {:?}", other),
    }
}

#[test]
fn test_unary_operators() {
    let (file, _) = parse("function void f() { int x = -1; bool b = !true; int y = ~x; }");
    let root = file.ast.body(file.ast.root());
    let body = file.ast.expr_body(root.functions[0].body);
    let exprs = file.ast.body(body).expressions.clone();

    let inits: Vec<_> = exprs
        .iter()
        .map(|e| match &file.ast.expr(*e).kind {
            ExprKind::VariableDeclaration { init, .. } => init.expect("has initializer"),
            other => panic!("expected declaration, got {:?}", other),
        })
        .collect();

    assert!(matches!(
        file.ast.expr(inits[0]).kind,
        ExprKind::Unary {
            op: UnaryOp::Minus,
            ..
        }
    ));
    assert!(matches!(
        file.ast.expr(inits[1]).kind,
        ExprKind::Unary {
            op: UnaryOp::BooleanNot,
            ..
        }
    ));
    assert!(matches!(
        file.ast.expr(inits[2]).kind,
        ExprKind::Unary {
            op: UnaryOp::BitwiseNot,
            ..
        }
    ));
}

#[test]
fn test_call_with_arguments() {
    let (file, interner) = parse(
        "function int g(int a, int b) { return a; }\n\
         function void f() { g(1, 2); }",
    );
    let root = file.ast.body(file.ast.root());
    let body = file.ast.expr_body(root.functions[1].body);
    let call = file.ast.body(body).expressions[0];
    match &file.ast.expr(call).kind {
        ExprKind::Call { callee, args, .. } => {
            assert_eq!(interner.get_string(*callee), "g");
            assert_eq!(args.len(), 2);
        }
        other => panic!("expected call, got {:?}", other),
    }
}

#[test]
fn test_if_statement_does_not_yield() {
    let (file, _) = parse("function void f() { if true { } else { } }");
    let stmt = only_expr(&file);
    match &file.ast.expr(stmt).kind {
        ExprKind::If {
            yields_value,
            else_body,
            ..
        } => {
            assert!(!yields_value);
            assert!(else_body.is_some());
        }
        other => panic!("expected if, got {:?}", other),
    }
}

#[test]
fn test_if_expression_yields() {
    let (file, _) = parse("function void f() { int x = if true { 1; } else { 2; }; }");
    let decl = only_expr(&file);
    let init = match &file.ast.expr(decl).kind {
        ExprKind::VariableDeclaration { init, .. } => init.expect("has initializer"),
        other => panic!("expected declaration, got {:?}", other),
    };
    assert!(matches!(
        file.ast.expr(init).kind,
        ExprKind::If {
            yields_value: true,
            ..
        }
    ));
}

#[test]
fn test_if_without_else() {
    let (file, _) = parse("function void f() { if true { } }");
    let stmt = only_expr(&file);
    assert!(matches!(
        file.ast.expr(stmt).kind,
        ExprKind::If {
            else_body: None,
            ..
        }
    ));
}

#[test]
fn test_for_loop() {
    let (file, interner) = parse("function void f() { for int i = 0, i < 10, i = i + 1 { } }");
    let stmt = only_expr(&file);
    match &file.ast.expr(stmt).kind {
        ExprKind::For {
            var_type,
            var_name,
            step,
            body,
            ..
        } => {
            assert_eq!(*var_type, Type::default_int());
            assert_eq!(interner.get_string(*var_name), "i");
            assert!(step.is_some());
            // the loop variable is registered in the loop body
            let loop_body = file.ast.expr_body(*body);
            assert_eq!(file.ast.body(loop_body).kind, BodyKind::Loop);
            assert_eq!(
                file.ast.body(loop_body).named_types.get(var_name),
                Some(&Type::default_int())
            );
        }
        other => panic!("expected for, got {:?}", other),
    }
}

#[test]
fn test_for_loop_without_step() {
    let (file, _) = parse("function void f() { for int i = 0, i < 10 { } }");
    let stmt = only_expr(&file);
    assert!(matches!(
        file.ast.expr(stmt).kind,
        ExprKind::For { step: None, .. }
    ));
}

#[test]
fn test_while_loop() {
    let (file, _) = parse("function void f() { while true { break; } }");
    let stmt = only_expr(&file);
    match &file.ast.expr(stmt).kind {
        ExprKind::While { body, .. } => {
            let loop_body = file.ast.expr_body(*body);
            assert_eq!(file.ast.body(loop_body).kind, BodyKind::Loop);
            let inner = &file.ast.body(loop_body).expressions;
            assert!(matches!(file.ast.expr(inner[0]).kind, ExprKind::Break));
        }
        other => panic!("expected while, got {:?}", other),
    }
}

#[test]
fn test_switch_with_cases_and_default() {
    let (file, _) = parse(
        "function void f(int x) {\n\
           switch x {\n\
             case 1 { break; }\n\
             case 2 { }\n\
             default { }\n\
           }\n\
         }",
    );
    let stmt = only_expr(&file);
    match &file.ast.expr(stmt).kind {
        ExprKind::Switch { cases, .. } => {
            assert_eq!(cases.len(), 3);
            assert!(matches!(
                file.ast.expr(cases[0]).kind,
                ExprKind::Case {
                    is_default: false,
                    value: Some(_),
                    ..
                }
            ));
            assert!(matches!(
                file.ast.expr(cases[2]).kind,
                ExprKind::Case {
                    is_default: true,
                    value: None,
                    ..
                }
            ));
        }
        other => panic!("expected switch, got {:?}", other),
    }
}

#[test]
fn test_return_with_and_without_value() {
    let (file, _) = parse("function int f() { return 1; }\nfunction void g() { return; }");
    let root = file.ast.body(file.ast.root());
    let f_body = file.ast.expr_body(root.functions[0].body);
    let g_body = file.ast.expr_body(root.functions[1].body);
    assert!(matches!(
        file.ast
            .expr(file.ast.body(f_body).expressions[0])
            .kind,
        ExprKind::Return { value: Some(_) }
    ));
    assert!(matches!(
        file.ast
            .expr(file.ast.body(g_body).expressions[0])
            .kind,
        ExprKind::Return { value: None }
    ));
}

#[test]
fn test_comment_becomes_expression() {
    let (file, _) = parse("function void f() { # a note\n }");
    let stmt = only_expr(&file);
    assert!(matches!(file.ast.expr(stmt).kind, ExprKind::Comment));
}

#[test]
fn test_top_level_comment_allowed() {
    let (file, _) = parse("# file header\nfunction void f() { }");
    let root = file.ast.body(file.ast.root());
    assert_eq!(root.expressions.len(), 1);
    assert!(matches!(
        file.ast.expr(root.expressions[0]).kind,
        ExprKind::Comment
    ));
}

#[test]
fn test_literal_out_of_range() {
    let err = parse_err("function void f() { i8 x = 200; }");
    assert!(err.message().contains("out of range"));
}

#[test]
fn test_literal_range_respects_suffix() {
    let (file, _) = parse("function void f() { u8 x = 200u8; }");
    let decl = only_expr(&file);
    let init = match &file.ast.expr(decl).kind {
        ExprKind::VariableDeclaration { init, .. } => init.expect("has initializer"),
        other => panic!("expected declaration, got {:?}", other),
    };
    assert_eq!(
        file.ast.expr(init).kind,
        ExprKind::Literal {
            ty: Type::Int {
                bits: 8,
                signed: false
            },
            value: LiteralValue::Int(200),
        }
    );
}

#[test]
fn test_qualified_call_parses_as_module_scope_chain() {
    let (file, interner) = parse("module m;\nusing a::b;\nfunction void f() { a::b::g(); }");
    let stmt = only_expr(&file);
    match &file.ast.expr(stmt).kind {
        ExprKind::Binary { op, lhs, rhs } => {
            assert_eq!(*op, BinaryOp::ModuleScope);
            // lhs is itself a `::` chain, rhs the call
            assert!(matches!(
                file.ast.expr(*lhs).kind,
                ExprKind::Binary {
                    op: BinaryOp::ModuleScope,
                    ..
                }
            ));
            match &file.ast.expr(*rhs).kind {
                ExprKind::Call { callee, .. } => {
                    assert_eq!(interner.get_string(*callee), "g");
                }
                other => panic!("expected call on the right, got {:?}", other),
            }
        }
        other => panic!("expected module scope chain, got {:?}", other),
    }
}

#[test]
fn test_nested_function_definition() {
    let (file, interner) = parse(
        "function void outer() {\n\
           function int inner(int x) { return x; }\n\
           inner(1);\n\
         }",
    );
    let root = file.ast.body(file.ast.root());
    let outer_body = file.ast.expr_body(root.functions[0].body);
    let nested = &file.ast.body(outer_body).functions;
    assert_eq!(nested.len(), 1);
    let inner = interner.lookup("inner").expect("name interned");
    assert!(file.ast.body(outer_body).prototypes.contains_key(&inner));
}

#[test]
fn test_compound_assignment_parses() {
    let (file, _) = parse("function void f() { int x = 1; x += 2; }");
    let root = file.ast.body(file.ast.root());
    let body = file.ast.expr_body(root.functions[0].body);
    let stmt = file.ast.body(body).expressions[1];
    assert!(matches!(
        file.ast.expr(stmt).kind,
        ExprKind::Binary {
            op: BinaryOp::AssignmentAddition,
            ..
        }
    ));
}

#[test]
fn test_every_expression_links_to_an_ancestor_body() {
    let (file, _) = parse(
        "function int f(int n) {\n\
           int total = 0;\n\
           for int i = 0, i < n, i = i + 1 {\n\
             if i % 2 == 0 { total += i; } else { continue; }\n\
           }\n\
           switch total { case 0 { } default { } }\n\
           return total;\n\
         }",
    );

    let root = file.ast.root();
    let root_expr = file.ast.body(root).self_expr;
    for id in file.ast.expr_ids() {
        if id == root_expr {
            assert_eq!(file.ast.enclosing_body(id), None);
            continue;
        }
        // walking the enclosing-body chain always reaches the root
        let mut body = file.ast.enclosing_body(id);
        assert!(body.is_some(), "non-root expression has an enclosing body");
        let mut steps = 0;
        while let Some(current) = body {
            if current == root {
                break;
            }
            body = file.ast.body(current).parent;
            steps += 1;
            assert!(steps < 100, "body chain terminates");
        }
        assert_eq!(body, Some(root));
    }
}

#[test]
fn test_dump_renders_tree() {
    let (file, interner) = parse("function int f() { return 1 + 2; }");
    let dump = file.ast.dump(&interner);
    assert!(dump.contains("function f -> i32"));
    assert!(dump.contains("binary Addition (+)"));
    assert!(dump.contains("literal 1: i32"));
}
