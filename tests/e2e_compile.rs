//! End-to-end tests: drive the full pipeline the way the CLI does,
//! reading sources from disk and writing output files into a temp dir.

use std::fs;
use std::path::PathBuf;

use ashc::driver::{self, CompileError, OutputKind, SourceFile};
use tempfile::TempDir;

/// Writes the given sources into a temp dir and returns (dir, sources).
fn write_sources(files: &[(&str, &str)]) -> (TempDir, Vec<SourceFile>) {
    let dir = TempDir::new().expect("temp dir is created");
    let mut sources = Vec::new();
    for (name, contents) in files {
        let path = dir.path().join(name);
        fs::write(&path, contents).expect("source file is written");
        let read = fs::read_to_string(&path).expect("source file reads back");
        sources.push(SourceFile::new(path.display().to_string(), read));
    }
    (dir, sources)
}

fn output_path(dir: &TempDir, name: &str) -> PathBuf {
    dir.path().join(name)
}

#[test]
fn test_compile_writes_ir_file() {
    let (dir, sources) = write_sources(&[(
        "main.ash",
        "module main;\n\
         function int main() { return 0; }\n",
    )]);
    let out = output_path(&dir, "out.ll");

    driver::compile(&sources, OutputKind::Ir, &out).expect("compilation succeeds");

    let ir = fs::read_to_string(&out).expect("output file exists");
    assert!(ir.contains("define i32"));
    assert!(ir.contains("_AS_M4mainF4mainP0"));
}

#[test]
fn test_failed_compile_writes_nothing() {
    let (dir, sources) = write_sources(&[("main.ash", "function int main() { return y; }\n")]);
    let out = output_path(&dir, "out.ll");

    let error = driver::compile(&sources, OutputKind::Ir, &out).expect_err("undefined variable");
    assert!(matches!(error, CompileError::Semantic { .. }));
    assert!(!out.exists(), "no partial output on failure");
}

#[test]
fn test_multi_file_program_compiles_in_dependency_order() {
    let (dir, sources) = write_sources(&[
        (
            "app.ash",
            "module app;\n\
             using math;\n\
             function int main() { return math::square(7); }\n",
        ),
        (
            "math.ash",
            "module math;\n\
             function int square(int x) { return x * x; }\n",
        ),
    ]);
    let out = output_path(&dir, "out.ll");

    driver::compile(&sources, OutputKind::Ir, &out).expect("compilation succeeds");

    let ir = fs::read_to_string(&out).expect("output file exists");
    assert!(ir.contains("_AS_M4mathF6squareP1V3i32"));
    assert!(ir.contains("_AS_M3appF4mainP0"));
}

#[test]
fn test_module_cycle_reports_both_edges() {
    let (_dir, sources) = write_sources(&[
        ("a.ash", "module a;\nusing b;\n"),
        ("b.ash", "module b;\nusing a;\n"),
    ]);

    let error = driver::compile_to_ir(&sources).expect_err("cycle is rejected");
    let CompileError::Module(module_error) = &error else {
        panic!("expected a module error, got {:?}", error);
    };
    let rendered = module_error.to_string();
    assert!(rendered.contains("circular dependencies"));
    assert!(rendered.contains("In module 'a': requiring 'b' creates a cycle."));
    assert!(rendered.contains("In module 'b': requiring 'a' creates a cycle."));
}

#[test]
fn test_unknown_import_is_reported() {
    let (_dir, sources) = write_sources(&[("a.ash", "module a;\nusing missing;\n")]);

    let error = driver::compile_to_ir(&sources).expect_err("unknown import is rejected");
    let CompileError::Module(module_error) = &error else {
        panic!("expected a module error, got {:?}", error);
    };
    assert!(module_error.to_string().contains("'missing'"));
}

#[test]
fn test_parse_error_carries_file_context() {
    let (_dir, sources) = write_sources(&[("broken.ash", "function int f() { int x = 1 }\n")]);

    let error = driver::compile_to_ir(&sources).expect_err("missing semicolon is rejected");
    let CompileError::Parse { file, error, .. } = &error else {
        panic!("expected a parse error, got {:?}", error);
    };
    assert!(file.ends_with("broken.ash"));
    assert!(error.message().contains("missing ';'"));
}

#[test]
fn test_lex_error_carries_file_context() {
    let (_dir, sources) = write_sources(&[("broken.ash", "function int f() { return 1 @ 2; }\n")]);

    let error = driver::compile_to_ir(&sources).expect_err("stray character is rejected");
    assert!(matches!(error, CompileError::Lex { .. }));
}

#[test]
fn test_overload_program_end_to_end() {
    let (_dir, sources) = write_sources(&[(
        "main.ash",
        "module m;\n\
         function int pick(int x) { return 1; }\n\
         function int pick(f32 x) { return 2; }\n\
         function int main() { return pick(1) + pick(1.5); }\n",
    )]);

    let ir = driver::compile_to_ir(&sources).expect("overloads compile");
    assert!(ir.contains("_AS_M1mF4pickP1V3i32"));
    assert!(ir.contains("_AS_M1mF4pickP1V3f32"));
}

#[test]
fn test_extern_program_end_to_end() {
    let (_dir, sources) = write_sources(&[(
        "main.ash",
        "module m;\n\
         extern void putchar(char c);\n\
         function int main() {\n\
           for char c = 'a', c <= 'z', c = (char)((int) c + 1) { putchar(c); }\n\
           return 0;\n\
         }\n",
    )]);

    let ir = driver::compile_to_ir(&sources).expect("extern program compiles");
    assert!(ir.contains("declare void @putchar(i8"));
    assert!(ir.contains("for.body"));
}

#[test]
fn test_larger_program_compiles() {
    let (_dir, sources) = write_sources(&[(
        "main.ash",
        "module demo;\n\
         \n\
         # integer square root by bisection\n\
         function int isqrt(int n) {\n\
           int low = 0;\n\
           int high = n;\n\
           while low < high {\n\
             int mid = (low + high + 1) / 2;\n\
             if mid * mid <= n { low = mid; } else { high = mid - 1; }\n\
           }\n\
           return low;\n\
         }\n\
         \n\
         function bool is_even(int n) { return n % 2 == 0; }\n\
         \n\
         function int main() {\n\
           int total = 0;\n\
           for int i = 1, i <= 100, i = i + 1 {\n\
             if is_even(i) && isqrt(i) * isqrt(i) == i {\n\
               total += i;\n\
             }\n\
           }\n\
           return total;\n\
         }\n",
    )]);

    let ir = driver::compile_to_ir(&sources).expect("program compiles");
    assert!(ir.contains("F5isqrtP1V3i32"));
    assert!(ir.contains("F7is_evenP1V3i32"));
    assert!(ir.contains("and.lhs.start"));
}
