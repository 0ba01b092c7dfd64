//! The compilation pipeline.
//!
//! Orchestrates the phases over a set of in-memory sources: lex and
//! parse each file, register modules, compute the build order, run the
//! prototype pass, the constant checker, and the type checker per file
//! in build order, then lower everything into one LLVM module and
//! serialize it.
//!
//! Used by the `ashc` binary and, through [`compile_to_ir`], by the
//! end-to-end tests. All-or-nothing: the first error aborts the pipeline
//! and no output is written.

use std::collections::HashMap;
use std::path::Path;

use inkwell::context::Context;

use crate::codegen::{Codegen, CodegenError};
use crate::interner::{Interner, NameId};
use crate::lexer::{LexError, Lexer};
use crate::mangle;
use crate::modules::{ModuleError, ModuleManager};
use crate::parser::{ParseError, Parser};
use crate::semantic::{self, SemanticError, TypeChecker};

/// One input file: its display name and contents.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub source: String,
}

impl SourceFile {
    /// Creates a source file from a name and contents.
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        SourceFile {
            name: name.into(),
            source: source.into(),
        }
    }
}

/// What the driver writes out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// Textual LLVM IR.
    Ir,
    /// A host-native object file.
    Object,
}

/// A compilation error from any phase, with the file context needed for
/// reporting.
#[derive(Debug)]
pub enum CompileError {
    /// A lexing error, with the offending file's name and contents.
    Lex {
        file: String,
        source: String,
        error: LexError,
    },
    /// A parse error, with the offending file's name and contents.
    Parse {
        file: String,
        source: String,
        error: ParseError,
    },
    /// A module graph error (no single source location).
    Module(ModuleError),
    /// A scope, constant, or type error.
    Semantic {
        file: String,
        source: String,
        error: SemanticError,
    },
    /// An internal lowering error.
    Codegen {
        file: String,
        source: String,
        error: CodegenError,
    },
    /// An output-file error.
    Output(CodegenError),
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::Lex { file, error, .. } => write!(f, "{}: {}", file, error),
            CompileError::Parse { file, error, .. } => write!(f, "{}: {}", file, error),
            CompileError::Module(error) => write!(f, "{}", error),
            CompileError::Semantic { file, error, .. } => write!(f, "{}: {}", file, error),
            CompileError::Codegen { file, error, .. } => write!(f, "{}: {}", file, error),
            CompileError::Output(error) => write!(f, "{}", error),
        }
    }
}

impl std::error::Error for CompileError {}

/// The front-end state shared by the compile entry points.
struct Pipeline {
    interner: Interner,
    manager: ModuleManager,
    order: Vec<NameId>,
    /// file id → index into the caller's source list
    origins: HashMap<NameId, usize>,
}

impl Pipeline {
    fn context_for(&self, sources: &[SourceFile], file: NameId) -> (String, String) {
        match self.origins.get(&file) {
            Some(&index) => (sources[index].name.clone(), sources[index].source.clone()),
            None => (self.interner.get_string(file).to_string(), String::new()),
        }
    }
}

/// Runs lexing, parsing, module checks, and semantic analysis.
fn run_front_end(sources: &[SourceFile]) -> Result<Pipeline, CompileError> {
    let mut interner = Interner::new();
    let mut manager = ModuleManager::new();
    let mut origins = HashMap::new();

    for (index, input) in sources.iter().enumerate() {
        let tokens = Lexer::new(&input.source)
            .tokenize()
            .map_err(|error| CompileError::Lex {
                file: input.name.clone(),
                source: input.source.clone(),
                error,
            })?;
        let parsed = Parser::new(tokens, &mut interner)
            .parse_file()
            .map_err(|error| CompileError::Parse {
                file: input.name.clone(),
                source: input.source.clone(),
                error,
            })?;

        let file = interner.get_id(&input.name);
        let module = parsed
            .module
            .unwrap_or_else(|| interner.get_id(mangle::PREAMBLE));
        manager.add_ast(file, parsed.ast);
        manager.add_module(file, module, parsed.imports);
        origins.insert(file, index);
    }

    manager
        .check_modules(&interner)
        .map_err(CompileError::Module)?;
    let order = manager
        .get_build_files_order(&interner)
        .map_err(CompileError::Module)?;

    let mut pipeline = Pipeline {
        interner,
        manager,
        order,
        origins,
    };

    // prototypes for every file before any body is checked
    for index in 0..pipeline.order.len() {
        let file = pipeline.order[index];
        let mut ast = pipeline.manager.take_ast(file);
        let result = semantic::check_prototypes(
            &mut ast,
            file,
            &mut pipeline.manager,
            &mut pipeline.interner,
        );
        pipeline.manager.put_ast(file, ast);
        if let Err(error) = result {
            let (file, source) = pipeline.context_for(sources, file);
            return Err(CompileError::Semantic {
                file,
                source,
                error,
            });
        }
    }

    // constant statuses first, then types, per file in build order
    for index in 0..pipeline.order.len() {
        let file = pipeline.order[index];
        let mut ast = pipeline.manager.take_ast(file);
        semantic::constants::check(&mut ast);
        let result =
            TypeChecker::new(&mut pipeline.interner, &pipeline.manager, file).check(&mut ast);
        pipeline.manager.put_ast(file, ast);
        if let Err(error) = result {
            let (file, source) = pipeline.context_for(sources, file);
            return Err(CompileError::Semantic {
                file,
                source,
                error,
            });
        }
    }

    Ok(pipeline)
}

/// Lowers the checked files into `codegen`, prototypes first.
fn run_lowering(
    pipeline: &Pipeline,
    sources: &[SourceFile],
    codegen: &mut Codegen<'_>,
) -> Result<(), CompileError> {
    let wrap = |pipeline: &Pipeline, file: NameId, error: CodegenError| {
        let (file, source) = pipeline.context_for(sources, file);
        CompileError::Codegen {
            file,
            source,
            error,
        }
    };

    for &file in &pipeline.order {
        let ast = pipeline.manager.ast(file).expect("checked file is loaded");
        codegen
            .emit_prototypes(ast, &pipeline.interner)
            .map_err(|e| wrap(pipeline, file, e))?;
    }
    for &file in &pipeline.order {
        let ast = pipeline.manager.ast(file).expect("checked file is loaded");
        codegen
            .emit_definitions(ast, &pipeline.interner)
            .map_err(|e| wrap(pipeline, file, e))?;
    }
    Ok(())
}

/// Compiles sources and writes the requested output file.
pub fn compile(
    sources: &[SourceFile],
    output: OutputKind,
    path: &Path,
) -> Result<(), CompileError> {
    let pipeline = run_front_end(sources)?;

    let context = Context::create();
    let mut codegen = Codegen::new(&context, "ash");
    run_lowering(&pipeline, sources, &mut codegen)?;

    match output {
        OutputKind::Ir => codegen.write_ir_file(path).map_err(CompileError::Output),
        OutputKind::Object => codegen
            .write_object_file(path)
            .map_err(CompileError::Output),
    }
}

/// Compiles sources and returns the textual LLVM IR. Used by tests.
pub fn compile_to_ir(sources: &[SourceFile]) -> Result<String, CompileError> {
    let pipeline = run_front_end(sources)?;

    let context = Context::create();
    let mut codegen = Codegen::new(&context, "ash");
    run_lowering(&pipeline, sources, &mut codegen)?;
    Ok(codegen.print_ir())
}
