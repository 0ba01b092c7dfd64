//! The Ash stage-0 compiler CLI.
//!
//! Reads one or more source files, runs the compilation pipeline, and
//! writes either textual LLVM IR or a native object file.

use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};

use ashc::driver::{self, OutputKind, SourceFile};

mod diagnostics;

/// Command-line interface for the Ash compiler.
#[derive(Parser)]
#[command(name = "ashc")]
#[command(about = "The Ash stage-0 compiler", long_about = None)]
struct Cli {
    /// The primary input source file.
    input: PathBuf,

    /// The output file path.
    output: PathBuf,

    /// Additional input source files.
    #[arg(long = "input", value_name = "PATH")]
    extra_inputs: Vec<PathBuf>,

    /// Output format: textual LLVM IR or a native object file.
    #[arg(long = "output-type", value_enum, default_value = "ir")]
    output_type: OutputType,
}

/// The `--output-type` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputType {
    /// Textual LLVM IR.
    Ir,
    /// A native object file.
    Obj,
}

fn read_source(path: &Path) -> SourceFile {
    match std::fs::read_to_string(path) {
        Ok(source) => SourceFile::new(path.display().to_string(), source),
        Err(error) => {
            eprintln!("Failed to read file '{}': {}", path.display(), error);
            std::process::exit(1);
        }
    }
}

/// Entry point for the Ash compiler.
fn main() {
    let cli = Cli::parse();

    let mut sources = vec![read_source(&cli.input)];
    for path in &cli.extra_inputs {
        sources.push(read_source(path));
    }

    let output = match cli.output_type {
        OutputType::Ir => OutputKind::Ir,
        OutputType::Obj => OutputKind::Object,
    };

    if let Err(error) = driver::compile(&sources, output, &cli.output) {
        diagnostics::report_error(&error);
        std::process::exit(1);
    }
}
