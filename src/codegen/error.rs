//! Code generation error types.
//!
//! Every codegen error is an internal compiler error: semantic analysis
//! guarantees the conditions checked here cannot occur in a valid
//! pipeline run, and LLVM builder failures indicate a bug in the
//! lowering itself.

use crate::token::Span;

/// The kind of code generation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodegenErrorKind {
    /// A lowering invariant was violated (missing cache, missing slot).
    Internal,
    /// The LLVM builder rejected an instruction.
    Llvm,
    /// A generated function failed LLVM verification.
    Verify,
    /// Target or output-file handling failed.
    Target,
}

/// An error during lowering or output.
#[derive(Debug)]
pub struct CodegenError {
    message: String,
    span: Option<Span>,
    kind: CodegenErrorKind,
}

impl CodegenError {
    /// An internal lowering invariant violation at a known location.
    pub fn internal(message: impl Into<String>, span: Span) -> Self {
        CodegenError {
            message: message.into(),
            span: Some(span),
            kind: CodegenErrorKind::Internal,
        }
    }

    /// An LLVM builder failure while emitting `operation`.
    pub fn llvm(operation: &str, error: impl std::fmt::Display, span: Span) -> Self {
        CodegenError {
            message: format!("LLVM {} failed: {}", operation, error),
            span: Some(span),
            kind: CodegenErrorKind::Llvm,
        }
    }

    /// A function that failed LLVM verification.
    pub fn verify(function: &str) -> Self {
        CodegenError {
            message: format!("generated function '{}' failed verification", function),
            span: None,
            kind: CodegenErrorKind::Verify,
        }
    }

    /// A target machine or output failure.
    pub fn target(message: impl Into<String>) -> Self {
        CodegenError {
            message: message.into(),
            span: None,
            kind: CodegenErrorKind::Target,
        }
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the source location, when the error maps to one.
    pub fn span(&self) -> Option<Span> {
        self.span
    }

    /// Returns the error kind.
    pub fn kind(&self) -> CodegenErrorKind {
        self.kind
    }
}

impl std::fmt::Display for CodegenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.span {
            Some(span) => write!(f, "{}:{}: {}", span.line, span.column, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for CodegenError {}
