//! Lexical analysis error types.

use crate::token::Span;

/// An error produced while tokenizing source code.
#[derive(Debug)]
pub struct LexError {
    message: String,
    span: Span,
}

impl LexError {
    /// Creates a new lex error at the given location.
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        LexError {
            message: message.into(),
            span,
        }
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the source location of the error.
    pub fn span(&self) -> Span {
        self.span
    }
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}: {}",
            self.span.line, self.span.column, self.message
        )
    }
}

impl std::error::Error for LexError {}
