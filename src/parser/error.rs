//! Parse error types.

use crate::token::Span;

/// An error produced while parsing a token stream.
///
/// Carries the message and the source location of the offending token;
/// the driver renders both with the surrounding source line.
#[derive(Debug)]
pub struct ParseError {
    message: String,
    span: Span,
}

impl ParseError {
    /// Creates a new parse error at the given location.
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        ParseError {
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

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}: {}",
            self.span.line, self.span.column, self.message
        )
    }
}

impl std::error::Error for ParseError {}
