//! Semantic analysis for Ash.
//!
//! Three cooperating checkers run between parsing and lowering:
//!
//! - [`scope`] answers visibility questions by walking the body chain;
//! - [`constants`] classifies every expression `Constant` or `Variable`;
//! - [`typeck`] validates the program and resolves call sites to mangled
//!   ids, caching every expression's result type.
//!
//! # Pipeline Position
//!
//! ```text
//! Source → Lexer → Parser → Module checks → Constant/Type checking → Codegen
//! ```
//!
//! Ordering: for each file, constant checking runs before type checking,
//! and the prototype pass over *all* files runs before any body pass, so
//! cross-file calls resolve regardless of build position.

pub mod constants;
pub mod scope;
mod error;
mod typeck;

#[cfg(test)]
mod tests;

pub use error::{SemanticError, SemanticErrorKind};
pub use typeck::{TypeChecker, check_prototypes};
