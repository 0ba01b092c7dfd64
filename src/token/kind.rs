//! Token kinds for the Ash lexer.

use crate::ops::{BinaryOp, UnaryOp};
use crate::types::Type;

/// The kind of token recognized by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// A type keyword (`int`, `u16`, `f64`, ...) opening a variable
    /// declaration, a parameter, or a return type.
    TypeName(Type),

    /// An identifier: `[A-Za-z_][A-Za-z0-9_]*`.
    Identifier(String),

    /// A literal token together with its recognized type. The raw text is
    /// kept so the parser can extract the payload and range-check it.
    Literal {
        /// The literal's recognized type (suffix applied, defaults otherwise).
        ty: Type,
        /// The verbatim token text.
        text: String,
    },

    /// A binary operator. `+` and `-` double as unary operators in prefix
    /// position; the parser decides from context.
    BinOp(BinaryOp),

    /// A purely unary operator (`!`, `~`).
    UnOp(UnaryOp),

    /// The `function` keyword.
    Function,
    /// The `extern` keyword.
    Extern,
    /// The `if` keyword.
    If,
    /// The `else` keyword.
    Else,
    /// The `for` keyword.
    For,
    /// The `while` keyword.
    While,
    /// The `return` keyword.
    Return,
    /// The `continue` keyword.
    Continue,
    /// The `break` keyword.
    Break,
    /// The `switch` keyword.
    Switch,
    /// The `case` keyword.
    Case,
    /// The `default` keyword.
    Default,
    /// The `module` keyword.
    Module,
    /// The `using` keyword.
    Using,

    /// `{`
    BodyStart,
    /// `}`
    BodyEnd,
    /// `(`
    ParenStart,
    /// `)`
    ParenEnd,
    /// `,`
    Comma,
    /// `;`
    EndOfExpression,

    /// A `#` comment running to the end of the line.
    Comment,

    /// End of file. Always the final token.
    Eof,
}

impl TokenKind {
    /// A short description for error messages.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::TypeName(ty) => format!("type '{}'", ty),
            TokenKind::Identifier(name) => format!("identifier '{}'", name),
            TokenKind::Literal { text, .. } => format!("literal '{}'", text),
            TokenKind::BinOp(op) => format!("operator {}", op),
            TokenKind::UnOp(op) => format!("operator {}", op),
            TokenKind::Function => "'function'".to_string(),
            TokenKind::Extern => "'extern'".to_string(),
            TokenKind::If => "'if'".to_string(),
            TokenKind::Else => "'else'".to_string(),
            TokenKind::For => "'for'".to_string(),
            TokenKind::While => "'while'".to_string(),
            TokenKind::Return => "'return'".to_string(),
            TokenKind::Continue => "'continue'".to_string(),
            TokenKind::Break => "'break'".to_string(),
            TokenKind::Switch => "'switch'".to_string(),
            TokenKind::Case => "'case'".to_string(),
            TokenKind::Default => "'default'".to_string(),
            TokenKind::Module => "'module'".to_string(),
            TokenKind::Using => "'using'".to_string(),
            TokenKind::BodyStart => "'{'".to_string(),
            TokenKind::BodyEnd => "'}'".to_string(),
            TokenKind::ParenStart => "'('".to_string(),
            TokenKind::ParenEnd => "')'".to_string(),
            TokenKind::Comma => "','".to_string(),
            TokenKind::EndOfExpression => "';'".to_string(),
            TokenKind::Comment => "comment".to_string(),
            TokenKind::Eof => "end of file".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_keyword() {
        assert_eq!(TokenKind::Function.describe(), "'function'");
        assert_eq!(TokenKind::EndOfExpression.describe(), "';'");
    }

    #[test]
    fn test_describe_identifier_and_literal() {
        assert_eq!(
            TokenKind::Identifier("foo".to_string()).describe(),
            "identifier 'foo'"
        );
        let literal = TokenKind::Literal {
            ty: Type::default_int(),
            text: "42".to_string(),
        };
        assert_eq!(literal.describe(), "literal '42'");
    }

    #[test]
    fn test_token_kind_equality() {
        assert_eq!(TokenKind::BodyStart, TokenKind::BodyStart);
        assert_ne!(TokenKind::BodyStart, TokenKind::BodyEnd);
        assert_eq!(
            TokenKind::BinOp(BinaryOp::Addition),
            TokenKind::BinOp(BinaryOp::Addition)
        );
    }
}
