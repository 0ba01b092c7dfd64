//! Lexical analyzer for the Ash language.
//!
//! Converts source text into a stream of [`Token`]s. The lexer recognizes:
//!
//! - identifiers `[A-Za-z_][A-Za-z0-9_]*`, with type names and keywords
//!   split off into their own token kinds
//! - integer, float, bool, and char literals, including type suffixes
//!   (`42u8`, `1.5f64`) and char escapes
//! - operators, greedily matching two-character forms (`<=`, `>=`, `==`,
//!   `!=`, `&&`, `||`, `<<`, `>>`, compound assignments, `::`) before
//!   one-character forms
//! - punctuation, and `#` line comments (emitted as [`TokenKind::Comment`])
//!
//! Position tracking: a tab advances the column by one, a carriage return
//! is ignored, and a line feed resets the column and increments the line.

mod error;


pub use error::LexError;

use crate::ops::{BinaryOp, UnaryOp};
use crate::token::{Span, Token, TokenKind};
use crate::types;

/// A lexical analyzer over one source file.
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer over `input`, positioned at line 1, column 1.
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenizes the entire input.
    ///
    /// The returned vector always ends with a [`TokenKind::Eof`] token.
    ///
    /// # Errors
    ///
    /// Returns an error on an unexpected or non-ASCII character, a
    /// malformed literal, or an unterminated char literal.
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();

            if self.is_eof() {
                tokens.push(Token::new(TokenKind::Eof, self.here(0)));
                break;
            }

            let token = self.next_token()?;
            tokens.push(token);
        }

        Ok(tokens)
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn current(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos + 1).copied()
    }

    fn advance(&mut self) {
        match self.current() {
            Some(b'\n') => {
                self.line += 1;
                self.column = 1;
            }
            Some(b'\r') => {}
            Some(_) => {
                self.column += 1;
            }
            None => {}
        }
        if self.pos < self.input.len() {
            self.pos += 1;
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.current(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.advance();
        }
    }

    /// A span of `len` bytes starting at the current position.
    fn here(&self, len: usize) -> Span {
        Span::new(self.pos, self.pos + len, self.line, self.column)
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        let c = match self.current() {
            Some(c) => c,
            None => return Ok(Token::new(TokenKind::Eof, self.here(0))),
        };

        if !c.is_ascii() {
            return Err(LexError::new("unexpected non-ASCII character", self.here(1)));
        }

        if c.is_ascii_alphabetic() || c == b'_' {
            return Ok(self.read_identifier());
        }
        if c.is_ascii_digit() {
            return self.read_number();
        }
        if c == b'\'' {
            return self.read_char_literal();
        }
        if c == b'#' {
            return Ok(self.read_comment());
        }

        let start = self.here(1);
        let single = match c {
            b'{' => Some(TokenKind::BodyStart),
            b'}' => Some(TokenKind::BodyEnd),
            b'(' => Some(TokenKind::ParenStart),
            b')' => Some(TokenKind::ParenEnd),
            b',' => Some(TokenKind::Comma),
            b';' => Some(TokenKind::EndOfExpression),
            _ => None,
        };
        if let Some(kind) = single {
            self.advance();
            return Ok(Token::new(kind, start));
        }

        self.read_operator(c)
    }

    fn read_identifier(&mut self) -> Token {
        let start = self.here(0);
        let begin = self.pos;
        while matches!(self.current(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
            self.advance();
        }
        let text = &self.input[begin..self.pos];
        let span = Span::new(begin, self.pos, start.line, start.column);

        if let Some(ty) = types::Type::from_token(text) {
            return Token::new(TokenKind::TypeName(ty), span);
        }

        let kind = match text {
            "function" => TokenKind::Function,
            "extern" => TokenKind::Extern,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "for" => TokenKind::For,
            "while" => TokenKind::While,
            "return" => TokenKind::Return,
            "continue" => TokenKind::Continue,
            "break" => TokenKind::Break,
            "switch" => TokenKind::Switch,
            "case" => TokenKind::Case,
            "default" => TokenKind::Default,
            "module" => TokenKind::Module,
            "using" => TokenKind::Using,
            "true" | "false" => TokenKind::Literal {
                ty: types::Type::Bool,
                text: text.to_string(),
            },
            _ => TokenKind::Identifier(text.to_string()),
        };

        Token::new(kind, span)
    }

    fn read_number(&mut self) -> Result<Token, LexError> {
        let start = self.here(0);
        let begin = self.pos;

        while matches!(self.current(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }

        // fraction part, only when a digit follows the dot
        if self.current() == Some(b'.') && matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
            while matches!(self.current(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }

        // type suffix: i/u/f plus an optional width
        if matches!(self.current(), Some(b'i' | b'u' | b'f')) {
            self.advance();
            while matches!(self.current(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }

        let text = &self.input[begin..self.pos];
        let span = Span::new(begin, self.pos, start.line, start.column);

        match types::check_literal_token(text) {
            Some(ty) => Ok(Token::new(
                TokenKind::Literal {
                    ty,
                    text: text.to_string(),
                },
                span,
            )),
            None => Err(LexError::new(
                format!("malformed numeric literal '{}'", text),
                span,
            )),
        }
    }

    fn read_char_literal(&mut self) -> Result<Token, LexError> {
        let start = self.here(0);
        let begin = self.pos;
        self.advance(); // opening quote

        match self.current() {
            Some(b'\\') => {
                self.advance();
                if self.current().is_none() {
                    return Err(self.unterminated_char(begin, start));
                }
                self.advance();
            }
            Some(b'\'') | None => {
                return Err(self.unterminated_char(begin, start));
            }
            Some(_) => {
                self.advance();
            }
        }

        if self.current() != Some(b'\'') {
            return Err(self.unterminated_char(begin, start));
        }
        self.advance(); // closing quote

        let text = &self.input[begin..self.pos];
        let span = Span::new(begin, self.pos, start.line, start.column);
        match types::check_literal_token(text) {
            Some(ty) => Ok(Token::new(
                TokenKind::Literal {
                    ty,
                    text: text.to_string(),
                },
                span,
            )),
            None => Err(LexError::new(
                format!("malformed character literal '{}'", text),
                span,
            )),
        }
    }

    fn unterminated_char(&self, begin: usize, start: Span) -> LexError {
        LexError::new(
            "unterminated character literal",
            Span::new(begin, self.pos, start.line, start.column),
        )
    }

    fn read_comment(&mut self) -> Token {
        let start = self.here(0);
        let begin = self.pos;
        while !matches!(self.current(), Some(b'\n') | None) {
            self.advance();
        }
        Token::new(
            TokenKind::Comment,
            Span::new(begin, self.pos, start.line, start.column),
        )
    }

    fn read_operator(&mut self, c: u8) -> Result<Token, LexError> {
        let start = self.here(0);
        let begin = self.pos;

        // try the two-character form first
        if let Some(next) = self.peek() {
            let pair = [c, next];
            if let Ok(pair) = std::str::from_utf8(&pair) {
                if let Some(op) = BinaryOp::from_token(pair) {
                    self.advance();
                    self.advance();
                    return Ok(Token::new(
                        TokenKind::BinOp(op),
                        Span::new(begin, self.pos, start.line, start.column),
                    ));
                }
            }
        }

        let single = &self.input[self.pos..self.pos + 1];
        if let Some(op) = BinaryOp::from_token(single) {
            self.advance();
            return Ok(Token::new(
                TokenKind::BinOp(op),
                Span::new(begin, self.pos, start.line, start.column),
            ));
        }

        let unary = match c {
            b'!' => Some(UnaryOp::BooleanNot),
            b'~' => Some(UnaryOp::BitwiseNot),
            _ => None,
        };
        if let Some(op) = unary {
            self.advance();
            return Ok(Token::new(
                TokenKind::UnOp(op),
                Span::new(begin, self.pos, start.line, start.column),
            ));
        }

        Err(LexError::new(
            format!("unexpected character '{}'", c as char),
            self.here(1),
        ))
    }
}
