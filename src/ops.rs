//! The Ash operator model.
//!
//! Defines the closed sets of binary and unary operators, the precedence
//! table consumed by the parser, and the classification predicates used by
//! the type checker and the lowering pass.

use crate::types::Type;

/// A binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Assignment,
    AssignmentAddition,
    AssignmentSubtraction,
    AssignmentMultiplication,
    AssignmentDivision,
    AssignmentModulo,
    AssignmentBitwiseAnd,
    AssignmentBitwiseOr,
    AssignmentBitwiseXor,
    Addition,
    Subtraction,
    Multiplication,
    Division,
    Modulo,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    EqualTo,
    NotEqualTo,
    BooleanAnd,
    BooleanOr,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    BitwiseShiftLeft,
    BitwiseShiftRight,
    /// The `::` operator qualifying a call with a module path.
    ModuleScope,
}

/// A unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    BooleanNot,
    BitwiseNot,
}

impl BinaryOp {
    /// Recognizes a binary operator token. Two-character operators are
    /// matched by the lexer before one-character ones.
    pub fn from_token(token: &str) -> Option<BinaryOp> {
        Some(match token {
            "=" => BinaryOp::Assignment,
            "+=" => BinaryOp::AssignmentAddition,
            "-=" => BinaryOp::AssignmentSubtraction,
            "*=" => BinaryOp::AssignmentMultiplication,
            "/=" => BinaryOp::AssignmentDivision,
            "%=" => BinaryOp::AssignmentModulo,
            "&=" => BinaryOp::AssignmentBitwiseAnd,
            "|=" => BinaryOp::AssignmentBitwiseOr,
            "^=" => BinaryOp::AssignmentBitwiseXor,
            "+" => BinaryOp::Addition,
            "-" => BinaryOp::Subtraction,
            "*" => BinaryOp::Multiplication,
            "/" => BinaryOp::Division,
            "%" => BinaryOp::Modulo,
            "<" => BinaryOp::LessThan,
            "<=" => BinaryOp::LessThanEqual,
            ">" => BinaryOp::GreaterThan,
            ">=" => BinaryOp::GreaterThanEqual,
            "==" => BinaryOp::EqualTo,
            "!=" => BinaryOp::NotEqualTo,
            "&&" => BinaryOp::BooleanAnd,
            "||" => BinaryOp::BooleanOr,
            "&" => BinaryOp::BitwiseAnd,
            "|" => BinaryOp::BitwiseOr,
            "^" => BinaryOp::BitwiseXor,
            "<<" => BinaryOp::BitwiseShiftLeft,
            ">>" => BinaryOp::BitwiseShiftRight,
            "::" => BinaryOp::ModuleScope,
            _ => return None,
        })
    }

    /// The parser precedence. Higher binds tighter; assignment is the only
    /// right-associative level.
    pub fn precedence(self) -> i32 {
        match self {
            BinaryOp::Assignment
            | BinaryOp::AssignmentAddition
            | BinaryOp::AssignmentSubtraction
            | BinaryOp::AssignmentMultiplication
            | BinaryOp::AssignmentDivision
            | BinaryOp::AssignmentModulo
            | BinaryOp::AssignmentBitwiseAnd
            | BinaryOp::AssignmentBitwiseOr
            | BinaryOp::AssignmentBitwiseXor => 2,
            BinaryOp::BooleanOr => 4,
            BinaryOp::BooleanAnd => 5,
            BinaryOp::BitwiseOr => 6,
            BinaryOp::BitwiseXor => 7,
            BinaryOp::BitwiseAnd => 8,
            BinaryOp::LessThan
            | BinaryOp::LessThanEqual
            | BinaryOp::GreaterThan
            | BinaryOp::GreaterThanEqual
            | BinaryOp::EqualTo
            | BinaryOp::NotEqualTo => 10,
            BinaryOp::BitwiseShiftLeft | BinaryOp::BitwiseShiftRight => 15,
            BinaryOp::Addition | BinaryOp::Subtraction => 20,
            BinaryOp::Multiplication | BinaryOp::Division | BinaryOp::Modulo => 40,
            BinaryOp::ModuleScope => 60,
        }
    }

    /// Returns true for the ordering comparisons and (in)equality.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::LessThan
                | BinaryOp::LessThanEqual
                | BinaryOp::GreaterThan
                | BinaryOp::GreaterThanEqual
                | BinaryOp::EqualTo
                | BinaryOp::NotEqualTo
        )
    }

    /// Returns true for `==` and `!=`.
    pub fn is_equality(self) -> bool {
        matches!(self, BinaryOp::EqualTo | BinaryOp::NotEqualTo)
    }

    /// Returns true for `&&` and `||`.
    pub fn is_boolean(self) -> bool {
        matches!(self, BinaryOp::BooleanAnd | BinaryOp::BooleanOr)
    }

    /// Returns true for `& | ^ << >>`.
    pub fn is_bitwise(self) -> bool {
        matches!(
            self,
            BinaryOp::BitwiseAnd
                | BinaryOp::BitwiseOr
                | BinaryOp::BitwiseXor
                | BinaryOp::BitwiseShiftLeft
                | BinaryOp::BitwiseShiftRight
        )
    }

    /// Returns true for `=` and the compound assignments.
    pub fn is_assignment(self) -> bool {
        self.precedence() == 2
    }

    /// Returns true for the compound assignments only.
    pub fn is_compound_assignment(self) -> bool {
        self.is_assignment() && self != BinaryOp::Assignment
    }

    /// The underlying operator of a compound assignment: `+=` yields `+`.
    pub fn compound_base(self) -> Option<BinaryOp> {
        Some(match self {
            BinaryOp::AssignmentAddition => BinaryOp::Addition,
            BinaryOp::AssignmentSubtraction => BinaryOp::Subtraction,
            BinaryOp::AssignmentMultiplication => BinaryOp::Multiplication,
            BinaryOp::AssignmentDivision => BinaryOp::Division,
            BinaryOp::AssignmentModulo => BinaryOp::Modulo,
            BinaryOp::AssignmentBitwiseAnd => BinaryOp::BitwiseAnd,
            BinaryOp::AssignmentBitwiseOr => BinaryOp::BitwiseOr,
            BinaryOp::AssignmentBitwiseXor => BinaryOp::BitwiseXor,
            _ => return None,
        })
    }

    /// Checks whether the operator supports operands of the given type.
    pub fn supports_type(self, ty: Type) -> bool {
        if self == BinaryOp::ModuleScope {
            return false;
        }
        if let Some(base) = self.compound_base() {
            return base.supports_type(ty);
        }
        match ty {
            Type::Int { .. } => !self.is_boolean(),
            Type::Float { .. } => {
                !self.is_boolean() && !self.is_bitwise() && self != BinaryOp::Modulo
            }
            Type::Bool => self.is_comparison() || self.is_boolean() || self == BinaryOp::Assignment,
            Type::Char => self.is_comparison() || self == BinaryOp::Assignment,
            Type::Void => false,
        }
    }
}

impl UnaryOp {
    /// The operator symbol for rendering.
    fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::BooleanNot => "!",
            UnaryOp::BitwiseNot => "~",
        }
    }

    /// Checks whether the operator supports an operand of the given type.
    pub fn supports_type(self, ty: Type) -> bool {
        match self {
            UnaryOp::Plus | UnaryOp::Minus => {
                matches!(ty, Type::Int { .. } | Type::Float { .. })
            }
            UnaryOp::BooleanNot => ty == Type::Bool,
            UnaryOp::BitwiseNot => matches!(ty, Type::Int { .. }),
        }
    }
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (name, symbol) = match self {
            BinaryOp::Assignment => ("Assignment", "="),
            BinaryOp::AssignmentAddition => ("AssignmentAddition", "+="),
            BinaryOp::AssignmentSubtraction => ("AssignmentSubtraction", "-="),
            BinaryOp::AssignmentMultiplication => ("AssignmentMultiplication", "*="),
            BinaryOp::AssignmentDivision => ("AssignmentDivision", "/="),
            BinaryOp::AssignmentModulo => ("AssignmentModulo", "%="),
            BinaryOp::AssignmentBitwiseAnd => ("AssignmentBitwiseAnd", "&="),
            BinaryOp::AssignmentBitwiseOr => ("AssignmentBitwiseOr", "|="),
            BinaryOp::AssignmentBitwiseXor => ("AssignmentBitwiseXor", "^="),
            BinaryOp::Addition => ("Addition", "+"),
            BinaryOp::Subtraction => ("Subtraction", "-"),
            BinaryOp::Multiplication => ("Multiplication", "*"),
            BinaryOp::Division => ("Division", "/"),
            BinaryOp::Modulo => ("Modulo", "%"),
            BinaryOp::LessThan => ("LessThan", "<"),
            BinaryOp::LessThanEqual => ("LessThanEqual", "<="),
            BinaryOp::GreaterThan => ("GreaterThan", ">"),
            BinaryOp::GreaterThanEqual => ("GreaterThanEqual", ">="),
            BinaryOp::EqualTo => ("EqualTo", "=="),
            BinaryOp::NotEqualTo => ("NotEqualTo", "!="),
            BinaryOp::BooleanAnd => ("BooleanAnd", "&&"),
            BinaryOp::BooleanOr => ("BooleanOr", "||"),
            BinaryOp::BitwiseAnd => ("BitwiseAnd", "&"),
            BinaryOp::BitwiseOr => ("BitwiseOr", "|"),
            BinaryOp::BitwiseXor => ("BitwiseXor", "^"),
            BinaryOp::BitwiseShiftLeft => ("BitwiseShiftLeft", "<<"),
            BinaryOp::BitwiseShiftRight => ("BitwiseShiftRight", ">>"),
            BinaryOp::ModuleScope => ("ModuleScope", "::"),
        };
        write!(f, "{} ({})", name, symbol)
    }
}

impl std::fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            UnaryOp::Plus => "Plus",
            UnaryOp::Minus => "Minus",
            UnaryOp::BooleanNot => "BooleanNot",
            UnaryOp::BitwiseNot => "BitwiseNot",
        };
        write!(f, "{} ({})", name, self.symbol())
    }
}
