//! The Ash type model.
//!
//! Ash has a closed set of primitive types: sized integers (signed and
//! unsigned), floats, `bool`, `char`, and `void`. This module defines the
//! [`Type`] representation, type-token recognition, literal-token
//! recognition, the integer range check, and the cast legality table.
//!
//! # See Also
//!
//! * [`literal`] - Parsed literal payloads
//! * [`crate::lexer`] - Uses the recognizers while tokenizing
//! * [`crate::semantic`] - Uses the cast table and range check

mod literal;

pub use literal::LiteralValue;

/// A primitive Ash type.
///
/// Equality is structural: two integer types are equal only if both the
/// bit width and the signedness match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    /// A sized integer, 8/16/32/64 bits, signed or unsigned.
    Int { bits: u8, signed: bool },
    /// A 32- or 64-bit IEEE float.
    Float { bits: u8 },
    /// The one-bit boolean.
    Bool,
    /// An 8-bit signed character.
    Char,
    /// The empty type of statements and value-less functions.
    Void,
}

impl Type {
    /// The default integer type, `i32`.
    pub fn default_int() -> Type {
        Type::Int {
            bits: 32,
            signed: true,
        }
    }

    /// The default float type, `f32`.
    pub fn default_float() -> Type {
        Type::Float { bits: 32 }
    }

    /// Recognizes a type token: `int`, `float`, `bool`, `char`, `void`,
    /// `[iu](8|16|32|64)`, or `f(32|64)`.
    pub fn from_token(token: &str) -> Option<Type> {
        match token {
            "int" => return Some(Type::default_int()),
            "float" => return Some(Type::default_float()),
            "bool" => return Some(Type::Bool),
            "char" => return Some(Type::Char),
            "void" => return Some(Type::Void),
            _ => {}
        }

        let (head, digits) = token.split_at(1);
        let bits: u8 = digits.parse().ok()?;
        match head {
            "i" | "u" if matches!(bits, 8 | 16 | 32 | 64) => Some(Type::Int {
                bits,
                signed: head == "i",
            }),
            "f" if matches!(bits, 32 | 64) => Some(Type::Float { bits }),
            _ => None,
        }
    }

    /// Returns the bit width of this type.
    pub fn bits(self) -> u8 {
        match self {
            Type::Int { bits, .. } | Type::Float { bits } => bits,
            Type::Bool => 1,
            Type::Char => 8,
            Type::Void => 0,
        }
    }

    /// Returns true for signed integer-class types. `char` is signed,
    /// `bool` is not.
    pub fn is_signed(self) -> bool {
        match self {
            Type::Int { signed, .. } => signed,
            Type::Float { .. } | Type::Char => true,
            Type::Bool | Type::Void => false,
        }
    }

    /// Returns true for `Int`, `Float`, `Bool`, and `Char`.
    pub fn is_numeric(self) -> bool {
        !matches!(self, Type::Void)
    }

    /// Returns true for the integer-class types lowered to LLVM integers:
    /// `Int`, `Bool`, and `Char`.
    pub fn is_int_class(self) -> bool {
        matches!(self, Type::Int { .. } | Type::Bool | Type::Char)
    }
}

impl std::fmt::Display for Type {
    /// The canonical type name, as used by the mangler: `i32`, `u8`,
    /// `f64`, `Bool`, `Char`, `Void`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Int { bits, signed: true } => write!(f, "i{}", bits),
            Type::Int {
                bits,
                signed: false,
            } => write!(f, "u{}", bits),
            Type::Float { bits } => write!(f, "f{}", bits),
            Type::Bool => write!(f, "Bool"),
            Type::Char => write!(f, "Char"),
            Type::Void => write!(f, "Void"),
        }
    }
}

/// Recognizes a literal token and returns its type.
///
/// Grammars:
///
/// - integer: `[0-9]+([iu](8|16|32|64)?)?`
/// - float: `[0-9]+\.[0-9]+(f(32|64)?)?`
/// - bool: `true | false`
/// - char: `'([^']|\\.)'`
///
/// Numeric literals without a suffix get the default type of their kind.
pub fn check_literal_token(token: &str) -> Option<Type> {
    if token == "true" || token == "false" {
        return Some(Type::Bool);
    }

    if token.starts_with('\'') {
        return check_char_token(token);
    }

    let bytes = token.as_bytes();
    if bytes.is_empty() || !bytes[0].is_ascii_digit() {
        return None;
    }

    let mut i = 0;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }

    if i < bytes.len() && bytes[i] == b'.' {
        // float: require fraction digits, then an optional f32/f64 suffix
        i += 1;
        let fraction_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == fraction_start {
            return None;
        }
        return match &token[i..] {
            "" | "f" => Some(Type::default_float()),
            suffix => match Type::from_token(suffix) {
                Some(ty @ Type::Float { .. }) => Some(ty),
                _ => None,
            },
        };
    }

    // integer: optional [iu] suffix with optional width
    match &token[i..] {
        "" => Some(Type::default_int()),
        "i" => Some(Type::default_int()),
        "u" => Some(Type::Int {
            bits: 32,
            signed: false,
        }),
        suffix => match Type::from_token(suffix) {
            Some(ty @ Type::Int { .. }) => Some(ty),
            _ => None,
        },
    }
}

fn check_char_token(token: &str) -> Option<Type> {
    let inner = token.strip_prefix('\'')?.strip_suffix('\'')?;
    let mut chars = inner.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some(c), None, _) if c != '\'' && c != '\\' => Some(Type::Char),
        (Some('\\'), Some(_), None) => Some(Type::Char),
        _ => None,
    }
}

/// Maximum decimal magnitude accepted for each integer width.
///
/// Signed widths accept the magnitude of their most negative value, so
/// `128i8` is accepted (it denotes `-128` after negation).
fn int_max_magnitude(bits: u8, signed: bool) -> &'static str {
    match (bits, signed) {
        (8, true) => "128",
        (8, false) => "255",
        (16, true) => "32768",
        (16, false) => "65535",
        (32, true) => "2147483648",
        (32, false) => "4294967295",
        (64, true) => "9223372036854775808",
        (64, false) => "18446744073709551615",
        _ => "0",
    }
}

/// Range-checks a literal token against its declared type.
///
/// For integers the check compares the decimal digit string (leading zeros
/// stripped) against the maximum magnitude for the width and signedness.
/// Floats, bools, and chars always pass.
pub fn check_range(token: &str, ty: Type) -> bool {
    let (bits, signed) = match ty {
        Type::Int { bits, signed } => (bits, signed),
        Type::Float { .. } | Type::Bool | Type::Char => return true,
        Type::Void => return false,
    };

    let digits: &str = {
        let end = token
            .bytes()
            .position(|b| !b.is_ascii_digit())
            .unwrap_or(token.len());
        &token[..end]
    };
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        // the literal was all zeros
        return true;
    }

    let max = int_max_magnitude(bits, signed);
    if digits.len() != max.len() {
        return digits.len() < max.len();
    }
    digits <= max
}

/// The cast legality table.
///
/// - Int → Int: allowed unless the cast changes size *and* signedness at once.
/// - Int ↔ Float, Int ↔ Bool, Int ↔ Char: allowed.
/// - Float → Int/Char/Float: allowed; Float → Bool: forbidden.
/// - Bool → numeric, Char → numeric: allowed.
/// - Everything involving Void: forbidden.
pub fn is_cast_valid(from: Type, target: Type) -> bool {
    match from {
        Type::Int { bits, signed } => match target {
            Type::Int {
                bits: to_bits,
                signed: to_signed,
            } => {
                let sign_diff = signed != to_signed;
                let size_diff = bits != to_bits;
                // only a size cast or a sign cast, never both at once
                !(sign_diff && size_diff)
            }
            Type::Float { .. } | Type::Bool | Type::Char => true,
            Type::Void => false,
        },
        Type::Float { .. } => match target {
            Type::Bool => false,
            other => other.is_numeric(),
        },
        Type::Bool | Type::Char => target.is_numeric(),
        Type::Void => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_token_named_types() {
        assert_eq!(Type::from_token("int"), Some(Type::default_int()));
        assert_eq!(Type::from_token("float"), Some(Type::default_float()));
        assert_eq!(Type::from_token("bool"), Some(Type::Bool));
        assert_eq!(Type::from_token("char"), Some(Type::Char));
        assert_eq!(Type::from_token("void"), Some(Type::Void));
    }

    #[test]
    fn test_from_token_sized_types() {
        assert_eq!(
            Type::from_token("u16"),
            Some(Type::Int {
                bits: 16,
                signed: false
            })
        );
        assert_eq!(
            Type::from_token("i64"),
            Some(Type::Int {
                bits: 64,
                signed: true
            })
        );
        assert_eq!(Type::from_token("f64"), Some(Type::Float { bits: 64 }));
    }

    #[test]
    fn test_from_token_rejects_bad_widths() {
        assert_eq!(Type::from_token("i7"), None);
        assert_eq!(Type::from_token("u128"), None);
        assert_eq!(Type::from_token("f16"), None);
        assert_eq!(Type::from_token("x32"), None);
    }

    #[test]
    fn test_display_canonical_names() {
        assert_eq!(Type::default_int().to_string(), "i32");
        assert_eq!(
            Type::Int {
                bits: 8,
                signed: false
            }
            .to_string(),
            "u8"
        );
        assert_eq!(Type::Float { bits: 64 }.to_string(), "f64");
        assert_eq!(Type::Bool.to_string(), "Bool");
        assert_eq!(Type::Char.to_string(), "Char");
        assert_eq!(Type::Void.to_string(), "Void");
    }

    #[test]
    fn test_check_literal_token_integers() {
        assert_eq!(check_literal_token("0"), Some(Type::default_int()));
        assert_eq!(check_literal_token("42"), Some(Type::default_int()));
        assert_eq!(
            check_literal_token("42u8"),
            Some(Type::Int {
                bits: 8,
                signed: false
            })
        );
        assert_eq!(
            check_literal_token("1i64"),
            Some(Type::Int {
                bits: 64,
                signed: true
            })
        );
    }

    #[test]
    fn test_check_literal_token_floats() {
        assert_eq!(check_literal_token("1.5"), Some(Type::default_float()));
        assert_eq!(check_literal_token("1.5f"), Some(Type::default_float()));
        assert_eq!(check_literal_token("0.25f64"), Some(Type::Float { bits: 64 }));
        assert_eq!(check_literal_token("1."), None);
        assert_eq!(check_literal_token(".5"), None);
    }

    #[test]
    fn test_check_literal_token_bools_and_chars() {
        assert_eq!(check_literal_token("true"), Some(Type::Bool));
        assert_eq!(check_literal_token("false"), Some(Type::Bool));
        assert_eq!(check_literal_token("'a'"), Some(Type::Char));
        assert_eq!(check_literal_token("'\\n'"), Some(Type::Char));
        assert_eq!(check_literal_token("''"), None);
        assert_eq!(check_literal_token("'ab'"), None);
    }

    #[test]
    fn test_check_range_signed() {
        let i8 = Type::Int {
            bits: 8,
            signed: true,
        };
        assert!(check_range("127", i8));
        assert!(check_range("128", i8));
        assert!(!check_range("129", i8));
        assert!(check_range("0000127", i8));
    }

    #[test]
    fn test_check_range_unsigned() {
        let u8 = Type::Int {
            bits: 8,
            signed: false,
        };
        assert!(check_range("255", u8));
        assert!(!check_range("256", u8));
        let u64 = Type::Int {
            bits: 64,
            signed: false,
        };
        assert!(check_range("18446744073709551615", u64));
        assert!(!check_range("18446744073709551616", u64));
    }

    #[test]
    fn test_cast_int_to_int() {
        let i32 = Type::default_int();
        let u32 = Type::Int {
            bits: 32,
            signed: false,
        };
        let u16 = Type::Int {
            bits: 16,
            signed: false,
        };
        let i16 = Type::Int {
            bits: 16,
            signed: true,
        };
        // sign-only and size-only casts are fine
        assert!(is_cast_valid(i32, u32));
        assert!(is_cast_valid(i32, i16));
        // both at once is not
        assert!(!is_cast_valid(i32, u16));
    }

    #[test]
    fn test_cast_float_rules() {
        let f32 = Type::default_float();
        assert!(is_cast_valid(f32, Type::default_int()));
        assert!(is_cast_valid(f32, Type::Char));
        assert!(is_cast_valid(f32, Type::Float { bits: 64 }));
        assert!(!is_cast_valid(f32, Type::Bool));
    }

    #[test]
    fn test_cast_bool_char_rules() {
        assert!(is_cast_valid(Type::Bool, Type::default_int()));
        assert!(is_cast_valid(Type::Bool, Type::default_float()));
        assert!(is_cast_valid(Type::Char, Type::default_int()));
        assert!(is_cast_valid(Type::default_int(), Type::Bool));
        assert!(is_cast_valid(Type::default_int(), Type::Char));
    }

    #[test]
    fn test_cast_void_rules() {
        assert!(!is_cast_valid(Type::Void, Type::default_int()));
        assert!(!is_cast_valid(Type::default_int(), Type::Void));
    }
}
