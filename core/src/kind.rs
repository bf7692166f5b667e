//! Value kinds understood by the flag registry and the positional binder.
//!
//! The set is closed: booleans, strings, signed and unsigned integers of
//! every standard width, floating point, and `Vec` of each of those. A
//! destination type takes part in binding by implementing [`Bindable`],
//! which this module does for exactly that set.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Primitive element kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    Bool,
    String,
    I8,
    I16,
    I32,
    I64,
    Isize,
    U8,
    U16,
    U32,
    U64,
    Usize,
    F32,
    F64,
}

impl ScalarKind {
    /// Short type name used in help text and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::String => "string",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::Isize => "isize",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::Usize => "usize",
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind tag of a bound destination: a single scalar or a list of scalars.
///
/// # Examples
///
/// ```
/// use cmdtree_core::{Kind, ScalarKind};
///
/// let kind = Kind::List(ScalarKind::U16);
/// assert!(kind.is_list());
/// assert!(kind.takes_value());
/// assert_eq!(kind.to_string(), "[u16]");
/// assert!(!Kind::Scalar(ScalarKind::Bool).takes_value());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "shape", content = "element", rename_all = "lowercase")]
pub enum Kind {
    Scalar(ScalarKind),
    List(ScalarKind),
}

impl Kind {
    /// Element kind, for scalars the kind itself.
    pub fn element(self) -> ScalarKind {
        match self {
            Self::Scalar(kind) | Self::List(kind) => kind,
        }
    }

    pub fn is_list(self) -> bool {
        matches!(self, Self::List(_))
    }

    /// Whether a flag of this kind consumes a value token.
    ///
    /// Boolean flags (and boolean lists) are set by bare presence.
    pub fn takes_value(self) -> bool {
        self.element() != ScalarKind::Bool
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(kind) => write!(f, "{kind}"),
            Self::List(kind) => write!(f, "[{kind}]"),
        }
    }
}

/// A primitive that can be parsed from one command-line token.
pub trait Scalar: Sized + Clone + 'static {
    const KIND: ScalarKind;

    /// Converts a token, rejecting anything that would not round-trip
    /// (out-of-range integers are errors, never truncated).
    fn parse_token(token: &str) -> Result<Self, ValueError>;

    fn render(&self) -> String;

    fn is_zero(&self) -> bool;

    /// Value written when a positional slot bound to this kind is merely
    /// present. Only booleans have one.
    fn presence() -> Option<Self> {
        None
    }
}

impl Scalar for bool {
    const KIND: ScalarKind = ScalarKind::Bool;

    fn parse_token(token: &str) -> Result<Self, ValueError> {
        match token {
            "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
            "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
            _ => Err(ValueError::new(Self::KIND, token, "expected a boolean")),
        }
    }

    fn render(&self) -> String {
        self.to_string()
    }

    fn is_zero(&self) -> bool {
        !*self
    }

    fn presence() -> Option<Self> {
        Some(true)
    }
}

impl Scalar for String {
    const KIND: ScalarKind = ScalarKind::String;

    fn parse_token(token: &str) -> Result<Self, ValueError> {
        Ok(token.to_string())
    }

    fn render(&self) -> String {
        format!("{self:?}")
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

macro_rules! numeric_scalar {
    ($($ty:ty => $kind:ident),* $(,)?) => {$(
        impl Scalar for $ty {
            const KIND: ScalarKind = ScalarKind::$kind;

            fn parse_token(token: &str) -> Result<Self, ValueError> {
                token
                    .parse::<$ty>()
                    .map_err(|err| ValueError::new(Self::KIND, token, err))
            }

            fn render(&self) -> String {
                self.to_string()
            }

            fn is_zero(&self) -> bool {
                *self == <$ty>::default()
            }
        }
    )*};
}

numeric_scalar! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    isize => Isize,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    usize => Usize,
}

/// Whether `token` names a non-finite float outright, as opposed to a
/// finite literal too large for the kind.
fn spells_non_finite(token: &str) -> bool {
    let body = token.strip_prefix(['+', '-']).unwrap_or(token);
    ["inf", "infinity", "nan"]
        .iter()
        .any(|word| body.eq_ignore_ascii_case(word))
}

macro_rules! float_scalar {
    ($($ty:ty => $kind:ident),* $(,)?) => {$(
        impl Scalar for $ty {
            const KIND: ScalarKind = ScalarKind::$kind;

            fn parse_token(token: &str) -> Result<Self, ValueError> {
                let value = token
                    .parse::<$ty>()
                    .map_err(|err| ValueError::new(Self::KIND, token, err))?;
                if !value.is_finite() && !spells_non_finite(token) {
                    return Err(ValueError::new(Self::KIND, token, "value out of range"));
                }
                Ok(value)
            }

            fn render(&self) -> String {
                self.to_string()
            }

            fn is_zero(&self) -> bool {
                *self == 0.0
            }
        }
    )*};
}

float_scalar! {
    f32 => F32,
    f64 => F64,
}

/// A destination type the registry and binder can write into.
///
/// Scalars are replaced wholesale. Lists follow per-source rules: each flag
/// occurrence appends one element; a positional token replaces the list,
/// with the token's pieces when a separator is set or with the single
/// element otherwise; a default literal always replaces.
pub trait Bindable: 'static {
    fn kind() -> Kind;

    fn set_flag(&mut self, token: &str) -> Result<(), ValueError>;

    fn set_positional(&mut self, token: &str, separator: Option<&str>) -> Result<(), ValueError>;

    fn set_default(&mut self, literal: &str, separator: Option<&str>) -> Result<(), ValueError>;

    fn render(&self) -> String;

    fn is_zero(&self) -> bool;
}

fn parse_pieces<T: Scalar>(literal: &str, separator: Option<&str>) -> Result<Vec<T>, ValueError> {
    match separator {
        Some(sep) if !sep.is_empty() => literal.split(sep).map(T::parse_token).collect(),
        _ => Ok(vec![T::parse_token(literal)?]),
    }
}

macro_rules! bindable {
    ($($ty:ty),* $(,)?) => {$(
        impl Bindable for $ty {
            fn kind() -> Kind {
                Kind::Scalar(<$ty as Scalar>::KIND)
            }

            fn set_flag(&mut self, token: &str) -> Result<(), ValueError> {
                *self = <$ty as Scalar>::parse_token(token)?;
                Ok(())
            }

            fn set_positional(&mut self, token: &str, _separator: Option<&str>) -> Result<(), ValueError> {
                *self = match <$ty as Scalar>::presence() {
                    Some(value) => value,
                    None => <$ty as Scalar>::parse_token(token)?,
                };
                Ok(())
            }

            fn set_default(&mut self, literal: &str, _separator: Option<&str>) -> Result<(), ValueError> {
                self.set_flag(literal)
            }

            fn render(&self) -> String {
                Scalar::render(self)
            }

            fn is_zero(&self) -> bool {
                Scalar::is_zero(self)
            }
        }

        impl Bindable for Vec<$ty> {
            fn kind() -> Kind {
                Kind::List(<$ty as Scalar>::KIND)
            }

            fn set_flag(&mut self, token: &str) -> Result<(), ValueError> {
                self.push(<$ty as Scalar>::parse_token(token)?);
                Ok(())
            }

            fn set_positional(&mut self, token: &str, separator: Option<&str>) -> Result<(), ValueError> {
                *self = parse_pieces::<$ty>(token, separator)?;
                Ok(())
            }

            fn set_default(&mut self, literal: &str, separator: Option<&str>) -> Result<(), ValueError> {
                *self = parse_pieces::<$ty>(literal, separator)?;
                Ok(())
            }

            fn render(&self) -> String {
                let items: Vec<String> = self.iter().map(Scalar::render).collect();
                format!("[{}]", items.join(" "))
            }

            fn is_zero(&self) -> bool {
                self.is_empty()
            }
        }
    )*};
}

bindable!(
    bool, String, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64
);
