//! Scalar JSON values and their coercion rules.

use super::JsonError;
use crate::primitives::{FLOAT_CHARS, INT_CHARS};
use std::fmt;

/// True if `s` is non-empty and made only of integer characters.
#[must_use]
pub fn is_int_text(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| INT_CHARS.contains(c))
}

/// True if `s` is non-empty and made only of float characters.
#[must_use]
pub fn is_float_text(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| FLOAT_CHARS.contains(c))
}

/// A scalar JSON value.
///
/// Bool, int and float are numeric equivalents of each other (`true == 1`).
/// A string coerces to a number only if it is written in the restricted
/// numeric alphabet.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum JsonValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl JsonValue {
    /// Name of the variant, for error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    fn wrong_type(&self, expected: &'static str) -> JsonError {
        JsonError::WrongType {
            expected,
            found: self.type_name(),
        }
    }

    /// Only a bool is a bool.
    pub fn as_bool(&self) -> Result<bool, JsonError> {
        match self {
            Self::Bool(b) => Ok(*b),
            _ => Err(self.wrong_type("bool")),
        }
    }

    /// Integer view; floats are rounded to the nearest integer.
    pub fn as_int(&self) -> Result<i64, JsonError> {
        match self {
            Self::Bool(b) => Ok(i64::from(*b)),
            Self::Int(v) => Ok(*v),
            Self::Float(v) => Ok(v.round() as i64),
            Self::String(s) if is_int_text(s) => {
                s.parse::<i64>().map_err(|_| self.wrong_type("int"))
            }
            _ => Err(self.wrong_type("int")),
        }
    }

    /// Float view.
    pub fn as_float(&self) -> Result<f64, JsonError> {
        match self {
            Self::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Self::Int(v) => Ok(*v as f64),
            Self::Float(v) => Ok(*v),
            Self::String(s) if is_float_text(s) => {
                s.parse::<f64>().map_err(|_| self.wrong_type("float"))
            }
            _ => Err(self.wrong_type("float")),
        }
    }

    /// String view; numbers and bools are formatted, null is an error.
    pub fn as_string(&self) -> Result<String, JsonError> {
        match self {
            Self::Null => Err(self.wrong_type("string")),
            Self::Bool(b) => Ok(b.to_string()),
            Self::Int(v) => Ok(v.to_string()),
            Self::Float(v) => Ok(v.to_string()),
            Self::String(s) => Ok(s.clone()),
        }
    }
}

impl fmt::Display for JsonValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(v) => write!(f, "{v}"),
            // Keep a decimal point so the printed value parses back as a float.
            Self::Float(v) if !v.is_finite() => f.write_str("null"),
            Self::Float(v) if v.fract() == 0.0 => write!(f, "{v:.1}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(s) => write!(f, "\"{s}\""),
        }
    }
}
