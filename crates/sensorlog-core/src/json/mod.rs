//! # JSON Document Module
//!
//! A small, hand-built JSON document model used by configuration loading and
//! by the JSON data-source adapter.
//!
//! - `JsonValue`: typed scalar (null, bool, int, float, string)
//! - `JsonNode`: named or indexed tree node; either a scalar leaf or a
//!   structural node with children
//! - `parse`: recursive-descent parser with explicit bracket matching
//!
//! String contents are kept verbatim, escape sequences included, so that
//! printing a parsed document reproduces the same strings.

mod node;
mod parser;
mod value;

pub use node::JsonNode;
pub use parser::{find_corresponding_bracket, parse};
pub use value::{JsonValue, is_float_text, is_int_text};

use thiserror::Error;

/// Errors raised while parsing or navigating a JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JsonError {
    /// The character at the given position is not a bracket or quote.
    #[error("Not a bracket: '{found}' at position {pos}")]
    NotABracket { pos: usize, found: char },

    /// The bracket at the given position is never closed (or opened).
    #[error("No corresponding bracket for position {pos}")]
    NoCorrespondingBracket { pos: usize },

    /// An object member does not start with a quoted name.
    #[error("Name expected at position {pos}")]
    NameExpected { pos: usize },

    /// A member name is not followed by a colon.
    #[error("Colon expected at position {pos}")]
    ColonExpected { pos: usize },

    /// A member or element has no value.
    #[error("Value expected at position {pos}")]
    ValueExpected { pos: usize },

    /// A nested object or array is not closed inside its parent.
    #[error("Closing bracket expected for position {pos}")]
    BracketExpected { pos: usize },

    /// A value is followed by something other than a comma or closing bracket.
    #[error("Comma or end of object expected at position {pos}")]
    CommaOrEndExpected { pos: usize },

    /// The document does not start with an object.
    #[error("Document must start with '{{'")]
    CurlyExpected,

    /// No child with this name exists.
    #[error("Name not found: {0}")]
    NameNotFound(String),

    /// No child at this position exists.
    #[error("Position out of bounds: {0}")]
    IndexOutOfBounds(usize),

    /// A value cannot be coerced to the requested type.
    #[error("Value of type {found} is not a {expected}")]
    WrongType {
        expected: &'static str,
        found: &'static str,
    },

    /// A duration uses a unit other than ms, s, min, h, d.
    #[error("Unknown unit of time: {0}")]
    UnknownTimeUnit(String),

    /// A duration's magnitude is neither an integer nor a float.
    #[error("Duration value must be a number")]
    WrongTimeValueType,
}
