//! Error types for the filter crate.
//!
//! Failures fall in two families: [`SyntaxError`] for malformed filter text
//! (tokenizer, parser and literal coercion) and [`ValidationError`] for misuse
//! of the builder API. Both surface at the call that caused them.

use std::fmt;

use thiserror::Error;

/// The quote character of a quoted literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quote {
    /// `'`
    Single,
    /// `"`
    Double,
}

impl Quote {
    /// Classifies a character as a quote, if it is one.
    pub fn from_char(c: char) -> Option<Quote> {
        match c {
            '\'' => Some(Quote::Single),
            '"' => Some(Quote::Double),
            _ => None,
        }
    }

    /// Returns the quote character itself.
    pub fn as_char(self) -> char {
        match self {
            Quote::Single => '\'',
            Quote::Double => '"',
        }
    }
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quote::Single => f.write_str("single"),
            Quote::Double => f.write_str("double"),
        }
    }
}

/// Malformed filter text.
///
/// Offsets are byte offsets into the source text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    #[error("unterminated field reference: '[' at offset {offset} has no closing ']'")]
    UnterminatedField { offset: usize },

    #[error("empty field reference at offset {offset}")]
    EmptyField { offset: usize },

    #[error("unclosed {quote} quote in literal starting at offset {offset}")]
    UnclosedQuote { quote: Quote, offset: usize },

    #[error("unclosed {quote} quote in literal {text}")]
    UnclosedQuoteInValue { quote: Quote, text: String },

    #[error("closing {quote} quote without an opening quote in literal {text}")]
    UnopenedQuote { quote: Quote, text: String },

    #[error("unterminated array literal: '{{' at offset {offset} has no closing '}}'")]
    UnterminatedArray { offset: usize },

    #[error("nested array literals are not supported (offset {offset})")]
    NestedArray { offset: usize },

    #[error("unbalanced group parentheses: '(' at offset {offset} is never closed")]
    UnclosedGroup { offset: usize },

    #[error("unbalanced group parentheses: ')' at offset {offset} has no matching '('")]
    UnopenedGroup { offset: usize },

    #[error("empty group at offset {offset}")]
    EmptyGroup { offset: usize },

    #[error("expected an operator after field [{field}] but found value '{found}' at offset {offset}")]
    ValueWhereOperatorExpected {
        field: String,
        found: String,
        offset: usize,
    },

    #[error("field [{field}] at offset {offset} is not followed by an operator")]
    MissingOperator { field: String, offset: usize },

    #[error("expected a [field] or '(' at offset {offset} but found '{found}'")]
    ExpectedTerm { found: String, offset: usize },

    #[error("expected AND, OR or ')' at offset {offset} but found '{found}'")]
    ExpectedLogic { found: String, offset: usize },

    #[error("filter ends with a dangling {logic} at offset {offset}")]
    DanglingLogic { logic: String, offset: usize },

    #[error("group nesting at offset {offset} exceeds the maximum depth of {max}")]
    TooDeep { max: usize, offset: usize },
}

impl SyntaxError {
    /// Returns the byte offset the error points at, when one is known.
    pub fn offset(&self) -> Option<usize> {
        match self {
            SyntaxError::UnterminatedField { offset }
            | SyntaxError::EmptyField { offset }
            | SyntaxError::UnclosedQuote { offset, .. }
            | SyntaxError::UnterminatedArray { offset }
            | SyntaxError::NestedArray { offset }
            | SyntaxError::UnclosedGroup { offset }
            | SyntaxError::UnopenedGroup { offset }
            | SyntaxError::EmptyGroup { offset }
            | SyntaxError::ValueWhereOperatorExpected { offset, .. }
            | SyntaxError::MissingOperator { offset, .. }
            | SyntaxError::ExpectedTerm { offset, .. }
            | SyntaxError::ExpectedLogic { offset, .. }
            | SyntaxError::DanglingLogic { offset, .. }
            | SyntaxError::TooDeep { offset, .. } => Some(*offset),
            SyntaxError::UnclosedQuoteInValue { .. } | SyntaxError::UnopenedQuote { .. } => None,
        }
    }
}

/// Misuse of the builder API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unsupported operator '{name}'")]
    UnknownOperator { name: String },

    #[error("unsupported logic '{name}' (expected 'and' or 'or')")]
    UnknownLogic { name: String },

    #[error("invalid field name '{field}': {reason}")]
    InvalidField { field: String, reason: &'static str },

    #[error("operator '{op}' does not take a value")]
    UnexpectedValue { op: &'static str },

    #[error("array values cannot contain arrays")]
    NestedArray,

    #[error("number values must be finite, got {value}")]
    NonFiniteNumber { value: String },

    #[error("malformed filter tree: {reason}")]
    MalformedTree { reason: String },

    #[error("filter nesting exceeds the maximum depth of {max}")]
    TooDeep { max: usize },
}

/// Any error produced while parsing or building a filter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("syntax error: {0}")]
    Syntax(#[from] SyntaxError),

    #[error("invalid filter: {0}")]
    Validation(#[from] ValidationError),
}

impl FilterError {
    /// Returns `true` for syntax failures.
    pub fn is_syntax(&self) -> bool {
        matches!(self, FilterError::Syntax(_))
    }

    /// Returns `true` for builder validation failures.
    pub fn is_validation(&self) -> bool {
        matches!(self, FilterError::Validation(_))
    }
}

/// Result type for filter operations.
pub type Result<T> = std::result::Result<T, FilterError>;
