//! Error types shared by the CSV and JSON engines.

use std::io;

use thiserror::Error;

/// Syntax-level defects in the input text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SyntaxError {
    #[error("unexpected character '{0}'")]
    UnexpectedCharacter(char),
    #[error("unexpected control character {0:?} in string")]
    ControlCharacter(char),
    #[error("invalid escape character '{0}'")]
    InvalidEscape(char),
    #[error("invalid unicode escape")]
    InvalidUnicodeEscape,
    #[error("invalid number literal '{0}'")]
    InvalidNumber(String),
    #[error("expected '{0}'")]
    ExpectedLiteral(&'static str),
    #[error("object keys must be strings")]
    NonStringKey,
    #[error("expected ':' after object key")]
    ExpectedColon,
    #[error("expected ',' or '{0}'")]
    ExpectedComma(char),
    #[error("trailing comma")]
    TrailingComma,
    #[error("unclosed quoted field")]
    UnclosedQuote,
}

/// Errors produced while reading or writing CSV/JSON.
///
/// Parse failures carry the position that triggered them: 1-based
/// line/column for JSON, the 0-based row index for CSV. End-of-input
/// while a value was still required is its own variant so callers can
/// recover from it without string-matching messages.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed JSON at a known position.
    #[error("{source} at {line}:{column}")]
    Json {
        source: SyntaxError,
        line: usize,
        column: usize,
    },

    /// Malformed CSV within a known row.
    #[error("{source} in row {row}")]
    Csv { source: SyntaxError, row: usize },

    /// The input ended where a value (or the rest of one) was required.
    #[error("unexpected end of input at {line}:{column}")]
    EndOfInput { line: usize, column: usize },

    /// JSON cannot represent NaN or infinities.
    #[error("number has no JSON representation: {0}")]
    NonFiniteNumber(f64),

    /// An API contract was violated by the caller.
    #[error("{0}")]
    Usage(&'static str),

    /// Error surfaced from the underlying character source.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// `true` when the error is [`Error::EndOfInput`].
    #[must_use]
    pub fn is_end_of_input(&self) -> bool {
        matches!(self, Error::EndOfInput { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
