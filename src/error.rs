use std::{fmt::Display, num::{ParseFloatError, ParseIntError}};

/// Custom Result type for minisql operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for minisql
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Malformed query text or a failed predicate evaluation
    Query(String),
    /// Table lifecycle and schema errors on direct storage operations
    Storage(String),
    /// I/O and other failures outside the query core
    Internal(String),
}

impl From<ParseIntError> for Error {
    fn from(value: ParseIntError) -> Self {
        Error::Query(value.to_string())
    }
}

impl From<ParseFloatError> for Error {
    fn from(value: ParseFloatError) -> Self {
        Error::Query(value.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::Internal(value.to_string())
    }
}

impl std::error::Error for Error {}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Query(err) => write!(f, "query error: {}", err),
            Error::Storage(err) => write!(f, "storage error: {}", err),
            Error::Internal(err) => write!(f, "internal error: {}", err),
        }
    }
}
