use thiserror::Error;

/// Errors produced by identifier operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UriError {
    /// The text does not match the identifier grammar.
    #[error("malformed item uri: {0:?}")]
    Malformed(String),

    /// The text matches the grammar but carries field values the
    /// identifier contract forbids.
    #[error("item uri fields out of range: {0:?}")]
    OutOfRange(String),
}
