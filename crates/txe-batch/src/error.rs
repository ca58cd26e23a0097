use std::io;

/// Errors from building an aggregate document.
///
/// Per-member failures never surface here; they are logged and the member
/// is omitted. What remains is the (practically unreachable) failure of
/// writing to the in-memory output buffer.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// I/O error while writing the aggregate.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// XML writer error while building the aggregate.
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),
}

/// Result alias for batch operations.
pub type BatchResult<T> = Result<T, BatchError>;
