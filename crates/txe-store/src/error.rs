use std::io;
use std::path::{Path, PathBuf};

/// Errors from transaction store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The document is not there. Producers replace and delete files under
    /// concurrent readers, so callers treat this as an ordinary outcome,
    /// not a fault.
    #[error("document not found: {0}")]
    NotFound(PathBuf),

    /// A client-supplied name with no usable filename component.
    #[error("unusable document name: {0:?}")]
    InvalidName(String),

    /// I/O error from the backing directory.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl StoreError {
    /// Classify an error observed while opening or reading `path`: a file
    /// that is absent, or vanished between resolution and the read, is the
    /// same recoverable `NotFound`.
    pub(crate) fn from_read(path: &Path, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            StoreError::NotFound(path.to_path_buf())
        } else {
            StoreError::Io(err)
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
