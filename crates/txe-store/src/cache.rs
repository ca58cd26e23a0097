use std::fs;
use std::path::Path;
use std::sync::RwLock;
use std::time::SystemTime;

use tracing::debug;

use crate::error::{StoreError, StoreResult};

/// In-memory copy of one frequently polled document, validated against the
/// backing file's modification time.
///
/// Deployers poll the well-known metadata document far more often than it
/// changes; holding the last read in memory keeps that hot path off the
/// disk. A stale slot is simply re-read, and concurrent misses may re-read
/// redundantly, so no request ever waits on another's refresh.
pub struct DocumentCache {
    slot: RwLock<Option<CachedDocument>>,
}

struct CachedDocument {
    content: String,
    modified: SystemTime,
}

impl DocumentCache {
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }

    /// The document's current content. The file is re-read only when its
    /// observed modification time differs from the cached one.
    pub fn read_through(&self, path: &Path) -> StoreResult<String> {
        let modified = fs::metadata(path)
            .and_then(|m| m.modified())
            .map_err(|e| StoreError::from_read(path, e))?;

        if let Some(cached) = &*self.slot.read().expect("cache lock poisoned") {
            if cached.modified == modified {
                return Ok(cached.content.clone());
            }
        }

        let content =
            fs::read_to_string(path).map_err(|e| StoreError::from_read(path, e))?;
        debug!(path = %path.display(), "document cache refreshed");
        *self.slot.write().expect("cache lock poisoned") = Some(CachedDocument {
            content: content.clone(),
            modified,
        });
        Ok(content)
    }
}

impl Default for DocumentCache {
    fn default() -> Self {
        Self::new()
    }
}
