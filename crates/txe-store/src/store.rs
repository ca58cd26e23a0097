use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use txe_types::ItemUri;

use crate::cache::DocumentCache;
use crate::error::{StoreError, StoreResult};

/// Filename of the well-known metadata document pollers watch.
pub const META_DOCUMENT: &str = "meta.xml";

/// Suffix of per-item state documents.
pub const STATE_SUFFIX: &str = ".state.xml";

/// Suffix of per-item payload documents.
pub const PAYLOAD_SUFFIX: &str = ".xml";

/// Content type of served XML documents.
pub const TEXT_XML: &str = "text/xml; charset=utf-8";

/// What a named fetch should do with the resolved document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchAction {
    Serve,
    Remove,
}

/// Outcome of a named fetch.
#[derive(Debug, PartialEq, Eq)]
pub enum NamedFetch {
    /// The document exists and was read.
    Served {
        body: Vec<u8>,
        content_type: &'static str,
    },
    /// A removal was requested for an existing document.
    Removed,
    /// Nothing is stored under that name.
    NoContent,
}

/// Directory-backed store for transaction artifacts.
///
/// Everything lives flat under one incoming root: package files dropped by
/// the deployment client, per-item `{uri}.state.xml` status documents and
/// `{uri}.xml` payloads written by the processing pipeline, and the
/// well-known [`META_DOCUMENT`]. The store never takes directory-wide
/// locks; producers write and delete concurrently, and every read folds a
/// vanished file into the recoverable [`StoreError::NotFound`].
pub struct TransactionStore {
    root: PathBuf,
    meta_cache: DocumentCache,
}

impl TransactionStore {
    /// Open the store over the given incoming root, creating the directory
    /// if it does not exist yet.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        info!(root = %root.display(), "transaction store opened");
        Ok(Self {
            root,
            meta_cache: DocumentCache::new(),
        })
    }

    /// The incoming root all artifacts live under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the name refers to the well-known metadata document.
    pub fn is_meta(name: &str) -> bool {
        name.eq_ignore_ascii_case(META_DOCUMENT)
    }

    /// Resolve a client-supplied name for a lookup: a valid item
    /// identifier maps to its state document, anything else to the plain
    /// file of that name. `None` when the name has no usable filename
    /// component.
    pub fn resolve_named(&self, name: &str) -> Option<PathBuf> {
        let name = sanitize_name(name)?;
        if ItemUri::is_valid(name) {
            Some(self.root.join(format!("{}{}", name, STATE_SUFFIX)))
        } else {
            Some(self.root.join(name))
        }
    }

    /// Resolve a client-supplied name verbatim, without the state-document
    /// mapping.
    pub fn resolve_plain(&self, name: &str) -> Option<PathBuf> {
        Some(self.root.join(sanitize_name(name)?))
    }

    /// Path of the payload document for an item.
    pub fn payload_path(&self, uri: &ItemUri) -> PathBuf {
        self.root.join(format!("{}{}", uri, PAYLOAD_SUFFIX))
    }

    /// Path of the state document for an item.
    pub fn state_path(&self, uri: &ItemUri) -> PathBuf {
        self.root.join(format!("{}{}", uri, STATE_SUFFIX))
    }

    /// Read a document as UTF-8 text.
    pub fn read_document(&self, path: &Path) -> StoreResult<String> {
        fs::read_to_string(path).map_err(|e| StoreError::from_read(path, e))
    }

    /// Read a document's raw bytes.
    pub fn read_raw(&self, path: &Path) -> StoreResult<Vec<u8>> {
        fs::read(path).map_err(|e| StoreError::from_read(path, e))
    }

    /// Best-effort delete. A file that is locked, already gone, or
    /// otherwise undeletable is logged and left alone; returns whether
    /// this call removed it.
    pub fn remove(&self, path: &Path) -> bool {
        match fs::remove_file(path) {
            Ok(()) => {
                debug!(path = %path.display(), "document removed");
                true
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "document already gone");
                false
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not remove document");
                false
            }
        }
    }

    /// Names of top-level plain files ending with `extension` (the empty
    /// extension matches everything). The directory is read fresh on every
    /// call; there is no cached view to go stale.
    pub fn list_by_extension(&self, extension: &str) -> StoreResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if name.ends_with(extension) {
                names.push(name.to_string());
            }
        }
        names.sort();
        debug!(extension, count = names.len(), "listed incoming files");
        Ok(names)
    }

    /// Retrieve a finished transaction: serve the `{uri}.xml` payload and
    /// consume the `{uri}.state.xml` state document. The payload stays in
    /// place for the retention sweep to reclaim later. `Ok(None)` when the
    /// payload is not (or no longer) there, which a poller treats as "not
    /// finished yet".
    pub fn fetch_transaction(&self, uri: &ItemUri) -> StoreResult<Option<String>> {
        match self.read_document(&self.payload_path(uri)) {
            Ok(content) => {
                info!(uri = %uri, "transaction payload served");
                self.remove(&self.state_path(uri));
                Ok(Some(content))
            }
            Err(StoreError::NotFound(_)) => {
                debug!(uri = %uri, "transaction payload not present");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Serve or remove a document by client-supplied name, using the
    /// [`resolve_named`](Self::resolve_named) mapping. The well-known
    /// metadata document is served through the mtime-validated cache.
    pub fn fetch_named(&self, name: &str, action: FetchAction) -> StoreResult<NamedFetch> {
        let Some(path) = self.resolve_named(name) else {
            debug!(name, "name has no usable filename component");
            return Ok(NamedFetch::NoContent);
        };
        if !path.is_file() {
            debug!(name, "no document under that name");
            return Ok(NamedFetch::NoContent);
        }

        match action {
            FetchAction::Remove => {
                info!(name, "document removal requested");
                self.remove(&path);
                Ok(NamedFetch::Removed)
            }
            FetchAction::Serve if Self::is_meta(name) => {
                match self.meta_cache.read_through(&path) {
                    Ok(content) => Ok(NamedFetch::Served {
                        body: content.into_bytes(),
                        content_type: TEXT_XML,
                    }),
                    Err(StoreError::NotFound(_)) => Ok(NamedFetch::NoContent),
                    Err(e) => Err(e),
                }
            }
            FetchAction::Serve => match self.read_raw(&path) {
                Ok(body) => {
                    info!(name, size = body.len(), "document served");
                    Ok(NamedFetch::Served {
                        body,
                        content_type: content_type_for(&path),
                    })
                }
                Err(StoreError::NotFound(_)) => Ok(NamedFetch::NoContent),
                Err(e) => Err(e),
            },
        }
    }

    /// Store an uploaded package under its final name, writing through a
    /// temporary name first so a partially written upload is never visible
    /// as a finished package. Returns the name the package was stored
    /// under.
    pub fn store_package(&self, file_name: &str, content: &[u8]) -> StoreResult<String> {
        let name = sanitize_name(file_name)
            .ok_or_else(|| StoreError::InvalidName(file_name.to_string()))?;
        let final_path = self.root.join(name);
        let temp_path = final_path.with_extension("tmp");

        fs::write(&temp_path, content)?;
        fs::rename(&temp_path, &final_path)?;
        info!(package = name, size = content.len(), "package stored");
        Ok(name.to_string())
    }
}

/// Reduce a client-supplied name to its final path component, so lookups
/// and uploads can never reach outside the incoming root. `None` when
/// nothing usable remains.
fn sanitize_name(name: &str) -> Option<&str> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    if base.is_empty() || base == "." || base == ".." {
        None
    } else {
        Some(base)
    }
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("xml") => TEXT_XML,
        Some(ext) if ext.eq_ignore_ascii_case("zip") => "application/zip",
        Some(ext) if ext.eq_ignore_ascii_case("json") => "application/json",
        Some(ext) if ext.eq_ignore_ascii_case("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_store(dir: &tempfile::TempDir) -> TransactionStore {
        TransactionStore::open(dir.path()).unwrap()
    }

    fn uri(text: &str) -> ItemUri {
        ItemUri::parse(text).unwrap()
    }

    // -----------------------------------------------------------------------
    // Name resolution
    // -----------------------------------------------------------------------

    #[test]
    fn open_creates_a_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("incoming");
        assert!(!root.exists());

        let store = TransactionStore::open(&root).unwrap();
        assert!(root.is_dir());
        assert_eq!(store.root(), root);
    }

    #[test]
    fn valid_identifiers_resolve_to_state_documents() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        let path = store.resolve_named("tcm:0-123").unwrap();
        assert_eq!(path, dir.path().join("tcm:0-123.state.xml"));
    }

    #[test]
    fn plain_names_resolve_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        assert_eq!(
            store.resolve_named("meta.xml").unwrap(),
            dir.path().join("meta.xml")
        );
        // A state *filename* is not a valid identifier, so it does not get
        // the state suffix a second time.
        assert_eq!(
            store.resolve_named("tcm:0-123.state.xml").unwrap(),
            dir.path().join("tcm:0-123.state.xml")
        );
    }

    #[test]
    fn resolution_strips_directory_components() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        assert_eq!(
            store.resolve_named("../../etc/passwd").unwrap(),
            dir.path().join("passwd")
        );
        assert_eq!(
            store.resolve_plain("sub\\pkg.zip").unwrap(),
            dir.path().join("pkg.zip")
        );
    }

    #[test]
    fn unusable_names_resolve_to_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        for name in ["", ".", "..", "a/..", "dir/"] {
            assert!(store.resolve_named(name).is_none(), "name {:?}", name);
        }
    }

    #[test]
    fn item_paths_use_the_canonical_form() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let id = uri("tcm:2-255-16");

        assert_eq!(store.payload_path(&id), dir.path().join("tcm:2-255.xml"));
        assert_eq!(
            store.state_path(&id),
            dir.path().join("tcm:2-255.state.xml")
        );
    }

    // -----------------------------------------------------------------------
    // Reads, removes, listing
    // -----------------------------------------------------------------------

    #[test]
    fn missing_document_reads_as_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        let path = dir.path().join("absent.xml");
        assert!(matches!(
            store.read_document(&path),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.read_raw(&path),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn remove_is_best_effort() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        let path = dir.path().join("doc.xml");
        assert!(!store.remove(&path));

        fs::write(&path, "x").unwrap();
        assert!(store.remove(&path));
        assert!(!path.exists());
    }

    #[test]
    fn listing_filters_by_suffix_and_skips_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        fs::write(dir.path().join("a.zip"), "a").unwrap();
        fs::write(dir.path().join("b.zip"), "b").unwrap();
        fs::write(dir.path().join("c.txt"), "c").unwrap();
        fs::create_dir(dir.path().join("nested.zip")).unwrap();

        assert_eq!(store.list_by_extension(".zip").unwrap(), ["a.zip", "b.zip"]);
    }

    #[test]
    fn listing_with_empty_extension_lists_everything() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        fs::write(dir.path().join("a.zip"), "a").unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();

        assert_eq!(store.list_by_extension("").unwrap(), ["a.zip", "b.txt"]);
    }

    #[test]
    fn listing_reads_the_directory_fresh_each_call() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        assert!(store.list_by_extension(".zip").unwrap().is_empty());
        fs::write(dir.path().join("late.zip"), "x").unwrap();
        assert_eq!(store.list_by_extension(".zip").unwrap(), ["late.zip"]);
    }

    // -----------------------------------------------------------------------
    // Transaction fetch
    // -----------------------------------------------------------------------

    #[test]
    fn fetch_serves_payload_and_consumes_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let id = uri("tcm:0-123");

        fs::write(store.payload_path(&id), "<result/>").unwrap();
        fs::write(store.state_path(&id), "<state/>").unwrap();

        let content = store.fetch_transaction(&id).unwrap();
        assert_eq!(content.as_deref(), Some("<result/>"));

        // The payload stays for the retention sweep; the state document is
        // consumed so the poller stops seeing the transaction.
        assert!(store.payload_path(&id).exists());
        assert!(!store.state_path(&id).exists());
    }

    #[test]
    fn fetch_without_payload_is_none_and_leaves_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let id = uri("tcm:0-123");

        fs::write(store.state_path(&id), "<state/>").unwrap();

        assert_eq!(store.fetch_transaction(&id).unwrap(), None);
        assert!(store.state_path(&id).exists());
    }

    #[test]
    fn fetch_of_unknown_transaction_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        assert_eq!(store.fetch_transaction(&uri("tcm:9-9")).unwrap(), None);
    }

    // -----------------------------------------------------------------------
    // Named fetch
    // -----------------------------------------------------------------------

    #[test]
    fn named_fetch_serves_state_documents_as_xml() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        fs::write(dir.path().join("tcm:0-123.state.xml"), "<state/>").unwrap();

        let fetched = store.fetch_named("tcm:0-123", FetchAction::Serve).unwrap();
        assert_eq!(
            fetched,
            NamedFetch::Served {
                body: b"<state/>".to_vec(),
                content_type: TEXT_XML,
            }
        );
    }

    #[test]
    fn named_fetch_serves_plain_files_with_inferred_type() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        fs::write(dir.path().join("pkg.zip"), [0x50, 0x4b]).unwrap();

        match store.fetch_named("pkg.zip", FetchAction::Serve).unwrap() {
            NamedFetch::Served { body, content_type } => {
                assert_eq!(body, vec![0x50, 0x4b]);
                assert_eq!(content_type, "application/zip");
            }
            other => panic!("expected Served, got {:?}", other),
        }
    }

    #[test]
    fn named_fetch_of_missing_document_is_no_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        assert_eq!(
            store.fetch_named("absent.xml", FetchAction::Serve).unwrap(),
            NamedFetch::NoContent
        );
        assert_eq!(
            store.fetch_named("absent.xml", FetchAction::Remove).unwrap(),
            NamedFetch::NoContent
        );
    }

    #[test]
    fn named_fetch_never_serves_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        fs::create_dir(dir.path().join("Transaction")).unwrap();
        assert_eq!(
            store
                .fetch_named("Transaction", FetchAction::Serve)
                .unwrap(),
            NamedFetch::NoContent
        );
    }

    #[test]
    fn named_remove_deletes_the_resolved_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        fs::write(dir.path().join("tcm:0-123.state.xml"), "<state/>").unwrap();

        let fetched = store.fetch_named("tcm:0-123", FetchAction::Remove).unwrap();
        assert_eq!(fetched, NamedFetch::Removed);
        assert!(!dir.path().join("tcm:0-123.state.xml").exists());
    }

    #[test]
    fn meta_document_is_served_through_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let path = dir.path().join(META_DOCUMENT);

        fs::write(&path, "<meta v=\"1\"/>").unwrap();
        let original = fs::metadata(&path).unwrap().modified().unwrap();

        match store.fetch_named("meta.xml", FetchAction::Serve).unwrap() {
            NamedFetch::Served { body, content_type } => {
                assert_eq!(body, b"<meta v=\"1\"/>");
                assert_eq!(content_type, TEXT_XML);
            }
            other => panic!("expected Served, got {:?}", other),
        }

        // Same mtime, new bytes: the cached copy must still be served.
        fs::write(&path, "<meta v=\"2\"/>").unwrap();
        let file = fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(original).unwrap();
        drop(file);

        match store.fetch_named("meta.xml", FetchAction::Serve).unwrap() {
            NamedFetch::Served { body, .. } => assert_eq!(body, b"<meta v=\"1\"/>"),
            other => panic!("expected Served, got {:?}", other),
        }
    }

    // -----------------------------------------------------------------------
    // Package upload
    // -----------------------------------------------------------------------

    #[test]
    fn store_package_writes_the_final_name_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        let name = store.store_package("pkg.zip", b"payload").unwrap();
        assert_eq!(name, "pkg.zip");
        assert_eq!(fs::read(dir.path().join("pkg.zip")).unwrap(), b"payload");
        assert!(!dir.path().join("pkg.tmp").exists());
    }

    #[test]
    fn store_package_sanitizes_the_client_name() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("incoming");
        let store = TransactionStore::open(&root).unwrap();

        let name = store.store_package("../evil.zip", b"x").unwrap();
        assert_eq!(name, "evil.zip");
        assert!(root.join("evil.zip").exists());
        assert!(!dir.path().join("evil.zip").exists());
    }

    #[test]
    fn store_package_rejects_unusable_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        assert!(matches!(
            store.store_package("..", b"x"),
            Err(StoreError::InvalidName(_))
        ));
    }
}
