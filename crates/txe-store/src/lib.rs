//! Directory-backed transaction state store for the txe exchange.
//!
//! One incoming root holds everything the exchange serves: uploaded
//! package files, per-item `{uri}.state.xml` status documents and
//! `{uri}.xml` payloads, and the well-known `meta.xml` pollers watch. The
//! store's contract is built around concurrent producers: reads tolerate
//! files vanishing mid-operation, deletes are best-effort, and nothing
//! ever takes a directory-wide lock.
//!
//! # Key Types
//!
//! - [`TransactionStore`] — Path resolution, tolerant reads, listing,
//!   transaction and named-document fetch, package upload
//! - [`DocumentCache`] — mtime-validated in-memory copy of `meta.xml`
//! - [`NamedFetch`] / [`FetchAction`] — outcome and intent of a named
//!   document fetch
//! - [`StoreError`] — `NotFound` is an ordinary outcome here, not a fault

pub mod cache;
pub mod error;
pub mod store;

pub use cache::DocumentCache;
pub use error::{StoreError, StoreResult};
pub use store::{
    FetchAction, NamedFetch, TransactionStore, META_DOCUMENT, PAYLOAD_SUFFIX, STATE_SUFFIX,
    TEXT_XML,
};
