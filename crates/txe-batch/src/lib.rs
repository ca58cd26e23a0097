//! Batch aggregation of transaction state documents.
//!
//! A deployer tracking many in-flight transactions polls one URL with the
//! list of state documents it cares about; this crate merges whichever of
//! them currently exist and parse into a single well-formed XML response.
//! Members come and go underneath the poll, so every failure mode reads
//! as "omit that member", never "fail the batch".
//!
//! # Key Types
//!
//! - [`BatchAggregator`] — builds the `<Transactions>` aggregate document
//! - [`BatchError`] — output-side failures only; member failures are
//!   logged and swallowed

pub mod aggregate;
pub mod error;

pub use aggregate::BatchAggregator;
pub use error::{BatchError, BatchResult};
