//! Age-based reclamation of leftover transaction artifacts.
//!
//! The exchange's incoming root accumulates state documents whose
//! consumers never came back, payloads nobody retrieved, and working
//! directories from crashed runs. The sweeper deletes whatever has
//! outlived a configured maximum age; it runs at process start and again
//! before the well-known metadata document is served, so pollers always
//! observe a recently cleaned directory.
//!
//! # Key Types
//!
//! - [`RetentionSweeper`] — walks the four sweep areas
//! - [`SweepReport`] — removed/failed counts from one run

pub mod sweeper;

pub use sweeper::{RetentionSweeper, SweepReport};
