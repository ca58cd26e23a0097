//! Foundation types for the txe transaction exchange.
//!
//! This crate provides the structured item identifier used throughout the
//! exchange: every state document, payload document, and retained working
//! directory is named after one. Every other txe crate depends on
//! `txe-types`.
//!
//! # Key Types
//!
//! - [`ItemUri`] — Four-field item identifier (`tcm:pub-item[-type[-vVer]]`)
//! - [`UriError`] — Parse and validation failures, returned as values
//! - [`SCHEME`] — The identifier scheme, also the filename prefix of
//!   retained transaction artifacts

pub mod error;
pub mod uri;

pub use error::UriError;
pub use uri::{ItemUri, SCHEME};
