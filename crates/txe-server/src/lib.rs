//! HTTP server for the content transaction exchange.
//!
//! Serves the single exchange endpoint the deployment client polls:
//! package uploads, file listings, batched status documents, and
//! transaction fetches, all backed by one incoming folder.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::ExchangeServer;
pub use state::{AppState, Exchange};
