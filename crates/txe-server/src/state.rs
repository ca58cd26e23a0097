use std::sync::Arc;

use tracing::{error, warn};

use txe_batch::BatchAggregator;
use txe_store::TransactionStore;
use txe_sweep::RetentionSweeper;

use crate::config::ServerConfig;

/// Everything an operative exchange needs to answer requests.
pub struct Exchange {
    store: Arc<TransactionStore>,
    aggregator: BatchAggregator,
    sweeper: RetentionSweeper,
    max_upload_size: Option<u64>,
}

impl Exchange {
    /// Build the exchange from configuration. `None` when the incoming
    /// root is not configured or cannot be created; the server still runs
    /// and answers every request with a configuration diagnostic.
    pub fn from_config(config: &ServerConfig) -> Option<Self> {
        let Some(incoming) = &config.incoming_folder else {
            warn!("no incoming folder configured; exchange is inoperative");
            return None;
        };
        let store = match TransactionStore::open(incoming) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                error!(
                    path = %incoming.display(),
                    error = %e,
                    "cannot open incoming folder; exchange is inoperative"
                );
                return None;
            }
        };
        let aggregator = BatchAggregator::new(Arc::clone(&store));
        let sweeper = RetentionSweeper::new(
            store.root(),
            config.temporary_folder.clone(),
            config.max_state_age,
        );
        Some(Self {
            store,
            aggregator,
            sweeper,
            max_upload_size: config.maximum_size,
        })
    }

    pub fn store(&self) -> &TransactionStore {
        &self.store
    }

    pub fn aggregator(&self) -> &BatchAggregator {
        &self.aggregator
    }

    pub fn sweeper(&self) -> &RetentionSweeper {
        &self.sweeper
    }

    pub fn max_upload_size(&self) -> Option<u64> {
        self.max_upload_size
    }
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// `None` while the incoming folder is unconfigured or unusable.
    pub exchange: Option<Arc<Exchange>>,
}

impl AppState {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            exchange: Exchange::from_config(config).map(Arc::new),
        }
    }
}
