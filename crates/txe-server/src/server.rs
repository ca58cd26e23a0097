use tokio::net::TcpListener;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// The transaction exchange HTTP server.
pub struct ExchangeServer {
    config: ServerConfig,
    state: AppState,
}

impl ExchangeServer {
    /// Create a server from a configuration.
    pub fn new(config: ServerConfig) -> Self {
        let state = AppState::from_config(&config);
        Self { config, state }
    }

    /// The configuration this server was built from.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The shared application state.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run one retention sweep before accepting requests, so a restart
    /// does not wait for the first meta poll to clear stale state.
    pub fn startup_sweep(&self) {
        let Some(exchange) = self.state.exchange.as_deref() else {
            return;
        };
        if exchange.sweeper().is_enabled() {
            info!("running startup retention sweep");
            exchange.sweeper().run();
        }
    }

    /// Bind and serve until the task is cancelled.
    pub async fn serve(self) -> ServerResult<()> {
        let app = build_router(self.state);
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        info!(addr = %self.config.bind_addr, "transaction exchange listening");
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(format!("server error: {e}")))?;
        Ok(())
    }
}
