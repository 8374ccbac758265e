use std::net::SocketAddr;
use std::sync::Arc;

use ostore_client::Client;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::error::{ServerError, ServerResult};
use crate::handler::blocking;
use crate::router::build_router;
use crate::state::AppState;

/// ostore HTTP server.
pub struct OstoreServer {
    config: Config,
}

impl OstoreServer {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Open the store, load the index and bootstrap the anonymous user.
    pub async fn prepare(&self) -> ServerResult<AppState> {
        let client_config = self.config.client_config();
        let http = self.config.http.clone();
        blocking(move || {
            let client = Client::new(client_config)?;
            let outcome = client.sync()?;
            tracing::info!(adopted = outcome.adopted, "index loaded");
            AppState::new(Arc::new(client), http)
        })
        .await
    }

    /// Start serving requests until interrupted.
    pub async fn serve(self) -> ServerResult<()> {
        let state = self.prepare().await?;
        let app = build_router(state);
        let listener = TcpListener::bind(&self.config.http.bind_addr).await?;
        tracing::info!("ostore server listening on {}", self.config.http.bind_addr);
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
