use tokio::net::TcpListener;

use slugmap_service::MappingService;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::AppState;
use crate::router::build_router;

/// Slugmap HTTP server.
pub struct SlugmapServer {
    config: ServerConfig,
    service: MappingService,
}

impl SlugmapServer {
    /// Build a server whose store is chosen by `config.database_url`.
    ///
    /// No connection is made here; the store is contacted on the first
    /// request.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let service = config.build_service()?;
        Ok(Self { config, service })
    }

    pub fn with_service(config: ServerConfig, service: MappingService) -> Self {
        Self { config, service }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn service(&self) -> &MappingService {
        &self.service
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(AppState {
            service: self.service.clone(),
            request_timeout: self.config.request_timeout(),
        })
    }

    /// Start serving requests until Ctrl-C.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!(
            addr = %self.config.bind_addr,
            store = %self.service.connection().target(),
            "slugmap server listening"
        );
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
