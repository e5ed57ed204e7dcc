//! API router configuration.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::handlers::{
    delete_value, get_value, health, list_keys, logout, put_value, visit, AppState,
};

/// Create the API router around an existing state.
pub fn create_router(state: AppState) -> Router {
    let value_routes = Router::new()
        .route("/", get(list_keys))
        .route("/{key}", get(get_value).put(put_value).delete(delete_value));

    Router::new()
        .route("/", get(visit))
        .route("/health", get(health))
        .route("/logout", post(logout))
        .nest("/values", value_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Stop on Ctrl-C.
    pub graceful_shutdown: bool,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            graceful_shutdown: true,
        }
    }

    pub fn without_graceful_shutdown(mut self) -> Self {
        self.graceful_shutdown = false;
        self
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new("127.0.0.1", 3000)
    }
}

/// Start the HTTP server with a session reaper running alongside it.
///
/// The reaper is stopped once the server exits.
pub async fn serve(config: ServerConfig, state: AppState) -> crate::Result<()> {
    let addr = config.bind_address();
    let reaper = state.manager.spawn_reaper();
    let router = create_router(state);

    tracing::info!("Starting session-keeper server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let served = if config.graceful_shutdown {
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    } else {
        axum::serve(listener, router).await
    };

    reaper.shutdown().await;
    served?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
