//! Read-side HTTP endpoint over the reply store
//!
//! Serves the most recent replies to a user as a single JSON document, so a
//! client can poll "who answered me" without touching the store layout.

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::store::ReplyStore;
use axum::{Router, routing::get};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod routes;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    /// Store the replies are read from
    pub store: Arc<dyn ReplyStore>,

    /// Maximum replies returned per query
    pub max_replies: usize,
}

impl AppState {
    /// Create a new AppState
    pub fn new(store: Arc<dyn ReplyStore>, max_replies: usize) -> Self {
        Self { store, max_replies }
    }
}

/// Create the query router
///
/// # Routes
///
/// - `GET /get?u=<user>[&print=pretty]` - Latest replies to `user`
/// - `GET /health` - Health check
pub fn create_router(store: Arc<dyn ReplyStore>, config: &ServerConfig) -> Router {
    let state = AppState::new(store, config.max_replies);

    Router::new()
        .route("/get", get(routes::get_replies))
        .route("/health", get(routes::health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
}

/// Bind the configured address and serve the query router until it fails
pub async fn start_query_server(store: Arc<dyn ReplyStore>, config: &ServerConfig) -> Result<()> {
    let bind_address = config.bind_address;
    let app = create_router(store, config);

    let listener = TcpListener::bind(bind_address).await.map_err(Error::Io)?;

    tracing::info!(address = %bind_address, "Query server listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::ApiServer(e.to_string()))?;

    tracing::info!("Query server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
