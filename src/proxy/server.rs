//! Proxy server setup and initialization

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use tokio::net::TcpListener;

use crate::config::Config;

use super::auth::basic_auth;
use super::handlers::{create_message, health};
use super::routing::ProviderResolver;
use super::state::ProxyState;
use super::upstream::HttpUpstream;

/// Request bodies above this are rejected before parsing
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Build the router: messages endpoints, health, and the basic-auth gate
pub fn build_router(state: ProxyState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/messages", post(create_message))
        .route("/messages", post(create_message))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(middleware::from_fn_with_state(state.clone(), basic_auth))
        .with_state(state)
}

async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "detail": "Not Found" })),
    )
}

/// Start the proxy server and serve until `shutdown` resolves
pub async fn start_proxy<F>(config: Config, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let bind_addr = config.bind_addr;

    let upstream = HttpUpstream::new(&config.upstream).context("Failed to create HTTP client")?;
    let resolver = ProviderResolver::from_config(&config.routing)
        .context("Invalid endpoint allow-list pattern")?;

    tracing::debug!(
        providers = config.routing.providers.len(),
        models = config.routing.models.len(),
        default_provider = %config.routing.default_provider,
        "Routing tables loaded"
    );

    let state = ProxyState::new(Arc::new(upstream), resolver, config.auth.clone());
    let app = build_router(state);

    tracing::info!("Starting proxy on {}", bind_addr);

    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;

    tracing::info!("Proxy listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server error")?;

    tracing::info!("Proxy server shut down gracefully");
    Ok(())
}
