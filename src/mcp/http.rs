//! Streamable HTTP transport
//!
//! `POST /mcp` carries one JSON-RPC message per request and answers with the
//! JSON reply, or `202 Accepted` when the message was a notification.

use crate::mcp::server::McpServer;
use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::sync::Arc;
use tracing::{error, info};

/// Build the HTTP router for `server`
#[inline]
pub fn router(server: Arc<McpServer>) -> Router {
    Router::new()
        .route("/mcp", post(handle_mcp))
        .route("/health", get(health_check))
        .with_state(server)
}

/// Bind `bind_addr` and serve until Ctrl-C
#[inline]
pub async fn serve_http(server: Arc<McpServer>, bind_addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind HTTP transport to {}", bind_addr))?;

    info!(
        "Starting MCP server with HTTP transport on http://{}/mcp",
        listener.local_addr()?
    );

    axum::serve(listener, router(server))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP transport failed")?;

    info!("MCP server stopped");
    Ok(())
}

async fn handle_mcp(State(server): State<Arc<McpServer>>, body: String) -> Response {
    match server.handle_raw(&body).await {
        Some(reply) => Json(reply).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

async fn health_check(State(server): State<Arc<McpServer>>) -> impl IntoResponse {
    Json(server.health_status().await)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
