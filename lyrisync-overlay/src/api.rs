//! HTTP renderer endpoint
//!
//! Browser overlays subscribe to `GET /events` (Server-Sent Events carrying
//! `OverlayEvent`s). `GET /health` reports liveness.

use crate::{Error, Result};
use axum::extract::State;
use axum::response::sse::{Event, Sse};
use axum::routing::get;
use axum::{Json, Router};
use futures::stream::Stream;
use lyrisync_common::events::EventBus;
use lyrisync_common::sse::create_event_sse_stream;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared state passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub event_bus: EventBus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    pub sse_clients: usize,
}

/// GET /health
pub async fn health(State(ctx): State<AppContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "lyrisync-overlay".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        sse_clients: ctx.event_bus.subscriber_count(),
    })
}

/// GET /events
pub async fn event_stream(
    State(ctx): State<AppContext>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    create_event_sse_stream(&ctx.event_bus)
}

pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/events", get(event_stream))
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        // Overlays are served from other origins (OBS browser sources, files)
        .layer(CorsLayer::permissive())
}

/// Serve until `cancel` fires
pub async fn run(bind: &str, ctx: AppContext, cancel: CancellationToken) -> Result<()> {
    let addr: SocketAddr = bind
        .parse()
        .map_err(|e| Error::Config(format!("invalid server bind address '{}': {}", bind, e)))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Overlay event server listening on http://{}", addr);

    axum::serve(listener, create_router(ctx))
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;

    info!("Overlay event server stopped");
    Ok(())
}
