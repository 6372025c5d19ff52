//! Webhook HTTP server
//!
//! Exposes the endpoint Authentik posts to, plus a plain-text setup guide
//! and a health probe. The handler never fails toward Authentik: decode
//! failures become their own notification and delivery failures are only
//! logged, so every delivery is answered with 200.

mod setup;

pub use setup::setup_guide;

use agb_core::classify::{EventClassifier, NotificationDraft};
use agb_core::decode::decode;
use agb_core::sink::NotificationSink;
use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Path the webhook is registered under.
pub const ROUTE_SUFFIX: &str = "authentik";

/// Web server configuration
#[derive(Debug, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            // Use 0.0.0.0 for Docker compatibility
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Shared application state: read-only after startup.
pub struct AppState {
    pub classifier: EventClassifier,
    pub sink: Arc<dyn NotificationSink>,
}

/// Build the router for the bridge endpoints
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            &format!("/{}", ROUTE_SUFFIX),
            get(setup_page).post(authentik_webhook),
        )
        .route("/api/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the web server
pub async fn start_server(config: WebConfig, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Webhook endpoint at http://{}/{}", addr, ROUTE_SUFFIX);
    info!("  - Setup guide at GET /{}", ROUTE_SUFFIX);
    info!("  - Health probe at /api/health");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}

/// Build the notification draft for one delivery. Decode failures become
/// a parse-error notification rather than an error.
pub fn draft_for_delivery(
    classifier: &EventClassifier,
    body: &[u8],
    origin: &str,
) -> NotificationDraft {
    match decode(body) {
        Ok(event) => classifier.classify(&event, origin),
        Err(err) => {
            warn!("Failed to decode webhook payload from {}: {}", origin, err);
            classifier.decode_failure(&err, origin)
        }
    }
}

/// Classify, render, and hand off one delivery.
pub async fn process_delivery(state: &AppState, body: &[u8], origin: &str) -> StatusCode {
    let draft = draft_for_delivery(&state.classifier, body, origin);

    if let Err(e) = state.sink.send(&draft).await {
        // Delivery problems are ours, not the webhook caller's.
        error!("Failed to deliver notification: {}", e);
    }

    StatusCode::OK
}

async fn authentik_webhook(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    body: Bytes,
) -> StatusCode {
    process_delivery(&state, &body, &addr.to_string()).await
}

/// Plain-text setup instructions, with the webhook URL filled in from the
/// Host header when present.
async fn setup_page(headers: HeaderMap) -> impl IntoResponse {
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("<bridge-host>");
    let webhook_url = format!("http://{}/{}", host, ROUTE_SUFFIX);

    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        setup_guide(&webhook_url),
    )
}

/// Health check endpoint for Docker/Kubernetes probes
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "authentik-gotify-bridge",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
