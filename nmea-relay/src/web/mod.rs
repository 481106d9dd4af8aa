//! Web server: axum API for sentence decoding and relay health.
//!
//! Shared state is the GPS clock and the health counters, both written by the
//! relay tasks and only read here.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

use nmea_core::SharedClock;

use crate::health::Health;

pub mod routes;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

pub struct AppState {
    pub clock: SharedClock,
    pub health: Arc<Health>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/api/nmea/decode",
            axum::routing::post(routes::api_decode),
        )
        .route("/api/health", axum::routing::get(routes::api_health))
        .with_state(state)
        .layer(cors)
}

/// Serve the API until `cancel` fires. Bind and serve errors are logged; the
/// relay keeps running without HTTP.
pub async fn serve(addr: SocketAddr, state: Arc<AppState>, cancel: CancellationToken) {
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            log::error!("HTTP API disabled, cannot bind {addr}: {e}");
            return;
        }
    };

    log::info!("HTTP API listening on http://{addr}");

    let app = build_router(state);
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await;
    if let Err(e) = result {
        log::error!("HTTP API stopped: {e}");
    }
}
