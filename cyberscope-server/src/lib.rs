//! # CyberScope Server
//!
//! Localhost HTTP API over the scan engine in `cyberscope-core`.
//!
//! - `POST /api/scans` validates a target, creates a session, and launches nmap
//! - `GET /api/scans/{id}/progress` is polled by the dashboard while a scan runs
//! - `GET /api/scans/{id}` returns the session together with its findings

pub mod handlers;
pub mod infra;
pub mod routes;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

pub use infra::app_state::AppState;

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(routes::create_api_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
