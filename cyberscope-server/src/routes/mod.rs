use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

use crate::{
    handlers::{findings, scans, targets},
    infra::app_state::AppState,
};

/// Routes under `/api`, with permissive CORS for the desktop frontend.
pub fn create_api_router() -> Router<AppState> {
    let api = Router::new()
        .route("/targets/validate", post(targets::validate_target_handler))
        .route(
            "/scans",
            post(scans::create_scan_handler).get(scans::list_scans_handler),
        )
        .route("/scans/{scan_id}", get(scans::get_scan_handler))
        .route("/scans/{scan_id}/progress", get(scans::scan_progress_handler))
        .route("/scans/{scan_id}/start", post(scans::start_scan_handler))
        .route("/findings/{finding_id}", get(findings::get_finding_handler));

    Router::new()
        .nest("/api", api)
        .layer(CorsLayer::permissive())
}
