use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use cyberscope_core::{LaunchOutcome, RECENT_SESSIONS_LIMIT};
use cyberscope_model::{Finding, ScanSession, ScanStatus, ScanType, SessionId, Target};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::infra::{
    app_state::AppState,
    errors::{AppError, AppResult},
};

#[derive(Debug, Deserialize)]
pub struct CreateScanRequest {
    pub target: Option<String>,
    pub scan_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateScanResponse {
    pub scan_id: SessionId,
    pub target: Target,
    pub status: ScanStatus,
    pub warning: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ScanDetailResponse {
    #[serde(flatten)]
    pub session: ScanSession,
    pub findings: Vec<Finding>,
}

#[derive(Debug, Serialize)]
pub struct ScanProgressResponse {
    pub scan_id: SessionId,
    pub status: ScanStatus,
    pub progress: f64,
    pub error_message: Option<String>,
}

impl From<ScanSession> for ScanProgressResponse {
    fn from(session: ScanSession) -> Self {
        Self {
            scan_id: session.id,
            status: session.status,
            progress: session.progress,
            error_message: session.error_message,
        }
    }
}

/// Status and error text right after a launch attempt.
fn launch_summary(outcome: LaunchOutcome) -> (StatusCode, ScanStatus, Option<String>) {
    match outcome {
        LaunchOutcome::Launched(_) => (StatusCode::ACCEPTED, ScanStatus::Running, None),
        LaunchOutcome::Rejected { session, reason } => {
            (StatusCode::OK, session.status, Some(reason))
        }
    }
}

pub async fn create_scan_handler(
    State(state): State<AppState>,
    payload: Result<Json<CreateScanRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(request) = payload?;
    let target = request
        .target
        .filter(|target| !target.trim().is_empty())
        .ok_or_else(|| AppError::bad_request("Missing required field: target"))?;
    let scan_type = match request.scan_type.as_deref() {
        Some(raw) => raw
            .parse::<ScanType>()
            .map_err(|err| AppError::bad_request(err.to_string()))?,
        None => ScanType::default(),
    };

    let submitted = state.engine().submit_scan(&target, scan_type).await?;
    let warning = submitted.target.warning();
    let (_, status, error_message) = launch_summary(submitted.launch);
    info!(session = %submitted.session.id, scan_target = %submitted.target.target.address, %status, "scan requested over HTTP");

    Ok((
        StatusCode::CREATED,
        Json(CreateScanResponse {
            scan_id: submitted.session.id,
            target: submitted.target.target,
            status,
            warning,
            error_message,
        }),
    ))
}

pub async fn start_scan_handler(
    State(state): State<AppState>,
    Path(scan_id): Path<SessionId>,
) -> AppResult<impl IntoResponse> {
    let outcome = state.engine().start_session(scan_id).await?;
    let (code, status, error_message) = launch_summary(outcome);
    Ok((
        code,
        Json(ScanProgressResponse {
            scan_id,
            status,
            progress: 0.0,
            error_message,
        }),
    ))
}

pub async fn list_scans_handler(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<ScanSession>>> {
    let sessions = state.engine().recent_sessions(RECENT_SESSIONS_LIMIT).await?;
    Ok(Json(sessions))
}

pub async fn get_scan_handler(
    State(state): State<AppState>,
    Path(scan_id): Path<SessionId>,
) -> AppResult<Json<ScanDetailResponse>> {
    let session = state.engine().get_session(scan_id).await?;
    let findings = state.engine().get_findings(scan_id).await?;
    Ok(Json(ScanDetailResponse { session, findings }))
}

pub async fn scan_progress_handler(
    State(state): State<AppState>,
    Path(scan_id): Path<SessionId>,
) -> AppResult<Json<ScanProgressResponse>> {
    let session = state.engine().get_session(scan_id).await?;
    Ok(Json(session.into()))
}
