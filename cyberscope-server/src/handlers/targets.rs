use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};

use crate::infra::{app_state::AppState, errors::AppResult};

#[derive(Debug, Deserialize)]
pub struct ValidateTargetRequest {
    pub address: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateTargetResponse {
    pub valid: bool,
    pub address: String,
    pub is_private: bool,
    pub warning: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Dry-run validation; nothing is stored.
pub async fn validate_target_handler(
    State(state): State<AppState>,
    payload: Result<Json<ValidateTargetRequest>, JsonRejection>,
) -> AppResult<Json<ValidateTargetResponse>> {
    let Json(request) = payload?;
    let validation = state.engine().validate(&request.address);
    Ok(Json(ValidateTargetResponse {
        warning: validation.warning(),
        valid: validation.valid,
        address: validation.normalized,
        is_private: validation.is_private,
        reason: validation.reason,
    }))
}
