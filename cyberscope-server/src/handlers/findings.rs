use axum::{
    Json,
    extract::{Path, State},
};
use cyberscope_model::{Finding, FindingId};

use crate::infra::{app_state::AppState, errors::AppResult};

pub async fn get_finding_handler(
    State(state): State<AppState>,
    Path(finding_id): Path<FindingId>,
) -> AppResult<Json<Finding>> {
    let finding = state.engine().get_finding(finding_id).await?;
    Ok(Json(finding))
}
