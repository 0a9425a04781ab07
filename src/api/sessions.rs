//! Stored session inspection and removal

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use serde::Serialize;

use super::{ApiError, ApiState};
use crate::session::{SessionState, normalize_user_id};

/// Build sessions router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/{user_id}", get(show).delete(forget))
        .with_state(state)
}

/// A user's stored session
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user_id: String,
    #[serde(flatten)]
    pub state: SessionState,
}

fn user_id(raw: &str) -> Result<String, ApiError> {
    if raw.trim().is_empty() {
        return Err(ApiError::BadRequest("user id must not be blank".to_string()));
    }
    Ok(normalize_user_id(Some(raw)))
}

/// Show a user's session; unknown users get the default state
async fn show(
    State(state): State<Arc<ApiState>>,
    Path(raw): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let user_id = user_id(&raw)?;
    let session = state.orchestrator.memory().load_user(&user_id);
    Ok(Json(SessionResponse {
        user_id,
        state: session,
    }))
}

/// Forget a user's session
async fn forget(
    State(state): State<Arc<ApiState>>,
    Path(raw): Path<String>,
) -> Result<StatusCode, ApiError> {
    let user_id = user_id(&raw)?;
    state.orchestrator.memory().remove_user(&user_id);
    tracing::info!(user_id = %user_id, "session forgotten");
    Ok(StatusCode::NO_CONTENT)
}
