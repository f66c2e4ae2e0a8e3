//! Session endpoints.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::CurrentUser;
use crate::db::Session;
use crate::error::ServiceError;

use super::AppState;

/// Request body for POST /api/commitments/{id}/sessions
#[derive(Deserialize)]
pub struct CreateSessionRequest {
    pub starts_at: DateTime<Utc>,
    pub duration_minutes: i64,
}

/// Request body for POST /api/sessions/{id}/complete
#[derive(Deserialize)]
pub struct CompleteSessionRequest {
    pub notes: Option<String>,
}

/// Tutor schedules a session under a commitment
pub async fn create_session_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(commitment_id): Path<String>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<Session>), ServiceError> {
    let session = state.service.schedule_session(
        &user,
        &commitment_id,
        request.starts_at,
        request.duration_minutes,
    )?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// List a commitment's sessions
pub async fn list_sessions_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(commitment_id): Path<String>,
) -> Result<Json<Vec<Session>>, ServiceError> {
    let sessions = state.service.list_sessions(&user, &commitment_id)?;
    Ok(Json(sessions))
}

/// Tutor marks a session completed
pub async fn complete_session_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<CompleteSessionRequest>,
) -> Result<Json<Session>, ServiceError> {
    let session = state
        .service
        .complete_session(&user, &id, request.notes.as_deref())?;
    Ok(Json(session))
}

/// Either participant cancels a scheduled session
pub async fn cancel_session_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Session>, ServiceError> {
    let session = state.service.cancel_session(&user, &id)?;
    Ok(Json(session))
}
