//! Learning commitment endpoints.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::CurrentUser;
use crate::db::Commitment;
use crate::error::ServiceError;

use super::AppState;

/// Request body for POST /api/commitments
#[derive(Deserialize)]
pub struct CreateCommitmentRequest {
    pub tutor_id: String,
    pub subject: String,
    #[serde(default)]
    pub goal: String,
    pub sessions_per_week: i64,
    pub rate_cents: i64,
}

/// Student requests a commitment
pub async fn create_commitment_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(request): Json<CreateCommitmentRequest>,
) -> Result<(StatusCode, Json<Commitment>), ServiceError> {
    let commitment = state.service.create_commitment(
        &user,
        &request.tutor_id,
        &request.subject,
        &request.goal,
        request.sessions_per_week,
        request.rate_cents,
    )?;
    Ok((StatusCode::CREATED, Json(commitment)))
}

/// List the caller's commitments
pub async fn list_commitments_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<Vec<Commitment>>, ServiceError> {
    let commitments = state.service.list_commitments(&user)?;
    Ok(Json(commitments))
}

/// Get a single commitment
pub async fn get_commitment_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Commitment>, ServiceError> {
    let commitment = state.service.get_commitment_for(&user, &id)?;
    Ok(Json(commitment))
}

/// Tutor accepts a pending commitment
pub async fn accept_commitment_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Commitment>, ServiceError> {
    let commitment = state.service.accept_commitment(&user, &id)?;
    Ok(Json(commitment))
}

/// Tutor declines a pending commitment
pub async fn decline_commitment_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Commitment>, ServiceError> {
    let commitment = state.service.decline_commitment(&user, &id)?;
    Ok(Json(commitment))
}

/// Either participant cancels
pub async fn cancel_commitment_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Commitment>, ServiceError> {
    let commitment = state.service.cancel_commitment(&user, &id)?;
    Ok(Json(commitment))
}

/// Tutor marks an active commitment completed
pub async fn complete_commitment_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Commitment>, ServiceError> {
    let commitment = state.service.complete_commitment(&user, &id)?;
    Ok(Json(commitment))
}
