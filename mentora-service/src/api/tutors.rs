//! Tutor profile and recommendation endpoints.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::CurrentUser;
use crate::db::TutorProfile;
use crate::error::ServiceError;
use crate::service::RecommendedTutor;

use super::AppState;

/// Request body for PUT /api/tutors/me
#[derive(Deserialize)]
pub struct UpsertTutorRequest {
    pub headline: String,
    #[serde(default)]
    pub bio: String,
    pub subjects: Vec<String>,
    pub hourly_rate_cents: i64,
}

/// Query parameters for GET /api/tutors
#[derive(Deserialize)]
pub struct ListTutorsParams {
    pub subject: Option<String>,
    pub limit: Option<usize>,
}

/// Query parameters for GET /api/tutors/recommended
#[derive(Deserialize)]
pub struct RecommendedParams {
    pub query: Option<String>,
    pub limit: Option<usize>,
}

/// Create or update the caller's tutor profile
pub async fn upsert_tutor_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(request): Json<UpsertTutorRequest>,
) -> Result<Json<TutorProfile>, ServiceError> {
    let profile = state.service.upsert_tutor_profile(
        &user,
        &request.headline,
        &request.bio,
        request.subjects,
        request.hourly_rate_cents,
    )?;
    Ok(Json(profile))
}

/// Public tutor listing
pub async fn list_tutors_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListTutorsParams>,
) -> Result<Json<Vec<TutorProfile>>, ServiceError> {
    let limit = params.limit.unwrap_or(50).min(200);
    let tutors = state.service.list_tutors(params.subject.as_deref(), limit)?;
    Ok(Json(tutors))
}

/// Get a tutor's profile
pub async fn get_tutor_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TutorProfile>, ServiceError> {
    let profile = state.service.get_tutor_profile(&id)?;
    Ok(Json(profile))
}

/// Recommend tutors for the caller via embedding similarity
pub async fn recommended_tutors_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Query(params): Query<RecommendedParams>,
) -> Result<Json<Vec<RecommendedTutor>>, ServiceError> {
    let recommendations = state
        .service
        .recommend_tutors(&user, params.query, params.limit)
        .await?;
    Ok(Json(recommendations))
}
