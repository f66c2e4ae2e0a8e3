//! Notification endpoints.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::CurrentUser;
use crate::db::Notification;
use crate::error::ServiceError;

use super::AppState;

/// Query parameters for GET /api/notifications
#[derive(Deserialize)]
pub struct ListNotificationsParams {
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<usize>,
}

/// Response for POST /api/notifications/read-all
#[derive(Serialize)]
pub struct ReadAllResponse {
    pub marked: usize,
}

/// List the caller's notifications
pub async fn list_notifications_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Query(params): Query<ListNotificationsParams>,
) -> Result<Json<Vec<Notification>>, ServiceError> {
    let limit = params.limit.unwrap_or(50).min(200);
    let notifications = state
        .service
        .list_notifications(&user.id, params.unread_only, limit)?;
    Ok(Json(notifications))
}

/// Mark a single notification read
pub async fn mark_notification_read_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    state.service.mark_notification_read(&user.id, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Mark every notification read
pub async fn mark_all_notifications_read_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<ReadAllResponse>, ServiceError> {
    let marked = state.service.mark_all_notifications_read(&user.id)?;
    Ok(Json(ReadAllResponse { marked }))
}
