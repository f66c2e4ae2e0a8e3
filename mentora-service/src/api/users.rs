//! User profile, guardian link, and admin user management endpoints.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::CurrentUser;
use crate::db::{AccountStatus, Role, User};
use crate::error::ServiceError;

use super::AppState;

/// Public view of a user
#[derive(Serialize)]
pub struct PublicUser {
    pub id: String,
    pub display_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            display_name: user.display_name,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// Request body for PUT /api/users/me
#[derive(Deserialize)]
pub struct UpdateMeRequest {
    pub display_name: String,
}

/// Request body for POST /api/users/me/students
#[derive(Deserialize)]
pub struct LinkStudentRequest {
    pub student_id: String,
}

/// Query parameters for GET /api/admin/users
#[derive(Deserialize)]
pub struct ListUsersParams {
    pub role: Option<Role>,
    pub status: Option<AccountStatus>,
}

/// Get a user's public profile
pub async fn get_user_handler(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<PublicUser>, ServiceError> {
    let user = state
        .service
        .db
        .get_user(&id)?
        .ok_or(ServiceError::UserNotFound { user_id: id })?;
    Ok(Json(user.into()))
}

/// Update the caller's profile
pub async fn update_me_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(request): Json<UpdateMeRequest>,
) -> Result<Json<User>, ServiceError> {
    let updated = state
        .service
        .update_display_name(&user.id, &request.display_name)?;
    Ok(Json(updated))
}

/// Parent links a student account
pub async fn link_student_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(request): Json<LinkStudentRequest>,
) -> Result<Json<PublicUser>, ServiceError> {
    let student = state.service.link_student(&user, &request.student_id)?;
    Ok(Json(student.into()))
}

/// List the parent's linked students
pub async fn list_linked_students_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<Vec<PublicUser>>, ServiceError> {
    let students = state.service.list_linked_students(&user)?;
    Ok(Json(students.into_iter().map(Into::into).collect()))
}

/// Admin: list users
pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Query(params): Query<ListUsersParams>,
) -> Result<Json<Vec<User>>, ServiceError> {
    user.require_admin()?;
    let users = state.service.db.list_users(params.role, params.status)?;
    Ok(Json(users))
}

/// Admin: suspend an account
pub async fn suspend_user_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<User>, ServiceError> {
    user.require_admin()?;
    let suspended = state.service.suspend_user(&id)?;
    Ok(Json(suspended))
}

/// Admin: reinstate a suspended account
pub async fn reinstate_user_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<User>, ServiceError> {
    user.require_admin()?;
    let reinstated = state.service.reinstate_user(&id)?;
    Ok(Json(reinstated))
}
