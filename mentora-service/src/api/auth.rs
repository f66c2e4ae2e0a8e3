//! Authentication endpoints.

use axum::{Json, extract::State, http::StatusCode};
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::CurrentUser;
use crate::db::{Role, User};
use crate::error::ServiceError;

use super::AppState;

/// Request body for POST /api/auth/register
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub role: Role,
}

/// Request body for POST /api/auth/login
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response for POST /api/auth/login
#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

/// Register a new account
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), ServiceError> {
    let user = state.service.register(
        &request.email,
        &request.password,
        &request.display_name,
        request.role,
    )?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Log in and receive a bearer token
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ServiceError> {
    let (token, expires_at, user) = state.service.login(&request.email, &request.password)?;
    Ok(Json(LoginResponse {
        token,
        expires_at,
        user,
    }))
}

/// Revoke the presented token
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
) -> Result<StatusCode, ServiceError> {
    state.service.logout(bearer.token())?;
    Ok(StatusCode::NO_CONTENT)
}

/// Get the authenticated user
pub async fn me_handler(user: CurrentUser) -> Json<User> {
    Json(user.0)
}
