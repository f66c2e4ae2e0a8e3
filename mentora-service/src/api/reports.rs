//! Violation report endpoints.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::CurrentUser;
use crate::db::{ReportDecision, ReportStatus, ViolationReport};
use crate::error::ServiceError;

use super::AppState;

/// Request body for POST /api/reports
#[derive(Deserialize)]
pub struct CreateReportRequest {
    pub tutor_id: String,
    pub commitment_id: Option<String>,
    pub description: String,
}

/// Query parameters for GET /api/admin/reports
#[derive(Deserialize)]
pub struct ListReportsParams {
    pub status: Option<ReportStatus>,
}

/// Request body for POST /api/admin/reports/{id}/resolve
#[derive(Deserialize)]
pub struct ResolveReportRequest {
    pub decision: ReportDecision,
    #[serde(default)]
    pub note: String,
}

/// File a violation report against a tutor
pub async fn create_report_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(request): Json<CreateReportRequest>,
) -> Result<(StatusCode, Json<ViolationReport>), ServiceError> {
    let report = state.service.file_report(
        &user,
        &request.tutor_id,
        request.commitment_id.as_deref(),
        &request.description,
    )?;
    Ok((StatusCode::CREATED, Json(report)))
}

/// List the caller's own reports
pub async fn list_my_reports_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<Vec<ViolationReport>>, ServiceError> {
    let reports = state.service.list_my_reports(&user)?;
    Ok(Json(reports))
}

/// Admin: list reports for review
pub async fn list_admin_reports_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Query(params): Query<ListReportsParams>,
) -> Result<Json<Vec<ViolationReport>>, ServiceError> {
    user.require_admin()?;
    let reports = state.service.list_reports(params.status)?;
    Ok(Json(reports))
}

/// Admin: resolve an open report
pub async fn resolve_report_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<ResolveReportRequest>,
) -> Result<Json<ViolationReport>, ServiceError> {
    user.require_admin()?;
    let report = state
        .service
        .resolve_report(&id, request.decision, &request.note)?;
    Ok(Json(report))
}
