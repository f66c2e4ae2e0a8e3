//! Quiz endpoints.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::CurrentUser;
use crate::db::{Quiz, QuizQuestion, QuizSubmission};
use crate::error::ServiceError;
use crate::service::QuizView;

use super::AppState;

/// Request body for POST /api/quizzes
#[derive(Deserialize)]
pub struct CreateQuizRequest {
    pub commitment_id: String,
    pub title: String,
    pub questions: Vec<QuizQuestion>,
}

/// Request body for POST /api/quizzes/{id}/submit
#[derive(Deserialize)]
pub struct SubmitQuizRequest {
    pub answers: Vec<Vec<usize>>,
}

/// Tutor creates a quiz under an active commitment
pub async fn create_quiz_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(request): Json<CreateQuizRequest>,
) -> Result<(StatusCode, Json<Quiz>), ServiceError> {
    let quiz = state.service.create_quiz(
        &user,
        &request.commitment_id,
        &request.title,
        request.questions,
    )?;
    Ok((StatusCode::CREATED, Json(quiz)))
}

/// Get a quiz. Students see the answer key only after submitting.
pub async fn get_quiz_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<QuizView>, ServiceError> {
    let view = state.service.get_quiz_view(&user, &id)?;
    Ok(Json(view))
}

/// List a commitment's quizzes
pub async fn list_quizzes_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(commitment_id): Path<String>,
) -> Result<Json<Vec<QuizView>>, ServiceError> {
    let quizzes = state.service.list_quizzes(&user, &commitment_id)?;
    Ok(Json(quizzes))
}

/// Student submits answers; grading is immediate
pub async fn submit_quiz_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<SubmitQuizRequest>,
) -> Result<(StatusCode, Json<QuizSubmission>), ServiceError> {
    let submission = state.service.submit_quiz(&user, &id, request.answers)?;
    Ok((StatusCode::CREATED, Json(submission)))
}

/// Get the graded result (404 until submitted)
pub async fn get_quiz_result_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<QuizSubmission>, ServiceError> {
    let submission = state.service.get_quiz_result(&user, &id)?;
    Ok(Json(submission))
}
