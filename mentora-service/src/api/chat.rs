//! Conversation and message endpoints.
//!
//! REST mirrors the chat socket: sends from either surface reach the
//! same service path and the same live connections.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::CurrentUser;
use crate::db::{ChatMessage, Conversation};
use crate::error::ServiceError;
use crate::service::ConversationSummary;

use super::AppState;

/// Request body for POST /api/conversations
#[derive(Deserialize)]
pub struct CreateConversationRequest {
    pub peer_id: String,
}

/// Query parameters for GET /api/conversations/{id}/messages
#[derive(Deserialize)]
pub struct ListMessagesParams {
    pub before: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

/// Request body for POST /api/conversations/{id}/messages
#[derive(Deserialize)]
pub struct SendMessageRequest {
    pub body: String,
}

/// Response for POST /api/conversations/{id}/read
#[derive(Serialize)]
pub struct MarkReadResponse {
    pub marked: usize,
}

/// Create (or return) the conversation with a peer
pub async fn create_conversation_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(request): Json<CreateConversationRequest>,
) -> Result<Json<Conversation>, ServiceError> {
    let conversation = state.service.ensure_conversation(&user, &request.peer_id)?;
    Ok(Json(conversation))
}

/// List the caller's conversations with unread counts
pub async fn list_conversations_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<Vec<ConversationSummary>>, ServiceError> {
    let conversations = state.service.list_conversations(&user)?;
    Ok(Json(conversations))
}

/// Page through a conversation's messages, newest first
pub async fn list_messages_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Query(params): Query<ListMessagesParams>,
) -> Result<Json<Vec<ChatMessage>>, ServiceError> {
    let messages = state
        .service
        .list_messages(&user, &id, params.before, params.limit)?;
    Ok(Json(messages))
}

/// Send a message over REST
pub async fn send_message_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<ChatMessage>), ServiceError> {
    let message = state.service.send_chat_message(&user.id, &id, &request.body)?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// Mark all peer messages in a conversation read
pub async fn mark_read_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<MarkReadResponse>, ServiceError> {
    let marked = state.service.mark_conversation_read(&user.id, &id)?;
    Ok(Json(MarkReadResponse { marked }))
}
