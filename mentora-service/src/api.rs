//! HTTP API for the Mentora service.
//!
//! This module provides the REST API endpoints for:
//! - Health and metrics monitoring
//! - Accounts, tutors, commitments, sessions, quizzes
//! - Chat, notifications, payments, moderation
//! - WebSocket connections (chat and notification push)

use axum::{
    Json, Router,
    extract::{State, WebSocketUpgrade},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post, put},
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::service::MentoraService;
use crate::websocket::{SocketKind, handle_socket};

pub mod auth;
pub mod chat;
pub mod commitments;
pub mod notifications;
pub mod payments;
pub mod quizzes;
pub mod reports;
pub mod sessions;
pub mod settings;
pub mod tutors;
pub mod users;

use auth::{login_handler, logout_handler, me_handler, register_handler};
use chat::{
    create_conversation_handler, list_conversations_handler, list_messages_handler,
    mark_read_handler, send_message_handler,
};
use commitments::{
    accept_commitment_handler, cancel_commitment_handler, complete_commitment_handler,
    create_commitment_handler, decline_commitment_handler, get_commitment_handler,
    list_commitments_handler,
};
use notifications::{
    list_notifications_handler, mark_all_notifications_read_handler,
    mark_notification_read_handler,
};
use payments::{checkout_handler, list_payments_handler, payment_webhook_handler};
use quizzes::{
    create_quiz_handler, get_quiz_handler, get_quiz_result_handler, list_quizzes_handler,
    submit_quiz_handler,
};
use reports::{
    create_report_handler, list_admin_reports_handler, list_my_reports_handler,
    resolve_report_handler,
};
use sessions::{
    cancel_session_handler, complete_session_handler, create_session_handler,
    list_sessions_handler,
};
use settings::{get_settings_handler, update_settings_handler};
use tutors::{
    get_tutor_handler, list_tutors_handler, recommended_tutors_handler, upsert_tutor_handler,
};
use users::{
    get_user_handler, link_student_handler, list_linked_students_handler, list_users_handler,
    reinstate_user_handler, suspend_user_handler, update_me_handler,
};

/// Application state
pub struct AppState {
    pub service: Arc<MentoraService>,
    pub start_time: Instant,
    pub metrics: PrometheusHandle,
}

/// Build the API router
pub fn router(service: Arc<MentoraService>, metrics: PrometheusHandle) -> Router {
    let state = Arc::new(AppState {
        service,
        start_time: Instant::now(),
        metrics,
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Auth
        .route("/auth/register", post(register_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler))
        .route("/auth/me", get(me_handler))
        // Users
        .route("/users/me", put(update_me_handler))
        .route("/users/me/students", get(list_linked_students_handler))
        .route("/users/me/students", post(link_student_handler))
        .route("/users/{id}", get(get_user_handler))
        // Tutors
        .route("/tutors", get(list_tutors_handler))
        .route("/tutors/me", put(upsert_tutor_handler))
        .route("/tutors/recommended", get(recommended_tutors_handler))
        .route("/tutors/{id}", get(get_tutor_handler))
        // Commitments
        .route("/commitments", get(list_commitments_handler))
        .route("/commitments", post(create_commitment_handler))
        .route("/commitments/{id}", get(get_commitment_handler))
        .route("/commitments/{id}/accept", post(accept_commitment_handler))
        .route("/commitments/{id}/decline", post(decline_commitment_handler))
        .route("/commitments/{id}/cancel", post(cancel_commitment_handler))
        .route(
            "/commitments/{id}/complete",
            post(complete_commitment_handler),
        )
        .route("/commitments/{id}/sessions", get(list_sessions_handler))
        .route("/commitments/{id}/sessions", post(create_session_handler))
        .route("/commitments/{id}/quizzes", get(list_quizzes_handler))
        // Sessions
        .route("/sessions/{id}/complete", post(complete_session_handler))
        .route("/sessions/{id}/cancel", post(cancel_session_handler))
        // Quizzes
        .route("/quizzes", post(create_quiz_handler))
        .route("/quizzes/{id}", get(get_quiz_handler))
        .route("/quizzes/{id}/submit", post(submit_quiz_handler))
        .route("/quizzes/{id}/result", get(get_quiz_result_handler))
        // Chat
        .route("/conversations", get(list_conversations_handler))
        .route("/conversations", post(create_conversation_handler))
        .route("/conversations/{id}/messages", get(list_messages_handler))
        .route("/conversations/{id}/messages", post(send_message_handler))
        .route("/conversations/{id}/read", post(mark_read_handler))
        // Notifications
        .route("/notifications", get(list_notifications_handler))
        .route(
            "/notifications/read-all",
            post(mark_all_notifications_read_handler),
        )
        .route(
            "/notifications/{id}/read",
            post(mark_notification_read_handler),
        )
        // Payments
        .route("/payments", get(list_payments_handler))
        .route("/payments/checkout", post(checkout_handler))
        .route("/payments/webhook", post(payment_webhook_handler))
        // Moderation
        .route("/reports", get(list_my_reports_handler))
        .route("/reports", post(create_report_handler))
        // Admin
        .route("/admin/users", get(list_users_handler))
        .route("/admin/users/{id}/suspend", post(suspend_user_handler))
        .route("/admin/users/{id}/reinstate", post(reinstate_user_handler))
        .route("/admin/reports", get(list_admin_reports_handler))
        .route("/admin/reports/{id}/resolve", post(resolve_report_handler))
        .route("/admin/settings", get(get_settings_handler))
        .route("/admin/settings", put(update_settings_handler));

    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/ws/chat", get(chat_ws_handler))
        .route("/ws/notifications", get(notifications_ws_handler))
        .nest("/api", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// === Health & Metrics ===

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let embeddings_available = state
        .service
        .embeddings
        .health_check()
        .await
        .unwrap_or(false);

    let status = if embeddings_available {
        "healthy"
    } else {
        "degraded: embedding provider unavailable"
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        embeddings_available,
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    uptime_seconds: u64,
    embeddings_available: bool,
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

// === WebSockets ===

async fn chat_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    info!("Chat WebSocket upgrade request received");
    ws.on_upgrade(move |socket| {
        handle_socket(
            socket,
            SocketKind::Chat,
            state.service.chat_sockets.clone(),
            state.service.clone(),
        )
    })
}

async fn notifications_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    info!("Notification WebSocket upgrade request received");
    ws.on_upgrade(move |socket| {
        handle_socket(
            socket,
            SocketKind::Notifications,
            state.service.notify_sockets.clone(),
            state.service.clone(),
        )
    })
}
