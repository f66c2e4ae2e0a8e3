use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Main service error type
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("User not found: {user_id}")]
    UserNotFound { user_id: String },

    #[error("Tutor not found: {tutor_id}")]
    TutorNotFound { tutor_id: String },

    #[error("Commitment not found: {commitment_id}")]
    CommitmentNotFound { commitment_id: String },

    #[error("Session not found: {session_id}")]
    SessionNotFound { session_id: String },

    #[error("Quiz not found: {quiz_id}")]
    QuizNotFound { quiz_id: String },

    #[error("No submission yet for quiz: {quiz_id}")]
    SubmissionNotFound { quiz_id: String },

    #[error("Conversation not found: {conversation_id}")]
    ConversationNotFound { conversation_id: String },

    #[error("Payment not found: {payment_id}")]
    PaymentNotFound { payment_id: String },

    #[error("Report not found: {report_id}")]
    ReportNotFound { report_id: String },

    #[error("Notification not found: {notification_id}")]
    NotificationNotFound { notification_id: String },

    #[error("Email already registered")]
    EmailTaken,

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("{0}")]
    Gateway(#[from] GatewayError),

    #[error("{0}")]
    Mail(#[from] MailError),

    #[error("Embedding error")]
    Embedding(#[from] EmbeddingError),

    #[error("Database error")]
    Database(#[from] DatabaseError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Payment gateway client errors
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Connection failed to payment gateway at {url}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Gateway rejected the request (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid response from payment gateway")]
    InvalidResponse {
        #[source]
        source: serde_json::Error,
    },

    #[error("Webhook signature verification failed")]
    InvalidSignature,
}

/// Mail provider client errors
#[derive(Error, Debug)]
pub enum MailError {
    #[error("Connection failed to mail provider at {url}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Mail provider rejected the message (status {status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Embedding provider errors
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Connection failed to embedding provider at {url}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Model not found: {model}")]
    ModelNotFound { model: String },

    #[error("Embedding generation failed (status {status}): {message}")]
    Generation { status: u16, message: String },

    #[error("Invalid response from embedding provider")]
    InvalidResponse {
        #[source]
        source: serde_json::Error,
    },
}

/// Database errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database connection failed")]
    Connection(#[source] rusqlite::Error),

    #[error("Query failed")]
    Query(#[source] rusqlite::Error),

    #[error("Migration failed: {message}")]
    Migration { message: String },

    #[error("Serialization failed")]
    Serialization(#[source] serde_json::Error),
}

/// API error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::UserNotFound { .. }
            | ServiceError::TutorNotFound { .. }
            | ServiceError::CommitmentNotFound { .. }
            | ServiceError::SessionNotFound { .. }
            | ServiceError::QuizNotFound { .. }
            | ServiceError::SubmissionNotFound { .. }
            | ServiceError::ConversationNotFound { .. }
            | ServiceError::PaymentNotFound { .. }
            | ServiceError::ReportNotFound { .. }
            | ServiceError::NotificationNotFound { .. } => StatusCode::NOT_FOUND,
            ServiceError::EmailTaken | ServiceError::Conflict { .. } => StatusCode::CONFLICT,
            ServiceError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ServiceError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            ServiceError::Gateway(GatewayError::InvalidSignature) => StatusCode::UNAUTHORIZED,
            ServiceError::Gateway(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ServiceError::UserNotFound { .. } => "user_not_found",
            ServiceError::TutorNotFound { .. } => "tutor_not_found",
            ServiceError::CommitmentNotFound { .. } => "commitment_not_found",
            ServiceError::SessionNotFound { .. } => "session_not_found",
            ServiceError::QuizNotFound { .. } => "quiz_not_found",
            ServiceError::SubmissionNotFound { .. } => "submission_not_found",
            ServiceError::ConversationNotFound { .. } => "conversation_not_found",
            ServiceError::PaymentNotFound { .. } => "payment_not_found",
            ServiceError::ReportNotFound { .. } => "report_not_found",
            ServiceError::NotificationNotFound { .. } => "notification_not_found",
            ServiceError::EmailTaken => "email_taken",
            ServiceError::Unauthorized { .. } => "unauthorized",
            ServiceError::Forbidden { .. } => "forbidden",
            ServiceError::Conflict { .. } => "conflict",
            ServiceError::Validation { .. } => "validation_failed",
            ServiceError::InvalidRequest { .. } => "invalid_request",
            ServiceError::Gateway(GatewayError::InvalidSignature) => "invalid_signature",
            ServiceError::Gateway(_) => "gateway_error",
            ServiceError::Mail(_) => "mail_error",
            ServiceError::Embedding(_) => "embedding_error",
            ServiceError::Database(_) => "database_error",
            ServiceError::Config { .. } => "config_error",
            ServiceError::Internal { .. } => "internal_error",
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code().to_string();

        // 5xx details stay in the logs, not in the response body
        let message = if status.is_server_error() {
            tracing::error!(error = %self, code = %code, "Request failed");
            "Internal error".to_string()
        } else {
            self.to_string()
        };

        let response = ErrorResponse {
            message,
            code: Some(code),
            details: None,
        };

        (status, Json(response)).into_response()
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ServiceError::UserNotFound {
                user_id: "u1".into()
            }
            .status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ServiceError::EmailTaken.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ServiceError::Validation {
                message: "bad".into()
            }
            .status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ServiceError::Gateway(GatewayError::InvalidSignature).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServiceError::Forbidden {
                message: "no".into()
            }
            .status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(
            ServiceError::Conflict {
                message: "x".into()
            }
            .error_code(),
            "conflict"
        );
        assert_eq!(
            ServiceError::Unauthorized {
                message: "x".into()
            }
            .error_code(),
            "unauthorized"
        );
        assert_eq!(
            ServiceError::Gateway(GatewayError::InvalidSignature).error_code(),
            "invalid_signature"
        );
    }
}
