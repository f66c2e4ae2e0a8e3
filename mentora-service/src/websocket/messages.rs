//! WebSocket message types.
//!
//! Defines the client-to-server and server-to-client message formats
//! for the chat and notification sockets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{ChatMessage, Notification};

/// Messages sent from client to server
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Authenticate the connection with a bearer token
    Auth { token: String },
    /// Keepalive ping
    Ping,
    /// Send a chat message into a conversation
    SendMessage {
        conversation_id: String,
        body: String,
    },
    /// Mark all peer messages in a conversation read
    MarkRead { conversation_id: String },
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Response to authentication attempt
    AuthResponse {
        success: bool,
        session_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Keepalive pong response
    Pong { timestamp: u64 },
    /// Error message
    Error {
        code: String,
        message: String,
        recoverable: bool,
    },
    /// A chat message was delivered to one of the user's conversations
    Message {
        conversation_id: String,
        id: String,
        sender_id: String,
        body: String,
        sent_at: DateTime<Utc>,
    },
    /// The peer read the conversation
    MessagesRead {
        conversation_id: String,
        reader_id: String,
    },
    /// A notification was created for this user
    Notification {
        id: String,
        kind: String,
        body: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        payload: Option<serde_json::Value>,
        created_at: DateTime<Utc>,
    },
}

impl From<&ChatMessage> for ServerMessage {
    fn from(message: &ChatMessage) -> Self {
        ServerMessage::Message {
            conversation_id: message.conversation_id.clone(),
            id: message.id.clone(),
            sender_id: message.sender_id.clone(),
            body: message.body.clone(),
            sent_at: message.sent_at,
        }
    }
}

impl From<&Notification> for ServerMessage {
    fn from(notification: &Notification) -> Self {
        ServerMessage::Notification {
            id: notification.id.clone(),
            kind: notification.kind.as_str().to_string(),
            body: notification.body.clone(),
            payload: notification.payload.clone(),
            created_at: notification.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::NotificationKind;

    #[test]
    fn test_client_message_deserialization() {
        let auth_json = r#"{"type":"auth","token":"abc123"}"#;
        let msg: ClientMessage = serde_json::from_str(auth_json).unwrap();
        match msg {
            ClientMessage::Auth { token } => assert_eq!(token, "abc123"),
            _ => panic!("Expected Auth message"),
        }

        let ping_json = r#"{"type":"ping"}"#;
        let msg: ClientMessage = serde_json::from_str(ping_json).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));

        let send_json = r#"{"type":"send_message","conversation_id":"c1","body":"Hello"}"#;
        let msg: ClientMessage = serde_json::from_str(send_json).unwrap();
        match msg {
            ClientMessage::SendMessage {
                conversation_id,
                body,
            } => {
                assert_eq!(conversation_id, "c1");
                assert_eq!(body, "Hello");
            }
            _ => panic!("Expected SendMessage"),
        }

        let read_json = r#"{"type":"mark_read","conversation_id":"c1"}"#;
        let msg: ClientMessage = serde_json::from_str(read_json).unwrap();
        assert!(matches!(
            msg,
            ClientMessage::MarkRead { conversation_id } if conversation_id == "c1"
        ));
    }

    #[test]
    fn test_server_message_serialization() {
        let auth_response = ServerMessage::AuthResponse {
            success: true,
            session_id: "session123".to_string(),
            message: None,
        };
        let json = serde_json::to_string(&auth_response).unwrap();
        assert!(json.contains(r#""type":"auth_response""#));
        assert!(json.contains(r#""success":true"#));
        assert!(!json.contains("message")); // should be skipped when None

        let message = ServerMessage::Message {
            conversation_id: "c1".to_string(),
            id: "m1".to_string(),
            sender_id: "u1".to_string(),
            body: "Hello".to_string(),
            sent_at: Utc::now(),
        };
        let json = serde_json::to_string(&message).unwrap();
        assert!(json.contains(r#""type":"message""#));
        assert!(json.contains(r#""conversation_id":"c1""#));

        let error = ServerMessage::Error {
            code: "not_authenticated".to_string(),
            message: "Authenticate first".to_string(),
            recoverable: true,
        };
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains(r#""type":"error""#));
        assert!(json.contains(r#""recoverable":true"#));
    }

    #[test]
    fn test_notification_conversion() {
        let notification = Notification {
            id: "n1".to_string(),
            user_id: "u1".to_string(),
            kind: NotificationKind::SessionScheduled,
            body: "Session scheduled for Friday".to_string(),
            payload: Some(serde_json::json!({"session_id": "s1"})),
            read: false,
            created_at: Utc::now(),
        };

        let msg: ServerMessage = (&notification).into();
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"notification""#));
        assert!(json.contains(r#""kind":"session_scheduled""#));
        assert!(json.contains(r#""session_id":"s1""#));
    }
}
