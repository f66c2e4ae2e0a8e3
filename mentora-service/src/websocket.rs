//! WebSocket support for real-time chat and notification push.
//!
//! Two socket endpoints share one connection-manager design: `/ws/chat`
//! is bidirectional (send messages, mark read), `/ws/notifications` is
//! push-only. Connections authenticate with the same bearer tokens as
//! the REST API before any other message is accepted.

use axum::extract::ws::{Message, WebSocket};
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::auth::token_digest;
use crate::db::AccountStatus;
use crate::service::MentoraService;

pub mod messages;

pub use messages::{ClientMessage, ServerMessage};

/// State for a single WebSocket connection
struct ConnectionState {
    user_id: Option<String>,
    tx: mpsc::UnboundedSender<ServerMessage>,
}

impl ConnectionState {
    fn authenticated(&self) -> bool {
        self.user_id.is_some()
    }
}

/// Manager for the connections of one socket endpoint.
///
/// Handles connection lifecycle and per-user fan-out; a user may hold
/// several live connections (multiple tabs/devices).
pub struct SocketManager {
    connections: DashMap<String, ConnectionState>,
}

impl Default for SocketManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SocketManager {
    /// Create a new socket manager
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Add a new connection
    fn add_connection(&self, session_id: String, tx: mpsc::UnboundedSender<ServerMessage>) {
        debug!(session_id = %session_id, "Adding WebSocket connection");
        self.connections
            .insert(session_id, ConnectionState { user_id: None, tx });
    }

    /// Remove a connection
    fn remove_connection(&self, session_id: &str) {
        debug!(session_id = %session_id, "Removing WebSocket connection");
        self.connections.remove(session_id);
    }

    /// Bind a connection to a verified user
    fn authenticate(&self, session_id: &str, user_id: String) {
        if let Some(mut conn) = self.connections.get_mut(session_id) {
            conn.user_id = Some(user_id);
        }
    }

    /// Get the authenticated user for a session, if any
    pub fn user_of(&self, session_id: &str) -> Option<String> {
        self.connections
            .get(session_id)
            .and_then(|conn| conn.user_id.clone())
    }

    /// Send a message to a specific connection
    pub fn send_to(&self, session_id: &str, msg: ServerMessage) {
        if let Some(conn) = self.connections.get(session_id)
            && conn.tx.send(msg).is_err()
        {
            warn!(session_id = %session_id, "Failed to send message to connection");
        }
    }

    /// Send a message to every live connection of a user.
    /// Returns how many connections received it.
    pub fn send_to_user(&self, user_id: &str, msg: ServerMessage) -> usize {
        let mut sent_count = 0;

        for entry in self.connections.iter() {
            let conn = entry.value();
            if conn.user_id.as_deref() == Some(user_id) && conn.tx.send(msg.clone()).is_ok() {
                sent_count += 1;
            }
        }

        sent_count
    }

    /// Whether the user has at least one authenticated connection
    pub fn is_user_connected(&self, user_id: &str) -> bool {
        self.connections
            .iter()
            .any(|entry| entry.value().user_id.as_deref() == Some(user_id))
    }

    /// Number of live connections
    #[allow(dead_code)] // Useful for monitoring/debugging
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

/// Which endpoint a connection came in on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketKind {
    Chat,
    Notifications,
}

/// Handle a WebSocket connection for either endpoint.
///
/// Manages the connection lifecycle, processes incoming messages, and
/// forwards outgoing messages from the per-connection channel.
pub async fn handle_socket(
    socket: WebSocket,
    kind: SocketKind,
    manager: Arc<SocketManager>,
    service: Arc<MentoraService>,
) {
    let session_id = uuid::Uuid::new_v4().to_string();
    info!(session_id = %session_id, kind = ?kind, "New WebSocket connection");

    // Split the socket into sender and receiver
    let (mut ws_tx, mut ws_rx) = socket.split();

    // Create a channel for sending messages to this connection
    let (msg_tx, mut msg_rx) = mpsc::unbounded_channel::<ServerMessage>();

    manager.add_connection(session_id.clone(), msg_tx);

    // Forward messages from the channel to the WebSocket
    let session_id_clone = session_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = msg_rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if ws_tx.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!(error = %e, "Failed to serialize WebSocket message");
                }
            }
        }
        debug!(session_id = %session_id_clone, "WebSocket send task ended");
    });

    // Process incoming messages
    while let Some(result) = ws_rx.next().await {
        match result {
            Ok(Message::Text(text)) => {
                handle_client_message(&session_id, kind, &text, &manager, &service).await;
            }
            Ok(Message::Binary(data)) => {
                if let Ok(text) = String::from_utf8(data.to_vec()) {
                    handle_client_message(&session_id, kind, &text, &manager, &service).await;
                }
            }
            Ok(Message::Ping(data)) => {
                // axum replies with a pong automatically
                debug!(session_id = %session_id, "Received ping: {:?}", data);
            }
            Ok(Message::Pong(_)) => {
                // Connection is alive
            }
            Ok(Message::Close(_)) => {
                info!(session_id = %session_id, "WebSocket connection closed by client");
                break;
            }
            Err(e) => {
                error!(session_id = %session_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Clean up
    manager.remove_connection(&session_id);
    send_task.abort();
    info!(session_id = %session_id, "WebSocket connection closed");
}

/// Handle a client message
async fn handle_client_message(
    session_id: &str,
    kind: SocketKind,
    text: &str,
    manager: &Arc<SocketManager>,
    service: &Arc<MentoraService>,
) {
    let msg: ClientMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!(
                session_id = %session_id,
                error = %e,
                "Failed to parse client message"
            );
            manager.send_to(
                session_id,
                ServerMessage::Error {
                    code: "parse_error".to_string(),
                    message: format!("Failed to parse message: {}", e),
                    recoverable: true,
                },
            );
            return;
        }
    };

    match msg {
        ClientMessage::Auth { token } => {
            let digest = token_digest(&token);
            let user = match service.db.get_user_by_token_hash(&digest) {
                Ok(Some(user)) if user.status == AccountStatus::Active => user,
                Ok(_) => {
                    manager.send_to(
                        session_id,
                        ServerMessage::AuthResponse {
                            success: false,
                            session_id: session_id.to_string(),
                            message: Some("Invalid or expired token".to_string()),
                        },
                    );
                    return;
                }
                Err(e) => {
                    error!(session_id = %session_id, error = %e, "Token lookup failed");
                    manager.send_to(
                        session_id,
                        ServerMessage::AuthResponse {
                            success: false,
                            session_id: session_id.to_string(),
                            message: Some("Authentication failed".to_string()),
                        },
                    );
                    return;
                }
            };

            manager.authenticate(session_id, user.id.clone());
            manager.send_to(
                session_id,
                ServerMessage::AuthResponse {
                    success: true,
                    session_id: session_id.to_string(),
                    message: None,
                },
            );

            info!(
                session_id = %session_id,
                user_id = %user.id,
                "WebSocket connection authenticated"
            );
        }
        ClientMessage::Ping => {
            let timestamp = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0);

            manager.send_to(session_id, ServerMessage::Pong { timestamp });
        }
        ClientMessage::SendMessage {
            conversation_id,
            body,
        } => {
            if kind != SocketKind::Chat {
                manager.send_to(
                    session_id,
                    ServerMessage::Error {
                        code: "unsupported".to_string(),
                        message: "This socket does not accept chat messages".to_string(),
                        recoverable: false,
                    },
                );
                return;
            }

            let Some(user_id) = manager.user_of(session_id) else {
                manager.send_to(
                    session_id,
                    ServerMessage::Error {
                        code: "not_authenticated".to_string(),
                        message: "Authenticate first".to_string(),
                        recoverable: false,
                    },
                );
                return;
            };

            if let Err(e) = service.send_chat_message(&user_id, &conversation_id, &body) {
                manager.send_to(
                    session_id,
                    ServerMessage::Error {
                        code: "send_failed".to_string(),
                        message: e.to_string(),
                        recoverable: true,
                    },
                );
            }
        }
        ClientMessage::MarkRead { conversation_id } => {
            if kind != SocketKind::Chat {
                return;
            }

            let Some(user_id) = manager.user_of(session_id) else {
                manager.send_to(
                    session_id,
                    ServerMessage::Error {
                        code: "not_authenticated".to_string(),
                        message: "Authenticate first".to_string(),
                        recoverable: false,
                    },
                );
                return;
            };

            if let Err(e) = service.mark_conversation_read(&user_id, &conversation_id) {
                debug!(
                    session_id = %session_id,
                    conversation_id = %conversation_id,
                    error = %e,
                    "Mark-read failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_manager_lifecycle() {
        let manager = SocketManager::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        manager.add_connection("session1".to_string(), tx);
        assert_eq!(manager.connection_count(), 1);
        assert!(manager.user_of("session1").is_none());
        assert!(!manager.is_user_connected("u1"));

        manager.authenticate("session1", "u1".to_string());
        assert_eq!(manager.user_of("session1").as_deref(), Some("u1"));
        assert!(manager.is_user_connected("u1"));

        manager.remove_connection("session1");
        assert_eq!(manager.connection_count(), 0);
        assert!(!manager.is_user_connected("u1"));
    }

    #[test]
    fn test_send_to_user_fans_out() {
        let manager = SocketManager::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let (tx3, mut rx3) = mpsc::unbounded_channel();

        manager.add_connection("s1".to_string(), tx1);
        manager.add_connection("s2".to_string(), tx2);
        manager.add_connection("s3".to_string(), tx3);
        manager.authenticate("s1", "u1".to_string());
        manager.authenticate("s2", "u1".to_string());
        manager.authenticate("s3", "u2".to_string());

        let sent = manager.send_to_user("u1", ServerMessage::Pong { timestamp: 1 });
        assert_eq!(sent, 2);

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
        assert!(rx3.try_recv().is_err());
    }
}
