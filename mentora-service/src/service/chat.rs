//! Conversations and message delivery.
//!
//! REST sends and socket sends share one path: persist the message,
//! bump the conversation, push to both participants' live chat
//! connections, and fall back to a notification for offline peers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::MentoraService;
use crate::db::{ChatMessage, Conversation, NotificationKind, User};
use crate::error::{ServiceError, ServiceResult};
use crate::websocket::ServerMessage;

/// A conversation with its unread count for one viewer
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub peer_id: String,
    pub unread_count: usize,
}

impl MentoraService {
    /// Create (or return) the conversation between the caller and a peer.
    ///
    /// The pair must share a commitment unless one side is an admin.
    pub fn ensure_conversation(&self, user: &User, peer_id: &str) -> ServiceResult<Conversation> {
        if peer_id == user.id {
            return Err(ServiceError::InvalidRequest {
                message: "Cannot start a conversation with yourself".to_string(),
            });
        }

        let peer = self
            .db
            .get_user(peer_id)?
            .ok_or_else(|| ServiceError::UserNotFound {
                user_id: peer_id.to_string(),
            })?;

        if !user.is_admin()
            && !peer.is_admin()
            && !self.db.users_share_commitment(&user.id, &peer.id)?
        {
            return Err(ServiceError::Forbidden {
                message: "You can only message users you share a commitment with".to_string(),
            });
        }

        if let Some(existing) = self.db.get_conversation_for_pair(&user.id, &peer.id)? {
            return Ok(existing);
        }

        let (a, b) = if user.id <= peer.id {
            (user.id.clone(), peer.id.clone())
        } else {
            (peer.id.clone(), user.id.clone())
        };
        let now = Utc::now();
        let conversation = Conversation {
            id: Uuid::new_v4().to_string(),
            user_a: a,
            user_b: b,
            created_at: now,
            updated_at: now,
        };
        self.db.insert_conversation(&conversation)?;
        Ok(conversation)
    }

    /// List the caller's conversations with unread counts
    pub fn list_conversations(&self, user: &User) -> ServiceResult<Vec<ConversationSummary>> {
        let conversations = self.db.list_conversations_for_user(&user.id)?;

        conversations
            .into_iter()
            .map(|conversation| {
                let unread_count =
                    self.db.count_unread_messages(&conversation.id, &user.id)?;
                let peer_id = conversation.peer_of(&user.id).to_string();
                Ok(ConversationSummary {
                    conversation,
                    peer_id,
                    unread_count,
                })
            })
            .collect()
    }

    /// Page through a conversation's messages, newest first
    pub fn list_messages(
        &self,
        user: &User,
        conversation_id: &str,
        before: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> ServiceResult<Vec<ChatMessage>> {
        let conversation = self.conversation_for_participant(user, conversation_id)?;

        let config = self.runtime_config.dynamic().chat.clone();
        let limit = limit.unwrap_or(config.page_size).min(200);

        self.db.list_messages(&conversation.id, before, limit)
    }

    /// Send a message into a conversation. Shared by the REST handler
    /// and the chat socket.
    pub fn send_chat_message(
        &self,
        sender_id: &str,
        conversation_id: &str,
        body: &str,
    ) -> ServiceResult<ChatMessage> {
        let conversation = self
            .db
            .get_conversation(conversation_id)?
            .ok_or_else(|| ServiceError::ConversationNotFound {
                conversation_id: conversation_id.to_string(),
            })?;

        if !conversation.is_participant(sender_id) {
            return Err(ServiceError::Forbidden {
                message: "Not a participant in this conversation".to_string(),
            });
        }

        let body = body.trim();
        let max_length = self.runtime_config.dynamic().chat.max_message_length;
        if body.is_empty() {
            return Err(ServiceError::Validation {
                message: "Message body is empty".to_string(),
            });
        }
        if body.len() > max_length {
            return Err(ServiceError::Validation {
                message: format!("Message exceeds {} bytes", max_length),
            });
        }

        let now = Utc::now();
        let message = ChatMessage {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation.id.clone(),
            sender_id: sender_id.to_string(),
            body: body.to_string(),
            sent_at: now,
            read: false,
        };
        self.db.insert_message(&message)?;
        self.db.touch_conversation(&conversation.id, now)?;

        // Push to every live connection of both participants (other tabs
        // of the sender included)
        let push: ServerMessage = (&message).into();
        self.chat_sockets.send_to_user(&conversation.user_a, push.clone());
        self.chat_sockets.send_to_user(&conversation.user_b, push);

        // Offline peers get a notification instead
        let peer_id = conversation.peer_of(sender_id);
        if !self.chat_sockets.is_user_connected(peer_id) {
            let sender_name = self
                .db
                .get_user(sender_id)?
                .map(|u| u.display_name)
                .unwrap_or_else(|| "Someone".to_string());
            self.notify(
                peer_id,
                NotificationKind::MessageReceived,
                format!("New message from {}", sender_name),
                Some(serde_json::json!({ "conversation_id": conversation.id })),
            )?;
        }

        metrics::counter!("mentora_messages_sent_total").increment(1);
        Ok(message)
    }

    /// Mark all peer messages in a conversation read and tell the peer
    pub fn mark_conversation_read(
        &self,
        reader_id: &str,
        conversation_id: &str,
    ) -> ServiceResult<usize> {
        let conversation = self
            .db
            .get_conversation(conversation_id)?
            .ok_or_else(|| ServiceError::ConversationNotFound {
                conversation_id: conversation_id.to_string(),
            })?;

        if !conversation.is_participant(reader_id) {
            return Err(ServiceError::Forbidden {
                message: "Not a participant in this conversation".to_string(),
            });
        }

        let marked = self.db.mark_messages_read(&conversation.id, reader_id)?;

        if marked > 0 {
            let peer_id = conversation.peer_of(reader_id);
            self.chat_sockets.send_to_user(
                peer_id,
                ServerMessage::MessagesRead {
                    conversation_id: conversation.id.clone(),
                    reader_id: reader_id.to_string(),
                },
            );
        }

        Ok(marked)
    }

    fn conversation_for_participant(
        &self,
        user: &User,
        conversation_id: &str,
    ) -> ServiceResult<Conversation> {
        let conversation = self
            .db
            .get_conversation(conversation_id)?
            .ok_or_else(|| ServiceError::ConversationNotFound {
                conversation_id: conversation_id.to_string(),
            })?;

        if conversation.is_participant(&user.id) || user.is_admin() {
            Ok(conversation)
        } else {
            Err(ServiceError::Forbidden {
                message: "Not a participant in this conversation".to_string(),
            })
        }
    }
}
