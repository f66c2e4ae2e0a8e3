//! Conversation and message operations.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};

use super::Database;
use super::models::{ChatMessage, Conversation};
use crate::error::{DatabaseError, ServiceResult};

const CONVERSATION_COLUMNS: &str = "id, user_a, user_b, created_at, updated_at";
const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_id, body, sent_at, read";

/// Order a user pair so each pair maps to exactly one conversation row
pub(crate) fn sorted_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b { (a, b) } else { (b, a) }
}

impl Database {
    /// Insert a conversation. The pair must already be sorted.
    pub fn insert_conversation(&self, conversation: &Conversation) -> ServiceResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT INTO conversations (id, user_a, user_b, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                conversation.id,
                conversation.user_a,
                conversation.user_b,
                conversation.created_at.to_rfc3339(),
                conversation.updated_at.to_rfc3339(),
            ],
        )
        .map_err(DatabaseError::Query)?;

        Ok(())
    }

    /// Get a conversation by ID
    pub fn get_conversation(&self, id: &str) -> ServiceResult<Option<Conversation>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            &format!(
                "SELECT {} FROM conversations WHERE id = ?1",
                CONVERSATION_COLUMNS
            ),
            params![id],
            Conversation::from_row,
        )
        .optional()
        .map_err(DatabaseError::Query)
        .map_err(Into::into)
    }

    /// Get the conversation between two users, if it exists
    pub fn get_conversation_for_pair(&self, a: &str, b: &str) -> ServiceResult<Option<Conversation>> {
        let (user_a, user_b) = sorted_pair(a, b);
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            &format!(
                "SELECT {} FROM conversations WHERE user_a = ?1 AND user_b = ?2",
                CONVERSATION_COLUMNS
            ),
            params![user_a, user_b],
            Conversation::from_row,
        )
        .optional()
        .map_err(DatabaseError::Query)
        .map_err(Into::into)
    }

    /// List a user's conversations, most recently active first
    pub fn list_conversations_for_user(&self, user_id: &str) -> ServiceResult<Vec<Conversation>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM conversations WHERE user_a = ?1 OR user_b = ?1 \
                 ORDER BY updated_at DESC",
                CONVERSATION_COLUMNS
            ))
            .map_err(DatabaseError::Query)?;

        let conversations = stmt
            .query_map(params![user_id], Conversation::from_row)
            .map_err(DatabaseError::Query)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(conversations)
    }

    /// Bump a conversation's activity timestamp
    pub fn touch_conversation(&self, id: &str, at: DateTime<Utc>) -> ServiceResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "UPDATE conversations SET updated_at = ?2 WHERE id = ?1",
            params![id, at.to_rfc3339()],
        )
        .map_err(DatabaseError::Query)?;

        Ok(())
    }

    /// Insert a message
    pub fn insert_message(&self, message: &ChatMessage) -> ServiceResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT INTO messages (id, conversation_id, sender_id, body, sent_at, read) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                message.id,
                message.conversation_id,
                message.sender_id,
                message.body,
                message.sent_at.to_rfc3339(),
                message.read,
            ],
        )
        .map_err(DatabaseError::Query)?;

        Ok(())
    }

    /// Page through a conversation's messages, newest first.
    /// `before` bounds the page to messages sent strictly earlier.
    pub fn list_messages(
        &self,
        conversation_id: &str,
        before: Option<DateTime<Utc>>,
        limit: usize,
    ) -> ServiceResult<Vec<ChatMessage>> {
        let conn = self.conn.lock().unwrap();

        let messages = if let Some(before) = before {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {} FROM messages \
                     WHERE conversation_id = ?1 AND sent_at < ?2 \
                     ORDER BY sent_at DESC LIMIT ?3",
                    MESSAGE_COLUMNS
                ))
                .map_err(DatabaseError::Query)?;
            stmt.query_map(
                params![conversation_id, before.to_rfc3339(), limit as i64],
                ChatMessage::from_row,
            )
            .map_err(DatabaseError::Query)?
            .filter_map(|r| r.ok())
            .collect()
        } else {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {} FROM messages \
                     WHERE conversation_id = ?1 ORDER BY sent_at DESC LIMIT ?2",
                    MESSAGE_COLUMNS
                ))
                .map_err(DatabaseError::Query)?;
            stmt.query_map(params![conversation_id, limit as i64], ChatMessage::from_row)
                .map_err(DatabaseError::Query)?
                .filter_map(|r| r.ok())
                .collect()
        };

        Ok(messages)
    }

    /// Mark every message not sent by `reader_id` as read
    pub fn mark_messages_read(&self, conversation_id: &str, reader_id: &str) -> ServiceResult<usize> {
        let conn = self.conn.lock().unwrap();

        let rows = conn
            .execute(
                "UPDATE messages SET read = 1 \
                 WHERE conversation_id = ?1 AND sender_id != ?2 AND read = 0",
                params![conversation_id, reader_id],
            )
            .map_err(DatabaseError::Query)?;

        Ok(rows)
    }

    /// Count unread messages addressed to `user_id` in a conversation
    pub fn count_unread_messages(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> ServiceResult<usize> {
        let conn = self.conn.lock().unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM messages \
                 WHERE conversation_id = ?1 AND sender_id != ?2 AND read = 0",
                params![conversation_id, user_id],
                |row| row.get(0),
            )
            .map_err(DatabaseError::Query)?;

        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{AccountStatus, Role, User};
    use chrono::Duration;

    fn seed(db: &Database) {
        for id in ["u1", "u2"] {
            db.insert_user(&User {
                id: id.to_string(),
                email: format!("{}@b.com", id),
                password_hash: "hash".to_string(),
                display_name: id.to_string(),
                role: Role::Student,
                status: AccountStatus::Active,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .unwrap();
        }
        let (a, b) = sorted_pair("u2", "u1");
        db.insert_conversation(&Conversation {
            id: "c1".to_string(),
            user_a: a.to_string(),
            user_b: b.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .unwrap();
    }

    #[test]
    fn test_sorted_pair() {
        assert_eq!(sorted_pair("a", "b"), ("a", "b"));
        assert_eq!(sorted_pair("b", "a"), ("a", "b"));
    }

    #[test]
    fn test_pair_lookup_is_order_insensitive() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);

        assert!(db.get_conversation_for_pair("u1", "u2").unwrap().is_some());
        assert!(db.get_conversation_for_pair("u2", "u1").unwrap().is_some());
        assert!(db.get_conversation_for_pair("u1", "u3").unwrap().is_none());
    }

    #[test]
    fn test_message_paging_and_read_tracking() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);

        let base = Utc::now();
        for i in 0..5 {
            db.insert_message(&ChatMessage {
                id: format!("m{}", i),
                conversation_id: "c1".to_string(),
                sender_id: "u1".to_string(),
                body: format!("message {}", i),
                sent_at: base + Duration::seconds(i),
                read: false,
            })
            .unwrap();
        }

        let page = db.list_messages("c1", None, 2).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, "m4"); // newest first

        let older = db.list_messages("c1", Some(page[1].sent_at), 10).unwrap();
        assert_eq!(older.len(), 3);
        assert_eq!(older[0].id, "m2");

        assert_eq!(db.count_unread_messages("c1", "u2").unwrap(), 5);
        // The sender's own messages are never "unread" for them
        assert_eq!(db.count_unread_messages("c1", "u1").unwrap(), 0);

        assert_eq!(db.mark_messages_read("c1", "u2").unwrap(), 5);
        assert_eq!(db.count_unread_messages("c1", "u2").unwrap(), 0);
    }
}
