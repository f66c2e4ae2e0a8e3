//! Notification storage operations.

use rusqlite::params;

use super::Database;
use super::models::Notification;
use crate::error::{DatabaseError, ServiceResult};

const NOTIFICATION_COLUMNS: &str = "id, user_id, kind, body, payload, read, created_at";

impl Database {
    /// Insert a notification
    pub fn insert_notification(&self, notification: &Notification) -> ServiceResult<()> {
        let conn = self.conn.lock().unwrap();

        let payload_json = notification
            .payload
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(DatabaseError::Serialization)?;

        conn.execute(
            "INSERT INTO notifications (id, user_id, kind, body, payload, read, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                notification.id,
                notification.user_id,
                notification.kind.as_str(),
                notification.body,
                payload_json,
                notification.read,
                notification.created_at.to_rfc3339(),
            ],
        )
        .map_err(DatabaseError::Query)?;

        Ok(())
    }

    /// List a user's notifications, newest first
    pub fn list_notifications_for_user(
        &self,
        user_id: &str,
        unread_only: bool,
        limit: usize,
    ) -> ServiceResult<Vec<Notification>> {
        let conn = self.conn.lock().unwrap();

        let sql = if unread_only {
            format!(
                "SELECT {} FROM notifications WHERE user_id = ?1 AND read = 0 \
                 ORDER BY created_at DESC LIMIT ?2",
                NOTIFICATION_COLUMNS
            )
        } else {
            format!(
                "SELECT {} FROM notifications WHERE user_id = ?1 \
                 ORDER BY created_at DESC LIMIT ?2",
                NOTIFICATION_COLUMNS
            )
        };

        let mut stmt = conn.prepare(&sql).map_err(DatabaseError::Query)?;

        let notifications = stmt
            .query_map(params![user_id, limit as i64], Notification::from_row)
            .map_err(DatabaseError::Query)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(notifications)
    }

    /// Mark one of the user's notifications read
    pub fn mark_notification_read(&self, id: &str, user_id: &str) -> ServiceResult<bool> {
        let conn = self.conn.lock().unwrap();

        let rows = conn
            .execute(
                "UPDATE notifications SET read = 1 WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
            )
            .map_err(DatabaseError::Query)?;

        Ok(rows > 0)
    }

    /// Mark all of a user's notifications read
    pub fn mark_all_notifications_read(&self, user_id: &str) -> ServiceResult<usize> {
        let conn = self.conn.lock().unwrap();

        let rows = conn
            .execute(
                "UPDATE notifications SET read = 1 WHERE user_id = ?1 AND read = 0",
                params![user_id],
            )
            .map_err(DatabaseError::Query)?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{AccountStatus, NotificationKind, Role, User};
    use chrono::Utc;

    fn seed_notification(db: &Database, id: &str, user_id: &str) {
        db.insert_notification(&Notification {
            id: id.to_string(),
            user_id: user_id.to_string(),
            kind: NotificationKind::MessageReceived,
            body: "New message".to_string(),
            payload: Some(serde_json::json!({"conversation_id": "c1"})),
            read: false,
            created_at: Utc::now(),
        })
        .unwrap();
    }

    #[test]
    fn test_notifications_listing_and_read_state() {
        let db = Database::open_in_memory().unwrap();
        db.insert_user(&User {
            id: "u1".to_string(),
            email: "u1@b.com".to_string(),
            password_hash: "hash".to_string(),
            display_name: "u1".to_string(),
            role: Role::Student,
            status: AccountStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .unwrap();

        seed_notification(&db, "n1", "u1");
        seed_notification(&db, "n2", "u1");

        assert_eq!(
            db.list_notifications_for_user("u1", false, 50).unwrap().len(),
            2
        );

        assert!(db.mark_notification_read("n1", "u1").unwrap());
        // Wrong owner cannot mark it
        assert!(!db.mark_notification_read("n2", "other").unwrap());

        let unread = db.list_notifications_for_user("u1", true, 50).unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].id, "n2");
        assert_eq!(unread[0].payload.as_ref().unwrap()["conversation_id"], "c1");

        assert_eq!(db.mark_all_notifications_read("u1").unwrap(), 1);
        assert!(db.list_notifications_for_user("u1", true, 50).unwrap().is_empty());
    }
}
