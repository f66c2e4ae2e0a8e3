//! Notification creation, listing, and push delivery.

use chrono::Utc;
use uuid::Uuid;

use super::MentoraService;
use crate::db::{Notification, NotificationKind};
use crate::error::{ServiceError, ServiceResult};

impl MentoraService {
    /// Create a notification for a user.
    ///
    /// The row is persisted first; push to live notification sockets is
    /// best-effort on top.
    pub fn notify(
        &self,
        user_id: &str,
        kind: NotificationKind,
        body: impl Into<String>,
        payload: Option<serde_json::Value>,
    ) -> ServiceResult<Notification> {
        let notification = Notification {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            kind,
            body: body.into(),
            payload,
            read: false,
            created_at: Utc::now(),
        };

        self.db.insert_notification(&notification)?;
        self.notify_sockets
            .send_to_user(user_id, (&notification).into());

        Ok(notification)
    }

    /// List a user's notifications
    pub fn list_notifications(
        &self,
        user_id: &str,
        unread_only: bool,
        limit: usize,
    ) -> ServiceResult<Vec<Notification>> {
        self.db
            .list_notifications_for_user(user_id, unread_only, limit)
    }

    /// Mark a single notification read
    pub fn mark_notification_read(&self, user_id: &str, notification_id: &str) -> ServiceResult<()> {
        if self.db.mark_notification_read(notification_id, user_id)? {
            Ok(())
        } else {
            Err(ServiceError::NotificationNotFound {
                notification_id: notification_id.to_string(),
            })
        }
    }

    /// Mark all of a user's notifications read
    pub fn mark_all_notifications_read(&self, user_id: &str) -> ServiceResult<usize> {
        self.db.mark_all_notifications_read(user_id)
    }
}
