//! Session CRUD operations.

use chrono::Utc;
use rusqlite::{OptionalExtension, params};

use super::Database;
use super::models::{Session, SessionStatus};
use crate::error::{DatabaseError, ServiceResult};

const SESSION_COLUMNS: &str =
    "id, commitment_id, starts_at, duration_minutes, status, notes, created_at, updated_at";

impl Database {
    /// Insert a new session
    pub fn insert_session(&self, session: &Session) -> ServiceResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            r#"
            INSERT INTO sessions (id, commitment_id, starts_at, duration_minutes, status, notes, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                session.id,
                session.commitment_id,
                session.starts_at.to_rfc3339(),
                session.duration_minutes,
                session.status.as_str(),
                session.notes,
                session.created_at.to_rfc3339(),
                session.updated_at.to_rfc3339(),
            ],
        )
        .map_err(DatabaseError::Query)?;

        Ok(())
    }

    /// Get a session by ID
    pub fn get_session(&self, id: &str) -> ServiceResult<Option<Session>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            &format!("SELECT {} FROM sessions WHERE id = ?1", SESSION_COLUMNS),
            params![id],
            Session::from_row,
        )
        .optional()
        .map_err(DatabaseError::Query)
        .map_err(Into::into)
    }

    /// List sessions under a commitment, soonest first
    pub fn list_sessions_for_commitment(&self, commitment_id: &str) -> ServiceResult<Vec<Session>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM sessions WHERE commitment_id = ?1 ORDER BY starts_at ASC",
                SESSION_COLUMNS
            ))
            .map_err(DatabaseError::Query)?;

        let sessions = stmt
            .query_map(params![commitment_id], Session::from_row)
            .map_err(DatabaseError::Query)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(sessions)
    }

    /// All scheduled sessions taught by a tutor, across commitments.
    /// Used for overlap checks when scheduling.
    pub fn list_scheduled_sessions_for_tutor(&self, tutor_id: &str) -> ServiceResult<Vec<Session>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(&format!(
                "SELECT s.{} FROM sessions s \
                 JOIN commitments c ON c.id = s.commitment_id \
                 WHERE c.tutor_id = ?1 AND s.status = 'scheduled' \
                 ORDER BY s.starts_at ASC",
                SESSION_COLUMNS.replace(", ", ", s.")
            ))
            .map_err(DatabaseError::Query)?;

        let sessions = stmt
            .query_map(params![tutor_id], Session::from_row)
            .map_err(DatabaseError::Query)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(sessions)
    }

    /// Update a session's status, optionally attaching notes
    pub fn update_session_status(
        &self,
        id: &str,
        status: SessionStatus,
        notes: Option<&str>,
    ) -> ServiceResult<bool> {
        let conn = self.conn.lock().unwrap();

        let rows = if let Some(notes) = notes {
            conn.execute(
                "UPDATE sessions SET status = ?2, notes = ?3, updated_at = ?4 WHERE id = ?1",
                params![id, status.as_str(), notes, Utc::now().to_rfc3339()],
            )
            .map_err(DatabaseError::Query)?
        } else {
            conn.execute(
                "UPDATE sessions SET status = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, status.as_str(), Utc::now().to_rfc3339()],
            )
            .map_err(DatabaseError::Query)?
        };

        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{AccountStatus, Commitment, CommitmentStatus, Role, User};
    use chrono::Duration;

    fn seed(db: &Database) {
        for (id, role) in [("s1", Role::Student), ("t1", Role::Tutor)] {
            db.insert_user(&User {
                id: id.to_string(),
                email: format!("{}@b.com", id),
                password_hash: "hash".to_string(),
                display_name: id.to_string(),
                role,
                status: AccountStatus::Active,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .unwrap();
        }
        db.insert_commitment(&Commitment {
            id: "c1".to_string(),
            student_id: "s1".to_string(),
            tutor_id: "t1".to_string(),
            subject: "algebra".to_string(),
            goal: "exam prep".to_string(),
            sessions_per_week: 1,
            rate_cents: 4000,
            status: CommitmentStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .unwrap();
    }

    fn make_session(id: &str, offset_hours: i64) -> Session {
        Session {
            id: id.to_string(),
            commitment_id: "c1".to_string(),
            starts_at: Utc::now() + Duration::hours(offset_hours),
            duration_minutes: 60,
            status: SessionStatus::Scheduled,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_session_rows() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);

        db.insert_session(&make_session("sess1", 1)).unwrap();
        db.insert_session(&make_session("sess2", 3)).unwrap();

        assert_eq!(db.list_sessions_for_commitment("c1").unwrap().len(), 2);
        assert_eq!(db.list_scheduled_sessions_for_tutor("t1").unwrap().len(), 2);

        assert!(
            db.update_session_status("sess1", SessionStatus::Completed, Some("went well"))
                .unwrap()
        );
        let sess = db.get_session("sess1").unwrap().unwrap();
        assert_eq!(sess.status, SessionStatus::Completed);
        assert_eq!(sess.notes.as_deref(), Some("went well"));

        // Completed sessions no longer block the tutor's calendar
        assert_eq!(db.list_scheduled_sessions_for_tutor("t1").unwrap().len(), 1);
    }
}
