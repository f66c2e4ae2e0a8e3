//! Learning commitment CRUD operations.

use chrono::Utc;
use rusqlite::{OptionalExtension, params};

use super::Database;
use super::models::{Commitment, CommitmentStatus};
use crate::error::{DatabaseError, ServiceResult};

const COMMITMENT_COLUMNS: &str = "id, student_id, tutor_id, subject, goal, sessions_per_week, \
                                  rate_cents, status, created_at, updated_at";

impl Database {
    /// Insert a new commitment
    pub fn insert_commitment(&self, commitment: &Commitment) -> ServiceResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            r#"
            INSERT INTO commitments (id, student_id, tutor_id, subject, goal, sessions_per_week, rate_cents, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                commitment.id,
                commitment.student_id,
                commitment.tutor_id,
                commitment.subject,
                commitment.goal,
                commitment.sessions_per_week,
                commitment.rate_cents,
                commitment.status.as_str(),
                commitment.created_at.to_rfc3339(),
                commitment.updated_at.to_rfc3339(),
            ],
        )
        .map_err(DatabaseError::Query)?;

        Ok(())
    }

    /// Get a commitment by ID
    pub fn get_commitment(&self, id: &str) -> ServiceResult<Option<Commitment>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            &format!(
                "SELECT {} FROM commitments WHERE id = ?1",
                COMMITMENT_COLUMNS
            ),
            params![id],
            Commitment::from_row,
        )
        .optional()
        .map_err(DatabaseError::Query)
        .map_err(Into::into)
    }

    /// List commitments where the user is the student or the tutor
    pub fn list_commitments_for_user(&self, user_id: &str) -> ServiceResult<Vec<Commitment>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM commitments WHERE student_id = ?1 OR tutor_id = ?1 \
                 ORDER BY updated_at DESC",
                COMMITMENT_COLUMNS
            ))
            .map_err(DatabaseError::Query)?;

        let commitments = stmt
            .query_map(params![user_id], Commitment::from_row)
            .map_err(DatabaseError::Query)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(commitments)
    }

    /// Update a commitment's status
    pub fn update_commitment_status(
        &self,
        id: &str,
        status: CommitmentStatus,
    ) -> ServiceResult<bool> {
        let conn = self.conn.lock().unwrap();

        let rows = conn
            .execute(
                "UPDATE commitments SET status = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, status.as_str(), Utc::now().to_rfc3339()],
            )
            .map_err(DatabaseError::Query)?;

        Ok(rows > 0)
    }

    /// Check whether two users share any commitment (in any status)
    pub fn users_share_commitment(&self, a: &str, b: &str) -> ServiceResult<bool> {
        let conn = self.conn.lock().unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM commitments \
                 WHERE (student_id = ?1 AND tutor_id = ?2) OR (student_id = ?2 AND tutor_id = ?1)",
                params![a, b],
                |row| row.get(0),
            )
            .map_err(DatabaseError::Query)?;

        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{AccountStatus, Role, User};

    fn seed_user(db: &Database, id: &str, role: Role) {
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

    fn make_commitment(id: &str, student: &str, tutor: &str) -> Commitment {
        Commitment {
            id: id.to_string(),
            student_id: student.to_string(),
            tutor_id: tutor.to_string(),
            subject: "algebra".to_string(),
            goal: "pass the final".to_string(),
            sessions_per_week: 2,
            rate_cents: 4500,
            status: CommitmentStatus::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_commitment_lifecycle_rows() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, "s1", Role::Student);
        seed_user(&db, "t1", Role::Tutor);

        db.insert_commitment(&make_commitment("c1", "s1", "t1"))
            .unwrap();

        let fetched = db.get_commitment("c1").unwrap().unwrap();
        assert_eq!(fetched.status, CommitmentStatus::Pending);

        assert!(
            db.update_commitment_status("c1", CommitmentStatus::Active)
                .unwrap()
        );
        let fetched = db.get_commitment("c1").unwrap().unwrap();
        assert_eq!(fetched.status, CommitmentStatus::Active);

        assert!(
            !db.update_commitment_status("missing", CommitmentStatus::Active)
                .unwrap()
        );
    }

    #[test]
    fn test_list_and_share() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, "s1", Role::Student);
        seed_user(&db, "t1", Role::Tutor);
        seed_user(&db, "t2", Role::Tutor);

        db.insert_commitment(&make_commitment("c1", "s1", "t1"))
            .unwrap();

        assert_eq!(db.list_commitments_for_user("s1").unwrap().len(), 1);
        assert_eq!(db.list_commitments_for_user("t1").unwrap().len(), 1);
        assert_eq!(db.list_commitments_for_user("t2").unwrap().len(), 0);

        assert!(db.users_share_commitment("s1", "t1").unwrap());
        assert!(db.users_share_commitment("t1", "s1").unwrap());
        assert!(!db.users_share_commitment("s1", "t2").unwrap());
    }
}
