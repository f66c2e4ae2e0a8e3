//! Background job queue operations.
//!
//! Jobs are plain rows; workers poll `claim_next_job` which atomically
//! flips the oldest due row to running so concurrent workers cannot
//! double-claim.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{OptionalExtension, params};
use uuid::Uuid;

use super::Database;
use super::models::{Job, JobKind};
use crate::error::{DatabaseError, ServiceResult};

const JOB_COLUMNS: &str =
    "id, kind, payload, status, attempts, last_error, run_at, created_at, updated_at";

impl Database {
    /// Enqueue a job to run at the given time (use `Utc::now()` for "now")
    pub fn enqueue_job(
        &self,
        kind: JobKind,
        payload: &serde_json::Value,
        run_at: DateTime<Utc>,
    ) -> ServiceResult<String> {
        let conn = self.conn.lock().unwrap();

        let id = Uuid::new_v4().to_string();
        let payload_json = serde_json::to_string(payload).map_err(DatabaseError::Serialization)?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO jobs (id, kind, payload, status, attempts, run_at, created_at, updated_at) \
             VALUES (?1, ?2, ?3, 'queued', 0, ?4, ?5, ?5)",
            params![id, kind.as_str(), payload_json, run_at.to_rfc3339(), now],
        )
        .map_err(DatabaseError::Query)?;

        Ok(id)
    }

    /// Atomically claim the oldest due queued job of the given kind
    pub fn claim_next_job(&self, kind: JobKind) -> ServiceResult<Option<Job>> {
        let conn = self.conn.lock().unwrap();

        let now = Utc::now().to_rfc3339();

        conn.query_row(
            &format!(
                "UPDATE jobs SET status = 'running', updated_at = ?2 \
                 WHERE id = (SELECT id FROM jobs \
                             WHERE kind = ?1 AND status = 'queued' AND run_at <= ?2 \
                             ORDER BY run_at ASC, created_at ASC LIMIT 1) \
                 RETURNING {}",
                JOB_COLUMNS
            ),
            params![kind.as_str(), now],
            Job::from_row,
        )
        .optional()
        .map_err(DatabaseError::Query)
        .map_err(Into::into)
    }

    /// Mark a running job done
    pub fn complete_job(&self, id: &str) -> ServiceResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "UPDATE jobs SET status = 'done', updated_at = ?2 WHERE id = ?1",
            params![id, Utc::now().to_rfc3339()],
        )
        .map_err(DatabaseError::Query)?;

        Ok(())
    }

    /// Record a job failure. Requeues with linear backoff until the
    /// attempt cap is reached, then marks the job failed for good.
    pub fn fail_job(
        &self,
        id: &str,
        error: &str,
        max_attempts: u32,
        backoff_secs: u64,
    ) -> ServiceResult<()> {
        let conn = self.conn.lock().unwrap();

        let attempts: i64 = conn
            .query_row(
                "SELECT attempts FROM jobs WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .map_err(DatabaseError::Query)?;

        let attempts = attempts + 1;
        let now = Utc::now();

        if attempts >= max_attempts as i64 {
            conn.execute(
                "UPDATE jobs SET status = 'failed', attempts = ?2, last_error = ?3, updated_at = ?4 \
                 WHERE id = ?1",
                params![id, attempts, error, now.to_rfc3339()],
            )
            .map_err(DatabaseError::Query)?;
        } else {
            let run_at = now + Duration::seconds(backoff_secs as i64 * attempts);
            conn.execute(
                "UPDATE jobs SET status = 'queued', attempts = ?2, last_error = ?3, \
                 run_at = ?4, updated_at = ?5 WHERE id = ?1",
                params![id, attempts, error, run_at.to_rfc3339(), now.to_rfc3339()],
            )
            .map_err(DatabaseError::Query)?;
        }

        Ok(())
    }

    /// Get a job by ID (monitoring, tests)
    pub fn get_job(&self, id: &str) -> ServiceResult<Option<Job>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            &format!("SELECT {} FROM jobs WHERE id = ?1", JOB_COLUMNS),
            params![id],
            Job::from_row,
        )
        .optional()
        .map_err(DatabaseError::Query)
        .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::JobStatus;

    #[test]
    fn test_claim_is_fifo_and_single_shot() {
        let db = Database::open_in_memory().unwrap();

        let first = db
            .enqueue_job(JobKind::Email, &serde_json::json!({"n": 1}), Utc::now())
            .unwrap();
        let second = db
            .enqueue_job(JobKind::Email, &serde_json::json!({"n": 2}), Utc::now())
            .unwrap();

        let claimed = db.claim_next_job(JobKind::Email).unwrap().unwrap();
        assert_eq!(claimed.id, first);
        assert_eq!(claimed.status, JobStatus::Running);

        let claimed = db.claim_next_job(JobKind::Email).unwrap().unwrap();
        assert_eq!(claimed.id, second);

        // Nothing queued left
        assert!(db.claim_next_job(JobKind::Email).unwrap().is_none());
    }

    #[test]
    fn test_claim_respects_kind_and_run_at() {
        let db = Database::open_in_memory().unwrap();

        db.enqueue_job(
            JobKind::TutorEmbedding,
            &serde_json::json!({"tutor_id": "t1"}),
            Utc::now(),
        )
        .unwrap();
        db.enqueue_job(
            JobKind::Email,
            &serde_json::json!({}),
            Utc::now() + Duration::hours(1),
        )
        .unwrap();

        // Email job is not due yet
        assert!(db.claim_next_job(JobKind::Email).unwrap().is_none());
        // Embedding job is
        assert!(db.claim_next_job(JobKind::TutorEmbedding).unwrap().is_some());
    }

    #[test]
    fn test_fail_requeues_then_gives_up() {
        let db = Database::open_in_memory().unwrap();

        let id = db
            .enqueue_job(JobKind::Email, &serde_json::json!({}), Utc::now())
            .unwrap();

        db.claim_next_job(JobKind::Email).unwrap().unwrap();
        db.fail_job(&id, "smtp timeout", 2, 30).unwrap();

        let job = db.get_job(&id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.attempts, 1);
        assert_eq!(job.last_error.as_deref(), Some("smtp timeout"));
        // Backed off into the future, so not claimable yet
        assert!(db.claim_next_job(JobKind::Email).unwrap().is_none());

        // Second failure hits the cap
        db.fail_job(&id, "smtp timeout", 2, 30).unwrap();
        let job = db.get_job(&id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.attempts, 2);
    }

    #[test]
    fn test_complete_job() {
        let db = Database::open_in_memory().unwrap();
        let id = db
            .enqueue_job(JobKind::Email, &serde_json::json!({}), Utc::now())
            .unwrap();
        db.claim_next_job(JobKind::Email).unwrap().unwrap();
        db.complete_job(&id).unwrap();
        assert_eq!(db.get_job(&id).unwrap().unwrap().status, JobStatus::Done);
    }
}
