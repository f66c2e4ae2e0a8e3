//! Database module for SQLite operations.
//!
//! This module provides the `Database` struct and all database operations
//! organized into submodules by domain.

mod commitments;
mod conversations;
mod jobs;
mod migrations;
pub mod models;
mod notifications;
mod payments;
mod quizzes;
mod reports;
mod sessions;
mod settings;
mod tutors;
mod users;

pub use models::{
    AccountStatus, ChatMessage, Commitment, CommitmentStatus, Conversation, EmbeddingStatus, Job,
    JobKind, JobStatus, Notification, NotificationKind, Payment, PaymentStatus, Quiz, QuizQuestion,
    QuizSubmission, ReportDecision, ReportStatus, Role, Session, SessionStatus, TutorProfile, User,
    ViolationReport,
};

use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;

use crate::error::{DatabaseError, ServiceError, ServiceResult};

/// Database manager for SQLite operations
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create the database at the given path
    pub fn open(path: &Path) -> ServiceResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ServiceError::Database(DatabaseError::Connection(
                    rusqlite::Error::ToSqlConversionFailure(Box::new(e)),
                ))
            })?;
        }

        let conn = Connection::open(path).map_err(DatabaseError::Connection)?;

        // Enable WAL mode for better concurrency
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(DatabaseError::Query)?;

        // Run all migrations
        migrations::run_migrations(&conn)?;

        let db = Self {
            conn: Mutex::new(conn),
        };

        Ok(db)
    }

    /// Open an in-memory database (tests)
    #[cfg(test)]
    pub fn open_in_memory() -> ServiceResult<Self> {
        let conn = Connection::open_in_memory().map_err(DatabaseError::Connection)?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(DatabaseError::Query)?;
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_file_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("mentora.db");

        let db = Database::open(&path).unwrap();
        assert!(path.exists());

        // Schema is usable immediately
        assert!(db.get_user("nobody").unwrap().is_none());
        assert!(db.get_all_settings().unwrap().is_empty());

        // Reopening runs migrations idempotently
        drop(db);
        let db = Database::open(&path).unwrap();
        assert!(db.get_user("nobody").unwrap().is_none());
    }
}
