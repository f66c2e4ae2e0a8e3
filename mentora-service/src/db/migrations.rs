//! Database schema migrations.
//!
//! This module contains all database migrations and schema setup.

use rusqlite::Connection;

use crate::error::{DatabaseError, ServiceResult};

/// Run all database migrations.
///
/// This function is called during database initialization to ensure
/// the schema is up to date.
pub(super) fn run_migrations(conn: &Connection) -> ServiceResult<()> {
    conn.execute_batch(
        r#"
        -- User accounts
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            display_name TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'student',
            status TEXT NOT NULL DEFAULT 'active',
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_users_role ON users(role);

        -- Opaque bearer tokens, stored as SHA-256 digests
        CREATE TABLE IF NOT EXISTS auth_tokens (
            token_hash TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            expires_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_auth_tokens_user ON auth_tokens(user_id);

        -- Parent-student links
        CREATE TABLE IF NOT EXISTS guardian_links (
            parent_id TEXT NOT NULL,
            student_id TEXT NOT NULL,
            PRIMARY KEY (parent_id, student_id),
            FOREIGN KEY (parent_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (student_id) REFERENCES users(id) ON DELETE CASCADE
        );

        -- Tutor profiles
        CREATE TABLE IF NOT EXISTS tutor_profiles (
            user_id TEXT PRIMARY KEY,
            headline TEXT NOT NULL,
            bio TEXT NOT NULL,
            hourly_rate_cents INTEGER NOT NULL,
            embedding_status TEXT NOT NULL DEFAULT 'pending',
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        );

        -- Tutor subjects (many-to-many)
        CREATE TABLE IF NOT EXISTS tutor_subjects (
            tutor_id TEXT NOT NULL,
            subject TEXT NOT NULL,
            PRIMARY KEY (tutor_id, subject),
            FOREIGN KEY (tutor_id) REFERENCES tutor_profiles(user_id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_tutor_subjects_subject ON tutor_subjects(subject);

        -- Profile embeddings, little-endian f32 BLOBs, brute-force search
        CREATE TABLE IF NOT EXISTS tutor_embeddings (
            tutor_id TEXT PRIMARY KEY,
            embedding BLOB NOT NULL,
            FOREIGN KEY (tutor_id) REFERENCES tutor_profiles(user_id) ON DELETE CASCADE
        );

        -- Learning commitments
        CREATE TABLE IF NOT EXISTS commitments (
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            tutor_id TEXT NOT NULL,
            subject TEXT NOT NULL,
            goal TEXT NOT NULL,
            sessions_per_week INTEGER NOT NULL,
            rate_cents INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (student_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (tutor_id) REFERENCES users(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_commitments_student ON commitments(student_id);
        CREATE INDEX IF NOT EXISTS idx_commitments_tutor ON commitments(tutor_id);

        -- Sessions under a commitment
        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            commitment_id TEXT NOT NULL,
            starts_at TEXT NOT NULL,
            duration_minutes INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'scheduled',
            notes TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (commitment_id) REFERENCES commitments(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_sessions_commitment ON sessions(commitment_id);
        CREATE INDEX IF NOT EXISTS idx_sessions_starts ON sessions(starts_at);

        -- Quizzes (questions stored as JSON)
        CREATE TABLE IF NOT EXISTS quizzes (
            id TEXT PRIMARY KEY,
            commitment_id TEXT NOT NULL,
            title TEXT NOT NULL,
            questions TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (commitment_id) REFERENCES commitments(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_quizzes_commitment ON quizzes(commitment_id);

        -- One graded submission per quiz
        CREATE TABLE IF NOT EXISTS quiz_submissions (
            id TEXT PRIMARY KEY,
            quiz_id TEXT NOT NULL UNIQUE,
            student_id TEXT NOT NULL,
            answers TEXT NOT NULL,
            correct_count INTEGER NOT NULL,
            total_count INTEGER NOT NULL,
            submitted_at TEXT NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (quiz_id) REFERENCES quizzes(id) ON DELETE CASCADE,
            FOREIGN KEY (student_id) REFERENCES users(id) ON DELETE CASCADE
        );

        -- Conversations: one per user pair, pair stored sorted
        CREATE TABLE IF NOT EXISTS conversations (
            id TEXT PRIMARY KEY,
            user_a TEXT NOT NULL,
            user_b TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(user_a, user_b),
            FOREIGN KEY (user_a) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (user_b) REFERENCES users(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_conversations_a ON conversations(user_a);
        CREATE INDEX IF NOT EXISTS idx_conversations_b ON conversations(user_b);

        CREATE TABLE IF NOT EXISTS messages (
            id TEXT PRIMARY KEY,
            conversation_id TEXT NOT NULL,
            sender_id TEXT NOT NULL,
            body TEXT NOT NULL,
            sent_at TEXT NOT NULL DEFAULT (datetime('now')),
            read INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY (conversation_id) REFERENCES conversations(id) ON DELETE CASCADE,
            FOREIGN KEY (sender_id) REFERENCES users(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id, sent_at);

        -- Notifications
        CREATE TABLE IF NOT EXISTS notifications (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            body TEXT NOT NULL,
            payload TEXT,
            read INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id, read);

        -- Payments
        CREATE TABLE IF NOT EXISTS payments (
            id TEXT PRIMARY KEY,
            commitment_id TEXT NOT NULL,
            payer_id TEXT NOT NULL,
            amount_cents INTEGER NOT NULL,
            currency TEXT NOT NULL,
            session_count INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            gateway_ref TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (commitment_id) REFERENCES commitments(id) ON DELETE CASCADE,
            FOREIGN KEY (payer_id) REFERENCES users(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_payments_payer ON payments(payer_id);
        CREATE INDEX IF NOT EXISTS idx_payments_gateway_ref ON payments(gateway_ref);

        -- Violation reports
        CREATE TABLE IF NOT EXISTS violation_reports (
            id TEXT PRIMARY KEY,
            reporter_id TEXT NOT NULL,
            tutor_id TEXT NOT NULL,
            commitment_id TEXT,
            description TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'open',
            decision TEXT,
            resolution_note TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            resolved_at TEXT,
            FOREIGN KEY (reporter_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (tutor_id) REFERENCES users(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_reports_status ON violation_reports(status);

        -- Background job queue
        CREATE TABLE IF NOT EXISTS jobs (
            id TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            payload TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'queued',
            attempts INTEGER NOT NULL DEFAULT 0,
            last_error TEXT,
            run_at TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_jobs_claim ON jobs(kind, status, run_at);

        -- Dynamic config overrides
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
    "#,
    )
    .map_err(|e| DatabaseError::Migration {
        message: e.to_string(),
    })?;

    Ok(())
}
