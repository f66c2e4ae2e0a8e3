//! Database model structs.
//!
//! This module contains the data structures for database records.

use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// Parse an RFC3339 timestamp column, falling back to now on corruption
pub(crate) fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Tutor,
    Parent,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Tutor => "tutor",
            Role::Parent => "parent",
            Role::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "tutor" => Role::Tutor,
            "parent" => Role::Parent,
            "admin" => Role::Admin,
            _ => Role::Student,
        }
    }
}

/// Account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Suspended,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Suspended => "suspended",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "suspended" => AccountStatus::Suspended,
            _ => AccountStatus::Active,
        }
    }
}

/// User account record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub display_name: String,
    pub role: Role,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub(crate) fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let role_str: String = row.get(4)?;
        let status_str: String = row.get(5)?;
        let created_at_str: String = row.get(6)?;
        let updated_at_str: String = row.get(7)?;

        Ok(Self {
            id: row.get(0)?,
            email: row.get(1)?,
            password_hash: row.get(2)?,
            display_name: row.get(3)?,
            role: Role::from_str(&role_str),
            status: AccountStatus::from_str(&status_str),
            created_at: parse_ts(&created_at_str),
            updated_at: parse_ts(&updated_at_str),
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Embedding generation status for a tutor profile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingStatus {
    #[default]
    Pending,
    Ready,
    Failed,
}

impl EmbeddingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingStatus::Pending => "pending",
            EmbeddingStatus::Ready => "ready",
            EmbeddingStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "ready" => EmbeddingStatus::Ready,
            "failed" => EmbeddingStatus::Failed,
            _ => EmbeddingStatus::Pending,
        }
    }
}

/// Tutor profile record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TutorProfile {
    pub user_id: String,
    pub headline: String,
    pub bio: String,
    pub hourly_rate_cents: i64,
    pub subjects: Vec<String>,
    pub embedding_status: EmbeddingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TutorProfile {
    pub(crate) fn from_row(row: &Row<'_>, subjects: Vec<String>) -> Result<Self, rusqlite::Error> {
        let embedding_status_str: String = row.get(4)?;
        let created_at_str: String = row.get(5)?;
        let updated_at_str: String = row.get(6)?;

        Ok(Self {
            user_id: row.get(0)?,
            headline: row.get(1)?,
            bio: row.get(2)?,
            hourly_rate_cents: row.get(3)?,
            subjects,
            embedding_status: EmbeddingStatus::from_str(&embedding_status_str),
            created_at: parse_ts(&created_at_str),
            updated_at: parse_ts(&updated_at_str),
        })
    }

    /// Text used as input for the profile embedding
    pub fn embedding_text(&self) -> String {
        format!(
            "{}\n{}\nSubjects: {}",
            self.headline,
            self.bio,
            self.subjects.join(", ")
        )
    }
}

/// Learning commitment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitmentStatus {
    Pending,
    Active,
    Declined,
    Completed,
    Cancelled,
}

impl CommitmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitmentStatus::Pending => "pending",
            CommitmentStatus::Active => "active",
            CommitmentStatus::Declined => "declined",
            CommitmentStatus::Completed => "completed",
            CommitmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "active" => CommitmentStatus::Active,
            "declined" => CommitmentStatus::Declined,
            "completed" => CommitmentStatus::Completed,
            "cancelled" => CommitmentStatus::Cancelled,
            _ => CommitmentStatus::Pending,
        }
    }
}

/// Learning commitment record: an agreed engagement between a student and tutor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commitment {
    pub id: String,
    pub student_id: String,
    pub tutor_id: String,
    pub subject: String,
    pub goal: String,
    pub sessions_per_week: i64,
    pub rate_cents: i64,
    pub status: CommitmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Commitment {
    pub(crate) fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let status_str: String = row.get(7)?;
        let created_at_str: String = row.get(8)?;
        let updated_at_str: String = row.get(9)?;

        Ok(Self {
            id: row.get(0)?,
            student_id: row.get(1)?,
            tutor_id: row.get(2)?,
            subject: row.get(3)?,
            goal: row.get(4)?,
            sessions_per_week: row.get(5)?,
            rate_cents: row.get(6)?,
            status: CommitmentStatus::from_str(&status_str),
            created_at: parse_ts(&created_at_str),
            updated_at: parse_ts(&updated_at_str),
        })
    }

    pub fn is_participant(&self, user_id: &str) -> bool {
        self.student_id == user_id || self.tutor_id == user_id
    }
}

/// Tutoring session status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Scheduled => "scheduled",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "completed" => SessionStatus::Completed,
            "cancelled" => SessionStatus::Cancelled,
            _ => SessionStatus::Scheduled,
        }
    }
}

/// A single scheduled teaching occurrence under a commitment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub commitment_id: String,
    pub starts_at: DateTime<Utc>,
    pub duration_minutes: i64,
    pub status: SessionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub(crate) fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let starts_at_str: String = row.get(2)?;
        let status_str: String = row.get(4)?;
        let created_at_str: String = row.get(6)?;
        let updated_at_str: String = row.get(7)?;

        Ok(Self {
            id: row.get(0)?,
            commitment_id: row.get(1)?,
            starts_at: parse_ts(&starts_at_str),
            duration_minutes: row.get(3)?,
            status: SessionStatus::from_str(&status_str),
            notes: row.get(5)?,
            created_at: parse_ts(&created_at_str),
            updated_at: parse_ts(&updated_at_str),
        })
    }

    pub fn ends_at(&self) -> DateTime<Utc> {
        self.starts_at + chrono::Duration::minutes(self.duration_minutes)
    }
}

/// A single quiz question with its answer key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub prompt: String,
    pub options: Vec<String>,
    /// Indices into `options` forming the answer key
    pub correct: Vec<usize>,
}

/// Quiz record. Questions are stored as a JSON column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: String,
    pub commitment_id: String,
    pub title: String,
    pub questions: Vec<QuizQuestion>,
    pub created_at: DateTime<Utc>,
}

impl Quiz {
    pub(crate) fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let questions_str: String = row.get(3)?;
        let created_at_str: String = row.get(4)?;

        Ok(Self {
            id: row.get(0)?,
            commitment_id: row.get(1)?,
            title: row.get(2)?,
            questions: serde_json::from_str(&questions_str).unwrap_or_default(),
            created_at: parse_ts(&created_at_str),
        })
    }
}

/// A student's graded quiz submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizSubmission {
    pub id: String,
    pub quiz_id: String,
    pub student_id: String,
    pub answers: Vec<Vec<usize>>,
    pub correct_count: i64,
    pub total_count: i64,
    pub submitted_at: DateTime<Utc>,
}

impl QuizSubmission {
    pub(crate) fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let answers_str: String = row.get(3)?;
        let submitted_at_str: String = row.get(6)?;

        Ok(Self {
            id: row.get(0)?,
            quiz_id: row.get(1)?,
            student_id: row.get(2)?,
            answers: serde_json::from_str(&answers_str).unwrap_or_default(),
            correct_count: row.get(4)?,
            total_count: row.get(5)?,
            submitted_at: parse_ts(&submitted_at_str),
        })
    }
}

/// Conversation record. The participant pair is stored sorted so each
/// pair has exactly one conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub user_a: String,
    pub user_b: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub(crate) fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let created_at_str: String = row.get(3)?;
        let updated_at_str: String = row.get(4)?;

        Ok(Self {
            id: row.get(0)?,
            user_a: row.get(1)?,
            user_b: row.get(2)?,
            created_at: parse_ts(&created_at_str),
            updated_at: parse_ts(&updated_at_str),
        })
    }

    pub fn is_participant(&self, user_id: &str) -> bool {
        self.user_a == user_id || self.user_b == user_id
    }

    /// The other participant
    pub fn peer_of(&self, user_id: &str) -> &str {
        if self.user_a == user_id {
            &self.user_b
        } else {
            &self.user_a
        }
    }
}

/// Chat message record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    pub read: bool,
}

impl ChatMessage {
    pub(crate) fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let sent_at_str: String = row.get(4)?;

        Ok(Self {
            id: row.get(0)?,
            conversation_id: row.get(1)?,
            sender_id: row.get(2)?,
            body: row.get(3)?,
            sent_at: parse_ts(&sent_at_str),
            read: row.get(5)?,
        })
    }
}

/// Notification kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    CommitmentRequested,
    CommitmentAccepted,
    CommitmentDeclined,
    CommitmentCancelled,
    SessionScheduled,
    SessionCancelled,
    QuizAssigned,
    QuizGraded,
    PaymentSucceeded,
    MessageReceived,
    ReportResolved,
    AccountReinstated,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::CommitmentRequested => "commitment_requested",
            NotificationKind::CommitmentAccepted => "commitment_accepted",
            NotificationKind::CommitmentDeclined => "commitment_declined",
            NotificationKind::CommitmentCancelled => "commitment_cancelled",
            NotificationKind::SessionScheduled => "session_scheduled",
            NotificationKind::SessionCancelled => "session_cancelled",
            NotificationKind::QuizAssigned => "quiz_assigned",
            NotificationKind::QuizGraded => "quiz_graded",
            NotificationKind::PaymentSucceeded => "payment_succeeded",
            NotificationKind::MessageReceived => "message_received",
            NotificationKind::ReportResolved => "report_resolved",
            NotificationKind::AccountReinstated => "account_reinstated",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "commitment_accepted" => NotificationKind::CommitmentAccepted,
            "commitment_declined" => NotificationKind::CommitmentDeclined,
            "commitment_cancelled" => NotificationKind::CommitmentCancelled,
            "session_scheduled" => NotificationKind::SessionScheduled,
            "session_cancelled" => NotificationKind::SessionCancelled,
            "quiz_assigned" => NotificationKind::QuizAssigned,
            "quiz_graded" => NotificationKind::QuizGraded,
            "payment_succeeded" => NotificationKind::PaymentSucceeded,
            "message_received" => NotificationKind::MessageReceived,
            "report_resolved" => NotificationKind::ReportResolved,
            "account_reinstated" => NotificationKind::AccountReinstated,
            _ => NotificationKind::CommitmentRequested,
        }
    }
}

/// Notification record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub kind: NotificationKind,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub(crate) fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let kind_str: String = row.get(2)?;
        let payload_str: Option<String> = row.get(4)?;
        let created_at_str: String = row.get(6)?;

        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            kind: NotificationKind::from_str(&kind_str),
            body: row.get(3)?,
            payload: payload_str.and_then(|s| serde_json::from_str(&s).ok()),
            read: row.get(5)?,
            created_at: parse_ts(&created_at_str),
        })
    }
}

/// Payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Succeeded,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "succeeded" => PaymentStatus::Succeeded,
            "failed" => PaymentStatus::Failed,
            _ => PaymentStatus::Pending,
        }
    }

    pub fn is_final(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

/// Payment record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub commitment_id: String,
    pub payer_id: String,
    pub amount_cents: i64,
    pub currency: String,
    pub session_count: i64,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub(crate) fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let status_str: String = row.get(6)?;
        let created_at_str: String = row.get(8)?;
        let updated_at_str: String = row.get(9)?;

        Ok(Self {
            id: row.get(0)?,
            commitment_id: row.get(1)?,
            payer_id: row.get(2)?,
            amount_cents: row.get(3)?,
            currency: row.get(4)?,
            session_count: row.get(5)?,
            status: PaymentStatus::from_str(&status_str),
            gateway_ref: row.get(7)?,
            created_at: parse_ts(&created_at_str),
            updated_at: parse_ts(&updated_at_str),
        })
    }
}

/// Violation report status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Open,
    Resolved,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Open => "open",
            ReportStatus::Resolved => "resolved",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "resolved" => ReportStatus::Resolved,
            _ => ReportStatus::Open,
        }
    }
}

/// Admin decision on a violation report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportDecision {
    Dismissed,
    Warning,
    Suspension,
}

impl ReportDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportDecision::Dismissed => "dismissed",
            ReportDecision::Warning => "warning",
            ReportDecision::Suspension => "suspension",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "dismissed" => Some(ReportDecision::Dismissed),
            "warning" => Some(ReportDecision::Warning),
            "suspension" => Some(ReportDecision::Suspension),
            _ => None,
        }
    }
}

/// A student-submitted complaint against a tutor, reviewed by an admin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViolationReport {
    pub id: String,
    pub reporter_id: String,
    pub tutor_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commitment_id: Option<String>,
    pub description: String,
    pub status: ReportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<ReportDecision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_note: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl ViolationReport {
    pub(crate) fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let status_str: String = row.get(5)?;
        let decision_str: Option<String> = row.get(6)?;
        let created_at_str: String = row.get(8)?;
        let resolved_at_str: Option<String> = row.get(9)?;

        Ok(Self {
            id: row.get(0)?,
            reporter_id: row.get(1)?,
            tutor_id: row.get(2)?,
            commitment_id: row.get(3)?,
            description: row.get(4)?,
            status: ReportStatus::from_str(&status_str),
            decision: decision_str.as_deref().and_then(ReportDecision::from_str),
            resolution_note: row.get(7)?,
            created_at: parse_ts(&created_at_str),
            resolved_at: resolved_at_str.as_deref().map(parse_ts),
        })
    }
}

/// Background job kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Email,
    TutorEmbedding,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Email => "email",
            JobKind::TutorEmbedding => "tutor_embedding",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "tutor_embedding" => JobKind::TutorEmbedding,
            _ => JobKind::Email,
        }
    }
}

/// Background job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "running" => JobStatus::Running,
            "done" => JobStatus::Done,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Queued,
        }
    }
}

/// Background job record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub kind: JobKind,
    pub payload: serde_json::Value,
    pub status: JobStatus,
    pub attempts: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub run_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub(crate) fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let kind_str: String = row.get(1)?;
        let payload_str: String = row.get(2)?;
        let status_str: String = row.get(3)?;
        let run_at_str: String = row.get(6)?;
        let created_at_str: String = row.get(7)?;
        let updated_at_str: String = row.get(8)?;

        Ok(Self {
            id: row.get(0)?,
            kind: JobKind::from_str(&kind_str),
            payload: serde_json::from_str(&payload_str).unwrap_or(serde_json::Value::Null),
            status: JobStatus::from_str(&status_str),
            attempts: row.get(4)?,
            last_error: row.get(5)?,
            run_at: parse_ts(&run_at_str),
            created_at: parse_ts(&created_at_str),
            updated_at: parse_ts(&updated_at_str),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [Role::Student, Role::Tutor, Role::Parent, Role::Admin] {
            assert_eq!(Role::from_str(role.as_str()), role);
        }
        assert_eq!(Role::from_str("unknown"), Role::Student);
    }

    #[test]
    fn test_commitment_status_round_trip() {
        for status in [
            CommitmentStatus::Pending,
            CommitmentStatus::Active,
            CommitmentStatus::Declined,
            CommitmentStatus::Completed,
            CommitmentStatus::Cancelled,
        ] {
            assert_eq!(CommitmentStatus::from_str(status.as_str()), status);
        }
    }

    #[test]
    fn test_user_serialization_hides_password_hash() {
        let user = User {
            id: "u1".into(),
            email: "a@b.com".into(),
            password_hash: "secret-hash".into(),
            display_name: "Alice".into(),
            role: Role::Student,
            status: AccountStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(json.contains(r#""role":"student""#));
    }

    #[test]
    fn test_conversation_peer_of() {
        let conv = Conversation {
            id: "c1".into(),
            user_a: "u1".into(),
            user_b: "u2".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(conv.peer_of("u1"), "u2");
        assert_eq!(conv.peer_of("u2"), "u1");
        assert!(conv.is_participant("u1"));
        assert!(!conv.is_participant("u3"));
    }

    #[test]
    fn test_session_ends_at() {
        let starts = Utc::now();
        let session = Session {
            id: "s1".into(),
            commitment_id: "c1".into(),
            starts_at: starts,
            duration_minutes: 45,
            status: SessionStatus::Scheduled,
            notes: None,
            created_at: starts,
            updated_at: starts,
        };
        assert_eq!(session.ends_at(), starts + chrono::Duration::minutes(45));
    }
}
