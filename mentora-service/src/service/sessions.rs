//! Session scheduling under active commitments.

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use super::MentoraService;
use crate::db::{CommitmentStatus, NotificationKind, Session, SessionStatus, User};
use crate::error::{ServiceError, ServiceResult};

/// Half-open interval intersection
fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

impl MentoraService {
    /// Tutor schedules a session under an active commitment.
    ///
    /// Rejects overlap with any of the tutor's other scheduled sessions.
    pub fn schedule_session(
        &self,
        user: &User,
        commitment_id: &str,
        starts_at: DateTime<Utc>,
        duration_minutes: i64,
    ) -> ServiceResult<Session> {
        let commitment =
            self.db
                .get_commitment(commitment_id)?
                .ok_or_else(|| ServiceError::CommitmentNotFound {
                    commitment_id: commitment_id.to_string(),
                })?;

        if commitment.tutor_id != user.id {
            return Err(ServiceError::Forbidden {
                message: "Only the commitment's tutor can schedule sessions".to_string(),
            });
        }
        if commitment.status != CommitmentStatus::Active {
            return Err(ServiceError::Conflict {
                message: "Sessions can only be scheduled under an active commitment".to_string(),
            });
        }
        if !(15..=480).contains(&duration_minutes) {
            return Err(ServiceError::Validation {
                message: "Duration must be between 15 and 480 minutes".to_string(),
            });
        }
        if starts_at <= Utc::now() {
            return Err(ServiceError::Validation {
                message: "Sessions must start in the future".to_string(),
            });
        }

        let ends_at = starts_at + chrono::Duration::minutes(duration_minutes);
        for existing in self.db.list_scheduled_sessions_for_tutor(&user.id)? {
            if overlaps(starts_at, ends_at, existing.starts_at, existing.ends_at()) {
                return Err(ServiceError::Conflict {
                    message: format!(
                        "Overlaps an existing session starting at {}",
                        existing.starts_at.to_rfc3339()
                    ),
                });
            }
        }

        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            commitment_id: commitment.id.clone(),
            starts_at,
            duration_minutes,
            status: SessionStatus::Scheduled,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        self.db.insert_session(&session)?;

        self.notify(
            &commitment.student_id,
            NotificationKind::SessionScheduled,
            format!(
                "{} scheduled a {} session for {}",
                user.display_name,
                commitment.subject,
                starts_at.to_rfc3339()
            ),
            Some(serde_json::json!({
                "session_id": session.id,
                "commitment_id": commitment.id,
            })),
        )?;

        info!(session_id = %session.id, commitment_id = %commitment.id, "Session scheduled");
        Ok(session)
    }

    /// List a commitment's sessions (same visibility as the commitment)
    pub fn list_sessions(&self, user: &User, commitment_id: &str) -> ServiceResult<Vec<Session>> {
        self.get_commitment_for(user, commitment_id)?;
        self.db.list_sessions_for_commitment(commitment_id)
    }

    /// Tutor marks a scheduled session completed, with optional notes
    pub fn complete_session(
        &self,
        user: &User,
        session_id: &str,
        notes: Option<&str>,
    ) -> ServiceResult<Session> {
        let (session, commitment) = self.session_with_commitment(session_id)?;

        if commitment.tutor_id != user.id {
            return Err(ServiceError::Forbidden {
                message: "Only the session's tutor can complete it".to_string(),
            });
        }
        if session.status != SessionStatus::Scheduled {
            return Err(ServiceError::Conflict {
                message: format!("Session is already {}", session.status.as_str()),
            });
        }

        self.db
            .update_session_status(session_id, SessionStatus::Completed, notes)?;

        self.refreshed_session(session_id)
    }

    /// Either participant cancels a scheduled session
    pub fn cancel_session(&self, user: &User, session_id: &str) -> ServiceResult<Session> {
        let (session, commitment) = self.session_with_commitment(session_id)?;

        if !commitment.is_participant(&user.id) {
            return Err(ServiceError::Forbidden {
                message: "Only participants can cancel a session".to_string(),
            });
        }
        if session.status != SessionStatus::Scheduled {
            return Err(ServiceError::Conflict {
                message: format!("Session is already {}", session.status.as_str()),
            });
        }

        self.db
            .update_session_status(session_id, SessionStatus::Cancelled, None)?;

        let counterpart = if commitment.student_id == user.id {
            &commitment.tutor_id
        } else {
            &commitment.student_id
        };
        self.notify(
            counterpart,
            NotificationKind::SessionCancelled,
            format!(
                "{} cancelled the session scheduled for {}",
                user.display_name,
                session.starts_at.to_rfc3339()
            ),
            Some(serde_json::json!({
                "session_id": session.id,
                "commitment_id": commitment.id,
            })),
        )?;

        self.refreshed_session(session_id)
    }

    fn session_with_commitment(
        &self,
        session_id: &str,
    ) -> ServiceResult<(Session, crate::db::Commitment)> {
        let session = self
            .db
            .get_session(session_id)?
            .ok_or_else(|| ServiceError::SessionNotFound {
                session_id: session_id.to_string(),
            })?;
        let commitment = self
            .db
            .get_commitment(&session.commitment_id)?
            .ok_or_else(|| ServiceError::CommitmentNotFound {
                commitment_id: session.commitment_id.clone(),
            })?;
        Ok((session, commitment))
    }

    fn refreshed_session(&self, session_id: &str) -> ServiceResult<Session> {
        self.db
            .get_session(session_id)?
            .ok_or_else(|| ServiceError::SessionNotFound {
                session_id: session_id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_overlap_detection() {
        // Identical intervals overlap
        assert!(overlaps(at(0), at(60), at(0), at(60)));
        // Partial overlap
        assert!(overlaps(at(0), at(60), at(30), at(90)));
        assert!(overlaps(at(30), at(90), at(0), at(60)));
        // Containment
        assert!(overlaps(at(0), at(120), at(30), at(60)));
        // Back-to-back sessions do not overlap (half-open intervals)
        assert!(!overlaps(at(0), at(60), at(60), at(120)));
        assert!(!overlaps(at(60), at(120), at(0), at(60)));
        // Disjoint
        assert!(!overlaps(at(0), at(60), at(120), at(180)));
    }
}
