//! Learning commitment lifecycle.
//!
//! Transitions: pending -> active (tutor accepts), pending -> declined,
//! pending|active -> cancelled (either participant), active -> completed
//! (tutor). Everything else is a conflict.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::MentoraService;
use crate::db::{AccountStatus, Commitment, CommitmentStatus, NotificationKind, Role, User};
use crate::error::{ServiceError, ServiceResult};

impl MentoraService {
    /// Student requests a commitment with a tutor
    pub fn create_commitment(
        &self,
        student: &User,
        tutor_id: &str,
        subject: &str,
        goal: &str,
        sessions_per_week: i64,
        rate_cents: i64,
    ) -> ServiceResult<Commitment> {
        if student.role != Role::Student {
            return Err(ServiceError::Forbidden {
                message: "Only students can request commitments".to_string(),
            });
        }

        if subject.trim().is_empty() {
            return Err(ServiceError::Validation {
                message: "Subject is required".to_string(),
            });
        }
        if !(1..=14).contains(&sessions_per_week) {
            return Err(ServiceError::Validation {
                message: "Sessions per week must be between 1 and 14".to_string(),
            });
        }
        if rate_cents <= 0 {
            return Err(ServiceError::Validation {
                message: "Rate must be positive".to_string(),
            });
        }
        if tutor_id == student.id {
            return Err(ServiceError::InvalidRequest {
                message: "Cannot request a commitment with yourself".to_string(),
            });
        }

        let tutor = self
            .db
            .get_user(tutor_id)?
            .filter(|u| u.role == Role::Tutor && u.status == AccountStatus::Active)
            .ok_or_else(|| ServiceError::TutorNotFound {
                tutor_id: tutor_id.to_string(),
            })?;

        let now = Utc::now();
        let commitment = Commitment {
            id: Uuid::new_v4().to_string(),
            student_id: student.id.clone(),
            tutor_id: tutor.id.clone(),
            subject: subject.trim().to_lowercase(),
            goal: goal.trim().to_string(),
            sessions_per_week,
            rate_cents,
            status: CommitmentStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.db.insert_commitment(&commitment)?;

        self.notify(
            &tutor.id,
            NotificationKind::CommitmentRequested,
            format!(
                "{} requested {} tutoring: {}",
                student.display_name, commitment.subject, commitment.goal
            ),
            Some(serde_json::json!({ "commitment_id": commitment.id })),
        )?;

        info!(commitment_id = %commitment.id, "Commitment requested");
        Ok(commitment)
    }

    /// Fetch a commitment the user is allowed to see: participants,
    /// linked parents of the student, and admins.
    pub fn get_commitment_for(&self, user: &User, commitment_id: &str) -> ServiceResult<Commitment> {
        let commitment =
            self.db
                .get_commitment(commitment_id)?
                .ok_or_else(|| ServiceError::CommitmentNotFound {
                    commitment_id: commitment_id.to_string(),
                })?;

        if commitment.is_participant(&user.id)
            || user.is_admin()
            || self.db.is_guardian_of(&user.id, &commitment.student_id)?
        {
            Ok(commitment)
        } else {
            Err(ServiceError::Forbidden {
                message: "Not a participant in this commitment".to_string(),
            })
        }
    }

    /// List the commitments visible to a user. Parents additionally see
    /// their linked students' commitments.
    pub fn list_commitments(&self, user: &User) -> ServiceResult<Vec<Commitment>> {
        let mut commitments = self.db.list_commitments_for_user(&user.id)?;

        if user.role == Role::Parent {
            for student in self.db.list_guardian_students(&user.id)? {
                commitments.extend(self.db.list_commitments_for_user(&student.id)?);
            }
            commitments.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
            commitments.dedup_by(|a, b| a.id == b.id);
        }

        Ok(commitments)
    }

    /// Tutor accepts a pending commitment
    pub fn accept_commitment(&self, user: &User, commitment_id: &str) -> ServiceResult<Commitment> {
        let commitment = self.transition_as_tutor(
            user,
            commitment_id,
            CommitmentStatus::Pending,
            CommitmentStatus::Active,
        )?;

        self.notify(
            &commitment.student_id,
            NotificationKind::CommitmentAccepted,
            format!("{} accepted your {} commitment", user.display_name, commitment.subject),
            Some(serde_json::json!({ "commitment_id": commitment.id })),
        )?;

        Ok(commitment)
    }

    /// Tutor declines a pending commitment
    pub fn decline_commitment(&self, user: &User, commitment_id: &str) -> ServiceResult<Commitment> {
        let commitment = self.transition_as_tutor(
            user,
            commitment_id,
            CommitmentStatus::Pending,
            CommitmentStatus::Declined,
        )?;

        self.notify(
            &commitment.student_id,
            NotificationKind::CommitmentDeclined,
            format!("{} declined your {} commitment", user.display_name, commitment.subject),
            Some(serde_json::json!({ "commitment_id": commitment.id })),
        )?;

        Ok(commitment)
    }

    /// Either participant cancels a pending or active commitment
    pub fn cancel_commitment(&self, user: &User, commitment_id: &str) -> ServiceResult<Commitment> {
        let commitment = self.get_commitment_for(user, commitment_id)?;

        if !commitment.is_participant(&user.id) {
            return Err(ServiceError::Forbidden {
                message: "Only participants can cancel a commitment".to_string(),
            });
        }
        if !matches!(
            commitment.status,
            CommitmentStatus::Pending | CommitmentStatus::Active
        ) {
            return Err(ServiceError::Conflict {
                message: format!(
                    "Cannot cancel a {} commitment",
                    commitment.status.as_str()
                ),
            });
        }

        self.db
            .update_commitment_status(commitment_id, CommitmentStatus::Cancelled)?;

        let counterpart = if commitment.student_id == user.id {
            &commitment.tutor_id
        } else {
            &commitment.student_id
        };
        self.notify(
            counterpart,
            NotificationKind::CommitmentCancelled,
            format!("{} cancelled the {} commitment", user.display_name, commitment.subject),
            Some(serde_json::json!({ "commitment_id": commitment.id })),
        )?;

        self.refreshed_commitment(commitment_id)
    }

    /// Tutor marks an active commitment completed
    pub fn complete_commitment(&self, user: &User, commitment_id: &str) -> ServiceResult<Commitment> {
        self.transition_as_tutor(
            user,
            commitment_id,
            CommitmentStatus::Active,
            CommitmentStatus::Completed,
        )
    }

    /// Shared tutor-only status transition with a required current state
    fn transition_as_tutor(
        &self,
        user: &User,
        commitment_id: &str,
        from: CommitmentStatus,
        to: CommitmentStatus,
    ) -> ServiceResult<Commitment> {
        let commitment =
            self.db
                .get_commitment(commitment_id)?
                .ok_or_else(|| ServiceError::CommitmentNotFound {
                    commitment_id: commitment_id.to_string(),
                })?;

        if commitment.tutor_id != user.id {
            return Err(ServiceError::Forbidden {
                message: "Only the commitment's tutor can do this".to_string(),
            });
        }
        if commitment.status != from {
            return Err(ServiceError::Conflict {
                message: format!(
                    "Commitment is {}, expected {}",
                    commitment.status.as_str(),
                    from.as_str()
                ),
            });
        }

        self.db.update_commitment_status(commitment_id, to)?;
        info!(commitment_id = %commitment_id, status = %to.as_str(), "Commitment transitioned");

        self.refreshed_commitment(commitment_id)
    }

    fn refreshed_commitment(&self, commitment_id: &str) -> ServiceResult<Commitment> {
        self.db
            .get_commitment(commitment_id)?
            .ok_or_else(|| ServiceError::CommitmentNotFound {
                commitment_id: commitment_id.to_string(),
            })
    }
}
