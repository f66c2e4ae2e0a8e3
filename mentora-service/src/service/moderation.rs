//! Violation reports and admin moderation.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::MentoraService;
use crate::db::{
    NotificationKind, ReportDecision, ReportStatus, Role, User, ViolationReport,
};
use crate::error::{ServiceError, ServiceResult};

impl MentoraService {
    /// Student or parent files a violation report against a tutor
    pub fn file_report(
        &self,
        reporter: &User,
        tutor_id: &str,
        commitment_id: Option<&str>,
        description: &str,
    ) -> ServiceResult<ViolationReport> {
        if !matches!(reporter.role, Role::Student | Role::Parent) {
            return Err(ServiceError::Forbidden {
                message: "Only students and parents can file reports".to_string(),
            });
        }
        if description.trim().is_empty() {
            return Err(ServiceError::Validation {
                message: "Description is required".to_string(),
            });
        }

        let tutor = self
            .db
            .get_user(tutor_id)?
            .filter(|u| u.role == Role::Tutor)
            .ok_or_else(|| ServiceError::TutorNotFound {
                tutor_id: tutor_id.to_string(),
            })?;

        // A referenced commitment must involve the named tutor and the
        // reporter (directly, or through a linked student)
        if let Some(commitment_id) = commitment_id {
            let commitment = self.db.get_commitment(commitment_id)?.ok_or_else(|| {
                ServiceError::CommitmentNotFound {
                    commitment_id: commitment_id.to_string(),
                }
            })?;
            if commitment.tutor_id != tutor.id {
                return Err(ServiceError::InvalidRequest {
                    message: "Commitment does not involve this tutor".to_string(),
                });
            }
            let reporter_involved = commitment.student_id == reporter.id
                || self.db.is_guardian_of(&reporter.id, &commitment.student_id)?;
            if !reporter_involved {
                return Err(ServiceError::Forbidden {
                    message: "Commitment does not involve you".to_string(),
                });
            }
        }

        let report = ViolationReport {
            id: Uuid::new_v4().to_string(),
            reporter_id: reporter.id.clone(),
            tutor_id: tutor.id.clone(),
            commitment_id: commitment_id.map(|s| s.to_string()),
            description: description.trim().to_string(),
            status: ReportStatus::Open,
            decision: None,
            resolution_note: None,
            created_at: Utc::now(),
            resolved_at: None,
        };
        self.db.insert_report(&report)?;

        info!(report_id = %report.id, tutor_id = %tutor.id, "Violation report filed");
        Ok(report)
    }

    /// List the caller's own reports
    pub fn list_my_reports(&self, user: &User) -> ServiceResult<Vec<ViolationReport>> {
        self.db.list_reports_for_reporter(&user.id)
    }

    /// Admin: list reports, optionally by status
    pub fn list_reports(&self, status: Option<ReportStatus>) -> ServiceResult<Vec<ViolationReport>> {
        self.db.list_reports(status)
    }

    /// Admin: resolve an open report.
    ///
    /// A suspension decision also suspends the tutor and revokes their
    /// tokens. The reporter is notified of the outcome.
    pub fn resolve_report(
        &self,
        report_id: &str,
        decision: ReportDecision,
        note: &str,
    ) -> ServiceResult<ViolationReport> {
        let report = self
            .db
            .get_report(report_id)?
            .ok_or_else(|| ServiceError::ReportNotFound {
                report_id: report_id.to_string(),
            })?;

        if !self.db.resolve_report(report_id, decision, note, Utc::now())? {
            return Err(ServiceError::Conflict {
                message: "Report is already resolved".to_string(),
            });
        }

        if decision == ReportDecision::Suspension {
            self.suspend_user(&report.tutor_id)?;
        }

        self.notify(
            &report.reporter_id,
            NotificationKind::ReportResolved,
            format!("Your report was reviewed: {}", decision.as_str()),
            Some(serde_json::json!({ "report_id": report.id })),
        )?;

        info!(
            report_id = %report_id,
            decision = %decision.as_str(),
            "Report resolved"
        );

        self.db
            .get_report(report_id)?
            .ok_or_else(|| ServiceError::ReportNotFound {
                report_id: report_id.to_string(),
            })
    }
}
