//! Violation report operations.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};

use super::Database;
use super::models::{ReportDecision, ReportStatus, ViolationReport};
use crate::error::{DatabaseError, ServiceResult};

const REPORT_COLUMNS: &str = "id, reporter_id, tutor_id, commitment_id, description, status, \
                              decision, resolution_note, created_at, resolved_at";

impl Database {
    /// Insert a violation report
    pub fn insert_report(&self, report: &ViolationReport) -> ServiceResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            r#"
            INSERT INTO violation_reports (id, reporter_id, tutor_id, commitment_id, description, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                report.id,
                report.reporter_id,
                report.tutor_id,
                report.commitment_id,
                report.description,
                report.status.as_str(),
                report.created_at.to_rfc3339(),
            ],
        )
        .map_err(DatabaseError::Query)?;

        Ok(())
    }

    /// Get a report by ID
    pub fn get_report(&self, id: &str) -> ServiceResult<Option<ViolationReport>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            &format!(
                "SELECT {} FROM violation_reports WHERE id = ?1",
                REPORT_COLUMNS
            ),
            params![id],
            ViolationReport::from_row,
        )
        .optional()
        .map_err(DatabaseError::Query)
        .map_err(Into::into)
    }

    /// List reports filed by a user
    pub fn list_reports_for_reporter(&self, reporter_id: &str) -> ServiceResult<Vec<ViolationReport>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM violation_reports WHERE reporter_id = ?1 ORDER BY created_at DESC",
                REPORT_COLUMNS
            ))
            .map_err(DatabaseError::Query)?;

        let reports = stmt
            .query_map(params![reporter_id], ViolationReport::from_row)
            .map_err(DatabaseError::Query)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(reports)
    }

    /// List reports for admin review, optionally filtered by status
    pub fn list_reports(&self, status: Option<ReportStatus>) -> ServiceResult<Vec<ViolationReport>> {
        let conn = self.conn.lock().unwrap();

        let reports = if let Some(status) = status {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {} FROM violation_reports WHERE status = ?1 ORDER BY created_at ASC",
                    REPORT_COLUMNS
                ))
                .map_err(DatabaseError::Query)?;
            stmt.query_map(params![status.as_str()], ViolationReport::from_row)
                .map_err(DatabaseError::Query)?
                .filter_map(|r| r.ok())
                .collect()
        } else {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {} FROM violation_reports ORDER BY created_at ASC",
                    REPORT_COLUMNS
                ))
                .map_err(DatabaseError::Query)?;
            stmt.query_map([], ViolationReport::from_row)
                .map_err(DatabaseError::Query)?
                .filter_map(|r| r.ok())
                .collect()
        };

        Ok(reports)
    }

    /// Record an admin decision on an open report
    pub fn resolve_report(
        &self,
        id: &str,
        decision: ReportDecision,
        note: &str,
        resolved_at: DateTime<Utc>,
    ) -> ServiceResult<bool> {
        let conn = self.conn.lock().unwrap();

        let rows = conn
            .execute(
                "UPDATE violation_reports \
                 SET status = 'resolved', decision = ?2, resolution_note = ?3, resolved_at = ?4 \
                 WHERE id = ?1 AND status = 'open'",
                params![id, decision.as_str(), note, resolved_at.to_rfc3339()],
            )
            .map_err(DatabaseError::Query)?;

        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{AccountStatus, Role, User};

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
    }

    #[test]
    fn test_report_resolution_is_single_shot() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);

        db.insert_report(&ViolationReport {
            id: "r1".to_string(),
            reporter_id: "s1".to_string(),
            tutor_id: "t1".to_string(),
            commitment_id: None,
            description: "No-show twice in a row".to_string(),
            status: ReportStatus::Open,
            decision: None,
            resolution_note: None,
            created_at: Utc::now(),
            resolved_at: None,
        })
        .unwrap();

        assert_eq!(db.list_reports(Some(ReportStatus::Open)).unwrap().len(), 1);

        assert!(
            db.resolve_report("r1", ReportDecision::Warning, "warned the tutor", Utc::now())
                .unwrap()
        );
        // Already resolved: second resolution is rejected
        assert!(
            !db.resolve_report("r1", ReportDecision::Dismissed, "oops", Utc::now())
                .unwrap()
        );

        let report = db.get_report("r1").unwrap().unwrap();
        assert_eq!(report.status, ReportStatus::Resolved);
        assert_eq!(report.decision, Some(ReportDecision::Warning));
        assert!(report.resolved_at.is_some());

        assert_eq!(db.list_reports_for_reporter("s1").unwrap().len(), 1);
        assert!(db.list_reports(Some(ReportStatus::Open)).unwrap().is_empty());
    }
}
