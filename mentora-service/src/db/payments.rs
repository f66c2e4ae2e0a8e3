//! Payment record operations.

use chrono::Utc;
use rusqlite::{OptionalExtension, params};

use super::Database;
use super::models::{Payment, PaymentStatus};
use crate::error::{DatabaseError, ServiceResult};

const PAYMENT_COLUMNS: &str = "id, commitment_id, payer_id, amount_cents, currency, \
                               session_count, status, gateway_ref, created_at, updated_at";

impl Database {
    /// Insert a payment
    pub fn insert_payment(&self, payment: &Payment) -> ServiceResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            r#"
            INSERT INTO payments (id, commitment_id, payer_id, amount_cents, currency, session_count, status, gateway_ref, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                payment.id,
                payment.commitment_id,
                payment.payer_id,
                payment.amount_cents,
                payment.currency,
                payment.session_count,
                payment.status.as_str(),
                payment.gateway_ref,
                payment.created_at.to_rfc3339(),
                payment.updated_at.to_rfc3339(),
            ],
        )
        .map_err(DatabaseError::Query)?;

        Ok(())
    }

    /// Get a payment by ID
    pub fn get_payment(&self, id: &str) -> ServiceResult<Option<Payment>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            &format!("SELECT {} FROM payments WHERE id = ?1", PAYMENT_COLUMNS),
            params![id],
            Payment::from_row,
        )
        .optional()
        .map_err(DatabaseError::Query)
        .map_err(Into::into)
    }

    /// Look up a payment by its gateway reference
    pub fn get_payment_by_gateway_ref(&self, gateway_ref: &str) -> ServiceResult<Option<Payment>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            &format!(
                "SELECT {} FROM payments WHERE gateway_ref = ?1",
                PAYMENT_COLUMNS
            ),
            params![gateway_ref],
            Payment::from_row,
        )
        .optional()
        .map_err(DatabaseError::Query)
        .map_err(Into::into)
    }

    /// Attach the gateway reference to a payment
    pub fn set_payment_gateway_ref(&self, id: &str, gateway_ref: &str) -> ServiceResult<bool> {
        let conn = self.conn.lock().unwrap();

        let rows = conn
            .execute(
                "UPDATE payments SET gateway_ref = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, gateway_ref, Utc::now().to_rfc3339()],
            )
            .map_err(DatabaseError::Query)?;

        Ok(rows > 0)
    }

    /// Update a payment's status
    pub fn update_payment_status(&self, id: &str, status: PaymentStatus) -> ServiceResult<bool> {
        let conn = self.conn.lock().unwrap();

        let rows = conn
            .execute(
                "UPDATE payments SET status = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, status.as_str(), Utc::now().to_rfc3339()],
            )
            .map_err(DatabaseError::Query)?;

        Ok(rows > 0)
    }

    /// Payments visible to a user: payments they made, plus payments on
    /// commitments they teach.
    pub fn list_payments_for_user(&self, user_id: &str) -> ServiceResult<Vec<Payment>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(&format!(
                "SELECT p.{} FROM payments p \
                 JOIN commitments c ON c.id = p.commitment_id \
                 WHERE p.payer_id = ?1 OR c.tutor_id = ?1 \
                 ORDER BY p.created_at DESC",
                PAYMENT_COLUMNS.replace(", ", ", p.")
            ))
            .map_err(DatabaseError::Query)?;

        let payments = stmt
            .query_map(params![user_id], Payment::from_row)
            .map_err(DatabaseError::Query)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(payments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{AccountStatus, Commitment, CommitmentStatus, Role, User};

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

    #[test]
    fn test_payment_lookup_by_gateway_ref() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);

        db.insert_payment(&Payment {
            id: "p1".to_string(),
            commitment_id: "c1".to_string(),
            payer_id: "s1".to_string(),
            amount_cents: 8000,
            currency: "usd".to_string(),
            session_count: 2,
            status: PaymentStatus::Pending,
            gateway_ref: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .unwrap();

        assert!(db.set_payment_gateway_ref("p1", "cs_123").unwrap());
        let payment = db.get_payment_by_gateway_ref("cs_123").unwrap().unwrap();
        assert_eq!(payment.id, "p1");

        assert!(db.update_payment_status("p1", PaymentStatus::Succeeded).unwrap());
        let payment = db.get_payment("p1").unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Succeeded);

        // Both the payer and the tutor see the payment
        assert_eq!(db.list_payments_for_user("s1").unwrap().len(), 1);
        assert_eq!(db.list_payments_for_user("t1").unwrap().len(), 1);
        assert!(db.list_payments_for_user("other").unwrap().is_empty());
    }
}
