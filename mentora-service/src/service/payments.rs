//! Payment checkout and webhook handling.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::MentoraService;
use crate::db::{CommitmentStatus, NotificationKind, Payment, PaymentStatus, User};
use crate::error::{ServiceError, ServiceResult};
use crate::gateway::WebhookEventType;

impl MentoraService {
    /// Start a checkout for N sessions of an active commitment.
    ///
    /// Returns the pending payment and the gateway URL to redirect to.
    pub async fn checkout(
        &self,
        user: &User,
        commitment_id: &str,
        session_count: i64,
    ) -> ServiceResult<(Payment, String)> {
        let commitment =
            self.db
                .get_commitment(commitment_id)?
                .ok_or_else(|| ServiceError::CommitmentNotFound {
                    commitment_id: commitment_id.to_string(),
                })?;

        let is_payer = commitment.student_id == user.id
            || self.db.is_guardian_of(&user.id, &commitment.student_id)?;
        if !is_payer {
            return Err(ServiceError::Forbidden {
                message: "Only the student or a linked parent can pay".to_string(),
            });
        }
        if commitment.status != CommitmentStatus::Active {
            return Err(ServiceError::Conflict {
                message: "Payments require an active commitment".to_string(),
            });
        }
        if !(1..=52).contains(&session_count) {
            return Err(ServiceError::Validation {
                message: "Session count must be between 1 and 52".to_string(),
            });
        }

        let currency = self.runtime_config.dynamic().payments.currency.clone();
        let amount_cents = commitment.rate_cents * session_count;

        let now = Utc::now();
        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            commitment_id: commitment.id.clone(),
            payer_id: user.id.clone(),
            amount_cents,
            currency: currency.clone(),
            session_count,
            status: PaymentStatus::Pending,
            gateway_ref: None,
            created_at: now,
            updated_at: now,
        };
        self.db.insert_payment(&payment)?;

        let session = match self
            .gateway
            .create_checkout_session(&payment.id, amount_cents, &currency)
            .await
        {
            Ok(session) => session,
            Err(e) => {
                // The row stays for auditing; nothing was charged
                self.db
                    .update_payment_status(&payment.id, PaymentStatus::Failed)?;
                return Err(e);
            }
        };

        self.db.set_payment_gateway_ref(&payment.id, &session.id)?;
        info!(payment_id = %payment.id, gateway_ref = %session.id, "Checkout session created");

        let payment = self
            .db
            .get_payment(&payment.id)?
            .ok_or_else(|| ServiceError::PaymentNotFound {
                payment_id: payment.id.clone(),
            })?;

        Ok((payment, session.url))
    }

    /// Handle a signed gateway webhook delivery.
    ///
    /// Repeated deliveries are idempotent: payments already in a final
    /// state are left untouched.
    pub fn handle_payment_webhook(&self, body: &[u8], signature: &str) -> ServiceResult<()> {
        let event = self.gateway.parse_webhook(body, signature)?;

        let payment = self
            .db
            .get_payment_by_gateway_ref(&event.session_id)?
            .ok_or_else(|| ServiceError::PaymentNotFound {
                payment_id: event.session_id.clone(),
            })?;

        if payment.status.is_final() {
            warn!(
                payment_id = %payment.id,
                status = %payment.status.as_str(),
                "Duplicate webhook delivery ignored"
            );
            return Ok(());
        }

        match event.event_type {
            WebhookEventType::CheckoutCompleted => {
                self.db
                    .update_payment_status(&payment.id, PaymentStatus::Succeeded)?;
                metrics::counter!("mentora_payments_succeeded_total").increment(1);
                info!(payment_id = %payment.id, "Payment succeeded");

                self.notify(
                    &payment.payer_id,
                    NotificationKind::PaymentSucceeded,
                    format!(
                        "Your payment of {} {} was received",
                        format_amount(payment.amount_cents),
                        payment.currency.to_uppercase()
                    ),
                    Some(serde_json::json!({ "payment_id": payment.id })),
                )?;

                if let Some(payer) = self.db.get_user(&payment.payer_id)? {
                    self.enqueue_email(
                        &payer.email,
                        "Your Mentora receipt",
                        &format!(
                            "Hi {},\n\nWe received your payment of {} {} covering {} \
                             sessions.\n\n— The Mentora team",
                            payer.display_name,
                            format_amount(payment.amount_cents),
                            payment.currency.to_uppercase(),
                            payment.session_count
                        ),
                    )?;
                }
            }
            WebhookEventType::CheckoutFailed => {
                self.db
                    .update_payment_status(&payment.id, PaymentStatus::Failed)?;
                info!(payment_id = %payment.id, "Payment failed at the gateway");
            }
        }

        Ok(())
    }

    /// Payments visible to the caller
    pub fn list_payments(&self, user: &User) -> ServiceResult<Vec<Payment>> {
        self.db.list_payments_for_user(&user.id)
    }
}

fn format_amount(cents: i64) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0), "0.00");
        assert_eq!(format_amount(5), "0.05");
        assert_eq!(format_amount(4500), "45.00");
        assert_eq!(format_amount(123456), "1234.56");
    }
}
