//! Account registration, login, guardian links, and admin user management.

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use super::MentoraService;
use crate::auth;
use crate::db::{AccountStatus, JobKind, NotificationKind, Role, User};
use crate::error::{ServiceError, ServiceResult};

impl MentoraService {
    /// Register a new account. Admins are provisioned out of band, not
    /// through this endpoint.
    pub fn register(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
        role: Role,
    ) -> ServiceResult<User> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(ServiceError::Validation {
                message: "A valid email address is required".to_string(),
            });
        }
        if password.len() < 8 {
            return Err(ServiceError::Validation {
                message: "Password must be at least 8 characters".to_string(),
            });
        }
        if display_name.trim().is_empty() {
            return Err(ServiceError::Validation {
                message: "Display name is required".to_string(),
            });
        }
        if role == Role::Admin {
            return Err(ServiceError::InvalidRequest {
                message: "Cannot self-register as admin".to_string(),
            });
        }

        if self.db.get_user_by_email(&email)?.is_some() {
            return Err(ServiceError::EmailTaken);
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: email.clone(),
            password_hash: auth::hash_password(password)?,
            display_name: display_name.trim().to_string(),
            role,
            status: AccountStatus::Active,
            created_at: now,
            updated_at: now,
        };
        self.db.insert_user(&user)?;

        self.enqueue_email(
            &email,
            "Welcome to Mentora",
            &format!(
                "Hi {},\n\nYour Mentora account is ready. Log in to find a tutor \
                 or set up your tutor profile.\n\n— The Mentora team",
                user.display_name
            ),
        )?;

        info!(user_id = %user.id, role = %role.as_str(), "User registered");
        Ok(user)
    }

    /// Log in with email and password, returning a fresh bearer token.
    /// Unknown email and wrong password produce the same error.
    pub fn login(&self, email: &str, password: &str) -> ServiceResult<(String, DateTime<Utc>, User)> {
        let email = email.trim().to_lowercase();

        let bad_credentials = || ServiceError::Unauthorized {
            message: "Invalid email or password".to_string(),
        };

        let user = self.db.get_user_by_email(&email)?.ok_or_else(bad_credentials)?;
        if !auth::verify_password(password, &user.password_hash) {
            return Err(bad_credentials());
        }
        if user.status == AccountStatus::Suspended {
            return Err(ServiceError::Forbidden {
                message: "Account is suspended".to_string(),
            });
        }

        let (token, digest) = auth::generate_token();
        let expires_at = Utc::now() + self.runtime_config.dynamic().auth.token_ttl();
        self.db.insert_auth_token(&digest, &user.id, expires_at)?;

        metrics::counter!("mentora_logins_total").increment(1);
        info!(user_id = %user.id, "User logged in");
        Ok((token, expires_at, user))
    }

    /// Revoke the presented token
    pub fn logout(&self, token: &str) -> ServiceResult<()> {
        self.db.delete_auth_token(&auth::token_digest(token))?;
        Ok(())
    }

    /// Update the caller's display name
    pub fn update_display_name(&self, user_id: &str, display_name: &str) -> ServiceResult<User> {
        if display_name.trim().is_empty() {
            return Err(ServiceError::Validation {
                message: "Display name is required".to_string(),
            });
        }
        self.db.update_user_display_name(user_id, display_name.trim())?;
        self.db.get_user(user_id)?.ok_or_else(|| ServiceError::UserNotFound {
            user_id: user_id.to_string(),
        })
    }

    /// Link a student to a parent account
    pub fn link_student(&self, parent: &User, student_id: &str) -> ServiceResult<User> {
        parent_only(parent)?;

        let student = self
            .db
            .get_user(student_id)?
            .ok_or_else(|| ServiceError::UserNotFound {
                user_id: student_id.to_string(),
            })?;
        if student.role != Role::Student {
            return Err(ServiceError::InvalidRequest {
                message: "Only student accounts can be linked".to_string(),
            });
        }

        self.db.insert_guardian_link(&parent.id, &student.id)?;
        Ok(student)
    }

    /// List a parent's linked students
    pub fn list_linked_students(&self, parent: &User) -> ServiceResult<Vec<User>> {
        parent_only(parent)?;
        self.db.list_guardian_students(&parent.id)
    }

    /// Admin: suspend an account and revoke its tokens
    pub fn suspend_user(&self, user_id: &str) -> ServiceResult<User> {
        let user = self
            .db
            .get_user(user_id)?
            .ok_or_else(|| ServiceError::UserNotFound {
                user_id: user_id.to_string(),
            })?;
        if user.is_admin() {
            return Err(ServiceError::Forbidden {
                message: "Admin accounts cannot be suspended".to_string(),
            });
        }

        self.db.set_user_status(user_id, AccountStatus::Suspended)?;
        let revoked = self.db.delete_auth_tokens_for_user(user_id)?;
        info!(user_id = %user_id, revoked_tokens = revoked, "User suspended");

        self.db.get_user(user_id)?.ok_or_else(|| ServiceError::UserNotFound {
            user_id: user_id.to_string(),
        })
    }

    /// Admin: reinstate a suspended account
    pub fn reinstate_user(&self, user_id: &str) -> ServiceResult<User> {
        let user = self
            .db
            .get_user(user_id)?
            .ok_or_else(|| ServiceError::UserNotFound {
                user_id: user_id.to_string(),
            })?;

        self.db.set_user_status(&user.id, AccountStatus::Active)?;
        self.notify(
            &user.id,
            NotificationKind::AccountReinstated,
            "Your account has been reinstated.",
            None,
        )?;
        info!(user_id = %user_id, "User reinstated");

        self.db.get_user(user_id)?.ok_or_else(|| ServiceError::UserNotFound {
            user_id: user_id.to_string(),
        })
    }

    /// Enqueue an email job
    pub(super) fn enqueue_email(&self, to: &str, subject: &str, body: &str) -> ServiceResult<()> {
        self.db.enqueue_job(
            JobKind::Email,
            &serde_json::json!({
                "to": to,
                "subject": subject,
                "body": body,
            }),
            Utc::now(),
        )?;
        Ok(())
    }
}

fn parent_only(user: &User) -> ServiceResult<()> {
    if user.role == Role::Parent {
        Ok(())
    } else {
        Err(ServiceError::Forbidden {
            message: "Requires parent role".to_string(),
        })
    }
}
