//! Password hashing, bearer tokens, and the request authentication extractor.
//!
//! Tokens are opaque: 32 random bytes, base64url-encoded for the client,
//! stored server-side as SHA-256 digests so a database leak does not leak
//! usable credentials. Revocation is a row delete.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::password_hash::rand_core::OsRng as SaltRng;
use argon2::Argon2;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::ops::Deref;
use std::sync::Arc;

use crate::api::AppState;
use crate::db::{AccountStatus, Role, User};
use crate::error::{ServiceError, ServiceResult};

/// Hash a password with Argon2id and a fresh salt
pub fn hash_password(password: &str) -> ServiceResult<String> {
    let salt = SaltString::generate(&mut SaltRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::Internal {
            message: format!("Password hashing failed: {}", e),
        })
}

/// Verify a password against a stored hash
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Generate a fresh bearer token. Returns `(plaintext, digest)`; only the
/// digest is persisted.
pub fn generate_token() -> (String, String) {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    let token = URL_SAFE_NO_PAD.encode(bytes);
    let digest = token_digest(&token);
    (token, digest)
}

/// SHA-256 hex digest of a token, the at-rest representation
pub fn token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// The authenticated user behind a request.
///
/// Extracting this rejects missing/invalid/expired tokens with 401 and
/// suspended accounts with 403.
pub struct CurrentUser(pub User);

impl Deref for CurrentUser {
    type Target = User;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl CurrentUser {
    /// Require a specific role
    pub fn require_role(&self, role: Role) -> ServiceResult<()> {
        if self.0.role == role {
            Ok(())
        } else {
            Err(ServiceError::Forbidden {
                message: format!("Requires {} role", role.as_str()),
            })
        }
    }

    /// Require the admin role
    pub fn require_admin(&self) -> ServiceResult<()> {
        self.require_role(Role::Admin)
    }
}

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ServiceError::Unauthorized {
                    message: "Missing or malformed bearer token".to_string(),
                })?;

        let digest = token_digest(bearer.token());
        let user = state
            .service
            .db
            .get_user_by_token_hash(&digest)?
            .ok_or_else(|| ServiceError::Unauthorized {
                message: "Invalid or expired token".to_string(),
            })?;

        if user.status == AccountStatus::Suspended {
            return Err(ServiceError::Forbidden {
                message: "Account is suspended".to_string(),
            });
        }

        Ok(CurrentUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_round_trip() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert!(verify_password("correct horse battery staple", &hash));
        assert!(!verify_password("wrong password", &hash));
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn test_token_digest_is_deterministic() {
        let (token, digest) = generate_token();
        assert_eq!(token_digest(&token), digest);
        assert_eq!(digest.len(), 64); // SHA-256 hex
        assert_ne!(token, digest);
    }

    #[test]
    fn test_tokens_are_unique() {
        let (a, _) = generate_token();
        let (b, _) = generate_token();
        assert_ne!(a, b);
    }
}
