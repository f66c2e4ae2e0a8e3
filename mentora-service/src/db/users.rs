//! User account, auth token, and guardian link operations.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};

use super::Database;
use super::models::{AccountStatus, Role, User};
use crate::error::{DatabaseError, ServiceResult};

const USER_COLUMNS: &str =
    "id, email, password_hash, display_name, role, status, created_at, updated_at";

impl Database {
    /// Insert a new user
    pub fn insert_user(&self, user: &User) -> ServiceResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            r#"
            INSERT INTO users (id, email, password_hash, display_name, role, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                user.id,
                user.email,
                user.password_hash,
                user.display_name,
                user.role.as_str(),
                user.status.as_str(),
                user.created_at.to_rfc3339(),
                user.updated_at.to_rfc3339(),
            ],
        )
        .map_err(DatabaseError::Query)?;

        Ok(())
    }

    /// Get a user by ID
    pub fn get_user(&self, id: &str) -> ServiceResult<Option<User>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
            params![id],
            User::from_row,
        )
        .optional()
        .map_err(DatabaseError::Query)
        .map_err(Into::into)
    }

    /// Get a user by email (emails are stored lowercased)
    pub fn get_user_by_email(&self, email: &str) -> ServiceResult<Option<User>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            &format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS),
            params![email],
            User::from_row,
        )
        .optional()
        .map_err(DatabaseError::Query)
        .map_err(Into::into)
    }

    /// Update a user's display name
    pub fn update_user_display_name(&self, id: &str, display_name: &str) -> ServiceResult<bool> {
        let conn = self.conn.lock().unwrap();

        let rows = conn
            .execute(
                "UPDATE users SET display_name = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, display_name, Utc::now().to_rfc3339()],
            )
            .map_err(DatabaseError::Query)?;

        Ok(rows > 0)
    }

    /// Set a user's account status
    pub fn set_user_status(&self, id: &str, status: AccountStatus) -> ServiceResult<bool> {
        let conn = self.conn.lock().unwrap();

        let rows = conn
            .execute(
                "UPDATE users SET status = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, status.as_str(), Utc::now().to_rfc3339()],
            )
            .map_err(DatabaseError::Query)?;

        Ok(rows > 0)
    }

    /// List users, optionally filtered by role and status
    pub fn list_users(
        &self,
        role: Option<Role>,
        status: Option<AccountStatus>,
    ) -> ServiceResult<Vec<User>> {
        let conn = self.conn.lock().unwrap();

        let mut sql = format!("SELECT {} FROM users WHERE 1=1", USER_COLUMNS);
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(role) = role {
            params_vec.push(Box::new(role.as_str().to_string()));
            sql.push_str(&format!(" AND role = ?{}", params_vec.len()));
        }
        if let Some(status) = status {
            params_vec.push(Box::new(status.as_str().to_string()));
            sql.push_str(&format!(" AND status = ?{}", params_vec.len()));
        }
        sql.push_str(" ORDER BY created_at ASC");

        let mut stmt = conn.prepare(&sql).map_err(DatabaseError::Query)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();

        let users = stmt
            .query_map(params_refs.as_slice(), User::from_row)
            .map_err(DatabaseError::Query)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(users)
    }

    // === Auth tokens ===

    /// Store a new auth token digest
    pub fn insert_auth_token(
        &self,
        token_hash: &str,
        user_id: &str,
        expires_at: DateTime<Utc>,
    ) -> ServiceResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT INTO auth_tokens (token_hash, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                token_hash,
                user_id,
                Utc::now().to_rfc3339(),
                expires_at.to_rfc3339()
            ],
        )
        .map_err(DatabaseError::Query)?;

        Ok(())
    }

    /// Resolve a token digest to its user, if the token is still valid
    pub fn get_user_by_token_hash(&self, token_hash: &str) -> ServiceResult<Option<User>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            &format!(
                "SELECT u.{} FROM users u \
                 JOIN auth_tokens t ON u.id = t.user_id \
                 WHERE t.token_hash = ?1 AND t.expires_at > ?2",
                USER_COLUMNS.replace(", ", ", u.")
            ),
            params![token_hash, Utc::now().to_rfc3339()],
            User::from_row,
        )
        .optional()
        .map_err(DatabaseError::Query)
        .map_err(Into::into)
    }

    /// Revoke a single token
    pub fn delete_auth_token(&self, token_hash: &str) -> ServiceResult<bool> {
        let conn = self.conn.lock().unwrap();

        let rows = conn
            .execute(
                "DELETE FROM auth_tokens WHERE token_hash = ?1",
                params![token_hash],
            )
            .map_err(DatabaseError::Query)?;

        Ok(rows > 0)
    }

    /// Revoke every token belonging to a user (suspension, password change)
    pub fn delete_auth_tokens_for_user(&self, user_id: &str) -> ServiceResult<usize> {
        let conn = self.conn.lock().unwrap();

        let rows = conn
            .execute(
                "DELETE FROM auth_tokens WHERE user_id = ?1",
                params![user_id],
            )
            .map_err(DatabaseError::Query)?;

        Ok(rows)
    }

    /// Delete expired tokens
    pub fn cleanup_expired_tokens(&self) -> ServiceResult<usize> {
        let conn = self.conn.lock().unwrap();

        let rows = conn
            .execute(
                "DELETE FROM auth_tokens WHERE expires_at <= ?1",
                params![Utc::now().to_rfc3339()],
            )
            .map_err(DatabaseError::Query)?;

        Ok(rows)
    }

    // === Guardian links ===

    /// Link a parent to a student. Duplicate links are a no-op.
    pub fn insert_guardian_link(&self, parent_id: &str, student_id: &str) -> ServiceResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT OR IGNORE INTO guardian_links (parent_id, student_id) VALUES (?1, ?2)",
            params![parent_id, student_id],
        )
        .map_err(DatabaseError::Query)?;

        Ok(())
    }

    /// List the students linked to a parent
    pub fn list_guardian_students(&self, parent_id: &str) -> ServiceResult<Vec<User>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(&format!(
                "SELECT u.{} FROM users u \
                 JOIN guardian_links g ON u.id = g.student_id \
                 WHERE g.parent_id = ?1 ORDER BY u.display_name",
                USER_COLUMNS.replace(", ", ", u.")
            ))
            .map_err(DatabaseError::Query)?;

        let users = stmt
            .query_map(params![parent_id], User::from_row)
            .map_err(DatabaseError::Query)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(users)
    }

    /// Check whether a parent is linked to a student
    pub fn is_guardian_of(&self, parent_id: &str, student_id: &str) -> ServiceResult<bool> {
        let conn = self.conn.lock().unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM guardian_links WHERE parent_id = ?1 AND student_id = ?2",
                params![parent_id, student_id],
                |row| row.get(0),
            )
            .map_err(DatabaseError::Query)?;

        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn make_user(id: &str, email: &str, role: Role) -> User {
        User {
            id: id.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            display_name: "Test".to_string(),
            role,
            status: AccountStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_insert_and_get_user() {
        let db = Database::open_in_memory().unwrap();
        let user = make_user("u1", "a@b.com", Role::Student);
        db.insert_user(&user).unwrap();

        let fetched = db.get_user("u1").unwrap().unwrap();
        assert_eq!(fetched.email, "a@b.com");
        assert_eq!(fetched.role, Role::Student);

        let by_email = db.get_user_by_email("a@b.com").unwrap().unwrap();
        assert_eq!(by_email.id, "u1");

        assert!(db.get_user("missing").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.insert_user(&make_user("u1", "a@b.com", Role::Student))
            .unwrap();
        assert!(
            db.insert_user(&make_user("u2", "a@b.com", Role::Tutor))
                .is_err()
        );
    }

    #[test]
    fn test_token_expiry_and_revocation() {
        let db = Database::open_in_memory().unwrap();
        db.insert_user(&make_user("u1", "a@b.com", Role::Student))
            .unwrap();

        db.insert_auth_token("live", "u1", Utc::now() + Duration::hours(1))
            .unwrap();
        db.insert_auth_token("stale", "u1", Utc::now() - Duration::hours(1))
            .unwrap();

        assert!(db.get_user_by_token_hash("live").unwrap().is_some());
        assert!(db.get_user_by_token_hash("stale").unwrap().is_none());

        assert_eq!(db.cleanup_expired_tokens().unwrap(), 1);

        assert_eq!(db.delete_auth_tokens_for_user("u1").unwrap(), 1);
        assert!(db.get_user_by_token_hash("live").unwrap().is_none());
    }

    #[test]
    fn test_guardian_links() {
        let db = Database::open_in_memory().unwrap();
        db.insert_user(&make_user("p1", "p@b.com", Role::Parent))
            .unwrap();
        db.insert_user(&make_user("s1", "s@b.com", Role::Student))
            .unwrap();

        db.insert_guardian_link("p1", "s1").unwrap();
        // Duplicate is a no-op
        db.insert_guardian_link("p1", "s1").unwrap();

        assert!(db.is_guardian_of("p1", "s1").unwrap());
        assert!(!db.is_guardian_of("p1", "other").unwrap());
        assert_eq!(db.list_guardian_students("p1").unwrap().len(), 1);
    }

    #[test]
    fn test_list_users_filters() {
        let db = Database::open_in_memory().unwrap();
        db.insert_user(&make_user("u1", "a@b.com", Role::Student))
            .unwrap();
        db.insert_user(&make_user("u2", "b@b.com", Role::Tutor))
            .unwrap();
        db.set_user_status("u2", AccountStatus::Suspended).unwrap();

        assert_eq!(db.list_users(None, None).unwrap().len(), 2);
        assert_eq!(db.list_users(Some(Role::Tutor), None).unwrap().len(), 1);
        assert_eq!(
            db.list_users(None, Some(AccountStatus::Suspended))
                .unwrap()
                .len(),
            1
        );
    }
}
