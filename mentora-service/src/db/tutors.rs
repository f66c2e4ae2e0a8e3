//! Tutor profile CRUD, subject filtering, and embedding similarity search.

use chrono::Utc;
use rusqlite::{OptionalExtension, params};

use super::Database;
use super::models::{EmbeddingStatus, TutorProfile};
use crate::error::{DatabaseError, ServiceResult};

const PROFILE_COLUMNS: &str =
    "user_id, headline, bio, hourly_rate_cents, embedding_status, created_at, updated_at";

impl Database {
    /// Insert or update a tutor profile, replacing its subjects
    pub fn upsert_tutor_profile(&self, profile: &TutorProfile) -> ServiceResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            r#"
            INSERT INTO tutor_profiles (user_id, headline, bio, hourly_rate_cents, embedding_status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(user_id) DO UPDATE SET
                headline = excluded.headline,
                bio = excluded.bio,
                hourly_rate_cents = excluded.hourly_rate_cents,
                embedding_status = excluded.embedding_status,
                updated_at = excluded.updated_at
            "#,
            params![
                profile.user_id,
                profile.headline,
                profile.bio,
                profile.hourly_rate_cents,
                profile.embedding_status.as_str(),
                profile.created_at.to_rfc3339(),
                profile.updated_at.to_rfc3339(),
            ],
        )
        .map_err(DatabaseError::Query)?;

        conn.execute(
            "DELETE FROM tutor_subjects WHERE tutor_id = ?1",
            params![profile.user_id],
        )
        .map_err(DatabaseError::Query)?;

        for subject in &profile.subjects {
            conn.execute(
                "INSERT OR IGNORE INTO tutor_subjects (tutor_id, subject) VALUES (?1, ?2)",
                params![profile.user_id, subject],
            )
            .map_err(DatabaseError::Query)?;
        }

        Ok(())
    }

    /// Get a tutor profile by user ID
    pub fn get_tutor_profile(&self, user_id: &str) -> ServiceResult<Option<TutorProfile>> {
        let conn = self.conn.lock().unwrap();

        let profile = conn
            .query_row(
                &format!(
                    "SELECT {} FROM tutor_profiles WHERE user_id = ?1",
                    PROFILE_COLUMNS
                ),
                params![user_id],
                |row| TutorProfile::from_row(row, vec![]),
            )
            .optional()
            .map_err(DatabaseError::Query)?;

        if let Some(mut profile) = profile {
            let mut stmt = conn
                .prepare("SELECT subject FROM tutor_subjects WHERE tutor_id = ?1 ORDER BY subject")
                .map_err(DatabaseError::Query)?;
            profile.subjects = stmt
                .query_map(params![user_id], |row| row.get(0))
                .map_err(DatabaseError::Query)?
                .filter_map(|r| r.ok())
                .collect();
            Ok(Some(profile))
        } else {
            Ok(None)
        }
    }

    /// List tutor profiles for active tutor accounts, optionally by subject
    pub fn list_tutor_profiles(
        &self,
        subject: Option<&str>,
        limit: usize,
    ) -> ServiceResult<Vec<TutorProfile>> {
        let conn = self.conn.lock().unwrap();

        let mut sql = format!(
            "SELECT p.{} FROM tutor_profiles p \
             JOIN users u ON u.id = p.user_id \
             WHERE u.status = 'active'",
            PROFILE_COLUMNS.replace(", ", ", p.")
        );

        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(subject) = subject {
            params_vec.push(Box::new(subject.to_string()));
            sql.push_str(&format!(
                " AND EXISTS (SELECT 1 FROM tutor_subjects s WHERE s.tutor_id = p.user_id AND s.subject = ?{})",
                params_vec.len()
            ));
        }
        params_vec.push(Box::new(limit as i64));
        sql.push_str(&format!(
            " ORDER BY p.updated_at DESC LIMIT ?{}",
            params_vec.len()
        ));

        let mut stmt = conn.prepare(&sql).map_err(DatabaseError::Query)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();

        let mut profiles: Vec<TutorProfile> = stmt
            .query_map(params_refs.as_slice(), |row| {
                TutorProfile::from_row(row, vec![])
            })
            .map_err(DatabaseError::Query)?
            .filter_map(|r| r.ok())
            .collect();

        for profile in &mut profiles {
            let mut stmt = conn
                .prepare("SELECT subject FROM tutor_subjects WHERE tutor_id = ?1 ORDER BY subject")
                .map_err(DatabaseError::Query)?;
            profile.subjects = stmt
                .query_map(params![profile.user_id], |row| row.get(0))
                .map_err(DatabaseError::Query)?
                .filter_map(|r| r.ok())
                .collect();
        }

        Ok(profiles)
    }

    /// Set a profile's embedding status
    pub fn set_embedding_status(
        &self,
        user_id: &str,
        status: EmbeddingStatus,
    ) -> ServiceResult<bool> {
        let conn = self.conn.lock().unwrap();

        let rows = conn
            .execute(
                "UPDATE tutor_profiles SET embedding_status = ?2, updated_at = ?3 WHERE user_id = ?1",
                params![user_id, status.as_str(), Utc::now().to_rfc3339()],
            )
            .map_err(DatabaseError::Query)?;

        Ok(rows > 0)
    }

    /// Store a tutor profile embedding
    pub fn insert_tutor_embedding(&self, tutor_id: &str, embedding: &[f32]) -> ServiceResult<()> {
        let conn = self.conn.lock().unwrap();

        // Convert f32 slice to bytes
        let embedding_bytes: Vec<u8> = embedding.iter().flat_map(|f| f.to_le_bytes()).collect();

        conn.execute(
            "INSERT OR REPLACE INTO tutor_embeddings (tutor_id, embedding) VALUES (?1, ?2)",
            params![tutor_id, embedding_bytes],
        )
        .map_err(DatabaseError::Query)?;

        Ok(())
    }

    /// Search tutors by embedding similarity (brute force).
    ///
    /// Only active tutor accounts with ready embeddings participate.
    /// Results below `min_similarity` are dropped; `exclude_user` (the
    /// caller) never appears in its own results.
    pub fn search_tutors_by_embedding(
        &self,
        query_embedding: &[f32],
        limit: usize,
        min_similarity: f32,
        exclude_user: Option<&str>,
    ) -> ServiceResult<Vec<(TutorProfile, f32)>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(&format!(
                "SELECT p.{}, e.embedding FROM tutor_profiles p \
                 JOIN tutor_embeddings e ON p.user_id = e.tutor_id \
                 JOIN users u ON u.id = p.user_id \
                 WHERE u.status = 'active' AND p.embedding_status = 'ready'",
                PROFILE_COLUMNS.replace(", ", ", p.")
            ))
            .map_err(DatabaseError::Query)?;

        let rows = stmt
            .query_map([], |row| {
                let embedding_bytes: Vec<u8> = row.get(7)?;
                let profile = TutorProfile::from_row(row, vec![])?;
                Ok((profile, embedding_bytes))
            })
            .map_err(DatabaseError::Query)?;

        let mut results: Vec<(TutorProfile, f32)> = Vec::new();

        for row in rows {
            let (mut profile, embedding_bytes) = row.map_err(DatabaseError::Query)?;

            if exclude_user == Some(profile.user_id.as_str()) {
                continue;
            }

            // Convert bytes back to f32 slice
            let embedding: Vec<f32> = embedding_bytes
                .chunks_exact(4)
                .map(|bytes| f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
                .collect();

            let similarity = cosine_similarity(query_embedding, &embedding);
            if similarity < min_similarity {
                continue;
            }

            let mut subject_stmt = conn
                .prepare("SELECT subject FROM tutor_subjects WHERE tutor_id = ?1 ORDER BY subject")
                .map_err(DatabaseError::Query)?;
            profile.subjects = subject_stmt
                .query_map(params![profile.user_id], |row| row.get(0))
                .map_err(DatabaseError::Query)?
                .filter_map(|r| r.ok())
                .collect();

            results.push((profile, similarity));
        }

        // Sort by similarity (descending)
        results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);

        Ok(results)
    }
}

/// Calculate cosine similarity between two vectors
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{AccountStatus, Role, User};

    fn seed_tutor(db: &Database, id: &str, headline: &str, subjects: &[&str]) {
        db.insert_user(&User {
            id: id.to_string(),
            email: format!("{}@b.com", id),
            password_hash: "hash".to_string(),
            display_name: id.to_string(),
            role: Role::Tutor,
            status: AccountStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .unwrap();
        db.upsert_tutor_profile(&TutorProfile {
            user_id: id.to_string(),
            headline: headline.to_string(),
            bio: String::new(),
            hourly_rate_cents: 5000,
            subjects: subjects.iter().map(|s| s.to_string()).collect(),
            embedding_status: EmbeddingStatus::Ready,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .unwrap();
    }

    #[test]
    fn test_cosine_similarity() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]), 1.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        // Mismatched lengths and zero vectors score 0
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_upsert_replaces_subjects() {
        let db = Database::open_in_memory().unwrap();
        seed_tutor(&db, "t1", "Maths tutor", &["algebra", "calculus"]);

        let profile = db.get_tutor_profile("t1").unwrap().unwrap();
        assert_eq!(profile.subjects, vec!["algebra", "calculus"]);

        let mut updated = profile.clone();
        updated.subjects = vec!["geometry".to_string()];
        db.upsert_tutor_profile(&updated).unwrap();

        let profile = db.get_tutor_profile("t1").unwrap().unwrap();
        assert_eq!(profile.subjects, vec!["geometry"]);
    }

    #[test]
    fn test_list_by_subject() {
        let db = Database::open_in_memory().unwrap();
        seed_tutor(&db, "t1", "Maths", &["algebra"]);
        seed_tutor(&db, "t2", "Physics", &["mechanics"]);

        let all = db.list_tutor_profiles(None, 10).unwrap();
        assert_eq!(all.len(), 2);

        let algebra = db.list_tutor_profiles(Some("algebra"), 10).unwrap();
        assert_eq!(algebra.len(), 1);
        assert_eq!(algebra[0].user_id, "t1");
    }

    #[test]
    fn test_embedding_search_orders_and_filters() {
        let db = Database::open_in_memory().unwrap();
        seed_tutor(&db, "t1", "Maths", &["algebra"]);
        seed_tutor(&db, "t2", "Physics", &["mechanics"]);
        seed_tutor(&db, "t3", "Art", &["painting"]);

        db.insert_tutor_embedding("t1", &[1.0, 0.0, 0.0]).unwrap();
        db.insert_tutor_embedding("t2", &[0.8, 0.6, 0.0]).unwrap();
        db.insert_tutor_embedding("t3", &[0.0, 0.0, 1.0]).unwrap();

        let results = db
            .search_tutors_by_embedding(&[1.0, 0.0, 0.0], 10, 0.5, None)
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0.user_id, "t1");
        assert_eq!(results[1].0.user_id, "t2");

        // Suspended tutors drop out
        db.set_user_status("t1", AccountStatus::Suspended).unwrap();
        let results = db
            .search_tutors_by_embedding(&[1.0, 0.0, 0.0], 10, 0.5, None)
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.user_id, "t2");

        // Caller excluded from their own results
        let results = db
            .search_tutors_by_embedding(&[1.0, 0.0, 0.0], 10, 0.5, Some("t2"))
            .unwrap();
        assert!(results.is_empty());
    }
}
