//! Tutor profile management and embedding-based recommendations.

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use super::MentoraService;
use crate::db::{CommitmentStatus, EmbeddingStatus, JobKind, Role, TutorProfile, User};
use crate::error::{ServiceError, ServiceResult};

/// A recommended tutor with its similarity score
#[derive(Debug, Clone, Serialize)]
pub struct RecommendedTutor {
    #[serde(flatten)]
    pub profile: TutorProfile,
    pub score: f32,
}

impl MentoraService {
    /// Create or update the caller's tutor profile.
    ///
    /// Any change resets the profile embedding to pending and queues a
    /// regeneration job.
    pub fn upsert_tutor_profile(
        &self,
        user: &User,
        headline: &str,
        bio: &str,
        subjects: Vec<String>,
        hourly_rate_cents: i64,
    ) -> ServiceResult<TutorProfile> {
        user_is_tutor(user)?;

        if headline.trim().is_empty() {
            return Err(ServiceError::Validation {
                message: "Headline is required".to_string(),
            });
        }
        if hourly_rate_cents <= 0 {
            return Err(ServiceError::Validation {
                message: "Hourly rate must be positive".to_string(),
            });
        }
        let subjects: Vec<String> = subjects
            .into_iter()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        if subjects.is_empty() {
            return Err(ServiceError::Validation {
                message: "At least one subject is required".to_string(),
            });
        }

        let now = Utc::now();
        let existing = self.db.get_tutor_profile(&user.id)?;
        let profile = TutorProfile {
            user_id: user.id.clone(),
            headline: headline.trim().to_string(),
            bio: bio.trim().to_string(),
            hourly_rate_cents,
            subjects,
            embedding_status: EmbeddingStatus::Pending,
            created_at: existing.map(|p| p.created_at).unwrap_or(now),
            updated_at: now,
        };
        self.db.upsert_tutor_profile(&profile)?;

        self.db.enqueue_job(
            JobKind::TutorEmbedding,
            &serde_json::json!({ "tutor_id": user.id }),
            now,
        )?;

        info!(tutor_id = %user.id, "Tutor profile saved, embedding queued");
        Ok(profile)
    }

    /// Get a tutor's public profile. Suspended tutors are invisible.
    pub fn get_tutor_profile(&self, tutor_id: &str) -> ServiceResult<TutorProfile> {
        let not_found = || ServiceError::TutorNotFound {
            tutor_id: tutor_id.to_string(),
        };

        let user = self.db.get_user(tutor_id)?.ok_or_else(not_found)?;
        if user.status == crate::db::AccountStatus::Suspended {
            return Err(not_found());
        }

        self.db.get_tutor_profile(tutor_id)?.ok_or_else(not_found)
    }

    /// Public tutor listing
    pub fn list_tutors(
        &self,
        subject: Option<&str>,
        limit: usize,
    ) -> ServiceResult<Vec<TutorProfile>> {
        self.db.list_tutor_profiles(subject, limit)
    }

    /// Recommend tutors for the caller.
    ///
    /// With no explicit query, falls back to the subjects and goals of
    /// the caller's active commitments.
    pub async fn recommend_tutors(
        &self,
        user: &User,
        query: Option<String>,
        limit: Option<usize>,
    ) -> ServiceResult<Vec<RecommendedTutor>> {
        let config = self.runtime_config.dynamic().recommendations.clone();
        let limit = limit.unwrap_or(config.default_limit).min(50);

        let query_text = match query.filter(|q| !q.trim().is_empty()) {
            Some(q) => q,
            None => {
                let commitments = self.db.list_commitments_for_user(&user.id)?;
                let parts: Vec<String> = commitments
                    .iter()
                    .filter(|c| {
                        c.student_id == user.id && c.status == CommitmentStatus::Active
                    })
                    .map(|c| format!("{}: {}", c.subject, c.goal))
                    .collect();
                if parts.is_empty() {
                    return Err(ServiceError::Validation {
                        message: "Provide a query, or create a commitment to recommend from"
                            .to_string(),
                    });
                }
                parts.join("\n")
            }
        };

        let query_embedding = self.embeddings.embed_text(&query_text).await?;

        let results = self.db.search_tutors_by_embedding(
            &query_embedding,
            limit,
            config.min_similarity,
            Some(&user.id),
        )?;

        Ok(results
            .into_iter()
            .map(|(profile, score)| RecommendedTutor { profile, score })
            .collect())
    }
}

fn user_is_tutor(user: &User) -> ServiceResult<()> {
    if user.role == Role::Tutor {
        Ok(())
    } else {
        Err(ServiceError::Forbidden {
            message: "Requires tutor role".to_string(),
        })
    }
}
