//! Background workers for the email and embedding job queues.

use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::MentoraService;
use crate::db::{EmbeddingStatus, Job, JobKind, JobStatus};

/// Payload of an `email` job
#[derive(Debug, Deserialize)]
struct EmailJobPayload {
    to: String,
    subject: String,
    body: String,
}

/// Payload of a `tutor_embedding` job
#[derive(Debug, Deserialize)]
struct EmbeddingJobPayload {
    tutor_id: String,
}

impl MentoraService {
    /// Start the email worker.
    /// This should be called once on server startup.
    pub fn start_email_worker(service: Arc<MentoraService>) {
        tokio::spawn(async move {
            info!("Email worker started");
            loop {
                let jobs_config = service.runtime_config.dynamic().jobs.clone();
                match service.db.claim_next_job(JobKind::Email) {
                    Ok(Some(job)) => {
                        service.process_email_job(&job).await;
                    }
                    Ok(None) => {
                        tokio::time::sleep(jobs_config.poll_interval()).await;
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to check for email jobs");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    }
                }
            }
        });
    }

    /// Start the tutor-embedding worker.
    /// Runs separately so slow embedding calls never delay email.
    pub fn start_embedding_worker(service: Arc<MentoraService>) {
        tokio::spawn(async move {
            info!("Embedding worker started");
            loop {
                let jobs_config = service.runtime_config.dynamic().jobs.clone();
                match service.db.claim_next_job(JobKind::TutorEmbedding) {
                    Ok(Some(job)) => {
                        service.process_embedding_job(&job).await;
                    }
                    Ok(None) => {
                        tokio::time::sleep(jobs_config.poll_interval()).await;
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to check for embedding jobs");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    }
                }
            }
        });
    }

    async fn process_email_job(&self, job: &Job) {
        let payload: EmailJobPayload = match serde_json::from_value(job.payload.clone()) {
            Ok(payload) => payload,
            Err(e) => {
                // Malformed payloads never become sendable; drop directly
                warn!(job_id = %job.id, error = %e, "Discarding malformed email job");
                self.finish_job(job, Err(&format!("malformed payload: {}", e)), true);
                return;
            }
        };

        match self
            .mailer
            .send(&payload.to, &payload.subject, &payload.body)
            .await
        {
            Ok(()) => {
                metrics::counter!("mentora_jobs_processed_total", "kind" => "email", "outcome" => "ok")
                    .increment(1);
                self.finish_job(job, Ok(()), false);
            }
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "Email job failed");
                metrics::counter!("mentora_jobs_processed_total", "kind" => "email", "outcome" => "error")
                    .increment(1);
                self.finish_job(job, Err(&e.to_string()), false);
            }
        }
    }

    async fn process_embedding_job(&self, job: &Job) {
        let payload: EmbeddingJobPayload = match serde_json::from_value(job.payload.clone()) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "Discarding malformed embedding job");
                self.finish_job(job, Err(&format!("malformed payload: {}", e)), true);
                return;
            }
        };

        // The profile may have been deleted since the job was queued
        let profile = match self.db.get_tutor_profile(&payload.tutor_id) {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                info!(job_id = %job.id, tutor_id = %payload.tutor_id, "Profile gone, dropping job");
                self.finish_job(job, Ok(()), false);
                return;
            }
            Err(e) => {
                self.finish_job(job, Err(&e.to_string()), false);
                return;
            }
        };

        let result = async {
            let embedding = self.embeddings.embed_text(&profile.embedding_text()).await?;
            self.db.insert_tutor_embedding(&profile.user_id, &embedding)?;
            self.db
                .set_embedding_status(&profile.user_id, EmbeddingStatus::Ready)?;
            Ok::<_, crate::error::ServiceError>(())
        }
        .await;

        match result {
            Ok(()) => {
                info!(tutor_id = %profile.user_id, "Tutor embedding generated");
                metrics::counter!("mentora_jobs_processed_total", "kind" => "tutor_embedding", "outcome" => "ok")
                    .increment(1);
                self.finish_job(job, Ok(()), false);
            }
            Err(e) => {
                warn!(
                    job_id = %job.id,
                    tutor_id = %profile.user_id,
                    error = %e,
                    "Embedding job failed"
                );
                metrics::counter!("mentora_jobs_processed_total", "kind" => "tutor_embedding", "outcome" => "error")
                    .increment(1);
                self.finish_job(job, Err(&e.to_string()), false);

                // If retries are exhausted, surface the failure on the profile
                if let Ok(Some(job)) = self.db.get_job(&job.id)
                    && job.status == JobStatus::Failed
                    && let Err(e) = self
                        .db
                        .set_embedding_status(&profile.user_id, EmbeddingStatus::Failed)
                {
                    error!(tutor_id = %profile.user_id, error = %e, "Failed to flag embedding failure");
                }
            }
        }
    }

    /// Complete or fail a job, honoring the retry policy.
    /// `discard` forces a terminal failure regardless of attempts left.
    fn finish_job(&self, job: &Job, outcome: Result<(), &str>, discard: bool) {
        let jobs_config = self.runtime_config.dynamic().jobs.clone();
        let result = match outcome {
            Ok(()) => self.db.complete_job(&job.id),
            Err(error) if discard => self.db.fail_job(&job.id, error, 0, 0),
            Err(error) => self.db.fail_job(
                &job.id,
                error,
                jobs_config.max_attempts,
                jobs_config.retry_backoff_secs,
            ),
        };
        if let Err(e) = result {
            error!(job_id = %job.id, error = %e, "Failed to record job outcome");
        }
    }
}
