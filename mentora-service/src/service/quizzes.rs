//! Quiz creation, submission, and auto-grading.
//!
//! Grading is pure set comparison: a question is correct iff the
//! submitted index set equals the answer-key set.

use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::info;
use uuid::Uuid;

use super::MentoraService;
use crate::db::{
    CommitmentStatus, NotificationKind, Quiz, QuizQuestion, QuizSubmission, User,
};
use crate::error::{ServiceError, ServiceResult};

/// A quiz as seen by one viewer. The answer key is stripped for students
/// who have not submitted yet.
#[derive(Debug, Clone, Serialize)]
pub struct QuizView {
    pub id: String,
    pub commitment_id: String,
    pub title: String,
    pub questions: Vec<QuizQuestionView>,
    pub submitted: bool,
    pub created_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizQuestionView {
    pub prompt: String,
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct: Option<Vec<usize>>,
}

/// Grade a submission against a question list.
/// Returns `(correct_count, total_count)`.
pub(crate) fn grade(questions: &[QuizQuestion], answers: &[Vec<usize>]) -> (i64, i64) {
    let correct = questions
        .iter()
        .zip(answers.iter())
        .filter(|(question, submitted)| {
            let key: BTreeSet<usize> = question.correct.iter().copied().collect();
            let given: BTreeSet<usize> = submitted.iter().copied().collect();
            key == given
        })
        .count();
    (correct as i64, questions.len() as i64)
}

impl MentoraService {
    /// Tutor creates a quiz under an active commitment
    pub fn create_quiz(
        &self,
        user: &User,
        commitment_id: &str,
        title: &str,
        questions: Vec<QuizQuestion>,
    ) -> ServiceResult<Quiz> {
        let commitment =
            self.db
                .get_commitment(commitment_id)?
                .ok_or_else(|| ServiceError::CommitmentNotFound {
                    commitment_id: commitment_id.to_string(),
                })?;

        if commitment.tutor_id != user.id {
            return Err(ServiceError::Forbidden {
                message: "Only the commitment's tutor can create quizzes".to_string(),
            });
        }
        if commitment.status != CommitmentStatus::Active {
            return Err(ServiceError::Conflict {
                message: "Quizzes can only be assigned under an active commitment".to_string(),
            });
        }
        if title.trim().is_empty() {
            return Err(ServiceError::Validation {
                message: "Title is required".to_string(),
            });
        }

        let max_questions = self.runtime_config.dynamic().limits.max_quiz_questions;
        if questions.is_empty() || questions.len() > max_questions {
            return Err(ServiceError::Validation {
                message: format!("A quiz needs 1 to {} questions", max_questions),
            });
        }
        for (i, question) in questions.iter().enumerate() {
            if question.prompt.trim().is_empty() {
                return Err(ServiceError::Validation {
                    message: format!("Question {} has an empty prompt", i + 1),
                });
            }
            if question.options.len() < 2 {
                return Err(ServiceError::Validation {
                    message: format!("Question {} needs at least 2 options", i + 1),
                });
            }
            if question.correct.is_empty() {
                return Err(ServiceError::Validation {
                    message: format!("Question {} has no correct answer", i + 1),
                });
            }
            if question.correct.iter().any(|&c| c >= question.options.len()) {
                return Err(ServiceError::Validation {
                    message: format!("Question {} has an out-of-range answer index", i + 1),
                });
            }
        }

        let quiz = Quiz {
            id: Uuid::new_v4().to_string(),
            commitment_id: commitment.id.clone(),
            title: title.trim().to_string(),
            questions,
            created_at: Utc::now(),
        };
        self.db.insert_quiz(&quiz)?;

        self.notify(
            &commitment.student_id,
            NotificationKind::QuizAssigned,
            format!("{} assigned you a quiz: {}", user.display_name, quiz.title),
            Some(serde_json::json!({ "quiz_id": quiz.id })),
        )?;

        info!(quiz_id = %quiz.id, commitment_id = %commitment.id, "Quiz created");
        Ok(quiz)
    }

    /// Get a quiz as a viewer-specific view
    pub fn get_quiz_view(&self, user: &User, quiz_id: &str) -> ServiceResult<QuizView> {
        let (quiz, commitment) = self.quiz_with_commitment(quiz_id)?;

        if !commitment.is_participant(&user.id) && !user.is_admin() {
            return Err(ServiceError::Forbidden {
                message: "Not a participant in this quiz's commitment".to_string(),
            });
        }

        let submitted = self.db.get_submission_for_quiz(quiz_id)?.is_some();

        // The answer key stays hidden from the student until they submit
        let hide_key = user.id == commitment.student_id && !submitted;
        let questions = quiz
            .questions
            .iter()
            .map(|q| QuizQuestionView {
                prompt: q.prompt.clone(),
                options: q.options.clone(),
                correct: if hide_key { None } else { Some(q.correct.clone()) },
            })
            .collect();

        Ok(QuizView {
            id: quiz.id,
            commitment_id: quiz.commitment_id,
            title: quiz.title,
            questions,
            submitted,
            created_at: quiz.created_at,
        })
    }

    /// List quizzes under a commitment (participant visibility)
    pub fn list_quizzes(&self, user: &User, commitment_id: &str) -> ServiceResult<Vec<QuizView>> {
        self.get_commitment_for(user, commitment_id)?;

        let quizzes = self.db.list_quizzes_for_commitment(commitment_id)?;
        quizzes
            .iter()
            .map(|quiz| self.get_quiz_view(user, &quiz.id))
            .collect()
    }

    /// The commitment's student submits answers; the quiz is graded
    /// immediately and the tutor notified of the score.
    pub fn submit_quiz(
        &self,
        user: &User,
        quiz_id: &str,
        answers: Vec<Vec<usize>>,
    ) -> ServiceResult<QuizSubmission> {
        let (quiz, commitment) = self.quiz_with_commitment(quiz_id)?;

        if commitment.student_id != user.id {
            return Err(ServiceError::Forbidden {
                message: "Only the commitment's student can submit this quiz".to_string(),
            });
        }
        if self.db.get_submission_for_quiz(quiz_id)?.is_some() {
            return Err(ServiceError::Conflict {
                message: "Quiz has already been submitted".to_string(),
            });
        }
        if answers.len() != quiz.questions.len() {
            return Err(ServiceError::Validation {
                message: format!(
                    "Expected {} answers, got {}",
                    quiz.questions.len(),
                    answers.len()
                ),
            });
        }

        let (correct_count, total_count) = grade(&quiz.questions, &answers);

        let submission = QuizSubmission {
            id: Uuid::new_v4().to_string(),
            quiz_id: quiz.id.clone(),
            student_id: user.id.clone(),
            answers,
            correct_count,
            total_count,
            submitted_at: Utc::now(),
        };
        self.db.insert_quiz_submission(&submission)?;

        self.notify(
            &commitment.tutor_id,
            NotificationKind::QuizGraded,
            format!(
                "{} scored {}/{} on {}",
                user.display_name, correct_count, total_count, quiz.title
            ),
            Some(serde_json::json!({ "quiz_id": quiz.id })),
        )?;

        info!(
            quiz_id = %quiz.id,
            correct = correct_count,
            total = total_count,
            "Quiz submitted and graded"
        );
        Ok(submission)
    }

    /// Get the graded result. 404 until the student has submitted.
    pub fn get_quiz_result(&self, user: &User, quiz_id: &str) -> ServiceResult<QuizSubmission> {
        let (_, commitment) = self.quiz_with_commitment(quiz_id)?;

        if !commitment.is_participant(&user.id) && !user.is_admin() {
            return Err(ServiceError::Forbidden {
                message: "Not a participant in this quiz's commitment".to_string(),
            });
        }

        self.db
            .get_submission_for_quiz(quiz_id)?
            .ok_or_else(|| ServiceError::SubmissionNotFound {
                quiz_id: quiz_id.to_string(),
            })
    }

    fn quiz_with_commitment(&self, quiz_id: &str) -> ServiceResult<(Quiz, crate::db::Commitment)> {
        let quiz = self
            .db
            .get_quiz(quiz_id)?
            .ok_or_else(|| ServiceError::QuizNotFound {
                quiz_id: quiz_id.to_string(),
            })?;
        let commitment = self
            .db
            .get_commitment(&quiz.commitment_id)?
            .ok_or_else(|| ServiceError::CommitmentNotFound {
                commitment_id: quiz.commitment_id.clone(),
            })?;
        Ok((quiz, commitment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(correct: &[usize]) -> QuizQuestion {
        QuizQuestion {
            prompt: "Pick".to_string(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct: correct.to_vec(),
        }
    }

    #[test]
    fn test_grading_is_set_comparison() {
        let questions = vec![question(&[0]), question(&[1, 2]), question(&[3])];

        // Exact matches
        let (correct, total) = grade(&questions, &[vec![0], vec![1, 2], vec![3]]);
        assert_eq!((correct, total), (3, 3));

        // Order does not matter
        let (correct, _) = grade(&questions, &[vec![0], vec![2, 1], vec![3]]);
        assert_eq!(correct, 3);

        // Duplicates collapse
        let (correct, _) = grade(&questions, &[vec![0, 0], vec![1, 2, 2], vec![3]]);
        assert_eq!(correct, 3);

        // Partial selections are wrong, not partial credit
        let (correct, _) = grade(&questions, &[vec![0], vec![1], vec![3]]);
        assert_eq!(correct, 2);

        // Extra selections are wrong
        let (correct, _) = grade(&questions, &[vec![0, 1], vec![1, 2], vec![3]]);
        assert_eq!(correct, 2);

        // Empty answer is wrong
        let (correct, _) = grade(&questions, &[vec![], vec![1, 2], vec![3]]);
        assert_eq!(correct, 2);
    }

    #[test]
    fn test_grading_empty_quiz() {
        assert_eq!(grade(&[], &[]), (0, 0));
    }
}
