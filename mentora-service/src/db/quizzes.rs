//! Quiz and submission operations.

use rusqlite::{OptionalExtension, params};

use super::Database;
use super::models::{Quiz, QuizSubmission};
use crate::error::{DatabaseError, ServiceResult};

impl Database {
    /// Insert a quiz (questions serialized to JSON)
    pub fn insert_quiz(&self, quiz: &Quiz) -> ServiceResult<()> {
        let conn = self.conn.lock().unwrap();

        let questions_json =
            serde_json::to_string(&quiz.questions).map_err(DatabaseError::Serialization)?;

        conn.execute(
            "INSERT INTO quizzes (id, commitment_id, title, questions, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                quiz.id,
                quiz.commitment_id,
                quiz.title,
                questions_json,
                quiz.created_at.to_rfc3339(),
            ],
        )
        .map_err(DatabaseError::Query)?;

        Ok(())
    }

    /// Get a quiz by ID
    pub fn get_quiz(&self, id: &str) -> ServiceResult<Option<Quiz>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT id, commitment_id, title, questions, created_at FROM quizzes WHERE id = ?1",
            params![id],
            Quiz::from_row,
        )
        .optional()
        .map_err(DatabaseError::Query)
        .map_err(Into::into)
    }

    /// List quizzes under a commitment, newest first
    pub fn list_quizzes_for_commitment(&self, commitment_id: &str) -> ServiceResult<Vec<Quiz>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(
                "SELECT id, commitment_id, title, questions, created_at \
                 FROM quizzes WHERE commitment_id = ?1 ORDER BY created_at DESC",
            )
            .map_err(DatabaseError::Query)?;

        let quizzes = stmt
            .query_map(params![commitment_id], Quiz::from_row)
            .map_err(DatabaseError::Query)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(quizzes)
    }

    /// Insert a graded submission. The UNIQUE constraint on quiz_id
    /// rejects a second submission for the same quiz.
    pub fn insert_quiz_submission(&self, submission: &QuizSubmission) -> ServiceResult<()> {
        let conn = self.conn.lock().unwrap();

        let answers_json =
            serde_json::to_string(&submission.answers).map_err(DatabaseError::Serialization)?;

        conn.execute(
            "INSERT INTO quiz_submissions (id, quiz_id, student_id, answers, correct_count, total_count, submitted_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                submission.id,
                submission.quiz_id,
                submission.student_id,
                answers_json,
                submission.correct_count,
                submission.total_count,
                submission.submitted_at.to_rfc3339(),
            ],
        )
        .map_err(DatabaseError::Query)?;

        Ok(())
    }

    /// Get the submission for a quiz, if any
    pub fn get_submission_for_quiz(&self, quiz_id: &str) -> ServiceResult<Option<QuizSubmission>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT id, quiz_id, student_id, answers, correct_count, total_count, submitted_at \
             FROM quiz_submissions WHERE quiz_id = ?1",
            params![quiz_id],
            QuizSubmission::from_row,
        )
        .optional()
        .map_err(DatabaseError::Query)
        .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{
        AccountStatus, Commitment, CommitmentStatus, QuizQuestion, Role, User,
    };
    use chrono::Utc;

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
    fn test_quiz_round_trip() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);

        let quiz = Quiz {
            id: "q1".to_string(),
            commitment_id: "c1".to_string(),
            title: "Fractions".to_string(),
            questions: vec![QuizQuestion {
                prompt: "1/2 + 1/4 = ?".to_string(),
                options: vec!["3/4".to_string(), "2/6".to_string()],
                correct: vec![0],
            }],
            created_at: Utc::now(),
        };
        db.insert_quiz(&quiz).unwrap();

        let fetched = db.get_quiz("q1").unwrap().unwrap();
        assert_eq!(fetched.questions.len(), 1);
        assert_eq!(fetched.questions[0].correct, vec![0]);

        assert_eq!(db.list_quizzes_for_commitment("c1").unwrap().len(), 1);
    }

    #[test]
    fn test_single_submission_per_quiz() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);

        db.insert_quiz(&Quiz {
            id: "q1".to_string(),
            commitment_id: "c1".to_string(),
            title: "Fractions".to_string(),
            questions: vec![],
            created_at: Utc::now(),
        })
        .unwrap();

        let submission = QuizSubmission {
            id: "sub1".to_string(),
            quiz_id: "q1".to_string(),
            student_id: "s1".to_string(),
            answers: vec![vec![0]],
            correct_count: 1,
            total_count: 1,
            submitted_at: Utc::now(),
        };
        db.insert_quiz_submission(&submission).unwrap();

        let mut second = submission.clone();
        second.id = "sub2".to_string();
        assert!(db.insert_quiz_submission(&second).is_err());

        let fetched = db.get_submission_for_quiz("q1").unwrap().unwrap();
        assert_eq!(fetched.correct_count, 1);
        assert!(db.get_submission_for_quiz("q2").unwrap().is_none());
    }
}
