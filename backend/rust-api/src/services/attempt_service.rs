use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use super::error::ServiceError;
use crate::metrics::QUIZ_ATTEMPTS_RECORDED_TOTAL;
use crate::models::quiz::SaveQuizAttemptRequest;
use crate::models::{Account, QuizAttempt};
use crate::store::{AccountStore, AttemptStore};

/// Append-only ledger of quiz attempts.
pub struct AttemptService {
    accounts: Arc<dyn AccountStore>,
    attempts: Arc<dyn AttemptStore>,
}

impl AttemptService {
    pub fn new(accounts: Arc<dyn AccountStore>, attempts: Arc<dyn AttemptStore>) -> Self {
        Self { accounts, attempts }
    }

    /// The score is stored as supplied; it is not checked against the answers.
    pub async fn record_attempt(
        &self,
        req: SaveQuizAttemptRequest,
    ) -> Result<String, ServiceError> {
        req.validate()?;
        let account = self.find_account(&req.username).await?;

        let attempt = QuizAttempt {
            id: Uuid::new_v4().to_string(),
            user_id: account.id,
            username: account.username,
            questions: req.questions,
            answers: req.answers,
            score: req.score,
            created_at: Utc::now(),
        };

        if let Err(e) = self.attempts.insert_attempt(&attempt).await {
            QUIZ_ATTEMPTS_RECORDED_TOTAL.with_label_values(&["error"]).inc();
            return Err(e.into());
        }
        QUIZ_ATTEMPTS_RECORDED_TOTAL.with_label_values(&["success"]).inc();
        tracing::info!(
            attempt_id = %attempt.id,
            user_id = %attempt.user_id,
            questions = attempt.questions.len(),
            score = attempt.score,
            "quiz attempt recorded"
        );

        Ok(attempt.id)
    }

    pub async fn attempts_for(&self, username: &str) -> Result<Vec<QuizAttempt>, ServiceError> {
        let account = self.find_account(username).await?;
        Ok(self.attempts.attempts_for_user(&account.id).await?)
    }

    pub async fn attempt(&self, id: &str) -> Result<QuizAttempt, ServiceError> {
        self.attempts
            .find_attempt(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("quiz attempt {}", id)))
    }

    async fn find_account(&self, username: &str) -> Result<Account, ServiceError> {
        self.accounts
            .find_by_username(username)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("user {}", username)))
    }
}
