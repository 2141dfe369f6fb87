//! Persistence seams.
//!
//! Services talk to storage only through these traits. Two backends exist:
//! [`mongo::MongoStore`] for production and [`memory::MemoryStore`] for tests and
//! local runs. Both implement every conditional update as a single atomic step.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{
    chat::ChatLog, Account, Badge, BadgeAward, LessonQuizRecord, LessonScoreOutcome, Level,
    QuizAttempt, SkillLevel, SkillTransition,
};

pub mod bson_time;
pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    /// A uniqueness constraint rejected the write.
    #[error("duplicate {0}")]
    Duplicate(String),

    /// A concurrent writer won a race; the operation can be retried as a whole.
    #[error("concurrent update on {0}")]
    Concurrency(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Concurrency(_))
    }
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Fails with [`StoreError::Duplicate`] when the username or email is taken.
    async fn create_account(&self, account: &Account) -> Result<(), StoreError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, StoreError>;
}

#[async_trait]
pub trait ProgressionStore: Send + Sync {
    async fn skill_level(&self, user_id: &str) -> Result<SkillLevel, StoreError>;

    /// Raises the stored level to `proposed` only if it ranks strictly higher.
    async fn raise_skill_level(
        &self,
        user_id: &str,
        proposed: SkillLevel,
    ) -> Result<SkillTransition, StoreError>;

    /// Keeps the best score per (user, level). Equal or lower scores leave the record untouched.
    async fn record_lesson_score(
        &self,
        user_id: &str,
        username: &str,
        level: Level,
        score: i64,
        at: DateTime<Utc>,
    ) -> Result<(LessonScoreOutcome, LessonQuizRecord), StoreError>;

    /// Best records for a level, score descending, earliest achievement first on ties.
    async fn top_lesson_scores(
        &self,
        level: Level,
        limit: usize,
    ) -> Result<Vec<LessonQuizRecord>, StoreError>;

    /// Idempotent: at most one badge per (user, level).
    async fn award_badge(
        &self,
        user_id: &str,
        level: Level,
        at: DateTime<Utc>,
    ) -> Result<BadgeAward, StoreError>;

    async fn has_badge(&self, user_id: &str, level: Level) -> Result<bool, StoreError>;

    async fn badges_for_user(&self, user_id: &str) -> Result<Vec<Badge>, StoreError>;
}

#[async_trait]
pub trait AttemptStore: Send + Sync {
    async fn insert_attempt(&self, attempt: &QuizAttempt) -> Result<(), StoreError>;

    /// Newest first.
    async fn attempts_for_user(&self, user_id: &str) -> Result<Vec<QuizAttempt>, StoreError>;

    async fn find_attempt(&self, id: &str) -> Result<Option<QuizAttempt>, StoreError>;
}

#[async_trait]
pub trait ChatLogStore: Send + Sync {
    async fn insert_chat_log(&self, log: &ChatLog) -> Result<(), StoreError>;

    /// Newest first.
    async fn chat_logs_for_user(&self, user_id: &str) -> Result<Vec<ChatLog>, StoreError>;
}

/// Liveness probe used by `/health`.
#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;
}
