use std::sync::Arc;

use chrono::Utc;

use super::error::ServiceError;
use crate::metrics::{BADGES_AWARDED_TOTAL, LESSON_SCORES_TOTAL, SKILL_RATCHET_TOTAL};
use crate::models::progression::{LeaderboardEntry, LessonScoreUpdate};
use crate::models::{Account, Badge, BadgeAward, Level, SkillLevel, SkillTransition};
use crate::store::{AccountStore, ProgressionStore, StoreError};
use crate::utils::retry::{retry_async_when, RetryConfig};

pub const DEFAULT_LEADERBOARD_LIMIT: usize = 10;
pub const MAX_LEADERBOARD_LIMIT: usize = 100;

/// Skill ratchet, lesson best-of scores, badges and leaderboards.
/// Public operations take usernames and resolve them to account ids first.
pub struct ProgressionService {
    accounts: Arc<dyn AccountStore>,
    progression: Arc<dyn ProgressionStore>,
    retry: RetryConfig,
}

impl ProgressionService {
    pub fn new(accounts: Arc<dyn AccountStore>, progression: Arc<dyn ProgressionStore>) -> Self {
        Self {
            accounts,
            progression,
            retry: RetryConfig::default(),
        }
    }

    pub async fn resolve_user(&self, username: &str) -> Result<Account, ServiceError> {
        self.accounts
            .find_by_username(username)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("user {}", username)))
    }

    pub async fn skill_level(&self, username: &str) -> Result<SkillLevel, ServiceError> {
        let account = self.resolve_user(username).await?;
        Ok(self.progression.skill_level(&account.id).await?)
    }

    /// Proposes a new level; only strictly higher ranks are stored.
    pub async fn propose_skill_level(
        &self,
        username: &str,
        proposed: SkillLevel,
    ) -> Result<SkillTransition, ServiceError> {
        let account = self.resolve_user(username).await?;
        let transition = self
            .progression
            .raise_skill_level(&account.id, proposed)
            .await?;

        let outcome = if transition.updated() { "raised" } else { "unchanged" };
        SKILL_RATCHET_TOTAL.with_label_values(&[outcome]).inc();
        tracing::info!(
            user_id = %account.id,
            proposed = %proposed,
            previous = %transition.previous,
            current = %transition.current,
            "skill level proposal"
        );

        Ok(transition)
    }

    pub async fn record_lesson_score(
        &self,
        username: &str,
        level: Level,
        score: i64,
    ) -> Result<LessonScoreUpdate, ServiceError> {
        if score < 0 {
            return Err(ServiceError::Validation(
                "score must not be negative".to_string(),
            ));
        }
        let account = self.resolve_user(username).await?;

        let (outcome, record) = retry_async_when(&self.retry, StoreError::is_retryable, || {
            self.progression
                .record_lesson_score(&account.id, &account.username, level, score, Utc::now())
        })
        .await?;

        LESSON_SCORES_TOTAL
            .with_label_values(&[level.as_str(), outcome.as_str()])
            .inc();
        tracing::info!(
            user_id = %account.id,
            level = %level,
            score,
            best = record.score,
            outcome = outcome.as_str(),
            "lesson score recorded"
        );

        Ok(LessonScoreUpdate { outcome, record })
    }

    pub async fn award_badge(
        &self,
        username: &str,
        level: Level,
    ) -> Result<BadgeAward, ServiceError> {
        let account = self.resolve_user(username).await?;
        let award = self
            .progression
            .award_badge(&account.id, level, Utc::now())
            .await?;

        let result = if award.newly_awarded { "awarded" } else { "already_held" };
        BADGES_AWARDED_TOTAL
            .with_label_values(&[level.as_str(), result])
            .inc();
        tracing::info!(user_id = %account.id, level = %level, result, "badge award");

        Ok(award)
    }

    pub async fn has_badge(&self, username: &str, level: Level) -> Result<bool, ServiceError> {
        let account = self.resolve_user(username).await?;
        Ok(self.progression.has_badge(&account.id, level).await?)
    }

    pub async fn badges(&self, username: &str) -> Result<Vec<Badge>, ServiceError> {
        let account = self.resolve_user(username).await?;
        Ok(self.progression.badges_for_user(&account.id).await?)
    }

    pub async fn leaderboard(
        &self,
        level: Level,
        limit: Option<usize>,
    ) -> Result<Vec<LeaderboardEntry>, ServiceError> {
        let limit = leaderboard_limit(limit)?;
        let records = self.progression.top_lesson_scores(level, limit).await?;

        Ok(records
            .into_iter()
            .enumerate()
            .map(|(idx, record)| LeaderboardEntry {
                rank: idx + 1,
                username: record.username,
                score: record.score,
                achieved_at: record.achieved_at,
            })
            .collect())
    }
}

pub fn leaderboard_limit(limit: Option<usize>) -> Result<usize, ServiceError> {
    match limit {
        None => Ok(DEFAULT_LEADERBOARD_LIMIT),
        Some(n) if (1..=MAX_LEADERBOARD_LIMIT).contains(&n) => Ok(n),
        Some(n) => Err(ServiceError::Validation(format!(
            "limit must be between 1 and {}, got {}",
            MAX_LEADERBOARD_LIMIT, n
        ))),
    }
}
