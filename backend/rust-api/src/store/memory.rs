//! In-process store. Every mutation happens inside a single write-lock section,
//! which makes the conditional updates atomic the same way the Mongo filters are.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{AccountStore, AttemptStore, ChatLogStore, ProgressionStore, StoreError, StoreHealth};
use crate::models::{
    chat::ChatLog, Account, Badge, BadgeAward, LessonQuizRecord, LessonScoreOutcome, Level,
    QuizAttempt, SkillLevel, SkillTransition,
};

#[derive(Default)]
pub struct MemoryStore {
    accounts: RwLock<HashMap<String, Account>>,
    lesson_scores: RwLock<HashMap<Level, HashMap<String, LessonQuizRecord>>>,
    badges: RwLock<HashMap<(String, Level), Badge>>,
    attempts: RwLock<Vec<QuizAttempt>>,
    chat_logs: RwLock<Vec<ChatLog>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn create_account(&self, account: &Account) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write().await;
        if accounts.values().any(|a| a.username == account.username) {
            return Err(StoreError::Duplicate("username".into()));
        }
        if accounts.values().any(|a| a.email == account.email) {
            return Err(StoreError::Duplicate("email".into()));
        }
        if accounts.contains_key(&account.id) {
            return Err(StoreError::Duplicate("account id".into()));
        }
        accounts.insert(account.id.clone(), account.clone());
        Ok(())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.values().find(|a| a.username == username).cloned())
    }
}

#[async_trait]
impl ProgressionStore for MemoryStore {
    async fn skill_level(&self, user_id: &str) -> Result<SkillLevel, StoreError> {
        let accounts = self.accounts.read().await;
        accounts
            .get(user_id)
            .map(|a| a.skill_level)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user_id)))
    }

    async fn raise_skill_level(
        &self,
        user_id: &str,
        proposed: SkillLevel,
    ) -> Result<SkillTransition, StoreError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .get_mut(user_id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user_id)))?;

        let previous = account.skill_level;
        if proposed.rank() > previous.rank() {
            account.skill_level = proposed;
        }
        Ok(SkillTransition {
            previous,
            current: account.skill_level,
        })
    }

    async fn record_lesson_score(
        &self,
        user_id: &str,
        username: &str,
        level: Level,
        score: i64,
        at: DateTime<Utc>,
    ) -> Result<(LessonScoreOutcome, LessonQuizRecord), StoreError> {
        let mut partitions = self.lesson_scores.write().await;
        let partition = partitions.entry(level).or_default();

        match partition.get_mut(user_id) {
            None => {
                let record = LessonQuizRecord {
                    user_id: user_id.to_string(),
                    username: username.to_string(),
                    level,
                    score,
                    achieved_at: at,
                };
                partition.insert(user_id.to_string(), record.clone());
                Ok((LessonScoreOutcome::Created, record))
            }
            Some(record) if score > record.score => {
                record.score = score;
                record.achieved_at = at;
                record.username = username.to_string();
                Ok((LessonScoreOutcome::Improved, record.clone()))
            }
            Some(record) => Ok((LessonScoreOutcome::NoImprovement, record.clone())),
        }
    }

    async fn top_lesson_scores(
        &self,
        level: Level,
        limit: usize,
    ) -> Result<Vec<LessonQuizRecord>, StoreError> {
        let partitions = self.lesson_scores.read().await;
        let mut records: Vec<LessonQuizRecord> = partitions
            .get(&level)
            .map(|p| p.values().cloned().collect())
            .unwrap_or_default();

        records.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.achieved_at.cmp(&b.achieved_at))
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        records.truncate(limit);
        Ok(records)
    }

    async fn award_badge(
        &self,
        user_id: &str,
        level: Level,
        at: DateTime<Utc>,
    ) -> Result<BadgeAward, StoreError> {
        let mut badges = self.badges.write().await;
        let key = (user_id.to_string(), level);
        if let Some(existing) = badges.get(&key) {
            return Ok(BadgeAward {
                badge: existing.clone(),
                newly_awarded: false,
            });
        }

        let badge = Badge {
            user_id: user_id.to_string(),
            level,
            awarded_at: at,
        };
        badges.insert(key, badge.clone());
        Ok(BadgeAward {
            badge,
            newly_awarded: true,
        })
    }

    async fn has_badge(&self, user_id: &str, level: Level) -> Result<bool, StoreError> {
        let badges = self.badges.read().await;
        Ok(badges.contains_key(&(user_id.to_string(), level)))
    }

    async fn badges_for_user(&self, user_id: &str) -> Result<Vec<Badge>, StoreError> {
        let badges = self.badges.read().await;
        let mut owned: Vec<Badge> = badges
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by_key(|b| b.level);
        Ok(owned)
    }
}

#[async_trait]
impl AttemptStore for MemoryStore {
    async fn insert_attempt(&self, attempt: &QuizAttempt) -> Result<(), StoreError> {
        let mut attempts = self.attempts.write().await;
        if attempts.iter().any(|a| a.id == attempt.id) {
            return Err(StoreError::Duplicate(format!("attempt {}", attempt.id)));
        }
        attempts.push(attempt.clone());
        Ok(())
    }

    async fn attempts_for_user(&self, user_id: &str) -> Result<Vec<QuizAttempt>, StoreError> {
        let attempts = self.attempts.read().await;
        // reverse insertion order first so equal timestamps still come out newest first
        let mut owned: Vec<QuizAttempt> = attempts
            .iter()
            .rev()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn find_attempt(&self, id: &str) -> Result<Option<QuizAttempt>, StoreError> {
        let attempts = self.attempts.read().await;
        Ok(attempts.iter().find(|a| a.id == id).cloned())
    }
}

#[async_trait]
impl ChatLogStore for MemoryStore {
    async fn insert_chat_log(&self, log: &ChatLog) -> Result<(), StoreError> {
        self.chat_logs.write().await.push(log.clone());
        Ok(())
    }

    async fn chat_logs_for_user(&self, user_id: &str) -> Result<Vec<ChatLog>, StoreError> {
        let logs = self.chat_logs.read().await;
        let mut owned: Vec<ChatLog> = logs
            .iter()
            .rev()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }
}

#[async_trait]
impl StoreHealth for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;

    fn account(id: &str, username: &str) -> Account {
        Account {
            id: id.to_string(),
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password_hash: "x".to_string(),
            skill_level: SkillLevel::None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn rejects_duplicate_usernames() {
        let store = MemoryStore::new();
        store.create_account(&account("u1", "ada")).await.unwrap();

        let mut clash = account("u2", "ada");
        clash.email = "other@example.com".into();
        let err = store.create_account(&clash).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn skill_level_never_decreases() {
        let store = MemoryStore::new();
        store.create_account(&account("u1", "ada")).await.unwrap();

        let proposals = [
            SkillLevel::Intermediate,
            SkillLevel::Beginner,
            SkillLevel::None,
            SkillLevel::Expert,
            SkillLevel::Intermediate,
        ];
        let mut last = SkillLevel::None;
        for proposed in proposals {
            let t = store.raise_skill_level("u1", proposed).await.unwrap();
            assert!(t.current >= last);
            last = t.current;
        }
        assert_eq!(store.skill_level("u1").await.unwrap(), SkillLevel::Expert);
    }

    #[tokio::test]
    async fn raising_unknown_user_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .raise_skill_level("ghost", SkillLevel::Beginner)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn lesson_score_keeps_first_occurrence_of_maximum() {
        let store = MemoryStore::new();
        let t0 = Utc::now();
        let scores = [40, 75, 75, 60, 75];
        for (i, score) in scores.iter().enumerate() {
            let at = t0 + Duration::seconds(i as i64);
            store
                .record_lesson_score("u1", "ada", Level::Beginner, *score, at)
                .await
                .unwrap();
        }

        let top = store.top_lesson_scores(Level::Beginner, 10).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].score, 75);
        assert_eq!(top[0].achieved_at, t0 + Duration::seconds(1));
    }

    #[tokio::test]
    async fn concurrent_lesson_scores_keep_the_maximum() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();
        for score in [80, 60, 70, 10, 79] {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .record_lesson_score("u1", "ada", Level::Beginner, score, Utc::now())
                    .await
                    .unwrap()
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let top = store.top_lesson_scores(Level::Beginner, 1).await.unwrap();
        assert_eq!(top[0].score, 80);
    }

    #[tokio::test]
    async fn badges_are_unique_per_user_and_level() {
        let store = MemoryStore::new();
        let first = store.award_badge("u1", Level::Expert, Utc::now()).await.unwrap();
        let second = store.award_badge("u1", Level::Expert, Utc::now()).await.unwrap();

        assert!(first.newly_awarded);
        assert!(!second.newly_awarded);
        assert_eq!(first.badge.awarded_at, second.badge.awarded_at);
        assert_eq!(store.badges_for_user("u1").await.unwrap().len(), 1);
        assert!(store.has_badge("u1", Level::Expert).await.unwrap());
        assert!(!store.has_badge("u1", Level::Beginner).await.unwrap());
    }
}
