//! MongoDB-backed store.
//!
//! Conditional updates are expressed as filtered single-document writes so the
//! server applies the compare and the set atomically:
//! - skill ratchet: `{_id, skill_rank: {$lt: proposed}}`
//! - lesson best-of: `{_id, score: {$lt: new}}`, one partition collection per level
//! - badges: upsert with `$setOnInsert` under a unique `(user_id, level)` index

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    error::{ErrorKind, WriteFailure},
    options::{FindOptions, IndexOptions, UpdateOptions},
    Collection, Database, IndexModel,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{
    bson_time, AccountStore, AttemptStore, ChatLogStore, ProgressionStore, StoreError,
    StoreHealth,
};
use crate::metrics::track_db_operation;
use crate::models::{
    chat::ChatLog, Account, Badge, BadgeAward, LessonQuizRecord, LessonScoreOutcome, Level,
    Question, QuizAttempt, SkillLevel, SkillTransition,
};

const USERS: &str = "users";
const BADGES: &str = "badges";
const QUIZ_ATTEMPTS: &str = "quiz_attempts";
const CHAT_LOGS: &str = "chat_logs";

const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Creates the unique and ordering indexes the store relies on. Safe to run on every start.
    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        let unique = || IndexOptions::builder().unique(true).build();

        let users = self.db.collection::<Document>(USERS);
        users
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "username": 1 })
                    .options(unique())
                    .build(),
            )
            .await?;
        users
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "email": 1 })
                    .options(unique())
                    .build(),
            )
            .await?;

        self.db
            .collection::<Document>(BADGES)
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "user_id": 1, "level": 1 })
                    .options(unique())
                    .build(),
            )
            .await?;

        for collection in [QUIZ_ATTEMPTS, CHAT_LOGS] {
            self.db
                .collection::<Document>(collection)
                .create_index(
                    IndexModel::builder()
                        .keys(doc! { "user_id": 1, "created_at": -1 })
                        .build(),
                )
                .await?;
        }

        for level in Level::ALL {
            self.db
                .collection::<Document>(level.lesson_partition())
                .create_index(
                    IndexModel::builder()
                        .keys(doc! { "score": -1, "achieved_at": 1 })
                        .build(),
                )
                .await?;
        }

        tracing::info!("MongoDB indexes ensured");
        Ok(())
    }

    fn users(&self) -> Collection<AccountDocument> {
        self.db.collection(USERS)
    }

    fn lesson_scores(&self, level: Level) -> Collection<LessonScoreDocument> {
        self.db.collection(level.lesson_partition())
    }

    fn badges(&self) -> Collection<BadgeDocument> {
        self.db.collection(BADGES)
    }

    fn attempts(&self) -> Collection<AttemptDocument> {
        self.db.collection(QUIZ_ATTEMPTS)
    }

    fn chat_logs(&self) -> Collection<ChatLogDocument> {
        self.db.collection(CHAT_LOGS)
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    is_duplicate_key_kind(&err.kind)
}

fn is_duplicate_key_kind(kind: &ErrorKind) -> bool {
    match kind {
        ErrorKind::Write(WriteFailure::WriteError(we)) => we.code == DUPLICATE_KEY_CODE,
        ErrorKind::Command(ce) => ce.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

// Documents. Timestamps are stored as BSON dates so they sort server-side.

#[derive(Debug, Serialize, Deserialize)]
struct AccountDocument {
    #[serde(rename = "_id")]
    id: String,
    username: String,
    email: String,
    password_hash: String,
    skill_level: SkillLevel,
    skill_rank: i32,
    #[serde(with = "bson_time")]
    created_at: DateTime<Utc>,
}

impl From<&Account> for AccountDocument {
    fn from(a: &Account) -> Self {
        Self {
            id: a.id.clone(),
            username: a.username.clone(),
            email: a.email.clone(),
            password_hash: a.password_hash.clone(),
            skill_level: a.skill_level,
            skill_rank: a.skill_level.rank(),
            created_at: a.created_at,
        }
    }
}

impl From<AccountDocument> for Account {
    fn from(d: AccountDocument) -> Self {
        Self {
            id: d.id,
            username: d.username,
            email: d.email,
            password_hash: d.password_hash,
            skill_level: d.skill_level,
            created_at: d.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LessonScoreDocument {
    /// The user id: one record per user in each level partition.
    #[serde(rename = "_id")]
    id: String,
    username: String,
    level: Level,
    score: i64,
    #[serde(with = "bson_time")]
    achieved_at: DateTime<Utc>,
}

impl From<LessonScoreDocument> for LessonQuizRecord {
    fn from(d: LessonScoreDocument) -> Self {
        Self {
            user_id: d.id,
            username: d.username,
            level: d.level,
            score: d.score,
            achieved_at: d.achieved_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct BadgeDocument {
    user_id: String,
    level: Level,
    #[serde(with = "bson_time")]
    awarded_at: DateTime<Utc>,
}

impl From<BadgeDocument> for Badge {
    fn from(d: BadgeDocument) -> Self {
        Self {
            user_id: d.user_id,
            level: d.level,
            awarded_at: d.awarded_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct AttemptDocument {
    #[serde(rename = "_id")]
    id: String,
    user_id: String,
    username: String,
    questions: Vec<Question>,
    answers: BTreeMap<String, String>,
    score: i64,
    #[serde(with = "bson_time")]
    created_at: DateTime<Utc>,
}

impl From<&QuizAttempt> for AttemptDocument {
    fn from(a: &QuizAttempt) -> Self {
        Self {
            id: a.id.clone(),
            user_id: a.user_id.clone(),
            username: a.username.clone(),
            questions: a.questions.clone(),
            answers: a.answers.clone(),
            score: a.score,
            created_at: a.created_at,
        }
    }
}

impl From<AttemptDocument> for QuizAttempt {
    fn from(d: AttemptDocument) -> Self {
        Self {
            id: d.id,
            user_id: d.user_id,
            username: d.username,
            questions: d.questions,
            answers: d.answers,
            score: d.score,
            created_at: d.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatLogDocument {
    #[serde(rename = "_id")]
    id: String,
    user_id: String,
    prompt: String,
    response: String,
    #[serde(with = "bson_time")]
    created_at: DateTime<Utc>,
}

impl From<&ChatLog> for ChatLogDocument {
    fn from(l: &ChatLog) -> Self {
        Self {
            id: l.id.clone(),
            user_id: l.user_id.clone(),
            prompt: l.prompt.clone(),
            response: l.response.clone(),
            created_at: l.created_at,
        }
    }
}

impl From<ChatLogDocument> for ChatLog {
    fn from(d: ChatLogDocument) -> Self {
        Self {
            id: d.id,
            user_id: d.user_id,
            prompt: d.prompt,
            response: d.response,
            created_at: d.created_at,
        }
    }
}

#[async_trait]
impl AccountStore for MongoStore {
    async fn create_account(&self, account: &Account) -> Result<(), StoreError> {
        let document = AccountDocument::from(account);
        let result = track_db_operation("insert_one", USERS, async {
            self.users().insert_one(&document).await.map(|_| ())
        })
        .await;

        match result {
            Ok(()) => Ok(()),
            Err(err) if is_duplicate_key(&err) => {
                let field = if err.to_string().contains("email") {
                    "email"
                } else {
                    "username"
                };
                Err(StoreError::Duplicate(field.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        let found = track_db_operation("find_one", USERS, async {
            self.users().find_one(doc! { "username": username }).await
        })
        .await?;
        Ok(found.map(Account::from))
    }
}

#[async_trait]
impl ProgressionStore for MongoStore {
    async fn skill_level(&self, user_id: &str) -> Result<SkillLevel, StoreError> {
        let found = track_db_operation("find_one", USERS, async {
            self.users().find_one(doc! { "_id": user_id }).await
        })
        .await?;
        found
            .map(|d| d.skill_level)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user_id)))
    }

    async fn raise_skill_level(
        &self,
        user_id: &str,
        proposed: SkillLevel,
    ) -> Result<SkillTransition, StoreError> {
        let before = track_db_operation("find_one_and_update", USERS, async {
            self.users()
                .find_one_and_update(
                    doc! { "_id": user_id, "skill_rank": { "$lt": proposed.rank() } },
                    doc! { "$set": {
                        "skill_level": proposed.as_str(),
                        "skill_rank": proposed.rank(),
                    } },
                )
                .await
        })
        .await?;

        match before {
            Some(previous) => Ok(SkillTransition {
                previous: previous.skill_level,
                current: proposed,
            }),
            None => {
                // unknown user, or already at or above the proposed rank
                let current = self.skill_level(user_id).await?;
                Ok(SkillTransition {
                    previous: current,
                    current,
                })
            }
        }
    }

    async fn record_lesson_score(
        &self,
        user_id: &str,
        username: &str,
        level: Level,
        score: i64,
        at: DateTime<Utc>,
    ) -> Result<(LessonScoreOutcome, LessonQuizRecord), StoreError> {
        let collection = self.lesson_scores(level);
        let partition = level.lesson_partition();
        // BSON dates only hold milliseconds
        let at = bson_time::truncate(at);
        let record = LessonQuizRecord {
            user_id: user_id.to_string(),
            username: username.to_string(),
            level,
            score,
            achieved_at: at,
        };

        let updated = track_db_operation("update_one", partition, async {
            collection
                .update_one(
                    doc! { "_id": user_id, "score": { "$lt": score } },
                    doc! { "$set": {
                        "score": score,
                        "achieved_at": bson_time::to_bson(at),
                        "username": username,
                    } },
                )
                .await
        })
        .await?;
        if updated.matched_count == 1 {
            return Ok((LessonScoreOutcome::Improved, record));
        }

        let existing = track_db_operation("find_one", partition, async {
            collection.find_one(doc! { "_id": user_id }).await
        })
        .await?;
        if let Some(existing) = existing {
            if existing.score < score {
                // Created by a concurrent writer after our conditional update missed.
                return Err(StoreError::Concurrency(format!("{}:{}", partition, user_id)));
            }
            return Ok((LessonScoreOutcome::NoImprovement, existing.into()));
        }

        let document = LessonScoreDocument {
            id: user_id.to_string(),
            username: username.to_string(),
            level,
            score,
            achieved_at: at,
        };
        let inserted = track_db_operation("insert_one", partition, async {
            collection.insert_one(&document).await
        })
        .await;
        match inserted {
            Ok(_) => Ok((LessonScoreOutcome::Created, record)),
            Err(err) if is_duplicate_key(&err) => {
                Err(StoreError::Concurrency(format!("{}:{}", partition, user_id)))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn top_lesson_scores(
        &self,
        level: Level,
        limit: usize,
    ) -> Result<Vec<LessonQuizRecord>, StoreError> {
        let options = FindOptions::builder()
            .sort(doc! { "score": -1, "achieved_at": 1, "_id": 1 })
            .limit(limit as i64)
            .build();

        let documents: Vec<LessonScoreDocument> =
            track_db_operation("find", level.lesson_partition(), async {
                self.lesson_scores(level)
                    .find(doc! {})
                    .with_options(options)
                    .await?
                    .try_collect()
                    .await
            })
            .await?;

        Ok(documents.into_iter().map(LessonQuizRecord::from).collect())
    }

    async fn award_badge(
        &self,
        user_id: &str,
        level: Level,
        at: DateTime<Utc>,
    ) -> Result<BadgeAward, StoreError> {
        let level_bson = mongodb::bson::to_bson(&level)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let filter = doc! { "user_id": user_id, "level": level_bson.clone() };

        let upsert = track_db_operation("update_one", BADGES, async {
            self.badges()
                .update_one(
                    filter.clone(),
                    doc! { "$setOnInsert": {
                        "user_id": user_id,
                        "level": level_bson,
                        "awarded_at": bson_time::to_bson(at),
                    } },
                )
                .with_options(UpdateOptions::builder().upsert(true).build())
                .await
        })
        .await;

        let newly_awarded = match upsert {
            Ok(result) => result.upserted_id.is_some(),
            // Lost an upsert race against the unique index: the other writer awarded it.
            Err(err) if is_duplicate_key(&err) => false,
            Err(err) => return Err(err.into()),
        };

        let badge = track_db_operation("find_one", BADGES, async {
            self.badges().find_one(filter).await
        })
        .await?
        .ok_or_else(|| StoreError::Backend("badge missing after upsert".into()))?;

        Ok(BadgeAward {
            badge: badge.into(),
            newly_awarded,
        })
    }

    async fn has_badge(&self, user_id: &str, level: Level) -> Result<bool, StoreError> {
        let level_bson = mongodb::bson::to_bson(&level)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let count = track_db_operation("count_documents", BADGES, async {
            self.badges()
                .count_documents(doc! { "user_id": user_id, "level": level_bson })
                .await
        })
        .await?;
        Ok(count > 0)
    }

    async fn badges_for_user(&self, user_id: &str) -> Result<Vec<Badge>, StoreError> {
        let documents: Vec<BadgeDocument> = track_db_operation("find", BADGES, async {
            self.badges()
                .find(doc! { "user_id": user_id })
                .await?
                .try_collect()
                .await
        })
        .await?;
        let mut badges: Vec<Badge> = documents.into_iter().map(Badge::from).collect();
        badges.sort_by_key(|b| b.level);
        Ok(badges)
    }
}

#[async_trait]
impl AttemptStore for MongoStore {
    async fn insert_attempt(&self, attempt: &QuizAttempt) -> Result<(), StoreError> {
        let document = AttemptDocument::from(attempt);
        track_db_operation("insert_one", QUIZ_ATTEMPTS, async {
            self.attempts().insert_one(&document).await.map(|_| ())
        })
        .await?;
        Ok(())
    }

    async fn attempts_for_user(&self, user_id: &str) -> Result<Vec<QuizAttempt>, StoreError> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1, "_id": -1 })
            .build();
        let documents: Vec<AttemptDocument> = track_db_operation("find", QUIZ_ATTEMPTS, async {
            self.attempts()
                .find(doc! { "user_id": user_id })
                .with_options(options)
                .await?
                .try_collect()
                .await
        })
        .await?;
        Ok(documents.into_iter().map(QuizAttempt::from).collect())
    }

    async fn find_attempt(&self, id: &str) -> Result<Option<QuizAttempt>, StoreError> {
        let found = track_db_operation("find_one", QUIZ_ATTEMPTS, async {
            self.attempts().find_one(doc! { "_id": id }).await
        })
        .await?;
        Ok(found.map(QuizAttempt::from))
    }
}

#[async_trait]
impl ChatLogStore for MongoStore {
    async fn insert_chat_log(&self, log: &ChatLog) -> Result<(), StoreError> {
        let document = ChatLogDocument::from(log);
        track_db_operation("insert_one", CHAT_LOGS, async {
            self.chat_logs().insert_one(&document).await.map(|_| ())
        })
        .await?;
        Ok(())
    }

    async fn chat_logs_for_user(&self, user_id: &str) -> Result<Vec<ChatLog>, StoreError> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .limit(200)
            .build();
        let documents: Vec<ChatLogDocument> = track_db_operation("find", CHAT_LOGS, async {
            self.chat_logs()
                .find(doc! { "user_id": user_id })
                .with_options(options)
                .await?
                .try_collect()
                .await
        })
        .await?;
        Ok(documents.into_iter().map(ChatLog::from).collect())
    }
}

#[async_trait]
impl StoreHealth for MongoStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}
