use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::skill::{Level, SkillLevel};

/// Best score a user ever reached at one level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonQuizRecord {
    pub user_id: String,
    pub username: String,
    pub level: Level,
    pub score: i64,
    pub achieved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonScoreOutcome {
    Created,
    Improved,
    NoImprovement,
}

impl LessonScoreOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            LessonScoreOutcome::Created => "created",
            LessonScoreOutcome::Improved => "improved",
            LessonScoreOutcome::NoImprovement => "no_improvement",
        }
    }
}

/// Result of a lesson score submission: the outcome plus the record as stored afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct LessonScoreUpdate {
    pub outcome: LessonScoreOutcome,
    pub record: LessonQuizRecord,
}

/// Result of a ratchet call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkillTransition {
    pub previous: SkillLevel,
    pub current: SkillLevel,
}

impl SkillTransition {
    pub fn updated(&self) -> bool {
        self.previous != self.current
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Badge {
    pub user_id: String,
    pub level: Level,
    pub awarded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BadgeAward {
    pub badge: Badge,
    pub newly_awarded: bool,
}

// HTTP responses

#[derive(Debug, Serialize)]
pub struct SkillLevelResponse {
    pub username: String,
    pub skill_level: SkillLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct BadgeAwardResponse {
    pub username: String,
    pub level: Level,
    pub newly_awarded: bool,
    pub awarded_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct BadgeStatusResponse {
    pub username: String,
    pub level: Level,
    pub awarded: bool,
}

#[derive(Debug, Serialize)]
pub struct BadgeListResponse {
    pub username: String,
    pub badges: Vec<Badge>,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub username: String,
    pub score: i64,
    pub achieved_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub level: Level,
    pub entries: Vec<LeaderboardEntry>,
}
