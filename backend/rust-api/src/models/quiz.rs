use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

/// A generated multiple-choice question. `answer` holds the correct option by value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(default)]
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    pub questions: Vec<Question>,
}

#[derive(Debug, Serialize)]
pub struct GenerateQuizResponse {
    pub quiz: Quiz,
}

/// One recorded quiz attempt. Immutable once written to the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub questions: Vec<Question>,
    /// question id -> selected option
    pub answers: BTreeMap<String, String>,
    pub score: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SaveQuizAttemptRequest {
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,

    #[validate(length(min = 1, message = "at least one question is required"))]
    pub questions: Vec<Question>,

    #[serde(default)]
    pub answers: BTreeMap<String, String>,

    #[validate(range(min = 0, message = "score must not be negative"))]
    pub score: i64,
}

#[derive(Debug, Serialize)]
pub struct SaveQuizAttemptResponse {
    pub id: String,
}

/// One answered question submitted for skill evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnsweredQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub selected: String,
}

#[derive(Debug, Deserialize)]
pub struct EvaluateSkillRequest {
    pub responses: Vec<AnsweredQuestion>,
    /// When set, the judged level is fed through the skill ratchet for this username.
    #[serde(default)]
    pub apply_to_user: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EvaluateSkillResponse {
    pub skill_level: crate::models::SkillLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied: Option<bool>,
}
