use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::skill::SkillLevel;

/// Account record owned by the account store.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    /// Opaque, stable identifier. Keys every progression and ledger record.
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub skill_level: SkillLevel,
    pub created_at: DateTime<Utc>,
}

/// User profile returned to client (without sensitive data)
#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub skill_level: SkillLevel,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for UserProfile {
    fn from(account: Account) -> Self {
        UserProfile {
            id: account.id,
            username: account.username,
            email: account.email,
            skill_level: account.skill_level,
            created_at: account.created_at,
        }
    }
}

/// Request to register a new user
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(
        min = 3,
        max = 50,
        message = "Username must be between 3 and 50 characters"
    ))]
    pub username: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Request to login
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}
