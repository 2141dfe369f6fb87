use std::sync::Arc;

use bcrypt::{hash, verify};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use super::error::ServiceError;
use super::jwt::JwtService;
use crate::models::user::{LoginRequest, RegisterRequest, TokenResponse, UserProfile};
use crate::models::{Account, SkillLevel};
use crate::store::AccountStore;

const INVALID_CREDENTIALS: &str = "Incorrect username or password";

pub struct AuthService {
    accounts: Arc<dyn AccountStore>,
    jwt: Arc<JwtService>,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(accounts: Arc<dyn AccountStore>, jwt: Arc<JwtService>, bcrypt_cost: u32) -> Self {
        Self {
            accounts,
            jwt,
            bcrypt_cost,
        }
    }

    /// bcrypt runs on the blocking pool
    async fn hash_password(&self, password: String) -> Result<String, ServiceError> {
        let cost = self.bcrypt_cost;
        tokio::task::spawn_blocking(move || hash(password, cost))
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?
            .map_err(|e| ServiceError::Internal(format!("failed to hash password: {}", e)))
    }

    async fn verify_password(&self, password: String, hash: String) -> Result<bool, ServiceError> {
        tokio::task::spawn_blocking(move || verify(password, &hash))
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?
            .map_err(|e| ServiceError::Internal(format!("failed to verify password: {}", e)))
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<UserProfile, ServiceError> {
        req.validate()?;

        let password_hash = self.hash_password(req.password).await?;
        let account = Account {
            id: Uuid::new_v4().to_string(),
            username: req.username,
            email: req.email,
            password_hash,
            skill_level: SkillLevel::None,
            created_at: Utc::now(),
        };

        self.accounts.create_account(&account).await?;
        tracing::info!(user_id = %account.id, "account registered");

        Ok(UserProfile::from(account))
    }

    /// Unknown usernames and wrong passwords get the same answer.
    pub async fn login(&self, req: LoginRequest) -> Result<TokenResponse, ServiceError> {
        req.validate()?;

        let account = self
            .accounts
            .find_by_username(&req.username)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

        if !self
            .verify_password(req.password, account.password_hash.clone())
            .await?
        {
            tracing::warn!(user_id = %account.id, "login rejected");
            return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        let access_token = self
            .jwt
            .issue(&account.username)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        tracing::info!(user_id = %account.id, "login succeeded");

        Ok(TokenResponse {
            access_token,
            token_type: "bearer".to_string(),
        })
    }
}
