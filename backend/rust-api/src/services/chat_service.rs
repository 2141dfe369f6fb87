use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use super::error::{generative_failure, ServiceError};
use super::generative::{generate_with_timeout, GenerationRequest, TextGenerator};
use crate::models::chat::{ChatLog, ChatRequest};
use crate::store::{AccountStore, ChatLogStore};

/// Relays a prompt to the math tutor persona and keeps the exchange.
pub struct ChatService {
    accounts: Arc<dyn AccountStore>,
    logs: Arc<dyn ChatLogStore>,
    generator: Arc<dyn TextGenerator>,
    system_instruction: String,
    timeout: Duration,
}

impl ChatService {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        logs: Arc<dyn ChatLogStore>,
        generator: Arc<dyn TextGenerator>,
        system_instruction: String,
        timeout: Duration,
    ) -> Self {
        Self {
            accounts,
            logs,
            generator,
            system_instruction,
            timeout,
        }
    }

    pub async fn chat(&self, req: ChatRequest) -> Result<String, ServiceError> {
        req.validate()?;
        if req.prompt.trim().is_empty() {
            return Err(ServiceError::Validation("prompt must not be empty".to_string()));
        }
        let user_id = self.user_id(&req.username).await?;

        let request = GenerationRequest {
            task: "chat",
            system_instruction: self.system_instruction.clone(),
            content: req.prompt.clone(),
            temperature: None,
        };
        let response = generate_with_timeout(self.generator.as_ref(), &request, self.timeout)
            .await
            .map_err(|e| generative_failure(e, ServiceError::Upstream))?;

        // stored only once the backend has answered
        let log = ChatLog {
            id: Uuid::new_v4().to_string(),
            user_id,
            prompt: req.prompt,
            response: response.clone(),
            created_at: Utc::now(),
        };
        self.logs.insert_chat_log(&log).await?;
        tracing::info!(
            user_id = %log.user_id,
            prompt_len = log.prompt.len(),
            response_len = response.len(),
            "chat exchange stored"
        );

        Ok(response)
    }

    pub async fn history(&self, username: &str) -> Result<Vec<ChatLog>, ServiceError> {
        let user_id = self.user_id(username).await?;
        Ok(self.logs.chat_logs_for_user(&user_id).await?)
    }

    async fn user_id(&self, username: &str) -> Result<String, ServiceError> {
        self.accounts
            .find_by_username(username)
            .await?
            .map(|a| a.id)
            .ok_or_else(|| ServiceError::NotFound(format!("user {}", username)))
    }
}
