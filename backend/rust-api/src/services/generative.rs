//! Seam to the hosted language model.
//!
//! Every call goes through [`generate_with_timeout`], which bounds the call,
//! records metrics and turns an elapsed deadline into [`GenerativeError::Timeout`].

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::metrics::record_generation;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GenerativeError {
    #[error("generative backend timed out after {0}s")]
    Timeout(u64),

    #[error("generative backend returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("failed to decode backend response: {0}")]
    Decode(String),

    #[error("generative backend returned no text")]
    EmptyResponse,
}

impl GenerativeError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, GenerativeError::Timeout(_))
    }
}

/// One prompt: a system instruction plus the user content.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    /// Short label used for metrics and logs (`classify`, `quiz`, `evaluate`, `chat`).
    pub task: &'static str,
    pub system_instruction: String,
    pub content: String,
    pub temperature: Option<f32>,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &str;

    /// Returns the backend's free-text reply.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerativeError>;
}

pub async fn generate_with_timeout(
    generator: &dyn TextGenerator,
    request: &GenerationRequest,
    timeout: Duration,
) -> Result<String, GenerativeError> {
    let start = Instant::now();
    let result = match tokio::time::timeout(timeout, generator.generate(request)).await {
        Ok(result) => result,
        Err(_) => Err(GenerativeError::Timeout(timeout.as_secs())),
    };
    let elapsed = start.elapsed();

    let status = match &result {
        Ok(_) => "success",
        Err(e) if e.is_timeout() => "timeout",
        Err(_) => "error",
    };
    record_generation(request.task, status, elapsed);

    match &result {
        Ok(text) => tracing::debug!(
            task = request.task,
            backend = generator.name(),
            elapsed_ms = elapsed.as_millis() as u64,
            reply_len = text.len(),
            "generation completed"
        ),
        Err(e) => tracing::warn!(
            task = request.task,
            backend = generator.name(),
            elapsed_ms = elapsed.as_millis() as u64,
            error = %e,
            "generation failed"
        ),
    }

    result
}
