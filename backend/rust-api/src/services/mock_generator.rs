//! Scripted [`TextGenerator`] for tests. Built only with the `test-util` feature.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::generative::{GenerationRequest, GenerativeError, TextGenerator};

enum Matcher {
    Task(&'static str),
    Contains(String),
}

/// Replies are chosen by the first matching rule, in insertion order:
/// a task label (`on_task`) or a substring of the system instruction or content (`on`).
pub struct MockGenerator {
    rules: Vec<(Matcher, Result<String, GenerativeError>)>,
    default_response: Result<String, GenerativeError>,
    delay: Option<Duration>,
    call_count: AtomicU32,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::with_fixed_response("")
    }
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fixed_response(response: &str) -> Self {
        Self {
            rules: Vec::new(),
            default_response: Ok(response.to_string()),
            delay: None,
            call_count: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with `error` unless a rule matches.
    pub fn failing(error: GenerativeError) -> Self {
        Self {
            default_response: Err(error),
            ..Self::default()
        }
    }

    pub fn on_task(mut self, task: &'static str, response: &str) -> Self {
        self.rules
            .push((Matcher::Task(task), Ok(response.to_string())));
        self
    }

    pub fn on_task_error(mut self, task: &'static str, error: GenerativeError) -> Self {
        self.rules.push((Matcher::Task(task), Err(error)));
        self
    }

    pub fn on(mut self, needle: &str, response: &str) -> Self {
        self.rules
            .push((Matcher::Contains(needle.to_string()), Ok(response.to_string())));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.requests().last().cloned()
    }

    /// All requests seen so far, oldest first.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn reply_for(&self, request: &GenerationRequest) -> Result<String, GenerativeError> {
        self.rules
            .iter()
            .find(|(matcher, _)| match matcher {
                Matcher::Task(task) => *task == request.task,
                Matcher::Contains(needle) => {
                    request.system_instruction.contains(needle.as_str())
                        || request.content.contains(needle.as_str())
                }
            })
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| self.default_response.clone())
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerativeError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.reply_for(request)
    }
}
