use std::sync::Arc;
use std::time::Duration;

use super::error::{generative_failure, ServiceError};
use super::generative::{generate_with_timeout, GenerationRequest, TextGenerator};
use crate::config::Prompts;
use crate::metrics::DOCUMENTS_CLASSIFIED_TOTAL;
use crate::utils::template::fill_template;

/// Gates uploaded material: only mathematical documents reach quiz synthesis.
pub struct ClassifierService {
    generator: Arc<dyn TextGenerator>,
    prompts: Prompts,
    timeout: Duration,
}

impl ClassifierService {
    pub fn new(generator: Arc<dyn TextGenerator>, prompts: Prompts, timeout: Duration) -> Self {
        Self {
            generator,
            prompts,
            timeout,
        }
    }

    /// `true` when the backend judges the text to be about mathematics.
    /// Any failure is an error, never a positive answer.
    pub async fn classify(&self, text: &str) -> Result<bool, ServiceError> {
        if text.trim().is_empty() {
            return Err(ServiceError::Classification(
                "document contains no extractable text".to_string(),
            ));
        }

        let request = GenerationRequest {
            task: "classify",
            system_instruction: self.prompts.classifier_system.clone(),
            content: fill_template(&self.prompts.classifier_user, &[("document", text)]),
            temperature: Some(0.0),
        };

        let reply = generate_with_timeout(self.generator.as_ref(), &request, self.timeout)
            .await
            .map_err(|e| {
                generative_failure(e, |e| ServiceError::Classification(e.to_string()))
            })?;

        let is_math = interpret_reply(&reply);
        DOCUMENTS_CLASSIFIED_TOTAL
            .with_label_values(&[if is_math { "math" } else { "off_topic" }])
            .inc();
        tracing::info!(chars = text.chars().count(), is_math, "document classified");

        Ok(is_math)
    }
}

fn interpret_reply(reply: &str) -> bool {
    let lower = reply.to_lowercase();
    if lower.contains("yes") {
        return true;
    }
    if !lower.contains("no") {
        tracing::warn!(reply_len = reply.len(), "classifier reply was neither yes nor no");
    }
    false
}
