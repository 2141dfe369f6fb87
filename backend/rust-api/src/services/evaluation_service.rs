use std::sync::Arc;
use std::time::Duration;

use super::error::{generative_failure, ServiceError};
use super::generative::{generate_with_timeout, GenerationRequest, TextGenerator};
use crate::config::Prompts;
use crate::metrics::SKILL_EVALUATIONS_TOTAL;
use crate::models::{AnsweredQuestion, Level, SkillLevel};
use crate::utils::template::fill_template;

/// Judges a completed attempt as Beginner, Intermediate or Expert. Never persists anything.
pub struct EvaluationService {
    generator: Arc<dyn TextGenerator>,
    prompts: Prompts,
    timeout: Duration,
}

impl EvaluationService {
    pub fn new(generator: Arc<dyn TextGenerator>, prompts: Prompts, timeout: Duration) -> Self {
        Self {
            generator,
            prompts,
            timeout,
        }
    }

    pub async fn evaluate(
        &self,
        responses: &[AnsweredQuestion],
    ) -> Result<SkillLevel, ServiceError> {
        validate_responses(responses)?;

        let request = GenerationRequest {
            task: "evaluate",
            system_instruction: self.prompts.evaluator_system.clone(),
            content: fill_template(
                &self.prompts.evaluator_user,
                &[("responses", &render_responses(responses))],
            ),
            temperature: Some(0.0),
        };

        let reply = generate_with_timeout(self.generator.as_ref(), &request, self.timeout)
            .await
            .map_err(|e| {
                generative_failure(e, |e| ServiceError::Evaluation {
                    diagnostic: e.to_string(),
                    raw: String::new(),
                })
            })?;

        let level = parse_skill_label(&reply).ok_or_else(|| ServiceError::Evaluation {
            diagnostic: "reply does not start with a skill label".to_string(),
            raw: reply.clone(),
        })?;

        SKILL_EVALUATIONS_TOTAL
            .with_label_values(&[level.as_str()])
            .inc();
        tracing::info!(questions = responses.len(), level = %level, "skill evaluated");

        Ok(level.into())
    }
}

fn validate_responses(responses: &[AnsweredQuestion]) -> Result<(), ServiceError> {
    if responses.is_empty() {
        return Err(ServiceError::Validation(
            "at least one answered question is required".to_string(),
        ));
    }
    for (idx, r) in responses.iter().enumerate() {
        let number = idx + 1;
        if r.question.trim().is_empty() {
            return Err(ServiceError::Validation(format!(
                "response {} has an empty question",
                number
            )));
        }
        if r.options.is_empty() {
            return Err(ServiceError::Validation(format!(
                "response {} has no options",
                number
            )));
        }
        if r.selected.trim().is_empty() {
            return Err(ServiceError::Validation(format!(
                "response {} has no selected answer",
                number
            )));
        }
    }
    Ok(())
}

fn render_responses(responses: &[AnsweredQuestion]) -> String {
    responses
        .iter()
        .enumerate()
        .map(|(idx, r)| {
            format!(
                "{}. Question: {}\n   Options: {}\n   Selected: {}",
                idx + 1,
                r.question.trim(),
                r.options.join(" | "),
                r.selected.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// First whitespace-delimited token, stripped of ASCII punctuation, matched case-insensitively.
pub fn parse_skill_label(reply: &str) -> Option<Level> {
    let token = reply.split_whitespace().next()?;
    token
        .trim_matches(|c: char| c.is_ascii_punctuation())
        .parse::<Level>()
        .ok()
}
