use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use super::classifier_service::ClassifierService;
use super::document_extractor::{ensure_pdf, truncate_chars, DocumentExtractor};
use super::error::{generative_failure, ServiceError};
use super::generative::{generate_with_timeout, GenerationRequest, TextGenerator};
use crate::config::{Config, Prompts};
use crate::metrics::QUIZZES_GENERATED_TOTAL;
use crate::models::{Question, Quiz};
use crate::utils::template::fill_template;

lazy_static! {
    static ref CODE_FENCE: Regex =
        Regex::new(r"(?s)^\s*```[A-Za-z0-9_+-]*[ \t]*\r?\n?(.*?)\r?\n?\s*```\s*$").unwrap();
}

/// An uploaded file as received at the boundary.
pub struct UploadedDocument {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub file_name: Option<String>,
}

/// Upload -> classify -> synthesize. Nothing is persisted along the way.
pub struct QuizService {
    extractor: Arc<dyn DocumentExtractor>,
    generator: Arc<dyn TextGenerator>,
    prompts: Prompts,
    timeout: Duration,
    max_document_chars: usize,
    temperature: f32,
}

impl QuizService {
    pub fn new(
        extractor: Arc<dyn DocumentExtractor>,
        generator: Arc<dyn TextGenerator>,
        config: &Config,
    ) -> Self {
        Self {
            extractor,
            generator,
            prompts: config.prompts.clone(),
            timeout: Duration::from_secs(config.generation.timeout_secs),
            max_document_chars: config.generation.max_document_chars,
            temperature: config.generation.temperature,
        }
    }

    pub async fn generate_quiz(
        &self,
        document: UploadedDocument,
        hint: Option<&str>,
    ) -> Result<Quiz, ServiceError> {
        ensure_pdf(
            &document.bytes,
            document.content_type.as_deref(),
            document.file_name.as_deref(),
        )?;

        let full_text = self.extractor.extract_text(document.bytes).await?;
        let text = truncate_chars(&full_text, self.max_document_chars);

        let classifier =
            ClassifierService::new(self.generator.clone(), self.prompts.clone(), self.timeout);
        if !classifier.classify(text).await? {
            QUIZZES_GENERATED_TOTAL
                .with_label_values(&["off_topic"])
                .inc();
            return Err(ServiceError::OffTopic);
        }

        match self.synthesize(text, hint).await {
            Ok(quiz) => {
                QUIZZES_GENERATED_TOTAL.with_label_values(&["success"]).inc();
                Ok(quiz)
            }
            Err(e) => {
                QUIZZES_GENERATED_TOTAL.with_label_values(&["error"]).inc();
                Err(e)
            }
        }
    }

    /// Asks the backend for a quiz over `text` and decodes the reply strictly.
    ///
    /// `text` is the already extracted and truncated document text; the upload
    /// path extracts once and shares it with the classifier.
    pub async fn synthesize(&self, text: &str, hint: Option<&str>) -> Result<Quiz, ServiceError> {
        let hint = hint.map(str::trim).filter(|h| !h.is_empty());
        let request = GenerationRequest {
            task: "quiz",
            system_instruction: self.prompts.quiz_system.clone(),
            content: fill_template(
                &self.prompts.quiz_user,
                &[("document", text), ("hint", hint.unwrap_or("none"))],
            ),
            temperature: Some(self.temperature),
        };

        let raw = generate_with_timeout(self.generator.as_ref(), &request, self.timeout)
            .await
            .map_err(|e| generative_failure(e, ServiceError::Upstream))?;

        let quiz = parse_quiz(&raw).map_err(|diagnostic| ServiceError::QuizFormat {
            diagnostic,
            raw: raw.clone(),
        })?;

        tracing::info!(
            questions = quiz.questions.len(),
            has_hint = hint.is_some(),
            "quiz synthesized"
        );
        Ok(quiz)
    }
}

/// Removes one surrounding Markdown code fence, if present.
pub fn strip_code_fence(raw: &str) -> &str {
    match CODE_FENCE.captures(raw).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => raw.trim(),
    }
}

#[derive(Deserialize)]
struct RawQuiz {
    questions: Vec<RawQuestion>,
}

#[derive(Deserialize)]
struct RawQuestion {
    #[serde(default)]
    id: Option<String>,
    question: String,
    options: Vec<String>,
    answer: String,
}

/// Strict decode of backend output. The error is a human-readable diagnostic.
pub fn parse_quiz(raw: &str) -> Result<Quiz, String> {
    let body = strip_code_fence(raw);
    let decoded: RawQuiz =
        serde_json::from_str(body).map_err(|e| format!("invalid quiz JSON: {}", e))?;

    if decoded.questions.is_empty() {
        return Err("quiz contains no questions".to_string());
    }

    let mut seen_ids = HashSet::new();
    let mut questions = Vec::with_capacity(decoded.questions.len());
    for (idx, raw_question) in decoded.questions.into_iter().enumerate() {
        let number = idx + 1;
        let question = raw_question.question.trim().to_string();
        if question.is_empty() {
            return Err(format!("question {} has empty text", number));
        }

        let options: Vec<String> = raw_question
            .options
            .iter()
            .map(|o| o.trim().to_string())
            .collect();
        if options.len() < 2 {
            return Err(format!("question {} needs at least two options", number));
        }
        if options.iter().any(|o| o.is_empty()) {
            return Err(format!("question {} has an empty option", number));
        }
        let distinct: HashSet<&String> = options.iter().collect();
        if distinct.len() != options.len() {
            return Err(format!("question {} repeats an option", number));
        }

        let answer = raw_question.answer.trim().to_string();
        if !options.contains(&answer) {
            return Err(format!(
                "question {} answer is not one of its options",
                number
            ));
        }

        let id = raw_question
            .id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| format!("q{}", number));
        if !seen_ids.insert(id.clone()) {
            return Err(format!("duplicate question id {}", id));
        }

        questions.push(Question {
            id,
            question,
            options,
            answer,
        });
    }

    Ok(Quiz { questions })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::mock_generator::MockGenerator;

    const QUIZ_JSON: &str = r#"{"questions":[
        {"question":"2 + 2 = ?","options":["3","4","5"],"answer":"4"},
        {"question":"d/dx x^2 = ?","options":["x","2x"],"answer":"2x","difficulty":"easy"}
    ]}"#;

    #[test]
    fn fenced_and_unfenced_output_parse_identically() {
        let plain = parse_quiz(QUIZ_JSON).unwrap();
        let fenced = parse_quiz(&format!("```json\n{}\n```", QUIZ_JSON)).unwrap();
        let bare_fence = parse_quiz(&format!("  ```\n{}\n```  \n", QUIZ_JSON)).unwrap();

        assert_eq!(plain, fenced);
        assert_eq!(plain, bare_fence);
        assert_eq!(plain.questions.len(), 2);
        assert_eq!(plain.questions[0].id, "q1");
        assert_eq!(plain.questions[1].id, "q2");
    }

    #[test]
    fn rejects_malformed_quizzes() {
        let cases = [
            ("not json at all", "invalid quiz JSON"),
            (r#"{"questions":[]}"#, "no questions"),
            (
                r#"{"questions":[{"question":"","options":["a","b"],"answer":"a"}]}"#,
                "empty text",
            ),
            (
                r#"{"questions":[{"question":"q","options":["a"],"answer":"a"}]}"#,
                "at least two options",
            ),
            (
                r#"{"questions":[{"question":"q","options":["a","a"],"answer":"a"}]}"#,
                "repeats an option",
            ),
            (
                r#"{"questions":[{"question":"q","options":["a","b"],"answer":"c"}]}"#,
                "not one of its options",
            ),
            (
                r#"{"questions":[{"question":"q","options":["a",2],"answer":"a"}]}"#,
                "invalid quiz JSON",
            ),
        ];

        for (raw, expected) in cases {
            let err = parse_quiz(raw).unwrap_err();
            assert!(err.contains(expected), "{:?} -> {}", raw, err);
        }
    }

    #[test]
    fn keeps_supplied_ids_but_rejects_duplicates() {
        let quiz = parse_quiz(
            r#"{"questions":[{"id":"alpha","question":"q","options":["a","b"],"answer":"b"}]}"#,
        )
        .unwrap();
        assert_eq!(quiz.questions[0].id, "alpha");

        let err = parse_quiz(
            r#"{"questions":[
                {"id":"x","question":"q1","options":["a","b"],"answer":"b"},
                {"id":"x","question":"q2","options":["a","b"],"answer":"a"}
            ]}"#,
        )
        .unwrap_err();
        assert!(err.contains("duplicate"));
    }

    #[tokio::test]
    async fn synthesize_embeds_hint_and_reports_raw_output_on_failure() {
        let generator = Arc::new(MockGenerator::with_fixed_response("Sure! Here is your quiz."));
        let service = QuizService::new(
            Arc::new(crate::services::document_extractor::PdfTextExtractor),
            generator.clone(),
            &Config::default(),
        );

        let err = service
            .synthesize("Pythagorean theorem", Some("focus on triangles"))
            .await
            .unwrap_err();
        match err {
            ServiceError::QuizFormat { raw, .. } => assert_eq!(raw, "Sure! Here is your quiz."),
            other => panic!("unexpected error {:?}", other),
        }

        let request = generator.last_request().unwrap();
        assert!(request.content.contains("Pythagorean theorem"));
        assert!(request.content.contains("focus on triangles"));
    }

    #[tokio::test]
    async fn document_text_is_embedded_verbatim() {
        let generator = Arc::new(MockGenerator::with_fixed_response(QUIZ_JSON));
        let service = QuizService::new(
            Arc::new(crate::services::document_extractor::PdfTextExtractor),
            generator.clone(),
            &Config::default(),
        );

        service
            .synthesize("Set notation: S = {hint} is a literal", None)
            .await
            .unwrap();

        let request = generator.last_request().unwrap();
        assert!(request.content.contains("S = {hint} is a literal"));
    }
}
