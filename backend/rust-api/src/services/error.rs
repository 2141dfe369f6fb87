use thiserror::Error;

use super::document_extractor::ExtractionError;
use super::generative::GenerativeError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("the uploaded document is not about mathematics")]
    OffTopic,

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    Conflict(String),

    #[error("generative backend timed out")]
    BackendTimeout(#[source] GenerativeError),

    /// Store contention that outlived the retry budget.
    #[error("store contention: {0}")]
    Contention(String),

    #[error("document classification failed: {0}")]
    Classification(String),

    #[error("quiz output rejected: {diagnostic}")]
    QuizFormat { diagnostic: String, raw: String },

    #[error("skill evaluation failed: {diagnostic}")]
    Evaluation { diagnostic: String, raw: String },

    #[error("generative backend failed: {0}")]
    Upstream(#[source] GenerativeError),

    #[error("storage error: {0}")]
    Store(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => ServiceError::NotFound(what),
            StoreError::Duplicate(what) => ServiceError::Conflict(what),
            StoreError::Concurrency(what) => ServiceError::Contention(what),
            StoreError::Backend(msg) => ServiceError::Store(msg),
        }
    }
}

impl From<ExtractionError> for ServiceError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::Unsupported(msg) => ServiceError::Validation(msg),
            ExtractionError::Pdf(msg) => {
                ServiceError::Validation(format!("could not read the PDF: {}", msg))
            }
            ExtractionError::Aborted(msg) => ServiceError::Internal(msg),
        }
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => msg.to_string(),
                    None => format!("{} is invalid", field),
                })
            })
            .collect();
        messages.sort();
        ServiceError::Validation(messages.join("; "))
    }
}

/// Maps a generative failure: timeouts stay retryable, everything else goes through `other`.
pub(crate) fn generative_failure(
    err: GenerativeError,
    other: impl FnOnce(GenerativeError) -> ServiceError,
) -> ServiceError {
    if err.is_timeout() {
        ServiceError::BackendTimeout(err)
    } else {
        other(err)
    }
}
