use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::services::ServiceError;

/// Error returned by every handler, rendered as `{"message", "status"}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "message": self.message,
            "status": self.status.as_u16(),
        });
        (self.status, Json(body)).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(msg) => ApiError::bad_request(msg),
            ServiceError::OffTopic => ApiError::bad_request(
                "The uploaded document is not about mathematics. \
                 Please upload math study material.",
            ),
            ServiceError::Conflict(what) => {
                ApiError::bad_request(format!("{} already exists", what))
            }
            ServiceError::Unauthorized(msg) => ApiError::new(StatusCode::UNAUTHORIZED, msg),
            ServiceError::NotFound(what) => {
                ApiError::new(StatusCode::NOT_FOUND, format!("{} not found", what))
            }
            ServiceError::BackendTimeout(e) => {
                tracing::error!(error = %e, "generative backend timed out");
                ApiError::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "The tutoring backend took too long to answer. Please try again.",
                )
            }
            ServiceError::Contention(what) => {
                tracing::error!(what = %what, "store contention outlived retries");
                ApiError::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "The request conflicted with concurrent updates. Please try again.",
                )
            }
            ServiceError::Classification(diagnostic) => {
                tracing::error!(diagnostic = %diagnostic, "document classification failed");
                internal("Could not classify the uploaded document")
            }
            ServiceError::QuizFormat { diagnostic, raw } => {
                tracing::error!(diagnostic = %diagnostic, raw = %raw, "quiz output rejected");
                internal("Could not generate a quiz from the uploaded document")
            }
            ServiceError::Evaluation { diagnostic, raw } => {
                tracing::error!(diagnostic = %diagnostic, raw = %raw, "skill evaluation failed");
                internal("Could not evaluate the answered questions")
            }
            ServiceError::Upstream(e) => {
                tracing::error!(error = %e, "generative backend failed");
                internal("The tutoring backend failed to answer")
            }
            ServiceError::Store(msg) => {
                tracing::error!(error = %msg, "storage failure");
                internal("Internal server error")
            }
            ServiceError::Internal(msg) => {
                tracing::error!(error = %msg, "internal failure");
                internal("Internal server error")
            }
        }
    }
}

fn internal(message: &str) -> ApiError {
    ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, message)
}
