use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use super::ApiError;
use crate::{
    extractors::AppJson,
    models::quiz::{QuizAttempt, SaveQuizAttemptRequest, SaveQuizAttemptResponse},
    services::{attempt_service::AttemptService, AppState},
};

fn service(state: &AppState) -> AttemptService {
    AttemptService::new(state.accounts.clone(), state.attempts.clone())
}

/// POST /savequizattempt
pub async fn save_quiz_attempt(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<SaveQuizAttemptRequest>,
) -> Result<(StatusCode, Json<SaveQuizAttemptResponse>), ApiError> {
    let id = service(&state).record_attempt(req).await?;
    Ok((StatusCode::CREATED, Json(SaveQuizAttemptResponse { id })))
}

/// GET /getquizattempts/{user}
pub async fn list_quiz_attempts(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<Json<Vec<QuizAttempt>>, ApiError> {
    Ok(Json(service(&state).attempts_for(&username).await?))
}

/// GET /getquizattempt/{id}
pub async fn get_quiz_attempt(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<QuizAttempt>, ApiError> {
    Ok(Json(service(&state).attempt(&id).await?))
}
