use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use super::ApiError;
use crate::{
    extractors::AppJson,
    models::chat::{ChatLog, ChatRequest, ChatResponse},
    services::{chat_service::ChatService, AppState},
};

fn service(state: &AppState) -> ChatService {
    ChatService::new(
        state.accounts.clone(),
        state.chat_logs.clone(),
        state.generator.clone(),
        state.config.prompts.chat_system.clone(),
        state.generation_timeout(),
    )
}

/// POST /chat
pub async fn chat(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let response = service(&state).chat(req).await?;
    Ok(Json(ChatResponse { response }))
}

/// GET /getchatlogs/{user}
pub async fn chat_logs(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<Json<Vec<ChatLog>>, ApiError> {
    Ok(Json(service(&state).history(&username).await?))
}
