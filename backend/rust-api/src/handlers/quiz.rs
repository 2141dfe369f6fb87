use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use std::sync::Arc;

use super::ApiError;
use crate::{
    models::quiz::GenerateQuizResponse,
    services::{
        quiz_service::{QuizService, UploadedDocument},
        AppState,
    },
};

/// POST /generatequiz - multipart `file` (PDF) plus optional `message`
pub async fn generate_quiz(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<GenerateQuizResponse>, ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let mut document: Option<UploadedDocument> = None;
    let mut hint: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let content_type = field.content_type().map(str::to_string);
                let file_name = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read file: {}", e)))?;
                document = Some(UploadedDocument {
                    bytes: bytes.to_vec(),
                    content_type,
                    file_name,
                });
            }
            "message" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read message: {}", e)))?;
                hint = Some(text);
            }
            other => tracing::debug!(field = other, "ignoring multipart field"),
        }
    }

    let document = document.ok_or_else(|| ApiError::bad_request("No file uploaded"))?;
    tracing::info!(
        bytes = document.bytes.len(),
        file_name = ?document.file_name,
        has_hint = hint.is_some(),
        "quiz generation requested"
    );

    let service = QuizService::new(state.extractor.clone(), state.generator.clone(), &state.config);
    let quiz = service.generate_quiz(document, hint.as_deref()).await?;

    Ok(Json(GenerateQuizResponse { quiz }))
}
