use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use super::ApiError;
use crate::{
    extractors::AppJson,
    models::user::{LoginRequest, RegisterRequest, TokenResponse, UserProfile},
    services::{auth_service::AuthService, AppState},
};

fn service(state: &AppState) -> AuthService {
    AuthService::new(
        state.accounts.clone(),
        state.jwt.clone(),
        state.config.bcrypt_cost,
    )
}

/// POST /register - Register a new user
pub async fn register(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserProfile>), ApiError> {
    tracing::info!(username = %req.username, "registering new user");
    let profile = service(&state).register(req).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// POST /login - Exchange credentials for an access token
pub async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    Ok(Json(service(&state).login(req).await?))
}
