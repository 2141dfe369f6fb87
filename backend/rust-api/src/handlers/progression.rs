use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use std::sync::Arc;

use super::ApiError;
use crate::{
    extractors::AppJson,
    models::{
        progression::{
            BadgeAwardResponse, BadgeListResponse, BadgeStatusResponse, LeaderboardQuery,
            LeaderboardResponse, LessonScoreUpdate, SkillLevelResponse,
        },
        quiz::{EvaluateSkillRequest, EvaluateSkillResponse},
        Level, SkillLevel,
    },
    services::{
        evaluation_service::EvaluationService, progression_service::ProgressionService, AppState,
    },
};

fn service(state: &AppState) -> ProgressionService {
    ProgressionService::new(state.accounts.clone(), state.progression.clone())
}

fn parse_level(raw: &str) -> Result<Level, ApiError> {
    raw.parse::<Level>()
        .map_err(|e| ApiError::bad_request(e.to_string()))
}

/// POST /evaluate-skill
pub async fn evaluate_skill(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<EvaluateSkillRequest>,
) -> Result<Json<EvaluateSkillResponse>, ApiError> {
    let evaluator = EvaluationService::new(
        state.generator.clone(),
        state.config.prompts.clone(),
        state.generation_timeout(),
    );
    let skill_level = evaluator.evaluate(&req.responses).await?;

    let applied = match req.apply_to_user.as_deref() {
        Some(username) => {
            let transition = service(&state)
                .propose_skill_level(username, skill_level)
                .await?;
            Some(transition.updated())
        }
        None => None,
    };

    Ok(Json(EvaluateSkillResponse {
        skill_level,
        applied,
    }))
}

/// POST /setuserskilllevel/{user}/{level}
pub async fn set_user_skill_level(
    State(state): State<Arc<AppState>>,
    Path((username, level)): Path<(String, String)>,
) -> Result<Json<SkillLevelResponse>, ApiError> {
    let proposed = level
        .parse::<SkillLevel>()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let transition = service(&state)
        .propose_skill_level(&username, proposed)
        .await?;

    Ok(Json(SkillLevelResponse {
        username,
        skill_level: transition.current,
        updated: Some(transition.updated()),
    }))
}

/// GET /getuserskilllevel/{user}
pub async fn get_user_skill_level(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<Json<SkillLevelResponse>, ApiError> {
    let skill_level = service(&state).skill_level(&username).await?;
    Ok(Json(SkillLevelResponse {
        username,
        skill_level,
        updated: None,
    }))
}

/// POST /awardbadge/{user}/{level}
pub async fn award_badge(
    State(state): State<Arc<AppState>>,
    Path((username, level)): Path<(String, String)>,
) -> Result<Json<BadgeAwardResponse>, ApiError> {
    let level = parse_level(&level)?;
    let award = service(&state).award_badge(&username, level).await?;

    Ok(Json(BadgeAwardResponse {
        username,
        level,
        newly_awarded: award.newly_awarded,
        awarded_at: award.badge.awarded_at,
    }))
}

/// GET /getbadges/{user}
pub async fn list_badges(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<Json<BadgeListResponse>, ApiError> {
    let badges = service(&state).badges(&username).await?;
    Ok(Json(BadgeListResponse { username, badges }))
}

/// GET /getbadge/{user}/{level}
pub async fn get_badge(
    State(state): State<Arc<AppState>>,
    Path((username, level)): Path<(String, String)>,
) -> Result<Json<BadgeStatusResponse>, ApiError> {
    let level = parse_level(&level)?;
    let awarded = service(&state).has_badge(&username, level).await?;
    Ok(Json(BadgeStatusResponse {
        username,
        level,
        awarded,
    }))
}

/// POST /saveLessonQuizScore/{user}/{level}/{score}
pub async fn save_lesson_quiz_score(
    State(state): State<Arc<AppState>>,
    Path((username, level, score)): Path<(String, String, String)>,
) -> Result<Json<LessonScoreUpdate>, ApiError> {
    let level = parse_level(&level)?;
    let score = score
        .parse::<i64>()
        .map_err(|_| ApiError::bad_request(format!("invalid score: {:?}", score)))?;

    let update = service(&state)
        .record_lesson_score(&username, level, score)
        .await?;
    Ok(Json(update))
}

/// GET /leaderboard/{level}?limit=N
pub async fn leaderboard(
    State(state): State<Arc<AppState>>,
    Path(level): Path<String>,
    query: Result<Query<LeaderboardQuery>, QueryRejection>,
) -> Result<Json<LeaderboardResponse>, ApiError> {
    let level = parse_level(&level)?;
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let entries = service(&state).leaderboard(level, query.limit).await?;
    Ok(Json(LeaderboardResponse { level, entries }))
}
