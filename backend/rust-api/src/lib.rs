use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;
pub mod store;
pub mod telemetry;
pub mod utils;

pub use config::Config;
pub use services::AppState;

const ALLOWED_ORIGINS: [&str; 3] = [
    "http://localhost:3000",
    "http://localhost:8080",
    "http://localhost",
];

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .allow_origin(ALLOWED_ORIGINS.map(HeaderValue::from_static));

    let upload_limit = app_state.config.upload_max_bytes;

    Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/metrics",
            get(handlers::metrics_handler)
                .layer(middleware::from_fn(handlers::metrics_auth_middleware)),
        )
        .merge(account_routes())
        .merge(quiz_routes().layer(DefaultBodyLimit::max(upload_limit)))
        .merge(progression_routes())
        .with_state(app_state)
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(middleware::from_fn(
            middlewares::trace::trace_context_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

fn account_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/chat", post(handlers::chat::chat))
        .route("/getchatlogs/{user}", get(handlers::chat::chat_logs))
}

fn quiz_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/generatequiz", post(handlers::quiz::generate_quiz))
        .route(
            "/savequizattempt",
            post(handlers::attempts::save_quiz_attempt),
        )
        .route(
            "/getquizattempts/{user}",
            get(handlers::attempts::list_quiz_attempts),
        )
        .route(
            "/getquizattempt/{id}",
            get(handlers::attempts::get_quiz_attempt),
        )
}

fn progression_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/evaluate-skill",
            post(handlers::progression::evaluate_skill),
        )
        .route(
            "/setuserskilllevel/{user}/{level}",
            post(handlers::progression::set_user_skill_level),
        )
        .route(
            "/getuserskilllevel/{user}",
            get(handlers::progression::get_user_skill_level),
        )
        .route(
            "/awardbadge/{user}/{level}",
            post(handlers::progression::award_badge),
        )
        .route("/getbadges/{user}", get(handlers::progression::list_badges))
        .route(
            "/getbadge/{user}/{level}",
            get(handlers::progression::get_badge),
        )
        .route(
            "/saveLessonQuizScore/{user}/{level}/{score}",
            post(handlers::progression::save_lesson_quiz_score),
        )
        .route(
            "/leaderboard/{level}",
            get(handlers::progression::leaderboard),
        )
}
