use axum::http::StatusCode;
use serde_json::json;

use mathtutor_api::services::jwt::JwtService;

mod common;
use common::{create_test_app, post_json};

async fn register(
    app: &axum::Router,
    username: &str,
    email: &str,
) -> (StatusCode, serde_json::Value) {
    post_json(
        app,
        "/register",
        json!({
            "email": email,
            "username": username,
            "password": "pythagoras123",
        }),
    )
    .await
}

#[tokio::test]
async fn register_then_login() {
    let app = create_test_app().await;

    let (status, profile) = register(&app.router, "carol", "carol@example.com").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(profile["username"], "carol");
    assert_eq!(profile["skill_level"], "None");
    assert!(profile.get("password_hash").is_none());

    let (status, token) = post_json(
        &app.router,
        "/login",
        json!({ "username": "carol", "password": "pythagoras123" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(token["token_type"], "bearer");

    let jwt = JwtService::new("integration-test-secret", 30);
    let claims = jwt
        .validate(token["access_token"].as_str().unwrap())
        .unwrap();
    assert_eq!(claims.sub, "carol");
}

#[tokio::test]
async fn registered_user_can_use_progression_routes() {
    let app = create_test_app().await;
    register(&app.router, "carol", "carol@example.com").await;

    let (status, json) =
        common::post_empty(&app.router, "/setuserskilllevel/carol/Beginner").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["updated"], true);
}

#[tokio::test]
async fn duplicate_username_or_email_is_a_bad_request() {
    let app = create_test_app().await;

    // "ada" is seeded
    let (status, json) = register(&app.router, "ada", "new@example.com").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "username already exists");

    let (status, json) = register(&app.router, "newbie", "ada@example.com").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "email already exists");
}

#[tokio::test]
async fn invalid_registration_input_is_rejected() {
    let app = create_test_app().await;

    let (status, json) = post_json(
        &app.router,
        "/register",
        json!({ "email": "not-an-email", "username": "zz", "password": "short" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], 400);
}

#[tokio::test]
async fn bad_credentials_are_unauthorized() {
    let app = create_test_app().await;
    register(&app.router, "carol", "carol@example.com").await;

    for (username, password) in [("carol", "wrong-password"), ("nobody", "pythagoras123")] {
        let (status, json) = post_json(
            &app.router,
            "/login",
            json!({ "username": username, "password": password }),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["message"], "Incorrect username or password");
    }
}
