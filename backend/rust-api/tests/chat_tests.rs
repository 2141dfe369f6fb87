use axum::http::StatusCode;
use serde_json::json;

use mathtutor_api::services::{generative::GenerativeError, mock_generator::MockGenerator};

mod common;
use common::{create_test_app_with, get, post_json, test_config};

#[tokio::test]
async fn chat_reply_is_returned_and_logged() {
    let generator = MockGenerator::new().on("x + 1 = 4", "x = 3");
    let app = create_test_app_with(generator, test_config()).await;

    let (status, json) = post_json(
        &app.router,
        "/chat",
        json!({ "username": "ada", "prompt": "Solve x + 1 = 4" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["response"], "x = 3");

    let request = app.generator.last_request().unwrap();
    assert_eq!(request.task, "chat");
    assert!(request.system_instruction.contains("math tutor"));

    post_json(
        &app.router,
        "/chat",
        json!({ "username": "ada", "prompt": "What is a prime?" }),
    )
    .await;

    let (status, logs) = get(&app.router, "/getchatlogs/ada").await;
    assert_eq!(status, StatusCode::OK);
    let logs = logs.as_array().unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0]["prompt"], "What is a prime?");
    assert_eq!(logs[1]["response"], "x = 3");
}

#[tokio::test]
async fn failed_chat_is_not_logged() {
    let generator = MockGenerator::failing(GenerativeError::Network("connection reset".into()));
    let app = create_test_app_with(generator, test_config()).await;

    let (status, json) = post_json(
        &app.router,
        "/chat",
        json!({ "username": "ada", "prompt": "Solve 2x = 8" }),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!json["message"].as_str().unwrap().contains("connection reset"));

    let (_, logs) = get(&app.router, "/getchatlogs/ada").await;
    assert!(logs.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn chat_input_is_validated() {
    let app = create_test_app_with(MockGenerator::with_fixed_response("ok"), test_config()).await;

    let (status, _) =
        post_json(&app.router, "/chat", json!({ "username": "ada", "prompt": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) =
        post_json(&app.router, "/chat", json!({ "username": "ghost", "prompt": "1 + 1?" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&app.router, "/getchatlogs/ghost").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.generator.call_count(), 0);
}
