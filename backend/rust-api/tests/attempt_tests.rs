use axum::http::StatusCode;
use serde_json::{json, Value};

mod common;
use common::{create_test_app, get, post_json};

fn attempt(username: &str, score: i64) -> Value {
    json!({
        "username": username,
        "questions": [
            {"id": "q1", "question": "3 * 3", "options": ["6", "9"], "answer": "9"},
            {"id": "q2", "question": "10 / 2", "options": ["5", "2"], "answer": "5"}
        ],
        "answers": {"q1": "9", "q2": "2"},
        "score": score
    })
}

#[tokio::test]
async fn saved_attempts_can_be_listed_and_fetched() {
    let app = create_test_app().await;

    let (status, first) = post_json(&app.router, "/savequizattempt", attempt("ada", 50)).await;
    assert_eq!(status, StatusCode::CREATED);
    let first_id = first["id"].as_str().unwrap().to_string();

    let (status, second) = post_json(&app.router, "/savequizattempt", attempt("ada", 100)).await;
    assert_eq!(status, StatusCode::CREATED);
    let second_id = second["id"].as_str().unwrap().to_string();
    assert_ne!(first_id, second_id);

    let (status, json) = get(&app.router, &format!("/getquizattempt/{}", first_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["username"], "ada");
    assert_eq!(json["score"], 50);
    assert_eq!(json["answers"]["q2"], "2");
    assert_eq!(json["questions"].as_array().unwrap().len(), 2);

    let (status, json) = get(&app.router, "/getquizattempts/ada").await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![second_id.as_str(), first_id.as_str()]);

    let (_, json) = get(&app.router, "/getquizattempts/bob").await;
    assert!(json.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn missing_attempt_is_not_found() {
    let app = create_test_app().await;

    let (status, json) = get(&app.router, "/getquizattempt/does-not-exist").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["status"], 404);
}

#[tokio::test]
async fn attempts_for_unknown_user_are_rejected() {
    let app = create_test_app().await;

    let (status, _) = post_json(&app.router, "/savequizattempt", attempt("ghost", 10)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&app.router, "/getquizattempts/ghost").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_attempt_bodies_are_bad_requests() {
    let app = create_test_app().await;

    let (status, json) =
        post_json(&app.router, "/savequizattempt", json!({ "username": "ada" })).await;
    assert!(status.is_client_error());
    assert!(json["message"]
        .as_str()
        .unwrap()
        .starts_with("Failed to parse JSON request body"));

    let (status, _) = post_json(&app.router, "/savequizattempt", attempt("ada", -3)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
