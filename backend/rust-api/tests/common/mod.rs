#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use mathtutor_api::{
    config::{Config, DatabaseBackend},
    create_router,
    models::{Account, SkillLevel},
    services::{
        document_extractor::{DocumentExtractor, ExtractionError},
        mock_generator::MockGenerator,
        AppState,
    },
    store::{AccountStore, MemoryStore},
};

pub const BOUNDARY: &str = "mathtutor-test-boundary";

/// Seeded accounts: `ada` (u-ada) and `bob` (u-bob).
pub const ADA: &str = "ada";
pub const BOB: &str = "bob";

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub generator: Arc<MockGenerator>,
}

/// Treats everything after the `%PDF-` magic as the document text.
pub struct StubExtractor;

#[async_trait]
impl DocumentExtractor for StubExtractor {
    async fn extract_text(&self, bytes: Vec<u8>) -> Result<String, ExtractionError> {
        let text = String::from_utf8_lossy(&bytes[5.min(bytes.len())..]).to_string();
        Ok(text)
    }
}

pub fn test_config() -> Config {
    Config {
        database_backend: DatabaseBackend::Memory,
        jwt_secret: "integration-test-secret".to_string(),
        bcrypt_cost: 4,
        ..Config::default()
    }
}

pub async fn create_test_app() -> TestApp {
    create_test_app_with(MockGenerator::new(), test_config()).await
}

pub async fn create_test_app_with(generator: MockGenerator, config: Config) -> TestApp {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let store = Arc::new(MemoryStore::new());
    for (id, username) in [("u-ada", ADA), ("u-bob", BOB)] {
        store
            .create_account(&Account {
                id: id.to_string(),
                username: username.to_string(),
                email: format!("{}@example.com", username),
                password_hash: "not-a-real-hash".to_string(),
                skill_level: SkillLevel::None,
                created_at: Utc::now(),
            })
            .await
            .expect("Failed to seed test account");
    }

    let generator = Arc::new(generator);
    let state = AppState::with_components(
        config,
        store.clone(),
        generator.clone(),
        Arc::new(StubExtractor),
    );

    TestApp {
        router: create_router(Arc::new(state)),
        store,
        generator,
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&body).to_string())
        })
    };
    (status, json)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(
        app,
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

pub async fn post_empty(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(
        app,
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(
        app,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

/// A fake PDF whose extracted text is `text`.
pub fn pdf_bytes(text: &str) -> Vec<u8> {
    let mut bytes = b"%PDF-".to_vec();
    bytes.extend_from_slice(text.as_bytes());
    bytes
}

/// multipart/form-data with a `file` part and an optional `message` part.
pub fn multipart_body(
    file_name: &str,
    content_type: &str,
    file: &[u8],
    message: Option<&str>,
) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
            BOUNDARY, file_name, content_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(file);
    body.extend_from_slice(b"\r\n");

    if let Some(message) = message {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"message\"\r\n\r\n{}\r\n",
                BOUNDARY, message
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub async fn upload(app: &Router, body: Vec<u8>) -> (StatusCode, Value) {
    send(
        app,
        Request::builder()
            .method("POST")
            .uri("/generatequiz")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap(),
    )
    .await
}
