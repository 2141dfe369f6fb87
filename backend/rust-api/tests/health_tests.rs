use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use base64::{engine::general_purpose, Engine as _};
use serial_test::serial;

mod common;
use common::{create_test_app, get, send};

#[tokio::test]
async fn health_reports_store_status() {
    let app = create_test_app().await;

    let (status, json) = get(&app.router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "mathtutor-api");
    assert_eq!(json["dependencies"]["store"]["status"], "healthy");
}

#[tokio::test]
async fn responses_carry_a_trace_id() {
    let app = create_test_app().await;

    let response = tower::ServiceExt::oneshot(
        app.router.clone(),
        Request::builder()
            .uri("/health")
            .header("x-trace-id", "trace-from-client")
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();

    assert_eq!(
        response.headers().get("x-trace-id").unwrap(),
        "trace-from-client"
    );
}

fn metrics_request(credentials: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri("/metrics");
    if let Some(credentials) = credentials {
        builder = builder.header(
            header::AUTHORIZATION,
            format!("Basic {}", general_purpose::STANDARD.encode(credentials)),
        );
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
#[serial]
async fn metrics_require_basic_auth() {
    std::env::set_var("METRICS_AUTH", "scraper:s3cret");
    let app = create_test_app().await;

    // drive some traffic so the HTTP counters exist
    get(&app.router, "/health").await;

    let (status, _) = send(&app.router, metrics_request(None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app.router, metrics_request(Some("scraper:wrong"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app.router, metrics_request(Some("scraper:s3cret"))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_str().unwrap().contains("http_requests_total"));

    std::env::remove_var("METRICS_AUTH");
}
