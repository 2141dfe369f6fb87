use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Database Metrics (MongoDB)
    pub static ref DB_OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "db_operations_total",
        "Total number of database operations",
        &["operation", "collection", "status"]
    )
    .unwrap();

    pub static ref DB_OPERATION_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "db_operation_duration_seconds",
        "Database operation duration in seconds",
        &["operation", "collection"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .unwrap();

    // Generative backend
    pub static ref GENERATION_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "generation_requests_total",
        "Total number of generative backend calls",
        &["task", "status"]
    )
    .unwrap();

    pub static ref GENERATION_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "generation_duration_seconds",
        "Generative backend call duration in seconds",
        &["task"],
        vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0]
    )
    .unwrap();

    // Business Metrics
    pub static ref DOCUMENTS_CLASSIFIED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "documents_classified_total",
        "Uploaded documents by classification result",
        &["result"]
    )
    .unwrap();

    pub static ref QUIZZES_GENERATED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quizzes_generated_total",
        "Quiz synthesis attempts",
        &["status"]
    )
    .unwrap();

    pub static ref SKILL_EVALUATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "skill_evaluations_total",
        "Skill evaluations by resulting level",
        &["level"]
    )
    .unwrap();

    pub static ref SKILL_RATCHET_TOTAL: IntCounterVec = register_int_counter_vec!(
        "skill_ratchet_total",
        "Skill level proposals by outcome",
        &["outcome"]
    )
    .unwrap();

    pub static ref LESSON_SCORES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "lesson_scores_total",
        "Lesson score submissions",
        &["level", "outcome"]
    )
    .unwrap();

    pub static ref BADGES_AWARDED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "badges_awarded_total",
        "Badge award requests",
        &["level", "result"]
    )
    .unwrap();

    pub static ref QUIZ_ATTEMPTS_RECORDED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quiz_attempts_recorded_total",
        "Quiz attempts appended to the ledger",
        &["status"]
    )
    .unwrap();
}

/// Renders all metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}

/// Helper: track database operation with metrics
pub async fn track_db_operation<F, T, E>(
    operation: &str,
    collection: &str,
    future: F,
) -> Result<T, E>
where
    F: std::future::Future<Output = Result<T, E>>,
{
    let start = std::time::Instant::now();
    let result = future.await;
    let duration = start.elapsed().as_secs_f64();

    let status = if result.is_ok() { "success" } else { "error" };

    DB_OPERATIONS_TOTAL
        .with_label_values(&[operation, collection, status])
        .inc();

    DB_OPERATION_DURATION_SECONDS
        .with_label_values(&[operation, collection])
        .observe(duration);

    result
}

/// Record one generative backend call. `status` is `success`, `error` or `timeout`.
pub fn record_generation(task: &str, status: &str, elapsed: std::time::Duration) {
    GENERATION_REQUESTS_TOTAL
        .with_label_values(&[task, status])
        .inc();
    GENERATION_DURATION_SECONDS
        .with_label_values(&[task])
        .observe(elapsed.as_secs_f64());
}
