use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter_vec, Encoder, Histogram,
    HistogramVec, IntCounterVec, TextEncoder,
};

lazy_static! {
    // HTTP
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

    // Storage
    pub static ref REPOSITORY_OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "repository_operations_total",
        "Total number of repository operations",
        &["operation", "status"]
    )
    .unwrap();

    pub static ref REPOSITORY_OPERATION_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "repository_operation_duration_seconds",
        "Repository operation duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .unwrap();

    // Learning
    pub static ref ATTEMPTS_SCORED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "attempts_scored_total",
        "Total number of practice attempts scored",
        &["verdict"]
    )
    .unwrap();

    pub static ref SESSIONS_FINISHED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "sessions_finished_total",
        "Total number of sessions finished",
        &["status"]
    )
    .unwrap();

    pub static ref LEVEL_TEST_SUBMISSIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "level_test_submissions_total",
        "Total number of level test submissions",
        &["outcome"]
    )
    .unwrap();

    pub static ref RECOMMENDED_LEVEL: Histogram = register_histogram!(
        "level_test_recommended_level",
        "Recommended level produced by level test evaluation",
        vec![1.0, 2.0, 3.0, 4.0, 5.0]
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

/// Time a repository call and count it by outcome.
pub async fn track_repository_operation<F, T>(operation: &str, future: F) -> anyhow::Result<T>
where
    F: std::future::Future<Output = anyhow::Result<T>>,
{
    let start = std::time::Instant::now();
    let result = future.await;
    let duration = start.elapsed().as_secs_f64();

    let status = if result.is_ok() { "success" } else { "error" };

    REPOSITORY_OPERATIONS_TOTAL
        .with_label_values(&[operation, status])
        .inc();

    REPOSITORY_OPERATION_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(duration);

    result
}

pub fn record_level_test_outcome(outcome: &str) {
    LEVEL_TEST_SUBMISSIONS_TOTAL
        .with_label_values(&[outcome])
        .inc();
}
