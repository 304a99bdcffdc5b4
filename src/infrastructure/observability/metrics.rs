//! Prometheus metrics infrastructure

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use super::config::MetricsConfig;

/// Prometheus metrics handle for serving metrics endpoint
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
    path: String,
}

impl PrometheusMetrics {
    /// Get the metrics as a string for the /metrics endpoint
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Initialize Prometheus metrics
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            gauge!("kv_cache_service_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);

            tracing::info!("Prometheus metrics initialized at {}", config.path);

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
                path: config.path.clone(),
            })
        }
        Err(e) => {
            tracing::error!("Failed to initialize Prometheus metrics: {}", e);
            None
        }
    }
}

/// Create the metrics router
pub fn create_metrics_router(metrics: PrometheusMetrics) -> Router {
    let path = metrics.path.clone();
    Router::new()
        .route(&path, get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<PrometheusMetrics>) -> impl IntoResponse {
    metrics.render()
}

/// Record an HTTP request metric
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("path", truncate_path(path)),
        ("status", status.to_string()),
    ];

    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());

    if status >= 500 {
        counter!("http_server_errors_total", &labels).increment(1);
    }
}

/// How a read was served
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    Hit,
    Miss,
    NotFound,
    Error,
}

impl ReadOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Miss => "miss",
            Self::NotFound => "not_found",
            Self::Error => "error",
        }
    }
}

/// Record the latency of a cache-aside read
pub fn record_process_duration(outcome: ReadOutcome, duration: Duration) {
    let labels = [("outcome", outcome.as_str())];

    counter!("data_process_total", &labels).increment(1);
    histogram!("data_process_duration_seconds", &labels).record(duration.as_secs_f64());
}

/// Record how long scheduling an update or delete took
///
/// `operation` is `update` or `delete`; the duration covers submission only,
/// not the deferred work.
pub fn record_mutation_scheduled(operation: &'static str, scheduled: bool, duration: Duration) {
    let labels = [
        ("operation", operation),
        ("status", if scheduled { "scheduled" } else { "rejected" }),
    ];

    histogram!(format!("data_{}_duration_seconds", operation), &labels)
        .record(duration.as_secs_f64());

    if !scheduled {
        counter!("data_mutation_rejected_total", "operation" => operation).increment(1);
    }
}

/// Record the result of a deferred update or delete
pub fn record_mutation_applied(operation: &'static str, success: bool) {
    let labels = [
        ("operation", operation),
        ("status", if success { "applied" } else { "failed" }),
    ];

    counter!("data_mutation_total", &labels).increment(1);
}

fn truncate_path(path: &str) -> String {
    path.chars().take(50).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_path_short() {
        assert_eq!(truncate_path("/api/data"), "/api/data");
    }

    #[test]
    fn test_truncate_path_long() {
        let path = "/very/long/path/that/exceeds/the/maximum/allowed/length/for/metrics";
        assert_eq!(truncate_path(path).len(), 50);
    }

    #[test]
    fn test_read_outcome_labels() {
        assert_eq!(ReadOutcome::Hit.as_str(), "hit");
        assert_eq!(ReadOutcome::Miss.as_str(), "miss");
        assert_eq!(ReadOutcome::NotFound.as_str(), "not_found");
        assert_eq!(ReadOutcome::Error.as_str(), "error");
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_process_duration(ReadOutcome::Hit, Duration::from_millis(1));
        record_mutation_scheduled("update", true, Duration::from_millis(1));
        record_mutation_applied("delete", false);
        record_http_request("GET", "/api/data", 200, Duration::from_millis(1));
    }
}
