//! Request/response logging middleware

use std::time::Instant;

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use tracing::{info, warn};

use super::extract_path;

/// Query strings carry stored values, so they are cut before logging
const MAX_LOGGED_QUERY_LEN: usize = 128;

/// Logs every request and its completion.
/// Note: `TraceLayer` already opens the request span, this only adds events.
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = extract_path(&request);
    let query = request
        .uri()
        .query()
        .map(|q| truncate_for_log(q, MAX_LOGGED_QUERY_LEN))
        .unwrap_or_default();
    let request_id = extract_request_id(&request);

    info!(
        method = %method,
        path = %path,
        query = %query,
        request_id = %request_id,
        "Incoming request"
    );

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    if status.is_server_error() {
        warn!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            request_id = %request_id,
            "Request failed"
        );
    } else {
        info!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            request_id = %request_id,
            "Request completed"
        );
    }

    response
}

fn extract_request_id(request: &Request<Body>) -> String {
    request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Truncate long strings for logging
pub fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }

    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }

    format!("{}...[truncated {} chars]", &s[..end], s.len() - end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log() {
        let short = "hello";
        assert_eq!(truncate_for_log(short, 10), "hello");

        let long = "key=k1&value=a very long stored value";
        let truncated = truncate_for_log(long, 10);
        assert!(truncated.starts_with("key=k1&val"));
        assert!(truncated.contains("[truncated"));
    }

    #[test]
    fn test_truncate_for_log_exact_length() {
        let s = "exactly10!";
        assert_eq!(truncate_for_log(s, 10), "exactly10!");
    }

    #[test]
    fn test_truncate_for_log_char_boundary() {
        let s = "ééééé";
        let truncated = truncate_for_log(s, 3);
        assert!(truncated.starts_with("é..."));
    }

    #[test]
    fn test_request_id_fallback() {
        let request = Request::builder().uri("/api/data").body(Body::empty()).unwrap();
        assert_eq!(extract_request_id(&request), "-");

        let request = Request::builder()
            .uri("/api/data")
            .header("x-request-id", "abc")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_request_id(&request), "abc");
    }
}
