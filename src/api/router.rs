use axum::{middleware, routing::get, Router};
use tower_http::trace::TraceLayer;

use super::data;
use super::health;
use super::middleware::{logging_middleware, metrics_middleware};
use super::state::AppState;

/// Create the full router with application state
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/live", get(health::live_check))
        .merge(data::create_data_router())
        .with_state(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::domain::cache::Cache;
    use crate::domain::record::{MockRecordRepository, RecordRepository};
    use crate::domain::DomainError;
    use crate::infrastructure::cache::InMemoryCache;
    use crate::infrastructure::executor::{ExecutorConfig, TaskExecutor};
    use crate::infrastructure::services::{
        DataProcessor, ProcessorConfig, FETCH_ERROR_MESSAGE, NOT_FOUND_MESSAGE,
    };
    use crate::infrastructure::storage::InMemoryRecordRepository;

    struct TestApp {
        router: Router,
        state: AppState,
    }

    fn test_app_with(executor: ExecutorConfig) -> TestApp {
        let repository: Arc<dyn RecordRepository> = Arc::new(InMemoryRecordRepository::new());
        let cache: Arc<dyn Cache> = Arc::new(InMemoryCache::new());
        let executor = Arc::new(TaskExecutor::new(executor).unwrap());
        let processor = DataProcessor::new(
            repository.clone(),
            cache.clone(),
            executor,
            ProcessorConfig::default().with_retry_delay(Duration::from_millis(1)),
        )
        .unwrap();

        let state = AppState::new(processor, repository, cache);
        TestApp {
            router: create_router(state.clone()),
            state,
        }
    }

    fn test_app() -> TestApp {
        test_app_with(ExecutorConfig::default())
    }

    async fn send(router: &Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, String) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = test_app();

        let (status, body) = send(&app.router, Method::GET, "/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("\"status\":\"healthy\""));
    }

    #[tokio::test]
    async fn test_live_endpoint() {
        let app = test_app();

        let (status, _) = send(&app.router, Method::GET, "/live", None).await;

        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_ready_endpoint() {
        let app = test_app();

        let (status, body) = send(&app.router, Method::GET, "/ready", None).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("\"store\""));
        assert!(body.contains("\"cache\""));
        assert!(body.contains("\"executor\""));
    }

    #[tokio::test]
    async fn test_ready_unavailable_after_shutdown() {
        let app = test_app();
        app.state.processor.shutdown().await;

        let (status, body) = send(&app.router, Method::GET, "/ready", None).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body.contains("\"status\":\"unhealthy\""));
    }

    #[tokio::test]
    async fn test_ready_pings_store_without_counting() {
        let app = test_app();

        let mut repository = MockRecordRepository::new();
        repository.expect_ping().times(1).returning(|| Ok(()));
        repository.expect_count().never();

        let state = AppState::new(
            app.state.processor.clone(),
            Arc::new(repository),
            app.state.cache.clone(),
        );

        let (status, _) = send(&create_router(state), Method::GET, "/ready", None).await;

        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_ready_unavailable_when_store_unreachable() {
        let app = test_app();

        let mut repository = MockRecordRepository::new();
        repository
            .expect_ping()
            .returning(|| Err(DomainError::storage("connection refused")));

        let state = AppState::new(
            app.state.processor.clone(),
            Arc::new(repository),
            app.state.cache.clone(),
        );

        let (status, body) = send(&create_router(state), Method::GET, "/ready", None).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_get_missing_key_returns_not_found_message() {
        let app = test_app();

        let (status, body) = send(&app.router, Method::GET, "/api/data?key=missing", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, NOT_FOUND_MESSAGE);
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let app = test_app();

        let (status, body) = send(
            &app.router,
            Method::POST,
            "/api/data",
            Some(r#"{"key":"k1","value":"v1"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Data created successfully.");

        app.state.processor.wait_idle().await;

        let (status, body) = send(&app.router, Method::GET, "/api/data?key=k1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "v1");
    }

    #[tokio::test]
    async fn test_create_accepts_entity_field_names() {
        let app = test_app();

        let (status, body) = send(
            &app.router,
            Method::POST,
            "/api/data",
            Some(r#"{"key1":"k1","value1":"v1"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Data created successfully.");

        app.state.processor.wait_idle().await;

        let (_, body) = send(&app.router, Method::GET, "/api/data?key=k1", None).await;
        assert_eq!(body, "v1");
    }

    #[tokio::test]
    async fn test_update_then_get() {
        let app = test_app();
        app.state.repository.save(crate::domain::Record::new("k1", "v1")).await.unwrap();

        let (status, body) =
            send(&app.router, Method::PUT, "/api/data?key=k1&value=v2", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Data updated successfully.");

        app.state.processor.wait_idle().await;

        let (_, body) = send(&app.router, Method::GET, "/api/data?key=k1", None).await;
        assert_eq!(body, "v2");
        assert_eq!(app.state.cache.get("k1").await.unwrap(), Some("v2".to_string()));
    }

    #[tokio::test]
    async fn test_delete_then_get() {
        let app = test_app();
        app.state.repository.save(crate::domain::Record::new("k1", "v1")).await.unwrap();
        app.state.cache.set("k1", "v1").await.unwrap();

        let (status, body) = send(&app.router, Method::DELETE, "/api/data?key=k1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Data deleted successfully.");

        app.state.processor.wait_idle().await;

        let (_, body) = send(&app.router, Method::GET, "/api/data?key=k1", None).await;
        assert_eq!(body, NOT_FOUND_MESSAGE);
        assert!(!app.state.cache.exists("k1").await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_key_is_bad_request() {
        let app = test_app();

        let (status, _) = send(&app.router, Method::GET, "/api/data?key=", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app.router,
            Method::POST,
            "/api/data",
            Some(r#"{"key":"","value":"v1"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_query_parameter_is_bad_request() {
        let app = test_app();

        let (status, _) = send(&app.router, Method::GET, "/api/data", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app.router, Method::PUT, "/api/data?key=k1", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let app = test_app();

        let (status, body) =
            send(&app.router, Method::POST, "/api/data", Some("{not json")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_ne!(body, FETCH_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_write_after_shutdown_is_service_unavailable() {
        let app = test_app();
        app.state.processor.shutdown().await;

        let (status, _) = send(&app.router, Method::DELETE, "/api/data?key=k1", None).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
