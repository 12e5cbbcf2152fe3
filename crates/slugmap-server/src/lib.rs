//! HTTP server for slugmap.
//!
//! Exposes the mapping service as a small JSON API:
//! `POST /api/get-id`, `GET /api/get-slug/:identifier`, and
//! `GET /api/health`, with permissive CORS and per-request tracing.

pub mod api;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use api::{ErrorBody, GetIdRequest, GetIdResponse, HealthResponse};
pub use config::ServerConfig;
pub use error::{ApiError, ServerError, ServerResult};
pub use handler::AppState;
pub use server::SlugmapServer;

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use slugmap_service::{ConnectionConfig, MappingService};
    use slugmap_store::{MappingStore, StoreConnector, StoreError, StoreResult};
    use tower::util::ServiceExt;

    struct RefusingConnector;

    #[async_trait]
    impl StoreConnector for RefusingConnector {
        async fn connect(&self) -> StoreResult<Arc<dyn MappingStore>> {
            Err(StoreError::Unavailable("connection refused".into()))
        }

        fn target(&self) -> String {
            "refusing".into()
        }
    }

    struct HangingConnector;

    #[async_trait]
    impl StoreConnector for HangingConnector {
        async fn connect(&self) -> StoreResult<Arc<dyn MappingStore>> {
            std::future::pending().await
        }

        fn target(&self) -> String {
            "hanging".into()
        }
    }

    fn memory_config() -> ServerConfig {
        ServerConfig {
            database_url: "memory:".into(),
            ..ServerConfig::default()
        }
    }

    fn memory_app() -> Router {
        SlugmapServer::new(memory_config()).unwrap().router()
    }

    fn refusing_app() -> Router {
        let config = ConnectionConfig {
            connect_timeout: Duration::from_millis(200),
            operation_timeout: Duration::from_millis(200),
        };
        let service = MappingService::with_connector(Arc::new(RefusingConnector), config);
        SlugmapServer::with_service(ServerConfig::default(), service).router()
    }

    /// Store timeouts longer than the request budget, so the request
    /// budget is what expires.
    fn hanging_app() -> Router {
        let config = ConnectionConfig {
            connect_timeout: Duration::from_secs(5),
            operation_timeout: Duration::from_secs(5),
        };
        let service = MappingService::with_connector(Arc::new(HangingConnector), config);
        let server_config = ServerConfig {
            request_timeout_ms: 100,
            ..memory_config()
        };
        SlugmapServer::with_service(server_config, service).router()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn get_id(app: &Router, slug: &str, kind: &str) -> String {
        let body = json!({"slug": slug, "type": kind}).to_string();
        let (status, body) = send(app, post_json("/api/get-id", &body)).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["uuid"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let (status, body) = send(&memory_app(), get("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "OK", "database": "Connected"}));
    }

    #[tokio::test]
    async fn info_endpoint() {
        let (status, body) = send(&memory_app(), get("/api/info")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "slugmap-server");
        assert_eq!(body["store"], "memory:");
    }

    #[tokio::test]
    async fn get_id_is_stable_per_key() {
        let app = memory_app();
        let first = get_id(&app, "one-piece", "manga").await;
        let again = get_id(&app, "one-piece", "manga").await;
        let other_kind = get_id(&app, "one-piece", "anime").await;

        assert_eq!(first.len(), 36);
        assert_eq!(first, again);
        assert_ne!(first, other_kind);
    }

    #[tokio::test]
    async fn get_slug_resolves_issued_identifier() {
        let app = memory_app();
        let id = get_id(&app, "berserk", "manga").await;

        let (status, body) = send(&app, get(&format!("/api/get-slug/{id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"identifier": id, "slug": "berserk", "type": "manga"})
        );
    }

    #[tokio::test]
    async fn get_slug_unknown_is_404() {
        let app = memory_app();
        let (status, body) = send(
            &app,
            get("/api/get-slug/00000000-0000-4000-8000-000000000000"),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("no mapping"));

        let (status, _) = send(&app, get("/api/get-slug/not-an-id")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn get_id_rejects_missing_or_empty_fields() {
        let app = memory_app();
        for body in [
            r#"{"slug": "berserk"}"#,
            r#"{"type": "manga"}"#,
            r#"{"slug": "", "type": "manga"}"#,
            r#"{"slug": "berserk", "type": ""}"#,
            r#"{}"#,
        ] {
            let (status, response) = send(&app, post_json("/api/get-id", body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
            assert!(response["error"].is_string(), "{body}");
        }
    }

    #[tokio::test]
    async fn get_id_rejects_malformed_body() {
        let app = memory_app();
        let (status, body) = send(&app, post_json("/api/get-id", "{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/get-id")
            .body(Body::from(r#"{"slug":"a","type":"b"}"#))
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unreachable_store_is_500() {
        let app = refusing_app();

        let (status, body) = send(&app, get("/api/health")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({"status": "Error", "message": "connection refused"})
        );

        let (status, body) = send(
            &app,
            post_json("/api/get-id", r#"{"slug":"berserk","type":"manga"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "connection refused"}));

        let (status, _) = send(
            &app,
            get("/api/get-slug/00000000-0000-4000-8000-000000000000"),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn slow_store_times_out_as_json_500() {
        let app = hanging_app();

        let (status, body) = send(
            &app,
            post_json("/api/get-id", r#"{"slug":"berserk","type":"manga"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "request timed out after 100ms"}));

        let (status, body) = send(
            &app,
            get("/api/get-slug/00000000-0000-4000-8000-000000000000"),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].is_string());

        let (status, body) = send(&app, get("/api/health")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({"status": "Error", "message": "request timed out after 100ms"})
        );
    }

    #[tokio::test]
    async fn validation_does_not_need_the_store() {
        let (status, _) = send(
            &refusing_app(),
            post_json("/api/get-id", r#"{"slug":"","type":"manga"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn cors_allows_any_origin() {
        let request = Request::builder()
            .uri("/api/health")
            .header(header::ORIGIN, "https://reader.example")
            .body(Body::empty())
            .unwrap();
        let response = memory_app().oneshot(request).await.unwrap();
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn file_store_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            database_url: format!("file:{}", dir.path().join("mappings.log").display()),
            ..ServerConfig::default()
        };
        assert_eq!(config.log_sync, slugmap_store::SyncMode::EveryWrite);

        let id = {
            let app = SlugmapServer::new(config.clone()).unwrap().router();
            get_id(&app, "vagabond", "manga").await
        };

        let app = SlugmapServer::new(config).unwrap().router();
        assert_eq!(get_id(&app, "vagabond", "manga").await, id);
    }
}
