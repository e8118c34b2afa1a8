//! Proxy pipeline — the Axum app wiring every handler onto shared
//! `ApiState`, grounded in `at-bridge::http_api::build_router`'s
//! router-assembly shape (routes, then CORS/trace layers, then state).

pub mod api_error;
pub mod handlers;
pub mod pipeline;
pub mod state;
pub mod upstream;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router as AxumRouter;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use api_error::ApiError;
pub use state::ApiState;
pub use upstream::{provider_base_url, ReqwestUpstreamClient, UpstreamClient};

/// Assembles the full HTTP surface: the OpenAI-compatible proxy endpoint,
/// the health/stats/reload operational endpoints, and `/metrics`.
pub fn build_router(state: Arc<ApiState>) -> AxumRouter {
    AxumRouter::new()
        .route("/v1/chat/completions", post(handlers::chat_completions))
        .route("/v1/models", get(handlers::list_models))
        .route("/health", get(handlers::health))
        .route("/stats", get(handlers::stats))
        .route("/reload", post(handlers::reload))
        .route("/metrics", get(handlers::metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use cr_classifier::llm::MockProvider;
    use cr_classifier::{ClassificationCache, LlmClassifier, ScoringConfig};
    use cr_core::{default_catalog, EnvCredentialResolver};
    use cr_router::Router;
    use cr_telemetry::{MetricsCollector, TracingHooks};
    use state::Stats;
    use std::time::Instant;
    use tower::ServiceExt;
    use upstream::MockUpstream;

    fn app(upstream: MockUpstream) -> AxumRouter {
        let catalog = Arc::new(default_catalog());
        let state = Arc::new(ApiState {
            router: Arc::new(Router::new(
                Arc::new(ScoringConfig::default()),
                catalog.clone(),
                Arc::new(LlmClassifier::new(Arc::new(MockProvider::new()), Arc::new(ClassificationCache::new()), "gemini-2.5-flash")),
            )),
            catalog,
            cache: Arc::new(ClassificationCache::new()),
            credentials: Arc::new(EnvCredentialResolver::new()),
            hooks: Arc::new(TracingHooks),
            metrics: Arc::new(MetricsCollector::new()),
            upstream: Arc::new(upstream),
            stats: Arc::new(Stats::new()),
            wallet_key: "wallet-test".into(),
            started_at: Instant::now(),
        });
        build_router(state)
    }

    #[tokio::test]
    async fn health_endpoint_reports_ok() {
        let response = app(MockUpstream::new())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn reload_returns_no_content() {
        let response = app(MockUpstream::new())
            .oneshot(Request::builder().method("POST").uri("/reload").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn chat_completions_sets_decision_header_on_success() {
        let upstream = MockUpstream::new().with_response(axum::http::StatusCode::OK, &br#"{"id":"1"}"#[..]);
        let body = serde_json::json!({
            "model": "auto",
            "messages": [{"role": "user", "content": "Hello"}],
        });
        let response = app(upstream)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/chat/completions")
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(&body).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-clawrouter-decision"));
    }

    #[tokio::test]
    async fn chat_completions_rejects_empty_messages() {
        let body = serde_json::json!({"model": "auto", "messages": []});
        let response = app(MockUpstream::new())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/chat/completions")
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(&body).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
