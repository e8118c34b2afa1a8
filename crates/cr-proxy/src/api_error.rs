//! The proxy's error taxonomy, grounded in
//! `at-bridge::api_error::ApiError`'s `thiserror`-enum-plus-`IntoResponse`
//! pattern.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cr_api_types::{ErrorBody, ErrorDetail};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed JSON, missing `messages`, or an unknown `model` other than
    /// `auto`/a catalog id. No classification is attempted.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Every model in the fallback chain failed with a network error or
    /// timeout.
    #[error("upstream unreachable after trying {tried:?}")]
    UpstreamUnreachable { message: String, tried: Vec<String> },

    /// The fallback chain was exhausted against non-2xx HTTP responses; the
    /// last upstream's status/body are preserved.
    #[error("upstream error {status}")]
    UpstreamHttp { status: StatusCode, body: serde_json::Value },

    /// Upstream auth was refused even after a credential refresh.
    #[error("auth missing for provider {provider}")]
    AuthMissing { provider: String },

    /// Any other internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::InvalidRequest(message) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody {
                    error: ErrorDetail {
                        kind: "invalid_request".into(),
                        message,
                        provider: None,
                        tried_models: Vec::new(),
                    },
                }),
            )
                .into_response(),
            ApiError::UpstreamUnreachable { message, tried } => (
                StatusCode::BAD_GATEWAY,
                Json(ErrorBody {
                    error: ErrorDetail {
                        kind: "upstream_unreachable".into(),
                        message,
                        provider: None,
                        tried_models: tried,
                    },
                }),
            )
                .into_response(),
            ApiError::UpstreamHttp { status, body } => (status, Json(body)).into_response(),
            ApiError::AuthMissing { provider } => (
                StatusCode::UNAUTHORIZED,
                Json(ErrorBody {
                    error: ErrorDetail {
                        kind: "auth_missing".into(),
                        message: format!("no credential available for provider {provider}"),
                        provider: Some(provider),
                        tried_models: Vec::new(),
                    },
                }),
            )
                .into_response(),
            ApiError::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    error: ErrorDetail {
                        kind: "internal_error".into(),
                        message,
                        provider: None,
                        tried_models: Vec::new(),
                    },
                }),
            )
                .into_response(),
        }
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::UpstreamUnreachable { .. } => StatusCode::BAD_GATEWAY,
            ApiError::UpstreamHttp { status, .. } => *status,
            ApiError::AuthMissing { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn telemetry_kind(&self) -> &'static str {
        match self {
            ApiError::InvalidRequest(_) => "invalid_request",
            ApiError::UpstreamUnreachable { .. } => "upstream_unreachable",
            ApiError::UpstreamHttp { .. } => "upstream_http_error",
            ApiError::AuthMissing { .. } => "auth_missing",
            ApiError::Internal(_) => "internal_error",
        }
    }
}
