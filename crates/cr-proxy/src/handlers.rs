//! HTTP handlers for the proxy's operational endpoints plus the
//! OpenAI-compatible completion route, grounded in `at-bridge::http_api::handlers`'s
//! thin-handler-delegates-to-a-capability style: every handler here does
//! extraction and status mapping only, all real work lives in `pipeline` or
//! the library crates.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use cr_api_types::{ChatCompletionRequest, HealthResponse, ModelListEntry, ModelListResponse, RoutingDecision};
use cr_telemetry::TelemetryError;

use crate::api_error::ApiError;
use crate::pipeline;
use crate::state::ApiState;

const DECISION_HEADER: &str = "x-clawrouter-decision";

pub async fn health(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        wallet: state.wallet_key.clone(),
        uptime_seconds: state.uptime_seconds(),
    })
}

pub async fn stats(State(state): State<Arc<ApiState>>) -> Json<cr_api_types::StatsResponse> {
    Json(state.stats.snapshot().await)
}

pub async fn list_models(State(state): State<Arc<ApiState>>) -> Json<ModelListResponse> {
    let mut data: Vec<ModelListEntry> = state
        .catalog
        .all()
        .map(|entry| ModelListEntry { id: entry.id.clone(), object: "model", owned_by: entry.provider.clone() })
        .collect();
    data.push(ModelListEntry { id: "auto".into(), object: "model", owned_by: "clawrouter".into() });
    Json(ModelListResponse { object: "list", data })
}

/// Drops cached classification results and any cached credential state.
/// Returns 204 with no body.
pub async fn reload(State(state): State<Arc<ApiState>>) -> StatusCode {
    state.cache.invalidate().await;
    state.credentials.invalidate();
    StatusCode::NO_CONTENT
}

pub async fn metrics(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    ([("content-type", "text/plain; version=0.0.4")], state.metrics.export_prometheus())
}

/// `POST /v1/chat/completions`. Validates the body, runs the Router (unless
/// `model` already names a concrete catalog id), forwards through the
/// fallback chain, and streams or buffers the upstream response back with
/// the `X-ClawRouter-Decision` header attached.
pub async fn chat_completions(State(state): State<Arc<ApiState>>, body: axum::body::Bytes) -> Response {
    let start = Instant::now();
    let outcome = handle_chat(&state, &body).await;

    let status: u16 = match &outcome {
        Ok(response) => response.status().as_u16(),
        Err(err) => err.status_code().as_u16(),
    };
    tokio::spawn({
        let metrics = Arc::clone(&state.metrics);
        async move {
            cr_telemetry::record_request(&metrics, "POST", "/v1/chat/completions", status, start).await;
        }
    });

    match outcome {
        Ok(response) => response,
        Err(err) => {
            state.hooks.on_error(&TelemetryError { kind: err.telemetry_kind().to_string(), message: err.to_string() });
            err.into_response()
        }
    }
}

async fn handle_chat(state: &Arc<ApiState>, raw_body: &[u8]) -> Result<Response, ApiError> {
    let request: ChatCompletionRequest =
        serde_json::from_slice(raw_body).map_err(|e| ApiError::InvalidRequest(format!("malformed JSON body: {e}")))?;

    if request.messages.is_empty() {
        return Err(ApiError::InvalidRequest("messages must not be empty".into()));
    }

    let decision = resolve_decision(state, &request).await?;
    state.hooks.on_routed(&decision);

    let decision_header = decision_header_value(&decision);
    let (model, upstream_response) = pipeline::forward(state, &request, &decision).await?;

    let status = StatusCode::from_u16(upstream_response.status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = if request.stream.unwrap_or(false) { "text/event-stream" } else { "application/json" };
    let body = pipeline::into_axum_body(Arc::clone(state), model, decision, upstream_response);

    Response::builder()
        .status(status)
        .header("content-type", content_type)
        .header(DECISION_HEADER, decision_header)
        .body(body)
        .map_err(|e| ApiError::Internal(e.to_string()))
}

fn decision_header_value(decision: &RoutingDecision) -> HeaderValue {
    let json = serde_json::to_string(decision).unwrap_or_else(|_| "{}".to_string());
    HeaderValue::from_str(&json).unwrap_or_else(|_| HeaderValue::from_static("{}"))
}

/// `model == "auto"` runs the full Router; a concrete catalog id bypasses
/// classification entirely and pins the fallback chain to that one model.
/// This bypass path is a design decision recorded in DESIGN.md.
async fn resolve_decision(state: &ApiState, request: &ChatCompletionRequest) -> Result<RoutingDecision, ApiError> {
    if request.model == "auto" {
        return Ok(state.router.route(request).await);
    }

    let entry = state
        .catalog
        .by_id(&request.model)
        .ok_or_else(|| ApiError::InvalidRequest(format!("unknown model '{}': must be 'auto' or a catalog id", request.model)))?;

    let tier = entry.tier;
    let estimated_tokens = cr_classifier::estimate_tokens(&format!("{}{}", request.user_text(), request.system_prompt()));
    let selected = cr_router::select(tier, estimated_tokens, request.max_tokens, &state.catalog);
    Ok(RoutingDecision {
        model: entry.id.clone(),
        tier,
        confidence: 1.0,
        method: cr_api_types::RoutingMethod::Fastpath,
        reasoning: format!("explicit model selection: {}", entry.id),
        cost_estimate: selected.cost_estimate,
        baseline_cost: selected.baseline_cost,
        savings: selected.savings,
        fallback_chain: vec![entry.id.clone()],
    })
}
