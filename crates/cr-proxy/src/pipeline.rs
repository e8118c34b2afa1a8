//! The forwarding half of the proxy pipeline: fallback chain traversal
//! bounded at 3 total upstream attempts, auth-refresh-then-fail policy, and
//! SSE passthrough without buffering.
//!
//! Grounded in `at-bridge::terminal_ws`'s streaming-without-buffering idiom
//! (a coupled pair of byte pipelines with shared cancellation), adapted from
//! WebSocket framing to a plain SSE byte stream forwarded through Axum's
//! `Body::from_stream`.

use std::sync::Arc;

use axum::body::{Body, Bytes};
use cr_api_types::{ChatCompletionRequest, ModelEntry, RoutingDecision};
use futures_util::StreamExt;

use crate::api_error::ApiError;
use crate::state::ApiState;
use crate::upstream::{provider_base_url, UpstreamBody, UpstreamError, UpstreamRequest, UpstreamResponse};

/// At most this many total upstream attempts per request (primary + 2
/// fallbacks), regardless of how long the tier's fallback chain is.
const MAX_ATTEMPTS: usize = 3;

struct Attempt {
    entry: ModelEntry,
}

/// Walk the decision's fallback chain, capped at `MAX_ATTEMPTS`, retrying
/// once on a 401 with a freshly-resolved credential before giving up.
pub async fn forward(
    state: &ApiState,
    request: &ChatCompletionRequest,
    decision: &RoutingDecision,
) -> Result<(String, UpstreamResponse), ApiError> {
    let stream = request.stream.unwrap_or(false);
    let attempts: Vec<Attempt> = decision
        .fallback_chain
        .iter()
        .take(MAX_ATTEMPTS)
        .filter_map(|id| state.catalog.by_id(id).cloned().map(|entry| Attempt { entry }))
        .collect();

    let mut tried = Vec::new();
    let mut last_error: Option<ApiError> = None;

    for attempt in &attempts {
        tried.push(attempt.entry.id.clone());
        let body = request.with_model(&attempt.entry.id);
        let body_json = serde_json::to_value(&body).map_err(|e| ApiError::Internal(e.to_string()))?;
        let base_url = provider_base_url(&attempt.entry.provider);

        match try_once(state, &attempt.entry.provider, base_url, &body_json, stream).await {
            Ok(response) if response.is_success() => return Ok((attempt.entry.id.clone(), response)),
            Ok(response) if response.status.as_u16() == 401 => {
                state.credentials.invalidate();
                match try_once(state, &attempt.entry.provider, base_url, &body_json, stream).await {
                    Ok(retry) if retry.is_success() => return Ok((attempt.entry.id.clone(), retry)),
                    _ => return Err(ApiError::AuthMissing { provider: attempt.entry.provider.clone() }),
                }
            }
            Ok(response) => {
                let status = response.status;
                let body_value = buffered_to_json(response).await;
                last_error = Some(ApiError::UpstreamHttp { status, body: body_value });
            }
            Err(err) => {
                last_error = Some(ApiError::UpstreamUnreachable { message: err.to_string(), tried: tried.clone() });
            }
        }
    }

    Err(last_error.unwrap_or(ApiError::UpstreamUnreachable {
        message: "no models configured for tier".to_string(),
        tried,
    }))
}

async fn try_once(
    state: &ApiState,
    provider: &str,
    base_url: &str,
    body: &serde_json::Value,
    stream: bool,
) -> Result<UpstreamResponse, UpstreamError> {
    let credential = state.credentials.resolve(provider);
    state
        .upstream
        .send(UpstreamRequest { base_url, api_key: credential.as_deref(), body: body.clone(), stream })
        .await
}

async fn buffered_to_json(response: UpstreamResponse) -> serde_json::Value {
    match response.body {
        UpstreamBody::Buffered(bytes) => serde_json::from_slice(&bytes).unwrap_or(serde_json::json!({
            "error": { "type": "upstream_http_error", "message": "non-JSON upstream error body" }
        })),
        UpstreamBody::Stream(_) => serde_json::json!({
            "error": { "type": "upstream_http_error", "message": "upstream returned an error mid-stream" }
        }),
    }
}

/// Convert a successful `UpstreamResponse` into an Axum response body,
/// recording completion telemetry once the body is fully flushed (buffered
/// case) or once the stream drains (streaming case). Cancellation (the
/// client dropping the connection) simply stops polling the stream, so the
/// trailing telemetry future never runs — no `completed` event on abort.
pub fn into_axum_body(
    state: Arc<ApiState>,
    model: String,
    decision: RoutingDecision,
    response: UpstreamResponse,
) -> Body {
    match response.body {
        UpstreamBody::Buffered(bytes) => {
            tokio::spawn(record_completion(state, model, decision, Some(bytes.clone())));
            Body::from(bytes)
        }
        UpstreamBody::Stream(inner) => {
            let trailer = futures_util::stream::once(async move {
                record_completion(state, model, decision, None).await;
                Ok::<Bytes, UpstreamError>(Bytes::new())
            });
            Body::from_stream(inner.chain(trailer))
        }
    }
}

async fn record_completion(state: Arc<ApiState>, model: String, decision: RoutingDecision, body: Option<Bytes>) {
    state.stats.record(decision.tier.as_str(), &model, decision.savings).await;

    let usage = body.and_then(|bytes| parse_token_usage(&bytes));
    let actual_cost_usd = usage.and_then(|(input, output)| {
        state.catalog.by_id(&model).map(|entry| entry.calculate_cost(input, output))
    });
    state.hooks.on_usage(&cr_telemetry::UsageRecord {
        model,
        tier: decision.tier,
        input_tokens: usage.map(|(input, _)| input),
        output_tokens: usage.map(|(_, output)| output),
        actual_cost_usd,
    });
}

/// Pulls final token counts out of an OpenAI-style `usage` block
/// (`prompt_tokens`/`completion_tokens`), falling back to the
/// Anthropic-style names (`input_tokens`/`output_tokens`) some providers
/// return through the shared gateway path. `None` if neither shape is
/// present — not every upstream exposes usage on every response.
fn parse_token_usage(bytes: &[u8]) -> Option<(u64, u64)> {
    let value: serde_json::Value = serde_json::from_slice(bytes).ok()?;
    let usage = value.get("usage")?;
    let input = usage
        .get("prompt_tokens")
        .or_else(|| usage.get("input_tokens"))
        .and_then(|v| v.as_u64());
    let output = usage
        .get("completion_tokens")
        .or_else(|| usage.get("output_tokens"))
        .and_then(|v| v.as_u64());
    Some((input?, output?))
}
