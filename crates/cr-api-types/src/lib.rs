//! Shared wire types for ClawRouter: the OpenAI-compatible request/response
//! shapes, the routing decision record, and the tier/model vocabulary used
//! by every other crate in the workspace.
//!
//! Kept dependency-light (`serde`/`serde_json` only) so `cr-core`,
//! `cr-classifier`, `cr-router` and `cr-proxy` can all depend on it without
//! pulling in HTTP or async runtime concerns.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Tier
// ---------------------------------------------------------------------------

/// Complexity tier a chat request is classified into. Declaration order is
/// the total ordering by expected cost/capability — `Tier::Reasoning` is the
/// most capable/expensive, `Tier::Simple` the cheapest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    Simple,
    Medium,
    Complex,
    Reasoning,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Simple, Tier::Medium, Tier::Complex, Tier::Reasoning];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Simple => "SIMPLE",
            Tier::Medium => "MEDIUM",
            Tier::Complex => "COMPLEX",
            Tier::Reasoning => "REASONING",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Tier {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SIMPLE" => Ok(Tier::Simple),
            "MEDIUM" => Ok(Tier::Medium),
            "COMPLEX" => Ok(Tier::Complex),
            "REASONING" => Ok(Tier::Reasoning),
            _ => Err(()),
        }
    }
}

// ---------------------------------------------------------------------------
// ModelEntry / ModelCatalog DTO
// ---------------------------------------------------------------------------

/// An immutable catalog entry: one concrete upstream model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub id: String,
    pub provider: String,
    pub tier: Tier,
    pub input_price_per_mtok: f64,
    pub output_price_per_mtok: f64,
    pub context_window: u64,
    pub supports_streaming: bool,
}

impl ModelEntry {
    /// Cost in USD for the given token counts.
    pub fn calculate_cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        (input_tokens as f64 / 1_000_000.0) * self.input_price_per_mtok
            + (output_tokens as f64 / 1_000_000.0) * self.output_price_per_mtok
    }
}

// ---------------------------------------------------------------------------
// RoutingDecision
// ---------------------------------------------------------------------------

/// How a routing decision was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingMethod {
    Rules,
    Llm,
    Fastpath,
}

/// The record attached to every routed request: chosen model, confidence,
/// cost accounting and the fallback chain that will be walked on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub model: String,
    pub tier: Tier,
    pub confidence: f64,
    pub method: RoutingMethod,
    pub reasoning: String,
    pub cost_estimate: f64,
    pub baseline_cost: f64,
    pub savings: f64,
    pub fallback_chain: Vec<String>,
}

// ---------------------------------------------------------------------------
// OpenAI-compatible chat completion DTOs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// The subset of an OpenAI chat-completion request body the core reads.
/// Unknown top-level fields are preserved via `extra` and forwarded
/// untouched to upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ChatCompletionRequest {
    /// Concatenated content of all `user` messages, in order.
    pub fn user_text(&self) -> String {
        join_role(&self.messages, "user")
    }

    /// Concatenated content of all `system` messages, in order.
    pub fn system_prompt(&self) -> String {
        join_role(&self.messages, "system")
    }

    /// Re-point `model` at a concrete upstream id, leaving everything else
    /// (including unknown fields) untouched.
    pub fn with_model(&self, model: &str) -> ChatCompletionRequest {
        let mut clone = self.clone();
        clone.model = model.to_string();
        clone
    }
}

fn join_role(messages: &[ChatMessage], role: &str) -> String {
    messages
        .iter()
        .filter(|m| m.role == role)
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Minimal model-catalog listing entry for `GET /v1/models`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelListEntry {
    pub id: String,
    pub object: &'static str,
    pub owned_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelListResponse {
    pub object: &'static str,
    pub data: Vec<ModelListEntry>,
}

// ---------------------------------------------------------------------------
// Error body shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tried_models: Vec<String>,
}

// ---------------------------------------------------------------------------
// Health / stats response shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub wallet: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsResponse {
    pub by_tier: std::collections::BTreeMap<String, u64>,
    pub by_model: std::collections::BTreeMap<String, u64>,
    pub total_savings_usd: f64,
}

// ---------------------------------------------------------------------------
// Ordering helper used by the Selector/Router (pure, no I/O)
// ---------------------------------------------------------------------------

/// `max(a, b)` over `Tier`'s declared total ordering. Named explicitly
/// (rather than relying on `std::cmp::max`) so call sites that implement a
/// "raise tier to at least X" override read as exactly that.
pub fn max_tier(a: Tier, b: Tier) -> Tier {
    match a.cmp(&b) {
        Ordering::Less => b,
        _ => a,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_ordering_is_monotonic() {
        assert!(Tier::Simple < Tier::Medium);
        assert!(Tier::Medium < Tier::Complex);
        assert!(Tier::Complex < Tier::Reasoning);
    }

    #[test]
    fn max_tier_never_downgrades() {
        assert_eq!(max_tier(Tier::Simple, Tier::Complex), Tier::Complex);
        assert_eq!(max_tier(Tier::Reasoning, Tier::Medium), Tier::Reasoning);
    }

    #[test]
    fn tier_round_trips_through_str() {
        for t in Tier::ALL {
            assert_eq!(t.as_str().parse::<Tier>().unwrap(), t);
        }
    }

    #[test]
    fn user_text_and_system_prompt_concat_in_order() {
        let req = ChatCompletionRequest {
            model: "auto".into(),
            messages: vec![
                ChatMessage {
                    role: "system".into(),
                    content: "Respond in JSON.".into(),
                },
                ChatMessage {
                    role: "user".into(),
                    content: "Hello".into(),
                },
                ChatMessage {
                    role: "user".into(),
                    content: "World".into(),
                },
            ],
            max_tokens: None,
            stream: None,
            temperature: None,
            extra: Default::default(),
        };
        assert_eq!(req.user_text(), "Hello\nWorld");
        assert_eq!(req.system_prompt(), "Respond in JSON.");
    }

    #[test]
    fn with_model_preserves_other_fields() {
        let req = ChatCompletionRequest {
            model: "auto".into(),
            messages: vec![],
            max_tokens: Some(128),
            stream: Some(true),
            temperature: Some(0.2),
            extra: Default::default(),
        };
        let rewritten = req.with_model("gpt-4o-mini");
        assert_eq!(rewritten.model, "gpt-4o-mini");
        assert_eq!(rewritten.max_tokens, Some(128));
        assert_eq!(rewritten.stream, Some(true));
    }

    #[test]
    fn request_round_trips_unknown_fields() {
        let raw = serde_json::json!({
            "model": "auto",
            "messages": [{"role": "user", "content": "hi"}],
            "tools": [{"type": "function"}],
        });
        let req: ChatCompletionRequest = serde_json::from_value(raw).unwrap();
        assert!(req.extra.contains_key("tools"));
        let back = serde_json::to_value(&req).unwrap();
        assert!(back.get("tools").is_some());
    }
}
