//! Classifier config — tunable weights, keyword lists, tier-boundary
//! thresholds and confidence parameters for the Rule Classifier.
//!
//! Grounded in `at-intelligence::token_cache::TokenCacheConfig`'s
//! defaults-ported-from-source convention: ships compiled-in defaults,
//! overridable wholesale by `cr-core::Config.routing_config` at startup via
//! `ScoringConfig::merge_override`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The 15 named scoring dimensions, in their canonical order.
pub const DIMENSIONS: [&str; 15] = [
    "token_count",
    "code_presence",
    "reasoning_markers",
    "technical_terms",
    "creative_markers",
    "simple_indicators",
    "multi_step_patterns",
    "question_complexity",
    "imperative_verbs",
    "constraint_count",
    "output_format",
    "reference_complexity",
    "negation_complexity",
    "domain_specificity",
    "agentic_task",
];

/// Token-count thresholds used by the `token_count` dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenThresholds {
    pub simple: u64,
    pub complex: u64,
}

/// Monotonically increasing score boundaries mapping a weighted score to a
/// tier: `simple_medium < medium_complex < complex_reasoning`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierBoundaries {
    pub simple_medium: f64,
    pub medium_complex: f64,
    pub complex_reasoning: f64,
}

impl TierBoundaries {
    pub fn is_monotonic(&self) -> bool {
        self.simple_medium < self.medium_complex && self.medium_complex < self.complex_reasoning
    }
}

/// Keyword lists consulted by Stage B's dimension rules and Stage A/C's
/// reasoning override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordLists {
    pub code: Vec<String>,
    pub reasoning: Vec<String>,
    pub technical: Vec<String>,
    pub creative: Vec<String>,
    pub simple: Vec<String>,
    pub imperative_verbs: Vec<String>,
    pub constraint: Vec<String>,
    pub output_format: Vec<String>,
    pub reference: Vec<String>,
    pub negation: Vec<String>,
    pub domain_specific: Vec<String>,
    pub agentic: Vec<String>,
}

/// Immutable, process-wide classifier configuration. Built once
/// at startup and read-shared afterward; see the "Global read-only config"
/// design note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub dimension_weights: HashMap<String, f64>,
    pub keywords: KeywordLists,
    pub token_thresholds: TokenThresholds,
    pub tier_boundaries: TierBoundaries,
    pub confidence_steepness: f64,
    pub confidence_threshold: f64,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let mut dimension_weights = HashMap::new();
        for (name, weight) in [
            ("token_count", 1.0),
            ("code_presence", 1.2),
            ("reasoning_markers", 1.5),
            ("technical_terms", 1.0),
            ("creative_markers", 0.6),
            ("simple_indicators", 1.0),
            ("multi_step_patterns", 0.8),
            ("question_complexity", 0.5),
            ("imperative_verbs", 0.7),
            ("constraint_count", 0.8),
            ("output_format", 0.7),
            ("reference_complexity", 0.6),
            ("negation_complexity", 0.5),
            ("domain_specificity", 0.9),
            ("agentic_task", 1.3),
        ] {
            dimension_weights.insert(name.to_string(), weight);
        }

        Self {
            dimension_weights,
            keywords: KeywordLists {
                code: words(&[
                    "function", "class", "import", "def ", "```", "variable", "loop", "array",
                    "struct", "compile", "bug", "stack trace", "exception", "algorithm",
                ]),
                reasoning: words(&[
                    "prove", "theorem", "derive", "formally verify", "chain of thought",
                    "mathematical proof", "lemma", "axiom",
                ]),
                technical: words(&[
                    "api", "database", "protocol", "latency", "throughput", "kubernetes",
                    "container", "deployment", "schema", "index", "cache", "encryption",
                ]),
                creative: words(&["poem", "story", "write a song", "imagine", "fictional", "creative"]),
                simple: words(&["hi", "hello", "thanks", "thank you", "ok", "yes", "no"]),
                imperative_verbs: words(&["write", "build", "create", "implement", "add", "fix", "update"]),
                constraint: words(&["must", "should not", "only", "exactly", "never", "always", "limit"]),
                output_format: words(&["json", "yaml", "csv", "table", "markdown", "bullet points"]),
                reference: words(&["as mentioned", "see above", "the previous", "that file", "this codebase"]),
                negation: words(&["not", "don't", "avoid", "without", "except", "unless"]),
                domain_specific: words(&[
                    "regulatory", "compliance", "clinical", "actuarial", "cryptographic",
                    "distributed consensus",
                ]),
                agentic: words(&[
                    "then", "after that", "first", "next", "finally", "step 1", "autonomously",
                ]),
            },
            token_thresholds: TokenThresholds {
                simple: 50,
                complex: 2000,
            },
            tier_boundaries: TierBoundaries {
                simple_medium: 0.5,
                medium_complex: 1.5,
                complex_reasoning: 3.0,
            },
            confidence_steepness: 1.2,
            confidence_threshold: 0.55,
        }
    }
}

impl ScoringConfig {
    /// Merge a partial JSON override (from `cr-core::Config.routing_config`)
    /// over the compiled-in defaults. Same idiom as `at-bridge`'s
    /// `http_api::merge_json`, applied once at startup rather than per
    /// request: serialize defaults, merge fields present in `override_value`,
    /// deserialize back.
    pub fn merge_override(
        base: ScoringConfig,
        override_value: &serde_json::Value,
    ) -> Result<ScoringConfig, serde_json::Error> {
        let mut merged = serde_json::to_value(&base)?;
        merge_json(&mut merged, override_value);
        serde_json::from_value(merged)
    }
}

fn merge_json(base: &mut serde_json::Value, patch: &serde_json::Value) {
    match (base, patch) {
        (serde_json::Value::Object(base_map), serde_json::Value::Object(patch_map)) => {
            for (key, patch_value) in patch_map {
                merge_json(
                    base_map.entry(key.clone()).or_insert(serde_json::Value::Null),
                    patch_value,
                );
            }
        }
        (base_slot, patch_value) => {
            *base_slot = patch_value.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_boundaries_are_monotonic() {
        assert!(ScoringConfig::default().tier_boundaries.is_monotonic());
    }

    #[test]
    fn default_has_all_fourteen_dimensions_weighted() {
        let config = ScoringConfig::default();
        for dim in DIMENSIONS {
            assert!(
                config.dimension_weights.contains_key(dim),
                "missing weight for dimension {dim}"
            );
        }
    }

    #[test]
    fn merge_override_replaces_only_named_fields() {
        let base = ScoringConfig::default();
        let patch = serde_json::json!({ "confidence_threshold": 0.9 });
        let merged = ScoringConfig::merge_override(base.clone(), &patch).unwrap();
        assert_eq!(merged.confidence_threshold, 0.9);
        assert_eq!(merged.confidence_steepness, base.confidence_steepness);
        assert_eq!(merged.tier_boundaries, base.tier_boundaries);
    }

    #[test]
    fn merge_override_can_replace_nested_boundaries() {
        let base = ScoringConfig::default();
        let patch = serde_json::json!({
            "tier_boundaries": { "simple_medium": 0.1 }
        });
        let merged = ScoringConfig::merge_override(base.clone(), &patch).unwrap();
        assert_eq!(merged.tier_boundaries.simple_medium, 0.1);
        assert_eq!(merged.tier_boundaries.medium_complex, base.tier_boundaries.medium_complex);
    }
}
