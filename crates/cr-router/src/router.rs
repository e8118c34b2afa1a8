//! Router — orchestrates Rule Classifier → LLM Classifier → Selector
//! into a `RoutingDecision`.
//!
//! Grounded in `at-intelligence::model_router::ModelRouter`: kept the shape
//! of a struct holding shared, process-wide config/catalog/cache and a
//! single `route` entry point, generalized from `ModelRouter`'s
//! strategy-dispatch routing to a two-stage rule-classifier-then-LLM-fallback
//! pipeline.

use std::sync::Arc;

use cr_api_types::{max_tier, ChatCompletionRequest, RoutingDecision, RoutingMethod, Tier};
use cr_classifier::{estimate_tokens, rules, LlmClassifier, ScoringConfig};
use cr_core::ModelCatalog;

use crate::selector;

pub struct Router {
    scoring_config: Arc<ScoringConfig>,
    catalog: Arc<ModelCatalog>,
    llm_classifier: Arc<LlmClassifier>,
}

impl Router {
    pub fn new(scoring_config: Arc<ScoringConfig>, catalog: Arc<ModelCatalog>, llm_classifier: Arc<LlmClassifier>) -> Self {
        Self {
            scoring_config,
            catalog,
            llm_classifier,
        }
    }

    /// Runs the seven ordered routing steps: estimate tokens, try the rule
    /// classifier, fall back to the LLM classifier below its confidence
    /// threshold, apply both post-classification tier overrides, then select
    /// a concrete model.
    pub async fn route(&self, request: &ChatCompletionRequest) -> RoutingDecision {
        // Step 1-2: extract text, estimate tokens.
        let user_text = request.user_text();
        let system_prompt = request.system_prompt();
        let estimated_tokens = estimate_tokens(&format!("{user_text}{system_prompt}"));

        // Step 3-4: Rule Classifier, falling back to the LLM Classifier.
        let result = rules::classify(&user_text, &system_prompt, estimated_tokens, &self.scoring_config);

        let (mut tier, mut confidence, method, mut reasoning) = match result.tier {
            Some(tier) => {
                let method = if result.signals.iter().any(|s| s.starts_with("quick-match")) {
                    RoutingMethod::Fastpath
                } else {
                    RoutingMethod::Rules
                };
                (tier, result.confidence, method, format!("rule-classifier score={:.2}", result.score))
            }
            None => {
                let (llm_tier, llm_confidence) = self.llm_classifier.classify(&user_text).await;
                (llm_tier, llm_confidence, RoutingMethod::Llm, "llm-fallback".to_string())
            }
        };

        let mut signals = result.signals.clone();

        // Step 5: post-overrides, applied in order.
        if estimated_tokens > 100_000 {
            tier = max_tier(tier, Tier::Complex);
            signals.push("forced-complex-large-context".to_string());
        }
        let system_lower = system_prompt.to_lowercase();
        if system_lower.contains("json") || system_lower.contains("structured") {
            tier = max_tier(tier, Tier::Medium);
            signals.push("forced-medium-structured".to_string());
        }

        if !signals.is_empty() {
            reasoning = format!("{reasoning}; signals=[{}]", signals.join(", "));
        }
        confidence = confidence.clamp(0.5, 1.0);

        // Step 6: Selector.
        let selected = selector::select(tier, estimated_tokens, request.max_tokens, &self.catalog);

        // Step 7: RoutingDecision.
        RoutingDecision {
            model: selected.model_id,
            tier,
            confidence,
            method,
            reasoning,
            cost_estimate: selected.cost_estimate,
            baseline_cost: selected.baseline_cost,
            savings: selected.savings,
            fallback_chain: selected.fallback_chain,
        }
    }
}
