//! Selector — tier to concrete model, with cost accounting.
//!
//! Grounded in `at-intelligence::cost_tracker::ModelPricing::calculate_cost`:
//! same `tokens / 1_000_000 * price_per_mtok` formula, reused here via
//! `ModelEntry::calculate_cost`.

use cr_api_types::Tier;
use cr_core::ModelCatalog;

/// Output token cap applied when the request doesn't specify `max_tokens`.
const DEFAULT_OUTPUT_TOKENS: u32 = 1024;

/// Per-tier output token cap, bounding the cost estimate regardless of what
/// the client requests. Tunable, not fixed — same status as the classifier's
/// dimension weights.
fn tier_output_cap(tier: Tier) -> u32 {
    match tier {
        Tier::Simple => 512,
        Tier::Medium => 1024,
        Tier::Complex => 2048,
        Tier::Reasoning => 4096,
    }
}

#[derive(Debug, Clone)]
pub struct SelectorOutput {
    pub model_id: String,
    pub cost_estimate: f64,
    pub baseline_cost: f64,
    pub savings: f64,
    pub fallback_chain: Vec<String>,
}

/// Selects the tier's primary model, the ordered fallback chain, and cost
/// accounting relative to the catalog's reference-expensive model.
pub fn select(
    tier: Tier,
    estimated_input_tokens: u64,
    requested_max_tokens: Option<u32>,
    catalog: &ModelCatalog,
) -> SelectorOutput {
    let primary = catalog
        .primary(tier)
        .expect("catalog must define a primary model for every tier");
    let fallback_chain = catalog.fallback_chain(tier).to_vec();

    let output_cap = tier_output_cap(tier);
    let output_tokens_expected = requested_max_tokens.unwrap_or(DEFAULT_OUTPUT_TOKENS).min(output_cap) as u64;

    let cost_estimate = primary.calculate_cost(estimated_input_tokens, output_tokens_expected);

    let reference = catalog.reference_expensive();
    let baseline_cost = reference.calculate_cost(estimated_input_tokens, output_tokens_expected);

    let savings = if baseline_cost > 0.0 {
        ((baseline_cost - cost_estimate) / baseline_cost).max(0.0)
    } else {
        0.0
    };

    SelectorOutput {
        model_id: primary.id.clone(),
        cost_estimate,
        baseline_cost,
        savings,
        fallback_chain,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cr_core::default_catalog;

    #[test]
    fn simple_tier_is_cheaper_than_baseline() {
        let catalog = default_catalog();
        let out = select(Tier::Simple, 1000, None, &catalog);
        assert!(out.cost_estimate <= out.baseline_cost);
        assert!(out.savings >= 0.0 && out.savings <= 1.0);
    }

    #[test]
    fn complex_primary_equals_reference_expensive_so_savings_is_zero() {
        let catalog = default_catalog();
        let out = select(Tier::Complex, 1000, None, &catalog);
        assert_eq!(out.model_id, catalog.reference_expensive().id);
        assert_eq!(out.savings, 0.0);
    }

    #[test]
    fn requested_max_tokens_is_capped_by_tier_not_exceeded() {
        let catalog = default_catalog();
        let capped = select(Tier::Simple, 100, Some(999_999), &catalog);
        let uncapped_equivalent = select(Tier::Simple, 100, Some(tier_output_cap(Tier::Simple)), &catalog);
        assert_eq!(capped.cost_estimate, uncapped_equivalent.cost_estimate);
    }

    #[test]
    fn fallback_chain_matches_catalog_chain_for_tier() {
        let catalog = default_catalog();
        let out = select(Tier::Reasoning, 10, None, &catalog);
        assert_eq!(out.fallback_chain, catalog.fallback_chain(Tier::Reasoning));
    }
}
