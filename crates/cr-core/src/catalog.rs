//! Model catalog — the static table of upstream models, their tier,
//! pricing and fallback relationships.
//!
//! Grounded in `at-intelligence::cost_tracker::default_pricing_table`: same
//! per-1M-token pricing shape and `calculate_cost` formula, extended with
//! `tier` and `supports_streaming` so the catalog can answer "which models
//! belong to this tier" — the router relies on this to guarantee a routed
//! model always belongs to the decision's tier.

use std::collections::HashMap;

use cr_api_types::{ModelEntry, Tier};

/// Process-wide, read-only after construction. Cheap to clone (`Vec`/`HashMap`
/// of small structs); callers typically hold one behind an `Arc`.
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    entries: Vec<ModelEntry>,
    by_id: HashMap<String, usize>,
    /// Tier -> ordered [primary, fallback1, fallback2, ...] model ids.
    chains: HashMap<Tier, Vec<String>>,
}

impl ModelCatalog {
    /// Build a catalog from an explicit entry list plus per-tier ordered
    /// chains (first id in each chain is that tier's primary).
    pub fn new(entries: Vec<ModelEntry>) -> Self {
        let mut chains: HashMap<Tier, Vec<String>> = HashMap::new();
        for entry in &entries {
            chains.entry(entry.tier).or_default().push(entry.id.clone());
        }
        let by_id = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.clone(), i))
            .collect();
        Self {
            entries,
            by_id,
            chains,
        }
    }

    /// Apply id -> replacement overrides (e.g. from `Config.model_overrides`).
    pub fn with_overrides(mut self, overrides: &HashMap<String, ModelEntry>) -> Self {
        for (id, replacement) in overrides {
            if let Some(&idx) = self.by_id.get(id) {
                self.entries[idx] = replacement.clone();
            }
        }
        self
    }

    pub fn by_id(&self, id: &str) -> Option<&ModelEntry> {
        self.by_id.get(id).map(|&i| &self.entries[i])
    }

    pub fn all(&self) -> impl Iterator<Item = &ModelEntry> {
        self.entries.iter()
    }

    /// Ordered [primary, fallback...] ids for a tier. Empty if the tier has
    /// no configured models (a misconfiguration the caller should treat as
    /// fatal at startup).
    pub fn fallback_chain(&self, tier: Tier) -> &[String] {
        self.chains.get(&tier).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// The tier's primary model, i.e. `fallback_chain(tier)[0]`.
    pub fn primary(&self, tier: Tier) -> Option<&ModelEntry> {
        self.fallback_chain(tier).first().and_then(|id| self.by_id(id))
    }

    /// The canonical "expensive" reference model used as the denominator of
    /// `savings`: the catalog's COMPLEX-tier primary.
    pub fn reference_expensive(&self) -> &ModelEntry {
        self.primary(Tier::Complex)
            .expect("catalog must define a COMPLEX-tier primary model")
    }
}

/// The default, compiled-in pricing table. Approximate pricing as of this
/// writing; tunable via `model_overrides`, not a fixed requirement (see
/// DESIGN.md Open Question decisions).
pub fn default_catalog() -> ModelCatalog {
    ModelCatalog::new(vec![
        // -- SIMPLE --
        ModelEntry {
            id: "gemini-2.5-flash".into(),
            provider: "google".into(),
            tier: Tier::Simple,
            input_price_per_mtok: 0.075,
            output_price_per_mtok: 0.30,
            context_window: 1_000_000,
            supports_streaming: true,
        },
        ModelEntry {
            id: "gpt-4o-mini".into(),
            provider: "openai".into(),
            tier: Tier::Simple,
            input_price_per_mtok: 0.15,
            output_price_per_mtok: 0.60,
            context_window: 128_000,
            supports_streaming: true,
        },
        ModelEntry {
            id: "claude-haiku-4-20250514".into(),
            provider: "anthropic".into(),
            tier: Tier::Simple,
            input_price_per_mtok: 0.80,
            output_price_per_mtok: 4.0,
            context_window: 200_000,
            supports_streaming: true,
        },
        // -- MEDIUM --
        ModelEntry {
            id: "gpt-4o".into(),
            provider: "openai".into(),
            tier: Tier::Medium,
            input_price_per_mtok: 2.50,
            output_price_per_mtok: 10.0,
            context_window: 128_000,
            supports_streaming: true,
        },
        ModelEntry {
            id: "gemini-2.5-pro".into(),
            provider: "google".into(),
            tier: Tier::Medium,
            input_price_per_mtok: 1.25,
            output_price_per_mtok: 5.0,
            context_window: 2_000_000,
            supports_streaming: true,
        },
        // -- COMPLEX --
        ModelEntry {
            id: "claude-sonnet-4-20250514".into(),
            provider: "anthropic".into(),
            tier: Tier::Complex,
            input_price_per_mtok: 3.0,
            output_price_per_mtok: 15.0,
            context_window: 200_000,
            supports_streaming: true,
        },
        ModelEntry {
            id: "gpt-4.1".into(),
            provider: "openai".into(),
            tier: Tier::Complex,
            input_price_per_mtok: 2.0,
            output_price_per_mtok: 8.0,
            context_window: 1_000_000,
            supports_streaming: true,
        },
        ModelEntry {
            id: "o3-mini".into(),
            provider: "openai".into(),
            tier: Tier::Complex,
            input_price_per_mtok: 1.10,
            output_price_per_mtok: 4.40,
            context_window: 200_000,
            supports_streaming: true,
        },
        // -- REASONING --
        ModelEntry {
            id: "o1".into(),
            provider: "openai".into(),
            tier: Tier::Reasoning,
            input_price_per_mtok: 15.0,
            output_price_per_mtok: 60.0,
            context_window: 200_000,
            supports_streaming: false,
        },
        ModelEntry {
            id: "claude-opus-4-20250514".into(),
            provider: "anthropic".into(),
            tier: Tier::Reasoning,
            input_price_per_mtok: 15.0,
            output_price_per_mtok: 75.0,
            context_window: 200_000,
            supports_streaming: true,
        },
        ModelEntry {
            id: "deepseek-r1".into(),
            provider: "deepseek".into(),
            tier: Tier::Reasoning,
            input_price_per_mtok: 0.55,
            output_price_per_mtok: 2.19,
            context_window: 64_000,
            supports_streaming: true,
        },
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_tier_has_a_primary() {
        let catalog = default_catalog();
        for tier in Tier::ALL {
            assert!(
                catalog.primary(tier).is_some(),
                "tier {tier:?} has no primary model"
            );
        }
    }

    #[test]
    fn primary_and_fallback_entries_belong_to_their_tier() {
        let catalog = default_catalog();
        for tier in Tier::ALL {
            for id in catalog.fallback_chain(tier) {
                let entry = catalog.by_id(id).expect("chain id must resolve");
                assert_eq!(entry.tier, tier);
            }
        }
    }

    #[test]
    fn reference_expensive_is_complex_primary() {
        let catalog = default_catalog();
        assert_eq!(
            catalog.reference_expensive().id,
            catalog.primary(Tier::Complex).unwrap().id
        );
    }

    #[test]
    fn overrides_replace_matching_entries_only() {
        let catalog = default_catalog();
        let mut overrides = HashMap::new();
        overrides.insert(
            "gpt-4o-mini".to_string(),
            ModelEntry {
                id: "gpt-4o-mini".into(),
                provider: "openai".into(),
                tier: Tier::Simple,
                input_price_per_mtok: 0.05,
                output_price_per_mtok: 0.05,
                context_window: 128_000,
                supports_streaming: true,
            },
        );
        let catalog = catalog.with_overrides(&overrides);
        assert_eq!(catalog.by_id("gpt-4o-mini").unwrap().input_price_per_mtok, 0.05);
        assert!(catalog.by_id("gemini-2.5-flash").is_some());
    }

    #[test]
    fn calculate_cost_matches_price_table() {
        let entry = default_catalog().by_id("claude-sonnet-4-20250514").unwrap().clone();
        let cost = entry.calculate_cost(1_000_000, 1_000_000);
        assert!((cost - 18.0).abs() < 0.001);
    }
}
