//! LLM Classifier — one-shot fallback classification for prompts the
//! Rule Classifier couldn't confidently tier, with an in-memory
//! `ClassificationCache`.
//!
//! Grounded in `at-intelligence::token_cache::{TokenCacheConfig, CacheStats}`
//! for the cache shape (`AHashMap` under `tokio::sync::RwLock`, TTL +
//! capacity-bounded), adapted from "least-hit eviction" to strictly-oldest-
//! first eviction (cache hits must stay deterministic under concurrent
//! lookups) and simplified from hash+prefix dual caching to hash-only
//! (classification has no notion of a shared system-prompt prefix worth
//! caching separately).

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ahash::AHashMap;
use cr_api_types::Tier;
use tokio::sync::RwLock;

use crate::llm::{LlmCompletionRequest, LlmProvider};

const CACHE_TTL: Duration = Duration::from_secs(3600);
const CACHE_CAPACITY: usize = 1000;
const CLASSIFIER_TIMEOUT: Duration = Duration::from_secs(5);
const FINGERPRINT_PREFIX_LEN: usize = 500;

/// Stable hash of the normalized first 500 characters of a user message.
pub fn fingerprint(user_text: &str) -> u64 {
    let normalized: String = user_text
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let truncated: String = normalized.chars().take(FINGERPRINT_PREFIX_LEN).collect();

    let mut hasher = DefaultHasher::new();
    truncated.hash(&mut hasher);
    hasher.finish()
}

#[derive(Debug, Clone)]
struct CacheEntry {
    tier: Tier,
    inserted_at: Instant,
}

/// `{lookup, insert, invalidate}` per the "cache as arena" design note, so
/// `POST /reload` and unit tests can both treat it as a stub-able interface.
#[derive(Debug, Default)]
pub struct ClassificationCache {
    entries: RwLock<AHashMap<u64, CacheEntry>>,
}

impl ClassificationCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(AHashMap::new()),
        }
    }

    /// Returns the cached tier if present and not expired. Stale entries are
    /// treated as a miss (lazy eviction happens on the next `insert`).
    pub async fn lookup(&self, key: u64) -> Option<Tier> {
        let entries = self.entries.read().await;
        entries.get(&key).and_then(|entry| {
            if entry.inserted_at.elapsed() < CACHE_TTL {
                Some(entry.tier)
            } else {
                None
            }
        })
    }

    /// Insert/overwrite an entry. Evicts expired entries first; if still at
    /// capacity, drops the single oldest entry (strictly oldest, not
    /// least-hit).
    pub async fn insert(&self, key: u64, tier: Tier) {
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.inserted_at.elapsed() < CACHE_TTL);

        if entries.len() >= CACHE_CAPACITY && !entries.contains_key(&key) {
            if let Some(oldest_key) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.inserted_at)
                .map(|(k, _)| *k)
            {
                entries.remove(&oldest_key);
            }
        }

        entries.insert(
            key,
            CacheEntry {
                tier,
                inserted_at: Instant::now(),
            },
        );
    }

    pub async fn invalidate(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

const CLASSIFICATION_PROMPT_TEMPLATE: &str = "Classify the complexity of the following user request as exactly one word: SIMPLE, MEDIUM, COMPLEX, or REASONING. Respond with only that single word.\n\nRequest:\n{prompt}";

/// Parses a one-word tier answer with word-boundary matching; anything
/// ambiguous or unparseable defaults to `MEDIUM`.
fn parse_tier_answer(raw: &str) -> Option<Tier> {
    let upper = raw.to_uppercase();
    let mut found = None;
    for tier in Tier::ALL {
        let word = tier.as_str();
        let is_word_match = upper
            .split(|c: char| !c.is_ascii_alphabetic())
            .any(|token| token == word);
        if is_word_match {
            if found.is_some() {
                return None; // more than one tier word present: ambiguous.
            }
            found = Some(tier);
        }
    }
    found
}

pub struct LlmClassifier {
    provider: Arc<dyn LlmProvider>,
    cache: Arc<ClassificationCache>,
    classifier_model: String,
}

impl LlmClassifier {
    pub fn new(provider: Arc<dyn LlmProvider>, cache: Arc<ClassificationCache>, classifier_model: impl Into<String>) -> Self {
        Self {
            provider,
            cache,
            classifier_model: classifier_model.into(),
        }
    }

    /// Contract: never fails. Network errors, timeouts, and unparseable
    /// answers all degrade to `(MEDIUM, 0.6)` rather than propagating.
    pub async fn classify(&self, user_text: &str) -> (Tier, f64) {
        let key = fingerprint(user_text);

        if let Some(tier) = self.cache.lookup(key).await {
            return (tier, 0.75);
        }

        let request = LlmCompletionRequest {
            model: self.classifier_model.clone(),
            prompt: CLASSIFICATION_PROMPT_TEMPLATE.replace("{prompt}", user_text),
            max_tokens: 10,
            temperature: 0.0,
        };

        let outcome = tokio::time::timeout(CLASSIFIER_TIMEOUT, self.provider.complete(&request)).await;

        let (tier, confidence) = match outcome {
            Ok(Ok(response)) => match parse_tier_answer(&response.content) {
                Some(tier) => (tier, 0.6),
                None => {
                    tracing::warn!(answer = %response.content, "llm classifier returned an unparseable tier");
                    (Tier::Medium, 0.6)
                }
            },
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "llm classifier upstream call failed");
                (Tier::Medium, 0.6)
            }
            Err(_elapsed) => {
                tracing::warn!("llm classifier call exceeded the 5s deadline");
                (Tier::Medium, 0.6)
            }
        };

        self.cache.insert(key, tier).await;
        (tier, confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmError, MockProvider};

    fn classifier(provider: MockProvider) -> LlmClassifier {
        LlmClassifier::new(Arc::new(provider), Arc::new(ClassificationCache::new()), "cheap-model")
    }

    #[tokio::test]
    async fn parses_clean_tier_answer() {
        let c = classifier(MockProvider::new().with_response("COMPLEX"));
        let (tier, confidence) = c.classify("some ambiguous request").await;
        assert_eq!(tier, Tier::Complex);
        assert_eq!(confidence, 0.6);
    }

    #[tokio::test]
    async fn unparseable_answer_defaults_to_medium() {
        let c = classifier(MockProvider::new().with_response("not sure, maybe simple or complex"));
        let (tier, confidence) = c.classify("ambiguous").await;
        assert_eq!(tier, Tier::Medium);
        assert_eq!(confidence, 0.6);
    }

    #[tokio::test]
    async fn provider_error_degrades_to_medium_never_propagates() {
        let c = classifier(MockProvider::new().with_error(LlmError::Http("connection refused".into())));
        let (tier, confidence) = c.classify("ambiguous").await;
        assert_eq!(tier, Tier::Medium);
        assert_eq!(confidence, 0.6);
    }

    #[tokio::test]
    async fn cache_hit_skips_upstream_and_returns_stable_tier() {
        let provider = Arc::new(MockProvider::new().with_response("REASONING"));
        let cache = Arc::new(ClassificationCache::new());
        let classifier = LlmClassifier::new(provider, cache, "cheap-model");

        let (first_tier, _) = classifier.classify("identical prompt text").await;
        // Second call must not consume the (now-empty) mock queue; the
        // default-to-MEDIUM fallback would reveal a cache miss.
        let (second_tier, second_confidence) = classifier.classify("identical prompt text").await;

        assert_eq!(first_tier, Tier::Reasoning);
        assert_eq!(second_tier, Tier::Reasoning);
        assert_eq!(second_confidence, 0.75);
    }

    #[tokio::test]
    async fn cache_capacity_never_exceeds_limit_and_evicts_oldest() {
        let cache = ClassificationCache::new();
        for i in 0..(CACHE_CAPACITY + 10) {
            cache.insert(i as u64, Tier::Simple).await;
        }
        assert_eq!(cache.len().await, CACHE_CAPACITY);
        // The earliest-inserted keys should have been evicted first.
        assert!(cache.lookup(0).await.is_none());
        assert!(cache.lookup((CACHE_CAPACITY + 9) as u64).await.is_some());
    }

    #[tokio::test]
    async fn invalidate_clears_all_entries() {
        let cache = ClassificationCache::new();
        cache.insert(1, Tier::Simple).await;
        cache.invalidate().await;
        assert_eq!(cache.len().await, 0);
    }

    #[test]
    fn fingerprint_is_stable_for_case_and_whitespace_variants() {
        let a = fingerprint("Hello   World");
        let b = fingerprint("hello world");
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_only_considers_first_500_chars() {
        let base = "x".repeat(500);
        let a = fingerprint(&base);
        let b = fingerprint(&(base.clone() + "extra tail that should be ignored"));
        assert_eq!(a, b);
    }
}
