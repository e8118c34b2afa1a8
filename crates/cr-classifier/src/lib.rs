//! Prompt classification: the token estimator, the regex/scoring Rule
//! Classifier, and the cached LLM fallback.
//!
//! Mirrors `at-intelligence`'s crate scope — everything that turns raw
//! prompt text into a complexity signal, with no knowledge of HTTP or the
//! model catalog.

pub mod config;
pub mod estimator;
pub mod llm;
pub mod llm_fallback;
pub mod rules;

pub use config::ScoringConfig;
pub use estimator::estimate_tokens;
pub use llm_fallback::{fingerprint, ClassificationCache, LlmClassifier};
pub use rules::{classify, ScoringResult};
