//! Rule Classifier — fast-path regex match plus 14-dimension weighted
//! scoring, with a reasoning override and sigmoid confidence calibration.
//!
//! Grounded in `at-intelligence::llm::local_llm_gate`'s pattern of compiling
//! regexes once into a process-wide `OnceLock` singleton rather than
//! recompiling per call.

use std::sync::OnceLock;

use cr_api_types::Tier;
use regex::{Regex, RegexSet};
use serde::{Deserialize, Serialize};

use crate::config::ScoringConfig;

/// Result of a single Rule Classifier run. `tier: None` means the calibrated
/// confidence fell below `config.confidence_threshold` — the caller must
/// escalate to the LLM Classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringResult {
    pub score: f64,
    pub tier: Option<Tier>,
    pub confidence: f64,
    pub signals: Vec<String>,
    pub agentic_score: f64,
}

// ---------------------------------------------------------------------------
// Stage A — fast-path patterns
// ---------------------------------------------------------------------------

struct FastPathSet {
    simple: RegexSet,
    reasoning: RegexSet,
    complex: RegexSet,
    medium: RegexSet,
}

fn fast_path() -> &'static FastPathSet {
    static SET: OnceLock<FastPathSet> = OnceLock::new();
    SET.get_or_init(|| FastPathSet {
        simple: RegexSet::new([
            r"^(hi|hello|hey|hola|bonjour|ciao|namaste|salaam|yo)[!.,\s]*$",
            r"^(what'?s|what is|who is|who'?s)\b",
            r"^(thanks|thank you|ok|okay|got it|cool|sounds good|sure)[!.,\s]*$",
            r"^(are you there|anyone there|you there)\??$",
        ])
        .expect("fast-path simple patterns must compile"),
        reasoning: RegexSet::new([
            r"\bprove\b",
            r"\btheorem\b",
            r"\bderive\b",
            r"\bformally verify\b",
            r"\bchain of thought\b",
            r"\bmathematical proof\b",
        ])
        .expect("fast-path reasoning patterns must compile"),
        complex: RegexSet::new([
            r"\barchitect(ure)?\b",
            r"\bdesign system\b",
            r"\bmicroservice\b",
            r"\bdistributed\b",
            r"\bscalab(le|ility)\b",
            r"\binfrastructure\b",
            r"\boptimi[sz]e\b",
            r"\brefactor\b",
            r"\bmigrate\b",
            r"\boverhaul\b",
        ])
        .expect("fast-path complex patterns must compile"),
        medium: RegexSet::new([
            r"\b(write|build|create|implement)\s+(a|an|the)\s+(function|endpoint|method|class|script|component)\b",
        ])
        .expect("fast-path medium patterns must compile"),
    })
}

/// Stage A: tested against the lowercased, trimmed user text only. Returns
/// `Some(result)` on a match, `None` to fall through to Stage B.
fn stage_a(user_text_normalized: &str) -> Option<ScoringResult> {
    let fp = fast_path();

    if user_text_normalized.len() <= 20 || fp.simple.is_match(user_text_normalized) {
        return Some(fastpath_hit(Tier::Simple, 0.95));
    }
    if fp.reasoning.is_match(user_text_normalized) {
        return Some(fastpath_hit(Tier::Reasoning, 0.90));
    }
    if fp.complex.is_match(user_text_normalized) {
        return Some(fastpath_hit(Tier::Complex, 0.85));
    }
    if fp.medium.is_match(user_text_normalized) {
        return Some(fastpath_hit(Tier::Medium, 0.80));
    }
    None
}

fn fastpath_hit(tier: Tier, confidence: f64) -> ScoringResult {
    ScoringResult {
        score: 0.0,
        tier: Some(tier),
        confidence,
        signals: vec![format!("quick-match: {tier}")],
        agentic_score: 0.0,
    }
}

// ---------------------------------------------------------------------------
// Stage B — weighted dimension scoring
// ---------------------------------------------------------------------------

struct StageBPatterns {
    multi_step: Regex,
}

fn stage_b_patterns() -> &'static StageBPatterns {
    static PATTERNS: OnceLock<StageBPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| StageBPatterns {
        multi_step: Regex::new(r"(?i)first.*then|step\s*\d+|^\d+\.\s").expect("multi-step pattern must compile"),
    })
}

/// Count how many distinct keywords from `keywords` occur in `text`
/// (case-insensitive substring match).
fn count_distinct_matches(text_lower: &str, keywords: &[String]) -> usize {
    keywords.iter().filter(|kw| text_lower.contains(kw.as_str())).count()
}

struct DimensionScores {
    values: Vec<(&'static str, f64)>,
    agentic_score: f64,
}

fn score_dimensions(
    user_lower: &str,
    system_lower: &str,
    estimated_tokens: u64,
    config: &ScoringConfig,
) -> DimensionScores {
    let combined_lower = format!("{system_lower} {user_lower}");
    let patterns = stage_b_patterns();

    let token_count = if estimated_tokens < config.token_thresholds.simple {
        -1.0
    } else if estimated_tokens > config.token_thresholds.complex {
        1.0
    } else {
        0.0
    };

    let code_presence = match count_distinct_matches(user_lower, &config.keywords.code) {
        0 => 0.0,
        1 => 0.5,
        _ => 1.0,
    };

    let reasoning_markers = match count_distinct_matches(user_lower, &config.keywords.reasoning) {
        0 => 0.0,
        1 => 0.7,
        _ => 1.0,
    };

    let technical_terms = match count_distinct_matches(user_lower, &config.keywords.technical) {
        0 | 1 => 0.0,
        2 | 3 => 0.5,
        _ => 1.0,
    };

    let creative_markers = match count_distinct_matches(user_lower, &config.keywords.creative) {
        0 => 0.0,
        1 => 0.5,
        _ => 0.7,
    };

    let simple_indicators = if count_distinct_matches(user_lower, &config.keywords.simple) >= 1 {
        -1.0
    } else {
        0.0
    };

    let multi_step_patterns = if patterns.multi_step.is_match(user_lower) { 0.5 } else { 0.0 };

    let question_complexity = if user_lower.matches('?').count() > 3 { 0.5 } else { 0.0 };

    let imperative_verbs = match count_distinct_matches(user_lower, &config.keywords.imperative_verbs) {
        0 => 0.0,
        1 => 0.3,
        _ => 0.5,
    };

    let constraint_count = match count_distinct_matches(user_lower, &config.keywords.constraint) {
        0 => 0.0,
        1 | 2 => 0.3,
        _ => 0.7,
    };

    let output_format = match count_distinct_matches(user_lower, &config.keywords.output_format) {
        0 => 0.0,
        1 => 0.4,
        _ => 0.7,
    };

    let reference_complexity = match count_distinct_matches(user_lower, &config.keywords.reference) {
        0 => 0.0,
        1 => 0.3,
        _ => 0.5,
    };

    let negation_complexity = match count_distinct_matches(user_lower, &config.keywords.negation) {
        0 | 1 => 0.0,
        2 => 0.3,
        _ => 0.5,
    };

    let domain_specificity = match count_distinct_matches(user_lower, &config.keywords.domain_specific) {
        0 => 0.0,
        1 => 0.5,
        _ => 0.8,
    };

    let agentic_count = count_distinct_matches(&combined_lower, &config.keywords.agentic);
    let agentic_task = match agentic_count {
        0 => 0.0,
        1 | 2 => 0.2,
        3 => 0.6,
        _ => 1.0,
    };

    DimensionScores {
        values: vec![
            ("token_count", token_count),
            ("code_presence", code_presence),
            ("reasoning_markers", reasoning_markers),
            ("technical_terms", technical_terms),
            ("creative_markers", creative_markers),
            ("simple_indicators", simple_indicators),
            ("multi_step_patterns", multi_step_patterns),
            ("question_complexity", question_complexity),
            ("imperative_verbs", imperative_verbs),
            ("constraint_count", constraint_count),
            ("output_format", output_format),
            ("reference_complexity", reference_complexity),
            ("negation_complexity", negation_complexity),
            ("domain_specificity", domain_specificity),
            ("agentic_task", agentic_task),
        ],
        agentic_score: agentic_task * agentic_count as f64,
    }
}

// ---------------------------------------------------------------------------
// Stage D — boundary mapping + confidence calibration
// ---------------------------------------------------------------------------

fn map_score_to_tier(score: f64, config: &ScoringConfig) -> (Tier, f64) {
    let b = &config.tier_boundaries;
    if score < b.simple_medium {
        (Tier::Simple, b.simple_medium - score)
    } else if score < b.medium_complex {
        (Tier::Medium, (score - b.simple_medium).min(b.medium_complex - score))
    } else if score < b.complex_reasoning {
        (Tier::Complex, (score - b.medium_complex).min(b.complex_reasoning - score))
    } else {
        (Tier::Reasoning, score - b.complex_reasoning)
    }
}

fn calibrate_confidence(distance: f64, steepness: f64) -> f64 {
    1.0 / (1.0 + (-steepness * distance).exp())
}

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Classify a request. `user_text`/`system_prompt` are the raw (not yet
/// lowercased) concatenations the Router extracted.
pub fn classify(
    user_text: &str,
    system_prompt: &str,
    estimated_tokens: u64,
    config: &ScoringConfig,
) -> ScoringResult {
    let user_normalized = user_text.trim().to_lowercase();

    if let Some(hit) = stage_a(&user_normalized) {
        return hit;
    }

    let system_lower = system_prompt.to_lowercase();
    let dims = score_dimensions(&user_normalized, &system_lower, estimated_tokens, config);

    let score: f64 = dims
        .values
        .iter()
        .map(|(name, value)| value * config.dimension_weights.get(*name).copied().unwrap_or(0.0))
        .sum();

    let (mapped_tier, distance) = map_score_to_tier(score, config);
    let mut confidence = calibrate_confidence(distance, config.confidence_steepness);
    let mut tier = mapped_tier;
    let mut signals = Vec::new();

    // Stage C: reasoning override takes priority over the boundary mapping.
    let reasoning_hits = count_distinct_matches(&user_normalized, &config.keywords.reasoning);
    if reasoning_hits >= 2 {
        tier = Tier::Reasoning;
        confidence = confidence.max(0.85);
        signals.push("reasoning-override".to_string());
    }

    if confidence < config.confidence_threshold {
        return ScoringResult {
            score,
            tier: None,
            confidence,
            signals,
            agentic_score: dims.agentic_score,
        };
    }

    ScoringResult {
        score,
        tier: Some(tier),
        confidence,
        signals,
        agentic_score: dims.agentic_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ScoringConfig {
        ScoringConfig::default()
    }

    #[test]
    fn empty_user_text_is_simple_via_fastpath() {
        let result = classify("", "", 0, &config());
        assert_eq!(result.tier, Some(Tier::Simple));
        assert_eq!(result.confidence, 0.95);
    }

    #[test]
    fn short_greeting_is_simple() {
        let result = classify("Hello", "", 1, &config());
        assert_eq!(result.tier, Some(Tier::Simple));
        assert_eq!(result.confidence, 0.95);
    }

    #[test]
    fn any_message_under_20_chars_is_simple() {
        let result = classify("zzz qux blah moo", "", 4, &config());
        assert_eq!(result.tier, Some(Tier::Simple));
    }

    #[test]
    fn reasoning_keywords_trigger_fastpath() {
        let result = classify("Please prove this theorem formally.", "", 10, &config());
        assert_eq!(result.tier, Some(Tier::Reasoning));
        assert!(result.confidence >= 0.85);
    }

    #[test]
    fn two_distinct_reasoning_keywords_force_override_past_stage_b() {
        // Long enough to skip the fast-path length check, contains two
        // distinct reasoning markers mid-sentence.
        let text = "Given the following long technical background and context, \
                     please derive a proof of this claim and also provide a chain of thought.";
        let result = classify(text, "", 40, &config());
        assert_eq!(result.tier, Some(Tier::Reasoning));
        assert!(result.confidence >= 0.85);
    }

    #[test]
    fn complex_architecture_request_is_fastpath_complex() {
        let result = classify("Design a microservice architecture for a trading platform", "", 12, &config());
        assert_eq!(result.tier, Some(Tier::Complex));
    }

    #[test]
    fn medium_imperative_coding_request_is_fastpath_medium() {
        let result = classify("Write a function that reverses a linked list", "", 10, &config());
        assert_eq!(result.tier, Some(Tier::Medium));
    }

    #[test]
    fn confidence_is_always_within_unit_bounds() {
        for text in [
            "hi",
            "Write a function that parses JSON and validate constraints, only output valid tables, never fail.",
            "Summarize this article about photosynthesis in three bullet points",
        ] {
            let result = classify(text, "", 50, &config());
            assert!(result.confidence >= 0.5 && result.confidence <= 1.0);
        }
    }

    #[test]
    fn low_confidence_stage_b_result_reports_null_tier() {
        let mut cfg = config();
        cfg.confidence_threshold = 0.999;
        // A middling message that won't hit any fast path and will land
        // near a boundary with low calibrated confidence under a very high
        // threshold.
        let result = classify(
            "Please summarize the quarterly numbers and note any anomalies.",
            "",
            80,
            &cfg,
        );
        assert!(result.tier.is_none());
    }
}
