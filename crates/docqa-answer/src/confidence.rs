//! Reported confidence.
//!
//! ```text
//! no results          -> min(no_evidence, no_evidence_ceiling, 0.2)
//! otherwise           -> top blended score
//!   x single_source_factor  if fewer than `min_corroborating` local results clear min_relevance
//!   x hedge_factor          if the answer hedges
//!   min web_ceiling         if every result came from the web
//! ```
//! The result is always clamped to `[0,1]`.

use docqa_core::config::{ConfidenceSettings, MAX_NO_EVIDENCE_CONFIDENCE};
use docqa_core::domain::word_haystack;
use docqa_core::types::SearchResult;

const HEDGES: &[&str] = &[
    "might",
    "possibly",
    "perhaps",
    "unclear",
    "uncertain",
    "not certain",
    "it appears",
    "it seems",
    "cannot determine",
    "cannot be determined",
    "insufficient information",
    "not enough information",
    "unable to determine",
];

/// True when the generated answer signals its own uncertainty.
pub fn detect_hedging(text: &str) -> bool {
    let haystack = word_haystack(text);
    HEDGES.iter().any(|h| haystack.contains(&format!(" {h} ")))
}

pub fn score(results: &[SearchResult], hedged: bool, settings: &ConfidenceSettings, min_relevance: f32) -> f32 {
    let Some(top) = results.iter().map(|r| r.score).reduce(f32::max) else {
        return settings
            .no_evidence
            .min(settings.no_evidence_ceiling)
            .clamp(0.0, MAX_NO_EVIDENCE_CONFIDENCE);
    };

    let mut confidence = top.min(1.0);
    let corroborating = results
        .iter()
        .filter(|r| !r.provenance.is_web() && r.score >= min_relevance)
        .count();
    if corroborating < settings.min_corroborating {
        confidence *= settings.single_source_factor;
    }
    if hedged {
        confidence *= settings.hedge_factor;
    }
    if results.iter().all(|r| r.provenance.is_web()) {
        confidence = confidence.min(settings.web_ceiling);
    }
    if confidence.is_nan() {
        return 0.0;
    }
    confidence.clamp(0.0, 1.0)
}
