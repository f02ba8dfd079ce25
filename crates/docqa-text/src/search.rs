//! Normalized lexical relevance.
//!
//! BM25 is unbounded, so hits are re-scored as the share of distinct query
//! terms the chunk contains, plus small bonuses for repeated terms and for a
//! query bigram appearing verbatim. The result is capped at 1.

use std::collections::HashSet;

const PHRASE_BONUS: f32 = 0.1;
const REPEAT_BONUS: f32 = 0.02;
const MAX_REPEAT_BONUS: f32 = 0.1;

pub fn overlap_score(query_terms: &[String], doc_terms: &[String]) -> f32 {
    let wanted: HashSet<&str> = query_terms.iter().map(String::as_str).collect();
    if wanted.is_empty() {
        return 0.0;
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let mut repeats = 0usize;
    for t in doc_terms.iter().map(String::as_str).filter(|t| wanted.contains(t)) {
        if !seen.insert(t) {
            repeats += 1;
        }
    }
    if seen.is_empty() {
        return 0.0;
    }

    let coverage = seen.len() as f32 / wanted.len() as f32;
    let repeat_bonus = (repeats as f32 * REPEAT_BONUS).min(MAX_REPEAT_BONUS);
    let phrase_bonus = if has_shared_bigram(query_terms, doc_terms) { PHRASE_BONUS } else { 0.0 };
    (coverage + repeat_bonus + phrase_bonus).min(1.0)
}

fn has_shared_bigram(query_terms: &[String], doc_terms: &[String]) -> bool {
    let doc_pairs: HashSet<(&str, &str)> = doc_terms
        .windows(2)
        .map(|w| (w[0].as_str(), w[1].as_str()))
        .collect();
    query_terms
        .windows(2)
        .any(|w| doc_pairs.contains(&(w[0].as_str(), w[1].as_str())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn partial_overlap_with_phrase() {
        let q = terms("polici cover knee surgeri");
        let d = terms("knee surgeri cover 80 after deduct");
        let s = overlap_score(&q, &d);
        assert!((s - 0.85).abs() < 1e-6, "got {s}");
    }

    #[test]
    fn bounded_and_zero_without_match() {
        let q = terms("a b");
        assert_eq!(overlap_score(&q, &terms("c d")), 0.0);
        assert_eq!(overlap_score(&q, &terms("a b a b a b a b")), 1.0);
        assert_eq!(overlap_score(&[], &terms("a")), 0.0);
    }
}
