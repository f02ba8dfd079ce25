//! Post-merge boosts: exact phrase match and domain vocabulary.

use docqa_core::config::SearchSettings;
use docqa_core::domain::word_haystack;
use docqa_core::stopwords::is_stop_word;
use docqa_core::types::{Domain, SearchResult};

use crate::merge::tie_break;

fn content_words(text: &str) -> Vec<String> {
    word_haystack(text)
        .split_whitespace()
        .filter(|w| !is_stop_word(w))
        .map(str::to_string)
        .collect()
}

/// Question content words as a padded haystack fragment, `None` when fewer than two.
fn question_phrase(question: &str) -> Option<String> {
    let words = content_words(question);
    if words.len() < 2 {
        return None;
    }
    Some(format!(" {} ", words.join(" ")))
}

/// Sets `adjusted_score` on every local result and re-sorts by it.
///
/// Web results keep their capped score. The sort is stable, so equal adjusted
/// scores keep the blended order they arrived in.
pub fn apply_boosts(results: &mut [SearchResult], question: &str, domain: Domain, settings: &SearchSettings) {
    let phrase = question_phrase(question);
    for r in results.iter_mut() {
        if r.provenance.is_web() {
            r.adjusted_score = Some(r.score);
            continue;
        }
        let content = format!(" {} ", content_words(&r.content).join(" "));

        let mut boost = 0.0;
        if phrase.as_deref().is_some_and(|p| content.contains(p)) {
            boost += settings.phrase_bonus;
        }
        let domain_boost = domain.boost_matches(&r.content) as f32 * settings.domain_term_bonus;
        boost += domain_boost.min(settings.max_domain_bonus);
        r.adjusted_score = Some((r.score + boost).min(1.0));
    }
    results.sort_by(|a, b| b.ranking_score().total_cmp(&a.ranking_score()).then_with(|| tie_break(a, b)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_core::types::{ChunkRef, Provenance};

    fn result(id: &str, score: f32, content: &str) -> SearchResult {
        SearchResult {
            id: id.to_string(),
            chunk: Some(ChunkRef {
                chunk_id: id.to_string(),
                document_id: "d".into(),
                index: 0,
                start: 0,
                end: content.len(),
                domain: Domain::Insurance,
                uploaded_at: 0,
            }),
            content: content.to_string(),
            score,
            adjusted_score: None,
            provenance: Provenance::Vector { similarity: score },
        }
    }

    #[test]
    fn phrase_and_domain_boosts_reorder() {
        let mut rs = vec![
            result("a", 0.60, "Premiums are due monthly."),
            result("b", 0.55, "Knee surgery claims are covered; exclusions apply."),
        ];
        apply_boosts(&mut rs, "knee surgery claims", Domain::Insurance, &SearchSettings::default());
        assert_eq!(rs[0].id, "b");
        // phrase 0.1 + one domain term ("covered") 0.05
        assert!((rs[0].adjusted_score.unwrap() - 0.70).abs() < 1e-6);
        assert!((rs[1].adjusted_score.unwrap() - 0.60).abs() < 1e-6);
    }

    #[test]
    fn adjusted_score_is_capped_at_one() {
        let mut rs = vec![result("a", 0.99, "covered claim payment settlement")];
        apply_boosts(&mut rs, "anything", Domain::Insurance, &SearchSettings::default());
        assert_eq!(rs[0].adjusted_score, Some(1.0));
    }
}
