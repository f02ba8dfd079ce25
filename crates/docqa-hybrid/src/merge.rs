//! Candidate merging by chunk identity.

use std::cmp::Ordering;
use std::collections::HashMap;

use docqa_core::config::SearchSettings;
use docqa_core::types::{Chunk, ChunkId, ChunkRef, LexicalHit, Provenance, SearchResult, VectorHit};

#[derive(Default)]
struct Sources {
    chunk: Option<Chunk>,
    similarity: Option<f32>,
    lexical: Option<f32>,
}

/// Blends vector and lexical candidates into one list in step-5 order.
///
/// A chunk seen by both sources scores `vector_weight * similarity +
/// lexical_weight * lexical`; a chunk seen by one keeps that raw score.
pub fn merge_candidates(
    vector_hits: Vec<VectorHit>,
    lexical_hits: Vec<LexicalHit>,
    settings: &SearchSettings,
) -> Vec<SearchResult> {
    let mut by_id: HashMap<ChunkId, Sources> = HashMap::new();
    for h in vector_hits {
        let e = by_id.entry(h.chunk.id.clone()).or_default();
        e.similarity = Some(e.similarity.map_or(h.similarity, |s| s.max(h.similarity)));
        e.chunk.get_or_insert(h.chunk);
    }
    for h in lexical_hits {
        let e = by_id.entry(h.chunk.id.clone()).or_default();
        e.lexical = Some(e.lexical.map_or(h.score, |s| s.max(h.score)));
        e.chunk.get_or_insert(h.chunk);
    }

    let mut merged: Vec<SearchResult> = by_id
        .into_values()
        .filter_map(|s| {
            let chunk = s.chunk?;
            let (score, provenance) = match (s.similarity, s.lexical) {
                (Some(similarity), Some(lexical)) => (
                    settings.vector_weight * similarity + settings.lexical_weight * lexical,
                    Provenance::Blended { similarity, lexical },
                ),
                (Some(similarity), None) => (similarity, Provenance::Vector { similarity }),
                (None, Some(score)) => (score, Provenance::Lexical { score }),
                (None, None) => return None,
            };
            Some(SearchResult {
                id: chunk.id.clone(),
                chunk: Some(ChunkRef::from(&chunk)),
                content: chunk.text,
                score: score.clamp(0.0, 1.0),
                adjusted_score: None,
                provenance,
            })
        })
        .collect();
    merged.sort_by(compare_blended);
    merged
}

/// Blended score descending, then newer document, lower chunk index, chunk id.
pub fn compare_blended(a: &SearchResult, b: &SearchResult) -> Ordering {
    b.score.total_cmp(&a.score).then_with(|| tie_break(a, b))
}

pub fn tie_break(a: &SearchResult, b: &SearchResult) -> Ordering {
    match (&a.chunk, &b.chunk) {
        (Some(x), Some(y)) => y
            .uploaded_at
            .cmp(&x.uploaded_at)
            .then_with(|| x.index.cmp(&y.index))
            .then_with(|| x.chunk_id.cmp(&y.chunk_id)),
        _ => a.id.cmp(&b.id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_core::types::Domain;

    fn chunk(id: &str, index: usize, uploaded_at: i64) -> Chunk {
        Chunk {
            id: id.to_string(),
            document_id: id.split(':').next().unwrap_or(id).to_string(),
            index,
            start: 0,
            end: 1,
            overlap: 0,
            text: id.to_string(),
            domain: Domain::General,
            uploaded_at,
        }
    }

    #[test]
    fn provenance_reflects_sources() {
        let s = SearchSettings::default();
        let merged = merge_candidates(
            vec![
                VectorHit { chunk: chunk("a:0", 0, 1), similarity: 0.8 },
                VectorHit { chunk: chunk("b:0", 0, 1), similarity: 0.6 },
            ],
            vec![
                LexicalHit { chunk: chunk("a:0", 0, 1), score: 0.5 },
                LexicalHit { chunk: chunk("c:0", 0, 1), score: 0.4 },
            ],
            &s,
        );
        let a = merged.iter().find(|r| r.id == "a:0").unwrap();
        assert!((a.score - (0.7 * 0.8 + 0.3 * 0.5)).abs() < 1e-6);
        assert!(matches!(a.provenance, Provenance::Blended { .. }));
        let b = merged.iter().find(|r| r.id == "b:0").unwrap();
        assert_eq!(b.provenance, Provenance::Vector { similarity: 0.6 });
        let c = merged.iter().find(|r| r.id == "c:0").unwrap();
        assert_eq!(c.provenance, Provenance::Lexical { score: 0.4 });
        assert_eq!(merged.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), ["a:0", "b:0", "c:0"]);
    }

    #[test]
    fn equal_scores_prefer_newer_then_earlier_chunks() {
        let s = SearchSettings::default();
        let merged = merge_candidates(
            vec![
                VectorHit { chunk: chunk("old:0", 0, 10), similarity: 0.5 },
                VectorHit { chunk: chunk("new:3", 3, 20), similarity: 0.5 },
                VectorHit { chunk: chunk("new:1", 1, 20), similarity: 0.5 },
            ],
            vec![],
            &s,
        );
        assert_eq!(merged.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), ["new:1", "new:3", "old:0"]);
    }
}
