use std::cmp::Ordering;

use docqa_core::types::VectorHit;

/// Cosine similarity clamped into `[0,1]`; zero vectors score 0.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut na, mut nb) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    (dot / (na.sqrt() * nb.sqrt())).clamp(0.0, 1.0)
}

/// Descending similarity; equal scores fall back to newer document, lower
/// chunk index, then chunk id, so ANN ordering noise never leaks out.
pub fn rank_hits(a: &VectorHit, b: &VectorHit) -> Ordering {
    b.similarity
        .total_cmp(&a.similarity)
        .then_with(|| b.chunk.uploaded_at.cmp(&a.chunk.uploaded_at))
        .then_with(|| a.chunk.index.cmp(&b.chunk.index))
        .then_with(|| a.chunk.id.cmp(&b.chunk.id))
}
