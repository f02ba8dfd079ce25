use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use docqa_core::config::{SearchSettings, TimeoutSettings};
use docqa_core::error::{Error, Result};
use docqa_core::query::DegradedSource;
use docqa_core::traits::{Embedder, LexicalIndex, VectorIndex, WebSearch};
use docqa_core::types::{Domain, LexicalHit, SearchFilter, SearchResult, VectorHit};

use crate::merge::merge_candidates;
use crate::rerank::apply_boosts;
use crate::web::web_results;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub question: String,
    pub filter: SearchFilter,
    /// Domain used for boosts only; filtering goes through `filter.domain`.
    pub domain_hint: Domain,
    pub max_results: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    pub degraded: Vec<DegradedSource>,
    pub web_fallback: bool,
    /// Local candidates whose blended score cleared the relevance threshold.
    pub above_threshold: usize,
}

/// Runs the retrieval cascade: embed, vector + lexical search, merge, threshold,
/// web fallback, boosts.
///
/// Every collaborator call is time-limited, and a failed or slow collaborator
/// only removes its own contribution.
pub struct HybridSearchEngine {
    embedder: Arc<dyn Embedder>,
    vector: Arc<dyn VectorIndex>,
    lexical: Arc<dyn LexicalIndex>,
    web: Option<Arc<dyn WebSearch>>,
    settings: SearchSettings,
    timeouts: TimeoutSettings,
}

impl HybridSearchEngine {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        vector: Arc<dyn VectorIndex>,
        lexical: Arc<dyn LexicalIndex>,
        web: Option<Arc<dyn WebSearch>>,
        settings: SearchSettings,
        timeouts: TimeoutSettings,
    ) -> Self {
        Self { embedder, vector, lexical, web, settings, timeouts }
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    pub async fn search(&self, req: &SearchRequest) -> Result<SearchOutcome> {
        if req.max_results == 0 {
            return Err(Error::InvalidRequest("max_results must be > 0".into()));
        }
        let fetch = req.max_results.saturating_mul(self.settings.over_fetch.max(1));
        let mut degraded = Vec::new();

        let (vector_side, lexical_side) = tokio::join!(
            self.vector_candidates(&req.question, fetch, &req.filter),
            self.lexical_candidates(&req.question, fetch, &req.filter),
        );
        let (vector_hits, mut vector_degraded) = vector_side;
        degraded.append(&mut vector_degraded);
        let lexical_hits = match lexical_side {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "lexical search failed; continuing without it");
                degraded.push(DegradedSource::LexicalIndex);
                vec![]
            }
        };
        debug!(vector = vector_hits.len(), lexical = lexical_hits.len(), "retrieved candidates");

        let mut results: Vec<SearchResult> = merge_candidates(vector_hits, lexical_hits, &self.settings)
            .into_iter()
            .filter(|r| r.score >= self.settings.min_relevance)
            .collect();
        let above_threshold = results.len();

        let mut web_fallback = false;
        if results.is_empty() {
            web_fallback = true;
            match self.web_candidates(&req.question).await {
                Ok(web) => results = web,
                Err(e) => {
                    warn!(error = %e, "web fallback failed; no evidence available");
                    degraded.push(DegradedSource::WebSearch);
                }
            }
        }

        apply_boosts(&mut results, &req.question, req.domain_hint, &self.settings);
        results.truncate(req.max_results);
        degraded.sort();
        degraded.dedup();
        info!(
            results = results.len(),
            above_threshold,
            web_fallback,
            degraded = degraded.len(),
            "hybrid search complete"
        );
        Ok(SearchOutcome { results, degraded, web_fallback, above_threshold })
    }

    async fn vector_candidates(
        &self,
        question: &str,
        k: usize,
        filter: &SearchFilter,
    ) -> (Vec<VectorHit>, Vec<DegradedSource>) {
        let vector = match self.embed_question(question).await {
            Some(v) => v,
            None => return (vec![], vec![DegradedSource::Embedder]),
        };
        match with_timeout(self.timeouts.vector_index(), Error::IndexUnavailable, self.vector.query(&vector, k, filter)).await {
            Ok(hits) => (hits, vec![]),
            Err(e) => {
                warn!(error = %e, "vector search failed; continuing with lexical only");
                (vec![], vec![DegradedSource::VectorIndex])
            }
        }
    }

    /// Question embedding, or `None` after the retry budget is spent.
    async fn embed_question(&self, question: &str) -> Option<Vec<f32>> {
        let attempts = 1 + self.timeouts.retries();
        for attempt in 1..=attempts {
            match with_timeout(self.timeouts.embedder(), Error::EmbeddingUnavailable, self.embedder.embed(question)).await {
                Ok(v) => return Some(v),
                Err(e @ Error::DimensionMismatch { .. }) => {
                    warn!(error = %e, "embedder returned wrong width");
                    return None;
                }
                Err(e) => warn!(attempt, attempts, error = %e, "question embedding failed"),
            }
        }
        None
    }

    async fn lexical_candidates(&self, question: &str, k: usize, filter: &SearchFilter) -> Result<Vec<LexicalHit>> {
        with_timeout(self.timeouts.lexical_index(), Error::Operation, self.lexical.search(question, k, filter)).await
    }

    async fn web_candidates(&self, question: &str) -> Result<Vec<SearchResult>> {
        let Some(web) = &self.web else {
            return Err(Error::WebSearchUnavailable("web fallback disabled".into()));
        };
        let snippets = with_timeout(self.timeouts.web_search(), Error::WebSearchUnavailable, web.search(question)).await?;
        Ok(web_results(snippets, self.settings.web_score_cap))
    }
}

/// Bounds a collaborator call; elapsing maps to that collaborator's outage error.
pub(crate) async fn with_timeout<T>(
    limit: Duration,
    on_timeout: fn(String) -> Error,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(r) => r,
        Err(_) => Err(on_timeout(format!("timed out after {}ms", limit.as_millis()))),
    }
}
