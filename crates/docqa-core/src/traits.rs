//! Capability seams between the pipeline and its collaborators.
//!
//! Each trait is deliberately narrow so the hybrid engine and orchestrator can
//! be driven by deterministic fakes.

use async_trait::async_trait;

use crate::error::Result;
use crate::query::{QueryId, QueryRecord};
use crate::types::{Chunk, DocumentId, Domain, LexicalHit, SearchFilter, VectorHit, WebSnippet};

#[async_trait]
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;

    /// Fails with `EmbeddingUnavailable` when the service cannot be reached.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for t in texts {
            out.push(self.embed(t).await?);
        }
        Ok(out)
    }
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Idempotent by chunk id. A vector of the wrong width is `DimensionMismatch`.
    async fn upsert(&self, chunk: &Chunk, vector: Vec<f32>) -> Result<()>;

    /// Up to `k` hits by descending cosine similarity. Empty index or filter -> `Ok(vec![])`.
    async fn query(&self, vector: &[f32], k: usize, filter: &SearchFilter) -> Result<Vec<VectorHit>>;

    /// Removes every vector of `document_id` atomically w.r.t. `query`.
    /// Returns the number of vectors removed.
    async fn delete(&self, document_id: &str) -> Result<usize>;

    async fn count(&self) -> Result<usize>;
}

#[async_trait]
pub trait LexicalIndex: Send + Sync {
    /// Idempotent by chunk id.
    async fn index(&self, chunks: &[Chunk]) -> Result<()>;

    /// Hits scored into `[0,1]`. Never fails with `IndexUnavailable`.
    async fn search(&self, query: &str, k: usize, filter: &SearchFilter) -> Result<Vec<LexicalHit>>;

    async fn delete(&self, document_id: &str) -> Result<usize>;
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Fails with `WebSearchUnavailable`; callers treat that as "no web results".
    async fn search(&self, query: &str) -> Result<Vec<WebSnippet>>;
}

/// Sampling parameters forwarded to the generative service.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

#[async_trait]
pub trait Answerer: Send + Sync {
    /// Fails with `GenerationFailed`.
    async fn generate(&self, prompt: &Prompt, params: GenerationParams) -> Result<String>;
}

/// A chat-style prompt: system instructions plus the user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Page/filter for history listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    pub document_id: Option<DocumentId>,
    pub domain: Option<Domain>,
    pub offset: usize,
    pub limit: Option<usize>,
}

#[async_trait]
pub trait QueryHistory: Send + Sync {
    async fn record(&self, record: QueryRecord) -> Result<()>;
    async fn get(&self, id: QueryId) -> Result<Option<QueryRecord>>;
    /// Newest first.
    async fn list(&self, filter: &HistoryFilter) -> Result<Vec<QueryRecord>>;
}
