use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use docqa_core::catalog::DocumentCatalog;
use docqa_core::chunker::Chunker;
use docqa_core::config::TimeoutSettings;
use docqa_core::error::{Error, Result};
use docqa_core::traits::{Embedder, LexicalIndex, VectorIndex};
use docqa_core::types::{Chunk, Document, DocumentStatus, Domain};

use crate::engine::with_timeout;

const EMBED_BATCH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub document_id: String,
    pub chunk_count: usize,
    pub status: DocumentStatus,
    /// False when the document is only reachable through the lexical index.
    pub vector_indexed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    pub document_id: String,
    pub vectors_removed: usize,
    pub chunks_removed: usize,
}

/// Write path: extracted text -> chunks -> lexical index + embeddings -> vector index.
pub struct Ingestor {
    catalog: Arc<DocumentCatalog>,
    chunker: Chunker,
    embedder: Arc<dyn Embedder>,
    vector: Arc<dyn VectorIndex>,
    lexical: Arc<dyn LexicalIndex>,
    timeouts: TimeoutSettings,
}

impl Ingestor {
    pub fn new(
        catalog: Arc<DocumentCatalog>,
        chunker: Chunker,
        embedder: Arc<dyn Embedder>,
        vector: Arc<dyn VectorIndex>,
        lexical: Arc<dyn LexicalIndex>,
        timeouts: TimeoutSettings,
    ) -> Self {
        Self { catalog, chunker, embedder, vector, lexical, timeouts }
    }

    pub fn catalog(&self) -> &Arc<DocumentCatalog> {
        &self.catalog
    }

    /// Indexes one document. Re-ingesting an id replaces its previous chunks.
    pub async fn ingest(&self, document_id: &str, domain: Domain, text: &str) -> Result<IngestReport> {
        let doc = self.catalog.register(document_id, domain, text).await?;
        self.catalog.transition(document_id, DocumentStatus::Processing).await?;

        match self.index_document(document_id, domain, doc.uploaded_at.timestamp_millis(), text).await {
            Ok((chunk_count, vector_indexed)) => {
                self.catalog.complete(document_id, chunk_count).await?;
                info!(document_id, chunk_count, vector_indexed, "document indexed");
                Ok(IngestReport {
                    document_id: document_id.to_string(),
                    chunk_count,
                    status: DocumentStatus::Completed,
                    vector_indexed,
                })
            }
            Err(e) => {
                warn!(document_id, error = %e, "document failed");
                self.catalog.fail(document_id, e.to_string()).await?;
                Err(e)
            }
        }
    }

    /// Records a document whose text could not be extracted as `Failed`.
    pub async fn reject(&self, document_id: &str, domain: Domain, reason: &str) -> Result<Document> {
        self.catalog.register(document_id, domain, "").await?;
        warn!(document_id, reason, "document rejected");
        self.catalog.fail(document_id, reason).await
    }

    async fn index_document(&self, document_id: &str, domain: Domain, uploaded_at: i64, text: &str) -> Result<(usize, bool)> {
        if text.trim().is_empty() {
            return Err(Error::UnsupportedFormat(format!("'{document_id}' has no extractable text")));
        }
        self.purge(document_id).await?;

        let chunks = self.chunker.chunk(document_id, domain, uploaded_at, text);
        self.lexical.index(&chunks).await?;

        match self.index_vectors(&chunks).await {
            Ok(()) => Ok((chunks.len(), true)),
            Err(e @ Error::DimensionMismatch { .. }) => {
                self.purge(document_id).await?;
                Err(e)
            }
            Err(e) if e.is_degradable() => {
                warn!(document_id, error = %e, "vector indexing skipped; lexical index only");
                // earlier batches may already be upserted
                if let Err(e) = self.vector.delete(document_id).await {
                    warn!(document_id, error = %e, "could not remove partial vectors");
                }
                Ok((chunks.len(), false))
            }
            Err(e) => Err(e),
        }
    }

    async fn index_vectors(&self, chunks: &[Chunk]) -> Result<()> {
        for batch in chunks.chunks(EMBED_BATCH) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self.embed_batch(&texts).await?;
            if vectors.len() != batch.len() {
                return Err(Error::EmbeddingUnavailable(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    vectors.len()
                )));
            }
            for (chunk, vector) in batch.iter().zip(vectors) {
                with_timeout(self.timeouts.vector_index(), Error::IndexUnavailable, self.vector.upsert(chunk, vector)).await?;
            }
        }
        Ok(())
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut last = Error::EmbeddingUnavailable("no attempt made".into());
        for _ in 0..=self.timeouts.retries() {
            match with_timeout(self.timeouts.embedder(), Error::EmbeddingUnavailable, self.embedder.embed_batch(texts)).await {
                Ok(v) => return Ok(v),
                Err(e) if e.is_degradable() => last = e,
                Err(e) => return Err(e),
            }
        }
        Err(last)
    }

    /// Removes any previously indexed chunks; an unreachable vector store is tolerated.
    async fn purge(&self, document_id: &str) -> Result<()> {
        self.lexical.delete(document_id).await?;
        if let Err(e) = self.vector.delete(document_id).await {
            if !e.is_degradable() {
                return Err(e);
            }
            warn!(document_id, error = %e, "could not purge old vectors");
        }
        Ok(())
    }

    /// Cascades across the vector index, the lexical index and the catalog.
    pub async fn delete(&self, document_id: &str) -> Result<DeleteReport> {
        let known = self.catalog.get(document_id).await.is_some();
        let vectors_removed = self.vector.delete(document_id).await?;
        let chunks_removed = self.lexical.delete(document_id).await?;
        self.catalog.remove(document_id).await;
        if !known && vectors_removed == 0 && chunks_removed == 0 {
            return Err(Error::NotFound(format!("document '{document_id}'")));
        }
        info!(document_id, vectors_removed, chunks_removed, "document deleted");
        Ok(DeleteReport { document_id: document_id.to_string(), vectors_removed, chunks_removed })
    }
}
