use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use docqa_core::error::{Error, Result};
use docqa_core::traits::VectorIndex;
use docqa_core::types::{Chunk, ChunkId, SearchFilter, VectorHit};

use crate::similarity::{cosine, rank_hits};

/// Exact-search vector index held in memory.
///
/// Upserts and deletes take the write lock, so a concurrent query observes
/// either the state before or after a whole operation.
pub struct MemoryVectorIndex {
    dim: usize,
    entries: RwLock<HashMap<ChunkId, (Chunk, Vec<f32>)>>,
}

impl MemoryVectorIndex {
    pub fn new(dim: usize) -> Self {
        Self { dim, entries: RwLock::new(HashMap::new()) }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Stored vector for a chunk, if any.
    pub async fn vector(&self, chunk_id: &str) -> Option<Vec<f32>> {
        self.entries.read().await.get(chunk_id).map(|(_, v)| v.clone())
    }

    fn check_dim(&self, actual: usize) -> Result<()> {
        if actual == self.dim {
            Ok(())
        } else {
            Err(Error::DimensionMismatch { expected: self.dim, actual })
        }
    }
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn upsert(&self, chunk: &Chunk, vector: Vec<f32>) -> Result<()> {
        self.check_dim(vector.len())?;
        self.entries
            .write()
            .await
            .insert(chunk.id.clone(), (chunk.clone(), vector));
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize, filter: &SearchFilter) -> Result<Vec<VectorHit>> {
        self.check_dim(vector.len())?;
        if k == 0 {
            return Ok(vec![]);
        }
        let entries = self.entries.read().await;
        let mut hits: Vec<VectorHit> = entries
            .values()
            .filter(|(chunk, _)| filter.matches(chunk))
            .map(|(chunk, v)| VectorHit { chunk: chunk.clone(), similarity: cosine(vector, v) })
            .collect();
        drop(entries);
        hits.sort_by(rank_hits);
        hits.truncate(k);
        Ok(hits)
    }

    async fn delete(&self, document_id: &str) -> Result<usize> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, (chunk, _)| chunk.document_id != document_id);
        let removed = before - entries.len();
        debug!(document_id, removed, "deleted vectors");
        Ok(removed)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.entries.read().await.len())
    }
}
