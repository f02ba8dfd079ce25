use std::path::Path;
use std::sync::Arc;

use arrow_array::types::Float32Type;
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, Int64Array, RecordBatch, RecordBatchIterator,
    StringArray, UInt64Array,
};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection, DistanceType, Table};
use tracing::{debug, info};

use docqa_core::error::{Error, Result};
use docqa_core::traits::VectorIndex;
use docqa_core::types::{Chunk, Domain, SearchFilter, VectorHit};

use crate::schema::{build_chunk_schema, TABLE_NAME};
use crate::similarity::rank_hits;

fn unavailable<E: std::fmt::Display>(e: E) -> Error {
    Error::IndexUnavailable(format!("lancedb: {e}"))
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Vector index stored in a LanceDB table.
///
/// Every write is a single Lance commit, so a query reads one table version
/// and never a half-applied upsert or delete.
pub struct LanceVectorIndex {
    _conn: Connection,
    table: Table,
    dim: usize,
}

impl LanceVectorIndex {
    pub async fn open(db_dir: &Path, dim: usize) -> Result<Self> {
        let dim_i32 = i32::try_from(dim)
            .map_err(|_| Error::InvalidConfig(format!("embedding dimension {dim} too large")))?;
        let conn = connect(db_dir.to_string_lossy().as_ref())
            .execute()
            .await
            .map_err(unavailable)?;
        let names = conn.table_names().execute().await.map_err(unavailable)?;
        let table = if names.iter().any(|n| n == TABLE_NAME) {
            conn.open_table(TABLE_NAME).execute().await.map_err(unavailable)?
        } else {
            let schema = build_chunk_schema(dim_i32);
            let iter = RecordBatchIterator::new(vec![].into_iter(), schema);
            conn.create_table(TABLE_NAME, Box::new(iter))
                .execute()
                .await
                .map_err(unavailable)?
        };

        let stored = table.schema().await.map_err(unavailable)?;
        if let Ok(field) = stored.field_with_name("vector") {
            if let arrow_schema::DataType::FixedSizeList(_, width) = field.data_type() {
                if *width != dim_i32 {
                    return Err(Error::DimensionMismatch {
                        expected: usize::try_from(*width).unwrap_or(0),
                        actual: dim,
                    });
                }
            }
        }
        info!(dir = %db_dir.display(), dim, "opened lancedb vector index");
        Ok(Self { _conn: conn, table, dim })
    }

    /// Drops every stored vector. Returns how many were removed.
    pub async fn clear(&self) -> Result<usize> {
        let existing = self.table.count_rows(None).await.map_err(unavailable)?;
        if existing > 0 {
            self.table.delete("true").await.map_err(unavailable)?;
        }
        Ok(existing)
    }

    fn to_batch(&self, chunk: &Chunk, vector: Vec<f32>) -> Result<RecordBatch> {
        let dim = i32::try_from(self.dim).map_err(|e| Error::Operation(e.to_string()))?;
        let vectors = FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(
            std::iter::once(Some(vector.into_iter().map(Some).collect::<Vec<_>>())),
            dim,
        );
        RecordBatch::try_new(
            build_chunk_schema(dim),
            vec![
                Arc::new(StringArray::from(vec![chunk.id.clone()])),
                Arc::new(StringArray::from(vec![chunk.document_id.clone()])),
                Arc::new(StringArray::from(vec![chunk.domain.as_str()])),
                Arc::new(UInt64Array::from(vec![chunk.index as u64])),
                Arc::new(UInt64Array::from(vec![chunk.start as u64])),
                Arc::new(UInt64Array::from(vec![chunk.end as u64])),
                Arc::new(UInt64Array::from(vec![chunk.overlap as u64])),
                Arc::new(Int64Array::from(vec![chunk.uploaded_at])),
                Arc::new(StringArray::from(vec![chunk.text.clone()])),
                Arc::new(vectors),
            ],
        )
        .map_err(|e| Error::Operation(format!("arrow batch: {e}")))
    }
}

fn filter_predicate(filter: &SearchFilter) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(id) = &filter.document_id {
        parts.push(format!("document_id = {}", quote(id)));
    }
    if let Some(domain) = filter.domain {
        parts.push(format!("domain = {}", quote(domain.as_str())));
    }
    if parts.is_empty() { None } else { Some(parts.join(" AND ")) }
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| Error::Operation(format!("lancedb result missing column '{name}'")))
}

fn hits_from_batch(batch: &RecordBatch) -> Result<Vec<VectorHit>> {
    let ids = column::<StringArray>(batch, "chunk_id")?;
    let docs = column::<StringArray>(batch, "document_id")?;
    let domains = column::<StringArray>(batch, "domain")?;
    let indices = column::<UInt64Array>(batch, "chunk_index")?;
    let starts = column::<UInt64Array>(batch, "start")?;
    let ends = column::<UInt64Array>(batch, "end")?;
    let overlaps = column::<UInt64Array>(batch, "overlap")?;
    let uploaded = column::<Int64Array>(batch, "uploaded_at")?;
    let texts = column::<StringArray>(batch, "text")?;
    let distances = column::<Float32Array>(batch, "_distance")?;

    let mut hits = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let chunk = Chunk {
            id: ids.value(i).to_string(),
            document_id: docs.value(i).to_string(),
            index: indices.value(i) as usize,
            start: starts.value(i) as usize,
            end: ends.value(i) as usize,
            overlap: overlaps.value(i) as usize,
            text: texts.value(i).to_string(),
            domain: domains.value(i).parse::<Domain>().unwrap_or_default(),
            uploaded_at: uploaded.value(i),
        };
        let similarity = if distances.is_null(i) { 0.0 } else { (1.0 - distances.value(i)).clamp(0.0, 1.0) };
        hits.push(VectorHit { chunk, similarity });
    }
    Ok(hits)
}

#[async_trait]
impl VectorIndex for LanceVectorIndex {
    async fn upsert(&self, chunk: &Chunk, vector: Vec<f32>) -> Result<()> {
        if vector.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: vector.len() });
        }
        let batch = self.to_batch(chunk, vector)?;
        let schema = batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
        let mut mi = self.table.merge_insert(&["chunk_id"]);
        mi.when_matched_update_all(None).when_not_matched_insert_all();
        mi.execute(reader).await.map_err(unavailable)?;
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize, filter: &SearchFilter) -> Result<Vec<VectorHit>> {
        if vector.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: vector.len() });
        }
        if k == 0 {
            return Ok(vec![]);
        }
        let mut q = self
            .table
            .vector_search(vector.to_vec())
            .map_err(unavailable)?
            .distance_type(DistanceType::Cosine)
            .limit(k);
        if let Some(pred) = filter_predicate(filter) {
            q = q.only_if(pred);
        }
        let mut stream = q.execute().await.map_err(unavailable)?;
        let mut hits = Vec::new();
        while let Some(batch) = stream.try_next().await.map_err(unavailable)? {
            hits.extend(hits_from_batch(&batch)?);
        }
        hits.sort_by(rank_hits);
        hits.truncate(k);
        Ok(hits)
    }

    async fn delete(&self, document_id: &str) -> Result<usize> {
        let pred = format!("document_id = {}", quote(document_id));
        let existing = self
            .table
            .count_rows(Some(pred.clone()))
            .await
            .map_err(unavailable)?;
        if existing > 0 {
            self.table.delete(&pred).await.map_err(unavailable)?;
        }
        debug!(document_id, removed = existing, "deleted vectors");
        Ok(existing)
    }

    async fn count(&self) -> Result<usize> {
        self.table.count_rows(None).await.map_err(unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicates_quote_values() {
        let f = SearchFilter { document_id: Some("o'brien".into()), domain: Some(Domain::Hr) };
        assert_eq!(
            filter_predicate(&f).as_deref(),
            Some("document_id = 'o''brien' AND domain = 'hr'")
        );
        assert_eq!(filter_predicate(&SearchFilter::default()), None);
    }
}
