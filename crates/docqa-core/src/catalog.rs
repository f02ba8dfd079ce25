//! In-process registry of documents and their processing status.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::types::{Document, DocumentId, DocumentStatus, Domain};

pub fn content_hash(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

#[derive(Default)]
pub struct DocumentCatalog {
    docs: RwLock<HashMap<DocumentId, Document>>,
}

impl DocumentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or re-registers) `id` as `Pending`.
    ///
    /// Identical content already held by another non-failed document is a
    /// `DuplicateDocument`.
    pub async fn register(&self, id: &str, domain: Domain, text: &str) -> Result<Document> {
        let hash = content_hash(text);
        let mut docs = self.docs.write().await;
        if let Some(existing) = docs
            .values()
            .find(|d| d.id != id && d.content_hash == hash && d.status != DocumentStatus::Failed)
        {
            return Err(Error::DuplicateDocument { existing: existing.id.clone() });
        }
        let doc = Document {
            id: id.to_string(),
            domain,
            status: DocumentStatus::Pending,
            content_hash: hash,
            chunk_count: 0,
            uploaded_at: Utc::now(),
            error: None,
        };
        docs.insert(id.to_string(), doc.clone());
        Ok(doc)
    }

    pub async fn transition(&self, id: &str, next: DocumentStatus) -> Result<Document> {
        self.update(id, next, |_| {}).await
    }

    pub async fn complete(&self, id: &str, chunk_count: usize) -> Result<Document> {
        self.update(id, DocumentStatus::Completed, |d| d.chunk_count = chunk_count).await
    }

    pub async fn fail(&self, id: &str, reason: impl Into<String>) -> Result<Document> {
        let reason = reason.into();
        self.update(id, DocumentStatus::Failed, move |d| d.error = Some(reason)).await
    }

    async fn update<F>(&self, id: &str, next: DocumentStatus, f: F) -> Result<Document>
    where
        F: FnOnce(&mut Document),
    {
        let mut docs = self.docs.write().await;
        let doc = docs
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("document '{id}'")))?;
        if !doc.status.can_transition_to(next) {
            return Err(Error::InvalidTransition {
                document_id: id.to_string(),
                from: doc.status.to_string(),
                to: next.to_string(),
            });
        }
        doc.status = next;
        f(doc);
        Ok(doc.clone())
    }

    pub async fn get(&self, id: &str) -> Option<Document> {
        self.docs.read().await.get(id).cloned()
    }

    /// Newest first; ties by id.
    pub async fn list(&self, offset: usize, limit: usize) -> Vec<Document> {
        let docs = self.docs.read().await;
        let mut all: Vec<Document> = docs.values().cloned().collect();
        all.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at).then_with(|| a.id.cmp(&b.id)));
        all.into_iter().skip(offset).take(limit).collect()
    }

    pub async fn remove(&self, id: &str) -> Option<Document> {
        self.docs.write().await.remove(id)
    }
}
