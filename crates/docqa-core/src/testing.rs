//! Deterministic collaborator fakes for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::traits::{Answerer, Embedder, GenerationParams, Prompt, VectorIndex, WebSearch};
use crate::types::{Chunk, SearchFilter, VectorHit, WebSnippet};

/// Returns pre-registered vectors; unknown text maps to `fallback`.
pub struct FixedEmbedder {
    dim: usize,
    vectors: HashMap<String, Vec<f32>>,
    fallback: Vec<f32>,
    calls: AtomicUsize,
}

impl FixedEmbedder {
    pub fn new(dim: usize) -> Self {
        let mut fallback = vec![0.0; dim];
        if let Some(last) = fallback.last_mut() {
            *last = 1.0;
        }
        Self { dim, vectors: HashMap::new(), fallback, calls: AtomicUsize::new(0) }
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for FixedEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.vectors.get(text).cloned().unwrap_or_else(|| self.fallback.clone()))
    }
}

/// Always `EmbeddingUnavailable`.
pub struct UnavailableEmbedder {
    dim: usize,
    calls: AtomicUsize,
}

impl UnavailableEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim, calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for UnavailableEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Error::EmbeddingUnavailable("embedding service offline".into()))
    }
}

/// A vector store that is never reachable.
#[derive(Default)]
pub struct UnavailableVectorIndex {
    queries: AtomicUsize,
}

impl UnavailableVectorIndex {
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorIndex for UnavailableVectorIndex {
    async fn upsert(&self, _chunk: &Chunk, _vector: Vec<f32>) -> Result<()> {
        Err(Error::IndexUnavailable("vector store unreachable".into()))
    }

    async fn query(&self, _vector: &[f32], _k: usize, _filter: &SearchFilter) -> Result<Vec<VectorHit>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Err(Error::IndexUnavailable("vector store unreachable".into()))
    }

    async fn delete(&self, _document_id: &str) -> Result<usize> {
        Err(Error::IndexUnavailable("vector store unreachable".into()))
    }

    async fn count(&self) -> Result<usize> {
        Err(Error::IndexUnavailable("vector store unreachable".into()))
    }
}

/// Canned web results with a call counter.
pub struct FakeWebSearch {
    snippets: Vec<WebSnippet>,
    fail: bool,
    calls: AtomicUsize,
}

impl FakeWebSearch {
    pub fn new(snippets: Vec<WebSnippet>) -> Self {
        Self { snippets, fail: false, calls: AtomicUsize::new(0) }
    }

    pub fn empty() -> Self {
        Self::new(vec![])
    }

    pub fn failing() -> Self {
        Self { snippets: vec![], fail: true, calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WebSearch for FakeWebSearch {
    async fn search(&self, _query: &str) -> Result<Vec<WebSnippet>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::WebSearchUnavailable("no network".into()));
        }
        Ok(self.snippets.clone())
    }
}

/// Replies with fixed text, optionally after a delay, and keeps every prompt.
pub struct ScriptedAnswerer {
    reply: Option<String>,
    delay: Option<Duration>,
    prompts: Mutex<Vec<Prompt>>,
}

impl ScriptedAnswerer {
    pub fn new(reply: impl Into<String>) -> Self {
        Self { reply: Some(reply.into()), delay: None, prompts: Mutex::new(vec![]) }
    }

    pub fn failing() -> Self {
        Self { reply: None, delay: None, prompts: Mutex::new(vec![]) }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Answerer for ScriptedAnswerer {
    async fn generate(&self, prompt: &Prompt, _params: GenerationParams) -> Result<String> {
        if let Ok(mut p) = self.prompts.lock() {
            p.push(prompt.clone());
        }
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        self.reply
            .clone()
            .ok_or_else(|| Error::GenerationFailed("answerer offline".into()))
    }
}
