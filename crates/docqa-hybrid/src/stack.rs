//! Wires the default collaborators together from settings.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use docqa_core::catalog::DocumentCatalog;
use docqa_core::chunker::{Chunker, ChunkingConfig};
use docqa_core::config::{resolve_with_base, Settings};
use docqa_core::error::Result;
use docqa_core::traits::{Embedder, LexicalIndex, VectorIndex, WebSearch};
use docqa_embed::get_default_embedder;
use docqa_text::TantivyLexicalIndex;
use docqa_vector::MemoryVectorIndex;

use crate::engine::HybridSearchEngine;
use crate::ingest::Ingestor;
use crate::web::DuckDuckGoSearch;

/// One shared set of index handles with the engine and ingestor that use them.
pub struct SearchStack {
    pub catalog: Arc<DocumentCatalog>,
    pub embedder: Arc<dyn Embedder>,
    pub vector: Arc<dyn VectorIndex>,
    pub lexical: Arc<dyn LexicalIndex>,
    pub engine: Arc<HybridSearchEngine>,
    pub ingestor: Arc<Ingestor>,
}

impl SearchStack {
    /// Builds a stack from explicit collaborators.
    pub fn assemble(
        settings: &Settings,
        embedder: Arc<dyn Embedder>,
        vector: Arc<dyn VectorIndex>,
        lexical: Arc<dyn LexicalIndex>,
        web: Option<Arc<dyn WebSearch>>,
    ) -> Result<Self> {
        let catalog = Arc::new(DocumentCatalog::new());
        let chunker = Chunker::new(ChunkingConfig::from(&settings.chunking))?;
        let engine = Arc::new(HybridSearchEngine::new(
            embedder.clone(),
            vector.clone(),
            lexical.clone(),
            web,
            settings.search.clone(),
            settings.timeouts.clone(),
        ));
        let ingestor = Arc::new(Ingestor::new(
            catalog.clone(),
            chunker,
            embedder.clone(),
            vector.clone(),
            lexical.clone(),
            settings.timeouts.clone(),
        ));
        Ok(Self { catalog, embedder, vector, lexical, engine, ingestor })
    }

    /// In-memory indices; nothing touches disk.
    pub fn in_memory(settings: &Settings) -> Result<Self> {
        let embedder = get_default_embedder(&settings.services)?;
        let vector: Arc<dyn VectorIndex> = Arc::new(MemoryVectorIndex::new(embedder.dim()));
        let lexical: Arc<dyn LexicalIndex> = Arc::new(TantivyLexicalIndex::in_memory()?);
        Self::assemble(settings, embedder, vector, lexical, default_web(settings))
    }

    /// On-disk lexical index (and LanceDB vectors with the `lancedb` feature) under `base`.
    ///
    /// The catalog lives in memory, so chunks left on disk by an earlier process
    /// are dropped on open.
    pub async fn open(settings: &Settings, base: &Path) -> Result<Self> {
        let embedder = get_default_embedder(&settings.services)?;
        let tantivy_dir = resolve_with_base(base, &settings.data.tantivy_index_dir);
        let tantivy = TantivyLexicalIndex::open_or_create(&tantivy_dir)?;
        let stale_chunks = tantivy.clear()?;
        let lexical: Arc<dyn LexicalIndex> = Arc::new(tantivy);
        let vector = open_vector(settings, base, embedder.dim()).await?;
        info!(base = %base.display(), stale_chunks, "search stack opened");
        Self::assemble(settings, embedder, vector, lexical, default_web(settings))
    }
}

fn default_web(settings: &Settings) -> Option<Arc<dyn WebSearch>> {
    settings
        .services
        .web_search_enabled
        .then(|| Arc::new(DuckDuckGoSearch::new(settings.services.web_search_url.clone())) as Arc<dyn WebSearch>)
}

#[cfg(feature = "lancedb")]
async fn open_vector(settings: &Settings, base: &Path, dim: usize) -> Result<Arc<dyn VectorIndex>> {
    let dir = resolve_with_base(base, &settings.data.lancedb_dir);
    let index = docqa_vector::LanceVectorIndex::open(&dir, dim).await?;
    let stale_vectors = index.clear().await?;
    info!(stale_vectors, "cleared vectors from a previous run");
    Ok(Arc::new(index))
}

#[cfg(not(feature = "lancedb"))]
async fn open_vector(_settings: &Settings, _base: &Path, dim: usize) -> Result<Arc<dyn VectorIndex>> {
    Ok(Arc::new(MemoryVectorIndex::new(dim)))
}
