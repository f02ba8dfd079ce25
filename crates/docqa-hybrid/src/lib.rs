//! Hybrid search: vector + lexical retrieval blended into one ranking, with a
//! capped web fallback, plus the ingestion write path that feeds both indices.
pub mod engine;
pub mod ingest;
pub mod merge;
pub mod rerank;
pub mod stack;
pub mod web;

pub use engine::{HybridSearchEngine, SearchOutcome, SearchRequest};
pub use ingest::{DeleteReport, IngestReport, Ingestor};
pub use stack::SearchStack;
pub use web::DuckDuckGoSearch;
