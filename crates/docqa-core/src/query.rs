//! Query submission and the persisted query record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{ChunkId, Domain, DocumentId, Provenance, SearchResult};

pub type QueryId = Uuid;

pub const MAX_QUESTION_CHARS: usize = 1000;

/// What the routing layer hands the orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QueryRequest {
    pub question: String,
    pub domain: Option<Domain>,
    pub document_id: Option<DocumentId>,
    pub max_results: Option<usize>,
}

impl QueryRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self { question: question.into(), ..Self::default() }
    }

    pub fn with_domain(mut self, domain: Domain) -> Self {
        self.domain = Some(domain);
        self
    }

    pub fn with_document(mut self, document_id: impl Into<DocumentId>) -> Self {
        self.document_id = Some(document_id.into());
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    /// Trims the question and resolves `max_results` against the configured bounds.
    pub fn validate(&self, default_max: usize, limit: usize) -> Result<ValidatedQuery> {
        let question = self.question.trim();
        if question.is_empty() {
            return Err(Error::InvalidRequest("question must not be empty".into()));
        }
        if question.chars().count() > MAX_QUESTION_CHARS {
            return Err(Error::InvalidRequest(format!(
                "question exceeds {MAX_QUESTION_CHARS} characters"
            )));
        }
        let max_results = self.max_results.unwrap_or(default_max);
        if max_results == 0 || max_results > limit {
            return Err(Error::InvalidRequest(format!(
                "max_results must be between 1 and {limit}, got {max_results}"
            )));
        }
        Ok(ValidatedQuery {
            question: question.to_string(),
            domain: self.domain,
            document_id: self.document_id.clone(),
            max_results,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedQuery {
    pub question: String,
    pub domain: Option<Domain>,
    pub document_id: Option<DocumentId>,
    pub max_results: usize,
}

/// Where the evidence behind an answer came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Grounding {
    Documents,
    Web,
    None,
}

/// A collaborator that failed (or timed out) while serving a query.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DegradedSource {
    Embedder,
    VectorIndex,
    LexicalIndex,
    WebSearch,
}

/// How the answerer output was interpreted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnswerFormat {
    Structured,
    /// Output could not be parsed; `answer` holds the raw text.
    Raw,
    /// No evidence was found and the answerer was not consulted.
    NoEvidence,
}

/// A citation built from a real search result, never from model output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Citation {
    pub result_id: String,
    pub chunk_id: Option<ChunkId>,
    pub document_id: Option<DocumentId>,
    pub span: Option<(usize, usize)>,
    pub provenance: Provenance,
    pub score: f32,
}

impl From<&SearchResult> for Citation {
    fn from(r: &SearchResult) -> Self {
        Self {
            result_id: r.id.clone(),
            chunk_id: r.chunk.as_ref().map(|c| c.chunk_id.clone()),
            document_id: r.chunk.as_ref().map(|c| c.document_id.clone()),
            span: r.chunk.as_ref().map(|c| (c.start, c.end)),
            provenance: r.provenance.clone(),
            score: r.score,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Latency {
    pub search_ms: u64,
    pub generation_ms: u64,
    pub total_ms: u64,
}

/// A fully answered query. Immutable once stored in history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryRecord {
    pub id: QueryId,
    pub question: String,
    pub domain: Domain,
    pub document_id: Option<DocumentId>,
    pub created_at: DateTime<Utc>,
    pub answer: String,
    pub reasoning: String,
    pub confidence: f32,
    pub evidence: Vec<String>,
    pub limitations: Vec<String>,
    pub follow_up: Vec<String>,
    pub citations: Vec<Citation>,
    pub results: Vec<SearchResult>,
    pub grounding: Grounding,
    pub degraded: Vec<DegradedSource>,
    pub answer_format: AnswerFormat,
    pub latency: Latency,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_applies_default_and_bounds() {
        let q = QueryRequest::new("  What is covered?  ");
        let v = q.validate(10, 50).ok();
        assert_eq!(v.as_ref().map(|v| v.question.as_str()), Some("What is covered?"));
        assert_eq!(v.map(|v| v.max_results), Some(10));

        assert!(QueryRequest::new("   ").validate(10, 50).is_err());
        assert!(QueryRequest::new("q").with_max_results(0).validate(10, 50).is_err());
        assert!(QueryRequest::new("q").with_max_results(51).validate(10, 50).is_err());
        assert!(QueryRequest::new("x".repeat(1001)).validate(10, 50).is_err());
    }
}
