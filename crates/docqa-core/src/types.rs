//! Domain types shared by the chunker, both indices and the orchestrator.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

pub type ChunkId = String;
pub type DocumentId = String;

/// Subject area a document (or question) belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Insurance,
    Legal,
    Hr,
    Compliance,
    #[default]
    General,
}

impl Domain {
    pub const ALL: [Domain; 5] = [
        Domain::Insurance,
        Domain::Legal,
        Domain::Hr,
        Domain::Compliance,
        Domain::General,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Domain::Insurance => "insurance",
            Domain::Legal => "legal",
            Domain::Hr => "hr",
            Domain::Compliance => "compliance",
            Domain::General => "general",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "insurance" => Ok(Domain::Insurance),
            "legal" => Ok(Domain::Legal),
            "hr" | "human resources" => Ok(Domain::Hr),
            "compliance" => Ok(Domain::Compliance),
            "general" => Ok(Domain::General),
            other => Err(Error::InvalidRequest(format!("unknown domain '{other}'"))),
        }
    }
}

/// Processing state of an uploaded document.
///
/// `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl DocumentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, DocumentStatus::Completed | DocumentStatus::Failed)
    }

    pub fn can_transition_to(self, next: DocumentStatus) -> bool {
        matches!(
            (self, next),
            (DocumentStatus::Pending, DocumentStatus::Processing)
                | (DocumentStatus::Pending, DocumentStatus::Failed)
                | (DocumentStatus::Processing, DocumentStatus::Completed)
                | (DocumentStatus::Processing, DocumentStatus::Failed)
        )
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A document as tracked by the catalog. Text lives in its chunks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub domain: Domain,
    pub status: DocumentStatus,
    pub content_hash: String,
    pub chunk_count: usize,
    pub uploaded_at: DateTime<Utc>,
    pub error: Option<String>,
}

/// A contiguous span of a document's text, the unit of retrieval.
///
/// - `start`/`end`: byte offsets `[start, end)` into the original text, always on
///   UTF-8 boundaries
/// - `overlap`: number of leading bytes shared with the previous chunk (0 for the
///   first chunk)
/// - `domain`/`uploaded_at`: copied from the owning document so indices can filter
///   and break ties without a catalog lookup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub id: ChunkId,
    pub document_id: DocumentId,
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub overlap: usize,
    pub text: String,
    pub domain: Domain,
    pub uploaded_at: i64,
}

impl Chunk {
    pub fn make_id(document_id: &str, index: usize) -> ChunkId {
        format!("{document_id}:{index}")
    }

    /// Text contributed by this chunk alone, i.e. without the overlap it repeats.
    pub fn fresh_text(&self) -> &str {
        self.text.get(self.overlap..).unwrap_or("")
    }
}

/// Restricts a search to one document and/or one domain.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchFilter {
    pub document_id: Option<DocumentId>,
    pub domain: Option<Domain>,
}

impl SearchFilter {
    pub fn matches(&self, chunk: &Chunk) -> bool {
        self.document_id
            .as_deref()
            .map_or(true, |id| id == chunk.document_id)
            && self.domain.map_or(true, |d| d == chunk.domain)
    }
}

/// Which retrieval path produced a result, with the raw score(s) it contributed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Provenance {
    Vector { similarity: f32 },
    Lexical { score: f32 },
    Blended { similarity: f32, lexical: f32 },
    Web { url: String },
}

impl Provenance {
    pub fn includes_vector(&self) -> bool {
        matches!(self, Provenance::Vector { .. } | Provenance::Blended { .. })
    }

    pub fn includes_lexical(&self) -> bool {
        matches!(self, Provenance::Lexical { .. } | Provenance::Blended { .. })
    }

    pub fn is_web(&self) -> bool {
        matches!(self, Provenance::Web { .. })
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Provenance::Vector { .. } => "vector",
            Provenance::Lexical { .. } => "lexical",
            Provenance::Blended { .. } => "vector+lexical",
            Provenance::Web { .. } => "web",
        }
    }
}

/// Pointer back into the corpus, copied by value so history survives deletion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkRef {
    pub chunk_id: ChunkId,
    pub document_id: DocumentId,
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub domain: Domain,
    pub uploaded_at: i64,
}

impl From<&Chunk> for ChunkRef {
    fn from(c: &Chunk) -> Self {
        Self {
            chunk_id: c.id.clone(),
            document_id: c.document_id.clone(),
            index: c.index,
            start: c.start,
            end: c.end,
            domain: c.domain,
            uploaded_at: c.uploaded_at,
        }
    }
}

/// One ranked piece of evidence.
///
/// `score` is the blended relevance in `[0,1]`. `adjusted_score` adds the
/// rerank boosts (phrase match, domain terms) and stays within `[0,1]`.
/// `chunk` is `None` only for web results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub id: String,
    pub chunk: Option<ChunkRef>,
    pub content: String,
    pub score: f32,
    pub adjusted_score: Option<f32>,
    pub provenance: Provenance,
}

impl SearchResult {
    pub fn ranking_score(&self) -> f32 {
        self.adjusted_score.unwrap_or(self.score)
    }
}

/// A candidate returned by the vector index.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    pub chunk: Chunk,
    pub similarity: f32,
}

/// A candidate returned by the lexical index, `score` normalized to `[0,1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct LexicalHit {
    pub chunk: Chunk,
    pub score: f32,
}

/// A snippet returned by the web search collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebSnippet {
    pub text: String,
    pub url: String,
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_round_trips_through_str() {
        for d in Domain::ALL {
            assert_eq!(d.as_str().parse::<Domain>().ok(), Some(d));
        }
        assert!("marine".parse::<Domain>().is_err());
    }

    #[test]
    fn status_transitions_follow_lifecycle() {
        use DocumentStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Failed));
        assert!(!Completed.can_transition_to(Processing));
        assert!(!Failed.can_transition_to(Completed));
        assert!(Completed.is_terminal() && Failed.is_terminal());
    }

    #[test]
    fn provenance_tags() {
        let p = Provenance::Blended { similarity: 0.8, lexical: 0.4 };
        assert!(p.includes_vector() && p.includes_lexical() && !p.is_web());
        assert_eq!(p.tag(), "vector+lexical");
        let json = serde_json::to_string(&Provenance::Web { url: "u".into() }).unwrap_or_default();
        assert!(json.contains("\"kind\":\"web\""));
    }
}
