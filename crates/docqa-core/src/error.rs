use thiserror::Error;

/// Failure taxonomy shared by every crate in the workspace.
///
/// Collaborator failures (`EmbeddingUnavailable`, `IndexUnavailable`,
/// `WebSearchUnavailable`) are degradable: the search cascade absorbs them and
/// moves on to the next evidence source. `GenerationFailed` is terminal for the
/// query that hit it.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Embedding service unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Vector index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Web search unavailable: {0}")]
    WebSearchUnavailable(String),

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Malformed generation output: {0}")]
    MalformedGenerationOutput(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Duplicate document: content already stored as '{existing}'")]
    DuplicateDocument { existing: String },

    #[error("Invalid status transition for '{document_id}': {from} -> {to}")]
    InvalidTransition {
        document_id: String,
        from: String,
        to: String,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Operation failed: {0}")]
    Operation(String),
}

impl Error {
    /// True when the search cascade may replace this failure with an empty
    /// result set from the failing source.
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            Error::EmbeddingUnavailable(_)
                | Error::IndexUnavailable(_)
                | Error::WebSearchUnavailable(_)
                | Error::MalformedGenerationOutput(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collaborator_outages_are_degradable() {
        assert!(Error::EmbeddingUnavailable("down".into()).is_degradable());
        assert!(Error::IndexUnavailable("down".into()).is_degradable());
        assert!(Error::WebSearchUnavailable("down".into()).is_degradable());
        assert!(!Error::GenerationFailed("down".into()).is_degradable());
        assert!(!Error::DimensionMismatch { expected: 4, actual: 3 }.is_degradable());
    }
}
