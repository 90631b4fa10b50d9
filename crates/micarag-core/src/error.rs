use thiserror::Error;

/// Failure of a single query stage, or of startup configuration.
///
/// An empty retrieval is not an error: it produces the sentinel answer.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Vector index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Index payload does not match the chunk schema: {0}")]
    SchemaMismatch(String),

    #[error("Rerank failed: {0}")]
    Rerank(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl Error {
    /// Stable label for logs and error responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Embedding(_) => "embedding_error",
            Error::IndexUnavailable(_) => "index_unavailable",
            Error::SchemaMismatch(_) => "schema_mismatch",
            Error::Rerank(_) => "rerank_error",
            Error::Generation(_) => "generation_error",
            Error::Configuration(_) => "configuration_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
