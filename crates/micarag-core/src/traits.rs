use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Candidate, ChatMessage, EmbedRole};

/// Text to vector. Implementations return L2-normalized vectors of length `dim()`.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed(&self, text: &str, role: EmbedRole) -> Result<Vec<f32>>;
    fn embed_batch(&self, texts: &[String], role: EmbedRole) -> Result<Vec<Vec<f32>>>;
}

/// Nearest-neighbour search over indexed chunks.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// At most `limit` candidates, most similar first. An empty index yields
    /// `Ok(vec![])`; failing to query it is an error.
    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<Candidate>>;
}

/// Cross-encoder relevance scoring of (query, passage) pairs.
pub trait Reranker: Send + Sync {
    /// One score per passage, in input order. Higher is more relevant.
    fn score(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>>;
}

/// Chat completion backend.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String>;
}
