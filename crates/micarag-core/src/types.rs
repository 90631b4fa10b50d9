//! Domain types shared by the index, the rerank stage and the orchestrator.

use serde::{Deserialize, Serialize};

/// Fixed answer returned when retrieval finds nothing. Parsed verbatim by
/// downstream evaluation, so it must not change.
pub const INSUFFICIENT_EVIDENCE: &str = "Non ho evidenze sufficienti nei documenti indicizzati.";

/// A chunk of a source document, the atomic retrievable unit.
///
/// - `doc_id`: stable document identity (source file name)
/// - `title`: human-readable title, also embedded as a prefix of `text`
/// - `chunk_id`: zero-based position within the document
/// - `text`: chunk content, prefixed with `[DOC_TITLE: <title>]`
/// - `source_url`: origin of the document when known
///
/// `(doc_id, chunk_id)` is unique across the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub doc_id: String,
    pub title: String,
    pub chunk_id: u32,
    pub text: String,
    #[serde(default)]
    pub source_url: Option<String>,
}

impl ChunkRecord {
    pub fn key(&self) -> (&str, u32) {
        (&self.doc_id, self.chunk_id)
    }
}

/// A chunk paired with the relevance score of the stage that produced it.
///
/// Out of the index `score` is cosine similarity; after reranking it is the
/// cross-encoder score. Higher is always better.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub chunk: ChunkRecord,
    pub score: f32,
}

impl Candidate {
    pub fn new(chunk: ChunkRecord, score: f32) -> Self {
        Self { chunk, score }
    }
}

/// Citation entry of a [`QueryResult`]. Every field is nullable on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub title: Option<String>,
    pub doc_id: Option<String>,
    pub chunk_id: Option<u32>,
    pub source_url: Option<String>,
}

impl From<&Candidate> for SourceRef {
    fn from(c: &Candidate) -> Self {
        Self {
            title: Some(c.chunk.title.clone()),
            doc_id: Some(c.chunk.doc_id.clone()),
            chunk_id: Some(c.chunk.chunk_id),
            source_url: c.chunk.source_url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    pub answer: String,
    pub sources: Vec<SourceRef>,
}

impl QueryResult {
    pub fn insufficient_evidence() -> Self {
        Self { answer: INSUFFICIENT_EVIDENCE.to_string(), sources: Vec::new() }
    }

    pub fn is_insufficient_evidence(&self) -> bool {
        self.answer == INSUFFICIENT_EVIDENCE
    }
}

/// Whether a text is embedded as a search query or as an indexed passage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedRole {
    Query,
    Passage,
}

impl EmbedRole {
    /// Textual prefix expected by role-aware model families (E5).
    pub fn prefix(self) -> &'static str {
        match self {
            EmbedRole::Query => "query: ",
            EmbedRole::Passage => "passage: ",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }
}
