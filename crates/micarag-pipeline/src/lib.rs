//! Query orchestration: embed → retrieve → rerank → assemble → generate.
//!
//! A [`RagPipeline`] is built once at startup from already loaded models and
//! answers any number of questions concurrently through `&self`. Each call
//! walks the stages strictly in order and keeps no state afterwards.

use anyhow::Result;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use micarag_core::config::RagSettings;
use micarag_core::error::Error;
use micarag_core::traits::{ChatModel, Embedder, Reranker, VectorIndex};
use micarag_core::types::{EmbedRole, QueryResult, SourceRef};
use micarag_vector::LanceIndex;

pub mod context;
pub mod prompt;

pub use context::assemble;
pub use prompt::{user_turn, SYSTEM_DIRECTIVE};

/// Retrieval breadth `top_k` and answer breadth `top_n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineParams {
    pub top_k: usize,
    pub top_n: usize,
}

impl PipelineParams {
    pub fn validate(&self) -> micarag_core::Result<()> {
        if self.top_n == 0 {
            return Err(Error::Configuration("top_n must be at least 1".into()));
        }
        if self.top_n > self.top_k {
            return Err(Error::Configuration(format!(
                "top_n ({}) must not exceed top_k ({})",
                self.top_n, self.top_k
            )));
        }
        Ok(())
    }
}

impl From<&RagSettings> for PipelineParams {
    fn from(s: &RagSettings) -> Self {
        Self { top_k: s.top_k, top_n: s.top_n }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Embedding,
    Retrieving,
    Reranking,
    Assembling,
    Generating,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Embedding => "embedding",
            Stage::Retrieving => "retrieving",
            Stage::Reranking => "reranking",
            Stage::Assembling => "assembling",
            Stage::Generating => "generating",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

fn enter(stage: Stage) {
    tracing::debug!(%stage, "query stage");
}

pub struct RagPipeline {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    reranker: Arc<dyn Reranker>,
    chat: Arc<dyn ChatModel>,
    params: PipelineParams,
}

impl RagPipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        reranker: Arc<dyn Reranker>,
        chat: Arc<dyn ChatModel>,
        params: PipelineParams,
    ) -> micarag_core::Result<Self> {
        params.validate()?;
        Ok(Self { embedder, index, reranker, chat, params })
    }

    /// Validate `settings`, load every model once and connect to the index.
    pub async fn from_settings(settings: &RagSettings) -> Result<Self> {
        settings.validate()?;
        let start = Instant::now();
        let embedder = micarag_embed::get_default_embedder(settings)?;
        let reranker = micarag_rerank::get_default_reranker(settings)?;
        let chat = micarag_llm::build_chat_model(settings)?;
        let index = LanceIndex::connect(&settings.index_location(), &settings.collection_name, settings.search_timeout()).await?;
        tracing::info!(
            index = %settings.index_location(),
            collection = %settings.collection_name,
            top_k = settings.top_k,
            top_n = settings.top_n,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "pipeline ready"
        );
        Ok(Self::new(embedder, Arc::new(index), reranker, chat, PipelineParams::from(settings))?)
    }

    pub fn params(&self) -> PipelineParams {
        self.params
    }

    /// Answer `question` from the indexed corpus.
    ///
    /// An empty retrieval is a successful result carrying the
    /// insufficient-evidence sentinel and no sources. Stage failures come
    /// back as the matching [`Error`] variant.
    pub async fn answer(&self, question: &str) -> micarag_core::Result<QueryResult> {
        let start = Instant::now();

        enter(Stage::Embedding);
        let embedder = Arc::clone(&self.embedder);
        let q = question.to_string();
        let vector = tokio::task::spawn_blocking(move || embedder.embed(&q, EmbedRole::Query))
            .await
            .map_err(|e| Error::Embedding(format!("embedding task failed: {e}")))??;

        enter(Stage::Retrieving);
        let candidates = self.index.search(&vector, self.params.top_k).await?;
        if candidates.is_empty() {
            enter(Stage::Done);
            tracing::info!(elapsed_ms = start.elapsed().as_millis() as u64, "no candidates, insufficient evidence");
            return Ok(QueryResult::insufficient_evidence());
        }
        let retrieved = candidates.len();

        enter(Stage::Reranking);
        let reranker = Arc::clone(&self.reranker);
        let q = question.to_string();
        let top_n = self.params.top_n;
        let ranked = tokio::task::spawn_blocking(move || micarag_rerank::rerank(reranker.as_ref(), &q, candidates, top_n))
            .await
            .map_err(|e| Error::Rerank(format!("rerank task failed: {e}")))??;

        enter(Stage::Assembling);
        let context = assemble(&ranked);

        enter(Stage::Generating);
        let answer = micarag_llm::generate(self.chat.as_ref(), SYSTEM_DIRECTIVE, &user_turn(question, &context)).await?;

        enter(Stage::Done);
        tracing::info!(
            candidates = retrieved,
            sources = ranked.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "answered"
        );
        // A sentinel answer never carries sources, even when the model produced it.
        if is_sentinel_reply(&answer) {
            return Ok(QueryResult::insufficient_evidence());
        }
        Ok(QueryResult { answer, sources: ranked.iter().map(SourceRef::from).collect() })
    }
}

/// The directive quotes the sentinel, so models often echo it in quotes.
fn is_sentinel_reply(reply: &str) -> bool {
    reply.trim().trim_matches(|c| c == '\'' || c == '"').trim() == micarag_core::types::INSUFFICIENT_EVIDENCE
}
