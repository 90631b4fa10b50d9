use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use micarag_core::error::{Error, Result};
use micarag_core::traits::{ChatModel, Embedder, Reranker, VectorIndex};
use micarag_core::types::{Candidate, ChatMessage, ChunkRecord, EmbedRole, SourceRef, INSUFFICIENT_EVIDENCE};
use micarag_embed::HashEmbedder;
use micarag_pipeline::{PipelineParams, RagPipeline, SYSTEM_DIRECTIVE};
use micarag_rerank::LexicalReranker;

fn chunk(doc: &str, chunk_id: u32, title: &str, text: &str) -> ChunkRecord {
    ChunkRecord { doc_id: doc.into(), title: title.into(), chunk_id, text: text.into(), source_url: None }
}

/// Returns its fixed candidates, best first, cut to `limit`.
struct StubIndex(Vec<Candidate>);

#[async_trait]
impl VectorIndex for StubIndex {
    async fn search(&self, _vector: &[f32], limit: usize) -> Result<Vec<Candidate>> {
        Ok(self.0.iter().take(limit).cloned().collect())
    }
}

struct DownIndex;

#[async_trait]
impl VectorIndex for DownIndex {
    async fn search(&self, _vector: &[f32], _limit: usize) -> Result<Vec<Candidate>> {
        Err(Error::IndexUnavailable("connection refused".into()))
    }
}

/// Scores passages by a fixed table keyed on the text.
struct TableReranker(Vec<(&'static str, f32)>);

impl Reranker for TableReranker {
    fn score(&self, _query: &str, passages: &[&str]) -> Result<Vec<f32>> {
        Ok(passages
            .iter()
            .map(|p| self.0.iter().find(|(t, _)| t == p).map_or(0.0, |(_, s)| *s))
            .collect())
    }
}

struct BrokenEmbedder;

impl Embedder for BrokenEmbedder {
    fn dim(&self) -> usize {
        4
    }
    fn max_len(&self) -> usize {
        4
    }
    fn embed(&self, _text: &str, _role: EmbedRole) -> Result<Vec<f32>> {
        Err(Error::Embedding("input exceeds 4 tokens".into()))
    }
    fn embed_batch(&self, _texts: &[String], _role: EmbedRole) -> Result<Vec<Vec<f32>>> {
        Err(Error::Embedding("input exceeds 4 tokens".into()))
    }
}

#[derive(Default)]
struct RecordingChat {
    reply: Option<String>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl RecordingChat {
    fn replying(reply: &str) -> Self {
        Self { reply: Some(reply.into()), calls: Mutex::default() }
    }
}

#[async_trait]
impl ChatModel for RecordingChat {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        self.calls.lock().unwrap().push(messages.to_vec());
        self.reply.clone().ok_or_else(|| Error::Generation("backend returned HTTP 500".into()))
    }
}

fn pipeline(
    index: impl VectorIndex + 'static,
    reranker: impl Reranker + 'static,
    chat: Arc<RecordingChat>,
    top_k: usize,
    top_n: usize,
) -> RagPipeline {
    RagPipeline::new(
        Arc::new(HashEmbedder::new(16)),
        Arc::new(index),
        Arc::new(reranker),
        chat,
        PipelineParams { top_k, top_n },
    )
    .unwrap()
}

fn corpus() -> Vec<Candidate> {
    vec![
        Candidate::new(chunk("mica.pdf", 0, "MiCA", "asset-referenced tokens"), 0.91),
        Candidate::new(chunk("mica.pdf", 1, "MiCA", "e-money tokens"), 0.88),
        Candidate::new(chunk("btc.pdf", 0, "Bitcoin", "proof of work"), 0.80),
        Candidate::new(chunk("eth.pdf", 2, "Ethereum", "smart contracts"), 0.75),
        Candidate::new(chunk("usdt.pdf", 5, "Tether", "reserve assets"), 0.60),
    ]
}

fn relevance() -> TableReranker {
    TableReranker(vec![
        ("reserve assets", 5.0),
        ("e-money tokens", 4.0),
        ("proof of work", 3.0),
        ("asset-referenced tokens", 2.0),
        ("smart contracts", 1.0),
    ])
}

fn keys(sources: &[SourceRef]) -> Vec<(String, u32)> {
    sources
        .iter()
        .map(|s| (s.doc_id.clone().unwrap_or_default(), s.chunk_id.unwrap_or_default()))
        .collect()
}

#[tokio::test]
async fn empty_index_returns_sentinel_without_generating() {
    let chat = Arc::new(RecordingChat::replying("should not be used"));
    let p = pipeline(StubIndex(vec![]), LexicalReranker, chat.clone(), 12, 5);
    let out = p.answer("x").await.unwrap();
    assert_eq!(out.answer, INSUFFICIENT_EVIDENCE);
    assert!(out.sources.is_empty());
    assert!(chat.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn single_chunk_yields_single_source() {
    let chat = Arc::new(RecordingChat::replying("Ciao [SOURCE: T | chunk 0]"));
    let index = StubIndex(vec![Candidate::new(chunk("d1", 0, "T", "hello"), 0.9)]);
    let out = pipeline(index, LexicalReranker, chat, 12, 5).answer("hello?").await.unwrap();
    assert_eq!(out.answer, "Ciao [SOURCE: T | chunk 0]");
    assert_eq!(
        out.sources,
        vec![SourceRef { title: Some("T".into()), doc_id: Some("d1".into()), chunk_id: Some(0), source_url: None }]
    );
}

#[tokio::test]
async fn sources_follow_rerank_order_and_top_n() {
    let chat = Arc::new(RecordingChat::replying("ok"));
    let out = pipeline(StubIndex(corpus()), relevance(), chat, 12, 3).answer("q").await.unwrap();
    assert_eq!(
        keys(&out.sources),
        [("usdt.pdf".to_string(), 5), ("mica.pdf".to_string(), 1), ("btc.pdf".to_string(), 0)]
    );
}

#[tokio::test]
async fn generator_sees_directive_and_grounded_context() {
    let chat = Arc::new(RecordingChat::replying("ok"));
    pipeline(StubIndex(corpus()), relevance(), chat.clone(), 12, 2).answer("Cosa sono gli EMT?").await.unwrap();
    let calls = chat.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let messages = &calls[0];
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content, SYSTEM_DIRECTIVE);
    assert_eq!(
        messages[1].content,
        "Domanda: Cosa sono gli EMT?\n\nCHUNK:\n[SOURCE: Tether | chunk 5]\nreserve assets\n\n---\n\n\
         [SOURCE: MiCA | chunk 1]\ne-money tokens\n\nRispondi in modo conciso e includi sempre citazioni [SOURCE: titolo | chunk]."
    );
}

#[tokio::test]
async fn tied_scores_keep_retrieval_order() {
    let index = StubIndex(vec![
        Candidate::new(chunk("b", 0, "B", "same"), 0.9),
        Candidate::new(chunk("a", 0, "A", "same"), 0.8),
    ]);
    let reranker = TableReranker(vec![("same", 0.9)]);
    let out = pipeline(index, reranker, Arc::new(RecordingChat::replying("ok")), 12, 5).answer("q").await.unwrap();
    assert_eq!(keys(&out.sources), [("b".to_string(), 0), ("a".to_string(), 0)]);
}

#[tokio::test]
async fn source_count_bounded_by_top_n_and_top_k() {
    for (k, n) in [(1, 1), (2, 2), (5, 3), (12, 5)] {
        let out = pipeline(StubIndex(corpus()), relevance(), Arc::new(RecordingChat::replying("ok")), k, n)
            .answer("q")
            .await
            .unwrap();
        assert!(!out.sources.is_empty());
        assert!(out.sources.len() <= n && out.sources.len() <= k, "k={k} n={n}");
    }
}

#[tokio::test]
async fn widening_retrieval_never_loses_a_better_source() {
    let run = |k| async move {
        let out = pipeline(StubIndex(corpus()), relevance(), Arc::new(RecordingChat::replying("ok")), k, 2)
            .answer("q")
            .await
            .unwrap();
        keys(&out.sources)
    };
    // With a larger K the top-N can only change by admitting higher-scored chunks.
    let narrow = run(3).await;
    let wide = run(5).await;
    assert_eq!(narrow, [("mica.pdf".to_string(), 1), ("btc.pdf".to_string(), 0)]);
    assert_eq!(wide, [("usdt.pdf".to_string(), 5), ("mica.pdf".to_string(), 1)]);
}

#[tokio::test]
async fn every_source_was_retrieved() {
    let retrieved: Vec<(String, u32)> = corpus().iter().map(|c| (c.chunk.doc_id.clone(), c.chunk.chunk_id)).collect();
    let out = pipeline(StubIndex(corpus()), LexicalReranker, Arc::new(RecordingChat::replying("ok")), 12, 5)
        .answer("tokens")
        .await
        .unwrap();
    for key in keys(&out.sources) {
        assert!(retrieved.contains(&key), "{key:?} was never retrieved");
    }
}

#[tokio::test]
async fn repeated_questions_give_identical_sources() {
    let p = pipeline(StubIndex(corpus()), LexicalReranker, Arc::new(RecordingChat::replying("ok")), 12, 5);
    let first = p.answer("e-money tokens").await.unwrap();
    let second = p.answer("e-money tokens").await.unwrap();
    assert_eq!(first.sources, second.sources);
}

#[tokio::test]
async fn declining_model_answer_drops_sources() {
    let chat = Arc::new(RecordingChat::replying(INSUFFICIENT_EVIDENCE));
    let out = pipeline(StubIndex(corpus()), relevance(), chat, 12, 5).answer("q").await.unwrap();
    assert!(out.is_insufficient_evidence());
    assert!(out.sources.is_empty());
}

#[tokio::test]
async fn quoted_declining_answer_drops_sources() {
    let chat = Arc::new(RecordingChat::replying(&format!("'{INSUFFICIENT_EVIDENCE}'")));
    let out = pipeline(StubIndex(corpus()), relevance(), chat, 12, 5).answer("q").await.unwrap();
    assert_eq!(out.answer, INSUFFICIENT_EVIDENCE);
    assert!(out.sources.is_empty());
}

#[tokio::test]
async fn index_failure_is_an_error_not_the_sentinel() {
    let err = pipeline(DownIndex, LexicalReranker, Arc::new(RecordingChat::replying("ok")), 12, 5)
        .answer("q")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::IndexUnavailable(_)));
}

#[tokio::test]
async fn generation_failure_propagates() {
    let chat = Arc::new(RecordingChat::default());
    let err = pipeline(StubIndex(corpus()), relevance(), chat, 12, 5).answer("q").await.unwrap_err();
    assert!(matches!(err, Error::Generation(_)));
}

#[tokio::test]
async fn embedding_failure_propagates() {
    let p = RagPipeline::new(
        Arc::new(BrokenEmbedder),
        Arc::new(StubIndex(corpus())),
        Arc::new(LexicalReranker),
        Arc::new(RecordingChat::replying("ok")),
        PipelineParams { top_k: 12, top_n: 5 },
    )
    .unwrap();
    assert!(matches!(p.answer("q").await, Err(Error::Embedding(_))));
}

#[tokio::test]
async fn rerank_failure_propagates() {
    struct NanReranker;
    impl Reranker for NanReranker {
        fn score(&self, _: &str, passages: &[&str]) -> Result<Vec<f32>> {
            Ok(vec![f32::NAN; passages.len()])
        }
    }
    let err = pipeline(StubIndex(corpus()), NanReranker, Arc::new(RecordingChat::replying("ok")), 12, 5)
        .answer("q")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Rerank(_)));
}

#[test]
fn zero_top_n_fails_construction() {
    let err = RagPipeline::new(
        Arc::new(HashEmbedder::new(16)),
        Arc::new(StubIndex(vec![])),
        Arc::new(LexicalReranker),
        Arc::new(RecordingChat::replying("ok")),
        PipelineParams { top_k: 12, top_n: 0 },
    )
    .err()
    .unwrap();
    assert!(matches!(err, Error::Configuration(_)));
}
