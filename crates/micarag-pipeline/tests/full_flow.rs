use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use micarag_core::error::Result;
use micarag_core::traits::{ChatModel, Embedder};
use micarag_core::types::{ChatMessage, ChunkRecord, EmbedRole, INSUFFICIENT_EVIDENCE};
use micarag_embed::HashEmbedder;
use micarag_pipeline::{PipelineParams, RagPipeline};
use micarag_rerank::LexicalReranker;
use micarag_vector::{LanceIndex, LanceWriter};
use tempfile::TempDir;

const TABLE: &str = "crypto_mica_test";

struct CitingChat;

#[async_trait]
impl ChatModel for CitingChat {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        // Echo the first citation tag of the context back.
        let user = &messages[1].content;
        let tag = user.split('\n').find(|l| l.starts_with("[SOURCE:")).unwrap_or_default();
        Ok(format!("Vedi {tag}"))
    }
}

fn records() -> Vec<ChunkRecord> {
    let rec = |doc: &str, id: u32, title: &str, body: &str| ChunkRecord {
        doc_id: doc.into(),
        title: title.into(),
        chunk_id: id,
        text: format!("[DOC_TITLE: {title}]\n{body}"),
        source_url: Some(format!("https://example.org/{doc}")),
    };
    vec![
        rec("mica.pdf", 0, "MiCA", "issuers of e-money tokens must be authorised"),
        rec("mica.pdf", 1, "MiCA", "asset-referenced tokens need a white paper"),
        rec("btc.pdf", 0, "Bitcoin", "a peer-to-peer electronic cash system"),
        rec("eth.pdf", 0, "Ethereum", "a platform for smart contracts"),
    ]
}

async fn pipeline_over(dir: &TempDir, embedder: Arc<HashEmbedder>) -> RagPipeline {
    let index = LanceIndex::connect(dir.path().to_str().unwrap(), TABLE, Duration::from_secs(10)).await.expect("index");
    RagPipeline::new(embedder, Arc::new(index), Arc::new(LexicalReranker), Arc::new(CitingChat), PipelineParams { top_k: 4, top_n: 2 })
        .expect("pipeline")
}

#[tokio::test]
async fn answers_from_an_indexed_corpus() {
    let tmp = TempDir::new().expect("tmp");
    let embedder = Arc::new(HashEmbedder::new(64));
    let records = records();
    let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
    let vectors = embedder.embed_batch(&texts, EmbedRole::Passage).expect("embed");
    let writer = LanceWriter::open(tmp.path().to_str().unwrap(), TABLE).await.expect("writer");
    writer.upsert(&records, &vectors).await.expect("upsert");

    let p = pipeline_over(&tmp, embedder).await;
    let out = p.answer("who issues e-money tokens?").await.expect("answer");
    assert_eq!(out.sources.len(), 2);
    let top = &out.sources[0];
    assert_eq!(top.doc_id.as_deref(), Some("mica.pdf"));
    assert_eq!(top.chunk_id, Some(0));
    assert_eq!(top.source_url.as_deref(), Some("https://example.org/mica.pdf"));
    assert_eq!(out.answer, "Vedi [SOURCE: MiCA | chunk 0]");
}

#[tokio::test]
async fn empty_index_answers_with_sentinel() {
    let tmp = TempDir::new().expect("tmp");
    let p = pipeline_over(&tmp, Arc::new(HashEmbedder::new(64))).await;
    let out = p.answer("x").await.expect("answer");
    assert_eq!(out.answer, INSUFFICIENT_EVIDENCE);
    assert!(out.sources.is_empty());
}
