use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;

use micarag_core::traits::Embedder;
use micarag_core::types::{ChunkRecord, EmbedRole};
use micarag_vector::LanceWriter;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    pub indexed: usize,
    pub skipped: usize,
}

pub fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

async fn embed_batch(embedder: &Arc<dyn Embedder>, texts: Vec<String>) -> micarag_core::Result<Vec<Vec<f32>>> {
    let embedder = Arc::clone(embedder);
    tokio::task::spawn_blocking(move || embedder.embed_batch(&texts, EmbedRole::Passage))
        .await
        .map_err(|e| micarag_core::Error::Embedding(format!("embedding task failed: {e}")))?
}

/// Embed `records` as passages in batches of `batch_size` and upsert them.
///
/// A batch that fails to embed is retried one record at a time; records
/// that still fail are skipped and counted.
pub async fn index_records(
    embedder: Arc<dyn Embedder>,
    writer: &LanceWriter,
    records: &[ChunkRecord],
    batch_size: usize,
    pb: &ProgressBar,
) -> Result<IndexStats> {
    let mut stats = IndexStats::default();
    if records.is_empty() {
        return Ok(stats);
    }
    writer.ensure_table(embedder.dim()).await?;

    for batch in records.chunks(batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|r| r.text.clone()).collect();
        let (kept, vectors) = match embed_batch(&embedder, texts).await {
            Ok(vectors) => (batch.to_vec(), vectors),
            Err(e) => {
                tracing::warn!(error = %e, size = batch.len(), "batch embedding failed, retrying per record");
                let mut kept = Vec::new();
                let mut vectors = Vec::new();
                for record in batch {
                    match embed_batch(&embedder, vec![record.text.clone()]).await {
                        Ok(mut v) if v.len() == 1 => {
                            kept.push(record.clone());
                            vectors.append(&mut v);
                        }
                        Ok(_) => {
                            tracing::warn!(doc_id = %record.doc_id, chunk_id = record.chunk_id, "embedder returned no vector, skipping");
                            stats.skipped += 1;
                        }
                        Err(e) => {
                            tracing::warn!(doc_id = %record.doc_id, chunk_id = record.chunk_id, error = %e, "skipping chunk");
                            stats.skipped += 1;
                        }
                    }
                }
                (kept, vectors)
            }
        };
        stats.indexed += writer.upsert(&kept, &vectors).await?;
        pb.inc(batch.len() as u64);
    }
    Ok(stats)
}
