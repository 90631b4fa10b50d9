use anyhow::{anyhow, bail, Context, Result};
use arrow_array::{FixedSizeListArray, Int32Array, RecordBatch, RecordBatchIterator, StringArray};
use lancedb::Connection;
use std::sync::Arc;

use micarag_core::types::ChunkRecord;

use crate::schema::{build_chunk_schema, vector_dim};
use crate::table::{ensure_table, open_db, table_exists};

/// Write side of the chunk table, used by the indexer.
pub struct LanceWriter {
    db: Connection,
    table_name: String,
}

impl LanceWriter {
    pub async fn open(uri: &str, table_name: &str) -> Result<Self> {
        let db = open_db(uri).await?;
        Ok(Self { db, table_name: table_name.to_string() })
    }

    /// Create the table for `dim`-sized vectors, or check that the existing
    /// one was built with the same dimension.
    pub async fn ensure_table(&self, dim: usize) -> Result<()> {
        let dim = i32::try_from(dim).context("embedding dimension overflows i32")?;
        if table_exists(&self.db, &self.table_name).await? {
            let table = self.db.open_table(&self.table_name).execute().await?;
            let schema = table.schema().await?;
            match vector_dim(&schema) {
                Some(d) if d == dim => return Ok(()),
                Some(d) => bail!("table '{}' stores {d}-dim vectors, embedder produces {dim}", self.table_name),
                None => bail!("table '{}' has no vector column", self.table_name),
            }
        }
        ensure_table(&self.db, &self.table_name, build_chunk_schema(dim)).await?;
        Ok(())
    }

    /// Insert or replace rows keyed by `(doc_id, chunk_id)`. Re-running with
    /// the same records leaves the row count unchanged.
    pub async fn upsert(&self, records: &[ChunkRecord], vectors: &[Vec<f32>]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        if records.len() != vectors.len() {
            bail!("{} records but {} vectors", records.len(), vectors.len());
        }
        let dim = vectors[0].len();
        if let Some(bad) = vectors.iter().position(|v| v.len() != dim) {
            bail!("vector {bad} has dimension {}, expected {dim}", vectors[bad].len());
        }
        self.ensure_table(dim).await?;

        let batch = to_record_batch(records, vectors, dim as i32)?;
        let schema = batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
        let table = self.db.open_table(&self.table_name).execute().await?;
        let mut mi = table.merge_insert(&["doc_id", "chunk_id"]);
        mi.when_matched_update_all(None).when_not_matched_insert_all();
        mi.execute(reader).await?;
        tracing::debug!(table = %self.table_name, rows = records.len(), "upserted chunks");
        Ok(records.len())
    }

    pub async fn count(&self) -> Result<usize> {
        if !table_exists(&self.db, &self.table_name).await? {
            return Ok(0);
        }
        let table = self.db.open_table(&self.table_name).execute().await?;
        Ok(table.count_rows(None).await?)
    }
}

fn to_record_batch(records: &[ChunkRecord], vectors: &[Vec<f32>], dim: i32) -> Result<RecordBatch> {
    let chunk_ids = records
        .iter()
        .map(|r| i32::try_from(r.chunk_id).map_err(|_| anyhow!("chunk_id {} of {} overflows i32", r.chunk_id, r.doc_id)))
        .collect::<Result<Vec<i32>>>()?;
    let vectors = vectors.iter().map(|v| Some(v.iter().copied().map(Some).collect::<Vec<_>>()));

    Ok(RecordBatch::try_new(
        build_chunk_schema(dim),
        vec![
            Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.doc_id.as_str()))),
            Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.title.as_str()))),
            Arc::new(Int32Array::from(chunk_ids)),
            Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.text.as_str()))),
            Arc::new(records.iter().map(|r| r.source_url.as_deref()).collect::<StringArray>()),
            Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors, dim)),
        ],
    )?)
}
