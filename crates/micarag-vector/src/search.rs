use arrow_array::{Array, Float32Array, Int32Array, RecordBatch, StringArray};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType};
use std::time::{Duration, Instant};

use micarag_core::error::{Error, Result};
use micarag_core::traits::VectorIndex;
use micarag_core::types::{Candidate, ChunkRecord};

use crate::schema::{validate_schema, DISTANCE_COLUMN};
use crate::table::{open_db, table_exists, unavailable};

/// Read-only cosine search over one LanceDB chunk table.
pub struct LanceIndex {
    db: Connection,
    table_name: String,
    timeout: Duration,
}

impl LanceIndex {
    pub async fn connect(uri: &str, table_name: &str, timeout: Duration) -> Result<Self> {
        let db = open_db(uri).await?;
        Ok(Self { db, table_name: table_name.to_string(), timeout })
    }

    async fn search_table(&self, vector: &[f32], limit: usize) -> Result<Vec<Candidate>> {
        if !table_exists(&self.db, &self.table_name).await? {
            tracing::debug!(table = %self.table_name, "table does not exist, treating as empty");
            return Ok(vec![]);
        }
        let table = self.db.open_table(&self.table_name).execute().await.map_err(unavailable)?;
        if table.count_rows(None).await.map_err(unavailable)? == 0 {
            return Ok(vec![]);
        }
        let schema = table.schema().await.map_err(unavailable)?;
        validate_schema(&schema, vector.len())?;

        let mut stream = table
            .vector_search(vector.to_vec())
            .map_err(unavailable)?
            .distance_type(DistanceType::Cosine)
            .limit(limit)
            .execute()
            .await
            .map_err(unavailable)?;
        let mut out = Vec::new();
        while let Some(batch) = stream.try_next().await.map_err(unavailable)? {
            out.extend(decode_batch(&batch)?);
        }
        out.sort_by(|a, b| b.score.total_cmp(&a.score));
        out.truncate(limit);
        Ok(out)
    }
}

#[async_trait]
impl VectorIndex for LanceIndex {
    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<Candidate>> {
        if limit == 0 {
            return Ok(vec![]);
        }
        let start = Instant::now();
        let hits = tokio::time::timeout(self.timeout, self.search_table(vector, limit))
            .await
            .map_err(|_| Error::IndexUnavailable(format!("search timed out after {} ms", self.timeout.as_millis())))??;
        tracing::debug!(table = %self.table_name, limit, hits = hits.len(), elapsed_ms = start.elapsed().as_millis() as u64, "vector search");
        Ok(hits)
    }
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| Error::SchemaMismatch(format!("column '{name}' missing or mistyped in search results")))
}

fn required<'a>(col: &'a StringArray, name: &str, row: usize) -> Result<&'a str> {
    if col.is_null(row) {
        return Err(Error::SchemaMismatch(format!("row {row}: '{name}' is null")));
    }
    Ok(col.value(row))
}

/// Turn one result batch into candidates, rejecting rows that break the payload contract.
pub fn decode_batch(batch: &RecordBatch) -> Result<Vec<Candidate>> {
    let doc_ids = column::<StringArray>(batch, "doc_id")?;
    let titles = column::<StringArray>(batch, "title")?;
    let chunk_ids = column::<Int32Array>(batch, "chunk_id")?;
    let texts = column::<StringArray>(batch, "text")?;
    let urls = column::<StringArray>(batch, "source_url")?;
    let distances = column::<Float32Array>(batch, DISTANCE_COLUMN)?;

    (0..batch.num_rows())
        .map(|i| {
            if chunk_ids.is_null(i) {
                return Err(Error::SchemaMismatch(format!("row {i}: 'chunk_id' is null")));
            }
            let chunk_id = u32::try_from(chunk_ids.value(i))
                .map_err(|_| Error::SchemaMismatch(format!("row {i}: negative chunk_id {}", chunk_ids.value(i))))?;
            let chunk = ChunkRecord {
                doc_id: required(doc_ids, "doc_id", i)?.to_string(),
                title: required(titles, "title", i)?.to_string(),
                chunk_id,
                text: required(texts, "text", i)?.to_string(),
                source_url: (!urls.is_null(i)).then(|| urls.value(i).to_string()),
            };
            // cosine distance is 1 - similarity
            Ok(Candidate::new(chunk, 1.0 - distances.value(i)))
        })
        .collect()
}
