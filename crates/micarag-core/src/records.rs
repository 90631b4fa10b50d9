//! Reader for the chunker's output: `*.jsonl` files with one chunk record per line.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::ChunkRecord;

/// Load every chunk record under `dir`, files in sorted path order.
///
/// Blank lines are skipped. A malformed line fails with its file and line
/// number, as does a repeated `(doc_id, chunk_id)` pair.
pub fn load_chunk_records(dir: &Path) -> Result<Vec<ChunkRecord>> {
    let files = list_jsonl_files(dir);
    if files.is_empty() {
        tracing::warn!(dir = %dir.display(), "no .jsonl files found");
        return Ok(vec![]);
    }
    let mut records = Vec::new();
    let mut seen: HashSet<(String, u32)> = HashSet::new();
    for (file_index, path) in files.iter().enumerate() {
        tracing::debug!(file = %path.display(), "reading chunk file {}/{}", file_index + 1, files.len());
        let before = records.len();
        for rec in read_jsonl(path)? {
            if !seen.insert((rec.doc_id.clone(), rec.chunk_id)) {
                anyhow::bail!(
                    "duplicate chunk ({}, {}) in {}",
                    rec.doc_id,
                    rec.chunk_id,
                    path.display()
                );
            }
            records.push(rec);
        }
        tracing::info!(file = %path.display(), chunks = records.len() - before, "loaded chunk file");
    }
    Ok(records)
}

fn read_jsonl(path: &Path) -> Result<Vec<ChunkRecord>> {
    let content = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str::<ChunkRecord>(line)
                .with_context(|| format!("{}:{}: invalid chunk record", path.display(), i + 1))
        })
        .collect()
}

fn list_jsonl_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("jsonl"))
        .collect();
    files.sort();
    files
}
