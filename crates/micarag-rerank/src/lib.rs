//! Second-stage ranking: re-order retrieved candidates by a cross-encoder
//! score and keep the best `keep`.
//!
//! The cross-encoder reads query and passage together, which is more precise
//! than comparing independent embeddings but far more expensive, so it only
//! ever sees the `top_k` retrieved candidates.

use anyhow::Result;
use std::sync::Arc;

use micarag_core::config::RagSettings;
use micarag_core::error::Error;
use micarag_core::traits::Reranker;
use micarag_core::types::Candidate;

pub mod cross_encoder;
pub mod lexical;

pub use cross_encoder::CrossEncoder;
pub use lexical::LexicalReranker;

/// Score every candidate against `question` and keep the `keep` best.
///
/// Output length is `min(keep, candidates.len())`; each kept candidate
/// carries its rerank score.
pub fn rerank(
    model: &dyn Reranker,
    question: &str,
    candidates: Vec<Candidate>,
    keep: usize,
) -> micarag_core::Result<Vec<Candidate>> {
    if candidates.is_empty() || keep == 0 {
        return Ok(vec![]);
    }
    let passages: Vec<&str> = candidates.iter().map(|c| c.chunk.text.as_str()).collect();
    let scores = model.score(question, &passages)?;
    order_by_scores(candidates, &scores, keep)
}

/// Sort by descending score; equal scores keep their input order.
pub fn order_by_scores(candidates: Vec<Candidate>, scores: &[f32], keep: usize) -> micarag_core::Result<Vec<Candidate>> {
    if scores.len() != candidates.len() {
        return Err(Error::Rerank(format!(
            "got {} scores for {} candidates",
            scores.len(),
            candidates.len()
        )));
    }
    if let Some(bad) = scores.iter().position(|s| !s.is_finite()) {
        return Err(Error::Rerank(format!("non-finite score at position {bad}")));
    }
    let mut ranked: Vec<Candidate> = candidates
        .into_iter()
        .zip(scores)
        .map(|(mut c, &s)| {
            c.score = s;
            c
        })
        .collect();
    // `sort_by` is stable
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.truncate(keep);
    Ok(ranked)
}

pub fn use_fake_reranker() -> bool {
    std::env::var("APP_USE_FAKE_RERANKER")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// The configured cross-encoder, or the lexical reranker when
/// `APP_USE_FAKE_RERANKER=1`.
pub fn get_default_reranker(settings: &RagSettings) -> Result<Arc<dyn Reranker>> {
    if use_fake_reranker() {
        tracing::warn!("using LexicalReranker (APP_USE_FAKE_RERANKER)");
        return Ok(Arc::new(LexicalReranker));
    }
    Ok(Arc::new(CrossEncoder::load(
        &settings.reranker_model,
        &settings.models_path(),
        settings.reranker_max_len,
    )?))
}
