use anyhow::{anyhow, Result};
use candle_core::{Device, IndexOp, Tensor};
use candle_nn::{Linear, Module};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use std::path::Path;
use std::time::Instant;
use tokenizers::{Encoding, Tokenizer, TruncationParams, TruncationStrategy};

use micarag_core::error::Error;
use micarag_core::traits::Reranker;
use micarag_embed::device::select_device;
use micarag_embed::model_files::{load_weights, read_config, resolve_model_dir, EncoderDims};
use micarag_embed::tokenize::{load_tokenizer, pad_batch, pad_token_id};

/// BERT sequence-classification cross-encoder (ms-marco MiniLM and kin):
/// `[CLS] query [SEP] passage [SEP]` → pooler (dense + tanh) → one logit.
///
/// Pairs longer than `max_len` tokens are cut longest-first from the end,
/// so the tail of a long passage does not contribute to its score.
pub struct CrossEncoder {
    bert: BertModel,
    pooler: Linear,
    classifier: Linear,
    tokenizer: Tokenizer,
    device: Device,
    model_id: String,
    pad_id: u32,
}

impl CrossEncoder {
    pub fn load(model_id: &str, models_dir: &Path, max_len: usize) -> Result<Self> {
        let device = select_device();
        let model_dir = resolve_model_dir(model_id, models_dir)?;
        let config: BertConfig = read_config(&model_dir)?;
        let dims: EncoderDims = read_config(&model_dir)?;
        let max_len = max_len.min(dims.max_position_embeddings);

        let mut tokenizer = load_tokenizer(&model_dir.join("tokenizer.json"))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_len,
                strategy: TruncationStrategy::LongestFirst,
                ..Default::default()
            }))
            .map_err(|e| anyhow!("Failed to configure truncation for {model_id}: {e}"))?;

        let vb = load_weights(&model_dir, &device)?;
        let bert = BertModel::load(vb.clone(), &config).map_err(|e| anyhow!("Failed to build {model_id}: {e}"))?;
        let hidden = dims.hidden_size;
        let pooler = candle_nn::linear(hidden, hidden, vb.pp("bert.pooler.dense"))?;
        let classifier = candle_nn::linear(hidden, 1, vb.pp("classifier"))?;
        let pad_id = pad_token_id(&tokenizer);
        tracing::info!(model = model_id, max_len, "reranker loaded");
        Ok(Self { bert, pooler, classifier, tokenizer, device, model_id: model_id.to_string(), pad_id })
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    fn logits(&self, encodings: &[Encoding]) -> candle_core::Result<Vec<f32>> {
        let inputs = pad_batch(encodings, self.pad_id, &self.device)?;
        let hidden = self.bert.forward(&inputs.input_ids, &inputs.token_type_ids, Some(&inputs.attention_mask))?;
        let cls: Tensor = hidden.i((.., 0))?;
        let pooled = self.pooler.forward(&cls)?.tanh()?;
        let logits = self.classifier.forward(&pooled)?;
        logits.squeeze(1)?.to_device(&Device::Cpu)?.to_vec1::<f32>()
    }
}

impl Reranker for CrossEncoder {
    fn score(&self, query: &str, passages: &[&str]) -> micarag_core::Result<Vec<f32>> {
        if passages.is_empty() {
            return Ok(vec![]);
        }
        let start = Instant::now();
        let pairs: Vec<(&str, &str)> = passages.iter().map(|p| (query, *p)).collect();
        let encodings = self
            .tokenizer
            .encode_batch(pairs, true)
            .map_err(|e| Error::Rerank(format!("tokenization failed: {e}")))?;
        let truncated = encodings.iter().filter(|e| !e.get_overflowing().is_empty()).count();
        if truncated > 0 {
            tracing::debug!(truncated, "rerank pairs truncated to max length");
        }
        let scores = self.logits(&encodings).map_err(|e| Error::Rerank(format!("inference failed: {e}")))?;
        tracing::debug!(pairs = passages.len(), elapsed_ms = start.elapsed().as_millis() as u64, "cross-encoder scored");
        Ok(scores)
    }
}
