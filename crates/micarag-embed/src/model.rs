use anyhow::{anyhow, Result};
use candle_core::Device;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use std::path::Path;
use std::time::Instant;
use tokenizers::{Encoding, Tokenizer};

use micarag_core::error::Error;
use micarag_core::traits::Embedder;
use micarag_core::types::EmbedRole;

use crate::device::select_device;
use crate::model_files::{load_weights, read_config, resolve_model_dir, EncoderDims};
use crate::pool::masked_mean_l2;
use crate::tokenize::{load_tokenizer, pad_batch, pad_token_id};
use crate::with_role;

/// Sentence embedder over a BERT-family encoder (E5, MiniLM, ...): masked
/// mean pooling followed by L2 normalization.
pub struct BertEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    model_id: String,
    dim: usize,
    max_len: usize,
    pad_id: u32,
}

impl BertEmbedder {
    pub fn load(model_id: &str, models_dir: &Path) -> Result<Self> {
        let device = select_device();
        let model_dir = resolve_model_dir(model_id, models_dir)?;
        let tokenizer = load_tokenizer(&model_dir.join("tokenizer.json"))?;
        let config: BertConfig = read_config(&model_dir)?;
        let dims: EncoderDims = read_config(&model_dir)?;
        let vb = load_weights(&model_dir, &device)?;
        let model = BertModel::load(vb, &config).map_err(|e| anyhow!("Failed to build {model_id}: {e}"))?;
        let pad_id = pad_token_id(&tokenizer);
        tracing::info!(model = model_id, dim = dims.hidden_size, max_len = dims.max_position_embeddings, "embedding model loaded");
        Ok(Self {
            model,
            tokenizer,
            device,
            model_id: model_id.to_string(),
            dim: dims.hidden_size,
            max_len: dims.max_position_embeddings,
            pad_id,
        })
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    fn encode(&self, texts: &[&str]) -> micarag_core::Result<Vec<Encoding>> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| Error::Embedding(format!("tokenization failed: {e}")))?;
        for (i, enc) in encodings.iter().enumerate() {
            let len = enc.get_ids().len();
            if len > self.max_len || !enc.get_overflowing().is_empty() {
                return Err(Error::Embedding(format!(
                    "input {i} has {len} tokens, model '{}' accepts at most {}",
                    self.model_id, self.max_len
                )));
            }
        }
        Ok(encodings)
    }

    fn forward(&self, encodings: &[Encoding]) -> candle_core::Result<Vec<Vec<f32>>> {
        let inputs = pad_batch(encodings, self.pad_id, &self.device)?;
        let hidden = self.model.forward(&inputs.input_ids, &inputs.token_type_ids, Some(&inputs.attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &inputs.attention_mask)?;
        pooled.to_device(&Device::Cpu)?.to_vec2::<f32>()
    }

    fn run(&self, texts: &[String], role: EmbedRole) -> micarag_core::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let start = Instant::now();
        let framed: Vec<_> = texts.iter().map(|t| with_role(&self.model_id, role, t)).collect();
        let refs: Vec<&str> = framed.iter().map(|t| &**t).collect();
        let encodings = self.encode(&refs)?;
        let vectors = self.forward(&encodings).map_err(|e| Error::Embedding(format!("inference failed: {e}")))?;
        let elapsed = start.elapsed();
        if elapsed.as_millis() > 100 {
            tracing::warn!(batch = texts.len(), elapsed_ms = elapsed.as_millis() as u64, "slow embedding");
        }
        Ok(vectors)
    }
}

impl Embedder for BertEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn max_len(&self) -> usize {
        self.max_len
    }

    fn embed(&self, text: &str, role: EmbedRole) -> micarag_core::Result<Vec<f32>> {
        self.run(&[text.to_string()], role)?
            .pop()
            .ok_or_else(|| Error::Embedding("model returned no vector".into()))
    }

    fn embed_batch(&self, texts: &[String], role: EmbedRole) -> micarag_core::Result<Vec<Vec<f32>>> {
        self.run(texts, role)
    }
}
