//! Locating and loading local Hugging Face model snapshots.
//!
//! A model id such as `intfloat/multilingual-e5-small` resolves, in order, to:
//! the id itself when it is an existing directory, `<models_dir>/<id>`, and
//! `<models_dir>/<last id segment>`.

use anyhow::{anyhow, Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub fn resolve_model_dir(model_id: &str, models_dir: &Path) -> Result<PathBuf> {
    let mut candidates = vec![PathBuf::from(model_id), models_dir.join(model_id)];
    if let Some(last) = model_id.rsplit('/').next() {
        candidates.push(models_dir.join(last));
    }
    for dir in &candidates {
        if dir.join("config.json").is_file() {
            tracing::info!(model = model_id, dir = %dir.display(), "using model dir");
            return Ok(dir.clone());
        }
    }
    Err(anyhow!(
        "Could not locate model '{}'. Checked: {}",
        model_id,
        candidates.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
    ))
}

/// The two encoder sizes the embedder and reranker need from `config.json`.
#[derive(Debug, Clone, Copy, serde::Deserialize)]
pub struct EncoderDims {
    pub hidden_size: usize,
    pub max_position_embeddings: usize,
}

pub fn read_config<T: serde::de::DeserializeOwned>(model_dir: &Path) -> Result<T> {
    let path = model_dir.join("config.json");
    let raw = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

/// Weights from `model.safetensors`, falling back to `pytorch_model.bin`.
pub fn load_weights(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let safetensors = model_dir.join("model.safetensors");
    let tensors: HashMap<String, Tensor> = if safetensors.is_file() {
        candle_core::safetensors::load(&safetensors, device)?
    } else {
        let bin = model_dir.join("pytorch_model.bin");
        if !bin.is_file() {
            return Err(anyhow!("No model.safetensors or pytorch_model.bin in {}", model_dir.display()));
        }
        candle_core::pickle::read_all(&bin)?.into_iter().collect()
    };
    Ok(VarBuilder::from_tensors(tensors, DType::F32, device))
}
