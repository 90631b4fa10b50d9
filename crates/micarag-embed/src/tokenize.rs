use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use tokenizers::{Encoding, Tokenizer};

/// Right-padded model inputs for a batch of encodings, each `[B,T]`.
pub struct BatchInputs {
    pub input_ids: Tensor,
    pub token_type_ids: Tensor,
    pub attention_mask: Tensor,
}

/// Load a `tokenizer.json` with any embedded padding or truncation removed,
/// so callers decide both explicitly.
pub fn load_tokenizer(path: &std::path::Path) -> Result<Tokenizer> {
    let mut tokenizer = Tokenizer::from_file(path)
        .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", path.display(), e))?;
    tokenizer
        .with_padding(None)
        .with_truncation(None)
        .map_err(|e| anyhow!("Failed to reset truncation for {}: {}", path.display(), e))?;
    Ok(tokenizer)
}

/// Id used to fill padded positions; masked out, so only needs to be valid.
pub fn pad_token_id(tokenizer: &Tokenizer) -> u32 {
    tokenizer
        .token_to_id("<pad>")
        .or_else(|| tokenizer.token_to_id("[PAD]"))
        .unwrap_or(0)
}

/// Pad every encoding to the longest one in the batch and stack into tensors.
pub fn pad_batch(encodings: &[Encoding], pad_id: u32, device: &Device) -> candle_core::Result<BatchInputs> {
    let batch = encodings.len();
    let max_len = encodings.iter().map(|e| e.get_ids().len()).max().unwrap_or(0);
    let mut ids = Vec::with_capacity(batch * max_len);
    let mut type_ids = Vec::with_capacity(batch * max_len);
    let mut mask = Vec::with_capacity(batch * max_len);
    for enc in encodings {
        let pad = max_len - enc.get_ids().len();
        ids.extend_from_slice(enc.get_ids());
        ids.extend(std::iter::repeat(pad_id).take(pad));
        type_ids.extend_from_slice(enc.get_type_ids());
        type_ids.extend(std::iter::repeat(0u32).take(pad));
        mask.extend_from_slice(enc.get_attention_mask());
        mask.extend(std::iter::repeat(0u32).take(pad));
    }
    Ok(BatchInputs {
        input_ids: Tensor::from_vec(ids, (batch, max_len), device)?,
        token_type_ids: Tensor::from_vec(type_ids, (batch, max_len), device)?,
        attention_mask: Tensor::from_vec(mask, (batch, max_len), device)?,
    })
}
