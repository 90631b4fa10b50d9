//! Embedding gateway: local candle encoders behind the core `Embedder` trait.

use anyhow::Result;
use std::borrow::Cow;
use std::sync::Arc;

use micarag_core::config::RagSettings;
use micarag_core::traits::Embedder;
use micarag_core::types::EmbedRole;

pub mod device;
pub mod fake;
pub mod model;
pub mod model_files;
pub mod pool;
pub mod tokenize;

pub use fake::HashEmbedder;
pub use model::BertEmbedder;
pub use pool::masked_mean_l2;

/// Dimension of the hash embedder, matching `multilingual-e5-small`.
pub const FAKE_EMBEDDING_DIM: usize = 384;

/// E5 models were trained with "query: " / "passage: " prefixes and embed
/// poorly without them.
pub fn requires_role_prefix(model_id: &str) -> bool {
    model_id.to_lowercase().contains("e5")
}

/// The text as the model `model_id` expects it for `role`.
pub fn with_role<'a>(model_id: &str, role: EmbedRole, text: &'a str) -> Cow<'a, str> {
    if requires_role_prefix(model_id) {
        Cow::Owned(format!("{}{}", role.prefix(), text))
    } else {
        Cow::Borrowed(text)
    }
}

pub fn use_fake_embeddings() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// The configured embedding model, or the hash embedder when
/// `APP_USE_FAKE_EMBEDDINGS=1`. Loaded once and shared.
pub fn get_default_embedder(settings: &RagSettings) -> Result<Arc<dyn Embedder>> {
    if use_fake_embeddings() {
        tracing::warn!("using HashEmbedder (APP_USE_FAKE_EMBEDDINGS)");
        return Ok(Arc::new(HashEmbedder::new(FAKE_EMBEDDING_DIM)));
    }
    Ok(Arc::new(BertEmbedder::load(&settings.embedding_model, &settings.models_path())?))
}
