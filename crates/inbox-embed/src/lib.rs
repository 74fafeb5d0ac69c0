//! Embedding-model collaborators: a local candle BGE-M3 model, an
//! OpenAI-compatible HTTP client and a deterministic hash embedder.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use inbox_core::config::{EmbeddingProviderKind, EmbeddingSettings};
use inbox_core::traits::Embedder;

pub mod device;
pub mod hash;
pub mod http;
pub mod local;
pub mod openai;
pub mod pool;
pub mod tokenize;

pub use hash::HashEmbedder;
pub use local::BgeM3Embedder;
pub use openai::OpenAiEmbedder;
pub use pool::masked_mean_l2;

pub const FAKE_EMBEDDINGS_ENV: &str = "APP_USE_FAKE_EMBEDDINGS";

fn fake_embeddings_forced() -> bool {
    std::env::var(FAKE_EMBEDDINGS_ENV)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Builds the configured embedder. `APP_USE_FAKE_EMBEDDINGS=1` forces the
/// hash embedder regardless of configuration.
pub fn build_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    if fake_embeddings_forced() {
        info!(dim = settings.dim, "using hash embedder ({FAKE_EMBEDDINGS_ENV})");
        return Ok(Arc::new(HashEmbedder::new(settings.dim)));
    }
    let embedder: Arc<dyn Embedder> = match settings.provider {
        EmbeddingProviderKind::OpenAi => Arc::new(OpenAiEmbedder::from_env(&settings.api_base, &settings.model)?),
        EmbeddingProviderKind::Local => Arc::new(BgeM3Embedder::load(settings.model_dir.as_deref())?),
        EmbeddingProviderKind::Hash => Arc::new(HashEmbedder::new(settings.dim)),
    };
    info!(provider = ?settings.provider, model = embedder.model_key(), "embedder ready");
    Ok(embedder)
}
