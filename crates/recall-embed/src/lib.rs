use anyhow::Result;
use std::sync::Arc;

use recall_core::settings::EmbeddingConfig;
pub use recall_core::traits::Embedder;

pub mod fake;
pub mod http;

pub use fake::FakeEmbedder;
pub use http::HttpEmbedder;

/// Scale `v` to unit length in place. A zero vector stays zero.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm <= f32::EPSILON { return; }
    for x in v.iter_mut() { *x /= norm; }
}

fn fake_requested(config: &EmbeddingConfig) -> bool {
    let env = std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
    env || config.use_fake || config.provider.eq_ignore_ascii_case("fake")
}

/// The embedder described by `config`; `APP_USE_FAKE_EMBEDDINGS=1` forces the
/// deterministic hashing embedder regardless of provider.
pub fn get_default_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    if fake_requested(config) {
        tracing::info!(dim = config.dim, "using fake embedder");
        return Ok(Arc::new(FakeEmbedder::new(config.dim)));
    }
    let embedder = HttpEmbedder::new(config)?;
    tracing::info!(id = embedder.embedder_id(), "using http embedder");
    Ok(Arc::new(embedder))
}
