use async_trait::async_trait;
use std::time::Duration;

/// Text → fixed-dimension embedding.
///
/// Implementations must return L2-normalized vectors of length `dim()` so
/// that an inner product equals cosine similarity.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `ollama:nomic-embed-text:d768`).
    fn embedder_id(&self) -> &str;
    fn dim(&self) -> usize;
    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Prompt → completion text from an external language model.
#[async_trait]
pub trait Completer: Send + Sync {
    fn name(&self) -> &str;
    async fn complete(&self, prompt: &str, timeout: Duration) -> anyhow::Result<String>;
}
