use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use recall_core::settings::EmbeddingConfig;
use recall_core::text::truncate_chars;
use recall_core::traits::Embedder;

use crate::l2_normalize;

/// Per-text character cap sent to the embedding API.
const MAX_EMBED_CHARS: usize = 3_000;

/// Embedding client for Ollama (`/api/embed`) and OpenAI-compatible
/// (`/v1/embeddings`) servers.
pub struct HttpEmbedder {
    client: reqwest::Client,
    provider: Provider,
    base_url: String,
    model: String,
    api_key: Option<String>,
    dim: usize,
    id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Provider { Ollama, OpenAi }

impl HttpEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let provider = match config.provider.to_ascii_lowercase().as_str() {
            "ollama" => Provider::Ollama,
            "openai" => Provider::OpenAi,
            other => anyhow::bail!("Unknown embedding provider: {other}"),
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            provider,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            dim: config.dim,
            id: format!("{}:{}:d{}", config.provider.to_ascii_lowercase(), config.model, config.dim),
        })
    }

    async fn embed_ollama(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/api/embed", self.base_url);
        let req = OllamaEmbedRequest { model: self.model.clone(), input: texts, truncate: true };
        let resp = self.client.post(&url).json(&req).send().await
            .context("Failed to call Ollama embed API")?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Ollama embed API returned {status}: {body}");
        }
        let body: OllamaEmbedResponse = resp.json().await.context("Failed to parse Ollama embed response")?;
        Ok(body.embeddings)
    }

    async fn embed_openai(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/v1/embeddings", self.base_url);
        let api_key = self.api_key.as_deref().unwrap_or_default();
        let req = OpenAiEmbedRequest { model: self.model.clone(), input: texts };
        let resp = self.client.post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&req)
            .send()
            .await
            .context("Failed to call OpenAI embed API")?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI embed API returned {status}: {body}");
        }
        let body: OpenAiEmbedResponse = resp.json().await.context("Failed to parse OpenAI embed response")?;
        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn embedder_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() { return Ok(Vec::new()); }
        let truncated: Vec<String> = texts.iter().map(|t| truncate_chars(t, MAX_EMBED_CHARS).to_string()).collect();
        let mut vectors = match self.provider {
            Provider::Ollama => self.embed_ollama(truncated).await?,
            Provider::OpenAi => self.embed_openai(truncated).await?,
        };
        if vectors.len() != texts.len() {
            anyhow::bail!("embedding API returned {} vectors for {} inputs", vectors.len(), texts.len());
        }
        for v in &mut vectors {
            if v.len() != self.dim {
                anyhow::bail!("embedding dimension {} does not match configured {}", v.len(), self.dim);
            }
            l2_normalize(v);
        }
        Ok(vectors)
    }
}

#[derive(Serialize)]
struct OllamaEmbedRequest {
    model: String,
    input: Vec<String>,
    truncate: bool,
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Serialize)]
struct OpenAiEmbedRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Deserialize)]
struct OpenAiEmbedResponse {
    data: Vec<OpenAiEmbedData>,
}

#[derive(Deserialize)]
struct OpenAiEmbedData {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_provider_is_rejected() {
        let config = EmbeddingConfig { provider: "nope".into(), ..EmbeddingConfig::default() };
        assert!(HttpEmbedder::new(&config).is_err());
    }

    #[test]
    fn id_names_provider_model_and_dim() {
        let config = EmbeddingConfig::default();
        let e = HttpEmbedder::new(&config).expect("embedder");
        assert_eq!(e.embedder_id(), format!("ollama:{}:d{}", config.model, config.dim));
    }
}
