//! HTTP completion client for the summarization pass.
//!
//! One struct for three wire formats, distinguished only by provider name:
//! Ollama `/api/generate`, OpenAI-compatible `/v1/chat/completions` and
//! Gemini `generateContent`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use recall_core::settings::SummaryConfig;
use recall_core::traits::Completer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Provider { Ollama, OpenAi, Gemini }

pub struct HttpCompleter {
    name: String,
    provider: Provider,
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpCompleter {
    pub fn new(config: &SummaryConfig) -> Result<Self> {
        let provider = match config.provider.to_ascii_lowercase().as_str() {
            "ollama" => Provider::Ollama,
            "openai" => Provider::OpenAi,
            "gemini" => Provider::Gemini,
            other => anyhow::bail!("Unknown summary provider: {other}"),
        };
        let api_key = config.api_key.clone().unwrap_or_default();
        if provider == Provider::Gemini && api_key.is_empty() {
            anyhow::bail!("summary.api_key is required for the gemini provider");
        }
        Ok(Self {
            name: format!("{}:{}", config.provider.to_ascii_lowercase(), config.model),
            provider,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            client: reqwest::Client::new(),
        })
    }

    fn apply_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.provider == Provider::OpenAi && !self.api_key.is_empty() {
            req.header("Authorization", format!("Bearer {}", self.api_key))
        } else {
            req
        }
    }

    async fn post(&self, url: &str, body: serde_json::Value, timeout: Duration) -> Result<reqwest::Response> {
        let resp = self.apply_auth(self.client.post(url))
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to call {} completion API", self.name))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("{} completion API returned {status}: {text}", self.name);
        }
        Ok(resp)
    }
}

#[async_trait]
impl Completer for HttpCompleter {
    fn name(&self) -> &str { &self.name }

    async fn complete(&self, prompt: &str, timeout: Duration) -> Result<String> {
        match self.provider {
            Provider::Ollama => {
                let url = format!("{}/api/generate", self.base_url);
                let body = json!({ "model": self.model, "prompt": prompt, "stream": false });
                let resp: OllamaGenerateResponse = self.post(&url, body, timeout).await?
                    .json().await.context("Failed to parse Ollama generate response")?;
                Ok(resp.response)
            }
            Provider::OpenAi => {
                let url = format!("{}/v1/chat/completions", self.base_url);
                let body = json!({
                    "model": self.model,
                    "messages": [{ "role": "user", "content": prompt }],
                    "temperature": 0.2,
                });
                let resp: ChatResponse = self.post(&url, body, timeout).await?
                    .json().await.context("Failed to parse chat completion response")?;
                resp.choices.into_iter().next()
                    .and_then(|c| c.message.content)
                    .context("chat completion returned no content")
            }
            Provider::Gemini => {
                let url = format!("{}/v1beta/models/{}:generateContent?key={}", self.base_url, self.model, self.api_key);
                let body = json!({ "contents": [{ "parts": [{ "text": prompt }] }] });
                let resp: GeminiResponse = self.post(&url, body, timeout).await?
                    .json().await.context("Failed to parse Gemini response")?;
                let text: String = resp.candidates.into_iter().next()
                    .map(|c| c.content.parts.into_iter().filter_map(|p| p.text).collect())
                    .unwrap_or_default();
                if text.is_empty() { anyhow::bail!("Gemini returned no candidates"); }
                Ok(text)
            }
        }
    }
}

#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
struct GeminiPart {
    text: Option<String>,
}
