use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use recall_core::settings::SummaryConfig;
use recall_core::text::char_len;
use recall_core::traits::Completer;

use crate::llm::HttpCompleter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    Summarized(String),
    /// The caller keeps its original context.
    Skipped { reason: String },
}

impl SummaryOutcome {
    fn skipped(reason: impl Into<String>) -> Self { Self::Skipped { reason: reason.into() } }
}

/// Optional compression of an assembled context. Never fails: every problem
/// becomes [`SummaryOutcome::Skipped`].
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, context: &str, query: &str, target_chars: usize) -> SummaryOutcome;
}

pub struct NoopSummarizer;

#[async_trait]
impl Summarizer for NoopSummarizer {
    async fn summarize(&self, _context: &str, _query: &str, _target_chars: usize) -> SummaryOutcome {
        SummaryOutcome::skipped("summarization disabled")
    }
}

/// Summarizer backed by an external language model.
pub struct LlmSummarizer {
    completer: Arc<dyn Completer>,
    timeout: Duration,
}

impl LlmSummarizer {
    pub fn new(completer: Arc<dyn Completer>, timeout: Duration) -> Self {
        Self { completer, timeout }
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(&self, context: &str, query: &str, target_chars: usize) -> SummaryOutcome {
        let input_chars = char_len(context);
        if input_chars == 0 {
            return SummaryOutcome::skipped("empty context");
        }
        if input_chars <= target_chars {
            return SummaryOutcome::skipped("context already within target length");
        }

        let prompt = build_prompt(context, query, target_chars);
        let outcome = match tokio::time::timeout(self.timeout, self.completer.complete(&prompt, self.timeout)).await {
            Err(_) => SummaryOutcome::skipped(format!("timed out after {}s", self.timeout.as_secs())),
            Ok(Err(e)) => SummaryOutcome::skipped(format!("completion failed: {e}")),
            Ok(Ok(text)) => match validate(&text, input_chars) {
                Ok(summary) => SummaryOutcome::Summarized(summary),
                Err(reason) => SummaryOutcome::skipped(reason),
            },
        };
        match &outcome {
            SummaryOutcome::Summarized(s) => tracing::info!(completer = self.completer.name(), from = input_chars, to = char_len(s), "context summarized"),
            SummaryOutcome::Skipped { reason } => tracing::warn!(completer = self.completer.name(), %reason, "summarization skipped"),
        }
        outcome
    }
}

/// The summarizer described by `config`: a no-op when disabled.
pub fn build_summarizer(config: &SummaryConfig) -> Result<Arc<dyn Summarizer>> {
    if !config.enabled {
        return Ok(Arc::new(NoopSummarizer));
    }
    let completer = HttpCompleter::new(config)?;
    Ok(Arc::new(LlmSummarizer::new(Arc::new(completer), Duration::from_secs(config.timeout_secs))))
}

fn build_prompt(context: &str, query: &str, target_chars: usize) -> String {
    format!(
        "You compress reference material for another assistant.\n\
         Question: {query}\n\
         Keep only facts relevant to the question. Keep names, numbers, dates and file labels \
         (lines like `--- name ---`) exactly as written. Do not add anything that is not in the material. \
         Answer in the language of the material, in at most {target_chars} characters.\n\n\
         Material:\n{context}"
    )
}

/// Trimmed summary, or why it was rejected.
fn validate(text: &str, input_chars: usize) -> std::result::Result<String, String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err("empty response".to_string());
    }
    if trimmed.chars().any(|c| c == '\0' || (c.is_control() && !matches!(c, '\n' | '\r' | '\t'))) {
        return Err("malformed response (control characters)".to_string());
    }
    let chars = char_len(trimmed);
    if chars > input_chars {
        return Err(format!("response ({chars} chars) is larger than the input ({input_chars} chars)"));
    }
    Ok(trimmed.to_string())
}
