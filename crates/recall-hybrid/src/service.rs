use anyhow::Result;
use indicatif::ProgressBar;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use recall_core::settings::Settings;
use recall_core::text::char_len;
use recall_core::traits::Embedder;
use recall_core::types::{RetrievalRequest, RetrievalResponse, SearchResult};
use recall_core::{Corpus, Error};
use recall_text::{LexicalScorer, QueryTerms};
use recall_vector::{IndexHandle, VectorIndex};

use crate::assemble::assemble;
use crate::filter::filter;
use crate::fuse::fuse;
use crate::summarize::{SummaryOutcome, Summarizer};

/// Everything a request reads, swapped as one unit.
pub struct ServingState {
    pub corpus: Corpus,
    /// `None` when only lexical search is available.
    pub vector: Option<VectorIndex>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub loaded: bool,
    pub generation: u64,
    pub documents: usize,
    pub vector_indexed: usize,
    pub vector_skipped: usize,
    pub embedder_id: Option<String>,
}

/// The retrieval pipeline: lexical and vector legs in parallel, fusion,
/// threshold/dedup, budgeted assembly and optional summarization.
pub struct RetrievalService {
    settings: Settings,
    scorer: Arc<LexicalScorer>,
    embedder: Arc<dyn Embedder>,
    summarizer: Arc<dyn Summarizer>,
    state: IndexHandle<ServingState>,
    rebuild_lock: tokio::sync::Mutex<()>,
}

impl RetrievalService {
    pub fn new(settings: Settings, embedder: Arc<dyn Embedder>, summarizer: Arc<dyn Summarizer>) -> Self {
        Self {
            scorer: Arc::new(LexicalScorer::new(settings.lexical.clone())),
            settings,
            embedder,
            summarizer,
            state: IndexHandle::new(),
            rebuild_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &Settings { &self.settings }

    pub fn snapshot(&self) -> Option<Arc<ServingState>> { self.state.snapshot() }

    /// Embed `corpus` and swap it in with its fresh vector index. Requests in
    /// flight keep the state they started with; on failure the old state
    /// stays in place.
    pub async fn rebuild(&self, corpus: Corpus, progress: Option<&ProgressBar>) -> Result<()> {
        let _guard = self.rebuild_lock.lock().await;
        let index = VectorIndex::build(corpus.documents(), self.embedder.as_ref(), &self.settings.vector, progress).await?;
        self.install(corpus, Some(index));
        Ok(())
    }

    /// Serve `corpus` with the vector index persisted in `dir`.
    pub fn load_index(&self, corpus: Corpus, dir: &Path) -> recall_core::Result<()> {
        let index = VectorIndex::load_for(dir, self.embedder.dim(), self.embedder.embedder_id())?;
        let unknown = index.doc_ids().iter().filter(|id| !corpus.contains(id)).count();
        if unknown > 0 {
            tracing::warn!(unknown, "persisted index references documents missing from the corpus");
        }
        self.install(corpus, Some(index));
        Ok(())
    }

    pub fn save_index(&self, dir: &Path) -> recall_core::Result<()> {
        let state = self.state.snapshot().ok_or_else(|| Error::NotFound("no index has been built or loaded".to_string()))?;
        let index = state.vector.as_ref().ok_or_else(|| Error::NotFound("serving state has no vector index".to_string()))?;
        index.save(dir)
    }

    pub fn install(&self, corpus: Corpus, vector: Option<VectorIndex>) {
        let documents = corpus.len();
        let indexed = vector.as_ref().map_or(0, VectorIndex::len);
        self.state.swap(ServingState { corpus, vector });
        tracing::info!(documents, indexed, generation = self.state.generation(), "serving state installed");
    }

    pub fn status(&self) -> ServiceStatus {
        let state = self.state.snapshot();
        let vector = state.as_ref().and_then(|s| s.vector.as_ref());
        ServiceStatus {
            loaded: state.is_some(),
            generation: self.state.generation(),
            documents: state.as_ref().map_or(0, |s| s.corpus.len()),
            vector_indexed: vector.map_or(0, VectorIndex::len),
            vector_skipped: vector.map_or(0, |v| v.skipped().len()),
            embedder_id: vector.map(|v| v.embedder_id().to_string()),
        }
    }

    /// Answer one request. Every outcome short of a panic is a successful
    /// response; degraded stages are reported in `message`.
    pub async fn retrieve(&self, request: RetrievalRequest) -> RetrievalResponse {
        let max_chars = request.max_chars.unwrap_or(self.settings.assembly.default_max_chars);
        let terms = self.scorer.analyze(&request.query);

        let Some(state) = self.state.snapshot() else {
            return empty_response(terms.keywords, "index not built; 0 documents available", request.use_summary);
        };
        if terms.is_empty() {
            return empty_response(terms.keywords, "query has no searchable terms; 0 documents matched", request.use_summary);
        }

        let limit = self.settings.fusion.candidate_limit;
        let (lexical, vector) = tokio::join!(
            self.lexical_leg(&state, &terms, limit),
            self.vector_leg(&state, &request.query, limit)
        );
        tracing::debug!(lexical = lexical.len(), vector = vector.len(), "legs complete");

        let fused = fuse(&lexical, &vector, &self.settings.fusion);
        let kept = filter(&fused, &state.corpus, &self.settings.filter);
        let ctx = assemble(&kept, &state.corpus, max_chars);
        let sources: Vec<String> = ctx.documents.iter().map(|d| d.file_name.clone()).collect();

        let mut context = ctx.context;
        let mut summarized = false;
        let summary_note = if !request.use_summary || context.is_empty() {
            unsummarized_note(request.use_summary).to_string()
        } else {
            let target = self.settings.summary.target_chars.min(max_chars);
            match self.summarizer.summarize(&context, &request.query, target).await {
                SummaryOutcome::Summarized(text) if char_len(&text) <= max_chars => {
                    context = text;
                    summarized = true;
                    "summarization applied".to_string()
                }
                SummaryOutcome::Summarized(_) => "summarization skipped (summary exceeded budget)".to_string(),
                SummaryOutcome::Skipped { reason } => format!("summarization skipped ({reason})"),
            }
        };

        RetrievalResponse {
            success: true,
            total_documents: ctx.total_documents,
            documents_included: ctx.documents_included,
            context_length: char_len(&context),
            context,
            keywords_used: terms.keywords,
            summarized,
            truncated: ctx.truncated,
            sources,
            message: format!("{}; {}", ctx.message, summary_note),
        }
    }

    /// Scores the whole corpus on the blocking pool.
    async fn lexical_leg(&self, state: &Arc<ServingState>, terms: &QueryTerms, limit: usize) -> Vec<SearchResult> {
        let scorer = Arc::clone(&self.scorer);
        let state = Arc::clone(state);
        let terms = terms.clone();
        let preview_chars = self.settings.vector.preview_chars;
        let scored = tokio::task::spawn_blocking(move || {
            let documents = state.corpus.documents();
            let scores = scorer.score_terms(&terms, documents);
            scorer.rank(&scores, documents, limit, preview_chars)
        })
        .await;
        scored.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "lexical leg aborted; continuing with vector results");
            Vec::new()
        })
    }

    async fn vector_leg(&self, state: &ServingState, query: &str, limit: usize) -> Vec<SearchResult> {
        let Some(index) = state.vector.as_ref() else { return Vec::new() };
        let timeout = Duration::from_secs(self.settings.embedding.timeout_secs.max(1));
        match tokio::time::timeout(timeout, index.search(query, limit, self.embedder.as_ref())).await {
            Ok(Ok(hits)) => hits,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "vector leg failed; continuing with lexical results");
                Vec::new()
            }
            Err(_) => {
                tracing::warn!(timeout_secs = timeout.as_secs(), "vector leg timed out; continuing with lexical results");
                Vec::new()
            }
        }
    }
}

fn unsummarized_note(use_summary: bool) -> &'static str {
    if use_summary { "summarization skipped (nothing to summarize)" } else { "summarization not requested" }
}

fn empty_response(keywords: Vec<String>, message: &str, use_summary: bool) -> RetrievalResponse {
    RetrievalResponse {
        success: true,
        total_documents: 0,
        documents_included: 0,
        context: String::new(),
        context_length: 0,
        keywords_used: keywords,
        summarized: false,
        truncated: false,
        sources: Vec::new(),
        message: format!("{message}; {}", unsummarized_note(use_summary)),
    }
}
