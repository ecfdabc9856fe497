use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use recall_core::settings::Settings;
use recall_core::traits::{Completer, Embedder};
use recall_core::{Corpus, Document, RetrievalRequest};
use recall_embed::FakeEmbedder;
use recall_hybrid::{LlmSummarizer, NoopSummarizer, RetrievalService, Summarizer};

const FILLER: &str = "lorem ipsum dolor sit amet consectetur adipiscing elit ";

/// Fake embedder that counts calls and can be told to fail.
struct CountingEmbedder {
    inner: FakeEmbedder,
    calls: AtomicUsize,
    fail: AtomicBool,
}

impl CountingEmbedder {
    fn new() -> Arc<Self> {
        Arc::new(Self { inner: FakeEmbedder::new(256), calls: AtomicUsize::new(0), fail: AtomicBool::new(false) })
    }
}

#[async_trait]
impl Embedder for CountingEmbedder {
    fn embedder_id(&self) -> &str { self.inner.embedder_id() }
    fn dim(&self) -> usize { self.inner.dim() }
    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) { anyhow::bail!("embedding service unavailable"); }
        self.inner.embed_batch(texts).await
    }
}

/// Completer returning a canned answer after an optional delay.
struct CannedCompleter {
    answer: String,
    delay: Duration,
    calls: AtomicUsize,
}

impl CannedCompleter {
    fn new(answer: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self { answer: answer.to_string(), delay, calls: AtomicUsize::new(0) })
    }
}

#[async_trait]
impl Completer for CannedCompleter {
    fn name(&self) -> &str { "canned" }
    async fn complete(&self, _prompt: &str, _timeout: Duration) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(self.answer.clone())
    }
}

fn doc(name: &str, content: &str) -> Document {
    Document::new(name, name, content)
}

fn corpus(docs: Vec<Document>) -> Corpus {
    Corpus::new(docs).expect("corpus")
}

async fn service_with(docs: Vec<Document>, embedder: Arc<CountingEmbedder>, summarizer: Arc<dyn Summarizer>, settings: Settings) -> RetrievalService {
    let service = RetrievalService::new(settings, embedder, summarizer);
    service.rebuild(corpus(docs), None).await.expect("rebuild");
    service
}

async fn service(docs: Vec<Document>) -> RetrievalService {
    service_with(docs, CountingEmbedder::new(), Arc::new(NoopSummarizer), Settings::default()).await
}

fn scattered_b() -> String {
    let block = FILLER.repeat(22);
    format!("{block}Nguyen {block}Van {block}A {block}")
}

fn homestead_corpus() -> Vec<Document> {
    vec![
        doc("solar.txt", "Solar panel installation: mount the solar panel facing south, wire it to the charge controller and inverter."),
        doc("water.txt", "Rainwater harvesting: gutters feed a cistern and a first-flush diverter keeps debris out of the stored water."),
        doc("garden.txt", "Raised bed garden layout with companion planting, compost, mulch and drip irrigation lines along each bed."),
        doc("pump.txt", "Irrigation pump maintenance: check the irrigation pump seals monthly and clean the intake screen every spring."),
    ]
}

#[tokio::test]
async fn scenario_a_exact_short_document_beats_scattered_long_one() {
    let b = scattered_b();
    assert!(b.chars().count() > 4800);
    let svc = service(vec![doc("a.txt", "Nguyen Van A works at factory X, born 1990"), doc("b.txt", &b)]).await;

    let resp = svc.retrieve(RetrievalRequest::new("Nguyen Van A")).await;
    assert!(resp.success);
    assert_eq!(resp.documents_included, 1, "message: {}", resp.message);
    assert_eq!(resp.sources, vec!["a.txt".to_string()]);
    assert!(resp.context.contains("Nguyen Van A works at factory X"));
    assert_eq!(resp.keywords_used, vec!["nguyen".to_string(), "van".to_string()]);
}

#[tokio::test]
async fn scenario_b_empty_query_is_a_successful_empty_response() {
    let embedder = CountingEmbedder::new();
    let svc = service_with(homestead_corpus(), embedder.clone(), Arc::new(NoopSummarizer), Settings::default()).await;
    let calls_after_build = embedder.calls.load(Ordering::SeqCst);

    for q in ["", "   ", "the of and"] {
        let resp = svc.retrieve(RetrievalRequest::new(q)).await;
        assert!(resp.success);
        assert_eq!(resp.documents_included, 0);
        assert_eq!(resp.total_documents, 0);
        assert!(resp.context.is_empty());
        assert!(resp.message.contains("no searchable terms"));
        assert!(resp.message.ends_with("summarization not requested"), "message: {}", resp.message);
    }
    let resp = svc.retrieve(RetrievalRequest::new("the of and").with_summary(true)).await;
    assert!(resp.message.ends_with("summarization skipped (nothing to summarize)"), "message: {}", resp.message);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), calls_after_build, "empty queries must not reach the embedder");
}

#[tokio::test]
async fn scenario_c_small_budget_truncates_long_document() {
    let long = format!("Battery bank sizing guide. {}", "Lead acid battery banks need ventilation and regular equalization charges. ".repeat(60));
    let svc = service(vec![doc("long.txt", &long)]).await;

    let resp = svc.retrieve(RetrievalRequest::new("battery bank ventilation").with_max_chars(100)).await;
    assert!(resp.success);
    assert!(!resp.context.is_empty());
    assert!(resp.context.chars().count() <= 100);
    assert_eq!(resp.context_length, resp.context.chars().count());
    assert!(resp.truncated);
    assert!(resp.context.starts_with("--- long.txt ---\n"));
}

#[tokio::test]
async fn exact_phrase_document_is_ranked_first() {
    let mut docs = homestead_corpus();
    docs.push(doc("notes.txt", &format!("pump {FILLER}irrigation {FILLER}pump irrigation pump notes {FILLER}irrigation")));
    docs.push(doc("phrase.txt", "Spring checklist: the irrigation pump seals were replaced and tested under pressure."));
    let svc = service(docs).await;

    let resp = svc.retrieve(RetrievalRequest::new("irrigation pump seals")).await;
    assert!(resp.documents_included >= 1);
    // pump.txt contains "irrigation pump seals" too; both are exact, ties go by score then id
    assert!(["phrase.txt", "pump.txt"].contains(&resp.sources[0].as_str()), "sources: {:?}", resp.sources);
    assert!(!resp.sources.iter().take(1).any(|s| s == "notes.txt"));
}

#[tokio::test]
async fn document_sharing_one_word_with_the_best_match_is_cut() {
    let noise = format!("{}inverter {}", FILLER.repeat(80), FILLER.repeat(80));
    assert!(noise.chars().count() > 8900);
    let svc = service(vec![
        doc("solar.txt", "Solar panel installation: mount the solar panel facing south, wire it to the charge controller and inverter."),
        doc("noise.txt", &noise),
    ]).await;

    let resp = svc.retrieve(RetrievalRequest::new("solar panel inverter")).await;
    assert_eq!(resp.sources, vec!["solar.txt".to_string()], "message: {}", resp.message);
    assert_eq!(resp.total_documents, 1);
    assert!(!resp.context.contains("lorem ipsum"));
}

#[tokio::test]
async fn near_duplicates_are_included_once() {
    let text = "Composting guide: layer green and brown material, keep the pile moist and turn the compost every week.";
    let svc = service(vec![
        doc("compost.txt", text),
        doc("compost-copy.txt", &format!("{text}  ")),
        doc("solar.txt", "Solar panel installation: mount the solar panel facing south and wire the inverter."),
    ]).await;

    let resp = svc.retrieve(RetrievalRequest::new("compost pile moist")).await;
    let compost_hits = resp.sources.iter().filter(|s| s.starts_with("compost")).count();
    assert_eq!(compost_hits, 1, "sources: {:?}", resp.sources);
}

#[tokio::test]
async fn context_never_exceeds_budget() {
    let svc = service(homestead_corpus()).await;
    for max_chars in [0usize, 1, 5, 17, 30, 64, 99, 100, 101, 250, 400, 1000, 10_000] {
        let resp = svc.retrieve(RetrievalRequest::new("irrigation pump garden solar water").with_max_chars(max_chars)).await;
        assert!(resp.success);
        assert!(resp.context.chars().count() <= max_chars, "max_chars {max_chars}: got {}", resp.context.chars().count());
        assert_eq!(resp.context_length, resp.context.chars().count());
    }
}

#[tokio::test]
async fn best_match_leads_the_context() {
    let svc = service(homestead_corpus()).await;
    let resp = svc.retrieve(RetrievalRequest::new("cistern gutters diverter")).await;
    assert_eq!(resp.sources.first().map(String::as_str), Some("water.txt"));
    assert!(resp.message.contains("summarization not requested"));
}

#[tokio::test]
async fn vector_failure_degrades_to_lexical_results() {
    let embedder = CountingEmbedder::new();
    let svc = service_with(homestead_corpus(), embedder.clone(), Arc::new(NoopSummarizer), Settings::default()).await;
    embedder.fail.store(true, Ordering::SeqCst);

    let resp = svc.retrieve(RetrievalRequest::new("solar panel inverter")).await;
    assert!(resp.success);
    assert_eq!(resp.sources.first().map(String::as_str), Some("solar.txt"));
}

#[tokio::test]
async fn retrieval_before_any_build_is_empty_but_successful() {
    let svc = RetrievalService::new(Settings::default(), CountingEmbedder::new(), Arc::new(NoopSummarizer));
    let resp = svc.retrieve(RetrievalRequest::new("solar panel")).await;
    assert!(resp.success);
    assert_eq!(resp.documents_included, 0);
    assert_eq!(resp.message, "index not built; 0 documents available; summarization not requested");
    assert!(!svc.status().loaded);
}

fn summary_settings() -> Settings {
    let mut settings = Settings::default();
    settings.summary.target_chars = 40;
    settings
}

#[tokio::test]
async fn summary_replaces_context_when_valid() {
    let completer = CannedCompleter::new("Pump seals: check monthly.", Duration::ZERO);
    let summarizer = Arc::new(LlmSummarizer::new(completer.clone(), Duration::from_secs(5)));
    let svc = service_with(homestead_corpus(), CountingEmbedder::new(), summarizer, summary_settings()).await;

    let resp = svc.retrieve(RetrievalRequest::new("irrigation pump seals").with_summary(true)).await;
    assert!(resp.summarized);
    assert_eq!(resp.context, "Pump seals: check monthly.");
    assert_eq!(resp.context_length, 26);
    assert!(resp.message.contains("summarization applied"));
    assert_eq!(completer.calls.load(Ordering::SeqCst), 1);

    let json = serde_json::to_value(&resp).expect("json");
    assert_eq!(json["gemini_summarization"], serde_json::Value::Bool(true));
}

#[tokio::test]
async fn summary_timeout_keeps_original_context() {
    let completer = CannedCompleter::new("late", Duration::from_secs(5));
    let summarizer = Arc::new(LlmSummarizer::new(completer, Duration::from_millis(50)));
    let svc = service_with(homestead_corpus(), CountingEmbedder::new(), summarizer, summary_settings()).await;

    let resp = svc.retrieve(RetrievalRequest::new("irrigation pump seals").with_summary(true)).await;
    assert!(!resp.summarized);
    assert!(resp.context.contains("--- pump.txt ---"));
    assert!(resp.message.contains("summarization skipped"));
}

#[tokio::test]
async fn oversized_or_empty_summaries_are_rejected() {
    let oversized = "x".repeat(20_000);
    for answer in ["", "   ", oversized.as_str()] {
        let completer = CannedCompleter::new(answer, Duration::ZERO);
        let summarizer = Arc::new(LlmSummarizer::new(completer, Duration::from_secs(5)));
        let svc = service_with(homestead_corpus(), CountingEmbedder::new(), summarizer, summary_settings()).await;
        let resp = svc.retrieve(RetrievalRequest::new("irrigation pump seals").with_summary(true)).await;
        assert!(!resp.summarized, "answer of {} chars accepted", answer.len());
        assert!(resp.context.contains("--- pump.txt ---"));
    }
}

#[tokio::test]
async fn summarizer_is_not_called_unless_requested() {
    let completer = CannedCompleter::new("summary", Duration::ZERO);
    let summarizer = Arc::new(LlmSummarizer::new(completer.clone(), Duration::from_secs(5)));
    let svc = service_with(homestead_corpus(), CountingEmbedder::new(), summarizer, summary_settings()).await;
    let resp = svc.retrieve(RetrievalRequest::new("irrigation pump seals")).await;
    assert!(!resp.summarized);
    assert_eq!(completer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn rebuild_swaps_state_without_disturbing_snapshots() {
    let svc = service(homestead_corpus()).await;
    let before = svc.snapshot().expect("state");
    assert_eq!(svc.status().generation, 1);

    svc.rebuild(corpus(vec![doc("wind.txt", "Small wind turbine siting: mount the turbine well above nearby trees and roofs.")]), None)
        .await
        .expect("rebuild");

    assert_eq!(before.corpus.len(), 4);
    assert_eq!(svc.status().generation, 2);
    assert_eq!(svc.status().documents, 1);
    let resp = svc.retrieve(RetrievalRequest::new("wind turbine siting")).await;
    assert_eq!(resp.sources, vec!["wind.txt".to_string()]);
    let old = svc.retrieve(RetrievalRequest::new("solar panel inverter")).await;
    assert!(!old.sources.iter().any(|s| s == "solar.txt"));
}

#[tokio::test]
async fn saved_index_serves_identical_responses() {
    let tmp = tempfile::tempdir().expect("tmp");
    let svc = service(homestead_corpus()).await;
    svc.save_index(tmp.path()).expect("save");

    let reloaded = RetrievalService::new(Settings::default(), CountingEmbedder::new(), Arc::new(NoopSummarizer));
    reloaded.load_index(corpus(homestead_corpus()), tmp.path()).expect("load");

    for q in ["irrigation pump", "solar panel", "compost mulch"] {
        let a = svc.retrieve(RetrievalRequest::new(q)).await;
        let b = reloaded.retrieve(RetrievalRequest::new(q)).await;
        assert_eq!(a, b, "query {q}");
    }
}

#[tokio::test]
async fn concurrent_retrievals_agree() {
    let svc = Arc::new(service(homestead_corpus()).await);
    let expected = svc.retrieve(RetrievalRequest::new("irrigation pump")).await;

    let mut handles = Vec::new();
    for _ in 0..16 {
        let svc = svc.clone();
        handles.push(tokio::spawn(async move { svc.retrieve(RetrievalRequest::new("irrigation pump")).await }));
    }
    for h in handles {
        assert_eq!(h.await.expect("join"), expected);
    }
}
