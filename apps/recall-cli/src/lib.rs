//! Shared plumbing for the `recall` binaries: logging, settings, corpus
//! loading and the build progress bar.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use recall_core::config::Config;
use recall_core::{Corpus, CorpusLoader, Settings};

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
}

/// Settings from `config*.toml` in `base` plus `APP_*` overrides.
pub fn load_settings(base: &Path) -> Result<Settings> {
    Config::load_from(base)?.settings().context("Error loading config")
}

/// The corpus named by the CLI flags, falling back to `data.corpus_json`
/// and then `data.corpus_dir`. A JSON file wins over a directory.
pub fn load_corpus(settings: &Settings, base: &Path, data_dir: Option<PathBuf>, corpus_json: Option<PathBuf>) -> Result<Corpus> {
    let loader = CorpusLoader::new();
    if let Some(json) = corpus_json.or_else(|| settings.data.corpus_json(base)) {
        return loader.load_json(&json).with_context(|| format!("loading corpus records from {}", json.display()));
    }
    let dir = data_dir.unwrap_or_else(|| settings.data.corpus_dir(base));
    loader.load_directory(&dir).with_context(|| format!("loading corpus from {}", dir.display()))
}

pub fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents ({percent}%) {msg}")
        .map(|s| s.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}
