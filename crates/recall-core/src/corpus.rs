use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::Document;

/// An immutable, id-unique set of documents.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    documents: Vec<Document>,
    by_id: HashMap<String, usize>,
}

impl Corpus {
    pub fn new(documents: Vec<Document>) -> Result<Self> {
        let mut by_id = HashMap::with_capacity(documents.len());
        for (i, doc) in documents.iter().enumerate() {
            if by_id.insert(doc.id.clone(), i).is_some() {
                return Err(Error::DuplicateDocumentId(doc.id.clone()));
            }
        }
        Ok(Self { documents, by_id })
    }

    pub fn documents(&self) -> &[Document] { &self.documents }
    pub fn get(&self, id: &str) -> Option<&Document> { self.by_id.get(id).map(|&i| &self.documents[i]) }
    pub fn contains(&self, id: &str) -> bool { self.by_id.contains_key(id) }
    pub fn len(&self) -> usize { self.documents.len() }
    pub fn is_empty(&self) -> bool { self.documents.is_empty() }
}

/// Record shape produced by the external ingestion pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub file_name: String,
    pub content: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub indexed_at: Option<DateTime<Utc>>,
}

impl From<DocumentRecord> for Document {
    fn from(r: DocumentRecord) -> Self {
        Document {
            id: r.id.unwrap_or_else(|| r.file_name.clone()),
            file_name: r.file_name,
            content: r.content,
            summary: r.summary,
            keywords: r.keywords,
            category: r.category,
            indexed_at: r.indexed_at,
        }
    }
}

/// Loads pre-extracted document text from disk.
#[derive(Default)]
pub struct CorpusLoader;

impl CorpusLoader {
    pub fn new() -> Self { Self }

    /// Every `.txt` file under `data_dir` becomes one document whose id is the
    /// path relative to `data_dir`.
    pub fn load_directory(&self, data_dir: &Path) -> Result<Corpus> {
        if !data_dir.is_dir() {
            return Err(Error::NotFound(format!("corpus directory {}", data_dir.display())));
        }
        let files = self.list_txt_files(data_dir);
        if files.is_empty() {
            tracing::warn!(dir = %data_dir.display(), "no .txt files found");
        }
        let mut documents = Vec::with_capacity(files.len());
        for file_path in &files {
            let content = self.read_file_content(file_path)?;
            let relative = file_path.strip_prefix(data_dir).unwrap_or(file_path);
            let file_name = file_path.file_name().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
            let mut doc = Document::new(relative.to_string_lossy().replace('\\', "/"), file_name, content);
            doc.category = self.category_from_path(relative);
            doc.indexed_at = fs::metadata(file_path).and_then(|m| m.modified()).ok().map(DateTime::<Utc>::from);
            documents.push(doc);
        }
        tracing::info!(documents = documents.len(), dir = %data_dir.display(), "loaded corpus directory");
        Corpus::new(documents)
    }

    /// A JSON array of [`DocumentRecord`]s.
    pub fn load_json(&self, path: &Path) -> Result<Corpus> {
        if !path.is_file() {
            return Err(Error::NotFound(format!("corpus file {}", path.display())));
        }
        let records: Vec<DocumentRecord> = serde_json::from_str(&fs::read_to_string(path)?)?;
        tracing::info!(documents = records.len(), file = %path.display(), "loaded corpus records");
        Corpus::new(records.into_iter().map(Document::from).collect())
    }

    fn read_file_content(&self, file_path: &Path) -> Result<String> {
        match fs::read_to_string(file_path) {
            Ok(content) => Ok(content),
            Err(_) => Ok(String::from_utf8_lossy(&fs::read(file_path)?).to_string()),
        }
    }

    fn category_from_path(&self, relative_path: &Path) -> Option<String> {
        let parent = relative_path.parent()?.to_str()?;
        if parent.is_empty() { None } else { Some(format!("/{}", parent.replace('\\', "/"))) }
    }

    fn list_txt_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut txt_files = Vec::new();
        for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()) {
            let path = entry.path(); if path.extension().and_then(|s| s.to_str()) == Some("txt") { txt_files.push(path.to_path_buf()); }
        }
        txt_files.sort(); txt_files
    }
}
