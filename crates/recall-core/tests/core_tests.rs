use std::fs;
use std::io::Write;
use tempfile::TempDir;

use recall_core::config::{resolve_with_base, Config};
use recall_core::corpus::CorpusLoader;
use recall_core::{Corpus, Document, Error};

#[test]
fn load_directory_single_small_file() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    let file_path = dir.join("a.txt");
    let mut f = fs::File::create(&file_path).unwrap();
    writeln!(f, "Short text").unwrap();

    let corpus = CorpusLoader::new().load_directory(dir).expect("load");

    assert_eq!(corpus.len(), 1, "one file becomes one document");
    let doc = &corpus.documents()[0];
    assert_eq!(doc.id, "a.txt");
    assert_eq!(doc.file_name, "a.txt");
    assert_eq!(doc.content.trim(), "Short text");
    assert!(doc.category.is_none());
    assert!(doc.indexed_at.is_some());
}

#[test]
fn load_directory_nested_files_get_category_and_relative_ids() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::create_dir_all(dir.join("hr/policies")).unwrap();
    fs::write(dir.join("hr/policies/remote.txt"), "remote work policy").unwrap();
    fs::write(dir.join("notes.txt"), "misc notes").unwrap();
    fs::write(dir.join("ignored.pdf"), "binary").unwrap();

    let corpus = CorpusLoader::new().load_directory(dir).expect("load");

    assert_eq!(corpus.len(), 2, "only .txt files are loaded");
    let remote = corpus.get("hr/policies/remote.txt").expect("nested doc");
    assert_eq!(remote.file_name, "remote.txt");
    assert_eq!(remote.category.as_deref(), Some("/hr/policies"));
    assert!(corpus.contains("notes.txt"));
}

#[test]
fn load_directory_missing_dir_is_not_found() {
    let tmp = TempDir::new().unwrap();
    let err = CorpusLoader::new().load_directory(&tmp.path().join("nope")).unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn load_json_records_default_id_to_file_name() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("corpus.json");
    fs::write(
        &path,
        r#"[
            {"file_name": "a.txt", "content": "alpha", "keywords": ["x"]},
            {"id": "doc-2", "file_name": "b.txt", "content": "bravo", "category": "/ops"}
        ]"#,
    )
    .unwrap();

    let corpus = CorpusLoader::new().load_json(&path).expect("load json");
    assert_eq!(corpus.len(), 2);
    assert_eq!(corpus.get("a.txt").unwrap().keywords, vec!["x".to_string()]);
    assert_eq!(corpus.get("doc-2").unwrap().category.as_deref(), Some("/ops"));
}

#[test]
fn duplicate_ids_are_rejected() {
    let docs = vec![Document::new("same", "a.txt", "one"), Document::new("same", "b.txt", "two")];
    let err = Corpus::new(docs).unwrap_err();
    assert!(matches!(err, Error::DuplicateDocumentId(id) if id == "same"));
}

#[test]
fn document_metadata_flattens_optional_fields() {
    let mut doc = Document::new("id", "file.txt", "content");
    doc.category = Some("/c".to_string());
    doc.keywords = vec!["k1".to_string(), "k2".to_string()];
    let meta = doc.metadata();
    assert_eq!(meta.get("file_name").map(String::as_str), Some("file.txt"));
    assert_eq!(meta.get("category").map(String::as_str), Some("/c"));
    assert_eq!(meta.get("keywords").map(String::as_str), Some("k1,k2"));
    assert!(!meta.contains_key("indexed_at"));
}

#[test]
fn settings_merge_file_and_env() {
    figment::Jail::expect_with(|jail| {
        jail.set_env("RUST_ENV", "test");
        jail.create_file(
            "config.toml",
            r#"
                [fusion]
                alpha = 0.3

                [lexical]
                proximity_window = 80
            "#,
        )?;
        jail.create_file("config.test.toml", "[filter]\ncutoff_ratio = 0.2\n")?;
        jail.set_env("APP_ASSEMBLY__DEFAULT_MAX_CHARS", "4000");

        let config = Config::load().map_err(|e| e.to_string())?;
        let settings = config.settings().map_err(|e| e.to_string())?;
        assert!((settings.fusion.alpha - 0.3).abs() < 1e-6);
        assert_eq!(settings.lexical.proximity_window, 80);
        assert!((settings.filter.cutoff_ratio - 0.2).abs() < 1e-6);
        assert_eq!(settings.assembly.default_max_chars, 4000);
        // untouched sections keep their defaults
        assert_eq!(settings.vector.min_content_chars, 50);
        assert!((settings.fusion.rrf_k - 60.0).abs() < 1e-6);
        Ok(())
    });
}

#[test]
fn settings_reject_out_of_range_alpha() {
    figment::Jail::expect_with(|jail| {
        jail.set_env("RUST_ENV", "test");
        jail.create_file("config.toml", "[fusion]\nalpha = 1.5\n")?;
        let config = Config::load().map_err(|e| e.to_string())?;
        let err = config.settings().unwrap_err();
        assert!(err.to_string().contains("fusion.alpha"), "{err}");
        Ok(())
    });
}

#[test]
fn production_refuses_fake_embeddings() {
    figment::Jail::expect_with(|jail| {
        jail.set_env("RUST_ENV", "prod");
        jail.create_file("config.toml", "[embedding]\nuse_fake = true\n")?;
        assert!(Config::load().is_err());
        Ok(())
    });
}

#[test]
fn resolve_with_base_keeps_absolute_paths() {
    let base = std::path::Path::new("/srv/recall");
    assert_eq!(resolve_with_base(base, "index"), base.join("index"));
    assert_eq!(resolve_with_base(base, "/var/idx"), std::path::PathBuf::from("/var/idx"));
}
