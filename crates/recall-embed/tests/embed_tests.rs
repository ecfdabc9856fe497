use recall_core::settings::EmbeddingConfig;
use recall_embed::{get_default_embedder, FakeEmbedder, Embedder};

fn cosine(a: &[f32], b: &[f32]) -> f32 { a.iter().zip(b).map(|(x, y)| x * y).sum() }

#[tokio::test]
async fn fake_embedder_shapes_and_determinism() {
    // Force fake embedder so no server is needed
    std::env::set_var("APP_USE_FAKE_EMBEDDINGS", "1");

    let config = EmbeddingConfig { dim: 1024, ..EmbeddingConfig::default() };
    let embedder = get_default_embedder(&config).expect("embedder");
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).await.expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), 1024, "embedding dim is 1024");
    assert_eq!(embedder.dim(), 1024);

    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[tokio::test]
async fn fake_embedder_is_case_insensitive_and_non_negative() {
    let e = FakeEmbedder::new(64);
    let out = e.embed_batch(&["Solar Panel".to_string(), "solar panel".to_string()]).await.expect("embed");
    assert!((cosine(&out[0], &out[1]) - 1.0).abs() < 1e-5);
    assert!(out[0].iter().all(|x| *x >= 0.0));
}

#[tokio::test]
async fn shared_words_give_positive_similarity() {
    let e = FakeEmbedder::new(256);
    let out = e.embed_batch(&[
        "irrigation pump maintenance".to_string(),
        "the pump needs new seals".to_string(),
        "".to_string(),
    ]).await.expect("embed");
    assert!(cosine(&out[0], &out[1]) > 0.0);
    // no words → zero vector, never similar to anything
    assert!(out[2].iter().all(|x| *x == 0.0));
}

#[test]
fn fake_provider_selects_fake_embedder() {
    let config = EmbeddingConfig { provider: "fake".into(), dim: 32, ..EmbeddingConfig::default() };
    let e = get_default_embedder(&config).expect("embedder");
    assert!(e.embedder_id().starts_with("fake:"));
    assert_eq!(e.dim(), 32);
}
