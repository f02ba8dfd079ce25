use docqa_core::config::ServiceSettings;
use docqa_core::error::Error;
use docqa_core::traits::Embedder;
use docqa_embed::{get_default_embedder, HashEmbedder, OpenAiEmbedder};

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[tokio::test]
async fn hashing_embedder_shapes_and_determinism() {
    let services = ServiceSettings { use_hashing_embedder: true, ..ServiceSettings::default() };
    let embedder = get_default_embedder(&services).expect("embedder");
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).await.expect("embed_batch");

    assert_eq!(embs[0].len(), 1024, "embedding dim is 1024");
    let norm: f32 = embs[0].iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");
    assert_eq!(embs[0], embs[1]);
}

#[tokio::test]
async fn related_texts_are_closer_than_unrelated() {
    let e = HashEmbedder::new(1024);
    let q = e.embed("Does this policy cover knee surgery?").await.unwrap();
    let doc = e.embed("Knee surgery is covered at 80% after the deductible.").await.unwrap();
    let other = e.embed("Employees accrue vacation days monthly.").await.unwrap();
    assert!(cosine(&q, &doc) > 0.5);
    assert!(cosine(&q, &doc) > cosine(&q, &other));
}

#[tokio::test]
async fn unreachable_endpoint_is_unavailable() {
    let e = OpenAiEmbedder::new("http://127.0.0.1:9", "", "m", 8).unwrap();
    let err = e.embed("hi").await.unwrap_err();
    assert!(matches!(err, Error::EmbeddingUnavailable(_)), "got {err:?}");
}
