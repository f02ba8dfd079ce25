use std::sync::Arc;

use docqa_core::config::Settings;
use docqa_core::error::Error;
use docqa_core::query::DegradedSource;
use docqa_core::testing::{FakeWebSearch, FixedEmbedder, UnavailableEmbedder, UnavailableVectorIndex};
use docqa_core::traits::{Embedder, LexicalIndex, VectorIndex, WebSearch};
use docqa_core::types::{DocumentStatus, Domain, SearchFilter, WebSnippet};
use docqa_embed::HashEmbedder;
use docqa_hybrid::{SearchRequest, SearchStack};
use docqa_text::TantivyLexicalIndex;
use docqa_vector::MemoryVectorIndex;

const KNEE: &str = "Knee surgery is covered at 80% after the deductible.";

fn stack_with(embedder: Arc<dyn Embedder>, vector: Arc<dyn VectorIndex>, web: Option<Arc<dyn WebSearch>>) -> SearchStack {
    let lexical: Arc<dyn LexicalIndex> = Arc::new(TantivyLexicalIndex::in_memory().unwrap());
    SearchStack::assemble(&Settings::default(), embedder, vector, lexical, web).unwrap()
}

fn hashing_stack(web: Option<Arc<dyn WebSearch>>) -> SearchStack {
    stack_with(Arc::new(HashEmbedder::new(1024)), Arc::new(MemoryVectorIndex::new(1024)), web)
}

fn request(question: &str) -> SearchRequest {
    SearchRequest {
        question: question.to_string(),
        filter: SearchFilter::default(),
        domain_hint: Domain::General,
        max_results: 10,
    }
}

#[tokio::test]
async fn relevant_chunk_ranks_first_with_local_provenance() {
    let stack = hashing_stack(None);
    stack.ingestor.ingest("policy", Domain::Insurance, KNEE).await.unwrap();
    stack
        .ingestor
        .ingest("handbook", Domain::Hr, "Employees accrue vacation days monthly.")
        .await
        .unwrap();

    let out = stack.engine.search(&request("Does this policy cover knee surgery?")).await.unwrap();
    let top = &out.results[0];
    assert_eq!(top.chunk.as_ref().unwrap().document_id, "policy");
    assert!(top.provenance.includes_vector() || top.provenance.includes_lexical());
    assert!(!out.web_fallback);
    assert!(out.degraded.is_empty());
}

#[tokio::test]
async fn search_is_deterministic() {
    let stack = hashing_stack(None);
    for (id, text) in [
        ("a", "Dental cleanings are covered twice a year."),
        ("b", "Dental x-rays are covered once a year."),
        ("c", "Dental crowns are covered at 50 percent."),
    ] {
        stack.ingestor.ingest(id, Domain::Insurance, text).await.unwrap();
    }
    let req = request("Are dental cleanings covered?");
    let first = stack.engine.search(&req).await.unwrap();
    let second = stack.engine.search(&req).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn empty_indices_call_web_exactly_once() {
    let web = Arc::new(FakeWebSearch::new(vec![
        WebSnippet { text: "Knee surgery overview".into(), url: "https://example.org/a".into(), score: 1.0 },
        WebSnippet { text: "Arthroscopy basics".into(), url: "https://example.org/b".into(), score: 0.9 },
    ]));
    let stack = hashing_stack(Some(web.clone()));

    let out = stack.engine.search(&request("Does this policy cover knee surgery?")).await.unwrap();
    assert_eq!(web.calls(), 1);
    assert!(out.web_fallback);
    assert_eq!(out.results.len(), 2);
    assert!(out.results.iter().all(|r| r.provenance.is_web()));
    assert!(out.results.iter().all(|r| r.score <= 0.3));
}

#[tokio::test]
async fn local_hit_above_threshold_skips_web() {
    let web = Arc::new(FakeWebSearch::empty());
    let stack = hashing_stack(Some(web.clone()));
    stack.ingestor.ingest("policy", Domain::Insurance, KNEE).await.unwrap();

    let out = stack.engine.search(&request("Does this policy cover knee surgery?")).await.unwrap();
    assert!(out.above_threshold >= 1);
    assert_eq!(web.calls(), 0);
}

#[tokio::test]
async fn failing_web_yields_empty_results_not_error() {
    let web = Arc::new(FakeWebSearch::failing());
    let stack = hashing_stack(Some(web.clone()));
    let out = stack.engine.search(&request("anything at all")).await.unwrap();
    assert!(out.results.is_empty());
    assert_eq!(out.degraded, vec![DegradedSource::WebSearch]);
    assert_eq!(web.calls(), 1);
}

#[tokio::test]
async fn embedder_outage_degrades_to_lexical() {
    let embedder = Arc::new(UnavailableEmbedder::new(4));
    let stack = stack_with(embedder.clone(), Arc::new(MemoryVectorIndex::new(4)), None);

    let report = stack.ingestor.ingest("policy", Domain::Insurance, KNEE).await.unwrap();
    assert_eq!(report.status, DocumentStatus::Completed);
    assert!(!report.vector_indexed);

    let out = stack.engine.search(&request("knee surgery covered")).await.unwrap();
    assert_eq!(out.degraded, vec![DegradedSource::Embedder]);
    assert!(out.results[0].provenance.includes_lexical());
    assert!(!out.results[0].provenance.includes_vector());
    // one try plus one retry per call site
    assert_eq!(embedder.calls(), 4);
}

#[tokio::test]
async fn unreachable_vector_store_is_not_fatal() {
    let vector = Arc::new(UnavailableVectorIndex::default());
    let stack = stack_with(Arc::new(HashEmbedder::new(8)), vector.clone(), None);
    stack.ingestor.ingest("policy", Domain::Insurance, KNEE).await.unwrap();

    let out = stack.engine.search(&request("knee surgery covered")).await.unwrap();
    assert!(out.degraded.contains(&DegradedSource::VectorIndex));
    assert!(!out.results.is_empty());
    assert_eq!(vector.queries(), 1);
}

#[tokio::test]
async fn explicit_filters_restrict_results() {
    let stack = hashing_stack(None);
    stack.ingestor.ingest("ins", Domain::Insurance, "Claims must be filed within 30 days.").await.unwrap();
    stack.ingestor.ingest("hr", Domain::Hr, "Expense claims must be filed within 30 days.").await.unwrap();

    let mut req = request("When must claims be filed?");
    req.filter.domain = Some(Domain::Hr);
    let out = stack.engine.search(&req).await.unwrap();
    assert!(!out.results.is_empty());
    assert!(out.results.iter().all(|r| r.chunk.as_ref().unwrap().document_id == "hr"));
}

#[tokio::test]
async fn max_results_truncates() {
    let stack = hashing_stack(None);
    for i in 0..5 {
        stack
            .ingestor
            .ingest(&format!("d{i}"), Domain::Insurance, &format!("Knee surgery rider number {i} is covered."))
            .await
            .unwrap();
    }
    let mut req = request("knee surgery covered");
    req.max_results = 2;
    assert_eq!(stack.engine.search(&req).await.unwrap().results.len(), 2);
    req.max_results = 0;
    assert!(matches!(stack.engine.search(&req).await, Err(Error::InvalidRequest(_))));
}

#[tokio::test]
async fn unbounded_max_results_returns_everything_relevant() {
    let stack = hashing_stack(None);
    stack.ingestor.ingest("policy", Domain::Insurance, KNEE).await.unwrap();

    let mut req = request("knee surgery coverage");
    req.max_results = usize::MAX;
    let out = stack.engine.search(&req).await.unwrap();
    assert!(!out.results.is_empty());
    assert_eq!(out.results[0].chunk.as_ref().unwrap().document_id, "policy");
}

#[tokio::test]
async fn embedder_width_mismatch_fails_the_document() {
    let embedder = Arc::new(FixedEmbedder::new(3));
    let stack = stack_with(embedder, Arc::new(MemoryVectorIndex::new(4)), None);
    let err = stack.ingestor.ingest("policy", Domain::Insurance, KNEE).await.unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 4, actual: 3 }));

    let doc = stack.catalog.get("policy").await.unwrap();
    assert_eq!(doc.status, DocumentStatus::Failed);
    let hits = stack.lexical.search("knee", 5, &SearchFilter::default()).await.unwrap();
    assert!(hits.is_empty(), "failed document leaves nothing searchable");
}
