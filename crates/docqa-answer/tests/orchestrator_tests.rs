use std::sync::Arc;
use std::time::Duration;

use docqa_answer::orchestrator::NO_EVIDENCE_ANSWER;
use docqa_answer::{InMemoryHistory, QueryOrchestrator};
use docqa_core::config::Settings;
use docqa_core::error::Error;
use docqa_core::query::{AnswerFormat, Grounding, QueryRequest};
use docqa_core::testing::{FakeWebSearch, ScriptedAnswerer};
use docqa_core::traits::{HistoryFilter, LexicalIndex, QueryHistory, VectorIndex, WebSearch};
use docqa_core::types::{Domain, WebSnippet};
use docqa_embed::HashEmbedder;
use docqa_hybrid::SearchStack;
use docqa_text::TantivyLexicalIndex;
use docqa_vector::MemoryVectorIndex;

const KNEE: &str = "Knee surgery is covered at 80% after the deductible.";
const JSON_ANSWER: &str = r#"{"answer": "Yes, knee surgery is covered at 80% after the deductible.", "reasoning": "The policy states the coverage directly.", "evidence": ["Knee surgery is covered at 80% after the deductible."], "limitations": ["The deductible must be met first."], "follow_up": ["Is the provider in network?"]}"#;

struct Harness {
    stack: SearchStack,
    answerer: Arc<ScriptedAnswerer>,
    history: Arc<InMemoryHistory>,
    orchestrator: QueryOrchestrator,
}

fn harness(settings: Settings, answerer: ScriptedAnswerer, web: Option<Arc<dyn WebSearch>>) -> Harness {
    let vector: Arc<dyn VectorIndex> = Arc::new(MemoryVectorIndex::new(1024));
    let lexical: Arc<dyn LexicalIndex> = Arc::new(TantivyLexicalIndex::in_memory().unwrap());
    let stack = SearchStack::assemble(&settings, Arc::new(HashEmbedder::new(1024)), vector, lexical, web).unwrap();
    let answerer = Arc::new(answerer);
    let history = Arc::new(InMemoryHistory::new());
    let orchestrator = QueryOrchestrator::new(stack.engine.clone(), answerer.clone(), history.clone(), &settings);
    Harness { stack, answerer, history, orchestrator }
}

#[tokio::test]
async fn grounded_answer_cites_the_uploaded_policy() {
    let h = harness(Settings::default(), ScriptedAnswerer::new(JSON_ANSWER), None);
    h.stack.ingestor.ingest("policy", Domain::Insurance, KNEE).await.unwrap();

    let record = h
        .orchestrator
        .answer(QueryRequest::new("Does this policy cover knee surgery?"))
        .await
        .unwrap();

    assert!(record.answer.contains("covered"));
    assert_eq!(record.answer_format, AnswerFormat::Structured);
    assert_eq!(record.grounding, Grounding::Documents);
    assert!(record.confidence > 0.5, "confidence {}", record.confidence);
    let top = &record.results[0];
    assert!(top.provenance.includes_vector() || top.provenance.includes_lexical());
    assert_eq!(top.chunk.as_ref().unwrap().document_id, "policy");
    assert_eq!(record.citations[0].document_id.as_deref(), Some("policy"));
    assert_eq!(record.evidence.len(), 1);

    let prompts = h.answerer.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].user.contains(KNEE));

    let stored = h.history.get(record.id).await.unwrap().unwrap();
    assert_eq!(stored, record);
}

#[tokio::test]
async fn empty_corpus_yields_explicit_no_evidence_answer() {
    for web in [FakeWebSearch::empty(), FakeWebSearch::failing()] {
        let web = Arc::new(web);
        let h = harness(Settings::default(), ScriptedAnswerer::new(JSON_ANSWER), Some(web.clone()));

        let record = h.orchestrator.answer(QueryRequest::new("What is the refund policy?")).await.unwrap();

        assert_eq!(web.calls(), 1);
        assert_eq!(record.answer, NO_EVIDENCE_ANSWER);
        assert_eq!(record.answer_format, AnswerFormat::NoEvidence);
        assert_eq!(record.grounding, Grounding::None);
        assert!(record.results.is_empty() && record.citations.is_empty());
        assert!(record.confidence <= 0.2);
        assert!(h.answerer.prompts().is_empty());
    }
}

#[tokio::test]
async fn web_only_evidence_is_labelled_and_capped() {
    let web = Arc::new(FakeWebSearch::new(vec![WebSnippet {
        text: "Refunds are issued within 30 days.".into(),
        url: "https://example.com/refunds".into(),
        score: 1.0,
    }]));
    let h = harness(Settings::default(), ScriptedAnswerer::new(JSON_ANSWER), Some(web));

    let record = h.orchestrator.answer(QueryRequest::new("What is the refund policy?")).await.unwrap();

    assert_eq!(record.grounding, Grounding::Web);
    assert!(record.results.iter().all(|r| r.provenance.is_web()));
    assert!(record.confidence <= Settings::default().confidence.web_ceiling);
    assert!(h.answerer.prompts()[0].user.contains("No relevant information was found"));
}

#[tokio::test]
async fn deleted_document_disappears_but_history_survives() {
    let h = harness(Settings::default(), ScriptedAnswerer::new(JSON_ANSWER), None);
    h.stack.ingestor.ingest("policy", Domain::Insurance, KNEE).await.unwrap();
    h.stack
        .ingestor
        .ingest("handbook", Domain::Hr, "Employees accrue vacation days every month.")
        .await
        .unwrap();

    let before = h.orchestrator.answer(QueryRequest::new("Is knee surgery covered?")).await.unwrap();
    assert!(before.citations.iter().any(|c| c.document_id.as_deref() == Some("policy")));

    h.stack.ingestor.delete("policy").await.unwrap();

    let after = h.orchestrator.answer(QueryRequest::new("Is knee surgery covered?")).await.unwrap();
    assert!(after
        .results
        .iter()
        .all(|r| r.chunk.as_ref().map_or(true, |c| c.document_id != "policy")));

    let stored = h.orchestrator.query(before.id).await.unwrap().unwrap();
    assert_eq!(stored, before);
    assert_eq!(h.orchestrator.history(&HistoryFilter::default()).await.unwrap().len(), 2);
}

#[tokio::test]
async fn generation_failure_is_terminal_and_unrecorded() {
    let h = harness(Settings::default(), ScriptedAnswerer::failing(), None);
    h.stack.ingestor.ingest("policy", Domain::Insurance, KNEE).await.unwrap();

    let err = h.orchestrator.answer(QueryRequest::new("Is knee surgery covered?")).await.unwrap_err();
    assert!(matches!(err, Error::GenerationFailed(_)));
    assert!(h.history.list(&HistoryFilter::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn generation_timeout_is_terminal() {
    let mut settings = Settings::default();
    settings.timeouts.answerer = 20;
    let slow = ScriptedAnswerer::new(JSON_ANSWER).with_delay(Duration::from_millis(500));
    let h = harness(settings, slow, None);
    h.stack.ingestor.ingest("policy", Domain::Insurance, KNEE).await.unwrap();

    let err = h.orchestrator.answer(QueryRequest::new("Is knee surgery covered?")).await.unwrap_err();
    assert!(matches!(err, Error::GenerationFailed(msg) if msg.contains("timed out")));
    assert!(h.history.list(&HistoryFilter::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn unstructured_output_degrades_to_raw_text() {
    let reply = "It seems knee surgery might be covered, but I cannot be sure.";
    let h = harness(Settings::default(), ScriptedAnswerer::new(reply), None);
    h.stack.ingestor.ingest("policy", Domain::Insurance, KNEE).await.unwrap();

    let record = h.orchestrator.answer(QueryRequest::new("Is knee surgery covered?")).await.unwrap();

    assert_eq!(record.answer_format, AnswerFormat::Raw);
    assert_eq!(record.answer, reply);
    assert!(record.reasoning.is_empty() && record.evidence.is_empty());
    assert!(!record.citations.is_empty());

    let confident = harness(Settings::default(), ScriptedAnswerer::new(JSON_ANSWER), None);
    confident.stack.ingestor.ingest("policy", Domain::Insurance, KNEE).await.unwrap();
    let baseline = confident
        .orchestrator
        .answer(QueryRequest::new("Is knee surgery covered?"))
        .await
        .unwrap();
    assert!(record.confidence < baseline.confidence);
}

#[tokio::test]
async fn invalid_requests_are_rejected_before_search() {
    let h = harness(Settings::default(), ScriptedAnswerer::new(JSON_ANSWER), None);
    for request in [
        QueryRequest::new("   "),
        QueryRequest::new("x".repeat(1001)),
        QueryRequest::new("q").with_max_results(0),
        QueryRequest::new("q").with_max_results(500),
    ] {
        let err = h.orchestrator.answer(request).await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }
    assert!(h.answerer.prompts().is_empty());
}

#[tokio::test]
async fn explicit_domain_and_document_filter_results() {
    let h = harness(Settings::default(), ScriptedAnswerer::new(JSON_ANSWER), None);
    h.stack.ingestor.ingest("policy", Domain::Insurance, KNEE).await.unwrap();
    h.stack
        .ingestor
        .ingest("rider", Domain::Insurance, "Knee braces are covered when prescribed after surgery.")
        .await
        .unwrap();

    let record = h
        .orchestrator
        .answer(
            QueryRequest::new("Is knee surgery covered?")
                .with_domain(Domain::Insurance)
                .with_document("rider"),
        )
        .await
        .unwrap();

    assert_eq!(record.document_id.as_deref(), Some("rider"));
    assert_eq!(record.domain, Domain::Insurance);
    assert!(h.answerer.prompts()[0].system.contains("insurance policy analyst"));
    assert!(record
        .results
        .iter()
        .all(|r| r.chunk.as_ref().map(|c| c.document_id.as_str()) == Some("rider")));
}
