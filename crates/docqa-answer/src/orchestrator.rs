use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use docqa_core::config::{AnswerSettings, ConfidenceSettings, Settings, TimeoutSettings};
use docqa_core::error::{Error, Result};
use docqa_core::query::{
    AnswerFormat, Citation, Grounding, Latency, QueryId, QueryRecord, QueryRequest,
};
use docqa_core::traits::{Answerer, GenerationParams, HistoryFilter, QueryHistory};
use docqa_core::types::{Domain, SearchFilter, SearchResult};
use docqa_hybrid::{HybridSearchEngine, SearchOutcome, SearchRequest};

use crate::confidence;
use crate::parse::{parse_answer, StructuredAnswer};
use crate::prompt::build_prompt;

pub const NO_EVIDENCE_ANSWER: &str =
    "No grounding evidence was found in the uploaded documents or on the web for this question.";

/// Answers one question end to end: search, prompt, generate, parse, score,
/// record.
///
/// A failed or timed-out generation is returned as `GenerationFailed` and
/// nothing is recorded. Every other collaborator failure degrades the answer.
pub struct QueryOrchestrator {
    engine: Arc<HybridSearchEngine>,
    answerer: Arc<dyn Answerer>,
    history: Arc<dyn QueryHistory>,
    answer: AnswerSettings,
    confidence: ConfidenceSettings,
    timeouts: TimeoutSettings,
}

impl QueryOrchestrator {
    pub fn new(
        engine: Arc<HybridSearchEngine>,
        answerer: Arc<dyn Answerer>,
        history: Arc<dyn QueryHistory>,
        settings: &Settings,
    ) -> Self {
        Self {
            engine,
            answerer,
            history,
            answer: settings.answer.clone(),
            confidence: settings.confidence.clone(),
            timeouts: settings.timeouts.clone(),
        }
    }

    #[instrument(skip_all, fields(question_len = request.question.len()))]
    pub async fn answer(&self, request: QueryRequest) -> Result<QueryRecord> {
        let started = Instant::now();
        let search_settings = self.engine.settings();
        let query = request.validate(search_settings.default_max_results, search_settings.max_results_limit)?;
        let domain = query.domain.unwrap_or_else(|| Domain::detect(&query.question));

        let search_started = Instant::now();
        let outcome = self
            .engine
            .search(&SearchRequest {
                question: query.question.clone(),
                filter: SearchFilter { document_id: query.document_id.clone(), domain: query.domain },
                domain_hint: domain,
                max_results: query.max_results,
            })
            .await?;
        let search_ms = elapsed_ms(search_started);
        let grounding = grounding_of(&outcome);

        let generation_started = Instant::now();
        let (structured, answer_format) = if outcome.results.is_empty() {
            info!("no evidence found; skipping generation");
            (
                StructuredAnswer {
                    answer: NO_EVIDENCE_ANSWER.to_string(),
                    limitations: vec!["No document or web passage matched the question.".to_string()],
                    ..StructuredAnswer::default()
                },
                AnswerFormat::NoEvidence,
            )
        } else {
            let raw = self.generate(&query.question, domain, grounding, &outcome.results).await?;
            match parse_answer(&raw) {
                Ok(parsed) => (parsed, AnswerFormat::Structured),
                Err(e) => {
                    warn!(error = %e, "answer not structured; returning raw text");
                    (StructuredAnswer::raw(&raw), AnswerFormat::Raw)
                }
            }
        };
        let generation_ms = match answer_format {
            AnswerFormat::NoEvidence => 0,
            _ => elapsed_ms(generation_started),
        };

        let hedged = answer_format != AnswerFormat::NoEvidence
            && confidence::detect_hedging(&structured.answer);
        let confidence = confidence::score(
            &outcome.results,
            hedged,
            &self.confidence,
            search_settings.min_relevance,
        );

        let record = QueryRecord {
            id: Uuid::new_v4(),
            question: query.question,
            domain,
            document_id: query.document_id,
            created_at: Utc::now(),
            answer: structured.answer,
            reasoning: structured.reasoning,
            confidence,
            evidence: structured.evidence,
            limitations: structured.limitations,
            follow_up: structured.follow_up,
            citations: outcome.results.iter().map(Citation::from).collect(),
            results: outcome.results,
            grounding,
            degraded: outcome.degraded,
            answer_format,
            latency: Latency { search_ms, generation_ms, total_ms: elapsed_ms(started) },
        };

        if let Err(e) = self.history.record(record.clone()).await {
            warn!(query_id = %record.id, error = %e, "failed to record query history");
        }
        info!(
            query_id = %record.id,
            %domain,
            results = record.results.len(),
            confidence = record.confidence,
            total_ms = record.latency.total_ms,
            "query answered"
        );
        Ok(record)
    }

    pub async fn history(&self, filter: &HistoryFilter) -> Result<Vec<QueryRecord>> {
        self.history.list(filter).await
    }

    pub async fn query(&self, id: QueryId) -> Result<Option<QueryRecord>> {
        self.history.get(id).await
    }

    async fn generate(
        &self,
        question: &str,
        domain: Domain,
        grounding: Grounding,
        results: &[SearchResult],
    ) -> Result<String> {
        let prompt = build_prompt(question, domain, grounding, results, self.answer.context_results);
        let params = GenerationParams {
            max_tokens: self.answer.max_tokens,
            temperature: self.answer.temperature,
        };
        let limit = self.timeouts.answerer();
        match tokio::time::timeout(limit, self.answerer.generate(&prompt, params)).await {
            Ok(Ok(raw)) => Ok(raw),
            Ok(Err(e)) => {
                warn!(error = %e, "generation failed");
                Err(match e {
                    Error::GenerationFailed(_) => e,
                    other => Error::GenerationFailed(other.to_string()),
                })
            }
            Err(_) => {
                warn!(timeout_ms = limit.as_millis() as u64, "generation timed out");
                Err(Error::GenerationFailed(format!(
                    "answerer timed out after {}ms",
                    limit.as_millis()
                )))
            }
        }
    }
}

fn grounding_of(outcome: &SearchOutcome) -> Grounding {
    if outcome.results.is_empty() {
        Grounding::None
    } else if outcome.results.iter().all(|r| r.provenance.is_web()) {
        Grounding::Web
    } else {
        Grounding::Documents
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}
