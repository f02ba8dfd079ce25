use std::fmt::Write;

use docqa_core::query::Grounding;
use docqa_core::traits::Prompt;
use docqa_core::types::{Domain, Provenance, SearchResult};

const RESPONSE_FORMAT: &str = r#"Response format (JSON):
{
  "answer": "Direct answer to the query",
  "reasoning": "How the answer follows from the context",
  "evidence": ["Document excerpts that support the answer"],
  "limitations": ["Conditions, exclusions or information gaps"],
  "follow_up": ["Questions that would clarify the answer"]
}

Answer only from the supplied context. If the context does not settle the question, say so."#;

fn role(domain: Domain) -> (&'static str, &'static str) {
    match domain {
        Domain::Insurance => (
            "an expert insurance policy analyst",
            "Be precise about coverage, exclusions, deductibles and claim conditions, citing policy sections when available.",
        ),
        Domain::Legal => (
            "an expert legal document analyst",
            "Identify the governing clauses, obligations and rights, and note any jurisdiction or interpretation caveats.",
        ),
        Domain::Hr => (
            "an expert HR policy analyst",
            "Explain which policy or procedure applies, who it applies to, and any eligibility conditions.",
        ),
        Domain::Compliance => (
            "an expert compliance analyst",
            "Name the relevant requirements or standards and state whether the described practice meets them.",
        ),
        Domain::General => (
            "an expert document analyst",
            "Give a clear, direct answer and acknowledge the limits of the available information.",
        ),
    }
}

pub fn system_prompt(domain: Domain) -> String {
    let (who, focus) = role(domain);
    format!("You are {who}. Your task is to answer questions from the provided document context.\n\n{focus}\n\n{RESPONSE_FORMAT}")
}

fn source_line(r: &SearchResult) -> String {
    match (&r.provenance, &r.chunk) {
        (Provenance::Web { url }, _) => format!("source=web score={:.2} url={url}", r.score),
        (p, Some(c)) => format!(
            "source={} score={:.2} document={} chunk={}",
            p.tag(),
            r.score,
            c.document_id,
            c.index
        ),
        (p, None) => format!("source={} score={:.2}", p.tag(), r.score),
    }
}

/// Chat prompt for the top `context_results` results.
pub fn build_prompt(
    question: &str,
    domain: Domain,
    grounding: Grounding,
    results: &[SearchResult],
    context_results: usize,
) -> Prompt {
    let mut context = String::new();
    for (i, r) in results.iter().take(context_results.max(1)).enumerate() {
        let _ = writeln!(context, "[{}] ({})\n{}\n", i + 1, source_line(r), r.content.trim());
    }

    let user = match grounding {
        Grounding::Web => format!(
            "Query: {question}\nDomain: {domain}\n\nNo relevant information was found in the uploaded documents for this query.\n\nWeb search results:\n{context}\nAnswer from these web results and state that they did not come from the user's documents."
        ),
        _ => format!(
            "Query: {question}\nDomain: {domain}\n\nContext from relevant documents:\n{context}\nAnalyze the query against the context and reply in the JSON format from the system prompt."
        ),
    };
    Prompt { system: system_prompt(domain), user }
}
