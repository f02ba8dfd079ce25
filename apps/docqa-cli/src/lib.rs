//! Shared plumbing for the `docqa` binaries.

use std::path::Path;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use docqa_answer::{InMemoryHistory, OpenAiAnswerer, QueryOrchestrator};
use docqa_core::config::Settings;
use docqa_core::loader::{self, DocumentLoader};
use docqa_core::types::SearchResult;
use docqa_hybrid::{IngestReport, SearchStack};

/// Logs go to stderr; `RUST_LOG` overrides the default `info` level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads and ingests every supported file under `dir`. Files that cannot be
/// loaded are recorded in the catalog as failed documents.
pub async fn ingest_dir(stack: &SearchStack, dir: &Path) -> anyhow::Result<Vec<IngestReport>> {
    let loaded = DocumentLoader::new().load_directory(dir);
    let pb = ProgressBar::new(loaded.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents {msg}")?
            .progress_chars("#>-"),
    );

    let mut reports = Vec::new();
    for (path, doc) in loaded {
        pb.set_message(path.display().to_string());
        match doc {
            Ok(doc) => match stack.ingestor.ingest(&doc.id, doc.domain, &doc.text).await {
                Ok(report) => reports.push(report),
                Err(e) => warn!(path = %path.display(), error = %e, "ingest failed"),
            },
            Err(e) => {
                pb.println(format!("failed {}: {e}", path.display()));
                let id = loader::document_id(dir, &path);
                let domain = loader::domain_from_path(dir, &path).unwrap_or_default();
                if let Err(e) = stack.ingestor.reject(&id, domain, &e.to_string()).await {
                    warn!(document_id = %id, error = %e, "could not record failed document");
                }
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();
    Ok(reports)
}

pub fn build_orchestrator(stack: &SearchStack, settings: &Settings) -> QueryOrchestrator {
    let api_key = std::env::var(&settings.services.api_key_env).unwrap_or_default();
    let answerer = OpenAiAnswerer::new(&settings.services.answerer_url, api_key, &settings.answer.model);
    QueryOrchestrator::new(stack.engine.clone(), Arc::new(answerer), Arc::new(InMemoryHistory::new()), settings)
}

pub fn print_results(results: &[SearchResult]) {
    for (i, r) in results.iter().enumerate() {
        let location = r
            .chunk
            .as_ref()
            .map(|c| format!("{} [{}..{}]", c.document_id, c.start, c.end))
            .unwrap_or_else(|| r.id.clone());
        println!(
            "  {}. score={:.3} rank={:.3} source={} {}",
            i + 1,
            r.score,
            r.ranking_score(),
            r.provenance.tag(),
            location
        );
        println!("     {}", snippet(&r.content, 160));
    }
}

fn snippet(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(max_chars) {
        Some((i, _)) => format!("{}...", &flat[..i]),
        None => flat,
    }
}
