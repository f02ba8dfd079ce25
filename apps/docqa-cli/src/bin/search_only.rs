use std::env;
use std::path::{Path, PathBuf};

use docqa_cli::{ingest_dir, init_tracing, print_results};
use docqa_core::config::Config;
use docqa_core::types::{Domain, SearchFilter};
use docqa_hybrid::{SearchRequest, SearchStack};

/// Retrieval without generation: ingest a directory, run one hybrid search.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <dir> <query...>", args[0]);
        eprintln!("Example: {} ./policies 'is knee surgery covered'", args[0]);
        std::process::exit(1);
    }
    let settings = Config::load()?.settings()?;
    let dir = PathBuf::from(&args[1]);
    let query = args[2..].join(" ");

    let stack = SearchStack::open(&settings, Path::new(".")).await?;
    let reports = ingest_dir(&stack, &dir).await?;
    println!("docqa-search: {} documents from {}", reports.len(), dir.display());
    println!("Query: {query}");

    let outcome = stack
        .engine
        .search(&SearchRequest {
            question: query.clone(),
            filter: SearchFilter::default(),
            domain_hint: Domain::detect(&query),
            max_results: settings.search.default_max_results,
        })
        .await?;
    println!(
        "\nFound {} results ({} above threshold, web_fallback={}, degraded={:?})",
        outcome.results.len(),
        outcome.above_threshold,
        outcome.web_fallback,
        outcome.degraded
    );
    print_results(&outcome.results);
    Ok(())
}
