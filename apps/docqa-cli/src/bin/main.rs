use std::env;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use docqa_answer::QueryOrchestrator;
use docqa_cli::{build_orchestrator, ingest_dir, init_tracing, print_results};
use docqa_core::config::{Config, Settings};
use docqa_core::query::{QueryRecord, QueryRequest};
use docqa_core::traits::HistoryFilter;
use docqa_hybrid::SearchStack;

const USAGE: &str = "Usage: docqa <ingest|ask|repl> [dir] [question...] [--domain d] [--document id] [--max n] [--json]";

struct Args {
    cmd: String,
    dir: Option<PathBuf>,
    words: Vec<String>,
    domain: Option<String>,
    document: Option<String>,
    max: Option<usize>,
    json: bool,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("{USAGE}");
        std::process::exit(1);
    }
    let cmd = args.remove(0);
    let mut parsed = Args { cmd, dir: None, words: vec![], domain: None, document: None, max: None, json: false };
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--domain" | "--document" | "--max" => {
                let flag = args[i].clone();
                let value = args
                    .get(i + 1)
                    .cloned()
                    .ok_or_else(|| anyhow::anyhow!("{flag} requires a value"))?;
                match flag.as_str() {
                    "--domain" => parsed.domain = Some(value),
                    "--document" => parsed.document = Some(value),
                    _ => parsed.max = Some(value.parse()?),
                }
                i += 1;
            }
            "--json" => parsed.json = true,
            other if parsed.dir.is_none() => parsed.dir = Some(PathBuf::from(other)),
            other => parsed.words.push(other.to_string()),
        }
        i += 1;
    }
    Ok(parsed)
}

fn request_from(question: &str, args: &Args) -> anyhow::Result<QueryRequest> {
    let mut request = QueryRequest::new(question);
    if let Some(d) = &args.domain {
        request = request.with_domain(d.parse()?);
    }
    if let Some(doc) = &args.document {
        request = request.with_document(doc.clone());
    }
    if let Some(n) = args.max {
        request = request.with_max_results(n);
    }
    Ok(request)
}

fn print_record(record: &QueryRecord, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(record)?);
        return Ok(());
    }
    println!("\nAnswer: {}", record.answer);
    if !record.reasoning.is_empty() {
        println!("Reasoning: {}", record.reasoning);
    }
    for e in &record.evidence {
        println!("  evidence: {e}");
    }
    for l in &record.limitations {
        println!("  limitation: {l}");
    }
    for f in &record.follow_up {
        println!("  follow-up: {f}");
    }
    println!(
        "Confidence: {:.2}  grounding={:?}  format={:?}  degraded={:?}",
        record.confidence, record.grounding, record.answer_format, record.degraded
    );
    println!(
        "Latency: search={}ms generation={}ms total={}ms",
        record.latency.search_ms, record.latency.generation_ms, record.latency.total_ms
    );
    println!("\nSources ({}):", record.results.len());
    print_results(&record.results);
    Ok(())
}

async fn prepare(settings: &Settings, dir: &Path) -> anyhow::Result<SearchStack> {
    let stack = SearchStack::open(settings, Path::new(".")).await?;
    let reports = ingest_dir(&stack, dir).await?;
    let chunks: usize = reports.iter().map(|r| r.chunk_count).sum();
    println!("Ingested {} documents ({chunks} chunks) from {}", reports.len(), dir.display());
    Ok(stack)
}

async fn repl(stack: &SearchStack, orchestrator: &QueryOrchestrator, args: &Args) -> anyhow::Result<()> {
    println!("Commands: :history  :docs  :delete <id>  :quit  <question>");
    loop {
        print!("docqa> ");
        io::stdout().flush()?;
        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        match input.split_once(' ').unwrap_or((input, "")) {
            (":quit" | ":q", _) => break,
            (":history", _) => {
                for r in orchestrator.history(&HistoryFilter { limit: Some(20), ..HistoryFilter::default() }).await? {
                    println!("  {} {:.2} {} -> {}", r.created_at.format("%H:%M:%S"), r.confidence, r.question, r.answer);
                }
            }
            (":docs", _) => {
                for d in stack.catalog.list(0, 100).await {
                    println!("  {} [{}] {} chunks={}", d.id, d.domain, d.status, d.chunk_count);
                }
            }
            (":delete", id) => match stack.ingestor.delete(id.trim()).await {
                Ok(report) => println!("Deleted {} ({} chunks)", report.document_id, report.chunks_removed),
                Err(e) => println!("Delete failed: {e}"),
            },
            _ => match orchestrator.answer(request_from(input, args)?).await {
                Ok(record) => print_record(&record, args.json)?,
                Err(e) => println!("Query failed: {e}"),
            },
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {e}");
        e
    })?;
    let settings = config.settings()?;
    let args = parse_args()?;
    let dir = args.dir.clone().unwrap_or_else(|| PathBuf::from(&settings.data.raw_txt_dir));

    match args.cmd.as_str() {
        "ingest" => {
            let stack = SearchStack::open(&settings, Path::new(".")).await?;
            for report in ingest_dir(&stack, &dir).await? {
                println!(
                    "  {} status={} chunks={} vectors={}",
                    report.document_id, report.status, report.chunk_count, report.vector_indexed
                );
            }
        }
        "ask" => {
            if args.words.is_empty() {
                anyhow::bail!("ask needs a question\n{USAGE}");
            }
            let stack = prepare(&settings, &dir).await?;
            let orchestrator = build_orchestrator(&stack, &settings);
            let record = orchestrator.answer(request_from(&args.words.join(" "), &args)?).await?;
            print_record(&record, args.json)?;
        }
        "repl" => {
            let stack = prepare(&settings, &dir).await?;
            let orchestrator = build_orchestrator(&stack, &settings);
            repl(&stack, &orchestrator, &args).await?;
        }
        other => {
            eprintln!("Unknown command: {other}\n{USAGE}");
            std::process::exit(1);
        }
    }
    Ok(())
}
