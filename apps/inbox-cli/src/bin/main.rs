use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use inbox_core::chunker::TextSplitter;
use inbox_core::config::{expand_path, Config, Settings};
use inbox_core::loader::load_emails;
use inbox_core::types::{email_chunk_to_text, Email};
use inbox_embed::build_embedder;
use inbox_hybrid::{build_reranker, EmailSearch, SearchRequest};
use inbox_vector::EmbeddingRanker;

#[derive(Parser)]
#[command(name = "inbox", about = "Hybrid search over a local email corpus")]
struct Cli {
    /// Email corpus (JSON array); overrides `data.emails_path`.
    #[arg(long, global = true)]
    emails: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Keyword and/or semantic search, fused and reranked.
    Search {
        /// Comma-separated keywords for BM25.
        #[arg(long, value_delimiter = ',')]
        keywords: Vec<String>,
        /// Natural-language query for embedding search.
        #[arg(long)]
        query: Option<String>,
        /// Print the raw JSON outcome.
        #[arg(long)]
        json: bool,
    },
    /// Chunk the corpus and print statistics.
    Chunks,
    /// Embed every chunk so later searches only embed the query.
    WarmCache,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

async fn corpus(cli_path: Option<PathBuf>, settings: &Settings) -> anyhow::Result<Vec<Email>> {
    let path = cli_path.unwrap_or_else(|| expand_path(&settings.data.emails_path));
    Ok(load_emails(&path).await?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let settings = Config::load()?.settings()?;

    match cli.command {
        Command::Search { keywords, query, json } => {
            let emails = corpus(cli.emails, &settings).await?;
            let embedder = build_embedder(&settings.embedding)?;
            let reranker = build_reranker(&settings.rerank)?;
            let search = EmailSearch::from_settings(&settings, embedder, reranker)?;
            let request = SearchRequest {
                keywords: if keywords.is_empty() { None } else { Some(keywords) },
                search_query: query,
            };
            let outcome = search.search(&emails, &request, &[]).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else if let Some(message) = &outcome.message {
                println!("{message}");
            } else {
                for (i, hit) in outcome.emails.iter().enumerate() {
                    println!("{:>2}. [{:.4}] {} | {} | {}", i + 1, hit.score, hit.timestamp, hit.from, hit.subject);
                    println!("    {}", hit.snippet);
                }
            }
        }
        Command::Chunks => {
            let emails = corpus(cli.emails, &settings).await?;
            let splitter = TextSplitter::from_settings(&settings.chunking)?;
            let chunks = splitter.chunk_emails(&emails);
            let lengths: Vec<usize> = chunks.iter().map(|c| c.chunk.chars().count()).collect();
            let max = lengths.iter().copied().max().unwrap_or(0);
            let avg = if lengths.is_empty() { 0.0 } else { lengths.iter().sum::<usize>() as f64 / lengths.len() as f64 };
            let multi = chunks.iter().filter(|c| c.index == 0 && c.total_chunks > 1).count();
            println!("emails:             {}", emails.len());
            println!("chunks:             {}", chunks.len());
            println!("multi-chunk emails: {multi}");
            println!("avg chunk chars:    {avg:.1}");
            println!("max chunk chars:    {max}");
        }
        Command::WarmCache => {
            let emails = corpus(cli.emails, &settings).await?;
            let splitter = TextSplitter::from_settings(&settings.chunking)?;
            let texts: Vec<String> = splitter.chunk_emails(&emails).iter().map(email_chunk_to_text).collect();
            let embedder = build_embedder(&settings.embedding)?;
            let ranker = EmbeddingRanker::from_settings(embedder, &settings)?;
            let embedded = ranker.warm_cache(&texts).await?;
            info!(texts = texts.len(), embedded, dir = %ranker.cache().dir().display(), "cache warm");
        }
    }
    Ok(())
}
