use anyhow::Result;
use clap::Parser;
use sift_core::model::new_shared_model;
use sift_crawler::{build_http_client, crawl_domain, DEFAULT_USER_AGENT};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "crawler")]
#[command(about = "Crawl one domain and persist a ranked-index snapshot")]
struct Cli {
    /// Seed URL; the crawl never leaves its host
    seed: String,
    /// Maximum number of URLs to visit before forcing completion
    #[arg(long, default_value_t = 10_000)]
    max_pages: usize,
    /// Directory holding one snapshot subdirectory per crawled host
    #[arg(long, default_value = "./indexes")]
    index_root: PathBuf,
    /// User-Agent string sent with every request
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    user_agent: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Cli::parse();

    let client = build_http_client(&args.user_agent)?;
    let model = new_shared_model();
    let outcome = crawl_domain(&client, &args.seed, &model, &args.index_root, args.max_pages).await?;

    let m = model.lock();
    tracing::info!(
        host = %outcome.host,
        pages = outcome.pages_indexed,
        visited = outcome.urls_visited,
        terms = m.document_frequency.len(),
        capped = outcome.capped,
        "crawl complete"
    );
    Ok(())
}
