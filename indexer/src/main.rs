use anyhow::Result;
use clap::{Parser, Subcommand};
use sift_core::model::new_shared_model;
use sift_core::score::{filter_results, is_positive, rank_bm25, rank_tfidf};
use sift_core::snapshot::restore_snapshot;
use std::path::Path;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Inspect and query persisted crawl snapshots", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print summary statistics for a snapshot directory
    Stats {
        /// Snapshot directory (one crawled host)
        #[arg(long)]
        index: String,
    },
    /// Rank a query against a snapshot directory
    Query {
        /// Snapshot directory (one crawled host)
        #[arg(long)]
        index: String,
        /// Query text
        #[arg(long)]
        query: String,
        /// Number of results to print
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Stats { index } => stats(&index),
        Commands::Query { index, query, top } => run_query(&index, &query, top),
    }
}

fn load(index: &str) -> Result<sift_core::model::SharedModel> {
    let dir = Path::new(index);
    let model = new_shared_model();
    {
        let mut m = model.lock();
        m.name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
    }
    restore_snapshot(dir, &model)?;
    model.lock().finalize();
    Ok(model)
}

fn stats(index: &str) -> Result<()> {
    let model = load(index)?;
    let m = model.lock();
    let summary = serde_json::json!({
        "name": m.name,
        "doc_count": m.doc_count,
        "distinct_terms": m.document_frequency.len(),
        "average_doc_length": m.average_doc_length,
        "is_complete": m.is_complete,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn run_query(index: &str, query: &str, top: usize) -> Result<()> {
    let model = load(index)?;
    let m = model.lock();

    let (results, evaluated) = rank_bm25(&m, query);
    let (results, evaluated) = if results.first().map_or(true, |r| r.score == 0.0) {
        tracing::info!("query too generic, ranking with tf-idf");
        rank_tfidf(&m, query)
    } else {
        (results, evaluated)
    };
    tracing::info!(evaluated, "ranked query");

    let relevant = filter_results(results.into_iter().take(top).collect(), is_positive);
    if relevant.is_empty() {
        println!("No results found");
        return Ok(());
    }
    for result in relevant {
        println!("{} => {}", result.path, result.score);
    }
    Ok(())
}
