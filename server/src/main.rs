use anyhow::Result;
use clap::Parser;
use sift_core::snapshot::restore_snapshot;
use sift_server::{build_app, AppState};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "server")]
#[command(about = "Serve search, crawl, and progress APIs over one shared index")]
struct Args {
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// Directory holding one snapshot subdirectory per crawled host
    #[arg(long, default_value = "./indexes")]
    index_root: PathBuf,
    /// Page budget applied to crawls triggered through the API
    #[arg(long, default_value_t = 10_000)]
    max_pages: usize,
    /// Snapshot directory name to load at startup
    #[arg(long)]
    index: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let state = AppState::new(args.index_root.clone(), args.max_pages)?;

    if let Some(name) = args.index {
        let dir = args.index_root.join(&name);
        let model = state.model.clone();
        model.lock().name = name.clone();
        tokio::task::spawn_blocking(move || match restore_snapshot(&dir, &model) {
            Ok(()) => {
                model.lock().finalize();
                tracing::info!(index = %name, "snapshot loaded");
            }
            Err(err) => {
                tracing::error!(index = %name, error = %err, "failed to load snapshot");
            }
        });
    }

    let app = build_app(state);
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
