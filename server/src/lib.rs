use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use reqwest::Url;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use sift_core::model::{new_shared_model, SharedModel};
use sift_core::score::{filter_results, is_positive, rank_bm25, rank_tfidf, SearchResult};
use sift_core::snapshot::restore_snapshot;
use sift_crawler::{build_http_client, crawl_domain, DEFAULT_USER_AGENT};

/// Result-list cap for one search response.
const MAX_RESULTS: usize = 20;

#[derive(Clone)]
pub struct AppState {
    pub model: SharedModel,
    pub client: reqwest::Client,
    pub index_root: PathBuf,
    pub max_pages: usize,
}

impl AppState {
    pub fn new(index_root: PathBuf, max_pages: usize) -> anyhow::Result<Self> {
        Ok(Self {
            model: new_shared_model(),
            client: build_http_client(DEFAULT_USER_AGENT)?,
            index_root,
            max_pages,
        })
    }
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub message: String,
    pub took_s: f64,
    /// (term x document) evaluations performed, for diagnostics.
    pub evaluated: usize,
    pub results: Vec<SearchResult>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize)]
pub struct ProgressResponse {
    pub message: String,
    pub is_complete: bool,
    pub index_progress: f32,
    pub index_name: String,
    pub doc_count: usize,
    pub expected_doc_count: usize,
    pub term_count: usize,
}

#[derive(Serialize)]
pub struct IndexesResponse {
    pub message: String,
    pub data: Vec<String>,
}

pub fn build_app(state: AppState) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new()
                    .allow_origin(AllowOrigin::list(origins))
                    .allow_methods(Any)
                    .allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/search", post(search_handler))
        .route("/api/crawl", post(crawl_handler))
        .route("/api/progress", get(progress_handler))
        .route("/api/indexes", get(indexes_handler))
        .route("/api/index", post(index_handler))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Rank the raw query in the request body. BM25 first; when its best score
/// is zero the query was too generic for the smoothed IDF, so rank again
/// with plain TF-IDF before giving up.
pub async fn search_handler(
    State(state): State<AppState>,
    query: String,
) -> Json<SearchResponse> {
    let start = Instant::now();
    let (results, evaluated) = {
        let model = state.model.lock();
        let (results, evaluated) = rank_bm25(&model, &query);
        if results.first().map_or(true, |top| top.score == 0.0) {
            tracing::info!(query = %query, "query too generic, ranking with tf-idf");
            rank_tfidf(&model, &query)
        } else {
            (results, evaluated)
        }
    };

    let top: Vec<SearchResult> = results.into_iter().take(MAX_RESULTS).collect();
    let relevant = filter_results(top, is_positive);
    let elapsed = start.elapsed();
    let message = if relevant.is_empty() {
        "No results found".to_string()
    } else {
        format!("Queried {} term-document pairs in {} ms", evaluated, elapsed.as_millis())
    };
    tracing::info!(query = %query, hits = relevant.len(), evaluated, "search complete");

    Json(SearchResponse {
        message,
        took_s: elapsed.as_secs_f64(),
        evaluated,
        results: relevant,
    })
}

/// Reset the model and start crawling the URL in the request body. The
/// caller polls /api/progress; a snapshot that cannot be persisted takes
/// the process down, since the crawl's results would otherwise be lost.
pub async fn crawl_handler(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    let seed = body.trim().to_string();
    if Url::parse(&seed).is_err() {
        return Err((StatusCode::BAD_REQUEST, "Invalid URL".to_string()));
    }

    state.model.lock().reset();
    let model = state.model.clone();
    let client = state.client.clone();
    let index_root = state.index_root.clone();
    let max_pages = state.max_pages;
    let crawl_seed = seed.clone();
    tokio::spawn(async move {
        match crawl_domain(&client, &crawl_seed, &model, &index_root, max_pages).await {
            Ok(outcome) => {
                tracing::info!(host = %outcome.host, pages = outcome.pages_indexed, "crawl finished");
            }
            Err(err) => {
                tracing::error!(error = %err, "crawl could not persist its snapshot");
                std::process::exit(1);
            }
        }
    });

    Ok(Json(MessageResponse { message: format!("initializing crawl of {seed}") }))
}

pub async fn progress_handler(State(state): State<AppState>) -> Json<ProgressResponse> {
    let m = state.model.lock();
    if m.doc_count == 0 {
        return Json(ProgressResponse {
            message: "Not Started".to_string(),
            is_complete: false,
            index_progress: 0.0,
            index_name: String::new(),
            doc_count: 0,
            expected_doc_count: 0,
            term_count: 0,
        });
    }
    Json(ProgressResponse {
        message: if m.is_complete { "Complete" } else { "In Progress" }.to_string(),
        is_complete: m.is_complete,
        index_progress: m.progress(),
        index_name: m.name.clone(),
        doc_count: m.doc_count,
        expected_doc_count: m.expected_doc_count,
        term_count: m.total_term_occurrences,
    })
}

/// List the snapshot directories available for restoring.
pub async fn indexes_handler(
    State(state): State<AppState>,
) -> Result<Json<IndexesResponse>, (StatusCode, String)> {
    if !state.index_root.is_dir() {
        std::fs::create_dir_all(&state.index_root)
            .map_err(|err| (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?;
    }
    let entries = std::fs::read_dir(&state.index_root)
        .map_err(|err| (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?;
    let mut data: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    data.sort();
    Ok(Json(IndexesResponse { message: "Available indexes".to_string(), data }))
}

/// Reset the model and rebuild it from a persisted snapshot directory named
/// in the request body.
pub async fn index_handler(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    let name = body.trim().to_string();
    if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
        return Err((StatusCode::BAD_REQUEST, "Invalid index name".to_string()));
    }
    let dir = state.index_root.join(&name);
    if !dir.is_dir() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Directory is not valid or does not exist".to_string(),
        ));
    }

    {
        let mut m = state.model.lock();
        m.reset();
        m.name = name.clone();
    }
    let model = state.model.clone();
    tokio::task::spawn_blocking(move || match restore_snapshot(&dir, &model) {
        Ok(()) => {
            model.lock().finalize();
            tracing::info!(index = %name, "snapshot loaded");
        }
        Err(err) => {
            tracing::error!(index = %name, error = %err, "failed to load snapshot");
        }
    });

    Ok(Json(MessageResponse { message: "Indexing started".to_string() }))
}
