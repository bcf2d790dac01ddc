use anyhow::{anyhow, Context, Result};
use lazy_static::lazy_static;
use parking_lot::Mutex;
use reqwest::{redirect, Client};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use url::Url;

use sift_core::label::url_to_name;
use sift_core::model::{ingest_document, CachedPage, SharedModel};
use sift_core::snapshot::persist_snapshot;

use crate::extract::extract_page;

pub const DEFAULT_USER_AGENT: &str = "sift-bot/0.1 (+https://example.com/bot)";

/// Capacity of the discovered-URL and fetch-error queues.
const QUEUE_CAPACITY: usize = 100;

lazy_static! {
    static ref IGNORED_EXTENSIONS: HashSet<&'static str> = [
        "zip", "tar", "gz", "rar", "7z",
        "jpg", "jpeg", "png", "gif", "bmp", "svg", "webp",
        "mp3", "wav", "ogg", "flac", "m4a",
        "mp4", "avi", "mkv", "flv", "mov", "wmv", "webm",
        "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "pages", "key", "numbers",
        "exe", "msi", "bin", "dmg", "apk", "deb", "rpm",
        "ttf", "otf", "woff", "woff2",
    ]
    .into_iter()
    .collect();
}

/// Links carrying a fragment or pointing at a non-text payload are never
/// queued; they contribute nothing indexable.
pub fn should_ignore_link(url: &Url) -> bool {
    if url.fragment().is_some_and(|f| !f.is_empty()) {
        return true;
    }
    match Path::new(url.path()).extension().and_then(|e| e.to_str()) {
        Some(ext) => IGNORED_EXTENSIONS.contains(ext),
        None => false,
    }
}

/// HTTP client shared by every fetch task. No per-request timeout: the only
/// brake on a crawl is its page budget.
pub fn build_http_client(user_agent: &str) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(user_agent)
        .redirect(redirect::Policy::limited(5))
        .build()
}

/// How a finished crawl went.
#[derive(Debug)]
pub struct CrawlOutcome {
    pub host: String,
    pub pages_indexed: usize,
    pub urls_visited: usize,
    /// True when the run hit its page budget rather than draining naturally.
    pub capped: bool,
}

enum CrawlEnd {
    Drained,
    Capped,
}

type PageCache = Arc<Mutex<HashMap<String, CachedPage>>>;

struct CrawlRun {
    seed_host: String,
    client: Client,
    model: SharedModel,
    cache: PageCache,
    /// Every URL ever dequeued for a fetch-or-skip decision, exactly once.
    /// Owned by the coordinator, which makes check-and-mark indivisible.
    visited: HashSet<String>,
    tasks: JoinSet<()>,
    found_tx: mpsc::Sender<String>,
    err_tx: mpsc::Sender<anyhow::Error>,
}

impl CrawlRun {
    /// Decide the fate of one dequeued URL: deduplicate, mark visited,
    /// enforce domain scope, register its label, and dispatch a fetch.
    /// Labels are registered before the fetch runs so progress UIs can show
    /// discovered-but-not-yet-indexed pages.
    fn admit(&mut self, raw_url: &str) {
        if self.visited.contains(raw_url) {
            tracing::debug!(url = raw_url, "skipping already-visited url");
            return;
        }
        self.visited.insert(raw_url.to_string());

        let url = match Url::parse(raw_url) {
            Ok(url) => url,
            Err(err) => {
                tracing::warn!(url = raw_url, error = %err, "dropping unparsable url");
                return;
            }
        };
        if url.host_str() != Some(self.seed_host.as_str()) {
            tracing::debug!(url = raw_url, "skipping cross-domain url");
            return;
        }

        let label = url_to_name(url.path());
        {
            let mut m = self.model.lock();
            m.url_labels.insert(raw_url.to_string(), label.clone());
            m.label_urls.insert(label, raw_url.to_string());
            m.expected_doc_count += 1;
        }

        self.tasks.spawn(fetch_and_ingest(
            self.client.clone(),
            url,
            self.model.clone(),
            self.cache.clone(),
            self.found_tx.clone(),
            self.err_tx.clone(),
        ));
    }
}

/// Crawl every reachable page of `seed_url`'s host, folding each page into
/// `model` as it arrives, until the discovery queue drains or `max_pages`
/// URLs have been visited. Either ending finalizes the model and persists a
/// snapshot under `index_root/<host>/`; a snapshot that cannot be written is
/// an error the caller must treat as fatal.
pub async fn crawl_domain(
    client: &Client,
    seed_url: &str,
    model: &SharedModel,
    index_root: &Path,
    max_pages: usize,
) -> Result<CrawlOutcome> {
    let seed = Url::parse(seed_url).with_context(|| format!("parsing seed url {seed_url}"))?;
    let host = seed
        .host_str()
        .ok_or_else(|| anyhow!("seed url {seed_url} has no host"))?
        .to_string();
    let out_dir = index_root.join(&host);
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating index dir {}", out_dir.display()))?;

    model.lock().name = host.clone();
    tracing::info!(host = %host, max_pages, "crawling domain");

    let (found_tx, mut found_rx) = mpsc::channel::<String>(QUEUE_CAPACITY);
    let (err_tx, mut err_rx) = mpsc::channel::<anyhow::Error>(QUEUE_CAPACITY);
    let mut run = CrawlRun {
        seed_host: host.clone(),
        client: client.clone(),
        model: model.clone(),
        cache: Arc::new(Mutex::new(HashMap::new())),
        visited: HashSet::new(),
        tasks: JoinSet::new(),
        found_tx,
        err_tx,
    };

    // The seed goes through the same admission path as any discovered URL.
    run.admit(seed.as_str());

    let end = 'run: loop {
        tokio::select! {
            Some(err) = err_rx.recv() => {
                tracing::warn!(error = %err, "crawl error");
            }
            Some(url) = found_rx.recv() => {
                // Budget is checked at dequeue time, before deduplication.
                if run.visited.len() >= max_pages {
                    break 'run CrawlEnd::Capped;
                }
                run.admit(&url);
            }
            Some(joined) = run.tasks.join_next() => {
                if let Err(err) = joined {
                    tracing::warn!(error = %err, "fetch task failed");
                }
                if run.tasks.is_empty() {
                    // No fetches in flight: admit whatever is still queued;
                    // if nothing respawns, the run has drained.
                    while let Ok(url) = found_rx.try_recv() {
                        if run.visited.len() >= max_pages {
                            break 'run CrawlEnd::Capped;
                        }
                        run.admit(&url);
                    }
                    if run.tasks.is_empty() {
                        break 'run CrawlEnd::Drained;
                    }
                }
            }
        }
    };

    if matches!(end, CrawlEnd::Capped) {
        tracing::info!(
            host = %host,
            visited = run.visited.len(),
            "page budget reached, draining in-flight fetches"
        );
        // New dispatch stops here; fetches already in flight run to
        // completion and their discoveries are discarded.
        while !run.tasks.is_empty() {
            tokio::select! {
                Some(err) = err_rx.recv() => {
                    tracing::warn!(error = %err, "crawl error");
                }
                Some(_) = found_rx.recv() => {}
                Some(joined) = run.tasks.join_next() => {
                    if let Err(err) = joined {
                        tracing::warn!(error = %err, "fetch task failed");
                    }
                }
            }
        }
    }
    while let Ok(err) = err_rx.try_recv() {
        tracing::warn!(error = %err, "crawl error");
    }

    model.lock().finalize();

    let cache = std::mem::take(&mut *run.cache.lock());
    let (url_labels, label_urls) = {
        let m = model.lock();
        (m.url_labels.clone(), m.label_urls.clone())
    };
    persist_snapshot(&out_dir, &cache, &url_labels, &label_urls)?;

    let outcome = CrawlOutcome {
        host,
        pages_indexed: model.lock().doc_count,
        urls_visited: run.visited.len(),
        capped: matches!(end, CrawlEnd::Capped),
    };
    tracing::info!(
        host = %outcome.host,
        pages = outcome.pages_indexed,
        visited = outcome.urls_visited,
        capped = outcome.capped,
        "finished crawling"
    );
    Ok(outcome)
}

/// Fetch one page, ingest it, and feed its links back to the coordinator.
/// Every fault here is per-URL: it is reported on the error queue and never
/// aborts the run.
async fn fetch_and_ingest(
    client: Client,
    page_url: Url,
    model: SharedModel,
    cache: PageCache,
    found_tx: mpsc::Sender<String>,
    err_tx: mpsc::Sender<anyhow::Error>,
) {
    let resp = match client.get(page_url.clone()).send().await {
        Ok(resp) => resp,
        Err(err) => {
            let _ = err_tx.send(anyhow!("error fetching {page_url}: {err}")).await;
            return;
        }
    };
    // Status codes are not inspected: any readable body gets indexed.
    let bytes = match resp.bytes().await {
        Ok(bytes) => bytes,
        Err(err) => {
            let _ = err_tx
                .send(anyhow!("error reading response body of {page_url}: {err}"))
                .await;
            return;
        }
    };
    let body = String::from_utf8_lossy(&bytes);
    let page = extract_page(&body);

    cache.lock().insert(
        page_url.to_string(),
        CachedPage { url: page_url.to_string(), content: page.text.clone() },
    );
    ingest_document(&model, &page.text, page_url.as_str());

    for href in &page.links {
        let resolved = match page_url.join(href) {
            Ok(resolved) => resolved,
            Err(err) => {
                let _ = err_tx.send(anyhow!("error parsing link {href}: {err}")).await;
                continue;
            }
        };
        if !resolved.scheme().starts_with("http") {
            continue;
        }
        if should_ignore_link(&resolved) {
            tracing::debug!(url = %resolved, "ignoring link");
            continue;
        }
        let _ = found_tx.send(resolved.to_string()).await;
    }
}
