use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{self, create_dir_all};
use std::io::{Read, Write};
use std::path::Path;

use crate::model::{ingest_document, CachedPage, SharedModel};

/// Reserved snapshot file names. Any other `.gz` file in a snapshot
/// directory is loaded as a content-cache shard.
pub const URL_LABELS_FILE: &str = "url-files.gz";
pub const REVERSE_URL_LABELS_FILE: &str = "reverse-url-files.gz";
pub const CONTENT_CACHE_FILE: &str = "indexed-data.gz";

/// Serialize `data` with bincode, gzip it, and write it under `dir`.
pub fn write_gzip_file<T: Serialize>(dir: &Path, file_name: &str, data: &T) -> Result<()> {
    create_dir_all(dir).with_context(|| format!("creating snapshot dir {}", dir.display()))?;
    let encoded = bincode::serialize(data).context("encoding snapshot data")?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&encoded).context("compressing snapshot data")?;
    let compressed = encoder.finish().context("finishing gzip stream")?;
    let path = dir.join(file_name);
    fs::write(&path, compressed).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn read_gzip_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let compressed =
        fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let mut decoder = GzDecoder::new(compressed.as_slice());
    let mut encoded = Vec::new();
    decoder
        .read_to_end(&mut encoded)
        .with_context(|| format!("decompressing {}", path.display()))?;
    bincode::deserialize(&encoded).with_context(|| format!("decoding {}", path.display()))
}

/// Persist one crawl's raw content and label tables into `dir` as three
/// compressed files. Any failure here means the corpus cannot be saved;
/// callers treat it as fatal and do not retry.
pub fn persist_snapshot(
    dir: &Path,
    cache: &HashMap<String, CachedPage>,
    url_labels: &HashMap<String, String>,
    label_urls: &HashMap<String, String>,
) -> Result<()> {
    write_gzip_file(dir, CONTENT_CACHE_FILE, cache)?;
    write_gzip_file(dir, URL_LABELS_FILE, url_labels)?;
    write_gzip_file(dir, REVERSE_URL_LABELS_FILE, label_urls)?;
    tracing::info!(dir = %dir.display(), pages = cache.len(), "snapshot persisted");
    Ok(())
}

/// Rebuild a model from a snapshot directory. Label tables load directly;
/// content-cache shards are replayed through the live ingestion path, so a
/// restored model satisfies the same invariants as one built by crawling.
/// Unreadable individual files are skipped; the caller finalizes the model.
pub fn restore_snapshot(dir: &Path, model: &SharedModel) -> Result<()> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("opening snapshot dir {}", dir.display()))?;

    for entry in entries {
        let entry = entry.with_context(|| format!("listing {}", dir.display()))?;
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("gz") {
            continue;
        }
        let file_name = entry.file_name();
        match file_name.to_str() {
            Some(URL_LABELS_FILE) => match read_gzip_file::<HashMap<String, String>>(&path) {
                Ok(labels) => model.lock().url_labels = labels,
                Err(err) => tracing::warn!(error = %err, "skipping unreadable label table"),
            },
            Some(REVERSE_URL_LABELS_FILE) => {
                match read_gzip_file::<HashMap<String, String>>(&path) {
                    Ok(labels) => model.lock().label_urls = labels,
                    Err(err) => {
                        tracing::warn!(error = %err, "skipping unreadable reverse label table")
                    }
                }
            }
            _ => match read_gzip_file::<HashMap<String, CachedPage>>(&path) {
                Ok(cache) => {
                    model.lock().expected_doc_count += cache.len();
                    for (key, page) in cache {
                        ingest_document(model, &page.content, &key);
                    }
                }
                Err(err) => tracing::warn!(error = %err, "skipping unreadable content shard"),
            },
        }
    }

    tracing::info!(dir = %dir.display(), "finished loading snapshot");
    Ok(())
}
