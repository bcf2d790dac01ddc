use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::tokenizer::tokenize;

pub type TermFreq = HashMap<String, usize>;
pub type DocFreq = HashMap<String, usize>;

/// Per-document term statistics. Built once at ingestion time and replaced
/// wholesale if the same key is ever re-ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocData {
    /// Total number of term occurrences in the document (not distinct terms).
    pub term_count: usize,
    pub terms: TermFreq,
}

/// Raw extracted page text kept purely so a later process can rebuild the
/// model without re-fetching the web. Not consulted at query time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedPage {
    pub url: String,
    pub content: String,
}

/// The shared index state. Every field is read and written only while
/// holding the single `SharedModel` lock.
#[derive(Debug, Default)]
pub struct Model {
    /// Corpus label: the crawled host or the snapshot directory name.
    pub name: String,
    pub documents: HashMap<String, DocData>,
    /// Term -> number of distinct documents containing it. Incremented once
    /// per term per ingestion; there is no delete path, so never decremented.
    pub document_frequency: DocFreq,
    /// Accumulates the number of *distinct* terms contributed by each
    /// document, so `average_doc_length` is really an average vocabulary
    /// size. Kept that way: changing it changes ranking.
    pub total_term_occurrences: usize,
    pub doc_count: usize,
    /// Progress denominator: URLs known to exist so far (or snapshot size on
    /// restore). Only ever revised upward.
    pub expected_doc_count: usize,
    /// Set once by `finalize`; 0.0 while the corpus is still growing.
    pub average_doc_length: f32,
    pub url_labels: HashMap<String, String>,
    pub label_urls: HashMap<String, String>,
    pub is_complete: bool,
}

pub type SharedModel = Arc<Mutex<Model>>;

pub fn new_shared_model() -> SharedModel {
    Arc::new(Mutex::new(Model::default()))
}

impl Model {
    /// Return the model to its empty state before a fresh crawl or restore.
    pub fn reset(&mut self) {
        *self = Model::default();
    }

    /// Declare ingestion finished: derive the average document length and
    /// mark the model complete. Callers must not trust
    /// `average_doc_length` before this runs.
    pub fn finalize(&mut self) {
        if self.doc_count > 0 {
            self.average_doc_length = self.total_term_occurrences as f32 / self.doc_count as f32;
        }
        self.is_complete = true;
    }

    /// Fraction of known documents ingested so far.
    pub fn progress(&self) -> f32 {
        if self.expected_doc_count == 0 {
            0.0
        } else {
            self.doc_count as f32 / self.expected_doc_count as f32
        }
    }
}

/// Tokenize `content` and fold it into the model under `key`.
///
/// Tokenization happens outside the lock; all side effects land in one lock
/// section, so concurrent readers see either none or all of the update.
/// Re-ingesting a key replaces its `DocData` but still bumps
/// `document_frequency` and `total_term_occurrences` a second time — there
/// is no de-duplication on re-ingestion, and corrected variants should be
/// substituted here if that ever changes.
pub fn ingest_document(model: &SharedModel, content: &str, key: &str) {
    let mut terms = TermFreq::new();
    let mut term_count = 0usize;
    for term in tokenize(content) {
        *terms.entry(term).or_insert(0) += 1;
        term_count += 1;
    }

    let mut m = model.lock();
    for term in terms.keys() {
        *m.document_frequency.entry(term.clone()).or_insert(0) += 1;
        m.total_term_occurrences += 1;
    }
    m.documents.insert(key.to_string(), DocData { term_count, terms });
    m.doc_count = m.documents.len();
    tracing::debug!(key, doc_count = m.doc_count, "ingested document");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_frequency_never_exceeds_doc_count() {
        let model = new_shared_model();
        ingest_document(&model, "apples and oranges", "a");
        ingest_document(&model, "oranges oranges pears", "b");
        ingest_document(&model, "apples pears plums", "c");

        let m = model.lock();
        assert_eq!(m.doc_count, 3);
        for (term, df) in &m.document_frequency {
            assert!(*df <= m.doc_count, "df[{term}] = {df} > {}", m.doc_count);
        }
    }

    #[test]
    fn reingestion_double_counts_frequencies_but_not_documents() {
        let model = new_shared_model();
        ingest_document(&model, "apples and oranges", "a");
        let (df_once, total_once, doc_once) = {
            let m = model.lock();
            (
                m.document_frequency.clone(),
                m.total_term_occurrences,
                m.documents.get("a").cloned(),
            )
        };

        ingest_document(&model, "apples and oranges", "a");
        let m = model.lock();
        // The document table and document count are unchanged...
        assert_eq!(m.doc_count, 1);
        assert_eq!(m.documents.get("a").cloned(), doc_once);
        // ...while the frequency accounting doubles. Intentional: there is
        // no de-duplication on re-ingestion.
        assert_eq!(m.total_term_occurrences, total_once * 2);
        for (term, df) in &df_once {
            assert_eq!(m.document_frequency[term], df * 2);
        }
    }

    #[test]
    fn empty_document_contributes_empty_doc_data() {
        let model = new_shared_model();
        ingest_document(&model, "", "empty");
        let m = model.lock();
        let doc = m.documents.get("empty").unwrap();
        assert_eq!(doc.term_count, 0);
        assert!(doc.terms.is_empty());
        assert_eq!(m.doc_count, 1);
        assert_eq!(m.total_term_occurrences, 0);
    }

    #[test]
    fn average_doc_length_is_average_vocabulary_size() {
        let model = new_shared_model();
        // "appl" occurs twice but counts once toward the corpus total.
        ingest_document(&model, "apple apple banana", "a");
        {
            let m = model.lock();
            assert_eq!(m.average_doc_length, 0.0);
            assert!(!m.is_complete);
            assert_eq!(m.documents["a"].term_count, 3);
        }
        model.lock().finalize();
        let m = model.lock();
        assert!(m.is_complete);
        assert_eq!(m.average_doc_length, 2.0);
    }

    #[test]
    fn reset_clears_everything() {
        let model = new_shared_model();
        ingest_document(&model, "some words here", "a");
        let mut m = model.lock();
        m.name = "example.com".into();
        m.expected_doc_count = 4;
        m.finalize();
        m.reset();
        assert_eq!(m.doc_count, 0);
        assert!(m.documents.is_empty());
        assert!(m.document_frequency.is_empty());
        assert!(!m.is_complete);
        assert_eq!(m.average_doc_length, 0.0);
        assert!(m.name.is_empty());
    }

    #[test]
    fn progress_tracks_expected_documents() {
        let model = new_shared_model();
        assert_eq!(model.lock().progress(), 0.0);
        {
            let mut m = model.lock();
            m.expected_doc_count = 4;
        }
        ingest_document(&model, "one", "a");
        assert_eq!(model.lock().progress(), 0.25);
    }
}
