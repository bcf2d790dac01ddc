use serde::Serialize;
use std::cmp::Ordering;

use crate::model::{DocFreq, Model, TermFreq};
use crate::tokenizer::tokenize;

const K1: f32 = 1.2;
const B: f32 = 0.75;

/// One ranked document: its display label, its key, and its score.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub name: String,
    pub path: String,
    pub score: f32,
}

/// BM25 term-frequency contribution of `term` within one document.
/// `doc_term_count` is the total (not distinct) term count of the document.
pub fn bm25_tf(term: &str, doc_term_count: usize, terms: &TermFreq, avg_doc_len: f32) -> f32 {
    match terms.get(term) {
        Some(&f) => {
            let f = f as f32;
            f * (K1 + 1.0) / (f + K1 * (1.0 - B + B * (doc_term_count as f32 / avg_doc_len)))
        }
        None => 0.0,
    }
}

/// BM25 inverse-document-frequency weight. The numerator is clamped so the
/// logarithm never goes negative; terms in more than half the corpus come
/// out exactly zero.
pub fn bm25_idf(term: &str, corpus_size: usize, document_frequency: &DocFreq) -> f32 {
    let df = document_frequency.get(term).copied().unwrap_or(0) as f64;
    let m = df + 0.5;
    let n = (corpus_size as f64 - df + 0.5).max(m);
    (n / m).log10() as f32
}

/// Plain TF-IDF term frequency: occurrences over document length.
pub fn tfidf_tf(term: &str, doc_term_count: usize, terms: &TermFreq) -> f32 {
    match terms.get(term) {
        Some(&f) => f as f32 / doc_term_count as f32,
        None => 0.0,
    }
}

/// Unsmoothed TF-IDF inverse document frequency, guarded against df = 0.
pub fn tfidf_idf(term: &str, corpus_size: usize, document_frequency: &DocFreq) -> f32 {
    let df = document_frequency.get(term).copied().unwrap_or(0).max(1) as f64;
    (corpus_size as f64 / df).log10() as f32
}

/// Score every document in the model against `query` with BM25 and return
/// the full list sorted by descending score, plus the number of
/// (term x document) evaluations performed.
pub fn rank_bm25(model: &Model, query: &str) -> (Vec<SearchResult>, usize) {
    rank_with(model, query, |term, doc, model| {
        bm25_tf(term, doc.term_count, &doc.terms, model.average_doc_length)
            * bm25_idf(term, model.documents.len(), &model.document_frequency)
    })
}

/// TF-IDF fallback ranking. Invoked by callers when the top BM25 result
/// scores zero: the unsmoothed IDF still separates documents on terms whose
/// BM25 weight collapsed.
pub fn rank_tfidf(model: &Model, query: &str) -> (Vec<SearchResult>, usize) {
    rank_with(model, query, |term, doc, model| {
        tfidf_tf(term, doc.term_count, &doc.terms)
            * tfidf_idf(term, model.documents.len(), &model.document_frequency)
    })
}

fn rank_with<F>(model: &Model, query: &str, term_score: F) -> (Vec<SearchResult>, usize)
where
    F: Fn(&str, &crate::model::DocData, &Model) -> f32,
{
    let query_terms = tokenize(query);
    let mut results = Vec::with_capacity(model.documents.len());
    let mut evaluated = 0usize;

    for (path, doc) in &model.documents {
        let mut score = 0.0f32;
        for term in &query_terms {
            score += term_score(term.as_str(), doc, model);
            evaluated += 1;
        }
        results.push(SearchResult {
            name: model.url_labels.get(path).cloned().unwrap_or_default(),
            path: path.clone(),
            score,
        });
    }

    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    (results, evaluated)
}

/// Keep only the results whose score satisfies `keep`.
pub fn filter_results<F>(results: Vec<SearchResult>, keep: F) -> Vec<SearchResult>
where
    F: Fn(f32) -> bool,
{
    results.into_iter().filter(|r| keep(r.score)).collect()
}

pub fn is_positive(score: f32) -> bool {
    score > 0.0
}
