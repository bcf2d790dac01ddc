pub mod label;
pub mod model;
pub mod score;
pub mod snapshot;
pub mod tokenizer;

pub use model::{
    ingest_document, new_shared_model, CachedPage, DocData, DocFreq, Model, SharedModel, TermFreq,
};
pub use score::SearchResult;
