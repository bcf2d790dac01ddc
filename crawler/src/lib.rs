pub mod engine;
pub mod extract;

pub use engine::{build_http_client, crawl_domain, CrawlOutcome, DEFAULT_USER_AGENT};
