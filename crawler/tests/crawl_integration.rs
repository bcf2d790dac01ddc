use sift_core::model::new_shared_model;
use sift_core::snapshot::{
    restore_snapshot, CONTENT_CACHE_FILE, REVERSE_URL_LABELS_FILE, URL_LABELS_FILE,
};
use sift_crawler::{build_http_client, crawl_domain, DEFAULT_USER_AGENT};
use tempfile::tempdir;

const SEED_PAGE: &str = r#"<html><body>
    <h1>Welcome</h1>
    <p>The seed page talks about crawling and indexing.</p>
    <a href="/page-two">two</a>
    <a href="/page-two#section">two again, fragmented</a>
    <a href="/archive/bundle.zip">bundle</a>
    <a href="https://elsewhere.example/offsite">offsite</a>
</body></html>"#;

const SECOND_PAGE: &str = r#"<html><body>
    <p>The second page talks about ranking and scoring.</p>
    <a href="/">home</a>
</body></html>"#;

async fn serve_two_pages() -> (mockito::ServerGuard, Vec<mockito::Mock>) {
    let mut server = mockito::Server::new_async().await;
    let mocks = vec![
        server
            .mock("GET", "/")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body(SEED_PAGE)
            .create_async()
            .await,
        server
            .mock("GET", "/page-two")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body(SECOND_PAGE)
            .create_async()
            .await,
    ];
    (server, mocks)
}

#[tokio::test]
async fn budget_of_one_indexes_only_the_seed() {
    let (server, _mocks) = serve_two_pages().await;
    let root = tempdir().unwrap();
    let client = build_http_client(DEFAULT_USER_AGENT).unwrap();
    let model = new_shared_model();

    let outcome = crawl_domain(&client, &server.url(), &model, root.path(), 1)
        .await
        .unwrap();

    assert!(outcome.capped);
    let m = model.lock();
    assert_eq!(m.doc_count, 1);
    assert!(m.is_complete);
}

#[tokio::test]
async fn crawl_stays_on_the_seed_host() {
    let (server, _mocks) = serve_two_pages().await;
    let root = tempdir().unwrap();
    let client = build_http_client(DEFAULT_USER_AGENT).unwrap();
    let model = new_shared_model();

    let outcome = crawl_domain(&client, &server.url(), &model, root.path(), 10)
        .await
        .unwrap();

    assert!(!outcome.capped);
    let m = model.lock();
    assert_eq!(m.doc_count, 2, "seed and same-host link only");
    assert!(m.is_complete);
    assert!(m.average_doc_length > 0.0);
    assert!(
        m.documents.keys().all(|url| !url.contains("elsewhere.example")),
        "cross-domain url must never be fetched"
    );
    // The fragment and archive links were dropped before queueing, so only
    // the seed and /page-two were ever known to exist.
    assert_eq!(m.expected_doc_count, 2);
    assert_eq!(m.name, "127.0.0.1");
}

#[tokio::test]
async fn fetch_failures_do_not_abort_the_run() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(
            r#"<html><body>still indexable
               <a href="/missing">gone</a></body></html>"#,
        )
        .create_async()
        .await;
    // "/missing" is unmocked: mockito answers it with an error status whose
    // body is still readable, and readable bodies are ingested.
    let root = tempdir().unwrap();
    let client = build_http_client(DEFAULT_USER_AGENT).unwrap();
    let model = new_shared_model();

    let outcome = crawl_domain(&client, &server.url(), &model, root.path(), 10)
        .await
        .unwrap();

    assert!(!outcome.capped);
    let m = model.lock();
    assert_eq!(m.doc_count, 2);
    assert!(m.is_complete);
}

#[tokio::test]
async fn snapshot_restores_to_an_identical_index() {
    let (server, _mocks) = serve_two_pages().await;
    let root = tempdir().unwrap();
    let client = build_http_client(DEFAULT_USER_AGENT).unwrap();
    let model = new_shared_model();

    crawl_domain(&client, &server.url(), &model, root.path(), 10)
        .await
        .unwrap();

    let snapshot_dir = root.path().join("127.0.0.1");
    for file in [CONTENT_CACHE_FILE, URL_LABELS_FILE, REVERSE_URL_LABELS_FILE] {
        assert!(snapshot_dir.join(file).is_file(), "missing snapshot file {file}");
    }

    let restored = new_shared_model();
    restore_snapshot(&snapshot_dir, &restored).unwrap();
    restored.lock().finalize();

    let live = model.lock();
    let restored = restored.lock();
    assert_eq!(restored.documents, live.documents);
    assert_eq!(restored.document_frequency, live.document_frequency);
    assert_eq!(restored.url_labels, live.url_labels);
    assert_eq!(restored.average_doc_length, live.average_doc_length);
}
