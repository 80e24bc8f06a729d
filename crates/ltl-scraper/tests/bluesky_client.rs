//! Integration tests for `BlueskyClient` and the scrape stage using wiremock.

use std::io;
use std::sync::{Arc, Mutex};

use ltl_core::dataset::read_posts;
use ltl_core::{Credentials, StageOutput};
use ltl_scraper::{scrape, BlueskyClient, ScrapeRequest, ScraperError, Session};
use wiremock::matchers::{body_json, header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SESSION_PATH: &str = "/xrpc/com.atproto.server.createSession";
const SEARCH_PATH: &str = "/xrpc/app.bsky.feed.searchPosts";

fn test_client(base_url: &str) -> BlueskyClient {
    BlueskyClient::with_base_url(30, "ltl-test/0.1", base_url)
        .expect("client construction should not fail")
}

fn creds() -> Credentials {
    Credentials::new("tester.bsky.social", "app-pass-1234").expect("valid credentials")
}

fn post_json(idx: usize, text: &str) -> serde_json::Value {
    serde_json::json!({
        "uri": format!("at://did:plc:tester/app.bsky.feed.post/{idx}"),
        "author": { "handle": format!("user{}.bsky.social", idx % 3), "displayName": "User" },
        "record": {
            "text": text,
            "createdAt": format!("2025-03-{:02}T10:00:00.000Z", 1 + idx % 20),
            "langs": ["en"]
        },
        "replyCount": 0,
        "repostCount": 0,
        "quoteCount": 0,
        "likeCount": idx
    })
}

fn page(range: std::ops::Range<usize>, cursor: Option<&str>) -> serde_json::Value {
    let posts: Vec<serde_json::Value> = range
        .map(|i| post_json(i, &format!("post number {i} about trekking poles")))
        .collect();
    match cursor {
        Some(c) => serde_json::json!({ "posts": posts, "cursor": c }),
        None => serde_json::json!({ "posts": posts }),
    }
}

async fn mount_session(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(SESSION_PATH))
        .and(body_json(serde_json::json!({
            "identifier": "tester.bsky.social",
            "password": "app-pass-1234"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "accessJwt": "jwt-abc",
            "refreshJwt": "jwt-refresh",
            "handle": "tester.bsky.social",
            "did": "did:plc:tester"
        })))
        .mount(server)
        .await;
}

/// Two pages: 100 posts with a cursor, then 61 posts without one.
async fn mount_two_pages(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(header("authorization", "Bearer jwt-abc"))
        .and(query_param_is_missing("cursor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(0..100, Some("page-2"))))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("cursor", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(100..161, None)))
        .mount(server)
        .await;
}

fn request(data_root: &std::path::Path, n_posts: usize, stream: bool) -> ScrapeRequest {
    ScrapeRequest {
        query: "trekking poles".to_string(),
        n_posts,
        stream,
        data_root: data_root.to_path_buf(),
        save_as: None,
        since: None,
        until: None,
        language: Some("en".to_string()),
    }
}

#[tokio::test]
async fn create_session_returns_token() {
    let server = MockServer::start().await;
    mount_session(&server).await;

    let client = test_client(&server.uri());
    let session = client.create_session(&creds()).await.expect("session");

    assert_eq!(session.handle.as_deref(), Some("tester.bsky.social"));
    assert!(!format!("{session:?}").contains("jwt-abc"));
}

#[tokio::test]
async fn create_session_rejected_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SESSION_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": "AuthenticationRequired",
            "message": "Invalid identifier or password"
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.create_session(&creds()).await.unwrap_err();
    assert!(
        matches!(err, ScraperError::Auth { status: 401, .. }),
        "expected Auth(401), got: {err:?}"
    );
}

#[tokio::test]
async fn search_posts_follows_cursor_and_sends_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("q", "trekking poles"))
        .and(query_param("limit", "100"))
        .and(query_param("lang", "en"))
        .and(query_param_is_missing("cursor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(0..100, Some("page-2"))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("cursor", "page-2"))
        .and(query_param("limit", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(100..150, Some("page-3"))))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let session = Session::from_token("jwt-abc");
    let posts = client
        .search_posts(&session, "trekking poles", 150, Some("en"))
        .await
        .expect("search");

    assert_eq!(posts.len(), 150);
    assert_eq!(posts[149].like_count, Some(149));
}

#[tokio::test]
async fn search_posts_stops_when_cursor_runs_out() {
    let server = MockServer::start().await;
    mount_two_pages(&server).await;

    let client = test_client(&server.uri());
    let session = Session::from_token("jwt-abc");
    let posts = client
        .search_posts(&session, "trekking poles", 1000, None)
        .await
        .expect("search");

    assert_eq!(posts.len(), 161);
}

#[tokio::test]
async fn search_posts_stops_on_empty_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "posts": [], "cursor": "forever" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let posts = client
        .search_posts(&Session::from_token("t"), "poles", 10, None)
        .await
        .expect("search");
    assert!(posts.is_empty());
}

#[tokio::test]
async fn rate_limit_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "30"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client
        .search_posts(&Session::from_token("t"), "poles", 10, None)
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            ScraperError::RateLimited {
                retry_after_secs: Some(30)
            }
        ),
        "expected RateLimited, got: {err:?}"
    );
}

#[tokio::test]
async fn malformed_page_is_deserialize_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client
        .search_posts(&Session::from_token("t"), "poles", 10, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ScraperError::Deserialize { .. }));
}

#[tokio::test]
async fn scrape_batch_saves_fewer_than_requested() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    mount_two_pages(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let client = test_client(&server.uri());
    let output = scrape(&client, &creds(), &request(dir.path(), 1000, false))
        .await
        .expect("scrape");

    assert!(matches!(output, StageOutput::Persisted { count: 161, .. }));
    assert_eq!(
        output.path(),
        dir.path().join("raw").join("bsky_trekkingpoles.csv")
    );
    let rows = read_posts(output.path()).unwrap();
    assert_eq!(rows.len(), 161);
    assert!(rows.iter().all(|p| p.platform == "bluesky"));
}

/// Log sink shared between the subscriber and the test.
#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl io::Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn scrape_logs_actual_count_saved() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    mount_two_pages(&server).await;

    let buf = SharedBuf::default();
    let writer = buf.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let dir = tempfile::tempdir().unwrap();
    let client = test_client(&server.uri());
    scrape(&client, &creds(), &request(dir.path(), 1000, false))
        .await
        .expect("scrape");

    let logs = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
    assert!(logs.contains("saved 161 posts"), "logs were: {logs}");
    assert!(!logs.contains("saved 1000 posts"));
}

#[tokio::test]
async fn scrape_batch_and_stream_write_identical_files() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    mount_two_pages(&server).await;
    let client = test_client(&server.uri());

    let batch_dir = tempfile::tempdir().unwrap();
    let batch = scrape(&client, &creds(), &request(batch_dir.path(), 120, false))
        .await
        .expect("batch scrape");

    let stream_dir = tempfile::tempdir().unwrap();
    let stream = scrape(&client, &creds(), &request(stream_dir.path(), 120, true))
        .await
        .expect("stream scrape");

    assert_eq!(batch.len(), 120);
    assert_eq!(stream.len(), 120);

    let batch_bytes = std::fs::read(batch.path()).unwrap();
    let stream_bytes = std::fs::read(stream.path()).unwrap();
    assert_eq!(batch_bytes, stream_bytes);

    let buffered = stream.rows().expect("streaming keeps rows");
    assert_eq!(buffered, read_posts(batch.path()).unwrap().as_slice());
}

#[tokio::test]
async fn scrape_with_bad_credentials_fails_before_writing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SESSION_PATH))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let client = test_client(&server.uri());
    let err = scrape(&client, &creds(), &request(dir.path(), 10, true))
        .await
        .unwrap_err();

    assert!(matches!(err, ScraperError::Auth { .. }));
    assert!(!dir.path().join("raw").exists());
}
