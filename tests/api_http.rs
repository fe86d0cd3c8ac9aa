// tests/api_http.rs
//
// HTTP-level tests for the Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - POST /ingest (ack, validation, upsert on repeat)
// - GET /retrieve vs GET /articles
// - POST /fetch

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use serde_json::Value as Json;
use shuttle_axum::axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt as _; // for `oneshot`

use it_news_ranker::classify::StaticScorer;
use it_news_ranker::ingest::providers::FeedSource;
use it_news_ranker::store::{ItemStore, MemoryItemStore};
use it_news_ranker::{router, AppState, Classifier, Fetcher};

const BODY_LIMIT: usize = 1024 * 1024;

/// Router over an in-memory store. The scorer leans on "cybersecurity
/// incident", so every ingested item passes the filter.
fn test_app(store: &MemoryItemStore) -> Router {
    let classifier = Arc::new(Classifier::new(Arc::new(StaticScorer::new(vec![
        0.9, 0.025, 0.025, 0.025, 0.025,
    ]))));
    let xml = include_str!("fixtures/hacker_news_rss.xml");
    let fetcher = Arc::new(Fetcher::new(
        vec![Arc::new(FeedSource::from_fixture("the-hacker-news", xml))],
        Arc::clone(&classifier),
        Arc::new(store.clone()),
        Duration::from_secs(300),
    ));
    router(AppState {
        store: Arc::new(store.clone()),
        classifier,
        fetcher,
    })
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    (status, bytes)
}

fn post_json(uri: &str, payload: &Json) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build GET")
}

#[tokio::test]
async fn health_returns_ok() {
    let store = MemoryItemStore::new();
    let (status, bytes) = send(test_app(&store), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(bytes).unwrap().trim(), "OK");
}

#[tokio::test]
async fn ingest_acknowledges_batch_size() {
    let store = MemoryItemStore::new();
    let payload = json!([
        { "id": "a", "source": "manual", "title": "Ransomware hits hospital", "published_at": "2024-06-01T10:00:00Z" },
        { "id": "b", "source": "manual", "title": "Cloud region outage", "body": "Details soon." }
    ]);

    let (status, bytes) = send(test_app(&store), post_json("/ingest", &payload)).await;
    assert_eq!(status, StatusCode::OK);
    let v: Json = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(v["status"], "ok");
    assert_eq!(v["received"], 2);
    assert_eq!(store.count().await.unwrap(), 2);
    assert_eq!(store.sessions_opened(), 1, "one session per request");
}

#[tokio::test]
async fn ingest_missing_title_rejects_whole_batch() {
    let store = MemoryItemStore::new();
    let payload = json!([
        { "id": "ok", "source": "manual", "title": "Fine" },
        { "id": "bad", "source": "manual", "title": "   " }
    ]);

    let (status, bytes) = send(test_app(&store), post_json("/ingest", &payload)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let v: Json = serde_json::from_slice(&bytes).unwrap();
    let msg = v["error"].as_str().unwrap();
    assert!(msg.contains("item 1") && msg.contains("title"), "msg={msg}");
    assert_eq!(store.count().await.unwrap(), 0);
    assert_eq!(store.sessions_opened(), 0);
}

#[tokio::test]
async fn repeated_ingest_keeps_one_record_per_id() {
    let store = MemoryItemStore::new();
    let first = json!([{ "id": "same", "source": "manual", "title": "First title" }]);
    let second = json!([{ "id": "same", "source": "manual", "title": "Second title" }]);

    send(test_app(&store), post_json("/ingest", &first)).await;
    send(test_app(&store), post_json("/ingest", &second)).await;

    assert_eq!(store.count().await.unwrap(), 1);
    let got = store.get("same").await.unwrap().unwrap();
    assert_eq!(got.title, "Second title");
}

#[tokio::test]
async fn retrieve_hides_scores_while_articles_shows_them() {
    let store = MemoryItemStore::new();
    let payload = json!([{ "id": "x", "source": "manual", "title": "Data breach disclosed" }]);
    send(test_app(&store), post_json("/ingest", &payload)).await;

    let (status, bytes) = send(test_app(&store), get("/retrieve")).await;
    assert_eq!(status, StatusCode::OK);
    let public: Json = serde_json::from_slice(&bytes).unwrap();
    let row = &public[0];
    assert_eq!(row["id"], "x");
    assert!(row.get("final_score").is_none());
    assert!(row.get("is_filtered").is_none());

    let (status, bytes) = send(test_app(&store), get("/articles")).await;
    assert_eq!(status, StatusCode::OK);
    let full: Json = serde_json::from_slice(&bytes).unwrap();
    let row = &full[0];
    assert!(row["final_score"].as_f64().unwrap() > 0.0);
    assert_eq!(row["is_filtered"], true);
    assert_eq!(row["category"], "cybersecurity incident or data breach");
}

#[tokio::test]
async fn fetch_runs_one_cycle_and_reports_per_source() {
    let store = MemoryItemStore::new();
    let req = Request::builder()
        .method("POST")
        .uri("/fetch")
        .body(Body::empty())
        .unwrap();

    let (status, bytes) = send(test_app(&store), req).await;
    assert_eq!(status, StatusCode::OK);
    let v: Json = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(v["status"], "ok");
    assert_eq!(v["sources"][0]["source"], "the-hacker-news");
    assert_eq!(v["sources"][0]["persisted"], 3);
    assert_eq!(store.count().await.unwrap(), 3);
}
