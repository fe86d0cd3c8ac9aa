// tests/providers_feed.rs
use chrono::{TimeZone, Utc};
use it_news_ranker::ingest::fetch_isolated;
use it_news_ranker::ingest::providers::FeedSource;
use it_news_ranker::ingest::types::SourceProvider;
use std::fs;

#[tokio::test]
async fn rss_fixture_yields_items_in_feed_order() {
    let xml = fs::read_to_string("tests/fixtures/hacker_news_rss.xml")
        .expect("missing tests/fixtures/hacker_news_rss.xml");
    let provider = FeedSource::from_fixture("the-hacker-news", &xml);

    let items = provider.fetch_latest().await.expect("rss parse ok");
    let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "thn-ransomware-hospital",
            "https://thehackernews.com/2024/01/vpn-flaw.html",
            "thn-weekly-recap",
        ],
        "entry without guid/link must be dropped, order kept"
    );
    assert!(items.iter().all(|i| i.source == "the-hacker-news"));

    let first = &items[0];
    assert_eq!(
        first.body.as_deref(),
        Some("Attackers published patient records after the deadline passed.")
    );
    assert_eq!(
        first.published_at,
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
    );
    assert_eq!(
        items[1].published_at,
        Utc.with_ymd_and_hms(2024, 1, 15, 8, 30, 0).unwrap()
    );
    assert_eq!(items[2].body, None);
}

#[tokio::test]
async fn atom_fixture_uses_entry_ids_and_strips_markup() {
    let xml = fs::read_to_string("tests/fixtures/sysadmin_atom.xml")
        .expect("missing tests/fixtures/sysadmin_atom.xml");
    let provider = FeedSource::from_fixture("reddit-sysadmin", &xml);

    let items = provider.fetch_latest().await.expect("atom parse ok");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].id, "t3_outage1");
    assert_eq!(items[0].title, "Microsoft 365 outage this morning?");
    assert_eq!(
        items[0].body.as_deref(),
        Some("Anyone else seeing Exchange Online down?")
    );
    assert_eq!(
        items[0].published_at,
        Utc.with_ymd_and_hms(2024, 6, 2, 8, 0, 0).unwrap()
    );
    // No <published>: falls back to <updated>.
    assert_eq!(
        items[1].published_at,
        Utc.with_ymd_and_hms(2024, 6, 1, 17, 45, 0).unwrap()
    );
}

#[tokio::test]
async fn malformed_feed_is_isolated_to_empty_result() {
    let provider = FeedSource::from_fixture("broken", "<rss><channel><item><title>x");
    assert!(provider.fetch_latest().await.is_err());
    assert!(fetch_isolated(&provider).await.is_empty());
}

#[tokio::test]
async fn unreachable_feed_returns_empty_without_error() {
    // Port 9 (discard) is closed on test machines; the connect fails fast.
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(2))
        .build()
        .unwrap();
    let provider = FeedSource::from_url("offline", "http://127.0.0.1:9/feed.rss", client);
    let items = fetch_isolated(&provider).await;
    assert!(items.is_empty());
}

#[tokio::test]
async fn http_error_status_returns_empty() {
    use axum::{http::StatusCode, routing::get, Router};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new()
        .route("/down.rss", get(|| async { StatusCode::SERVICE_UNAVAILABLE }))
        .route(
            "/ok.rss",
            get(|| async { include_str!("fixtures/hacker_news_rss.xml") }),
        );
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let client = reqwest::Client::new();
    let down = FeedSource::from_url("down", &format!("http://{addr}/down.rss"), client.clone());
    assert!(down.fetch_latest().await.is_err());
    assert!(fetch_isolated(&down).await.is_empty());

    let ok = FeedSource::from_url("the-hacker-news", &format!("http://{addr}/ok.rss"), client);
    assert_eq!(fetch_isolated(&ok).await.len(), 3);
}

#[tokio::test]
async fn extension_namespaces_and_html_entities_do_not_break_the_feed() {
    let xml = fs::read_to_string("tests/fixtures/ars_extensions_rss.xml")
        .expect("missing tests/fixtures/ars_extensions_rss.xml");
    let provider = FeedSource::from_fixture("ars-technica", &xml);

    let items = provider.fetch_latest().await.expect("rss parse ok");
    assert_eq!(items.len(), 2, "items on both sides of a channel-level atom:link");

    let first = &items[0];
    assert_eq!(first.id, "https://arstechnica.com/?p=2011001");
    assert_eq!(first.title, "Caf\u{e9} chain\u{2019}s POS systems hit by card skimmer");
    assert_eq!(
        first.body.as_deref(),
        Some("Payment terminals at 40 locations \u{2026} were compromised.")
    );

    // content:encoded and dc:date stand in for description and pubDate.
    let second = &items[1];
    assert_eq!(second.title, "Kernel 6.8 released with new scheduler");
    assert_eq!(
        second.body.as_deref(),
        Some("Linus Torvalds tagged the release on Sunday.")
    );
    assert_eq!(
        second.published_at,
        Utc.with_ymd_and_hms(2024, 3, 10, 22, 0, 0).unwrap()
    );
}
