// tests/cache_behavior.rs
// Cache layer contract: idempotent content-addressed upserts, bulk staleness
// marker semantics, and namespaced keyed payloads.

use chrono::{Duration, Utc};

use crypto_news_agent::cache::NewsCache;
use crypto_news_agent::models::Article;

fn article(link: &str, published: Option<String>) -> Article {
    Article {
        title: Some(link.to_string()),
        link: Some(link.to_string()),
        published,
        ..Default::default()
    }
}

#[test]
fn restoring_same_link_is_an_upsert_not_an_append() {
    let cache = NewsCache::new(3600);
    let mut a = article("https://news.example/btc-etf", None);
    cache.set_articles(std::slice::from_ref(&a));

    // Same link, new summary, stored again on a later refresh cycle.
    a.summary = Some("updated summary".to_string());
    cache.set_articles(&[a]);

    let got = cache.get_articles(100, None);
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].summary.as_deref(), Some("updated summary"));
}

#[test]
fn staleness_tracks_the_bulk_marker_not_record_ttls() {
    let cache = NewsCache::new(1); // 1s record TTL
    assert!(cache.is_stale(60), "no marker means maximally stale");

    cache.set_articles(&[article("https://news.example/x", None)]);
    // Marker just written: fresh for any positive window, even though the
    // records themselves will expire almost immediately.
    assert!(!cache.is_stale(1));
    assert!(!cache.is_stale(1_000_000));
}

#[test]
fn get_articles_sorts_newest_first_and_honors_limit() {
    let cache = NewsCache::new(3600);
    let now = Utc::now();
    cache.set_articles(&[
        article("https://n/old", Some((now - Duration::hours(5)).to_rfc3339())),
        article("https://n/new", Some(now.to_rfc3339())),
        article("https://n/mid", Some((now - Duration::hours(2)).to_rfc3339())),
    ]);

    let got = cache.get_articles(2, None);
    assert_eq!(got.len(), 2);
    assert_eq!(got[0].link.as_deref(), Some("https://n/new"));
    assert_eq!(got[1].link.as_deref(), Some("https://n/mid"));
}

#[test]
fn search_namespace_is_independent_of_article_namespace() {
    let cache = NewsCache::new(3600);
    cache.set_search_results("solana memecoins", &[article("https://n/s1", None)]);

    assert_eq!(cache.get_search_results("solana memecoins").len(), 1);
    assert!(cache.get_search_results("other query").is_empty());
    // Search writes never show up in the article corpus.
    assert!(cache.get_articles(10, None).is_empty());
    // And do not touch the bulk marker.
    assert!(cache.is_stale(60));
}

#[test]
fn keyed_data_is_tool_scoped_and_typed() {
    let cache = NewsCache::new(3600);
    cache.set_data("dexscreener:search:bonk", &serde_json::json!({"pairs": 3}), None);

    let got: Option<serde_json::Value> = cache.get_data("dexscreener:search:bonk");
    assert_eq!(got.unwrap()["pairs"], 3);

    let missing: Option<serde_json::Value> = cache.get_data("dexscreener:search:wif");
    assert!(missing.is_none());
}
