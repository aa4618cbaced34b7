// src/cache.rs
// Namespaced in-memory key-value store with per-record TTL and a separate
// process-wide bulk-update marker. Shared as `Arc<NewsCache>`; every
// operation is single-key atomic, no cross-key transactions.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::models::Article;

const ARTICLES_PREFIX: &str = "articles:";
const SEARCH_PREFIX: &str = "search:";
const DATA_PREFIX: &str = "data:";

#[derive(Debug, Clone)]
struct CacheRecord {
    payload: String,
    expires_at: DateTime<Utc>,
}

pub struct NewsCache {
    records: RwLock<HashMap<String, CacheRecord>>,
    /// Bulk-staleness marker, independent of any record's TTL. Written last
    /// after a batch write, so a reader seeing a fresh marker also sees a
    /// complete batch.
    last_update: RwLock<Option<DateTime<Utc>>>,
    default_ttl_secs: u64,
}

fn article_key(link: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(link.as_bytes());
    format!("{ARTICLES_PREFIX}{:x}", hasher.finalize())
}

impl NewsCache {
    pub fn new(default_ttl_secs: u64) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            last_update: RwLock::new(None),
            default_ttl_secs,
        }
    }

    fn put(&self, key: String, payload: String, ttl_secs: u64) {
        let expires_at = Utc::now() + Duration::seconds(ttl_secs as i64);
        let mut map = self.records.write().expect("cache lock poisoned");
        map.insert(key, CacheRecord { payload, expires_at });
    }

    fn fetch(&self, key: &str) -> Option<String> {
        let map = self.records.read().expect("cache lock poisoned");
        let rec = map.get(key)?;
        if rec.expires_at <= Utc::now() {
            return None;
        }
        Some(rec.payload.clone())
    }

    /// Content-addressed article upsert: re-storing the same link overwrites
    /// in place. Articles without a link are skipped. The bulk-update marker
    /// is set after all records land.
    pub fn set_articles(&self, articles: &[Article]) {
        let mut stored = 0usize;
        for article in articles {
            let Some(link) = article.link.as_deref().filter(|l| !l.is_empty()) else {
                warn!("skipping article without link");
                continue;
            };
            match serde_json::to_string(article) {
                Ok(json) => {
                    self.put(article_key(link), json, self.default_ttl_secs);
                    stored += 1;
                }
                Err(e) => warn!(error = %e, "failed to serialize article"),
            }
        }
        *self.last_update.write().expect("cache lock poisoned") = Some(Utc::now());
        debug!(stored, "stored articles in cache");
    }

    /// Read articles back, newest first. `hours_back` filters on the
    /// `published` timestamp; malformed or missing timestamps fail open.
    pub fn get_articles(&self, limit: usize, hours_back: Option<i64>) -> Vec<Article> {
        let now = Utc::now();
        let cutoff = hours_back.map(|h| now - Duration::hours(h));

        let map = self.records.read().expect("cache lock poisoned");
        let mut articles: Vec<Article> = map
            .iter()
            .filter(|(key, rec)| key.starts_with(ARTICLES_PREFIX) && rec.expires_at > now)
            .filter_map(|(_, rec)| serde_json::from_str::<Article>(&rec.payload).ok())
            .filter(|a| match (cutoff, published_at(a)) {
                (Some(cut), Some(pub_date)) => pub_date >= cut,
                // No window, or unparseable timestamp: keep.
                _ => true,
            })
            .collect();
        drop(map);

        articles.sort_by(|a, b| b.published.cmp(&a.published));
        articles.truncate(limit);
        articles
    }

    pub fn set_search_results(&self, keywords: &str, results: &[Article]) {
        match serde_json::to_string(results) {
            Ok(json) => self.put(format!("{SEARCH_PREFIX}{keywords}"), json, self.default_ttl_secs),
            Err(e) => warn!(error = %e, "failed to serialize search results"),
        }
    }

    pub fn get_search_results(&self, keywords: &str) -> Vec<Article> {
        self.fetch(&format!("{SEARCH_PREFIX}{keywords}"))
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default()
    }

    /// Generic tool-scoped payload under `data:{key}`.
    pub fn set_data<T: Serialize>(&self, key: &str, value: &T, ttl_secs: Option<u64>) {
        match serde_json::to_string(value) {
            Ok(json) => self.put(
                format!("{DATA_PREFIX}{key}"),
                json,
                ttl_secs.unwrap_or(self.default_ttl_secs),
            ),
            Err(e) => warn!(key, error = %e, "failed to serialize cached data"),
        }
    }

    pub fn get_data<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let json = self.fetch(&format!("{DATA_PREFIX}{key}"))?;
        serde_json::from_str(&json).ok()
    }

    pub fn last_update_time(&self) -> Option<DateTime<Utc>> {
        *self.last_update.read().expect("cache lock poisoned")
    }

    /// True when the corpus needs a bulk refresh. Absence of the marker is
    /// maximally stale.
    pub fn is_stale(&self, max_age_minutes: i64) -> bool {
        match self.last_update_time() {
            None => true,
            Some(ts) => Utc::now() - ts > Duration::minutes(max_age_minutes),
        }
    }
}

fn published_at(article: &Article) -> Option<DateTime<Utc>> {
    let raw = article.published.as_deref()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
