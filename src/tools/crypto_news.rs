// src/tools/crypto_news.rs
// Latest-news adapter backed by the RapidAPI crypto news feed. Cache-first:
// the article corpus is refreshed on staleness and read back with an
// hours-back window derived from the query.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use crate::cache::NewsCache;
use crate::config::AppConfig;
use crate::models::{Article, QueryResponse};
use crate::timeparse::extract_time_period;
use crate::tools::{scrub_text, Tool, ToolDescriptor, ToolOutput, ToolParams, CRYPTO_NEWS};

const DEFAULT_LIMIT: usize = 25;
const DEFAULT_HOURS_BACK: i64 = 24;

pub struct CryptoNewsTool {
    cache: Arc<NewsCache>,
    http: reqwest::Client,
    api_key: String,
    api_url: String,
    api_host: String,
    refresh_interval_mins: i64,
}

/// The feed returns either a bare array or `{"articles": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum FeedBody {
    Bare(Vec<Article>),
    Wrapped { articles: Vec<Article> },
}

impl CryptoNewsTool {
    pub fn new(cache: Arc<NewsCache>, config: &AppConfig) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("crypto-news-agent/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(20))
            .build()
            .expect("reqwest client");
        Self {
            cache,
            http,
            api_key: config.rapidapi_key.clone(),
            api_url: format!("https://{}/api/v1/crypto/articles", config.rapidapi_host),
            api_host: config.rapidapi_host.clone(),
            refresh_interval_mins: config.refresh_interval_mins,
        }
    }

    async fn fetch_articles(&self, limit: usize, time_frame: &str) -> Result<Vec<Article>> {
        if self.api_key.is_empty() {
            bail!("RAPIDAPI_KEY is not set");
        }

        let resp = self
            .http
            .get(&self.api_url)
            .header("x-rapidapi-host", &self.api_host)
            .header("x-rapidapi-key", &self.api_key)
            .query(&[
                ("page", "1"),
                ("limit", &limit.to_string()),
                ("time_frame", time_frame),
                ("format", "json"),
            ])
            .send()
            .await
            .context("news feed request failed")?;

        let status = resp.status();
        if !status.is_success() {
            bail!("news feed returned status {status}");
        }

        let body: FeedBody = resp.json().await.context("news feed body")?;
        let articles = match body {
            FeedBody::Bare(a) => a,
            FeedBody::Wrapped { articles } => articles,
        };
        Ok(articles.into_iter().map(normalize_article).collect())
    }

    /// Refresh the cached corpus if it is stale. Used by the scheduler and
    /// by `execute` before reads. Returns whether the cache holds fresh data.
    pub async fn update_cache(&self) -> bool {
        if !self.cache.is_stale(self.refresh_interval_mins) {
            info!("news cache is fresh, skipping update");
            return true;
        }
        match self.fetch_articles(100, "24h").await {
            Ok(articles) if !articles.is_empty() => {
                info!(count = articles.len(), "refreshed news cache");
                self.cache.set_articles(&articles);
                true
            }
            Ok(_) => {
                warn!("news feed returned no articles during refresh");
                false
            }
            Err(e) => {
                warn!(error = %e, "news cache refresh failed");
                false
            }
        }
    }
}

fn normalize_article(mut article: Article) -> Article {
    if let Some(t) = article.title.take() {
        article.title = Some(scrub_text(&t));
    }
    if let Some(s) = article.summary.take() {
        article.summary = Some(scrub_text(&s));
    }
    article
}

#[async_trait]
impl Tool for CryptoNewsTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: CRYPTO_NEWS,
            description: "Get the latest cryptocurrency news articles. Use this for general market updates and trends.",
        }
    }

    async fn execute(&self, params: &ToolParams) -> ToolOutput {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
        let hours_back = extract_time_period(&params.query).unwrap_or(DEFAULT_HOURS_BACK);
        info!(query = %params.query, hours_back, limit, "executing crypto news tool");

        self.update_cache().await;
        let mut articles = self.cache.get_articles(limit, Some(hours_back));

        if articles.is_empty() {
            // Cache empty even after the refresh attempt; go straight to the
            // feed with no window.
            match self.fetch_articles(limit, "24h").await {
                Ok(fresh) if !fresh.is_empty() => {
                    self.cache.set_articles(&fresh);
                    articles = fresh;
                }
                Ok(_) => return ToolOutput::Empty,
                Err(e) => return ToolOutput::Failed(e.to_string()),
            }
        }

        articles.truncate(limit);
        ToolOutput::Articles {
            articles,
            time_context: Some(format!("Past {hours_back} hours")),
        }
    }

    fn format_response(&self, query: &str, output: &ToolOutput) -> QueryResponse {
        let hours_back = extract_time_period(query).unwrap_or(DEFAULT_HOURS_BACK);
        let mut resp = QueryResponse::base(query);
        if let ToolOutput::Articles { articles, .. } = output {
            resp.answer =
                format!("Here are the latest cryptocurrency news articles (past {hours_back} hours)");
            resp.context = format!(
                "Based on {} recent cryptocurrency news articles",
                articles.len()
            );
            resp.articles = articles.clone();
        } else {
            resp.answer = "No recent cryptocurrency news articles were found.".to_string();
        }
        resp
    }
}
