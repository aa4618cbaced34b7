// src/tools/crypto_search.rs
// Keyword-search adapter over the same RapidAPI backend as crypto_news, with
// a read-through cache under the `search:{keywords}` namespace.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::cache::NewsCache;
use crate::config::AppConfig;
use crate::models::{Article, QueryResponse};
use crate::tools::{scrub_text, Tool, ToolDescriptor, ToolOutput, ToolParams, CRYPTO_SEARCH};

const DEFAULT_LIMIT: usize = 10;

pub struct CryptoSearchTool {
    cache: Arc<NewsCache>,
    http: reqwest::Client,
    api_key: String,
    api_url: String,
    api_host: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SearchBody {
    Bare(Vec<Article>),
    Wrapped { articles: Vec<Article> },
}

impl CryptoSearchTool {
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
            api_url: format!(
                "https://{}/api/v1/crypto/articles/search",
                config.rapidapi_host
            ),
            api_host: config.rapidapi_host.clone(),
        }
    }

    async fn search_articles(&self, keywords: &str, limit: usize) -> Result<Vec<Article>> {
        if self.api_key.is_empty() {
            bail!("RAPIDAPI_KEY is not set");
        }

        let resp = self
            .http
            .get(&self.api_url)
            .header("x-rapidapi-host", &self.api_host)
            .header("x-rapidapi-key", &self.api_key)
            .query(&[
                ("title_keywords", keywords),
                ("page", "1"),
                ("limit", &limit.to_string()),
                ("time_frame", "24h"),
                ("format", "json"),
            ])
            .send()
            .await
            .context("news search request failed")?;

        let status = resp.status();
        if !status.is_success() {
            bail!("news search returned status {status}");
        }

        let body: SearchBody = resp.json().await.context("news search body")?;
        let articles = match body {
            SearchBody::Bare(a) => a,
            SearchBody::Wrapped { articles } => articles,
        };
        let articles: Vec<Article> = articles
            .into_iter()
            .map(|mut a| {
                if let Some(t) = a.title.take() {
                    a.title = Some(scrub_text(&t));
                }
                if let Some(s) = a.summary.take() {
                    a.summary = Some(scrub_text(&s));
                }
                a
            })
            .collect();
        Ok(articles)
    }
}

#[async_trait]
impl Tool for CryptoSearchTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: CRYPTO_SEARCH,
            description: "Search for cryptocurrency news articles by keyword. Use this when looking for specific topics or cryptocurrencies.",
        }
    }

    async fn execute(&self, params: &ToolParams) -> ToolOutput {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
        let keywords = params.query.trim().to_lowercase();
        info!(keywords = %keywords, limit, "executing crypto search tool");

        let cached = self.cache.get_search_results(&keywords);
        if !cached.is_empty() {
            info!(count = cached.len(), "serving search results from cache");
            return ToolOutput::Articles {
                articles: cached,
                time_context: Some("Recent news".to_string()),
            };
        }

        match self.search_articles(&keywords, limit).await {
            Ok(articles) if !articles.is_empty() => {
                self.cache.set_search_results(&keywords, &articles);
                ToolOutput::Articles {
                    articles,
                    time_context: Some("Recent news".to_string()),
                }
            }
            Ok(_) => ToolOutput::Empty,
            Err(e) => ToolOutput::Failed(e.to_string()),
        }
    }

    fn format_response(&self, query: &str, output: &ToolOutput) -> QueryResponse {
        let mut resp = QueryResponse::base(query);
        if let ToolOutput::Articles { articles, .. } = output {
            resp.answer = format!("Found {} articles matching '{query}'", articles.len());
            resp.context = "Keyword search over recent cryptocurrency news.".to_string();
            resp.articles = articles.clone();
        } else {
            resp.answer = format!("No articles found matching '{query}'");
        }
        resp
    }
}
