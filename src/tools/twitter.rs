// src/tools/twitter.rs
// Social-search adapter backed by the TweetScout search API. Results are
// cached per normalized query for an hour; tweets older than 30 days are
// dropped before ranking.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cache::NewsCache;
use crate::config::AppConfig;
use crate::models::{QueryResponse, Tweet};
use crate::tools::{Tool, ToolDescriptor, ToolOutput, ToolParams, TWITTER};

const MAX_TWEET_AGE_DAYS: i64 = 30;
const DEFAULT_TWEET_LIMIT: usize = 10;
const CACHE_TTL_SECS: u64 = 60 * 60;
const CACHE_PREFIX: &str = "twitter:search";

pub struct TwitterTool {
    cache: Arc<NewsCache>,
    http: reqwest::Client,
    api_key: String,
    api_url: String,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    order: &'a str,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    tweets: Vec<RawTweet>,
}

#[derive(Deserialize, Default)]
struct RawTweet {
    #[serde(default)]
    id_str: String,
    #[serde(default)]
    full_text: String,
    #[serde(default)]
    user: RawUser,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    favorite_count: u64,
    #[serde(default)]
    retweet_count: u64,
    #[serde(default)]
    retweeted_status: Option<Box<RawTweet>>,
    #[serde(default)]
    is_quote_status: bool,
    #[serde(default)]
    quoted_status: Option<Box<RawTweet>>,
}

#[derive(Deserialize, Default)]
struct RawUser {
    #[serde(default)]
    screen_name: String,
    #[serde(default)]
    name: String,
}

#[derive(Serialize, Deserialize)]
struct CachedTweets {
    tweets: Vec<Tweet>,
    fetched_at: DateTime<Utc>,
}

impl TwitterTool {
    pub fn new(cache: Arc<NewsCache>, config: &AppConfig) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("crypto-news-agent/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client");
        Self {
            cache,
            http,
            api_key: config.tweetscout_api_key.clone(),
            api_url: "https://api.tweetscout.io/v2/search-tweets".to_string(),
        }
    }

    async fn search_tweets(&self, query: &str, order: &str) -> Result<Vec<Tweet>> {
        if self.api_key.is_empty() {
            bail!("TWEETSCOUT_API_KEY is not set");
        }

        // Nudge generic queries toward crypto results.
        let enhanced = if ["crypto", "bitcoin", "btc", "eth"]
            .iter()
            .any(|t| query.to_lowercase().contains(t))
        {
            query.to_string()
        } else {
            format!("{query} crypto")
        };

        let resp = self
            .http
            .post(&self.api_url)
            .header("Accept", "application/json")
            .header("ApiKey", &self.api_key)
            .json(&SearchRequest {
                query: &enhanced,
                order,
            })
            .send()
            .await
            .context("tweet search request failed")?;

        let status = resp.status();
        if status.as_u16() == 403 {
            bail!("tweet search rate limit exceeded");
        }
        if !status.is_success() {
            bail!("tweet search returned status {status}");
        }

        let body: SearchResponse = resp.json().await.context("tweet search body")?;
        Ok(body.tweets.into_iter().map(process_tweet).collect())
    }
}

/// Flatten retweets/quotes into the tweet text, mirroring the provider's
/// nested payload.
fn process_tweet(raw: RawTweet) -> Tweet {
    let text = if let Some(rt) = &raw.retweeted_status {
        format!("RT @{}: {}", rt.user.screen_name, rt.full_text)
    } else if raw.is_quote_status {
        match &raw.quoted_status {
            Some(q) => format!(
                "{}\n\nQuoting @{}: {}",
                raw.full_text, q.user.screen_name, q.full_text
            ),
            None => raw.full_text.clone(),
        }
    } else {
        raw.full_text.clone()
    };

    Tweet {
        id: raw.id_str,
        text,
        author: raw.user.screen_name,
        author_name: raw.user.name,
        created_at: raw.created_at,
        likes: raw.favorite_count,
        retweets: raw.retweet_count,
    }
}

/// Twitter's classic timestamp format, e.g. "Wed Oct 10 20:19:24 +0000 2018".
fn parse_tweet_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(raw, "%a %b %d %H:%M:%S %z %Y")
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn filter_and_rank(mut tweets: Vec<Tweet>, limit: usize) -> Vec<Tweet> {
    let cutoff = Utc::now() - ChronoDuration::days(MAX_TWEET_AGE_DAYS);
    // Unparseable dates are kept (fail open), matching the article filter.
    tweets.retain(|t| match parse_tweet_date(&t.created_at) {
        Some(date) => date >= cutoff,
        None => true,
    });
    tweets.sort_by_key(|t| std::cmp::Reverse(parse_tweet_date(&t.created_at)));
    tweets.truncate(limit);
    tweets
}

#[async_trait]
impl Tool for TwitterTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: TWITTER,
            description: "Get cryptocurrency-related data from Twitter/X. Use this for real-time social media insights.",
        }
    }

    async fn execute(&self, params: &ToolParams) -> ToolOutput {
        let limit = params.limit.unwrap_or(DEFAULT_TWEET_LIMIT);
        let order = "popular";
        let clean_query = params.query.trim().to_lowercase();
        let cache_key = format!("{CACHE_PREFIX}:{clean_query}:{order}");
        info!(query = %clean_query, limit, "executing twitter tool");

        if let Some(cached) = self.cache.get_data::<CachedTweets>(&cache_key) {
            info!(count = cached.tweets.len(), "serving tweets from cache");
            return ToolOutput::Tweets {
                tweets: filter_and_rank(cached.tweets, limit),
                time_context: None,
            };
        }

        match self.search_tweets(&clean_query, order).await {
            Ok(tweets) if !tweets.is_empty() => {
                self.cache.set_data(
                    &cache_key,
                    &CachedTweets {
                        tweets: tweets.clone(),
                        fetched_at: Utc::now(),
                    },
                    Some(CACHE_TTL_SECS),
                );
                ToolOutput::Tweets {
                    tweets: filter_and_rank(tweets, limit),
                    time_context: None,
                }
            }
            Ok(_) => ToolOutput::Empty,
            Err(e) => {
                warn!(error = %e, "tweet search failed");
                ToolOutput::Failed(e.to_string())
            }
        }
    }

    fn format_response(&self, query: &str, output: &ToolOutput) -> QueryResponse {
        let mut resp = QueryResponse::base(query);
        if let ToolOutput::Tweets { tweets, .. } = output {
            resp.answer = format!("Found {} recent tweets about '{query}'", tweets.len());
            resp.context = "Based on real-time social media activity.".to_string();
        } else {
            resp.answer = format!("No recent tweets found about '{query}'");
        }
        resp
    }
}
