// src/tools/dexscreener.rs
// On-chain pair analytics from the public Dexscreener API (no credentials).
// Matching pairs are rendered as synthetic articles so the merge path and the
// synthesis step can consume them alongside news.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cache::NewsCache;
use crate::models::{Article, QueryResponse};
use crate::tools::{Tool, ToolDescriptor, ToolOutput, ToolParams, DEXSCREENER};

const BASE_URL: &str = "https://api.dexscreener.com";
const MAX_PAIRS: usize = 10;
const CACHE_TTL_SECS: u64 = 5 * 60;

pub struct DexscreenerTool {
    cache: Arc<NewsCache>,
    http: reqwest::Client,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    pairs: Vec<Pair>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Pair {
    #[serde(default, rename = "chainId")]
    chain_id: String,
    #[serde(default, rename = "dexId")]
    dex_id: String,
    #[serde(default)]
    url: String,
    #[serde(default, rename = "baseToken")]
    base_token: TokenRef,
    #[serde(default, rename = "quoteToken")]
    quote_token: TokenRef,
    #[serde(default, rename = "priceUsd")]
    price_usd: Option<String>,
    #[serde(default)]
    liquidity: Option<Liquidity>,
    #[serde(default)]
    volume: Option<Volume>,
    #[serde(default, rename = "priceChange")]
    price_change: Option<PriceChange>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TokenRef {
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Liquidity {
    #[serde(default)]
    usd: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Volume {
    #[serde(default)]
    h24: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PriceChange {
    #[serde(default)]
    h24: Option<f64>,
}

/// Entry from the token-boosts endpoint; only the fields we render.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct BoostedToken {
    #[serde(default)]
    url: String,
    #[serde(default, rename = "chainId")]
    chain_id: String,
    #[serde(default, rename = "tokenAddress")]
    token_address: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, rename = "totalAmount")]
    total_amount: Option<f64>,
}

impl DexscreenerTool {
    pub fn new(cache: Arc<NewsCache>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("crypto-news-agent/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(20))
            .build()
            .expect("reqwest client");
        Self { cache, http }
    }

    async fn fetch_top_boosts(&self) -> Result<Vec<BoostedToken>> {
        let url = format!("{BASE_URL}/token-boosts/top/v1");
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("dexscreener boosts failed")?;

        let status = resp.status();
        if !status.is_success() {
            bail!("dexscreener returned status {status}");
        }
        resp.json().await.context("dexscreener boosts body")
    }

    async fn search_pairs(&self, query: &str) -> Result<Vec<Pair>> {
        let url = format!("{BASE_URL}/latest/dex/search");
        let resp = self
            .http
            .get(&url)
            .query(&[("q", query)])
            .send()
            .await
            .context("dexscreener search failed")?;

        let status = resp.status();
        if !status.is_success() {
            bail!("dexscreener returned status {status}");
        }
        let body: SearchResponse = resp.json().await.context("dexscreener body")?;
        Ok(body.pairs)
    }

    /// Top boosted tokens rendered as synthetic articles, cached briefly
    /// under a query-independent key.
    async fn trending_output(&self) -> ToolOutput {
        let cache_key = "dexscreener:boosts:top";
        let boosts = if let Some(cached) = self.cache.get_data::<Vec<BoostedToken>>(cache_key) {
            cached
        } else {
            match self.fetch_top_boosts().await {
                Ok(boosts) => {
                    self.cache.set_data(cache_key, &boosts, Some(CACHE_TTL_SECS));
                    boosts
                }
                Err(e) => return ToolOutput::Failed(e.to_string()),
            }
        };

        if boosts.is_empty() {
            return ToolOutput::Empty;
        }
        let articles = boosts.iter().take(MAX_PAIRS).map(boost_to_article).collect();
        ToolOutput::Articles {
            articles,
            time_context: Some("Trending on-chain tokens".to_string()),
        }
    }
}

fn boost_to_article(boost: &BoostedToken) -> Article {
    let activity = boost
        .total_amount
        .map(|v| format!("boost activity {v:.0}"))
        .unwrap_or_else(|| "boost activity unknown".to_string());
    Article {
        title: Some(format!(
            "Trending token {} on {}",
            boost.token_address, boost.chain_id
        )),
        summary: Some(match boost.description.as_deref() {
            Some(d) if !d.is_empty() => format!("{d} ({activity})"),
            _ => activity,
        }),
        link: Some(boost.url.clone()),
        category: Some("On-chain Analytics".to_string()),
        sub_category: Some("Dexscreener".to_string()),
        ..Default::default()
    }
}

fn pair_to_article(pair: &Pair) -> Article {
    let price = pair.price_usd.as_deref().unwrap_or("?");
    let liquidity = pair
        .liquidity
        .as_ref()
        .and_then(|l| l.usd)
        .map(|v| format!("${v:.0}"))
        .unwrap_or_else(|| "unknown".to_string());
    let volume = pair
        .volume
        .as_ref()
        .and_then(|v| v.h24)
        .map(|v| format!("${v:.0}"))
        .unwrap_or_else(|| "unknown".to_string());
    let change = pair
        .price_change
        .as_ref()
        .and_then(|c| c.h24)
        .map(|v| format!("{v:+.2}%"))
        .unwrap_or_else(|| "n/a".to_string());

    Article {
        title: Some(format!(
            "{}/{} on {} ({})",
            pair.base_token.symbol, pair.quote_token.symbol, pair.dex_id, pair.chain_id
        )),
        summary: Some(format!(
            "{} ({}) trades at ${price}. 24h volume {volume}, liquidity {liquidity}, 24h change {change}.",
            pair.base_token.name, pair.base_token.symbol
        )),
        link: Some(pair.url.clone()),
        category: Some("On-chain Analytics".to_string()),
        sub_category: Some("Dexscreener".to_string()),
        ..Default::default()
    }
}

#[async_trait]
impl Tool for DexscreenerTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: DEXSCREENER,
            description: "Get real-time token price, liquidity, volume, trending tokens and trading-pair data from Dexscreener. Use this for on-chain token analytics, trending tokens, and DEX pair search.",
        }
    }

    async fn execute(&self, params: &ToolParams) -> ToolOutput {
        let query = params.query.trim();
        if query.is_empty() {
            return ToolOutput::Failed("no query provided for pair search".to_string());
        }
        info!(query, "executing dexscreener tool");

        let lower = query.to_lowercase();
        if lower.contains("trending") || lower.contains("boost") {
            return self.trending_output().await;
        }

        let cache_key = format!("dexscreener:search:{}", lower);
        let pairs = if let Some(cached) = self.cache.get_data::<Vec<Pair>>(&cache_key) {
            cached
        } else {
            match self.search_pairs(query).await {
                Ok(pairs) => {
                    self.cache.set_data(&cache_key, &pairs, Some(CACHE_TTL_SECS));
                    pairs
                }
                Err(e) => return ToolOutput::Failed(e.to_string()),
            }
        };

        if pairs.is_empty() {
            return ToolOutput::Empty;
        }

        let articles = pairs.iter().take(MAX_PAIRS).map(pair_to_article).collect();
        ToolOutput::Articles {
            articles,
            time_context: Some("Live on-chain data".to_string()),
        }
    }

    fn format_response(&self, query: &str, output: &ToolOutput) -> QueryResponse {
        let mut resp = QueryResponse::base(query);
        if let ToolOutput::Articles { articles, .. } = output {
            let symbols: Vec<String> = articles
                .iter()
                .filter_map(|a| a.title.clone())
                .take(3)
                .collect();
            resp.answer = format!("Found {} pairs. Top: {}", articles.len(), symbols.join(", "));
            resp.context = "Pair data from Dexscreener.".to_string();
            resp.trending_topics = symbols;
            resp.articles = articles.clone();
        } else {
            resp.answer = "No matching trading pairs found.".to_string();
        }
        resp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_renders_as_article_with_analytics_summary() {
        let pair = Pair {
            chain_id: "solana".into(),
            dex_id: "raydium".into(),
            url: "https://dexscreener.com/solana/abc".into(),
            base_token: TokenRef {
                symbol: "BONK".into(),
                name: "Bonk".into(),
            },
            quote_token: TokenRef {
                symbol: "SOL".into(),
                name: "Solana".into(),
            },
            price_usd: Some("0.000021".into()),
            liquidity: Some(Liquidity { usd: Some(1_000_000.0) }),
            volume: Some(Volume { h24: Some(250_000.0) }),
            price_change: Some(PriceChange { h24: Some(-3.4) }),
        };
        let article = pair_to_article(&pair);
        assert_eq!(article.title.as_deref(), Some("BONK/SOL on raydium (solana)"));
        let summary = article.summary.unwrap();
        assert!(summary.contains("$0.000021"));
        assert!(summary.contains("-3.40%"));
        assert_eq!(article.category.as_deref(), Some("On-chain Analytics"));
    }

    #[test]
    fn boosted_token_renders_as_trending_article() {
        let boost = BoostedToken {
            url: "https://dexscreener.com/solana/def".into(),
            chain_id: "solana".into(),
            token_address: "De7...".into(),
            description: Some("Community token".into()),
            total_amount: Some(500.0),
        };
        let article = boost_to_article(&boost);
        assert_eq!(
            article.title.as_deref(),
            Some("Trending token De7... on solana")
        );
        assert!(article.summary.unwrap().contains("boost activity 500"));
    }
}
