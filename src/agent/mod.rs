// src/agent/mod.rs
// Query orchestration: tool selection, concurrent dispatch with per-tool
// failure isolation, registry-order merge, fallback escalation and the
// synthesis call. The caller always gets a structurally valid response.

pub mod fallback;
pub mod respond;
pub mod selector;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::Result;
use futures_util::future::join_all;
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::cache::NewsCache;
use crate::config::AppConfig;
use crate::llm::{DynLlmClient, GeminiClient};
use crate::models::{Article, QueryResponse, Tweet};
use crate::prompts;
use crate::tools::{
    crypto_news::CryptoNewsTool, crypto_search::CryptoSearchTool, dexscreener::DexscreenerTool,
    twitter::TwitterTool, ToolOutput, ToolParams, ToolRegistry,
};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("agent_queries_total", "Queries processed by the agent.");
        describe_counter!("agent_tool_failures_total", "Tool executions discarded as failed.");
        describe_counter!(
            "agent_fallback_stage_total",
            "Fallback-chain stages that contributed data or exhausted."
        );
        describe_counter!(
            "agent_synthesis_parse_failures_total",
            "Synthesis replies that fell back to heuristic extraction."
        );
    });
}

/// Cross-tool accumulator consumed by the synthesis step. Built strictly in
/// registry-registration order; `time_context` is last-write-wins.
#[derive(Debug, Clone)]
pub struct CombinedDataset {
    pub articles: Vec<Article>,
    pub tweets: Vec<Tweet>,
    pub time_context: String,
}

impl Default for CombinedDataset {
    fn default() -> Self {
        Self {
            articles: Vec::new(),
            tweets: Vec::new(),
            time_context: "Recent news".to_string(),
        }
    }
}

impl CombinedDataset {
    /// Fold one usable tool output in. Tweets are appended twice: once as
    /// tweets, once re-represented as articles, because downstream consumers
    /// only read the article sequence.
    pub fn merge(&mut self, output: &ToolOutput) {
        match output {
            ToolOutput::Articles { articles, time_context } => {
                self.articles.extend(articles.iter().cloned());
                if let Some(tc) = time_context {
                    self.time_context = tc.clone();
                }
            }
            ToolOutput::Tweets { tweets, time_context } => {
                self.tweets.extend(tweets.iter().cloned());
                self.articles.extend(tweets.iter().map(tweet_to_article));
                if let Some(tc) = time_context {
                    self.time_context = tc.clone();
                }
            }
            ToolOutput::Empty | ToolOutput::Failed(_) => {}
        }
    }
}

/// Re-represent a tweet as an article for the synthesis corpus.
pub fn tweet_to_article(tweet: &Tweet) -> Article {
    Article {
        title: Some(format!("Tweet by @{}", tweet.author)),
        summary: Some(tweet.text.clone()),
        link: Some(tweet.canonical_url()),
        published: Some(tweet.created_at.clone()),
        category: Some("Social Media".to_string()),
        sub_category: Some("Twitter".to_string()),
        ..Default::default()
    }
}

pub struct CryptoAgent {
    cache: Arc<NewsCache>,
    registry: ToolRegistry,
    llm: DynLlmClient,
}

impl CryptoAgent {
    /// Explicit dependency injection: the cache handle, registry and model
    /// client are constructed once and passed in.
    pub fn new(cache: Arc<NewsCache>, registry: ToolRegistry, llm: DynLlmClient) -> Self {
        ensure_metrics_described();
        Self { cache, registry, llm }
    }

    /// Production wiring: the four adapters in fixed order plus Gemini.
    pub fn from_config(config: &AppConfig) -> Self {
        let cache = Arc::new(NewsCache::new(config.cache_ttl_secs));

        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(CryptoNewsTool::new(Arc::clone(&cache), config)));
        registry.register(Arc::new(CryptoSearchTool::new(Arc::clone(&cache), config)));
        registry.register(Arc::new(TwitterTool::new(Arc::clone(&cache), config)));
        registry.register(Arc::new(DexscreenerTool::new(Arc::clone(&cache))));
        info!(tools = registry.len(), "tool registry built");

        let llm: DynLlmClient = Arc::new(GeminiClient::new(
            &config.gemini_api_key,
            &config.gemini_model,
            0.2,
        ));

        Self::new(cache, registry, llm)
    }

    pub fn cache(&self) -> &Arc<NewsCache> {
        &self.cache
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Process one query end to end. Never returns an error: every internal
    /// failure degrades to the canonical fallback shape.
    pub async fn process_query(
        &self,
        query: &str,
        min_articles: usize,
        additional_context: Option<&Map<String, Value>>,
    ) -> QueryResponse {
        counter!("agent_queries_total").increment(1);
        info!(query, min_articles, "processing query");

        match self
            .process_inner(query, min_articles, additional_context)
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                warn!(error = %e, "query processing failed, returning fallback response");
                respond::ensure_required_fields(respond::fallback_response(&e.to_string()), query)
            }
        }
    }

    async fn process_inner(
        &self,
        query: &str,
        min_articles: usize,
        additional_context: Option<&Map<String, Value>>,
    ) -> Result<QueryResponse> {
        let invocations = selector::select_tools(&self.llm, &self.registry, query).await;

        // Launch every dispatch before awaiting any, so I/O overlaps. Each
        // tool converts its own failures into ToolOutput::Failed.
        let dispatches: Vec<_> = invocations
            .iter()
            .filter_map(|inv| {
                let tool = match self.registry.get(&inv.name) {
                    Some(t) => Arc::clone(t),
                    None => {
                        warn!(tool = %inv.name, "selected tool not in registry");
                        return None;
                    }
                };
                let name = inv.name.clone();
                let params = ToolParams::query(inv.custom_input.clone());
                Some(async move { (name, tool.execute(&params).await) })
            })
            .collect();
        let results = join_all(dispatches).await;

        // Keep usable outputs keyed by name; discard errors and empties.
        let mut outputs: HashMap<String, ToolOutput> = HashMap::new();
        let mut satisfied: HashSet<String> = HashSet::new();
        for (name, output) in results {
            match &output {
                ToolOutput::Failed(reason) => {
                    counter!("agent_tool_failures_total").increment(1);
                    warn!(tool = %name, reason = %reason, "tool failed, discarding result");
                }
                _ if output.is_usable() => {
                    debug!(tool = %name, "tool contributed usable data");
                    satisfied.insert(name.clone());
                    outputs.insert(name, output);
                }
                _ => debug!(tool = %name, "tool returned no data"),
            }
        }

        // Merge in registry-registration order, not completion order.
        let mut combined = CombinedDataset::default();
        for tool in self.registry.iter() {
            if let Some(output) = outputs.get(tool.descriptor().name) {
                combined.merge(output);
            }
        }

        if combined.articles.is_empty() {
            let token = fallback::token_hint(query, additional_context);
            let stage = fallback::run_fallback_chain(
                &self.registry,
                query,
                token,
                &mut satisfied,
                &mut combined,
            )
            .await;
            if stage == fallback::FallbackStage::Exhausted {
                info!(query, "fallback chain exhausted, returning no-data response");
                return Ok(respond::ensure_required_fields(
                    respond::fallback_response("No relevant articles or tweets found for your query"),
                    query,
                ));
            }
        }

        // Synthesis: single model call over the merged corpus.
        let mut user_prompt =
            prompts::synthesis_user_prompt(query, &combined.time_context, &combined.articles);
        if let Some(ctx) = additional_context.filter(|m| !m.is_empty()) {
            user_prompt.push_str(&format!(
                "\n\nAdditional Context:\n{}",
                serde_json::to_string_pretty(ctx).unwrap_or_default()
            ));
        }
        if !combined.tweets.is_empty() {
            user_prompt.push_str(&format!(
                "\n\nAdditional Twitter Data:\nFound {} relevant tweets about the topic.",
                combined.tweets.len()
            ));
        }

        let raw = self.llm.complete(prompts::SYSTEM_PROMPT, &user_prompt).await?;
        let reply = match respond::parse_synthesis(&raw) {
            respond::SynthesisOutcome::Parsed(reply) => reply,
            respond::SynthesisOutcome::Malformed(text) => {
                counter!("agent_synthesis_parse_failures_total").increment(1);
                warn!("synthesis reply was not valid JSON, using heuristic extraction");
                respond::extract_from_text(&text)
            }
        };

        let response =
            respond::build_final_response(query, reply, &combined.articles, min_articles);
        info!(
            query,
            sentiment = ?response.sentiment,
            articles = response.articles.len(),
            "query processed"
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tweet(author: &str, id: &str, text: &str) -> Tweet {
        Tweet {
            id: id.into(),
            text: text.into(),
            author: author.into(),
            created_at: "Wed Oct 10 20:19:24 +0000 2018".into(),
            ..Default::default()
        }
    }

    #[test]
    fn tweets_merge_as_both_tweets_and_articles() {
        let mut combined = CombinedDataset::default();
        combined.merge(&ToolOutput::Tweets {
            tweets: vec![tweet("alice", "1", "gm"), tweet("bob", "2", "wagmi")],
            time_context: None,
        });
        assert_eq!(combined.tweets.len(), 2);
        assert_eq!(combined.articles.len(), 2);
        assert_eq!(combined.articles[0].title.as_deref(), Some("Tweet by @alice"));
        assert_eq!(
            combined.articles[0].link.as_deref(),
            Some("https://twitter.com/alice/status/1")
        );
        assert_eq!(combined.articles[0].category.as_deref(), Some("Social Media"));
    }

    #[test]
    fn time_context_is_last_write_wins() {
        let mut combined = CombinedDataset::default();
        assert_eq!(combined.time_context, "Recent news");
        combined.merge(&ToolOutput::Articles {
            articles: vec![Article { link: Some("https://a/1".into()), ..Default::default() }],
            time_context: Some("Past 24 hours".into()),
        });
        combined.merge(&ToolOutput::Articles {
            articles: vec![Article { link: Some("https://a/2".into()), ..Default::default() }],
            time_context: Some("Live on-chain data".into()),
        });
        assert_eq!(combined.time_context, "Live on-chain data");
    }

    #[test]
    fn failed_and_empty_outputs_merge_nothing() {
        let mut combined = CombinedDataset::default();
        combined.merge(&ToolOutput::Failed("boom".into()));
        combined.merge(&ToolOutput::Empty);
        assert!(combined.articles.is_empty());
        assert!(combined.tweets.is_empty());
    }
}
