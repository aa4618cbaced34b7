// tests/fallback_chain.rs
// The escalation state machine in isolation: stage ordering, the
// already-satisfied skip, and exhaustion.

mod common;

use std::collections::HashSet;


use crypto_news_agent::agent::fallback::{run_fallback_chain, token_hint, FallbackStage};
use crypto_news_agent::agent::CombinedDataset;
use crypto_news_agent::tools::{ToolOutput, ToolRegistry, CRYPTO_NEWS, TWITTER};

use common::{articles_output, tweet, StubTool};

fn tweets_output(n: usize) -> ToolOutput {
    ToolOutput::Tweets {
        tweets: (0..n)
            .map(|i| tweet("degen", &i.to_string(), "to the moon"))
            .collect(),
        time_context: None,
    }
}

#[tokio::test]
async fn token_probe_satisfies_social_and_stops() {
    let twitter = StubTool::new(TWITTER, vec![tweets_output(2)]);
    let news = StubTool::new(CRYPTO_NEWS, vec![articles_output(&["a"], "Past 24 hours")]);
    let mut reg = ToolRegistry::new();
    reg.register(news.clone());
    reg.register(twitter.clone());

    let mut satisfied = HashSet::new();
    let mut combined = CombinedDataset::default();
    let stage = run_fallback_chain(
        &reg,
        "monalisa token analysis",
        token_hint("monalisa token analysis", None),
        &mut satisfied,
        &mut combined,
    )
    .await;

    assert_eq!(stage, FallbackStage::TokenProbe);
    assert_eq!(twitter.calls(), 1);
    assert_eq!(news.calls(), 0, "news retry must not run once articles exist");
    assert_eq!(combined.tweets.len(), 2);
    // Tweets were re-represented as articles.
    assert_eq!(combined.articles.len(), 2);
    assert!(satisfied.contains(TWITTER));
}

#[tokio::test]
async fn satisfied_social_source_is_never_called_again() {
    let twitter = StubTool::new(TWITTER, vec![tweets_output(1)]);
    let news = StubTool::new(CRYPTO_NEWS, vec![articles_output(&["a"], "Past 24 hours")]);
    let mut reg = ToolRegistry::new();
    reg.register(news.clone());
    reg.register(twitter.clone());

    // Twitter already contributed earlier in this query.
    let mut satisfied: HashSet<String> = [TWITTER.to_string()].into();
    let mut combined = CombinedDataset::default();
    let stage = run_fallback_chain(
        &reg,
        "monalisa token analysis",
        Some("monalisa".to_string()),
        &mut satisfied,
        &mut combined,
    )
    .await;

    assert_eq!(twitter.calls(), 0);
    assert_eq!(news.calls(), 1);
    assert_eq!(stage, FallbackStage::NewsRetry);
    assert_eq!(combined.articles.len(), 1);
}

#[tokio::test]
async fn chain_walks_social_then_news_then_exhausts() {
    let twitter = StubTool::new(TWITTER, vec![ToolOutput::Empty]);
    let news = StubTool::new(CRYPTO_NEWS, vec![ToolOutput::Failed("no key".into())]);
    let mut reg = ToolRegistry::new();
    reg.register(news.clone());
    reg.register(twitter.clone());

    let mut satisfied = HashSet::new();
    let mut combined = CombinedDataset::default();
    // No "token" in the query and no context: the probe is skipped.
    let stage = run_fallback_chain(&reg, "xyzzy9000", None, &mut satisfied, &mut combined).await;

    assert_eq!(stage, FallbackStage::Exhausted);
    assert_eq!(twitter.calls(), 1);
    assert_eq!(news.calls(), 1);
    assert!(combined.articles.is_empty());
    assert!(satisfied.is_empty());
}

#[tokio::test]
async fn failed_token_probe_escalates_to_raw_query_retry() {
    let twitter = StubTool::new(TWITTER, vec![ToolOutput::Empty, tweets_output(1)]);
    let mut reg = ToolRegistry::new();
    reg.register(twitter.clone());

    let mut satisfied = HashSet::new();
    let mut combined = CombinedDataset::default();
    let stage = run_fallback_chain(
        &reg,
        "monalisa token analysis",
        Some("monalisa".to_string()),
        &mut satisfied,
        &mut combined,
    )
    .await;

    // First call is the probe (empty), second is the raw-query retry.
    assert_eq!(twitter.calls(), 2);
    assert_eq!(stage, FallbackStage::SocialRetry);
    assert_eq!(combined.articles.len(), 1);
}
