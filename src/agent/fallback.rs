// src/agent/fallback.rs
// Escalation policy for queries whose primary merge produced no articles:
// a named-state machine traversed once, in order. A source that already
// contributed usable data is never called again for the same query.

use std::collections::HashSet;

use metrics::counter;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::agent::CombinedDataset;
use crate::tools::{ToolParams, ToolRegistry, CRYPTO_NEWS, TWITTER};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackStage {
    /// Targeted social probe using an extracted token name.
    TokenProbe,
    /// Social search retried with the raw query.
    SocialRetry,
    /// News feed retried with the raw query.
    NewsRetry,
    /// Terminal: no data from any source.
    Exhausted,
}

impl FallbackStage {
    fn label(self) -> &'static str {
        match self {
            FallbackStage::TokenProbe => "token_probe",
            FallbackStage::SocialRetry => "social_retry",
            FallbackStage::NewsRetry => "news_retry",
            FallbackStage::Exhausted => "exhausted",
        }
    }
}

/// Extract a token name to probe for. Explicit token data in the additional
/// context takes precedence over the query text; the query-text rule keeps
/// the text before the word "token".
pub fn token_hint(query: &str, additional_context: Option<&Map<String, Value>>) -> Option<String> {
    if let Some(name) = additional_context
        .and_then(|ctx| ctx.get("token_data"))
        .and_then(|td| td.get("token_name"))
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
    {
        return Some(name.trim().to_string());
    }

    let lower = query.to_lowercase();
    let idx = lower.find("token")?;
    let candidate = lower[..idx].trim();
    if candidate.is_empty() {
        None
    } else {
        Some(candidate.to_string())
    }
}

/// Traverse the fallback chain. Merges into `combined` and records satisfied
/// sources as it goes; returns the stage that produced data, or `Exhausted`.
pub async fn run_fallback_chain(
    registry: &ToolRegistry,
    query: &str,
    token: Option<String>,
    satisfied: &mut HashSet<String>,
    combined: &mut CombinedDataset,
) -> FallbackStage {
    let mut stage = FallbackStage::TokenProbe;
    loop {
        match stage {
            FallbackStage::TokenProbe => {
                if let Some(token) = token.as_deref() {
                    if !satisfied.contains(TWITTER) {
                        if let Some(tool) = registry.get(TWITTER) {
                            info!(token, "probing social search for token");
                            let params =
                                ToolParams::query(format!("{token} token cryptocurrency"));
                            let output = tool.execute(&params).await;
                            if output.is_usable() {
                                combined.merge(&output);
                                satisfied.insert(TWITTER.to_string());
                                counter!("agent_fallback_stage_total", "stage" => stage.label())
                                    .increment(1);
                                return stage;
                            }
                            warn!(token, "token probe produced no data");
                        }
                    }
                }
                stage = FallbackStage::SocialRetry;
            }
            FallbackStage::SocialRetry => {
                if !satisfied.contains(TWITTER) {
                    if let Some(tool) = registry.get(TWITTER) {
                        info!("retrying social search with raw query");
                        let output = tool.execute(&ToolParams::query(query)).await;
                        if output.is_usable() {
                            combined.merge(&output);
                            satisfied.insert(TWITTER.to_string());
                            counter!("agent_fallback_stage_total", "stage" => stage.label())
                                .increment(1);
                            return stage;
                        }
                    }
                }
                stage = FallbackStage::NewsRetry;
            }
            FallbackStage::NewsRetry => {
                if combined.articles.is_empty() && !satisfied.contains(CRYPTO_NEWS) {
                    if let Some(tool) = registry.get(CRYPTO_NEWS) {
                        info!("retrying news feed with raw query");
                        let output = tool.execute(&ToolParams::query(query)).await;
                        if output.is_usable() {
                            combined.merge(&output);
                            satisfied.insert(CRYPTO_NEWS.to_string());
                            counter!("agent_fallback_stage_total", "stage" => stage.label())
                                .increment(1);
                            return stage;
                        }
                    }
                }
                stage = FallbackStage::Exhausted;
            }
            FallbackStage::Exhausted => {
                counter!("agent_fallback_stage_total", "stage" => stage.label()).increment(1);
                return stage;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_hint_prefers_additional_context() {
        let ctx: Map<String, Value> = serde_json::from_str(
            r#"{"token_data": {"token_name": "monalisa"}}"#,
        )
        .unwrap();
        assert_eq!(
            token_hint("bitcoin token analysis", Some(&ctx)),
            Some("monalisa".to_string())
        );
    }

    #[test]
    fn token_hint_takes_text_before_token_keyword() {
        assert_eq!(
            token_hint("xyzzytoken123 analysis", None),
            Some("xyzzy".to_string())
        );
        assert_eq!(token_hint("monalisa token price", None), Some("monalisa".to_string()));
    }

    #[test]
    fn token_hint_absent_without_keyword_or_context() {
        assert_eq!(token_hint("bitcoin price trends", None), None);
        // Query starting with "token": nothing before the keyword.
        assert_eq!(token_hint("token analysis", None), None);
    }
}
