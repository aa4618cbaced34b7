// src/tools/mod.rs
// Uniform data-source adapter contract plus the fixed registry. Dispatch is
// by name through the registry; the tool set is closed at startup.

pub mod crypto_news;
pub mod crypto_search;
pub mod dexscreener;
pub mod twitter;

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::models::{Article, QueryResponse, Tweet};

pub const CRYPTO_NEWS: &str = "crypto_news";
pub const CRYPTO_SEARCH: &str = "crypto_search";
pub const TWITTER: &str = "twitter";
pub const DEXSCREENER: &str = "dexscreener";

/// Name + capability summary used for tool-selection prompting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
}

/// Execution input. `limit` is per-tool advisory; tools fall back to their
/// own defaults.
#[derive(Debug, Clone, Default)]
pub struct ToolParams {
    pub query: String,
    pub limit: Option<usize>,
}

impl ToolParams {
    pub fn query(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: None,
        }
    }
}

/// Per-tool output before merging. A result is usable when it carries at
/// least one article or tweet; `Failed` carries the reason for the log only.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Articles {
        articles: Vec<Article>,
        time_context: Option<String>,
    },
    Tweets {
        tweets: Vec<Tweet>,
        time_context: Option<String>,
    },
    Empty,
    Failed(String),
}

impl ToolOutput {
    pub fn is_usable(&self) -> bool {
        match self {
            ToolOutput::Articles { articles, .. } => !articles.is_empty(),
            ToolOutput::Tweets { tweets, .. } => !tweets.is_empty(),
            ToolOutput::Empty | ToolOutput::Failed(_) => false,
        }
    }

    pub fn time_context(&self) -> Option<&str> {
        match self {
            ToolOutput::Articles { time_context, .. }
            | ToolOutput::Tweets { time_context, .. } => time_context.as_deref(),
            _ => None,
        }
    }
}

/// One external data source behind a uniform capability contract.
#[async_trait]
pub trait Tool: Send + Sync {
    fn descriptor(&self) -> ToolDescriptor;
    /// Fetch data for the given input. Failures come back as
    /// `ToolOutput::Failed`, never as a panic or error propagation.
    async fn execute(&self, params: &ToolParams) -> ToolOutput;
    /// Render the tool's raw output as a standalone response, outside the
    /// merge path.
    fn format_response(&self, query: &str, output: &ToolOutput) -> QueryResponse;
}

pub type DynTool = Arc<dyn Tool>;

/// Fixed mapping from name to tool, built once at startup. Iteration order
/// is registration order; the merge relies on it for deterministic output.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<DynTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    pub fn register(&mut self, tool: DynTool) {
        tracing::info!(tool = tool.descriptor().name, "registered tool");
        self.tools.push(tool);
    }

    pub fn get(&self, name: &str) -> Option<&DynTool> {
        self.tools.iter().find(|t| t.descriptor().name == name)
    }

    pub fn describe(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor()).collect()
    }

    /// Registration-order iteration.
    pub fn iter(&self) -> impl Iterator<Item = &DynTool> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Scrub provider text: decode HTML entities, strip tags, collapse
/// whitespace. Applied to article titles/summaries before caching.
pub fn scrub_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();

    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrub_text_strips_tags_and_entities() {
        let s = "  <p>Bitcoin&nbsp;&amp; Ethereum</p>\n rally ";
        assert_eq!(scrub_text(s), "Bitcoin & Ethereum rally");
    }

    #[test]
    fn usable_requires_data() {
        assert!(!ToolOutput::Empty.is_usable());
        assert!(!ToolOutput::Failed("x".into()).is_usable());
        assert!(!ToolOutput::Articles {
            articles: vec![],
            time_context: Some("Past 24 hours".into())
        }
        .is_usable());
        assert!(ToolOutput::Tweets {
            tweets: vec![Tweet::default()],
            time_context: None
        }
        .is_usable());
    }
}
