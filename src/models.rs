// src/models.rs
// Shared data types crossing component boundaries: articles, tweets,
// request/response contracts, and the closed sentiment set.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Overall market sentiment. Closed set; anything the model sends outside of
/// it maps to `Neutral` via `from_text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    Bullish,
    Bearish,
    Neutral,
    Mixed,
}

impl Default for Sentiment {
    fn default() -> Self {
        Sentiment::Neutral
    }
}

impl Sentiment {
    /// Case-insensitive keyword mapping. Bullish/bearish take precedence over
    /// mixed so a reply like "mixed but bullish overall" leans bullish.
    pub fn from_text(text: &str) -> Self {
        let lower = text.to_lowercase();
        if lower.contains("bullish") {
            Sentiment::Bullish
        } else if lower.contains("bearish") {
            Sentiment::Bearish
        } else if lower.contains("mixed") {
            Sentiment::Mixed
        } else {
            Sentiment::Neutral
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: Option<String>,
}

/// One news article. Every field is optional; identity is the `link`, which
/// also serves as the cache dedup key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub media: Option<Vec<String>>,
    pub link: Option<String>,
    pub authors: Option<Vec<Author>>,
    pub published: Option<String>,
    pub category: Option<String>,
    #[serde(rename = "subCategory")]
    pub sub_category: Option<String>,
    pub language: Option<String>,
    #[serde(rename = "timeZone")]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tweet {
    pub id: String,
    pub text: String,
    pub author: String,
    #[serde(default)]
    pub author_name: String,
    pub created_at: String,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub retweets: u64,
}

impl Tweet {
    /// Canonical URL used when a tweet is re-represented as an article.
    pub fn canonical_url(&self) -> String {
        format!("https://twitter.com/{}/status/{}", self.author, self.id)
    }
}

/// Per-article analysis entry from the synthesis reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleAnalysis {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub key_points: String,
    #[serde(default)]
    pub significance: String,
}

/// Query intake contract consumed from the HTTP layer.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default = "default_min_articles")]
    pub min_articles: usize,
    #[serde(default)]
    pub additional_context: Option<serde_json::Map<String, serde_json::Value>>,
}

fn default_min_articles() -> usize {
    3
}

/// Final contractual response. `query`, `answer`, `sentiment`, `context`
/// and `processed_at` are always present, even on total failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub query: String,
    pub answer: String,
    pub sentiment: Sentiment,
    pub context: String,
    pub trending_topics: Vec<String>,
    pub articles: Vec<Article>,
    pub article_analysis: Vec<ArticleAnalysis>,
    pub processed_at: String,
}

impl QueryResponse {
    /// Base response with default values, filled in by tools or the agent.
    pub fn base(query: &str) -> Self {
        Self {
            query: query.to_string(),
            answer: String::new(),
            sentiment: Sentiment::Neutral,
            context: String::new(),
            trending_topics: vec![
                "Bitcoin".to_string(),
                "Ethereum".to_string(),
                "Cryptocurrency".to_string(),
            ],
            articles: Vec::new(),
            article_analysis: Vec::new(),
            processed_at: Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentiment_keyword_mapping() {
        assert_eq!(Sentiment::from_text("Very BULLISH today"), Sentiment::Bullish);
        assert_eq!(Sentiment::from_text("markets look bearish"), Sentiment::Bearish);
        assert_eq!(Sentiment::from_text("signals are mixed"), Sentiment::Mixed);
        assert_eq!(Sentiment::from_text("nothing to see"), Sentiment::Neutral);
    }

    #[test]
    fn tweet_canonical_url_points_at_status() {
        let t = Tweet {
            id: "123".into(),
            author: "someone".into(),
            ..Default::default()
        };
        assert_eq!(t.canonical_url(), "https://twitter.com/someone/status/123");
    }

    #[test]
    fn query_request_defaults_min_articles_to_three() {
        let req: QueryRequest = serde_json::from_str(r#"{"query":"btc"}"#).unwrap();
        assert_eq!(req.min_articles, 3);
        assert!(req.additional_context.is_none());
    }
}
