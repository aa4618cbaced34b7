// src/agent/respond.rs
// Synthesis-reply parse boundary and final response assembly. The heuristic
// text extractor is the sole consumer of the Malformed branch.

use chrono::Utc;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::llm::strip_code_fences;
use crate::models::{Article, ArticleAnalysis, QueryResponse, Sentiment};

const GENERIC_CONTEXT: &str = "Based on analysis of recent cryptocurrency news.";
const GENERIC_TOPICS: [&str; 5] = [
    "Bitcoin",
    "Ethereum",
    "Cryptocurrency",
    "Market Analysis",
    "Trading",
];

/// Structured synthesis reply. Every field tolerates absence; the sentiment
/// accepts any JSON value and maps non-strings to Neutral.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SynthesisReply {
    #[serde(default)]
    pub answer: String,
    #[serde(default, deserialize_with = "lenient_sentiment")]
    pub sentiment: Sentiment,
    #[serde(default)]
    pub trending_topics: Vec<String>,
    #[serde(default)]
    pub article_analysis: Vec<ArticleAnalysis>,
    #[serde(default)]
    pub needs_more_context: bool,
    #[serde(default)]
    pub needed_article_count: Option<u32>,
    #[serde(default)]
    pub suggested_time_range: Option<String>,
}

fn lenient_sentiment<'de, D: Deserializer<'de>>(d: D) -> Result<Sentiment, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(match value.as_str() {
        Some(s) => Sentiment::from_text(s),
        None => Sentiment::Neutral,
    })
}

/// Outcome of the one explicit parse boundary over the model's raw reply.
#[derive(Debug)]
pub enum SynthesisOutcome {
    Parsed(SynthesisReply),
    Malformed(String),
}

/// Strip code fences and parse as a structured object. Anything that is not
/// a JSON object comes back as `Malformed` with the raw text.
pub fn parse_synthesis(raw: &str) -> SynthesisOutcome {
    let cleaned = strip_code_fences(raw);
    match serde_json::from_str::<SynthesisReply>(cleaned) {
        Ok(reply) => SynthesisOutcome::Parsed(reply),
        Err(_) => SynthesisOutcome::Malformed(raw.to_string()),
    }
}

/// Heuristic extraction for non-JSON replies: sentiment keywords anywhere in
/// the text, generic topics, and the raw text as the answer.
pub fn extract_from_text(raw: &str) -> SynthesisReply {
    SynthesisReply {
        answer: raw.to_string(),
        sentiment: Sentiment::from_text(raw),
        trending_topics: GENERIC_TOPICS.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    }
}

/// Canonical degraded response: structurally valid, explanatory answer,
/// empty article list.
pub fn fallback_response(error_message: &str) -> QueryResponse {
    QueryResponse {
        query: String::new(),
        answer: format!(
            "I encountered an error: {error_message}. However, I can still provide you with recent cryptocurrency news."
        ),
        sentiment: Sentiment::Neutral,
        context: "Unable to analyze market sentiment due to an error.".to_string(),
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

/// Final invariant pass: `query`, `processed_at` and `context` are always
/// non-empty regardless of upstream failures.
pub fn ensure_required_fields(mut resp: QueryResponse, query: &str) -> QueryResponse {
    if resp.query.is_empty() {
        resp.query = query.to_string();
    }
    if resp.processed_at.is_empty() {
        resp.processed_at = Utc::now().to_rfc3339();
    }
    if resp.context.is_empty() {
        resp.context = GENERIC_CONTEXT.to_string();
    }
    resp
}

/// Assemble the contractual response from the synthesis reply and the merged
/// article corpus.
///
/// Article selection prefers articles whose title appears among the analysis
/// titles, in analysis order, then backfills with unused articles in corpus
/// order. Returning fewer than `min_articles` is acceptable when the corpus
/// itself is smaller.
pub fn build_final_response(
    query: &str,
    reply: SynthesisReply,
    articles: &[Article],
    min_articles: usize,
) -> QueryResponse {
    let context = {
        let parts: Vec<&str> = reply
            .article_analysis
            .iter()
            .take(3)
            .map(|a| a.significance.as_str())
            .filter(|s| !s.is_empty())
            .collect();
        if parts.is_empty() {
            GENERIC_CONTEXT.to_string()
        } else {
            parts.join(" ")
        }
    };

    let mut selected: Vec<Article> = Vec::with_capacity(min_articles);
    let mut used = vec![false; articles.len()];

    for analysis in &reply.article_analysis {
        if selected.len() >= min_articles {
            break;
        }
        if analysis.title.is_empty() {
            continue;
        }
        if let Some(idx) = (0..articles.len())
            .find(|&i| !used[i] && articles[i].title.as_deref() == Some(analysis.title.as_str()))
        {
            used[idx] = true;
            selected.push(articles[idx].clone());
        }
    }

    for (idx, article) in articles.iter().enumerate() {
        if selected.len() >= min_articles {
            break;
        }
        if !used[idx] {
            used[idx] = true;
            selected.push(article.clone());
        }
    }

    let response = QueryResponse {
        query: query.to_string(),
        answer: if reply.answer.is_empty() {
            "No analysis available.".to_string()
        } else {
            reply.answer
        },
        sentiment: reply.sentiment,
        context,
        trending_topics: if reply.trending_topics.is_empty() {
            vec![
                "Bitcoin".to_string(),
                "Ethereum".to_string(),
                "Cryptocurrency".to_string(),
            ]
        } else {
            reply.trending_topics
        },
        articles: selected,
        article_analysis: reply.article_analysis,
        processed_at: Utc::now().to_rfc3339(),
    };

    ensure_required_fields(response, query)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(title: &str) -> Article {
        Article {
            title: Some(title.to_string()),
            link: Some(format!("https://n/{title}")),
            ..Default::default()
        }
    }

    fn analysis(title: &str, significance: &str) -> ArticleAnalysis {
        ArticleAnalysis {
            title: title.to_string(),
            key_points: String::new(),
            significance: significance.to_string(),
        }
    }

    #[test]
    fn fenced_json_parses() {
        let raw = "```json\n{\"answer\":\"up only\",\"sentiment\":\"Bullish\"}\n```";
        match parse_synthesis(raw) {
            SynthesisOutcome::Parsed(reply) => {
                assert_eq!(reply.answer, "up only");
                assert_eq!(reply.sentiment, Sentiment::Bullish);
            }
            SynthesisOutcome::Malformed(_) => panic!("should parse"),
        }
    }

    #[test]
    fn prose_goes_malformed_then_heuristic() {
        let raw = "The market looks quite BEARISH after the ETF outflows.";
        let SynthesisOutcome::Malformed(text) = parse_synthesis(raw) else {
            panic!("prose must be malformed");
        };
        let reply = extract_from_text(&text);
        assert_eq!(reply.sentiment, Sentiment::Bearish);
        assert_eq!(reply.answer, raw);
        assert_eq!(reply.trending_topics.len(), 5);
    }

    #[test]
    fn non_string_sentiment_maps_to_neutral() {
        let raw = r#"{"answer":"x","sentiment":42}"#;
        let SynthesisOutcome::Parsed(reply) = parse_synthesis(raw) else {
            panic!("should parse");
        };
        assert_eq!(reply.sentiment, Sentiment::Neutral);
    }

    #[test]
    fn analyzed_titles_selected_in_analysis_order_then_backfilled() {
        let articles = vec![article("a"), article("b"), article("c"), article("d")];
        let reply = SynthesisReply {
            article_analysis: vec![analysis("c", "sig-c"), analysis("a", "sig-a")],
            ..Default::default()
        };
        let resp = build_final_response("q", reply, &articles, 3);
        let titles: Vec<&str> = resp
            .articles
            .iter()
            .map(|a| a.title.as_deref().unwrap())
            .collect();
        // Analysis order first (c, a), then backfill in corpus order (b).
        assert_eq!(titles, vec!["c", "a", "b"]);
        assert_eq!(resp.context, "sig-c sig-a");
    }

    #[test]
    fn never_exceeds_min_articles_and_caps_at_corpus_size() {
        let articles = vec![article("a"), article("b")];
        let resp = build_final_response("q", SynthesisReply::default(), &articles, 5);
        assert_eq!(resp.articles.len(), 2);

        let resp = build_final_response("q", SynthesisReply::default(), &articles, 1);
        assert_eq!(resp.articles.len(), 1);

        let resp = build_final_response("q", SynthesisReply::default(), &articles, 0);
        assert!(resp.articles.is_empty());
    }

    #[test]
    fn required_fields_always_present() {
        let resp = ensure_required_fields(fallback_response("boom"), "my query");
        assert_eq!(resp.query, "my query");
        assert!(!resp.processed_at.is_empty());
        assert!(!resp.context.is_empty());
        assert!(resp.answer.contains("boom"));
    }
}
