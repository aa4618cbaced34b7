// src/prompts.rs
// Prompt construction for the two LLM calls: tool selection and synthesis.

use crate::models::Article;
use crate::tools::ToolDescriptor;

pub const SYSTEM_PROMPT: &str = r#"You are an expert cryptocurrency market intelligence assistant.

Your job is to provide insightful analysis about cryptocurrency tokens based on the provided data.

If additional context about a specific token is provided, focus EXCLUSIVELY on analyzing that token and IGNORE any other cryptocurrencies mentioned in the original query. The additional token data takes precedence over the query text.

Respond ONLY with a valid JSON object in the following format:
{
  "answer": "Detailed human-like answer to the query",
  "sentiment": "One of: Bullish, Bearish, Neutral, or Mixed",
  "trending_topics": ["Topic1", "Topic2", "Topic3", "Topic4", "Topic5"],
  "needs_more_context": false,
  "needed_article_count": null,
  "suggested_time_range": null,
  "article_analysis": [
    {
      "title": "Article title",
      "key_points": "Brief summary of key points from this article",
      "significance": "Why this article matters for the market"
    }
  ]
}

When analyzing:
1. Be conversational and human-like in your answer
2. Analyze sentiment based on factual information in the data provided
3. Extract 3-5 genuine trending topics related to the query
4. For article_analysis, include ONLY the 3 most relevant articles with a significance assessment for each
5. Set "needs_more_context" to true if the provided data is insufficient to answer the query fully
6. Do not include any non-JSON text in your response - ONLY the JSON object"#;

/// System instruction for the tool-selection call. `tool_descriptions` is the
/// registry's name + description list.
pub fn tool_selection_prompt(descriptors: &[ToolDescriptor]) -> String {
    let tool_descriptions = descriptors
        .iter()
        .map(|d| format!("- {}: {}", d.name, d.description))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are an expert cryptocurrency market intelligence assistant.

Based on the user's query, select the most appropriate tool(s) to use. Here are the available tools:

{tool_descriptions}

Select ONE tool if possible. Only select a second tool if it would provide significantly complementary value that the first tool cannot provide alone.

IMPORTANT: You must respond EXACTLY in the following JSON format:

{{
  "tools_needed": [
    {{
      "name": "tool_name",
      "custom_input": "refined input for this specific tool"
    }}
  ]
}}

ONLY respond with valid JSON in exactly the format shown. Do not include any explanation or additional text."#
    )
}

/// User message for the synthesis call: query, time window, serialized
/// article corpus, plus optional extras appended by the caller.
pub fn synthesis_user_prompt(query: &str, time_context: &str, articles: &[Article]) -> String {
    let articles_text =
        serde_json::to_string_pretty(articles).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"Query: {query}

Time Frame: {time_context}

Based on the following cryptocurrency news articles from {time_context}, please provide a comprehensive analysis:

Articles Count: {count}

Articles:
{articles_text}

Try to answer as much as possible with the current context. If you need more information or more articles, indicate this with "needs_more_context": true and specify how many additional articles you need in "needed_article_count".

Remember to return ONLY a valid JSON object with no additional text."#,
        count = articles.len(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_prompt_lists_every_descriptor() {
        let descriptors = vec![
            ToolDescriptor { name: "crypto_news", description: "latest news" },
            ToolDescriptor { name: "twitter", description: "social search" },
        ];
        let prompt = tool_selection_prompt(&descriptors);
        assert!(prompt.contains("- crypto_news: latest news"));
        assert!(prompt.contains("- twitter: social search"));
        assert!(prompt.contains("tools_needed"));
    }

    #[test]
    fn synthesis_prompt_embeds_corpus_and_counts() {
        let articles = vec![Article {
            title: Some("BTC rallies".into()),
            link: Some("https://n/1".into()),
            ..Default::default()
        }];
        let prompt = synthesis_user_prompt("btc?", "Past 24 hours", &articles);
        assert!(prompt.contains("Articles Count: 1"));
        assert!(prompt.contains("BTC rallies"));
        assert!(prompt.contains("Past 24 hours"));
    }
}
