// src/llm/mod.rs
// Hosted language-model boundary: text in, text out. Provider abstraction so
// handlers and tests can swap in a scripted client.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Black-box model client used by the selector and the normalizer.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// One completion call: system instruction + user message -> raw text.
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynLlmClient = Arc<dyn LlmClient>;

/// Strip an optional Markdown code fence (```json ... ``` or ``` ... ```)
/// around a model reply. Applied before every structured parse.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix("```json") {
        s = rest;
    } else if let Some(rest) = s.strip_prefix("```") {
        s = rest;
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

// ------------------------------------------------------------
// Gemini provider
// ------------------------------------------------------------

/// Gemini generateContent client. Requires `GEMINI_API_KEY`; with no key the
/// call fails immediately without touching the network.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f32,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str, temperature: f32) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("crypto-news-agent/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key: api_key.to_string(),
            model: model.to_string(),
            temperature,
        }
    }
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}
#[derive(Serialize)]
struct GeminiContent<'a> {
    role: &'a str,
    parts: Vec<GeminiPart<'a>>,
}
#[derive(Serialize)]
struct GeminiInstruction<'a> {
    parts: Vec<GeminiPart<'a>>,
}
#[derive(Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
}
#[derive(Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    #[serde(rename = "systemInstruction")]
    system_instruction: GeminiInstruction<'a>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}
#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiCandidateContent,
}
#[derive(Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiTextPart>,
}
#[derive(Deserialize)]
struct GeminiTextPart {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        if self.api_key.is_empty() {
            bail!("GEMINI_API_KEY is not set");
        }

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        );
        let req = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiPart { text: user }],
            }],
            system_instruction: GeminiInstruction {
                parts: vec![GeminiPart { text: system }],
            },
            generation_config: GeminiGenerationConfig {
                temperature: self.temperature,
            },
        };

        let resp = self
            .http
            .post(&url)
            .json(&req)
            .send()
            .await
            .context("gemini request failed")?;

        let status = resp.status();
        if !status.is_success() {
            bail!("gemini returned status {status}");
        }

        let body: GeminiResponse = resp.json().await.context("gemini response body")?;
        let text = body
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.trim().to_string())
            .unwrap_or_default();
        if text.is_empty() {
            bail!("gemini returned an empty candidate");
        }
        debug!(chars = text.len(), "gemini reply received");
        Ok(text)
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}

// ------------------------------------------------------------
// Disabled + scripted clients
// ------------------------------------------------------------

/// Always errors; used when no model is configured.
pub struct DisabledLlm;

#[async_trait]
impl LlmClient for DisabledLlm {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
        bail!("llm client is disabled")
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Scripted client for tests and local runs: replies are consumed in order;
/// the last one repeats once the script runs out.
pub struct MockLlm {
    replies: Mutex<VecDeque<String>>,
    last: Mutex<Option<String>>,
}

impl MockLlm {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            last: Mutex::new(None),
        }
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
        let next = self.replies.lock().expect("mock lock poisoned").pop_front();
        match next {
            Some(reply) => {
                *self.last.lock().expect("mock lock poisoned") = Some(reply.clone());
                Ok(reply)
            }
            None => match self.last.lock().expect("mock lock poisoned").clone() {
                Some(reply) => Ok(reply),
                None => bail!("mock llm has no scripted replies"),
            },
        }
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}
