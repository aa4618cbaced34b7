// tests/common/mod.rs
// Scripted in-memory tool for pipeline tests: replays a fixed sequence of
// outputs and counts how often it was executed.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crypto_news_agent::models::{Article, QueryResponse, Tweet};
use crypto_news_agent::tools::{Tool, ToolDescriptor, ToolOutput, ToolParams};

pub struct StubTool {
    name: &'static str,
    outputs: Mutex<VecDeque<ToolOutput>>,
    calls: Arc<AtomicUsize>,
    /// Delay before answering, to shuffle completion order in tests.
    delay_ms: u64,
}

impl StubTool {
    pub fn new(name: &'static str, outputs: Vec<ToolOutput>) -> Arc<Self> {
        Arc::new(Self {
            name,
            outputs: Mutex::new(outputs.into()),
            calls: Arc::new(AtomicUsize::new(0)),
            delay_ms: 0,
        })
    }

    pub fn slow(name: &'static str, outputs: Vec<ToolOutput>, delay_ms: u64) -> Arc<Self> {
        Arc::new(Self {
            name,
            outputs: Mutex::new(outputs.into()),
            calls: Arc::new(AtomicUsize::new(0)),
            delay_ms,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tool for StubTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name,
            description: "stub tool for tests",
        }
    }

    async fn execute(&self, _params: &ToolParams) -> ToolOutput {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
        self.outputs
            .lock()
            .expect("stub lock poisoned")
            .pop_front()
            .unwrap_or(ToolOutput::Empty)
    }

    fn format_response(&self, query: &str, _output: &ToolOutput) -> QueryResponse {
        QueryResponse::base(query)
    }
}

pub fn article(title: &str) -> Article {
    Article {
        title: Some(title.to_string()),
        summary: Some(format!("summary of {title}")),
        link: Some(format!("https://news.example/{title}")),
        ..Default::default()
    }
}

pub fn tweet(author: &str, id: &str, text: &str) -> Tweet {
    Tweet {
        id: id.to_string(),
        text: text.to_string(),
        author: author.to_string(),
        created_at: "Wed Oct 10 20:19:24 +0000 2018".to_string(),
        ..Default::default()
    }
}

pub fn articles_output(titles: &[&str], time_context: &str) -> ToolOutput {
    ToolOutput::Articles {
        articles: titles.iter().map(|t| article(t)).collect(),
        time_context: Some(time_context.to_string()),
    }
}
