// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod agent;
pub mod api;
pub mod cache;
pub mod config;
pub mod llm;
pub mod metrics;
pub mod models;
pub mod prompts;
pub mod scheduler;
pub mod timeparse;
pub mod tools;

// ---- Re-exports for stable public API ----
pub use crate::agent::CryptoAgent;
pub use crate::api::{create_router, AppState};
pub use crate::cache::NewsCache;
pub use crate::config::AppConfig;
pub use crate::models::{QueryRequest, QueryResponse, Sentiment};
