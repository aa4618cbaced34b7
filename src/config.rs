// src/config.rs
// Env-backed configuration. `.env` is loaded by the entrypoint (dotenvy);
// every knob has a working default so tests run without any environment.

use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// RapidAPI credentials for the crypto news feed + keyword search.
    pub rapidapi_key: String,
    pub rapidapi_host: String,
    /// TweetScout credentials for social search.
    pub tweetscout_api_key: String,
    /// Gemini key for tool selection and synthesis.
    pub gemini_api_key: String,
    pub gemini_model: String,
    /// Default TTL for cache records, seconds.
    pub cache_ttl_secs: u64,
    /// Article-corpus refresh cadence, minutes. Also the staleness window.
    pub refresh_interval_mins: i64,
    /// HTTP bind address for the service.
    pub bind_addr: String,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            rapidapi_key: env_or("RAPIDAPI_KEY", ""),
            rapidapi_host: env_or("RAPIDAPI_HOST", "crypto-news51.p.rapidapi.com"),
            tweetscout_api_key: env_or("TWEETSCOUT_API_KEY", ""),
            gemini_api_key: env_or("GEMINI_API_KEY", ""),
            gemini_model: env_or("GEMINI_MODEL", "gemini-2.0-flash"),
            cache_ttl_secs: env_parse("CACHE_TTL", 60 * 60 * 24),
            refresh_interval_mins: env_parse("REFRESH_INTERVAL_MINS", 60),
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:8000"),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        // Defaults only; does not consult the environment.
        Self {
            rapidapi_key: String::new(),
            rapidapi_host: "crypto-news51.p.rapidapi.com".to_string(),
            tweetscout_api_key: String::new(),
            gemini_api_key: String::new(),
            gemini_model: "gemini-2.0-flash".to_string(),
            cache_ttl_secs: 60 * 60 * 24,
            refresh_interval_mins: 60,
            bind_addr: "0.0.0.0:8000".to_string(),
        }
    }
}
