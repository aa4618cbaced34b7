//! Crypto News Agent — Binary Entrypoint
//! Boots the Axum HTTP server, wiring shared state, background refresh, and
//! the Prometheus exporter.

use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crypto_news_agent::agent::CryptoAgent;
use crypto_news_agent::api::{self, AppState};
use crypto_news_agent::config::AppConfig;
use crypto_news_agent::metrics::Metrics;
use crypto_news_agent::scheduler::{spawn_refresh_scheduler, RefreshSchedulerCfg};
use crypto_news_agent::tools::crypto_news::CryptoNewsTool;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("crypto_news_agent=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = AppConfig::from_env();
    let metrics = Metrics::init(config.cache_ttl_secs);

    let agent = Arc::new(CryptoAgent::from_config(&config));

    // The scheduler owns its own news tool over the same cache handle.
    let news_tool = Arc::new(CryptoNewsTool::new(Arc::clone(agent.cache()), &config));
    spawn_refresh_scheduler(
        news_tool,
        RefreshSchedulerCfg {
            interval_mins: config.refresh_interval_mins.max(1) as u64,
        },
    );

    let router = api::create_router(AppState {
        agent: Arc::clone(&agent),
    })
    .merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, router).await?;

    Ok(())
}
