// src/scheduler.rs
// Periodic article-corpus refresh. The tick itself only triggers the news
// tool's staleness-gated update; individual query paths never depend on it.

use std::sync::Arc;

use metrics::{counter, gauge};
use tokio::task::JoinHandle;
use tracing::info;

use crate::tools::crypto_news::CryptoNewsTool;

#[derive(Clone, Copy, Debug)]
pub struct RefreshSchedulerCfg {
    pub interval_mins: u64,
}

/// Spawn the background refresh loop. The first tick fires immediately, so a
/// cold cache is filled at startup without a separate bootstrap call.
pub fn spawn_refresh_scheduler(
    news_tool: Arc<CryptoNewsTool>,
    cfg: RefreshSchedulerCfg,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker =
            tokio::time::interval(std::time::Duration::from_secs(cfg.interval_mins * 60));
        loop {
            ticker.tick().await;
            let started = std::time::Instant::now();
            let ok = news_tool.update_cache().await;

            counter!("refresh_runs_total").increment(1);
            gauge!("refresh_last_run_ts").set(chrono::Utc::now().timestamp() as f64);

            info!(
                target: "scheduler",
                ok,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "cache refresh tick"
            );
        }
    })
}
