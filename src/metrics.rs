// src/metrics.rs
// Prometheus recorder installation and the /metrics exposition route.

use axum::{routing::get, Router};
use chrono::Utc;
use metrics::gauge;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Must run before any counter or
    /// gauge macro fires, so `main` calls this ahead of agent construction.
    pub fn init(cache_ttl_secs: u64) -> Self {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .expect("prometheus: install recorder");

        // Static gauges: configured TTL and process start time.
        gauge!("news_cache_ttl_secs").set(cache_ttl_secs as f64);
        gauge!("agent_start_timestamp_secs").set(Utc::now().timestamp() as f64);

        Self { handle }
    }

    /// Router exposing `/metrics` in the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let handle = handle.clone();
                async move { handle.render() }
            }),
        )
    }
}
