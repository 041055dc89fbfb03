//! Worker startup utilities.

use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;
use tradeq_config::{AppConfig, MetricsConfig};
use tradeq_core::{TradeqError, TradeqResult};
use tradeq_queue::register_metrics;
use url::Url;

/// Returns `raw` with any password replaced by `***`.
///
/// Unparseable input is returned unchanged.
#[must_use]
pub fn redact_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) if url.password().is_some() => {
            if url.set_password(Some("***")).is_err() {
                return raw.to_string();
            }
            url.to_string()
        }
        _ => raw.to_string(),
    }
}

/// Logs the effective worker settings.
pub fn print_startup_info(config: &AppConfig) {
    let separator = "=".repeat(60);
    info!("{}", separator);
    info!("Environment: {}", config.app.environment);
    info!("Redis:       {}", redact_url(&config.redis.url));
    info!("Postgres:    {}", redact_url(&config.database.url));
    info!(
        "Queue:       {} -> {} (dlq {})",
        config.queue.ready_key,
        config.queue.in_flight_key(),
        config.queue.dead_letter_key
    );
    info!(
        "Attempts:    {} (reserve timeout {}s)",
        config.worker.max_attempts, config.worker.reserve_timeout_secs
    );
    info!("{}", separator);
}

/// Registers metric descriptions and, when enabled, serves them over HTTP.
///
/// Must be called from within the Tokio runtime.
pub fn install_metrics(config: &MetricsConfig) -> TradeqResult<()> {
    if config.enabled {
        let addr = config
            .listen_addr()
            .map_err(|e| TradeqError::Configuration(format!("metrics.listen: {e}")))?;
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .map_err(|e| TradeqError::internal(format!("Failed to install metrics exporter: {e}")))?;
        info!("Metrics:     http://{}/metrics", addr);
    }
    register_metrics();
    Ok(())
}
