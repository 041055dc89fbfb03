//! Tradeq worker entry point.

use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tradeq_config::ConfigLoader;
use tradeq_core::telemetry::{init_tracing, TelemetryConfig};
use tradeq_core::TradeqResult;
use tradeq_worker::{startup, Worker};

#[tokio::main]
async fn main() {
    let config = match ConfigLoader::from_default_location().load() {
        Ok(config) => config,
        Err(e) => {
            init_tracing(&TelemetryConfig::default());
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    init_tracing(&config.telemetry);

    info!("Starting Tradeq worker v{}", env!("CARGO_PKG_VERSION"));
    startup::print_startup_info(&config);
    if let Err(e) = startup::install_metrics(&config.metrics) {
        error!("{}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(config).await {
        error!("Worker error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: tradeq_config::AppConfig) -> TradeqResult<()> {
    let worker = Worker::connect(&config).await?;

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(());
    });

    let stats = worker.run(shutdown_rx).await?;

    info!(
        committed = stats.committed,
        retried = stats.retried,
        dead_lettered = stats.dead_lettered,
        errors = stats.errors,
        "Worker stopped"
    );
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received, finishing current message...");
}
