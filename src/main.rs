use anyhow::{Context, Result};
use drillbot::{
    api, config, driver::StatusDriver, indicator, logging, metrics::IndicatorMetrics,
    registry::IndicatorRegistry,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::init_config().context("Failed to load config from environment")?;
    logging::init_tracing(&config.log_file);
    tracing::debug!(
        server_host = %config.server_host,
        server_port = config.server_port,
        backend = ?config.indicator_backend,
        driver_enabled = config.status_driver_enabled,
        log_file = %config.log_file.display(),
        "Loaded configuration"
    );

    let backend = indicator::build_backend(config);
    let registry = Arc::new(
        IndicatorRegistry::new(backend, Arc::new(IndicatorMetrics::new()))
            .context("Failed to initialize indicator outputs")?,
    );

    let shutdown = CancellationToken::new();
    let driver = config.status_driver_enabled.then(|| {
        StatusDriver::new(registry.clone())
            .with_period(config.status_driver_period())
            .with_probability(config.status_driver_probability)
            .spawn(shutdown.child_token())
    });

    let app = api::create_router(registry.clone());
    let listener = TcpListener::bind((config.server_host.as_str(), config.server_port))
        .await
        .with_context(|| {
            format!(
                "Failed to bind {}:{}",
                config.server_host, config.server_port
            )
        })?;
    tracing::info!(
        "Listening on http://{}:{}",
        config.server_host,
        config.server_port
    );

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await;

    shutdown.cancel();
    if let Some(driver) = driver {
        if let Err(err) = driver.await {
            tracing::warn!(error = %err, "Status driver ended abnormally");
        }
    }
    registry
        .shutdown()
        .await
        .context("Failed to release indicator outputs")?;

    served.context("HTTP server terminated unexpectedly")
}

async fn shutdown_signal(shutdown: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(err) = result {
                tracing::error!(error = %err, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received");
        }
        _ = shutdown.cancelled() => {}
    }
}
