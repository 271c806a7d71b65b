use anyhow::Context;
use tracing::info;

use orderflow_infra::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    orderflow_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;

    let prometheus = if config.prometheus {
        Some(orderflow_observability::metrics::install_prometheus()?)
    } else {
        None
    };

    let runtime = orderflow_api::app::services::build_services(&config, prometheus)
        .await
        .context("failed to start services")?;
    let app = orderflow_api::app::build_app(runtime.services.clone());

    let listener = tokio::net::TcpListener::bind(config.http_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.http_addr))?;

    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutting down fulfillment worker");
    runtime.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
