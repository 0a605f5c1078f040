use anyhow::Context;

use stockhold_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stockhold_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let app = stockhold_api::app::build_app(&config).await?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        ttl_secs = config.reservation.ttl.as_secs(),
        mode = ?config.reservation.mode,
        "listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
