//! HTTP server.

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;

use apilint_telemetry::{log_listening, log_shutdown, MetricsRegistry};

use crate::api::create_router;
use crate::config::ServerConfig;
use crate::pipeline::ValidationService;

/// Bind `config.listen_addr` and serve until Ctrl-C or SIGTERM.
pub async fn run(config: ServerConfig, metrics: Arc<MetricsRegistry>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.listen_addr).await?;
    serve(listener, config, metrics, shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    config: ServerConfig,
    metrics: Arc<MetricsRegistry>,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let service = ValidationService::new(&config.validation, metrics)?;
    let app = create_router(service, &config);

    let addr = listener.local_addr()?;
    log_listening!(
        addr = %addr,
        allowed_origins = config.allowed_origins.len(),
        "apilint listening on {}",
        addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    log_shutdown!(addr = %addr, "server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
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
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown requested");
}
