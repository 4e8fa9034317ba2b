use std::{net::SocketAddr, sync::Arc};

use immich_client::{ImmichApi, ImmichClient, ReadinessGate};
use immich_common::{Config, error::Result};
use immich_metrics::{
    metrics::{ImmichCollector, MetricsRegistry},
    router::{ExporterState, exporter_router},
};
use tracing::{error, info, warn};

use crate::{logging::LogHandle, shutdown::ShutdownSignal};

/// Runs the exporter to completion and returns the process exit code.
pub async fn run(
    config: Result<Config>,
    logs: Option<&LogHandle>,
    shutdown: ShutdownSignal,
) -> u8 {
    let config = match config {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "invalid configuration");
            return err.exit_code();
        }
    };

    if let Some(logs) = logs
        && let Err(err) = logs.set_level(&config.log_level)
    {
        warn!(error = %err, "keeping default log level");
    }

    match serve(config, shutdown).await {
        Ok(()) => {
            info!("exporter has shutdown");
            0
        }
        Err(err) => {
            error!(error = %err, "exporter stopped");
            err.exit_code()
        }
    }
}

async fn serve(config: Config, mut shutdown: ShutdownSignal) -> Result<()> {
    info!(config = ?config, "exporter is starting up");

    let api: Arc<dyn ImmichApi> = Arc::new(ImmichClient::new(&config)?);
    let gate = ReadinessGate::new(Arc::clone(&api), config.base_url());
    tokio::select! {
        _ = gate.wait_until_ready() => {}
        _ = shutdown.wait() => {
            info!("shutdown requested before immich became ready");
            return Ok(());
        }
    }

    let registry = Arc::new(MetricsRegistry::new());
    registry.register(Arc::new(ImmichCollector::new(api, &config)))?;
    let app = exporter_router(Arc::new(ExporterState::new(registry)));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.exporter_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "exporter listening on port {}", config.exporter_port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.wait().await })
        .await?;

    Ok(())
}
