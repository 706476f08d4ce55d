use std::error::Error;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use tokio::signal;
use tokio::sync::oneshot;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vitalwatch::api::RestApi;
use vitalwatch::config::load_config;
use vitalwatch::{LogNotifier, MedicalService, PatientStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Logging first so config and storage errors are visible
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vitalwatch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Config path from the first argument, defaulting to ./config.yaml
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.yaml"));
    let config = load_config(&config_path)?;

    info!(path = %config.storage.path, "opening patient store");
    let store = PatientStore::open(&config.storage.path)?;

    let service = MedicalService::with_thresholds(store, LogNotifier, config.thresholds)?;
    info!(
        blood_pressure = service.thresholds().blood_pressure,
        temperature = service.thresholds().temperature,
        "alert thresholds active"
    );
    let api = RestApi::new(Arc::new(service));

    let host: IpAddr = config.api.host.parse()?;
    let addr = SocketAddr::new(host, config.api.port);

    // Create a channel for shutdown signal
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let (bound, server) = warp::serve(api.routes())
        .try_bind_with_graceful_shutdown(addr, async move {
            shutdown_rx.await.ok();
            info!("shutting down server");
        })?;
    info!(%bound, "server listening");

    let server_handle = tokio::spawn(server);

    // Wait for Ctrl+C
    signal::ctrl_c().await?;
    info!("Ctrl+C received, starting graceful shutdown");

    shutdown_tx.send(()).ok();
    server_handle.await?;

    info!("server shutdown complete");
    Ok(())
}
