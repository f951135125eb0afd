//! CTV Tracking Server - Binary Entry Point
//!
//! Reads `TRACKING_*` environment variables, opens the store, serves the
//! HTTP API and flushes the queue on Ctrl+C / SIGTERM.

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ctv_tracking::api::{create_router, AppState};
use ctv_tracking::{
    FileStore, FileStoreConfig, MemoryStore, ServerConfig, StoreKind,
    TrackingService, TrackingStore,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;

    let store: Arc<dyn TrackingStore> = match config.store {
        StoreKind::Memory => {
            warn!("Using in-memory store, tracking data will not survive a restart");
            Arc::new(MemoryStore::new())
        }
        StoreKind::File => Arc::new(FileStore::open(FileStoreConfig::new(&config.data_dir))?),
    };

    let service = Arc::new(TrackingService::new(store, config.tracking.clone()));
    service.start();

    // Ctrl+C / SIGTERM arrive on a signal thread, hand them to the runtime
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.send(true);
    })?;

    let app = create_router(Arc::new(AppState::new(service.clone())));
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;

    info!(
        addr = %config.bind_addr,
        batch_size = config.tracking.batch_size,
        flush_interval_ms = config.tracking.flush_interval.as_millis() as u64,
        "{} v{} listening",
        ctv_tracking::NAME,
        ctv_tracking::VERSION
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let _ = shutdown_rx.wait_for(|stop| *stop).await;
        info!("Shutdown requested");
    })
    .await?;

    let outcome = service.shutdown().await;
    info!(?outcome, "Tracking server stopped");

    Ok(())
}
