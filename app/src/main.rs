mod config;
mod device;
mod error;
mod hub;
mod logging;
mod models;
mod plant;
mod reading;
mod rest;
mod scheduler;

#[cfg(test)]
mod testing;

use config::CONFIG;
use hub::{Hub, HubSettings};
use tracing::{error, info};

#[tokio::main]
pub async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();
    info!("Starting sprout {}", sprout_core::CORE_VERSION);

    let store = match models::establish_store(CONFIG.database_url()).await {
        Ok(store) => store,
        Err(e) => {
            error!("Store unavailable, refusing to start: {}", e);
            return Err(e.into());
        }
    };

    let hub = Hub::new(store, HubSettings::from(&*CONFIG))?;
    hub.restore_jobs().await;

    let server_daemon = rest::dispatch_server_daemon(hub.clone(), CONFIG.server_addr());
    tokio::select! {
        _ = server_daemon => error!("Webserver stopped unexpectedly"),
        _ = tokio::signal::ctrl_c() => info!("Received SIGINT, shutting down"),
    }

    hub.shutdown();
    Ok(())
}
