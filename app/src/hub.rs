use crate::config::Config;
use crate::device::{normalize_mac, DeviceAnnouncement, DeviceClient, DeviceDirectory, Upsert};
use crate::error::{DBError, DeviceError, RegistryError};
use crate::models::{ReadingDao, StoreHandle};
use crate::plant::PlantRegistry;
use crate::reading::ReadingLog;
use crate::scheduler::{self, PollScheduler};
use futures::future::join_all;
use sprout_core::ReadingMessage;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct HubSettings {
    pub probe_timeout: Duration,
    pub pull_timeout: Duration,
    pub plant_id_length: usize,
    pub plant_id_retries: usize,
}

impl From<&Config> for HubSettings {
    fn from(config: &Config) -> Self {
        HubSettings {
            probe_timeout: config.probe_timeout(),
            pull_timeout: config.pull_timeout(),
            plant_id_length: config.plant_id_length(),
            plant_id_retries: config.plant_id_retries(),
        }
    }
}

/// Composition root, one instance per process shared with the http layer
pub struct Hub {
    store: StoreHandle,
    pub devices: DeviceDirectory,
    pub plants: PlantRegistry,
    pub readings: ReadingLog,
    pub scheduler: Arc<PollScheduler>,
}

impl Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

impl Hub {
    pub fn new(store: StoreHandle, settings: HubSettings) -> Result<Arc<Self>, DeviceError> {
        let client = DeviceClient::new(settings.pull_timeout)?;
        let devices = DeviceDirectory::new(store.clone());
        let readings = ReadingLog::new(store.clone());
        let scheduler = PollScheduler::new(
            store.clone(),
            devices.clone(),
            client,
            readings.clone(),
            settings.probe_timeout,
        );
        let plants = PlantRegistry::new(
            store.clone(),
            devices.clone(),
            scheduler.clone(),
            settings.plant_id_length,
            settings.plant_id_retries,
        );

        Ok(Arc::new(Hub {
            store,
            devices,
            plants,
            readings,
            scheduler,
        }))
    }

    /// Reinstalls the jobs of all enabled plants, see the bootstrapper
    pub async fn restore_jobs(&self) -> usize {
        scheduler::load_scheduler_jobs_at_startup(
            self.store.clone(),
            self.devices.clone(),
            self.scheduler.clone(),
        )
        .await
    }

    /// Stores a node's announcement. When the record changed, plants on
    /// that node whose job does not pull the announced address are
    /// reconciled, so a new lease never leaves a job on a dead address.
    pub async fn announce_device(
        &self,
        announcement: DeviceAnnouncement,
    ) -> Result<Upsert, RegistryError> {
        let mac = normalize_mac(&announcement.mac);
        let status = self.devices.upsert(announcement).await?;
        if status == Upsert::Updated {
            if let Err(e) = self.follow_device(&mac).await {
                warn!(mac = %mac, "Failed moving jobs to new address: {}", e);
            }
        }
        Ok(status)
    }

    /// Readings pushed by a node, the plant does not have to exist.
    /// Without a reported sensor the plant's configured one is recorded.
    pub async fn submit_reading(
        &self,
        plant_id: &str,
        msg: ReadingMessage,
    ) -> Result<ReadingDao, RegistryError> {
        let sensor_index = match self.store.plant(plant_id).await? {
            Some(plant) => plant.sensor_index(),
            None => {
                debug!(plant_id = %plant_id, "Storing reading of an unknown plant");
                0
            }
        };
        self.readings.append(plant_id, sensor_index, msg).await
    }

    pub async fn check_db(&self) -> Result<(), DBError> {
        self.store.check_schema().await
    }

    pub fn shutdown(&self) {
        self.scheduler.shutdown();
    }

    /*
     * Helpers
     */

    async fn follow_device(&self, mac: &str) -> Result<(), RegistryError> {
        let device = self.devices.lookup(mac).await?;
        let address = device.latest_address();

        let stale: Vec<_> = self
            .store
            .enabled_plants()
            .await?
            .into_iter()
            .filter(|plant| plant.device_mac() == mac)
            .filter(|plant| {
                self.scheduler
                    .target(plant.plant_id())
                    .map_or(true, |target| &target.device_address != address)
            })
            .collect();
        if stale.is_empty() {
            return Ok(());
        }

        info!(mac = %mac, address = %address, "Moving {} plants to new address", stale.len());
        let results = join_all(stale.iter().map(|plant| self.scheduler.reconcile(plant))).await;
        for (plant, res) in stale.iter().zip(results) {
            if let Err(e) = res {
                warn!(plant_id = %plant.plant_id(), "Failed rescheduling plant: {}", e);
            }
        }
        Ok(())
    }
}
