use super::{JobState, PollScheduler};
use crate::device::DeviceDirectory;
use crate::models::{PlantDao, StoreHandle};
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Rebuilds the job table from the persisted plants after a restart.
///
/// Every enabled plant is resolved against the directory and installed on its
/// own task, so one slow or missing device never holds back the others.
/// Returns the number of plants that ended up scheduled.
#[tracing::instrument(skip_all)]
pub async fn load_scheduler_jobs_at_startup(
    store: StoreHandle,
    directory: DeviceDirectory,
    scheduler: Arc<PollScheduler>,
) -> usize {
    let start = Utc::now();
    let plants = match store.enabled_plants().await {
        Ok(plants) => plants,
        Err(e) => {
            error!("Failed loading plants, no job restored: {}", e);
            return 0;
        }
    };

    let total = plants.len();
    let tasks = plants.into_iter().map(|plant| {
        let directory = directory.clone();
        let scheduler = scheduler.clone();
        tokio::spawn(async move { restore_plant(plant, directory, scheduler).await })
    });

    let mut count = 0;
    for res in join_all(tasks).await {
        match res {
            Ok(JobState::Scheduled) => count += 1,
            Ok(JobState::Absent) => {}
            Err(e) => error!("Restoring a plant panicked: {}", e),
        }
    }

    let duration = Utc::now() - start;
    info!(
        "Restored {}/{} plant jobs in {} ms",
        count,
        total,
        duration.num_milliseconds()
    );
    count
}

async fn restore_plant(
    plant: PlantDao,
    directory: DeviceDirectory,
    scheduler: Arc<PollScheduler>,
) -> JobState {
    let device = match directory.lookup(plant.device_mac()).await {
        Ok(device) => device,
        Err(e) => {
            warn!(plant_id = %plant.plant_id(), "Skipping plant: {}", e);
            return JobState::Absent;
        }
    };

    debug!(plant_id = %plant.plant_id(), mac = %device.mac(), "Restoring plant");
    scheduler
        .install(
            plant.plant_id(),
            device.latest_address(),
            plant.poll_interval(),
            plant.sensor_index(),
        )
        .await
}
