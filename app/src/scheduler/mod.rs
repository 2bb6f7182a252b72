pub mod bootstrap;
mod job;

#[cfg(test)]
mod test;

pub use bootstrap::load_scheduler_jobs_at_startup;
pub use job::{JobSnapshot, JobState, PollTarget};

use crate::device::{DeviceClient, DeviceDirectory};
use crate::error::RegistryError;
use crate::models::{PlantDao, StoreHandle};
use crate::reading::ReadingLog;
use job::{PollJob, PullContext};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};

/// Owns one recurring pull job per enabled and reachable plant
///
/// Each plant is either `absent` or `scheduled`. All transitions for the same
/// plant are serialized, the job table itself is only locked for the swap.
pub struct PollScheduler {
    jobs: Mutex<HashMap<String, PollJob>>,
    plant_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    store: StoreHandle,
    directory: DeviceDirectory,
    ctx: PullContext,
    probe_timeout: Duration,
}

impl Debug for PollScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollScheduler")
            .field("jobs", &self.len())
            .finish()
    }
}

impl PollScheduler {
    pub fn new(
        store: StoreHandle,
        directory: DeviceDirectory,
        client: DeviceClient,
        readings: ReadingLog,
        probe_timeout: Duration,
    ) -> Arc<Self> {
        Arc::new(PollScheduler {
            jobs: Mutex::new(HashMap::new()),
            plant_locks: Mutex::new(HashMap::new()),
            store,
            directory,
            ctx: PullContext { client, readings },
            probe_timeout,
        })
    }

    /// Probes the device and (re)places the plant's job.
    /// An unreachable device leaves the plant `absent`, this never fails.
    pub async fn install(
        &self,
        plant_id: &str,
        device_address: &str,
        interval: Duration,
        sensor_index: i32,
    ) -> JobState {
        let guard = self.lock_plant(plant_id).await;
        let state = self
            .install_locked(PollTarget {
                plant_id: plant_id.to_owned(),
                device_address: device_address.to_owned(),
                interval,
                sensor_index,
            })
            .await;
        drop(guard);
        self.release_lock(plant_id);
        state
    }

    /// Cancels the plant's job, a no-op for absent plants
    pub async fn remove(&self, plant_id: &str) -> bool {
        let guard = self.lock_plant(plant_id).await;
        let removed = self.remove_locked(plant_id);
        drop(guard);
        self.release_lock(plant_id);
        removed
    }

    /// Drives the plant's job towards its persisted definition. The stored
    /// record is authoritative, `plant` only names the plant to look at.
    pub async fn reconcile(&self, plant: &PlantDao) -> Result<JobState, RegistryError> {
        let plant_id = plant.plant_id();
        let guard = self.lock_plant(plant_id).await;
        let res = self.reconcile_locked(plant_id).await;
        drop(guard);
        self.release_lock(plant_id);
        res
    }

    pub fn state(&self, plant_id: &str) -> JobState {
        if self.jobs.lock().contains_key(plant_id) {
            JobState::Scheduled
        } else {
            JobState::Absent
        }
    }

    pub fn target(&self, plant_id: &str) -> Option<PollTarget> {
        self.jobs.lock().get(plant_id).map(|job| job.target().clone())
    }

    pub fn jobs(&self) -> Vec<JobSnapshot> {
        let mut snapshots: Vec<JobSnapshot> =
            self.jobs.lock().values().map(|job| job.snapshot()).collect();
        snapshots.sort_by(|a, b| a.plant_id.cmp(&b.plant_id));
        snapshots
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn shutdown(&self) {
        let drained: Vec<PollJob> = self.jobs.lock().drain().map(|(_, job)| job).collect();
        info!("Cancelled {} poll jobs", drained.len());
    }

    /*
     * Helpers
     */

    async fn reconcile_locked(&self, plant_id: &str) -> Result<JobState, RegistryError> {
        let current = match self.store.plant(plant_id).await? {
            Some(current) => current,
            None => {
                debug!(plant_id = %plant_id, "Plant vanished, dropping its job");
                self.remove_locked(plant_id);
                return Ok(JobState::Absent);
            }
        };

        if !current.polling_enabled() {
            self.remove_locked(plant_id);
            return Ok(JobState::Absent);
        }

        let device = match self.directory.lookup(current.device_mac()).await {
            Ok(device) => device,
            Err(RegistryError::DeviceNotFound(mac)) => {
                warn!(plant_id = %plant_id, mac = %mac, "Device unknown, plant not scheduled");
                self.remove_locked(plant_id);
                return Ok(JobState::Absent);
            }
            Err(e) => return Err(e),
        };

        Ok(self
            .install_locked(PollTarget {
                plant_id: plant_id.to_owned(),
                device_address: device.latest_address().clone(),
                interval: current.poll_interval(),
                sensor_index: current.sensor_index(),
            })
            .await)
    }

    async fn install_locked(&self, target: PollTarget) -> JobState {
        let plant_id = target.plant_id.clone();
        if target.interval.is_zero() {
            warn!(plant_id = %plant_id, "Refusing to schedule a zero interval");
            self.remove_locked(&plant_id);
            return JobState::Absent;
        }

        if !self
            .ctx
            .client
            .probe(&target.device_address, self.probe_timeout)
            .await
        {
            warn!(
                plant_id = %plant_id,
                address = %target.device_address,
                "Device unreachable, plant not scheduled"
            );
            self.remove_locked(&plant_id);
            return JobState::Absent;
        }

        let interval = target.interval;
        let address = target.device_address.clone();
        let mut jobs = self.jobs.lock();
        if let Some(replaced) = jobs.remove(&plant_id) {
            debug!(plant_id = %plant_id, previous = ?replaced.target(), "Replacing job");
            drop(replaced);
        }
        jobs.insert(plant_id.clone(), PollJob::spawn(target, self.ctx.clone()));
        info!(
            plant_id = %plant_id,
            address = %address,
            interval_secs = interval.as_secs(),
            "Scheduled plant"
        );
        JobState::Scheduled
    }

    fn remove_locked(&self, plant_id: &str) -> bool {
        let removed = self.jobs.lock().remove(plant_id);
        match removed {
            Some(job) => {
                drop(job);
                info!(plant_id = %plant_id, "Removed job");
                true
            }
            None => false,
        }
    }

    async fn lock_plant(&self, plant_id: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .plant_locks
            .lock()
            .entry(plant_id.to_owned())
            .or_default()
            .clone();
        lock.lock_owned().await
    }

    fn release_lock(&self, plant_id: &str) {
        let mut locks = self.plant_locks.lock();
        if let Some(lock) = locks.get(plant_id) {
            if Arc::strong_count(lock) == 1 {
                locks.remove(plant_id);
            }
        }
    }
}
