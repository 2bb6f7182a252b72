
use crate::device::DeviceDirectory;
use crate::error::{RegistryError, ValidationError};
use crate::models::{PlantDao, StoreHandle};
use crate::scheduler::PollScheduler;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// A plant definition as submitted, checked by `PlantRegistry::create`
#[derive(Debug, Clone)]
pub struct PlantSpec {
    pub name: String,
    pub plant_type: String,
    pub planted_at: DateTime<Utc>,
    pub poll_interval_secs: i32,
    pub polling_enabled: bool,
    pub device_mac: String,
    pub sensor_index: i32,
}

/// Partial update, `None` keeps the stored value.
/// `device_mac` and `registered_at` are accepted but never applied.
#[derive(Debug, Clone, Default)]
pub struct PlantPatch {
    pub name: Option<String>,
    pub plant_type: Option<String>,
    pub planted_at: Option<DateTime<Utc>>,
    pub poll_interval_secs: Option<i32>,
    pub polling_enabled: Option<bool>,
    pub sensor_index: Option<i32>,
    pub device_mac: Option<String>,
    pub registered_at: Option<DateTime<Utc>>,
}

pub struct PlantRegistry {
    store: StoreHandle,
    directory: DeviceDirectory,
    scheduler: Arc<PollScheduler>,
    id_length: usize,
    id_retries: usize,
}

impl PlantRegistry {
    pub fn new(
        store: StoreHandle,
        directory: DeviceDirectory,
        scheduler: Arc<PollScheduler>,
        id_length: usize,
        id_retries: usize,
    ) -> Self {
        PlantRegistry {
            store,
            directory,
            scheduler,
            id_length,
            id_retries,
        }
    }

    pub async fn create(&self, spec: PlantSpec) -> Result<PlantDao, RegistryError> {
        let spec = validate_spec(spec)?;
        let device = match self.directory.lookup(&spec.device_mac).await {
            Ok(device) => device,
            Err(RegistryError::DeviceNotFound(mac)) => {
                return Err(RegistryError::UnknownDevice(mac))
            }
            Err(e) => return Err(e),
        };
        if !device.sensor_capabilities().is_empty()
            && !device.sensor_capabilities().contains(&spec.sensor_index)
        {
            warn!(
                mac = %device.mac(),
                sensor_index = spec.sensor_index,
                "Device did not report this sensor"
            );
        }

        let registered_at = Utc::now();
        for attempt in 1..=self.id_retries {
            let plant = PlantDao {
                plant_id: self.generate_plant_id(),
                name: spec.name.clone(),
                plant_type: spec.plant_type.clone(),
                planted_at: spec.planted_at,
                registered_at,
                poll_interval_secs: spec.poll_interval_secs,
                polling_enabled: spec.polling_enabled,
                device_mac: device.mac().clone(),
                sensor_index: spec.sensor_index,
            };

            if !self.store.insert_plant(&plant).await? {
                debug!(attempt = attempt, "Plant id collision, retrying");
                continue;
            }

            info!(plant_id = %plant.plant_id, mac = %plant.device_mac, "Registered new plant");
            if plant.polling_enabled {
                if let Err(e) = self.scheduler.reconcile(&plant).await {
                    error!(plant_id = %plant.plant_id, "Failed scheduling new plant: {}", e);
                }
            }
            return Ok(plant);
        }

        Err(RegistryError::IdExhausted(self.id_retries))
    }

    pub async fn get(&self, plant_id: &str) -> Result<PlantDao, RegistryError> {
        self.store
            .plant(plant_id)
            .await?
            .ok_or_else(|| RegistryError::PlantNotFound(plant_id.to_owned()))
    }

    pub async fn list(&self) -> Result<Vec<PlantDao>, RegistryError> {
        Ok(self.store.plants().await?)
    }

    pub async fn update(&self, plant_id: &str, patch: PlantPatch) -> Result<PlantDao, RegistryError> {
        let current = self.get(plant_id).await?;

        if let Some(mac) = &patch.device_mac {
            if !mac.eq_ignore_ascii_case(&current.device_mac) {
                warn!(plant_id = %plant_id, "Ignoring change of the bound device to {}", mac);
            }
        }
        if let Some(registered_at) = patch.registered_at {
            if registered_at != current.registered_at {
                warn!(plant_id = %plant_id, "Ignoring change of registered_at");
            }
        }

        let mut updated = current.clone();
        if let Some(name) = patch.name {
            updated.name = required_text("plant_name", name)?;
        }
        if let Some(plant_type) = patch.plant_type {
            updated.plant_type = required_text("plant_type", plant_type)?;
        }
        if let Some(planted_at) = patch.planted_at {
            updated.planted_at = planted_at;
        }
        if let Some(interval) = patch.poll_interval_secs {
            updated.poll_interval_secs = checked_interval(interval)?;
        }
        if let Some(sensor_index) = patch.sensor_index {
            updated.sensor_index = checked_sensor_index(sensor_index)?;
        }
        if let Some(enabled) = patch.polling_enabled {
            updated.polling_enabled = enabled;
        }

        if updated == current {
            debug!(plant_id = %plant_id, "Plant unchanged");
            return Ok(current);
        }
        if !self.store.update_plant(&updated).await? {
            return Err(RegistryError::PlantNotFound(plant_id.to_owned()));
        }
        info!(plant_id = %plant_id, "Updated plant");

        let reschedule = updated.poll_interval_secs != current.poll_interval_secs
            || updated.sensor_index != current.sensor_index
            || updated.polling_enabled != current.polling_enabled;
        if reschedule {
            let state = self.scheduler.reconcile(&updated).await?;
            debug!(plant_id = %plant_id, state = ?state, "Rescheduled plant");
        }
        Ok(updated)
    }

    /// Removes the plant and its job, `false` if nothing was stored
    pub async fn delete(&self, plant_id: &str) -> Result<bool, RegistryError> {
        let deleted = self.store.delete_plant(plant_id).await?;
        self.scheduler.remove(plant_id).await;
        if deleted {
            info!(plant_id = %plant_id, "Removed plant");
        }
        Ok(deleted)
    }

    /*
     * Helpers
     */

    fn generate_plant_id(&self) -> String {
        use rand::distributions::Alphanumeric;
        use rand::{thread_rng, Rng};
        let mut rng = thread_rng();
        std::iter::repeat(())
            .map(|()| rng.sample(Alphanumeric))
            .map(char::from)
            .take(self.id_length)
            .collect()
    }
}

fn validate_spec(spec: PlantSpec) -> Result<PlantSpec, ValidationError> {
    Ok(PlantSpec {
        name: required_text("plant_name", spec.name)?,
        plant_type: required_text("plant_type", spec.plant_type)?,
        planted_at: spec.planted_at,
        poll_interval_secs: checked_interval(spec.poll_interval_secs)?,
        polling_enabled: spec.polling_enabled,
        device_mac: crate::device::parse_mac(&spec.device_mac)?,
        sensor_index: checked_sensor_index(spec.sensor_index)?,
    })
}

fn required_text(field: &'static str, value: String) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        Err(ValidationError::Missing(field))
    } else {
        Ok(value.to_owned())
    }
}

fn checked_interval(secs: i32) -> Result<i32, ValidationError> {
    if secs > 0 {
        Ok(secs)
    } else {
        Err(ValidationError::Malformed(
            "plant_update_poll",
            format!("interval must be positive, got {}", secs),
        ))
    }
}

fn checked_sensor_index(index: i32) -> Result<i32, ValidationError> {
    if index >= 0 {
        Ok(index)
    } else {
        Err(ValidationError::Malformed(
            "soil_sens_num",
            format!("negative sensor index {}", index),
        ))
    }
}
