use super::{DeviceDao, PlantDao, ReadingDao, Store};
use crate::error::DBError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Process local store, used when no database is configured and in tests
#[derive(Default)]
pub struct MemoryStore {
    devices: RwLock<HashMap<String, DeviceDao>>,
    plants: RwLock<HashMap<String, PlantDao>>,
    readings: RwLock<Vec<ReadingDao>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn check_schema(&self) -> Result<(), DBError> {
        Ok(())
    }

    async fn device(&self, mac: &str) -> Result<Option<DeviceDao>, DBError> {
        Ok(self.devices.read().get(mac).cloned())
    }

    async fn devices(&self) -> Result<Vec<DeviceDao>, DBError> {
        let mut devices: Vec<DeviceDao> = self.devices.read().values().cloned().collect();
        devices.sort_by(|a, b| a.mac.cmp(&b.mac));
        Ok(devices)
    }

    async fn insert_device(&self, dao: &DeviceDao) -> Result<bool, DBError> {
        let mut devices = self.devices.write();
        if devices.contains_key(&dao.mac) {
            return Ok(false);
        }
        devices.insert(dao.mac.clone(), dao.clone());
        Ok(true)
    }

    async fn update_device(&self, dao: &DeviceDao) -> Result<(), DBError> {
        if let Some(existing) = self.devices.write().get_mut(&dao.mac) {
            *existing = dao.clone();
        }
        Ok(())
    }

    async fn plant(&self, plant_id: &str) -> Result<Option<PlantDao>, DBError> {
        Ok(self.plants.read().get(plant_id).cloned())
    }

    async fn plants(&self) -> Result<Vec<PlantDao>, DBError> {
        let mut plants: Vec<PlantDao> = self.plants.read().values().cloned().collect();
        plants.sort_by(|a, b| a.registered_at.cmp(&b.registered_at));
        Ok(plants)
    }

    async fn enabled_plants(&self) -> Result<Vec<PlantDao>, DBError> {
        let mut plants = self.plants().await?;
        plants.retain(|p| p.polling_enabled);
        Ok(plants)
    }

    async fn insert_plant(&self, dao: &PlantDao) -> Result<bool, DBError> {
        let mut plants = self.plants.write();
        if plants.contains_key(&dao.plant_id) {
            return Ok(false);
        }
        plants.insert(dao.plant_id.clone(), dao.clone());
        Ok(true)
    }

    async fn update_plant(&self, dao: &PlantDao) -> Result<bool, DBError> {
        match self.plants.write().get_mut(&dao.plant_id) {
            Some(existing) => {
                existing.name = dao.name.clone();
                existing.plant_type = dao.plant_type.clone();
                existing.planted_at = dao.planted_at;
                existing.poll_interval_secs = dao.poll_interval_secs;
                existing.polling_enabled = dao.polling_enabled;
                existing.sensor_index = dao.sensor_index;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_plant(&self, plant_id: &str) -> Result<bool, DBError> {
        Ok(self.plants.write().remove(plant_id).is_some())
    }

    async fn insert_reading(&self, dao: &ReadingDao) -> Result<(), DBError> {
        self.readings.write().push(dao.clone());
        Ok(())
    }

    async fn readings(
        &self,
        plant_id: &str,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<ReadingDao>, DBError> {
        let mut found: Vec<ReadingDao> = self
            .readings
            .read()
            .iter()
            .filter(|r| r.plant_id == plant_id && r.collected_at >= from && r.collected_at < until)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.collected_at.cmp(&b.collected_at));
        Ok(found)
    }

    async fn delete_readings(&self, plant_id: &str) -> Result<u64, DBError> {
        let mut readings = self.readings.write();
        let before = readings.len();
        readings.retain(|r| r.plant_id != plant_id);
        Ok((before - readings.len()) as u64)
    }
}
