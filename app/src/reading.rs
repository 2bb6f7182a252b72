use crate::error::RegistryError;
use crate::models::{ReadingDao, StoreHandle};
use chrono::{DateTime, Utc};
use sprout_core::ReadingMessage;
use tracing::debug;

/// Append-only log of sensor samples, keyed by plant
#[derive(Clone)]
pub struct ReadingLog {
    store: StoreHandle,
}

impl ReadingLog {
    pub fn new(store: StoreHandle) -> Self {
        ReadingLog { store }
    }

    pub async fn append(
        &self,
        plant_id: &str,
        sensor_index: i32,
        msg: ReadingMessage,
    ) -> Result<ReadingDao, RegistryError> {
        let reading = ReadingDao::new(plant_id, sensor_index, msg);
        self.store.insert_reading(&reading).await?;
        debug!(plant_id = plant_id, "Stored reading");
        Ok(reading)
    }

    pub async fn for_plant(
        &self,
        plant_id: &str,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<ReadingDao>, RegistryError> {
        Ok(self.store.readings(plant_id, from, until).await?)
    }

    pub async fn delete_for_plant(&self, plant_id: &str) -> Result<u64, RegistryError> {
        Ok(self.store.delete_readings(plant_id).await?)
    }
}
