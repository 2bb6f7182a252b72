use super::{device, plant, reading, DeviceDao, PlantDao, ReadingDao, Store};
use crate::error::DBError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

pub struct PgStore {
    conn: sqlx::PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self, DBError> {
        let conn = sqlx::postgres::PgPoolOptions::new()
            .max_connections(8)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;
        sqlx::migrate!().run(&conn).await?;
        Ok(PgStore { conn })
    }
}

#[async_trait]
impl Store for PgStore {
    async fn check_schema(&self) -> Result<(), DBError> {
        plant::count(&self.conn).await?;
        Ok(())
    }

    async fn device(&self, mac: &str) -> Result<Option<DeviceDao>, DBError> {
        device::get(&self.conn, mac).await
    }

    async fn devices(&self) -> Result<Vec<DeviceDao>, DBError> {
        device::read(&self.conn).await
    }

    async fn insert_device(&self, dao: &DeviceDao) -> Result<bool, DBError> {
        device::insert(&self.conn, dao).await
    }

    async fn update_device(&self, dao: &DeviceDao) -> Result<(), DBError> {
        device::update(&self.conn, dao).await
    }

    async fn plant(&self, plant_id: &str) -> Result<Option<PlantDao>, DBError> {
        plant::get(&self.conn, plant_id).await
    }

    async fn plants(&self) -> Result<Vec<PlantDao>, DBError> {
        plant::read(&self.conn).await
    }

    async fn enabled_plants(&self) -> Result<Vec<PlantDao>, DBError> {
        plant::read_enabled(&self.conn).await
    }

    async fn insert_plant(&self, dao: &PlantDao) -> Result<bool, DBError> {
        plant::insert(&self.conn, dao).await
    }

    async fn update_plant(&self, dao: &PlantDao) -> Result<bool, DBError> {
        plant::update(&self.conn, dao).await
    }

    async fn delete_plant(&self, plant_id: &str) -> Result<bool, DBError> {
        plant::delete(&self.conn, plant_id).await
    }

    async fn insert_reading(&self, dao: &ReadingDao) -> Result<(), DBError> {
        reading::insert(&self.conn, dao).await
    }

    async fn readings(
        &self,
        plant_id: &str,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<ReadingDao>, DBError> {
        reading::get(&self.conn, plant_id, from, until).await
    }

    async fn delete_readings(&self, plant_id: &str) -> Result<u64, DBError> {
        reading::delete(&self.conn, plant_id).await
    }
}
