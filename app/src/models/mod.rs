use crate::error::DBError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

macro_rules! sql_stmnt {
    ($ret:ident, $stmt:expr) => {
        sqlx::query_as::<_, $ret>($stmt)
    };
    ($stmt:expr) => {
        sqlx::query($stmt)
    };
    ($ret:ident, $stmt:expr, $($bind:expr),*) => {
        sqlx::query_as::<_, $ret>($stmt)$(.bind($bind))*
    };
    ($stmt:expr, $($bind:expr),*) => {
        sqlx::query($stmt)$(.bind($bind))*
    };
}

pub mod device;
pub mod memory;
pub mod plant;
pub mod postgres;
pub mod reading;


pub use device::DeviceDao;
pub use memory::MemoryStore;
pub use plant::PlantDao;
pub use postgres::PgStore;
pub use reading::ReadingDao;

#[derive(sqlx::FromRow)]
pub(crate) struct CountRecord {
    pub count: Option<i64>,
}

impl CountRecord {
    pub fn count(self) -> i64 {
        self.count.unwrap_or(0)
    }
}

/// Keyed persistence for devices (by mac), plants (by plant_id) and the
/// append-only reading log
#[async_trait]
pub trait Store: Send + Sync {
    async fn check_schema(&self) -> Result<(), DBError>;

    async fn device(&self, mac: &str) -> Result<Option<DeviceDao>, DBError>;
    async fn devices(&self) -> Result<Vec<DeviceDao>, DBError>;
    /// Returns `false` if a device with the same mac already exists
    async fn insert_device(&self, device: &DeviceDao) -> Result<bool, DBError>;
    async fn update_device(&self, device: &DeviceDao) -> Result<(), DBError>;

    async fn plant(&self, plant_id: &str) -> Result<Option<PlantDao>, DBError>;
    async fn plants(&self) -> Result<Vec<PlantDao>, DBError>;
    async fn enabled_plants(&self) -> Result<Vec<PlantDao>, DBError>;
    /// Returns `false` on a plant_id collision, the existing row is kept
    async fn insert_plant(&self, plant: &PlantDao) -> Result<bool, DBError>;
    /// Returns `false` if the plant does not exist (anymore)
    async fn update_plant(&self, plant: &PlantDao) -> Result<bool, DBError>;
    async fn delete_plant(&self, plant_id: &str) -> Result<bool, DBError>;

    async fn insert_reading(&self, reading: &ReadingDao) -> Result<(), DBError>;
    async fn readings(
        &self,
        plant_id: &str,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<ReadingDao>, DBError>;
    async fn delete_readings(&self, plant_id: &str) -> Result<u64, DBError>;
}

pub type StoreHandle = Arc<dyn Store>;

/// Connects to postgres if a database url is configured,
/// otherwise everything lives in memory until shutdown
pub async fn establish_store(database_url: Option<&str>) -> Result<StoreHandle, DBError> {
    match database_url {
        Some(url) => {
            let store = PgStore::connect(url).await?;
            store.check_schema().await?;
            info!("Connected to postgres store");
            Ok(Arc::new(store))
        }
        None => {
            warn!("DATABASE_URL not set, data will not survive a restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
