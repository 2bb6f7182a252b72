//! Test doubles shared across modules: a sensor node served by warp
//! on an ephemeral port, and an in-memory hub around it.

use crate::device::DeviceAnnouncement;
use crate::error::DBError;
use crate::hub::{Hub, HubSettings};
use crate::models::{DeviceDao, MemoryStore, PlantDao, ReadingDao, Store, StoreHandle};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use sprout_core::DataRequest;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use warp::http::StatusCode;
use warp::Filter;

#[derive(Default)]
struct Recorder {
    pings: AtomicUsize,
    pulls: Mutex<Vec<(Instant, DataRequest)>>,
}

pub struct FakeDeviceBuilder {
    ping_delay: Duration,
    ping_status: u16,
    malformed_data: bool,
}

impl FakeDeviceBuilder {
    pub fn ping_delay(mut self, delay: Duration) -> Self {
        self.ping_delay = delay;
        self
    }

    pub fn ping_status(mut self, status: u16) -> Self {
        self.ping_status = status;
        self
    }

    pub fn malformed_data(mut self) -> Self {
        self.malformed_data = true;
        self
    }

    pub async fn spawn(self) -> FakeDevice {
        let recorder = Arc::new(Recorder::default());
        let ping_delay = self.ping_delay;
        let ping_status = StatusCode::from_u16(self.ping_status).unwrap();
        let malformed = self.malformed_data;

        let ping_recorder = recorder.clone();
        let ping = warp::path!("ping").and(warp::get()).and_then(move || {
            let recorder = ping_recorder.clone();
            async move {
                recorder.pings.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(ping_delay).await;
                Ok::<_, warp::Rejection>(warp::reply::with_status("pong", ping_status))
            }
        });

        let data_recorder = recorder.clone();
        let data = warp::path!("data")
            .and(warp::post())
            .and(warp::body::json())
            .map(move |req: DataRequest| {
                let sensor_num = req.sensor_num;
                data_recorder.pulls.lock().push((Instant::now(), req));
                let body = if malformed {
                    serde_json::json!({ "temp": "21.50", "sensor_num": sensor_num })
                } else {
                    serde_json::json!({
                        "temp": "21.50",
                        "rel_hum": "96.10",
                        "lux": "1540",
                        "moi_ana": "431",
                        "sensor_num": sensor_num.to_string(),
                    })
                };
                warp::reply::json(&body)
            });

        let (shutdown, rx) = oneshot::channel::<()>();
        let (addr, server) = warp::serve(ping.or(data)).bind_with_graceful_shutdown(
            ([127, 0, 0, 1], 0),
            async move {
                rx.await.ok();
            },
        );
        tokio::spawn(server);

        FakeDevice {
            address: addr.to_string(),
            recorder,
            shutdown: Some(shutdown),
        }
    }
}

pub struct FakeDevice {
    address: String,
    recorder: Arc<Recorder>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl FakeDevice {
    pub fn builder() -> FakeDeviceBuilder {
        FakeDeviceBuilder {
            ping_delay: Duration::ZERO,
            ping_status: 200,
            malformed_data: false,
        }
    }

    pub async fn spawn() -> Self {
        Self::builder().spawn().await
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn pings(&self) -> usize {
        self.recorder.pings.load(Ordering::SeqCst)
    }

    pub fn pulls(&self) -> usize {
        self.recorder.pulls.lock().len()
    }

    pub fn pull_times(&self) -> Vec<Instant> {
        self.recorder.pulls.lock().iter().map(|(t, _)| *t).collect()
    }

    pub fn last_plant_id(&self) -> Option<String> {
        self.recorder
            .pulls
            .lock()
            .last()
            .map(|(_, req)| req.plant_id.clone())
    }
}

impl Drop for FakeDevice {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// An address nobody listens on
pub fn unreachable_address() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr.to_string()
}

pub fn test_settings() -> HubSettings {
    HubSettings {
        probe_timeout: Duration::from_millis(300),
        pull_timeout: Duration::from_secs(1),
        plant_id_length: 8,
        plant_id_retries: 5,
    }
}

pub fn build_mocked_hub() -> Arc<Hub> {
    build_hub_with(Arc::new(MemoryStore::new()))
}

pub fn build_hub_with(store: StoreHandle) -> Arc<Hub> {
    crate::logging::init();
    Hub::new(store, test_settings()).unwrap()
}

pub fn announcement(mac: &str, address: &str) -> DeviceAnnouncement {
    DeviceAnnouncement {
        mac: mac.to_owned(),
        dev_type: "ESP8266".to_owned(),
        address: address.to_owned(),
        capabilities: vec![0, 1],
    }
}

pub fn plant(plant_id: &str, mac: &str, interval_secs: i32, enabled: bool) -> PlantDao {
    PlantDao {
        plant_id: plant_id.to_owned(),
        name: format!("Plant {}", plant_id),
        plant_type: "Basil".to_owned(),
        planted_at: Utc::now() - chrono::Duration::days(3),
        registered_at: Utc::now(),
        poll_interval_secs: interval_secs,
        polling_enabled: enabled,
        device_mac: mac.to_owned(),
        sensor_index: 1,
    }
}

/// A store whose backend is gone
pub struct BrokenStore;

fn broken<T>() -> Result<T, DBError> {
    Err(DBError::SQLError(sqlx::Error::PoolTimedOut))
}

#[async_trait]
impl Store for BrokenStore {
    async fn check_schema(&self) -> Result<(), DBError> {
        broken()
    }

    async fn device(&self, _mac: &str) -> Result<Option<DeviceDao>, DBError> {
        broken()
    }

    async fn devices(&self) -> Result<Vec<DeviceDao>, DBError> {
        broken()
    }

    async fn insert_device(&self, _device: &DeviceDao) -> Result<bool, DBError> {
        broken()
    }

    async fn update_device(&self, _device: &DeviceDao) -> Result<(), DBError> {
        broken()
    }

    async fn plant(&self, _plant_id: &str) -> Result<Option<PlantDao>, DBError> {
        broken()
    }

    async fn plants(&self) -> Result<Vec<PlantDao>, DBError> {
        broken()
    }

    async fn enabled_plants(&self) -> Result<Vec<PlantDao>, DBError> {
        broken()
    }

    async fn insert_plant(&self, _plant: &PlantDao) -> Result<bool, DBError> {
        broken()
    }

    async fn update_plant(&self, _plant: &PlantDao) -> Result<bool, DBError> {
        broken()
    }

    async fn delete_plant(&self, _plant_id: &str) -> Result<bool, DBError> {
        broken()
    }

    async fn insert_reading(&self, _reading: &ReadingDao) -> Result<(), DBError> {
        broken()
    }

    async fn readings(
        &self,
        _plant_id: &str,
        _from: DateTime<Utc>,
        _until: DateTime<Utc>,
    ) -> Result<Vec<ReadingDao>, DBError> {
        broken()
    }

    async fn delete_readings(&self, _plant_id: &str) -> Result<u64, DBError> {
        broken()
    }
}
