use crate::error::DeviceError;
use chrono::Utc;
use sprout_core::{DataRequest, RawReading, ReadingMessage};
use std::time::Duration;
use tracing::debug;

/// HTTP access to sensor nodes, `/ping` for liveness and `/data` for readings
#[derive(Clone)]
pub struct DeviceClient {
    http: reqwest::Client,
    pull_timeout: Duration,
}

impl DeviceClient {
    pub fn new(pull_timeout: Duration) -> Result<Self, DeviceError> {
        let http = reqwest::Client::builder()
            .connect_timeout(pull_timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;
        Ok(DeviceClient { http, pull_timeout })
    }

    /// Liveness gate, any failure within `timeout` counts as unreachable
    pub async fn probe(&self, address: &str, timeout: Duration) -> bool {
        let url = device_url(address, "ping");
        match self.http.get(&url).timeout(timeout).send().await {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                debug!(url = %url, status = resp.status().as_u16(), "Probe rejected");
                false
            }
            Err(e) => {
                debug!(url = %url, "Probe failed: {}", e);
                false
            }
        }
    }

    pub async fn pull(
        &self,
        address: &str,
        plant_id: &str,
        sensor_index: i32,
    ) -> Result<ReadingMessage, DeviceError> {
        let body = DataRequest {
            plant_id: plant_id.to_owned(),
            sensor_num: sensor_index,
        };
        let resp = self
            .http
            .post(device_url(address, "data"))
            .timeout(self.pull_timeout)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(DeviceError::Status(resp.status().as_u16()));
        }

        let raw: RawReading = resp.json().await?;
        Ok(ReadingMessage::from_raw(raw, Utc::now())?)
    }
}

/// Nodes announce bare `ip[:port]` addresses
pub fn device_url(address: &str, endpoint: &str) -> String {
    let base = address.trim().trim_end_matches('/');
    if base.starts_with("http://") || base.starts_with("https://") {
        format!("{}/{}", base, endpoint)
    } else {
        format!("http://{}/{}", base, endpoint)
    }
}
