pub mod client;

#[cfg(test)]
mod test;

pub use client::DeviceClient;

use crate::error::{RegistryError, ValidationError};
use crate::models::{DeviceDao, StoreHandle};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use utoipa::ToSchema;

/// A node announcing itself, already checked at the http boundary
#[derive(Debug, Clone)]
pub struct DeviceAnnouncement {
    pub mac: String,
    pub dev_type: String,
    pub address: String,
    pub capabilities: Vec<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Upsert {
    Created,
    Updated,
    Unchanged,
}

#[derive(Clone)]
pub struct DeviceDirectory {
    store: StoreHandle,
}

impl DeviceDirectory {
    pub fn new(store: StoreHandle) -> Self {
        DeviceDirectory { store }
    }

    pub async fn upsert(&self, announcement: DeviceAnnouncement) -> Result<Upsert, RegistryError> {
        let device = Self::validate(announcement)?;

        let existing = match self.store.device(&device.mac).await? {
            Some(existing) => existing,
            None => {
                if self.store.insert_device(&device).await? {
                    info!(mac = %device.mac, address = %device.latest_address, "New device detected");
                    return Ok(Upsert::Created);
                }
                // lost the race against a concurrent first contact
                self.store
                    .device(&device.mac)
                    .await?
                    .ok_or_else(|| RegistryError::DeviceNotFound(device.mac.clone()))?
            }
        };

        if existing.latest_address == device.latest_address
            && existing.sensor_capabilities == device.sensor_capabilities
            && existing.dev_type == device.dev_type
        {
            debug!(mac = %device.mac, "Device connection OK");
            return Ok(Upsert::Unchanged);
        }

        self.store.update_device(&device).await?;
        info!(
            mac = %device.mac,
            from = %existing.latest_address,
            to = %device.latest_address,
            "Updated device"
        );
        Ok(Upsert::Updated)
    }

    pub async fn lookup(&self, mac: &str) -> Result<DeviceDao, RegistryError> {
        let mac = normalize_mac(mac);
        self.store
            .device(&mac)
            .await?
            .ok_or(RegistryError::DeviceNotFound(mac))
    }

    pub async fn list(&self) -> Result<Vec<DeviceDao>, RegistryError> {
        Ok(self.store.devices().await?)
    }

    fn validate(announcement: DeviceAnnouncement) -> Result<DeviceDao, ValidationError> {
        let mac = parse_mac(&announcement.mac)?;

        let dev_type = announcement.dev_type.trim().to_owned();
        if dev_type.is_empty() {
            return Err(ValidationError::Missing("dev_type"));
        }

        let address = announcement.address.trim().to_owned();
        if address.is_empty() {
            return Err(ValidationError::Missing("session_ip"));
        }
        if address.contains(char::is_whitespace) {
            return Err(ValidationError::Malformed("session_ip", address));
        }

        let mut capabilities = announcement.capabilities;
        if let Some(invalid) = capabilities.iter().find(|c| **c < 0) {
            return Err(ValidationError::Malformed(
                "sensors_detected",
                format!("negative sensor index {}", invalid),
            ));
        }
        capabilities.sort_unstable();
        capabilities.dedup();

        Ok(DeviceDao {
            mac,
            dev_type,
            latest_address: address,
            sensor_capabilities: capabilities,
            updated_at: Utc::now(),
        })
    }
}

pub fn normalize_mac(mac: &str) -> String {
    mac.trim().replace('-', ":").to_uppercase()
}

/// Accepts `84:F3:EB:96:DE:CC` in any case, with `:` or `-` separators
pub fn parse_mac(mac: &str) -> Result<String, ValidationError> {
    let normalized = normalize_mac(mac);
    if normalized.is_empty() {
        return Err(ValidationError::Missing("mac"));
    }

    let groups: Vec<&str> = normalized.split(':').collect();
    let is_valid = groups.len() == 6
        && groups
            .iter()
            .all(|g| g.len() == 2 && g.chars().all(|c| c.is_ascii_hexdigit()));
    if is_valid {
        Ok(normalized)
    } else {
        Err(ValidationError::Malformed("mac", mac.to_owned()))
    }
}
