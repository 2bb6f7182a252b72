use crate::error::DBError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(sqlx::FromRow, Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct DeviceDao {
    pub(crate) mac: String,
    pub(crate) dev_type: String,
    pub(crate) latest_address: String,
    pub(crate) sensor_capabilities: Vec<i32>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl DeviceDao {
    pub fn mac(&self) -> &String {
        &self.mac
    }

    pub fn dev_type(&self) -> &String {
        &self.dev_type
    }

    pub fn latest_address(&self) -> &String {
        &self.latest_address
    }

    pub fn sensor_capabilities(&self) -> &Vec<i32> {
        &self.sensor_capabilities
    }
}

pub async fn insert(conn: &sqlx::PgPool, device: &DeviceDao) -> Result<bool, DBError> {
    let result = sql_stmnt!(
        r#"INSERT INTO devices (mac, dev_type, latest_address, sensor_capabilities, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (mac) DO NOTHING"#,
        &device.mac,
        &device.dev_type,
        &device.latest_address,
        &device.sensor_capabilities,
        device.updated_at
    )
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// READ device
pub async fn get(conn: &sqlx::PgPool, mac: &str) -> Result<Option<DeviceDao>, DBError> {
    Ok(
        sql_stmnt!(DeviceDao, "SELECT * FROM devices WHERE mac = $1", mac)
            .fetch_optional(conn)
            .await?,
    )
}

/// READ devices
pub async fn read(conn: &sqlx::PgPool) -> Result<Vec<DeviceDao>, DBError> {
    Ok(sql_stmnt!(DeviceDao, "SELECT * FROM devices ORDER BY mac ASC")
        .fetch_all(conn)
        .await?)
}

// UPDATE device
pub async fn update(conn: &sqlx::PgPool, device: &DeviceDao) -> Result<(), DBError> {
    sql_stmnt!(
        r#"UPDATE devices
            SET dev_type = $2, latest_address = $3, sensor_capabilities = $4, updated_at = $5
            WHERE mac = $1"#,
        &device.mac,
        &device.dev_type,
        &device.latest_address,
        &device.sensor_capabilities,
        device.updated_at
    )
    .execute(conn)
    .await?;
    Ok(())
}
