use super::CountRecord;
use crate::error::DBError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use utoipa::ToSchema;

#[derive(sqlx::FromRow, Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct PlantDao {
    pub(crate) plant_id: String,
    pub(crate) name: String,
    pub(crate) plant_type: String,
    pub(crate) planted_at: DateTime<Utc>,
    pub(crate) registered_at: DateTime<Utc>,
    pub(crate) poll_interval_secs: i32,
    pub(crate) polling_enabled: bool,
    pub(crate) device_mac: String,
    pub(crate) sensor_index: i32,
}

impl PlantDao {
    pub fn plant_id(&self) -> &String {
        &self.plant_id
    }

    pub fn name(&self) -> &String {
        &self.name
    }

    pub fn plant_type(&self) -> &String {
        &self.plant_type
    }

    pub fn planted_at(&self) -> DateTime<Utc> {
        self.planted_at
    }

    pub fn registered_at(&self) -> DateTime<Utc> {
        self.registered_at
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(0) as u64)
    }

    pub fn polling_enabled(&self) -> bool {
        self.polling_enabled
    }

    pub fn device_mac(&self) -> &String {
        &self.device_mac
    }

    pub fn sensor_index(&self) -> i32 {
        self.sensor_index
    }
}

pub async fn insert(conn: &sqlx::PgPool, plant: &PlantDao) -> Result<bool, DBError> {
    let result = sql_stmnt!(
        r#"INSERT INTO plants
                (plant_id, name, plant_type, planted_at, registered_at,
                 poll_interval_secs, polling_enabled, device_mac, sensor_index)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ON CONFLICT (plant_id) DO NOTHING"#,
        &plant.plant_id,
        &plant.name,
        &plant.plant_type,
        plant.planted_at,
        plant.registered_at,
        plant.poll_interval_secs,
        plant.polling_enabled,
        &plant.device_mac,
        plant.sensor_index
    )
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// READ plant
pub async fn get(conn: &sqlx::PgPool, plant_id: &str) -> Result<Option<PlantDao>, DBError> {
    Ok(
        sql_stmnt!(PlantDao, "SELECT * FROM plants WHERE plant_id = $1", plant_id)
            .fetch_optional(conn)
            .await?,
    )
}

/// READ plants
pub async fn read(conn: &sqlx::PgPool) -> Result<Vec<PlantDao>, DBError> {
    Ok(
        sql_stmnt!(PlantDao, "SELECT * FROM plants ORDER BY registered_at ASC")
            .fetch_all(conn)
            .await?,
    )
}

pub async fn read_enabled(conn: &sqlx::PgPool) -> Result<Vec<PlantDao>, DBError> {
    Ok(sql_stmnt!(
        PlantDao,
        "SELECT * FROM plants WHERE polling_enabled = TRUE ORDER BY registered_at ASC"
    )
    .fetch_all(conn)
    .await?)
}

pub async fn count(conn: &sqlx::PgPool) -> Result<i64, DBError> {
    let rows = sql_stmnt!(CountRecord, "SELECT count(*) as count FROM plants")
        .fetch_one(conn)
        .await?;
    Ok(rows.count())
}

// UPDATE plant, identity columns are never written
pub async fn update(conn: &sqlx::PgPool, plant: &PlantDao) -> Result<bool, DBError> {
    let result = sql_stmnt!(
        r#"UPDATE plants
            SET name = $2, plant_type = $3, planted_at = $4,
                poll_interval_secs = $5, polling_enabled = $6, sensor_index = $7
            WHERE plant_id = $1"#,
        &plant.plant_id,
        &plant.name,
        &plant.plant_type,
        plant.planted_at,
        plant.poll_interval_secs,
        plant.polling_enabled,
        plant.sensor_index
    )
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn delete(conn: &sqlx::PgPool, plant_id: &str) -> Result<bool, DBError> {
    let result = sql_stmnt!("DELETE FROM plants WHERE plant_id = $1", plant_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() == 1)
}
