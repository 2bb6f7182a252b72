use crate::error::DBError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sprout_core::ReadingMessage;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(sqlx::FromRow, Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct ReadingDao {
    pub(crate) id: Uuid,
    pub(crate) plant_id: String,
    pub(crate) collected_at: DateTime<Utc>,
    pub(crate) temperature: f64,
    pub(crate) relative_humidity: f64,
    pub(crate) lux: f64,
    pub(crate) moisture_raw: i32,
    pub(crate) sensor_index: i32,
}

impl ReadingDao {
    /// The sensor index reported by the node wins over the requested one
    pub fn new(plant_id: &str, sensor_index: i32, msg: ReadingMessage) -> Self {
        ReadingDao {
            id: Uuid::new_v4(),
            plant_id: plant_id.to_owned(),
            collected_at: msg.timestamp,
            temperature: msg.temperature,
            relative_humidity: msg.relative_humidity,
            lux: msg.lux,
            moisture_raw: msg.moisture_raw,
            sensor_index: msg.sensor_num.unwrap_or(sensor_index),
        }
    }

    pub fn plant_id(&self) -> &String {
        &self.plant_id
    }

    pub fn collected_at(&self) -> DateTime<Utc> {
        self.collected_at
    }

    pub fn sensor_index(&self) -> i32 {
        self.sensor_index
    }
}

pub async fn insert(conn: &sqlx::PgPool, reading: &ReadingDao) -> Result<(), DBError> {
    sql_stmnt!(
        r#"INSERT INTO readings
            (id, plant_id, collected_at, temperature, relative_humidity, lux, moisture_raw, sensor_index)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
        reading.id,
        &reading.plant_id,
        reading.collected_at,
        reading.temperature,
        reading.relative_humidity,
        reading.lux,
        reading.moisture_raw,
        reading.sensor_index
    )
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn get(
    conn: &sqlx::PgPool,
    plant_id: &str,
    from: DateTime<Utc>,
    until: DateTime<Utc>,
) -> Result<Vec<ReadingDao>, DBError> {
    Ok(sql_stmnt!(
        ReadingDao,
        r#"SELECT * FROM readings
            WHERE plant_id = $1
            AND collected_at >= $2 AND collected_at < $3
            ORDER BY collected_at ASC"#,
        plant_id,
        from,
        until
    )
    .fetch_all(conn)
    .await?)
}

pub async fn delete(conn: &sqlx::PgPool, plant_id: &str) -> Result<u64, DBError> {
    let result = sql_stmnt!("DELETE FROM readings WHERE plant_id = $1", plant_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}
