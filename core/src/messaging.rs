use crate::error::PayloadError;
use crate::lenient;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body of `POST /data` sent to a sensor node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DataRequest {
    pub plant_id: String,
    pub sensor_num: i32,
}

/// A reading as reported by a node, before validation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RawReading {
    #[serde(default, deserialize_with = "lenient::opt_i32")]
    pub sensor_num: Option<i32>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub temp: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub rel_hum: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub lux: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_i32")]
    pub moi_ana: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReadingMessage {
    pub timestamp: DateTime<Utc>,
    pub sensor_num: Option<i32>,
    pub temperature: f64,
    pub relative_humidity: f64,
    pub lux: f64,
    pub moisture_raw: i32,
}

impl ReadingMessage {
    /// Checks that all measured values are present and plausible
    pub fn from_raw(raw: RawReading, timestamp: DateTime<Utc>) -> Result<Self, PayloadError> {
        let temperature = raw.temp.ok_or(PayloadError::MissingField("temp"))?;
        let relative_humidity = raw.rel_hum.ok_or(PayloadError::MissingField("rel_hum"))?;
        let lux = raw.lux.ok_or(PayloadError::MissingField("lux"))?;
        let moisture_raw = raw.moi_ana.ok_or(PayloadError::MissingField("moi_ana"))?;

        if !(0.0..=100.0).contains(&relative_humidity) {
            return Err(PayloadError::InvalidValue(
                "rel_hum",
                format!("{} is not a percentage", relative_humidity),
            ));
        }
        if lux < 0.0 {
            return Err(PayloadError::InvalidValue(
                "lux",
                format!("{} is negative", lux),
            ));
        }
        if let Some(sensor_num) = raw.sensor_num {
            if sensor_num < 0 {
                return Err(PayloadError::InvalidValue(
                    "sensor_num",
                    format!("{} is negative", sensor_num),
                ));
            }
        }

        Ok(ReadingMessage {
            timestamp,
            sensor_num: raw.sensor_num,
            temperature,
            relative_humidity,
            lux,
            moisture_raw,
        })
    }
}
