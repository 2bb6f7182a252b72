//! Deserializers for the loosely typed payloads sent by the sensor firmware.
//!
//! Nodes format every value as a string (`"23.51"`, `"0"`), while newer
//! clients send plain JSON numbers. Both are accepted.

use chrono::{DateTime, TimeZone, Utc};
use serde::de::Error;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient {
    Int(i64),
    Float(f64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LenientList {
    Items(Vec<Lenient>),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LenientBool {
    Bool(bool),
    Int(i64),
    Text(String),
}

pub fn opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Lenient>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Lenient::Int(v)) => Ok(Some(v as f64)),
        Some(Lenient::Float(v)) => Ok(Some(v)),
        Some(Lenient::Text(s)) => parse_f64(&s).map(Some).map_err(D::Error::custom),
    }
}

pub fn opt_i32<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Lenient>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Lenient::Int(v)) => i32::try_from(v)
            .map(Some)
            .map_err(|_| D::Error::custom(format!("integer out of range: {}", v))),
        Some(Lenient::Float(v)) => float_to_i32(v).map(Some).map_err(D::Error::custom),
        Some(Lenient::Text(s)) => {
            let trimmed = s.trim();
            if let Ok(v) = trimmed.parse::<i32>() {
                return Ok(Some(v));
            }
            parse_f64(trimmed)
                .and_then(float_to_i32)
                .map(Some)
                .map_err(D::Error::custom)
        }
    }
}

/// A list of indices, either as JSON array or as `"0,1"`
pub fn opt_i32_list<'de, D>(deserializer: D) -> Result<Option<Vec<i32>>, D::Error>
where
    D: Deserializer<'de>,
{
    let items: Vec<Lenient> = match Option::<LenientList>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(LenientList::Items(items)) => items,
        Some(LenientList::Text(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| Lenient::Text(part.to_owned()))
            .collect(),
    };

    items
        .into_iter()
        .map(|item| match item {
            Lenient::Int(v) => i32::try_from(v).map_err(|_| format!("integer out of range: {}", v)),
            Lenient::Float(v) => float_to_i32(v),
            Lenient::Text(s) => s
                .trim()
                .parse::<i32>()
                .map_err(|_| format!("invalid integer: {}", s)),
        })
        .collect::<Result<Vec<i32>, String>>()
        .map(Some)
        .map_err(D::Error::custom)
}

pub fn opt_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<LenientBool>::deserialize(deserializer)? {
        None => Ok(None),
        Some(LenientBool::Bool(v)) => Ok(Some(v)),
        Some(LenientBool::Int(0)) => Ok(Some(false)),
        Some(LenientBool::Int(1)) => Ok(Some(true)),
        Some(LenientBool::Int(v)) => Err(D::Error::custom(format!("invalid flag: {}", v))),
        Some(LenientBool::Text(s)) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            _ => Err(D::Error::custom(format!("invalid flag: {}", s))),
        },
    }
}

/// Epoch seconds (number or string) or an RFC 3339 timestamp
pub fn opt_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = match Option::<Lenient>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(Lenient::Int(v)) => v,
        Some(Lenient::Float(v)) => v.trunc() as i64,
        Some(Lenient::Text(s)) => {
            let trimmed = s.trim();
            if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
                return Ok(Some(parsed.with_timezone(&Utc)));
            }
            trimmed
                .parse::<i64>()
                .map_err(|_| D::Error::custom(format!("invalid timestamp: {}", s)))?
        }
    };

    Utc.timestamp_opt(secs, 0)
        .single()
        .map(Some)
        .ok_or_else(|| D::Error::custom(format!("timestamp out of range: {}", secs)))
}

fn parse_f64(s: &str) -> Result<f64, String> {
    match s.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(format!("invalid number: {}", s)),
    }
}

fn float_to_i32(v: f64) -> Result<i32, String> {
    let rounded = v.round();
    if rounded.is_finite() && rounded >= i32::MIN as f64 && rounded <= i32::MAX as f64 {
        Ok(rounded as i32)
    } else {
        Err(format!("integer out of range: {}", v))
    }
}
