use super::dto::{ErrorResponseDto, PlantIdDto};
use super::query::DateQuery;
use super::{build_response, json_body};
use crate::error::{RegistryError, ValidationError};
use crate::hub::Hub;
use crate::models::ReadingDao;
use chrono::Utc;
use dto::{ReadingPushDto, ReadingsDeletedDto};
use sprout_core::ReadingMessage;
use std::sync::Arc;
use warp::Filter;

pub fn routes(hub: &Arc<Hub>) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    push_reading(hub.clone())
        .or(plant_readings(hub.clone()))
        .or(delete_readings(hub.clone()))
}

/// POST /api/plant_data
///
/// Stores a reading pushed by a node, the plant does not need to exist
#[utoipa::path(
    post,
    path = "/api/plant_data",
    tag = "reading",
    request_body = ReadingPushDto,
    responses(
        (status = 200, body = ReadingDao),
        (status = 406, description = "Missing or implausible value", body = ErrorResponseDto)
    )
)]
pub(super) fn push_reading(
    hub: Arc<Hub>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || hub.clone())
        .and(warp::path!("api" / "plant_data"))
        .and(warp::post())
        .and(json_body())
        .and_then(
            |hub: Arc<Hub>, body: Result<ReadingPushDto, ValidationError>| async move {
                let resp = match body.and_then(ReadingPushDto::into_message) {
                    Ok((plant_id, msg)) => hub.submit_reading(&plant_id, msg).await,
                    Err(e) => Err(RegistryError::from(e)),
                };
                build_response(resp)
            },
        )
        .boxed()
}

/// GET /api/plant_data/:plant_id?from=..&until=..
///
/// Returns the readings of a plant in ascending order
#[utoipa::path(
    get,
    path = "/api/plant_data/{plant_id}",
    tag = "reading",
    params(("plant_id" = String, Path, description = "Plant the readings belong to"), DateQuery),
    responses(
        (status = 200, body = Vec<ReadingDao>),
        (status = 406, body = ErrorResponseDto)
    )
)]
pub(super) fn plant_readings(
    hub: Arc<Hub>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || hub.clone())
        .and(warp::path!("api" / "plant_data" / String))
        .and(warp::get())
        .and(warp::query::<DateQuery>())
        .and_then(
            |hub: Arc<Hub>, plant_id: String, query: DateQuery| async move {
                let resp = match query.window() {
                    Ok((from, until)) => hub.readings.for_plant(&plant_id, from, until).await,
                    Err(e) => Err(RegistryError::from(e)),
                };
                build_response(resp)
            },
        )
        .boxed()
}

/// DELETE /api/plant_data
///
/// Drops every reading of a plant
#[utoipa::path(
    delete,
    path = "/api/plant_data",
    tag = "reading",
    request_body = PlantIdDto,
    responses(
        (status = 200, body = ReadingsDeletedDto),
        (status = 406, body = ErrorResponseDto)
    )
)]
pub(super) fn delete_readings(
    hub: Arc<Hub>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || hub.clone())
        .and(warp::path!("api" / "plant_data"))
        .and(warp::delete())
        .and(json_body())
        .and_then(
            |hub: Arc<Hub>, body: Result<PlantIdDto, ValidationError>| async move {
                let plant_id = body.and_then(|dto| {
                    dto.plant_id.ok_or(ValidationError::Missing("plant_id"))
                });
                let resp = match plant_id {
                    Ok(plant_id) => hub
                        .readings
                        .delete_for_plant(&plant_id)
                        .await
                        .map(|deleted| ReadingsDeletedDto { plant_id, deleted }),
                    Err(e) => Err(RegistryError::from(e)),
                };
                build_response(resp)
            },
        )
        .boxed()
}

impl ReadingPushDto {
    fn into_message(self) -> Result<(String, ReadingMessage), ValidationError> {
        let plant_id = self
            .plant_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(ValidationError::Missing("plant_id"))?;
        let timestamp = self.timestamp.unwrap_or_else(Utc::now);
        let msg = ReadingMessage::from_raw(self.reading, timestamp)?;
        Ok((plant_id, msg))
    }
}

///
/// DTO
///
pub mod dto {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use sprout_core::{lenient, RawReading};
    use utoipa::ToSchema;

    /// Values may be numbers or numeric strings
    #[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
    pub struct ReadingPushDto {
        pub plant_id: Option<String>,
        /// Collection time, defaults to the time of arrival
        #[serde(default, deserialize_with = "lenient::opt_timestamp")]
        pub timestamp: Option<DateTime<Utc>>,
        #[serde(flatten)]
        pub reading: RawReading,
    }

    #[derive(Debug, Serialize, Deserialize, ToSchema)]
    pub struct ReadingsDeletedDto {
        pub plant_id: String,
        pub deleted: u64,
    }
}
