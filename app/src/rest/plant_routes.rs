use super::dto::{ErrorResponseDto, PlantIdDto};
use super::{build_response, json_body};
use crate::error::{RegistryError, ValidationError};
use crate::hub::Hub;
use crate::models::PlantDao;
use crate::plant::PlantSpec;
use dto::{PlantCreateDto, PlantDeletedDto, PlantDetailDto, PlantPatchDto};
use std::sync::Arc;
use warp::Filter;

pub fn routes(hub: &Arc<Hub>) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    create_plant(hub.clone())
        .or(list_plants(hub.clone()))
        .or(plant_detail(hub.clone()))
        .or(update_plant(hub.clone()))
        .or(delete_plant(hub.clone()))
}

/// POST /api/plant
///
/// Registers a plant on an already announced device and schedules its
/// polling, if enabled and the device answers
///
/// Returns the stored plant with its generated `plant_id`
#[utoipa::path(
    post,
    path = "/api/plant",
    tag = "plant",
    request_body = PlantCreateDto,
    responses(
        (status = 200, body = PlantDao),
        (status = 400, description = "Device was never announced", body = ErrorResponseDto),
        (status = 406, description = "Missing or malformed field", body = ErrorResponseDto)
    )
)]
pub(super) fn create_plant(
    hub: Arc<Hub>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || hub.clone())
        .and(warp::path!("api" / "plant"))
        .and(warp::post())
        .and(json_body())
        .and_then(
            |hub: Arc<Hub>, body: Result<PlantCreateDto, ValidationError>| async move {
                let resp = match body.and_then(PlantSpec::try_from) {
                    Ok(spec) => hub.plants.create(spec).await,
                    Err(e) => Err(RegistryError::from(e)),
                };
                build_response(resp)
            },
        )
        .boxed()
}

/// GET /api/plant
#[utoipa::path(
    get,
    path = "/api/plant",
    tag = "plant",
    responses((status = 200, body = Vec<PlantDao>))
)]
pub(super) fn list_plants(
    hub: Arc<Hub>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || hub.clone())
        .and(warp::path!("api" / "plant"))
        .and(warp::get())
        .and_then(|hub: Arc<Hub>| async move {
            let resp = hub.plants.list().await;
            build_response(resp)
        })
        .boxed()
}

/// GET /api/plant/:plant_id
///
/// Returns the plant together with the state of its poll job
#[utoipa::path(
    get,
    path = "/api/plant/{plant_id}",
    tag = "plant",
    params(("plant_id" = String, Path, description = "Generated plant id")),
    responses(
        (status = 200, body = PlantDetailDto),
        (status = 404, body = ErrorResponseDto)
    )
)]
pub(super) fn plant_detail(
    hub: Arc<Hub>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || hub.clone())
        .and(warp::path!("api" / "plant" / String))
        .and(warp::get())
        .and_then(|hub: Arc<Hub>, plant_id: String| async move {
            let resp = hub.plants.get(&plant_id).await.map(|plant| PlantDetailDto {
                job: hub.scheduler.state(&plant_id),
                plant,
            });
            build_response(resp)
        })
        .boxed()
}

/// PATCH /api/plant
///
/// Updates the mutable fields of a plant. Changing the interval, the sensor
/// or the polling flag reschedules the plant before the response is sent.
#[utoipa::path(
    patch,
    path = "/api/plant",
    tag = "plant",
    request_body = PlantPatchDto,
    responses(
        (status = 200, body = PlantDao),
        (status = 404, body = ErrorResponseDto),
        (status = 406, body = ErrorResponseDto)
    )
)]
pub(super) fn update_plant(
    hub: Arc<Hub>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || hub.clone())
        .and(warp::path!("api" / "plant"))
        .and(warp::patch())
        .and(json_body())
        .and_then(
            |hub: Arc<Hub>, body: Result<PlantPatchDto, ValidationError>| async move {
                let resp = match body.and_then(PlantPatchDto::into_patch) {
                    Ok((plant_id, patch)) => hub.plants.update(&plant_id, patch).await,
                    Err(e) => Err(RegistryError::from(e)),
                };
                build_response(resp)
            },
        )
        .boxed()
}

/// DELETE /api/plant
///
/// Removes the plant and stops its polling, readings are kept
#[utoipa::path(
    delete,
    path = "/api/plant",
    tag = "plant",
    request_body = PlantIdDto,
    responses(
        (status = 200, body = PlantDeletedDto),
        (status = 404, body = ErrorResponseDto)
    )
)]
pub(super) fn delete_plant(
    hub: Arc<Hub>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || hub.clone())
        .and(warp::path!("api" / "plant"))
        .and(warp::delete())
        .and(json_body())
        .and_then(
            |hub: Arc<Hub>, body: Result<PlantIdDto, ValidationError>| async move {
                let plant_id = body.and_then(|dto| {
                    dto.plant_id.ok_or(ValidationError::Missing("plant_id"))
                });
                let resp = match plant_id {
                    Ok(plant_id) => match hub.plants.delete(&plant_id).await {
                        Ok(true) => Ok(PlantDeletedDto { plant_id }),
                        Ok(false) => Err(RegistryError::PlantNotFound(plant_id)),
                        Err(e) => Err(e),
                    },
                    Err(e) => Err(RegistryError::from(e)),
                };
                build_response(resp)
            },
        )
        .boxed()
}

///
/// DTO
///
pub mod dto {
    use crate::error::ValidationError;
    use crate::models::PlantDao;
    use crate::plant::{PlantPatch, PlantSpec};
    use crate::scheduler::JobState;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use sprout_core::lenient;
    use utoipa::ToSchema;

    /// Field names follow the ones used by the web frontend
    #[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
    pub struct PlantCreateDto {
        pub plant_name: Option<String>,
        pub plant_type: Option<String>,
        /// Epoch seconds or RFC 3339
        #[serde(default, deserialize_with = "lenient::opt_timestamp")]
        pub plant_date: Option<DateTime<Utc>>,
        /// Poll interval in seconds
        #[serde(default, deserialize_with = "lenient::opt_i32")]
        pub plant_update_poll: Option<i32>,
        #[serde(default, deserialize_with = "lenient::opt_bool")]
        pub update_poll_activated: Option<bool>,
        pub device_mac: Option<String>,
        #[serde(default, deserialize_with = "lenient::opt_i32")]
        pub soil_sens_num: Option<i32>,
    }

    impl TryFrom<PlantCreateDto> for PlantSpec {
        type Error = ValidationError;

        fn try_from(dto: PlantCreateDto) -> Result<Self, Self::Error> {
            Ok(PlantSpec {
                name: dto.plant_name.ok_or(ValidationError::Missing("plant_name"))?,
                plant_type: dto.plant_type.ok_or(ValidationError::Missing("plant_type"))?,
                planted_at: dto.plant_date.ok_or(ValidationError::Missing("plant_date"))?,
                poll_interval_secs: dto
                    .plant_update_poll
                    .ok_or(ValidationError::Missing("plant_update_poll"))?,
                polling_enabled: dto.update_poll_activated.unwrap_or(true),
                device_mac: dto.device_mac.ok_or(ValidationError::Missing("device_mac"))?,
                sensor_index: dto
                    .soil_sens_num
                    .ok_or(ValidationError::Missing("soil_sens_num"))?,
            })
        }
    }

    #[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
    pub struct PlantPatchDto {
        pub plant_id: Option<String>,
        pub plant_name: Option<String>,
        pub plant_type: Option<String>,
        #[serde(default, deserialize_with = "lenient::opt_timestamp")]
        pub plant_date: Option<DateTime<Utc>>,
        #[serde(default, deserialize_with = "lenient::opt_i32")]
        pub plant_update_poll: Option<i32>,
        #[serde(default, deserialize_with = "lenient::opt_bool")]
        pub update_poll_activated: Option<bool>,
        #[serde(default, deserialize_with = "lenient::opt_i32")]
        pub soil_sens_num: Option<i32>,
        /// Ignored, a plant stays bound to its device
        pub device_mac: Option<String>,
        /// Ignored
        #[serde(default, deserialize_with = "lenient::opt_timestamp")]
        pub registered_at: Option<DateTime<Utc>>,
    }

    impl PlantPatchDto {
        pub fn into_patch(self) -> Result<(String, PlantPatch), ValidationError> {
            let plant_id = self.plant_id.ok_or(ValidationError::Missing("plant_id"))?;
            let patch = PlantPatch {
                name: self.plant_name,
                plant_type: self.plant_type,
                planted_at: self.plant_date,
                poll_interval_secs: self.plant_update_poll,
                polling_enabled: self.update_poll_activated,
                sensor_index: self.soil_sens_num,
                device_mac: self.device_mac,
                registered_at: self.registered_at,
            };
            Ok((plant_id, patch))
        }
    }

    #[derive(Debug, Serialize, Deserialize, ToSchema)]
    pub struct PlantDetailDto {
        #[serde(flatten)]
        pub plant: PlantDao,
        pub job: JobState,
    }

    #[derive(Debug, Serialize, Deserialize, ToSchema)]
    pub struct PlantDeletedDto {
        pub plant_id: String,
    }
}
