use super::dto::ErrorResponseDto;
use super::{build_response, json_body};
use crate::device::DeviceAnnouncement;
use crate::error::{RegistryError, ValidationError};
use crate::hub::Hub;
use crate::models::DeviceDao;
use dto::{DeviceAnnounceDto, UpsertResponseDto};
use std::sync::Arc;
use warp::Filter;

pub fn routes(hub: &Arc<Hub>) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    announce_device(hub.clone())
        .or(list_devices(hub.clone()))
        .or(device_detail(hub.clone()))
}

/// POST /api/device
///
/// Called by a node after joining the network. Jobs of its plants follow
/// a changed address.
///
/// Returns whether the device was created, updated or left unchanged
#[utoipa::path(
    post,
    path = "/api/device",
    tag = "device",
    request_body = DeviceAnnounceDto,
    responses(
        (status = 200, body = UpsertResponseDto),
        (status = 406, description = "Missing or malformed field", body = ErrorResponseDto)
    )
)]
pub(super) fn announce_device(
    hub: Arc<Hub>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || hub.clone())
        .and(warp::path!("api" / "device"))
        .and(warp::post())
        .and(json_body())
        .and_then(
            |hub: Arc<Hub>, body: Result<dto::DeviceAnnounceDto, ValidationError>| async move {
                let resp = match body.and_then(DeviceAnnouncement::try_from) {
                    Ok(announcement) => {
                        let mac = announcement.mac.clone();
                        hub.announce_device(announcement)
                            .await
                            .map(|status| dto::UpsertResponseDto {
                                mac: crate::device::normalize_mac(&mac),
                                status,
                            })
                    }
                    Err(e) => Err(RegistryError::from(e)),
                };
                build_response(resp)
            },
        )
        .boxed()
}

/// GET /api/device
///
/// Returns all known devices
#[utoipa::path(
    get,
    path = "/api/device",
    tag = "device",
    responses((status = 200, body = Vec<DeviceDao>))
)]
pub(super) fn list_devices(
    hub: Arc<Hub>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || hub.clone())
        .and(warp::path!("api" / "device"))
        .and(warp::get())
        .and_then(|hub: Arc<Hub>| async move {
            let resp = hub.devices.list().await;
            build_response(resp)
        })
        .boxed()
}

/// GET /api/device/:mac
#[utoipa::path(
    get,
    path = "/api/device/{mac}",
    tag = "device",
    params(("mac" = String, Path, description = "Hardware address, `:` or `-` separated")),
    responses(
        (status = 200, body = DeviceDao),
        (status = 404, body = ErrorResponseDto)
    )
)]
pub(super) fn device_detail(
    hub: Arc<Hub>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || hub.clone())
        .and(warp::path!("api" / "device" / String))
        .and(warp::get())
        .and_then(|hub: Arc<Hub>, mac: String| async move {
            let resp = hub.devices.lookup(&mac).await;
            build_response(resp)
        })
        .boxed()
}

///
/// DTO
///
pub mod dto {
    use crate::device::{DeviceAnnouncement, Upsert};
    use crate::error::ValidationError;
    use serde::{Deserialize, Serialize};
    use sprout_core::lenient;
    use utoipa::ToSchema;

    #[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
    pub struct DeviceAnnounceDto {
        pub dev_type: Option<String>,
        pub dev_mac_addr: Option<String>,
        pub session_ip: Option<String>,
        #[serde(default, deserialize_with = "lenient::opt_i32_list")]
        pub sensors_detected: Option<Vec<i32>>,
    }

    impl TryFrom<DeviceAnnounceDto> for DeviceAnnouncement {
        type Error = ValidationError;

        fn try_from(dto: DeviceAnnounceDto) -> Result<Self, Self::Error> {
            Ok(DeviceAnnouncement {
                mac: dto.dev_mac_addr.ok_or(ValidationError::Missing("dev_mac_addr"))?,
                dev_type: dto.dev_type.ok_or(ValidationError::Missing("dev_type"))?,
                address: dto.session_ip.ok_or(ValidationError::Missing("session_ip"))?,
                capabilities: dto.sensors_detected.unwrap_or_default(),
            })
        }
    }

    #[derive(Debug, Serialize, Deserialize, ToSchema)]
    pub struct UpsertResponseDto {
        pub mac: String,
        pub status: Upsert,
    }
}
