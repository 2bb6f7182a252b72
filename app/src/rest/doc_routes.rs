use super::{device_routes, metric_routes, plant_routes, reading_routes};
use std::sync::Arc;
use utoipa::OpenApi;
use warp::Filter;

#[derive(OpenApi)]
#[openapi(
    info(title = "sprout", description = "Plant telemetry hub"),
    paths(
        device_routes::announce_device,
        device_routes::list_devices,
        device_routes::device_detail,
        plant_routes::create_plant,
        plant_routes::list_plants,
        plant_routes::plant_detail,
        plant_routes::update_plant,
        plant_routes::delete_plant,
        reading_routes::push_reading,
        reading_routes::plant_readings,
        reading_routes::delete_readings,
        metric_routes::health,
        metric_routes::jobs,
    ),
    components(schemas(
        super::dto::ErrorResponseDto,
        super::dto::PlantIdDto,
        device_routes::dto::DeviceAnnounceDto,
        device_routes::dto::UpsertResponseDto,
        plant_routes::dto::PlantCreateDto,
        plant_routes::dto::PlantPatchDto,
        plant_routes::dto::PlantDetailDto,
        plant_routes::dto::PlantDeletedDto,
        reading_routes::dto::ReadingPushDto,
        reading_routes::dto::ReadingsDeletedDto,
        metric_routes::dto::HealthyDto,
        crate::device::Upsert,
        crate::models::DeviceDao,
        crate::models::PlantDao,
        crate::models::ReadingDao,
        crate::scheduler::JobSnapshot,
        crate::scheduler::JobState,
        sprout_core::RawReading,
    )),
    tags(
        (name = "device", description = "Sensor nodes announcing themselves"),
        (name = "plant", description = "Plant definitions and their polling"),
        (name = "reading", description = "Collected sensor readings"),
        (name = "metric", description = "Health and scheduler state"),
    )
)]
struct ApiDoc;

/// GET /api/doc/api.json
pub fn routes() -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let api = Arc::new(ApiDoc::openapi());
    warp::path!("api" / "doc" / "api.json")
        .and(warp::get())
        .map(move || warp::reply::json(api.as_ref()))
        .boxed()
}
