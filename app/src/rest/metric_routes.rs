use super::build_response;
use crate::hub::Hub;
use crate::scheduler::JobSnapshot;
use dto::HealthyDto;
use std::sync::Arc;
use warp::Filter;

pub fn routes(hub: &Arc<Hub>) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    health(hub.clone()).or(jobs(hub.clone()))
}

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "metric",
    responses((status = 200, body = HealthyDto))
)]
pub(super) fn health(
    hub: Arc<Hub>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || hub.clone())
        .and(warp::path!("api" / "health"))
        .and(warp::get())
        .and_then(|hub: Arc<Hub>| async move {
            let db = hub.check_db().await;
            let ret = HealthyDto {
                healthy: db.is_ok(),
                version: sprout_core::CORE_VERSION.to_owned(),
                database_state: match db {
                    Ok(_) => "healthy".to_owned(),
                    Err(e) => e.to_string(),
                },
                device_count: hub.devices.list().await.map(|d| d.len()).unwrap_or_default(),
                plant_count: hub.plants.list().await.map(|p| p.len()).unwrap_or_default(),
                scheduled_jobs: hub.scheduler.len(),
            };
            build_response(Ok(ret))
        })
        .boxed()
}

/// GET /api/jobs
///
/// Snapshot of all live poll jobs with their firing statistics
#[utoipa::path(
    get,
    path = "/api/jobs",
    tag = "metric",
    responses((status = 200, body = Vec<JobSnapshot>))
)]
pub(super) fn jobs(
    hub: Arc<Hub>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || hub.clone())
        .and(warp::path!("api" / "jobs"))
        .and(warp::get())
        .and_then(|hub: Arc<Hub>| async move { build_response(Ok(hub.scheduler.jobs())) })
        .boxed()
}

pub mod dto {
    use serde::{Deserialize, Serialize};
    use utoipa::ToSchema;

    #[derive(Debug, Serialize, Deserialize, ToSchema)]
    pub struct HealthyDto {
        pub healthy: bool,
        pub version: String,
        pub database_state: String,
        pub device_count: usize,
        pub plant_count: usize,
        pub scheduled_jobs: usize,
    }
}
