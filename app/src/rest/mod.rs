use crate::error::{RegistryError, ValidationError};
use crate::hub::Hub;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

mod device_routes;
mod doc_routes;
mod metric_routes;
mod plant_routes;
mod query;
mod reading_routes;


const MAX_BODY_BYTES: u64 = 16 * 1024;

pub fn routes(hub: &Arc<Hub>) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    device_routes::routes(hub)
        .or(plant_routes::routes(hub))
        .or(reading_routes::routes(hub))
        .or(metric_routes::routes(hub))
        .or(doc_routes::routes())
        .recover(handle_rejection)
}

pub async fn dispatch_server_daemon(hub: Arc<Hub>, addr: SocketAddr) {
    info!("Starting webserver at: {}", addr);
    warp::serve(routes(&hub)).run(addr).await;
}

/// Parses the body ourselves, so malformed payloads end up as
/// `ValidationError` instead of a bare warp rejection
pub(crate) fn json_body<T>() -> impl Filter<Extract = (Result<T, ValidationError>,), Error = Rejection> + Clone
where
    T: DeserializeOwned + Send + 'static,
{
    warp::body::content_length_limit(MAX_BODY_BYTES)
        .and(warp::body::bytes())
        .map(|body: Bytes| {
            serde_json::from_slice::<T>(&body)
                .map_err(|e| ValidationError::Malformed("body", e.to_string()))
        })
}

pub(crate) fn build_response<T: Serialize>(
    resp: Result<T, RegistryError>,
) -> Result<Response, Infallible> {
    let err = match resp {
        Ok(data) => return Ok(warp::reply::json(&data).into_response()),
        Err(err) => err,
    };

    let status = match &err {
        RegistryError::Validation(_) => StatusCode::NOT_ACCEPTABLE,
        RegistryError::UnknownDevice(_) => StatusCode::BAD_REQUEST,
        RegistryError::PlantNotFound(_) | RegistryError::DeviceNotFound(_) => StatusCode::NOT_FOUND,
        RegistryError::IdExhausted(_) | RegistryError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let message = if err.is_user_error() {
        warn!("{}", err);
        err.to_string()
    } else {
        error!("{}", err);
        "Internal server error".to_owned()
    };
    Ok(error_reply(message, status))
}

fn error_reply(message: String, status: StatusCode) -> Response {
    let body = dto::ErrorResponseDto { error: message };
    warp::reply::with_status(warp::reply::json(&body), status).into_response()
}

async fn handle_rejection(rejection: Rejection) -> Result<Response, Infallible> {
    let (message, status) = if rejection.is_not_found() {
        ("Not found".to_owned(), StatusCode::NOT_FOUND)
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        ("Method not allowed".to_owned(), StatusCode::METHOD_NOT_ALLOWED)
    } else if rejection.find::<warp::reject::PayloadTooLarge>().is_some() {
        ("Payload too large".to_owned(), StatusCode::PAYLOAD_TOO_LARGE)
    } else if let Some(e) = rejection.find::<warp::reject::InvalidQuery>() {
        (e.to_string(), StatusCode::NOT_ACCEPTABLE)
    } else {
        warn!("Unhandled rejection: {:?}", rejection);
        ("Bad request".to_owned(), StatusCode::BAD_REQUEST)
    };
    Ok(error_reply(message, status))
}

pub mod dto {
    use serde::{Deserialize, Serialize};
    use utoipa::ToSchema;

    #[derive(Debug, Serialize, Deserialize, ToSchema)]
    pub struct ErrorResponseDto {
        pub error: String,
    }

    #[derive(Debug, Serialize, Deserialize, ToSchema)]
    pub struct PlantIdDto {
        pub plant_id: Option<String>,
    }
}
