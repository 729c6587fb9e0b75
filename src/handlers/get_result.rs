// GET /results/{id} handler

use crate::models::{DeliveryResult, ErrorResponse};
use crate::storage::{ResultRepository, StorageError};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, error};
use warp::http::StatusCode;

pub async fn get_result_handler(
    id: String,
    repository: Arc<dyn ResultRepository>,
) -> Result<impl warp::Reply, Infallible> {
    debug!(id = %id, "GET /results");

    let reply = match repository.get_result(&id).await {
        Ok(delivery_time) => warp::reply::with_status(
            warp::reply::json(&DeliveryResult { id, delivery_time }),
            StatusCode::OK,
        ),
        Err(e @ StorageError::NotFound { .. }) => warp::reply::with_status(
            warp::reply::json(&ErrorResponse { error: e.to_string() }),
            StatusCode::NOT_FOUND,
        ),
        Err(e) => {
            error!(id = %id, error = %e, "result lookup failed");
            warp::reply::with_status(
                warp::reply::json(&ErrorResponse {
                    error: "internal error".to_string(),
                }),
                StatusCode::INTERNAL_SERVER_ERROR,
            )
        }
    };

    Ok(reply)
}
