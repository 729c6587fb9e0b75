// GET / handler

use crate::models::StatusResponse;
use std::convert::Infallible;

pub async fn status_handler() -> Result<impl warp::Reply, Infallible> {
    let response = StatusResponse {
        message: "Delivery gateway is running.".to_string(),
    };

    Ok(warp::reply::json(&response))
}
