// Route definitions

use crate::handlers;
use crate::storage::ResultRepository;
use std::sync::Arc;
use warp::Filter;

pub fn configure_routes(
    repository: Arc<dyn ResultRepository>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let api = warp::path("api").and(warp::path("v1"));

    // GET /
    let status = warp::path::end()
        .and(warp::get())
        .and_then(handlers::status_handler);

    // GET /api/v1/results/{id}
    let get_result = api
        .and(warp::path("results"))
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(warp::get())
        .and(with_repository(repository))
        .and_then(handlers::get_result_handler);

    // Combine routes
    status.or(get_result)
}

fn with_repository(
    repository: Arc<dyn ResultRepository>,
) -> impl Filter<Extract = (Arc<dyn ResultRepository>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || Arc::clone(&repository))
}
