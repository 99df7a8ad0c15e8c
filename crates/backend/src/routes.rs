use axum::http::{header, Method};
use axum::{middleware, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};

use crate::handlers;
use crate::state::AppState;
use crate::system::middleware::request_logger;

pub fn configure_routes(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/sync", get(handlers::sync::trigger))
        .route("/sync/status", get(handlers::sync::status))
        .route("/api/products", get(handlers::products::list))
        .layer(middleware::from_fn(request_logger))
        .layer(cors)
        .with_state(state)
}
