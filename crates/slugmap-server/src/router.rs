use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::handler::{self, AppState};

/// Build the axum router with all slugmap endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(api::GET_ID_PATH, post(handler::get_id_handler))
        .route(api::GET_SLUG_PATH, get(handler::get_slug_handler))
        .route(api::HEALTH_PATH, get(handler::health_handler))
        .route(api::INFO_PATH, get(handler::info_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
