pub mod handlers;
pub mod implementations;
pub mod models;
pub mod repository;
pub mod schemas;

use axum::{
    Router,
    routing::{get, post},
};

use crate::utilities::app_state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v2/components/search", post(handlers::search_components))
        .route(
            "/api/v2/components/versions",
            post(handlers::get_component_versions),
        )
        .route("/api/v2/echo", post(handlers::echo))
        .route("/health", get(handlers::health))
}
