use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::state::AppState;

/// Build the axum router with every ostore resource.
pub fn build_router(state: AppState) -> Router {
    let cors = state.config.cors;
    let router = Router::new()
        .route("/login", post(handler::login))
        .route("/logout", post(handler::logout))
        .route("/get", get(handler::get_by_params).post(handler::get_by_body))
        .route("/set", post(handler::set).put(handler::set))
        .route("/delete", post(handler::delete).delete(handler::delete))
        .route("/query", get(handler::query_by_params).post(handler::query_by_body))
        .route("/v1/health", get(handler::health_handler))
        .route("/v1/info", get(handler::info_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http());
    if cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}
