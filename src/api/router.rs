//! Router setup and configuration.

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use tower_http::trace::TraceLayer;

use crate::api::handlers::{health, reservation, series};
use crate::api::state::AppState;

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    // Health and metrics routes
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/metrics", get(health::metrics));

    // Series configuration routes (consumed by the external config UI)
    let series_routes = Router::new()
        .route("/", post(series::create))
        .route("/", get(series::get))
        .route("/", put(series::update))
        .route("/", delete(series::delete))
        .route("/list", get(series::list));

    // Reservation routes (consumed by transfer workers)
    let reservation_routes = Router::new()
        .route("/", post(reservation::reserve))
        .route("/sweep", post(reservation::sweep))
        .route("/{id}", get(reservation::get))
        .route("/{id}/commit", post(reservation::commit))
        .route("/{id}/cancel", post(reservation::cancel));

    // Combine all routes
    Router::new()
        .merge(health_routes)
        .nest("/v1/series", series_routes)
        .nest("/v1/reservations", reservation_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
