//! Reservation handlers.
//!
//! The surface transfer workers call: reserve, commit, cancel, lookup and
//! sweep.

use axum::{
    Json,
    extract::{Path, State},
};
use uuid::Uuid;

use crate::api::state::AppState;
use crate::domain::{ApiResponse, ReservationResponse, ReserveRequest, SweepResponse};
use crate::error::{AppError, Result};

/// Reserve the next value of a series.
pub async fn reserve(
    State(state): State<AppState>,
    Json(req): Json<ReserveRequest>,
) -> Result<Json<ApiResponse<ReservationResponse>>> {
    let max_lease = state.config.reservation.max_lease_seconds;
    req.validate(max_lease).map_err(AppError::BadRequest)?;

    let lease_seconds = req
        .lease_seconds
        .unwrap_or(state.config.reservation.default_lease_seconds);
    let lease = chrono::Duration::seconds(i64::try_from(lease_seconds).unwrap_or(i64::MAX));

    let outcome = state.allocator.reserve_next(&req.mapping_id, lease).await?;

    Ok(Json(ApiResponse::success(
        ReservationResponse::from_reservation(outcome.reservation, outcome.warning),
    )))
}

/// Look up a reservation by id.
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ReservationResponse>>> {
    let reservation = state
        .ledger
        .lookup(&id)
        .ok_or_else(|| AppError::ReservationNotFound(id.to_string()))?;

    Ok(Json(ApiResponse::success(
        ReservationResponse::from_reservation(reservation, None),
    )))
}

/// Permanently consume a reservation.
pub async fn commit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ReservationResponse>>> {
    let reservation = state.ledger.commit(&id).await?;

    Ok(Json(ApiResponse::success(
        ReservationResponse::from_reservation(reservation, None),
    )))
}

/// Release a reservation without consuming it.
pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ReservationResponse>>> {
    let reservation = state.ledger.cancel(&id)?;

    Ok(Json(ApiResponse::success(
        ReservationResponse::from_reservation(reservation, None),
    )))
}

/// Sweep expired reservations across every series.
pub async fn sweep(State(state): State<AppState>) -> Json<ApiResponse<SweepResponse>> {
    let summary = state.reaper.run_once();

    Json(ApiResponse::success(SweepResponse {
        total: summary.reservations_expired,
        expired: summary.per_mapping,
    }))
}
