//! Domain models for the document numbering service.
//!
//! This module contains the core domain types representing number series,
//! reservations, and API contracts.

pub mod dto;
pub mod reservation;
pub mod series;

pub use dto::{
    ApiResponse, CreateSeriesRequest, HealthResponse, ReadyComponents, ReadyResponse,
    ReservationResponse, ReserveRequest, SweepResponse,
};
pub use reservation::{Reservation, ReservationStatus};
pub use series::{SeriesConfig, SeriesPatch};
