//! Data Transfer Objects for API requests and responses.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Reservation, ReservationStatus};

/// Standard API response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Response code (0 = success, non-zero = error).
    pub code: i32,

    /// Human-readable message.
    pub message: String,

    /// Response data (null on error).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Create a success response.
    pub fn success(data: T) -> Self {
        Self {
            code: 0,
            message: "success".to_string(),
            data: Some(data),
        }
    }

    /// Create an error response.
    pub fn error(code: i32, message: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            code,
            message: message.into(),
            data: None,
        }
    }
}

impl ApiResponse<()> {
    /// Create a success response with no data.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            code: 0,
            message: "success".to_string(),
            data: None,
        }
    }
}

/// Request to reserve the next number of a series.
#[derive(Debug, Clone, Deserialize)]
pub struct ReserveRequest {
    /// Series to allocate from.
    pub mapping_id: String,

    /// Lease duration in seconds. Falls back to the configured default.
    #[serde(default)]
    pub lease_seconds: Option<u64>,
}

impl ReserveRequest {
    /// Validate the request against the configured lease ceiling.
    ///
    /// # Errors
    ///
    /// Returns an error message if the request is invalid.
    pub fn validate(&self, max_lease_seconds: u64) -> Result<(), String> {
        if self.mapping_id.is_empty() {
            return Err("mapping_id is required".to_string());
        }
        if let Some(lease) = self.lease_seconds {
            if lease == 0 {
                return Err("lease_seconds must be at least 1".to_string());
            }
            if lease > max_lease_seconds {
                return Err(format!("lease_seconds cannot exceed {max_lease_seconds}"));
            }
        }
        Ok(())
    }
}

/// A reservation as returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationResponse {
    /// Opaque reservation identifier.
    pub reservation_id: Uuid,

    /// Owning series.
    pub mapping_id: String,

    /// The allocated sequence value.
    pub value: i64,

    /// Pattern-expanded representation.
    pub formatted: String,

    /// Lifecycle state.
    pub status: ReservationStatus,

    /// When the reservation was issued.
    pub created_at: DateTime<Utc>,

    /// End of the lease window.
    pub expires_at: DateTime<Utc>,

    /// Formatting warning, present when the configured pattern was malformed
    /// and the fallback rendering was used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl ReservationResponse {
    /// Build a response from a ledger reservation.
    #[must_use]
    pub fn from_reservation(reservation: Reservation, warning: Option<String>) -> Self {
        Self {
            reservation_id: reservation.reservation_id,
            mapping_id: reservation.mapping_id,
            value: reservation.value,
            formatted: reservation.formatted,
            status: reservation.status,
            created_at: reservation.created_at,
            expires_at: reservation.expires_at,
            warning,
        }
    }
}

/// Result of an expiry sweep across all series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepResponse {
    /// Expired reservation count per series.
    pub expired: BTreeMap<String, usize>,

    /// Total reservations expired in this pass.
    pub total: usize,
}

/// Request to create a new series.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSeriesRequest {
    /// Unique mapping identifier.
    pub mapping_id: String,

    /// Whether the series accepts reservations.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Target field name in header records.
    #[serde(default)]
    pub field_name: String,

    /// Target field name in detail records.
    #[serde(default)]
    pub detail_field_name: String,

    /// Counter starting point; the first reserved value is `start_value + 1`.
    #[serde(default)]
    pub start_value: i64,

    /// Literal prefix text.
    #[serde(default)]
    pub prefix: String,

    /// Format template (empty = `{PREFIX}{VALUE:6}`).
    #[serde(default)]
    pub pattern: String,

    /// Update-timing policy for the consumed marker.
    #[serde(default = "default_true")]
    pub update_after_transfer: bool,
}

const fn default_true() -> bool {
    true
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,

    /// Service version.
    pub version: String,
}

/// Readiness check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyResponse {
    /// Overall readiness status.
    pub ready: bool,

    /// Individual component statuses.
    pub components: ReadyComponents,
}

/// Component readiness statuses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyComponents {
    /// Storage backend status.
    pub storage: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_response_success() {
        let response = ApiResponse::success(vec![1, 2, 3]);
        assert_eq!(response.code, 0);
        assert_eq!(response.message, "success");
        assert_eq!(response.data, Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_api_response_error() {
        let response = ApiResponse::<()>::error(1001, "series not found");
        assert_eq!(response.code, 1001);
        assert_eq!(response.message, "series not found");
        assert!(response.data.is_none());
    }

    #[test]
    fn test_reserve_request_validation() {
        let req = ReserveRequest {
            mapping_id: "invoices".to_string(),
            lease_seconds: Some(300),
        };
        assert!(req.validate(3600).is_ok());

        let req = ReserveRequest {
            mapping_id: String::new(),
            lease_seconds: None,
        };
        assert!(req.validate(3600).is_err());

        let req = ReserveRequest {
            mapping_id: "invoices".to_string(),
            lease_seconds: Some(0),
        };
        assert!(req.validate(3600).is_err());

        let req = ReserveRequest {
            mapping_id: "invoices".to_string(),
            lease_seconds: Some(7200),
        };
        assert!(req.validate(3600).is_err());
    }

    #[test]
    fn test_warning_omitted_when_absent() {
        let reservation = Reservation::new(
            "invoices".to_string(),
            1,
            "INV-000001".to_string(),
            chrono::Duration::seconds(60),
            false,
            Utc::now(),
        );
        let response = ReservationResponse::from_reservation(reservation, None);
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("warning").is_none());
    }
}
