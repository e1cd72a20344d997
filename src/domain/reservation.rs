//! Reservation lifecycle types.
//!
//! A reservation is a leased, not-yet-final allocation of one sequence value.
//! It is created by the allocator and only ever mutated through the ledger's
//! commit, cancel and expiry-sweep operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a reservation.
///
/// `Committed`, `Expired` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    /// Leased to a worker, waiting for commit or cancel.
    Active,
    /// Permanently consumed.
    Committed,
    /// Lease lapsed before the worker resolved it.
    Expired,
    /// Released by the worker. The value is never reissued.
    Cancelled,
}

impl ReservationStatus {
    /// Whether this state is terminal.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Committed => write!(f, "committed"),
            Self::Expired => write!(f, "expired"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A leased allocation of one sequence value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    /// Opaque unique identifier.
    pub reservation_id: Uuid,

    /// Owning series.
    pub mapping_id: String,

    /// The allocated sequence value.
    pub value: i64,

    /// Pattern-expanded representation, computed at allocation time.
    pub formatted: String,

    /// When the reservation was issued.
    pub created_at: DateTime<Utc>,

    /// End of the lease window.
    pub expires_at: DateTime<Utc>,

    /// Lifecycle state.
    pub status: ReservationStatus,

    /// When the reservation reached a terminal state, for audit-window purge.
    pub terminal_at: Option<DateTime<Utc>>,

    /// Whether the series' consumed marker is still waiting on commit.
    /// Captured from `update_after_transfer` at allocation so commit does not
    /// have to re-read the configuration.
    pub defer_consumed: bool,
}

impl Reservation {
    /// Create a new active reservation leased until `now + lease`.
    #[must_use]
    pub fn new(
        mapping_id: String,
        value: i64,
        formatted: String,
        lease: chrono::Duration,
        defer_consumed: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            reservation_id: Uuid::new_v4(),
            mapping_id,
            value,
            formatted,
            created_at: now,
            expires_at: now + lease,
            status: ReservationStatus::Active,
            terminal_at: None,
            defer_consumed,
        }
    }

    /// Whether the lease has lapsed at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == ReservationStatus::Active && self.expires_at < now
    }
}
