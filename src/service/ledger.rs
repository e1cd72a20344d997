//! Reservation ledger.
//!
//! Tracks in-flight reservations from allocation until commit, cancel or
//! expiry. Entries are keyed by reservation id, so operations on different
//! reservations never contend; the only cross-process state is the durable
//! counter owned by the allocator.
//!
//! Terminal reservations are retained for a bounded audit window so that
//! late, duplicate commit/cancel calls resolve idempotently instead of
//! erroring as not-found.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use metrics::counter;
use uuid::Uuid;

use crate::config::ReservationConfig;
use crate::domain::{Reservation, ReservationStatus};
use crate::error::{AppError, Result};
use crate::storage::traits::SeriesStore;

/// In-memory ledger of reservations across all series.
pub struct ReservationLedger {
    /// Storage backend, used to advance the deferred consumed marker.
    store: Arc<dyn SeriesStore>,
    /// Reservations by id.
    entries: DashMap<Uuid, Reservation>,
    /// How long terminal reservations stay visible.
    retention: chrono::Duration,
}

impl ReservationLedger {
    /// Create a new ledger.
    pub fn new(store: Arc<dyn SeriesStore>, config: &ReservationConfig) -> Self {
        Self {
            store,
            entries: DashMap::new(),
            retention: chrono::Duration::seconds(i64::try_from(config.retention_seconds).unwrap_or(i64::MAX)),
        }
    }

    /// Register a freshly allocated reservation.
    pub fn register(&self, reservation: Reservation) {
        self.entries
            .insert(reservation.reservation_id, reservation);
    }

    /// Look up a reservation by id.
    #[must_use]
    pub fn lookup(&self, id: &Uuid) -> Option<Reservation> {
        self.entries.get(id).map(|entry| entry.value().clone())
    }

    /// Permanently consume a reservation.
    ///
    /// Idempotent: committing an already-committed reservation is a no-op
    /// success, so retry-safe callers can repeat the call.
    ///
    /// # Errors
    ///
    /// Returns `ReservationNotFound` for an unknown id and `InvalidState`
    /// when the reservation has already expired or been cancelled; in either
    /// of those states the caller's value may no longer be valid, which is
    /// reported rather than ignored.
    pub async fn commit(&self, id: &Uuid) -> Result<Reservation> {
        let (snapshot, needs_mark) = {
            let mut entry = self
                .entries
                .get_mut(id)
                .ok_or_else(|| AppError::ReservationNotFound(id.to_string()))?;

            match entry.status {
                ReservationStatus::Expired | ReservationStatus::Cancelled => {
                    return Err(AppError::InvalidState {
                        reservation_id: id.to_string(),
                        status: entry.status,
                        operation: "commit",
                    });
                }
                ReservationStatus::Active => {
                    entry.status = ReservationStatus::Committed;
                    entry.terminal_at = Some(Utc::now());
                    counter!("docnum_reservations_committed_total").increment(1);
                }
                ReservationStatus::Committed => {}
            }

            (entry.value().clone(), entry.defer_consumed)
        };

        // Deferred-mode bookkeeping advances at commit time. The flag is
        // cleared only once the marker write succeeds, so a retried commit
        // after a storage failure picks the marker update back up.
        if needs_mark {
            self.store
                .mark_consumed(&snapshot.mapping_id, snapshot.value)
                .await
                .map_err(AppError::Storage)?;

            if let Some(mut entry) = self.entries.get_mut(id) {
                entry.defer_consumed = false;
            }
        }

        Ok(snapshot)
    }

    /// Release a reservation without consuming it.
    ///
    /// The value is not returned to the pool; gaps are acceptable,
    /// duplicates are not. Idempotent on already-cancelled reservations.
    ///
    /// # Errors
    ///
    /// Returns `ReservationNotFound` for an unknown id and `InvalidState`
    /// when the reservation is already committed or expired.
    pub fn cancel(&self, id: &Uuid) -> Result<Reservation> {
        let mut entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| AppError::ReservationNotFound(id.to_string()))?;

        match entry.status {
            ReservationStatus::Active => {
                entry.status = ReservationStatus::Cancelled;
                entry.terminal_at = Some(Utc::now());
                counter!("docnum_reservations_cancelled_total").increment(1);
                Ok(entry.value().clone())
            }
            ReservationStatus::Cancelled => Ok(entry.value().clone()),
            ReservationStatus::Committed | ReservationStatus::Expired => {
                Err(AppError::InvalidState {
                    reservation_id: id.to_string(),
                    status: entry.status,
                    operation: "cancel",
                })
            }
        }
    }

    /// Expire every active reservation of one series whose lease has lapsed
    /// at `now`. Returns the number of reservations expired.
    pub fn sweep_mapping(&self, mapping_id: &str, now: DateTime<Utc>) -> usize {
        let mut expired = 0;

        for mut entry in self.entries.iter_mut() {
            if entry.mapping_id == mapping_id && entry.is_expired(now) {
                entry.status = ReservationStatus::Expired;
                entry.terminal_at = Some(now);
                expired += 1;
            }
        }

        expired
    }

    /// Sweep every series and purge terminal reservations older than the
    /// audit retention window. Returns per-series expiry counts.
    ///
    /// Never errors on an empty set; an idle ledger sweeps to an empty map.
    pub fn sweep_all(&self, now: DateTime<Utc>) -> BTreeMap<String, usize> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for mapping_id in self.mapping_ids() {
            let expired = self.sweep_mapping(&mapping_id, now);
            counts.insert(mapping_id, expired);
        }

        self.purge_aged(now);
        counts
    }

    /// Series ids currently present in the ledger.
    #[must_use]
    pub fn mapping_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .entries
            .iter()
            .map(|entry| entry.mapping_id.clone())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Number of active reservations for one series.
    #[must_use]
    pub fn active_count(&self, mapping_id: &str) -> usize {
        self.entries
            .iter()
            .filter(|entry| {
                entry.mapping_id == mapping_id && entry.status == ReservationStatus::Active
            })
            .count()
    }

    /// Drop terminal reservations past the retention window.
    fn purge_aged(&self, now: DateTime<Utc>) {
        let retention = self.retention;
        self.entries
            .retain(|_, entry| entry.terminal_at.is_none_or(|t| now - t < retention));
    }
}
