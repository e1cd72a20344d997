//! Expiry reaper.
//!
//! Periodic driver that sweeps lapsed reservations into the expired state.
//! The sweep itself is a pure ledger operation with an injected clock; this
//! type only supplies the schedule, so tests can drive sweeps directly.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use metrics::counter;
use parking_lot::Mutex;

use crate::config::ReaperConfig;
use crate::service::ledger::ReservationLedger;

/// Outcome of one full sweep pass.
#[derive(Debug, Clone)]
pub struct SweepSummary {
    /// Number of series examined.
    pub mappings_swept: usize,

    /// Total reservations expired in this pass.
    pub reservations_expired: usize,

    /// Expiry counts per series.
    pub per_mapping: BTreeMap<String, usize>,
}

/// Periodic expiry driver.
pub struct ExpiryReaper {
    /// Reservation ledger to sweep.
    ledger: Arc<ReservationLedger>,
    /// Sweep interval.
    interval: Duration,
    /// Gate so a manual sweep and the timer never overlap.
    sweep_gate: Mutex<()>,
}

impl ExpiryReaper {
    /// Create a new reaper.
    pub fn new(ledger: Arc<ReservationLedger>, config: &ReaperConfig) -> Self {
        Self {
            ledger,
            interval: Duration::from_secs(config.interval_seconds),
            sweep_gate: Mutex::new(()),
        }
    }

    /// Run one sweep pass across every series.
    ///
    /// Each series is swept independently, so one series' reservations never
    /// keep another series from being examined.
    pub fn run_once(&self) -> SweepSummary {
        let _guard = self.sweep_gate.lock();
        let now = Utc::now();

        let per_mapping = self.ledger.sweep_all(now);
        let reservations_expired = per_mapping.values().sum();

        let summary = SweepSummary {
            mappings_swept: per_mapping.len(),
            reservations_expired,
            per_mapping,
        };

        if reservations_expired > 0 {
            counter!("docnum_reservations_expired_total")
                .increment(reservations_expired as u64);
        }

        tracing::info!(
            mappings = summary.mappings_swept,
            expired = summary.reservations_expired,
            "Expiry sweep complete"
        );

        summary
    }

    /// Drive sweeps on the configured interval.
    ///
    /// The first tick fires immediately, so startup always begins with a
    /// sweep of whatever survived the previous process.
    pub async fn run(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.interval);

        loop {
            ticker.tick().await;
            self.run_once();
        }
    }
}
