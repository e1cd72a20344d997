//! Sequence allocator.
//!
//! Hands out unique, monotonically increasing values for a series. The
//! counter advance is a single conditional update against the durable store
//! (optimistic concurrency), retried a bounded number of times with jittered
//! backoff. This is the only place cross-process mutual exclusion happens;
//! everything downstream keys off the reservation id.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use metrics::counter;
use rand::Rng;
use tokio::time::sleep;

use crate::config::ReservationConfig;
use crate::domain::Reservation;
use crate::error::{AppError, Result};
use crate::service::format;
use crate::service::ledger::ReservationLedger;
use crate::storage::traits::SeriesStore;

/// Result of a successful reservation.
#[derive(Debug, Clone)]
pub struct ReserveOutcome {
    /// The registered reservation.
    pub reservation: Reservation,

    /// Present when the configured pattern was malformed and the fallback
    /// rendering was used. Formatting failure never blocks numbering.
    pub warning: Option<String>,
}

/// Service for reserving consecutive document numbers.
pub struct SequenceAllocator {
    /// Storage backend.
    store: Arc<dyn SeriesStore>,
    /// Reservation ledger.
    ledger: Arc<ReservationLedger>,
    /// Bounded attempts for the conditional counter advance.
    max_attempts: u32,
    /// Base backoff between attempts.
    backoff_ms: u64,
    /// Random jitter added to each backoff.
    jitter_ms: u64,
}

impl SequenceAllocator {
    /// Create a new allocator.
    pub fn new(
        store: Arc<dyn SeriesStore>,
        ledger: Arc<ReservationLedger>,
        config: &ReservationConfig,
    ) -> Self {
        Self {
            store,
            ledger,
            max_attempts: config.cas_max_attempts,
            backoff_ms: config.cas_backoff_ms,
            jitter_ms: config.cas_jitter_ms,
        }
    }

    /// Reserve the next value of a series under a lease.
    ///
    /// On success the counter has advanced durably, the reservation is
    /// registered in the ledger as `Active`, and the formatted representation
    /// has been computed. The caller must later commit or cancel; a crashed
    /// caller is handled by lease expiry.
    ///
    /// # Errors
    ///
    /// - `ConfigNotFound` if the series does not exist
    /// - `MappingDisabled` if the series refuses new reservations
    /// - `RetryExhausted` if the conditional update lost the race on every
    ///   bounded attempt; the caller should fail its batch and retry later
    /// - `Storage` on backend failures
    pub async fn reserve_next(
        &self,
        mapping_id: &str,
        lease: chrono::Duration,
    ) -> Result<ReserveOutcome> {
        let config = self
            .store
            .get_config(mapping_id)
            .await
            .map_err(AppError::Storage)?
            .ok_or_else(|| AppError::ConfigNotFound(mapping_id.to_string()))?;

        if !config.enabled {
            return Err(AppError::MappingDisabled(mapping_id.to_string()));
        }

        let value = self.advance_counter(mapping_id, config.last_value).await?;

        // Collision avoidance always advances immediately; only the
        // externally reported consumed marker honors the update-timing
        // policy. Deferred series advance it at commit instead.
        if config.update_after_transfer {
            self.store
                .mark_consumed(mapping_id, value)
                .await
                .map_err(AppError::Storage)?;
        }

        let now = Utc::now();
        let (formatted, warning) =
            match format::format_value(&config.pattern, &config.prefix, value, now.date_naive()) {
                Ok(formatted) => (formatted, None),
                Err(err) => {
                    tracing::warn!(
                        mapping_id,
                        pattern = %config.pattern,
                        error = %err,
                        "Malformed pattern, using fallback rendering"
                    );
                    (
                        format::fallback_format(&config.prefix, value),
                        Some(AppError::InvalidPattern(err).to_string()),
                    )
                }
            };

        let reservation = Reservation::new(
            mapping_id.to_string(),
            value,
            formatted,
            lease,
            !config.update_after_transfer,
            now,
        );
        self.ledger.register(reservation.clone());

        counter!("docnum_reservations_issued_total").increment(1);
        tracing::debug!(
            mapping_id,
            value,
            reservation_id = %reservation.reservation_id,
            "Reserved next value"
        );

        Ok(ReserveOutcome {
            reservation,
            warning,
        })
    }

    /// Atomically take the next integer for a series.
    ///
    /// Retries synchronously under contention; total wall-clock time is
    /// bounded by `max_attempts`, so the caller gets a definitive outcome
    /// instead of a hang.
    async fn advance_counter(&self, mapping_id: &str, first_observed: i64) -> Result<i64> {
        let mut observed = first_observed;

        for attempt in 1..=self.max_attempts {
            let next = observed.checked_add(1).ok_or_else(|| {
                AppError::Internal(format!("counter overflow on series {mapping_id}"))
            })?;

            let won = self
                .store
                .compare_and_swap_last_value(mapping_id, observed, next)
                .await
                .map_err(AppError::Storage)?;

            if won {
                return Ok(next);
            }

            counter!("docnum_cas_conflicts_total").increment(1);

            if attempt == self.max_attempts {
                break;
            }

            sleep(self.backoff_with_jitter(attempt)).await;

            observed = self
                .store
                .get_config(mapping_id)
                .await
                .map_err(AppError::Storage)?
                .ok_or_else(|| AppError::ConfigNotFound(mapping_id.to_string()))?
                .last_value;
        }

        counter!("docnum_retry_exhausted_total").increment(1);
        Err(AppError::RetryExhausted {
            mapping_id: mapping_id.to_string(),
            attempts: self.max_attempts,
        })
    }

    /// Linear backoff plus jitter, to spread contending allocators apart.
    fn backoff_with_jitter(&self, attempt: u32) -> Duration {
        let base = self.backoff_ms.saturating_mul(u64::from(attempt));
        let jitter = if self.jitter_ms == 0 {
            0
        } else {
            rand::rng().random_range(0..=self.jitter_ms)
        };
        Duration::from_millis(base.saturating_add(jitter))
    }
}
