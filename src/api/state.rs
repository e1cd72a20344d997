//! Application state for Axum handlers.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use crate::config::AppConfig;
use crate::service::{ExpiryReaper, ReservationLedger, SequenceAllocator};
use crate::storage::traits::SeriesStore;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Storage backend.
    pub storage: Arc<dyn SeriesStore>,
    /// Sequence allocator.
    pub allocator: Arc<SequenceAllocator>,
    /// Reservation ledger.
    pub ledger: Arc<ReservationLedger>,
    /// Expiry reaper.
    pub reaper: Arc<ExpiryReaper>,
    /// Prometheus render handle, when the recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(config: Arc<AppConfig>, storage: Arc<dyn SeriesStore>) -> Self {
        let ledger = Arc::new(ReservationLedger::new(
            Arc::clone(&storage),
            &config.reservation,
        ));

        let allocator = Arc::new(SequenceAllocator::new(
            Arc::clone(&storage),
            Arc::clone(&ledger),
            &config.reservation,
        ));

        let reaper = Arc::new(ExpiryReaper::new(Arc::clone(&ledger), &config.reaper));

        Self {
            config,
            storage,
            allocator,
            ledger,
            reaper,
            metrics: None,
        }
    }

    /// Attach a Prometheus render handle.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
