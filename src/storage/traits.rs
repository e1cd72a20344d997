//! Storage trait definitions.
//!
//! These traits define the interface for storage backends, enabling swapping
//! between different implementations without changing business logic.

use async_trait::async_trait;

use crate::domain::{SeriesConfig, SeriesPatch};
use crate::error::StorageResult;

/// Durable series storage operations.
///
/// The counter advance is the single point that needs cross-process mutual
/// exclusion, expressed here as an atomic conditional update so that it works
/// when allocators run in separate processes.
#[async_trait]
pub trait SeriesStore: Send + Sync {
    /// Save a series configuration, overwriting any existing record.
    async fn save_config(&self, config: &SeriesConfig) -> StorageResult<()>;

    /// Get a series configuration by mapping id.
    async fn get_config(&self, mapping_id: &str) -> StorageResult<Option<SeriesConfig>>;

    /// List all series configurations.
    async fn list_configs(&self) -> StorageResult<Vec<SeriesConfig>>;

    /// Apply an edit patch to a series configuration.
    ///
    /// Returns the updated record. Counter fields are not patchable.
    async fn update_config(
        &self,
        mapping_id: &str,
        patch: &SeriesPatch,
    ) -> StorageResult<SeriesConfig>;

    /// Delete a series configuration.
    ///
    /// Returns whether a record existed.
    async fn delete_config(&self, mapping_id: &str) -> StorageResult<bool>;

    /// Atomically advance `last_value` from `expected` to `new`.
    ///
    /// Returns `true` if the stored value matched `expected` and was
    /// replaced, `false` if another allocator won the race. A `false` return
    /// is not an error; the caller re-reads and retries.
    async fn compare_and_swap_last_value(
        &self,
        mapping_id: &str,
        expected: i64,
        new: i64,
    ) -> StorageResult<bool>;

    /// Advance the externally reported consumed marker to at least `value`.
    ///
    /// Monotonic: a lower `value` than the stored marker is a no-op.
    async fn mark_consumed(&self, mapping_id: &str, value: i64) -> StorageResult<()>;

    /// Check if the storage backend is healthy and reachable.
    async fn health_check(&self) -> StorageResult<()>;

    /// Get the storage backend name.
    fn backend_name(&self) -> &'static str;
}
