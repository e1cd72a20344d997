//! Document number series configuration.
//!
//! A series is one configured consecutive-number sequence, identified by the
//! mapping it numbers (e.g. one per document type per integration).

use serde::{Deserialize, Serialize};

use crate::service::format::pattern_is_well_formed;

/// Configuration for a consecutive document number series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesConfig {
    /// Unique mapping identifier for this series.
    pub mapping_id: String,

    /// Whether new reservations may be created for this series.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Target field name in header records (consumed by transfer workers).
    #[serde(default)]
    pub field_name: String,

    /// Target field name in detail records (consumed by transfer workers).
    #[serde(default)]
    pub detail_field_name: String,

    /// Highest value ever allocated, committed or reserved.
    /// Monotonically non-decreasing for the lifetime of the series.
    #[serde(default)]
    pub last_value: i64,

    /// Highest value reported as consumed to downstream bookkeeping.
    /// Always <= `last_value`.
    #[serde(default)]
    pub consumed_value: i64,

    /// Literal text substituted for `{PREFIX}` in the formatted output.
    #[serde(default)]
    pub prefix: String,

    /// Format template. Empty means the plain zero-padded default
    /// (`{PREFIX}{VALUE:6}`).
    #[serde(default)]
    pub pattern: String,

    /// If true, the consumed marker advances immediately on reservation.
    /// If false, it advances only when the reservation is committed.
    #[serde(default = "default_update_after_transfer")]
    pub update_after_transfer: bool,

    /// Version for optimistic bookkeeping.
    #[serde(default)]
    pub version: u64,

    /// Last update timestamp (milliseconds since epoch).
    #[serde(default)]
    pub updated_at: i64,
}

const fn default_enabled() -> bool {
    true
}

const fn default_update_after_transfer() -> bool {
    true
}

impl SeriesConfig {
    /// Create a new series starting at `start_value`.
    ///
    /// The first reserved value will be `start_value + 1`.
    #[must_use]
    pub fn new(mapping_id: String, start_value: i64) -> Self {
        Self {
            mapping_id,
            enabled: true,
            field_name: String::new(),
            detail_field_name: String::new(),
            last_value: start_value,
            consumed_value: start_value,
            prefix: String::new(),
            pattern: String::new(),
            update_after_transfer: true,
            version: 0,
            updated_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Validate the series configuration.
    ///
    /// Pattern tokens are not fully validated here: unknown placeholders are
    /// rendered verbatim at format time, so only structurally broken patterns
    /// (unclosed braces) are rejected.
    ///
    /// # Errors
    ///
    /// Returns an error message if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.mapping_id.is_empty() {
            return Err("mapping_id cannot be empty".to_string());
        }
        if self.mapping_id.len() > 255 {
            return Err("mapping_id cannot exceed 255 characters".to_string());
        }
        if self.last_value < 0 {
            return Err("last_value cannot be negative".to_string());
        }
        if self.consumed_value > self.last_value {
            return Err("consumed_value cannot exceed last_value".to_string());
        }
        if !pattern_is_well_formed(&self.pattern) {
            return Err(format!("unclosed placeholder in pattern: {}", self.pattern));
        }
        Ok(())
    }

    /// Apply an edit patch from the configuration UI.
    ///
    /// Counter fields are deliberately not patchable; they only move through
    /// the allocator and the ledger.
    pub fn apply(&mut self, patch: &SeriesPatch) {
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(ref field_name) = patch.field_name {
            self.field_name.clone_from(field_name);
        }
        if let Some(ref detail_field_name) = patch.detail_field_name {
            self.detail_field_name.clone_from(detail_field_name);
        }
        if let Some(ref prefix) = patch.prefix {
            self.prefix.clone_from(prefix);
        }
        if let Some(ref pattern) = patch.pattern {
            self.pattern.clone_from(pattern);
        }
        if let Some(update_after_transfer) = patch.update_after_transfer {
            self.update_after_transfer = update_after_transfer;
        }
    }
}

/// Partial update to a series configuration.
///
/// `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeriesPatch {
    /// New enabled flag.
    pub enabled: Option<bool>,
    /// New header field name.
    pub field_name: Option<String>,
    /// New detail field name.
    pub detail_field_name: Option<String>,
    /// New prefix.
    pub prefix: Option<String>,
    /// New format pattern.
    pub pattern: Option<String>,
    /// New update-timing policy.
    pub update_after_transfer: Option<bool>,
}

impl SeriesPatch {
    /// Validate the patch.
    ///
    /// # Errors
    ///
    /// Returns an error message if the patch is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(ref pattern) = self.pattern
            && !pattern_is_well_formed(pattern)
        {
            return Err(format!("unclosed placeholder in pattern: {pattern}"));
        }
        Ok(())
    }
}
