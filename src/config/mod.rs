//! Configuration management module.
//!
//! Supports loading configuration from:
//! - TOML files (config/default.toml, config/{profile}.toml)
//! - Environment variables with `DOCNUM_WORKER__<SECTION>__<KEY>` pattern

mod server;
mod storage;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub use server::ServerConfig;
pub use storage::{FileStorageConfig, PostgresStorageConfig, StorageBackend, StorageConfig};

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// HTTP server configuration.
    pub server: ServerConfig,

    /// Storage backend configuration.
    pub storage: StorageConfig,

    /// Reservation and counter-advance configuration.
    pub reservation: ReservationConfig,

    /// Expiry reaper configuration.
    pub reaper: ReaperConfig,

    /// Observability configuration.
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load configuration from files and environment.
    ///
    /// Configuration is loaded in the following order (later sources override
    /// earlier):
    /// 1. `config/default.toml`
    /// 2. `config/{DOCNUM_PROFILE}.toml` (if `DOCNUM_PROFILE` is set)
    /// 3. Environment variables with `DOCNUM_WORKER__` prefix
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded or is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let profile = std::env::var("DOCNUM_PROFILE").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{profile}")).required(false))
            // DOCNUM_WORKER__SERVER__PORT=8080 -> server.port = 8080
            .add_source(
                Environment::with_prefix("DOCNUM_WORKER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let app_config: Self = config.try_deserialize()?;
        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Message("server.port cannot be 0".to_string()));
        }

        self.storage.validate()?;

        if self.reservation.cas_max_attempts == 0 {
            return Err(ConfigError::Message(
                "reservation.cas_max_attempts cannot be 0".to_string(),
            ));
        }
        if self.reservation.default_lease_seconds == 0 {
            return Err(ConfigError::Message(
                "reservation.default_lease_seconds cannot be 0".to_string(),
            ));
        }
        if self.reservation.max_lease_seconds < self.reservation.default_lease_seconds {
            return Err(ConfigError::Message(
                "reservation.max_lease_seconds cannot be below the default lease".to_string(),
            ));
        }
        if self.reaper.interval_seconds == 0 {
            return Err(ConfigError::Message(
                "reaper.interval_seconds cannot be 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Reservation and counter-advance configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReservationConfig {
    /// Default lease duration for new reservations, in seconds.
    #[serde(default = "default_lease_seconds")]
    pub default_lease_seconds: u64,

    /// Upper bound callers may request for a lease, in seconds.
    #[serde(default = "default_max_lease_seconds")]
    pub max_lease_seconds: u64,

    /// How long terminal reservations stay visible for idempotent retries,
    /// in seconds.
    #[serde(default = "default_retention_seconds")]
    pub retention_seconds: u64,

    /// Bounded attempts for the conditional counter advance.
    #[serde(default = "default_cas_max_attempts")]
    pub cas_max_attempts: u32,

    /// Base backoff between attempts, in milliseconds.
    #[serde(default = "default_cas_backoff_ms")]
    pub cas_backoff_ms: u64,

    /// Random jitter added to each backoff, in milliseconds.
    #[serde(default = "default_cas_jitter_ms")]
    pub cas_jitter_ms: u64,
}

const fn default_lease_seconds() -> u64 {
    300
}

const fn default_max_lease_seconds() -> u64 {
    3600
}

const fn default_retention_seconds() -> u64 {
    300
}

const fn default_cas_max_attempts() -> u32 {
    5
}

const fn default_cas_backoff_ms() -> u64 {
    5
}

const fn default_cas_jitter_ms() -> u64 {
    10
}

impl Default for ReservationConfig {
    fn default() -> Self {
        Self {
            default_lease_seconds: 300,
            max_lease_seconds: 3600,
            retention_seconds: 300,
            cas_max_attempts: 5,
            cas_backoff_ms: 5,
            cas_jitter_ms: 10,
        }
    }
}

/// Expiry reaper configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReaperConfig {
    /// Whether the background reaper task runs.
    #[serde(default = "default_reaper_enabled")]
    pub enabled: bool,

    /// Sweep interval in seconds.
    #[serde(default = "default_reaper_interval")]
    pub interval_seconds: u64,
}

const fn default_reaper_enabled() -> bool {
    true
}

const fn default_reaper_interval() -> u64 {
    300
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: 300,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format: "text" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Enable the Prometheus metrics recorder.
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

const fn default_metrics_enabled() -> bool {
    true
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            metrics_enabled: true,
        }
    }
}
