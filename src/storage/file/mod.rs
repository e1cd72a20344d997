//! File-based storage backend.
//!
//! Stores one JSON document per series with file locking for atomic
//! read-modify-write cycles. Suitable for development and single-node
//! deployments.
//!
//! Directory structure:
//! ```text
//! data/
//! └── series/
//!     └── {mapping_id}.json
//! ```

use std::path::PathBuf;

use async_trait::async_trait;
use fs2::FileExt;
use tokio::sync::Mutex;

use crate::config::FileStorageConfig;
use crate::domain::{SeriesConfig, SeriesPatch};
use crate::error::{StorageError, StorageResult};
use crate::storage::traits::SeriesStore;

/// File-based series storage implementation.
pub struct FileSeriesStore {
    /// Base data directory.
    base_dir: PathBuf,
    /// Directory for series documents.
    series_dir: PathBuf,
    /// Mutex for coordinating file operations within this process.
    lock: Mutex<()>,
}

impl FileSeriesStore {
    /// Create a new file series store.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directories cannot be created.
    pub fn new(config: &FileStorageConfig) -> StorageResult<Self> {
        let base_dir = config.data_dir.clone();
        let series_dir = base_dir.join("series");

        for dir in [&base_dir, &series_dir] {
            std::fs::create_dir_all(dir).map_err(|e| {
                StorageError::FileIO(format!("Failed to create directory {dir:?}: {e}"))
            })?;
        }

        Ok(Self {
            base_dir,
            series_dir,
            lock: Mutex::new(()),
        })
    }

    /// Get the file path for a series.
    fn series_path(&self, mapping_id: &str) -> PathBuf {
        self.series_dir
            .join(format!("{}.json", sanitize_name(mapping_id)))
    }

    /// Read a series document under a shared lock.
    fn read_config_locked(&self, mapping_id: &str) -> StorageResult<Option<SeriesConfig>> {
        let path = self.series_path(mapping_id);

        if !path.exists() {
            return Ok(None);
        }

        let file = std::fs::File::open(&path)?;
        file.lock_shared()
            .map_err(|e| StorageError::LockFailed(e.to_string()))?;

        let config: SeriesConfig = serde_json::from_reader(&file)?;
        file.unlock()
            .map_err(|e| StorageError::LockFailed(e.to_string()))?;

        Ok(Some(config))
    }

    /// Write a series document under an exclusive lock.
    fn write_config_locked(&self, config: &SeriesConfig) -> StorageResult<()> {
        let path = self.series_path(&config.mapping_id);

        let file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;

        file.lock_exclusive()
            .map_err(|e| StorageError::LockFailed(e.to_string()))?;

        serde_json::to_writer_pretty(&file, config)?;
        file.sync_all()?;
        file.unlock()
            .map_err(|e| StorageError::LockFailed(e.to_string()))?;

        Ok(())
    }

    /// Atomically update a series document.
    ///
    /// The closure decides whether to write: `Ok(true)` persists the mutated
    /// state (bumping version and timestamp), `Ok(false)` leaves the file
    /// untouched. Either way the current state is returned.
    fn update_config_file<F>(&self, mapping_id: &str, update_fn: F) -> StorageResult<(SeriesConfig, bool)>
    where
        F: FnOnce(&mut SeriesConfig) -> bool,
    {
        let path = self.series_path(mapping_id);

        if !path.exists() {
            return Err(StorageError::NotFound(format!(
                "Series '{mapping_id}' not found"
            )));
        }

        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)?;

        file.lock_exclusive()
            .map_err(|e| StorageError::LockFailed(e.to_string()))?;

        let mut config: SeriesConfig = serde_json::from_reader(&file)?;

        let written = update_fn(&mut config);

        if written {
            config.version += 1;
            config.updated_at = chrono::Utc::now().timestamp_millis();

            // Write back (seek to beginning and truncate first)
            use std::io::{Seek, SeekFrom, Write};
            let mut file = &file;
            file.seek(SeekFrom::Start(0))?;
            file.set_len(0)?;

            let json = serde_json::to_string_pretty(&config)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }

        file.unlock()
            .map_err(|e| StorageError::LockFailed(e.to_string()))?;

        Ok((config, written))
    }
}

#[async_trait]
impl SeriesStore for FileSeriesStore {
    async fn save_config(&self, config: &SeriesConfig) -> StorageResult<()> {
        let _guard = self.lock.lock().await;
        self.write_config_locked(config)
    }

    async fn get_config(&self, mapping_id: &str) -> StorageResult<Option<SeriesConfig>> {
        let _guard = self.lock.lock().await;
        self.read_config_locked(mapping_id)
    }

    async fn list_configs(&self) -> StorageResult<Vec<SeriesConfig>> {
        let _guard = self.lock.lock().await;

        let mut configs = Vec::new();
        for entry in std::fs::read_dir(&self.series_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }

            let file = std::fs::File::open(&path)?;
            file.lock_shared()
                .map_err(|e| StorageError::LockFailed(e.to_string()))?;
            let config: SeriesConfig = serde_json::from_reader(&file)?;
            file.unlock()
                .map_err(|e| StorageError::LockFailed(e.to_string()))?;

            configs.push(config);
        }

        configs.sort_by(|a, b| a.mapping_id.cmp(&b.mapping_id));
        Ok(configs)
    }

    async fn update_config(
        &self,
        mapping_id: &str,
        patch: &SeriesPatch,
    ) -> StorageResult<SeriesConfig> {
        let _guard = self.lock.lock().await;

        let (config, _) = self.update_config_file(mapping_id, |config| {
            config.apply(patch);
            true
        })?;

        Ok(config)
    }

    async fn delete_config(&self, mapping_id: &str) -> StorageResult<bool> {
        let _guard = self.lock.lock().await;

        let path = self.series_path(mapping_id);
        if !path.exists() {
            return Ok(false);
        }

        std::fs::remove_file(&path)?;
        Ok(true)
    }

    async fn compare_and_swap_last_value(
        &self,
        mapping_id: &str,
        expected: i64,
        new: i64,
    ) -> StorageResult<bool> {
        let _guard = self.lock.lock().await;

        let (_, written) = self.update_config_file(mapping_id, |config| {
            if config.last_value != expected {
                return false;
            }
            config.last_value = new;
            true
        })?;

        Ok(written)
    }

    async fn mark_consumed(&self, mapping_id: &str, value: i64) -> StorageResult<()> {
        let _guard = self.lock.lock().await;

        self.update_config_file(mapping_id, |config| {
            if value <= config.consumed_value {
                return false;
            }
            config.consumed_value = value;
            true
        })?;

        Ok(())
    }

    async fn health_check(&self) -> StorageResult<()> {
        if !self.base_dir.exists() {
            return Err(StorageError::Unavailable);
        }

        let test_file = self.base_dir.join(".health_check");
        tokio::fs::write(&test_file, b"ok")
            .await
            .map_err(|e| StorageError::FileIO(format!("Health check failed: {e}")))?;
        tokio::fs::remove_file(&test_file)
            .await
            .map_err(|e| StorageError::FileIO(format!("Health check cleanup failed: {e}")))?;

        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}

/// Sanitize a mapping id for use as a filename.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (FileSeriesStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = FileStorageConfig {
            data_dir: temp_dir.path().to_path_buf(),
        };
        let store = FileSeriesStore::new(&config).unwrap();
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_save_and_get() {
        let (store, _temp) = create_test_store();

        let config = SeriesConfig::new("invoices".to_string(), 100);
        store.save_config(&config).await.unwrap();

        let loaded = store.get_config("invoices").await.unwrap().unwrap();
        assert_eq!(loaded.mapping_id, "invoices");
        assert_eq!(loaded.last_value, 100);

        assert!(store.get_config("nonexistent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_compare_and_swap() {
        let (store, _temp) = create_test_store();

        store
            .save_config(&SeriesConfig::new("orders".to_string(), 0))
            .await
            .unwrap();

        // Matching expectation wins.
        assert!(
            store
                .compare_and_swap_last_value("orders", 0, 1)
                .await
                .unwrap()
        );
        // Stale expectation loses and nothing changes.
        assert!(
            !store
                .compare_and_swap_last_value("orders", 0, 2)
                .await
                .unwrap()
        );

        let config = store.get_config("orders").await.unwrap().unwrap();
        assert_eq!(config.last_value, 1);
    }

    #[tokio::test]
    async fn test_cas_on_missing_series() {
        let (store, _temp) = create_test_store();

        let result = store.compare_and_swap_last_value("ghost", 0, 1).await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_mark_consumed_is_monotonic() {
        let (store, _temp) = create_test_store();

        store
            .save_config(&SeriesConfig::new("orders".to_string(), 0))
            .await
            .unwrap();

        store
            .compare_and_swap_last_value("orders", 0, 5)
            .await
            .unwrap();

        store.mark_consumed("orders", 3).await.unwrap();
        assert_eq!(
            store.get_config("orders").await.unwrap().unwrap().consumed_value,
            3
        );

        // Lower marks are no-ops.
        store.mark_consumed("orders", 2).await.unwrap();
        assert_eq!(
            store.get_config("orders").await.unwrap().unwrap().consumed_value,
            3
        );

        store.mark_consumed("orders", 5).await.unwrap();
        assert_eq!(
            store.get_config("orders").await.unwrap().unwrap().consumed_value,
            5
        );
    }

    #[tokio::test]
    async fn test_update_config_patch() {
        let (store, _temp) = create_test_store();

        store
            .save_config(&SeriesConfig::new("orders".to_string(), 7))
            .await
            .unwrap();

        let updated = store
            .update_config(
                "orders",
                &SeriesPatch {
                    enabled: Some(false),
                    prefix: Some("ORD-".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(!updated.enabled);
        assert_eq!(updated.prefix, "ORD-");
        assert_eq!(updated.last_value, 7);
        assert_eq!(updated.version, 1);
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let (store, _temp) = create_test_store();

        store
            .save_config(&SeriesConfig::new("b-series".to_string(), 0))
            .await
            .unwrap();
        store
            .save_config(&SeriesConfig::new("a-series".to_string(), 0))
            .await
            .unwrap();

        let configs = store.list_configs().await.unwrap();
        assert_eq!(configs.len(), 2);
        assert_eq!(configs[0].mapping_id, "a-series");

        assert!(store.delete_config("a-series").await.unwrap());
        assert!(!store.delete_config("a-series").await.unwrap());
        assert_eq!(store.list_configs().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_health_check() {
        let (store, _temp) = create_test_store();
        assert!(store.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn test_sanitize_name() {
        assert_eq!(sanitize_name("simple"), "simple");
        assert_eq!(sanitize_name("with-dash"), "with-dash");
        assert_eq!(sanitize_name("with/slash"), "with_slash");
        assert_eq!(sanitize_name("with space"), "with_space");
    }
}
