//! Storage backend factory.
//!
//! Creates the appropriate storage backend based on configuration.

use std::sync::Arc;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::AppError;
use crate::storage::file::FileSeriesStore;
use crate::storage::traits::SeriesStore;

/// Create a storage backend based on configuration.
///
/// # Errors
///
/// Returns an error if the storage backend cannot be initialized.
pub async fn create_storage(config: &StorageConfig) -> Result<Arc<dyn SeriesStore>, AppError> {
    match config.backend {
        StorageBackend::File => {
            let store = FileSeriesStore::new(&config.file).map_err(AppError::Storage)?;

            // Verify storage is healthy
            store.health_check().await.map_err(AppError::Storage)?;

            Ok(Arc::new(store))
        }
        StorageBackend::Postgres => {
            // Postgres storage not yet implemented
            Err(AppError::Internal(
                "Postgres storage backend not yet implemented".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_create_file_storage() {
        let temp_dir = TempDir::new().unwrap();

        let config = StorageConfig {
            backend: StorageBackend::File,
            file: crate::config::FileStorageConfig {
                data_dir: temp_dir.path().to_path_buf(),
            },
            ..Default::default()
        };

        let store = create_storage(&config).await.unwrap();
        assert_eq!(store.backend_name(), "file");
    }

    #[tokio::test]
    async fn test_create_postgres_storage_not_implemented() {
        let config = StorageConfig {
            backend: StorageBackend::Postgres,
            ..Default::default()
        };

        let result = create_storage(&config).await;
        assert!(result.is_err());
    }
}
