//! Series configuration handlers.
//!
//! CRUD surface consumed by the (external) configuration UI.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use crate::api::state::AppState;
use crate::domain::{ApiResponse, CreateSeriesRequest, SeriesConfig, SeriesPatch};
use crate::error::{AppError, Result, StorageError};

/// Query parameters identifying a series.
#[derive(Debug, Deserialize)]
pub struct SeriesQuery {
    /// Mapping identifier.
    pub mapping: String,
}

/// Create a new series.
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateSeriesRequest>,
) -> Result<Json<ApiResponse<SeriesConfig>>> {
    let mut config = SeriesConfig::new(req.mapping_id, req.start_value);
    config.enabled = req.enabled;
    config.field_name = req.field_name;
    config.detail_field_name = req.detail_field_name;
    config.prefix = req.prefix;
    config.pattern = req.pattern;
    config.update_after_transfer = req.update_after_transfer;

    config.validate().map_err(AppError::InvalidConfig)?;

    if state
        .storage
        .get_config(&config.mapping_id)
        .await
        .map_err(AppError::Storage)?
        .is_some()
    {
        return Err(AppError::ConfigExists(config.mapping_id.clone()));
    }

    state
        .storage
        .save_config(&config)
        .await
        .map_err(AppError::Storage)?;

    Ok(Json(ApiResponse::success(config)))
}

/// Get a series by mapping id.
pub async fn get(
    State(state): State<AppState>,
    Query(query): Query<SeriesQuery>,
) -> Result<Json<ApiResponse<SeriesConfig>>> {
    let config = state
        .storage
        .get_config(&query.mapping)
        .await
        .map_err(AppError::Storage)?
        .ok_or_else(|| AppError::ConfigNotFound(query.mapping.clone()))?;

    Ok(Json(ApiResponse::success(config)))
}

/// List all series.
pub async fn list(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<SeriesConfig>>>> {
    let configs = state
        .storage
        .list_configs()
        .await
        .map_err(AppError::Storage)?;

    Ok(Json(ApiResponse::success(configs)))
}

/// Request body for a series update.
#[derive(Debug, Deserialize)]
pub struct UpdateSeriesRequest {
    /// Mapping identifier.
    pub mapping_id: String,

    /// Fields to change.
    #[serde(flatten)]
    pub patch: SeriesPatch,
}

/// Apply an edit patch to a series.
pub async fn update(
    State(state): State<AppState>,
    Json(req): Json<UpdateSeriesRequest>,
) -> Result<Json<ApiResponse<SeriesConfig>>> {
    if req.mapping_id.is_empty() {
        return Err(AppError::BadRequest("mapping_id is required".to_string()));
    }
    req.patch.validate().map_err(AppError::InvalidPattern)?;

    let updated = state
        .storage
        .update_config(&req.mapping_id, &req.patch)
        .await
        .map_err(|err| match err {
            StorageError::NotFound(_) => AppError::ConfigNotFound(req.mapping_id.clone()),
            other => AppError::Storage(other),
        })?;

    Ok(Json(ApiResponse::success(updated)))
}

/// Delete a series.
pub async fn delete(
    State(state): State<AppState>,
    Query(query): Query<SeriesQuery>,
) -> Result<Json<ApiResponse<()>>> {
    let existed = state
        .storage
        .delete_config(&query.mapping)
        .await
        .map_err(AppError::Storage)?;

    if !existed {
        return Err(AppError::ConfigNotFound(query.mapping.clone()));
    }

    Ok(Json(ApiResponse::ok()))
}
