//! Data endpoints
//!
//! Writes and deletes answer as soon as the work is scheduled; they do not
//! wait for the store or the cache.

use axum::{
    extract::{Query, State},
    routing::get,
    Router,
};
use tracing::debug;

use super::state::AppState;
use super::types::{ApiError, DataRequest, Json, KeyQuery, KeyValueQuery};
use crate::domain::validate_record_key;

pub const CREATED_MESSAGE: &str = "Data created successfully.";
pub const UPDATED_MESSAGE: &str = "Data updated successfully.";
pub const DELETED_MESSAGE: &str = "Data deleted successfully.";

/// Routes for `/api/data`
pub fn create_data_router() -> Router<AppState> {
    Router::new().route(
        "/api/data",
        get(get_data)
            .post(create_data)
            .put(update_data)
            .delete(delete_data),
    )
}

/// POST /api/data
pub async fn create_data(
    State(state): State<AppState>,
    Json(request): Json<DataRequest>,
) -> Result<&'static str, ApiError> {
    validate_record_key(&request.key)?;

    debug!(key = %request.key, "Create data request");
    state
        .processor
        .update_data(&request.key, &request.value)
        .await?;

    Ok(CREATED_MESSAGE)
}

/// GET /api/data?key=
pub async fn get_data(
    State(state): State<AppState>,
    Query(query): Query<KeyQuery>,
) -> Result<String, ApiError> {
    validate_record_key(&query.key)?;

    Ok(state.processor.process_data(&query.key).await)
}

/// PUT /api/data?key=&value=
pub async fn update_data(
    State(state): State<AppState>,
    Query(query): Query<KeyValueQuery>,
) -> Result<&'static str, ApiError> {
    validate_record_key(&query.key)?;

    debug!(key = %query.key, "Update data request");
    state.processor.update_data(&query.key, &query.value).await?;

    Ok(UPDATED_MESSAGE)
}

/// DELETE /api/data?key=
pub async fn delete_data(
    State(state): State<AppState>,
    Query(query): Query<KeyQuery>,
) -> Result<&'static str, ApiError> {
    validate_record_key(&query.key)?;

    debug!(key = %query.key, "Delete data request");
    state.processor.delete_data(&query.key).await?;

    Ok(DELETED_MESSAGE)
}
