use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde_json::json;

use super::repository::FieldMappingRepository;
use super::{FieldMapping, FieldMappingInput};
use crate::error::ApiError;
use crate::store::RepositoryError;
use crate::users::{require_token, TokenVerifier};

/// Protected CRUD routes over field mappings.
pub fn field_mapping_router(
    repository: Arc<dyn FieldMappingRepository>,
    verifier: Arc<dyn TokenVerifier>,
) -> Router {
    Router::new()
        .route("/field_mappings", get(list_handler).post(create_handler))
        .route(
            "/field_mappings/:id",
            put(update_handler).delete(delete_handler),
        )
        .route_layer(middleware::from_fn_with_state(verifier, require_token))
        .with_state(repository)
}

fn store_error(message: &str, error: RepositoryError) -> ApiError {
    match error {
        RepositoryError::NotFound => ApiError::not_found("Field mapping not found"),
        other => ApiError::internal(message).with_error(other),
    }
}

async fn list_handler(
    State(repository): State<Arc<dyn FieldMappingRepository>>,
) -> Result<Json<Vec<FieldMapping>>, ApiError> {
    let mappings = repository
        .list()
        .await
        .map_err(|error| store_error("Failed to fetch field mappings", error))?;
    Ok(Json(mappings))
}

async fn create_handler(
    State(repository): State<Arc<dyn FieldMappingRepository>>,
    Json(input): Json<FieldMappingInput>,
) -> Result<Response, ApiError> {
    if input.field_name.as_deref().map_or(true, str::is_empty) {
        return Err(ApiError::validation("field_name is required"));
    }
    let mapping = repository
        .insert(input)
        .await
        .map_err(|error| store_error("Failed to add field mapping", error))?;
    Ok((StatusCode::CREATED, Json(mapping)).into_response())
}

async fn update_handler(
    State(repository): State<Arc<dyn FieldMappingRepository>>,
    Path(id): Path<i64>,
    Json(input): Json<FieldMappingInput>,
) -> Result<Json<FieldMapping>, ApiError> {
    let mapping = repository
        .update(id, input)
        .await
        .map_err(|error| store_error("Failed to update field mapping", error))?;
    Ok(Json(mapping))
}

async fn delete_handler(
    State(repository): State<Arc<dyn FieldMappingRepository>>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let deleted = repository
        .delete(id)
        .await
        .map_err(|error| store_error("Failed to delete field mapping", error))?;
    Ok(Json(json!({ "message": "Field mapping deleted", "deleted": deleted })))
}
