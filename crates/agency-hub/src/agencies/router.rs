use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::domain::{Agency, AgencyId, AgencyUpdate, NewAgency};
use super::repository::AgencyRepository;
use super::service::{AgencyService, AgencyServiceError};
use crate::error::ApiError;
use crate::feeds::router::header_value;
use crate::users::{require_token, TokenVerifier};

/// Router for agency CRUD and the refresh/recount jobs.
///
/// Everything except the two lookups by vendor key requires a session token.
pub fn agency_router<R>(service: Arc<AgencyService<R>>, verifier: Arc<dyn TokenVerifier>) -> Router
where
    R: AgencyRepository + 'static,
{
    let protected = Router::new()
        .route(
            "/agencies",
            post(create_handler::<R>).get(list_handler::<R>),
        )
        .route("/agencies/refresh", post(refresh_handler::<R>))
        .route(
            "/agencies/recount-properties",
            post(recount_all_handler::<R>),
        )
        .route(
            "/agencies/recount-properties/single",
            post(recount_single_handler::<R>),
        )
        .route(
            "/agencies/:id",
            axum::routing::put(update_handler::<R>).delete(delete_handler::<R>),
        )
        .route(
            "/agencies/:id/recount-properties",
            post(recount_by_id_handler::<R>),
        )
        .route_layer(middleware::from_fn_with_state(verifier, require_token));

    let public = Router::new()
        .route("/agency", get(by_key_header_handler::<R>))
        .route("/agencies/:id", get(by_unique_key_handler::<R>));

    protected.merge(public).with_state(service)
}

impl AgencyServiceError {
    /// Map to an HTTP error, using `context` as the message for unexpected failures.
    fn into_api_error(self, context: &str) -> ApiError {
        match self {
            AgencyServiceError::Busy(busy) => busy.into(),
            AgencyServiceError::NotFound => ApiError::not_found("Agency not found"),
            AgencyServiceError::MissingVendorKey => ApiError::validation(self.to_string()),
            AgencyServiceError::Directory(ref source) => {
                ApiError::upstream(context, source).with_error(&self)
            }
            AgencyServiceError::Fetch {
                ref agency,
                ref unique_key,
                ref source,
            } => {
                let mut error = ApiError::upstream(self.to_string(), source)
                    .with_detail("agency", agency.clone())
                    .with_detail("unique_key", unique_key.clone());
                if let Some(data) = source.body() {
                    error = error.with_detail("data", data);
                }
                error
            }
            AgencyServiceError::Repository(error) => {
                ApiError::internal(context).with_error(error)
            }
            AgencyServiceError::Interrupted(_) => ApiError::internal(context).with_error(&self),
        }
    }
}

/// `id` path segments that are not numbers cannot name an agency.
fn parse_id(raw: &str) -> Result<AgencyId, ApiError> {
    raw.parse::<i64>()
        .map(AgencyId)
        .map_err(|_| ApiError::not_found("Agency not found"))
}

pub(crate) async fn create_handler<R>(
    State(service): State<Arc<AgencyService<R>>>,
    Json(agency): Json<NewAgency>,
) -> Result<Response, ApiError>
where
    R: AgencyRepository + 'static,
{
    let agency = service
        .create(agency)
        .await
        .map_err(|error| error.into_api_error("Error creating agency"))?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Agency created successfully", "agency": agency })),
    )
        .into_response())
}

pub(crate) async fn list_handler<R>(
    State(service): State<Arc<AgencyService<R>>>,
) -> Result<Json<Vec<Agency>>, ApiError>
where
    R: AgencyRepository + 'static,
{
    let agencies = service
        .list()
        .await
        .map_err(|error| error.into_api_error("Error fetching agencies"))?;
    Ok(Json(agencies))
}

pub(crate) async fn by_key_header_handler<R>(
    State(service): State<Arc<AgencyService<R>>>,
    headers: HeaderMap,
) -> Result<Json<Agency>, ApiError>
where
    R: AgencyRepository + 'static,
{
    let key =
        header_value(&headers, "key").ok_or_else(|| ApiError::validation("Missing key header"))?;
    let agency = service
        .by_unique_key(key)
        .await
        .map_err(|error| error.into_api_error("Error fetching agency"))?;
    Ok(Json(agency))
}

pub(crate) async fn by_unique_key_handler<R>(
    State(service): State<Arc<AgencyService<R>>>,
    Path(unique_key): Path<String>,
) -> Result<Json<Agency>, ApiError>
where
    R: AgencyRepository + 'static,
{
    let agency = service
        .by_unique_key(&unique_key)
        .await
        .map_err(|error| error.into_api_error("Error fetching agency"))?;
    Ok(Json(agency))
}

pub(crate) async fn update_handler<R>(
    State(service): State<Arc<AgencyService<R>>>,
    Path(id): Path<String>,
    Json(update): Json<AgencyUpdate>,
) -> Result<Json<Value>, ApiError>
where
    R: AgencyRepository + 'static,
{
    service
        .update(parse_id(&id)?, update)
        .await
        .map_err(|error| error.into_api_error("Error updating agency"))?;
    Ok(Json(json!({ "message": "Agency updated successfully" })))
}

pub(crate) async fn delete_handler<R>(
    State(service): State<Arc<AgencyService<R>>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError>
where
    R: AgencyRepository + 'static,
{
    service
        .delete(parse_id(&id)?)
        .await
        .map_err(|error| error.into_api_error("Error deleting agency"))?;
    Ok(Json(json!({ "message": "Agency deleted successfully" })))
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RefreshQuery {
    #[serde(rename = "removeDeleted")]
    remove_deleted: Option<String>,
}

pub(crate) async fn refresh_handler<R>(
    State(service): State<Arc<AgencyService<R>>>,
    Query(query): Query<RefreshQuery>,
) -> Result<Json<Value>, ApiError>
where
    R: AgencyRepository + 'static,
{
    let prune = query.remove_deleted.as_deref() == Some("true");
    let report = service
        .refresh(prune)
        .await
        .map_err(|error| error.into_api_error("Error refreshing agencies"))?;
    Ok(Json(json!({
        "message": "Agencies refreshed successfully",
        "summary": report.summary(),
        "results": report.results(),
    })))
}

pub(crate) async fn recount_all_handler<R>(
    State(service): State<Arc<AgencyService<R>>>,
) -> Result<Json<Value>, ApiError>
where
    R: AgencyRepository + 'static,
{
    let report = service
        .recount_all()
        .await
        .map_err(|error| error.into_api_error("Error recounting properties"))?;
    Ok(Json(json!({
        "message": "Property counts updated for all agencies",
        "results": report.results,
        "errors": report.errors,
    })))
}

pub(crate) async fn recount_single_handler<R>(
    State(service): State<Arc<AgencyService<R>>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError>
where
    R: AgencyRepository + 'static,
{
    let unique_key = header_value(&headers, "unique-key")
        .ok_or_else(|| ApiError::validation("Missing unique-key header"))?;
    let agency = service
        .recount_by_unique_key(unique_key)
        .await
        .map_err(|error| error.into_api_error("Error recounting properties"))?;
    Ok(Json(count_updated(&agency)))
}

pub(crate) async fn recount_by_id_handler<R>(
    State(service): State<Arc<AgencyService<R>>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError>
where
    R: AgencyRepository + 'static,
{
    tracing::warn!(%id, "recount by id is deprecated; use the unique-key header route");
    let agency = service
        .recount_by_id(parse_id(&id)?)
        .await
        .map_err(|error| error.into_api_error("Error recounting properties"))?;
    Ok(Json(count_updated(&agency)))
}

fn count_updated(agency: &Agency) -> Value {
    json!({
        "message": "Property count updated",
        "total_properties": agency.total_properties,
    })
}
