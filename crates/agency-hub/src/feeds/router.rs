use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;

use super::aggregate::FeedAggregator;
use super::error::{AggregateError, LookupError};
use super::source::{ListingSource, PortalListings};
use crate::error::ApiError;

/// Shared handles for the pass-through routes.
#[derive(Clone)]
pub struct FeedState {
    pub listings: Arc<dyn ListingSource>,
    pub portals: Arc<dyn PortalListings>,
    pub aggregator: FeedAggregator,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct FeedQuery {
    key: Option<String>,
    id: Option<String>,
    #[serde(rename = "apiKey")]
    api_key: Option<String>,
}

/// Only absent or empty values count as missing; anything else is forwarded as sent.
fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}

/// Value of a request header, if present and non-empty.
pub(crate) fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    present(headers.get(name).and_then(|value| value.to_str().ok()))
}

/// Router for the unauthenticated vendor pass-through endpoints.
pub fn feed_router(state: FeedState) -> Router {
    Router::new()
        .route("/properties", get(properties_handler))
        .route("/acquaint", get(acquaint_handler))
        .route("/acquaint/all", get(acquaint_all_handler))
        .route("/myhome", get(myhome_handler))
        .route("/daft", get(daft_handler))
        .route("/daft/all", get(daft_all_handler))
        .with_state(state)
}

impl From<AggregateError> for ApiError {
    fn from(value: AggregateError) -> Self {
        ApiError::upstream("Failed to fetch data", &value.source)
            .with_detail("fileIndex", value.file_index)
    }
}

impl From<LookupError> for ApiError {
    fn from(value: LookupError) -> Self {
        match value {
            LookupError::Aggregate(error) => error.into(),
            LookupError::NotFound {
                property_id,
                requested_id,
                searched,
            } => ApiError::not_found("Property not found")
                .with_detail("propertyId", property_id)
                .with_detail("requestedId", requested_id)
                .with_detail("fetched", searched),
        }
    }
}

pub(crate) async fn properties_handler(
    State(state): State<FeedState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let key = header_value(&headers, "key")
        .ok_or_else(|| ApiError::validation("API key is required"))?;
    let listings = state
        .listings
        .property_listings(key)
        .await
        .map_err(|error| ApiError::upstream("Failed to fetch data", &error))?;
    Ok(Json(listings))
}

pub(crate) async fn acquaint_handler(
    State(state): State<FeedState>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Value>, ApiError> {
    let (Some(key), Some(id)) = (present(query.key.as_deref()), present(query.id.as_deref()))
    else {
        return Err(ApiError::validation(
            "API key and property ID are required",
        ));
    };
    let property = state.aggregator.find(key, id).await?;
    Ok(Json(property))
}

pub(crate) async fn acquaint_all_handler(
    State(state): State<FeedState>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let key = present(query.key.as_deref())
        .ok_or_else(|| ApiError::validation("API key is required"))?;
    let properties = state.aggregator.collect(key).await?;
    Ok(Json(properties))
}

pub(crate) async fn myhome_handler(
    State(state): State<FeedState>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Value>, ApiError> {
    let (Some(key), Some(id)) = (present(query.key.as_deref()), present(query.id.as_deref()))
    else {
        return Err(ApiError::validation("API key and ID are required"));
    };
    let property = state
        .portals
        .myhome_property(key, id)
        .await
        .map_err(|error| {
            ApiError::upstream("Failed to fetch data from the external API", &error)
        })?;
    Ok(Json(property))
}

pub(crate) async fn daft_handler(
    State(state): State<FeedState>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Value>, ApiError> {
    let key =
        present(query.key.as_deref()).ok_or_else(|| ApiError::validation("apiKey is required"))?;
    let id = present(query.id.as_deref())
        .ok_or_else(|| ApiError::validation("Property ID is required"))?;
    let property = state
        .portals
        .daft_property(key, id)
        .await
        .map_err(|error| ApiError::upstream("Failed to fetch data from the Daft API", &error))?;
    Ok(Json(property))
}

pub(crate) async fn daft_all_handler(
    State(state): State<FeedState>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Value>, ApiError> {
    let key = present(query.api_key.as_deref())
        .ok_or_else(|| ApiError::validation("apiKey is required"))?;
    let properties = state
        .portals
        .daft_properties(key)
        .await
        .map_err(|error| ApiError::upstream("Failed to fetch data from the Daft API", &error))?;
    Ok(Json(properties))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feeds::{FeedError, FeedPage, PagedFeed};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use serde_json::json;
    use tower::ServiceExt;

    struct StubVendors;

    #[async_trait]
    impl ListingSource for StubVendors {
        async fn property_listings(&self, key: &str) -> Result<Value, FeedError> {
            match key {
                "GOOD" => Ok(json!([{ "id": 1 }, { "id": 2 }])),
                _ => Err(FeedError::Status {
                    url: "https://api.test/api/property/json".to_string(),
                    status: 401,
                    body: "denied".to_string(),
                }),
            }
        }
    }

    #[async_trait]
    impl PortalListings for StubVendors {
        async fn myhome_property(&self, key: &str, id: &str) -> Result<Value, FeedError> {
            Ok(json!({ "source": "myhome", "key": key, "id": id }))
        }

        async fn daft_property(&self, key: &str, id: &str) -> Result<Value, FeedError> {
            Ok(json!({ "source": "daft", "key": key, "id": id }))
        }

        async fn daft_properties(&self, _key: &str) -> Result<Value, FeedError> {
            Err(FeedError::Status {
                url: "http://daft.test/property".to_string(),
                status: 502,
                body: String::new(),
            })
        }
    }

    #[async_trait]
    impl PagedFeed for StubVendors {
        async fn page(&self, key: &str, index: usize) -> FeedPage {
            match (key, index) {
                ("AGT", 0) => FeedPage::Records(vec![json!({ "id": "10" }), json!({ "id": "11" })]),
                ("AGT", 1) => FeedPage::Records(vec![json!({ "id": "12" })]),
                ("BROKEN", 1) => FeedPage::Failure(FeedError::Decode {
                    url: "https://feeds.test/BROKEN-1.xml".to_string(),
                    message: "unexpected end of stream".to_string(),
                }),
                ("BROKEN", 0) => FeedPage::Records(vec![json!({ "id": "1" })]),
                _ => FeedPage::Boundary,
            }
        }
    }

    fn router() -> Router {
        let vendors = Arc::new(StubVendors);
        feed_router(FeedState {
            listings: vendors.clone(),
            portals: vendors.clone(),
            aggregator: FeedAggregator::new(vendors),
        })
    }

    async fn get(uri: &str, key_header: Option<&str>) -> Response {
        let mut request = Request::get(uri);
        if let Some(key) = key_header {
            request = request.header("key", key);
        }
        router()
            .oneshot(request.body(Body::empty()).expect("request"))
            .await
            .expect("response")
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json")
    }

    #[tokio::test]
    async fn acquaint_all_returns_flattened_records() {
        let response = get("/acquaint/all?key=AGT", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!([{ "id": "10" }, { "id": "11" }, { "id": "12" }])
        );
    }

    #[tokio::test]
    async fn acquaint_all_reports_failing_file_index() {
        let response = get("/acquaint/all?key=BROKEN", None).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["message"], "Failed to fetch data");
        assert_eq!(body["fileIndex"], 1);
    }

    #[tokio::test]
    async fn acquaint_requires_key_and_id() {
        let response = get("/acquaint/all", None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = get("/acquaint?key=AGT", None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await["message"],
            "API key and property ID are required"
        );
    }

    #[tokio::test]
    async fn acquaint_single_lookup_finds_and_misses() {
        let found = get("/acquaint?key=AGT&id=AGT12", None).await;
        assert_eq!(found.status(), StatusCode::OK);
        assert_eq!(json_body(found).await, json!({ "id": "12" }));

        let missing = get("/acquaint?key=AGT&id=AGT99", None).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        let body = json_body(missing).await;
        assert_eq!(body["propertyId"], "99");
        assert_eq!(body["requestedId"], "AGT99");
        assert_eq!(body["fetched"], 3);
    }

    #[tokio::test]
    async fn properties_reads_key_header_and_echoes_vendor_failures() {
        assert_eq!(
            get("/properties", None).await.status(),
            StatusCode::BAD_REQUEST
        );

        let ok = get("/properties", Some("GOOD")).await;
        assert_eq!(ok.status(), StatusCode::OK);
        assert_eq!(json_body(ok).await.as_array().map(Vec::len), Some(2));

        let failed = get("/properties", Some("BAD")).await;
        assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(failed).await;
        assert_eq!(body["status"], 401);
        assert_eq!(body["response"], "denied");
    }

    #[tokio::test]
    async fn padded_query_values_are_forwarded_verbatim() {
        let padded = get("/myhome?key=%20mh%20&id=%205", None).await;
        assert_eq!(padded.status(), StatusCode::OK);
        assert_eq!(
            json_body(padded).await,
            json!({ "source": "myhome", "key": " mh ", "id": " 5" })
        );

        let blank = get("/daft?key=%20&id=5", None).await;
        assert_eq!(blank.status(), StatusCode::OK);
        assert_eq!(json_body(blank).await["key"], " ");

        let empty = get("/daft?key=&id=5", None).await;
        assert_eq!(empty.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn portal_routes_validate_and_pass_through() {
        assert_eq!(
            get("/myhome?key=mh", None).await.status(),
            StatusCode::BAD_REQUEST
        );
        let myhome = get("/myhome?key=mh&id=5", None).await;
        assert_eq!(
            json_body(myhome).await,
            json!({ "source": "myhome", "key": "mh", "id": "5" })
        );

        assert_eq!(get("/daft?id=5", None).await.status(), StatusCode::BAD_REQUEST);
        let daft = get("/daft?key=dk&id=5", None).await;
        assert_eq!(json_body(daft).await["source"], "daft");

        assert_eq!(get("/daft/all", None).await.status(), StatusCode::BAD_REQUEST);
        let all = get("/daft/all?apiKey=dk", None).await;
        assert_eq!(all.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(all).await["message"],
            "Failed to fetch data from the Daft API"
        );
    }
}
