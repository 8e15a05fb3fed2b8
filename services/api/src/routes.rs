use crate::infra::{AppState, Stores};
use agency_hub::agencies::{agency_router, AgencyRepository, AgencyService};
use agency_hub::config::AppConfig;
use agency_hub::feeds::{feed_router, FeedAggregator, FeedState, HttpFeedClient};
use agency_hub::field_mappings::field_mapping_router;
use agency_hub::users::{user_router, AuthService, TokenSigner, TokenVerifier, UserRepository};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::{Extension, Json, Router};
use serde_json::json;
use std::sync::Arc;

/// Build the full `/api` surface over the given stores.
pub(crate) fn api_router<R, U>(stores: Stores<R, U>, config: &AppConfig) -> Router
where
    R: AgencyRepository + 'static,
    U: UserRepository + 'static,
{
    let feeds = Arc::new(HttpFeedClient::new(config.feeds.clone()));
    let signer = config
        .auth
        .secret_key
        .as_deref()
        .map(|secret| TokenSigner::new(secret, config.auth.token_ttl_hours));

    let auth = Arc::new(AuthService::new(stores.users, signer));
    let verifier: Arc<dyn TokenVerifier> = auth.clone();
    let agencies = Arc::new(AgencyService::new(
        stores.agencies,
        feeds.clone(),
        feeds.clone(),
    ));
    let feed_state = FeedState {
        listings: feeds.clone(),
        portals: feeds.clone(),
        aggregator: FeedAggregator::new(feeds),
    };

    let api = user_router(auth)
        .merge(agency_router(agencies, verifier.clone()))
        .merge(feed_router(feed_state))
        .merge(field_mapping_router(stores.field_mappings, verifier));

    with_operational_routes(Router::new().nest("/api", api))
}

pub(crate) fn with_operational_routes(router: Router) -> Router {
    router
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
