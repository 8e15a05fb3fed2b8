use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::Value;
use tokio::sync::Notify;
use tower::ServiceExt;

use crate::agencies::domain::{
    AcquaintCustomer, Agency, AgencyBookkeeping, AgencyId, AgencyProfile, AgencyUpdate,
    ExternalAgencyRecord, MyhomeApi, NewAgency,
};
use crate::agencies::{agency_router, AgencyRepository, AgencyService, InMemoryAgencyRepository};
use crate::feeds::{AgencyDirectory, FeedError, ListingSource};
use crate::store::RepositoryError;
use crate::users::{AuthError, AuthenticatedUser, TokenVerifier, UserId};

pub(super) const TOKEN: &str = "session-token";

pub(super) fn external(name: &str, office: &str, key: &str) -> ExternalAgencyRecord {
    ExternalAgencyRecord {
        name: Some(name.to_string()),
        office_name: Some(office.to_string()),
        address1: Some("1 Quay Street".to_string()),
        key: Some(key.to_string()),
        acquaint_customer: Some(AcquaintCustomer {
            site_name: Some(format!("{office} site")),
            site_prefix: Some(key.to_string()),
            fourpm_branch_id: Some(3),
        }),
        myhome_api: Some(MyhomeApi {
            api_key: Some(format!("mh-{key}")),
            group_id: Some(11),
        }),
        ..ExternalAgencyRecord::default()
    }
}

pub(super) fn stored(name: &str, office: Option<&str>, key: Option<&str>) -> NewAgency {
    NewAgency {
        profile: AgencyProfile {
            name: Some(name.to_string()),
            office_name: office.map(str::to_string),
            unique_key: key.map(str::to_string),
            ..AgencyProfile::default()
        },
        bookkeeping: AgencyBookkeeping::default(),
        total_properties: 0,
    }
}

pub(super) async fn all(repository: &InMemoryAgencyRepository) -> Vec<Agency> {
    repository.list().await.expect("list agencies")
}

/// Agency directory that can hold callers at the fetch until released.
#[derive(Default)]
pub(super) struct GatedDirectory {
    records: Mutex<Vec<ExternalAgencyRecord>>,
    gated: AtomicBool,
    failing: AtomicBool,
    pub(super) entered: Notify,
    pub(super) release: Notify,
}

impl GatedDirectory {
    pub(super) fn with(records: Vec<ExternalAgencyRecord>) -> Arc<Self> {
        let directory = Self::default();
        *directory.records.lock().expect("records") = records;
        Arc::new(directory)
    }

    pub(super) fn set_gated(&self, gated: bool) {
        self.gated.store(gated, Ordering::SeqCst);
    }

    pub(super) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl AgencyDirectory for GatedDirectory {
    async fn agencies(&self) -> Result<Vec<ExternalAgencyRecord>, FeedError> {
        if self.gated.load(Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(FeedError::Status {
                url: "https://api.test/api/Agency/GetAgency".to_string(),
                status: 503,
                body: "maintenance".to_string(),
            });
        }
        Ok(self.records.lock().expect("records").clone())
    }
}

/// Listing endpoint answering from a fixed table; unknown keys fail with 404.
#[derive(Default)]
pub(super) struct StubListings {
    responses: HashMap<String, Result<Value, u16>>,
    pub(super) calls: Mutex<Vec<String>>,
}

impl StubListings {
    pub(super) fn new(responses: impl IntoIterator<Item = (&'static str, Result<Value, u16>)>) -> Arc<Self> {
        Arc::new(Self {
            responses: responses
                .into_iter()
                .map(|(key, response)| (key.to_string(), response))
                .collect(),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub(super) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls").clone()
    }
}

#[async_trait]
impl ListingSource for StubListings {
    async fn property_listings(&self, key: &str) -> Result<Value, FeedError> {
        self.calls.lock().expect("calls").push(key.to_string());
        match self.responses.get(key) {
            Some(Ok(listings)) => Ok(listings.clone()),
            Some(Err(status)) => Err(FeedError::Status {
                url: format!("https://api.test/api/property/json?Key={key}"),
                status: *status,
                body: r#"{"Message":"rejected"}"#.to_string(),
            }),
            None => Err(FeedError::Status {
                url: format!("https://api.test/api/property/json?Key={key}"),
                status: 404,
                body: String::new(),
            }),
        }
    }
}

/// In-memory store whose inserts fail for one office name.
#[derive(Clone)]
pub(super) struct RejectingInserts {
    pub(super) inner: InMemoryAgencyRepository,
    pub(super) office_name: String,
}

#[async_trait]
impl AgencyRepository for RejectingInserts {
    async fn list(&self) -> Result<Vec<Agency>, RepositoryError> {
        self.inner.list().await
    }

    async fn get(&self, id: AgencyId) -> Result<Option<Agency>, RepositoryError> {
        self.inner.get(id).await
    }

    async fn find_by_unique_key(
        &self,
        unique_key: &str,
    ) -> Result<Option<Agency>, RepositoryError> {
        self.inner.find_by_unique_key(unique_key).await
    }

    async fn insert(&self, agency: NewAgency) -> Result<Agency, RepositoryError> {
        if agency.profile.office_name.as_deref() == Some(self.office_name.as_str()) {
            return Err(RepositoryError::Unavailable("insert rejected".to_string()));
        }
        self.inner.insert(agency).await
    }

    async fn apply_profile(
        &self,
        id: AgencyId,
        profile: AgencyProfile,
    ) -> Result<Agency, RepositoryError> {
        self.inner.apply_profile(id, profile).await
    }

    async fn update(&self, id: AgencyId, update: AgencyUpdate) -> Result<Agency, RepositoryError> {
        self.inner.update(id, update).await
    }

    async fn set_total_properties(
        &self,
        id: AgencyId,
        total: i64,
    ) -> Result<Agency, RepositoryError> {
        self.inner.set_total_properties(id, total).await
    }

    async fn delete(&self, id: AgencyId) -> Result<(), RepositoryError> {
        self.inner.delete(id).await
    }
}

pub(super) struct AcceptToken;

#[async_trait]
impl TokenVerifier for AcceptToken {
    async fn authenticate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        if token == TOKEN {
            Ok(AuthenticatedUser {
                id: UserId(1),
                email: "ops@agency.test".to_string(),
            })
        } else {
            Err(AuthError::InvalidToken)
        }
    }
}

pub(super) type TestService = AgencyService<InMemoryAgencyRepository>;

pub(super) fn build_service(
    repository: InMemoryAgencyRepository,
    directory: Arc<GatedDirectory>,
    listings: Arc<StubListings>,
) -> Arc<TestService> {
    Arc::new(AgencyService::new(Arc::new(repository), directory, listings))
}

pub(super) fn router(service: Arc<TestService>) -> Router {
    agency_router(service, Arc::new(AcceptToken))
}

pub(super) async fn send(
    router: Router,
    method: &str,
    uri: &str,
    headers: &[(&str, &str)],
    body: Option<Value>,
) -> Response {
    let mut request = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    let body = match body {
        Some(body) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };
    router
        .oneshot(request.body(body).expect("request"))
        .await
        .expect("response")
}

pub(super) async fn json_body(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    (status, serde_json::from_slice(&bytes).expect("json body"))
}
