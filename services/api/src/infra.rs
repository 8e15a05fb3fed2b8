use agency_hub::agencies::{InMemoryAgencyRepository, SqliteAgencyRepository};
use agency_hub::field_mappings::{
    FieldMappingRepository, InMemoryFieldMappingRepository, SqliteFieldMappingRepository,
};
use agency_hub::store::{connect_sqlite, RepositoryError};
use agency_hub::users::{InMemoryUserRepository, SqliteUserRepository};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Repositories backing one running server, all on the same storage.
pub(crate) struct Stores<R, U> {
    pub(crate) agencies: Arc<R>,
    pub(crate) users: Arc<U>,
    pub(crate) field_mappings: Arc<dyn FieldMappingRepository>,
}

impl Stores<InMemoryAgencyRepository, InMemoryUserRepository> {
    pub(crate) fn in_memory() -> Self {
        Self {
            agencies: Arc::new(InMemoryAgencyRepository::default()),
            users: Arc::new(InMemoryUserRepository::default()),
            field_mappings: Arc::new(InMemoryFieldMappingRepository::default()),
        }
    }
}

impl Stores<SqliteAgencyRepository, SqliteUserRepository> {
    pub(crate) async fn sqlite(url: &str) -> Result<Self, RepositoryError> {
        let pool = connect_sqlite(url).await?;
        Ok(Self {
            agencies: Arc::new(SqliteAgencyRepository::new(pool.clone())),
            users: Arc::new(SqliteUserRepository::new(pool.clone())),
            field_mappings: Arc::new(SqliteFieldMappingRepository::new(pool)),
        })
    }
}
