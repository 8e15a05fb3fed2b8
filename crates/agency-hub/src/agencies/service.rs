use std::future::Future;
use std::sync::Arc;

use super::domain::{Agency, AgencyId, AgencyUpdate, NewAgency};
use super::reconcile::{reconcile, ReconciliationReport};
use super::recount::{listing_count, RecountEntry, RecountFailure, RecountReport};
use super::repository::AgencyRepository;
use crate::feeds::{AgencyDirectory, FeedError, ListingSource};
use crate::jobs::{JobBusy, JobLock};
use crate::store::RepositoryError;

/// Agency CRUD plus the two batch jobs, each guarded by its own lock.
pub struct AgencyService<R> {
    repository: Arc<R>,
    directory: Arc<dyn AgencyDirectory>,
    listings: Arc<dyn ListingSource>,
    refresh_lock: JobLock,
    recount_lock: JobLock,
}

impl<R> AgencyService<R>
where
    R: AgencyRepository + 'static,
{
    pub fn new(
        repository: Arc<R>,
        directory: Arc<dyn AgencyDirectory>,
        listings: Arc<dyn ListingSource>,
    ) -> Self {
        Self {
            repository,
            directory,
            listings,
            refresh_lock: JobLock::new("Agency refresh"),
            recount_lock: JobLock::new("Recount"),
        }
    }

    pub async fn create(&self, agency: NewAgency) -> Result<Agency, AgencyServiceError> {
        let stored = self.repository.insert(agency).await?;
        tracing::info!(id = %stored.id, "agency created");
        Ok(stored)
    }

    pub async fn list(&self) -> Result<Vec<Agency>, AgencyServiceError> {
        Ok(self.repository.list().await?)
    }

    pub async fn by_unique_key(&self, unique_key: &str) -> Result<Agency, AgencyServiceError> {
        self.repository
            .find_by_unique_key(unique_key)
            .await?
            .ok_or(AgencyServiceError::NotFound)
    }

    pub async fn update(
        &self,
        id: AgencyId,
        update: AgencyUpdate,
    ) -> Result<Agency, AgencyServiceError> {
        self.repository
            .update(id, update)
            .await
            .map_err(AgencyServiceError::from_repository)
    }

    pub async fn delete(&self, id: AgencyId) -> Result<(), AgencyServiceError> {
        self.repository
            .delete(id)
            .await
            .map_err(AgencyServiceError::from_repository)
    }

    /// Pull the vendor directory and reconcile the store against it.
    ///
    /// Rejected with [`AgencyServiceError::Busy`] while another refresh runs.
    /// Once started the job runs on its own task and finishes even if the
    /// caller stops waiting for it.
    pub async fn refresh(
        self: &Arc<Self>,
        prune: bool,
    ) -> Result<ReconciliationReport, AgencyServiceError> {
        let permit = self.refresh_lock.try_start()?;
        let service = Arc::clone(self);
        run_to_completion(async move {
            let _permit = permit;
            service.run_refresh(prune).await
        })
        .await
    }

    /// Recount every agency that has a vendor key, one at a time.
    ///
    /// A failed fetch is reported and the agency's count is written as zero.
    /// Store failures end the run. Like [`refresh`](Self::refresh), the run is
    /// detached from the caller once the lock is taken.
    pub async fn recount_all(self: &Arc<Self>) -> Result<RecountReport, AgencyServiceError> {
        let permit = self.recount_lock.try_start()?;
        let service = Arc::clone(self);
        run_to_completion(async move {
            let _permit = permit;
            service.run_recount_all().await
        })
        .await
    }

    async fn run_refresh(&self, prune: bool) -> Result<ReconciliationReport, AgencyServiceError> {
        tracing::info!(prune, "agency refresh started");

        let external = self
            .directory
            .agencies()
            .await
            .map_err(AgencyServiceError::Directory)?;
        tracing::info!(count = external.len(), "fetched agency directory");

        Ok(reconcile(self.repository.as_ref(), external, prune).await?)
    }

    async fn run_recount_all(&self) -> Result<RecountReport, AgencyServiceError> {
        let agencies = self.repository.list().await?;
        tracing::info!(agencies = agencies.len(), "bulk recount started");

        let mut report = RecountReport::default();
        for agency in &agencies {
            let Some(unique_key) = agency.vendor_key() else {
                continue;
            };

            let count = match self.listings.property_listings(unique_key).await {
                Ok(listings) => listing_count(&listings),
                Err(error) => {
                    tracing::warn!(
                        agency = agency.profile.name.as_deref().unwrap_or_default(),
                        unique_key,
                        status = error.status(),
                        %error,
                        "listing fetch failed"
                    );
                    report
                        .errors
                        .push(RecountFailure::new(agency, unique_key, &error));
                    0
                }
            };

            let updated = self
                .repository
                .set_total_properties(agency.id, count)
                .await?;
            tracing::info!(
                agency = updated.profile.name.as_deref().unwrap_or_default(),
                unique_key,
                total_properties = updated.total_properties,
                "agency recounted"
            );
            report.results.push(RecountEntry {
                agency: updated.profile.name.clone(),
                unique_key: unique_key.to_string(),
                total_properties: updated.total_properties,
            });
        }

        tracing::info!(
            recounted = report.results.len(),
            failed = report.errors.len(),
            "bulk recount finished"
        );
        Ok(report)
    }

    pub async fn recount_by_unique_key(
        &self,
        unique_key: &str,
    ) -> Result<Agency, AgencyServiceError> {
        let agency = self.by_unique_key(unique_key).await?;
        self.recount_one(agency).await
    }

    pub async fn recount_by_id(&self, id: AgencyId) -> Result<Agency, AgencyServiceError> {
        let agency = self
            .repository
            .get(id)
            .await?
            .ok_or(AgencyServiceError::NotFound)?;
        self.recount_one(agency).await
    }

    async fn recount_one(&self, agency: Agency) -> Result<Agency, AgencyServiceError> {
        let unique_key = agency
            .vendor_key()
            .ok_or(AgencyServiceError::MissingVendorKey)?
            .to_string();

        let listings = self
            .listings
            .property_listings(&unique_key)
            .await
            .map_err(|source| {
                tracing::warn!(
                    id = %agency.id,
                    unique_key = unique_key.as_str(),
                    error = %source,
                    "listing fetch failed"
                );
                AgencyServiceError::Fetch {
                    agency: agency.profile.name.clone(),
                    unique_key: unique_key.clone(),
                    source,
                }
            })?;

        let updated = self
            .repository
            .set_total_properties(agency.id, listing_count(&listings))
            .await
            .map_err(AgencyServiceError::from_repository)?;
        tracing::info!(
            id = %updated.id,
            unique_key = unique_key.as_str(),
            total_properties = updated.total_properties,
            "agency recounted"
        );
        Ok(updated)
    }
}

/// Drive a batch job on its own task so dropping the caller's future does not
/// cancel it part way through.
async fn run_to_completion<T, F>(job: F) -> Result<T, AgencyServiceError>
where
    F: Future<Output = Result<T, AgencyServiceError>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(job).await.map_err(|error| {
        tracing::error!(%error, "batch job task did not finish");
        AgencyServiceError::Interrupted(error.to_string())
    })?
}

/// Error raised by the agency service.
#[derive(Debug, thiserror::Error)]
pub enum AgencyServiceError {
    #[error(transparent)]
    Busy(#[from] JobBusy),
    #[error("Agency not found")]
    NotFound,
    #[error("Agency does not have a unique_key")]
    MissingVendorKey,
    #[error("agency directory unavailable: {0}")]
    Directory(#[source] FeedError),
    #[error("Failed to fetch properties from external route: {source}")]
    Fetch {
        agency: Option<String>,
        unique_key: String,
        #[source]
        source: FeedError,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("batch job stopped before finishing: {0}")]
    Interrupted(String),
}

impl AgencyServiceError {
    fn from_repository(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Repository(other),
        }
    }
}
