use async_trait::async_trait;

use super::domain::{Agency, AgencyId, AgencyProfile, AgencyUpdate, NewAgency};
use crate::store::RepositoryError;

/// Storage abstraction so the service module can be exercised in isolation.
#[async_trait]
pub trait AgencyRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Agency>, RepositoryError>;
    async fn get(&self, id: AgencyId) -> Result<Option<Agency>, RepositoryError>;
    async fn find_by_unique_key(&self, unique_key: &str)
        -> Result<Option<Agency>, RepositoryError>;
    async fn insert(&self, agency: NewAgency) -> Result<Agency, RepositoryError>;
    /// Overwrite the directory-sourced fields, leaving bookkeeping and counts alone.
    async fn apply_profile(
        &self,
        id: AgencyId,
        profile: AgencyProfile,
    ) -> Result<Agency, RepositoryError>;
    async fn update(&self, id: AgencyId, update: AgencyUpdate) -> Result<Agency, RepositoryError>;
    async fn set_total_properties(
        &self,
        id: AgencyId,
        total: i64,
    ) -> Result<Agency, RepositoryError>;
    async fn delete(&self, id: AgencyId) -> Result<(), RepositoryError>;
}
