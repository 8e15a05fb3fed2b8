use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use super::domain::{Agency, AgencyId, AgencyProfile, AgencyUpdate, NewAgency};
use super::repository::AgencyRepository;
use crate::store::RepositoryError;

#[derive(Debug, Default)]
struct Table {
    next_id: i64,
    rows: BTreeMap<AgencyId, Agency>,
}

/// Process-local agency store, ordered by id like the SQL-backed one.
#[derive(Debug, Default, Clone)]
pub struct InMemoryAgencyRepository {
    table: Arc<Mutex<Table>>,
}

impl InMemoryAgencyRepository {
    pub fn seeded(agencies: impl IntoIterator<Item = NewAgency>) -> Self {
        let repository = Self::default();
        {
            let mut table = repository.table.lock().expect("agency table poisoned");
            for agency in agencies {
                table.next_id += 1;
                let id = AgencyId(table.next_id);
                table.rows.insert(id, agency.into_agency(id));
            }
        }
        repository
    }

    fn modify<F>(&self, id: AgencyId, change: F) -> Result<Agency, RepositoryError>
    where
        F: FnOnce(&mut Agency),
    {
        let mut table = self.table.lock().expect("agency table poisoned");
        let agency = table.rows.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        change(agency);
        Ok(agency.clone())
    }
}

#[async_trait]
impl AgencyRepository for InMemoryAgencyRepository {
    async fn list(&self) -> Result<Vec<Agency>, RepositoryError> {
        let table = self.table.lock().expect("agency table poisoned");
        Ok(table.rows.values().cloned().collect())
    }

    async fn get(&self, id: AgencyId) -> Result<Option<Agency>, RepositoryError> {
        let table = self.table.lock().expect("agency table poisoned");
        Ok(table.rows.get(&id).cloned())
    }

    async fn find_by_unique_key(
        &self,
        unique_key: &str,
    ) -> Result<Option<Agency>, RepositoryError> {
        let table = self.table.lock().expect("agency table poisoned");
        Ok(table
            .rows
            .values()
            .find(|agency| agency.profile.unique_key.as_deref() == Some(unique_key))
            .cloned())
    }

    async fn insert(&self, agency: NewAgency) -> Result<Agency, RepositoryError> {
        let mut table = self.table.lock().expect("agency table poisoned");
        table.next_id += 1;
        let id = AgencyId(table.next_id);
        let agency = agency.into_agency(id);
        table.rows.insert(id, agency.clone());
        Ok(agency)
    }

    async fn apply_profile(
        &self,
        id: AgencyId,
        profile: AgencyProfile,
    ) -> Result<Agency, RepositoryError> {
        self.modify(id, |agency| agency.profile = profile)
    }

    async fn update(&self, id: AgencyId, update: AgencyUpdate) -> Result<Agency, RepositoryError> {
        self.modify(id, |agency| update.apply_to(agency))
    }

    async fn set_total_properties(
        &self,
        id: AgencyId,
        total: i64,
    ) -> Result<Agency, RepositoryError> {
        self.modify(id, |agency| agency.total_properties = total)
    }

    async fn delete(&self, id: AgencyId) -> Result<(), RepositoryError> {
        let mut table = self.table.lock().expect("agency table poisoned");
        table
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}
