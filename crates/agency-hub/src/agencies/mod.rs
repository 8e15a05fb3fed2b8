//! Agency records, directory reconciliation, and listing recounts.

pub mod domain;
pub mod memory;
pub mod reconcile;
pub mod recount;
pub mod repository;
pub mod router;
pub mod service;
pub mod sqlite;

#[cfg(test)]
mod tests;

pub use domain::{
    AcquaintCustomer, Agency, AgencyBookkeeping, AgencyId, AgencyProfile, AgencySummary,
    AgencyUpdate, ExternalAgencyRecord, MyhomeApi, NewAgency,
};
pub use memory::InMemoryAgencyRepository;
pub use reconcile::{
    dedupe_by_office_name, reconcile, ReconcileAction, ReconcileOutcome, ReconciliationReport,
    RefreshResults, RefreshSummary,
};
pub use recount::{listing_count, RecountEntry, RecountFailure, RecountReport};
pub use repository::AgencyRepository;
pub use router::agency_router;
pub use service::{AgencyService, AgencyServiceError};
pub use sqlite::SqliteAgencyRepository;
