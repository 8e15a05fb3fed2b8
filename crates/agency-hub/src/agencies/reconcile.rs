//! Aligns stored agencies with the vendor directory, joined on office name.

use serde::Serialize;
use std::collections::{HashMap, HashSet};

use super::domain::{Agency, AgencyId, AgencySummary, ExternalAgencyRecord, NewAgency};
use super::repository::AgencyRepository;
use crate::store::RepositoryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileAction {
    Added,
    Updated,
    Removed,
}

/// What happened to one agency during a refresh.
#[derive(Debug)]
pub struct ReconcileOutcome {
    pub action: ReconcileAction,
    pub agency: AgencySummary,
    pub result: Result<AgencyId, RepositoryError>,
}

impl ReconcileOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub removed: usize,
}

/// Per-bucket detail. `unchanged` is part of the response shape but the
/// matcher never fills it: every match counts as an update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefreshResults {
    pub added: Vec<AgencySummary>,
    pub updated: Vec<AgencySummary>,
    pub unchanged: Vec<AgencySummary>,
    pub removed: Vec<AgencySummary>,
}

/// Ordered outcomes of one reconciliation run, failures included.
#[derive(Debug, Default)]
pub struct ReconciliationReport {
    pub outcomes: Vec<ReconcileOutcome>,
}

impl ReconciliationReport {
    /// Successful outcomes grouped by action, in processing order.
    pub fn results(&self) -> RefreshResults {
        let mut results = RefreshResults::default();
        for outcome in self.outcomes.iter().filter(|outcome| outcome.is_ok()) {
            let bucket = match outcome.action {
                ReconcileAction::Added => &mut results.added,
                ReconcileAction::Updated => &mut results.updated,
                ReconcileAction::Removed => &mut results.removed,
            };
            bucket.push(outcome.agency.clone());
        }
        results
    }

    pub fn summary(&self) -> RefreshSummary {
        let results = self.results();
        RefreshSummary {
            added: results.added.len(),
            updated: results.updated.len(),
            unchanged: results.unchanged.len(),
            removed: results.removed.len(),
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &ReconcileOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.is_ok())
    }
}

/// Keep the first record for each exact `OfficeName`; later duplicates are dropped.
pub fn dedupe_by_office_name(records: Vec<ExternalAgencyRecord>) -> Vec<ExternalAgencyRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(record.office_name.clone()))
        .collect()
}

fn lookup_by_office_name(agencies: &[Agency]) -> HashMap<String, AgencyId> {
    agencies
        .iter()
        .filter_map(|agency| {
            let office = agency.profile.office_name.as_deref()?;
            (!office.is_empty()).then(|| (office.to_lowercase(), agency.id))
        })
        .collect()
}

fn should_log_progress(processed: usize, total: usize) -> bool {
    processed == 1 || processed % 10 == 0 || processed == total
}

/// Apply the vendor directory to the store.
///
/// Matches update only directory-sourced fields; misses create a record with
/// empty bookkeeping and a zero count. A failed write is recorded in its
/// outcome and the run continues. With `prune`, stored agencies whose non-empty
/// office name no longer appears in the directory are deleted. Only the initial
/// listing of the store can fail the run as a whole.
pub async fn reconcile<R>(
    repository: &R,
    external: Vec<ExternalAgencyRecord>,
    prune: bool,
) -> Result<ReconciliationReport, RepositoryError>
where
    R: AgencyRepository + ?Sized,
{
    let external = dedupe_by_office_name(external);
    let existing = repository.list().await?;
    let by_office_name = lookup_by_office_name(&existing);
    tracing::info!(
        external = external.len(),
        existing = existing.len(),
        indexed = by_office_name.len(),
        "reconciling agencies"
    );

    let mut report = ReconciliationReport::default();
    let total = external.len();

    for (position, record) in external.iter().enumerate() {
        let processed = position + 1;
        if should_log_progress(processed, total) {
            tracing::info!(processed, total, "reconcile progress");
        }

        let profile = record.to_profile();
        let office_name = record.office_name_or_empty();
        let agency = AgencySummary::from_profile(&profile);
        let matched = if office_name.is_empty() {
            None
        } else {
            by_office_name.get(&office_name.to_lowercase()).copied()
        };

        let outcome = match matched {
            Some(id) => ReconcileOutcome {
                action: ReconcileAction::Updated,
                agency,
                result: repository
                    .apply_profile(id, profile)
                    .await
                    .map(|stored| stored.id),
            },
            None => ReconcileOutcome {
                action: ReconcileAction::Added,
                agency,
                result: repository
                    .insert(NewAgency::from_profile(profile))
                    .await
                    .map(|stored| stored.id),
            },
        };

        match &outcome.result {
            Ok(id) => tracing::debug!(%id, office_name, action = ?outcome.action, "agency synced"),
            Err(error) => tracing::warn!(
                office_name,
                name = outcome.agency.name.as_deref().unwrap_or_default(),
                action = ?outcome.action,
                %error,
                "agency sync failed"
            ),
        }
        report.outcomes.push(outcome);
    }

    if prune {
        let external_names: HashSet<String> = external
            .iter()
            .filter_map(|record| record.office_name.as_deref())
            .filter(|name| !name.is_empty())
            .map(str::to_lowercase)
            .collect();

        for agency in &existing {
            let Some(office_name) = agency.profile.office_name.as_deref() else {
                continue;
            };
            if office_name.is_empty() || external_names.contains(&office_name.to_lowercase()) {
                continue;
            }

            let result = repository.delete(agency.id).await.map(|()| agency.id);
            if let Err(error) = &result {
                tracing::warn!(id = %agency.id, office_name, %error, "agency removal failed");
            }
            report.outcomes.push(ReconcileOutcome {
                action: ReconcileAction::Removed,
                agency: agency.summary(),
                result,
            });
        }
    }

    let summary = report.summary();
    tracing::info!(
        added = summary.added,
        updated = summary.updated,
        removed = summary.removed,
        failed = report.failures().count(),
        "reconciliation finished"
    );
    Ok(report)
}
