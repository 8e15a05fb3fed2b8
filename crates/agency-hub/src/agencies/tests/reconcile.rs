use super::common::*;
use crate::agencies::domain::{AgencyBookkeeping, ExternalAgencyRecord};
use crate::agencies::{
    dedupe_by_office_name, reconcile, AgencyRepository, InMemoryAgencyRepository,
    ReconcileAction, RefreshSummary,
};

#[tokio::test]
async fn match_is_case_insensitive_and_keeps_bookkeeping() {
    let mut main = stored("Old Name", Some("Main"), Some("OLD"));
    main.bookkeeping = AgencyBookkeeping {
        ghl_id: Some("X".to_string()),
        whmcs_id: Some("W-7".to_string()),
        primary_source: Some("acquaint".to_string()),
    };
    main.total_properties = 5;
    let repository = InMemoryAgencyRepository::seeded([main]);

    let report = reconcile(
        &repository,
        vec![external("New Name", "MAIN", "NEW")],
        false,
    )
    .await
    .expect("reconciles");

    assert_eq!(
        report.summary(),
        RefreshSummary {
            added: 0,
            updated: 1,
            unchanged: 0,
            removed: 0
        }
    );

    let agencies = all(&repository).await;
    assert_eq!(agencies.len(), 1);
    let agency = &agencies[0];
    assert_eq!(agency.profile.name.as_deref(), Some("New Name"));
    assert_eq!(agency.profile.office_name.as_deref(), Some("MAIN"));
    assert_eq!(agency.profile.unique_key.as_deref(), Some("NEW"));
    assert_eq!(agency.profile.myhome_api_key.as_deref(), Some("mh-NEW"));
    assert_eq!(agency.bookkeeping.ghl_id.as_deref(), Some("X"));
    assert_eq!(agency.bookkeeping.whmcs_id.as_deref(), Some("W-7"));
    assert_eq!(agency.bookkeeping.primary_source.as_deref(), Some("acquaint"));
    assert_eq!(agency.total_properties, 5);
}

#[tokio::test]
async fn new_records_start_with_empty_bookkeeping() {
    let repository = InMemoryAgencyRepository::default();
    let report = reconcile(&repository, vec![external("Harbour", "Harbour", "HARB")], false)
        .await
        .expect("reconciles");

    let results = report.results();
    assert_eq!(results.added.len(), 1);
    assert_eq!(results.added[0].unique_key.as_deref(), Some("HARB"));

    let agency = &all(&repository).await[0];
    assert_eq!(agency.bookkeeping, AgencyBookkeeping::default());
    assert_eq!(agency.total_properties, 0);
    assert_eq!(agency.profile.fourpm_branch_id, Some(3));
}

#[tokio::test]
async fn duplicate_office_names_process_only_the_first() {
    let repository = InMemoryAgencyRepository::default();
    let report = reconcile(
        &repository,
        vec![
            external("First", "Dock", "D1"),
            external("Second", "Dock", "D2"),
        ],
        false,
    )
    .await
    .expect("reconciles");

    assert_eq!(report.outcomes.len(), 1);
    let agencies = all(&repository).await;
    assert_eq!(agencies.len(), 1);
    assert_eq!(agencies[0].profile.name.as_deref(), Some("First"));
}

#[test]
fn dedupe_is_exact_on_office_name_and_treats_missing_as_one_value() {
    let mut nameless_a = external("A", "", "A");
    nameless_a.office_name = None;
    let mut nameless_b = external("B", "", "B");
    nameless_b.office_name = None;

    let kept = dedupe_by_office_name(vec![
        external("Upper", "MAIN", "U"),
        external("Lower", "main", "L"),
        nameless_a,
        nameless_b,
    ]);
    let names: Vec<_> = kept.iter().filter_map(|record| record.name.as_deref()).collect();
    assert_eq!(names, vec!["Upper", "Lower", "A"]);
}

#[tokio::test]
async fn prune_removes_absent_offices_but_never_unnamed_ones() {
    let repository = InMemoryAgencyRepository::seeded([
        stored("Kept", Some("Main"), Some("MAIN")),
        stored("Ghost", Some("Ghost"), Some("GHOST")),
        stored("No Office", None, Some("NONE")),
        stored("Blank Office", Some(""), Some("BLANK")),
    ]);

    let report = reconcile(&repository, vec![external("Kept", "main", "MAIN")], true)
        .await
        .expect("reconciles");

    let results = report.results();
    assert_eq!(results.updated.len(), 1);
    assert_eq!(results.removed.len(), 1);
    assert_eq!(results.removed[0].office_name.as_deref(), Some("Ghost"));

    let names: Vec<_> = all(&repository)
        .await
        .into_iter()
        .filter_map(|agency| agency.profile.name)
        .collect();
    assert_eq!(names, vec!["Kept", "No Office", "Blank Office"]);
}

#[tokio::test]
async fn without_prune_nothing_is_removed() {
    let repository = InMemoryAgencyRepository::seeded([stored("Ghost", Some("Ghost"), None)]);
    let report = reconcile(&repository, Vec::new(), false)
        .await
        .expect("reconciles");
    assert_eq!(report.summary().removed, 0);
    assert_eq!(all(&repository).await.len(), 1);
}

#[tokio::test]
async fn identical_matches_still_count_as_updates() {
    let repository = InMemoryAgencyRepository::default();
    let records = vec![external("Same", "Same", "S")];
    reconcile(&repository, records.clone(), false)
        .await
        .expect("first pass");

    let second = reconcile(&repository, records, false)
        .await
        .expect("second pass");
    let summary = second.summary();
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.unchanged, 0);
    assert!(second.results().unchanged.is_empty());
}

#[tokio::test]
async fn records_without_office_name_are_always_created() {
    let repository = InMemoryAgencyRepository::seeded([stored("Blank", Some(""), None)]);
    let mut record = external("Nameless", "", "N");
    record.office_name = None;

    let report = reconcile(&repository, vec![record], false)
        .await
        .expect("reconciles");
    assert_eq!(report.summary().added, 1);

    let agencies = all(&repository).await;
    assert_eq!(agencies.len(), 2);
    assert_eq!(agencies[1].profile.office_name.as_deref(), Some(""));
}

#[tokio::test]
async fn failed_create_is_recorded_and_batch_continues() {
    let repository = RejectingInserts {
        inner: InMemoryAgencyRepository::default(),
        office_name: "Broken".to_string(),
    };
    let records: Vec<ExternalAgencyRecord> = vec![
        external("Before", "Before", "B1"),
        external("Broken", "Broken", "B2"),
        external("After", "After", "B3"),
    ];

    let report = reconcile(&repository, records, false)
        .await
        .expect("run succeeds overall");

    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].action, ReconcileAction::Added);
    assert_eq!(failures[0].agency.office_name.as_deref(), Some("Broken"));

    let results = report.results();
    let added: Vec<_> = results
        .added
        .iter()
        .filter_map(|agency| agency.name.as_deref())
        .collect();
    assert_eq!(added, vec!["Before", "After"]);
    assert_eq!(repository.list().await.expect("list").len(), 2);
}
