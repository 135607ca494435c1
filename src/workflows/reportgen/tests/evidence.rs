use std::collections::BTreeMap;

use super::common::*;
use crate::workflows::reportgen::domain::{
    BankType, EvidenceItem, EvidenceItemId, EvidenceKind, EvidenceProfile, EvidenceProfileId,
    ProfileItem, ReportType, ValueSlab, WorkOrderId,
};
use crate::workflows::reportgen::evidence::{
    build_checklist, ordered_annexure, suggest_for_missing_fields, ProfileResolver,
};
use crate::workflows::reportgen::repository::{ProfileRepository, WorkOrderRepository};
use crate::workflows::reportgen::service::NewWorkOrder;

fn profile_with_items(items: Vec<ProfileItem>) -> EvidenceProfile {
    EvidenceProfile {
        id: EvidenceProfileId("profile-test".to_string()),
        org: org(),
        name: "test-profile".to_string(),
        report_type: ReportType::LandAndBuilding,
        bank_scope: BankType::Generic,
        slab_scope: ValueSlab::Unknown,
        items,
    }
}

fn profile_item(id: &str, kind: EvidenceKind, min_count: u32, required: bool) -> ProfileItem {
    ProfileItem {
        id: id.to_string(),
        label: format!("Item {id}"),
        kind,
        doc_type: None,
        min_count,
        required,
        tags: BTreeMap::new(),
        field_hint: None,
        order_hint: 10,
    }
}

fn stored_evidence(
    id: &str,
    kind: EvidenceKind,
    tags: &[(&str, &str)],
    doc_type: Option<&str>,
    minute: u32,
) -> EvidenceItem {
    EvidenceItem {
        id: EvidenceItemId(id.to_string()),
        work_order_id: WorkOrderId("wo-test".to_string()),
        kind,
        doc_type: doc_type.map(str::to_string),
        tags: tags
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect(),
        annexure_position: None,
        captured_at: captured(minute),
    }
}

#[test]
fn seeding_is_idempotent() {
    let harness = harness();
    let first = harness.service.seed_defaults(&org()).expect("first seed");
    assert!(first.profiles_created > 0);
    assert!(first.fields_created > 0);

    let second = harness.service.seed_defaults(&org()).expect("second seed");
    assert_eq!(second.profiles_created, 0);
    assert_eq!(second.fields_created, 0);
}

#[test]
fn cooperative_work_orders_pick_the_cooperative_profile() {
    let harness = harness();
    harness.service.seed_defaults(&org()).expect("seeded");

    let order = harness
        .service
        .create_work_order(intake())
        .expect("created");
    // Force the classification a cooperative contract would produce.
    let mut stored = harness.service.get(&order.id).expect("fetched");
    stored.bank_type = Some(BankType::Cooperative);
    stored.profile_id = None;
    harness
        .work_orders_repo
        .update(stored)
        .expect("classification applied");

    let resolver = ProfileResolver::new(
        harness.profiles_repo.clone(),
        harness.work_orders_repo.clone(),
    );
    let selection = resolver
        .resolve_for_work_order(&order.id)
        .expect("resolution succeeds")
        .expect("a profile matches");

    assert_eq!(selection.profile.name, "coop-land-building");
    assert!(selection.newly_assigned);
}

#[test]
fn slab_match_outranks_the_generic_fallback() {
    let harness = harness();
    harness.service.seed_defaults(&org()).expect("seeded");

    let order = harness
        .service
        .create_work_order(intake())
        .expect("created");
    let mut stored = harness.service.get(&order.id).expect("fetched");
    stored.value_slab = ValueSlab::Gt5Cr;
    stored.profile_id = None;
    harness
        .work_orders_repo
        .update(stored)
        .expect("slab applied");

    let resolver = ProfileResolver::new(
        harness.profiles_repo.clone(),
        harness.work_orders_repo.clone(),
    );
    let selection = resolver
        .resolve_for_work_order(&order.id)
        .expect("resolution succeeds")
        .expect("a profile matches");

    assert_eq!(selection.profile.name, "high-value-land-building");
}

#[test]
fn equal_scores_tie_break_on_name_ascending() {
    let harness = harness();
    for name in ["beta-profile", "alpha-profile"] {
        let mut profile = profile_with_items(vec![]);
        profile.id = EvidenceProfileId(format!("profile-{name}"));
        profile.name = name.to_string();
        assert!(harness
            .profiles_repo
            .insert_profile_if_absent(profile)
            .expect("inserted"));
    }

    let order = harness
        .service
        .create_work_order(intake())
        .expect("created");
    let resolver = ProfileResolver::new(
        harness.profiles_repo.clone(),
        harness.work_orders_repo.clone(),
    );
    let selection = resolver
        .resolve_for_work_order(&order.id)
        .expect("resolution succeeds")
        .expect("a profile matches");

    assert_eq!(selection.profile.name, "alpha-profile");
}

#[test]
fn profile_assignment_happens_once() {
    let harness = harness();
    harness.service.seed_defaults(&org()).expect("seeded");
    let order = harness
        .service
        .create_work_order(intake())
        .expect("created");

    let resolver = ProfileResolver::new(
        harness.profiles_repo.clone(),
        harness.work_orders_repo.clone(),
    );
    let first = resolver
        .resolve_for_work_order(&order.id)
        .expect("resolution succeeds")
        .expect("a profile matches");
    let second = resolver
        .resolve_for_work_order(&order.id)
        .expect("resolution succeeds")
        .expect("a profile matches");

    // Creation already pinned the profile, so neither call re-assigns.
    assert!(!first.newly_assigned);
    assert!(!second.newly_assigned);
    assert_eq!(first.profile.id, second.profile.id);

    let stored = harness.service.get(&order.id).expect("fetched");
    assert_eq!(stored.profile_id, Some(first.profile.id));
}

#[test]
fn short_counts_report_missing_and_unsatisfied() {
    let mut item = profile_item("exterior-photos", EvidenceKind::Photo, 2, true);
    item.tags
        .insert("category".to_string(), "exterior".to_string());
    let profile = profile_with_items(vec![item]);

    let evidence = vec![stored_evidence(
        "ev-1",
        EvidenceKind::Photo,
        &[("category", "exterior")],
        None,
        0,
    )];

    let rows = build_checklist(&profile, &evidence);
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.current_count, 1);
    assert_eq!(row.missing_count, 1);
    assert!(!row.satisfied);
    assert_eq!(row.matched_evidence, vec![EvidenceItemId("ev-1".to_string())]);
}

#[test]
fn matching_requires_doc_type_and_tag_subset() {
    let mut item = profile_item("deed", EvidenceKind::Document, 1, true);
    item.doc_type = Some("title_deed".to_string());
    item.tags.insert("floor".to_string(), "ground".to_string());
    let profile = profile_with_items(vec![item]);

    let evidence = vec![
        // Wrong doc type.
        stored_evidence("ev-1", EvidenceKind::Document, &[("floor", "ground")], Some("tax_receipt"), 0),
        // Missing required tag.
        stored_evidence("ev-2", EvidenceKind::Document, &[], Some("title_deed"), 1),
        // Extra tags are fine.
        stored_evidence(
            "ev-3",
            EvidenceKind::Document,
            &[("floor", "ground"), ("source", "registrar")],
            Some("title_deed"),
            2,
        ),
    ];

    let rows = build_checklist(&profile, &evidence);
    assert_eq!(rows[0].matched_evidence, vec![EvidenceItemId("ev-3".to_string())]);
    assert!(rows[0].satisfied);
}

#[test]
fn rows_sort_by_order_hint_then_item_id() {
    let mut late = profile_item("a-item", EvidenceKind::Photo, 1, false);
    late.order_hint = 30;
    let mut early = profile_item("z-item", EvidenceKind::Photo, 1, false);
    early.order_hint = 10;
    let mut tied = profile_item("b-item", EvidenceKind::Photo, 1, false);
    tied.order_hint = 30;

    let profile = profile_with_items(vec![late, early, tied]);
    let rows = build_checklist(&profile, &[]);

    let order: Vec<&str> = rows.iter().map(|row| row.item_id.as_str()).collect();
    assert_eq!(order, vec!["z-item", "a-item", "b-item"]);
}

// The satisfaction boolean ignores `required` on purpose: both branches of
// the legacy implementation computed the same expression, and that behavior
// is preserved until product intent says otherwise.
#[test]
fn required_flag_does_not_change_satisfied() {
    let required = profile_item("required-item", EvidenceKind::Photo, 1, true);
    let optional = profile_item("optional-item", EvidenceKind::Photo, 1, false);
    let profile = profile_with_items(vec![required, optional]);

    let rows = build_checklist(&profile, &[]);
    assert!(rows.iter().all(|row| !row.satisfied));

    let evidence = vec![stored_evidence("ev-1", EvidenceKind::Photo, &[], None, 0)];
    let rows = build_checklist(&profile, &evidence);
    assert!(rows.iter().all(|row| row.satisfied));
}

#[test]
fn suggestions_surface_rows_by_field_hint() {
    let mut hinted = profile_item("rate-shot", EvidenceKind::Screenshot, 1, false);
    hinted.field_hint = Some("valuation_inputs.guideline_rate".to_string());
    let unhinted = profile_item("deed", EvidenceKind::Document, 1, true);
    let profile = profile_with_items(vec![hinted, unhinted]);

    let rows = build_checklist(&profile, &[]);
    let missing = vec![
        "valuation_inputs.guideline_rate".to_string(),
        "party.bank_name".to_string(),
    ];
    let suggestions = suggest_for_missing_fields(&rows, &missing);

    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].item_id, "rate-shot");
    assert_eq!(suggestions[0].field_key, "valuation_inputs.guideline_rate");
}

#[test]
fn annexure_order_follows_the_category_rank_table() {
    let items = vec![
        stored_evidence("ev-doc", EvidenceKind::Document, &[], Some("title_deed"), 0),
        stored_evidence("ev-int", EvidenceKind::Photo, &[("category", "interior")], None, 1),
        stored_evidence("ev-ext", EvidenceKind::Photo, &[("category", "exterior")], None, 2),
        stored_evidence("ev-gps", EvidenceKind::Geo, &[("category", "gps")], None, 3),
        stored_evidence("ev-route", EvidenceKind::Screenshot, &[("category", "route-map")], None, 4),
        stored_evidence("ev-shot", EvidenceKind::Screenshot, &[], None, 5),
    ];

    let assignments = ordered_annexure(&items);
    let order: Vec<&str> = assignments
        .iter()
        .map(|assignment| assignment.evidence_id.0.as_str())
        .collect();

    assert_eq!(
        order,
        vec!["ev-ext", "ev-int", "ev-gps", "ev-route", "ev-shot", "ev-doc"]
    );
    let positions: Vec<u32> = assignments.iter().map(|a| a.position).collect();
    assert_eq!(positions, vec![1, 2, 3, 4, 5, 6]);
}

#[test]
fn annexure_ties_break_on_existing_position_then_capture_time() {
    let mut pinned = stored_evidence("ev-b", EvidenceKind::Photo, &[("category", "exterior")], None, 5);
    pinned.annexure_position = Some(1);
    let earlier = stored_evidence("ev-a", EvidenceKind::Photo, &[("category", "exterior")], None, 0);

    let assignments = ordered_annexure(&[earlier, pinned]);
    let order: Vec<&str> = assignments
        .iter()
        .map(|assignment| assignment.evidence_id.0.as_str())
        .collect();

    // The explicitly pinned item keeps its precedence despite the later
    // capture time.
    assert_eq!(order, vec!["ev-b", "ev-a"]);
}

#[test]
fn unmatched_work_order_without_profiles_resolves_to_none() {
    let harness = harness();
    let order = harness
        .service
        .create_work_order(NewWorkOrder {
            org: org(),
            report_type: ReportType::ApartmentFlat,
            parent_ref: None,
            credit_reservation_id: None,
            service_invoice_id: None,
        })
        .expect("created");

    let resolver = ProfileResolver::new(
        harness.profiles_repo.clone(),
        harness.work_orders_repo.clone(),
    );
    let selection = resolver
        .resolve_for_work_order(&order.id)
        .expect("resolution succeeds");
    assert!(selection.is_none());
}
