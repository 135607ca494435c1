use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::workflows::reportgen::collaborators::{
    AuditError, AuditNote, AuditSink, BillingError, BillingProvider, CreditConsumption,
    ServiceInvoiceView, UsageEvent,
};
use crate::workflows::reportgen::contract::{
    ContractPatch, PartySection, PropertySection, ValuationInputs,
};
use crate::workflows::reportgen::domain::{
    EvidenceKind, GenerationJob, JobStatus, OrgId, ReportType, WorkOrder, WorkOrderStatus,
};
use crate::workflows::reportgen::memory::{
    InMemoryBilling, InMemoryPacks, InMemoryProfiles, InMemoryReleases, InMemoryWorkOrders,
    RecordingAuditSink, SnapshotSpineExporter,
};
use crate::workflows::reportgen::pack::PackFactory;
use crate::workflows::reportgen::release::ReleaseGate;
use crate::workflows::reportgen::repository::PackRepository;
use crate::workflows::reportgen::rules::RulesConfig;
use crate::workflows::reportgen::service::{NewEvidenceItem, NewWorkOrder, WorkOrderService};
use crate::workflows::reportgen::units::MeasureUnit;

pub(super) type TestPackFactory = PackFactory<
    InMemoryWorkOrders,
    InMemoryPacks,
    SnapshotSpineExporter<InMemoryWorkOrders>,
    RecordingAuditSink,
>;
pub(super) type TestReleaseGate = ReleaseGate<
    InMemoryWorkOrders,
    InMemoryPacks,
    InMemoryReleases,
    InMemoryBilling,
    RecordingAuditSink,
>;

/// All stores, collaborators, and services wired over process memory.
pub(super) struct PipelineHarness {
    pub work_orders_repo: Arc<InMemoryWorkOrders>,
    pub profiles_repo: Arc<InMemoryProfiles>,
    pub packs_repo: Arc<InMemoryPacks>,
    pub releases_repo: Arc<InMemoryReleases>,
    pub billing: Arc<InMemoryBilling>,
    pub audit: Arc<RecordingAuditSink>,
    pub service: WorkOrderService<InMemoryWorkOrders, InMemoryProfiles>,
    pub pack_factory: TestPackFactory,
    pub release_gate: TestReleaseGate,
}

pub(super) fn harness() -> PipelineHarness {
    let work_orders_repo = Arc::new(InMemoryWorkOrders::default());
    let profiles_repo = Arc::new(InMemoryProfiles::default());
    let packs_repo = Arc::new(InMemoryPacks::default());
    let releases_repo = Arc::new(InMemoryReleases::default());
    let billing = Arc::new(InMemoryBilling::default());
    let audit = Arc::new(RecordingAuditSink::default());

    let service = WorkOrderService::new(
        work_orders_repo.clone(),
        profiles_repo.clone(),
        RulesConfig::default(),
    );
    let pack_factory = PackFactory::new(
        work_orders_repo.clone(),
        packs_repo.clone(),
        Arc::new(SnapshotSpineExporter::new(work_orders_repo.clone())),
        audit.clone(),
    );
    let release_gate = ReleaseGate::new(
        work_orders_repo.clone(),
        packs_repo.clone(),
        releases_repo.clone(),
        billing.clone(),
        audit.clone(),
    );

    PipelineHarness {
        work_orders_repo,
        profiles_repo,
        packs_repo,
        releases_repo,
        billing,
        audit,
        service,
        pack_factory,
        release_gate,
    }
}

pub(super) fn org() -> OrgId {
    OrgId("org-acme".to_string())
}

pub(super) fn captured(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 10, 0, 0)
        .single()
        .expect("valid capture base time")
        + Duration::minutes(minute as i64)
}

pub(super) fn intake() -> NewWorkOrder {
    NewWorkOrder {
        org: org(),
        report_type: ReportType::LandAndBuilding,
        parent_ref: Some("case-1001".to_string()),
        credit_reservation_id: None,
        service_invoice_id: None,
    }
}

pub(super) fn evidence_item(
    kind: EvidenceKind,
    tags: &[(&str, &str)],
    doc_type: Option<&str>,
    minute: u32,
) -> NewEvidenceItem {
    NewEvidenceItem {
        kind,
        doc_type: doc_type.map(str::to_string),
        tags: tags
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<BTreeMap<_, _>>(),
        captured_at: Some(captured(minute)),
    }
}

/// Everything the standard land-and-building profile marks required.
pub(super) fn required_evidence() -> Vec<NewEvidenceItem> {
    vec![
        evidence_item(EvidenceKind::Photo, &[("category", "exterior")], None, 0),
        evidence_item(EvidenceKind::Photo, &[("category", "exterior")], None, 1),
        evidence_item(EvidenceKind::Photo, &[("category", "interior")], None, 2),
        evidence_item(EvidenceKind::Geo, &[("category", "gps")], None, 3),
        evidence_item(EvidenceKind::Document, &[], Some("title_deed"), 4),
    ]
}

pub(super) fn complete_patch() -> ContractPatch {
    ContractPatch {
        party: Some(PartySection {
            bank_name: Some("State Bank of India".to_string()),
            bank_branch: Some("Camp Branch".to_string()),
            borrower_name: Some("R. Deshmukh".to_string()),
        }),
        property: Some(PropertySection {
            address: Some("Plot 12, Shivaji Nagar, Pune".to_string()),
            land_area: Some(1200.0),
            land_area_unit: Some(MeasureUnit::Sqft),
            built_up_area: Some(900.0),
            built_up_area_unit: Some(MeasureUnit::Sqft),
        }),
        valuation_inputs: Some(ValuationInputs {
            input_unit: Some(MeasureUnit::Sqft),
            guideline_rate: Some(1800.0),
            guideline_rate_unit: Some(MeasureUnit::Sqft),
            market_rate: Some(2500.0),
            market_rate_unit: Some(MeasureUnit::Sqft),
            land_value: Some(3_000_000.0),
            building_value: Some(1_500_000.0),
            ..ValuationInputs::default()
        }),
        ..ContractPatch::default()
    }
}

/// Seed, create, capture evidence, and patch until the order is ready to
/// render.
pub(super) fn ready_work_order(harness: &PipelineHarness, intake: NewWorkOrder) -> WorkOrder {
    harness
        .service
        .seed_defaults(&intake.org)
        .expect("seeding succeeds");
    let order = harness
        .service
        .create_work_order(intake)
        .expect("work order created");
    for item in required_evidence() {
        harness
            .service
            .add_evidence(&order.id, item)
            .expect("evidence accepted");
    }
    let outcome = harness
        .service
        .patch_contract(&order.id, complete_patch())
        .expect("patch succeeds");
    assert_eq!(
        outcome.work_order.status,
        WorkOrderStatus::ReadyForRender,
        "fixture should reach ready_for_render, readiness: {:?}",
        outcome.snapshot.readiness
    );
    outcome.work_order
}

pub(super) fn complete_job(harness: &PipelineHarness, job: &GenerationJob) {
    let mut job = job.clone();
    job.status = JobStatus::Completed;
    harness
        .packs_repo
        .update_job(job)
        .expect("job transitions to completed");
}

/// Billing collaborator that is entirely offline.
pub(super) struct FailingBilling;

impl BillingProvider for FailingBilling {
    fn get_service_invoice(
        &self,
        _org: &OrgId,
        _invoice_id: &str,
    ) -> Result<ServiceInvoiceView, BillingError> {
        Err(BillingError::Unavailable("billing offline".to_string()))
    }

    fn consume_credits(
        &self,
        _reservation_id: &str,
        _idempotency_key: &str,
    ) -> Result<CreditConsumption, BillingError> {
        Err(BillingError::Unavailable("billing offline".to_string()))
    }

    fn ingest_usage_event(&self, _event: UsageEvent) -> Result<(), BillingError> {
        Err(BillingError::Unavailable("billing offline".to_string()))
    }
}

/// Audit sink that rejects every write.
pub(super) struct FailingAuditSink;

impl AuditSink for FailingAuditSink {
    fn record(&self, _note: AuditNote) -> Result<(), AuditError> {
        Err(AuditError::Sink("sink offline".to_string()))
    }
}
