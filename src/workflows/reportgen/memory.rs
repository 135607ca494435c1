//! In-memory reference implementations of the repository and collaborator
//! seams. The development server runs on these; the test suites reuse them.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use super::collaborators::{
    AuditError, AuditNote, AuditSink, BillingError, BillingProvider, CreditConsumption,
    ExportError, ServiceInvoiceView, SpineExporter, UsageEvent, WorkOrderDetail,
};
use super::domain::{
    ContractSnapshot, DeliverableRelease, EvidenceItem, EvidenceProfile, EvidenceProfileId,
    FieldDefinition, GenerationJob, OrgId, PackId, ReportPack, ReportType, WorkOrder, WorkOrderId,
};
use super::repository::{
    InsertOutcome, PackRepository, ProfileRepository, ReleaseRepository, RepositoryError,
    WorkOrderRepository,
};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
}

/// Work orders, snapshots, and evidence held in process memory.
#[derive(Default)]
pub struct InMemoryWorkOrders {
    orders: Mutex<HashMap<WorkOrderId, WorkOrder>>,
    snapshots: Mutex<HashMap<WorkOrderId, Vec<ContractSnapshot>>>,
    evidence: Mutex<Vec<EvidenceItem>>,
}

impl WorkOrderRepository for InMemoryWorkOrders {
    fn insert(&self, order: WorkOrder) -> Result<WorkOrder, RepositoryError> {
        let mut orders = lock(&self.orders)?;
        if orders.contains_key(&order.id) {
            return Err(RepositoryError::Conflict);
        }
        orders.insert(order.id.clone(), order.clone());
        Ok(order)
    }

    fn fetch(&self, id: &WorkOrderId) -> Result<Option<WorkOrder>, RepositoryError> {
        Ok(lock(&self.orders)?.get(id).cloned())
    }

    fn update(&self, order: WorkOrder) -> Result<(), RepositoryError> {
        let mut orders = lock(&self.orders)?;
        if !orders.contains_key(&order.id) {
            return Err(RepositoryError::NotFound);
        }
        orders.insert(order.id.clone(), order);
        Ok(())
    }

    fn append_snapshot(&self, snapshot: ContractSnapshot) -> Result<(), RepositoryError> {
        let mut snapshots = lock(&self.snapshots)?;
        let entry = snapshots
            .entry(snapshot.work_order_id.clone())
            .or_default();
        let highest = entry.iter().map(|s| s.version).max().unwrap_or(0);
        if snapshot.version <= highest {
            return Err(RepositoryError::Conflict);
        }
        entry.push(snapshot);
        Ok(())
    }

    fn latest_snapshot(
        &self,
        id: &WorkOrderId,
    ) -> Result<Option<ContractSnapshot>, RepositoryError> {
        let snapshots = lock(&self.snapshots)?;
        Ok(snapshots
            .get(id)
            .and_then(|entries| entries.iter().max_by_key(|s| s.version))
            .cloned())
    }

    fn insert_evidence(&self, item: EvidenceItem) -> Result<EvidenceItem, RepositoryError> {
        let mut evidence = lock(&self.evidence)?;
        if evidence.iter().any(|existing| existing.id == item.id) {
            return Err(RepositoryError::Conflict);
        }
        evidence.push(item.clone());
        Ok(item)
    }

    fn evidence_for(&self, id: &WorkOrderId) -> Result<Vec<EvidenceItem>, RepositoryError> {
        let evidence = lock(&self.evidence)?;
        Ok(evidence
            .iter()
            .filter(|item| &item.work_order_id == id)
            .cloned()
            .collect())
    }
}

/// Seeded profile and field-definition rows.
#[derive(Default)]
pub struct InMemoryProfiles {
    profiles: Mutex<Vec<EvidenceProfile>>,
    fields: Mutex<Vec<FieldDefinition>>,
}

impl ProfileRepository for InMemoryProfiles {
    fn insert_field_definition_if_absent(
        &self,
        definition: FieldDefinition,
    ) -> Result<bool, RepositoryError> {
        let mut fields = lock(&self.fields)?;
        if fields
            .iter()
            .any(|existing| existing.org == definition.org && existing.key == definition.key)
        {
            return Ok(false);
        }
        fields.push(definition);
        Ok(true)
    }

    fn insert_profile_if_absent(
        &self,
        profile: EvidenceProfile,
    ) -> Result<bool, RepositoryError> {
        let mut profiles = lock(&self.profiles)?;
        let exists = profiles.iter().any(|existing| {
            existing.org == profile.org
                && existing.report_type == profile.report_type
                && existing.bank_scope == profile.bank_scope
                && existing.slab_scope == profile.slab_scope
                && existing.name == profile.name
        });
        if exists {
            return Ok(false);
        }
        profiles.push(profile);
        Ok(true)
    }

    fn fetch(&self, id: &EvidenceProfileId) -> Result<Option<EvidenceProfile>, RepositoryError> {
        let profiles = lock(&self.profiles)?;
        Ok(profiles.iter().find(|profile| &profile.id == id).cloned())
    }

    fn default_profiles(
        &self,
        org: &OrgId,
        report_type: ReportType,
    ) -> Result<Vec<EvidenceProfile>, RepositoryError> {
        let profiles = lock(&self.profiles)?;
        Ok(profiles
            .iter()
            .filter(|profile| &profile.org == org && profile.report_type == report_type)
            .cloned()
            .collect())
    }
}

/// Report packs and generation jobs.
#[derive(Default)]
pub struct InMemoryPacks {
    packs: Mutex<Vec<ReportPack>>,
    jobs: Mutex<Vec<GenerationJob>>,
}

impl PackRepository for InMemoryPacks {
    fn pack_for_work_order(
        &self,
        id: &WorkOrderId,
    ) -> Result<Option<ReportPack>, RepositoryError> {
        let packs = lock(&self.packs)?;
        Ok(packs.iter().find(|pack| &pack.work_order_id == id).cloned())
    }

    fn highest_version(
        &self,
        parent_ref: &str,
        template_key: &str,
    ) -> Result<u32, RepositoryError> {
        let packs = lock(&self.packs)?;
        Ok(packs
            .iter()
            .filter(|pack| pack.parent_ref == parent_ref && pack.template_key == template_key)
            .map(|pack| pack.version)
            .max()
            .unwrap_or(0))
    }

    fn insert_or_fetch_pack(
        &self,
        pack: ReportPack,
    ) -> Result<InsertOutcome<ReportPack>, RepositoryError> {
        let mut packs = lock(&self.packs)?;
        if let Some(existing) = packs.iter().find(|candidate| {
            candidate.parent_ref == pack.parent_ref
                && candidate.template_key == pack.template_key
                && candidate.version == pack.version
        }) {
            return Ok(InsertOutcome {
                row: existing.clone(),
                newly_inserted: false,
            });
        }
        packs.push(pack.clone());
        Ok(InsertOutcome {
            row: pack,
            newly_inserted: true,
        })
    }

    fn job_for_pack(&self, pack_id: &PackId) -> Result<Option<GenerationJob>, RepositoryError> {
        let jobs = lock(&self.jobs)?;
        Ok(jobs.iter().find(|job| &job.pack_id == pack_id).cloned())
    }

    fn insert_or_fetch_job(
        &self,
        job: GenerationJob,
    ) -> Result<InsertOutcome<GenerationJob>, RepositoryError> {
        let mut jobs = lock(&self.jobs)?;
        if let Some(existing) = jobs
            .iter()
            .find(|candidate| candidate.idempotency_key == job.idempotency_key)
        {
            return Ok(InsertOutcome {
                row: existing.clone(),
                newly_inserted: false,
            });
        }
        jobs.push(job.clone());
        Ok(InsertOutcome {
            row: job,
            newly_inserted: true,
        })
    }

    fn update_job(&self, job: GenerationJob) -> Result<(), RepositoryError> {
        let mut jobs = lock(&self.jobs)?;
        match jobs.iter_mut().find(|candidate| candidate.id == job.id) {
            Some(existing) => {
                *existing = job;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }
}

/// Release attempt rows.
#[derive(Default)]
pub struct InMemoryReleases {
    releases: Mutex<Vec<DeliverableRelease>>,
}

impl ReleaseRepository for InMemoryReleases {
    fn find_by_idempotency_key(
        &self,
        org: &OrgId,
        key: &str,
    ) -> Result<Option<DeliverableRelease>, RepositoryError> {
        let releases = lock(&self.releases)?;
        Ok(releases
            .iter()
            .find(|release| &release.org == org && release.idempotency_key == key)
            .cloned())
    }

    fn successful_for_pack(
        &self,
        work_order_id: &WorkOrderId,
        pack_id: &PackId,
    ) -> Result<Option<DeliverableRelease>, RepositoryError> {
        let releases = lock(&self.releases)?;
        Ok(releases
            .iter()
            .find(|release| {
                &release.work_order_id == work_order_id
                    && &release.pack_id == pack_id
                    && release.status.is_successful()
            })
            .cloned())
    }

    fn insert_or_fetch(
        &self,
        release: DeliverableRelease,
    ) -> Result<InsertOutcome<DeliverableRelease>, RepositoryError> {
        let mut releases = lock(&self.releases)?;
        if let Some(existing) = releases.iter().find(|candidate| {
            candidate.org == release.org && candidate.idempotency_key == release.idempotency_key
        }) {
            return Ok(InsertOutcome {
                row: existing.clone(),
                newly_inserted: false,
            });
        }
        releases.push(release.clone());
        Ok(InsertOutcome {
            row: release,
            newly_inserted: true,
        })
    }
}

/// Exporter materializing bundles straight from the snapshot store.
pub struct SnapshotSpineExporter<W> {
    work_orders: Arc<W>,
}

impl<W> SnapshotSpineExporter<W> {
    pub fn new(work_orders: Arc<W>) -> Self {
        Self { work_orders }
    }
}

impl<W> SpineExporter for SnapshotSpineExporter<W>
where
    W: WorkOrderRepository + 'static,
{
    fn export_work_order(
        &self,
        id: &WorkOrderId,
        snapshot_version: u32,
    ) -> Result<serde_json::Value, ExportError> {
        let snapshot = self
            .work_orders
            .latest_snapshot(id)
            .map_err(|err| ExportError::Unavailable(err.to_string()))?
            .filter(|snapshot| snapshot.version == snapshot_version)
            .ok_or_else(|| ExportError::SnapshotMissing {
                work_order: id.0.clone(),
                version: snapshot_version,
            })?;

        serde_json::to_value(&snapshot.contract)
            .map(|contract| {
                serde_json::json!({
                    "work_order_id": id.0,
                    "snapshot_version": snapshot_version,
                    "contract": contract,
                })
            })
            .map_err(|err| ExportError::Unavailable(err.to_string()))
    }

    fn get_work_order_detail(&self, id: &WorkOrderId) -> Result<WorkOrderDetail, ExportError> {
        let snapshot = self
            .work_orders
            .latest_snapshot(id)
            .map_err(|err| ExportError::Unavailable(err.to_string()))?
            .ok_or_else(|| ExportError::SnapshotMissing {
                work_order: id.0.clone(),
                version: 0,
            })?;
        Ok(WorkOrderDetail {
            readiness: snapshot.readiness,
        })
    }
}

/// Billing double with a configurable ledger of paid invoices and open
/// reservations. Credit consumption is idempotent per key.
#[derive(Default)]
pub struct InMemoryBilling {
    paid_invoices: Mutex<HashSet<String>>,
    reservations: Mutex<HashSet<String>>,
    consumptions: Mutex<HashMap<String, String>>,
    usage: Mutex<Vec<UsageEvent>>,
    ledger_sequence: AtomicU64,
}

impl InMemoryBilling {
    pub fn mark_invoice_paid(&self, invoice_id: &str) {
        if let Ok(mut paid) = self.paid_invoices.lock() {
            paid.insert(invoice_id.to_string());
        }
    }

    pub fn open_reservation(&self, reservation_id: &str) {
        if let Ok(mut reservations) = self.reservations.lock() {
            reservations.insert(reservation_id.to_string());
        }
    }

    pub fn usage_events(&self) -> Vec<UsageEvent> {
        self.usage
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn consumption_count(&self) -> usize {
        self.consumptions
            .lock()
            .map(|consumptions| consumptions.len())
            .unwrap_or(0)
    }
}

impl BillingProvider for InMemoryBilling {
    fn get_service_invoice(
        &self,
        _org: &OrgId,
        invoice_id: &str,
    ) -> Result<ServiceInvoiceView, BillingError> {
        let paid = self
            .paid_invoices
            .lock()
            .map_err(|_| BillingError::Unavailable("billing mutex poisoned".to_string()))?
            .contains(invoice_id);
        Ok(ServiceInvoiceView {
            status: if paid { "paid" } else { "issued" }.to_string(),
            is_paid: paid,
        })
    }

    fn consume_credits(
        &self,
        reservation_id: &str,
        idempotency_key: &str,
    ) -> Result<CreditConsumption, BillingError> {
        let reservations = self
            .reservations
            .lock()
            .map_err(|_| BillingError::Unavailable("billing mutex poisoned".to_string()))?;
        if !reservations.contains(reservation_id) {
            return Err(BillingError::Rejected(format!(
                "reservation {reservation_id} unknown"
            )));
        }
        drop(reservations);

        let mut consumptions = self
            .consumptions
            .lock()
            .map_err(|_| BillingError::Unavailable("billing mutex poisoned".to_string()))?;
        if let Some(ledger_id) = consumptions.get(idempotency_key) {
            return Ok(CreditConsumption {
                ledger_id: ledger_id.clone(),
            });
        }
        let ledger_id = format!(
            "ledger-{}",
            self.ledger_sequence.fetch_add(1, Ordering::Relaxed) + 1
        );
        consumptions.insert(idempotency_key.to_string(), ledger_id.clone());
        Ok(CreditConsumption { ledger_id })
    }

    fn ingest_usage_event(&self, event: UsageEvent) -> Result<(), BillingError> {
        self.usage
            .lock()
            .map_err(|_| BillingError::Unavailable("billing mutex poisoned".to_string()))?
            .push(event);
        Ok(())
    }
}

/// Audit sink retaining notes for inspection. Never fails.
#[derive(Default)]
pub struct RecordingAuditSink {
    notes: Mutex<Vec<AuditNote>>,
}

impl RecordingAuditSink {
    pub fn notes(&self) -> Vec<AuditNote> {
        self.notes
            .lock()
            .map(|notes| notes.clone())
            .unwrap_or_default()
    }
}

impl AuditSink for RecordingAuditSink {
    fn record(&self, note: AuditNote) -> Result<(), AuditError> {
        self.notes
            .lock()
            .map_err(|_| AuditError::Sink("audit mutex poisoned".to_string()))?
            .push(note);
        Ok(())
    }
}
