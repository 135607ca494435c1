//! Interfaces to the external collaborators the pipeline consumes.
//!
//! The pipeline only decides; transport, rendering, and ledger mechanics
//! live behind these seams.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{JobId, OrgId, PackId, ReadinessSummary, WorkOrderId};

/// Invoice view returned by the billing system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInvoiceView {
    pub status: String,
    pub is_paid: bool,
}

/// Receipt for a consumed credit reservation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditConsumption {
    pub ledger_id: String,
}

/// Metering event emitted for every release attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageEvent {
    pub org: OrgId,
    pub work_order_id: WorkOrderId,
    pub pack_id: PackId,
    pub kind: String,
    pub result: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("billing unavailable: {0}")]
    Unavailable(String),
    #[error("billing rejected the request: {0}")]
    Rejected(String),
}

/// Billing collaborator. Lookup failures must degrade, not crash, the
/// release flow.
pub trait BillingProvider: Send + Sync {
    fn get_service_invoice(
        &self,
        org: &OrgId,
        invoice_id: &str,
    ) -> Result<ServiceInvoiceView, BillingError>;
    fn consume_credits(
        &self,
        reservation_id: &str,
        idempotency_key: &str,
    ) -> Result<CreditConsumption, BillingError>;
    fn ingest_usage_event(&self, event: UsageEvent) -> Result<(), BillingError>;
}

/// Detail view served by the spine system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkOrderDetail {
    pub readiness: ReadinessSummary,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("snapshot {version} for work order {work_order} not exportable")]
    SnapshotMissing { work_order: String, version: u32 },
    #[error("export collaborator unavailable: {0}")]
    Unavailable(String),
}

/// Export collaborator materializing the canonical bundle for a snapshot.
pub trait SpineExporter: Send + Sync {
    fn export_work_order(
        &self,
        id: &WorkOrderId,
        snapshot_version: u32,
    ) -> Result<serde_json::Value, ExportError>;
    fn get_work_order_detail(&self, id: &WorkOrderId) -> Result<WorkOrderDetail, ExportError>;
}

/// Append-only audit note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditNote {
    pub org: OrgId,
    pub parent_ref: String,
    pub action: String,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit sink failed: {0}")]
    Sink(String),
}

/// Audit sink. Writes are best-effort: failures are logged and swallowed,
/// never allowed to roll back the primary operation.
pub trait AuditSink: Send + Sync {
    fn record(&self, note: AuditNote) -> Result<(), AuditError>;
}

/// Payload describing the rendering work a caller must enqueue after a pack
/// is created. The pipeline never performs the enqueue itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderQueuePayload {
    pub job_id: JobId,
    pub pack_id: PackId,
    pub work_order_id: WorkOrderId,
    pub template_key: String,
    pub idempotency_key: String,
}
