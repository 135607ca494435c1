use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::contract::ContractDocument;

/// Identifier wrapper for tenant organizations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrgId(pub String);

/// Identifier wrapper for report work orders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkOrderId(pub String);

/// Identifier wrapper for evidence profiles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvidenceProfileId(pub String);

/// Identifier wrapper for captured evidence items.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EvidenceItemId(pub String);

/// Identifier wrapper for report packs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackId(pub String);

/// Identifier wrapper for generation jobs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

/// Identifier wrapper for deliverable release attempts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReleaseId(pub String);

/// Report families handled by the valuation desk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    LandAndBuilding,
    ApartmentFlat,
    AgriculturalLand,
}

impl ReportType {
    pub const fn code(self) -> &'static str {
        match self {
            Self::LandAndBuilding => "land_and_building",
            Self::ApartmentFlat => "apartment_flat",
            Self::AgriculturalLand => "agricultural_land",
        }
    }
}

/// Lender classification driving template selection and evidence profiles.
///
/// `Generic` doubles as the fallback scope on evidence profiles that apply
/// to any lender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BankType {
    Sbi,
    Psu,
    Cooperative,
    Agricultural,
    Generic,
}

impl BankType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Sbi => "SBI",
            Self::Psu => "PSU",
            Self::Cooperative => "Co-operative",
            Self::Agricultural => "Agricultural",
            Self::Generic => "Generic",
        }
    }
}

/// Valuation slab split at the five-crore line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueSlab {
    #[serde(rename = "UNKNOWN")]
    Unknown,
    #[serde(rename = "LT_5CR")]
    Lt5Cr,
    #[serde(rename = "GT_5CR")]
    Gt5Cr,
}

impl ValueSlab {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Lt5Cr => "LT_5CR",
            Self::Gt5Cr => "GT_5CR",
        }
    }
}

/// Bank-format template resolved by the rules engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemplateSelector {
    #[serde(rename = "COOP_GENERIC")]
    CoopGeneric,
    #[serde(rename = "AGRI_GENERIC")]
    AgriGeneric,
    #[serde(rename = "SBI_FORMAT_A")]
    SbiFormatA,
    #[serde(rename = "BOI_PSU_GENERIC")]
    BoiPsuGeneric,
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl TemplateSelector {
    pub const fn code(self) -> &'static str {
        match self {
            Self::CoopGeneric => "COOP_GENERIC",
            Self::AgriGeneric => "AGRI_GENERIC",
            Self::SbiFormatA => "SBI_FORMAT_A",
            Self::BoiPsuGeneric => "BOI_PSU_GENERIC",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// Work-order lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkOrderStatus {
    Draft,
    DataPending,
    EvidencePending,
    ReadyForRender,
    Closed,
    Cancelled,
}

impl WorkOrderStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::DataPending => "data_pending",
            Self::EvidencePending => "evidence_pending",
            Self::ReadyForRender => "ready_for_render",
            Self::Closed => "closed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Terminal states accept no further patches or evidence.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Cancelled)
    }
}

/// How the release gate settles the deliverable financially.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BillingMode {
    #[serde(rename = "CREDIT")]
    Credit,
    #[serde(rename = "POSTPAID")]
    Postpaid,
}

impl BillingMode {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Credit => "CREDIT",
            Self::Postpaid => "POSTPAID",
        }
    }
}

/// Aggregate root for one valuation report engagement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkOrder {
    pub id: WorkOrderId,
    pub org: OrgId,
    pub report_type: ReportType,
    pub bank_type: Option<BankType>,
    pub value_slab: ValueSlab,
    pub status: WorkOrderStatus,
    pub profile_id: Option<EvidenceProfileId>,
    pub pack_id: Option<PackId>,
    /// Reference to the parent engagement row in the spine system.
    pub parent_ref: Option<String>,
    pub credit_reservation_id: Option<String>,
    pub service_invoice_id: Option<String>,
    pub billing_mode: Option<BillingMode>,
    /// Side channel written by the release gate for billing reconciliation.
    pub billing_hooks: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
}

/// Append-only, monotonically versioned capture of the contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractSnapshot {
    pub work_order_id: WorkOrderId,
    pub version: u32,
    pub contract: ContractDocument,
    pub readiness: ReadinessSummary,
    pub created_at: DateTime<Utc>,
}

/// Readiness digest recorded on every snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadinessSummary {
    pub data_ready: bool,
    pub evidence_ready: bool,
    pub missing_fields: Vec<String>,
    pub unsatisfied_required_items: Vec<String>,
}

impl ReadinessSummary {
    pub fn is_ready(&self) -> bool {
        self.data_ready && self.evidence_ready
    }
}

/// Coarse kind of a captured evidence artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    Document,
    Photo,
    Screenshot,
    Geo,
    Other,
}

/// A captured artifact linked to a work order. Immutable once a snapshot
/// referencing it is submitted; the annexure position is advisory metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub id: EvidenceItemId,
    pub work_order_id: WorkOrderId,
    pub kind: EvidenceKind,
    pub doc_type: Option<String>,
    pub tags: BTreeMap<String, String>,
    pub annexure_position: Option<u32>,
    pub captured_at: DateTime<Utc>,
}

/// One requirement row of an evidence profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileItem {
    pub id: String,
    pub label: String,
    pub kind: EvidenceKind,
    pub doc_type: Option<String>,
    pub min_count: u32,
    pub required: bool,
    /// Tag key/value pairs an evidence item must all carry to match.
    pub tags: BTreeMap<String, String>,
    /// Contract field key this requirement substantiates, if any.
    pub field_hint: Option<String>,
    pub order_hint: u32,
}

/// Evidence checklist template scoped to an organization and classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceProfile {
    pub id: EvidenceProfileId,
    pub org: OrgId,
    pub name: String,
    pub report_type: ReportType,
    pub bank_scope: BankType,
    pub slab_scope: ValueSlab,
    pub items: Vec<ProfileItem>,
}

/// Contract field key seeded per organization so profile hints resolve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub org: OrgId,
    pub key: String,
    pub label: String,
}

/// Rendered deliverable bundle created at most once per work order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportPack {
    pub id: PackId,
    pub work_order_id: WorkOrderId,
    pub parent_ref: String,
    pub template_key: String,
    pub report_family: String,
    pub version: u32,
    /// SHA-256 of the canonical export bundle, fixed at creation time.
    pub bundle_hash: String,
    pub debug_artifact: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Generation job lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Render job attached to a report pack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationJob {
    pub id: JobId,
    pub pack_id: PackId,
    pub work_order_id: WorkOrderId,
    pub idempotency_key: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
}

/// Terminal result of a release attempt. The serialized names are a stable
/// contract with billing reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReleaseStatus {
    #[serde(rename = "PAID")]
    Paid,
    #[serde(rename = "CREDIT_CONSUMED")]
    CreditConsumed,
    #[serde(rename = "OVERRIDE")]
    Override,
    #[serde(rename = "BLOCKED")]
    Blocked,
}

impl ReleaseStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Paid => "PAID",
            Self::CreditConsumed => "CREDIT_CONSUMED",
            Self::Override => "OVERRIDE",
            Self::Blocked => "BLOCKED",
        }
    }

    /// A pack may reach at most one non-blocked result.
    pub const fn is_successful(self) -> bool {
        !matches!(self, Self::Blocked)
    }
}

/// One release attempt, successful or blocked. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliverableRelease {
    pub id: ReleaseId,
    pub org: OrgId,
    pub work_order_id: WorkOrderId,
    pub pack_id: PackId,
    pub idempotency_key: String,
    pub status: ReleaseStatus,
    pub billing_mode: BillingMode,
    pub override_reason: Option<String>,
    pub ledger_id: Option<String>,
    pub note: Option<String>,
    pub actor: String,
    pub created_at: DateTime<Utc>,
}
