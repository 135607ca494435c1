//! Report work-order computation and release pipeline.
//!
//! Raw contract inputs flow through the rules engine into a canonical
//! bank-format document; captured evidence is matched against a profile to
//! produce readiness; a ready work order yields exactly one report pack and
//! generation job; the release gate decides whether the finished pack may be
//! handed to the client. Every public operation is safe to retry: duplicate
//! clicks, replayed webhooks, and racing callers converge on the same rows.

pub mod collaborators;
pub mod contract;
pub mod domain;
pub mod evidence;
pub mod memory;
pub mod pack;
pub mod release;
pub mod repository;
pub mod router;
pub mod rules;
pub mod service;
pub(crate) mod units;

#[cfg(test)]
mod tests;

pub use contract::{ContractDocument, ContractPatch};
pub use domain::{
    BankType, BillingMode, ContractSnapshot, DeliverableRelease, EvidenceItem, EvidenceKind,
    EvidenceProfile, GenerationJob, JobStatus, OrgId, ReadinessSummary, ReleaseStatus, ReportPack,
    ReportType, TemplateSelector, ValueSlab, WorkOrder, WorkOrderId, WorkOrderStatus,
};
pub use evidence::{ChecklistRow, ProfileResolver};
pub use pack::{PackEnsureOutcome, PackFactory};
pub use release::{ReleaseGate, ReleaseOutcome, ReleaseRequest};
pub use repository::{InsertOutcome, RepositoryError};
pub use router::{reportgen_router, ReportgenPipeline};
pub use rules::{ContractRulesEngine, RecomputeOutcome, RuleWarning, RulesConfig, WarningLevel};
pub use service::{NewEvidenceItem, NewWorkOrder, PipelineError, WorkOrderService};
pub use units::{area_to_sqm, rate_to_sqm, round_up_to_step, MeasureUnit};
