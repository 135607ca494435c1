use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::contract::{ContractDocument, ContractPatch};
use super::domain::{
    ContractSnapshot, EvidenceItem, EvidenceItemId, EvidenceKind, OrgId, ReadinessSummary,
    ReportType, ValueSlab, WorkOrder, WorkOrderId, WorkOrderStatus,
};
use super::evidence::{
    build_checklist, ordered_annexure, suggest_for_missing_fields, AnnexureAssignment,
    CaptureSuggestion, ChecklistRow, ProfileResolver, SeedReport,
};
use super::repository::{ProfileRepository, RepositoryError, WorkOrderRepository};
use super::rules::{ContractRulesEngine, RuleWarning, RulesConfig};

/// Error raised by the pipeline services.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("collaborator failure: {0}")]
    Collaborator(String),
}

impl PipelineError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(entity: &'static str, id: &str) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Intake payload for a new work order.
#[derive(Debug, Clone, Deserialize)]
pub struct NewWorkOrder {
    pub org: OrgId,
    pub report_type: ReportType,
    #[serde(default)]
    pub parent_ref: Option<String>,
    #[serde(default)]
    pub credit_reservation_id: Option<String>,
    #[serde(default)]
    pub service_invoice_id: Option<String>,
}

/// Intake payload for a captured evidence artifact.
#[derive(Debug, Clone, Deserialize)]
pub struct NewEvidenceItem {
    pub kind: EvidenceKind,
    #[serde(default)]
    pub doc_type: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub captured_at: Option<DateTime<Utc>>,
}

/// Result of a contract patch: the appended snapshot plus rule warnings.
#[derive(Debug, Clone, Serialize)]
pub struct PatchOutcome {
    pub work_order: WorkOrder,
    pub snapshot: ContractSnapshot,
    pub warnings: Vec<RuleWarning>,
}

/// Checklist projection served to operators.
#[derive(Debug, Clone, Serialize)]
pub struct ChecklistView {
    pub profile_name: Option<String>,
    pub rows: Vec<ChecklistRow>,
    pub suggestions: Vec<CaptureSuggestion>,
    pub annexure: Vec<AnnexureAssignment>,
}

/// Service owning work-order intake, contract patching, and readiness.
pub struct WorkOrderService<W, P> {
    work_orders: Arc<W>,
    resolver: ProfileResolver<P, W>,
    engine: Arc<ContractRulesEngine>,
}

impl<W, P> WorkOrderService<W, P>
where
    W: WorkOrderRepository + 'static,
    P: ProfileRepository + 'static,
{
    pub fn new(work_orders: Arc<W>, profiles: Arc<P>, rules: RulesConfig) -> Self {
        let resolver = ProfileResolver::new(profiles, work_orders.clone());
        Self {
            work_orders,
            resolver,
            engine: Arc::new(ContractRulesEngine::new(rules)),
        }
    }

    /// Seed the organization's evidence profiles and field definitions.
    pub fn seed_defaults(&self, org: &OrgId) -> Result<SeedReport, PipelineError> {
        self.resolver.seed_defaults(org)
    }

    /// Create a work order with an empty version-1 contract snapshot.
    pub fn create_work_order(&self, intake: NewWorkOrder) -> Result<WorkOrder, PipelineError> {
        let now = Utc::now();
        let order = WorkOrder {
            id: WorkOrderId(format!("wo-{}", Uuid::new_v4())),
            org: intake.org,
            report_type: intake.report_type,
            bank_type: None,
            value_slab: ValueSlab::Unknown,
            status: WorkOrderStatus::Draft,
            profile_id: None,
            pack_id: None,
            parent_ref: intake.parent_ref,
            credit_reservation_id: intake.credit_reservation_id,
            service_invoice_id: intake.service_invoice_id,
            billing_mode: None,
            billing_hooks: BTreeMap::new(),
            created_at: now,
        };
        let order = self.work_orders.insert(order)?;

        let mut contract = ContractDocument::default();
        contract.meta.report_type = Some(order.report_type);
        let outcome = self.engine.recompute(&contract);

        let readiness = self.readiness_for(&order, &outcome.contract)?;
        self.work_orders.append_snapshot(ContractSnapshot {
            work_order_id: order.id.clone(),
            version: 1,
            contract: outcome.contract,
            readiness,
            created_at: now,
        })?;

        info!(work_order = %order.id.0, "work order created");
        // Profile assignment may have landed during readiness evaluation.
        self.get(&order.id)
    }

    pub fn get(&self, id: &WorkOrderId) -> Result<WorkOrder, PipelineError> {
        self.work_orders
            .fetch(id)?
            .ok_or_else(|| PipelineError::not_found("work order", &id.0))
    }

    pub fn latest_snapshot(&self, id: &WorkOrderId) -> Result<ContractSnapshot, PipelineError> {
        self.work_orders
            .latest_snapshot(id)?
            .ok_or_else(|| PipelineError::not_found("contract snapshot", &id.0))
    }

    /// Apply an operator patch: merge sections, recompute derived values,
    /// refresh the readiness-driven status, and append the next snapshot.
    pub fn patch_contract(
        &self,
        id: &WorkOrderId,
        patch: ContractPatch,
    ) -> Result<PatchOutcome, PipelineError> {
        let mut order = self.get(id)?;
        if order.status.is_terminal() {
            return Err(PipelineError::validation(format!(
                "work order {} is {} and accepts no further patches",
                order.id.0,
                order.status.label()
            )));
        }

        let previous = self.latest_snapshot(id)?;
        let mut contract = previous.contract.clone();
        contract.apply_patch(patch);

        let outcome = self.engine.recompute(&contract);

        order.bank_type = outcome.contract.meta.bank_type;
        order.value_slab = outcome
            .contract
            .meta
            .value_slab
            .unwrap_or(ValueSlab::Unknown);
        if let Some(report_type) = outcome.contract.meta.report_type {
            order.report_type = report_type;
        }
        self.work_orders.update(order.clone())?;

        let readiness = self.readiness_for(&order, &outcome.contract)?;
        // The resolver may have assigned a profile meanwhile; work from the
        // stored row so the assignment survives the status write.
        let mut order = self.get(id)?;
        order.status = next_status(order.status, &readiness);
        self.work_orders.update(order.clone())?;

        let snapshot = ContractSnapshot {
            work_order_id: order.id.clone(),
            version: previous.version + 1,
            contract: outcome.contract,
            readiness,
            created_at: Utc::now(),
        };
        self.work_orders.append_snapshot(snapshot.clone())?;

        info!(
            work_order = %order.id.0,
            version = snapshot.version,
            status = order.status.label(),
            "contract patched and recomputed"
        );

        Ok(PatchOutcome {
            work_order: order,
            snapshot,
            warnings: outcome.warnings,
        })
    }

    /// Register a captured artifact and refresh evidence readiness.
    pub fn add_evidence(
        &self,
        id: &WorkOrderId,
        intake: NewEvidenceItem,
    ) -> Result<EvidenceItem, PipelineError> {
        let order = self.get(id)?;
        if order.status.is_terminal() {
            return Err(PipelineError::validation(format!(
                "work order {} is {} and accepts no further evidence",
                order.id.0,
                order.status.label()
            )));
        }

        let item = EvidenceItem {
            id: EvidenceItemId(format!("ev-{}", Uuid::new_v4())),
            work_order_id: order.id.clone(),
            kind: intake.kind,
            doc_type: intake.doc_type,
            tags: intake.tags,
            annexure_position: None,
            captured_at: intake.captured_at.unwrap_or_else(Utc::now),
        };
        let item = self.work_orders.insert_evidence(item)?;

        // Draft orders stay draft until the first patch; everything else
        // re-evaluates now that the inventory changed.
        if order.status != WorkOrderStatus::Draft {
            let snapshot = self.latest_snapshot(id)?;
            let readiness = self.readiness_for(&order, &snapshot.contract)?;
            let mut order = self.get(id)?;
            let status = next_status(order.status, &readiness);
            if status != order.status {
                order.status = status;
                self.work_orders.update(order)?;
            }
        }

        Ok(item)
    }

    /// Build the operator-facing checklist projection.
    pub fn checklist(&self, id: &WorkOrderId) -> Result<ChecklistView, PipelineError> {
        self.get(id)?;
        let snapshot = self.latest_snapshot(id)?;
        let evidence = self.work_orders.evidence_for(id)?;

        let selection = self.resolver.resolve_for_work_order(id)?;
        let rows = selection
            .as_ref()
            .map(|selection| build_checklist(&selection.profile, &evidence))
            .unwrap_or_default();

        let missing = missing_contract_fields(&snapshot.contract);
        let suggestions = suggest_for_missing_fields(&rows, &missing);
        let annexure = ordered_annexure(&evidence);

        Ok(ChecklistView {
            profile_name: selection.map(|selection| selection.profile.name),
            rows,
            suggestions,
            annexure,
        })
    }

    pub fn cancel(&self, id: &WorkOrderId) -> Result<WorkOrder, PipelineError> {
        let mut order = self.get(id)?;
        if order.status.is_terminal() {
            return Err(PipelineError::validation(format!(
                "work order {} is already {}",
                order.id.0,
                order.status.label()
            )));
        }
        order.status = WorkOrderStatus::Cancelled;
        self.work_orders.update(order.clone())?;
        Ok(order)
    }

    fn readiness_for(
        &self,
        order: &WorkOrder,
        contract: &ContractDocument,
    ) -> Result<ReadinessSummary, PipelineError> {
        let evidence = self.work_orders.evidence_for(&order.id)?;
        let rows = match self.resolver.resolve_for_work_order(&order.id)? {
            Some(selection) => build_checklist(&selection.profile, &evidence),
            None => Vec::new(),
        };
        Ok(evaluate_readiness(contract, &rows))
    }
}

/// Mandatory contract fields checked for data readiness.
pub fn missing_contract_fields(contract: &ContractDocument) -> Vec<String> {
    let blank = |field: &Option<String>| field.as_deref().map_or(true, |v| v.trim().is_empty());
    let mut missing = Vec::new();

    if blank(&contract.party.bank_name) {
        missing.push("party.bank_name".to_string());
    }
    if blank(&contract.property.address) {
        missing.push("property.address".to_string());
    }

    let computed = &contract.computed_values;
    let has_value = computed
        .fair_market_value
        .or(computed.adopted_total_value)
        .or(computed.market_total_value)
        .is_some();
    if !has_value {
        missing.push("valuation_inputs.fair_market_value".to_string());
    }

    missing
}

/// Fold contract completeness and required checklist rows into a readiness
/// digest. Only `required` rows weigh on evidence readiness.
pub fn evaluate_readiness(contract: &ContractDocument, rows: &[ChecklistRow]) -> ReadinessSummary {
    let missing_fields = missing_contract_fields(contract);
    let unsatisfied: Vec<String> = rows
        .iter()
        .filter(|row| row.required && !row.satisfied)
        .map(|row| row.item_id.clone())
        .collect();

    ReadinessSummary {
        data_ready: missing_fields.is_empty(),
        evidence_ready: unsatisfied.is_empty(),
        missing_fields,
        unsatisfied_required_items: unsatisfied,
    }
}

/// Status transition applied after every readiness evaluation. Terminal
/// states never move.
pub fn next_status(current: WorkOrderStatus, readiness: &ReadinessSummary) -> WorkOrderStatus {
    if current.is_terminal() {
        return current;
    }
    if !readiness.data_ready {
        WorkOrderStatus::DataPending
    } else if !readiness.evidence_ready {
        WorkOrderStatus::EvidencePending
    } else {
        WorkOrderStatus::ReadyForRender
    }
}
