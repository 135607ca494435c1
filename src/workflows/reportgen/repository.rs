//! Storage abstractions for the pipeline.
//!
//! Every trait returns value-typed rows so the services can be exercised in
//! isolation. Idempotency races are modeled as explicit insert-or-fetch
//! operations: a second writer racing on a unique key receives the winner's
//! row instead of an error, keeping the retry logic portable across storage
//! engines.

use super::domain::{
    ContractSnapshot, DeliverableRelease, EvidenceItem, EvidenceProfile, EvidenceProfileId,
    FieldDefinition, GenerationJob, OrgId, PackId, ReportPack, ReportType, WorkOrder, WorkOrderId,
};

/// Result of an insert-or-fetch call.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertOutcome<T> {
    pub row: T,
    /// False when a concurrent writer (or an earlier retry) won the insert.
    pub newly_inserted: bool,
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("row already exists")]
    Conflict,
    #[error("row not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Work orders, their append-only snapshots, and the evidence inventory.
pub trait WorkOrderRepository: Send + Sync {
    fn insert(&self, order: WorkOrder) -> Result<WorkOrder, RepositoryError>;
    fn fetch(&self, id: &WorkOrderId) -> Result<Option<WorkOrder>, RepositoryError>;
    fn update(&self, order: WorkOrder) -> Result<(), RepositoryError>;

    /// Append the next snapshot. Versions are monotonic per work order; an
    /// out-of-order version is a conflict.
    fn append_snapshot(&self, snapshot: ContractSnapshot) -> Result<(), RepositoryError>;
    /// Latest snapshot resolved by max(version), never by wall clock.
    fn latest_snapshot(
        &self,
        id: &WorkOrderId,
    ) -> Result<Option<ContractSnapshot>, RepositoryError>;

    fn insert_evidence(&self, item: EvidenceItem) -> Result<EvidenceItem, RepositoryError>;
    fn evidence_for(&self, id: &WorkOrderId) -> Result<Vec<EvidenceItem>, RepositoryError>;
}

/// Seeded evidence profiles and contract field definitions.
pub trait ProfileRepository: Send + Sync {
    /// Insert unless a definition with the same (org, key) exists. Returns
    /// whether a row was written.
    fn insert_field_definition_if_absent(
        &self,
        definition: FieldDefinition,
    ) -> Result<bool, RepositoryError>;

    /// Insert unless a profile with the same (org, report type, bank scope,
    /// slab scope, name) exists. Returns whether a row was written.
    fn insert_profile_if_absent(&self, profile: EvidenceProfile)
        -> Result<bool, RepositoryError>;

    fn fetch(&self, id: &EvidenceProfileId) -> Result<Option<EvidenceProfile>, RepositoryError>;
    fn default_profiles(
        &self,
        org: &OrgId,
        report_type: ReportType,
    ) -> Result<Vec<EvidenceProfile>, RepositoryError>;
}

/// Report packs and their generation jobs.
pub trait PackRepository: Send + Sync {
    fn pack_for_work_order(
        &self,
        id: &WorkOrderId,
    ) -> Result<Option<ReportPack>, RepositoryError>;
    fn highest_version(
        &self,
        parent_ref: &str,
        template_key: &str,
    ) -> Result<u32, RepositoryError>;
    /// Unique on (parent ref, template key, version).
    fn insert_or_fetch_pack(
        &self,
        pack: ReportPack,
    ) -> Result<InsertOutcome<ReportPack>, RepositoryError>;

    fn job_for_pack(&self, pack_id: &PackId) -> Result<Option<GenerationJob>, RepositoryError>;
    /// Unique on the job idempotency key.
    fn insert_or_fetch_job(
        &self,
        job: GenerationJob,
    ) -> Result<InsertOutcome<GenerationJob>, RepositoryError>;
    fn update_job(&self, job: GenerationJob) -> Result<(), RepositoryError>;
}

/// Deliverable release attempts.
pub trait ReleaseRepository: Send + Sync {
    fn find_by_idempotency_key(
        &self,
        org: &OrgId,
        key: &str,
    ) -> Result<Option<DeliverableRelease>, RepositoryError>;
    /// The single non-blocked release for a (work order, pack) pair, if any.
    fn successful_for_pack(
        &self,
        work_order_id: &WorkOrderId,
        pack_id: &PackId,
    ) -> Result<Option<DeliverableRelease>, RepositoryError>;
    /// Unique on (org, idempotency key).
    fn insert_or_fetch(
        &self,
        release: DeliverableRelease,
    ) -> Result<InsertOutcome<DeliverableRelease>, RepositoryError>;
}
