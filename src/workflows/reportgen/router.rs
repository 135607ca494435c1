use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;

use super::collaborators::{AuditSink, BillingProvider, SpineExporter};
use super::contract::ContractPatch;
use super::domain::WorkOrderId;
use super::pack::{PackEnsureOutcome, PackFactory};
use super::release::{ReleaseGate, ReleaseOutcome, ReleaseRequest};
use super::repository::{
    PackRepository, ProfileRepository, ReleaseRepository, WorkOrderRepository,
};
use super::rules::RulesConfig;
use super::service::{
    ChecklistView, NewEvidenceItem, NewWorkOrder, PatchOutcome, WorkOrderService,
};

/// Composition root wiring the three pipeline services over one set of
/// stores and collaborators.
pub struct ReportgenPipeline<W, P, K, R, X, B, A> {
    pub work_orders: WorkOrderService<W, P>,
    pub packs: PackFactory<W, K, X, A>,
    pub releases: ReleaseGate<W, K, R, B, A>,
}

impl<W, P, K, R, X, B, A> ReportgenPipeline<W, P, K, R, X, B, A>
where
    W: WorkOrderRepository + 'static,
    P: ProfileRepository + 'static,
    K: PackRepository + 'static,
    R: ReleaseRepository + 'static,
    X: SpineExporter + 'static,
    B: BillingProvider + 'static,
    A: AuditSink + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        work_orders: Arc<W>,
        profiles: Arc<P>,
        packs: Arc<K>,
        releases: Arc<R>,
        exporter: Arc<X>,
        billing: Arc<B>,
        audit: Arc<A>,
        rules: RulesConfig,
    ) -> Self {
        Self {
            work_orders: WorkOrderService::new(work_orders.clone(), profiles, rules),
            packs: PackFactory::new(work_orders.clone(), packs.clone(), exporter, audit.clone()),
            releases: ReleaseGate::new(work_orders, packs, releases, billing, audit),
        }
    }
}

/// Router builder exposing the pipeline operations.
pub fn reportgen_router<W, P, K, R, X, B, A>(
    pipeline: Arc<ReportgenPipeline<W, P, K, R, X, B, A>>,
) -> Router
where
    W: WorkOrderRepository + 'static,
    P: ProfileRepository + 'static,
    K: PackRepository + 'static,
    R: ReleaseRepository + 'static,
    X: SpineExporter + 'static,
    B: BillingProvider + 'static,
    A: AuditSink + 'static,
{
    Router::new()
        .route(
            "/api/v1/reportgen/work-orders",
            post(create_work_order_handler::<W, P, K, R, X, B, A>),
        )
        .route(
            "/api/v1/reportgen/work-orders/:work_order_id/contract",
            post(patch_contract_handler::<W, P, K, R, X, B, A>),
        )
        .route(
            "/api/v1/reportgen/work-orders/:work_order_id/evidence",
            post(add_evidence_handler::<W, P, K, R, X, B, A>),
        )
        .route(
            "/api/v1/reportgen/work-orders/:work_order_id/checklist",
            get(checklist_handler::<W, P, K, R, X, B, A>),
        )
        .route(
            "/api/v1/reportgen/work-orders/:work_order_id/packs",
            post(ensure_pack_handler::<W, P, K, R, X, B, A>),
        )
        .route(
            "/api/v1/reportgen/work-orders/:work_order_id/release",
            post(release_handler::<W, P, K, R, X, B, A>),
        )
        .with_state(pipeline)
}

async fn create_work_order_handler<W, P, K, R, X, B, A>(
    State(pipeline): State<Arc<ReportgenPipeline<W, P, K, R, X, B, A>>>,
    Json(intake): Json<NewWorkOrder>,
) -> Result<(StatusCode, Json<super::domain::WorkOrder>), AppError>
where
    W: WorkOrderRepository + 'static,
    P: ProfileRepository + 'static,
    K: PackRepository + 'static,
    R: ReleaseRepository + 'static,
    X: SpineExporter + 'static,
    B: BillingProvider + 'static,
    A: AuditSink + 'static,
{
    // Seeding is idempotent, so intake can lean on it unconditionally.
    pipeline.work_orders.seed_defaults(&intake.org)?;
    let order = pipeline.work_orders.create_work_order(intake)?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn patch_contract_handler<W, P, K, R, X, B, A>(
    State(pipeline): State<Arc<ReportgenPipeline<W, P, K, R, X, B, A>>>,
    Path(work_order_id): Path<String>,
    Json(patch): Json<ContractPatch>,
) -> Result<Json<PatchOutcome>, AppError>
where
    W: WorkOrderRepository + 'static,
    P: ProfileRepository + 'static,
    K: PackRepository + 'static,
    R: ReleaseRepository + 'static,
    X: SpineExporter + 'static,
    B: BillingProvider + 'static,
    A: AuditSink + 'static,
{
    let outcome = pipeline
        .work_orders
        .patch_contract(&WorkOrderId(work_order_id), patch)?;
    Ok(Json(outcome))
}

async fn add_evidence_handler<W, P, K, R, X, B, A>(
    State(pipeline): State<Arc<ReportgenPipeline<W, P, K, R, X, B, A>>>,
    Path(work_order_id): Path<String>,
    Json(intake): Json<NewEvidenceItem>,
) -> Result<(StatusCode, Json<super::domain::EvidenceItem>), AppError>
where
    W: WorkOrderRepository + 'static,
    P: ProfileRepository + 'static,
    K: PackRepository + 'static,
    R: ReleaseRepository + 'static,
    X: SpineExporter + 'static,
    B: BillingProvider + 'static,
    A: AuditSink + 'static,
{
    let item = pipeline
        .work_orders
        .add_evidence(&WorkOrderId(work_order_id), intake)?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn checklist_handler<W, P, K, R, X, B, A>(
    State(pipeline): State<Arc<ReportgenPipeline<W, P, K, R, X, B, A>>>,
    Path(work_order_id): Path<String>,
) -> Result<Json<ChecklistView>, AppError>
where
    W: WorkOrderRepository + 'static,
    P: ProfileRepository + 'static,
    K: PackRepository + 'static,
    R: ReleaseRepository + 'static,
    X: SpineExporter + 'static,
    B: BillingProvider + 'static,
    A: AuditSink + 'static,
{
    let view = pipeline
        .work_orders
        .checklist(&WorkOrderId(work_order_id))?;
    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
struct EnsurePackRequest {
    #[serde(default)]
    actor: Option<String>,
    #[serde(default)]
    request_id: Option<String>,
    #[serde(default)]
    idempotency_key: Option<String>,
}

async fn ensure_pack_handler<W, P, K, R, X, B, A>(
    State(pipeline): State<Arc<ReportgenPipeline<W, P, K, R, X, B, A>>>,
    Path(work_order_id): Path<String>,
    Json(request): Json<EnsurePackRequest>,
) -> Result<Json<PackEnsureOutcome>, AppError>
where
    W: WorkOrderRepository + 'static,
    P: ProfileRepository + 'static,
    K: PackRepository + 'static,
    R: ReleaseRepository + 'static,
    X: SpineExporter + 'static,
    B: BillingProvider + 'static,
    A: AuditSink + 'static,
{
    let actor = request.actor.unwrap_or_else(|| "operator".to_string());
    let request_id = request
        .request_id
        .unwrap_or_else(|| format!("req-{}", Uuid::new_v4()));
    let outcome = pipeline.packs.ensure_report_pack(
        &WorkOrderId(work_order_id),
        &actor,
        &request_id,
        request.idempotency_key,
    )?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
struct ReleaseHttpRequest {
    #[serde(default)]
    actor: Option<String>,
    #[serde(flatten)]
    request: ReleaseRequest,
}

async fn release_handler<W, P, K, R, X, B, A>(
    State(pipeline): State<Arc<ReportgenPipeline<W, P, K, R, X, B, A>>>,
    Path(work_order_id): Path<String>,
    Json(payload): Json<ReleaseHttpRequest>,
) -> Result<Json<ReleaseOutcome>, AppError>
where
    W: WorkOrderRepository + 'static,
    P: ProfileRepository + 'static,
    K: PackRepository + 'static,
    R: ReleaseRepository + 'static,
    X: SpineExporter + 'static,
    B: BillingProvider + 'static,
    A: AuditSink + 'static,
{
    let actor = payload.actor.unwrap_or_else(|| "operator".to_string());
    let outcome = pipeline.releases.release_deliverables(
        &WorkOrderId(work_order_id),
        &actor,
        payload.request,
    )?;
    Ok(Json(outcome))
}
