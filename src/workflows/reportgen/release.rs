//! Billing-gated deliverable release.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use super::collaborators::{AuditNote, AuditSink, BillingProvider, UsageEvent};
use super::domain::{
    BillingMode, DeliverableRelease, JobStatus, ReleaseId, ReleaseStatus, WorkOrder, WorkOrderId,
    WorkOrderStatus,
};
use super::repository::{PackRepository, ReleaseRepository, WorkOrderRepository};
use super::service::PipelineError;

/// Caller-supplied release request.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseRequest {
    pub idempotency_key: String,
    #[serde(default)]
    pub override_requested: bool,
    #[serde(default)]
    pub override_reason: Option<String>,
}

/// Result of a release attempt.
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseOutcome {
    pub release: DeliverableRelease,
    /// True when an earlier attempt with the same key (or an earlier
    /// successful release of this pack) was returned unchanged.
    pub idempotent: bool,
    pub blocked: bool,
}

/// Decides whether a finished pack may be handed to the client.
pub struct ReleaseGate<W, K, R, B, A> {
    work_orders: Arc<W>,
    packs: Arc<K>,
    releases: Arc<R>,
    billing: Arc<B>,
    audit: Arc<A>,
}

impl<W, K, R, B, A> ReleaseGate<W, K, R, B, A>
where
    W: WorkOrderRepository + 'static,
    K: PackRepository + 'static,
    R: ReleaseRepository + 'static,
    B: BillingProvider + 'static,
    A: AuditSink + 'static,
{
    pub fn new(
        work_orders: Arc<W>,
        packs: Arc<K>,
        releases: Arc<R>,
        billing: Arc<B>,
        audit: Arc<A>,
    ) -> Self {
        Self {
            work_orders,
            packs,
            releases,
            billing,
            audit,
        }
    }

    pub fn release_deliverables(
        &self,
        id: &WorkOrderId,
        actor: &str,
        request: ReleaseRequest,
    ) -> Result<ReleaseOutcome, PipelineError> {
        let key = request.idempotency_key.trim().to_string();
        if key.is_empty() {
            return Err(PipelineError::validation(
                "release request requires an idempotency key",
            ));
        }
        let override_reason = request
            .override_reason
            .as_deref()
            .map(str::trim)
            .filter(|reason| !reason.is_empty())
            .map(str::to_string);
        if request.override_requested && override_reason.is_none() {
            return Err(PipelineError::validation(
                "override requests must carry an override reason",
            ));
        }

        let mut order = self
            .work_orders
            .fetch(id)?
            .ok_or_else(|| PipelineError::not_found("work order", &id.0))?;

        // Retried client requests resolve here without re-running the gate.
        if let Some(existing) = self.releases.find_by_idempotency_key(&order.org, &key)? {
            let blocked = existing.status == ReleaseStatus::Blocked;
            return Ok(ReleaseOutcome {
                release: existing,
                idempotent: true,
                blocked,
            });
        }

        let pack = self.packs.pack_for_work_order(id)?.ok_or_else(|| {
            PipelineError::validation(format!(
                "work order {} has no report pack to release",
                order.id.0
            ))
        })?;
        let job = self.packs.job_for_pack(&pack.id)?.ok_or_else(|| {
            PipelineError::validation(format!("pack {} has no generation job", pack.id.0))
        })?;
        if job.status != JobStatus::Completed {
            return Err(PipelineError::validation(format!(
                "generation job {} is {}, expected {}",
                job.id.0,
                job.status.label(),
                JobStatus::Completed.label()
            )));
        }

        // A pack is successfully released at most once.
        if let Some(existing) = self.releases.successful_for_pack(&order.id, &pack.id)? {
            return Ok(ReleaseOutcome {
                release: existing,
                idempotent: true,
                blocked: false,
            });
        }

        let mode = match order.billing_mode {
            Some(mode) => mode,
            None if order.credit_reservation_id.is_some() => BillingMode::Credit,
            None => BillingMode::Postpaid,
        };

        let verdict = self.evaluate_gate(&order, mode, request.override_requested, &override_reason, &key);

        let candidate = DeliverableRelease {
            id: ReleaseId(format!("rel-{}", Uuid::new_v4())),
            org: order.org.clone(),
            work_order_id: order.id.clone(),
            pack_id: pack.id.clone(),
            idempotency_key: key.clone(),
            status: verdict.status,
            billing_mode: mode,
            override_reason: verdict.override_reason,
            ledger_id: verdict.ledger_id,
            note: verdict.note,
            actor: actor.to_string(),
            created_at: Utc::now(),
        };

        let stored = self.releases.insert_or_fetch(candidate)?;
        let release = stored.row;
        if !stored.newly_inserted {
            // A concurrent caller with the same key won the insert.
            let blocked = release.status == ReleaseStatus::Blocked;
            return Ok(ReleaseOutcome {
                release,
                idempotent: true,
                blocked,
            });
        }

        order.billing_mode.get_or_insert(mode);
        order
            .billing_hooks
            .insert("last_release_id".to_string(), release.id.0.clone());
        order.billing_hooks.insert(
            "last_release_status".to_string(),
            release.status.label().to_string(),
        );
        if release.status.is_successful() {
            order.status = WorkOrderStatus::Closed;
        }
        self.work_orders.update(order.clone())?;

        let event = UsageEvent {
            org: order.org.clone(),
            work_order_id: order.id.clone(),
            pack_id: pack.id.clone(),
            kind: "deliverable_release".to_string(),
            result: release.status.label().to_string(),
            occurred_at: release.created_at,
        };
        if let Err(err) = self.billing.ingest_usage_event(event) {
            warn!(error = %err, "usage event ingestion failed, continuing");
        }

        let note = AuditNote {
            org: order.org.clone(),
            parent_ref: order.parent_ref.clone().unwrap_or_default(),
            action: "deliverable.release".to_string(),
            metadata: [
                ("release_id".to_string(), release.id.0.clone()),
                ("status".to_string(), release.status.label().to_string()),
                ("billing_mode".to_string(), mode.label().to_string()),
                ("actor".to_string(), actor.to_string()),
            ]
            .into_iter()
            .collect(),
        };
        if let Err(err) = self.audit.record(note) {
            warn!(error = %err, "audit write failed, continuing");
        }

        let blocked = release.status == ReleaseStatus::Blocked;
        Ok(ReleaseOutcome {
            release,
            idempotent: false,
            blocked,
        })
    }

    fn evaluate_gate(
        &self,
        order: &WorkOrder,
        mode: BillingMode,
        override_requested: bool,
        override_reason: &Option<String>,
        idempotency_key: &str,
    ) -> GateVerdict {
        match mode {
            BillingMode::Credit => match &order.credit_reservation_id {
                // Override always short-circuits consumption.
                Some(_) if override_requested => GateVerdict::overridden(override_reason.clone()),
                Some(reservation) => {
                    match self.billing.consume_credits(reservation, idempotency_key) {
                        Ok(receipt) => GateVerdict {
                            status: ReleaseStatus::CreditConsumed,
                            override_reason: None,
                            ledger_id: Some(receipt.ledger_id),
                            note: None,
                        },
                        Err(err) => {
                            warn!(error = %err, "credit consumption failed, blocking release");
                            GateVerdict::blocked(format!("credit consumption failed: {err}"))
                        }
                    }
                }
                None if override_requested => GateVerdict::overridden(Some(
                    "credit reservation missing, overridden".to_string(),
                )),
                None => GateVerdict::blocked("credit reservation missing".to_string()),
            },
            BillingMode::Postpaid => match &order.service_invoice_id {
                Some(invoice_id) => {
                    let is_paid = self
                        .billing
                        .get_service_invoice(&order.org, invoice_id)
                        .map(|invoice| invoice.is_paid)
                        .unwrap_or_else(|err| {
                            warn!(error = %err, "invoice lookup failed, treating as unpaid");
                            false
                        });
                    if is_paid {
                        GateVerdict {
                            status: ReleaseStatus::Paid,
                            override_reason: None,
                            ledger_id: None,
                            note: None,
                        }
                    } else if override_requested {
                        GateVerdict::overridden(override_reason.clone())
                    } else {
                        GateVerdict::blocked("service invoice unpaid".to_string())
                    }
                }
                None if override_requested => GateVerdict::overridden(override_reason.clone()),
                None => GateVerdict::blocked("service invoice missing".to_string()),
            },
        }
    }
}

struct GateVerdict {
    status: ReleaseStatus,
    override_reason: Option<String>,
    ledger_id: Option<String>,
    note: Option<String>,
}

impl GateVerdict {
    fn overridden(reason: Option<String>) -> Self {
        Self {
            status: ReleaseStatus::Override,
            override_reason: reason,
            ledger_id: None,
            note: None,
        }
    }

    fn blocked(note: String) -> Self {
        Self {
            status: ReleaseStatus::Blocked,
            override_reason: None,
            ledger_id: None,
            note: Some(note),
        }
    }
}
