//! Idempotent report-pack creation.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::warn;
use uuid::Uuid;

use super::collaborators::{AuditNote, AuditSink, RenderQueuePayload, SpineExporter};
use super::domain::{
    BankType, GenerationJob, JobId, JobStatus, PackId, ReportPack, ReportType, TemplateSelector,
    WorkOrder, WorkOrderId, WorkOrderStatus,
};
use super::repository::{PackRepository, WorkOrderRepository};
use super::service::PipelineError;

/// Result of an ensure-pack call.
#[derive(Debug, Clone, Serialize)]
pub struct PackEnsureOutcome {
    /// True when the call found everything already in place and wrote
    /// nothing.
    pub idempotent: bool,
    pub pack: ReportPack,
    pub job: GenerationJob,
    /// Present only when a new job was created; the caller owns the actual
    /// enqueue.
    pub enqueue: Option<RenderQueuePayload>,
}

/// Creates the report pack and generation job for a ready work order, at
/// most once each, no matter how often it is called.
pub struct PackFactory<W, K, X, A> {
    work_orders: Arc<W>,
    packs: Arc<K>,
    exporter: Arc<X>,
    audit: Arc<A>,
}

impl<W, K, X, A> PackFactory<W, K, X, A>
where
    W: WorkOrderRepository + 'static,
    K: PackRepository + 'static,
    X: SpineExporter + 'static,
    A: AuditSink + 'static,
{
    pub fn new(work_orders: Arc<W>, packs: Arc<K>, exporter: Arc<X>, audit: Arc<A>) -> Self {
        Self {
            work_orders,
            packs,
            exporter,
            audit,
        }
    }

    pub fn ensure_report_pack(
        &self,
        id: &WorkOrderId,
        actor: &str,
        request_id: &str,
        idempotency_key: Option<String>,
    ) -> Result<PackEnsureOutcome, PipelineError> {
        let mut order = self
            .work_orders
            .fetch(id)?
            .ok_or_else(|| PipelineError::not_found("work order", &id.0))?;

        if order.status != WorkOrderStatus::ReadyForRender {
            return Err(PipelineError::validation(format!(
                "work order {} is {}, expected {}",
                order.id.0,
                order.status.label(),
                WorkOrderStatus::ReadyForRender.label()
            )));
        }
        let parent_ref = order.parent_ref.clone().ok_or_else(|| {
            PipelineError::validation(format!(
                "work order {} has no parent engagement reference",
                order.id.0
            ))
        })?;
        let snapshot = self
            .work_orders
            .latest_snapshot(id)?
            .ok_or_else(|| {
                PipelineError::validation(format!(
                    "work order {} has no contract snapshot",
                    order.id.0
                ))
            })?;

        // Fully materialized already: report success without touching
        // anything, so retries and replayed webhooks are free.
        if let Some(existing) = self.packs.pack_for_work_order(id)? {
            if let Some(job) = self.packs.job_for_pack(&existing.id)? {
                return Ok(PackEnsureOutcome {
                    idempotent: true,
                    pack: existing,
                    job,
                    enqueue: None,
                });
            }
        }

        let pack = match self.packs.pack_for_work_order(id)? {
            Some(existing) => existing,
            None => {
                let bundle = self
                    .exporter
                    .export_work_order(id, snapshot.version)
                    .map_err(|err| PipelineError::Collaborator(err.to_string()))?;
                let bundle_hash = canonical_content_hash(&bundle);

                let selector = snapshot
                    .contract
                    .meta
                    .template_selector
                    .unwrap_or(TemplateSelector::Unknown);
                let (template_key, report_family) =
                    derive_template_identity(order.report_type, selector, order.bank_type);

                let version = self.packs.highest_version(&parent_ref, &template_key)? + 1;
                let candidate = ReportPack {
                    id: PackId(format!("pack-{}", Uuid::new_v4())),
                    work_order_id: order.id.clone(),
                    parent_ref: parent_ref.clone(),
                    template_key,
                    report_family,
                    version,
                    bundle_hash: bundle_hash.clone(),
                    debug_artifact: json!({
                        "export_bundle": bundle,
                        "bundle_hash": bundle_hash,
                        "snapshot_version": snapshot.version,
                    }),
                    created_at: Utc::now(),
                };

                let stored = self.packs.insert_or_fetch_pack(candidate)?;
                if stored.newly_inserted {
                    self.record_audit(
                        &order,
                        "report_pack.created",
                        [
                            ("pack_id", stored.row.id.0.clone()),
                            ("bundle_hash", stored.row.bundle_hash.clone()),
                            ("version", stored.row.version.to_string()),
                            (
                                "bank_type",
                                order.bank_type.map_or("unknown", BankType::label).to_string(),
                            ),
                            ("value_slab", order.value_slab.label().to_string()),
                            ("request_id", request_id.to_string()),
                            ("actor", actor.to_string()),
                        ],
                    );
                }
                stored.row
            }
        };

        if order.pack_id.as_ref() != Some(&pack.id) {
            order.pack_id = Some(pack.id.clone());
            self.work_orders.update(order.clone())?;
        }

        let job_key = idempotency_key
            .unwrap_or_else(|| format!("pack-{}-v{}", order.id.0, snapshot.version));
        let candidate = GenerationJob {
            id: JobId(format!("job-{}", Uuid::new_v4())),
            pack_id: pack.id.clone(),
            work_order_id: order.id.clone(),
            idempotency_key: job_key,
            status: JobStatus::Queued,
            created_at: Utc::now(),
        };
        let stored = self.packs.insert_or_fetch_job(candidate)?;
        let job = stored.row;

        let enqueue = if stored.newly_inserted {
            self.record_audit(
                &order,
                "generation_job.created",
                [
                    ("job_id", job.id.0.clone()),
                    ("idempotency_key", job.idempotency_key.clone()),
                    ("request_id", request_id.to_string()),
                    ("actor", actor.to_string()),
                ],
            );
            Some(RenderQueuePayload {
                job_id: job.id.clone(),
                pack_id: pack.id.clone(),
                work_order_id: order.id.clone(),
                template_key: pack.template_key.clone(),
                idempotency_key: job.idempotency_key.clone(),
            })
        } else {
            None
        };

        Ok(PackEnsureOutcome {
            idempotent: false,
            pack,
            job,
            enqueue,
        })
    }

    fn record_audit<const N: usize>(
        &self,
        order: &WorkOrder,
        action: &str,
        metadata: [(&str, String); N],
    ) {
        let note = AuditNote {
            org: order.org.clone(),
            parent_ref: order.parent_ref.clone().unwrap_or_default(),
            action: action.to_string(),
            metadata: metadata
                .into_iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect::<BTreeMap<_, _>>(),
        };
        if let Err(err) = self.audit.record(note) {
            warn!(action, error = %err, "audit write failed, continuing");
        }
    }
}

/// Template identity derived from classification. The key pins pack
/// uniqueness together with the parent reference and version.
fn derive_template_identity(
    report_type: ReportType,
    selector: TemplateSelector,
    bank_type: Option<BankType>,
) -> (String, String) {
    let template_key = format!("{}/{}", selector.code(), report_type.code());
    let family = match selector {
        TemplateSelector::CoopGeneric => "cooperative",
        TemplateSelector::AgriGeneric => "agricultural",
        TemplateSelector::SbiFormatA | TemplateSelector::BoiPsuGeneric => "commercial",
        TemplateSelector::Unknown => match bank_type {
            Some(BankType::Cooperative) => "cooperative",
            Some(BankType::Agricultural) => "agricultural",
            _ => "unclassified",
        },
    };
    (template_key, family.to_string())
}

/// SHA-256 over a canonical rendering of the bundle: object keys sorted
/// recursively, so hashing is stable across serializer key orderings.
pub fn canonical_content_hash(value: &Value) -> String {
    let mut canonical = String::new();
    write_canonical(value, &mut canonical);
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (index, (key, entry)) in entries.into_iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(entry, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}
