//! Matches captured evidence against an evidence profile.

use serde::{Deserialize, Serialize};

use super::super::domain::{
    EvidenceItem, EvidenceItemId, EvidenceKind, EvidenceProfile, ProfileItem,
};

/// One requirement row of the readiness checklist. The serialized shape is a
/// stable contract with downstream UI and readiness consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistRow {
    pub item_id: String,
    pub label: String,
    pub kind: EvidenceKind,
    pub doc_type: Option<String>,
    pub min_count: u32,
    pub required: bool,
    pub current_count: u32,
    pub missing_count: u32,
    pub satisfied: bool,
    pub matched_evidence: Vec<EvidenceItemId>,
    pub field_hint: Option<String>,
}

/// Capture action surfaced for a missing contract field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureSuggestion {
    pub field_key: String,
    pub item_id: String,
    pub label: String,
}

/// Build the checklist for a profile against the captured evidence
/// inventory. Rows come out in profile order (order hint, then item id).
pub fn build_checklist(profile: &EvidenceProfile, evidence: &[EvidenceItem]) -> Vec<ChecklistRow> {
    let mut items: Vec<&ProfileItem> = profile.items.iter().collect();
    items.sort_by(|a, b| {
        a.order_hint
            .cmp(&b.order_hint)
            .then_with(|| a.id.cmp(&b.id))
    });

    items
        .into_iter()
        .map(|item| {
            let matched: Vec<EvidenceItemId> = evidence
                .iter()
                .filter(|candidate| matches_item(item, candidate))
                .map(|candidate| candidate.id.clone())
                .collect();

            let current_count = matched.len() as u32;
            // `required` deliberately plays no part here; it only weights
            // downstream readiness, never the satisfaction boolean.
            let satisfied = current_count >= item.min_count;

            ChecklistRow {
                item_id: item.id.clone(),
                label: item.label.clone(),
                kind: item.kind,
                doc_type: item.doc_type.clone(),
                min_count: item.min_count,
                required: item.required,
                current_count,
                missing_count: item.min_count.saturating_sub(current_count),
                satisfied,
                matched_evidence: matched,
                field_hint: item.field_hint.clone(),
            }
        })
        .collect()
}

/// Surface capture actions for missing contract fields. Keys with no
/// checklist row pointing at them are silently dropped.
pub fn suggest_for_missing_fields(
    rows: &[ChecklistRow],
    missing_fields: &[String],
) -> Vec<CaptureSuggestion> {
    missing_fields
        .iter()
        .flat_map(|key| {
            rows.iter()
                .filter(move |row| row.field_hint.as_deref() == Some(key.as_str()))
                .map(move |row| CaptureSuggestion {
                    field_key: key.clone(),
                    item_id: row.item_id.clone(),
                    label: row.label.clone(),
                })
        })
        .collect()
}

/// Kind must match exactly, doc type exactly when the item pins one, and
/// every required tag must be present with the same value. Extra evidence
/// tags are ignored.
fn matches_item(item: &ProfileItem, candidate: &EvidenceItem) -> bool {
    if candidate.kind != item.kind {
        return false;
    }
    if let Some(doc_type) = item.doc_type.as_deref() {
        if candidate.doc_type.as_deref() != Some(doc_type) {
            return false;
        }
    }
    item.tags
        .iter()
        .all(|(key, value)| candidate.tags.get(key) == Some(value))
}
