//! Advisory annexure ordering for captured evidence.

use serde::{Deserialize, Serialize};

use super::super::domain::{EvidenceItem, EvidenceItemId, EvidenceKind};

/// Proposed 1-based annexure position for one evidence item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnexureAssignment {
    pub evidence_id: EvidenceItemId,
    pub position: u32,
}

/// Category tags ranked ahead of the coarse kind fallback.
const CATEGORY_RANKS: &[(&str, u32)] = &[
    ("exterior", 10),
    ("interior", 20),
    ("surroundings", 30),
    ("gps", 40),
    ("google-map", 50),
    ("route-map", 60),
];

fn category_rank(item: &EvidenceItem) -> u32 {
    if let Some(category) = item.tags.get("category") {
        for (name, rank) in CATEGORY_RANKS {
            if category.as_str() == *name {
                return *rank;
            }
        }
    }
    match item.kind {
        EvidenceKind::Screenshot => 70,
        EvidenceKind::Geo => 80,
        EvidenceKind::Photo => 90,
        EvidenceKind::Document => 100,
        EvidenceKind::Other => 200,
    }
}

/// Compute the canonical annexure order. Stable on (rank, existing position,
/// capture time, id); positions are re-assigned sequentially from 1. Pure:
/// recomputing at any time has no side effect on other data.
pub fn ordered_annexure(items: &[EvidenceItem]) -> Vec<AnnexureAssignment> {
    let mut sorted: Vec<&EvidenceItem> = items.iter().collect();
    sorted.sort_by(|a, b| {
        category_rank(a)
            .cmp(&category_rank(b))
            .then_with(|| {
                a.annexure_position
                    .unwrap_or(u32::MAX)
                    .cmp(&b.annexure_position.unwrap_or(u32::MAX))
            })
            .then_with(|| a.captured_at.cmp(&b.captured_at))
            .then_with(|| a.id.cmp(&b.id))
    });

    sorted
        .into_iter()
        .enumerate()
        .map(|(index, item)| AnnexureAssignment {
            evidence_id: item.id.clone(),
            position: index as u32 + 1,
        })
        .collect()
}
