//! Evidence readiness: profile selection, checklist matching, and annexure
//! ordering.

mod annexure;
mod checklist;
mod profile;

pub use annexure::{ordered_annexure, AnnexureAssignment};
pub use checklist::{
    build_checklist, suggest_for_missing_fields, CaptureSuggestion, ChecklistRow,
};
pub use profile::{ProfileResolver, ProfileSelection, SeedReport};
