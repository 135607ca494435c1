//! The nested contract document carried by every work-order snapshot.
//!
//! Field names are load-bearing: downstream renderers deserialize the
//! snapshot JSON, so the serde names here must stay stable. Every leaf is
//! explicitly optional; operators patch sections incrementally and the rules
//! engine fills `computed_values` on every patch.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{BankType, ReportType, TemplateSelector, ValueSlab};
use super::units::MeasureUnit;

/// Full contract document. Missing sections deserialize to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractDocument {
    pub meta: ContractMeta,
    pub party: PartySection,
    pub property: PropertySection,
    pub valuation_inputs: ValuationInputs,
    pub computed_values: ComputedValues,
    pub annexures: Vec<AnnexureEntry>,
    pub manual_fields: BTreeMap<String, String>,
    pub audit: ContractAudit,
}

/// Classification header. The rules engine owns `value_slab` and
/// `template_selector`; `bank_type` may be set explicitly by the operator or
/// inferred from the party section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractMeta {
    pub report_type: Option<ReportType>,
    pub bank_type: Option<BankType>,
    pub value_slab: Option<ValueSlab>,
    pub template_selector: Option<TemplateSelector>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartySection {
    pub bank_name: Option<String>,
    pub bank_branch: Option<String>,
    pub borrower_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertySection {
    pub address: Option<String>,
    pub land_area: Option<f64>,
    pub land_area_unit: Option<MeasureUnit>,
    pub built_up_area: Option<f64>,
    pub built_up_area_unit: Option<MeasureUnit>,
}

/// Raw operator-entered figures. Units accompany each rate; totals are
/// currency amounts and carry no unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuationInputs {
    pub input_unit: Option<MeasureUnit>,
    pub guideline_rate: Option<f64>,
    pub guideline_rate_unit: Option<MeasureUnit>,
    pub market_rate: Option<f64>,
    pub market_rate_unit: Option<MeasureUnit>,
    pub adopted_rate: Option<f64>,
    pub adopted_rate_unit: Option<MeasureUnit>,
    pub land_value: Option<f64>,
    pub building_value: Option<f64>,
    pub fair_market_value: Option<f64>,
    pub adopted_total_value: Option<f64>,
    pub market_total_value: Option<f64>,
}

/// Derived figures. This section is a pure function of the rest of the
/// document plus the ruleset version; it is never hand-edited, and patches
/// cannot carry it (see `ContractPatch`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputedValues {
    pub land_area_sqm: Option<f64>,
    pub built_up_area_sqm: Option<f64>,
    pub guideline_rate_sqm: Option<f64>,
    pub market_rate_sqm: Option<f64>,
    pub adopted_rate_sqm: Option<f64>,
    pub adopted_total_value: Option<f64>,
    pub market_total_value: Option<f64>,
    pub fair_market_value: Option<f64>,
    pub realizable_value: Option<f64>,
    pub distress_value: Option<f64>,
    pub rounded_total_value: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnexureEntry {
    pub title: String,
    pub evidence_item_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractAudit {
    pub ruleset_version: Option<String>,
    pub patch_count: u32,
}

/// Operator-supplied contract update. Sections are replaced wholesale when
/// present. `computed_values` has no representation here, so derived figures
/// cannot arrive through a patch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractPatch {
    pub report_type: Option<ReportType>,
    pub bank_type: Option<BankType>,
    pub party: Option<PartySection>,
    pub property: Option<PropertySection>,
    pub valuation_inputs: Option<ValuationInputs>,
    pub annexures: Option<Vec<AnnexureEntry>>,
    pub manual_fields: Option<BTreeMap<String, String>>,
}

impl ContractDocument {
    /// Apply an operator patch, leaving `computed_values` untouched for the
    /// rules engine to rebuild.
    pub fn apply_patch(&mut self, patch: ContractPatch) {
        if let Some(report_type) = patch.report_type {
            self.meta.report_type = Some(report_type);
        }
        if let Some(bank_type) = patch.bank_type {
            self.meta.bank_type = Some(bank_type);
        }
        if let Some(party) = patch.party {
            self.party = party;
        }
        if let Some(property) = patch.property {
            self.property = property;
        }
        if let Some(inputs) = patch.valuation_inputs {
            self.valuation_inputs = inputs;
        }
        if let Some(annexures) = patch.annexures {
            self.annexures = annexures;
        }
        if let Some(manual_fields) = patch.manual_fields {
            self.manual_fields = manual_fields;
        }
        self.audit.patch_count += 1;
    }
}
