use super::super::contract::ContractDocument;
use super::super::domain::{BankType, TemplateSelector, ValueSlab};
use super::super::units::{area_to_sqm, rate_to_sqm, round2, round_up_to_step, MeasureUnit};
use super::config::{
    RulesConfig, BANK_CODE_TABLE, COOP_ADOPTED_TO_MARKET_RATIO, COOP_ROUNDING_STEP,
    DISTRESS_FACTOR, RATE_RATIO_MAX, RATE_RATIO_MIN, REALIZABLE_FACTOR, VALUE_SLAB_THRESHOLD,
};
use super::{RecomputeOutcome, RuleWarning, WarningLevel};

/// Absent or non-finite figures flow through the engine as `None`.
fn sane(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

pub(crate) fn recompute_document(
    input: &ContractDocument,
    config: &RulesConfig,
) -> RecomputeOutcome {
    let mut contract = input.clone();
    let mut warnings = Vec::new();

    infer_bank_type(&mut contract);
    standardize_measures(&mut contract);
    apply_cooperative_inversion(&mut contract, &mut warnings);
    compute_headline_values(&mut contract);
    classify_value_slab(&mut contract);
    select_template(&mut contract);
    apply_cooperative_rounding(&mut contract);
    collect_advisories(&contract, &mut warnings);

    contract.audit.ruleset_version = Some(config.ruleset_version.clone());

    RecomputeOutcome {
        contract,
        warnings,
        ruleset_version: config.ruleset_version.clone(),
    }
}

fn infer_bank_type(contract: &mut ContractDocument) {
    if contract.meta.bank_type.is_some() {
        return;
    }
    let Some(bank_name) = contract.party.bank_name.as_deref() else {
        return;
    };
    let needle = bank_name.to_ascii_uppercase();
    for (code, bank_type) in BANK_CODE_TABLE {
        if needle.contains(code) {
            contract.meta.bank_type = Some(*bank_type);
            return;
        }
    }
}

fn measure_unit(explicit: Option<MeasureUnit>, declared: Option<MeasureUnit>) -> MeasureUnit {
    explicit.or(declared).unwrap_or(MeasureUnit::Sqm)
}

/// Standardize areas and rates into square-meter denominations. Previously
/// standardized values win over raw inputs; in particular an existing
/// standardized guideline rate is never overwritten.
fn standardize_measures(contract: &mut ContractDocument) {
    let declared = contract.valuation_inputs.input_unit;
    let property = contract.property.clone();
    let inputs = contract.valuation_inputs.clone();
    let computed = &mut contract.computed_values;

    computed.land_area_sqm = sane(computed.land_area_sqm).or_else(|| {
        sane(property.land_area)
            .map(|raw| area_to_sqm(raw, measure_unit(property.land_area_unit, declared)))
    });
    computed.built_up_area_sqm = sane(computed.built_up_area_sqm).or_else(|| {
        sane(property.built_up_area)
            .map(|raw| area_to_sqm(raw, measure_unit(property.built_up_area_unit, declared)))
    });

    computed.guideline_rate_sqm = sane(computed.guideline_rate_sqm).or_else(|| {
        sane(inputs.guideline_rate)
            .map(|raw| rate_to_sqm(raw, measure_unit(inputs.guideline_rate_unit, declared)))
    });
    computed.market_rate_sqm = sane(computed.market_rate_sqm).or_else(|| {
        sane(inputs.market_rate)
            .map(|raw| rate_to_sqm(raw, measure_unit(inputs.market_rate_unit, declared)))
    });
    computed.adopted_rate_sqm = sane(computed.adopted_rate_sqm).or_else(|| {
        sane(inputs.adopted_rate)
            .map(|raw| rate_to_sqm(raw, measure_unit(inputs.adopted_rate_unit, declared)))
    });

    // Totals are currency amounts and re-derive from the raw inputs on every
    // recompute so operator corrections always land.
    computed.adopted_total_value = sane(inputs.adopted_total_value).map(round2);
    computed.market_total_value = sane(inputs.market_total_value).map(round2);
}

/// Co-operative lenders fix adopted value at 80% of market. When exactly one
/// side is captured, the other is derived and flagged.
fn apply_cooperative_inversion(contract: &mut ContractDocument, warnings: &mut Vec<RuleWarning>) {
    if contract.meta.bank_type != Some(BankType::Cooperative) {
        return;
    }

    let computed = &mut contract.computed_values;
    match (computed.adopted_total_value, computed.market_total_value) {
        (Some(adopted), None) => {
            computed.market_total_value = Some(round2(adopted / COOP_ADOPTED_TO_MARKET_RATIO));
            if computed.market_rate_sqm.is_none() {
                if let Some(rate) = computed.adopted_rate_sqm {
                    computed.market_rate_sqm = Some(round2(rate / COOP_ADOPTED_TO_MARKET_RATIO));
                }
            }
            warnings.push(RuleWarning {
                code: "coop_market_inferred",
                message: format!(
                    "market value inferred from adopted value {adopted} using adopted = 0.8 x market"
                ),
                level: WarningLevel::Info,
            });
        }
        (None, Some(market)) => {
            computed.adopted_total_value = Some(round2(market * COOP_ADOPTED_TO_MARKET_RATIO));
            if computed.adopted_rate_sqm.is_none() {
                if let Some(rate) = computed.market_rate_sqm {
                    computed.adopted_rate_sqm = Some(round2(rate * COOP_ADOPTED_TO_MARKET_RATIO));
                }
            }
            warnings.push(RuleWarning {
                code: "coop_adopted_inferred",
                message: format!(
                    "adopted value inferred from market value {market} using adopted = 0.8 x market"
                ),
                level: WarningLevel::Info,
            });
        }
        _ => {}
    }
}

fn compute_headline_values(contract: &mut ContractDocument) {
    let inputs = &contract.valuation_inputs;
    let computed = &mut contract.computed_values;

    let fair_market_value = match sane(inputs.fair_market_value) {
        Some(explicit) => Some(round2(explicit)),
        None => {
            let land = sane(inputs.land_value);
            let building = sane(inputs.building_value);
            match (land, building) {
                (None, None) => None,
                (land, building) => {
                    Some(round2(land.unwrap_or(0.0) + building.unwrap_or(0.0)))
                }
            }
        }
    };

    computed.fair_market_value = fair_market_value;
    computed.realizable_value = fair_market_value.map(|v| round2(v * REALIZABLE_FACTOR));
    computed.distress_value = fair_market_value.map(|v| round2(v * DISTRESS_FACTOR));
}

fn classify_value_slab(contract: &mut ContractDocument) {
    let computed = &contract.computed_values;
    let candidate = computed
        .fair_market_value
        .or(computed.adopted_total_value)
        .or(computed.market_total_value);

    let slab = match candidate {
        Some(value) if value > 0.0 => {
            if value < VALUE_SLAB_THRESHOLD {
                ValueSlab::Lt5Cr
            } else {
                ValueSlab::Gt5Cr
            }
        }
        _ => ValueSlab::Unknown,
    };

    contract.meta.value_slab = Some(slab);
}

fn select_template(contract: &mut ContractDocument) {
    let slab = contract.meta.value_slab.unwrap_or(ValueSlab::Unknown);
    let selector = match contract.meta.bank_type {
        Some(BankType::Cooperative) => TemplateSelector::CoopGeneric,
        Some(BankType::Agricultural) => TemplateSelector::AgriGeneric,
        _ => match slab {
            ValueSlab::Lt5Cr => TemplateSelector::SbiFormatA,
            ValueSlab::Gt5Cr => TemplateSelector::BoiPsuGeneric,
            ValueSlab::Unknown => TemplateSelector::Unknown,
        },
    };
    contract.meta.template_selector = Some(selector);
}

fn apply_cooperative_rounding(contract: &mut ContractDocument) {
    let computed = &mut contract.computed_values;
    if contract.meta.bank_type != Some(BankType::Cooperative) {
        computed.rounded_total_value = None;
        return;
    }

    let base = computed
        .market_total_value
        .or(computed.adopted_total_value)
        .or(computed.fair_market_value);
    computed.rounded_total_value = base.map(|v| round_up_to_step(v, COOP_ROUNDING_STEP));
}

fn collect_advisories(contract: &ContractDocument, warnings: &mut Vec<RuleWarning>) {
    let blank = |field: &Option<String>| field.as_deref().map_or(true, |v| v.trim().is_empty());

    if blank(&contract.party.bank_name) || blank(&contract.party.bank_branch) {
        warnings.push(RuleWarning {
            code: "missing_bank_identity",
            message: "bank name and branch are not both captured".to_string(),
            level: WarningLevel::Warn,
        });
    }

    let computed = &contract.computed_values;
    match (computed.guideline_rate_sqm, computed.market_rate_sqm) {
        (None, None) => warnings.push(RuleWarning {
            code: "missing_rate_inputs",
            message: "neither guideline nor market rate is captured".to_string(),
            level: WarningLevel::Warn,
        }),
        (Some(guideline), Some(market)) if guideline > 0.0 => {
            let ratio = market / guideline;
            if !(RATE_RATIO_MIN..=RATE_RATIO_MAX).contains(&ratio) {
                warnings.push(RuleWarning {
                    code: "suspicious_rate_ratio",
                    message: format!(
                        "market/guideline rate ratio {ratio:.2} falls outside [{RATE_RATIO_MIN}, {RATE_RATIO_MAX}], likely a unit-entry mistake"
                    ),
                    level: WarningLevel::Warn,
                });
            }
        }
        _ => {}
    }

    let inputs = &contract.valuation_inputs;
    if let (Some(declared), Some(market_unit)) = (inputs.input_unit, inputs.market_rate_unit) {
        if declared != market_unit {
            warnings.push(RuleWarning {
                code: "unit_mismatch",
                message: format!(
                    "declared input unit {} differs from market rate unit {}",
                    declared.label(),
                    market_unit.label()
                ),
                level: WarningLevel::Warn,
            });
        }
    }

    if blank(&contract.property.address) {
        warnings.push(RuleWarning {
            code: "missing_property_address",
            message: "property address is not captured".to_string(),
            level: WarningLevel::Warn,
        });
    }
}
