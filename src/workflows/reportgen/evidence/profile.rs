//! Evidence profile seeding and selection.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::super::domain::{
    BankType, EvidenceKind, EvidenceProfile, EvidenceProfileId, FieldDefinition, OrgId,
    ProfileItem, ReportType, ValueSlab, WorkOrderId,
};
use super::super::repository::{ProfileRepository, WorkOrderRepository};
use super::super::service::PipelineError;

/// Outcome of an idempotent seeding pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub fields_created: u32,
    pub profiles_created: u32,
}

/// The profile applied to a work order, and whether this call assigned it.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileSelection {
    pub profile: EvidenceProfile,
    pub newly_assigned: bool,
}

/// Picks (and seeds) the evidence checklist template for a work order.
pub struct ProfileResolver<P, W> {
    profiles: Arc<P>,
    work_orders: Arc<W>,
}

impl<P, W> ProfileResolver<P, W>
where
    P: ProfileRepository,
    W: WorkOrderRepository,
{
    pub fn new(profiles: Arc<P>, work_orders: Arc<W>) -> Self {
        Self {
            profiles,
            work_orders,
        }
    }

    /// Seed field definitions and default profiles for an organization.
    /// Existing rows are never overwritten; repeat calls are no-ops.
    pub fn seed_defaults(&self, org: &OrgId) -> Result<SeedReport, PipelineError> {
        let mut report = SeedReport::default();

        for definition in default_field_definitions(org) {
            if self.profiles.insert_field_definition_if_absent(definition)? {
                report.fields_created += 1;
            }
        }
        for profile in default_profiles(org) {
            if self.profiles.insert_profile_if_absent(profile)? {
                report.profiles_created += 1;
            }
        }

        Ok(report)
    }

    /// Resolve the applicable profile for a work order, persisting the
    /// choice onto the order the first time one is made.
    pub fn resolve_for_work_order(
        &self,
        id: &WorkOrderId,
    ) -> Result<Option<ProfileSelection>, PipelineError> {
        let mut order = self
            .work_orders
            .fetch(id)?
            .ok_or_else(|| PipelineError::not_found("work order", &id.0))?;

        if let Some(profile_id) = &order.profile_id {
            let profile = self
                .profiles
                .fetch(profile_id)?
                .ok_or_else(|| PipelineError::not_found("evidence profile", &profile_id.0))?;
            return Ok(Some(ProfileSelection {
                profile,
                newly_assigned: false,
            }));
        }

        let Some(profile) = self.select(&order.org, order.report_type, order.bank_type, order.value_slab)?
        else {
            return Ok(None);
        };

        order.profile_id = Some(profile.id.clone());
        self.work_orders.update(order)?;

        Ok(Some(ProfileSelection {
            profile,
            newly_assigned: true,
        }))
    }

    fn select(
        &self,
        org: &OrgId,
        report_type: ReportType,
        bank_type: Option<BankType>,
        slab: ValueSlab,
    ) -> Result<Option<EvidenceProfile>, PipelineError> {
        let mut candidates = self.profiles.default_profiles(org, report_type)?;
        candidates.sort_by(|a, b| {
            selection_score(b, bank_type, slab)
                .cmp(&selection_score(a, bank_type, slab))
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(candidates.into_iter().next())
    }
}

/// Exact bank match scores 10, a generic-scope candidate 2; exact slab match
/// scores 5, an unknown-scope candidate 1.
fn selection_score(
    profile: &EvidenceProfile,
    bank_type: Option<BankType>,
    slab: ValueSlab,
) -> i32 {
    let mut score = 0;
    match bank_type {
        Some(bank) if profile.bank_scope == bank => score += 10,
        _ if profile.bank_scope == BankType::Generic => score += 2,
        _ => {}
    }
    if profile.slab_scope == slab {
        score += 5;
    } else if profile.slab_scope == ValueSlab::Unknown {
        score += 1;
    }
    score
}

fn field(org: &OrgId, key: &str, label: &str) -> FieldDefinition {
    FieldDefinition {
        org: org.clone(),
        key: key.to_string(),
        label: label.to_string(),
    }
}

fn default_field_definitions(org: &OrgId) -> Vec<FieldDefinition> {
    vec![
        field(org, "party.bank_name", "Bank name"),
        field(org, "party.bank_branch", "Bank branch"),
        field(org, "property.address", "Property address"),
        field(org, "valuation_inputs.guideline_rate", "Guideline rate"),
        field(org, "valuation_inputs.market_rate", "Market rate"),
        field(org, "valuation_inputs.fair_market_value", "Fair market value"),
    ]
}

struct ItemSeed {
    id: &'static str,
    label: &'static str,
    kind: EvidenceKind,
    doc_type: Option<&'static str>,
    min_count: u32,
    required: bool,
    tags: &'static [(&'static str, &'static str)],
    field_hint: Option<&'static str>,
    order_hint: u32,
}

fn item(seed: ItemSeed) -> ProfileItem {
    ProfileItem {
        id: seed.id.to_string(),
        label: seed.label.to_string(),
        kind: seed.kind,
        doc_type: seed.doc_type.map(str::to_string),
        min_count: seed.min_count,
        required: seed.required,
        tags: seed
            .tags
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<BTreeMap<_, _>>(),
        field_hint: seed.field_hint.map(str::to_string),
        order_hint: seed.order_hint,
    }
}

fn profile(
    org: &OrgId,
    name: &str,
    report_type: ReportType,
    bank_scope: BankType,
    slab_scope: ValueSlab,
    items: Vec<ProfileItem>,
) -> EvidenceProfile {
    EvidenceProfile {
        id: EvidenceProfileId(format!("profile-{}-{}", org.0, name)),
        org: org.clone(),
        name: name.to_string(),
        report_type,
        bank_scope,
        slab_scope,
        items,
    }
}

fn standard_site_items() -> Vec<ProfileItem> {
    vec![
        item(ItemSeed {
            id: "exterior-photos",
            label: "Exterior photographs",
            kind: EvidenceKind::Photo,
            doc_type: None,
            min_count: 2,
            required: true,
            tags: &[("category", "exterior")],
            field_hint: Some("property.address"),
            order_hint: 10,
        }),
        item(ItemSeed {
            id: "interior-photos",
            label: "Interior photographs",
            kind: EvidenceKind::Photo,
            doc_type: None,
            min_count: 1,
            required: true,
            tags: &[("category", "interior")],
            field_hint: None,
            order_hint: 20,
        }),
        item(ItemSeed {
            id: "gps-capture",
            label: "GPS capture at site",
            kind: EvidenceKind::Geo,
            doc_type: None,
            min_count: 1,
            required: true,
            tags: &[],
            field_hint: Some("property.address"),
            order_hint: 30,
        }),
        item(ItemSeed {
            id: "guideline-rate-screenshot",
            label: "Guideline rate portal screenshot",
            kind: EvidenceKind::Screenshot,
            doc_type: Some("guideline_rate"),
            min_count: 1,
            required: false,
            tags: &[],
            field_hint: Some("valuation_inputs.guideline_rate"),
            order_hint: 40,
        }),
        item(ItemSeed {
            id: "title-deed",
            label: "Title deed copy",
            kind: EvidenceKind::Document,
            doc_type: Some("title_deed"),
            min_count: 1,
            required: true,
            tags: &[],
            field_hint: None,
            order_hint: 50,
        }),
    ]
}

fn default_profiles(org: &OrgId) -> Vec<EvidenceProfile> {
    let mut high_value_items = standard_site_items();
    high_value_items.push(item(ItemSeed {
        id: "route-map",
        label: "Route map to property",
        kind: EvidenceKind::Screenshot,
        doc_type: Some("route_map"),
        min_count: 1,
        required: true,
        tags: &[("category", "route-map")],
        field_hint: None,
        order_hint: 60,
    }));

    let mut coop_items = standard_site_items();
    coop_items.push(item(ItemSeed {
        id: "committee-resolution",
        label: "Valuation committee resolution",
        kind: EvidenceKind::Document,
        doc_type: Some("committee_resolution"),
        min_count: 1,
        required: true,
        tags: &[],
        field_hint: None,
        order_hint: 70,
    }));

    vec![
        profile(
            org,
            "standard-land-building",
            ReportType::LandAndBuilding,
            BankType::Generic,
            ValueSlab::Unknown,
            standard_site_items(),
        ),
        profile(
            org,
            "high-value-land-building",
            ReportType::LandAndBuilding,
            BankType::Generic,
            ValueSlab::Gt5Cr,
            high_value_items,
        ),
        profile(
            org,
            "coop-land-building",
            ReportType::LandAndBuilding,
            BankType::Cooperative,
            ValueSlab::Unknown,
            coop_items,
        ),
        profile(
            org,
            "standard-apartment",
            ReportType::ApartmentFlat,
            BankType::Generic,
            ValueSlab::Unknown,
            standard_site_items(),
        ),
        profile(
            org,
            "agri-holding",
            ReportType::AgriculturalLand,
            BankType::Agricultural,
            ValueSlab::Unknown,
            standard_site_items(),
        ),
    ]
}
