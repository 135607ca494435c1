use super::super::domain::BankType;

/// Ruleset identifier stamped onto recomputed contracts.
pub const DEFAULT_RULESET_VERSION: &str = "m5.4-v1";

/// Co-operative lenders value the adopted figure at 80% of market.
pub const COOP_ADOPTED_TO_MARKET_RATIO: f64 = 0.8;

pub const REALIZABLE_FACTOR: f64 = 0.95;
pub const DISTRESS_FACTOR: f64 = 0.80;

/// Five crore, the slab boundary. Strictly-less-than stays in the lower slab.
pub const VALUE_SLAB_THRESHOLD: f64 = 50_000_000.0;

/// Co-operative totals are presented rounded up to the next 500.
pub const COOP_ROUNDING_STEP: f64 = 500.0;

/// Market/guideline ratios outside this band usually mean a unit-entry slip.
pub const RATE_RATIO_MIN: f64 = 0.1;
pub const RATE_RATIO_MAX: f64 = 10.0;

/// Ordered substring table for inferring the lender classification from the
/// bank name. First match wins; lookups run against the uppercased name.
pub(crate) const BANK_CODE_TABLE: &[(&str, BankType)] = &[
    ("CO-OP", BankType::Cooperative),
    ("COOPERATIVE", BankType::Cooperative),
    ("SAHAKARI", BankType::Cooperative),
    ("AGRI", BankType::Agricultural),
    ("LAND DEVELOPMENT", BankType::Agricultural),
    ("STATE BANK", BankType::Sbi),
    ("SBI", BankType::Sbi),
    ("BANK OF INDIA", BankType::Psu),
    ("BOI", BankType::Psu),
];

/// Configuration for a rules-engine instance.
#[derive(Debug, Clone, PartialEq)]
pub struct RulesConfig {
    pub ruleset_version: String,
}

impl RulesConfig {
    pub fn with_version(version: impl Into<String>) -> Self {
        Self {
            ruleset_version: version.into(),
        }
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self::with_version(DEFAULT_RULESET_VERSION)
    }
}
