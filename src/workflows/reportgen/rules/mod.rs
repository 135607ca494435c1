//! Deterministic contract rules engine.
//!
//! The engine never mutates its input: recomputation deep-copies the
//! document, fills `computed_values` and the classification header, and
//! reports advisory warnings. Absent or malformed numerics are never fatal.

mod compute;
mod config;

pub use config::{RulesConfig, DEFAULT_RULESET_VERSION};

use serde::Serialize;

use super::contract::ContractDocument;

/// Stateless evaluator applying one ruleset version to contract documents.
pub struct ContractRulesEngine {
    config: RulesConfig,
}

impl ContractRulesEngine {
    pub fn new(config: RulesConfig) -> Self {
        Self { config }
    }

    pub fn with_version(version: impl Into<String>) -> Self {
        Self::new(RulesConfig::with_version(version))
    }

    pub fn ruleset_version(&self) -> &str {
        &self.config.ruleset_version
    }

    /// Produce a fresh document with `computed_values` fully populated.
    pub fn recompute(&self, contract: &ContractDocument) -> RecomputeOutcome {
        compute::recompute_document(contract, &self.config)
    }
}

impl Default for ContractRulesEngine {
    fn default() -> Self {
        Self::new(RulesConfig::default())
    }
}

/// Severity of a rules-engine advisory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningLevel {
    Info,
    Warn,
    Error,
}

/// Classified, non-fatal advisory raised during recomputation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleWarning {
    pub code: &'static str,
    pub message: String,
    pub level: WarningLevel,
}

/// Result of one recomputation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecomputeOutcome {
    pub contract: ContractDocument,
    pub warnings: Vec<RuleWarning>,
    pub ruleset_version: String,
}

impl RecomputeOutcome {
    pub fn has_warning(&self, code: &str) -> bool {
        self.warnings.iter().any(|warning| warning.code == code)
    }
}
