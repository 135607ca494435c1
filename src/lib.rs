//! Valuation-report work-order administration: contract computation,
//! evidence readiness, and billing-gated deliverable release.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
