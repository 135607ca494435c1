//! Pure numeric helpers shared by the contract rules engine.

use serde::{Deserialize, Serialize};

/// Fixed conversion constant between square feet and square meters.
pub const SQFT_PER_SQM: f64 = 10.7639;

/// Measurement unit attached to raw area and rate inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasureUnit {
    Sqft,
    Sqm,
}

impl MeasureUnit {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Sqft => "sqft",
            Self::Sqm => "sqm",
        }
    }
}

/// Round to two decimal places, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Convert an area measurement into square meters.
pub fn area_to_sqm(value: f64, unit: MeasureUnit) -> f64 {
    match unit {
        MeasureUnit::Sqft => round2(value / SQFT_PER_SQM),
        MeasureUnit::Sqm => round2(value),
    }
}

/// Convert a per-unit rate into a per-square-meter rate.
pub fn rate_to_sqm(value: f64, unit: MeasureUnit) -> f64 {
    match unit {
        MeasureUnit::Sqft => round2(value * SQFT_PER_SQM),
        MeasureUnit::Sqm => round2(value),
    }
}

/// Round a value up to the next multiple of `step`.
///
/// Non-positive values collapse to zero; a non-positive step leaves the value
/// untouched.
pub fn round_up_to_step(value: f64, step: f64) -> f64 {
    if value <= 0.0 {
        return 0.0;
    }
    if step <= 0.0 {
        return value;
    }
    (value / step).ceil() * step
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqft_area_converts_to_sqm() {
        let converted = area_to_sqm(1076.39, MeasureUnit::Sqft);
        assert!((converted - 100.00).abs() < 0.01);
    }

    #[test]
    fn sqm_area_passes_through() {
        assert_eq!(area_to_sqm(84.5, MeasureUnit::Sqm), 84.5);
    }

    #[test]
    fn sqft_rate_scales_up() {
        // Rs 100/sqft is Rs 1076.39/sqm.
        assert!((rate_to_sqm(100.0, MeasureUnit::Sqft) - 1076.39).abs() < 0.01);
    }

    #[test]
    fn rounding_is_half_up_to_two_places() {
        assert_eq!(round2(15431.249), 15431.25);
        assert_eq!(round2(0.005), 0.01);
    }

    #[test]
    fn round_up_to_step_covers_boundaries() {
        assert_eq!(round_up_to_step(400.0, 500.0), 500.0);
        assert_eq!(round_up_to_step(600.0, 500.0), 1000.0);
        assert_eq!(round_up_to_step(1000.0, 500.0), 1000.0);
        assert_eq!(round_up_to_step(0.0, 500.0), 0.0);
        assert_eq!(round_up_to_step(-25.0, 500.0), 0.0);
    }
}
