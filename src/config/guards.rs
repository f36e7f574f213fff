// ABOUTME: Guard bound configuration for scale factors, recalibration and draft correction
// ABOUTME: Loaded from NUTRITION_* variables and validated so no bound pair is inverted
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use nutrition_core::constants::guards;
use nutrition_core::errors::{AppError, AppResult};
use nutrition_intelligence::{CorrectionBounds, ScaleGuard};

use super::env_or;

/// Named, overridable guard constants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuardConfig {
    /// Smallest accepted recipe or food serving factor
    pub scale_factor_min: f64,
    /// Largest accepted recipe or food serving factor
    pub scale_factor_max: f64,
    /// Matched share required for a verified ingredient-level meal
    pub verified_match_ratio: f64,
    /// Relative kcal deviation that triggers recalibration
    pub recalibration_tolerance: f64,
    /// Smallest recalibration factor applied
    pub recalibration_min: f64,
    /// Largest recalibration factor applied
    pub recalibration_max: f64,
    /// Relative macro deviation that triggers draft correction
    pub correction_tolerance: f64,
    /// Lower clamp for correction factors
    pub correction_min: f64,
    /// Upper clamp for correction factors
    pub correction_max: f64,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            scale_factor_min: guards::SCALE_FACTOR_MIN,
            scale_factor_max: guards::SCALE_FACTOR_MAX,
            verified_match_ratio: guards::VERIFIED_MATCH_RATIO,
            recalibration_tolerance: guards::RECALIBRATION_TOLERANCE,
            recalibration_min: guards::RECALIBRATION_MIN,
            recalibration_max: guards::RECALIBRATION_MAX,
            correction_tolerance: guards::CORRECTION_TOLERANCE,
            correction_min: guards::CORRECTION_MIN,
            correction_max: guards::CORRECTION_MAX,
        }
    }
}

impl GuardConfig {
    /// Load guard bounds from environment
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            scale_factor_min: env_or("SCALE_FACTOR_MIN", guards::SCALE_FACTOR_MIN),
            scale_factor_max: env_or("SCALE_FACTOR_MAX", guards::SCALE_FACTOR_MAX),
            verified_match_ratio: env_or("VERIFIED_MATCH_RATIO", guards::VERIFIED_MATCH_RATIO),
            recalibration_tolerance: env_or(
                "RECALIBRATION_TOLERANCE",
                guards::RECALIBRATION_TOLERANCE,
            ),
            recalibration_min: env_or("RECALIBRATION_MIN", guards::RECALIBRATION_MIN),
            recalibration_max: env_or("RECALIBRATION_MAX", guards::RECALIBRATION_MAX),
            correction_tolerance: env_or("CORRECTION_TOLERANCE", guards::CORRECTION_TOLERANCE),
            correction_min: env_or("CORRECTION_MIN", guards::CORRECTION_MIN),
            correction_max: env_or("CORRECTION_MAX", guards::CORRECTION_MAX),
        }
    }

    /// Reject inverted, non-positive or non-finite bounds
    ///
    /// # Errors
    ///
    /// Returns a `ConfigInvalid` error naming the offending setting.
    pub fn validate(&self) -> AppResult<()> {
        check_pair("SCALE_FACTOR", self.scale_factor_min, self.scale_factor_max)?;
        check_pair("RECALIBRATION", self.recalibration_min, self.recalibration_max)?;
        check_pair("CORRECTION", self.correction_min, self.correction_max)?;
        check_fraction("VERIFIED_MATCH_RATIO", self.verified_match_ratio)?;
        check_fraction("RECALIBRATION_TOLERANCE", self.recalibration_tolerance)?;
        check_fraction("CORRECTION_TOLERANCE", self.correction_tolerance)?;
        Ok(())
    }

    /// Bounds for recipe and single-food scaling
    #[must_use]
    pub const fn scale_guard(&self) -> ScaleGuard {
        ScaleGuard::new(self.scale_factor_min, self.scale_factor_max)
    }

    /// Bounds for ingredient-level recalibration
    #[must_use]
    pub const fn recalibration_guard(&self) -> ScaleGuard {
        ScaleGuard::new(self.recalibration_min, self.recalibration_max)
    }

    /// Bounds for the draft macro corrector
    #[must_use]
    pub const fn correction_bounds(&self) -> CorrectionBounds {
        CorrectionBounds {
            tolerance: self.correction_tolerance,
            min_factor: self.correction_min,
            max_factor: self.correction_max,
        }
    }
}

fn check_pair(name: &str, min: f64, max: f64) -> AppResult<()> {
    if !(min.is_finite() && max.is_finite()) || min <= 0.0 || min > max {
        return Err(AppError::config_invalid(format!(
            "{name} bounds must satisfy 0 < min <= max, got [{min}, {max}]"
        )));
    }
    Ok(())
}

fn check_fraction(name: &str, value: f64) -> AppResult<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(AppError::config_invalid(format!(
            "{name} must be within [0, 1], got {value}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GuardConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.scale_guard().contains(0.5));
        assert!(!config.recalibration_guard().contains(0.233));
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let config = GuardConfig {
            recalibration_min: 2.0,
            recalibration_max: 0.5,
            ..GuardConfig::default()
        };
        assert!(config.validate().is_err());

        let config = GuardConfig {
            verified_match_ratio: 1.5,
            ..GuardConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
