// ABOUTME: Guard bounds for scale factors, recalibration and draft macro correction
// ABOUTME: A verified confidence level is only ever granted inside these bounds
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Smallest accepted factor when scaling a single recipe or food serving
pub const SCALE_FACTOR_MIN: f64 = 0.25;

/// Largest accepted factor when scaling a single recipe or food serving
pub const SCALE_FACTOR_MAX: f64 = 8.0;

/// Share of matched ingredients required for a verified ingredient-level meal
pub const VERIFIED_MATCH_RATIO: f64 = 0.7;

/// Relative kcal deviation that triggers recalibration after ingredient-level compile
pub const RECALIBRATION_TOLERANCE: f64 = 0.15;

/// Smallest recalibration factor applied to resolved ingredients
pub const RECALIBRATION_MIN: f64 = 0.5;

/// Largest recalibration factor applied to resolved ingredients
pub const RECALIBRATION_MAX: f64 = 2.0;

/// Relative macro deviation that triggers draft correction for a macro class
pub const CORRECTION_TOLERANCE: f64 = 0.15;

/// Lower clamp for draft correction factors
pub const CORRECTION_MIN: f64 = 0.5;

/// Upper clamp for draft correction factors
pub const CORRECTION_MAX: f64 = 2.0;
