// ABOUTME: Routing and diagnostic errors raised between nutrition compiler strategies
// ABOUTME: Only schema validation is fatal; every other variant routes to the next strategy
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::SourceError;

/// Signal produced when a compiler strategy or resolver step does not succeed
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A food source failed; treated as "no match"
    #[error(transparent)]
    Source(#[from] SourceError),

    /// No candidate was found for the query
    #[error("no match for '{query}'")]
    NoMatch {
        /// Ingredient, food or meal name that was looked up
        query: String,
    },

    /// A scale factor fell outside its guard bounds
    #[error("scale factor {factor:.3} outside [{min}, {max}]")]
    ScaleGuardRejection {
        /// Computed factor
        factor: f64,
        /// Lower bound
        min: f64,
        /// Upper bound
        max: f64,
    },

    /// The batch deadline elapsed before every ingredient was resolved
    #[error("resolution deadline exceeded with {} unresolved ingredient(s)", unresolved.len())]
    ResolutionTimeout {
        /// Ingredient names that were still pending
        unresolved: Vec<String>,
    },

    /// Too few ingredients matched for a verified result
    #[error("only {matched} of {total} ingredients matched")]
    InsufficientCoverage {
        /// Matched ingredient count
        matched: usize,
        /// Total ingredient count
        total: usize,
    },

    /// Compiled output violated its schema contract
    #[error("compiled plan failed schema validation: {}", violations.join("; "))]
    SchemaValidation {
        /// Human-readable violation descriptions
        violations: Vec<String>,
    },
}

impl PipelineError {
    /// Whether this error must abort the whole compile
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::SchemaValidation { .. })
    }

    /// Create a no-match signal
    #[must_use]
    pub fn no_match(query: impl Into<String>) -> Self {
        Self::NoMatch {
            query: query.into(),
        }
    }
}
