// ABOUTME: Constraint-based meal selection for the deterministic fallback plan generator
// ABOUTME: Balances cuisine preference, recency windows and day-to-day protein rotation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Variety Optimizer
//!
//! Candidates are split into a preferred pool (cuisine matches a user
//! preference) and an other pool. Three of every four selections draw from the
//! preferred pool. A candidate is skipped when it was picked recently (a
//! narrower window for preferred picks) or when it repeats yesterday's primary
//! protein, unless that protein is exempt. Selection falls back from the first
//! pool to the second and finally to any candidate ignoring the protein rule,
//! so a selection always exists while any candidate remains. Picked candidates
//! rotate to the back of their pool.

use std::collections::VecDeque;

use nutrition_core::models::{normalize_name, DraftMeal, MealSlot};
use tracing::debug;

/// Recent picks a preferred candidate must not repeat
pub const PREFERRED_RECENCY_WINDOW: usize = 2;
/// Recent picks a non-preferred candidate must not repeat
pub const OTHER_RECENCY_WINDOW: usize = 5;
/// Preferred picks per cycle of four selections
const PREFERRED_PER_CYCLE: usize = 3;
const CYCLE_LENGTH: usize = 4;

/// Proteins that may repeat on consecutive days
pub const EXEMPT_PROTEINS: &[&str] = &[
    "egg",
    "eggs",
    "dairy",
    "milk",
    "yogurt",
    "greek yogurt",
    "cheese",
    "cottage cheese",
    "tofu",
    "tempeh",
    "beans",
    "lentils",
    "chickpeas",
    "edamame",
    "plant protein",
    "seitan",
];

/// Fuzzy protein comparison: bidirectional substring containment
#[must_use]
pub fn proteins_match(left: &str, right: &str) -> bool {
    let left = normalize_name(left);
    let right = normalize_name(right);
    !left.is_empty() && !right.is_empty() && (left.contains(&right) || right.contains(&left))
}

/// Whether a protein is allowed to repeat on consecutive days
#[must_use]
pub fn is_exempt_protein(protein: &str) -> bool {
    EXEMPT_PROTEINS
        .iter()
        .any(|exempt| proteins_match(protein, exempt))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pool {
    Preferred,
    Other,
}

/// Stateful selector over a fixed candidate list
#[derive(Debug, Clone)]
pub struct VarietyOptimizer {
    preferred: Vec<DraftMeal>,
    other: Vec<DraftMeal>,
    recent: VecDeque<String>,
    selections: usize,
}

impl VarietyOptimizer {
    /// Split candidates into preferred and other pools by cuisine
    #[must_use]
    pub fn new(candidates: Vec<DraftMeal>, preferred_cuisines: &[String]) -> Self {
        let preferred_cuisines: Vec<String> =
            preferred_cuisines.iter().map(|c| normalize_name(c)).collect();
        let (preferred, other) = candidates.into_iter().partition(|meal| {
            meal.cuisine
                .as_deref()
                .is_some_and(|cuisine| preferred_cuisines.contains(&normalize_name(cuisine)))
        });
        Self {
            preferred,
            other,
            recent: VecDeque::new(),
            selections: 0,
        }
    }

    /// Number of candidates across both pools
    #[must_use]
    pub fn len(&self) -> usize {
        self.preferred.len() + self.other.len()
    }

    /// No candidates at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Select a meal for `slot`, avoiding `previous_protein` unless exempt
    ///
    /// Candidates drafted for another slot are used only when no candidate
    /// exists for this slot. Returns `None` only when there are no candidates.
    pub fn select(&mut self, slot: MealSlot, previous_protein: Option<&str>) -> Option<DraftMeal> {
        let prefer_first = self.selections % CYCLE_LENGTH < PREFERRED_PER_CYCLE;
        let order = if prefer_first {
            [Pool::Preferred, Pool::Other]
        } else {
            [Pool::Other, Pool::Preferred]
        };
        let slot_filter = self.has_slot(slot).then_some(slot);

        let found = order
            .iter()
            .find_map(|&pool| {
                self.find(pool, slot_filter, previous_protein, true)
                    .map(|index| (pool, index))
            })
            .or_else(|| {
                order
                    .iter()
                    .find_map(|&pool| self.find(pool, slot_filter, None, false).map(|index| (pool, index)))
            });

        let (pool, index) = found?;
        let meal = self.rotate(pool, index);
        self.selections += 1;
        self.recent.push_front(normalize_name(&meal.name));
        self.recent.truncate(OTHER_RECENCY_WINDOW);
        debug!(meal = %meal.name, pool = ?pool, slot = ?slot, "variety selection");
        Some(meal)
    }

    fn has_slot(&self, slot: MealSlot) -> bool {
        self.preferred
            .iter()
            .chain(&self.other)
            .any(|meal| meal.slot == slot)
    }

    fn pool(&self, pool: Pool) -> &Vec<DraftMeal> {
        match pool {
            Pool::Preferred => &self.preferred,
            Pool::Other => &self.other,
        }
    }

    fn find(
        &self,
        pool: Pool,
        slot: Option<MealSlot>,
        previous_protein: Option<&str>,
        enforce_recency: bool,
    ) -> Option<usize> {
        let window = match pool {
            Pool::Preferred => PREFERRED_RECENCY_WINDOW,
            Pool::Other => OTHER_RECENCY_WINDOW,
        };
        self.pool(pool).iter().position(|meal| {
            if slot.is_some_and(|slot| meal.slot != slot) {
                return false;
            }
            if enforce_recency && self.recently_picked(&meal.name, window) {
                return false;
            }
            !repeats_protein(meal, previous_protein)
        })
    }

    fn recently_picked(&self, name: &str, window: usize) -> bool {
        let key = normalize_name(name);
        self.recent.iter().take(window).any(|recent| *recent == key)
    }

    fn rotate(&mut self, pool: Pool, index: usize) -> DraftMeal {
        let pool = match pool {
            Pool::Preferred => &mut self.preferred,
            Pool::Other => &mut self.other,
        };
        let meal = pool.remove(index);
        pool.push(meal.clone());
        meal
    }
}

fn repeats_protein(meal: &DraftMeal, previous_protein: Option<&str>) -> bool {
    let (Some(previous), Some(protein)) = (previous_protein, meal.primary_protein.as_deref()) else {
        return false;
    };
    proteins_match(protein, previous) && !is_exempt_protein(protein)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protein_matching_is_bidirectional() {
        assert!(proteins_match("chicken", "Chicken Thighs"));
        assert!(proteins_match("grilled salmon", "salmon"));
        assert!(!proteins_match("beef", "pork"));
        assert!(!proteins_match("", "pork"));
    }

    #[test]
    fn test_exemptions() {
        assert!(is_exempt_protein("Eggs"));
        assert!(is_exempt_protein("firm tofu"));
        assert!(!is_exempt_protein("chicken"));
    }
}
