// ABOUTME: Unit conversion for draft ingredients using food-specific densities
// ABOUTME: Converts weight, volume and count units to grams with generic fallbacks
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::iter;

use nutrition_core::models::{normalize_name, Quantity, Unit};

use crate::text::contains_phrase;

/// Conversion error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConversionError {
    /// Density not found for ingredient
    #[error("density not found for ingredient: {0}")]
    DensityNotFound(String),
    /// Unit not supported for this ingredient
    #[error("unit '{unit}' not supported for {ingredient}")]
    UnsupportedUnit {
        /// Ingredient name
        ingredient: String,
        /// Unit that could not be converted
        unit: Unit,
    },
}

/// Density information for an ingredient
///
/// Grams per milliliter for volume measures and grams per piece for counted items.
#[derive(Debug, Clone, Copy)]
pub struct IngredientDensity {
    /// Grams per milliliter (for volume conversions)
    pub grams_per_ml: Option<f64>,
    /// Grams per piece (for count conversions)
    pub grams_per_piece: Option<f64>,
    /// Common names for this ingredient
    pub aliases: &'static [&'static str],
}

impl IngredientDensity {
    const fn liquid(grams_per_ml: f64) -> Self {
        Self {
            grams_per_ml: Some(grams_per_ml),
            grams_per_piece: None,
            aliases: &[],
        }
    }

    const fn countable(grams_per_piece: f64) -> Self {
        Self {
            grams_per_ml: None,
            grams_per_piece: Some(grams_per_piece),
            aliases: &[],
        }
    }

    const fn both(grams_per_ml: f64, grams_per_piece: f64) -> Self {
        Self {
            grams_per_ml: Some(grams_per_ml),
            grams_per_piece: Some(grams_per_piece),
            aliases: &[],
        }
    }

    const fn with_aliases(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }
}

/// Milliliters per US cup
pub const ML_PER_CUP: f64 = 240.0;
/// Milliliters per tablespoon
pub const ML_PER_TBSP: f64 = 15.0;
/// Milliliters per teaspoon
pub const ML_PER_TSP: f64 = 5.0;
/// Milliliters per liter
pub const ML_PER_LITER: f64 = 1000.0;

/// Grams per ounce
pub const GRAMS_PER_OZ: f64 = 28.35;
/// Grams per pound
pub const GRAMS_PER_LB: f64 = 453.6;
/// Grams per kilogram
pub const GRAMS_PER_KG: f64 = 1000.0;

/// Density assumed for volumes of unknown foods
pub const DEFAULT_GRAMS_PER_ML: f64 = 1.0;
/// Weight assumed for one piece of an unknown food
pub const DEFAULT_PIECE_GRAMS: f64 = 100.0;
/// Weight assumed for one slice of an unknown food
pub const DEFAULT_SLICE_GRAMS: f64 = 30.0;
/// Weight of one garlic clove
pub const CLOVE_GRAMS: f64 = 3.0;
/// Weight of one pinch
pub const PINCH_GRAMS: f64 = 0.4;

/// Approximate densities; composition data from the sources always takes precedence
static INGREDIENT_DENSITIES: &[(&str, IngredientDensity)] = &[
    // Proteins
    (
        "chicken breast",
        IngredientDensity::both(0.58, 170.0).with_aliases(&["chicken", "boneless chicken"]),
    ),
    ("chicken thigh", IngredientDensity::both(0.58, 110.0)),
    (
        "ground beef",
        IngredientDensity::liquid(0.54).with_aliases(&["beef mince", "minced beef"]),
    ),
    ("steak", IngredientDensity::countable(225.0).with_aliases(&["sirloin", "beef steak"])),
    (
        "salmon",
        IngredientDensity::both(0.50, 170.0).with_aliases(&["salmon fillet"]),
    ),
    ("tuna", IngredientDensity::liquid(0.55)),
    ("shrimp", IngredientDensity::both(0.60, 12.0).with_aliases(&["prawns"])),
    (
        "egg",
        IngredientDensity::countable(50.0).with_aliases(&["eggs", "large egg"]),
    ),
    (
        "egg white",
        IngredientDensity::both(1.03, 33.0).with_aliases(&["egg whites"]),
    ),
    ("tofu", IngredientDensity::liquid(0.52)),
    (
        "greek yogurt",
        IngredientDensity::liquid(1.05).with_aliases(&["yogurt", "plain yogurt"]),
    ),
    ("cottage cheese", IngredientDensity::liquid(0.96)),
    // Grains and starches
    (
        "rice",
        IngredientDensity::liquid(0.77).with_aliases(&["white rice", "brown rice", "uncooked rice"]),
    ),
    (
        "cooked rice",
        IngredientDensity::liquid(0.72).with_aliases(&["steamed rice"]),
    ),
    (
        "oats",
        IngredientDensity::liquid(0.36).with_aliases(&["rolled oats", "oatmeal"]),
    ),
    ("quinoa", IngredientDensity::liquid(0.71)),
    (
        "pasta",
        IngredientDensity::liquid(0.45).with_aliases(&["spaghetti", "penne", "dry pasta"]),
    ),
    (
        "bread",
        IngredientDensity::countable(30.0).with_aliases(&["toast", "bread slice"]),
    ),
    ("tortilla", IngredientDensity::countable(45.0).with_aliases(&["wrap"])),
    ("low-carb tortilla", IngredientDensity::countable(40.0)),
    ("flour", IngredientDensity::liquid(0.50).with_aliases(&["all purpose flour"])),
    ("corn", IngredientDensity::both(0.64, 100.0).with_aliases(&["sweet corn"])),
    (
        "potato",
        IngredientDensity::both(0.65, 150.0).with_aliases(&["potatoes"]),
    ),
    (
        "sweet potato",
        IngredientDensity::both(0.65, 130.0).with_aliases(&["sweet potatoes"]),
    ),
    // Fruits
    ("banana", IngredientDensity::countable(120.0)),
    ("apple", IngredientDensity::countable(180.0)),
    ("orange", IngredientDensity::countable(130.0)),
    ("blueberries", IngredientDensity::liquid(0.64).with_aliases(&["blueberry"])),
    ("strawberries", IngredientDensity::liquid(0.53).with_aliases(&["strawberry"])),
    ("avocado", IngredientDensity::both(0.60, 150.0)),
    // Vegetables
    (
        "spinach",
        IngredientDensity::liquid(0.12).with_aliases(&["baby spinach"]),
    ),
    ("broccoli", IngredientDensity::both(0.36, 150.0)),
    ("cauliflower", IngredientDensity::both(0.42, 575.0)),
    (
        "cauliflower rice",
        IngredientDensity::liquid(0.45).with_aliases(&["riced cauliflower"]),
    ),
    (
        "zucchini",
        IngredientDensity::both(0.52, 200.0).with_aliases(&["courgette"]),
    ),
    (
        "zucchini noodles",
        IngredientDensity::liquid(0.50).with_aliases(&["zoodles"]),
    ),
    ("lettuce wrap", IngredientDensity::countable(15.0).with_aliases(&["lettuce leaf"])),
    ("carrot", IngredientDensity::both(0.50, 60.0)),
    ("onion", IngredientDensity::both(0.63, 110.0)),
    (
        "garlic",
        IngredientDensity::countable(3.0).with_aliases(&["garlic clove"]),
    ),
    ("tomato", IngredientDensity::both(0.60, 150.0)),
    (
        "bell pepper",
        IngredientDensity::both(0.50, 120.0).with_aliases(&["capsicum"]),
    ),
    // Dairy
    (
        "milk",
        IngredientDensity::liquid(1.03).with_aliases(&["whole milk", "skim milk"]),
    ),
    ("almond milk", IngredientDensity::liquid(1.02)),
    ("butter", IngredientDensity::liquid(0.91)),
    (
        "cheese",
        IngredientDensity::both(0.45, 20.0).with_aliases(&["shredded cheese", "cheddar"]),
    ),
    ("parmesan", IngredientDensity::liquid(0.42)),
    // Fats and oils
    (
        "olive oil",
        IngredientDensity::liquid(0.92).with_aliases(&["extra virgin olive oil", "evoo"]),
    ),
    ("coconut oil", IngredientDensity::liquid(0.92)),
    ("oil", IngredientDensity::liquid(0.92).with_aliases(&["vegetable oil", "canola oil"])),
    // Nuts and seeds
    ("almonds", IngredientDensity::liquid(0.56).with_aliases(&["almond"])),
    ("peanut butter", IngredientDensity::liquid(1.07)),
    ("walnuts", IngredientDensity::liquid(0.46).with_aliases(&["walnut"])),
    ("chia seeds", IngredientDensity::liquid(0.65).with_aliases(&["chia"])),
    // Sweeteners and liquids
    ("sugar", IngredientDensity::liquid(0.85)),
    ("honey", IngredientDensity::liquid(1.42)),
    ("maple syrup", IngredientDensity::liquid(1.33)),
    ("water", IngredientDensity::liquid(1.0)),
    (
        "broth",
        IngredientDensity::liquid(1.0).with_aliases(&["stock", "chicken broth"]),
    ),
    ("soy sauce", IngredientDensity::liquid(1.15)),
    // Legumes and powders
    ("black beans", IngredientDensity::liquid(0.72).with_aliases(&["beans"])),
    ("chickpeas", IngredientDensity::liquid(0.72).with_aliases(&["garbanzo beans"])),
    ("lentils", IngredientDensity::liquid(0.77)),
    (
        "whey protein",
        IngredientDensity::liquid(0.42).with_aliases(&["protein powder", "whey"]),
    ),
];

/// Look up density for an ingredient by name
///
/// Exact name, then exact alias, then the longest known name or alias that
/// appears in the ingredient as whole words.
#[must_use]
pub fn lookup_density(ingredient_name: &str) -> Option<&'static IngredientDensity> {
    let normalized = normalize_name(ingredient_name);

    if let Some((_, density)) = INGREDIENT_DENSITIES
        .iter()
        .find(|(name, _)| *name == normalized)
    {
        return Some(density);
    }

    if let Some((_, density)) = INGREDIENT_DENSITIES
        .iter()
        .find(|(_, density)| density.aliases.contains(&normalized.as_str()))
    {
        return Some(density);
    }

    INGREDIENT_DENSITIES
        .iter()
        .flat_map(|(name, density)| {
            iter::once(*name)
                .chain(density.aliases.iter().copied())
                .map(move |key| (key, density))
        })
        .filter(|(key, _)| contains_phrase(&normalized, key))
        .max_by_key(|(key, _)| key.len())
        .map(|(_, density)| density)
}

/// Milliliters in one unit, for volume units
#[must_use]
pub const fn ml_per_unit(unit: &Unit) -> Option<f64> {
    match unit {
        Unit::Milliliters => Some(1.0),
        Unit::Liters => Some(ML_PER_LITER),
        Unit::Cups => Some(ML_PER_CUP),
        Unit::Tablespoons => Some(ML_PER_TBSP),
        Unit::Teaspoons => Some(ML_PER_TSP),
        _ => None,
    }
}

/// Grams in one unit, for weight units
#[must_use]
pub const fn grams_per_unit(unit: &Unit) -> Option<f64> {
    match unit {
        Unit::Grams => Some(1.0),
        Unit::Kilograms => Some(GRAMS_PER_KG),
        Unit::Ounces => Some(GRAMS_PER_OZ),
        Unit::Pounds => Some(GRAMS_PER_LB),
        _ => None,
    }
}

/// Convert an ingredient quantity to grams using only known densities
///
/// # Errors
///
/// Returns `ConversionError::DensityNotFound` when a volume or count unit is used
/// for an ingredient with no density entry, and `ConversionError::UnsupportedUnit`
/// when the entry lacks the needed density kind or the unit is unrecognized.
pub fn convert_to_grams(ingredient_name: &str, quantity: &Quantity) -> Result<f64, ConversionError> {
    if let Some(grams) = grams_per_unit(&quantity.unit) {
        return Ok(quantity.value * grams);
    }

    let unsupported = || ConversionError::UnsupportedUnit {
        ingredient: ingredient_name.to_owned(),
        unit: quantity.unit.clone(),
    };

    match &quantity.unit {
        Unit::Cloves => return Ok(quantity.value * CLOVE_GRAMS),
        Unit::Pinch => return Ok(quantity.value * PINCH_GRAMS),
        Unit::Other(_) => return Err(unsupported()),
        _ => {}
    }

    let density = lookup_density(ingredient_name)
        .ok_or_else(|| ConversionError::DensityNotFound(ingredient_name.to_owned()))?;

    if let Some(ml) = ml_per_unit(&quantity.unit) {
        let grams_per_ml = density.grams_per_ml.ok_or_else(unsupported)?;
        return Ok(quantity.value * ml * grams_per_ml);
    }

    let grams_per_piece = density.grams_per_piece.ok_or_else(unsupported)?;
    if quantity.unit == Unit::Slices {
        return Ok(quantity.value * grams_per_piece.min(DEFAULT_SLICE_GRAMS));
    }
    Ok(quantity.value * grams_per_piece)
}

/// Convert an ingredient quantity to grams, falling back to generic weights
///
/// Volumes of unknown foods assume water density; unknown pieces weigh 100 g,
/// slices 30 g. Never fails and never returns a negative weight.
#[must_use]
pub fn estimate_grams(ingredient_name: &str, quantity: &Quantity) -> f64 {
    if let Ok(grams) = convert_to_grams(ingredient_name, quantity) {
        return grams.max(0.0);
    }

    let density = lookup_density(ingredient_name);
    let grams = match &quantity.unit {
        unit if unit.is_volume() => {
            let grams_per_ml = density
                .and_then(|d| d.grams_per_ml)
                .unwrap_or(DEFAULT_GRAMS_PER_ML);
            ml_per_unit(unit).unwrap_or(1.0) * grams_per_ml * quantity.value
        }
        Unit::Slices => DEFAULT_SLICE_GRAMS * quantity.value,
        _ => {
            density
                .and_then(|d| d.grams_per_piece)
                .unwrap_or(DEFAULT_PIECE_GRAMS)
                * quantity.value
        }
    };
    grams.max(0.0)
}

/// Grams per milliliter for a food, keyed off its name
///
/// Used to convert ml-measured servings to grams. Unknown foods assume water.
#[must_use]
pub fn ml_density_estimate(food_name: &str) -> f64 {
    lookup_density(food_name)
        .and_then(|density| density.grams_per_ml)
        .unwrap_or(DEFAULT_GRAMS_PER_ML)
}

/// Check if an ingredient has a known density
#[must_use]
pub fn has_density(ingredient_name: &str) -> bool {
    lookup_density(ingredient_name).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_units_need_no_density() {
        let grams = convert_to_grams("anything", &Quantity::new(2.0, Unit::Ounces)).unwrap();
        assert!((grams - 56.7).abs() < 1e-9);
    }

    #[test]
    fn test_longest_phrase_wins() {
        let density = lookup_density("Cauliflower rice, frozen").unwrap();
        assert_eq!(density.grams_per_ml, Some(0.45));
        let density = lookup_density("sweet potato, baked").unwrap();
        assert_eq!(density.grams_per_piece, Some(130.0));
    }

    #[test]
    fn test_unknown_piece_falls_back() {
        let grams = estimate_grams("dragonfruit", &Quantity::new(2.0, Unit::Pieces));
        assert!((grams - 200.0).abs() < f64::EPSILON);
        assert!(convert_to_grams("dragonfruit", &Quantity::new(2.0, Unit::Pieces)).is_err());
    }
}
