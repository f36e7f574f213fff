// ABOUTME: Dietary style and allergen definitions for draft preferences and compliance audits
// ABOUTME: Lenient parsing so unknown user input degrades instead of failing a draft
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::{Deserialize, Deserializer, Serialize};

/// Overall dietary style of a plan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum DietaryStyle {
    /// No style restrictions
    #[default]
    Standard,
    /// Very low carbohydrate, high fat
    Keto,
    /// No meat or fish
    Vegetarian,
    /// No animal products
    Vegan,
    /// Vegetarian plus fish and seafood
    Pescatarian,
    /// No grains, legumes, dairy or refined sugar
    Paleo,
}

impl DietaryStyle {
    /// Parse a style from free text, defaulting to `Standard`
    #[must_use]
    pub fn from_str_lossy(s: &str) -> Self {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "keto" | "ketogenic" | "low_carb" => Self::Keto,
            "vegetarian" => Self::Vegetarian,
            "vegan" | "plant_based" => Self::Vegan,
            "pescatarian" | "pescetarian" => Self::Pescatarian,
            "paleo" => Self::Paleo,
            _ => Self::Standard,
        }
    }
}

impl From<String> for DietaryStyle {
    fn from(text: String) -> Self {
        Self::from_str_lossy(&text)
    }
}

/// Allergen category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Allergen {
    /// Peanuts
    Peanuts,
    /// Tree nuts
    TreeNuts,
    /// Milk and dairy
    Dairy,
    /// Eggs
    Eggs,
    /// Wheat and gluten grains
    Gluten,
    /// Soy
    Soy,
    /// Finfish
    Fish,
    /// Crustaceans and molluscs
    Shellfish,
    /// Sesame
    Sesame,
}

impl Allergen {
    /// Parse an allergen name, returning `None` for unknown text
    #[must_use]
    pub fn from_str_lossy(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "peanut" | "peanuts" => Some(Self::Peanuts),
            "tree_nut" | "tree_nuts" | "nuts" | "nut" => Some(Self::TreeNuts),
            "dairy" | "milk" | "lactose" => Some(Self::Dairy),
            "egg" | "eggs" => Some(Self::Eggs),
            "gluten" | "wheat" => Some(Self::Gluten),
            "soy" | "soya" => Some(Self::Soy),
            "fish" => Some(Self::Fish),
            "shellfish" | "crustacean" | "crustaceans" => Some(Self::Shellfish),
            "sesame" => Some(Self::Sesame),
            _ => None,
        }
    }

    /// Every allergen category
    pub const ALL: [Self; 9] = [
        Self::Peanuts,
        Self::TreeNuts,
        Self::Dairy,
        Self::Eggs,
        Self::Gluten,
        Self::Soy,
        Self::Fish,
        Self::Shellfish,
        Self::Sesame,
    ];
}

/// User preferences carried by a draft plan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DietaryPreferences {
    /// Dietary style
    #[serde(default, alias = "dietaryStyle", alias = "diet")]
    pub style: DietaryStyle,
    /// Allergens to audit against
    #[serde(default, deserialize_with = "deserialize_allergens")]
    pub allergens: Vec<Allergen>,
    /// Preferred cuisines, used by the fallback generator
    #[serde(default)]
    pub preferred_cuisines: Vec<String>,
}

fn deserialize_allergens<'de, D>(deserializer: D) -> Result<Vec<Allergen>, D::Error>
where
    D: Deserializer<'de>,
{
    let names = Vec::<String>::deserialize(deserializer)?;
    let mut allergens: Vec<Allergen> = names
        .iter()
        .filter_map(|name| Allergen::from_str_lossy(name))
        .collect();
    allergens.sort_unstable();
    allergens.dedup();
    Ok(allergens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_parsing() {
        assert_eq!(DietaryStyle::from_str_lossy("Ketogenic"), DietaryStyle::Keto);
        assert_eq!(DietaryStyle::from_str_lossy("plant-based"), DietaryStyle::Vegan);
        assert_eq!(DietaryStyle::from_str_lossy("whatever"), DietaryStyle::Standard);
    }

    #[test]
    fn test_unknown_allergens_are_dropped() {
        let prefs: DietaryPreferences =
            serde_json::from_str(r#"{"style": "keto", "allergens": ["Peanuts", "moonbeams", "peanut"]}"#)
                .unwrap();
        assert_eq!(prefs.style, DietaryStyle::Keto);
        assert_eq!(prefs.allergens, vec![Allergen::Peanuts]);
    }
}
