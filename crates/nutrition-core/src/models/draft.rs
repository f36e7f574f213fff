// ABOUTME: AI-drafted meal plan input models consumed read-only by the compiler
// ABOUTME: MealPlanDraft, DraftDay, DraftMeal, DraftIngredient and MealSlot definitions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::{Deserialize, Serialize};

use super::{DietaryPreferences, NutritionFacts, Quantity, Unit};

/// Meal slot within a day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum MealSlot {
    /// Breakfast meal
    Breakfast,
    /// Lunch meal
    Lunch,
    /// Dinner meal
    Dinner,
    /// Snack between meals
    Snack,
    /// Unspecified slot
    Other,
}

impl MealSlot {
    /// Parse meal slot from string
    #[must_use]
    pub fn from_str_lossy(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "breakfast" => Self::Breakfast,
            "lunch" => Self::Lunch,
            "dinner" | "supper" => Self::Dinner,
            "snack" | "snacks" => Self::Snack,
            _ => Self::Other,
        }
    }
}

impl From<String> for MealSlot {
    fn from(text: String) -> Self {
        Self::from_str_lossy(&text)
    }
}

/// Ingredient line as drafted upstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftIngredient {
    /// Free-text ingredient name
    pub name: String,
    /// Amount and unit
    #[serde(flatten)]
    pub quantity: Quantity,
}

impl DraftIngredient {
    /// Create an ingredient line
    #[must_use]
    pub fn new(name: impl Into<String>, value: f64, unit: Unit) -> Self {
        Self {
            name: name.into(),
            quantity: Quantity::new(value, unit),
        }
    }
}

/// Meal as drafted upstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftMeal {
    /// Meal slot
    #[serde(alias = "mealType")]
    pub slot: MealSlot,
    /// Meal name
    pub name: String,
    /// Cuisine label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cuisine: Option<String>,
    /// Preparation time in minutes
    #[serde(default, alias = "prepTime", skip_serializing_if = "Option::is_none")]
    pub prep_time_minutes: Option<u32>,
    /// Cooking time in minutes
    #[serde(default, alias = "cookTime", skip_serializing_if = "Option::is_none")]
    pub cook_time_minutes: Option<u32>,
    /// Model-estimated nutrition
    #[serde(default)]
    pub estimated_nutrition: NutritionFacts,
    /// Target nutrition for the meal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_nutrition: Option<NutritionFacts>,
    /// Drafted ingredient lines; empty for legacy drafts
    #[serde(default, alias = "ingredients")]
    pub draft_ingredients: Vec<DraftIngredient>,
    /// Suggested number of servings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_servings: Option<f64>,
    /// Main protein source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_protein: Option<String>,
    /// Free-form tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Drafted preparation steps, if any
    #[serde(default)]
    pub instructions: Vec<String>,
}

impl DraftMeal {
    /// Create a minimal meal with the given estimate and no ingredients
    #[must_use]
    pub fn new(slot: MealSlot, name: impl Into<String>, estimated: NutritionFacts) -> Self {
        Self {
            slot,
            name: name.into(),
            cuisine: None,
            prep_time_minutes: None,
            cook_time_minutes: None,
            estimated_nutrition: estimated,
            target_nutrition: None,
            draft_ingredients: Vec::new(),
            suggested_servings: None,
            primary_protein: None,
            tags: Vec::new(),
            instructions: Vec::new(),
        }
    }

    /// Target nutrition, falling back to the model estimate
    #[must_use]
    pub fn target(&self) -> NutritionFacts {
        self.target_nutrition.unwrap_or(self.estimated_nutrition)
    }

    /// Legacy drafts carry no ingredient list
    #[must_use]
    pub fn is_legacy(&self) -> bool {
        self.draft_ingredients.is_empty()
    }

    /// Number of ingredient lines with an empty or whitespace-only name
    #[must_use]
    pub fn blank_ingredient_count(&self) -> usize {
        self.draft_ingredients
            .iter()
            .filter(|ingredient| ingredient.name.trim().is_empty())
            .count()
    }

    /// Copy with blank ingredient lines dropped and the rest trimmed
    #[must_use]
    pub fn without_blank_ingredients(&self) -> Self {
        let mut meal = self.clone();
        meal.draft_ingredients.retain(|ingredient| !ingredient.name.trim().is_empty());
        for ingredient in &mut meal.draft_ingredients {
            let trimmed = ingredient.name.trim();
            if trimmed.len() != ingredient.name.len() {
                ingredient.name = trimmed.to_owned();
            }
        }
        meal
    }
}

/// One day of a drafted plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftDay {
    /// 1-based day number
    #[serde(alias = "dayNumber")]
    pub day: u32,
    /// Calendar date, if scheduled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Explicit daily target; defaults to the sum of meal targets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_nutrition: Option<NutritionFacts>,
    /// Meals in slot order
    #[serde(default)]
    pub meals: Vec<DraftMeal>,
}

impl DraftDay {
    /// Daily target nutrition
    #[must_use]
    pub fn target(&self) -> NutritionFacts {
        self.target_nutrition
            .unwrap_or_else(|| self.meals.iter().map(DraftMeal::target).sum())
    }
}

/// Whole AI-drafted plan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanDraft {
    /// Plan title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Dietary preferences the plan was drafted for
    #[serde(default)]
    pub preferences: DietaryPreferences,
    /// Days in order
    #[serde(default)]
    pub days: Vec<DraftDay>,
}

impl MealPlanDraft {
    /// Total number of meals across all days
    #[must_use]
    pub fn meal_count(&self) -> usize {
        self.days.iter().map(|day| day.meals.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_ingredient_lines_are_dropped() {
        let mut meal = DraftMeal::new(MealSlot::Dinner, "Bowl", NutritionFacts::new(500.0, 30.0, 50.0, 20.0));
        meal.draft_ingredients = vec![
            DraftIngredient::new(" chicken breast ", 150.0, Unit::Grams),
            DraftIngredient::new("   ", 10.0, Unit::Grams),
            DraftIngredient::new("", 5.0, Unit::Grams),
        ];

        assert_eq!(meal.blank_ingredient_count(), 2);
        let cleaned = meal.without_blank_ingredients();
        assert_eq!(cleaned.draft_ingredients.len(), 1);
        assert_eq!(cleaned.draft_ingredients[0].name, "chicken breast");
        assert_eq!(cleaned.blank_ingredient_count(), 0);
    }

    #[test]
    fn test_draft_meal_parses_heterogeneous_ingredients() {
        let json = r#"{
            "slot": "Dinner",
            "name": "Chicken and rice",
            "estimatedNutrition": {"calories": 650, "protein": 45, "carbs": 60, "fat": 18},
            "draftIngredients": [
                {"name": "chicken breast", "quantity": 150, "unit": "g"},
                {"name": "white rice", "quantity": "3/4", "unit": "Cups"},
                {"name": "olive oil", "quantity": "1", "unit": "tbsp"}
            ]
        }"#;
        let meal: DraftMeal = serde_json::from_str(json).unwrap();
        assert_eq!(meal.slot, MealSlot::Dinner);
        assert!(!meal.is_legacy());
        assert_eq!(meal.draft_ingredients[1].quantity.unit, Unit::Cups);
        assert!((meal.draft_ingredients[1].quantity.value - 0.75).abs() < f64::EPSILON);
        assert!((meal.target().calories - 650.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_day_target_sums_meals() {
        let day = DraftDay {
            day: 1,
            date: None,
            target_nutrition: None,
            meals: vec![
                DraftMeal::new(MealSlot::Breakfast, "Oats", NutritionFacts::new(400.0, 20.0, 50.0, 10.0)),
                DraftMeal::new(MealSlot::Lunch, "Salad", NutritionFacts::new(500.0, 30.0, 30.0, 25.0)),
            ],
        };
        assert!((day.target().calories - 900.0).abs() < f64::EPSILON);
    }
}
