// ABOUTME: Deterministic meal plan drafts built from built-in templates when no AI draft exists
// ABOUTME: Filters templates for dietary compliance and picks meals through the variety optimizer
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use nutrition_core::models::{
    DietaryPreferences, DraftDay, DraftIngredient, DraftMeal, MealPlanDraft, MealSlot,
    NutritionFacts, Unit,
};
use nutrition_intelligence::{ComplianceScanner, VarietyOptimizer};
use tracing::{debug, info};

/// Slots filled for every generated day, in order
pub const DAILY_SLOTS: [MealSlot; 4] = [
    MealSlot::Breakfast,
    MealSlot::Lunch,
    MealSlot::Dinner,
    MealSlot::Snack,
];

/// Share of the daily calorie target per slot
const fn slot_share(slot: MealSlot) -> f64 {
    match slot {
        MealSlot::Breakfast => 0.25,
        MealSlot::Lunch => 0.30,
        MealSlot::Dinner => 0.35,
        MealSlot::Snack | MealSlot::Other => 0.10,
    }
}

struct Template {
    slot: MealSlot,
    name: &'static str,
    cuisine: &'static str,
    protein: &'static str,
    nutrition: NutritionFacts,
    ingredients: &'static [(&'static str, f64, Unit)],
    tags: &'static [&'static str],
}

impl Template {
    fn to_draft(&self) -> DraftMeal {
        let mut meal = DraftMeal::new(self.slot, self.name, self.nutrition);
        meal.cuisine = Some(self.cuisine.to_owned());
        meal.primary_protein = Some(self.protein.to_owned());
        meal.draft_ingredients = self
            .ingredients
            .iter()
            .map(|(name, value, unit)| DraftIngredient::new(*name, *value, unit.clone()))
            .collect();
        meal.tags = self.tags.iter().map(|tag| (*tag).to_owned()).collect();
        meal.suggested_servings = Some(1.0);
        meal
    }
}

static TEMPLATES: &[Template] = &[
    Template {
        slot: MealSlot::Breakfast,
        name: "Greek Yogurt Parfait",
        cuisine: "mediterranean",
        protein: "greek yogurt",
        nutrition: NutritionFacts::new(420.0, 28.0, 52.0, 11.0),
        ingredients: &[
            ("greek yogurt", 200.0, Unit::Grams),
            ("rolled oats", 40.0, Unit::Grams),
            ("blueberries", 0.5, Unit::Cups),
            ("honey", 1.0, Unit::Tablespoons),
        ],
        tags: &["vegetarian", "quick"],
    },
    Template {
        slot: MealSlot::Breakfast,
        name: "Veggie Scrambled Eggs",
        cuisine: "american",
        protein: "eggs",
        nutrition: NutritionFacts::new(390.0, 24.0, 28.0, 20.0),
        ingredients: &[
            ("eggs", 3.0, Unit::Pieces),
            ("spinach", 1.0, Unit::Cups),
            ("bell pepper", 0.5, Unit::Cups),
            ("whole wheat bread", 1.0, Unit::Slices),
            ("olive oil", 1.0, Unit::Teaspoons),
        ],
        tags: &["vegetarian"],
    },
    Template {
        slot: MealSlot::Breakfast,
        name: "Tofu Breakfast Burrito",
        cuisine: "mexican",
        protein: "tofu",
        nutrition: NutritionFacts::new(450.0, 24.0, 50.0, 17.0),
        ingredients: &[
            ("firm tofu", 150.0, Unit::Grams),
            ("flour tortilla", 1.0, Unit::Pieces),
            ("black beans", 0.33, Unit::Cups),
            ("salsa", 2.0, Unit::Tablespoons),
            ("avocado", 0.25, Unit::Pieces),
        ],
        tags: &["vegan"],
    },
    Template {
        slot: MealSlot::Breakfast,
        name: "Smoked Salmon Toast",
        cuisine: "nordic",
        protein: "salmon",
        nutrition: NutritionFacts::new(400.0, 26.0, 34.0, 17.0),
        ingredients: &[
            ("smoked salmon", 85.0, Unit::Grams),
            ("rye bread", 2.0, Unit::Slices),
            ("cream cheese", 1.0, Unit::Tablespoons),
            ("cucumber", 0.5, Unit::Cups),
        ],
        tags: &["pescatarian"],
    },
    Template {
        slot: MealSlot::Lunch,
        name: "Grilled Chicken Quinoa Bowl",
        cuisine: "mediterranean",
        protein: "chicken",
        nutrition: NutritionFacts::new(560.0, 45.0, 52.0, 17.0),
        ingredients: &[
            ("chicken breast", 150.0, Unit::Grams),
            ("quinoa", 0.75, Unit::Cups),
            ("cherry tomatoes", 0.5, Unit::Cups),
            ("cucumber", 0.5, Unit::Cups),
            ("olive oil", 1.0, Unit::Tablespoons),
        ],
        tags: &["high-protein"],
    },
    Template {
        slot: MealSlot::Lunch,
        name: "Lentil Vegetable Soup",
        cuisine: "middle eastern",
        protein: "lentils",
        nutrition: NutritionFacts::new(480.0, 26.0, 70.0, 10.0),
        ingredients: &[
            ("lentils", 0.75, Unit::Cups),
            ("carrots", 0.5, Unit::Cups),
            ("celery", 0.5, Unit::Cups),
            ("vegetable broth", 2.0, Unit::Cups),
            ("olive oil", 1.0, Unit::Teaspoons),
        ],
        tags: &["vegan"],
    },
    Template {
        slot: MealSlot::Lunch,
        name: "Turkey Avocado Wrap",
        cuisine: "american",
        protein: "turkey",
        nutrition: NutritionFacts::new(520.0, 36.0, 44.0, 21.0),
        ingredients: &[
            ("turkey breast", 120.0, Unit::Grams),
            ("whole wheat tortilla", 1.0, Unit::Pieces),
            ("avocado", 0.5, Unit::Pieces),
            ("lettuce", 1.0, Unit::Cups),
        ],
        tags: &[],
    },
    Template {
        slot: MealSlot::Lunch,
        name: "Tuna Nicoise Salad",
        cuisine: "french",
        protein: "tuna",
        nutrition: NutritionFacts::new(510.0, 38.0, 30.0, 25.0),
        ingredients: &[
            ("tuna", 120.0, Unit::Grams),
            ("green beans", 1.0, Unit::Cups),
            ("potatoes", 100.0, Unit::Grams),
            ("eggs", 1.0, Unit::Pieces),
            ("olive oil", 1.0, Unit::Tablespoons),
        ],
        tags: &["pescatarian"],
    },
    Template {
        slot: MealSlot::Dinner,
        name: "Baked Salmon with Roasted Vegetables",
        cuisine: "mediterranean",
        protein: "salmon",
        nutrition: NutritionFacts::new(620.0, 42.0, 40.0, 30.0),
        ingredients: &[
            ("salmon fillet", 170.0, Unit::Grams),
            ("sweet potato", 150.0, Unit::Grams),
            ("broccoli", 1.0, Unit::Cups),
            ("olive oil", 1.0, Unit::Tablespoons),
        ],
        tags: &["pescatarian"],
    },
    Template {
        slot: MealSlot::Dinner,
        name: "Beef and Broccoli Stir Fry",
        cuisine: "chinese",
        protein: "beef",
        nutrition: NutritionFacts::new(650.0, 42.0, 62.0, 24.0),
        ingredients: &[
            ("lean beef", 150.0, Unit::Grams),
            ("broccoli", 1.5, Unit::Cups),
            ("brown rice", 0.75, Unit::Cups),
            ("soy sauce", 1.0, Unit::Tablespoons),
            ("sesame oil", 1.0, Unit::Teaspoons),
        ],
        tags: &[],
    },
    Template {
        slot: MealSlot::Dinner,
        name: "Chickpea Coconut Curry",
        cuisine: "indian",
        protein: "chickpeas",
        nutrition: NutritionFacts::new(610.0, 20.0, 80.0, 22.0),
        ingredients: &[
            ("chickpeas", 1.0, Unit::Cups),
            ("coconut milk", 0.33, Unit::Cups),
            ("spinach", 1.0, Unit::Cups),
            ("basmati rice", 0.5, Unit::Cups),
        ],
        tags: &["vegan"],
    },
    Template {
        slot: MealSlot::Dinner,
        name: "Chicken Fajita Plate",
        cuisine: "mexican",
        protein: "chicken",
        nutrition: NutritionFacts::new(600.0, 46.0, 50.0, 22.0),
        ingredients: &[
            ("chicken breast", 160.0, Unit::Grams),
            ("bell pepper", 1.0, Unit::Cups),
            ("onion", 0.5, Unit::Cups),
            ("corn tortilla", 2.0, Unit::Pieces),
            ("olive oil", 1.0, Unit::Tablespoons),
        ],
        tags: &["high-protein"],
    },
    Template {
        slot: MealSlot::Snack,
        name: "Apple with Almond Butter",
        cuisine: "american",
        protein: "almond butter",
        nutrition: NutritionFacts::new(200.0, 5.0, 25.0, 9.0),
        ingredients: &[("apple", 1.0, Unit::Pieces), ("almond butter", 1.0, Unit::Tablespoons)],
        tags: &["vegan", "quick"],
    },
    Template {
        slot: MealSlot::Snack,
        name: "Hummus and Carrot Sticks",
        cuisine: "middle eastern",
        protein: "chickpeas",
        nutrition: NutritionFacts::new(180.0, 6.0, 20.0, 9.0),
        ingredients: &[("hummus", 0.25, Unit::Cups), ("carrots", 1.0, Unit::Cups)],
        tags: &["vegan", "quick"],
    },
    Template {
        slot: MealSlot::Snack,
        name: "Cottage Cheese with Pineapple",
        cuisine: "american",
        protein: "cottage cheese",
        nutrition: NutritionFacts::new(190.0, 20.0, 18.0, 4.0),
        ingredients: &[("cottage cheese", 0.75, Unit::Cups), ("pineapple", 0.5, Unit::Cups)],
        tags: &["vegetarian", "high-protein"],
    },
    Template {
        slot: MealSlot::Snack,
        name: "Edamame with Sea Salt",
        cuisine: "japanese",
        protein: "edamame",
        nutrition: NutritionFacts::new(190.0, 17.0, 14.0, 8.0),
        ingredients: &[("edamame", 1.0, Unit::Cups), ("sea salt", 1.0, Unit::Pinch)],
        tags: &["vegan", "quick"],
    },
];

/// Builds drafts without a language model
#[derive(Debug, Clone)]
pub struct FallbackPlanGenerator {
    preferences: DietaryPreferences,
    candidates: Vec<DraftMeal>,
}

impl FallbackPlanGenerator {
    /// Generator over the built-in templates
    #[must_use]
    pub fn new(preferences: DietaryPreferences) -> Self {
        let candidates = TEMPLATES.iter().map(Template::to_draft).collect();
        Self::with_candidates(preferences, candidates)
    }

    /// Generator over caller-supplied candidates
    ///
    /// Candidates that fail the compliance scan are dropped, except where that
    /// would leave a slot with nothing to choose from.
    #[must_use]
    pub fn with_candidates(preferences: DietaryPreferences, candidates: Vec<DraftMeal>) -> Self {
        let scanner = ComplianceScanner::new(&preferences);
        let (compliant, flagged): (Vec<_>, Vec<_>) = candidates
            .into_iter()
            .partition(|meal| scanner.scan_draft_meal(meal, None).is_empty());

        let mut candidates = compliant;
        for meal in flagged {
            if candidates.iter().any(|kept| kept.slot == meal.slot) {
                debug!(meal = %meal.name, "dropping non-compliant template");
            } else {
                debug!(meal = %meal.name, "keeping non-compliant template, slot has no alternative");
                candidates.push(meal);
            }
        }
        Self {
            preferences,
            candidates,
        }
    }

    /// Candidates left after compliance filtering
    #[must_use]
    pub fn candidates(&self) -> &[DraftMeal] {
        &self.candidates
    }

    /// Draft `days` days of four meals each
    ///
    /// With `daily_calories`, each meal is scaled to its slot's share of the
    /// target and the scaled numbers become the meal target.
    #[must_use]
    pub fn generate(&self, days: u32, daily_calories: Option<f64>) -> MealPlanDraft {
        let mut optimizer =
            VarietyOptimizer::new(self.candidates.clone(), &self.preferences.preferred_cuisines);
        let mut previous: [Option<String>; DAILY_SLOTS.len()] = Default::default();

        let mut plan_days = Vec::with_capacity(days as usize);
        for day in 1..=days {
            let mut meals = Vec::with_capacity(DAILY_SLOTS.len());
            for (index, slot) in DAILY_SLOTS.iter().enumerate() {
                let Some(meal) = optimizer.select(*slot, previous[index].as_deref()) else {
                    continue;
                };
                previous[index].clone_from(&meal.primary_protein);
                meals.push(fit_to_target(meal, *slot, daily_calories));
            }
            plan_days.push(DraftDay {
                day,
                date: None,
                target_nutrition: None,
                meals,
            });
        }

        let draft = MealPlanDraft {
            title: Some(format!("{days}-day balanced plan")),
            preferences: self.preferences.clone(),
            days: plan_days,
        };
        info!(days, meals = draft.meal_count(), "generated fallback meal plan");
        draft
    }
}

fn fit_to_target(mut meal: DraftMeal, slot: MealSlot, daily_calories: Option<f64>) -> DraftMeal {
    meal.slot = slot;
    let target = match daily_calories {
        Some(daily) if daily > 0.0 && meal.estimated_nutrition.calories > 0.0 => {
            let factor = daily * slot_share(slot) / meal.estimated_nutrition.calories;
            for ingredient in &mut meal.draft_ingredients {
                ingredient.quantity = ingredient.quantity.scaled(factor);
            }
            meal.estimated_nutrition.scaled(factor).rounded()
        }
        _ => meal.estimated_nutrition,
    };
    meal.estimated_nutrition = target;
    meal.target_nutrition = Some(target);
    meal
}
