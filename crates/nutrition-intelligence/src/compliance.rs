// ABOUTME: Dietary compliance scanner auditing meals against allergen and diet-style term lists
// ABOUTME: Independent audit over drafted or compiled meals, emitting deduplicated violations
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Dietary Compliance Scanner
//!
//! Scans the meal name, primary protein and every ingredient (drafted names
//! and matched food descriptions) against an allergen keyword map and the
//! forbidden-term list of the plan's dietary style. Terms match as whole words
//! with plural forms. Exempt phrases ("almond milk" for dairy) are removed
//! before matching. A "free" marker ("gluten-free pasta", "veggie burger") exempts
//! only a term it directly modifies: the marker must sit within the few words
//! before the term, with no connective or comma in between. The audit runs
//! regardless of any upstream filtering.

use std::cmp::Reverse;
use std::collections::HashSet;
use std::iter;
use std::sync::LazyLock;

use nutrition_core::models::{
    Allergen, CompiledMeal, CompiledPlan, DietaryPreferences, DietaryStyle, DraftMeal,
    MealPlanDraft, MealSlot,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Rule family a violation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ViolationCategory {
    /// Declared allergen present
    Allergen(Allergen),
    /// Term forbidden by the dietary style
    Diet(DietaryStyle),
}

/// Part of a meal that contained the term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScannedField {
    /// Meal name
    MealName,
    /// Primary protein
    PrimaryProtein,
    /// Ingredient name or matched food description
    Ingredient,
}

/// One compliance finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceViolation {
    /// Day number, when scanned as part of a plan
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
    /// Meal slot
    pub slot: MealSlot,
    /// Meal name
    pub meal: String,
    /// Violated rule family
    pub category: ViolationCategory,
    /// Matched term, lowercased
    pub term: String,
    /// Field containing the term
    pub field: ScannedField,
    /// Full text that was scanned
    pub text: String,
}

/// Audit result for a plan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceReport {
    /// Meals scanned
    pub scanned_meals: usize,
    /// Deduplicated violations in scan order
    pub violations: Vec<ComplianceViolation>,
}

impl ComplianceReport {
    /// No violations found
    #[must_use]
    pub fn is_compliant(&self) -> bool {
        self.violations.is_empty()
    }
}

const PEANUT_TERMS: &[&str] = &["peanut", "peanut butter", "groundnut"];
const TREE_NUT_TERMS: &[&str] = &[
    "almond", "walnut", "cashew", "pecan", "pistachio", "hazelnut", "macadamia", "pine nut",
    "brazil nut", "nut",
];
const DAIRY_TERMS: &[&str] = &[
    "milk", "cheese", "butter", "cream", "yogurt", "yoghurt", "whey", "casein", "ghee",
    "parmesan", "mozzarella", "cheddar", "feta", "ricotta",
];
const EGG_TERMS: &[&str] = &["egg", "mayonnaise", "mayo", "meringue"];
const GLUTEN_TERMS: &[&str] = &[
    "wheat", "bread", "pasta", "flour", "barley", "rye", "couscous", "bulgur", "seitan",
    "spaghetti", "noodle", "tortilla", "bagel", "toast", "cracker", "breadcrumb",
];
const SOY_TERMS: &[&str] = &["soy", "soya", "tofu", "tempeh", "edamame", "miso", "tamari"];
const FISH_TERMS: &[&str] = &[
    "fish", "salmon", "tuna", "cod", "tilapia", "trout", "halibut", "anchovy", "anchovies",
    "sardine", "mackerel",
];
const SHELLFISH_TERMS: &[&str] = &[
    "shrimp", "prawn", "crab", "lobster", "scallop", "mussel", "clam", "oyster", "shellfish",
];
const SESAME_TERMS: &[&str] = &["sesame", "tahini"];

const MEAT_TERMS: &[&str] = &[
    "chicken", "beef", "pork", "bacon", "turkey", "lamb", "ham", "sausage", "steak", "veal",
    "duck", "prosciutto", "pepperoni", "salami", "chorizo", "venison", "gelatin",
];
const KETO_TERMS: &[&str] = &[
    "sugar", "rice", "pasta", "bread", "potato", "oats", "oatmeal", "tortilla", "corn", "noodle",
    "bagel", "cereal", "honey", "maple syrup", "banana", "flour",
];
const PALEO_TERMS: &[&str] = &[
    "bread", "pasta", "rice", "oats", "beans", "lentils", "chickpeas", "peanut", "cheese", "milk",
    "yogurt", "sugar", "tofu", "soy", "corn", "flour", "quinoa",
];

const DAIRY_EXEMPT: &[&str] = &[
    "almond milk",
    "oat milk",
    "soy milk",
    "rice milk",
    "cashew milk",
    "coconut milk",
    "coconut cream",
    "peanut butter",
    "almond butter",
    "cashew butter",
    "nut butter",
    "cocoa butter",
    "cream of tartar",
    "vegan cheese",
];
const TREE_NUT_EXEMPT: &[&str] = &["nutmeg", "coconut", "butternut", "doughnut", "nutritional yeast"];
const GLUTEN_EXEMPT: &[&str] = &[
    "buckwheat",
    "rice noodle",
    "zucchini noodle",
    "rice flour",
    "almond flour",
    "coconut flour",
    "corn tortilla",
    "lettuce wrap",
];
const KETO_EXEMPT: &[&str] = &[
    "cauliflower rice",
    "zucchini noodle",
    "low-carb tortilla",
    "low carb tortilla",
    "almond flour",
    "coconut flour",
    "sugar-free",
    "sugar free",
];
const PALEO_EXEMPT: &[&str] = &[
    "cauliflower rice",
    "almond milk",
    "coconut milk",
    "almond flour",
    "coconut flour",
    "green beans",
];

const DAIRY_FREE: &[&str] = &["dairy-free", "dairy free", "vegan"];
const GLUTEN_FREE: &[&str] = &["gluten-free", "gluten free"];
const PLANT_BASED: &[&str] = &["vegan", "vegetarian", "plant-based", "plant based", "meatless", "veggie"];

/// Words before a term that a free marker may occupy
const MARKER_REACH: usize = 3;
const CONNECTIVES: &[&str] = &["and", "with", "or", "&", "plus", "+"];

struct Rule {
    category: ViolationCategory,
    exempt: Vec<&'static str>,
    free_markers: &'static [&'static str],
    pattern: Option<Regex>,
}

impl Rule {
    fn new(
        category: ViolationCategory,
        term_lists: &[&'static [&'static str]],
        exempt_lists: &[&'static [&'static str]],
        free_markers: &'static [&'static str],
    ) -> Self {
        let mut terms: Vec<&str> = term_lists.iter().flat_map(|list| list.iter().copied()).collect();
        terms.sort_by_key(|term| (Reverse(term.len()), *term));
        terms.dedup();
        let alternation = terms
            .iter()
            .map(|term| regex::escape(term))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!(r"\b(?:{alternation})(?:s|es)?\b")).ok();
        if pattern.is_none() {
            warn!(category = ?category, "compliance pattern failed to compile");
        }
        Self {
            category,
            exempt: exempt_lists.iter().flat_map(|list| list.iter().copied()).collect(),
            free_markers,
            pattern,
        }
    }

    fn matches(&self, text: &str) -> Vec<String> {
        let Some(pattern) = self.pattern.as_ref() else {
            return Vec::new();
        };
        let mut lowered = text.to_lowercase();
        for phrase in &self.exempt {
            lowered = lowered.replace(phrase, " ");
        }
        pattern
            .find_iter(&lowered)
            .filter(|found| !self.is_modified_by_marker(&lowered[..found.start()]))
            .map(|found| found.as_str().to_owned())
            .collect()
    }

    /// Whether the words right before a term carry one of the free markers
    fn is_modified_by_marker(&self, before: &str) -> bool {
        if self.free_markers.is_empty() {
            return false;
        }
        let mut modifiers: Vec<&str> = Vec::new();
        for word in before.split_whitespace().rev().take(MARKER_REACH) {
            if CONNECTIVES.contains(&word) || word.ends_with([',', ';', '(', ')']) {
                break;
            }
            modifiers.push(word);
        }
        if modifiers.is_empty() {
            return false;
        }
        modifiers.reverse();
        let window = format!(" {} ", modifiers.join(" "));
        self.free_markers
            .iter()
            .any(|marker| window.contains(&format!(" {marker} ")))
    }
}

static ALLERGEN_RULES: LazyLock<Vec<(Allergen, Rule)>> = LazyLock::new(|| {
    Allergen::ALL
        .iter()
        .map(|&allergen| {
            let category = ViolationCategory::Allergen(allergen);
            let rule = match allergen {
                Allergen::Peanuts => Rule::new(category, &[PEANUT_TERMS], &[], &[]),
                Allergen::TreeNuts => Rule::new(category, &[TREE_NUT_TERMS], &[TREE_NUT_EXEMPT], &[]),
                Allergen::Dairy => Rule::new(category, &[DAIRY_TERMS], &[DAIRY_EXEMPT], DAIRY_FREE),
                Allergen::Eggs => Rule::new(category, &[EGG_TERMS], &[], &["egg-free", "egg free", "vegan"]),
                Allergen::Gluten => Rule::new(category, &[GLUTEN_TERMS], &[GLUTEN_EXEMPT], GLUTEN_FREE),
                Allergen::Soy => Rule::new(category, &[SOY_TERMS], &[], &["soy-free", "soy free"]),
                Allergen::Fish => Rule::new(category, &[FISH_TERMS], &[], &[]),
                Allergen::Shellfish => Rule::new(category, &[SHELLFISH_TERMS], &[], &[]),
                Allergen::Sesame => Rule::new(category, &[SESAME_TERMS], &[], &[]),
            };
            (allergen, rule)
        })
        .collect()
});

static DIET_RULES: LazyLock<Vec<(DietaryStyle, Rule)>> = LazyLock::new(|| {
    let seafood: &[&'static [&'static str]] = &[FISH_TERMS, SHELLFISH_TERMS];
    vec![
        (
            DietaryStyle::Vegetarian,
            Rule::new(
                ViolationCategory::Diet(DietaryStyle::Vegetarian),
                &[MEAT_TERMS, seafood[0], seafood[1]],
                &[],
                PLANT_BASED,
            ),
        ),
        (
            DietaryStyle::Vegan,
            Rule::new(
                ViolationCategory::Diet(DietaryStyle::Vegan),
                &[MEAT_TERMS, seafood[0], seafood[1], DAIRY_TERMS, EGG_TERMS, &["honey"]],
                &[DAIRY_EXEMPT],
                PLANT_BASED,
            ),
        ),
        (
            DietaryStyle::Pescatarian,
            Rule::new(
                ViolationCategory::Diet(DietaryStyle::Pescatarian),
                &[MEAT_TERMS],
                &[],
                PLANT_BASED,
            ),
        ),
        (
            DietaryStyle::Keto,
            Rule::new(
                ViolationCategory::Diet(DietaryStyle::Keto),
                &[KETO_TERMS],
                &[KETO_EXEMPT],
                &["keto"],
            ),
        ),
        (
            DietaryStyle::Paleo,
            Rule::new(
                ViolationCategory::Diet(DietaryStyle::Paleo),
                &[PALEO_TERMS],
                &[PALEO_EXEMPT],
                &["paleo"],
            ),
        ),
    ]
});

/// Allergen and diet-style auditor for one set of preferences
#[derive(Debug, Clone, Default)]
pub struct ComplianceScanner {
    allergens: Vec<Allergen>,
    style: DietaryStyle,
}

impl ComplianceScanner {
    /// Create a scanner for the given preferences
    #[must_use]
    pub fn new(preferences: &DietaryPreferences) -> Self {
        Self {
            allergens: preferences.allergens.clone(),
            style: preferences.style,
        }
    }

    /// Scan every meal of a drafted plan
    #[must_use]
    pub fn scan_draft(&self, draft: &MealPlanDraft) -> ComplianceReport {
        let mut report = ComplianceReport::default();
        for day in &draft.days {
            for meal in &day.meals {
                report.scanned_meals += 1;
                report.violations.extend(self.scan_draft_meal(meal, Some(day.day)));
            }
        }
        self.log_report(&report);
        report
    }

    /// Scan every meal of a compiled plan
    #[must_use]
    pub fn scan_plan(&self, plan: &CompiledPlan) -> ComplianceReport {
        let mut report = ComplianceReport::default();
        for day in &plan.days {
            for meal in &day.meals {
                report.scanned_meals += 1;
                report.violations.extend(self.scan_compiled_meal(meal, Some(day.day)));
            }
        }
        self.log_report(&report);
        report
    }

    /// Scan one drafted meal
    #[must_use]
    pub fn scan_draft_meal(&self, meal: &DraftMeal, day: Option<u32>) -> Vec<ComplianceViolation> {
        let fields = meal_fields(
            &meal.name,
            meal.primary_protein.as_deref(),
            meal.draft_ingredients.iter().map(|ingredient| ingredient.name.as_str()),
        );
        self.scan_fields(day, meal.slot, &meal.name, &fields)
    }

    /// Scan one compiled meal, including matched food descriptions
    #[must_use]
    pub fn scan_compiled_meal(&self, meal: &CompiledMeal, day: Option<u32>) -> Vec<ComplianceViolation> {
        let ingredient_texts = meal.ingredients.iter().flat_map(|ingredient| {
            iter::once(ingredient.name.as_str()).chain(
                ingredient
                    .matched_food
                    .as_ref()
                    .map(|food| food.description.as_str()),
            )
        });
        let fields = meal_fields(&meal.name, meal.primary_protein.as_deref(), ingredient_texts);
        self.scan_fields(day, meal.slot, &meal.name, &fields)
    }

    fn rules(&self) -> impl Iterator<Item = &'static Rule> + '_ {
        let allergen_rules = ALLERGEN_RULES
            .iter()
            .filter(|(allergen, _)| self.allergens.contains(allergen))
            .map(|(_, rule)| rule);
        let diet_rules = DIET_RULES
            .iter()
            .filter(|(style, _)| *style == self.style)
            .map(|(_, rule)| rule);
        allergen_rules.chain(diet_rules)
    }

    fn scan_fields(
        &self,
        day: Option<u32>,
        slot: MealSlot,
        meal_name: &str,
        fields: &[(ScannedField, &str)],
    ) -> Vec<ComplianceViolation> {
        let mut seen: HashSet<(ViolationCategory, String)> = HashSet::new();
        let mut violations = Vec::new();
        for rule in self.rules() {
            for (field, text) in fields {
                for term in rule.matches(text) {
                    if seen.insert((rule.category, singular(&term))) {
                        violations.push(ComplianceViolation {
                            day,
                            slot,
                            meal: meal_name.to_owned(),
                            category: rule.category,
                            term,
                            field: *field,
                            text: (*text).to_owned(),
                        });
                    }
                }
            }
        }
        violations
    }

    fn log_report(&self, report: &ComplianceReport) {
        if report.is_compliant() {
            info!(meals = report.scanned_meals, style = ?self.style, "compliance audit passed");
        } else {
            warn!(
                meals = report.scanned_meals,
                violations = report.violations.len(),
                style = ?self.style,
                "compliance audit found violations"
            );
        }
    }
}

fn meal_fields<'a>(
    name: &'a str,
    primary_protein: Option<&'a str>,
    ingredients: impl Iterator<Item = &'a str>,
) -> Vec<(ScannedField, &'a str)> {
    let mut fields = vec![(ScannedField::MealName, name)];
    if let Some(protein) = primary_protein {
        fields.push((ScannedField::PrimaryProtein, protein));
    }
    fields.extend(ingredients.map(|text| (ScannedField::Ingredient, text)));
    fields
}

/// Collapse simple plurals so "eggs" and "egg" dedupe together
fn singular(term: &str) -> String {
    if let Some(stem) = term.strip_suffix("ies") {
        return format!("{stem}y");
    }
    if let Some(stem) = term.strip_suffix("oes") {
        return format!("{stem}o");
    }
    match term.strip_suffix('s') {
        Some(stem) if stem.len() > 2 && !stem.ends_with('s') && !stem.ends_with('u') => {
            stem.to_owned()
        }
        _ => term.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use nutrition_core::models::{DraftIngredient, NutritionFacts, Unit};

    use super::*;

    #[test]
    fn test_singular() {
        assert_eq!(singular("eggs"), "egg");
        assert_eq!(singular("potatoes"), "potato");
        assert_eq!(singular("hummus"), "hummus");
        assert_eq!(singular("anchovies"), "anchovy");
        assert_eq!(singular("oats"), "oat");
        assert_eq!(singular("egg"), "egg");
    }

    #[test]
    fn test_exempt_phrase_is_removed_before_matching() {
        let rule = &ALLERGEN_RULES
            .iter()
            .find(|(allergen, _)| *allergen == Allergen::Dairy)
            .unwrap()
            .1;
        assert!(rule.matches("unsweetened almond milk").is_empty());
        assert_eq!(rule.matches("almond milk and cheddar cheese"), vec!["cheddar", "cheese"]);
        assert!(rule.matches("dairy-free cheese").is_empty());
    }

    #[test]
    fn test_marker_only_exempts_the_term_it_modifies() {
        let scanner = ComplianceScanner::new(&DietaryPreferences {
            style: DietaryStyle::Vegetarian,
            ..DietaryPreferences::default()
        });
        let mut meal = DraftMeal::new(
            MealSlot::Dinner,
            "Beef and Veggie Stir Fry",
            NutritionFacts::new(600.0, 35.0, 50.0, 20.0),
        );
        meal.draft_ingredients = vec![
            DraftIngredient::new("beef and veggie mix", 200.0, Unit::Grams),
            DraftIngredient::new("veggie sausage", 80.0, Unit::Grams),
        ];

        let violations = scanner.scan_draft_meal(&meal, None);

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].term, "beef");
        assert_eq!(violations[0].field, ScannedField::MealName);
    }

    #[test]
    fn test_marker_across_connective_does_not_exempt() {
        let rule = &ALLERGEN_RULES
            .iter()
            .find(|(allergen, _)| *allergen == Allergen::Gluten)
            .unwrap()
            .1;
        assert!(rule.matches("gluten-free pasta").is_empty());
        assert!(rule.matches("gluten free rice pasta").is_empty());
        assert_eq!(rule.matches("gluten-free crackers and bread"), vec!["bread"]);
        assert_eq!(rule.matches("toast, gluten-free jam"), vec!["toast"]);
    }
}
