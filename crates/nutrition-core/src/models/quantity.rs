// ABOUTME: Tagged quantity model with a closed unit enum for heterogeneous draft units
// ABOUTME: Parses numbers, numeric strings, fractions, mixed numbers and ranges leniently
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Measurement unit normalized from free text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Unit {
    /// Grams
    Grams,
    /// Kilograms
    Kilograms,
    /// Ounces (weight)
    Ounces,
    /// Pounds
    Pounds,
    /// Milliliters
    Milliliters,
    /// Liters
    Liters,
    /// US cups
    Cups,
    /// Tablespoons
    Tablespoons,
    /// Teaspoons
    Teaspoons,
    /// Whole pieces (eggs, fruit, fillets)
    #[default]
    Pieces,
    /// Slices
    Slices,
    /// Garlic cloves
    Cloves,
    /// Pinch or dash
    Pinch,
    /// Unrecognized unit, preserved in lowercase
    Other(String),
}

impl Unit {
    /// Normalize a free-text unit
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let normalized = text.trim().trim_end_matches('.').to_lowercase();
        match normalized.as_str() {
            "g" | "gr" | "gram" | "grams" | "gramme" | "grammes" => Self::Grams,
            "kg" | "kgs" | "kilogram" | "kilograms" => Self::Kilograms,
            "oz" | "ounce" | "ounces" => Self::Ounces,
            "lb" | "lbs" | "pound" | "pounds" => Self::Pounds,
            "ml" | "milliliter" | "milliliters" | "millilitre" | "millilitres" => Self::Milliliters,
            "l" | "liter" | "liters" | "litre" | "litres" => Self::Liters,
            "cup" | "cups" | "c" => Self::Cups,
            "tbsp" | "tbs" | "tbl" | "tablespoon" | "tablespoons" => Self::Tablespoons,
            "tsp" | "teaspoon" | "teaspoons" => Self::Teaspoons,
            "" | "piece" | "pieces" | "pc" | "pcs" | "whole" | "each" | "unit" | "units"
            | "item" | "items" | "small" | "medium" | "large" | "fillet" | "fillets" => {
                Self::Pieces
            }
            "slice" | "slices" => Self::Slices,
            "clove" | "cloves" => Self::Cloves,
            "pinch" | "pinches" | "dash" | "dashes" => Self::Pinch,
            _ => Self::Other(normalized),
        }
    }

    /// Mass units
    #[must_use]
    pub const fn is_weight(&self) -> bool {
        matches!(
            self,
            Self::Grams | Self::Kilograms | Self::Ounces | Self::Pounds
        )
    }

    /// Volume units
    #[must_use]
    pub const fn is_volume(&self) -> bool {
        matches!(
            self,
            Self::Milliliters | Self::Liters | Self::Cups | Self::Tablespoons | Self::Teaspoons
        )
    }

    /// Count-based units
    #[must_use]
    pub const fn is_count(&self) -> bool {
        matches!(
            self,
            Self::Pieces | Self::Slices | Self::Cloves | Self::Pinch
        )
    }

    /// Short display form
    #[must_use]
    pub fn abbreviation(&self) -> &str {
        match self {
            Self::Grams => "g",
            Self::Kilograms => "kg",
            Self::Ounces => "oz",
            Self::Pounds => "lb",
            Self::Milliliters => "ml",
            Self::Liters => "l",
            Self::Cups => "cup",
            Self::Tablespoons => "tbsp",
            Self::Teaspoons => "tsp",
            Self::Pieces => "piece",
            Self::Slices => "slice",
            Self::Cloves => "clove",
            Self::Pinch => "pinch",
            Self::Other(text) => text,
        }
    }
}

impl From<String> for Unit {
    fn from(text: String) -> Self {
        Self::parse(&text)
    }
}

impl From<Unit> for String {
    fn from(unit: Unit) -> Self {
        unit.abbreviation().to_owned()
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbreviation())
    }
}

/// Amount plus unit, normalized at the input boundary
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Quantity {
    /// Non-negative amount
    #[serde(
        rename = "quantity",
        alias = "amount",
        default,
        deserialize_with = "deserialize_amount"
    )]
    pub value: f64,
    /// Normalized unit
    #[serde(default)]
    pub unit: Unit,
}

impl Quantity {
    /// Create a quantity, clamping negative or non-finite amounts to zero
    #[must_use]
    pub fn new(value: f64, unit: Unit) -> Self {
        Self {
            value: sanitize(value),
            unit,
        }
    }

    /// Parse free text such as `"1 1/2 cups"` or `"200g"`
    ///
    /// Text without a leading amount yields a zero quantity.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        let split = trimmed
            .char_indices()
            .find(|(_, c)| !(c.is_ascii_digit() || matches!(c, '.' | '/' | ' ' | '-')))
            .map_or(trimmed.len(), |(index, _)| index);
        let (amount, unit) = trimmed.split_at(split);
        Self::new(parse_amount(amount).unwrap_or(0.0), Unit::parse(unit))
    }

    /// Return a copy with the amount multiplied by `factor`
    #[must_use]
    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(self.value * factor, self.unit.clone())
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

/// Parse an amount written as a decimal, fraction, mixed number or range
///
/// Ranges such as `"2-3"` resolve to their midpoint.
#[must_use]
pub fn parse_amount(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Some((low, high)) = text.split_once('-') {
        if !low.trim().is_empty() {
            let low = parse_amount(low)?;
            let high = parse_amount(high)?;
            return Some((low + high) / 2.0);
        }
    }
    let mut parts = text.split_whitespace();
    let first = parse_simple(parts.next()?)?;
    match parts.next() {
        None => Some(first),
        Some(fraction) if fraction.contains('/') => Some(first + parse_simple(fraction)?),
        Some(_) => None,
    }
}

fn parse_simple(token: &str) -> Option<f64> {
    if let Some((numerator, denominator)) = token.split_once('/') {
        let numerator: f64 = numerator.trim().parse().ok()?;
        let denominator: f64 = denominator.trim().parse().ok()?;
        if denominator == 0.0 {
            return None;
        }
        return Some(numerator / denominator);
    }
    token.parse().ok()
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Deserialize an amount from a number, numeric string, fraction or null
///
/// Unparseable input becomes zero rather than failing the whole draft.
///
/// # Errors
///
/// Never fails for scalar input; only structurally invalid JSON is rejected.
pub fn deserialize_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    struct AmountVisitor;

    impl Visitor<'_> for AmountVisitor {
        type Value = f64;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a number or numeric string")
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> Result<f64, E> {
            Ok(sanitize(value))
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<f64, E> {
            Ok(sanitize(value as f64))
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<f64, E> {
            Ok(sanitize(value as f64))
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<f64, E> {
            Ok(sanitize(parse_amount(value).unwrap_or(0.0)))
        }

        fn visit_unit<E: de::Error>(self) -> Result<f64, E> {
            Ok(0.0)
        }

        fn visit_none<E: de::Error>(self) -> Result<f64, E> {
            Ok(0.0)
        }
    }

    deserializer.deserialize_any(AmountVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount_forms() {
        assert_eq!(parse_amount("2"), Some(2.0));
        assert_eq!(parse_amount("0.5"), Some(0.5));
        assert_eq!(parse_amount("1/2"), Some(0.5));
        assert_eq!(parse_amount("1 1/2"), Some(1.5));
        assert_eq!(parse_amount("2-3"), Some(2.5));
        assert_eq!(parse_amount("a few"), None);
        assert_eq!(parse_amount("1/0"), None);
    }

    #[test]
    fn test_unit_parse() {
        assert_eq!(Unit::parse("Tablespoons"), Unit::Tablespoons);
        assert_eq!(Unit::parse("g."), Unit::Grams);
        assert_eq!(Unit::parse(""), Unit::Pieces);
        assert_eq!(Unit::parse("Handful"), Unit::Other("handful".to_owned()));
    }

    #[test]
    fn test_quantity_parse_free_text() {
        let quantity = Quantity::parse("1 1/2 cups");
        assert!((quantity.value - 1.5).abs() < f64::EPSILON);
        assert_eq!(quantity.unit, Unit::Cups);

        let quantity = Quantity::parse("200g");
        assert!((quantity.value - 200.0).abs() < f64::EPSILON);
        assert_eq!(quantity.unit, Unit::Grams);
    }

    #[test]
    fn test_lenient_deserialization() {
        let quantity: Quantity = serde_json::from_str(r#"{"quantity": "1/2", "unit": "cup"}"#).unwrap();
        assert!((quantity.value - 0.5).abs() < f64::EPSILON);

        let quantity: Quantity = serde_json::from_str(r#"{"quantity": -4, "unit": "g"}"#).unwrap();
        assert!(quantity.value.abs() < f64::EPSILON);

        let quantity: Quantity = serde_json::from_str(r#"{"quantity": "some"}"#).unwrap();
        assert!(quantity.value.abs() < f64::EPSILON);
        assert_eq!(quantity.unit, Unit::Pieces);
    }
}
