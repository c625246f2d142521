//! # Volume to Mass Conversion
//!
//! `grams = amount * ml_per_unit(unit) * density(ingredient)`
//!
//! | Unit | mL |
//! |------|----|
//! | cup | 250 |
//! | tablespoon | 14 |
//! | teaspoon | 5 |
//! | anything else | 1 (treated as millilitres) |
//!
//! Unrecognized unit labels fall back to millilitres instead of failing.
//! Results are rounded to one decimal place for display.
//!
//! ```
//! use std::sync::Arc;
//! use baking_converter::convert::{Unit, UnitConverter};
//! use baking_converter::density::DensityTable;
//!
//! let converter = UnitConverter::new(Arc::new(DensityTable::default()));
//! let result = converter.convert(2.0, Unit::Cup, "Flour").unwrap();
//! assert_eq!(result.grams(), 295.0);
//! assert_eq!(result.to_string(), "2 Cups = 295.0 grams");
//! ```

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::debug;

use crate::density::DensityTable;
use crate::error::{BakeError, BakeResult};

pub const ML_PER_CUP: f64 = 250.0;
pub const ML_PER_TABLESPOON: f64 = 14.0;
pub const ML_PER_TEASPOON: f64 = 5.0;

/// Volume units offered by the converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    Cup,
    Tablespoon,
    Teaspoon,
    /// Fallback for labels the converter does not know.
    Milliliter,
}

impl Unit {
    /// Units listed in the converter's unit picker.
    pub const CHOICES: [Unit; 3] = [Unit::Cup, Unit::Tablespoon, Unit::Teaspoon];

    pub fn ml_per_unit(self) -> f64 {
        match self {
            Unit::Cup => ML_PER_CUP,
            Unit::Tablespoon => ML_PER_TABLESPOON,
            Unit::Teaspoon => ML_PER_TEASPOON,
            Unit::Milliliter => 1.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Unit::Cup => "Cups",
            Unit::Tablespoon => "Tablespoons",
            Unit::Teaspoon => "Teaspoons",
            Unit::Milliliter => "mL",
        }
    }

    /// Parse a unit label. Never fails: unknown labels become millilitres.
    pub fn from_label(label: &str) -> Self {
        let normalized = label.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "cup" | "cups" | "c" => Unit::Cup,
            "tablespoon" | "tablespoons" | "tbsp" | "tbs" => Unit::Tablespoon,
            "teaspoon" | "teaspoons" | "tsp" => Unit::Teaspoon,
            "ml" | "milliliter" | "milliliters" | "millilitre" | "millilitres" => Unit::Milliliter,
            _ => {
                debug!(label, "unrecognized unit, treating amount as millilitres");
                Unit::Milliliter
            }
        }
    }
}

impl FromStr for Unit {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Unit::from_label(s))
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One conversion as entered by the user.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRequest {
    pub amount: f64,
    pub unit: Unit,
    pub ingredient: String,
}

impl ConversionRequest {
    /// Parse raw form input. Only the amount can fail to parse.
    pub fn parse(amount: &str, unit: &str, ingredient: &str) -> BakeResult<Self> {
        let amount = parse_amount(amount)?;
        Ok(Self {
            amount,
            unit: Unit::from_label(unit),
            ingredient: ingredient.trim().to_string(),
        })
    }
}

fn parse_amount(input: &str) -> BakeResult<f64> {
    input
        .trim()
        .parse::<f64>()
        .map_err(|_| BakeError::invalid_amount(input))
        .and_then(|amount| validate_amount(amount, input))
}

fn validate_amount(amount: f64, input: &str) -> BakeResult<f64> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(amount)
    } else {
        Err(BakeError::invalid_amount(input))
    }
}

/// Result of a successful conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub amount: f64,
    pub unit: Unit,
    pub ingredient: String,
    grams: f64,
}

impl Conversion {
    /// Mass rounded to one decimal place.
    pub fn grams(&self) -> f64 {
        (self.grams * 10.0).round() / 10.0
    }

    /// Unrounded mass.
    pub fn exact_grams(&self) -> f64 {
        self.grams
    }
}

impl fmt::Display for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} = {:.1} grams", self.amount, self.unit, self.grams())
    }
}

/// Converts volumes to grams using an injected density table.
#[derive(Debug, Clone)]
pub struct UnitConverter {
    table: Arc<DensityTable>,
}

impl UnitConverter {
    pub fn new(table: Arc<DensityTable>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &DensityTable {
        &self.table
    }

    pub fn convert(&self, amount: f64, unit: Unit, ingredient: &str) -> BakeResult<Conversion> {
        let amount = validate_amount(amount, &amount.to_string())?;
        let density = self
            .table
            .density(ingredient)
            .ok_or_else(|| BakeError::unknown_ingredient(ingredient))?;
        let ingredient = self
            .table
            .canonical_name(ingredient)
            .unwrap_or(ingredient)
            .to_string();

        Ok(Conversion {
            amount,
            unit,
            ingredient,
            grams: amount * unit.ml_per_unit() * density,
        })
    }

    pub fn convert_request(&self, request: &ConversionRequest) -> BakeResult<Conversion> {
        self.convert(request.amount, request.unit, &request.ingredient)
    }

    /// Convert straight from form text.
    pub fn convert_text(&self, amount: &str, unit: &str, ingredient: &str) -> BakeResult<Conversion> {
        let request = ConversionRequest::parse(amount, unit, ingredient)?;
        self.convert_request(&request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn converter() -> UnitConverter {
        UnitConverter::new(Arc::new(DensityTable::default()))
    }

    #[test]
    fn two_cups_of_flour() {
        let c = converter().convert(2.0, Unit::Cup, "Flour").unwrap();
        assert_eq!(c.grams(), 295.0);
    }

    #[test]
    fn one_tablespoon_of_salt() {
        let c = converter().convert(1.0, Unit::Tablespoon, "Salt").unwrap();
        assert_eq!(c.grams(), 30.4);
        assert_eq!(c.to_string(), "1 Tablespoons = 30.4 grams");
    }

    #[test]
    fn unknown_ingredient_for_any_input() {
        let conv = converter();
        for unit in [Unit::Cup, Unit::Tablespoon, Unit::Teaspoon, Unit::Milliliter] {
            for amount in [0.0, 1.0, 3.5] {
                let err = conv.convert(amount, unit, "NotAnIngredient").unwrap_err();
                assert!(matches!(err, BakeError::UnknownIngredient { .. }));
            }
        }
    }

    #[test]
    fn non_numeric_amount_is_invalid() {
        let err = converter().convert_text("abc", "Cups", "Flour").unwrap_err();
        assert!(matches!(err, BakeError::InvalidAmount { .. }));
        assert!(converter().convert_text("", "Cups", "Flour").is_err());
        assert!(converter().convert_text("-1", "Cups", "Flour").is_err());
        assert!(converter().convert(f64::INFINITY, Unit::Cup, "Flour").is_err());
    }

    #[test]
    fn unknown_unit_is_millilitres() {
        assert_eq!(Unit::from_label("pinch"), Unit::Milliliter);
        let c = converter().convert_text("100", "pinch", "Salt").unwrap();
        assert_eq!(c.grams(), 217.0);
        assert_eq!(c.to_string(), "100 mL = 217.0 grams");
    }

    #[test]
    fn display_uses_canonical_label_and_shortest_amount() {
        let c = converter().convert_text("1.50", "TBSP", "Flour").unwrap();
        assert_eq!(c.to_string(), "1.5 Tablespoons = 12.4 grams");
    }

    #[test]
    fn unit_labels_round_trip_through_picker() {
        for unit in Unit::CHOICES {
            assert_eq!(Unit::from_label(unit.label()), unit);
        }
        assert_eq!("tsp".parse::<Unit>(), Ok(Unit::Teaspoon));
    }

    #[test]
    fn conversion_is_monotonic_in_amount() {
        let conv = converter();
        let names: Vec<String> = conv.table().names().map(str::to_string).collect();
        for name in names {
            for unit in Unit::CHOICES {
                let mut previous = -1.0;
                for step in 0..20 {
                    let grams = conv
                        .convert(step as f64 * 0.25, unit, &name)
                        .unwrap()
                        .exact_grams();
                    assert!(grams > previous, "{name} {unit} not increasing");
                    previous = grams;
                }
            }
        }
    }

    #[test]
    fn ingredient_lookup_is_case_insensitive() {
        let c = converter().convert_text(" 1 ", "cup", "powdered sugar").unwrap();
        assert_eq!(c.ingredient, "Powdered Sugar");
        assert_eq!(c.grams(), 397.5);
    }
}
