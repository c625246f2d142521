//! Ingredient density table (grams per millilitre).
//!
//! The table is built once at startup, from the canonical defaults or from a
//! configuration override, and then shared read-only as an
//! `Arc<DensityTable>` with everything that needs it.
//!
//! ```
//! use baking_converter::density::DensityTable;
//!
//! let table = DensityTable::default();
//! assert_eq!(table.density("Flour"), Some(0.59));
//! assert_eq!(table.density("salt"), Some(2.17));
//! assert_eq!(table.density("Cocoa"), None);
//! ```

use std::cmp::Reverse;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{BakeError, BakeResult};

/// The four ingredients the recognizers are trained/prompted for.
///
/// Values are first-result densities, not lab measurements.
pub const DEFAULT_DENSITIES: [(&str, f64); 4] = [
    ("Flour", 0.59),
    ("Powdered Sugar", 1.59),
    ("Salt", 2.17),
    ("Baking Powder", 2.2),
];

/// One row of the density table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityEntry {
    pub name: String,
    /// grams per millilitre
    pub density: f64,
}

/// Fixed ingredient → density mapping with unique, insertion-ordered keys.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityTable {
    entries: IndexMap<String, f64>,
}

impl Default for DensityTable {
    fn default() -> Self {
        Self {
            entries: DEFAULT_DENSITIES
                .iter()
                .map(|(name, density)| (name.to_string(), *density))
                .collect(),
        }
    }
}

impl DensityTable {
    /// Build a table, rejecting blank names, duplicates (ignoring case) and
    /// densities that are not finite and positive.
    pub fn new<I, S>(entries: I) -> BakeResult<Self>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut map = IndexMap::new();
        for (name, density) in entries {
            let name = name.into().trim().to_string();
            if name.is_empty() {
                return Err(BakeError::config("densities", "ingredient name is empty"));
            }
            if !density.is_finite() || density <= 0.0 {
                return Err(BakeError::config(
                    "densities",
                    format!("density for '{name}' must be positive, got {density}"),
                ));
            }
            if map.keys().any(|k: &String| k.eq_ignore_ascii_case(&name)) {
                return Err(BakeError::config(
                    "densities",
                    format!("duplicate ingredient '{name}'"),
                ));
            }
            map.insert(name, density);
        }
        if map.is_empty() {
            return Err(BakeError::config("densities", "table has no entries"));
        }
        Ok(Self { entries: map })
    }

    /// Build a table from config rows.
    pub fn from_entries(entries: &[DensityEntry]) -> BakeResult<Self> {
        Self::new(entries.iter().map(|e| (e.name.clone(), e.density)))
    }

    /// Density in g/mL. Exact match first, then trimmed and case-insensitive.
    pub fn density(&self, name: &str) -> Option<f64> {
        if let Some(d) = self.entries.get(name) {
            return Some(*d);
        }
        let name = name.trim();
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, d)| *d)
    }

    /// Canonical spelling of `name` as stored in the table.
    pub fn canonical_name(&self, name: &str) -> Option<&str> {
        let name = name.trim();
        self.entries
            .keys()
            .find(|k| k.eq_ignore_ascii_case(name))
            .map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(k, d)| (k.as_str(), *d))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First ingredient named in `text`, ignoring case. Names starting at
    /// the same position resolve to the longer one.
    ///
    /// Free-text model answers ("It looks like Powdered Sugar, about 0.56
    /// g/mL") are matched back onto the table this way.
    pub fn find_in_text(&self, text: &str) -> Option<&str> {
        let haystack = text.to_lowercase();
        self.entries
            .keys()
            .filter_map(|k| haystack.find(&k.to_lowercase()).map(|at| (at, k)))
            .min_by_key(|(at, k)| (*at, Reverse(k.len())))
            .map(|(_, k)| k.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_is_positive_and_ordered() {
        let table = DensityTable::default();
        assert_eq!(table.len(), 4);
        assert!(table.iter().all(|(_, d)| d > 0.0));
        assert_eq!(
            table.names().collect::<Vec<_>>(),
            vec!["Flour", "Powdered Sugar", "Salt", "Baking Powder"]
        );
    }

    #[test]
    fn rejects_duplicates_and_bad_densities() {
        assert!(DensityTable::new([("Flour", 0.5), ("flour", 0.6)]).is_err());
        assert!(DensityTable::new([("Flour", 0.0)]).is_err());
        assert!(DensityTable::new([("Flour", f64::NAN)]).is_err());
        assert!(DensityTable::new([("  ", 1.0)]).is_err());
        assert!(DensityTable::new(Vec::<(String, f64)>::new()).is_err());
    }

    #[test]
    fn finds_compound_name_in_free_text() {
        let table = DensityTable::new([("Sugar", 0.85), ("Powdered Sugar", 0.56)]).unwrap();
        assert_eq!(
            table.find_in_text("This is powdered sugar, roughly 0.56 g/mL"),
            Some("Powdered Sugar")
        );
        assert_eq!(table.find_in_text("no idea"), None);
    }

    #[test]
    fn first_named_ingredient_wins() {
        let table = DensityTable::default();
        assert_eq!(
            table.find_in_text("Salt. It is not flour, density about 2.1 g/mL"),
            Some("Salt")
        );
        assert_eq!(
            table.find_in_text("Baking Powder, maybe Flour"),
            Some("Baking Powder")
        );
    }

    #[test]
    fn canonical_name_ignores_case() {
        let table = DensityTable::default();
        assert_eq!(table.canonical_name(" baking powder "), Some("Baking Powder"));
    }
}
