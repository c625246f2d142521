//! # Ingredient Identification
//!
//! Interchangeable strategies that look at a captured [`Frame`] and say what
//! is in it:
//!
//! - [`CloudIdentifier`]: hosted multimodal model, free-text answer
//! - [`LocalIdentifier`]: on-device object detector, single best box turned
//!   into a rough mass estimate
//!
//! The strategy is picked once, at construction time, by [`from_config`].
//! Callers only see `Arc<dyn IngredientIdentifier>`.

pub mod cloud;
pub mod detector;
pub mod local;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{AppConfig, Backend};
use crate::density::DensityTable;
use crate::error::BakeResult;
use crate::frame::Frame;

pub use cloud::CloudIdentifier;
pub use detector::{BoundingBox, Detection, Detector};
pub use local::LocalIdentifier;

/// What a backend made of a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Identification {
    /// Cloud answer, shown verbatim.
    Description {
        text: String,
        /// Table ingredient named in the text, if any
        ingredient: Option<String>,
        /// First number in the text, read as g/mL
        density_estimate: Option<f64>,
    },
    /// Local detector result for the most confident box.
    Estimate {
        ingredient: String,
        confidence: f32,
        bbox: BoundingBox,
        grams: f64,
    },
}

impl Identification {
    /// Build a description, pulling the ingredient and density hints out of
    /// the free text.
    pub fn describe(text: impl Into<String>, table: &DensityTable) -> Self {
        let text = text.into();
        let ingredient = table.find_in_text(&text).map(str::to_string);
        let density_estimate = first_number(&text);
        Identification::Description {
            text,
            ingredient,
            density_estimate,
        }
    }

    /// Ingredient hint for pre-filling the converter.
    pub fn ingredient(&self) -> Option<&str> {
        match self {
            Identification::Description { ingredient, .. } => ingredient.as_deref(),
            Identification::Estimate { ingredient, .. } => Some(ingredient),
        }
    }
}

impl fmt::Display for Identification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identification::Description { text, .. } => f.write_str(text),
            Identification::Estimate {
                ingredient,
                confidence,
                grams,
                ..
            } => write!(
                f,
                "{ingredient}: approximately {grams:.1} g ({:.0}% confidence)",
                confidence * 100.0
            ),
        }
    }
}

#[async_trait]
pub trait IngredientIdentifier: Send + Sync {
    fn name(&self) -> &str;

    /// `Ok(None)` means the backend ran and found nothing usable.
    async fn identify(&self, frame: Arc<Frame>) -> BakeResult<Option<Identification>>;
}

/// Build the configured strategy.
pub fn from_config(
    config: &AppConfig,
    table: Arc<DensityTable>,
) -> BakeResult<Arc<dyn IngredientIdentifier>> {
    Ok(match config.backend {
        Backend::Cloud => Arc::new(CloudIdentifier::from_config(&config.cloud, table)?),
        Backend::Local => Arc::new(LocalIdentifier::load(&config.local, &table)),
    })
}

/// Prompt listing the closed set of ingredients the answer must come from.
pub fn prompt(table: &DensityTable) -> String {
    let choices = table
        .names()
        .map(|name| format!("'{name}'"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "You have {} choices, {choices}. What ingredient is shown in this image? \
         Answer with only the name of the ingredient, and predict the density of the \
         ingredient in grams per milliliter.",
        table.len()
    )
}

/// First decimal number in `text`, e.g. `0.59` in "Flour, 0.59 g/mL".
fn first_number(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i + 1 < bytes.len() && bytes[i] == b'.' && bytes[i + 1].is_ascii_digit() {
                i += 1;
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
            }
            return text[start..i].parse().ok();
        }
        i += 1;
    }
    None
}
