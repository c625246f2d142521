//! # Baking Ingredient Converter
//!
//! Point a camera at a baking ingredient, find out what it is, and turn a
//! volume measurement of it into grams.
//!
//! ## Architecture
//!
//! - `capture`: camera feeds and the single-slot live frame hand-off
//! - `identify`: interchangeable recognizers (cloud multimodal model or a
//!   local ONNX detector)
//! - `session`: capture / retake / analyze state machine
//! - `convert` and `density`: volume to mass arithmetic over a fixed table
//! - `config`: settings and validation
//! - `shell`: line-oriented front end used by the `bake` binary
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use baking_converter::{DensityTable, Unit, UnitConverter};
//!
//! let converter = UnitConverter::new(Arc::new(DensityTable::default()));
//! let salt = converter.convert(1.0, Unit::Tablespoon, "Salt").unwrap();
//! assert_eq!(salt.grams(), 30.4);
//! ```

pub mod capture;
pub mod config;
pub mod convert;
pub mod density;
pub mod error;
pub mod frame;
pub mod identify;
pub mod session;
pub mod shell;

pub use capture::{FeedSource, FrameSource, VideoFeed};
pub use config::AppConfig;
pub use convert::{Conversion, ConversionRequest, Unit, UnitConverter};
pub use density::{DensityEntry, DensityTable};
pub use error::{BakeError, BakeResult, ErrorSeverity, HasRecoverySuggestion, HasSeverity};
pub use frame::Frame;
pub use identify::{Identification, IngredientIdentifier};
pub use session::{CaptureSession, SessionState};
