//! # Configuration Module
//!
//! Application settings shared by the CLI, the session and the identifiers.
//! Every field has a default; a JSON file may override any subset, and the
//! binary applies command-line flags and environment variables last.
//!
//! ## Configuration Parameters
//!
//! | Parameter | Default | Description |
//! |-----------|---------|-------------|
//! | `feed.host` / `feed.port` | unset | IP camera; both set → `http://host:port/video` |
//! | `feed.device_index` | `0` | Local camera used when no IP camera is set |
//! | `backend` | `cloud` | `cloud` (Gemini) or `local` (ONNX detector) |
//! | `cloud.model` | `gemini-1.5-flash` | Multimodal model name |
//! | `cloud.timeout_secs` | `30` | Whole-request timeout |
//! | `cloud.payload_max_side` | `768` | Longest side of the uploaded frame, `null` = original |
//! | `local.model_path` | `best.onnx` | Trained detector export |
//! | `local.confidence_threshold` | `0.25` | Minimum detection confidence |
//! | `local.grams_per_pixel` | `0.0005` | Box-area calibration constant |
//! | `session.capture_file` | `captured_ingredient.jpg` | Overwritten on every capture |
//! | `session.poll_interval_ms` | `30` | UI refresh cadence |
//! | `session.frame_skip` | `3` | Render every n-th live frame |
//!
//! ## Examples
//!
//! ```rust
//! use baking_converter::config::config::{AppConfig, Backend};
//!
//! let config: AppConfig = serde_json::from_str(r#"{ "backend": "local" }"#).unwrap();
//! assert_eq!(config.backend, Backend::Local);
//! assert_eq!(config.session.frame_skip, 3);
//! assert!(config.validate().is_ok());
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::capture::FeedSource;
use crate::density::{DensityEntry, DensityTable};
use crate::error::{BakeError, BakeResult};

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_CAPTURE_FILE: &str = "captured_ingredient.jpg";

/// Identification strategy, chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Hosted multimodal model
    #[default]
    Cloud,
    /// On-device object detector
    Local,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub feed: FeedConfig,
    pub backend: Backend,
    pub cloud: CloudConfig,
    pub local: LocalConfig,
    pub session: SessionSettings,
    /// Replaces the built-in density table when present.
    pub densities: Option<Vec<DensityEntry>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub host: Option<String>,
    pub port: Option<String>,
    pub device_index: u32,
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub payload_max_side: Option<u32>,
    pub jpeg_quality: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    pub model_path: PathBuf,
    /// Square model input edge in pixels
    pub input_size: u32,
    pub confidence_threshold: f32,
    pub grams_per_pixel: f64,
    /// Detector class labels by index; the density table names when unset.
    pub class_names: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub capture_file: PathBuf,
    pub jpeg_quality: u8,
    pub poll_interval_ms: u64,
    pub frame_skip: u32,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            payload_max_side: Some(768),
            jpeg_quality: 85,
        }
    }
}

impl fmt::Debug for CloudConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("payload_max_side", &self.payload_max_side)
            .field("jpeg_quality", &self.jpeg_quality)
            .finish()
    }
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("best.onnx"),
            input_size: 640,
            confidence_threshold: 0.25,
            grams_per_pixel: 0.0005,
            class_names: None,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            capture_file: PathBuf::from(DEFAULT_CAPTURE_FILE),
            jpeg_quality: crate::frame::DEFAULT_JPEG_QUALITY,
            poll_interval_ms: 30,
            frame_skip: 3,
        }
    }
}

impl FeedConfig {
    /// The feed to open: IP camera when host and port are both set,
    /// otherwise the configured local camera.
    pub fn source(&self) -> FeedSource {
        match FeedSource::from_host_port(self.host.as_deref(), self.port.as_deref()) {
            FeedSource::Device(_) => FeedSource::Device(self.device_index),
            network => network,
        }
    }
}

impl AppConfig {
    /// Defaults, overlaid with the JSON file at `path` when given.
    pub fn load(path: Option<&Path>) -> BakeResult<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .map_err(|e| BakeError::io(format!("reading {}", path.display()), e))?;
        serde_json::from_str(&text)
            .map_err(|e| BakeError::config(path.display().to_string(), e.to_string()))
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(port) = self.feed.port.as_deref().filter(|p| !p.trim().is_empty()) {
            if port.trim().parse::<u16>().is_err() {
                return Err(format!("Feed port '{port}' is not a valid port number"));
            }
        }
        if self.cloud.model.trim().is_empty() {
            return Err("Cloud model name must not be empty".to_string());
        }
        if !self.cloud.base_url.starts_with("http://") && !self.cloud.base_url.starts_with("https://") {
            return Err("Cloud base URL must start with http:// or https://".to_string());
        }
        if self.cloud.timeout_secs == 0 {
            return Err("Cloud timeout must be greater than 0 seconds".to_string());
        }
        if self.cloud.payload_max_side == Some(0) {
            return Err("Payload max side must be greater than 0".to_string());
        }
        if !(1..=100).contains(&self.cloud.jpeg_quality) || !(1..=100).contains(&self.session.jpeg_quality) {
            return Err("JPEG quality must be between 1 and 100".to_string());
        }
        if self.local.input_size == 0 || self.local.input_size % 32 != 0 {
            return Err("Detector input size must be a positive multiple of 32".to_string());
        }
        if !(0.0..=1.0).contains(&self.local.confidence_threshold) {
            return Err("Confidence threshold must be between 0 and 1".to_string());
        }
        if !self.local.grams_per_pixel.is_finite() || self.local.grams_per_pixel <= 0.0 {
            return Err("Grams per pixel must be positive".to_string());
        }
        if self.session.poll_interval_ms == 0 {
            return Err("Poll interval must be greater than 0 ms".to_string());
        }
        if self.session.frame_skip == 0 {
            return Err("Frame skip must be at least 1".to_string());
        }
        if let Some(entries) = &self.densities {
            DensityTable::from_entries(entries).map_err(|e| e.to_string())?;
        }
        Ok(())
    }

    /// The density table every component shares.
    pub fn density_table(&self) -> BakeResult<DensityTable> {
        match &self.densities {
            Some(entries) => DensityTable::from_entries(entries),
            None => Ok(DensityTable::default()),
        }
    }
}
