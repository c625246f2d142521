//! On-device identification with a trained object detector.
//!
//! Only the most confident detection is used. Its box area in frame pixels is
//! multiplied by a calibration constant to give a rough mass, which is only
//! meaningful for the camera distance the constant was measured at.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::detector::Detector;
use super::{Identification, IngredientIdentifier};
use crate::config::LocalConfig;
use crate::density::DensityTable;
use crate::error::BakeResult;
use crate::frame::Frame;

const NAME: &str = "local";

pub struct LocalIdentifier {
    detector: Option<Arc<dyn Detector>>,
    grams_per_pixel: f64,
}

impl LocalIdentifier {
    /// Load the configured model. A missing or broken model leaves the
    /// identifier disabled: it warns here once and then reports nothing.
    pub fn load(config: &LocalConfig, table: &DensityTable) -> Self {
        let classes = config
            .class_names
            .clone()
            .unwrap_or_else(|| table.names().map(str::to_string).collect());

        #[cfg(feature = "local-detector")]
        let detector = match super::detector::TractDetector::load(
            &config.model_path,
            config.input_size,
            config.confidence_threshold,
            classes,
        ) {
            Ok(detector) => Some(Arc::new(detector) as Arc<dyn Detector>),
            Err(e) => {
                warn!(error = %e, "detector model could not be loaded; local identification disabled");
                None
            }
        };

        #[cfg(not(feature = "local-detector"))]
        let detector = {
            let _ = classes;
            warn!("built without the local-detector feature; local identification disabled");
            None
        };

        Self {
            detector,
            grams_per_pixel: config.grams_per_pixel,
        }
    }

    pub fn with_detector(detector: Arc<dyn Detector>, grams_per_pixel: f64) -> Self {
        Self {
            detector: Some(detector),
            grams_per_pixel,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.detector.is_some()
    }
}

#[async_trait]
impl IngredientIdentifier for LocalIdentifier {
    fn name(&self) -> &str {
        NAME
    }

    async fn identify(&self, frame: Arc<Frame>) -> BakeResult<Option<Identification>> {
        let Some(detector) = self.detector.clone() else {
            return Ok(None);
        };

        let detections = match tokio::task::spawn_blocking(move || detector.detect(&frame)).await {
            Ok(Ok(detections)) => detections,
            Ok(Err(e)) => {
                warn!(error = %e, "detector failed on frame");
                return Ok(None);
            }
            Err(e) => {
                warn!(error = %e, "detector task did not complete");
                return Ok(None);
            }
        };

        let Some(best) = detections
            .into_iter()
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
        else {
            debug!("no detections");
            return Ok(None);
        };

        let grams = best.bbox.area() * self.grams_per_pixel;
        debug!(label = %best.label, confidence = best.confidence, grams, "best detection");
        Ok(Some(Identification::Estimate {
            ingredient: best.label,
            confidence: best.confidence,
            bbox: best.bbox,
            grams,
        }))
    }
}
